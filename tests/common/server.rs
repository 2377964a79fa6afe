//! Test server management.
//!
//! Spawns tokengate on a free port with a throwaway database.

use md5::{Digest, Md5};
use sqlx::SqlitePool;
use sqlx::sqlite::SqliteConnectOptions;
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};
use std::time::Duration;
use tempfile::TempDir;
use tokio::time::sleep;

/// A principal row to insert before exercising the API.
pub struct SeedUser<'a> {
    pub username: &'a str,
    pub password: &'a str,
    pub rank: i64,
    pub password_version: i64,
    pub allowed: bool,
}

impl<'a> SeedUser<'a> {
    pub fn new(username: &'a str, password: &'a str) -> Self {
        Self {
            username,
            password,
            rank: 1,
            password_version: 2,
            allowed: true,
        }
    }

    pub fn rank(mut self, rank: i64) -> Self {
        self.rank = rank;
        self
    }

    #[allow(dead_code)]
    pub fn legacy(mut self) -> Self {
        self.password_version = 1;
        self
    }

    #[allow(dead_code)]
    pub fn banned(mut self) -> Self {
        self.allowed = false;
        self
    }
}

/// A running tokengate instance.
pub struct TestServer {
    child: Child,
    port: u16,
    db_path: PathBuf,
    _data_dir: TempDir,
}

impl TestServer {
    /// Spawn with default policy.
    pub async fn spawn() -> anyhow::Result<Self> {
        Self::spawn_with_security("").await
    }

    /// Spawn with extra lines appended to the `[security]` table.
    pub async fn spawn_with_security(security: &str) -> anyhow::Result<Self> {
        let data_dir = tempfile::tempdir()?;
        let port = free_port()?;
        let db_path = data_dir.path().join("tokengate.db");

        let config_path = data_dir.path().join("config.toml");
        let config_content = format!(
            r#"
[server]
name = "test"
metrics_port = 0

[listen]
address = "127.0.0.1:{}"

[database]
path = "{}"

[security]
{}
"#,
            port,
            db_path.display(),
            security
        );
        std::fs::write(&config_path, config_content)?;

        let child = Command::new(env!("CARGO_BIN_EXE_tokengate"))
            .arg(&config_path)
            .env("RUST_LOG", "warn")
            .stdout(Stdio::null())
            .spawn()?;

        let server = Self {
            child,
            port,
            db_path,
            _data_dir: data_dir,
        };
        server.wait_until_ready().await?;

        Ok(server)
    }

    async fn wait_until_ready(&self) -> anyhow::Result<()> {
        for _ in 0..100 {
            if tokio::net::TcpStream::connect(("127.0.0.1", self.port))
                .await
                .is_ok()
            {
                return Ok(());
            }
            sleep(Duration::from_millis(50)).await;
        }
        anyhow::bail!("Server failed to start within 5 seconds")
    }

    pub fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    pub fn client(&self) -> super::client::TestClient {
        super::client::TestClient::new(self.base_url())
    }

    /// Direct handle on the server's database.
    pub async fn pool(&self) -> anyhow::Result<SqlitePool> {
        let options = SqliteConnectOptions::new().filename(&self.db_path);
        Ok(SqlitePool::connect_with(options).await?)
    }

    /// Insert a principal and return its id.
    pub async fn seed(&self, user: SeedUser<'_>) -> anyhow::Result<i64> {
        let digest = format!("{:x}", Md5::digest(user.password.as_bytes()));
        let hash = bcrypt::hash(digest, 4)?;

        let pool = self.pool().await?;
        let id = sqlx::query(
            "INSERT INTO users (username, rank, privileges, password_hash, password_version, allowed) \
             VALUES (?, ?, 0, ?, ?, ?)",
        )
        .bind(user.username)
        .bind(user.rank)
        .bind(hash)
        .bind(user.password_version)
        .bind(user.allowed)
        .execute(&pool)
        .await?
        .last_insert_rowid();
        pool.close().await;

        Ok(id)
    }

    /// Current failure counter for a principal.
    #[allow(dead_code)]
    pub async fn failed_attempts(&self, user_id: i64) -> anyhow::Result<i64> {
        let pool = self.pool().await?;
        let attempts: Option<i64> =
            sqlx::query_scalar("SELECT attempts FROM failed_attempts WHERE user = ?")
                .bind(user_id)
                .fetch_optional(&pool)
                .await?;
        pool.close().await;
        Ok(attempts.unwrap_or(0))
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

fn free_port() -> anyhow::Result<u16> {
    let listener = std::net::TcpListener::bind("127.0.0.1:0")?;
    Ok(listener.local_addr()?.port())
}
