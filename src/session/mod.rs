//! Token sessions: issuance by password login, resolution of presented
//! tokens, and privilege gating of resolved identities.

pub mod credentials;
pub mod gate;
pub mod login;
pub mod minter;
pub mod resolver;

pub use login::{LoginOutcome, LoginRequest, login};
pub use minter::{RandomSecret, SecretSource, TokenMinter};
pub use resolver::Identity;
