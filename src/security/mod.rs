//! Security primitives: privilege algebra, password checks, login throttling.

pub mod digest;
pub mod password;
pub mod privileges;
pub mod rate_limit;

pub use privileges::Privileges;
pub use rate_limit::LoginAttemptLimiter;
