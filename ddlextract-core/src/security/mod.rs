//! Credential protection and connection target resolution.
//!
//! # Security Guarantees
//! - Credentials are stored in `Zeroizing` containers for automatic memory clearing
//! - Connection strings are parsed so that credentials never reach a log line
//!
//! # Module Structure
//! - `credentials`: Secure credential container with automatic memory zeroing
//! - `connection`: Connection string resolution (ADO.NET key/value and URL forms)

mod connection;
mod credentials;

pub use connection::{ConnectionStringError, ConnectionTarget, DEFAULT_PORT};
pub use credentials::Credentials;
