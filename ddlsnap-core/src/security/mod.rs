//! Credential protection for catalog connection URLs.
//!
//! - `credentials`: secure credential container with automatic memory zeroing
//! - `connection`: connection URL parsing with credential extraction
//!
//! # Security Guarantees
//! - Credentials are stored in `Zeroizing` containers for automatic memory clearing
//! - Connection URLs are split so that only the credential-free part is ever displayed

mod connection;
mod credentials;

pub use connection::{ConnectionInfo, parse_connection_string};
pub use credentials::Credentials;
