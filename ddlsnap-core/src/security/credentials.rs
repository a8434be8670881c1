//! Secure credential container with automatic memory zeroing.
//!
//! # Security
//! - Credentials are stored in `Zeroizing<T>` containers
//! - Memory is automatically cleared when credentials go out of scope
//! - Passwords are never exposed in debug output or logs

use zeroize::{Zeroize, Zeroizing};

/// Secure credential container that automatically zeros memory on drop.
///
/// # Example
///
/// ```rust
/// use ddlsnap_core::security::Credentials;
///
/// let creds = Credentials::new("scott".to_string(), Some("tiger".to_string()));
/// assert_eq!(creds.username(), "scott");
/// assert!(creds.has_password());
/// assert!(!format!("{:?}", creds).contains("tiger"));
/// ```
#[derive(Clone, Zeroize)]
#[zeroize(drop)]
pub struct Credentials {
    username: Zeroizing<String>,
    password: Zeroizing<Option<String>>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username.as_str())
            .field("password", &self.password.as_ref().map(|_| "****"))
            .finish()
    }
}

impl Credentials {
    /// Creates new credentials with automatic memory zeroing.
    pub fn new(username: String, password: Option<String>) -> Self {
        Self {
            username: Zeroizing::new(username),
            password: Zeroizing::new(password),
        }
    }

    /// Gets the username.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Gets the password for handing to the driver. Never log the result.
    pub fn password(&self) -> &str {
        self.password.as_deref().unwrap_or("")
    }

    /// Checks if password is present without exposing it.
    pub fn has_password(&self) -> bool {
        self.password.is_some()
    }
}
