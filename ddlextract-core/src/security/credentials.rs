//! SQL login credentials with automatic memory zeroing.
//!
//! # Security
//! - Both fields live in `Zeroizing` containers and are cleared on drop
//! - `Debug` output never includes the password

use std::fmt;
use zeroize::{Zeroize, Zeroizing};

/// SQL authentication credentials.
///
/// # Example
///
/// ```rust
/// use ddlextract_core::security::Credentials;
///
/// let creds = Credentials::new("sa".to_string(), Some("secret".to_string()));
/// assert_eq!(creds.username(), "sa");
/// assert!(creds.has_password());
/// assert!(!format!("{:?}", creds).contains("secret"));
/// ```
#[derive(Clone, Zeroize)]
#[zeroize(drop)]
pub struct Credentials {
    username: Zeroizing<String>,
    password: Zeroizing<Option<String>>,
}

impl Credentials {
    /// Creates credentials from a login name and optional password.
    pub fn new(username: String, password: Option<String>) -> Self {
        Self {
            username: Zeroizing::new(username),
            password: Zeroizing::new(password),
        }
    }

    /// The login name.
    pub fn username(&self) -> &str {
        &self.username
    }

    /// The password, for handing to the driver only.
    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    /// Checks if a password is present without exposing it.
    pub fn has_password(&self) -> bool {
        self.password.is_some()
    }

    /// Replaces the embedded values with separately supplied ones.
    ///
    /// A `None` argument keeps the embedded value.
    pub fn with_overrides(self, username: Option<String>, password: Option<String>) -> Self {
        let username = username.unwrap_or_else(|| self.username().to_string());
        let password = password.or_else(|| self.password().map(str::to_string));
        Self::new(username, password)
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username())
            .field("password", &self.password.as_ref().map(|_| "****"))
            .finish()
    }
}
