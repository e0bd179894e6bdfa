//! Remote shell login.

use secrecy::{ExposeSecret, SecretString};

/// Username and optional password for the remote shell.
///
/// The roboRIO ships with `admin` and `lvuser` accounts that have
/// empty passwords, so the password is optional.
#[derive(Debug, Clone)]
pub struct Credentials {
    username: String,
    password: Option<SecretString>,
}

impl Credentials {
    /// Credentials with a password.
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: Some(SecretString::from(password.into())),
        }
    }

    /// Credentials without a password.
    #[must_use]
    pub fn without_password(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: None,
        }
    }

    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }

    #[must_use]
    pub const fn password(&self) -> Option<&SecretString> {
        self.password.as_ref()
    }

    /// Password text for the auth exchange, empty when none was given.
    #[must_use]
    pub fn password_or_empty(&self) -> &str {
        self.password.as_ref().map_or("", |p| p.expose_secret())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_hides_password() {
        let creds = Credentials::new("admin", "hunter2");
        let debug = format!("{creds:?}");
        assert!(debug.contains("admin"));
        assert!(!debug.contains("hunter2"));
        assert_eq!(creds.password_or_empty(), "hunter2");
    }

    #[test]
    fn test_clone_keeps_password() {
        let creds = Credentials::new("admin", "secret").clone();
        assert_eq!(creds.username(), "admin");
        assert_eq!(creds.password_or_empty(), "secret");
    }

    #[test]
    fn test_missing_password_is_empty() {
        let creds = Credentials::without_password("lvuser");
        assert!(creds.password().is_none());
        assert_eq!(creds.password_or_empty(), "");
    }
}
