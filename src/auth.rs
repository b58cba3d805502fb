use std::fmt;

/// Basic-auth credentials for the GoCD server.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    user: String,
    password: Option<String>,
}

impl Credentials {
    pub fn new(user: impl Into<String>, password: Option<String>) -> Self {
        Self {
            user: user.into(),
            password,
        }
    }

    /// Builds credentials when a user is configured, `None` for anonymous access.
    pub fn from_parts(user: Option<String>, password: Option<String>) -> Option<Self> {
        user.filter(|u| !u.is_empty())
            .map(|user| Self::new(user, password))
    }

    pub fn user(&self) -> &str {
        &self.user
    }

    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_parts_requires_user() {
        assert!(Credentials::from_parts(None, Some("secret".into())).is_none());
        assert!(Credentials::from_parts(Some(String::new()), None).is_none());

        let creds = Credentials::from_parts(Some("ba".into()), Some("secret".into())).unwrap();
        assert_eq!(creds.user(), "ba");
        assert_eq!(creds.password(), Some("secret"));
    }

    #[test]
    fn test_debug_redacts_password() {
        let creds = Credentials::new("ba", Some("hunter2".into()));

        let debug = format!("{creds:?}");

        assert!(debug.contains("ba"));
        assert!(!debug.contains("hunter2"));
    }
}
