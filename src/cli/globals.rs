use secrecy::{ExposeSecret, SecretString};

/// Secrets read once at startup.
#[derive(Clone)]
pub struct GlobalArgs {
    pub app_key: SecretString,
    pub api_secret: SecretString,
    pub accepted_token: Option<SecretString>,
}

impl GlobalArgs {
    #[must_use]
    pub const fn new(app_key: SecretString, api_secret: SecretString) -> Self {
        Self {
            app_key,
            api_secret,
            accepted_token: None,
        }
    }

    #[must_use]
    pub fn with_accepted_token(mut self, token: Option<SecretString>) -> Self {
        self.accepted_token = token;
        self
    }

    /// Length of the application key in bytes.
    #[must_use]
    pub fn app_key_len(&self) -> usize {
        self.app_key.expose_secret().len()
    }
}

impl std::fmt::Debug for GlobalArgs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlobalArgs")
            .field("app_key", &"***")
            .field("api_secret", &"***")
            .field("accepted_token", &self.accepted_token.as_ref().map(|_| "***"))
            .finish()
    }
}
