pub mod chat;

use std::env;
use std::fmt;
use std::sync::Arc;

pub const DEFAULT_UPSTREAM_URL: &str = "https://openrouter.ai/api/v1/chat/completions";
pub const DEFAULT_CHAT_MODEL: &str = "qwen/qwen-2-7b-instruct:free";
pub const DEFAULT_API_KEY_ENV: &str = "OPENROUTER_API_KEY";

/// Where the bearer credential comes from. Queried on every call so a rotated
/// key takes effect without a restart.
pub trait CredentialSource: Send + Sync {
    fn bearer_token(&self) -> Option<String>;

    /// Human-readable origin, used in error messages and logs. Never the value.
    fn describe(&self) -> String;
}

/// Reads the credential from a named process environment variable.
#[derive(Debug, Clone)]
pub struct EnvCredential {
    var: String,
}

impl EnvCredential {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

impl CredentialSource for EnvCredential {
    fn bearer_token(&self) -> Option<String> {
        env::var(&self.var)
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    fn describe(&self) -> String {
        self.var.clone()
    }
}

/// Fixed credential, mostly for embedding and tests.
#[derive(Clone)]
pub struct StaticCredential(Option<String>);

impl StaticCredential {
    pub fn new(token: impl Into<String>) -> Self {
        Self(Some(token.into()))
    }

    pub fn absent() -> Self {
        Self(None)
    }
}

impl fmt::Debug for StaticCredential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("StaticCredential").field(&self.0.as_ref().map(|_| "<redacted>")).finish()
    }
}

impl CredentialSource for StaticCredential {
    fn bearer_token(&self) -> Option<String> {
        self.0.clone().filter(|v| !v.trim().is_empty())
    }

    fn describe(&self) -> String {
        "static credential".to_string()
    }
}

#[derive(Clone)]
pub struct UpstreamConfig {
    pub url: String,
    pub model: String,
    pub title: Option<String>,
    pub credentials: Arc<dyn CredentialSource>,
}

impl UpstreamConfig {
    pub fn new(url: impl Into<String>, credentials: Arc<dyn CredentialSource>) -> Self {
        Self {
            url: url.into(),
            model: DEFAULT_CHAT_MODEL.to_string(),
            title: None,
            credentials,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_title(mut self, title: Option<String>) -> Self {
        self.title = title.filter(|t| !t.trim().is_empty());
        self
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self::new(DEFAULT_UPSTREAM_URL, Arc::new(EnvCredential::new(DEFAULT_API_KEY_ENV)))
    }
}

impl fmt::Debug for UpstreamConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UpstreamConfig")
            .field("url", &self.url)
            .field("model", &self.model)
            .field("title", &self.title)
            .field("credentials", &self.credentials.describe())
            .finish()
    }
}
