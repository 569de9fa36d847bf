//! Remote platform connection settings.

use super::merge::merge_policy::{DEFAULT_SERVICE, DEFAULT_TIMEOUT_SECS};
use serde::{Deserialize, Serialize};
use std::fmt;

fn default_service() -> String {
    DEFAULT_SERVICE.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}

/// How the remote catalog is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CatalogStrategy {
    /// REST web service with token authentication.
    #[default]
    WebService,
    /// Rendered course pages behind a session login.
    Scrape,
}

/// Remote endpoint and credentials.
#[derive(Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Site root, e.g. `https://lms.example.edu`
    #[serde(default)]
    pub base_url: String,

    #[serde(default)]
    pub strategy: CatalogStrategy,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// Pre-issued web-service token; skips the username/password exchange.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,

    /// Web-service name passed to the token endpoint.
    #[serde(default = "default_service")]
    pub service: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Login form for the scrape strategy; defaults to `<base_url>/login/index.php`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub login_url: Option<String>,

    /// Course pages to scrape, e.g. `https://lms.example.edu/course/view.php?id=10`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub course_urls: Vec<String>,
}

impl Default for RemoteConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            strategy: CatalogStrategy::default(),
            username: None,
            password: None,
            token: None,
            service: default_service(),
            timeout_secs: default_timeout_secs(),
            login_url: None,
            course_urls: Vec::new(),
        }
    }
}

impl fmt::Debug for RemoteConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |v: &Option<String>| v.as_ref().map(|_| "<redacted>");
        f.debug_struct("RemoteConfig")
            .field("base_url", &self.base_url)
            .field("strategy", &self.strategy)
            .field("username", &self.username)
            .field("password", &redact(&self.password))
            .field("token", &redact(&self.token))
            .field("service", &self.service)
            .field("timeout_secs", &self.timeout_secs)
            .field("login_url", &self.login_url)
            .field("course_urls", &self.course_urls)
            .finish()
    }
}

fn non_empty(value: &Option<String>) -> bool {
    value.as_deref().map(|v| !v.trim().is_empty()).unwrap_or(false)
}

impl RemoteConfig {
    fn base_url_is_valid(base_url: &str) -> bool {
        let Some(rest) = base_url
            .strip_prefix("https://")
            .or_else(|| base_url.strip_prefix("http://"))
        else {
            return false;
        };
        let host = rest.split('/').next().unwrap_or_default();
        !host.is_empty() && !rest.chars().any(char::is_whitespace)
    }

    pub fn has_token(&self) -> bool {
        non_empty(&self.token)
    }

    /// Login form URL for the scrape strategy.
    pub fn resolved_login_url(&self) -> String {
        match self.login_url.as_deref().map(str::trim).filter(|u| !u.is_empty()) {
            Some(url) => url.to_string(),
            None => format!("{}/login/index.php", self.base_url.trim().trim_end_matches('/')),
        }
    }

    /// Validate connection settings for the configured strategy.
    pub fn validate(&self) -> Result<(), String> {
        let base_url = self.base_url.trim();
        if base_url.is_empty() {
            return Err("remote.base_url is not set".to_string());
        }
        if !Self::base_url_is_valid(base_url) {
            return Err(format!("Invalid remote.base_url: {}", base_url));
        }
        if self.timeout_secs == 0 {
            return Err("remote.timeout_secs must be greater than 0".to_string());
        }
        let has_login = non_empty(&self.username) && non_empty(&self.password);

        match self.strategy {
            CatalogStrategy::WebService => {
                if !self.has_token() && !has_login {
                    return Err(
                        "Either remote.token or both remote.username and remote.password must be set"
                            .to_string(),
                    );
                }
                if self.service.trim().is_empty() {
                    return Err("remote.service cannot be empty".to_string());
                }
            }
            CatalogStrategy::Scrape => {
                if !has_login {
                    return Err(
                        "The scrape strategy needs remote.username and remote.password".to_string(),
                    );
                }
                if self.course_urls.is_empty() {
                    return Err("The scrape strategy needs at least one remote.course_urls entry"
                        .to_string());
                }
                if let Some(bad) = self
                    .course_urls
                    .iter()
                    .chain(self.login_url.iter())
                    .find(|u| !Self::base_url_is_valid(u.trim()))
                {
                    return Err(format!("Invalid page URL: {}", bad));
                }
            }
        }
        Ok(())
    }
}
