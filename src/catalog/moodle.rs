//! Moodle web-service client.
//!
//! One session per run: the token is obtained once in [`MoodleClient::connect`] and
//! carried by the client for every later call.

use crate::catalog::wire::{SiteInfo, TokenResponse, WireCourse, WireSection, WsException};
use crate::catalog::{CatalogClient, Course, FileRef, Section};
use crate::config::RemoteConfig;
use crate::error::ApiError;
use crate::types::CourseId;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::fmt;
use std::time::Duration;
use tracing::{debug, info};

const REST_PATH: &str = "webservice/rest/server.php";
const TOKEN_PATH: &str = "login/token.php";

/// Authenticated web-service session.
pub struct MoodleClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
    user_id: u64,
}

impl fmt::Debug for MoodleClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MoodleClient")
            .field("base_url", &self.base_url)
            .field("token", &"<redacted>")
            .field("user_id", &self.user_id)
            .finish()
    }
}

impl MoodleClient {
    /// Authenticate and resolve the current user. Any failure here is an
    /// authentication failure and must stop the run before sync work starts.
    pub async fn connect(config: &RemoteConfig) -> Result<Self, ApiError> {
        config.validate().map_err(ApiError::ConfigError)?;

        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("coursemirror/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ApiError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;
        let base_url = config.base_url.trim().trim_end_matches('/').to_string();

        let token = match config.token.as_deref().filter(|t| !t.is_empty()) {
            Some(token) => token.to_string(),
            None => {
                let username = config.username.as_deref().unwrap_or_default();
                let password = config.password.as_deref().unwrap_or_default();
                request_token(&http, &base_url, username, password, &config.service).await?
            }
        };

        let mut client = Self {
            http,
            base_url,
            token,
            user_id: 0,
        };

        let site: SiteInfo = client
            .call("core_webservice_get_site_info", &[])
            .await
            .map_err(|e| match e {
                ApiError::Unauthorized(msg) => ApiError::Unauthorized(msg),
                other => ApiError::Unauthorized(format!("Could not verify session: {}", other)),
            })?;
        client.user_id = site.userid;
        info!(
            "Authenticated against {} as user {}",
            site.sitename.as_deref().unwrap_or(&client.base_url),
            site.userid
        );
        Ok(client)
    }

    async fn call<T: DeserializeOwned>(
        &self,
        function: &str,
        params: &[(&str, String)],
    ) -> Result<T, ApiError> {
        let url = format!("{}/{}", self.base_url, REST_PATH);
        let mut query: Vec<(&str, String)> = vec![
            ("wstoken", self.token.clone()),
            ("wsfunction", function.to_string()),
            ("moodlewsrestformat", "json".to_string()),
        ];
        query.extend(params.iter().cloned());

        debug!("Calling web-service function {}", function);
        let response = self
            .http
            .get(&url)
            .query(&query)
            .send()
            .await
            .map_err(|e| {
                ApiError::CatalogError(format!("{} request failed: {}", function, e.without_url()))
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::CatalogError(format!(
                "{} returned HTTP {}",
                function, status
            )));
        }

        let value: Value = response.json().await.map_err(|e| {
            ApiError::CatalogError(format!("{} returned invalid JSON: {}", function, e.without_url()))
        })?;

        if let Some(exception) = WsException::from_value(&value) {
            let message = format!("{}: {}", function, exception.describe());
            return Err(if exception.is_auth_failure() {
                ApiError::Unauthorized(message)
            } else {
                ApiError::CatalogError(message)
            });
        }

        serde_json::from_value(value).map_err(|e| {
            ApiError::CatalogError(format!("Unexpected {} response: {}", function, e))
        })
    }
}

async fn request_token(
    http: &reqwest::Client,
    base_url: &str,
    username: &str,
    password: &str,
    service: &str,
) -> Result<String, ApiError> {
    let url = format!("{}/{}", base_url, TOKEN_PATH);
    let response = http
        .get(&url)
        .query(&[
            ("username", username),
            ("password", password),
            ("service", service),
        ])
        .send()
        .await
        .map_err(|e| ApiError::Unauthorized(format!("Token request failed: {}", e.without_url())))?;

    let body: TokenResponse = response.json().await.map_err(|e| {
        ApiError::Unauthorized(format!("Unexpected token response: {}", e.without_url()))
    })?;

    match body {
        TokenResponse {
            token: Some(token), ..
        } if !token.is_empty() => Ok(token),
        TokenResponse {
            error: Some(error),
            errorcode,
            ..
        } => Err(ApiError::Unauthorized(match errorcode {
            Some(code) => format!("{} ({})", error, code),
            None => error,
        })),
        _ => Err(ApiError::Unauthorized(
            "Token endpoint returned neither a token nor an error".to_string(),
        )),
    }
}

#[async_trait]
impl CatalogClient for MoodleClient {
    async fn list_courses(&self) -> Result<Vec<Course>, ApiError> {
        let courses: Vec<WireCourse> = self
            .call(
                "core_enrol_get_users_courses",
                &[("userid", self.user_id.to_string())],
            )
            .await?;
        Ok(courses.into_iter().map(Course::from).collect())
    }

    async fn list_contents(&self, course_id: CourseId) -> Result<Vec<Section>, ApiError> {
        let sections: Vec<WireSection> = self
            .call(
                "core_course_get_contents",
                &[("courseid", course_id.to_string())],
            )
            .await?;
        Ok(sections
            .into_iter()
            .enumerate()
            .map(|(index, section)| section.into_section(index))
            .collect())
    }

    async fn fetch_bytes(&self, file: &FileRef) -> Result<Vec<u8>, ApiError> {
        let response = self
            .http
            .get(&file.url)
            .query(&[("token", self.token.as_str())])
            .send()
            .await
            .map_err(|e| ApiError::FetchFailed(format!("{}: {}", file.name, e.without_url())))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::FetchFailed(format!(
                "{}: HTTP {}",
                file.name, status
            )));
        }

        let is_json = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|v| v.starts_with("application/json"))
            .unwrap_or(false);

        let bytes = response
            .bytes()
            .await
            .map_err(|e| ApiError::FetchFailed(format!("{}: {}", file.name, e.without_url())))?;

        if is_json {
            if let Some(exception) = serde_json::from_slice::<Value>(&bytes)
                .ok()
                .as_ref()
                .and_then(WsException::from_value)
            {
                return Err(ApiError::FetchFailed(format!(
                    "{}: {}",
                    file.name,
                    exception.describe()
                )));
            }
        }

        Ok(bytes.to_vec())
    }
}
