use crate::config::ClientConfig;
use crate::redact::redact_secrets;
use crate::types::{Credentials, ErrorDetail, LoginResponse, RefreshRequest, Role, SignupData};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

pub const REFRESH_PATH: &str = "/auth/refresh";
pub const SIGNUP_PATH: &str = "/auth/signup";
pub const PROJECTS_PATH: &str = "/projects";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpErrorStatus {
    Unauthorized,
    RateLimited,
    Error,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("network error")]
    Network(#[from] reqwest::Error),
    #[error("invalid json")]
    Json(#[from] serde_json::Error),
    #[error("{}", .detail.as_deref().unwrap_or("request failed"))]
    Status {
        code: u16,
        status: HttpErrorStatus,
        detail: Option<String>,
    },
}

impl ApiError {
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { code, .. } => Some(*code),
            _ => None,
        }
    }

    pub fn detail(&self) -> Option<&str> {
        match self {
            Self::Status { detail, .. } => detail.as_deref(),
            _ => None,
        }
    }
}

pub(crate) fn map_http_status(status_code: u16) -> HttpErrorStatus {
    match status_code {
        401 | 403 => HttpErrorStatus::Unauthorized,
        429 => HttpErrorStatus::RateLimited,
        _ => HttpErrorStatus::Error,
    }
}

/// Login, signup and refresh endpoints.
#[async_trait]
pub trait AuthApi: Send + Sync {
    async fn login(&self, role: Role, credentials: &Credentials) -> Result<LoginResponse, ApiError>;
    async fn signup(&self, data: &SignupData) -> Result<LoginResponse, ApiError>;
    async fn refresh(&self, refresh_token: &str) -> Result<LoginResponse, ApiError>;
}

/// Project creation endpoint used by the registration wizard.
#[async_trait]
pub trait ProjectApi: Send + Sync {
    /// Posts the accumulated record. `bearer` is the raw access token, when one is available.
    async fn create_project(&self, bearer: Option<&str>, record: &Value) -> Result<Value, ApiError>;
}

pub struct ApiClient {
    config: ClientConfig,
    http: reqwest::Client,
}

fn build_headers(bearer: Option<&str>) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    if let Some(token) = bearer.map(str::trim).filter(|t| !t.is_empty()) {
        if let Ok(value) = HeaderValue::from_str(&format!("Bearer {token}")) {
            headers.insert(AUTHORIZATION, value);
        }
    }
    headers
}

async fn error_from_response(res: reqwest::Response) -> ApiError {
    let code = res.status().as_u16();
    let detail = match res.text().await {
        Ok(text) => serde_json::from_str::<ErrorDetail>(&text)
            .ok()
            .and_then(|d| d.message())
            .map(|msg| redact_secrets(&msg).into_owned()),
        Err(_) => None,
    };
    log::debug!("request failed with HTTP {code}");
    ApiError::Status {
        code,
        status: map_http_status(code),
        detail,
    }
}

impl ApiClient {
    pub fn new(config: ClientConfig) -> Result<Self, ApiError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()?;
        Ok(Self { config, http })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    async fn post_json<B, T>(&self, path: &str, bearer: Option<&str>, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let url = self.config.endpoint(path);
        log::debug!("POST {url}");

        let res = self
            .http
            .post(url)
            .headers(build_headers(bearer))
            .json(body)
            .send()
            .await?;

        if !res.status().is_success() {
            return Err(error_from_response(res).await);
        }

        if res.status() == StatusCode::NO_CONTENT {
            return Ok(serde_json::from_value(Value::Null)?);
        }

        let text = res.text().await?;
        if text.trim().is_empty() {
            return Ok(serde_json::from_value(Value::Null)?);
        }
        Ok(serde_json::from_str(&text)?)
    }
}

#[async_trait]
impl AuthApi for ApiClient {
    async fn login(&self, role: Role, credentials: &Credentials) -> Result<LoginResponse, ApiError> {
        self.post_json(role.login_path(), None, credentials).await
    }

    async fn signup(&self, data: &SignupData) -> Result<LoginResponse, ApiError> {
        self.post_json(SIGNUP_PATH, None, data).await
    }

    async fn refresh(&self, refresh_token: &str) -> Result<LoginResponse, ApiError> {
        self.post_json(REFRESH_PATH, None, &RefreshRequest { refresh_token })
            .await
    }
}

#[async_trait]
impl ProjectApi for ApiClient {
    async fn create_project(&self, bearer: Option<&str>, record: &Value) -> Result<Value, ApiError> {
        self.post_json(PROJECTS_PATH, bearer, record).await
    }
}
