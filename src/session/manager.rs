use super::expiry::{
    compute_expiry, format_expiry, format_remaining, parse_expiry, Clock, SystemClock,
};
use crate::api::{ApiError, AuthApi, HttpErrorStatus};
use crate::error::{Error, Result};
use crate::redact::redact_secrets;
use crate::store::{
    KeyValueStore, StoreError, KEY_REFRESH_TOKEN, KEY_REMEMBER_ME, KEY_TOKEN, KEY_TOKEN_EXPIRY,
    KEY_USER, SESSION_KEYS,
};
use crate::types::{Credentials, LoginResponse, Role, SignupData, UserRecord};
use serde_json::Value;
use std::sync::Arc;
use time::OffsetDateTime;
use tokio::sync::Mutex;

const DEFAULT_LOGIN_ERROR: &str = "Invalid email or password";
const DEFAULT_SIGNUP_ERROR: &str = "Registration failed. Please try again.";

/// Sole owner of the persisted session record.
///
/// Every read of the token or user goes through here so an expired session is
/// torn down in one place. Refresh only ever happens in [`SessionManager::ensure_valid`].
pub struct SessionManager {
    store: Arc<dyn KeyValueStore>,
    auth: Arc<dyn AuthApi>,
    clock: Arc<dyn Clock>,
    refresh_gate: Mutex<()>,
}

impl SessionManager {
    pub fn new(store: Arc<dyn KeyValueStore>, auth: Arc<dyn AuthApi>) -> Self {
        Self::with_clock(store, auth, Arc::new(SystemClock))
    }

    pub fn with_clock(
        store: Arc<dyn KeyValueStore>,
        auth: Arc<dyn AuthApi>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            auth,
            clock,
            refresh_gate: Mutex::new(()),
        }
    }

    fn now(&self) -> OffsetDateTime {
        self.clock.now()
    }

    pub fn expires_at(&self) -> Option<OffsetDateTime> {
        parse_expiry(&self.store.get_string(KEY_TOKEN_EXPIRY)?)
    }

    pub fn is_valid(&self) -> bool {
        if self.store.get_string(KEY_TOKEN).is_none() {
            return false;
        }
        match self.expires_at() {
            Some(expires_at) => self.now() < expires_at,
            None => false,
        }
    }

    pub fn remember_me_selected(&self) -> bool {
        self.store.get_string(KEY_REMEMBER_ME).as_deref() == Some("true")
    }

    /// Returns true when the session is usable, refreshing it once if needed.
    ///
    /// A failed refresh leaves the stale record in place; the next [`token`](Self::token)
    /// or [`user`](Self::user) read clears it.
    pub async fn ensure_valid(&self) -> bool {
        if self.is_valid() {
            return true;
        }

        let _gate = self.refresh_gate.lock().await;
        if self.is_valid() {
            return true;
        }

        let Some(refresh_token) = self.store.get_string(KEY_REFRESH_TOKEN) else {
            return false;
        };

        log::debug!("session expired, attempting token refresh");
        let response = match self.auth.refresh(&refresh_token).await {
            Ok(response) => response,
            Err(e) => {
                log::warn!("token refresh failed: {}", redact_secrets(&describe(&e)));
                return false;
            }
        };

        let remember_me = self.remember_me_selected();
        match self.write_session(&response, remember_me) {
            Ok(()) => true,
            Err(e) => {
                log::warn!("failed to persist refreshed session: {e}");
                false
            }
        }
    }

    pub fn token(&self) -> Option<String> {
        if !self.is_valid() {
            self.end_session();
            return None;
        }
        self.store.get_string(KEY_TOKEN)
    }

    pub fn bearer_header(&self) -> Option<String> {
        self.token().map(|token| format!("Bearer {token}"))
    }

    /// Malformed user JSON reads as `None` without ending the session.
    pub fn user(&self) -> Option<UserRecord> {
        if !self.is_valid() {
            self.end_session();
            return None;
        }
        let raw = self.store.get_string(KEY_USER)?;
        match serde_json::from_str::<Value>(&raw) {
            Ok(Value::Null) => None,
            Ok(value) => Some(UserRecord::new(value)),
            Err(_) => {
                log::debug!("stored user record is not valid json");
                None
            }
        }
    }

    pub fn start_session(&self, response: &LoginResponse, remember_me: bool) -> Result<()> {
        if let Err(e) = self.write_session(response, remember_me) {
            self.end_session();
            return Err(e.into());
        }
        if remember_me {
            self.store.set(KEY_REMEMBER_ME, "true")?;
        } else {
            self.store.remove(KEY_REMEMBER_ME)?;
        }
        Ok(())
    }

    pub fn end_session(&self) {
        for key in SESSION_KEYS {
            if let Err(e) = self.store.remove(key) {
                log::warn!("failed to clear {key}: {e}");
            }
        }
    }

    pub fn remaining_time(&self) -> Option<String> {
        format_remaining(self.now(), self.expires_at()?)
    }

    /// Logs in through the role's endpoint and starts a session from the response.
    ///
    /// Rejected credentials (401/403) become [`Error::Auth`]; any other failure
    /// is passed through as [`Error::Api`].
    pub async fn login(
        &self,
        role: Role,
        credentials: &Credentials,
        remember_me: bool,
    ) -> Result<Option<UserRecord>> {
        let response = match self.auth.login(role, credentials).await {
            Ok(response) => response,
            Err(ApiError::Status {
                status: HttpErrorStatus::Unauthorized,
                detail,
                ..
            }) => {
                return Err(Error::Auth(
                    detail.unwrap_or_else(|| DEFAULT_LOGIN_ERROR.to_string()),
                ));
            }
            Err(e) => return Err(e.into()),
        };

        self.start_session(&response, remember_me)?;
        log::info!("session started for {role:?}");
        Ok(self.user())
    }

    /// Registers a developer or buyer account. The backend answers with a token
    /// pair, so a successful signup is also a login.
    pub async fn signup(&self, data: &SignupData, remember_me: bool) -> Result<Option<UserRecord>> {
        let response = match self.auth.signup(data).await {
            Ok(response) => response,
            Err(ApiError::Status { code, detail, .. }) if (400..500).contains(&code) && code != 429 => {
                return Err(Error::Auth(
                    detail.unwrap_or_else(|| DEFAULT_SIGNUP_ERROR.to_string()),
                ));
            }
            Err(e) => return Err(e.into()),
        };

        self.start_session(&response, remember_me)?;
        log::info!("account registered as {:?}", data.role);
        Ok(self.user())
    }

    fn write_session(
        &self,
        response: &LoginResponse,
        remember_me: bool,
    ) -> std::result::Result<(), StoreError> {
        let expires_at = compute_expiry(self.now(), remember_me);
        let user = serde_json::to_string(&response.user)?;

        self.store.set(KEY_TOKEN, &response.access_token)?;
        self.store.set(KEY_REFRESH_TOKEN, &response.refresh_token)?;
        self.store.set(KEY_TOKEN_EXPIRY, &format_expiry(expires_at))?;
        self.store.set(KEY_USER, &user)?;
        Ok(())
    }
}

fn describe(err: &ApiError) -> String {
    match err {
        ApiError::Status { code, detail, .. } => match detail {
            Some(detail) => format!("HTTP {code}: {detail}"),
            None => format!("HTTP {code}"),
        },
        other => other.to_string(),
    }
}
