use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Developer,
    Buyer,
    Vvb,
    Registry,
    Admin,
    SuperAdmin,
}

impl Role {
    pub fn login_path(self) -> &'static str {
        match self {
            Self::Vvb => "/auth/vvb/login",
            Self::Registry => "/auth/registry/login",
            Self::Admin => "/auth/admin/login",
            Self::SuperAdmin => "/auth/superadmin/login",
            Self::Developer | Self::Buyer => "/auth/login",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
        }
    }
}

/// Roles open to self-service registration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SignupRole {
    Developer,
    Buyer,
}

#[derive(Debug, Clone, Serialize)]
pub struct SignupData {
    pub email: String,
    pub password: String,
    pub role: SignupRole,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub company: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

impl SignupData {
    pub fn new(
        email: impl Into<String>,
        password: impl Into<String>,
        role: SignupRole,
        name: impl Into<String>,
    ) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
            role,
            name: name.into(),
            company: None,
            phone: None,
        }
    }

    pub fn with_company(mut self, company: impl Into<String>) -> Self {
        self.company = Some(company.into());
        self
    }

    pub fn with_phone(mut self, phone: impl Into<String>) -> Self {
        self.phone = Some(phone.into());
        self
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RefreshRequest<'a> {
    pub refresh_token: &'a str,
}

/// Body returned by the login, signup and refresh endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub user: Value,
}

/// Last-known profile payload. Only a handful of fields are ever inspected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserRecord(Value);

impl UserRecord {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn as_json(&self) -> &Value {
        &self.0
    }

    pub fn into_json(self) -> Value {
        self.0
    }

    pub fn id(&self) -> Option<i64> {
        self.0.get("id")?.as_i64()
    }

    pub fn email(&self) -> Option<&str> {
        read_str(&self.0, "email")
    }

    pub fn role(&self) -> Option<&str> {
        read_str(&self.0, "role")
    }
}

fn read_str<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    let s = value.get(key)?.as_str()?.trim();
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ErrorDetail {
    #[serde(default)]
    pub detail: Option<Value>,
}

impl ErrorDetail {
    pub(crate) fn message(&self) -> Option<String> {
        match self.detail.as_ref()? {
            Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
            Value::Null => None,
            other => Some(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn login_response_tolerates_missing_optional_fields() {
        let parsed: LoginResponse =
            serde_json::from_value(json!({ "access_token": "a", "refresh_token": "r" })).unwrap();
        assert_eq!(parsed.access_token, "a");
        assert!(parsed.token_type.is_none());
        assert!(parsed.user.is_null());
    }

    #[test]
    fn user_record_reads_known_fields() {
        let user = UserRecord::new(json!({ "id": 7, "email": " dev@example.com ", "role": "DEVELOPER" }));
        assert_eq!(user.id(), Some(7));
        assert_eq!(user.email(), Some("dev@example.com"));
        assert_eq!(user.role(), Some("DEVELOPER"));
    }

    #[test]
    fn role_specific_login_paths() {
        assert_eq!(Role::Developer.login_path(), "/auth/login");
        assert_eq!(Role::Buyer.login_path(), "/auth/login");
        assert_eq!(Role::Vvb.login_path(), "/auth/vvb/login");
        assert_eq!(Role::Registry.login_path(), "/auth/registry/login");
        assert_eq!(Role::Admin.login_path(), "/auth/admin/login");
        assert_eq!(Role::SuperAdmin.login_path(), "/auth/superadmin/login");
    }

    #[test]
    fn signup_data_uses_backend_role_names_and_skips_unset_fields() {
        let data = SignupData::new("b@example.com", "pw", SignupRole::Buyer, "Asha").with_company("Acme");
        assert_eq!(
            serde_json::to_value(&data).unwrap(),
            json!({
                "email": "b@example.com",
                "password": "pw",
                "role": "BUYER",
                "name": "Asha",
                "company": "Acme",
            })
        );
    }

    #[test]
    fn error_detail_message_accepts_structured_detail() {
        let detail: ErrorDetail = serde_json::from_value(json!({ "detail": "Invalid token" })).unwrap();
        assert_eq!(detail.message().as_deref(), Some("Invalid token"));

        let detail: ErrorDetail = serde_json::from_value(json!({})).unwrap();
        assert_eq!(detail.message(), None);
    }
}
