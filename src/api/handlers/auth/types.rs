//! Request/response types for auth endpoints.

use crate::token::Role;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub full_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    /// Defaults to `tenant` when omitted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct LogoutRequest {
    pub refresh_token: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct UpdateProfileRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct UserSummary {
    pub id: String,
    pub email: String,
    pub full_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    pub role: Role,
    pub is_active: bool,
    pub is_verified: bool,
    pub created_at: String,
    pub updated_at: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct TokenPairResponse {
    pub access_token: String,
    pub refresh_token: String,
    /// Always `bearer`.
    pub token_type: String,
    /// Access-token lifetime in seconds.
    pub expires_in: i64,
    pub user: UserSummary,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ErrorResponse {
    pub error: String,
}

impl ErrorResponse {
    pub(crate) fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

/// 422 body: one entry per failed field so clients can annotate forms.
#[derive(ToSchema, Serialize, Deserialize, Debug)]
pub struct ValidationErrorResponse {
    pub error: String,
    pub fields: Vec<FieldError>,
}

impl ValidationErrorResponse {
    pub(crate) fn new(fields: Vec<FieldError>) -> Self {
        Self {
            error: "Validation failed".to_string(),
            fields,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_pair_serializes_bearer_shape() -> anyhow::Result<()> {
        let pair = TokenPairResponse {
            access_token: "a".to_string(),
            refresh_token: "r".to_string(),
            token_type: "bearer".to_string(),
            expires_in: 3600,
            user: UserSummary {
                id: "id".to_string(),
                email: "alice@example.com".to_string(),
                full_name: "Alice".to_string(),
                phone: None,
                role: Role::Tenant,
                is_active: true,
                is_verified: false,
                created_at: "2026-01-01".to_string(),
                updated_at: "2026-01-01".to_string(),
            },
        };
        let value = serde_json::to_value(&pair)?;
        assert_eq!(
            value.get("token_type").and_then(|v| v.as_str()),
            Some("bearer")
        );
        assert_eq!(value.get("expires_in").and_then(|v| v.as_i64()), Some(3600));
        assert_eq!(
            value.pointer("/user/role").and_then(|v| v.as_str()),
            Some("tenant")
        );
        // The summary never includes the password hash.
        assert!(value.pointer("/user/password_hash").is_none());
        Ok(())
    }

    #[test]
    fn register_request_accepts_missing_optionals() -> anyhow::Result<()> {
        let request: RegisterRequest = serde_json::from_value(serde_json::json!({
            "email": "bob@example.com",
            "password": "Str0ng!Pass",
            "full_name": "Bob",
        }))?;
        assert_eq!(request.phone, None);
        assert!(request.role.is_none());
        Ok(())
    }

    #[test]
    fn validation_error_lists_fields() -> anyhow::Result<()> {
        let response = ValidationErrorResponse::new(vec![FieldError {
            field: "password".to_string(),
            message: "must contain a digit".to_string(),
        }]);
        let value = serde_json::to_value(&response)?;
        assert_eq!(
            value.pointer("/fields/0/field").and_then(|v| v.as_str()),
            Some("password")
        );
        Ok(())
    }
}
