use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Account role. Serialized in lowercase, matching the backend enum values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Superadmin,
    Admin,
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Superadmin => "superadmin",
            Role::Admin => "admin",
            Role::User => "user",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "superadmin" => Ok(Role::Superadmin),
            "admin" => Ok(Role::Admin),
            "user" => Ok(Role::User),
            other => Err(format!(
                "Invalid role '{}'. Must be: superadmin, admin, or user",
                other
            )),
        }
    }
}

/// Account as returned by `/users/me`, `/users` and `/superadmin/admins`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub role: Role,
    pub is_active: bool,
    pub full_name: Option<String>,
    pub company_name: Option<String>,
    pub can_create_users: bool,
    pub user_creation_limit: i64,
    pub created_at: NaiveDateTime,
    #[serde(default)]
    pub last_login: Option<NaiveDateTime>,
    /// Only populated for admins.
    #[serde(default)]
    pub users_created_count: Option<i64>,
    /// Only populated for users who have not accepted their invite yet.
    #[serde(default)]
    pub pending_invite_token: Option<String>,
    #[serde(default)]
    pub status_locked: bool,
}

impl User {
    pub fn display_name(&self) -> &str {
        self.full_name.as_deref().unwrap_or(&self.email)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invitation {
    pub id: i64,
    pub email: String,
    pub expires_at: NaiveDateTime,
    pub is_used: bool,
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default = "default_token_type")]
    pub token_type: String,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

/// `POST /auth/login` response: tokens plus the full user record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: TokenPair,
    pub user: User,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminRegister {
    pub full_name: String,
    pub email: String,
    pub password: String,
    pub company_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminCreate {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminSettingsUpdate {
    pub can_create_users: bool,
    pub user_creation_limit: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvitationCreate {
    pub email: String,
    pub role: Role,
    pub full_name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub is_active: bool,
}

/// Generic `{"message": "..."}` acknowledgement.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_round_trips_lowercase() {
        assert_eq!(serde_json::to_string(&Role::Superadmin).unwrap(), "\"superadmin\"");
        let role: Role = serde_json::from_str("\"admin\"").unwrap();
        assert_eq!(role, Role::Admin);
        assert_eq!("User".parse::<Role>().unwrap(), Role::User);
        assert!("root".parse::<Role>().is_err());
    }

    #[test]
    fn user_parses_backend_payload() {
        let json = r#"{
            "id": 7,
            "email": "ops@example.com",
            "role": "admin",
            "is_active": true,
            "full_name": null,
            "company_name": "Acme",
            "can_create_users": true,
            "user_creation_limit": 5,
            "created_at": "2024-05-01T09:30:00.123456",
            "last_login": null,
            "users_created_count": 2,
            "pending_invite_token": null,
            "status_locked": false
        }"#;
        let user: User = serde_json::from_str(json).unwrap();
        assert_eq!(user.id, 7);
        assert_eq!(user.role, Role::Admin);
        assert_eq!(user.users_created_count, Some(2));
        assert_eq!(user.display_name(), "ops@example.com");
    }

    #[test]
    fn token_pair_defaults_token_type() {
        let pair: TokenPair =
            serde_json::from_str(r#"{"access_token":"a","refresh_token":"r"}"#).unwrap();
        assert_eq!(pair.token_type, "bearer");
    }
}
