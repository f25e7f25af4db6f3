use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use models::user::Gender;
use models::user_session::SessionType;

/// Registration input
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RegisterInput {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 80))]
    pub first_name: String,
    #[validate(length(min = 1, max = 80))]
    pub last_name: String,
    #[validate(length(equal = 10))]
    pub phone_no: String,
    #[serde(default)]
    pub dob: Option<NaiveDate>,
    #[serde(default)]
    pub gender: Option<Gender>,
    #[validate(length(min = 8))]
    pub password: String,
}

/// Login input
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct LoginInput {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
    #[serde(default, rename = "type")]
    pub session_type: Option<SessionType>,
}

/// Domain user (business view)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AuthUser {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone_no: String,
}

/// Domain credentials (hashed)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub user_id: Uuid,
    pub password_hash: String,
    pub password_algorithm: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Confirmation {
    pub id: String,
    pub user_id: Uuid,
    pub expire_at: i64,
    pub confirmed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfirmationStatus {
    pub current_time: i64,
    pub confirmation: Vec<Confirmation>,
}

/// A login session for one client type.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Session {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub ip: String,
    pub session_type: SessionType,
}

/// Login result (tokens plus a human note about session state)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginResult {
    pub access_token: String,
    pub refresh_token: String,
    pub note: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

/// JWT claims for access and refresh tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// user id
    pub sub: Uuid,
    pub fresh: bool,
    pub kind: TokenKind,
    pub jti: Uuid,
    pub exp: i64,
    pub iat: i64,
}

impl From<models::user::Model> for AuthUser {
    fn from(u: models::user::Model) -> Self {
        AuthUser { id: u.id, email: u.email, first_name: u.first_name, last_name: u.last_name, phone_no: u.phone_no }
    }
}

impl From<models::user_confirmation::Model> for Confirmation {
    fn from(c: models::user_confirmation::Model) -> Self {
        Confirmation { id: c.id, user_id: c.user_id, expire_at: c.expire_at, confirmed: c.confirmed }
    }
}

impl From<models::user_session::Model> for Session {
    fn from(s: models::user_session::Model) -> Self {
        Session { id: s.id, user_id: s.user_id, ip: s.ip, session_type: s.session_type }
    }
}
