use chrono::Utc;
use sea_orm::{entity::prelude::*, ConnectionTrait, Set};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::ModelError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, Default)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    #[sea_orm(string_value = "male")]
    Male,
    #[sea_orm(string_value = "female")]
    Female,
    #[default]
    #[sea_orm(string_value = "other")]
    Other,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone_no: String,
    pub dob: Option<Date>,
    pub gender: Gender,
    pub active: bool,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Profile fields accepted at registration.
#[derive(Clone, Debug, Default)]
pub struct NewUser {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone_no: String,
    pub dob: Option<Date>,
    pub gender: Gender,
}

/// Minimal shape check: one `@`, non-empty local part, dotted domain.
pub fn validate_email(email: &str) -> Result<(), ModelError> {
    let mut parts = email.split('@');
    let ok = match (parts.next(), parts.next(), parts.next()) {
        (Some(local), Some(domain), None) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.chars().any(char::is_whitespace)
        }
        _ => false,
    };
    if ok { Ok(()) } else { Err(ModelError::Validation("invalid email".into())) }
}

/// Ten digits, first digit non-zero.
pub fn validate_phone(phone: &str) -> Result<(), ModelError> {
    let ok = phone.len() == 10
        && phone.chars().all(|c| c.is_ascii_digit())
        && !phone.starts_with('0');
    if ok { Ok(()) } else { Err(ModelError::Validation("invalid phone number".into())) }
}

pub fn validate_name(field: &str, value: &str) -> Result<(), ModelError> {
    let len = value.trim().chars().count();
    if len == 0 || len > 80 {
        return Err(ModelError::Validation(format!("{field} must be 1..=80 characters")));
    }
    Ok(())
}

pub async fn create<C: ConnectionTrait>(db: &C, new: NewUser) -> Result<Model, ModelError> {
    validate_email(&new.email)?;
    validate_name("first_name", &new.first_name)?;
    validate_name("last_name", &new.last_name)?;
    validate_phone(&new.phone_no)?;
    let now = Utc::now().into();
    let am = ActiveModel {
        id: Set(Uuid::new_v4()),
        email: Set(new.email.trim().to_lowercase()),
        first_name: Set(new.first_name.trim().to_string()),
        last_name: Set(new.last_name.trim().to_string()),
        phone_no: Set(new.phone_no),
        dob: Set(new.dob),
        gender: Set(new.gender),
        active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
    };
    Ok(am.insert(db).await?)
}

pub async fn find_by_email<C: ConnectionTrait>(db: &C, email: &str) -> Result<Option<Model>, ModelError> {
    Ok(Entity::find()
        .filter(Column::Email.eq(email.trim().to_lowercase()))
        .one(db)
        .await?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phone_rules() {
        assert!(validate_phone("9876543210").is_ok());
        assert!(validate_phone("0876543210").is_err());
        assert!(validate_phone("987654321").is_err());
        assert!(validate_phone("98765432a0").is_err());
    }

    #[test]
    fn email_rules() {
        assert!(validate_email("jane@shop.example").is_ok());
        assert!(validate_email("jane@shop").is_err());
        assert!(validate_email("@shop.example").is_err());
        assert!(validate_email("ja ne@shop.example").is_err());
        assert!(validate_email("a@b@c.com").is_err());
    }

    #[test]
    fn name_length_bounds() {
        assert!(validate_name("first_name", "Jane").is_ok());
        assert!(validate_name("first_name", "  ").is_err());
        assert!(validate_name("first_name", &"x".repeat(81)).is_err());
    }
}
