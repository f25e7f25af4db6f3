//! Role catalog and user/role assignment.

use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set};
use serde::Serialize;
use tracing::{info, instrument};
use uuid::Uuid;

use models::{user, user_role, user_role_assignment};

use crate::errors::ServiceError;

/// Per-email outcome of a bulk role assignment.
#[derive(Clone, Debug, Default, Serialize, PartialEq)]
pub struct AssignReport {
    #[serde(rename = "Success")]
    pub success: Vec<String>,
    #[serde(rename = "Already Assigned")]
    pub already_assigned: Vec<String>,
    #[serde(rename = "User not found")]
    pub user_not_found: Vec<String>,
}

pub async fn list_roles(db: &DatabaseConnection) -> Result<Vec<String>, ServiceError> {
    let roles = user_role::Entity::find()
        .filter(user_role::Column::Active.eq(true))
        .order_by_asc(user_role::Column::Role)
        .all(db)
        .await?;
    if roles.is_empty() {
        return Err(ServiceError::not_found("role_not_found"));
    }
    Ok(roles.into_iter().map(|r| r.role).collect())
}

#[instrument(skip(db))]
pub async fn create_role(db: &DatabaseConnection, role: &str) -> Result<user_role::Model, ServiceError> {
    if user_role::find_by_name(db, role).await?.is_some() {
        return Err(ServiceError::conflict("role_already_exists"));
    }
    let created = user_role::create(db, role).await?;
    info!(event = "role_created", role = %created.role);
    Ok(created)
}

/// Assign `role` to every email; unknown emails are reported, not fatal.
#[instrument(skip(db, emails), fields(count = emails.len()))]
pub async fn assign_role(db: &DatabaseConnection, role: &str, emails: &[String]) -> Result<AssignReport, ServiceError> {
    let role = user_role::find_by_name(db, role)
        .await?
        .filter(|r| r.active)
        .ok_or_else(|| ServiceError::not_found("role_not_found"))?;

    let mut report = AssignReport::default();
    for email in emails {
        let Some(u) = user::find_by_email(db, email).await? else {
            report.user_not_found.push(email.clone());
            continue;
        };
        let existing = user_role_assignment::Entity::find_by_id((u.id, role.id)).one(db).await?;
        if existing.is_some() {
            report.already_assigned.push(email.clone());
            continue;
        }
        user_role_assignment::ActiveModel {
            user_id: Set(u.id),
            role_id: Set(role.id),
            created_at: Set(Utc::now().into()),
        }
        .insert(db)
        .await?;
        report.success.push(email.clone());
    }
    info!(event = "roles_assigned", role = %role.role, ok = report.success.len());
    Ok(report)
}

pub async fn roles_of(db: &DatabaseConnection, user_id: Uuid) -> Result<Vec<String>, ServiceError> {
    let rows = user_role_assignment::Entity::find()
        .filter(user_role_assignment::Column::UserId.eq(user_id))
        .find_also_related(user_role::Entity)
        .all(db)
        .await?;
    Ok(rows
        .into_iter()
        .filter_map(|(_, r)| r.filter(|r| r.active).map(|r| r.role))
        .collect())
}

pub async fn user_has_any_role(db: &DatabaseConnection, user_id: Uuid, roles: &[&str]) -> Result<bool, ServiceError> {
    let held = roles_of(db, user_id).await?;
    Ok(held.iter().any(|r| roles.contains(&r.as_str())))
}

/// Create `admin` and `shop_keeper` when missing. Run at startup.
pub async fn ensure_default_roles(db: &DatabaseConnection) -> Result<(), ServiceError> {
    for name in [user_role::ADMIN, user_role::SHOP_KEEPER] {
        if user_role::find_by_name(db, name).await?.is_none() {
            user_role::create(db, name).await?;
            info!(event = "role_seeded", role = name);
        }
    }
    Ok(())
}
