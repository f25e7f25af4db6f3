//! Billing and shipping addresses owned by a user.

use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set};
use serde::Deserialize;
use tracing::{info, instrument};
use uuid::Uuid;

use models::address::{self, AddressType};

use crate::errors::ServiceError;

#[derive(Clone, Debug, Deserialize)]
pub struct AddressInput {
    pub address_type: AddressType,
    pub address_line_1: String,
    #[serde(default)]
    pub address_line_2: Option<String>,
    pub city: String,
    pub state: String,
    pub country: String,
}

/// Partial update; absent fields keep their value.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct AddressUpdate {
    pub id: Uuid,
    pub address_type: Option<AddressType>,
    pub address_line_1: Option<String>,
    pub address_line_2: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub country: Option<String>,
}

pub async fn list_addresses(db: &DatabaseConnection, user_id: Uuid) -> Result<Vec<address::Model>, ServiceError> {
    Ok(address::Entity::find()
        .filter(address::Column::UserId.eq(user_id))
        .filter(address::Column::Active.eq(true))
        .order_by_asc(address::Column::CreatedAt)
        .all(db)
        .await?)
}

/// Active address owned by `user_id`.
pub async fn find_owned<C: ConnectionTrait>(db: &C, user_id: Uuid, id: Uuid) -> Result<address::Model, ServiceError> {
    address::Entity::find_by_id(id)
        .filter(address::Column::UserId.eq(user_id))
        .filter(address::Column::Active.eq(true))
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::not_found("address_not_found"))
}

#[instrument(skip(db, input))]
pub async fn create_address(db: &DatabaseConnection, user_id: Uuid, input: AddressInput) -> Result<address::Model, ServiceError> {
    address::validate_lines(&input.address_line_1, &input.city, &input.state, &input.country)?;
    let now = Utc::now().into();
    let created = address::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        address_type: Set(input.address_type),
        address_line_1: Set(input.address_line_1.trim().to_string()),
        address_line_2: Set(input.address_line_2),
        city: Set(input.city.trim().to_string()),
        state: Set(input.state.trim().to_string()),
        country: Set(input.country.trim().to_string()),
        active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await?;
    info!(event = "address_created", address_id = %created.id);
    Ok(created)
}

#[instrument(skip(db, input), fields(address_id = %input.id))]
pub async fn update_address(db: &DatabaseConnection, user_id: Uuid, input: AddressUpdate) -> Result<address::Model, ServiceError> {
    let current = find_owned(db, user_id, input.id).await?;
    let line_1 = input.address_line_1.unwrap_or_else(|| current.address_line_1.clone());
    let city = input.city.unwrap_or_else(|| current.city.clone());
    let state = input.state.unwrap_or_else(|| current.state.clone());
    let country = input.country.unwrap_or_else(|| current.country.clone());
    address::validate_lines(&line_1, &city, &state, &country)?;

    let mut am: address::ActiveModel = current.into();
    if let Some(t) = input.address_type {
        am.address_type = Set(t);
    }
    if input.address_line_2.is_some() {
        am.address_line_2 = Set(input.address_line_2);
    }
    am.address_line_1 = Set(line_1);
    am.city = Set(city);
    am.state = Set(state);
    am.country = Set(country);
    am.updated_at = Set(Utc::now().into());
    Ok(am.update(db).await?)
}

pub async fn deactivate_address(db: &DatabaseConnection, user_id: Uuid, id: Uuid) -> Result<(), ServiceError> {
    let mut am: address::ActiveModel = find_owned(db, user_id, id).await?.into();
    am.active = Set(false);
    am.updated_at = Set(Utc::now().into());
    am.update(db).await?;
    info!(event = "address_deactivated", address_id = %id);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{get_db, seed_user};

    fn input() -> AddressInput {
        AddressInput {
            address_type: AddressType::Shipping,
            address_line_1: "12 Market Road".into(),
            address_line_2: None,
            city: "Pune".into(),
            state: "MH".into(),
            country: "IN".into(),
        }
    }

    #[tokio::test]
    async fn address_crud_is_owner_scoped() -> Result<(), anyhow::Error> {
        let db = get_db().await?;
        let owner = seed_user(&db, "owner@shop.example").await?;
        let other = seed_user(&db, "other@shop.example").await?;

        let a = create_address(&db, owner.id, input()).await?;
        assert_eq!(list_addresses(&db, owner.id).await?.len(), 1);
        assert!(list_addresses(&db, other.id).await?.is_empty());

        let upd = AddressUpdate { id: a.id, city: Some("Mumbai".into()), ..Default::default() };
        assert_eq!(update_address(&db, owner.id, upd.clone()).await?.city, "Mumbai");
        assert!(matches!(update_address(&db, other.id, upd).await, Err(ServiceError::NotFound(_))));

        let blank = AddressUpdate { id: a.id, city: Some(" ".into()), ..Default::default() };
        assert!(matches!(update_address(&db, owner.id, blank).await, Err(ServiceError::Model(_))));

        deactivate_address(&db, owner.id, a.id).await?;
        assert!(list_addresses(&db, owner.id).await?.is_empty());
        assert!(matches!(deactivate_address(&db, owner.id, a.id).await, Err(ServiceError::NotFound(_))));
        Ok(())
    }
}
