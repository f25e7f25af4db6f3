//! Product attributes and their selectable options.

use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set};
use serde::Deserialize;
use tracing::{info, instrument};
use uuid::Uuid;

use models::{product_attribute as attribute, product_attribute_option as option};

use super::products;
use crate::errors::ServiceError;

#[derive(Clone, Debug, Deserialize)]
pub struct AttributeInput {
    pub name: String,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub options: Vec<OptionInput>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct OptionInput {
    pub name: String,
    #[serde(default)]
    pub value: Option<String>,
    #[serde(default)]
    pub price_change: i64,
}

/// Name/value patch shared by attributes and options.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct NamedUpdate {
    pub name: Option<String>,
    pub value: Option<String>,
    pub price_change: Option<i64>,
}

fn require_name(name: &str) -> Result<String, ServiceError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ServiceError::Validation("name required".into()));
    }
    Ok(name.to_string())
}

pub(crate) async fn insert_attribute<C: ConnectionTrait>(db: &C, product_id: Uuid, input: AttributeInput) -> Result<attribute::Model, ServiceError> {
    let name = require_name(&input.name)?;
    let dup = attribute::Entity::find()
        .filter(attribute::Column::ProductId.eq(product_id))
        .filter(attribute::Column::Name.eq(&name))
        .filter(attribute::Column::Active.eq(true))
        .one(db)
        .await?;
    if dup.is_some() {
        return Err(ServiceError::conflict("attribute_already_exists"));
    }
    let now = Utc::now().into();
    let created = attribute::ActiveModel {
        id: Set(Uuid::new_v4()),
        product_id: Set(product_id),
        name: Set(name),
        value: Set(input.value),
        active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await?;
    for opt in input.options {
        insert_option(db, created.id, opt).await?;
    }
    Ok(created)
}

pub(crate) async fn insert_option<C: ConnectionTrait>(db: &C, attribute_id: Uuid, input: OptionInput) -> Result<option::Model, ServiceError> {
    let name = require_name(&input.name)?;
    option::validate_price_change(input.price_change)?;
    let dup = option::Entity::find()
        .filter(option::Column::AttributeId.eq(attribute_id))
        .filter(option::Column::Name.eq(&name))
        .filter(option::Column::Active.eq(true))
        .one(db)
        .await?;
    if dup.is_some() {
        return Err(ServiceError::conflict("option_already_exists"));
    }
    let now = Utc::now().into();
    Ok(option::ActiveModel {
        id: Set(Uuid::new_v4()),
        attribute_id: Set(attribute_id),
        name: Set(name),
        value: Set(input.value),
        price_change: Set(input.price_change),
        active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await?)
}

// ---- attributes ----

pub async fn get_attribute(db: &DatabaseConnection, id: Uuid) -> Result<attribute::Model, ServiceError> {
    attribute::Entity::find_by_id(id)
        .filter(attribute::Column::Active.eq(true))
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::not_found("attribute_not_found"))
}

#[instrument(skip(db, input))]
pub async fn create_attribute(db: &DatabaseConnection, product_id: Uuid, input: AttributeInput) -> Result<attribute::Model, ServiceError> {
    models::product::Entity::find_by_id(product_id)
        .filter(models::product::Column::Active.eq(true))
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::not_found("product_not_found"))?;
    let created = insert_attribute(db, product_id, input).await?;
    info!(event = "attribute_created", attribute_id = %created.id);
    Ok(created)
}

pub async fn update_attribute(db: &DatabaseConnection, id: Uuid, input: NamedUpdate) -> Result<attribute::Model, ServiceError> {
    let mut am: attribute::ActiveModel = get_attribute(db, id).await?.into();
    if let Some(name) = input.name {
        am.name = Set(require_name(&name)?);
    }
    if input.value.is_some() {
        am.value = Set(input.value);
    }
    am.updated_at = Set(Utc::now().into());
    Ok(am.update(db).await?)
}

pub async fn deactivate_attribute(db: &DatabaseConnection, id: Uuid) -> Result<(), ServiceError> {
    let mut am: attribute::ActiveModel = get_attribute(db, id).await?.into();
    am.active = Set(false);
    am.updated_at = Set(Utc::now().into());
    am.update(db).await?;
    Ok(())
}

pub async fn list_attributes(db: &DatabaseConnection, slug: &str) -> Result<Vec<attribute::Model>, ServiceError> {
    let product = products::get_product(db, slug).await?;
    Ok(attribute::Entity::find()
        .filter(attribute::Column::ProductId.eq(product.id))
        .filter(attribute::Column::Active.eq(true))
        .order_by_asc(attribute::Column::Name)
        .all(db)
        .await?)
}

// ---- options ----

pub async fn get_option(db: &DatabaseConnection, id: Uuid) -> Result<option::Model, ServiceError> {
    option::Entity::find_by_id(id)
        .filter(option::Column::Active.eq(true))
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::not_found("option_not_found"))
}

#[instrument(skip(db, input))]
pub async fn create_option(db: &DatabaseConnection, attribute_id: Uuid, input: OptionInput) -> Result<option::Model, ServiceError> {
    get_attribute(db, attribute_id).await?;
    let created = insert_option(db, attribute_id, input).await?;
    info!(event = "option_created", option_id = %created.id);
    Ok(created)
}

pub async fn update_option(db: &DatabaseConnection, id: Uuid, input: NamedUpdate) -> Result<option::Model, ServiceError> {
    let mut am: option::ActiveModel = get_option(db, id).await?.into();
    if let Some(name) = input.name {
        am.name = Set(require_name(&name)?);
    }
    if input.value.is_some() {
        am.value = Set(input.value);
    }
    if let Some(change) = input.price_change {
        option::validate_price_change(change)?;
        am.price_change = Set(change);
    }
    am.updated_at = Set(Utc::now().into());
    Ok(am.update(db).await?)
}

pub async fn deactivate_option(db: &DatabaseConnection, id: Uuid) -> Result<(), ServiceError> {
    let mut am: option::ActiveModel = get_option(db, id).await?.into();
    am.active = Set(false);
    am.updated_at = Set(Utc::now().into());
    am.update(db).await?;
    Ok(())
}

pub async fn list_options(db: &DatabaseConnection, attribute_id: Uuid) -> Result<Vec<option::Model>, ServiceError> {
    Ok(option::Entity::find()
        .filter(option::Column::AttributeId.eq(attribute_id))
        .filter(option::Column::Active.eq(true))
        .order_by_asc(option::Column::Name)
        .all(db)
        .await?)
}

/// Active option ids selectable for a product, across all its attributes.
pub async fn option_ids_for_product<C: ConnectionTrait>(db: &C, product_id: Uuid) -> Result<Vec<Uuid>, ServiceError> {
    let attr_ids: Vec<Uuid> = attribute::Entity::find()
        .filter(attribute::Column::ProductId.eq(product_id))
        .filter(attribute::Column::Active.eq(true))
        .all(db)
        .await?
        .into_iter()
        .map(|a| a.id)
        .collect();
    if attr_ids.is_empty() {
        return Ok(Vec::new());
    }
    Ok(option::Entity::find()
        .filter(option::Column::AttributeId.is_in(attr_ids))
        .filter(option::Column::Active.eq(true))
        .all(db)
        .await?
        .into_iter()
        .map(|o| o.id)
        .collect())
}
