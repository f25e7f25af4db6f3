//! Coupons and their product mapping.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use sea_orm::{ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set};
use serde::{Deserialize, Deserializer};
use tracing::{info, instrument};
use uuid::Uuid;

use models::coupon::{self, CouponType};
use models::{coupon_product, product};

use crate::errors::ServiceError;
use crate::pricing::CouponTerms;

#[derive(Clone, Debug, Deserialize)]
pub struct CouponInput {
    pub coupon_type: CouponType,
    pub value: i64,
    #[serde(default)]
    pub max_value: Option<i64>,
    pub start_at: DateTime<Utc>,
    pub expire_at: DateTime<Utc>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct CouponUpdate {
    pub coupon_type: Option<CouponType>,
    pub value: Option<i64>,
    /// Absent keeps the cap, `null` removes it, a number replaces it.
    #[serde(default, deserialize_with = "present_or_null")]
    pub max_value: Option<Option<i64>>,
    pub start_at: Option<DateTime<Utc>>,
    pub expire_at: Option<DateTime<Utc>>,
}

/// Products to attach, by id and/or by slug.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ProductSelection {
    #[serde(default)]
    pub product_ids: Vec<Uuid>,
    #[serde(default)]
    pub slugs: Vec<String>,
}

fn present_or_null<'de, D>(deserializer: D) -> Result<Option<Option<i64>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<i64>::deserialize(deserializer).map(Some)
}

fn normalize_code(code: &str) -> Result<String, ServiceError> {
    let code = code.trim();
    if code.is_empty() || code.len() > 64 {
        return Err(ServiceError::Validation("coupon code must be 1..=64 characters".into()));
    }
    Ok(code.to_string())
}

pub(crate) async fn find_active<C: ConnectionTrait>(db: &C, code: &str) -> Result<Option<coupon::Model>, ServiceError> {
    Ok(coupon::Entity::find()
        .filter(coupon::Column::Code.eq(code.trim()))
        .filter(coupon::Column::Active.eq(true))
        .one(db)
        .await?)
}

pub async fn get_coupon(db: &DatabaseConnection, code: &str) -> Result<coupon::Model, ServiceError> {
    find_active(db, code).await?.ok_or_else(|| ServiceError::not_found("coupon_not_found"))
}

pub async fn list_coupons(db: &DatabaseConnection) -> Result<Vec<coupon::Model>, ServiceError> {
    Ok(coupon::Entity::find()
        .filter(coupon::Column::Active.eq(true))
        .order_by_desc(coupon::Column::CreatedAt)
        .all(db)
        .await?)
}

#[instrument(skip(db, input))]
pub async fn create_coupon(db: &DatabaseConnection, code: &str, input: CouponInput) -> Result<coupon::Model, ServiceError> {
    let code = normalize_code(code)?;
    let start = input.start_at.into();
    let expire = input.expire_at.into();
    coupon::validate(input.coupon_type, input.value, input.max_value, start, expire)?;
    let taken = coupon::Entity::find().filter(coupon::Column::Code.eq(&code)).one(db).await?;
    if taken.is_some() {
        return Err(ServiceError::conflict("coupon_already_exists"));
    }
    let now = Utc::now().into();
    let created = coupon::ActiveModel {
        id: Set(Uuid::new_v4()),
        code: Set(code),
        coupon_type: Set(input.coupon_type),
        value: Set(input.value),
        max_value: Set(input.max_value),
        start_at: Set(start),
        expire_at: Set(expire),
        active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await?;
    info!(event = "coupon_created", coupon_id = %created.id, code = %created.code);
    Ok(created)
}

pub async fn update_coupon(db: &DatabaseConnection, code: &str, input: CouponUpdate) -> Result<coupon::Model, ServiceError> {
    let current = get_coupon(db, code).await?;
    let coupon_type = input.coupon_type.unwrap_or(current.coupon_type);
    let value = input.value.unwrap_or(current.value);
    let max_value = input.max_value.unwrap_or(current.max_value);
    let start = input.start_at.map(Into::into).unwrap_or(current.start_at);
    let expire = input.expire_at.map(Into::into).unwrap_or(current.expire_at);
    coupon::validate(coupon_type, value, max_value, start, expire)?;

    let mut am: coupon::ActiveModel = current.into();
    am.coupon_type = Set(coupon_type);
    am.value = Set(value);
    am.max_value = Set(max_value);
    am.start_at = Set(start);
    am.expire_at = Set(expire);
    am.updated_at = Set(Utc::now().into());
    Ok(am.update(db).await?)
}

pub async fn deactivate_coupon(db: &DatabaseConnection, code: &str) -> Result<(), ServiceError> {
    let mut am: coupon::ActiveModel = get_coupon(db, code).await?.into();
    am.active = Set(false);
    am.updated_at = Set(Utc::now().into());
    am.update(db).await?;
    info!(event = "coupon_deactivated", %code);
    Ok(())
}

/// Attach products to a coupon. Returns every product id mapped afterwards.
#[instrument(skip(db, selection))]
pub async fn map_products(db: &DatabaseConnection, code: &str, selection: ProductSelection) -> Result<Vec<Uuid>, ServiceError> {
    let c = get_coupon(db, code).await?;
    if selection.product_ids.is_empty() && selection.slugs.is_empty() {
        return Err(ServiceError::validation("invalid_request"));
    }

    let mut wanted: Vec<Uuid> = Vec::new();
    for id in &selection.product_ids {
        let p = product::Entity::find_by_id(*id)
            .filter(product::Column::Active.eq(true))
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::not_found("product_not_found"))?;
        wanted.push(p.id);
    }
    for slug in &selection.slugs {
        let p = crate::catalog::products::get_product(db, slug).await?;
        wanted.push(p.id);
    }

    let mut mapped = mapped_products(db, c.id).await?;
    for id in wanted {
        if mapped.insert(id) {
            coupon_product::ActiveModel { coupon_id: Set(c.id), product_id: Set(id) }.insert(db).await?;
        }
    }
    info!(event = "coupon_mapped", coupon_id = %c.id, products = mapped.len());
    let mut out: Vec<Uuid> = mapped.into_iter().collect();
    out.sort();
    Ok(out)
}

pub async fn mapped_products<C: ConnectionTrait>(db: &C, coupon_id: Uuid) -> Result<HashSet<Uuid>, ServiceError> {
    Ok(coupon_product::Entity::find()
        .filter(coupon_product::Column::CouponId.eq(coupon_id))
        .all(db)
        .await?
        .into_iter()
        .map(|m| m.product_id)
        .collect())
}

/// Pricing view of an active coupon; `None` when it was deactivated or removed.
pub async fn terms<C: ConnectionTrait>(db: &C, coupon_id: Uuid) -> Result<Option<CouponTerms>, ServiceError> {
    let Some(c) = coupon::Entity::find_by_id(coupon_id).one(db).await? else {
        return Ok(None);
    };
    if !c.active {
        return Ok(None);
    }
    let ids = mapped_products(db, c.id).await?;
    Ok(Some(CouponTerms::from_model(&c, ids)))
}
