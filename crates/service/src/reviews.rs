//! Product reviews, one per user and product.

use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set};
use serde::Deserialize;
use tracing::{info, instrument};
use uuid::Uuid;

use models::{product, review};

use crate::errors::ServiceError;

#[derive(Clone, Debug, Deserialize)]
pub struct ReviewInput {
    pub ratings: i16,
    #[serde(default)]
    pub comments: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct ReviewUpdate {
    pub ratings: Option<i16>,
    pub comments: Option<String>,
}

fn active_reviews(product_id: Uuid) -> sea_orm::Select<review::Entity> {
    review::Entity::find()
        .filter(review::Column::ProductId.eq(product_id))
        .filter(review::Column::Active.eq(true))
        .order_by_asc(review::Column::CreatedAt)
}

/// First active review of a product.
pub async fn get_review(db: &DatabaseConnection, product_id: Uuid) -> Result<review::Model, ServiceError> {
    active_reviews(product_id)
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::not_found("review_not_found"))
}

pub async fn list_reviews(db: &DatabaseConnection, product_id: Uuid) -> Result<Vec<review::Model>, ServiceError> {
    let list = active_reviews(product_id).all(db).await?;
    if list.is_empty() {
        return Err(ServiceError::not_found("review_not_found"));
    }
    Ok(list)
}

async fn find_own(db: &DatabaseConnection, user_id: Uuid, product_id: Uuid) -> Result<Option<review::Model>, ServiceError> {
    Ok(review::Entity::find()
        .filter(review::Column::ProductId.eq(product_id))
        .filter(review::Column::UserId.eq(user_id))
        .filter(review::Column::Active.eq(true))
        .one(db)
        .await?)
}

#[instrument(skip(db, input))]
pub async fn create_review(db: &DatabaseConnection, user_id: Uuid, product_id: Uuid, input: ReviewInput) -> Result<review::Model, ServiceError> {
    review::validate_ratings(input.ratings)?;
    product::Entity::find_by_id(product_id)
        .filter(product::Column::Active.eq(true))
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::not_found("product_not_found"))?;
    if find_own(db, user_id, product_id).await?.is_some() {
        return Err(ServiceError::conflict("review_already_exists"));
    }
    let now = Utc::now().into();
    let created = review::ActiveModel {
        id: Set(Uuid::new_v4()),
        product_id: Set(product_id),
        user_id: Set(user_id),
        ratings: Set(input.ratings),
        comments: Set(input.comments),
        active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await?;
    info!(event = "review_created", review_id = %created.id, ratings = created.ratings);
    Ok(created)
}

pub async fn update_review(db: &DatabaseConnection, user_id: Uuid, product_id: Uuid, input: ReviewUpdate) -> Result<review::Model, ServiceError> {
    let current = find_own(db, user_id, product_id)
        .await?
        .ok_or_else(|| ServiceError::not_found("review_not_found"))?;
    let mut am: review::ActiveModel = current.into();
    if let Some(r) = input.ratings {
        review::validate_ratings(r)?;
        am.ratings = Set(r);
    }
    if input.comments.is_some() {
        am.comments = Set(input.comments);
    }
    am.updated_at = Set(Utc::now().into());
    Ok(am.update(db).await?)
}

pub async fn deactivate_review(db: &DatabaseConnection, user_id: Uuid, product_id: Uuid) -> Result<(), ServiceError> {
    let current = find_own(db, user_id, product_id)
        .await?
        .ok_or_else(|| ServiceError::not_found("review_not_found"))?;
    let mut am: review::ActiveModel = current.into();
    am.active = Set(false);
    am.updated_at = Set(Utc::now().into());
    am.update(db).await?;
    Ok(())
}
