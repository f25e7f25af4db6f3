//! Category tree. `root` addresses the top level.

use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set};
use serde::Deserialize;
use tracing::{info, instrument};
use uuid::Uuid;

use models::product_category as category;

use crate::errors::ServiceError;

#[derive(Clone, Debug, Deserialize)]
pub struct CategoryInput {
    pub name: String,
    #[serde(default)]
    pub value: Option<String>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct CategoryUpdate {
    pub name: Option<String>,
    pub value: Option<String>,
}

/// Parse a path segment: `root` or a category id.
pub fn parse_parent(raw: &str) -> Result<Option<Uuid>, ServiceError> {
    if raw.eq_ignore_ascii_case("root") {
        return Ok(None);
    }
    Uuid::parse_str(raw)
        .map(Some)
        .map_err(|_| ServiceError::validation("invalid_request"))
}

// 分类缺失沿用 409
pub async fn get_category(db: &DatabaseConnection, id: Uuid) -> Result<category::Model, ServiceError> {
    category::Entity::find_by_id(id)
        .filter(category::Column::Active.eq(true))
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::conflict("category_not_found"))
}

pub async fn list_children(db: &DatabaseConnection, parent: Option<Uuid>) -> Result<Vec<category::Model>, ServiceError> {
    let q = match parent {
        Some(p) => category::Entity::find().filter(category::Column::ParentId.eq(p)),
        None => category::Entity::find().filter(category::Column::ParentId.is_null()),
    };
    Ok(q.filter(category::Column::Active.eq(true))
        .order_by_asc(category::Column::Name)
        .all(db)
        .await?)
}

#[instrument(skip(db, input), fields(name = %input.name))]
pub async fn create_category(db: &DatabaseConnection, parent: Option<Uuid>, input: CategoryInput) -> Result<category::Model, ServiceError> {
    category::validate_name(&input.name)?;
    if let Some(p) = parent {
        get_category(db, p).await?;
    }
    let name = input.name.trim().to_string();
    let dup = list_children(db, parent).await?.into_iter().any(|c| c.name == name);
    if dup {
        return Err(ServiceError::conflict("category_already_exists"));
    }
    let now = Utc::now().into();
    let created = category::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name),
        value: Set(input.value),
        parent_id: Set(parent),
        active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await?;
    info!(event = "category_created", category_id = %created.id);
    Ok(created)
}

pub async fn update_category(db: &DatabaseConnection, id: Uuid, input: CategoryUpdate) -> Result<category::Model, ServiceError> {
    let mut am: category::ActiveModel = get_category(db, id).await?.into();
    if let Some(name) = input.name {
        category::validate_name(&name)?;
        am.name = Set(name.trim().to_string());
    }
    if input.value.is_some() {
        am.value = Set(input.value);
    }
    am.updated_at = Set(Utc::now().into());
    Ok(am.update(db).await?)
}

pub async fn deactivate_category(db: &DatabaseConnection, id: Uuid) -> Result<(), ServiceError> {
    let mut am: category::ActiveModel = get_category(db, id).await?.into();
    am.active = Set(false);
    am.updated_at = Set(Utc::now().into());
    am.update(db).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::get_db;

    fn named(n: &str) -> CategoryInput {
        CategoryInput { name: n.into(), value: None }
    }

    #[test]
    fn parent_parsing() {
        assert_eq!(parse_parent("root").unwrap(), None);
        assert!(parse_parent("nope").is_err());
    }

    #[tokio::test]
    async fn tree_operations() -> Result<(), anyhow::Error> {
        let db = get_db().await?;
        let home = create_category(&db, None, named("Home")).await?;
        assert!(matches!(create_category(&db, None, named("Home")).await, Err(ServiceError::Conflict(_))));

        let kitchen = create_category(&db, Some(home.id), named("Kitchen")).await?;
        // same name under a different parent is fine
        create_category(&db, Some(kitchen.id), named("Home")).await?;

        assert_eq!(list_children(&db, None).await?.len(), 1);
        assert_eq!(list_children(&db, Some(home.id)).await?[0].id, kitchen.id);

        let upd = update_category(&db, kitchen.id, CategoryUpdate { name: Some("Cookware".into()), value: None }).await?;
        assert_eq!(upd.name, "Cookware");

        deactivate_category(&db, kitchen.id).await?;
        assert!(matches!(get_category(&db, kitchen.id).await, Err(ServiceError::Conflict(_))));
        assert!(create_category(&db, Some(Uuid::new_v4()), named("Orphan")).await.is_err());
        Ok(())
    }
}
