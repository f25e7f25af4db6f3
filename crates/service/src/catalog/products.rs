use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use models::product;

use super::attributes::{self, AttributeInput};
use crate::errors::ServiceError;
use crate::pagination::{Page, Pagination};

/// Product with optional nested attributes (and their options).
#[derive(Clone, Debug, Deserialize)]
pub struct ProductInput {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub price: i64,
    #[serde(default)]
    pub category_id: Option<Uuid>,
    #[serde(default)]
    pub attributes: Vec<AttributeInput>,
}

impl ProductInput {
    pub fn new(name: impl Into<String>, price: i64) -> Self {
        Self { name: name.into(), description: None, price, category_id: None, attributes: Vec::new() }
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub description: Option<String>,
    pub price: Option<i64>,
    pub category_id: Option<Uuid>,
}

#[derive(Clone, Debug, Serialize)]
pub struct BulkError {
    pub product: serde_json::Value,
    pub error: String,
}

#[derive(Clone, Debug, Default, Serialize)]
pub struct BulkReport {
    pub created_products: Vec<product::Model>,
    pub error_products: Vec<BulkError>,
}

pub async fn get_product(db: &DatabaseConnection, slug: &str) -> Result<product::Model, ServiceError> {
    find_active(db, slug).await?.ok_or_else(|| ServiceError::not_found("product_not_found"))
}

pub(crate) async fn find_active<C: ConnectionTrait>(db: &C, slug: &str) -> Result<Option<product::Model>, ServiceError> {
    Ok(product::Entity::find()
        .filter(product::Column::Slug.eq(slug))
        .filter(product::Column::Active.eq(true))
        .one(db)
        .await?)
}

async fn insert_product<C: ConnectionTrait>(db: &C, input: ProductInput) -> Result<product::Model, ServiceError> {
    let name = input.name.trim();
    if name.is_empty() {
        return Err(ServiceError::Validation("name required".into()));
    }
    product::validate_price(input.price)?;
    let slug = product::slugify(name);
    if slug.is_empty() {
        return Err(ServiceError::Validation("name must contain letters or digits".into()));
    }
    let taken = product::Entity::find().filter(product::Column::Slug.eq(&slug)).one(db).await?;
    if taken.is_some() {
        return Err(ServiceError::conflict("product_already_exists"));
    }

    let now = Utc::now().into();
    let created = product::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        description: Set(input.description),
        slug: Set(slug),
        price: Set(input.price),
        category_id: Set(input.category_id),
        active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await?;

    for attr in input.attributes {
        attributes::insert_attribute(db, created.id, attr).await?;
    }
    Ok(created)
}

/// Create one product and its nested attributes atomically.
#[instrument(skip(db, input), fields(name = %input.name))]
pub async fn create_product(db: &DatabaseConnection, input: ProductInput) -> Result<product::Model, ServiceError> {
    let txn = db.begin().await?;
    let created = insert_product(&txn, input).await?;
    txn.commit().await?;
    info!(event = "product_created", product_id = %created.id, slug = %created.slug);
    Ok(created)
}

/// Create every product of a JSON list; failures are collected per item.
#[instrument(skip(db, payload))]
pub async fn bulk_create(db: &DatabaseConnection, payload: serde_json::Value) -> Result<BulkReport, ServiceError> {
    let serde_json::Value::Array(items) = payload else {
        return Err(ServiceError::validation("product_bulk_expects_list"));
    };
    let mut report = BulkReport::default();
    for raw in items {
        let input: ProductInput = match serde_json::from_value(raw.clone()) {
            Ok(i) => i,
            Err(e) => {
                report.error_products.push(BulkError { product: raw, error: e.to_string() });
                continue;
            }
        };
        match create_product(db, input).await {
            Ok(p) => report.created_products.push(p),
            Err(e) => {
                warn!(error = %e, "bulk product rejected");
                report.error_products.push(BulkError { product: raw, error: e.public_message() });
            }
        }
    }
    Ok(report)
}

/// Slug stays fixed on rename so existing links keep working.
#[instrument(skip(db, input))]
pub async fn update_product(db: &DatabaseConnection, slug: &str, input: ProductUpdate) -> Result<product::Model, ServiceError> {
    let mut am: product::ActiveModel = get_product(db, slug).await?.into();
    if let Some(name) = input.name {
        let name = name.trim().to_string();
        if name.is_empty() {
            return Err(ServiceError::Validation("name required".into()));
        }
        am.name = Set(name);
    }
    if let Some(price) = input.price {
        product::validate_price(price)?;
        am.price = Set(price);
    }
    if input.description.is_some() {
        am.description = Set(input.description);
    }
    if input.category_id.is_some() {
        am.category_id = Set(input.category_id);
    }
    am.updated_at = Set(Utc::now().into());
    Ok(am.update(db).await?)
}

pub async fn deactivate_product(db: &DatabaseConnection, slug: &str) -> Result<(), ServiceError> {
    let mut am: product::ActiveModel = get_product(db, slug).await?.into();
    am.active = Set(false);
    am.updated_at = Set(Utc::now().into());
    am.update(db).await?;
    info!(event = "product_deactivated", %slug);
    Ok(())
}

pub async fn list_products(db: &DatabaseConnection, opts: Pagination) -> Result<Page<product::Model>, ServiceError> {
    let (page_idx, per_page) = opts.normalize();
    let paginator = product::Entity::find()
        .filter(product::Column::Active.eq(true))
        .order_by_asc(product::Column::Name)
        .paginate(db, per_page);
    let totals = paginator.num_items_and_pages().await?;
    let items = paginator.fetch_page(page_idx).await?;
    Ok(Page {
        items,
        page: page_idx + 1,
        per_page,
        total_items: totals.number_of_items,
        total_pages: totals.number_of_pages,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::attributes::{list_attributes, list_options, OptionInput};
    use crate::test_support::get_db;
    use serde_json::json;

    #[tokio::test]
    async fn product_crud() -> Result<(), anyhow::Error> {
        let db = get_db().await?;
        let p = create_product(&db, ProductInput::new("Blue Mug XL", 450)).await?;
        assert_eq!(p.slug, "blue-mug-xl");
        assert!(matches!(create_product(&db, ProductInput::new("blue mug xl", 100)).await, Err(ServiceError::Conflict(_))));
        assert!(matches!(create_product(&db, ProductInput::new("Free", 0)).await, Err(ServiceError::Model(_))));

        let upd = update_product(&db, "blue-mug-xl", ProductUpdate { price: Some(500), ..Default::default() }).await?;
        assert_eq!(upd.price, 500);
        assert!(update_product(&db, "blue-mug-xl", ProductUpdate { price: Some(-1), ..Default::default() }).await.is_err());

        deactivate_product(&db, "blue-mug-xl").await?;
        assert!(matches!(get_product(&db, "blue-mug-xl").await, Err(ServiceError::NotFound(_))));
        Ok(())
    }

    #[tokio::test]
    async fn nested_create_and_listing() -> Result<(), anyhow::Error> {
        let db = get_db().await?;
        let mut input = ProductInput::new("T Shirt", 1200);
        input.attributes.push(AttributeInput {
            name: "size".into(),
            value: None,
            options: vec![
                OptionInput { name: "M".into(), value: None, price_change: 0 },
                OptionInput { name: "XL".into(), value: None, price_change: 200 },
            ],
        });
        create_product(&db, input).await?;
        create_product(&db, ProductInput::new("Cap", 300)).await?;

        let attrs = list_attributes(&db, "t-shirt").await?;
        assert_eq!(attrs.len(), 1);
        assert_eq!(list_options(&db, attrs[0].id).await?.len(), 2);

        let page = list_products(&db, Pagination { page: 1, per_page: 1 }).await?;
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.total_items, 2);
        assert_eq!(page.total_pages, 2);
        Ok(())
    }

    #[tokio::test]
    async fn nested_failure_rolls_back_product() -> Result<(), anyhow::Error> {
        let db = get_db().await?;
        let mut input = ProductInput::new("Lamp", 900);
        input.attributes.push(AttributeInput {
            name: "bulb".into(),
            value: None,
            options: vec![OptionInput { name: "led".into(), value: None, price_change: -5 }],
        });
        assert!(create_product(&db, input).await.is_err());
        assert!(matches!(get_product(&db, "lamp").await, Err(ServiceError::NotFound(_))));
        Ok(())
    }

    #[tokio::test]
    async fn bulk_collects_errors() -> Result<(), anyhow::Error> {
        let db = get_db().await?;
        assert!(matches!(bulk_create(&db, json!({"name": "x"})).await, Err(ServiceError::Validation(_))));

        let report = bulk_create(
            &db,
            json!([
                {"name": "Pen", "price": 20},
                {"name": "Pen", "price": 25},
                {"name": "Broken"}
            ]),
        )
        .await?;
        assert_eq!(report.created_products.len(), 1);
        assert_eq!(report.error_products.len(), 2);
        Ok(())
    }
}
