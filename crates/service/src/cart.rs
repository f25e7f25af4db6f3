//! Shopping cart keyed by user, or by anonymous session for guests.
//!
//! Every mutation runs in one transaction and ends with `recompute`, which
//! reprices all lines and persists the cart total.

use std::collections::HashMap;

use chrono::Utc;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, ModelTrait, QueryFilter, QueryOrder,
    Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};
use uuid::Uuid;

use models::user_session::{self, SessionType};
use models::{cart, cart_item, order, product, product_attribute_option};

use crate::catalog::attributes::option_ids_for_product;
use crate::errors::ServiceError;
use crate::pricing::{self, Line};

/// Who is shopping: the caller's user id when authenticated, and the client ip.
#[derive(Clone, Debug)]
pub struct CartOwner {
    pub user_id: Option<Uuid>,
    pub ip: String,
}

impl CartOwner {
    pub fn new(user_id: Option<Uuid>, ip: impl Into<String>) -> Self {
        Self { user_id, ip: ip.into() }
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct AddItem {
    pub product_id: Uuid,
    #[serde(default)]
    pub attr_option_id: Option<Uuid>,
    #[serde(default)]
    pub quantity: Option<i32>,
}

/// Identifies a cart line by product and selected option.
#[derive(Clone, Debug, Deserialize)]
pub struct ItemKey {
    pub product_id: Uuid,
    #[serde(default)]
    pub attr_option_id: Option<Uuid>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct UpdateItem {
    #[serde(flatten)]
    pub key: ItemKey,
    pub quantity: i32,
}

#[derive(Clone, Debug, Serialize)]
pub struct CartLine {
    pub id: Uuid,
    pub product_id: Uuid,
    pub product_slug: String,
    pub product_name: String,
    pub attr_option_id: Option<Uuid>,
    pub quantity: i32,
    pub unit_price: i64,
    pub line_price: i64,
}

#[derive(Clone, Debug, Serialize)]
pub struct CartView {
    #[serde(flatten)]
    pub cart: cart::Model,
    pub cart_items: Vec<CartLine>,
}

async fn session_for<C: ConnectionTrait>(db: &C, owner: &CartOwner) -> Result<user_session::Model, ServiceError> {
    let q = user_session::Entity::find()
        .filter(user_session::Column::Ip.eq(owner.ip.as_str()))
        .filter(user_session::Column::Active.eq(true));
    let q = match owner.user_id {
        Some(u) => q.filter(user_session::Column::UserId.eq(u)),
        None => q.filter(user_session::Column::UserId.is_null()),
    };
    if let Some(s) = q.order_by_desc(user_session::Column::CreatedAt).one(db).await? {
        return Ok(s);
    }
    debug!(ip = %owner.ip, "opening cart session");
    Ok(user_session::create(db, owner.user_id, &owner.ip, SessionType::Web).await?)
}

pub(crate) async fn find_cart<C: ConnectionTrait>(db: &C, owner: &CartOwner) -> Result<Option<cart::Model>, ServiceError> {
    let q = cart::Entity::find().filter(cart::Column::Active.eq(true));
    let q = match owner.user_id {
        Some(u) => q.filter(cart::Column::UserId.eq(u)),
        None => {
            let session = session_for(db, owner).await?;
            q.filter(cart::Column::SessionId.eq(session.id)).filter(cart::Column::UserId.is_null())
        }
    };
    Ok(q.order_by_desc(cart::Column::CreatedAt).one(db).await?)
}

async fn insert_cart<C: ConnectionTrait>(db: &C, owner: &CartOwner) -> Result<cart::Model, ServiceError> {
    let session = session_for(db, owner).await?;
    let now = Utc::now().into();
    let created = cart::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(owner.user_id),
        session_id: Set(Some(session.id)),
        coupon_id: Set(None),
        total: Set(0),
        active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await?;
    info!(event = "cart_created", cart_id = %created.id);
    Ok(created)
}

/// A cart with an order on it is frozen until the order is cancelled.
pub(crate) async fn ensure_open<C: ConnectionTrait>(db: &C, c: &cart::Model) -> Result<(), ServiceError> {
    let ordered = order::Entity::find().filter(order::Column::CartId.eq(c.id)).one(db).await?;
    if ordered.is_some() {
        return Err(ServiceError::conflict("cart_checked_out"));
    }
    Ok(())
}

/// Move the lines of a checked-out cart into a fresh cart for the same owner
/// and retire the old one.
pub(crate) async fn reopen<C: ConnectionTrait>(db: &C, c: cart::Model) -> Result<cart::Model, ServiceError> {
    let now = Utc::now().into();
    let fresh = cart::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(c.user_id),
        session_id: Set(c.session_id),
        coupon_id: Set(c.coupon_id),
        total: Set(c.total),
        active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await?;
    cart_item::Entity::update_many()
        .col_expr(cart_item::Column::CartId, Expr::value(fresh.id))
        .filter(cart_item::Column::CartId.eq(c.id))
        .exec(db)
        .await?;
    let old_id = c.id;
    let mut am: cart::ActiveModel = c.into();
    am.active = Set(false);
    am.updated_at = Set(now);
    am.update(db).await?;
    info!(event = "cart_reopened", from = %old_id, into = %fresh.id);
    Ok(fresh)
}

async fn get_or_create<C: ConnectionTrait>(db: &C, owner: &CartOwner) -> Result<cart::Model, ServiceError> {
    match find_cart(db, owner).await? {
        Some(c) => Ok(c),
        None => insert_cart(db, owner).await,
    }
}

/// Priced lines of a cart, oldest first.
pub(crate) async fn priced_lines<C: ConnectionTrait>(db: &C, cart_id: Uuid) -> Result<Vec<CartLine>, ServiceError> {
    let rows = cart_item::Entity::find()
        .filter(cart_item::Column::CartId.eq(cart_id))
        .order_by_asc(cart_item::Column::CreatedAt)
        .find_also_related(product::Entity)
        .all(db)
        .await?;

    let option_ids: Vec<Uuid> = rows.iter().filter_map(|(i, _)| i.attr_option_id).collect();
    let changes: HashMap<Uuid, i64> = if option_ids.is_empty() {
        HashMap::new()
    } else {
        product_attribute_option::Entity::find()
            .filter(product_attribute_option::Column::Id.is_in(option_ids))
            .all(db)
            .await?
            .into_iter()
            .map(|o| (o.id, o.price_change))
            .collect()
    };

    let mut lines = Vec::with_capacity(rows.len());
    for (item, p) in rows {
        let p = p.ok_or_else(|| ServiceError::not_found("product_not_found"))?;
        let change = item.attr_option_id.and_then(|id| changes.get(&id).copied());
        let unit = pricing::unit_price(p.price, change);
        lines.push(CartLine {
            id: item.id,
            product_id: p.id,
            product_slug: p.slug,
            product_name: p.name,
            attr_option_id: item.attr_option_id,
            quantity: item.quantity,
            unit_price: unit,
            line_price: pricing::line_price(unit, item.quantity),
        });
    }
    Ok(lines)
}

/// Reprice the cart and persist its total.
pub(crate) async fn recompute<C: ConnectionTrait>(db: &C, c: cart::Model) -> Result<CartView, ServiceError> {
    let lines = priced_lines(db, c.id).await?;
    let terms = match c.coupon_id {
        Some(id) => crate::coupons::terms(db, id).await?,
        None => None,
    };
    let priced: Vec<Line> = lines
        .iter()
        .map(|l| Line { product_id: l.product_id, unit_price: l.unit_price, quantity: l.quantity })
        .collect();
    let total = pricing::cart_total(&priced, terms.as_ref(), Utc::now());
    pricing::ensure_cart_total(total)?;

    let cart = if total != c.total {
        let mut am: cart::ActiveModel = c.into();
        am.total = Set(total);
        am.updated_at = Set(Utc::now().into());
        am.update(db).await?
    } else {
        c
    };
    Ok(CartView { cart, cart_items: lines })
}

async fn find_line<C: ConnectionTrait>(db: &C, cart_id: Uuid, key: &ItemKey) -> Result<Option<cart_item::Model>, ServiceError> {
    let q = cart_item::Entity::find()
        .filter(cart_item::Column::CartId.eq(cart_id))
        .filter(cart_item::Column::ProductId.eq(key.product_id));
    let q = match key.attr_option_id {
        Some(o) => q.filter(cart_item::Column::AttrOptionId.eq(o)),
        None => q.filter(cart_item::Column::AttrOptionId.is_null()),
    };
    Ok(q.one(db).await?)
}

pub async fn get_cart(db: &DatabaseConnection, owner: &CartOwner) -> Result<CartView, ServiceError> {
    let txn = db.begin().await?;
    let c = get_or_create(&txn, owner).await?;
    let view = recompute(&txn, c).await?;
    txn.commit().await?;
    Ok(view)
}

#[instrument(skip(db))]
pub async fn create_cart(db: &DatabaseConnection, owner: &CartOwner) -> Result<cart::Model, ServiceError> {
    let txn = db.begin().await?;
    if find_cart(&txn, owner).await?.is_some() {
        return Err(ServiceError::conflict("cart_already_exists"));
    }
    let c = insert_cart(&txn, owner).await?;
    txn.commit().await?;
    Ok(c)
}

#[instrument(skip(db))]
pub async fn delete_cart(db: &DatabaseConnection, owner: &CartOwner) -> Result<(), ServiceError> {
    let txn = db.begin().await?;
    let c = find_cart(&txn, owner).await?.ok_or_else(|| ServiceError::not_found("cart_not_found"))?;
    let id = c.id;
    let mut am: cart::ActiveModel = c.into();
    am.active = Set(false);
    am.updated_at = Set(Utc::now().into());
    am.update(&txn).await?;
    txn.commit().await?;
    info!(event = "cart_deleted", cart_id = %id);
    Ok(())
}

pub async fn list_items(db: &DatabaseConnection, owner: &CartOwner) -> Result<Vec<CartLine>, ServiceError> {
    Ok(get_cart(db, owner).await?.cart_items)
}

#[instrument(skip(db, input), fields(product_id = %input.product_id))]
pub async fn add_item(db: &DatabaseConnection, owner: &CartOwner, input: AddItem) -> Result<CartView, ServiceError> {
    let quantity = input.quantity.unwrap_or(1);
    cart_item::validate_quantity(quantity)?;

    let txn = db.begin().await?;
    let p = product::Entity::find_by_id(input.product_id)
        .filter(product::Column::Active.eq(true))
        .one(&txn)
        .await?
        .ok_or_else(|| ServiceError::not_found("product_not_found"))?;

    let options = option_ids_for_product(&txn, p.id).await?;
    match input.attr_option_id {
        None if !options.is_empty() => return Err(ServiceError::validation("cart_option_required")),
        Some(o) if !options.contains(&o) => return Err(ServiceError::validation("cart_option_mismatch")),
        _ => {}
    }

    let c = get_or_create(&txn, owner).await?;
    ensure_open(&txn, &c).await?;
    let key = ItemKey { product_id: p.id, attr_option_id: input.attr_option_id };
    match find_line(&txn, c.id, &key).await? {
        Some(line) => {
            let merged = line.quantity.saturating_add(quantity);
            let mut am: cart_item::ActiveModel = line.into();
            am.quantity = Set(merged);
            am.updated_at = Set(Utc::now().into());
            am.update(&txn).await?;
        }
        None => {
            let now = Utc::now().into();
            cart_item::ActiveModel {
                id: Set(Uuid::new_v4()),
                cart_id: Set(c.id),
                product_id: Set(p.id),
                attr_option_id: Set(input.attr_option_id),
                quantity: Set(quantity),
                created_at: Set(now),
                updated_at: Set(now),
            }
            .insert(&txn)
            .await?;
        }
    }
    let view = recompute(&txn, c).await?;
    txn.commit().await?;
    Ok(view)
}

/// Set a line's quantity; zero removes the line.
#[instrument(skip(db, input), fields(product_id = %input.key.product_id, quantity = input.quantity))]
pub async fn update_item(db: &DatabaseConnection, owner: &CartOwner, input: UpdateItem) -> Result<CartView, ServiceError> {
    if input.quantity < 0 {
        cart_item::validate_quantity(input.quantity)?;
    }
    let txn = db.begin().await?;
    let c = get_or_create(&txn, owner).await?;
    ensure_open(&txn, &c).await?;
    let line = find_line(&txn, c.id, &input.key)
        .await?
        .ok_or_else(|| ServiceError::not_found("cart_item_not_found"))?;
    if input.quantity == 0 {
        line.delete(&txn).await?;
    } else {
        let mut am: cart_item::ActiveModel = line.into();
        am.quantity = Set(input.quantity);
        am.updated_at = Set(Utc::now().into());
        am.update(&txn).await?;
    }
    let view = recompute(&txn, c).await?;
    txn.commit().await?;
    Ok(view)
}

pub async fn remove_item(db: &DatabaseConnection, owner: &CartOwner, key: ItemKey) -> Result<CartView, ServiceError> {
    let txn = db.begin().await?;
    let c = get_or_create(&txn, owner).await?;
    ensure_open(&txn, &c).await?;
    let line = find_line(&txn, c.id, &key)
        .await?
        .ok_or_else(|| ServiceError::not_found("cart_item_not_found"))?;
    line.delete(&txn).await?;
    let view = recompute(&txn, c).await?;
    txn.commit().await?;
    Ok(view)
}

#[instrument(skip(db))]
pub async fn apply_coupon(db: &DatabaseConnection, owner: &CartOwner, code: &str) -> Result<CartView, ServiceError> {
    let txn = db.begin().await?;
    let coupon = crate::coupons::find_active(&txn, code)
        .await?
        .ok_or_else(|| ServiceError::not_found("coupon_not_found"))?;
    let c = get_or_create(&txn, owner).await?;
    ensure_open(&txn, &c).await?;
    if priced_lines(&txn, c.id).await?.is_empty() {
        return Err(ServiceError::validation("cart_empty"));
    }
    let mut am: cart::ActiveModel = c.into();
    am.coupon_id = Set(Some(coupon.id));
    am.updated_at = Set(Utc::now().into());
    let c = am.update(&txn).await?;
    let view = recompute(&txn, c).await?;
    txn.commit().await?;
    info!(event = "coupon_applied", cart_id = %view.cart.id, coupon = %coupon.code, total = view.cart.total);
    Ok(view)
}

/// Move every line of `other_cart_id` into the caller's cart, then retire it.
#[instrument(skip(db))]
pub async fn merge(db: &DatabaseConnection, owner: &CartOwner, other_cart_id: Uuid) -> Result<CartView, ServiceError> {
    let txn = db.begin().await?;
    let target = get_or_create(&txn, owner).await?;
    let other = cart::Entity::find_by_id(other_cart_id)
        .filter(cart::Column::Active.eq(true))
        .one(&txn)
        .await?
        .filter(|o| o.id != target.id)
        .ok_or_else(|| ServiceError::not_found("cart_not_found"))?;
    ensure_open(&txn, &target).await?;
    ensure_open(&txn, &other).await?;

    let items = cart_item::Entity::find()
        .filter(cart_item::Column::CartId.eq(other.id))
        .all(&txn)
        .await?;
    for item in items {
        let key = ItemKey { product_id: item.product_id, attr_option_id: item.attr_option_id };
        match find_line(&txn, target.id, &key).await? {
            Some(line) => {
                let merged = line.quantity.saturating_add(item.quantity);
                let mut am: cart_item::ActiveModel = line.into();
                am.quantity = Set(merged);
                am.updated_at = Set(Utc::now().into());
                am.update(&txn).await?;
                item.delete(&txn).await?;
            }
            None => {
                let mut am: cart_item::ActiveModel = item.into();
                am.cart_id = Set(target.id);
                am.updated_at = Set(Utc::now().into());
                am.update(&txn).await?;
            }
        }
    }

    let other_id = other.id;
    let mut am: cart::ActiveModel = other.into();
    am.active = Set(false);
    am.total = Set(0);
    am.updated_at = Set(Utc::now().into());
    am.update(&txn).await?;

    let view = recompute(&txn, target).await?;
    txn.commit().await?;
    info!(event = "cart_merged", from = %other_id, into = %view.cart.id);
    Ok(view)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::attributes::{AttributeInput, OptionInput};
    use crate::catalog::products::{create_product, ProductInput};
    use crate::coupons::{create_coupon, map_products, CouponInput, ProductSelection};
    use crate::test_support::{get_db, seed_user};
    use chrono::Duration;
    use models::coupon::CouponType;

    fn guest() -> CartOwner {
        CartOwner::new(None, "10.0.0.1")
    }

    fn add(product_id: Uuid, quantity: Option<i32>) -> AddItem {
        AddItem { product_id, attr_option_id: None, quantity }
    }

    #[tokio::test]
    async fn guest_cart_lifecycle() -> Result<(), anyhow::Error> {
        let db = get_db().await?;
        let p = create_product(&db, ProductInput::new("Notebook", 250)).await?;

        let created = create_cart(&db, &guest()).await?;
        assert!(matches!(create_cart(&db, &guest()).await, Err(ServiceError::Conflict(_))));

        let view = add_item(&db, &guest(), add(p.id, None)).await?;
        assert_eq!(view.cart.id, created.id);
        let view = add_item(&db, &guest(), add(p.id, Some(2))).await?;
        assert_eq!(view.cart_items.len(), 1);
        assert_eq!(view.cart_items[0].quantity, 3);
        assert_eq!(view.cart.total, 750);

        let key = ItemKey { product_id: p.id, attr_option_id: None };
        let view = update_item(&db, &guest(), UpdateItem { key: key.clone(), quantity: 1 }).await?;
        assert_eq!(view.cart.total, 250);
        let view = update_item(&db, &guest(), UpdateItem { key: key.clone(), quantity: 0 }).await?;
        assert!(view.cart_items.is_empty());
        assert_eq!(view.cart.total, 0);
        assert!(matches!(remove_item(&db, &guest(), key).await, Err(ServiceError::NotFound(_))));

        delete_cart(&db, &guest()).await?;
        // another ip is another guest
        assert!(matches!(delete_cart(&db, &CartOwner::new(None, "10.0.0.2")).await, Err(ServiceError::NotFound(_))));
        Ok(())
    }

    #[tokio::test]
    async fn options_are_required_and_priced() -> Result<(), anyhow::Error> {
        let db = get_db().await?;
        let mut input = ProductInput::new("Hoodie", 2000);
        input.attributes.push(AttributeInput {
            name: "size".into(),
            value: None,
            options: vec![OptionInput { name: "XXL".into(), value: None, price_change: 300 }],
        });
        let hoodie = create_product(&db, input).await?;
        let plain = create_product(&db, ProductInput::new("Sticker", 50)).await?;
        let xxl = option_ids_for_product(&db, hoodie.id).await?[0];

        assert!(matches!(add_item(&db, &guest(), add(hoodie.id, None)).await, Err(ServiceError::Validation(_))));
        let wrong = AddItem { product_id: plain.id, attr_option_id: Some(xxl), quantity: None };
        assert!(matches!(add_item(&db, &guest(), wrong).await, Err(ServiceError::Validation(_))));
        assert!(matches!(add_item(&db, &guest(), add(Uuid::new_v4(), None)).await, Err(ServiceError::NotFound(_))));
        assert!(add_item(&db, &guest(), add(plain.id, Some(0))).await.is_err());

        let ok = AddItem { product_id: hoodie.id, attr_option_id: Some(xxl), quantity: Some(2) };
        let view = add_item(&db, &guest(), ok).await?;
        assert_eq!(view.cart_items[0].unit_price, 2300);
        assert_eq!(view.cart.total, 4600);
        Ok(())
    }

    #[tokio::test]
    async fn coupon_discounts_mapped_products_only() -> Result<(), anyhow::Error> {
        let db = get_db().await?;
        let mapped = create_product(&db, ProductInput::new("Kettle", 1000)).await?;
        let other = create_product(&db, ProductInput::new("Toaster", 1000)).await?;
        let now = Utc::now();
        create_coupon(&db, "HALF", CouponInput {
            coupon_type: CouponType::Percentage,
            value: 50,
            max_value: Some(300),
            start_at: now - Duration::hours(1),
            expire_at: now + Duration::hours(1),
        })
        .await?;
        map_products(&db, "HALF", ProductSelection { product_ids: vec![mapped.id], ..Default::default() }).await?;

        assert!(matches!(apply_coupon(&db, &guest(), "HALF").await, Err(ServiceError::Validation(_))));
        add_item(&db, &guest(), add(mapped.id, None)).await?;
        add_item(&db, &guest(), add(other.id, None)).await?;
        assert!(matches!(apply_coupon(&db, &guest(), "NOPE").await, Err(ServiceError::NotFound(_))));

        let view = apply_coupon(&db, &guest(), "HALF").await?;
        // 50% of 1000 capped at 300 on the kettle only
        assert_eq!(view.cart.total, 1700);
        Ok(())
    }

    #[tokio::test]
    async fn merge_sums_matching_lines() -> Result<(), anyhow::Error> {
        let db = get_db().await?;
        let u = seed_user(&db, "shopper@shop.example").await?;
        let pen = create_product(&db, ProductInput::new("Pen", 10)).await?;
        let ink = create_product(&db, ProductInput::new("Ink", 40)).await?;

        let guest_view = add_item(&db, &guest(), add(pen.id, Some(2))).await?;
        add_item(&db, &guest(), add(ink.id, None)).await?;
        let me = CartOwner::new(Some(u.id), "10.0.0.1");
        add_item(&db, &me, add(pen.id, Some(1))).await?;

        let merged = merge(&db, &me, guest_view.cart.id).await?;
        assert_eq!(merged.cart_items.len(), 2);
        let pens = merged.cart_items.iter().find(|l| l.product_id == pen.id).unwrap();
        assert_eq!(pens.quantity, 3);
        assert_eq!(merged.cart.total, 70);

        assert!(matches!(merge(&db, &me, guest_view.cart.id).await, Err(ServiceError::NotFound(_))));
        assert!(matches!(merge(&db, &me, merged.cart.id).await, Err(ServiceError::NotFound(_))));
        Ok(())
    }
}
