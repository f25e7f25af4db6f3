//! Orders: checkout from the cart, payment, cancellation, shipping status
//! and the receivers an order is shipped to.

use std::sync::Arc;

use chrono::{DateTime, Duration, FixedOffset, Utc};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveEnum, ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use models::order::{self, OrderStatus, PaymentStatus};
use models::{cart, order_address, order_item, order_receiver, user};

use crate::cart::CartOwner;
use crate::errors::ServiceError;
use crate::pagination::{Page, Pagination};
use crate::payment::{ChargeRequest, PaymentGateway, TestGateway};
use crate::pricing;

/// Gateway selection and charge settings for checkout.
#[derive(Clone)]
pub struct Checkout {
    pub gateway: Arc<dyn PaymentGateway>,
    pub currency: String,
    /// When false, `test_mode` requests are rejected.
    pub allow_test_mode: bool,
}

impl Checkout {
    pub fn new(gateway: Arc<dyn PaymentGateway>, currency: impl Into<String>, allow_test_mode: bool) -> Self {
        Self { gateway, currency: currency.into(), allow_test_mode }
    }

    fn gateway_for(&self, test_mode: bool) -> Result<Arc<dyn PaymentGateway>, ServiceError> {
        if !test_mode {
            return Ok(self.gateway.clone());
        }
        if !self.allow_test_mode {
            return Err(ServiceError::validation("payment_test_mode_disabled"));
        }
        Ok(Arc::new(TestGateway))
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct PlaceOrder {
    pub order_receiver_id: Uuid,
    #[serde(default)]
    pub address_ids: Vec<Uuid>,
    #[serde(default)]
    pub shipping_cost: i64,
    pub payment_token: String,
    #[serde(default)]
    pub test_mode: bool,
}

#[derive(Clone, Debug, Deserialize)]
pub struct PayOrder {
    pub payment_token: String,
    #[serde(default)]
    pub test_mode: bool,
}

#[derive(Clone, Debug, Serialize)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: order::Model,
    pub receiver: order_receiver::Model,
    pub address_ids: Vec<Uuid>,
    pub items: Vec<order_item::Model>,
}

/// A charge left in `initiated` for this long is assumed lost and may be
/// sent again under the same idempotency key.
pub const STALE_CHARGE_SECS: i64 = 900;

/// Receiver fields; `user: "self"` fills them from the caller's profile.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct ReceiverInput {
    #[serde(default)]
    pub user: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub phone_no: Option<String>,
}

async fn owned_order<C: ConnectionTrait>(db: &C, user_id: Uuid, id: Uuid) -> Result<order::Model, ServiceError> {
    order::Entity::find_by_id(id)
        .filter(order::Column::UserId.eq(user_id))
        .filter(order::Column::Active.eq(true))
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::not_found("order_not_found"))
}

async fn owned_receiver<C: ConnectionTrait>(db: &C, user_id: Uuid, id: Uuid) -> Result<order_receiver::Model, ServiceError> {
    order_receiver::Entity::find_by_id(id)
        .filter(order_receiver::Column::UserId.eq(user_id))
        .filter(order_receiver::Column::Active.eq(true))
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::not_found("order_receiver_not_found"))
}

async fn reload<C: ConnectionTrait>(db: &C, id: Uuid) -> Result<order::Model, ServiceError> {
    order::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::not_found("order_not_found"))
}

/// Move the order into `initiated` with a conditional update, so concurrent
/// callers cannot both start a charge. Pending and failed orders open a new
/// attempt; a stale `initiated` order keeps its attempt number.
pub(crate) async fn claim_charge(db: &DatabaseConnection, o: &order::Model) -> Result<order::Model, ServiceError> {
    let now: DateTime<FixedOffset> = Utc::now().into();
    let update = order::Entity::update_many()
        .col_expr(order::Column::PaymentStatus, Expr::value(PaymentStatus::Initiated.into_value()))
        .col_expr(order::Column::UpdatedAt, Expr::value(now))
        .filter(order::Column::Id.eq(o.id));
    let update = match o.payment_status {
        PaymentStatus::Pending | PaymentStatus::Failed => update
            .col_expr(order::Column::PaymentAttempts, Expr::col(order::Column::PaymentAttempts).add(1))
            .filter(
                order::Column::PaymentStatus
                    .is_in([PaymentStatus::Pending.into_value(), PaymentStatus::Failed.into_value()]),
            ),
        PaymentStatus::Initiated => {
            let stale_before: DateTime<FixedOffset> = (Utc::now() - Duration::seconds(STALE_CHARGE_SECS)).into();
            update
                .filter(order::Column::PaymentStatus.eq(PaymentStatus::Initiated.into_value()))
                .filter(order::Column::UpdatedAt.lt(stale_before))
        }
        PaymentStatus::Paid => return Err(ServiceError::conflict("payment_invalid_transition")),
    };
    if update.exec(db).await?.rows_affected != 1 {
        return Err(ServiceError::conflict("payment_in_progress"));
    }
    reload(db, o.id).await
}

/// Record the charge outcome; only an `initiated` order can be settled.
async fn settle<C: ConnectionTrait>(db: &C, id: Uuid, next: PaymentStatus, reference: Option<String>) -> Result<order::Model, ServiceError> {
    let now: DateTime<FixedOffset> = Utc::now().into();
    let mut update = order::Entity::update_many()
        .col_expr(order::Column::PaymentStatus, Expr::value(next.into_value()))
        .col_expr(order::Column::UpdatedAt, Expr::value(now))
        .filter(order::Column::Id.eq(id))
        .filter(order::Column::PaymentStatus.eq(PaymentStatus::Initiated.into_value()));
    if let Some(reference) = reference {
        update = update.col_expr(order::Column::PaymentReference, Expr::value(reference));
    }
    if update.exec(db).await?.rows_affected != 1 {
        return Err(ServiceError::conflict("payment_invalid_transition"));
    }
    reload(db, id).await
}

/// Turn the caller's cart into an order, then charge it.
///
/// The order is committed before the charge, so a declined payment leaves it
/// `failed` and payable again through `retry_payment`.
#[instrument(skip(db, checkout, input), fields(user_id = ?owner.user_id))]
pub async fn place_order(db: &DatabaseConnection, checkout: &Checkout, owner: &CartOwner, input: PlaceOrder) -> Result<order::Model, ServiceError> {
    let user_id = owner.user_id.ok_or_else(|| ServiceError::Unauthorized(common::messages::text("unauthorized").into()))?;
    if input.shipping_cost < 0 {
        return Err(ServiceError::Validation("shipping_cost must not be negative".into()));
    }

    let txn = db.begin().await?;
    let c = crate::cart::find_cart(&txn, owner)
        .await?
        .ok_or_else(|| ServiceError::not_found("cart_not_found"))?;
    let existing = order::Entity::find().filter(order::Column::CartId.eq(c.id)).one(&txn).await?;
    if existing.is_some() {
        return Err(ServiceError::conflict("order_already_exists"));
    }
    let view = crate::cart::recompute(&txn, c).await?;
    if view.cart_items.is_empty() {
        return Err(ServiceError::not_found("cart_empty"));
    }
    let receiver = owned_receiver(&txn, user_id, input.order_receiver_id).await?;
    for id in &input.address_ids {
        crate::addresses::find_owned(&txn, user_id, *id).await?;
    }

    let total = view.cart.total.saturating_add(input.shipping_cost);
    pricing::ensure_order_total(total)?;

    let now = Utc::now().into();
    let placed = order::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        cart_id: Set(view.cart.id),
        order_receiver_id: Set(receiver.id),
        status: Set(OrderStatus::Placed),
        payment_status: Set(PaymentStatus::Pending),
        payment_reference: Set(None),
        payment_attempts: Set(0),
        shipping_cost: Set(input.shipping_cost),
        total: Set(total),
        active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(&txn)
    .await?;
    for id in &input.address_ids {
        order_address::ActiveModel { order_id: Set(placed.id), address_id: Set(*id) }.insert(&txn).await?;
    }
    // 下单即冻结行项目与价格，之后购物车改动不影响订单
    for line in &view.cart_items {
        order_item::ActiveModel {
            id: Set(Uuid::new_v4()),
            order_id: Set(placed.id),
            product_id: Set(line.product_id),
            attr_option_id: Set(line.attr_option_id),
            product_slug: Set(line.product_slug.clone()),
            product_name: Set(line.product_name.clone()),
            quantity: Set(line.quantity),
            unit_price: Set(line.unit_price),
            line_price: Set(line.line_price),
            created_at: Set(now),
        }
        .insert(&txn)
        .await?;
    }
    txn.commit().await?;
    info!(event = "order_placed", order_id = %placed.id, total = placed.total);

    pay(db, checkout, placed, &input.payment_token, input.test_mode).await
}

/// Charge an order: initiated, then paid or failed.
///
/// Every charge carries `<order id>:<attempt>` as its idempotency key, so
/// re-sending a lost charge cannot bill the customer twice.
#[instrument(skip(db, checkout, o, token), fields(order_id = %o.id))]
pub async fn pay(db: &DatabaseConnection, checkout: &Checkout, o: order::Model, token: &str, test_mode: bool) -> Result<order::Model, ServiceError> {
    if token.trim().is_empty() {
        return Err(ServiceError::Validation("payment_token required".into()));
    }
    if o.status == OrderStatus::Cancelled {
        return Err(ServiceError::conflict("order_invalid_status"));
    }
    let gateway = checkout.gateway_for(test_mode)?;
    let o = claim_charge(db, &o).await?;

    let req = ChargeRequest {
        order_id: o.id,
        amount: o.total,
        currency: checkout.currency.clone(),
        token: token.to_string(),
        idempotency_key: format!("{}:{}", o.id, o.payment_attempts),
    };
    match gateway.charge(&req).await {
        Ok(receipt) => {
            let txn = db.begin().await?;
            let paid = settle(&txn, o.id, PaymentStatus::Paid, Some(receipt.reference)).await?;
            if let Some(c) = cart::Entity::find_by_id(o.cart_id).one(&txn).await? {
                let mut am: cart::ActiveModel = c.into();
                am.active = Set(false);
                am.updated_at = Set(Utc::now().into());
                am.update(&txn).await?;
            }
            txn.commit().await?;
            info!(event = "order_paid", order_id = %paid.id, attempt = paid.payment_attempts, gateway = gateway.name());
            Ok(paid)
        }
        Err(e) => {
            warn!(event = "payment_failed", order_id = %o.id, status = e.status, gateway = gateway.name());
            settle(db, o.id, PaymentStatus::Failed, None).await?;
            Err(e.into())
        }
    }
}

pub async fn retry_payment(db: &DatabaseConnection, checkout: &Checkout, user_id: Uuid, id: Uuid, input: PayOrder) -> Result<order::Model, ServiceError> {
    let o = owned_order(db, user_id, id).await?;
    pay(db, checkout, o, &input.payment_token, input.test_mode).await
}

pub async fn list_orders(db: &DatabaseConnection, user_id: Uuid) -> Result<Vec<order::Model>, ServiceError> {
    Ok(order::Entity::find()
        .filter(order::Column::UserId.eq(user_id))
        .filter(order::Column::Active.eq(true))
        .order_by_desc(order::Column::CreatedAt)
        .all(db)
        .await?)
}

pub async fn get_order(db: &DatabaseConnection, user_id: Uuid, id: Uuid) -> Result<OrderDetail, ServiceError> {
    let o = owned_order(db, user_id, id).await?;
    let receiver = order_receiver::Entity::find_by_id(o.order_receiver_id)
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::not_found("order_receiver_not_found"))?;
    let address_ids = order_address::Entity::find()
        .filter(order_address::Column::OrderId.eq(o.id))
        .all(db)
        .await?
        .into_iter()
        .map(|a| a.address_id)
        .collect();
    let items = order_item::Entity::find()
        .filter(order_item::Column::OrderId.eq(o.id))
        .order_by_asc(order_item::Column::CreatedAt)
        .order_by_asc(order_item::Column::ProductName)
        .all(db)
        .await?;
    Ok(OrderDetail { order: o, receiver, address_ids, items })
}

/// Cancel a placed order. An unpaid order hands its lines back to the
/// customer in a fresh cart so they can check out again.
#[instrument(skip(db))]
pub async fn cancel_order(db: &DatabaseConnection, user_id: Uuid, id: Uuid) -> Result<order::Model, ServiceError> {
    let txn = db.begin().await?;
    let o = owned_order(&txn, user_id, id).await?;
    if o.status != OrderStatus::Placed {
        return Err(ServiceError::conflict("order_cannot_cancel"));
    }
    if o.payment_status == PaymentStatus::Initiated {
        return Err(ServiceError::conflict("payment_in_progress"));
    }
    let cart_id = o.cart_id;
    let mut am: order::ActiveModel = o.into();
    am.status = Set(OrderStatus::Cancelled);
    am.updated_at = Set(Utc::now().into());
    let cancelled = am.update(&txn).await?;

    let open_cart = cart::Entity::find_by_id(cart_id)
        .filter(cart::Column::Active.eq(true))
        .one(&txn)
        .await?;
    if let Some(c) = open_cart {
        crate::cart::reopen(&txn, c).await?;
    }
    txn.commit().await?;
    info!(event = "order_cancelled", order_id = %cancelled.id);
    Ok(cancelled)
}

// ---- admin ----

pub async fn list_all_orders(db: &DatabaseConnection, opts: Pagination) -> Result<Page<order::Model>, ServiceError> {
    let (page_idx, per_page) = opts.normalize();
    let paginator = order::Entity::find().order_by_desc(order::Column::CreatedAt).paginate(db, per_page);
    let totals = paginator.num_items_and_pages().await?;
    let items = paginator.fetch_page(page_idx).await?;
    Ok(Page { items, page: page_idx + 1, per_page, total_items: totals.number_of_items, total_pages: totals.number_of_pages })
}

#[instrument(skip(db))]
pub async fn update_status(db: &DatabaseConnection, id: Uuid, next: OrderStatus) -> Result<order::Model, ServiceError> {
    let o = order::Entity::find_by_id(id)
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::not_found("order_not_found"))?;
    if !o.status.can_transition_to(next) {
        return Err(ServiceError::validation("order_invalid_status"));
    }
    let from = o.status;
    let mut am: order::ActiveModel = o.into();
    am.status = Set(next);
    am.updated_at = Set(Utc::now().into());
    let updated = am.update(db).await?;
    info!(event = "order_status_changed", order_id = %id, ?from, to = ?next);
    Ok(updated)
}

// ---- receivers ----

async fn resolve_receiver(db: &DatabaseConnection, user_id: Uuid, input: ReceiverInput, base: Option<&order_receiver::Model>) -> Result<(String, String, String), ServiceError> {
    if input.user.as_deref() == Some("self") {
        let me = user::Entity::find_by_id(user_id)
            .one(db)
            .await?
            .ok_or_else(|| ServiceError::not_found("user_not_found"))?;
        return Ok((me.first_name, me.last_name, me.phone_no));
    }
    let pick = |v: Option<String>, old: Option<&String>| v.or_else(|| old.cloned()).unwrap_or_default();
    Ok((
        pick(input.first_name, base.map(|b| &b.first_name)),
        pick(input.last_name, base.map(|b| &b.last_name)),
        pick(input.phone_no, base.map(|b| &b.phone_no)),
    ))
}

#[instrument(skip(db, input))]
pub async fn create_receiver(db: &DatabaseConnection, user_id: Uuid, input: ReceiverInput) -> Result<order_receiver::Model, ServiceError> {
    let (first, last, phone) = resolve_receiver(db, user_id, input, None).await?;
    order_receiver::validate(&first, &last, &phone)?;
    let now = Utc::now().into();
    let created = order_receiver::ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        first_name: Set(first),
        last_name: Set(last),
        phone_no: Set(phone),
        active: Set(true),
        created_at: Set(now),
        updated_at: Set(now),
    }
    .insert(db)
    .await?;
    info!(event = "receiver_created", receiver_id = %created.id);
    Ok(created)
}

pub async fn get_receiver(db: &DatabaseConnection, user_id: Uuid, id: Uuid) -> Result<order_receiver::Model, ServiceError> {
    owned_receiver(db, user_id, id).await
}

pub async fn update_receiver(db: &DatabaseConnection, user_id: Uuid, id: Uuid, input: ReceiverInput) -> Result<order_receiver::Model, ServiceError> {
    let current = owned_receiver(db, user_id, id).await?;
    let (first, last, phone) = resolve_receiver(db, user_id, input, Some(&current)).await?;
    order_receiver::validate(&first, &last, &phone)?;
    let mut am: order_receiver::ActiveModel = current.into();
    am.first_name = Set(first);
    am.last_name = Set(last);
    am.phone_no = Set(phone);
    am.updated_at = Set(Utc::now().into());
    Ok(am.update(db).await?)
}

pub async fn deactivate_receiver(db: &DatabaseConnection, user_id: Uuid, id: Uuid) -> Result<(), ServiceError> {
    let mut am: order_receiver::ActiveModel = owned_receiver(db, user_id, id).await?.into();
    am.active = Set(false);
    am.updated_at = Set(Utc::now().into());
    am.update(db).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::addresses::{create_address, AddressInput};
    use crate::cart::{add_item, AddItem};
    use crate::catalog::products::{create_product, ProductInput};
    use crate::payment::{ChargeReceipt, PaymentError};
    use crate::test_support::{get_db, seed_user};
    use async_trait::async_trait;
    use models::address::AddressType;

    struct DecliningGateway;

    /// Records every idempotency key it is asked to charge.
    #[derive(Default)]
    struct RecordingGateway {
        keys: std::sync::Mutex<Vec<String>>,
        decline: bool,
    }

    impl RecordingGateway {
        fn keys(&self) -> Vec<String> {
            self.keys.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl PaymentGateway for RecordingGateway {
        fn name(&self) -> &'static str {
            "recording"
        }
        async fn charge(&self, req: &ChargeRequest) -> Result<ChargeReceipt, PaymentError> {
            self.keys.lock().unwrap().push(req.idempotency_key.clone());
            if self.decline {
                return Err(PaymentError::from_vendor("card_error", serde_json::json!({"error": {"type": "card_error"}})));
            }
            Ok(ChargeReceipt { reference: format!("ch_{}", req.idempotency_key) })
        }
    }

    async fn force_initiated(db: &DatabaseConnection, id: Uuid, age: Duration) -> Result<(), anyhow::Error> {
        let o = order::Entity::find_by_id(id).one(db).await?.unwrap();
        let mut am: order::ActiveModel = o.into();
        am.payment_status = Set(PaymentStatus::Initiated);
        am.updated_at = Set((Utc::now() - age).into());
        am.update(db).await?;
        Ok(())
    }

    #[async_trait]
    impl PaymentGateway for DecliningGateway {
        fn name(&self) -> &'static str {
            "declining"
        }
        async fn charge(&self, _req: &ChargeRequest) -> Result<ChargeReceipt, PaymentError> {
            Err(PaymentError::from_vendor("card_error", serde_json::json!({"error": {"type": "card_error"}})))
        }
    }

    fn checkout(gateway: Arc<dyn PaymentGateway>, allow_test_mode: bool) -> Checkout {
        Checkout::new(gateway, "inr", allow_test_mode)
    }

    fn self_receiver() -> ReceiverInput {
        ReceiverInput { user: Some("self".into()), ..Default::default() }
    }

    fn place(receiver: Uuid) -> PlaceOrder {
        PlaceOrder { order_receiver_id: receiver, address_ids: vec![], shipping_cost: 100, payment_token: "tok".into(), test_mode: false }
    }

    async fn filled_cart(db: &DatabaseConnection, owner: &CartOwner) -> Result<(), anyhow::Error> {
        let p = create_product(db, ProductInput::new("Backpack", 3000)).await?;
        add_item(db, owner, AddItem { product_id: p.id, attr_option_id: None, quantity: Some(2) }).await?;
        Ok(())
    }

    #[tokio::test]
    async fn checkout_pays_and_closes_cart() -> Result<(), anyhow::Error> {
        let db = get_db().await?;
        let u = seed_user(&db, "buyer@shop.example").await?;
        let owner = CartOwner::new(Some(u.id), "10.1.1.1");
        filled_cart(&db, &owner).await?;
        let r = create_receiver(&db, u.id, self_receiver()).await?;
        assert_eq!(r.phone_no, "9876543210");
        let addr = create_address(&db, u.id, AddressInput {
            address_type: AddressType::Shipping,
            address_line_1: "1 Main St".into(),
            address_line_2: None,
            city: "Delhi".into(),
            state: "DL".into(),
            country: "IN".into(),
        })
        .await?;

        let mut input = place(r.id);
        input.address_ids.push(addr.id);
        let o = place_order(&db, &checkout(Arc::new(TestGateway), false), &owner, input).await?;
        assert_eq!(o.total, 6100);
        assert_eq!(o.payment_status, PaymentStatus::Paid);
        assert!(o.payment_reference.as_deref().unwrap_or_default().starts_with("test_"));

        let detail = get_order(&db, u.id, o.id).await?;
        assert_eq!(detail.address_ids, vec![addr.id]);
        assert_eq!(detail.items.len(), 1);
        // paid cart is closed, so a new order needs a new cart
        assert!(place_order(&db, &checkout(Arc::new(TestGateway), false), &owner, place(r.id)).await.is_err());
        assert!(matches!(
            pay(&db, &checkout(Arc::new(TestGateway), false), o, "tok", false).await,
            Err(ServiceError::Conflict(_))
        ));
        Ok(())
    }

    #[tokio::test]
    async fn declined_payment_can_be_retried() -> Result<(), anyhow::Error> {
        let db = get_db().await?;
        let u = seed_user(&db, "retry@shop.example").await?;
        let owner = CartOwner::new(Some(u.id), "10.1.1.2");
        filled_cart(&db, &owner).await?;
        let r = create_receiver(&db, u.id, self_receiver()).await?;

        let err = place_order(&db, &checkout(Arc::new(DecliningGateway), true), &owner, place(r.id)).await.unwrap_err();
        assert!(matches!(err, ServiceError::Payment { status: 402, .. }));
        let o = list_orders(&db, u.id).await?.remove(0);
        assert_eq!(o.payment_status, PaymentStatus::Failed);

        // the cart already has an order
        assert!(matches!(
            place_order(&db, &checkout(Arc::new(TestGateway), true), &owner, place(r.id)).await,
            Err(ServiceError::Conflict(_))
        ));

        let retry = PayOrder { payment_token: "tok".into(), test_mode: true };
        let paid = retry_payment(&db, &checkout(Arc::new(DecliningGateway), true), u.id, o.id, retry).await?;
        assert_eq!(paid.payment_status, PaymentStatus::Paid);
        Ok(())
    }

    #[tokio::test]
    async fn test_mode_requires_opt_in() -> Result<(), anyhow::Error> {
        let db = get_db().await?;
        let u = seed_user(&db, "tm@shop.example").await?;
        let owner = CartOwner::new(Some(u.id), "10.1.1.3");
        filled_cart(&db, &owner).await?;
        let r = create_receiver(&db, u.id, self_receiver()).await?;
        let mut input = place(r.id);
        input.test_mode = true;
        let err = place_order(&db, &checkout(Arc::new(DecliningGateway), false), &owner, input).await.unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
        Ok(())
    }

    #[tokio::test]
    async fn ownership_and_status_rules() -> Result<(), anyhow::Error> {
        let db = get_db().await?;
        let u = seed_user(&db, "own@shop.example").await?;
        let other = seed_user(&db, "else@shop.example").await?;
        let owner = CartOwner::new(Some(u.id), "10.1.1.4");
        let theirs = create_receiver(&db, other.id, self_receiver()).await?;

        assert!(matches!(
            place_order(&db, &checkout(Arc::new(TestGateway), false), &owner, place(theirs.id)).await,
            Err(ServiceError::NotFound(_))
        ));
        filled_cart(&db, &owner).await?;
        assert!(matches!(
            place_order(&db, &checkout(Arc::new(TestGateway), false), &owner, place(theirs.id)).await,
            Err(ServiceError::NotFound(_))
        ));
        assert!(matches!(get_receiver(&db, u.id, theirs.id).await, Err(ServiceError::NotFound(_))));

        let mine = create_receiver(&db, u.id, ReceiverInput {
            user: None,
            first_name: Some("Asha".into()),
            last_name: Some("Rao".into()),
            phone_no: Some("9123456789".into()),
        })
        .await?;
        let upd = update_receiver(&db, u.id, mine.id, ReceiverInput { first_name: Some("Usha".into()), ..Default::default() }).await?;
        assert_eq!((upd.first_name.as_str(), upd.last_name.as_str()), ("Usha", "Rao"));

        let o = place_order(&db, &checkout(Arc::new(TestGateway), false), &owner, place(mine.id)).await?;
        assert!(matches!(get_order(&db, other.id, o.id).await, Err(ServiceError::NotFound(_))));

        update_status(&db, o.id, OrderStatus::Shipped).await?;
        assert!(matches!(cancel_order(&db, u.id, o.id).await, Err(ServiceError::Conflict(_))));
        assert!(matches!(update_status(&db, o.id, OrderStatus::Placed).await, Err(ServiceError::Validation(_))));
        update_status(&db, o.id, OrderStatus::Delivered).await?;
        assert_eq!(list_all_orders(&db, Pagination::default()).await?.total_items, 1);

        deactivate_receiver(&db, u.id, mine.id).await?;
        assert!(get_receiver(&db, u.id, mine.id).await.is_err());
        Ok(())
    }

    #[tokio::test]
    async fn placed_orders_can_be_cancelled_once() -> Result<(), anyhow::Error> {
        let db = get_db().await?;
        let u = seed_user(&db, "cancel@shop.example").await?;
        let owner = CartOwner::new(Some(u.id), "10.1.1.5");
        filled_cart(&db, &owner).await?;
        let r = create_receiver(&db, u.id, self_receiver()).await?;
        let _ = place_order(&db, &checkout(Arc::new(DecliningGateway), false), &owner, place(r.id)).await;
        let o = list_orders(&db, u.id).await?.remove(0);

        let c = cancel_order(&db, u.id, o.id).await?;
        assert_eq!(c.status, OrderStatus::Cancelled);
        assert!(matches!(cancel_order(&db, u.id, o.id).await, Err(ServiceError::Conflict(_))));
        let retry = PayOrder { payment_token: "tok".into(), test_mode: false };
        assert!(matches!(
            retry_payment(&db, &checkout(Arc::new(TestGateway), false), u.id, o.id, retry).await,
            Err(ServiceError::Conflict(_))
        ));
        Ok(())
    }

    #[tokio::test]
    async fn cancelled_order_returns_lines_to_a_new_cart() -> Result<(), anyhow::Error> {
        let db = get_db().await?;
        let u = seed_user(&db, "again@shop.example").await?;
        let owner = CartOwner::new(Some(u.id), "10.1.1.6");
        filled_cart(&db, &owner).await?;
        let r = create_receiver(&db, u.id, self_receiver()).await?;
        let _ = place_order(&db, &checkout(Arc::new(DecliningGateway), false), &owner, place(r.id)).await;
        let first = list_orders(&db, u.id).await?.remove(0);

        cancel_order(&db, u.id, first.id).await?;
        let view = crate::cart::get_cart(&db, &owner).await?;
        assert_ne!(view.cart.id, first.cart_id);
        assert_eq!(view.cart_items.len(), 1);
        assert_eq!(view.cart_items[0].quantity, 2);

        let second = place_order(&db, &checkout(Arc::new(TestGateway), false), &owner, place(r.id)).await?;
        assert_eq!(second.payment_status, PaymentStatus::Paid);
        assert_eq!(second.total, 6100);
        Ok(())
    }

    #[tokio::test]
    async fn order_lines_are_frozen_at_checkout() -> Result<(), anyhow::Error> {
        let db = get_db().await?;
        let u = seed_user(&db, "frozen@shop.example").await?;
        let owner = CartOwner::new(Some(u.id), "10.1.1.7");
        filled_cart(&db, &owner).await?;
        let r = create_receiver(&db, u.id, self_receiver()).await?;
        let _ = place_order(&db, &checkout(Arc::new(DecliningGateway), false), &owner, place(r.id)).await;
        let o = list_orders(&db, u.id).await?.remove(0);

        // the checked-out cart rejects edits while the order is open
        let extra = create_product(&db, ProductInput::new("Tent", 50000)).await?;
        let add_extra = AddItem { product_id: extra.id, attr_option_id: None, quantity: None };
        assert!(matches!(add_item(&db, &owner, add_extra).await, Err(ServiceError::Conflict(_))));

        // later price changes do not touch the order
        let line = get_order(&db, u.id, o.id).await?.items.remove(0);
        let p = models::product::Entity::find_by_id(line.product_id).one(&db).await?.unwrap();
        let mut am: models::product::ActiveModel = p.into();
        am.price = Set(9000);
        am.update(&db).await?;

        let detail = get_order(&db, u.id, o.id).await?;
        assert_eq!(detail.items.len(), 1);
        assert_eq!((detail.items[0].unit_price, detail.items[0].line_price), (3000, 6000));
        let item_sum: i64 = detail.items.iter().map(|i| i.line_price).sum();
        assert_eq!(item_sum + detail.order.shipping_cost, detail.order.total);
        Ok(())
    }

    #[tokio::test]
    async fn charge_is_claimed_once_per_attempt() -> Result<(), anyhow::Error> {
        let db = get_db().await?;
        let u = seed_user(&db, "race@shop.example").await?;
        let owner = CartOwner::new(Some(u.id), "10.1.1.8");
        filled_cart(&db, &owner).await?;
        let r = create_receiver(&db, u.id, self_receiver()).await?;
        let declining = Arc::new(RecordingGateway { decline: true, ..Default::default() });
        let _ = place_order(&db, &checkout(declining.clone(), false), &owner, place(r.id)).await;
        let failed = list_orders(&db, u.id).await?.remove(0);
        assert_eq!(declining.keys(), vec![format!("{}:1", failed.id)]);

        // two callers holding the same failed snapshot: only the first wins
        let claimed = claim_charge(&db, &failed).await?;
        assert_eq!((claimed.payment_status, claimed.payment_attempts), (PaymentStatus::Initiated, 2));
        assert!(matches!(claim_charge(&db, &failed).await, Err(ServiceError::Conflict(_))));

        // a charge still in flight cannot be retried or cancelled
        let retry = PayOrder { payment_token: "tok".into(), test_mode: false };
        let gateway = Arc::new(RecordingGateway::default());
        assert!(matches!(
            retry_payment(&db, &checkout(gateway.clone(), false), u.id, failed.id, retry.clone()).await,
            Err(ServiceError::Conflict(_))
        ));
        assert!(matches!(cancel_order(&db, u.id, failed.id).await, Err(ServiceError::Conflict(_))));
        assert!(gateway.keys().is_empty());
        Ok(())
    }

    #[tokio::test]
    async fn stale_charge_is_resent_with_the_same_key() -> Result<(), anyhow::Error> {
        let db = get_db().await?;
        let u = seed_user(&db, "stuck@shop.example").await?;
        let owner = CartOwner::new(Some(u.id), "10.1.1.9");
        filled_cart(&db, &owner).await?;
        let r = create_receiver(&db, u.id, self_receiver()).await?;
        let _ = place_order(&db, &checkout(Arc::new(DecliningGateway), false), &owner, place(r.id)).await;
        let o = list_orders(&db, u.id).await?.remove(0);
        assert_eq!(o.payment_attempts, 1);

        // charge went out but its outcome was never recorded
        force_initiated(&db, o.id, Duration::hours(1)).await?;
        let gateway = Arc::new(RecordingGateway::default());
        let retry = PayOrder { payment_token: "tok".into(), test_mode: false };
        let paid = retry_payment(&db, &checkout(gateway.clone(), false), u.id, o.id, retry).await?;
        assert_eq!(paid.payment_status, PaymentStatus::Paid);
        assert_eq!(paid.payment_attempts, 1);
        assert_eq!(gateway.keys(), vec![format!("{}:1", o.id)]);
        assert_eq!(paid.payment_reference, Some(format!("ch_{}:1", o.id)));
        Ok(())
    }
}
