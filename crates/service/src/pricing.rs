//! Cart and order pricing.
//!
//! All amounts are integer minor units. A coupon discounts a line only when
//! the line's product is mapped to that coupon and `start < now < expire`.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use models::coupon::CouponType;

use crate::errors::ServiceError;

/// The parts of a coupon that affect a price.
#[derive(Clone, Debug)]
pub struct CouponTerms {
    pub coupon_type: CouponType,
    pub value: i64,
    pub max_value: Option<i64>,
    pub start_at: DateTime<Utc>,
    pub expire_at: DateTime<Utc>,
    pub product_ids: HashSet<Uuid>,
}

impl CouponTerms {
    pub fn from_model(coupon: &models::coupon::Model, product_ids: HashSet<Uuid>) -> Self {
        Self {
            coupon_type: coupon.coupon_type,
            value: coupon.value,
            max_value: coupon.max_value,
            start_at: coupon.start_at.with_timezone(&Utc),
            expire_at: coupon.expire_at.with_timezone(&Utc),
            product_ids,
        }
    }

    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.start_at < now && now < self.expire_at
    }
}

/// One priced cart line.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Line {
    pub product_id: Uuid,
    pub unit_price: i64,
    pub quantity: i32,
}

/// Discount a live coupon gives on `price`; never more than `price` itself.
pub fn discount_for(coupon: &CouponTerms, price: i64, now: DateTime<Utc>) -> i64 {
    if !coupon.is_live(now) || price <= 0 {
        return 0;
    }
    match coupon.coupon_type {
        CouponType::Percentage => {
            let pct = price.saturating_mul(coupon.value) / 100;
            pct.min(coupon.max_value.unwrap_or(i64::MAX)).min(price)
        }
        CouponType::Price => coupon.value.min(price),
    }
}

/// Product price plus the selected option's price change.
pub fn unit_price(product_price: i64, option_price_change: Option<i64>) -> i64 {
    product_price.saturating_add(option_price_change.unwrap_or(0))
}

pub fn line_price(unit: i64, quantity: i32) -> i64 {
    unit.saturating_mul(i64::from(quantity))
}

pub fn cart_total(lines: &[Line], coupon: Option<&CouponTerms>, now: DateTime<Utc>) -> i64 {
    lines
        .iter()
        .map(|line| {
            let price = line_price(line.unit_price, line.quantity);
            let discount = match coupon {
                Some(c) if c.product_ids.contains(&line.product_id) => discount_for(c, price, now),
                _ => 0,
            };
            price - discount
        })
        .sum()
}

pub fn ensure_cart_total(total: i64) -> Result<(), ServiceError> {
    if total < 0 {
        return Err(ServiceError::validation("cart_total_negative"));
    }
    Ok(())
}

pub fn ensure_order_total(total: i64) -> Result<(), ServiceError> {
    if total <= 0 {
        return Err(ServiceError::validation("order_total_invalid"));
    }
    Ok(())
}
