use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::ModelError;

#[derive(Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(16))")]
#[serde(rename_all = "lowercase")]
pub enum CouponType {
    /// `value` is a percentage of the line price, capped by `max_value`.
    #[sea_orm(string_value = "percentage")]
    Percentage,
    /// `value` is a flat amount off the line price.
    #[sea_orm(string_value = "price")]
    Price,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "coupons")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub code: String,
    pub coupon_type: CouponType,
    pub value: i64,
    pub max_value: Option<i64>,
    pub start_at: DateTimeWithTimeZone,
    pub expire_at: DateTimeWithTimeZone,
    pub active: bool,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

pub fn validate(
    coupon_type: CouponType,
    value: i64,
    max_value: Option<i64>,
    start_at: DateTimeWithTimeZone,
    expire_at: DateTimeWithTimeZone,
) -> Result<(), ModelError> {
    if start_at >= expire_at {
        return Err(ModelError::Validation("coupon start must be before expiry".into()));
    }
    if value <= 0 {
        return Err(ModelError::Validation("coupon value must be positive".into()));
    }
    if coupon_type == CouponType::Percentage && value > 100 {
        return Err(ModelError::Validation("percentage coupon value must be <= 100".into()));
    }
    if matches!(max_value, Some(m) if m < 0) {
        return Err(ModelError::Validation("max_value must not be negative".into()));
    }
    Ok(())
}
