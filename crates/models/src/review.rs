use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::ModelError;
use crate::{product, user};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "reviews")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub product_id: Uuid,
    pub user_id: Uuid,
    pub ratings: i16,
    #[sea_orm(column_type = "Text", nullable)]
    pub comments: Option<String>,
    pub active: bool,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {
    Product,
    User,
}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Relation::Product => Entity::belongs_to(product::Entity)
                .from(Column::ProductId)
                .to(product::Column::Id)
                .into(),
            Relation::User => Entity::belongs_to(user::Entity)
                .from(Column::UserId)
                .to(user::Column::Id)
                .into(),
        }
    }
}

impl ActiveModelBehavior for ActiveModel {}

pub fn validate_ratings(ratings: i16) -> Result<(), ModelError> {
    if !(1..=5).contains(&ratings) {
        return Err(ModelError::Validation("ratings must be between 1 and 5".into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::validate_ratings;

    #[test]
    fn ratings_range() {
        assert!(validate_ratings(1).is_ok());
        assert!(validate_ratings(5).is_ok());
        assert!(validate_ratings(0).is_err());
        assert!(validate_ratings(6).is_err());
    }
}
