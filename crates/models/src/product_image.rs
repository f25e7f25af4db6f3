use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::ModelError;

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "product_images")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub product_slug: String,
    pub image_name: String,
    pub active: bool,
    pub created_at: DateTimeWithTimeZone,
    pub updated_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

/// Image names are plain file names inside the image directory.
pub fn validate_image_name(name: &str) -> Result<(), ModelError> {
    let bad = name.is_empty()
        || name.len() > 255
        || name.contains('/')
        || name.contains('\\')
        || name.starts_with('.');
    if bad {
        return Err(ModelError::Validation(format!("invalid image name: {name}")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::validate_image_name;

    #[test]
    fn rejects_paths() {
        assert!(validate_image_name("front.png").is_ok());
        assert!(validate_image_name("../etc/passwd").is_err());
        assert!(validate_image_name("a/b.png").is_err());
        assert!(validate_image_name(".hidden").is_err());
    }
}
