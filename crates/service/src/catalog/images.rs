//! Product image records. Files live under `<images_dir>/product_<slug>/`;
//! only names registered here are ever served.

use std::path::{Path, PathBuf};

use chrono::Utc;
use sea_orm::{ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use models::product_image as image;

use super::products;
use crate::errors::ServiceError;

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "gif", "webp", "bmp"];

fn extension(name: &str) -> Option<String> {
    Path::new(name).extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase)
}

pub fn validate_name(name: &str) -> Result<(), ServiceError> {
    image::validate_image_name(name)?;
    match extension(name) {
        Some(ext) if IMAGE_EXTENSIONS.contains(&ext.as_str()) => Ok(()),
        _ => Err(ServiceError::Validation(format!("unsupported image type: {name}"))),
    }
}

pub fn content_type_for(name: &str) -> &'static str {
    match extension(name).as_deref() {
        Some("png") => "image/png",
        Some("gif") => "image/gif",
        Some("webp") => "image/webp",
        Some("bmp") => "image/bmp",
        _ => "image/jpeg",
    }
}

pub fn image_path(images_dir: &Path, slug: &str, name: &str) -> PathBuf {
    images_dir.join(format!("product_{slug}")).join(name)
}

async fn find_record(db: &DatabaseConnection, slug: &str, name: &str) -> Result<image::Model, ServiceError> {
    image::Entity::find()
        .filter(image::Column::ProductSlug.eq(slug))
        .filter(image::Column::ImageName.eq(name))
        .filter(image::Column::Active.eq(true))
        .one(db)
        .await?
        .ok_or_else(|| ServiceError::not_found("image_not_found"))
}

/// Register names for a product; already registered names are skipped.
#[instrument(skip(db, names), fields(count = names.len()))]
pub async fn register_images(db: &DatabaseConnection, slug: &str, names: &[String]) -> Result<Vec<image::Model>, ServiceError> {
    products::get_product(db, slug).await?;
    if names.is_empty() {
        return Err(ServiceError::validation("image_not_found"));
    }
    for n in names {
        validate_name(n)?;
    }
    let mut out = Vec::with_capacity(names.len());
    for n in names {
        if let Ok(existing) = find_record(db, slug, n).await {
            out.push(existing);
            continue;
        }
        let now = Utc::now().into();
        let created = image::ActiveModel {
            id: Set(Uuid::new_v4()),
            product_slug: Set(slug.to_string()),
            image_name: Set(n.clone()),
            active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        }
        .insert(db)
        .await?;
        out.push(created);
    }
    info!(event = "images_registered", %slug, count = out.len());
    Ok(out)
}

pub async fn list_images(db: &DatabaseConnection, slug: &str) -> Result<Vec<image::Model>, ServiceError> {
    let list = image::Entity::find()
        .filter(image::Column::ProductSlug.eq(slug))
        .filter(image::Column::Active.eq(true))
        .order_by_asc(image::Column::CreatedAt)
        .all(db)
        .await?;
    if list.is_empty() {
        return Err(ServiceError::not_found("image_not_found"));
    }
    Ok(list)
}

/// Bytes of a registered image; 404 when unregistered or missing on disk.
pub async fn read_image(db: &DatabaseConnection, images_dir: &Path, slug: &str, name: &str) -> Result<Vec<u8>, ServiceError> {
    validate_name(name)?;
    find_record(db, slug, name).await?;
    let path = image_path(images_dir, slug, name);
    tokio::fs::read(&path).await.map_err(|e| {
        warn!(path = %path.display(), error = %e, "image file unreadable");
        ServiceError::not_found("image_not_found")
    })
}

pub async fn deactivate_image(db: &DatabaseConnection, slug: &str, name: &str) -> Result<(), ServiceError> {
    let mut am: image::ActiveModel = find_record(db, slug, name).await?.into();
    am.active = Set(false);
    am.updated_at = Set(Utc::now().into());
    am.update(db).await?;
    info!(event = "image_deactivated", %slug, %name);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::products::{create_product, ProductInput};
    use crate::test_support::get_db;

    #[test]
    fn names_and_types() {
        assert!(validate_name("front.PNG").is_ok());
        assert!(validate_name("notes.txt").is_err());
        assert!(validate_name("../x.png").is_err());
        assert_eq!(content_type_for("a.webp"), "image/webp");
        assert_eq!(content_type_for("a.jpeg"), "image/jpeg");
    }

    #[tokio::test]
    async fn only_registered_files_are_served() -> Result<(), anyhow::Error> {
        let db = get_db().await?;
        create_product(&db, ProductInput::new("Chair", 3000)).await?;
        let dir = std::env::temp_dir().join(format!("storefront-img-{}", Uuid::new_v4()));
        tokio::fs::create_dir_all(dir.join("product_chair")).await?;
        tokio::fs::write(image_path(&dir, "chair", "side.png"), b"png-bytes").await?;
        tokio::fs::write(image_path(&dir, "chair", "secret.png"), b"hidden").await?;

        assert!(matches!(list_images(&db, "chair").await, Err(ServiceError::NotFound(_))));
        register_images(&db, "chair", &["side.png".to_string()]).await?;
        assert_eq!(list_images(&db, "chair").await?.len(), 1);
        assert_eq!(read_image(&db, &dir, "chair", "side.png").await?, b"png-bytes".to_vec());
        assert!(matches!(read_image(&db, &dir, "chair", "secret.png").await, Err(ServiceError::NotFound(_))));

        deactivate_image(&db, "chair", "side.png").await?;
        assert!(read_image(&db, &dir, "chair", "side.png").await.is_err());
        let _ = tokio::fs::remove_dir_all(&dir).await;
        Ok(())
    }
}
