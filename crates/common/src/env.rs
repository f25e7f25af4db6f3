//! Environment/runtime helpers
//!
//! Sanity checks to ensure expected directories exist at startup.

use tracing::warn;

/// Ensure the product image directory exists; create it when missing.
pub async fn ensure_env(images_dir: &str) -> anyhow::Result<()> {
    if tokio::fs::metadata(images_dir).await.is_err() {
        warn!(%images_dir, "image directory not found; creating it");
    }
    tokio::fs::create_dir_all(images_dir)
        .await
        .map_err(|e| anyhow::anyhow!("cannot create {images_dir}: {e}"))?;
    Ok(())
}
