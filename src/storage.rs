//! Object storage client for the long-term archive.

use std::sync::Arc;

use object_store::aws::AmazonS3Builder;
use object_store::ObjectStore;

use crate::config::StorageConfig;
use crate::error::Result;

// ---

/// Build an S3 client for the archive bucket.
pub fn connect(config: &StorageConfig) -> Result<Arc<dyn ObjectStore>> {
    // ---
    let s3 = AmazonS3Builder::new()
        .with_bucket_name(&config.bucket_name)
        .with_region(&config.region)
        .with_access_key_id(&config.access_key_id)
        .with_secret_access_key(&config.secret_access_key)
        .build()?;

    tracing::info!("Connected to bucket {}", config.bucket_name);
    Ok(Arc::new(s3))
}
