//! Dashboard HTTP routes.
//!
//! Every summary route reads the archive fresh on each request; the archive
//! is never written from here.

use std::sync::Arc;

use axum::Router;
use object_store::path::Path as ObjectPath;
use object_store::ObjectStore;

use crate::archive::read_archive;
use crate::error::Result;
use crate::models::RawReading;

mod health;
mod summary;

// ---

/// Read-only handle on the consolidated archive.
#[derive(Clone)]
pub struct ArchiveSource {
    pub store: Arc<dyn ObjectStore>,
    pub key: ObjectPath,
}

impl ArchiveSource {
    pub fn new(store: Arc<dyn ObjectStore>, key: impl Into<ObjectPath>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    pub async fn load(&self) -> Result<Vec<RawReading>> {
        read_archive(self.store.as_ref(), &self.key).await
    }
}

pub fn router(source: ArchiveSource) -> Router {
    // ---
    Router::new()
        .merge(summary::router())
        .merge(health::router())
        .with_state(source)
}
