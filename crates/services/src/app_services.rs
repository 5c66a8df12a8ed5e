use std::sync::Arc;

use storage::repository::Storage;

use crate::aggregator::ProgressAggregator;
use crate::catalog::ContentCatalog;
use crate::deletion::CascadeDeletion;
use crate::error::ServicesError;
use crate::progress_store::ProgressStore;

/// Assembles the services over one storage backend.
#[derive(Clone)]
pub struct AppServices {
    catalog: Arc<ContentCatalog>,
    progress: Arc<ProgressStore>,
    aggregator: Arc<ProgressAggregator>,
    deletion: Arc<CascadeDeletion>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `ServicesError` if storage initialization fails.
    pub async fn new_sqlite(db_url: &str) -> Result<Self, ServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::from_storage(&storage))
    }

    #[must_use]
    pub fn from_storage(storage: &Storage) -> Self {
        let catalog = ContentCatalog::new(Arc::clone(&storage.entries));
        let progress = ProgressStore::new(Arc::clone(&storage.progress));
        let aggregator = ProgressAggregator::new(catalog.clone(), progress.clone());
        let deletion = CascadeDeletion::new(
            Arc::clone(&storage.entries),
            catalog.clone(),
            progress.clone(),
        );

        Self {
            catalog: Arc::new(catalog),
            progress: Arc::new(progress),
            aggregator: Arc::new(aggregator),
            deletion: Arc::new(deletion),
        }
    }

    #[must_use]
    pub fn catalog(&self) -> Arc<ContentCatalog> {
        Arc::clone(&self.catalog)
    }

    #[must_use]
    pub fn progress(&self) -> Arc<ProgressStore> {
        Arc::clone(&self.progress)
    }

    #[must_use]
    pub fn aggregator(&self) -> Arc<ProgressAggregator> {
        Arc::clone(&self.aggregator)
    }

    #[must_use]
    pub fn deletion(&self) -> Arc<CascadeDeletion> {
        Arc::clone(&self.deletion)
    }
}
