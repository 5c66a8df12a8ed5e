//! Shared error types for the services crate.

use thiserror::Error;

use lms_core::ContentError;
use lms_core::model::EntryId;
use storage::repository::StorageError;
use storage::sqlite::SqliteInitError;

/// Errors emitted by `ContentCatalog`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum CatalogError {
    #[error("{model} entry {id} not found")]
    NotFound { model: &'static str, id: EntryId },
    #[error(transparent)]
    Content(#[from] ContentError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `ProgressStore` and `ProgressAggregator`.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ProgressError {
    #[error("no course references lesson {lesson_id}")]
    CourseNotFound { lesson_id: EntryId },
    #[error("course {course_id} has no section containing lesson {lesson_id}")]
    SectionNotFound {
        course_id: EntryId,
        lesson_id: EntryId,
    },
    #[error("no percent given for entry {entry_id}")]
    MissingPercent { entry_id: EntryId },
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted by `CascadeDeletion`. The cascade stops at the first one.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DeletionError {
    #[error(transparent)]
    Progress(#[from] ProgressError),
    #[error(transparent)]
    Catalog(#[from] CatalogError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

/// Errors emitted while bootstrapping services.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ServicesError {
    #[error(transparent)]
    Sqlite(#[from] SqliteInitError),
}
