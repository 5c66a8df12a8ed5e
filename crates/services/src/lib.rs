#![forbid(unsafe_code)]

pub mod aggregator;
pub mod app_services;
pub mod catalog;
pub mod deletion;
pub mod error;
pub mod progress_store;

pub use aggregator::{CourseProgress, ProgressAggregator, ProgressUpdate, RollUp};
pub use app_services::AppServices;
pub use catalog::ContentCatalog;
pub use deletion::CascadeDeletion;
pub use error::{CatalogError, DeletionError, ProgressError, ServicesError};
pub use progress_store::ProgressStore;
