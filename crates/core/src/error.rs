use thiserror::Error;

use crate::model::{ElementKind, EntryId, PercentError};

/// Raised when an entry graph does not have the shape a parser expects.
#[derive(Debug, Error, Clone, PartialEq)]
#[non_exhaustive]
pub enum ContentError {
    #[error("entry {entry_id} has no name")]
    MissingName { entry_id: EntryId },

    #[error("entry {entry_id} is missing element {api_name}")]
    MissingElement { entry_id: EntryId, api_name: String },

    #[error("entry {entry_id} was not expanded")]
    NotExpanded { entry_id: EntryId },

    #[error("element {api_name} of entry {entry_id} holds {found}, expected {expected}")]
    UnexpectedKind {
        entry_id: EntryId,
        api_name: String,
        expected: ElementKind,
        found: ElementKind,
    },

    #[error("course order of entry {entry_id} is not valid JSON: {reason}")]
    InvalidCourseOrder { entry_id: EntryId, reason: String },

    #[error("entry {entry_id}: {source}")]
    InvalidPercent {
        entry_id: EntryId,
        source: PercentError,
    },
}
