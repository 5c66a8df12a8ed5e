use chrono::{DateTime, Utc};
use lms_core::model::{Element, Entry, EntryId, LocalizedText, Percent, ProgressRecord, UserId};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use crate::graph::StoredEntry;
use crate::repository::StorageError;

pub(crate) fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn conn<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

/// Map insert failures, turning uniqueness violations into `Conflict`.
pub(crate) fn insert_error(e: sqlx::Error) -> StorageError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => StorageError::Conflict,
        _ => conn(e),
    }
}

pub(crate) fn map_entry_row(row: &SqliteRow) -> Result<StoredEntry, StorageError> {
    let created_at: DateTime<Utc> = row.try_get("created_at").map_err(ser)?;
    let name: Vec<LocalizedText> =
        serde_json::from_str(&row.try_get::<String, _>("name").map_err(ser)?).map_err(ser)?;
    let elements: Vec<Element> =
        serde_json::from_str(&row.try_get::<String, _>("elements").map_err(ser)?).map_err(ser)?;

    Ok(StoredEntry {
        seq: row.try_get("seq").map_err(ser)?,
        model: row.try_get("model").map_err(ser)?,
        api_name: row.try_get("api_name").map_err(ser)?,
        entry: Entry {
            id: EntryId::new(row.try_get::<String, _>("id").map_err(ser)?),
            created_at: Some(created_at),
            name,
            elements: Some(elements),
        },
    })
}

pub(crate) fn map_progress_row(row: &SqliteRow) -> Result<ProgressRecord, StorageError> {
    Ok(ProgressRecord {
        id: EntryId::new(row.try_get::<String, _>("id").map_err(ser)?),
        user_id: UserId::new(row.try_get::<String, _>("user_id").map_err(ser)?),
        entry_id: EntryId::new(row.try_get::<String, _>("entry_id").map_err(ser)?),
        percent: Percent::new(row.try_get::<i64, _>("percent").map_err(ser)?).map_err(ser)?,
    })
}
