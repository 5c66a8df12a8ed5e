//! Persistence for content entries and per-user progress.
//!
//! `repository` holds the contracts and the in-memory backend, `sqlite` the
//! durable one. `entry_progress` stores progress as ordinary entries, the way
//! a hosted content API does.

#![forbid(unsafe_code)]

pub mod entry_progress;
pub mod graph;
pub mod repository;
pub mod sqlite;

pub use repository::{
    ElementFilter, ElementMatch, EntryQuery, EntryRepository, IdFilter, InMemoryRepository,
    NewEntry, ProgressRepository, Storage, StorageError,
};
