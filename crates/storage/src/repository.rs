use async_trait::async_trait;
use chrono::{DateTime, Utc};
use lms_core::model::{
    Context, Element, Entry, EntryId, NewProgressRecord, Percent, ProgressRecord, ProjectId,
    UserId,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use thiserror::Error;

use crate::entry_progress::EntryProgressRepository;
use crate::graph::{EntryGraph, StoredEntry};

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("not found")]
    NotFound,

    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

//
// ─── QUERIES ───────────────────────────────────────────────────────────────────
//

/// Restriction on entry ids.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum IdFilter {
    #[default]
    Any,
    Single(EntryId),
    In(Vec<EntryId>),
    NotIn(Vec<EntryId>),
}

impl IdFilter {
    #[must_use]
    pub fn accepts(&self, id: &EntryId) -> bool {
        match self {
            Self::Any => true,
            Self::Single(expected) => expected == id,
            Self::In(ids) => ids.contains(id),
            Self::NotIn(ids) => !ids.contains(id),
        }
    }
}

/// How an element's value must look for an entry to match.
#[derive(Debug, Clone, PartialEq)]
pub enum ElementMatch {
    /// Text element whose first value equals the string.
    Equals(String),
    /// Text element whose first value is one of the strings.
    In(Vec<String>),
    /// Users element that references the user.
    User(UserId),
    /// Reference element that contains the entry.
    ContainsEntry(EntryId),
    /// Reference element that contains an entry matching every nested filter.
    ContainsEntryWhere(Vec<ElementFilter>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ElementFilter {
    pub api_name: String,
    pub matcher: ElementMatch,
}

/// Selection of entries within one project.
///
/// `depth` controls reference expansion in the result: at depth 0 every
/// reference is a stub, at depth 1 direct children carry their elements but
/// grandchildren are stubs, and so on.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntryQuery {
    pub model: Option<String>,
    pub ids: IdFilter,
    pub elements: Vec<ElementFilter>,
    pub depth: u8,
}

impl EntryQuery {
    /// Entries of one content model.
    #[must_use]
    pub fn model(model: &str) -> Self {
        Self {
            model: Some(model.to_owned()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn id(mut self, id: &EntryId) -> Self {
        self.ids = IdFilter::Single(id.clone());
        self
    }

    #[must_use]
    pub fn ids(mut self, ids: &[EntryId]) -> Self {
        self.ids = IdFilter::In(ids.to_vec());
        self
    }

    #[must_use]
    pub fn excluding(mut self, ids: &[EntryId]) -> Self {
        self.ids = IdFilter::NotIn(ids.to_vec());
        self
    }

    #[must_use]
    pub fn element(mut self, api_name: &str, matcher: ElementMatch) -> Self {
        self.elements.push(ElementFilter {
            api_name: api_name.to_owned(),
            matcher,
        });
        self
    }

    #[must_use]
    pub fn depth(mut self, depth: u8) -> Self {
        self.depth = depth;
        self
    }
}

/// Entry about to be created.
#[derive(Debug, Clone, PartialEq)]
pub struct NewEntry {
    /// Explicit id; a fresh one is minted when `None`.
    pub id: Option<EntryId>,
    pub model: String,
    pub api_name: String,
    pub name: String,
    /// Creation time; defaults to now.
    pub created_at: Option<DateTime<Utc>>,
    pub elements: Vec<Element>,
}

impl NewEntry {
    #[must_use]
    pub fn new(model: &str, api_name: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: None,
            model: model.to_owned(),
            api_name: api_name.into(),
            name: name.into(),
            created_at: None,
            elements: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: EntryId) -> Self {
        self.id = Some(id);
        self
    }

    #[must_use]
    pub fn created_at(mut self, at: DateTime<Utc>) -> Self {
        self.created_at = Some(at);
        self
    }

    #[must_use]
    pub fn element(mut self, element: Element) -> Self {
        self.elements.push(element);
        self
    }
}

//
// ─── CONTRACTS ─────────────────────────────────────────────────────────────────
//

/// Repository contract mirroring the content API's entry operations.
#[async_trait]
pub trait EntryRepository: Send + Sync {
    /// Fetch entries matching the query, in creation order.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend cannot be read.
    async fn get_entries(
        &self,
        project: &ProjectId,
        query: &EntryQuery,
    ) -> Result<Vec<Entry>, StorageError>;

    /// Create an entry and return its id.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if an explicit id is already taken.
    async fn create_entry(
        &self,
        project: &ProjectId,
        entry: NewEntry,
    ) -> Result<EntryId, StorageError>;

    /// Replace the elements that share an api name with `elements`, appending new ones.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the entry does not exist.
    async fn update_elements(
        &self,
        project: &ProjectId,
        id: &EntryId,
        elements: Vec<Element>,
    ) -> Result<(), StorageError>;

    /// Permanently delete entries. Unknown ids are ignored.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend rejects the deletion.
    async fn delete_entries(&self, project: &ProjectId, ids: &[EntryId])
    -> Result<(), StorageError>;
}

/// Repository contract for per-user progress records.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// Records of the context user for the given entries.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if records cannot be read or decoded.
    async fn find_progress(
        &self,
        ctx: &Context,
        entry_ids: &[EntryId],
    ) -> Result<Vec<ProgressRecord>, StorageError>;

    /// # Errors
    ///
    /// Returns `StorageError::Conflict` on backends that enforce one record per
    /// (project, user, entry) and already hold one.
    async fn create_progress(
        &self,
        ctx: &Context,
        record: &NewProgressRecord,
    ) -> Result<ProgressRecord, StorageError>;

    /// Set the percent of every record the context user has for `entry_id`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the update fails.
    async fn update_progress(
        &self,
        ctx: &Context,
        entry_id: &EntryId,
        percent: Percent,
    ) -> Result<(), StorageError>;

    /// Delete the context user's records for the given entries.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the deletion fails.
    async fn delete_progress(&self, ctx: &Context, entry_ids: &[EntryId])
    -> Result<(), StorageError>;

    /// Update the record for `record.entry_id` or create it.
    ///
    /// The default is a query followed by an update or a create; two callers
    /// racing on the same entry can both create. Backends with a uniqueness
    /// guarantee override it with a single atomic write.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if any step fails.
    async fn upsert_progress(
        &self,
        ctx: &Context,
        record: &NewProgressRecord,
    ) -> Result<(), StorageError> {
        let existing = self
            .find_progress(ctx, std::slice::from_ref(&record.entry_id))
            .await?;
        if existing.is_empty() {
            self.create_progress(ctx, record).await?;
        } else {
            self.update_progress(ctx, &record.entry_id, record.percent)
                .await?;
        }
        Ok(())
    }
}

//
// ─── IN-MEMORY ─────────────────────────────────────────────────────────────────
//

type ProgressKey = (ProjectId, UserId, EntryId);

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    entries: Arc<Mutex<HashMap<ProjectId, EntryGraph>>>,
    progress: Arc<Mutex<HashMap<ProgressKey, ProgressRecord>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned<E: std::fmt::Display>(e: E) -> StorageError {
    StorageError::Connection(e.to_string())
}

#[async_trait]
impl EntryRepository for InMemoryRepository {
    async fn get_entries(
        &self,
        project: &ProjectId,
        query: &EntryQuery,
    ) -> Result<Vec<Entry>, StorageError> {
        let guard = self.entries.lock().map_err(poisoned)?;
        Ok(guard
            .get(project)
            .map(|graph| graph.select(query))
            .unwrap_or_default())
    }

    async fn create_entry(
        &self,
        project: &ProjectId,
        entry: NewEntry,
    ) -> Result<EntryId, StorageError> {
        let mut guard = self.entries.lock().map_err(poisoned)?;
        let graph = guard.entry(project.clone()).or_default();
        let stored = StoredEntry::from_new(entry, graph.next_seq());
        let id = stored.entry.id.clone();
        graph.insert(stored)?;
        Ok(id)
    }

    async fn update_elements(
        &self,
        project: &ProjectId,
        id: &EntryId,
        elements: Vec<Element>,
    ) -> Result<(), StorageError> {
        let mut guard = self.entries.lock().map_err(poisoned)?;
        guard
            .get_mut(project)
            .ok_or(StorageError::NotFound)?
            .update_elements(id, elements)
    }

    async fn delete_entries(
        &self,
        project: &ProjectId,
        ids: &[EntryId],
    ) -> Result<(), StorageError> {
        let mut guard = self.entries.lock().map_err(poisoned)?;
        if let Some(graph) = guard.get_mut(project) {
            graph.remove(ids);
        }
        Ok(())
    }
}

fn progress_key(ctx: &Context, entry_id: &EntryId) -> ProgressKey {
    (ctx.project().clone(), ctx.user().clone(), entry_id.clone())
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn find_progress(
        &self,
        ctx: &Context,
        entry_ids: &[EntryId],
    ) -> Result<Vec<ProgressRecord>, StorageError> {
        let guard = self.progress.lock().map_err(poisoned)?;
        Ok(entry_ids
            .iter()
            .filter_map(|id| guard.get(&progress_key(ctx, id)).cloned())
            .collect())
    }

    async fn create_progress(
        &self,
        ctx: &Context,
        record: &NewProgressRecord,
    ) -> Result<ProgressRecord, StorageError> {
        let mut guard = self.progress.lock().map_err(poisoned)?;
        let key = progress_key(ctx, &record.entry_id);
        if guard.contains_key(&key) {
            return Err(StorageError::Conflict);
        }
        let created = ProgressRecord {
            id: EntryId::new(uuid::Uuid::new_v4().to_string()),
            user_id: ctx.user().clone(),
            entry_id: record.entry_id.clone(),
            percent: record.percent,
        };
        guard.insert(key, created.clone());
        Ok(created)
    }

    async fn update_progress(
        &self,
        ctx: &Context,
        entry_id: &EntryId,
        percent: Percent,
    ) -> Result<(), StorageError> {
        let mut guard = self.progress.lock().map_err(poisoned)?;
        if let Some(record) = guard.get_mut(&progress_key(ctx, entry_id)) {
            record.percent = percent;
        }
        Ok(())
    }

    async fn delete_progress(
        &self,
        ctx: &Context,
        entry_ids: &[EntryId],
    ) -> Result<(), StorageError> {
        let mut guard = self.progress.lock().map_err(poisoned)?;
        for id in entry_ids {
            guard.remove(&progress_key(ctx, id));
        }
        Ok(())
    }

    async fn upsert_progress(
        &self,
        ctx: &Context,
        record: &NewProgressRecord,
    ) -> Result<(), StorageError> {
        let mut guard = self.progress.lock().map_err(poisoned)?;
        guard
            .entry(progress_key(ctx, &record.entry_id))
            .and_modify(|existing| existing.percent = record.percent)
            .or_insert_with(|| ProgressRecord {
                id: EntryId::new(uuid::Uuid::new_v4().to_string()),
                user_id: ctx.user().clone(),
                entry_id: record.entry_id.clone(),
                percent: record.percent,
            });
        Ok(())
    }
}

//
// ─── STORAGE BUNDLE ────────────────────────────────────────────────────────────
//

/// Aggregates entry and progress repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub entries: Arc<dyn EntryRepository>,
    pub progress: Arc<dyn ProgressRepository>,
}

impl Storage {
    /// In-memory entries with natively keyed progress records.
    #[must_use]
    pub fn in_memory() -> Self {
        let repo = InMemoryRepository::new();
        let entries: Arc<dyn EntryRepository> = Arc::new(repo.clone());
        let progress: Arc<dyn ProgressRepository> = Arc::new(repo);
        Self { entries, progress }
    }

    /// Progress kept as `user_progress` entries next to the content, the way the
    /// hosted content API stores it.
    #[must_use]
    pub fn entry_backed(entries: Arc<dyn EntryRepository>) -> Self {
        let progress: Arc<dyn ProgressRepository> =
            Arc::new(EntryProgressRepository::new(Arc::clone(&entries)));
        Self { entries, progress }
    }
}
