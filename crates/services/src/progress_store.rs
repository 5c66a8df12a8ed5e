use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use futures::future::{self, BoxFuture, FutureExt};
use lms_core::model::{Context, EntryId, NewProgressRecord, Percent};
use rand::Rng;
use storage::repository::{ProgressRepository, StorageError};

use crate::error::ProgressError;

const SUFFIX_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789!_-";
const MAX_SUFFIX_LEN: usize = 7;

/// Random 1 to 7 character suffix for progress record api names.
///
/// Collisions are possible and not checked.
fn random_suffix(rng: &mut impl Rng) -> String {
    let len = rng.random_range(1..=MAX_SUFFIX_LEN);
    (0..len)
        .map(|_| char::from(SUFFIX_ALPHABET[rng.random_range(0..SUFFIX_ALPHABET.len())]))
        .collect()
}

fn new_record(entry_id: &EntryId, percent: Percent) -> NewProgressRecord {
    NewProgressRecord::with_suffix(entry_id.clone(), percent, &random_suffix(&mut rand::rng()))
}

/// Reads and writes per-user progress without letting duplicates accumulate.
#[derive(Clone)]
pub struct ProgressStore {
    progress: Arc<dyn ProgressRepository>,
}

impl ProgressStore {
    #[must_use]
    pub fn new(progress: Arc<dyn ProgressRepository>) -> Self {
        Self { progress }
    }

    /// Stored percent for `entry_id`, or 0 when there is no record.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::Storage` if the lookup fails.
    pub async fn get_progress(
        &self,
        ctx: &Context,
        entry_id: &EntryId,
    ) -> Result<Percent, ProgressError> {
        let records = self
            .progress
            .find_progress(ctx, std::slice::from_ref(entry_id))
            .await?;
        Ok(records.first().map_or(Percent::ZERO, |r| r.percent))
    }

    /// Stored percents keyed by entry id. Entries without a record are absent.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::Storage` if the lookup fails.
    pub async fn get_all_progress(
        &self,
        ctx: &Context,
        entry_ids: &[EntryId],
    ) -> Result<HashMap<EntryId, Percent>, ProgressError> {
        if entry_ids.is_empty() {
            return Ok(HashMap::new());
        }
        let records = self.progress.find_progress(ctx, entry_ids).await?;
        let mut percents = HashMap::with_capacity(records.len());
        for record in records {
            percents.entry(record.entry_id).or_insert(record.percent);
        }
        Ok(percents)
    }

    /// Update the record for `entry_id` or create one.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::Storage` if the write fails.
    #[tracing::instrument(level = "debug", skip(self, ctx), fields(user = %ctx.user()))]
    pub async fn safe_update(
        &self,
        ctx: &Context,
        entry_id: &EntryId,
        percent: Percent,
    ) -> Result<(), ProgressError> {
        self.progress
            .upsert_progress(ctx, &new_record(entry_id, percent))
            .await?;
        Ok(())
    }

    /// Update or create records for every id in `entry_ids`.
    ///
    /// One lookup decides which records exist, then all writes run
    /// concurrently. Writes that already succeeded are not undone if another
    /// one fails.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::MissingPercent` before writing anything if an
    /// id has no entry in `percents`.
    /// Returns `ProgressError::Storage` if the lookup or any write fails.
    #[tracing::instrument(level = "debug", skip_all, fields(user = %ctx.user(), count = entry_ids.len()))]
    pub async fn safe_update_all(
        &self,
        ctx: &Context,
        entry_ids: &[EntryId],
        percents: &HashMap<EntryId, Percent>,
    ) -> Result<(), ProgressError> {
        let mut seen = HashSet::new();
        let mut targets = Vec::with_capacity(entry_ids.len());
        for id in entry_ids {
            let percent = *percents
                .get(id)
                .ok_or_else(|| ProgressError::MissingPercent {
                    entry_id: id.clone(),
                })?;
            if seen.insert(id) {
                targets.push((id, percent));
            }
        }
        if targets.is_empty() {
            return Ok(());
        }

        let ids: Vec<EntryId> = targets.iter().map(|(id, _)| (*id).clone()).collect();
        let existing: HashSet<EntryId> = self
            .progress
            .find_progress(ctx, &ids)
            .await?
            .into_iter()
            .map(|r| r.entry_id)
            .collect();

        let (updates, creates): (Vec<_>, Vec<_>) = targets
            .into_iter()
            .partition(|(id, _)| existing.contains(*id));
        let new_records: Vec<NewProgressRecord> = creates
            .iter()
            .map(|(id, percent)| new_record(id, *percent))
            .collect();
        tracing::debug!(
            updates = updates.len(),
            creates = new_records.len(),
            "writing progress"
        );

        let mut writes: Vec<BoxFuture<'_, Result<(), StorageError>>> =
            Vec::with_capacity(updates.len() + new_records.len());
        for (id, percent) in updates {
            writes.push(self.progress.update_progress(ctx, id, percent));
        }
        for record in &new_records {
            writes.push(
                self.progress
                    .create_progress(ctx, record)
                    .map(|created| created.map(|_| ()))
                    .boxed(),
            );
        }
        future::try_join_all(writes).await?;
        Ok(())
    }

    /// Delete the record for `entry_id`, if any.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::Storage` if the lookup or deletion fails.
    pub async fn safe_delete(&self, ctx: &Context, entry_id: &EntryId) -> Result<(), ProgressError> {
        self.safe_delete_all(ctx, std::slice::from_ref(entry_id))
            .await
    }

    /// Delete the records of every id in `entry_ids`. Ids without a record
    /// are skipped, and nothing is sent when none has one.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::Storage` if the lookup or deletion fails.
    #[tracing::instrument(level = "debug", skip_all, fields(user = %ctx.user(), count = entry_ids.len()))]
    pub async fn safe_delete_all(
        &self,
        ctx: &Context,
        entry_ids: &[EntryId],
    ) -> Result<(), ProgressError> {
        if entry_ids.is_empty() {
            return Ok(());
        }
        let mut existing: Vec<EntryId> = self
            .progress
            .find_progress(ctx, entry_ids)
            .await?
            .into_iter()
            .map(|r| r.entry_id)
            .collect();
        existing.sort();
        existing.dedup();
        if existing.is_empty() {
            return Ok(());
        }
        tracing::debug!(records = existing.len(), "deleting progress");
        self.progress.delete_progress(ctx, &existing).await?;
        Ok(())
    }
}
