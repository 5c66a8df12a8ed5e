use std::sync::Arc;

use async_trait::async_trait;
use lms_core::model::schema::{elements, models};
use lms_core::model::{
    Context, Element, ElementValue, EntryId, NewProgressRecord, Percent, ProgressRecord,
};
use lms_core::parser::{parse_progress_record, progress_elements};

use crate::repository::{
    ElementMatch, EntryQuery, EntryRepository, NewEntry, ProgressRepository, StorageError,
};

/// Progress records stored as `user_progress` entries.
///
/// There is no uniqueness guarantee in this layout, so `upsert_progress` keeps
/// the query-then-write default and concurrent first writes for one entry can
/// leave two records behind.
#[derive(Clone)]
pub struct EntryProgressRepository {
    entries: Arc<dyn EntryRepository>,
}

impl EntryProgressRepository {
    #[must_use]
    pub fn new(entries: Arc<dyn EntryRepository>) -> Self {
        Self { entries }
    }

    fn query(ctx: &Context, entry_ids: &[EntryId]) -> EntryQuery {
        EntryQuery::model(models::USER_PROGRESS)
            .element(elements::USER, ElementMatch::User(ctx.user().clone()))
            .element(
                elements::CURRENT_ENTRY_ID,
                ElementMatch::In(entry_ids.iter().map(|id| id.as_str().to_owned()).collect()),
            )
    }
}

#[async_trait]
impl ProgressRepository for EntryProgressRepository {
    async fn find_progress(
        &self,
        ctx: &Context,
        entry_ids: &[EntryId],
    ) -> Result<Vec<ProgressRecord>, StorageError> {
        if entry_ids.is_empty() {
            return Ok(Vec::new());
        }
        self.entries
            .get_entries(ctx.project(), &Self::query(ctx, entry_ids))
            .await?
            .iter()
            .map(|entry| {
                parse_progress_record(entry)
                    .map_err(|e| StorageError::Serialization(e.to_string()))
            })
            .collect()
    }

    async fn create_progress(
        &self,
        ctx: &Context,
        record: &NewProgressRecord,
    ) -> Result<ProgressRecord, StorageError> {
        let mut new = NewEntry::new(
            models::USER_PROGRESS,
            record.api_name.clone(),
            record.name.clone(),
        );
        new.elements = progress_elements(ctx.user(), &record.entry_id, record.percent);
        let id = self.entries.create_entry(ctx.project(), new).await?;
        Ok(ProgressRecord {
            id,
            user_id: ctx.user().clone(),
            entry_id: record.entry_id.clone(),
            percent: record.percent,
        })
    }

    async fn update_progress(
        &self,
        ctx: &Context,
        entry_id: &EntryId,
        percent: Percent,
    ) -> Result<(), StorageError> {
        let existing = self
            .find_progress(ctx, std::slice::from_ref(entry_id))
            .await?;
        for record in existing {
            self.entries
                .update_elements(
                    ctx.project(),
                    &record.id,
                    vec![Element::new(
                        elements::PROGRESS_PERCENT,
                        ElementValue::Number(f64::from(percent.value())),
                    )],
                )
                .await?;
        }
        Ok(())
    }

    async fn delete_progress(
        &self,
        ctx: &Context,
        entry_ids: &[EntryId],
    ) -> Result<(), StorageError> {
        let ids: Vec<EntryId> = self
            .find_progress(ctx, entry_ids)
            .await?
            .into_iter()
            .map(|record| record.id)
            .collect();
        if ids.is_empty() {
            return Ok(());
        }
        self.entries.delete_entries(ctx.project(), &ids).await
    }
}
