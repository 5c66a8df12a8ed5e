use async_trait::async_trait;
use chrono::Utc;
use lms_core::model::{Context, EntryId, NewProgressRecord, Percent, ProgressRecord};
use sqlx::{QueryBuilder, Sqlite};

use super::SqliteRepository;
use super::mapping::{conn, insert_error, map_progress_row};
use crate::repository::{ProgressRepository, StorageError};

/// Builds `<prefix> WHERE` scoped to the context user and the given entries.
fn scoped<'a>(
    prefix: &str,
    ctx: &'a Context,
    entry_ids: &'a [EntryId],
) -> QueryBuilder<'a, Sqlite> {
    let mut builder: QueryBuilder<'a, Sqlite> = QueryBuilder::new(prefix);
    builder.push(" WHERE project_id = ");
    builder.push_bind(ctx.project().as_str());
    builder.push(" AND user_id = ");
    builder.push_bind(ctx.user().as_str());
    builder.push(" AND entry_id IN (");
    let mut separated = builder.separated(", ");
    for id in entry_ids {
        separated.push_bind(id.as_str());
    }
    separated.push_unseparated(")");
    builder
}

#[async_trait]
impl ProgressRepository for SqliteRepository {
    async fn find_progress(
        &self,
        ctx: &Context,
        entry_ids: &[EntryId],
    ) -> Result<Vec<ProgressRecord>, StorageError> {
        if entry_ids.is_empty() {
            return Ok(Vec::new());
        }
        let rows = scoped("SELECT id, user_id, entry_id, percent FROM progress", ctx, entry_ids)
            .build()
            .fetch_all(&self.pool)
            .await
            .map_err(conn)?;
        rows.iter().map(map_progress_row).collect()
    }

    async fn create_progress(
        &self,
        ctx: &Context,
        record: &NewProgressRecord,
    ) -> Result<ProgressRecord, StorageError> {
        let id = EntryId::new(uuid::Uuid::new_v4().to_string());
        sqlx::query(
            r"
            INSERT INTO progress (id, project_id, user_id, entry_id, api_name, name, percent, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ",
        )
        .bind(id.as_str())
        .bind(ctx.project().as_str())
        .bind(ctx.user().as_str())
        .bind(record.entry_id.as_str())
        .bind(record.api_name.as_str())
        .bind(record.name.as_str())
        .bind(i64::from(record.percent.value()))
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(insert_error)?;

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
        sqlx::query(
            r"
            UPDATE progress SET percent = ?1, updated_at = ?2
            WHERE project_id = ?3 AND user_id = ?4 AND entry_id = ?5
            ",
        )
        .bind(i64::from(percent.value()))
        .bind(Utc::now())
        .bind(ctx.project().as_str())
        .bind(ctx.user().as_str())
        .bind(entry_id.as_str())
        .execute(&self.pool)
        .await
        .map_err(conn)?;
        Ok(())
    }

    async fn delete_progress(
        &self,
        ctx: &Context,
        entry_ids: &[EntryId],
    ) -> Result<(), StorageError> {
        if entry_ids.is_empty() {
            return Ok(());
        }
        scoped("DELETE FROM progress", ctx, entry_ids)
            .build()
            .execute(&self.pool)
            .await
            .map_err(conn)?;
        Ok(())
    }

    async fn upsert_progress(
        &self,
        ctx: &Context,
        record: &NewProgressRecord,
    ) -> Result<(), StorageError> {
        sqlx::query(
            r"
            INSERT INTO progress (id, project_id, user_id, entry_id, api_name, name, percent, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            ON CONFLICT(project_id, user_id, entry_id) DO UPDATE SET
                percent = excluded.percent,
                updated_at = excluded.updated_at
            ",
        )
        .bind(uuid::Uuid::new_v4().to_string())
        .bind(ctx.project().as_str())
        .bind(ctx.user().as_str())
        .bind(record.entry_id.as_str())
        .bind(record.api_name.as_str())
        .bind(record.name.as_str())
        .bind(i64::from(record.percent.value()))
        .bind(Utc::now())
        .execute(&self.pool)
        .await
        .map_err(conn)?;
        Ok(())
    }
}
