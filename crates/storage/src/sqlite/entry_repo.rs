use async_trait::async_trait;
use lms_core::model::{Element, Entry, EntryId, LocalizedText, ProjectId};
use sqlx::{QueryBuilder, Row, Sqlite};

use super::SqliteRepository;
use super::mapping::{conn, insert_error, map_entry_row, ser};
use crate::graph::{EntryGraph, StoredEntry, strip_references};
use crate::repository::{EntryQuery, EntryRepository, NewEntry, StorageError};

impl SqliteRepository {
    /// Load every entry of a project into an in-memory graph.
    async fn load_graph(&self, project: &ProjectId) -> Result<EntryGraph, StorageError> {
        let rows = sqlx::query(
            r"
            SELECT seq, id, model, api_name, created_at, name, elements
            FROM entries
            WHERE project_id = ?1
            ORDER BY seq ASC
            ",
        )
        .bind(project.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(conn)?;

        let mut graph = EntryGraph::new();
        for row in rows {
            graph.insert(map_entry_row(&row)?)?;
        }
        Ok(graph)
    }
}

#[async_trait]
impl EntryRepository for SqliteRepository {
    async fn get_entries(
        &self,
        project: &ProjectId,
        query: &EntryQuery,
    ) -> Result<Vec<Entry>, StorageError> {
        let graph = self.load_graph(project).await?;
        tracing::trace!(project = %project, loaded = graph.len(), "entry graph loaded");
        Ok(graph.select(query))
    }

    async fn create_entry(
        &self,
        project: &ProjectId,
        entry: NewEntry,
    ) -> Result<EntryId, StorageError> {
        let stored = StoredEntry::from_new(entry, 0);
        let name = serde_json::to_string(&stored.entry.name).map_err(ser)?;
        let elements = serde_json::to_string(stored.entry.elements()).map_err(ser)?;

        sqlx::query(
            r"
            INSERT INTO entries (id, project_id, model, api_name, created_at, name, elements)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            ",
        )
        .bind(stored.entry.id.as_str())
        .bind(project.as_str())
        .bind(stored.model.as_str())
        .bind(stored.api_name.as_str())
        .bind(stored.entry.created_at)
        .bind(name)
        .bind(elements)
        .execute(&self.pool)
        .await
        .map_err(insert_error)?;

        Ok(stored.entry.id)
    }

    async fn update_elements(
        &self,
        project: &ProjectId,
        id: &EntryId,
        elements: Vec<Element>,
    ) -> Result<(), StorageError> {
        let mut tx = self.pool.begin().await.map_err(conn)?;

        let row = sqlx::query("SELECT elements FROM entries WHERE project_id = ?1 AND id = ?2")
            .bind(project.as_str())
            .bind(id.as_str())
            .fetch_optional(&mut *tx)
            .await
            .map_err(conn)?
            .ok_or(StorageError::NotFound)?;
        let current: Vec<Element> =
            serde_json::from_str(&row.try_get::<String, _>("elements").map_err(ser)?)
                .map_err(ser)?;

        let mut entry = Entry {
            id: id.clone(),
            created_at: None,
            name: Vec::<LocalizedText>::new(),
            elements: Some(current),
        };
        entry.merge_elements(strip_references(elements));
        let merged = serde_json::to_string(entry.elements()).map_err(ser)?;

        sqlx::query("UPDATE entries SET elements = ?1 WHERE project_id = ?2 AND id = ?3")
            .bind(merged)
            .bind(project.as_str())
            .bind(id.as_str())
            .execute(&mut *tx)
            .await
            .map_err(conn)?;

        tx.commit().await.map_err(conn)
    }

    async fn delete_entries(
        &self,
        project: &ProjectId,
        ids: &[EntryId],
    ) -> Result<(), StorageError> {
        if ids.is_empty() {
            return Ok(());
        }

        let mut builder: QueryBuilder<'_, Sqlite> =
            QueryBuilder::new("DELETE FROM entries WHERE project_id = ");
        builder.push_bind(project.as_str());
        builder.push(" AND id IN (");
        let mut separated = builder.separated(", ");
        for id in ids {
            separated.push_bind(id.as_str());
        }
        separated.push_unseparated(")");

        builder.build().execute(&self.pool).await.map_err(conn)?;
        Ok(())
    }
}
