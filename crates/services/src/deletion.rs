use std::collections::HashSet;
use std::sync::Arc;

use lms_core::model::{Context, Course, EntryId, Lesson, Page, Quiz, Reference, Section};
use storage::repository::EntryRepository;

use crate::catalog::ContentCatalog;
use crate::error::DeletionError;
use crate::progress_store::ProgressStore;

fn unique(ids: impl IntoIterator<Item = EntryId>) -> Vec<EntryId> {
    let mut seen = HashSet::new();
    ids.into_iter().filter(|id| seen.insert(id.clone())).collect()
}

/// Splits references into the expanded values and the ids of the stubs.
fn split<T: Clone>(refs: &[Reference<T>]) -> (Vec<T>, Vec<EntryId>) {
    let mut expanded = Vec::new();
    let mut stubs = Vec::new();
    for r in refs {
        match r {
            Reference::Expanded(inner) => expanded.push(inner.clone()),
            Reference::Stub(stub) => stubs.push(stub.id.clone()),
        }
    }
    (expanded, stubs)
}

/// Deletes content together with everything it owns.
///
/// At every level the progress records go first, then the children, then the
/// entries themselves. The first failure aborts the cascade and nothing that
/// was already deleted is restored.
#[derive(Clone)]
pub struct CascadeDeletion {
    entries: Arc<dyn EntryRepository>,
    catalog: ContentCatalog,
    store: ProgressStore,
}

impl CascadeDeletion {
    #[must_use]
    pub fn new(
        entries: Arc<dyn EntryRepository>,
        catalog: ContentCatalog,
        store: ProgressStore,
    ) -> Self {
        Self {
            entries,
            catalog,
            store,
        }
    }

    async fn delete_entries(&self, ctx: &Context, ids: &[EntryId]) -> Result<(), DeletionError> {
        if ids.is_empty() {
            return Ok(());
        }
        tracing::debug!(count = ids.len(), "deleting entries");
        self.entries.delete_entries(ctx.project(), ids).await?;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `DeletionError` if any step of the cascade fails.
    #[tracing::instrument(skip_all, fields(course = %course.id, sections = course.sections.len()))]
    pub async fn delete_course(&self, ctx: &Context, course: &Course) -> Result<(), DeletionError> {
        if !course.sections.is_empty() {
            self.delete_sections(ctx, &course.sections).await?;
        }
        self.store.safe_delete(ctx, &course.id).await?;
        self.delete_entries(ctx, std::slice::from_ref(&course.id))
            .await?;
        tracing::info!(course = %course.id, "course deleted");
        Ok(())
    }

    /// Lessons that arrive as stubs are fetched first so their pages and
    /// categories can be deleted too.
    ///
    /// # Errors
    ///
    /// Returns `DeletionError` if any step of the cascade fails.
    #[tracing::instrument(skip_all, fields(sections = sections.len()))]
    pub async fn delete_sections(
        &self,
        ctx: &Context,
        sections: &[Section],
    ) -> Result<(), DeletionError> {
        let section_ids: Vec<EntryId> = sections.iter().map(|s| s.id.clone()).collect();
        self.store.safe_delete_all(ctx, &section_ids).await?;

        let refs: Vec<Reference<Lesson>> = sections
            .iter()
            .flat_map(|s| s.lessons.iter().cloned())
            .collect();
        let (mut lessons, stub_ids) = split(&refs);
        if !stub_ids.is_empty() {
            tracing::debug!(stubs = stub_ids.len(), "fetching unexpanded lessons");
            lessons.extend(self.catalog.lessons_by_ids(ctx, &unique(stub_ids)).await?);
        }
        if !lessons.is_empty() {
            self.delete_lessons(ctx, &lessons).await?;
        }

        self.delete_entries(ctx, &section_ids).await
    }

    /// # Errors
    ///
    /// Returns `DeletionError` if any step of the cascade fails.
    #[tracing::instrument(skip_all, fields(lessons = lessons.len()))]
    pub async fn delete_lessons(
        &self,
        ctx: &Context,
        lessons: &[Lesson],
    ) -> Result<(), DeletionError> {
        let lesson_ids: Vec<EntryId> = lessons.iter().map(|l| l.id.clone()).collect();
        self.store.safe_delete_all(ctx, &lesson_ids).await?;

        let pages: Vec<Reference<Page>> = lessons
            .iter()
            .flat_map(|l| l.pages.iter().cloned())
            .collect();
        self.delete_pages(ctx, &pages).await?;

        let owned = lesson_ids
            .into_iter()
            .chain(lessons.iter().flat_map(Lesson::category_ids));
        self.delete_entries(ctx, &unique(owned)).await
    }

    /// Single-lesson variant of [`Self::delete_lessons`]: pages go before the
    /// lesson's own progress.
    ///
    /// # Errors
    ///
    /// Returns `DeletionError` if any step of the cascade fails.
    #[tracing::instrument(skip_all, fields(lesson = %lesson.id))]
    pub async fn delete_lesson(&self, ctx: &Context, lesson: &Lesson) -> Result<(), DeletionError> {
        self.delete_pages(ctx, &lesson.pages).await?;
        self.store.safe_delete(ctx, &lesson.id).await?;

        let owned = std::iter::once(lesson.id.clone()).chain(lesson.category_ids());
        self.delete_entries(ctx, &unique(owned)).await
    }

    /// # Errors
    ///
    /// Returns `DeletionError` if any step of the cascade fails.
    #[tracing::instrument(skip_all, fields(pages = pages.len()))]
    pub async fn delete_pages(
        &self,
        ctx: &Context,
        pages: &[Reference<Page>],
    ) -> Result<(), DeletionError> {
        if pages.is_empty() {
            return Ok(());
        }
        let page_ids = unique(pages.iter().map(|p| p.id().clone()));
        self.store.safe_delete_all(ctx, &page_ids).await?;

        let (mut expanded, stub_ids) = split(pages);
        if !stub_ids.is_empty() {
            expanded.extend(self.catalog.pages_by_ids(ctx, &unique(stub_ids)).await?);
        }
        let quiz_ids = unique(
            expanded
                .iter()
                .flat_map(|p| p.quizzes.iter().map(|q| q.id.clone())),
        );
        let quizzes = self.catalog.quizzes_by_ids(ctx, &quiz_ids).await?;
        self.delete_quizzes(ctx, &quizzes).await?;

        self.delete_entries(ctx, &page_ids).await
    }

    /// Deletes answers, questions and quizzes in one call.
    ///
    /// # Errors
    ///
    /// Returns `DeletionError::Storage` if the deletion fails.
    pub async fn delete_quizzes(&self, ctx: &Context, quizzes: &[Quiz]) -> Result<(), DeletionError> {
        let ids = quizzes
            .iter()
            .flat_map(Quiz::answer_ids)
            .chain(quizzes.iter().flat_map(Quiz::question_ids))
            .chain(quizzes.iter().map(|q| q.id.clone()));
        self.delete_entries(ctx, &unique(ids)).await
    }
}
