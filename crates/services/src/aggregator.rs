use std::collections::HashMap;

use lms_core::model::{Context, Course, EntryId, Percent, Reference, roll_up};
use serde::Serialize;

use crate::catalog::ContentCatalog;
use crate::error::{CatalogError, ProgressError};
use crate::progress_store::ProgressStore;

/// New percent of one entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProgressUpdate {
    pub entry_id: EntryId,
    pub percent: Percent,
}

/// Percents written by one lesson completion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RollUp {
    pub lesson: ProgressUpdate,
    pub section: ProgressUpdate,
    pub course: ProgressUpdate,
}

/// Stored percents of a course and everything below it. Missing records
/// read as 0.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CourseProgress {
    pub course: ProgressUpdate,
    pub sections: Vec<ProgressUpdate>,
    pub lessons: Vec<ProgressUpdate>,
    pub pages: Vec<ProgressUpdate>,
}

/// Recomputes section and course progress after a lesson changes.
#[derive(Clone)]
pub struct ProgressAggregator {
    catalog: ContentCatalog,
    store: ProgressStore,
}

impl ProgressAggregator {
    #[must_use]
    pub fn new(catalog: ContentCatalog, store: ProgressStore) -> Self {
        Self { catalog, store }
    }

    /// Store the lesson's percent and roll it up into its section and course.
    ///
    /// Each level is rounded before it feeds the next one.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::CourseNotFound` if no course references the
    /// lesson. The lesson's own percent is stored regardless.
    /// Returns `ProgressError::Storage` or `ProgressError::Catalog` if a read
    /// or write fails.
    #[tracing::instrument(skip(self, ctx), fields(user = %ctx.user()))]
    pub async fn update_lesson_progress(
        &self,
        ctx: &Context,
        lesson_id: &EntryId,
        percent: Percent,
    ) -> Result<RollUp, ProgressError> {
        let (course, written) = futures::join!(
            self.owning_course(ctx, lesson_id),
            self.store.safe_update(ctx, lesson_id, percent),
        );
        let course = course?;
        written?;

        let section = course.section_of_lesson(lesson_id).ok_or_else(|| {
            ProgressError::SectionNotFound {
                course_id: course.id.clone(),
                lesson_id: lesson_id.clone(),
            }
        })?;

        let sibling_lessons: Vec<EntryId> = section
            .lessons
            .iter()
            .map(Reference::id)
            .filter(|id| *id != lesson_id)
            .cloned()
            .collect();
        let sibling_sections: Vec<EntryId> = course
            .sections
            .iter()
            .map(|s| &s.id)
            .filter(|id| **id != section.id)
            .cloned()
            .collect();

        let siblings: Vec<EntryId> = sibling_lessons
            .iter()
            .chain(&sibling_sections)
            .cloned()
            .collect();
        let stored = self.store.get_all_progress(ctx, &siblings).await?;
        let stored_of = |ids: &[EntryId]| -> Vec<Percent> {
            ids.iter().filter_map(|id| stored.get(id).copied()).collect()
        };

        let section_percent = roll_up(stored_of(&sibling_lessons), percent, section.lessons.len());
        let course_percent = roll_up(
            stored_of(&sibling_sections),
            section_percent,
            course.sections.len(),
        );

        let percents = HashMap::from([
            (section.id.clone(), section_percent),
            (course.id.clone(), course_percent),
        ]);
        self.store
            .safe_update_all(ctx, &[section.id.clone(), course.id.clone()], &percents)
            .await?;

        tracing::info!(
            lesson = %lesson_id,
            section = %section.id,
            course = %course.id,
            %percent,
            %section_percent,
            %course_percent,
            "progress rolled up"
        );

        Ok(RollUp {
            lesson: ProgressUpdate {
                entry_id: lesson_id.clone(),
                percent,
            },
            section: ProgressUpdate {
                entry_id: section.id.clone(),
                percent: section_percent,
            },
            course: ProgressUpdate {
                entry_id: course.id.clone(),
                percent: course_percent,
            },
        })
    }

    async fn owning_course(
        &self,
        ctx: &Context,
        lesson_id: &EntryId,
    ) -> Result<Course, ProgressError> {
        match self.catalog.course_by_lesson(ctx, lesson_id).await {
            Ok(course) => Ok(course),
            Err(CatalogError::NotFound { .. }) => Err(ProgressError::CourseNotFound {
                lesson_id: lesson_id.clone(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    /// Store page percents as given. Pages do not roll up on their own; the
    /// caller triggers the lesson update once every page is scored.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::MissingPercent` if a page id has no percent.
    /// Returns `ProgressError::Storage` if a write fails.
    #[tracing::instrument(skip_all, fields(user = %ctx.user(), pages = page_ids.len()))]
    pub async fn update_pages_progress(
        &self,
        ctx: &Context,
        page_ids: &[EntryId],
        percents: &HashMap<EntryId, Percent>,
    ) -> Result<(), ProgressError> {
        self.store.safe_update_all(ctx, page_ids, percents).await
    }

    /// Read the stored percents of a course, its sections, its lessons and
    /// the pages of expanded lessons in one lookup.
    ///
    /// # Errors
    ///
    /// Returns `ProgressError::Storage` if the lookup fails.
    pub async fn course_progress(
        &self,
        ctx: &Context,
        course: &Course,
    ) -> Result<CourseProgress, ProgressError> {
        let section_ids = course.section_ids();
        let lesson_ids: Vec<EntryId> = course
            .sections
            .iter()
            .flat_map(|s| s.lesson_ids())
            .collect();
        let page_ids: Vec<EntryId> = course
            .sections
            .iter()
            .flat_map(|s| s.lessons.iter())
            .filter_map(Reference::expanded)
            .flat_map(|l| l.page_ids())
            .collect();

        let all: Vec<EntryId> = std::iter::once(course.id.clone())
            .chain(section_ids.iter().cloned())
            .chain(lesson_ids.iter().cloned())
            .chain(page_ids.iter().cloned())
            .collect();
        let stored = self.store.get_all_progress(ctx, &all).await?;
        let read = |id: &EntryId| ProgressUpdate {
            entry_id: id.clone(),
            percent: stored.get(id).copied().unwrap_or_default(),
        };

        Ok(CourseProgress {
            course: read(&course.id),
            sections: section_ids.iter().map(read).collect(),
            lessons: lesson_ids.iter().map(read).collect(),
            pages: page_ids.iter().map(read).collect(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use lms_core::model::schema::{elements, models};
    use lms_core::model::{Element, NewProgressRecord, ProgressRecord, ProjectId, UserId};
    use storage::repository::{
        EntryRepository, InMemoryRepository, NewEntry, ProgressRepository, StorageError,
    };

    fn ctx() -> Context {
        Context::new(ProjectId::new("p1"), UserId::new("u1"))
    }

    fn p(v: i64) -> Percent {
        Percent::new(v).unwrap()
    }

    async fn lesson_only(repo: &InMemoryRepository) -> EntryId {
        repo.create_entry(
            ctx().project(),
            NewEntry::new(models::LESSONS, "orphan", "Orphan"),
        )
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn orphan_lesson_reports_missing_course_but_keeps_its_percent() {
        let repo = Arc::new(InMemoryRepository::new());
        let lesson = lesson_only(&repo).await;
        let store = ProgressStore::new(repo.clone());
        let aggregator = ProgressAggregator::new(ContentCatalog::new(repo.clone()), store.clone());

        let err = aggregator
            .update_lesson_progress(&ctx(), &lesson, p(50))
            .await
            .unwrap_err();
        assert!(matches!(err, ProgressError::CourseNotFound { .. }));
        assert_eq!(store.get_progress(&ctx(), &lesson).await.unwrap(), p(50));
    }

    /// Progress backend whose writes finish well after the course lookup.
    struct SlowWrites(InMemoryRepository);

    impl SlowWrites {
        async fn pause() {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }

    #[async_trait]
    impl ProgressRepository for SlowWrites {
        async fn find_progress(
            &self,
            ctx: &Context,
            entry_ids: &[EntryId],
        ) -> Result<Vec<ProgressRecord>, StorageError> {
            self.0.find_progress(ctx, entry_ids).await
        }

        async fn create_progress(
            &self,
            ctx: &Context,
            record: &NewProgressRecord,
        ) -> Result<ProgressRecord, StorageError> {
            Self::pause().await;
            self.0.create_progress(ctx, record).await
        }

        async fn update_progress(
            &self,
            ctx: &Context,
            entry_id: &EntryId,
            percent: Percent,
        ) -> Result<(), StorageError> {
            Self::pause().await;
            self.0.update_progress(ctx, entry_id, percent).await
        }

        async fn delete_progress(
            &self,
            ctx: &Context,
            entry_ids: &[EntryId],
        ) -> Result<(), StorageError> {
            self.0.delete_progress(ctx, entry_ids).await
        }

        async fn upsert_progress(
            &self,
            ctx: &Context,
            record: &NewProgressRecord,
        ) -> Result<(), StorageError> {
            Self::pause().await;
            self.0.upsert_progress(ctx, record).await
        }
    }

    #[tokio::test]
    async fn slow_lesson_write_completes_when_course_is_missing() {
        let repo = InMemoryRepository::new();
        let lesson = lesson_only(&repo).await;
        let store = ProgressStore::new(Arc::new(SlowWrites(repo.clone())));
        let aggregator =
            ProgressAggregator::new(ContentCatalog::new(Arc::new(repo.clone())), store.clone());

        let err = aggregator
            .update_lesson_progress(&ctx(), &lesson, p(70))
            .await
            .unwrap_err();
        assert!(matches!(err, ProgressError::CourseNotFound { .. }));
        // read right away, without sleeping
        assert_eq!(store.get_progress(&ctx(), &lesson).await.unwrap(), p(70));
    }

    #[tokio::test]
    async fn single_lesson_course_mirrors_lesson_percent() {
        let repo = Arc::new(InMemoryRepository::new());
        let project = ctx().project().clone();
        let lesson = lesson_only(&repo).await;
        let section = repo
            .create_entry(
                &project,
                NewEntry::new(models::SECTIONS, "s", "S")
                    .element(Element::references(elements::LESSONS, [&lesson])),
            )
            .await
            .unwrap();
        let course = repo
            .create_entry(
                &project,
                NewEntry::new(models::COURSES, "c", "C")
                    .element(Element::references(elements::SECTIONS, [&section])),
            )
            .await
            .unwrap();

        let aggregator = ProgressAggregator::new(
            ContentCatalog::new(repo.clone()),
            ProgressStore::new(repo.clone()),
        );
        let rolled = aggregator
            .update_lesson_progress(&ctx(), &lesson, p(33))
            .await
            .unwrap();
        assert_eq!(rolled.section.entry_id, section);
        assert_eq!(rolled.section.percent, p(33));
        assert_eq!(rolled.course.entry_id, course);
        assert_eq!(rolled.course.percent, p(33));
    }
}
