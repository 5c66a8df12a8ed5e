use std::sync::Arc;

use lms_core::ContentError;
use lms_core::model::schema::{elements, models};
use lms_core::model::{Context, Course, Entry, EntryId, LearningPath, Lesson, Page, Quiz};
use lms_core::parser::{parse_course, parse_learning_path, parse_lesson, parse_page, parse_quiz};
use storage::repository::{ElementFilter, ElementMatch, EntryQuery, EntryRepository};

use crate::error::CatalogError;

/// Course → sections → lessons; pages stay stubs.
const COURSE_DEPTH: u8 = 2;
/// Path → courses → sections; lessons stay stubs.
const LEARNING_PATH_DEPTH: u8 = 2;
/// Lesson → pages and categories; quizzes stay stubs.
const LESSON_DEPTH: u8 = 1;
/// Quiz → questions; answers stay stubs.
const QUIZ_DEPTH: u8 = 1;

/// Typed read access to the content graph.
#[derive(Clone)]
pub struct ContentCatalog {
    entries: Arc<dyn EntryRepository>,
}

impl ContentCatalog {
    #[must_use]
    pub fn new(entries: Arc<dyn EntryRepository>) -> Self {
        Self { entries }
    }

    async fn single(
        &self,
        ctx: &Context,
        model: &'static str,
        query: EntryQuery,
        id: &EntryId,
    ) -> Result<Entry, CatalogError> {
        self.entries
            .get_entries(ctx.project(), &query)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| CatalogError::NotFound {
                model,
                id: id.clone(),
            })
    }

    async fn many<T>(
        &self,
        ctx: &Context,
        query: EntryQuery,
        parse: fn(&Entry) -> Result<T, ContentError>,
    ) -> Result<Vec<T>, CatalogError> {
        let entries = self.entries.get_entries(ctx.project(), &query).await?;
        entries
            .iter()
            .map(|entry| parse(entry).map_err(CatalogError::from))
            .collect()
    }

    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if the course does not exist.
    /// Returns `CatalogError::Content` if the entry graph is malformed.
    pub async fn course(&self, ctx: &Context, id: &EntryId) -> Result<Course, CatalogError> {
        let query = EntryQuery::model(models::COURSES)
            .id(id)
            .depth(COURSE_DEPTH);
        let entry = self.single(ctx, models::COURSES, query, id).await?;
        Ok(parse_course(&entry)?)
    }

    /// The course whose sections reference `lesson_id`. Lessons in the
    /// result are stubs.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if no course references the lesson.
    /// Returns `CatalogError::Content` if the entry graph is malformed.
    #[tracing::instrument(level = "debug", skip(self, ctx))]
    pub async fn course_by_lesson(
        &self,
        ctx: &Context,
        lesson_id: &EntryId,
    ) -> Result<Course, CatalogError> {
        let query = EntryQuery::model(models::COURSES)
            .element(
                elements::SECTIONS,
                ElementMatch::ContainsEntryWhere(vec![ElementFilter {
                    api_name: elements::LESSONS.to_owned(),
                    matcher: ElementMatch::ContainsEntry(lesson_id.clone()),
                }]),
            )
            .depth(1);
        let entry = self.single(ctx, models::LESSONS, query, lesson_id).await?;
        Ok(parse_course(&entry)?)
    }

    /// Every course of the project, each with the names of the learning
    /// paths that include it, in path creation order.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Content` if an entry is malformed.
    /// Returns `CatalogError::Storage` if the entries cannot be read.
    pub async fn courses(&self, ctx: &Context) -> Result<Vec<Course>, CatalogError> {
        let mut courses = self
            .many(
                ctx,
                EntryQuery::model(models::COURSES).depth(COURSE_DEPTH),
                parse_course,
            )
            .await?;
        let paths = self
            .entries
            .get_entries(ctx.project(), &EntryQuery::model(models::LEARNING_PATHS))
            .await?;

        for path in &paths {
            let name = path
                .display_name()
                .ok_or_else(|| ContentError::MissingName {
                    entry_id: path.id.clone(),
                })?;
            for referenced in path.referenced(elements::COURSES) {
                for course in courses.iter_mut().filter(|c| c.id == referenced.id) {
                    course.course_paths.push(name.to_owned());
                }
            }
        }
        Ok(courses)
    }

    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if the learning path does not exist.
    /// Returns `CatalogError::Content` if the entry graph is malformed.
    pub async fn learning_path(
        &self,
        ctx: &Context,
        id: &EntryId,
    ) -> Result<LearningPath, CatalogError> {
        let query = EntryQuery::model(models::LEARNING_PATHS)
            .id(id)
            .depth(LEARNING_PATH_DEPTH);
        let entry = self.single(ctx, models::LEARNING_PATHS, query, id).await?;
        Ok(parse_learning_path(&entry)?)
    }

    /// # Errors
    ///
    /// Returns `CatalogError::Content` if an entry is malformed.
    /// Returns `CatalogError::Storage` if the entries cannot be read.
    pub async fn learning_paths(&self, ctx: &Context) -> Result<Vec<LearningPath>, CatalogError> {
        self.many(
            ctx,
            EntryQuery::model(models::LEARNING_PATHS).depth(LEARNING_PATH_DEPTH),
            parse_learning_path,
        )
        .await
    }

    /// Lessons with their pages and categories expanded. Unknown ids are
    /// skipped.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Content` if an entry is malformed.
    /// Returns `CatalogError::Storage` if the entries cannot be read.
    pub async fn lessons_by_ids(
        &self,
        ctx: &Context,
        ids: &[EntryId],
    ) -> Result<Vec<Lesson>, CatalogError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.many(
            ctx,
            EntryQuery::model(models::LESSONS)
                .ids(ids)
                .depth(LESSON_DEPTH),
            parse_lesson,
        )
        .await
    }

    /// # Errors
    ///
    /// Returns `CatalogError::Content` if an entry is malformed.
    /// Returns `CatalogError::Storage` if the entries cannot be read.
    pub async fn pages_by_ids(
        &self,
        ctx: &Context,
        ids: &[EntryId],
    ) -> Result<Vec<Page>, CatalogError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.many(ctx, EntryQuery::model(models::PAGES).ids(ids), parse_page)
            .await
    }

    /// Quizzes with their questions expanded and answers as stubs.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Content` if an entry is malformed.
    /// Returns `CatalogError::Storage` if the entries cannot be read.
    pub async fn quizzes_by_ids(
        &self,
        ctx: &Context,
        ids: &[EntryId],
    ) -> Result<Vec<Quiz>, CatalogError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        self.many(
            ctx,
            EntryQuery::model(models::QUIZZES)
                .ids(ids)
                .depth(QUIZ_DEPTH),
            parse_quiz,
        )
        .await
    }
}
