#![allow(dead_code)]

use std::sync::Arc;

use chrono::{Duration, TimeZone, Utc};
use lms_core::model::schema::{elements, models};
use lms_core::model::{Context, Element, EntryId, ProjectId, UserId};
use storage::repository::{EntryRepository, InMemoryRepository, NewEntry, Storage};

pub fn ctx() -> Context {
    Context::new(ProjectId::new("p1"), UserId::new("u1"))
}

/// Every local progress layout over a fresh in-memory entry store.
pub fn backends() -> Vec<(&'static str, Storage)> {
    vec![
        ("keyed", Storage::in_memory()),
        (
            "entry-backed",
            Storage::entry_backed(Arc::new(InMemoryRepository::new())),
        ),
    ]
}

/// Ids of a seeded course: `lessons[s]` are the lessons of `sections[s]`,
/// `pages[s][l]` the pages of that lesson.
pub struct CourseIds {
    pub course: EntryId,
    pub sections: Vec<EntryId>,
    pub lessons: Vec<Vec<EntryId>>,
    pub pages: Vec<Vec<Vec<EntryId>>>,
}

impl CourseIds {
    pub fn all_lessons(&self) -> Vec<EntryId> {
        self.lessons.iter().flatten().cloned().collect()
    }

    pub fn all_pages(&self) -> Vec<EntryId> {
        self.pages.iter().flatten().flatten().cloned().collect()
    }
}

async fn create(storage: &Storage, entry: NewEntry) -> EntryId {
    storage
        .entries
        .create_entry(ctx().project(), entry)
        .await
        .unwrap()
}

/// A quiz with one question that holds one submitted answer.
async fn quiz(storage: &Storage, label: &str) -> EntryId {
    let answer = create(
        storage,
        NewEntry::new(models::QUESTION_ANSWERS, format!("answer_{label}"), "answer"),
    )
    .await;
    let question = create(
        storage,
        NewEntry::new(models::QUESTIONS, format!("question_{label}"), "Why?")
            .element(Element::references(elements::QUESTION_ANSWERS, [&answer])),
    )
    .await;
    create(
        storage,
        NewEntry::new(models::QUIZZES, format!("quiz_{label}"), "Quiz")
            .element(Element::references(elements::QUESTIONS, [&question])),
    )
    .await
}

/// Course whose section `s` holds `shape[s]` lessons with `pages` pages each.
/// Every page carries a quiz and every lesson a category.
pub async fn seed_course(storage: &Storage, shape: &[usize], pages: usize) -> CourseIds {
    let t0 = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();
    let mut ids = CourseIds {
        course: EntryId::new("pending"),
        sections: Vec::new(),
        lessons: Vec::new(),
        pages: Vec::new(),
    };

    for (s, lesson_count) in shape.iter().enumerate() {
        let mut section_lessons = Vec::new();
        let mut section_pages = Vec::new();
        for l in 0..*lesson_count {
            let mut lesson_pages = Vec::new();
            for p in 0..pages {
                let label = format!("{s}_{l}_{p}");
                let quiz_id = quiz(storage, &label).await;
                let page = create(
                    storage,
                    NewEntry::new(models::PAGES, format!("page_{label}"), format!("Page {label}"))
                        .element(Element::references(elements::QUIZZES, [&quiz_id])),
                )
                .await;
                lesson_pages.push(page);
            }
            let category = create(
                storage,
                NewEntry::new(models::LESSON_CATEGORIES, format!("cat_{s}_{l}"), "Category"),
            )
            .await;
            let lesson = create(
                storage,
                NewEntry::new(models::LESSONS, format!("lesson_{s}_{l}"), format!("L{s}.{l}"))
                    .element(Element::new(
                        elements::LESSON_ORDER,
                        lms_core::model::ElementValue::text("en", (l + 1).to_string()),
                    ))
                    .element(Element::references(elements::LESSON_PAGES, &lesson_pages))
                    .element(Element::references(elements::LESSON_CATEGORIES, [&category])),
            )
            .await;
            section_lessons.push(lesson);
            section_pages.push(lesson_pages);
        }
        let offset = i64::try_from(s).unwrap();
        let section = create(
            storage,
            NewEntry::new(models::SECTIONS, format!("section_{s}"), format!("S{s}"))
                .created_at(t0 + Duration::minutes(offset))
                .element(Element::references(elements::LESSONS, &section_lessons)),
        )
        .await;
        ids.sections.push(section);
        ids.lessons.push(section_lessons);
        ids.pages.push(section_pages);
    }

    ids.course = create(
        storage,
        NewEntry::new(models::COURSES, "course", "Course")
            .element(Element::references(elements::SECTIONS, &ids.sections)),
    )
    .await;
    ids
}
