use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::ids::EntryId;

//
// ─── REFERENCES ────────────────────────────────────────────────────────────────
//

/// Minimal projection of an entry that was not expanded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryStub {
    pub id: EntryId,
    pub name: Option<String>,
}

/// A child that is either fully parsed or only known by id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Reference<T> {
    Expanded(T),
    Stub(EntryStub),
}

/// Implemented by parsed objects that carry an entry id.
pub trait HasId {
    fn id(&self) -> &EntryId;
}

impl<T: HasId> Reference<T> {
    #[must_use]
    pub fn id(&self) -> &EntryId {
        match self {
            Self::Expanded(inner) => inner.id(),
            Self::Stub(stub) => &stub.id,
        }
    }

    #[must_use]
    pub fn expanded(&self) -> Option<&T> {
        match self {
            Self::Expanded(inner) => Some(inner),
            Self::Stub(_) => None,
        }
    }
}

macro_rules! has_id {
    ($($ty:ty),* $(,)?) => {
        $(impl HasId for $ty {
            fn id(&self) -> &EntryId {
                &self.id
            }
        })*
    };
}

//
// ─── DURATION & ORDER ──────────────────────────────────────────────────────────
//

/// Course length split for display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CourseDuration {
    total_minutes: u32,
}

impl CourseDuration {
    #[must_use]
    pub fn from_minutes(total_minutes: u32) -> Self {
        Self { total_minutes }
    }

    #[must_use]
    pub fn total_minutes(self) -> u32 {
        self.total_minutes
    }

    #[must_use]
    pub fn hours(self) -> u32 {
        self.total_minutes / 60
    }

    /// Fractional hour remainder converted back to minutes.
    #[must_use]
    pub fn minutes(self) -> u32 {
        self.total_minutes % 60
    }

    /// Whole hours, rounded to nearest (half up).
    #[must_use]
    pub fn rounded_hours(self) -> u32 {
        self.total_minutes / 60 + u32::from(self.total_minutes % 60 >= 30)
    }
}

impl std::fmt::Display for CourseDuration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.hours(), self.minutes())
    }
}

/// Position of a course inside each learning path that contains it.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CourseOrder(HashMap<EntryId, i64>);

impl CourseOrder {
    #[must_use]
    pub fn new(positions: HashMap<EntryId, i64>) -> Self {
        Self(positions)
    }

    #[must_use]
    pub fn position_in(&self, path_id: &EntryId) -> Option<i64> {
        self.0.get(path_id).copied()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

//
// ─── CONTENT ───────────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: EntryId,
    pub created_at: Option<DateTime<Utc>>,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page {
    pub id: EntryId,
    pub created_at: Option<DateTime<Utc>>,
    pub name: String,
    pub quizzes: Vec<EntryStub>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lesson {
    pub id: EntryId,
    pub created_at: Option<DateTime<Utc>>,
    pub name: String,
    /// Position within the section; unparsable or missing values are 0.
    pub order_id: i64,
    pub description: String,
    pub pages: Vec<Reference<Page>>,
    pub categories: Vec<Reference<Category>>,
}

impl Lesson {
    #[must_use]
    pub fn page_ids(&self) -> Vec<EntryId> {
        self.pages.iter().map(|p| p.id().clone()).collect()
    }

    #[must_use]
    pub fn category_ids(&self) -> Vec<EntryId> {
        self.categories.iter().map(|c| c.id().clone()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Section {
    pub id: EntryId,
    pub created_at: Option<DateTime<Utc>>,
    pub name: String,
    pub description: String,
    pub lessons: Vec<Reference<Lesson>>,
}

impl Section {
    #[must_use]
    pub fn lesson_ids(&self) -> Vec<EntryId> {
        self.lessons.iter().map(|l| l.id().clone()).collect()
    }

    #[must_use]
    pub fn contains_lesson(&self, lesson_id: &EntryId) -> bool {
        self.lessons.iter().any(|l| l.id() == lesson_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    pub id: EntryId,
    pub created_at: Option<DateTime<Utc>>,
    pub name: String,
    pub description: String,
    pub duration: CourseDuration,
    pub banner: Option<String>,
    pub banner_name: Option<String>,
    pub role_id: Option<String>,
    pub course_order: CourseOrder,
    pub sections: Vec<Section>,
    /// Names of the learning paths this course belongs to, filled by the catalog.
    pub course_paths: Vec<String>,
}

impl Course {
    #[must_use]
    pub fn section_ids(&self) -> Vec<EntryId> {
        self.sections.iter().map(|s| s.id.clone()).collect()
    }

    #[must_use]
    pub fn section_of_lesson(&self, lesson_id: &EntryId) -> Option<&Section> {
        self.sections.iter().find(|s| s.contains_lesson(lesson_id))
    }

    #[must_use]
    pub fn count_lessons(&self) -> usize {
        self.sections.iter().map(|s| s.lessons.len()).sum()
    }
}

has_id!(Category, Page, Lesson, Section, Course);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duration_splits_hours_and_minutes() {
        let d = CourseDuration::from_minutes(90);
        assert_eq!(d.to_string(), "1/30");
        let d = CourseDuration::from_minutes(100);
        assert_eq!((d.hours(), d.minutes()), (1, 40));
        assert_eq!(CourseDuration::default().to_string(), "0/0");
    }

    #[test]
    fn duration_rounded_hours() {
        assert_eq!(CourseDuration::from_minutes(89).rounded_hours(), 1);
        assert_eq!(CourseDuration::from_minutes(90).rounded_hours(), 2);
        assert_eq!(CourseDuration::from_minutes(29).rounded_hours(), 0);
        assert_eq!(
            CourseDuration::from_minutes(u32::MAX).rounded_hours(),
            u32::MAX / 60
        );
    }

    #[test]
    fn reference_id_resolves_both_shapes() {
        let stub: Reference<Category> = Reference::Stub(EntryStub {
            id: EntryId::new("c1"),
            name: None,
        });
        assert_eq!(stub.id(), &EntryId::new("c1"));
        assert!(stub.expanded().is_none());
    }
}
