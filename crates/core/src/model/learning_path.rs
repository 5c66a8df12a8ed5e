use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::content::Course;
use crate::model::ids::EntryId;

/// Ordered list of courses with aggregates over them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearningPath {
    pub id: EntryId,
    pub created_at: Option<DateTime<Utc>>,
    pub name: String,
    pub description: String,
    pub courses: Vec<Course>,
    /// Sum of each course's duration rounded to whole hours.
    pub duration_hours: u32,
    pub count_courses: usize,
    pub count_lessons: usize,
}
