use crate::error::ContentError;
use crate::model::schema::elements;
use crate::model::{Entry, LearningPath};

use super::course::parse_course;
use super::elements::{name, parse_expanded, require_expanded, text};

/// Parse a learning path and order its courses by their per-path position.
///
/// Courses without a position for this path go last, keeping their stored
/// order among themselves.
///
/// # Errors
///
/// Returns `ContentError` if the path or any of its courses is malformed.
pub fn parse_learning_path(entry: &Entry) -> Result<LearningPath, ContentError> {
    require_expanded(entry)?;

    let mut courses = parse_expanded(entry, elements::COURSES, parse_course)?;
    courses.sort_by_key(|c| c.course_order.position_in(&entry.id).unwrap_or(i64::MAX));

    Ok(LearningPath {
        id: entry.id.clone(),
        created_at: entry.created_at,
        name: name(entry)?,
        description: text(entry, elements::LP_DESCRIPTION)?.unwrap_or_default(),
        duration_hours: courses
            .iter()
            .map(|c| c.duration.rounded_hours())
            .fold(0, u32::saturating_add),
        count_courses: courses.len(),
        count_lessons: courses.iter().map(|c| c.count_lessons()).sum(),
        courses,
    })
}
