use std::collections::HashMap;

use crate::error::ContentError;
use crate::model::schema::elements;
use crate::model::{Course, CourseDuration, CourseOrder, Entry, EntryId, Reference, Section};

use super::elements::{name, number, parse_expanded, parse_references, require_expanded, text};
use super::lesson::parse_lesson;

/// Parse an expanded course entry together with its sections.
///
/// Sections are ordered by creation time. Lessons inside each section may be
/// expanded or stubs.
///
/// # Errors
///
/// Returns `ContentError` for stubs, missing names, wrongly typed elements,
/// unexpanded sections or an invalid `course_order` document.
pub fn parse_course(entry: &Entry) -> Result<Course, ContentError> {
    require_expanded(entry)?;

    let mut sections = parse_expanded(entry, elements::SECTIONS, parse_section)?;
    sections.sort_by_key(|s| s.created_at);

    Ok(Course {
        id: entry.id.clone(),
        created_at: entry.created_at,
        name: name(entry)?,
        description: text(entry, elements::COURSE_DESCRIPTION)?.unwrap_or_default(),
        duration: duration(entry)?,
        banner: text(entry, elements::COURSE_BANNER)?,
        banner_name: text(entry, elements::COURSE_BANNER_NAME)?,
        role_id: text(entry, elements::COURSE_ROLE_ID)?,
        course_order: course_order(entry)?,
        sections,
        course_paths: Vec::new(),
    })
}

/// Parse an expanded section; lessons are ordered by their `order_id`.
///
/// # Errors
///
/// Returns `ContentError` for stubs, missing names or malformed lessons.
pub fn parse_section(entry: &Entry) -> Result<Section, ContentError> {
    require_expanded(entry)?;

    let mut lessons = parse_references(entry, elements::LESSONS, parse_lesson)?;
    lessons.sort_by_key(|lesson| match lesson {
        Reference::Expanded(l) => l.order_id,
        Reference::Stub(_) => 0,
    });

    Ok(Section {
        id: entry.id.clone(),
        created_at: entry.created_at,
        name: name(entry)?,
        description: text(entry, elements::SECTION_DESCRIPTION)?.unwrap_or_default(),
        lessons,
    })
}

#[allow(clippy::cast_possible_truncation)]
fn duration(entry: &Entry) -> Result<CourseDuration, ContentError> {
    let minutes = number(entry, elements::COURSE_DURATION)?
        .filter(|m| m.is_finite() && *m > 0.0)
        .map_or(0, |m| u32::try_from(m.trunc() as i64).unwrap_or(u32::MAX));
    Ok(CourseDuration::from_minutes(minutes))
}

fn course_order(entry: &Entry) -> Result<CourseOrder, ContentError> {
    let Some(raw) = text(entry, elements::COURSE_ORDER)? else {
        return Ok(CourseOrder::default());
    };
    if raw.trim().is_empty() {
        return Ok(CourseOrder::default());
    }

    let invalid = |reason: String| ContentError::InvalidCourseOrder {
        entry_id: entry.id.clone(),
        reason,
    };
    let document: serde_json::Map<String, serde_json::Value> =
        serde_json::from_str(&raw).map_err(|e| invalid(e.to_string()))?;

    // Positions are written either as numbers or as numeric strings.
    let positions: HashMap<EntryId, i64> = document
        .into_iter()
        .filter_map(|(path_id, position)| {
            let position = match position {
                serde_json::Value::Number(n) => n.as_i64(),
                serde_json::Value::String(s) => s.trim().parse().ok(),
                _ => None,
            }?;
            Some((EntryId::new(path_id), position))
        })
        .collect();
    Ok(CourseOrder::new(positions))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Element, ElementValue};
    use chrono::{TimeZone, Utc};

    fn at(day: u32) -> chrono::DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap()
    }

    fn lesson(id: &str, order: &str) -> Entry {
        Entry::new(
            EntryId::new(id),
            at(1),
            id,
            vec![Element::new(elements::LESSON_ORDER, ElementValue::text("en", order))],
        )
    }

    fn section(id: &str, day: u32, lessons: Vec<Entry>) -> Entry {
        Entry::new(
            EntryId::new(id),
            at(day),
            id,
            vec![Element::new(elements::LESSONS, ElementValue::Entries(lessons))],
        )
    }

    fn course(sections: Vec<Entry>, extra: Vec<Element>) -> Entry {
        let mut elements = vec![Element::new(elements::SECTIONS, ElementValue::Entries(sections))];
        elements.extend(extra);
        Entry::new(EntryId::new("C1"), at(1), "Course", elements)
    }

    #[test]
    fn orders_sections_by_creation_and_lessons_by_order_id() {
        let entry = course(
            vec![
                section("S2", 5, vec![]),
                section("S1", 2, vec![lesson("L2", "2"), lesson("L1", "1")]),
            ],
            vec![],
        );
        let parsed = parse_course(&entry).unwrap();
        assert_eq!(parsed.section_ids(), vec![EntryId::new("S1"), EntryId::new("S2")]);
        assert_eq!(
            parsed.sections[0].lesson_ids(),
            vec![EntryId::new("L1"), EntryId::new("L2")]
        );
        assert_eq!(
            parsed.section_of_lesson(&EntryId::new("L2")).map(|s| s.id.clone()),
            Some(EntryId::new("S1"))
        );
    }

    #[test]
    fn stub_lessons_fall_back_to_id_and_name() {
        let mut stub = Entry::stub(EntryId::new("L9"));
        stub.name = vec![crate::model::LocalizedText::new("en", "Nine")];
        let entry = course(vec![section("S1", 1, vec![stub])], vec![]);
        let parsed = parse_course(&entry).unwrap();
        let Reference::Stub(s) = &parsed.sections[0].lessons[0] else {
            panic!("expected stub");
        };
        assert_eq!(s.name.as_deref(), Some("Nine"));
    }

    #[test]
    fn derives_duration_and_optional_fields() {
        let entry = course(
            vec![],
            vec![
                Element::new(elements::COURSE_DURATION, ElementValue::Number(135.0)),
                Element::new(elements::COURSE_BANNER, ElementValue::text("en", "b.png")),
                Element::null(elements::COURSE_DESCRIPTION),
            ],
        );
        let parsed = parse_course(&entry).unwrap();
        assert_eq!(parsed.duration.to_string(), "2/15");
        assert_eq!(parsed.banner.as_deref(), Some("b.png"));
        assert_eq!(parsed.description, "");
        assert!(parsed.role_id.is_none());
    }

    #[test]
    fn null_sections_yield_empty_course() {
        let entry = Entry::new(
            EntryId::new("C2"),
            at(1),
            "Empty",
            vec![Element::null(elements::SECTIONS)],
        );
        let parsed = parse_course(&entry).unwrap();
        assert!(parsed.sections.is_empty());
        assert_eq!(parsed.duration.to_string(), "0/0");
    }

    #[test]
    fn parses_course_order_per_path() {
        let entry = course(
            vec![],
            vec![Element::new(
                elements::COURSE_ORDER,
                ElementValue::text("en", r#"{"LP1": 2, "LP2": "0"}"#),
            )],
        );
        let order = parse_course(&entry).unwrap().course_order;
        assert_eq!(order.position_in(&EntryId::new("LP1")), Some(2));
        assert_eq!(order.position_in(&EntryId::new("LP2")), Some(0));
        assert_eq!(order.position_in(&EntryId::new("LP3")), None);
    }

    #[test]
    fn invalid_course_order_is_malformed_content() {
        let entry = course(
            vec![],
            vec![Element::new(elements::COURSE_ORDER, ElementValue::text("en", "{oops"))],
        );
        assert!(matches!(
            parse_course(&entry),
            Err(ContentError::InvalidCourseOrder { .. })
        ));
    }

    #[test]
    fn stub_section_is_rejected() {
        let entry = course(vec![Entry::stub(EntryId::new("S1"))], vec![]);
        assert!(matches!(
            parse_course(&entry),
            Err(ContentError::NotExpanded { .. })
        ));
    }
}
