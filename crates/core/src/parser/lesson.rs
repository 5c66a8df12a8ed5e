use crate::error::ContentError;
use crate::model::schema::elements;
use crate::model::{Category, Entry, Lesson, Page};

use super::elements::{name, parse_references, references, require_expanded, stub, text};

/// Parse an expanded lesson entry with its pages and categories.
///
/// # Errors
///
/// Returns `ContentError` if the entry is a stub, has no name, or an element
/// holds an unexpected kind of value.
pub fn parse_lesson(entry: &Entry) -> Result<Lesson, ContentError> {
    require_expanded(entry)?;
    let order_id = text(entry, elements::LESSON_ORDER)?
        .and_then(|raw| leading_integer(&raw))
        .unwrap_or(0);

    Ok(Lesson {
        id: entry.id.clone(),
        created_at: entry.created_at,
        name: name(entry)?,
        order_id,
        description: text(entry, elements::LESSON_DESCRIPTION)?.unwrap_or_default(),
        pages: parse_references(entry, elements::LESSON_PAGES, parse_page)?,
        categories: parse_references(entry, elements::LESSON_CATEGORIES, parse_category)?,
    })
}

/// Integer prefix of `raw` after leading whitespace: `"3a"` is 3, `"-2 "` is
/// -2, `"a3"` has none.
fn leading_integer(raw: &str) -> Option<i64> {
    let raw = raw.trim_start();
    let sign_len = usize::from(raw.starts_with(['+', '-']));
    let digits = raw[sign_len..]
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(raw.len() - sign_len);
    if digits == 0 {
        return None;
    }
    raw[..sign_len + digits].parse().ok()
}

/// Parse an expanded page; its quizzes are kept as stubs.
///
/// # Errors
///
/// Returns `ContentError` if the entry is a stub or malformed.
pub fn parse_page(entry: &Entry) -> Result<Page, ContentError> {
    require_expanded(entry)?;
    Ok(Page {
        id: entry.id.clone(),
        created_at: entry.created_at,
        name: name(entry)?,
        quizzes: references(entry, elements::QUIZZES)?
            .iter()
            .map(stub)
            .collect(),
    })
}

/// # Errors
///
/// Returns `ContentError::MissingName` if the category has no name.
pub fn parse_category(entry: &Entry) -> Result<Category, ContentError> {
    Ok(Category {
        id: entry.id.clone(),
        created_at: entry.created_at,
        name: name(entry)?,
    })
}
