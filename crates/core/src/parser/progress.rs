use crate::error::ContentError;
use crate::model::schema::{elements, DEFAULT_LOCALE};
use crate::model::{
    Element, ElementValue, Entry, EntryId, Percent, ProgressRecord, UserId, UserRef,
};

use super::elements::{number, require_expanded, text, users};

fn missing(entry: &Entry, api_name: &str) -> ContentError {
    ContentError::MissingElement {
        entry_id: entry.id.clone(),
        api_name: api_name.to_owned(),
    }
}

/// Read a progress record stored as a `user_progress` entry.
///
/// # Errors
///
/// Returns `ContentError` if the user, tracked entry id or percent element is
/// missing or holds an out-of-range value.
pub fn parse_progress_record(entry: &Entry) -> Result<ProgressRecord, ContentError> {
    require_expanded(entry)?;
    let user_id = users(entry, elements::USER)?
        .into_iter()
        .next()
        .ok_or_else(|| missing(entry, elements::USER))?;
    let entry_id = text(entry, elements::CURRENT_ENTRY_ID)?
        .ok_or_else(|| missing(entry, elements::CURRENT_ENTRY_ID))?;
    let raw = number(entry, elements::PROGRESS_PERCENT)?
        .ok_or_else(|| missing(entry, elements::PROGRESS_PERCENT))?;
    let percent = Percent::from_stored(raw).map_err(|source| ContentError::InvalidPercent {
        entry_id: entry.id.clone(),
        source,
    })?;

    Ok(ProgressRecord {
        id: entry.id.clone(),
        user_id,
        entry_id: EntryId::new(entry_id),
        percent,
    })
}

/// Elements describing a progress record, in the layout `parse_progress_record` reads.
#[must_use]
pub fn progress_elements(user: &UserId, entry_id: &EntryId, percent: Percent) -> Vec<Element> {
    vec![
        Element::new(
            elements::USER,
            ElementValue::Users(vec![UserRef { id: user.clone() }]),
        ),
        Element::new(
            elements::CURRENT_ENTRY_ID,
            ElementValue::text(DEFAULT_LOCALE, entry_id.as_str()),
        ),
        Element::new(
            elements::PROGRESS_PERCENT,
            ElementValue::Number(f64::from(percent.value())),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn reads_back_written_elements() {
        let user = UserId::new("u1");
        let elements = progress_elements(&user, &EntryId::new("L1"), Percent::new(40).unwrap());
        let entry = Entry::new(EntryId::new("R1"), Utc::now(), "record_L1_ab", elements);

        let record = parse_progress_record(&entry).unwrap();
        assert_eq!(record.user_id, user);
        assert_eq!(record.entry_id, EntryId::new("L1"));
        assert_eq!(record.percent.value(), 40);
    }

    #[test]
    fn missing_percent_is_reported() {
        let entry = Entry::new(
            EntryId::new("R2"),
            Utc::now(),
            "r",
            vec![
                Element::new(
                    elements::USER,
                    ElementValue::Users(vec![UserRef { id: UserId::new("u") }]),
                ),
                Element::new(elements::CURRENT_ENTRY_ID, ElementValue::text("en", "L1")),
            ],
        );
        assert!(matches!(
            parse_progress_record(&entry),
            Err(ContentError::MissingElement { .. })
        ));
    }

    #[test]
    fn out_of_range_percent_is_reported() {
        let mut fields = progress_elements(&UserId::new("u"), &EntryId::new("L"), Percent::ZERO);
        fields[2] = Element::new(elements::PROGRESS_PERCENT, ElementValue::Number(140.0));
        let entry = Entry::new(EntryId::new("R3"), Utc::now(), "r", fields);
        assert!(matches!(
            parse_progress_record(&entry),
            Err(ContentError::InvalidPercent { .. })
        ));
    }
}
