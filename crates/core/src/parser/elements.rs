//! Element extraction shared by the content parsers.

use std::collections::BTreeMap;

use crate::error::ContentError;
use crate::model::{
    ElementKind, ElementValue, Entry, EntryStub, HasId, Reference, Scalar, UserId,
};

fn unexpected(entry: &Entry, api_name: &str, expected: ElementKind, found: &ElementValue) -> ContentError {
    ContentError::UnexpectedKind {
        entry_id: entry.id.clone(),
        api_name: api_name.to_owned(),
        expected,
        found: found.kind(),
    }
}

fn value<'a>(entry: &'a Entry, key: &str) -> Option<&'a ElementValue> {
    entry.element(key).and_then(|e| e.value.as_ref())
}

/// Fails with `NotExpanded` for stubs.
pub(crate) fn require_expanded(entry: &Entry) -> Result<(), ContentError> {
    if entry.is_stub() {
        return Err(ContentError::NotExpanded {
            entry_id: entry.id.clone(),
        });
    }
    Ok(())
}

pub(crate) fn name(entry: &Entry) -> Result<String, ContentError> {
    entry
        .display_name()
        .map(str::to_owned)
        .ok_or_else(|| ContentError::MissingName {
            entry_id: entry.id.clone(),
        })
}

pub(crate) fn text(entry: &Entry, key: &str) -> Result<Option<String>, ContentError> {
    match value(entry, key) {
        None => Ok(None),
        Some(ElementValue::Text(values)) => Ok(values.first().map(|t| t.value.clone())),
        Some(other) => Err(unexpected(entry, key, ElementKind::Text, other)),
    }
}

pub(crate) fn number(entry: &Entry, key: &str) -> Result<Option<f64>, ContentError> {
    match value(entry, key) {
        None => Ok(None),
        Some(ElementValue::Number(n)) => Ok(Some(*n)),
        Some(other) => Err(unexpected(entry, key, ElementKind::Number, other)),
    }
}

pub(crate) fn users(entry: &Entry, key: &str) -> Result<Vec<UserId>, ContentError> {
    match value(entry, key) {
        None => Ok(Vec::new()),
        Some(ElementValue::Users(users)) => Ok(users.iter().map(|u| u.id.clone()).collect()),
        Some(other) => Err(unexpected(entry, key, ElementKind::Users, other)),
    }
}

/// Entries behind a reference element; absent and null elements are empty.
pub(crate) fn references<'a>(entry: &'a Entry, key: &str) -> Result<&'a [Entry], ContentError> {
    match value(entry, key) {
        None => Ok(&[]),
        Some(ElementValue::Entries(entries)) => Ok(entries),
        Some(other) => Err(unexpected(entry, key, ElementKind::Entries, other)),
    }
}

pub(crate) fn stub(entry: &Entry) -> EntryStub {
    EntryStub {
        id: entry.id.clone(),
        name: entry.display_name().map(str::to_owned),
    }
}

/// Parse each referenced entry, projecting unexpanded ones to stubs.
pub(crate) fn parse_references<T: HasId>(
    entry: &Entry,
    key: &str,
    parse: impl Fn(&Entry) -> Result<T, ContentError>,
) -> Result<Vec<Reference<T>>, ContentError> {
    references(entry, key)?
        .iter()
        .map(|child| {
            if child.is_stub() {
                Ok(Reference::Stub(stub(child)))
            } else {
                parse(child).map(Reference::Expanded)
            }
        })
        .collect()
}

/// Parse each referenced entry, which must all be expanded.
pub(crate) fn parse_expanded<T>(
    entry: &Entry,
    key: &str,
    parse: impl Fn(&Entry) -> Result<T, ContentError>,
) -> Result<Vec<T>, ContentError> {
    references(entry, key)?.iter().map(parse).collect()
}

/// Every non-reference element keyed by api name. Null values are skipped.
pub(crate) fn scalars(entry: &Entry) -> BTreeMap<String, Scalar> {
    entry
        .elements()
        .iter()
        .filter_map(|element| {
            let scalar = match element.value.as_ref()? {
                ElementValue::Text(values) => Scalar::Text(values.first()?.value.clone()),
                ElementValue::Number(n) => Scalar::Number(*n),
                ElementValue::Boolean(b) => Scalar::Boolean(*b),
                ElementValue::Users(users) => {
                    Scalar::Users(users.iter().map(|u| u.id.clone()).collect())
                }
                ElementValue::Entries(_) => return None,
            };
            Some((element.api_name.clone(), scalar))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Element, EntryId};

    fn entry(elements: Vec<Element>) -> Entry {
        Entry::new(EntryId::new("e1"), chrono::Utc::now(), "E", elements)
    }

    #[test]
    fn null_reference_is_empty() {
        let e = entry(vec![Element::null("element__lessons__entry")]);
        assert!(references(&e, "element__lessons__entry").unwrap().is_empty());
    }

    #[test]
    fn wrong_kind_is_reported() {
        let e = entry(vec![Element::new(
            "element__lessons__entry",
            ElementValue::Number(3.0),
        )]);
        let err = references(&e, "element__lessons__entry").unwrap_err();
        assert!(matches!(
            err,
            ContentError::UnexpectedKind {
                expected: ElementKind::Entries,
                found: ElementKind::Number,
                ..
            }
        ));
    }

    #[test]
    fn scalars_skip_references_and_nulls() {
        let e = entry(vec![
            Element::new("a", ElementValue::text("en", "x")),
            Element::null("b"),
            Element::references("c", [&EntryId::new("z")]),
        ]);
        let map = scalars(&e);
        assert_eq!(map.len(), 1);
        assert_eq!(map.get("a"), Some(&Scalar::Text("x".into())));
    }
}
