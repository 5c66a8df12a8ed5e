use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::ids::{EntryId, UserId};

/// A string tagged with the locale it was authored in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocalizedText {
    pub locale: String,
    pub value: String,
}

impl LocalizedText {
    #[must_use]
    pub fn new(locale: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            locale: locale.into(),
            value: value.into(),
        }
    }
}

/// Reference to a user stored in a `users` element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRef {
    pub id: UserId,
}

/// Value of an element, tagged by kind.
///
/// Serializes externally tagged (`{"text": [...]}`, `{"entries": [...]}`), the
/// same shape the content API returns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ElementValue {
    Text(Vec<LocalizedText>),
    Number(f64),
    Boolean(bool),
    Users(Vec<UserRef>),
    Entries(Vec<Entry>),
}

impl ElementValue {
    /// Single-locale text value.
    #[must_use]
    pub fn text(locale: &str, value: impl Into<String>) -> Self {
        Self::Text(vec![LocalizedText::new(locale, value)])
    }

    #[must_use]
    pub fn kind(&self) -> ElementKind {
        match self {
            Self::Text(_) => ElementKind::Text,
            Self::Number(_) => ElementKind::Number,
            Self::Boolean(_) => ElementKind::Boolean,
            Self::Users(_) => ElementKind::Users,
            Self::Entries(_) => ElementKind::Entries,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    Text,
    Number,
    Boolean,
    Users,
    Entries,
}

impl std::fmt::Display for ElementKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Text => "text",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Users => "users",
            Self::Entries => "entries",
        };
        f.write_str(label)
    }
}

/// A named field of an entry. `value == None` is the content API's null.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Element {
    pub api_name: String,
    #[serde(default)]
    pub value: Option<ElementValue>,
}

impl Element {
    #[must_use]
    pub fn new(api_name: impl Into<String>, value: ElementValue) -> Self {
        Self {
            api_name: api_name.into(),
            value: Some(value),
        }
    }

    #[must_use]
    pub fn null(api_name: impl Into<String>) -> Self {
        Self {
            api_name: api_name.into(),
            value: None,
        }
    }

    /// Reference element pointing at the given entries as unexpanded stubs.
    #[must_use]
    pub fn references<'a>(
        api_name: impl Into<String>,
        ids: impl IntoIterator<Item = &'a EntryId>,
    ) -> Self {
        let stubs = ids.into_iter().map(|id| Entry::stub(id.clone())).collect();
        Self::new(api_name, ElementValue::Entries(stubs))
    }

    /// Whether this element is stored under `key`.
    ///
    /// Api names carry a per-project prefix in some projects, so matching is by
    /// containment rather than equality.
    #[must_use]
    pub fn matches(&self, key: &str) -> bool {
        self.api_name.contains(key)
    }
}

/// Generic content record.
///
/// `elements == None` marks a stub: a reference that the content API returned
/// without expanding it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    pub id: EntryId,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub name: Vec<LocalizedText>,
    #[serde(default)]
    pub elements: Option<Vec<Element>>,
}

impl Entry {
    /// Fully specified entry with elements.
    #[must_use]
    pub fn new(
        id: EntryId,
        created_at: DateTime<Utc>,
        name: impl Into<String>,
        elements: Vec<Element>,
    ) -> Self {
        Self {
            id,
            created_at: Some(created_at),
            name: vec![LocalizedText::new(crate::model::schema::DEFAULT_LOCALE, name)],
            elements: Some(elements),
        }
    }

    /// Bare reference carrying only the id.
    #[must_use]
    pub fn stub(id: EntryId) -> Self {
        Self {
            id,
            created_at: None,
            name: Vec::new(),
            elements: None,
        }
    }

    #[must_use]
    pub fn is_stub(&self) -> bool {
        self.elements.is_none()
    }

    /// First localized name, if any.
    #[must_use]
    pub fn display_name(&self) -> Option<&str> {
        self.name.first().map(|n| n.value.as_str())
    }

    #[must_use]
    pub fn elements(&self) -> &[Element] {
        self.elements.as_deref().unwrap_or_default()
    }

    /// First element whose api name matches `key`.
    #[must_use]
    pub fn element(&self, key: &str) -> Option<&Element> {
        self.elements().iter().find(|e| e.matches(key))
    }

    /// Entries referenced by the element `key`.
    ///
    /// Absent elements, null values and non-reference values all yield an empty
    /// slice.
    #[must_use]
    pub fn referenced(&self, key: &str) -> &[Entry] {
        match self.element(key).and_then(|e| e.value.as_ref()) {
            Some(ElementValue::Entries(entries)) => entries,
            _ => &[],
        }
    }

    /// Collapse to a stub carrying only identity fields.
    #[must_use]
    pub fn to_stub(&self) -> Self {
        Self {
            id: self.id.clone(),
            created_at: self.created_at,
            name: self.name.clone(),
            elements: None,
        }
    }

    /// Replace elements that share an api name with `updates` and append the rest.
    pub fn merge_elements(&mut self, updates: Vec<Element>) {
        let elements = self.elements.get_or_insert_with(Vec::new);
        for update in updates {
            match elements.iter_mut().find(|e| e.api_name == update.api_name) {
                Some(existing) => *existing = update,
                None => elements.push(update),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn deserializes_tagged_values() {
        let raw = json!({
            "id": "lesson-1",
            "created_at": "2024-01-02T03:04:05Z",
            "name": [{"locale": "en", "value": "Intro"}],
            "elements": [
                {"api_name": "element__lesson_order__text", "value": {"text": [{"locale": "en", "value": "2"}]}},
                {"api_name": "element__lesson_pages__entry", "value": {"entries": [{"id": "page-1"}]}},
                {"api_name": "element__lesson_categories__entry", "value": null}
            ]
        });
        let entry: Entry = serde_json::from_value(raw).unwrap();

        assert_eq!(entry.display_name(), Some("Intro"));
        assert_eq!(entry.referenced("element__lesson_pages__entry").len(), 1);
        assert!(entry.referenced("element__lesson_pages__entry")[0].is_stub());
        assert!(entry.referenced("element__lesson_categories__entry").is_empty());
        assert!(entry.referenced("element__missing__entry").is_empty());
    }

    #[test]
    fn element_lookup_matches_prefixed_api_names() {
        let entry = Entry::new(
            EntryId::new("e"),
            chrono::Utc::now(),
            "E",
            vec![Element::new("p1_element__flag__boolean", ElementValue::Boolean(true))],
        );
        assert!(entry.element("element__flag__boolean").is_some());
    }

    #[test]
    fn merge_elements_replaces_by_api_name() {
        let mut entry = Entry::new(
            EntryId::new("e"),
            chrono::Utc::now(),
            "E",
            vec![Element::new("a", ElementValue::Number(1.0))],
        );
        entry.merge_elements(vec![
            Element::new("a", ElementValue::Number(2.0)),
            Element::new("b", ElementValue::Boolean(false)),
        ]);
        assert_eq!(entry.elements().len(), 2);
        assert_eq!(entry.elements()[0].value, Some(ElementValue::Number(2.0)));
    }
}
