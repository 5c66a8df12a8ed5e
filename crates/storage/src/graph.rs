//! Project-scoped entry graph shared by the local backends.
//!
//! References are stored as bare stubs and expanded on read, so every read
//! sees the current name and elements of the referenced entries.

use std::collections::HashMap;

use chrono::Utc;
use lms_core::model::{Element, ElementValue, Entry, EntryId, LocalizedText};
use lms_core::model::schema::DEFAULT_LOCALE;

use crate::repository::{ElementFilter, ElementMatch, EntryQuery, NewEntry, StorageError};

/// An entry together with the metadata queries filter on.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredEntry {
    pub seq: i64,
    pub model: String,
    pub api_name: String,
    pub entry: Entry,
}

impl StoredEntry {
    #[must_use]
    pub fn from_new(new: NewEntry, seq: i64) -> Self {
        let id = new
            .id
            .unwrap_or_else(|| EntryId::new(uuid::Uuid::new_v4().to_string()));
        let entry = Entry {
            id,
            created_at: Some(new.created_at.unwrap_or_else(Utc::now)),
            name: vec![LocalizedText::new(DEFAULT_LOCALE, new.name)],
            elements: Some(strip_references(new.elements)),
        };
        Self {
            seq,
            model: new.model,
            api_name: new.api_name,
            entry,
        }
    }
}

/// Reduce nested reference values to bare id stubs.
#[must_use]
pub fn strip_references(elements: Vec<Element>) -> Vec<Element> {
    elements
        .into_iter()
        .map(|mut element| {
            if let Some(ElementValue::Entries(children)) = &mut element.value {
                for child in children.iter_mut() {
                    *child = Entry::stub(child.id.clone());
                }
            }
            element
        })
        .collect()
}

#[derive(Debug, Clone, Default)]
pub struct EntryGraph {
    entries: HashMap<EntryId, StoredEntry>,
    last_seq: i64,
}

impl EntryGraph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn next_seq(&self) -> i64 {
        self.last_seq + 1
    }

    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the id is already present.
    pub fn insert(&mut self, stored: StoredEntry) -> Result<(), StorageError> {
        if self.entries.contains_key(&stored.entry.id) {
            return Err(StorageError::Conflict);
        }
        self.last_seq = self.last_seq.max(stored.seq);
        self.entries.insert(stored.entry.id.clone(), stored);
        Ok(())
    }

    /// # Errors
    ///
    /// Returns `StorageError::NotFound` if the entry does not exist.
    pub fn update_elements(
        &mut self,
        id: &EntryId,
        elements: Vec<Element>,
    ) -> Result<(), StorageError> {
        let stored = self.entries.get_mut(id).ok_or(StorageError::NotFound)?;
        stored.entry.merge_elements(strip_references(elements));
        Ok(())
    }

    pub fn remove(&mut self, ids: &[EntryId]) {
        for id in ids {
            self.entries.remove(id);
        }
    }

    #[must_use]
    pub fn get(&self, id: &EntryId) -> Option<&StoredEntry> {
        self.entries.get(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries matching `query`, in insertion order, expanded to `query.depth`.
    #[must_use]
    pub fn select(&self, query: &EntryQuery) -> Vec<Entry> {
        let mut matched: Vec<&StoredEntry> = self
            .entries
            .values()
            .filter(|stored| {
                query
                    .model
                    .as_deref()
                    .is_none_or(|model| stored.model == model)
            })
            .filter(|stored| query.ids.accepts(&stored.entry.id))
            .filter(|stored| {
                query
                    .elements
                    .iter()
                    .all(|filter| self.matches(&stored.entry, filter))
            })
            .collect();
        matched.sort_by_key(|stored| stored.seq);
        matched
            .into_iter()
            .map(|stored| self.expand(&stored.entry, query.depth))
            .collect()
    }

    fn matches(&self, entry: &Entry, filter: &ElementFilter) -> bool {
        let Some(value) = entry
            .element(&filter.api_name)
            .and_then(|e| e.value.as_ref())
        else {
            return false;
        };

        match (&filter.matcher, value) {
            (ElementMatch::Equals(expected), ElementValue::Text(texts)) => {
                texts.first().is_some_and(|t| &t.value == expected)
            }
            (ElementMatch::In(candidates), ElementValue::Text(texts)) => texts
                .first()
                .is_some_and(|t| candidates.contains(&t.value)),
            (ElementMatch::User(user), ElementValue::Users(users)) => {
                users.iter().any(|u| &u.id == user)
            }
            (ElementMatch::ContainsEntry(id), ElementValue::Entries(children)) => {
                children.iter().any(|child| &child.id == id)
            }
            (ElementMatch::ContainsEntryWhere(nested), ElementValue::Entries(children)) => {
                children.iter().any(|child| {
                    self.get(&child.id).is_some_and(|stored| {
                        nested.iter().all(|f| self.matches(&stored.entry, f))
                    })
                })
            }
            _ => false,
        }
    }

    /// Copy of `entry` whose references resolve against the graph.
    ///
    /// References to entries that no longer exist are dropped.
    #[must_use]
    pub fn expand(&self, entry: &Entry, depth: u8) -> Entry {
        let mut expanded = entry.clone();
        if let Some(elements) = expanded.elements.as_mut() {
            for element in elements.iter_mut() {
                if let Some(ElementValue::Entries(children)) = &mut element.value {
                    let resolved = children
                        .iter()
                        .filter_map(|child| self.get(&child.id))
                        .map(|stored| {
                            if depth == 0 {
                                stored.entry.to_stub()
                            } else {
                                self.expand(&stored.entry, depth - 1)
                            }
                        })
                        .collect();
                    *children = resolved;
                }
            }
        }
        expanded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use lms_core::model::schema::{elements, models};
    use lms_core::model::UserId;

    fn insert(graph: &mut EntryGraph, model: &str, id: &str, elements: Vec<Element>) {
        let mut new = NewEntry::new(model, id, id).with_id(EntryId::new(id));
        new.elements = elements;
        let stored = StoredEntry::from_new(new, graph.next_seq());
        graph.insert(stored).unwrap();
    }

    fn graph() -> EntryGraph {
        let mut g = EntryGraph::new();
        insert(&mut g, models::LESSONS, "L1", vec![]);
        insert(&mut g, models::LESSONS, "L2", vec![]);
        insert(
            &mut g,
            models::SECTIONS,
            "S1",
            vec![Element::references(
                elements::LESSONS,
                [&EntryId::new("L1"), &EntryId::new("L2")],
            )],
        );
        insert(
            &mut g,
            models::COURSES,
            "C1",
            vec![Element::references(elements::SECTIONS, [&EntryId::new("S1")])],
        );
        g
    }

    #[test]
    fn nested_filter_finds_course_of_lesson() {
        let g = graph();
        let query = EntryQuery::model(models::COURSES)
            .element(
                elements::SECTIONS,
                ElementMatch::ContainsEntryWhere(vec![ElementFilter {
                    api_name: elements::LESSONS.to_owned(),
                    matcher: ElementMatch::ContainsEntry(EntryId::new("L2")),
                }]),
            )
            .depth(1);
        let found = g.select(&query);
        assert_eq!(found.len(), 1);
        let sections = found[0].referenced(elements::SECTIONS);
        assert!(!sections[0].is_stub());
        assert!(sections[0].referenced(elements::LESSONS)[0].is_stub());
    }

    #[test]
    fn depth_zero_returns_named_stubs() {
        let g = graph();
        let found = g.select(&EntryQuery::model(models::SECTIONS));
        let lessons = found[0].referenced(elements::LESSONS);
        assert_eq!(lessons.len(), 2);
        assert!(lessons.iter().all(Entry::is_stub));
        assert_eq!(lessons[0].display_name(), Some("L1"));
    }

    #[test]
    fn removed_references_are_dropped() {
        let mut g = graph();
        g.remove(&[EntryId::new("L1")]);
        let found = g.select(&EntryQuery::model(models::SECTIONS));
        let lessons = found[0].referenced(elements::LESSONS);
        assert_eq!(lessons.len(), 1);
        assert_eq!(lessons[0].id, EntryId::new("L2"));
    }

    #[test]
    fn id_filters_and_order() {
        let g = graph();
        let all = g.select(&EntryQuery::model(models::LESSONS));
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].id, EntryId::new("L1"));
        let not_l1 = g.select(&EntryQuery::model(models::LESSONS).excluding(&[EntryId::new("L1")]));
        assert_eq!(not_l1.len(), 1);
        assert_eq!(not_l1[0].id, EntryId::new("L2"));
    }

    #[test]
    fn user_filter_requires_users_element() {
        let mut g = EntryGraph::new();
        insert(
            &mut g,
            models::USER_PROGRESS,
            "R1",
            vec![Element::new(
                elements::USER,
                ElementValue::Users(vec![lms_core::model::UserRef { id: UserId::new("u1") }]),
            )],
        );
        let q = EntryQuery::model(models::USER_PROGRESS)
            .element(elements::USER, ElementMatch::User(UserId::new("u1")));
        assert_eq!(g.select(&q).len(), 1);
        let q = EntryQuery::model(models::USER_PROGRESS)
            .element(elements::USER, ElementMatch::User(UserId::new("u2")));
        assert!(g.select(&q).is_empty());
    }
}
