use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::ids::{EntryId, UserId};

/// Scalar field value lifted out of an element.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Scalar {
    Text(String),
    Number(f64),
    Boolean(bool),
    Users(Vec<UserId>),
}

/// A submitted answer. Its payload elements are kept by api name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserAnswer {
    pub id: EntryId,
    pub user: Option<UserId>,
    pub fields: BTreeMap<String, Scalar>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: EntryId,
    pub created_at: Option<DateTime<Utc>>,
    pub text: String,
    pub correct_answers: String,
    pub variants_of_answers: Option<String>,
    pub user_answers: Vec<UserAnswer>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quiz {
    pub id: EntryId,
    pub questions: Vec<Question>,
}

impl Quiz {
    #[must_use]
    pub fn question_ids(&self) -> Vec<EntryId> {
        self.questions.iter().map(|q| q.id.clone()).collect()
    }

    #[must_use]
    pub fn answer_ids(&self) -> Vec<EntryId> {
        self.questions
            .iter()
            .flat_map(|q| q.user_answers.iter().map(|a| a.id.clone()))
            .collect()
    }
}
