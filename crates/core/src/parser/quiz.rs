use crate::error::ContentError;
use crate::model::schema::elements;
use crate::model::{Entry, Question, Quiz, UserAnswer};

use super::elements::{name, parse_expanded, references, require_expanded, scalars, text, users};

/// Parse a quiz with its questions and every submitted answer.
///
/// # Errors
///
/// Returns `ContentError` if the quiz or one of its questions is not expanded
/// or is malformed.
pub fn parse_quiz(entry: &Entry) -> Result<Quiz, ContentError> {
    require_expanded(entry)?;
    Ok(Quiz {
        id: entry.id.clone(),
        questions: parse_expanded(entry, elements::QUESTIONS, parse_question)?,
    })
}

/// # Errors
///
/// Returns `ContentError` if the question is a stub, has no name (the question
/// text) or carries wrongly typed elements.
pub fn parse_question(entry: &Entry) -> Result<Question, ContentError> {
    require_expanded(entry)?;
    let user_answers = references(entry, elements::QUESTION_ANSWERS)?
        .iter()
        .map(parse_user_answer)
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Question {
        id: entry.id.clone(),
        created_at: entry.created_at,
        text: name(entry)?,
        correct_answers: text(entry, elements::CORRECT_ANSWERS)?.unwrap_or_default(),
        variants_of_answers: text(entry, elements::VARIANTS_OF_ANSWERS)?,
        user_answers,
    })
}

/// Answers are accepted as stubs; only their id is then known.
///
/// # Errors
///
/// Returns `ContentError::UnexpectedKind` if the user element is not a user reference.
pub fn parse_user_answer(entry: &Entry) -> Result<UserAnswer, ContentError> {
    Ok(UserAnswer {
        id: entry.id.clone(),
        user: users(entry, elements::USER)?.into_iter().next(),
        fields: scalars(entry),
    })
}
