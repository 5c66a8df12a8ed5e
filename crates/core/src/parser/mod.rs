//! Conversion of generic entry graphs into typed content.
//!
//! Reference elements arrive in two shapes: stubs carrying only identity, or
//! fully expanded entries with their own elements. Absent and null reference
//! elements parse as empty lists.

mod course;
mod elements;
mod learning_path;
mod lesson;
mod progress;
mod quiz;

pub use course::{parse_course, parse_section};
pub use learning_path::parse_learning_path;
pub use lesson::{parse_category, parse_lesson, parse_page};
pub use progress::{parse_progress_record, progress_elements};
pub use quiz::{parse_question, parse_quiz, parse_user_answer};
