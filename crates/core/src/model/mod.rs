mod content;
mod context;
mod entry;
mod ids;
mod learning_path;
mod progress;
mod quiz;
pub mod schema;

pub use content::{
    Category, Course, CourseDuration, CourseOrder, EntryStub, HasId, Lesson, Page, Reference,
    Section,
};
pub use context::Context;
pub use entry::{Element, ElementKind, ElementValue, Entry, LocalizedText, UserRef};
pub use ids::{EntryId, ParseIdError, ProjectId, UserId};
pub use learning_path::LearningPath;
pub use progress::{NewProgressRecord, Percent, PercentError, ProgressRecord, roll_up};
pub use quiz::{Question, Quiz, Scalar, UserAnswer};
