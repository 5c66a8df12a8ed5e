use crate::model::ids::{ProjectId, UserId};

/// The project and user an operation acts for.
///
/// Passed explicitly to every storage and service call so that a change of the
/// active project cannot leak into an operation that is already in flight.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Context {
    project: ProjectId,
    user: UserId,
}

impl Context {
    #[must_use]
    pub fn new(project: ProjectId, user: UserId) -> Self {
        Self { project, user }
    }

    #[must_use]
    pub fn project(&self) -> &ProjectId {
        &self.project
    }

    #[must_use]
    pub fn user(&self) -> &UserId {
        &self.user
    }

    /// Same project, different user.
    #[must_use]
    pub fn for_user(&self, user: UserId) -> Self {
        Self {
            project: self.project.clone(),
            user,
        }
    }
}
