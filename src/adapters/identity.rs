use crate::domain::model::StudentId;
use crate::domain::ports::IdentityProvider;
use crate::utils::error::Result;
use crate::utils::validation::validate_required_field;

/// Identity fixed at startup, e.g. from the CLI or config file.
#[derive(Debug, Clone, Copy, Default)]
pub struct StaticIdentity {
    student_id: Option<StudentId>,
}

impl StaticIdentity {
    pub fn new(student_id: Option<StudentId>) -> Self {
        Self { student_id }
    }
}

impl IdentityProvider for StaticIdentity {
    fn current_student(&self) -> Option<StudentId> {
        self.student_id
    }
}

/// The acting student, or a configuration error naming where to set it.
pub fn require_student(identity: &dyn IdentityProvider) -> Result<StudentId> {
    validate_required_field("student.id", &identity.current_student()).copied()
}
