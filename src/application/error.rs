use thiserror::Error;

use crate::domain::EnrollmentError;

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Student not found: {0}")]
    StudentNotFound(String),

    #[error("Course not found: {0}")]
    CourseNotFound(String),

    #[error("Enrollment not found: {reg_no} in {course_code}")]
    EnrollmentNotFound { reg_no: String, course_code: String },

    #[error("Student {reg_no} is already enrolled in {course_code}")]
    DuplicateEnrollment { reg_no: String, course_code: String },

    #[error(
        "Enrolling {reg_no} would exceed the credit limit: {current} held + {requested} requested > {ceiling}"
    )]
    CreditLimitExceeded {
        reg_no: String,
        current: u32,
        requested: u32,
        ceiling: u32,
    },

    #[error("Student already exists: {0}")]
    StudentAlreadyExists(String),

    #[error("Course already exists: {0}")]
    CourseAlreadyExists(String),

    #[error("Invalid email address: {0}")]
    InvalidEmail(String),

    #[error("Invalid credit value for {code}: credits must be positive")]
    InvalidCredits { code: String },

    #[error("Database error: {0}")]
    Database(#[from] anyhow::Error),
}

impl AppError {
    /// True for the "key did not resolve" family: unknown student, course or
    /// enrollment pair.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            AppError::StudentNotFound(_)
                | AppError::CourseNotFound(_)
                | AppError::EnrollmentNotFound { .. }
        )
    }

    pub(crate) fn from_enrollment(reg_no: &str, err: EnrollmentError) -> Self {
        match err {
            EnrollmentError::Duplicate { course_code } => AppError::DuplicateEnrollment {
                reg_no: reg_no.to_string(),
                course_code,
            },
            EnrollmentError::CreditLimitExceeded {
                current,
                requested,
                ceiling,
            } => AppError::CreditLimitExceeded {
                reg_no: reg_no.to_string(),
                current,
                requested,
                ceiling,
            },
        }
    }
}
