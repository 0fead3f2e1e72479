use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{CourseId, Grade, StudentId};

pub type EnrollmentId = Uuid;

/// An enrollment binds one student to one course and carries the grade once recorded.
/// Enrollments are only created and removed through the ledger; the grade is the
/// only mutable field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Enrollment {
    pub id: EnrollmentId,
    pub student_id: StudentId,
    pub course_id: CourseId,
    /// Unset until a grade is recorded
    pub grade: Option<Grade>,
    pub enrolled_on: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnrollmentState {
    Ungraded,
    Graded,
}

impl Enrollment {
    pub fn new(student_id: StudentId, course_id: CourseId) -> Self {
        Self {
            id: Uuid::new_v4(),
            student_id,
            course_id,
            grade: None,
            enrolled_on: Utc::now(),
        }
    }

    pub fn state(&self) -> EnrollmentState {
        match self.grade {
            Some(_) => EnrollmentState::Graded,
            None => EnrollmentState::Ungraded,
        }
    }

    /// Record (or replace) the grade. No history of previous grades is kept.
    pub fn record_grade(&mut self, grade: Grade) {
        self.grade = Some(grade);
    }

    pub fn grade_str(&self) -> &'static str {
        self.grade.as_ref().map(Grade::as_str).unwrap_or("N/A")
    }
}

/// An enrollment joined with the course facts needed for transcripts and GPA.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrollmentLine {
    pub enrollment: Enrollment,
    pub course_code: String,
    pub course_title: String,
    pub credits: u32,
}

impl EnrollmentLine {
    pub fn grade(&self) -> Option<Grade> {
        self.enrollment.grade
    }

    pub fn is_graded(&self) -> bool {
        self.enrollment.grade.is_some()
    }
}
