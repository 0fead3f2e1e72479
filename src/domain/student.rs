use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type StudentId = Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Student {
    pub id: StudentId,
    /// Registration number, unique across the directory (compared case-insensitively)
    pub reg_no: String,
    pub full_name: String,
    pub email: String,
    pub active: bool,
    pub registered_on: DateTime<Utc>,
}

impl Student {
    pub fn new(
        reg_no: impl Into<String>,
        full_name: impl Into<String>,
        email: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            reg_no: reg_no.into(),
            full_name: full_name.into(),
            email: email.into(),
            active: true,
            registered_on: Utc::now(),
        }
    }

    pub fn status_str(&self) -> &'static str {
        if self.active { "active" } else { "inactive" }
    }
}

impl std::fmt::Display for Student {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} - {} ({})", self.reg_no, self.full_name, self.status_str())
    }
}

/// Minimal shape check for email addresses: both an `@` and a `.` must be present.
pub fn is_valid_email(email: &str) -> bool {
    email.contains('@') && email.contains('.')
}
