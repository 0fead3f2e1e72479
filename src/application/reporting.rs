use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{EnrollmentLine, GpaBucket, Student};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GpaDistributionReport {
    pub generated_at: DateTime<Utc>,
    pub total_students: usize,
    /// Non-empty buckets only, in report order
    pub buckets: BTreeMap<GpaBucket, usize>,
}

impl GpaDistributionReport {
    pub fn count(&self, bucket: GpaBucket) -> usize {
        self.buckets.get(&bucket).copied().unwrap_or(0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentStanding {
    pub reg_no: String,
    pub full_name: String,
    pub gpa: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transcript {
    pub student: Student,
    pub lines: Vec<EnrollmentLine>,
    pub graded_credits: u32,
    pub gpa: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptSummary {
    pub reg_no: String,
    pub full_name: String,
    pub enrolled_courses: usize,
    pub gpa: f64,
}

impl std::fmt::Display for TranscriptSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} - {} | GPA: {:.2}", self.reg_no, self.full_name, self.gpa)
    }
}
