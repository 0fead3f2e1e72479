use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{Course, EnrollmentLine};

/// Default ceiling on the total credits a student may carry at once.
pub const MAX_CREDITS_PER_TERM: u32 = 20;

/// Registration rules applied by the ledger when enrolling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnrollmentPolicy {
    pub max_credits_per_term: u32,
}

impl Default for EnrollmentPolicy {
    fn default() -> Self {
        Self {
            max_credits_per_term: MAX_CREDITS_PER_TERM,
        }
    }
}

/// Total credits of every enrollment currently held, graded or not.
/// Saturates at `u32::MAX`.
pub fn current_credits(lines: &[EnrollmentLine]) -> u32 {
    lines
        .iter()
        .fold(0u32, |total, line| total.saturating_add(line.credits))
}

/// Check whether `course` may be added to a student's current enrollments.
///
/// Both checks are a linear scan over the student's lines. Course loads are
/// small enough that no index is kept for this.
pub fn validate_enrollment(
    course: &Course,
    current: &[EnrollmentLine],
    policy: &EnrollmentPolicy,
) -> Result<(), EnrollmentError> {
    if current
        .iter()
        .any(|line| line.enrollment.course_id == course.id)
    {
        return Err(EnrollmentError::Duplicate {
            course_code: course.code.clone(),
        });
    }

    let held = current_credits(current);
    let exceeds = held
        .checked_add(course.credits)
        .is_none_or(|total| total > policy.max_credits_per_term);
    if exceeds {
        return Err(EnrollmentError::CreditLimitExceeded {
            current: held,
            requested: course.credits,
            ceiling: policy.max_credits_per_term,
        });
    }

    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnrollmentError {
    Duplicate {
        course_code: String,
    },
    CreditLimitExceeded {
        current: u32,
        requested: u32,
        ceiling: u32,
    },
}

impl std::fmt::Display for EnrollmentError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EnrollmentError::Duplicate { course_code } => {
                write!(f, "Already enrolled in {}", course_code)
            }
            EnrollmentError::CreditLimitExceeded {
                current,
                requested,
                ceiling,
            } => write!(
                f,
                "Adding {} credits to {} would exceed the limit of {}",
                requested, current, ceiling
            ),
        }
    }
}

impl std::error::Error for EnrollmentError {}

/// Credits of graded enrollments only.
pub fn graded_credits(lines: &[EnrollmentLine]) -> u32 {
    lines
        .iter()
        .filter(|line| line.is_graded())
        .fold(0u32, |total, line| total.saturating_add(line.credits))
}

/// Credit-weighted grade point average over graded enrollments.
/// Ungraded enrollments contribute neither credits nor points. Returns 0.0
/// when nothing has been graded.
pub fn compute_gpa(lines: &[EnrollmentLine]) -> f64 {
    let (credits, points) = lines.iter().fold((0u64, 0u64), |(credits, points), line| {
        match line.grade() {
            Some(grade) => (
                credits + u64::from(line.credits),
                points + u64::from(grade.points()) * u64::from(line.credits),
            ),
            None => (credits, points),
        }
    });

    if credits == 0 {
        0.0
    } else {
        points as f64 / credits as f64
    }
}

/// GPA range used in distribution reports. Declaration order is report order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum GpaBucket {
    #[serde(rename = "9-10")]
    NineToTen,
    #[serde(rename = "8-9")]
    EightToNine,
    #[serde(rename = "7-8")]
    SevenToEight,
    #[serde(rename = "6-7")]
    SixToSeven,
    #[serde(rename = "0-6")]
    BelowSix,
    #[serde(rename = "No Grades")]
    NoGrades,
}

impl GpaBucket {
    pub const ALL: [GpaBucket; 6] = [
        GpaBucket::NineToTen,
        GpaBucket::EightToNine,
        GpaBucket::SevenToEight,
        GpaBucket::SixToSeven,
        GpaBucket::BelowSix,
        GpaBucket::NoGrades,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            GpaBucket::NineToTen => "9-10",
            GpaBucket::EightToNine => "8-9",
            GpaBucket::SevenToEight => "7-8",
            GpaBucket::SixToSeven => "6-7",
            GpaBucket::BelowSix => "0-6",
            GpaBucket::NoGrades => "No Grades",
        }
    }

    /// Classify a GPA. Lower bounds are inclusive and `0-6` needs a strictly
    /// positive GPA, so a record with no graded entries or only F grades is
    /// `No Grades`.
    pub fn classify(gpa: f64, has_grades: bool) -> Self {
        if !has_grades {
            GpaBucket::NoGrades
        } else if gpa >= 9.0 {
            GpaBucket::NineToTen
        } else if gpa >= 8.0 {
            GpaBucket::EightToNine
        } else if gpa >= 7.0 {
            GpaBucket::SevenToEight
        } else if gpa >= 6.0 {
            GpaBucket::SixToSeven
        } else if gpa > 0.0 {
            GpaBucket::BelowSix
        } else {
            GpaBucket::NoGrades
        }
    }

    pub fn for_lines(lines: &[EnrollmentLine]) -> Self {
        let has_grades = lines.iter().any(EnrollmentLine::is_graded);
        Self::classify(compute_gpa(lines), has_grades)
    }
}

impl std::fmt::Display for GpaBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Count students per GPA bucket. Each item is one student's enrollment lines.
/// Buckets with no students are absent from the map.
pub fn gpa_distribution<'a, I>(students: I) -> BTreeMap<GpaBucket, usize>
where
    I: IntoIterator<Item = &'a [EnrollmentLine]>,
{
    let mut buckets = BTreeMap::new();
    for lines in students {
        *buckets.entry(GpaBucket::for_lines(lines)).or_insert(0) += 1;
    }
    buckets
}

/// Rank entries by descending GPA and keep the first `n`.
/// The sort is stable; entries with equal GPA keep their input order.
pub fn rank_by_gpa<T>(mut entries: Vec<(T, f64)>, n: usize) -> Vec<(T, f64)> {
    entries.sort_by(|a, b| b.1.total_cmp(&a.1));
    entries.truncate(n);
    entries
}
