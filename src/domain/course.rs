use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type CourseId = Uuid;
pub type InstructorId = Uuid;

pub const DEFAULT_CREDITS: u32 = 3;
pub const DEFAULT_DEPARTMENT: &str = "General";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Semester {
    Spring,
    Summer,
    Fall,
    Winter,
}

impl Semester {
    pub fn as_str(&self) -> &'static str {
        match self {
            Semester::Spring => "SPRING",
            Semester::Summer => "SUMMER",
            Semester::Fall => "FALL",
            Semester::Winter => "WINTER",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "SPRING" => Some(Semester::Spring),
            "SUMMER" => Some(Semester::Summer),
            "FALL" => Some(Semester::Fall),
            "WINTER" => Some(Semester::Winter),
            _ => None,
        }
    }
}

impl std::fmt::Display for Semester {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Semester {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Semester::from_str(s).ok_or_else(|| format!("unknown semester: {}", s))
    }
}

/// Teaching staff. Courses only hold an instructor's id; the instructor's
/// lifecycle is independent of any course.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Instructor {
    pub id: InstructorId,
    pub full_name: String,
    pub email: String,
    pub department: String,
}

impl Instructor {
    pub fn new(
        full_name: impl Into<String>,
        email: impl Into<String>,
        department: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            full_name: full_name.into(),
            email: email.into(),
            department: department.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Course {
    pub id: CourseId,
    /// Course code, unique across the catalog (compared case-insensitively)
    pub code: String,
    pub title: String,
    /// Credit value counted against the per-term ceiling and used as GPA weight
    pub credits: u32,
    pub department: String,
    pub semester: Semester,
    pub instructor_id: Option<InstructorId>,
    pub active: bool,
}

impl Course {
    pub fn new(code: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            code: code.into(),
            title: title.into(),
            credits: DEFAULT_CREDITS,
            department: DEFAULT_DEPARTMENT.to_string(),
            semester: Semester::Fall,
            instructor_id: None,
            active: true,
        }
    }

    pub fn with_credits(mut self, credits: u32) -> Self {
        self.credits = credits;
        self
    }

    pub fn with_department(mut self, department: impl Into<String>) -> Self {
        self.department = department.into();
        self
    }

    pub fn with_semester(mut self, semester: Semester) -> Self {
        self.semester = semester;
        self
    }

    pub fn with_instructor(mut self, instructor_id: InstructorId) -> Self {
        self.instructor_id = Some(instructor_id);
        self
    }
}

impl std::fmt::Display for Course {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} - {} ({} cr) [{}, {}]",
            self.code, self.title, self.credits, self.department, self.semester
        )
    }
}
