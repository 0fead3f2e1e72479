use chrono::Utc;
use tokio::sync::Mutex;
use tracing::debug;

use crate::domain::{
    compute_gpa, gpa_distribution, graded_credits, is_valid_email, rank_by_gpa,
    validate_enrollment, Course, Enrollment, EnrollmentLine, EnrollmentPolicy, Grade, Instructor,
    InstructorId, Student,
};
use crate::storage::Repository;

use super::{AppError, GpaDistributionReport, StudentStanding, Transcript, TranscriptSummary};

/// Application service for the records manager.
/// This is the primary interface for any client (CLI, import/export, tests).
pub struct RecordsService {
    repo: Repository,
    policy: EnrollmentPolicy,
    /// Serialises ledger mutations so that the duplicate check, the credit check
    /// and the insert of one `enroll` call are never interleaved with another.
    ledger_lock: Mutex<()>,
}

/// Result of assigning an instructor to a course
#[derive(Debug)]
pub struct InstructorAssignment {
    pub course: Course,
    pub instructor: Instructor,
}

impl RecordsService {
    /// Create a new service with the given repository and the default policy.
    pub fn new(repo: Repository) -> Self {
        Self {
            repo,
            policy: EnrollmentPolicy::default(),
            ledger_lock: Mutex::new(()),
        }
    }

    pub fn with_policy(mut self, policy: EnrollmentPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> EnrollmentPolicy {
        self.policy
    }

    /// Initialize a database at the given path, creating the file if needed.
    pub async fn init(database_path: &str) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}?mode=rwc", database_path);
        let repo = Repository::init(&db_url).await?;
        Ok(Self::new(repo))
    }

    /// Connect to an existing database.
    pub async fn connect(database_path: &str) -> Result<Self, AppError> {
        let db_url = format!("sqlite:{}", database_path);
        let repo = Repository::connect(&db_url).await?;
        Ok(Self::new(repo))
    }

    /// Start a session over a fresh in-memory database.
    pub async fn in_memory() -> Result<Self, AppError> {
        let repo = Repository::connect_in_memory().await?;
        repo.migrate().await?;
        Ok(Self::new(repo))
    }

    // ========================
    // Student directory
    // ========================

    /// Register a new student.
    pub async fn add_student(
        &self,
        reg_no: &str,
        full_name: &str,
        email: &str,
    ) -> Result<Student, AppError> {
        let reg_no = reg_no.trim();
        let email = email.trim();
        if !is_valid_email(email) {
            return Err(AppError::InvalidEmail(email.to_string()));
        }
        if self.repo.get_student_by_reg_no(reg_no).await?.is_some() {
            return Err(AppError::StudentAlreadyExists(reg_no.to_string()));
        }

        let student = Student::new(reg_no, full_name.trim(), email);
        self.repo.save_student(&student).await?;
        debug!(reg_no = %student.reg_no, "Added student");
        Ok(student)
    }

    /// Look up a student by registration number (case-insensitive).
    pub async fn find_student(&self, reg_no: &str) -> Result<Option<Student>, AppError> {
        Ok(self.repo.get_student_by_reg_no(reg_no).await?)
    }

    /// Get a student by registration number.
    pub async fn get_student(&self, reg_no: &str) -> Result<Student, AppError> {
        self.find_student(reg_no)
            .await?
            .ok_or_else(|| AppError::StudentNotFound(reg_no.to_string()))
    }

    /// List all students, sorted by registration number.
    pub async fn list_students(&self) -> Result<Vec<Student>, AppError> {
        Ok(self.repo.list_students().await?)
    }

    pub async fn update_email(&self, reg_no: &str, email: &str) -> Result<Student, AppError> {
        let mut student = self.get_student(reg_no).await?;
        let email = email.trim();
        if !is_valid_email(email) {
            return Err(AppError::InvalidEmail(email.to_string()));
        }

        self.repo.update_student_email(student.id, email).await?;
        student.email = email.to_string();
        debug!(reg_no = %student.reg_no, "Updated student email");
        Ok(student)
    }

    /// Mark a student inactive. Their enrollments are left untouched.
    pub async fn deactivate_student(&self, reg_no: &str) -> Result<Student, AppError> {
        let mut student = self.get_student(reg_no).await?;
        self.repo.set_student_active(student.id, false).await?;
        student.active = false;
        Ok(student)
    }

    // ========================
    // Course catalog
    // ========================

    /// Add a course to the catalog.
    pub async fn add_course(&self, mut course: Course) -> Result<Course, AppError> {
        course.code = course.code.trim().to_string();
        if course.credits == 0 {
            return Err(AppError::InvalidCredits { code: course.code });
        }
        if self.repo.get_course_by_code(&course.code).await?.is_some() {
            return Err(AppError::CourseAlreadyExists(course.code));
        }

        self.repo.save_course(&course).await?;
        debug!(code = %course.code, credits = course.credits, "Added course");
        Ok(course)
    }

    /// Look up a course by code (case-insensitive).
    pub async fn find_course(&self, code: &str) -> Result<Option<Course>, AppError> {
        Ok(self.repo.get_course_by_code(code).await?)
    }

    /// Get a course by code.
    pub async fn get_course(&self, code: &str) -> Result<Course, AppError> {
        self.find_course(code)
            .await?
            .ok_or_else(|| AppError::CourseNotFound(code.to_string()))
    }

    pub async fn list_courses(&self) -> Result<Vec<Course>, AppError> {
        Ok(self.repo.list_courses().await?)
    }

    pub async fn search_by_department(&self, department: &str) -> Result<Vec<Course>, AppError> {
        Ok(self.repo.list_courses_by_department(department).await?)
    }

    pub async fn search_by_instructor(&self, full_name: &str) -> Result<Vec<Course>, AppError> {
        Ok(self.repo.list_courses_by_instructor(full_name).await?)
    }

    /// Create an instructor record and make them the course's instructor,
    /// replacing any previous assignment.
    pub async fn assign_instructor(
        &self,
        code: &str,
        full_name: &str,
        email: &str,
        department: &str,
    ) -> Result<InstructorAssignment, AppError> {
        let mut course = self.get_course(code).await?;
        let email = email.trim();
        if !is_valid_email(email) {
            return Err(AppError::InvalidEmail(email.to_string()));
        }

        let instructor = Instructor::new(full_name.trim(), email, department.trim());
        self.repo.save_instructor(&instructor).await?;
        self.repo
            .set_course_instructor(course.id, instructor.id)
            .await?;
        course.instructor_id = Some(instructor.id);

        Ok(InstructorAssignment { course, instructor })
    }

    pub async fn get_instructor(&self, id: InstructorId) -> Result<Option<Instructor>, AppError> {
        Ok(self.repo.get_instructor(id).await?)
    }

    pub async fn list_instructors(&self) -> Result<Vec<Instructor>, AppError> {
        Ok(self.repo.list_instructors().await?)
    }

    // ========================
    // Enrollment ledger
    // ========================

    /// Enroll a student in a course.
    ///
    /// Fails with `StudentNotFound`/`CourseNotFound` for unknown keys,
    /// `DuplicateEnrollment` if the pair already exists and `CreditLimitExceeded`
    /// if the course would take the student past the credit ceiling. A failed call
    /// leaves the ledger unchanged.
    pub async fn enroll(&self, reg_no: &str, course_code: &str) -> Result<Enrollment, AppError> {
        let student = self.get_student(reg_no).await?;
        let course = self.get_course(course_code).await?;

        let _guard = self.ledger_lock.lock().await;

        let current = self
            .repo
            .list_enrollment_lines_for_student(student.id)
            .await?;
        validate_enrollment(&course, &current, &self.policy)
            .map_err(|e| AppError::from_enrollment(&student.reg_no, e))?;

        let enrollment = Enrollment::new(student.id, course.id);
        self.repo.save_enrollment(&enrollment).await?;

        debug!(
            reg_no = %student.reg_no,
            course = %course.code,
            credits = course.credits,
            "Enrolled student"
        );
        Ok(enrollment)
    }

    /// Remove a student's enrollment in a course and return the removed record.
    /// A pair with no enrollment fails with `EnrollmentNotFound` and changes nothing.
    pub async fn unenroll(&self, reg_no: &str, course_code: &str) -> Result<Enrollment, AppError> {
        let student = self.get_student(reg_no).await?;
        let course = self.get_course(course_code).await?;

        let _guard = self.ledger_lock.lock().await;

        let enrollment = self
            .repo
            .get_enrollment(student.id, course.id)
            .await?
            .ok_or_else(|| AppError::EnrollmentNotFound {
                reg_no: student.reg_no.clone(),
                course_code: course.code.clone(),
            })?;

        self.repo.delete_enrollment(enrollment.id).await?;

        debug!(reg_no = %student.reg_no, course = %course.code, "Unenrolled student");
        Ok(enrollment)
    }

    /// Record a grade, replacing any earlier grade for the same enrollment.
    pub async fn record_grade(
        &self,
        reg_no: &str,
        course_code: &str,
        grade: Grade,
    ) -> Result<Enrollment, AppError> {
        let student = self.get_student(reg_no).await?;
        let course = self.get_course(course_code).await?;

        let _guard = self.ledger_lock.lock().await;

        let mut enrollment = self
            .repo
            .get_enrollment(student.id, course.id)
            .await?
            .ok_or_else(|| AppError::EnrollmentNotFound {
                reg_no: student.reg_no.clone(),
                course_code: course.code.clone(),
            })?;

        self.repo
            .update_enrollment_grade(enrollment.id, grade)
            .await?;
        enrollment.record_grade(grade);

        debug!(reg_no = %student.reg_no, course = %course.code, %grade, "Recorded grade");
        Ok(enrollment)
    }

    /// A student's enrollments joined with course details, in enrollment order.
    pub async fn enrollments_for(&self, reg_no: &str) -> Result<Vec<EnrollmentLine>, AppError> {
        let student = self.get_student(reg_no).await?;
        Ok(self
            .repo
            .list_enrollment_lines_for_student(student.id)
            .await?)
    }

    /// Every enrollment in the ledger.
    pub async fn list_enrollments(&self) -> Result<Vec<Enrollment>, AppError> {
        Ok(self.repo.list_enrollments().await?)
    }

    pub async fn enrollment_count(&self) -> Result<usize, AppError> {
        let count = self.repo.count_enrollments().await?;
        Ok(usize::try_from(count).unwrap_or_default())
    }

    // ========================
    // Academic reporting
    // ========================

    pub async fn student_gpa(&self, reg_no: &str) -> Result<f64, AppError> {
        let lines = self.enrollments_for(reg_no).await?;
        Ok(compute_gpa(&lines))
    }

    pub async fn transcript(&self, reg_no: &str) -> Result<Transcript, AppError> {
        let student = self.get_student(reg_no).await?;
        let lines = self
            .repo
            .list_enrollment_lines_for_student(student.id)
            .await?;

        Ok(Transcript {
            graded_credits: graded_credits(&lines),
            gpa: compute_gpa(&lines),
            student,
            lines,
        })
    }

    /// Count students per GPA bucket over the students holding at least one
    /// enrollment. Students whose enrollments are ungraded fall in `No Grades`.
    pub async fn gpa_distribution(&self) -> Result<GpaDistributionReport, AppError> {
        let records = self.enrolled_records().await?;
        let buckets = gpa_distribution(records.iter().map(|(_, lines)| lines.as_slice()));

        Ok(GpaDistributionReport {
            generated_at: Utc::now(),
            total_students: records.len(),
            buckets,
        })
    }

    /// The `n` enrolled students with the highest GPA. Students whose enrollments
    /// are all ungraded rank at 0.0. The order among equal GPAs is unspecified.
    pub async fn top_students(&self, n: usize) -> Result<Vec<StudentStanding>, AppError> {
        let records = self.enrolled_records().await?;
        let scored: Vec<(Student, f64)> = records
            .into_iter()
            .map(|(student, lines)| (student, compute_gpa(&lines)))
            .collect();

        Ok(rank_by_gpa(scored, n)
            .into_iter()
            .map(|(student, gpa)| StudentStanding {
                reg_no: student.reg_no,
                full_name: student.full_name,
                gpa,
            })
            .collect())
    }

    /// One GPA summary per student, in registration-number order.
    pub async fn transcript_summaries(&self) -> Result<Vec<TranscriptSummary>, AppError> {
        let records = self.student_records().await?;

        Ok(records
            .into_iter()
            .map(|(student, lines)| TranscriptSummary {
                gpa: compute_gpa(&lines),
                enrolled_courses: lines.len(),
                reg_no: student.reg_no,
                full_name: student.full_name,
            })
            .collect())
    }

    /// Every student paired with their enrollment lines, in directory order.
    async fn student_records(&self) -> Result<Vec<(Student, Vec<EnrollmentLine>)>, AppError> {
        let students = self.repo.list_students().await?;
        let mut lines = self.repo.list_enrollment_lines_by_student().await?;

        Ok(students
            .into_iter()
            .map(|student| {
                let held = lines.remove(&student.id).unwrap_or_default();
                (student, held)
            })
            .collect())
    }

    /// Students holding at least one enrollment, with their lines, in directory order.
    async fn enrolled_records(&self) -> Result<Vec<(Student, Vec<EnrollmentLine>)>, AppError> {
        let mut records = self.student_records().await?;
        records.retain(|(_, lines)| !lines.is_empty());
        Ok(records)
    }
}
