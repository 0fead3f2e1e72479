use std::collections::HashMap;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::domain::{
    Course, CourseId, Enrollment, EnrollmentId, EnrollmentLine, Grade, Instructor, InstructorId,
    Semester, Student, StudentId,
};

use super::MIGRATION_001_INITIAL;

const STUDENT_COLUMNS: &str = "id, reg_no, full_name, email, active, registered_on";
const COURSE_COLUMNS: &str =
    "id, code, title, credits, department, semester, instructor_id, active";

const LINE_QUERY: &str = r#"
    SELECT e.id, e.student_id, e.course_id, e.grade, e.enrolled_on,
           c.code AS course_code, c.title AS course_title, c.credits AS credits
    FROM enrollments e
    JOIN courses c ON c.id = e.course_id
"#;

/// Repository for persisting and querying students, courses and enrollments.
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    /// Create a new repository with the given SQLite connection pool.
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Connect to a SQLite database at the given URL.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = SqlitePool::connect(database_url)
            .await
            .context("Failed to connect to database")?;
        Ok(Self::new(pool))
    }

    /// Open a private in-memory database.
    ///
    /// Every SQLite connection to `:memory:` gets its own database, so the pool is
    /// pinned to a single connection that is never recycled.
    pub async fn connect_in_memory() -> Result<Self> {
        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(1)
            .idle_timeout(None::<Duration>)
            .max_lifetime(None::<Duration>)
            .connect("sqlite::memory:")
            .await
            .context("Failed to open in-memory database")?;
        Ok(Self::new(pool))
    }

    /// Run database migrations.
    pub async fn migrate(&self) -> Result<()> {
        sqlx::query(MIGRATION_001_INITIAL)
            .execute(&self.pool)
            .await
            .context("Failed to run migration 001")?;
        Ok(())
    }

    /// Initialize a new database (connect + migrate).
    pub async fn init(database_url: &str) -> Result<Self> {
        let repo = Self::connect(database_url).await?;
        repo.migrate().await?;
        Ok(repo)
    }

    // ========================
    // Student operations
    // ========================

    pub async fn save_student(&self, student: &Student) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO students (id, reg_no, full_name, email, active, registered_on)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(student.id.to_string())
        .bind(&student.reg_no)
        .bind(&student.full_name)
        .bind(&student.email)
        .bind(student.active)
        .bind(student.registered_on.to_rfc3339())
        .execute(&self.pool)
        .await
        .context("Failed to save student")?;
        Ok(())
    }

    pub async fn get_student(&self, id: StudentId) -> Result<Option<Student>> {
        let row = sqlx::query(&format!("SELECT {} FROM students WHERE id = ?", STUDENT_COLUMNS))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch student")?;

        row.as_ref().map(Self::row_to_student).transpose()
    }

    /// Registration numbers compare case-insensitively (column collation).
    pub async fn get_student_by_reg_no(&self, reg_no: &str) -> Result<Option<Student>> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM students WHERE reg_no = ?",
            STUDENT_COLUMNS
        ))
        .bind(reg_no.trim())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch student by registration number")?;

        row.as_ref().map(Self::row_to_student).transpose()
    }

    /// List all students ordered by registration number.
    pub async fn list_students(&self) -> Result<Vec<Student>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM students ORDER BY reg_no, rowid",
            STUDENT_COLUMNS
        ))
        .fetch_all(&self.pool)
        .await
        .context("Failed to list students")?;

        rows.iter().map(Self::row_to_student).collect()
    }

    pub async fn update_student_email(&self, id: StudentId, email: &str) -> Result<()> {
        sqlx::query("UPDATE students SET email = ? WHERE id = ?")
            .bind(email)
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .context("Failed to update student email")?;
        Ok(())
    }

    pub async fn set_student_active(&self, id: StudentId, active: bool) -> Result<()> {
        sqlx::query("UPDATE students SET active = ? WHERE id = ?")
            .bind(active)
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .context("Failed to update student status")?;
        Ok(())
    }

    fn row_to_student(row: &SqliteRow) -> Result<Student> {
        let id_str: String = row.get("id");
        let registered_on_str: String = row.get("registered_on");

        Ok(Student {
            id: Uuid::parse_str(&id_str).context("Invalid student ID")?,
            reg_no: row.get("reg_no"),
            full_name: row.get("full_name"),
            email: row.get("email"),
            active: row.get::<i32, _>("active") != 0,
            registered_on: parse_timestamp(&registered_on_str)
                .context("Invalid registered_on timestamp")?,
        })
    }

    // ========================
    // Instructor operations
    // ========================

    pub async fn save_instructor(&self, instructor: &Instructor) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO instructors (id, full_name, email, department)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(instructor.id.to_string())
        .bind(&instructor.full_name)
        .bind(&instructor.email)
        .bind(&instructor.department)
        .execute(&self.pool)
        .await
        .context("Failed to save instructor")?;
        Ok(())
    }

    pub async fn get_instructor(&self, id: InstructorId) -> Result<Option<Instructor>> {
        let row = sqlx::query(
            "SELECT id, full_name, email, department FROM instructors WHERE id = ?",
        )
        .bind(id.to_string())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch instructor")?;

        row.as_ref().map(Self::row_to_instructor).transpose()
    }

    pub async fn list_instructors(&self) -> Result<Vec<Instructor>> {
        let rows = sqlx::query(
            "SELECT id, full_name, email, department FROM instructors ORDER BY full_name",
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list instructors")?;

        rows.iter().map(Self::row_to_instructor).collect()
    }

    fn row_to_instructor(row: &SqliteRow) -> Result<Instructor> {
        let id_str: String = row.get("id");

        Ok(Instructor {
            id: Uuid::parse_str(&id_str).context("Invalid instructor ID")?,
            full_name: row.get("full_name"),
            email: row.get("email"),
            department: row.get("department"),
        })
    }

    // ========================
    // Course operations
    // ========================

    pub async fn save_course(&self, course: &Course) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO courses (id, code, title, credits, department, semester, instructor_id, active)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(course.id.to_string())
        .bind(&course.code)
        .bind(&course.title)
        .bind(i64::from(course.credits))
        .bind(&course.department)
        .bind(course.semester.as_str())
        .bind(course.instructor_id.map(|id| id.to_string()))
        .bind(course.active)
        .execute(&self.pool)
        .await
        .context("Failed to save course")?;
        Ok(())
    }

    pub async fn get_course(&self, id: CourseId) -> Result<Option<Course>> {
        let row = sqlx::query(&format!("SELECT {} FROM courses WHERE id = ?", COURSE_COLUMNS))
            .bind(id.to_string())
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch course")?;

        row.as_ref().map(Self::row_to_course).transpose()
    }

    /// Course codes compare case-insensitively (column collation).
    pub async fn get_course_by_code(&self, code: &str) -> Result<Option<Course>> {
        let row = sqlx::query(&format!("SELECT {} FROM courses WHERE code = ?", COURSE_COLUMNS))
            .bind(code.trim())
            .fetch_optional(&self.pool)
            .await
            .context("Failed to fetch course by code")?;

        row.as_ref().map(Self::row_to_course).transpose()
    }

    pub async fn list_courses(&self) -> Result<Vec<Course>> {
        let rows = sqlx::query(&format!("SELECT {} FROM courses ORDER BY code", COURSE_COLUMNS))
            .fetch_all(&self.pool)
            .await
            .context("Failed to list courses")?;

        rows.iter().map(Self::row_to_course).collect()
    }

    pub async fn list_courses_by_department(&self, department: &str) -> Result<Vec<Course>> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM courses WHERE department = ? COLLATE NOCASE ORDER BY code",
            COURSE_COLUMNS
        ))
        .bind(department.trim())
        .fetch_all(&self.pool)
        .await
        .context("Failed to search courses by department")?;

        rows.iter().map(Self::row_to_course).collect()
    }

    pub async fn list_courses_by_instructor(&self, full_name: &str) -> Result<Vec<Course>> {
        let rows = sqlx::query(
            r#"
            SELECT c.id, c.code, c.title, c.credits, c.department, c.semester, c.instructor_id, c.active
            FROM courses c
            JOIN instructors i ON i.id = c.instructor_id
            WHERE i.full_name = ? COLLATE NOCASE
            ORDER BY c.code
            "#,
        )
        .bind(full_name.trim())
        .fetch_all(&self.pool)
        .await
        .context("Failed to search courses by instructor")?;

        rows.iter().map(Self::row_to_course).collect()
    }

    pub async fn set_course_instructor(
        &self,
        course_id: CourseId,
        instructor_id: InstructorId,
    ) -> Result<()> {
        sqlx::query("UPDATE courses SET instructor_id = ? WHERE id = ?")
            .bind(instructor_id.to_string())
            .bind(course_id.to_string())
            .execute(&self.pool)
            .await
            .context("Failed to assign instructor")?;
        Ok(())
    }

    fn row_to_course(row: &SqliteRow) -> Result<Course> {
        let id_str: String = row.get("id");
        let semester_str: String = row.get("semester");
        let instructor_str: Option<String> = row.get("instructor_id");
        let credits: i64 = row.get("credits");

        Ok(Course {
            id: Uuid::parse_str(&id_str).context("Invalid course ID")?,
            code: row.get("code"),
            title: row.get("title"),
            credits: u32::try_from(credits).context("Invalid credit value")?,
            department: row.get("department"),
            semester: Semester::from_str(&semester_str)
                .ok_or_else(|| anyhow::anyhow!("Invalid semester: {}", semester_str))?,
            instructor_id: instructor_str
                .map(|s| Uuid::parse_str(&s))
                .transpose()
                .context("Invalid instructor ID")?,
            active: row.get::<i32, _>("active") != 0,
        })
    }

    // ========================
    // Enrollment operations
    // ========================

    /// Insert a new enrollment. The (student, course) pair is unique at the
    /// storage level as well, so a duplicate that slipped past the ledger check
    /// fails here instead of creating a second row.
    pub async fn save_enrollment(&self, enrollment: &Enrollment) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO enrollments (id, student_id, course_id, grade, enrolled_on)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(enrollment.id.to_string())
        .bind(enrollment.student_id.to_string())
        .bind(enrollment.course_id.to_string())
        .bind(enrollment.grade.map(|g| g.as_str()))
        .bind(enrollment.enrolled_on.to_rfc3339())
        .execute(&self.pool)
        .await
        .context("Failed to save enrollment")?;
        Ok(())
    }

    /// Find the enrollment for a (student, course) pair.
    pub async fn get_enrollment(
        &self,
        student_id: StudentId,
        course_id: CourseId,
    ) -> Result<Option<Enrollment>> {
        let row = sqlx::query(
            r#"
            SELECT id, student_id, course_id, grade, enrolled_on
            FROM enrollments
            WHERE student_id = ? AND course_id = ?
            "#,
        )
        .bind(student_id.to_string())
        .bind(course_id.to_string())
        .fetch_optional(&self.pool)
        .await
        .context("Failed to fetch enrollment")?;

        row.as_ref().map(Self::row_to_enrollment).transpose()
    }

    /// Delete an enrollment. Returns false when no row matched.
    pub async fn delete_enrollment(&self, id: EnrollmentId) -> Result<bool> {
        let result = sqlx::query("DELETE FROM enrollments WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .context("Failed to delete enrollment")?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn update_enrollment_grade(&self, id: EnrollmentId, grade: Grade) -> Result<()> {
        sqlx::query("UPDATE enrollments SET grade = ? WHERE id = ?")
            .bind(grade.as_str())
            .bind(id.to_string())
            .execute(&self.pool)
            .await
            .context("Failed to record grade")?;
        Ok(())
    }

    /// List every enrollment in insertion order.
    pub async fn list_enrollments(&self) -> Result<Vec<Enrollment>> {
        let rows = sqlx::query(
            r#"
            SELECT id, student_id, course_id, grade, enrolled_on
            FROM enrollments
            ORDER BY rowid
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .context("Failed to list enrollments")?;

        rows.iter().map(Self::row_to_enrollment).collect()
    }

    pub async fn count_enrollments(&self) -> Result<i64> {
        let count: i64 = sqlx::query("SELECT COUNT(*) as count FROM enrollments")
            .fetch_one(&self.pool)
            .await
            .context("Failed to count enrollments")?
            .get("count");
        Ok(count)
    }

    /// Enrollment lines of one student, in the order they were enrolled.
    pub async fn list_enrollment_lines_for_student(
        &self,
        student_id: StudentId,
    ) -> Result<Vec<EnrollmentLine>> {
        let rows = sqlx::query(&format!("{} WHERE e.student_id = ? ORDER BY e.rowid", LINE_QUERY))
            .bind(student_id.to_string())
            .fetch_all(&self.pool)
            .await
            .context("Failed to list enrollments for student")?;

        rows.iter().map(Self::row_to_line).collect()
    }

    /// Enrollment lines for all students in a single query, grouped by student.
    /// Students without enrollments are absent from the map.
    pub async fn list_enrollment_lines_by_student(
        &self,
    ) -> Result<HashMap<StudentId, Vec<EnrollmentLine>>> {
        let rows = sqlx::query(&format!("{} ORDER BY e.rowid", LINE_QUERY))
            .fetch_all(&self.pool)
            .await
            .context("Failed to list enrollment lines")?;

        let mut grouped: HashMap<StudentId, Vec<EnrollmentLine>> = HashMap::new();
        for row in &rows {
            let line = Self::row_to_line(row)?;
            grouped
                .entry(line.enrollment.student_id)
                .or_default()
                .push(line);
        }

        Ok(grouped)
    }

    fn row_to_enrollment(row: &SqliteRow) -> Result<Enrollment> {
        let id_str: String = row.get("id");
        let student_str: String = row.get("student_id");
        let course_str: String = row.get("course_id");
        let grade_str: Option<String> = row.get("grade");
        let enrolled_on_str: String = row.get("enrolled_on");

        Ok(Enrollment {
            id: Uuid::parse_str(&id_str).context("Invalid enrollment ID")?,
            student_id: Uuid::parse_str(&student_str).context("Invalid student ID")?,
            course_id: Uuid::parse_str(&course_str).context("Invalid course ID")?,
            grade: grade_str
                .map(|s| {
                    Grade::from_str(&s).ok_or_else(|| anyhow::anyhow!("Invalid grade: {}", s))
                })
                .transpose()?,
            enrolled_on: parse_timestamp(&enrolled_on_str)
                .context("Invalid enrolled_on timestamp")?,
        })
    }

    fn row_to_line(row: &SqliteRow) -> Result<EnrollmentLine> {
        let credits: i64 = row.get("credits");

        Ok(EnrollmentLine {
            enrollment: Self::row_to_enrollment(row)?,
            course_code: row.get("course_code"),
            course_title: row.get("course_title"),
            credits: u32::try_from(credits).context("Invalid credit value")?,
        })
    }
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(s)?.with_timezone(&Utc))
}
