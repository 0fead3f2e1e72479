// Allow dead_code because these helpers are used across different test files
// which are compiled separately
#![allow(dead_code)]

use anyhow::Result;
use campus_records::application::RecordsService;
use campus_records::domain::{Course, Grade, Semester, current_credits};
use tempfile::TempDir;

/// Helper to create a test service with a temporary database
pub async fn test_service() -> Result<(RecordsService, TempDir)> {
    let temp_dir = TempDir::new()?;
    let db_path = temp_dir.path().join("test.db");
    let service = RecordsService::init(db_path.to_str().unwrap()).await?;
    Ok((service, temp_dir))
}

/// Test fixture: a small directory and catalog
pub struct StandardCatalog;

impl StandardCatalog {
    /// Two students and two courses (CSE2006: 4 credits, MAT1003: 3 credits)
    pub async fn create_basic(service: &RecordsService) -> Result<()> {
        service
            .add_student("24BEY10140", "Akshat Aditya", "akshat.aditya@vitbhopal.ac.in")
            .await?;
        service
            .add_student("23BEY10154", "Devansh Mishra", "devansh.mishra@vitbhopal.ac.in")
            .await?;

        service
            .add_course(
                Course::new("CSE2006", "Microprocessors and Interfacing")
                    .with_credits(4)
                    .with_department("CSE")
                    .with_semester(Semester::Fall),
            )
            .await?;
        service
            .add_course(
                Course::new("MAT1003", "Calculus")
                    .with_credits(3)
                    .with_department("Mathematics")
                    .with_semester(Semester::Fall),
            )
            .await?;
        Ok(())
    }

    /// Basic catalog plus enough 4-credit courses to fill a 20-credit load
    /// (CSE3001..CSE3005) and a 1-credit lab (LAB1001).
    pub async fn create_full_load(service: &RecordsService) -> Result<()> {
        Self::create_basic(service).await?;
        for n in 1..=5 {
            service
                .add_course(
                    Course::new(format!("CSE300{}", n), format!("Elective {}", n))
                        .with_credits(4)
                        .with_department("CSE"),
                )
                .await?;
        }
        service
            .add_course(Course::new("LAB1001", "Workshop").with_credits(1))
            .await?;
        Ok(())
    }
}

/// Enroll and grade in one step
pub async fn enroll_graded(
    service: &RecordsService,
    reg_no: &str,
    course_code: &str,
    grade: Grade,
) -> Result<()> {
    service.enroll(reg_no, course_code).await?;
    service.record_grade(reg_no, course_code, grade).await?;
    Ok(())
}

/// Sum of credits currently held by a student
pub async fn credits_held(service: &RecordsService, reg_no: &str) -> Result<u32> {
    let lines = service.enrollments_for(reg_no).await?;
    Ok(current_credits(&lines))
}
