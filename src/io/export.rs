use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::Write;
use std::path::Path;

use crate::application::RecordsService;
use crate::domain::{Course, Enrollment, Instructor, Student};

pub const STUDENTS_EXPORT_FILE: &str = "students_export.csv";
pub const COURSES_EXPORT_FILE: &str = "courses_export.csv";
pub const ENROLLMENTS_EXPORT_FILE: &str = "enrollments_export.csv";

/// Full snapshot of the records database
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordsSnapshot {
    pub version: String,
    pub exported_at: DateTime<Utc>,
    pub students: Vec<Student>,
    pub instructors: Vec<Instructor>,
    pub courses: Vec<Course>,
    pub enrollments: Vec<Enrollment>,
}

/// Row counts written by [`Exporter::export_all`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ExportSummary {
    pub students: usize,
    pub courses: usize,
    pub enrollments: usize,
}

/// Exporter for writing records out as CSV or JSON
pub struct Exporter<'a> {
    service: &'a RecordsService,
}

fn csv_writer<W: Write>(writer: W) -> csv::Writer<W> {
    csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(writer)
}

impl<'a> Exporter<'a> {
    pub fn new(service: &'a RecordsService) -> Self {
        Self { service }
    }

    /// `reg_no,full_name,email,active|inactive`
    pub async fn export_students_csv<W: Write>(&self, writer: W) -> Result<usize> {
        let students = self.service.list_students().await?;
        let mut csv_writer = csv_writer(writer);

        for student in &students {
            csv_writer.write_record([
                student.reg_no.as_str(),
                student.full_name.as_str(),
                student.email.as_str(),
                student.status_str(),
            ])?;
        }

        csv_writer.flush()?;
        Ok(students.len())
    }

    /// `code,title,credits,department,semester`
    pub async fn export_courses_csv<W: Write>(&self, writer: W) -> Result<usize> {
        let courses = self.service.list_courses().await?;
        let mut csv_writer = csv_writer(writer);

        for course in &courses {
            let credits = course.credits.to_string();
            csv_writer.write_record([
                course.code.as_str(),
                course.title.as_str(),
                credits.as_str(),
                course.department.as_str(),
                course.semester.as_str(),
            ])?;
        }

        csv_writer.flush()?;
        Ok(courses.len())
    }

    /// `reg_no,course_code,grade|N/A,enrolled_on`
    pub async fn export_enrollments_csv<W: Write>(&self, writer: W) -> Result<usize> {
        let reg_nos: HashMap<_, _> = self
            .service
            .list_students()
            .await?
            .into_iter()
            .map(|s| (s.id, s.reg_no))
            .collect();
        let codes: HashMap<_, _> = self
            .service
            .list_courses()
            .await?
            .into_iter()
            .map(|c| (c.id, c.code))
            .collect();
        let enrollments = self.service.list_enrollments().await?;
        let mut csv_writer = csv_writer(writer);

        let mut count = 0;
        for enrollment in &enrollments {
            let (Some(reg_no), Some(code)) = (
                reg_nos.get(&enrollment.student_id),
                codes.get(&enrollment.course_id),
            ) else {
                continue;
            };

            let enrolled_on = enrollment.enrolled_on.to_rfc3339();
            csv_writer.write_record([
                reg_no.as_str(),
                code.as_str(),
                enrollment.grade_str(),
                enrolled_on.as_str(),
            ])?;
            count += 1;
        }

        csv_writer.flush()?;
        Ok(count)
    }

    /// Write the three CSV exports into `dir`, creating it if needed.
    pub async fn export_all(&self, dir: &Path) -> Result<ExportSummary> {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create export directory: {}", dir.display()))?;

        let students = self
            .export_students_csv(create_file(&dir.join(STUDENTS_EXPORT_FILE))?)
            .await?;
        let courses = self
            .export_courses_csv(create_file(&dir.join(COURSES_EXPORT_FILE))?)
            .await?;
        let enrollments = self
            .export_enrollments_csv(create_file(&dir.join(ENROLLMENTS_EXPORT_FILE))?)
            .await?;

        Ok(ExportSummary {
            students,
            courses,
            enrollments,
        })
    }

    /// Export the full database as a JSON snapshot
    pub async fn export_full_json<W: Write>(&self, mut writer: W) -> Result<RecordsSnapshot> {
        let snapshot = RecordsSnapshot {
            version: env!("CARGO_PKG_VERSION").to_string(),
            exported_at: Utc::now(),
            students: self.service.list_students().await?,
            instructors: self.service.list_instructors().await?,
            courses: self.service.list_courses().await?,
            enrollments: self.service.list_enrollments().await?,
        };

        let json = serde_json::to_string_pretty(&snapshot)?;
        writer.write_all(json.as_bytes())?;
        writer.flush()?;

        Ok(snapshot)
    }
}

fn create_file(path: &Path) -> Result<File> {
    File::create(path).with_context(|| format!("Failed to create {}", path.display()))
}
