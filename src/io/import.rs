use anyhow::Result;
use std::collections::HashSet;
use std::io::Read;

use crate::application::{AppError, RecordsService};
use crate::domain::{Course, DEFAULT_DEPARTMENT, Semester, is_valid_email};

/// Result of an import operation
#[derive(Debug, Clone, Default)]
pub struct ImportResult {
    pub imported: usize,
    pub skipped: usize,
    pub errors: Vec<ImportError>,
}

/// Error that occurred during import
#[derive(Debug, Clone)]
pub struct ImportError {
    pub line: usize,
    pub field: Option<String>,
    pub error: String,
}

impl ImportError {
    fn new(line: usize, field: Option<&str>, error: impl Into<String>) -> Self {
        Self {
            line,
            field: field.map(str::to_string),
            error: error.into(),
        }
    }
}

/// Options for import operations
#[derive(Debug, Clone, Default)]
pub struct ImportOptions {
    /// Validate every row without writing anything
    pub dry_run: bool,
    /// Count rows whose key already exists as skipped instead of as errors
    pub skip_duplicates: bool,
}

/// Importer for loading directory and catalog rows from headerless CSV
pub struct Importer<'a> {
    service: &'a RecordsService,
}

fn csv_reader<R: Read>(reader: R) -> csv::Reader<R> {
    csv::ReaderBuilder::new()
        .has_headers(false)
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader)
}

impl<'a> Importer<'a> {
    pub fn new(service: &'a RecordsService) -> Self {
        Self { service }
    }

    /// Import students from `reg_no,full_name,email[,active|inactive]` rows.
    pub async fn import_students_csv<R: Read>(
        &self,
        reader: R,
        options: ImportOptions,
    ) -> Result<ImportResult> {
        let mut result = ImportResult::default();
        // Keys accepted so far by a dry run, folded to match the NOCASE columns
        let mut seen: HashSet<String> = HashSet::new();

        for (index, record) in csv_reader(reader).records().enumerate() {
            let line = index + 1;

            let record = match record {
                Ok(r) => r,
                Err(e) => {
                    result
                        .errors
                        .push(ImportError::new(line, None, format!("CSV parse error: {}", e)));
                    continue;
                }
            };
            if record.len() < 3 {
                result.errors.push(ImportError::new(
                    line,
                    None,
                    format!("Expected at least 3 fields, found {}", record.len()),
                ));
                continue;
            }

            let reg_no = &record[0];
            let full_name = &record[1];
            let email = &record[2];
            let inactive = record
                .get(3)
                .is_some_and(|status| status.eq_ignore_ascii_case("inactive"));

            if reg_no.is_empty() {
                result
                    .errors
                    .push(ImportError::new(line, Some("reg_no"), "Missing registration number"));
                continue;
            }

            if options.dry_run {
                if !is_valid_email(email) {
                    result
                        .errors
                        .push(ImportError::new(line, Some("email"), format!("Invalid email: {}", email)));
                } else if seen.contains(&reg_no.to_ascii_uppercase())
                    || self.service.find_student(reg_no).await?.is_some()
                {
                    record_duplicate(&mut result, &options, line, "reg_no", reg_no);
                } else {
                    seen.insert(reg_no.to_ascii_uppercase());
                    result.imported += 1;
                }
                continue;
            }

            match self.service.add_student(reg_no, full_name, email).await {
                Ok(student) => {
                    if inactive {
                        self.service.deactivate_student(&student.reg_no).await?;
                    }
                    result.imported += 1;
                }
                Err(AppError::StudentAlreadyExists(_)) => {
                    record_duplicate(&mut result, &options, line, "reg_no", reg_no);
                }
                Err(AppError::InvalidEmail(email)) => {
                    result
                        .errors
                        .push(ImportError::new(line, Some("email"), format!("Invalid email: {}", email)));
                }
                Err(e) => return Err(e.into()),
            }
        }

        Ok(result)
    }

    /// Import courses from `code,title,credits,department,semester` rows.
    /// Empty department or semester fields take the catalog defaults.
    pub async fn import_courses_csv<R: Read>(
        &self,
        reader: R,
        options: ImportOptions,
    ) -> Result<ImportResult> {
        let mut result = ImportResult::default();
        let mut seen: HashSet<String> = HashSet::new();

        for (index, record) in csv_reader(reader).records().enumerate() {
            let line = index + 1;

            let record = match record {
                Ok(r) => r,
                Err(e) => {
                    result
                        .errors
                        .push(ImportError::new(line, None, format!("CSV parse error: {}", e)));
                    continue;
                }
            };
            if record.len() < 3 {
                result.errors.push(ImportError::new(
                    line,
                    None,
                    format!("Expected at least 3 fields, found {}", record.len()),
                ));
                continue;
            }

            let code = &record[0];
            let credits = match record[2].parse::<u32>() {
                Ok(c) if c > 0 => c,
                _ => {
                    result.errors.push(ImportError::new(
                        line,
                        Some("credits"),
                        format!("Invalid credits: {}", &record[2]),
                    ));
                    continue;
                }
            };
            let department = record
                .get(3)
                .filter(|d| !d.is_empty())
                .unwrap_or(DEFAULT_DEPARTMENT);
            let semester = match record.get(4).filter(|s| !s.is_empty()) {
                None => Semester::Fall,
                Some(s) => match Semester::from_str(s) {
                    Some(semester) => semester,
                    None => {
                        result.errors.push(ImportError::new(
                            line,
                            Some("semester"),
                            format!("Invalid semester: {}", s),
                        ));
                        continue;
                    }
                },
            };

            if code.is_empty() {
                result
                    .errors
                    .push(ImportError::new(line, Some("code"), "Missing course code"));
                continue;
            }

            if options.dry_run {
                if seen.contains(&code.to_ascii_uppercase())
                    || self.service.find_course(code).await?.is_some()
                {
                    record_duplicate(&mut result, &options, line, "code", code);
                } else {
                    seen.insert(code.to_ascii_uppercase());
                    result.imported += 1;
                }
                continue;
            }

            let course = Course::new(code, &record[1])
                .with_credits(credits)
                .with_department(department)
                .with_semester(semester);

            match self.service.add_course(course).await {
                Ok(_) => result.imported += 1,
                Err(AppError::CourseAlreadyExists(_)) => {
                    record_duplicate(&mut result, &options, line, "code", code);
                }
                Err(e) => return Err(e.into()),
            }
        }

        Ok(result)
    }
}

fn record_duplicate(
    result: &mut ImportResult,
    options: &ImportOptions,
    line: usize,
    field: &str,
    key: &str,
) {
    if options.skip_duplicates {
        result.skipped += 1;
    } else {
        result
            .errors
            .push(ImportError::new(line, Some(field), format!("Already exists: {}", key)));
    }
}
