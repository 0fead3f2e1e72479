use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use crate::application::RecordsService;
use crate::config::{AppConfig, ConfigOverrides};
use crate::domain::{
    Course, DEFAULT_CREDITS, DEFAULT_DEPARTMENT, GpaBucket, Grade, Semester, current_credits,
};

/// Campus Records - students, courses, enrollments and grades
#[derive(Parser)]
#[command(name = "campus")]
#[command(about = "Track students, courses, enrollments and academic standing")]
#[command(version)]
pub struct Cli {
    /// Database file path (overrides the config file)
    #[arg(short, long, global = true)]
    pub database: Option<String>,

    /// Config file path
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Initialize a new database
    Init,

    /// Student directory commands
    #[command(subcommand)]
    Student(StudentCommands),

    /// Course catalog commands
    #[command(subcommand)]
    Course(CourseCommands),

    /// Enroll a student in a course
    Enroll {
        /// Student registration number
        reg_no: String,

        /// Course code
        course: String,
    },

    /// Remove a student's enrollment in a course
    Unenroll {
        /// Student registration number
        reg_no: String,

        /// Course code
        course: String,
    },

    /// Record (or replace) a grade
    Grade {
        /// Student registration number
        reg_no: String,

        /// Course code
        course: String,

        /// Grade: S, A, B, C, D, E or F
        grade: String,
    },

    /// Print a student's transcript
    Transcript {
        /// Student registration number
        reg_no: String,

        /// Output format: table, json
        #[arg(long, default_value = "table")]
        format: String,
    },

    /// Academic reports
    #[command(subcommand)]
    Report(ReportCommands),

    /// Export records to CSV files or a JSON snapshot
    Export {
        /// Target directory for the CSV files (defaults to the configured data folder)
        #[arg(long)]
        dir: Option<PathBuf>,

        /// Write a full JSON snapshot instead of CSV files
        #[arg(long)]
        json: bool,

        /// Output file for the JSON snapshot (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Import students or courses from headerless CSV
    Import {
        /// What to import: students, courses
        import_type: String,

        /// Input file (reads stdin when omitted)
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Validate rows without writing anything
        #[arg(long)]
        dry_run: bool,

        /// Count existing keys as skipped instead of errors
        #[arg(long)]
        skip_duplicates: bool,
    },

    /// Copy a directory into a timestamped backup folder
    Backup {
        /// Directory to back up (defaults to the configured data folder)
        #[arg(long)]
        source: Option<PathBuf>,

        /// Folder that receives the backup_YYYYMMDD_HHMMSS directory
        #[arg(long, default_value = "backups")]
        dest: PathBuf,
    },
}

#[derive(Subcommand)]
pub enum StudentCommands {
    /// Register a new student
    Add {
        /// Registration number
        reg_no: String,

        /// Full name
        name: String,

        /// Email address
        email: String,
    },

    /// List all students
    List,

    /// Show a student with their enrollments
    Show {
        /// Registration number
        reg_no: String,
    },

    /// Change a student's email address
    UpdateEmail {
        /// Registration number
        reg_no: String,

        /// New email address
        email: String,
    },

    /// Mark a student inactive
    Deactivate {
        /// Registration number
        reg_no: String,
    },
}

#[derive(Subcommand)]
pub enum CourseCommands {
    /// Add a course to the catalog
    Add {
        /// Course code
        code: String,

        /// Course title
        title: String,

        /// Credit value
        #[arg(long, default_value_t = DEFAULT_CREDITS)]
        credits: u32,

        /// Department
        #[arg(long, default_value = DEFAULT_DEPARTMENT)]
        department: String,

        /// Semester: spring, summer, fall, winter
        #[arg(long, default_value = "fall")]
        semester: String,
    },

    /// List all courses
    List,

    /// Search courses by department or instructor
    Search {
        /// Department name
        #[arg(long, conflicts_with = "instructor")]
        department: Option<String>,

        /// Instructor full name
        #[arg(long)]
        instructor: Option<String>,
    },

    /// Assign an instructor to a course
    AssignInstructor {
        /// Course code
        code: String,

        /// Instructor full name
        name: String,

        /// Instructor email
        email: String,

        /// Instructor department
        #[arg(long, default_value = DEFAULT_DEPARTMENT)]
        department: String,
    },
}

#[derive(Subcommand)]
pub enum ReportCommands {
    /// Number of students per GPA bucket
    Distribution {
        /// Output format: table, json
        #[arg(long, default_value = "table")]
        format: String,
    },

    /// Students with the highest GPA
    Top {
        /// Number of students to show
        #[arg(short, long, default_value = "5")]
        count: usize,

        /// Output format: table, json
        #[arg(long, default_value = "table")]
        format: String,
    },

    /// One GPA line per student
    Summaries {
        /// Output format: table, json
        #[arg(long, default_value = "table")]
        format: String,
    },
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        let mut config = AppConfig::load(self.config.as_deref())?;
        config.apply_overrides(&ConfigOverrides {
            database: self.database.clone(),
            data_folder: None,
        });

        match self.command {
            Commands::Init => {
                RecordsService::init(&config.database).await?;
                println!("Database initialized: {}", config.database);
            }

            Commands::Student(cmd) => {
                let service = connect(&config).await?;
                run_student_command(&service, cmd).await?;
            }

            Commands::Course(cmd) => {
                let service = connect(&config).await?;
                run_course_command(&service, cmd).await?;
            }

            Commands::Enroll { reg_no, course } => {
                let service = connect(&config).await?;
                service.enroll(&reg_no, &course).await?;
                let lines = service.enrollments_for(&reg_no).await?;
                let held = current_credits(&lines);
                println!(
                    "Enrolled {} in {} ({}/{} credits)",
                    reg_no,
                    course,
                    held,
                    service.policy().max_credits_per_term
                );
            }

            Commands::Unenroll { reg_no, course } => {
                let service = connect(&config).await?;
                service.unenroll(&reg_no, &course).await?;
                println!("Unenrolled {} from {}", reg_no, course);
            }

            Commands::Grade {
                reg_no,
                course,
                grade,
            } => {
                let service = connect(&config).await?;
                let grade = Grade::from_str(&grade).with_context(|| {
                    format!("Invalid grade '{}'. Valid: S, A, B, C, D, E, F", grade)
                })?;
                service.record_grade(&reg_no, &course, grade).await?;
                println!(
                    "Recorded {} ({} points) for {} in {}",
                    grade,
                    grade.points(),
                    reg_no,
                    course
                );
            }

            Commands::Transcript { reg_no, format } => {
                let service = connect(&config).await?;
                run_transcript_command(&service, &reg_no, &format).await?;
            }

            Commands::Report(cmd) => {
                let service = connect(&config).await?;
                run_report_command(&service, cmd).await?;
            }

            Commands::Export { dir, json, output } => {
                let service = connect(&config).await?;
                let dir = dir.unwrap_or_else(|| config.data_folder.clone());
                run_export_command(&service, &dir, json, output.as_deref()).await?;
            }

            Commands::Import {
                import_type,
                input,
                dry_run,
                skip_duplicates,
            } => {
                let service = connect(&config).await?;
                run_import_command(
                    &service,
                    &import_type,
                    input.as_deref(),
                    dry_run,
                    skip_duplicates,
                )
                .await?;
            }

            Commands::Backup { source, dest } => {
                let source = source.unwrap_or_else(|| config.data_folder.clone());
                let result = crate::io::backup(&source, &dest)?;
                println!("Backup created at: {}", result.path.display());
                println!("Total size: {} bytes", result.bytes);
            }
        }

        Ok(())
    }
}

async fn connect(config: &AppConfig) -> Result<RecordsService> {
    let service = RecordsService::connect(&config.database)
        .await
        .with_context(|| {
            format!(
                "Failed to open database '{}'. Run 'campus init' first",
                config.database
            )
        })?;
    Ok(service.with_policy(config.enrollment_policy()))
}

async fn run_student_command(service: &RecordsService, cmd: StudentCommands) -> Result<()> {
    match cmd {
        StudentCommands::Add {
            reg_no,
            name,
            email,
        } => {
            let student = service.add_student(&reg_no, &name, &email).await?;
            println!("Added student: {}", student);
        }

        StudentCommands::List => {
            let students = service.list_students().await?;
            if students.is_empty() {
                println!("No students found.");
            } else {
                println!(
                    "{:<14} {:<24} {:<28} {:<8}",
                    "REG NO", "NAME", "EMAIL", "STATUS"
                );
                println!("{}", "-".repeat(77));
                for student in students {
                    println!(
                        "{:<14} {:<24} {:<28} {:<8}",
                        student.reg_no,
                        truncate(&student.full_name, 24),
                        truncate(&student.email, 28),
                        student.status_str()
                    );
                }
            }
        }

        StudentCommands::Show { reg_no } => {
            let student = service.get_student(&reg_no).await?;
            let lines = service.enrollments_for(&reg_no).await?;

            println!("Student: {}", student.full_name);
            println!("  Reg No:     {}", student.reg_no);
            println!("  Email:      {}", student.email);
            println!("  Status:     {}", student.status_str());
            println!(
                "  Registered: {}",
                student.registered_on.format("%Y-%m-%d")
            );
            println!();

            if lines.is_empty() {
                println!("No enrollments.");
            } else {
                println!("Enrolled courses:");
                for line in &lines {
                    println!(
                        "  {:<10} {:<30} {:>3} cr  {}",
                        line.course_code,
                        truncate(&line.course_title, 30),
                        line.credits,
                        line.enrollment.grade_str()
                    );
                }
            }
        }

        StudentCommands::UpdateEmail { reg_no, email } => {
            let student = service.update_email(&reg_no, &email).await?;
            println!("Updated email for {}: {}", student.reg_no, student.email);
        }

        StudentCommands::Deactivate { reg_no } => {
            let student = service.deactivate_student(&reg_no).await?;
            println!("Deactivated student: {}", student);
        }
    }
    Ok(())
}

async fn run_course_command(service: &RecordsService, cmd: CourseCommands) -> Result<()> {
    match cmd {
        CourseCommands::Add {
            code,
            title,
            credits,
            department,
            semester,
        } => {
            let semester = Semester::from_str(&semester).with_context(|| {
                format!(
                    "Invalid semester '{}'. Valid: spring, summer, fall, winter",
                    semester
                )
            })?;
            let course = Course::new(code, title)
                .with_credits(credits)
                .with_department(department)
                .with_semester(semester);
            let course = service.add_course(course).await?;
            println!("Added course: {}", course);
        }

        CourseCommands::List => {
            let courses = service.list_courses().await?;
            print_courses(&courses);
        }

        CourseCommands::Search {
            department,
            instructor,
        } => {
            let courses = match (department, instructor) {
                (Some(department), _) => service.search_by_department(&department).await?,
                (None, Some(instructor)) => service.search_by_instructor(&instructor).await?,
                (None, None) => anyhow::bail!("Provide --department or --instructor"),
            };
            print_courses(&courses);
        }

        CourseCommands::AssignInstructor {
            code,
            name,
            email,
            department,
        } => {
            let assignment = service
                .assign_instructor(&code, &name, &email, &department)
                .await?;
            println!(
                "Assigned {} to {}",
                assignment.instructor.full_name, assignment.course.code
            );
        }
    }
    Ok(())
}

fn print_courses(courses: &[Course]) {
    if courses.is_empty() {
        println!("No courses found.");
        return;
    }

    println!(
        "{:<10} {:<30} {:>7} {:<16} {:<8}",
        "CODE", "TITLE", "CREDITS", "DEPARTMENT", "SEMESTER"
    );
    println!("{}", "-".repeat(75));
    for course in courses {
        println!(
            "{:<10} {:<30} {:>7} {:<16} {:<8}",
            course.code,
            truncate(&course.title, 30),
            course.credits,
            truncate(&course.department, 16),
            course.semester
        );
    }
}

async fn run_transcript_command(service: &RecordsService, reg_no: &str, format: &str) -> Result<()> {
    let transcript = service.transcript(reg_no).await?;

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&transcript)?);
        return Ok(());
    }

    println!(
        "Transcript: {} - {}",
        transcript.student.reg_no, transcript.student.full_name
    );
    println!();
    println!(
        "{:<10} {:<30} {:>7} {:>6}",
        "CODE", "TITLE", "CREDITS", "GRADE"
    );
    println!("{}", "-".repeat(56));
    for line in &transcript.lines {
        println!(
            "{:<10} {:<30} {:>7} {:>6}",
            line.course_code,
            truncate(&line.course_title, 30),
            line.credits,
            line.enrollment.grade_str()
        );
    }
    println!("{}", "-".repeat(56));
    println!("Graded credits: {}", transcript.graded_credits);
    println!("GPA:            {:.2}", transcript.gpa);

    Ok(())
}

async fn run_report_command(service: &RecordsService, cmd: ReportCommands) -> Result<()> {
    match cmd {
        ReportCommands::Distribution { format } => {
            let report = service.gpa_distribution().await?;

            if format == "json" {
                println!("{}", serde_json::to_string_pretty(&report)?);
                return Ok(());
            }

            println!("GPA Distribution ({} students)", report.total_students);
            println!();
            println!("{:<12} {:>8}", "RANGE", "STUDENTS");
            println!("{}", "-".repeat(21));
            for bucket in GpaBucket::ALL {
                println!("{:<12} {:>8}", bucket.label(), report.count(bucket));
            }
        }

        ReportCommands::Top { count, format } => {
            let standings = service.top_students(count).await?;

            if format == "json" {
                println!("{}", serde_json::to_string_pretty(&standings)?);
                return Ok(());
            }

            if standings.is_empty() {
                println!("No students found.");
            } else {
                println!("{:<4} {:<14} {:<24} {:>6}", "#", "REG NO", "NAME", "GPA");
                println!("{}", "-".repeat(51));
                for (i, standing) in standings.iter().enumerate() {
                    println!(
                        "{:<4} {:<14} {:<24} {:>6.2}",
                        i + 1,
                        standing.reg_no,
                        truncate(&standing.full_name, 24),
                        standing.gpa
                    );
                }
            }
        }

        ReportCommands::Summaries { format } => {
            let summaries = service.transcript_summaries().await?;

            if format == "json" {
                println!("{}", serde_json::to_string_pretty(&summaries)?);
                return Ok(());
            }

            if summaries.is_empty() {
                println!("No students found.");
            }
            for summary in &summaries {
                println!("{}", summary);
            }
        }
    }
    Ok(())
}

async fn run_export_command(
    service: &RecordsService,
    dir: &Path,
    json: bool,
    output: Option<&Path>,
) -> Result<()> {
    use crate::io::Exporter;
    use std::fs::File;
    use std::io::{Write, stdout};

    let exporter = Exporter::new(service);

    if json {
        let writer: Box<dyn Write> = match output {
            Some(path) => {
                let file = File::create(path).with_context(|| {
                    format!("Failed to create output file: {}", path.display())
                })?;
                Box::new(file)
            }
            None => Box::new(stdout()),
        };

        let snapshot = exporter.export_full_json(writer).await?;
        if output.is_some() {
            eprintln!(
                "Exported snapshot: {} students, {} courses, {} enrollments",
                snapshot.students.len(),
                snapshot.courses.len(),
                snapshot.enrollments.len()
            );
        }
        return Ok(());
    }

    let summary = exporter.export_all(dir).await?;
    println!("Exported to {}", dir.display());
    println!("  Students:    {}", summary.students);
    println!("  Courses:     {}", summary.courses);
    println!("  Enrollments: {}", summary.enrollments);

    Ok(())
}

async fn run_import_command(
    service: &RecordsService,
    import_type: &str,
    input: Option<&Path>,
    dry_run: bool,
    skip_duplicates: bool,
) -> Result<()> {
    use crate::io::{ImportOptions, Importer};
    use std::fs::File;
    use std::io::{Read, stdin};

    let importer = Importer::new(service);

    let reader: Box<dyn Read> = match input {
        Some(path) => {
            let file = File::open(path)
                .with_context(|| format!("Failed to open input file: {}", path.display()))?;
            Box::new(file)
        }
        None => Box::new(stdin()),
    };

    let options = ImportOptions {
        dry_run,
        skip_duplicates,
    };

    let result = match import_type {
        "students" => importer.import_students_csv(reader, options).await?,
        "courses" => importer.import_courses_csv(reader, options).await?,
        _ => {
            anyhow::bail!(
                "Invalid import type '{}'. Valid types: students, courses",
                import_type
            );
        }
    };

    if dry_run {
        println!("Validation complete");
    } else {
        println!("Import complete");
    }
    println!("  Imported: {}", result.imported);
    println!("  Skipped:  {}", result.skipped);
    println!("  Errors:   {}", result.errors.len());

    if !result.errors.is_empty() {
        println!("\nErrors:");
        for error in result.errors.iter().take(10) {
            let field = error
                .field
                .as_ref()
                .map(|f| format!("{}: ", f))
                .unwrap_or_default();
            println!("  Line {}: {}{}", error.line, field, error.error);
        }
        if result.errors.len() > 10 {
            println!("  ... and {} more errors", result.errors.len() - 10);
        }
    }

    Ok(())
}

fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len - 3).collect();
        format!("{}...", kept)
    }
}
