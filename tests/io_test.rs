mod common;

use std::fs;

use anyhow::Result;
use campus_records::domain::{Grade, Semester};
use campus_records::io::{
    COURSES_EXPORT_FILE, ENROLLMENTS_EXPORT_FILE, Exporter, ImportOptions, Importer,
    STUDENTS_EXPORT_FILE, backup, directory_size,
};
use common::{StandardCatalog, enroll_graded, test_service};
use tempfile::TempDir;

#[tokio::test]
async fn test_export_all_writes_headerless_csv() -> Result<()> {
    let (service, _temp) = test_service().await?;
    StandardCatalog::create_basic(&service).await?;
    enroll_graded(&service, "24BEY10140", "CSE2006", Grade::A).await?;
    service.enroll("24BEY10140", "MAT1003").await?;
    service.deactivate_student("23BEY10154").await?;

    let out = TempDir::new()?;
    let dir = out.path().join("exports");
    let summary = Exporter::new(&service).export_all(&dir).await?;
    assert_eq!(summary.students, 2);
    assert_eq!(summary.courses, 2);
    assert_eq!(summary.enrollments, 2);

    let students = fs::read_to_string(dir.join(STUDENTS_EXPORT_FILE))?;
    assert_eq!(
        students,
        "23BEY10154,Devansh Mishra,devansh.mishra@vitbhopal.ac.in,inactive\n\
         24BEY10140,Akshat Aditya,akshat.aditya@vitbhopal.ac.in,active\n"
    );

    let courses = fs::read_to_string(dir.join(COURSES_EXPORT_FILE))?;
    assert_eq!(
        courses,
        "CSE2006,Microprocessors and Interfacing,4,CSE,FALL\n\
         MAT1003,Calculus,3,Mathematics,FALL\n"
    );

    let enrollments = fs::read_to_string(dir.join(ENROLLMENTS_EXPORT_FILE))?;
    let rows: Vec<Vec<&str>> = enrollments
        .lines()
        .map(|l| l.split(',').collect())
        .collect();
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0][..3], ["24BEY10140", "CSE2006", "A"]);
    assert_eq!(rows[1][..3], ["24BEY10140", "MAT1003", "N/A"]);

    Ok(())
}

#[tokio::test]
async fn test_exported_csv_reimports_into_fresh_database() -> Result<()> {
    let (source, _source_temp) = test_service().await?;
    StandardCatalog::create_basic(&source).await?;
    source.deactivate_student("23BEY10154").await?;

    let out = TempDir::new()?;
    Exporter::new(&source).export_all(out.path()).await?;

    let (target, _target_temp) = test_service().await?;
    let importer = Importer::new(&target);

    let students = fs::File::open(out.path().join(STUDENTS_EXPORT_FILE))?;
    let result = importer
        .import_students_csv(students, ImportOptions::default())
        .await?;
    assert_eq!(result.imported, 2);
    assert!(result.errors.is_empty());

    let courses = fs::File::open(out.path().join(COURSES_EXPORT_FILE))?;
    let result = importer
        .import_courses_csv(courses, ImportOptions::default())
        .await?;
    assert_eq!(result.imported, 2);
    assert!(result.errors.is_empty());

    assert!(!target.get_student("23BEY10154").await?.active);
    let course = target.get_course("MAT1003").await?;
    assert_eq!(course.credits, 3);
    assert_eq!(course.department, "Mathematics");

    Ok(())
}

#[tokio::test]
async fn test_import_students_reports_bad_rows() -> Result<()> {
    let (service, _temp) = test_service().await?;
    StandardCatalog::create_basic(&service).await?;

    let csv = "\
22BEY10001, Riya Sen , riya.sen@vitbhopal.ac.in
24BEY10140,Akshat Aditya,akshat.aditya@vitbhopal.ac.in
22BEY10002,Kabir Rao,kabir-at-example
22BEY10003,Missing Email
";
    let result = Importer::new(&service)
        .import_students_csv(csv.as_bytes(), ImportOptions::default())
        .await?;

    assert_eq!(result.imported, 1);
    assert_eq!(result.skipped, 0);
    assert_eq!(result.errors.len(), 3);
    assert_eq!(result.errors[0].line, 2);
    assert_eq!(result.errors[0].field.as_deref(), Some("reg_no"));
    assert_eq!(result.errors[1].line, 3);
    assert_eq!(result.errors[1].field.as_deref(), Some("email"));
    assert_eq!(result.errors[2].line, 4);

    // Fields are trimmed
    let riya = service.get_student("22BEY10001").await?;
    assert_eq!(riya.full_name, "Riya Sen");

    Ok(())
}

#[tokio::test]
async fn test_import_skip_duplicates_and_dry_run() -> Result<()> {
    let (service, _temp) = test_service().await?;
    StandardCatalog::create_basic(&service).await?;

    let csv = "\
CSE2006,Microprocessors and Interfacing,4,CSE,FALL
PHY1001,Engineering Physics,3,Physics,spring
ENG1001,Technical English,2,,
";

    let dry_run = Importer::new(&service)
        .import_courses_csv(
            csv.as_bytes(),
            ImportOptions {
                dry_run: true,
                skip_duplicates: true,
            },
        )
        .await?;
    assert_eq!(dry_run.imported, 2);
    assert_eq!(dry_run.skipped, 1);
    assert_eq!(service.list_courses().await?.len(), 2);

    let result = Importer::new(&service)
        .import_courses_csv(
            csv.as_bytes(),
            ImportOptions {
                dry_run: false,
                skip_duplicates: true,
            },
        )
        .await?;
    assert_eq!(result.imported, 2);
    assert_eq!(result.skipped, 1);
    assert!(result.errors.is_empty());

    let physics = service.get_course("PHY1001").await?;
    assert_eq!(physics.semester, Semester::Spring);
    let english = service.get_course("ENG1001").await?;
    assert_eq!(english.department, "General");
    assert_eq!(english.semester, Semester::Fall);

    Ok(())
}

#[tokio::test]
async fn test_dry_run_flags_keys_repeated_within_file() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let students = "\
22BEY10001,Riya Sen,riya.sen@vitbhopal.ac.in
22bey10001,Riya Sen,riya.sen@vitbhopal.ac.in
22BEY10002,Kabir Rao,kabir.rao@vitbhopal.ac.in
";
    let dry_run = Importer::new(&service)
        .import_students_csv(
            students.as_bytes(),
            ImportOptions {
                dry_run: true,
                skip_duplicates: false,
            },
        )
        .await?;
    assert_eq!(dry_run.imported, 2);
    assert_eq!(dry_run.errors.len(), 1);
    assert_eq!(dry_run.errors[0].line, 2);
    assert_eq!(dry_run.errors[0].field.as_deref(), Some("reg_no"));
    assert!(service.list_students().await?.is_empty());

    // A real run over the same rows agrees with the preview
    let result = Importer::new(&service)
        .import_students_csv(students.as_bytes(), ImportOptions::default())
        .await?;
    assert_eq!(result.imported, dry_run.imported);
    assert_eq!(result.errors.len(), 1);
    assert_eq!(result.errors[0].line, 2);

    let courses = "\
PHY1001,Engineering Physics,3,Physics,FALL
phy1001,Engineering Physics,3,Physics,FALL
";
    let options = ImportOptions {
        dry_run: true,
        skip_duplicates: true,
    };
    let dry_run = Importer::new(&service)
        .import_courses_csv(courses.as_bytes(), options)
        .await?;
    assert_eq!(dry_run.imported, 1);
    assert_eq!(dry_run.skipped, 1);
    assert!(service.list_courses().await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_import_courses_rejects_bad_credits_and_semester() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let csv = "\
CSE1001,Programming,zero,CSE,FALL
CSE1002,Data Structures,0,CSE,FALL
CSE1003,Algorithms,4,CSE,MONSOON
";
    let result = Importer::new(&service)
        .import_courses_csv(csv.as_bytes(), ImportOptions::default())
        .await?;

    assert_eq!(result.imported, 0);
    let fields: Vec<_> = result
        .errors
        .iter()
        .map(|e| e.field.as_deref().unwrap_or_default())
        .collect();
    assert_eq!(fields, ["credits", "credits", "semester"]);
    assert!(service.list_courses().await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_json_snapshot() -> Result<()> {
    let (service, _temp) = test_service().await?;
    StandardCatalog::create_basic(&service).await?;
    service.enroll("23BEY10154", "MAT1003").await?;
    service
        .assign_instructor("MAT1003", "Dr. Anil Kumar", "anil.kumar@vitbhopal.ac.in", "Mathematics")
        .await?;

    let mut buffer = Vec::new();
    let snapshot = Exporter::new(&service).export_full_json(&mut buffer).await?;
    assert_eq!(snapshot.students.len(), 2);
    assert_eq!(snapshot.instructors.len(), 1);
    assert_eq!(snapshot.enrollments.len(), 1);

    let json: serde_json::Value = serde_json::from_slice(&buffer)?;
    assert_eq!(json["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(json["courses"].as_array().map(Vec::len), Some(2));
    assert_eq!(json["enrollments"][0]["grade"], serde_json::Value::Null);

    Ok(())
}

#[tokio::test]
async fn test_backup_of_export_directory() -> Result<()> {
    let (service, _temp) = test_service().await?;
    StandardCatalog::create_basic(&service).await?;

    let data = TempDir::new()?;
    let backups = TempDir::new()?;
    Exporter::new(&service).export_all(data.path()).await?;

    let result = backup(data.path(), backups.path())?;
    assert_eq!(result.bytes, directory_size(data.path()));
    assert!(result.bytes > 0);
    assert_eq!(
        fs::read_to_string(result.path.join(STUDENTS_EXPORT_FILE))?,
        fs::read_to_string(data.path().join(STUDENTS_EXPORT_FILE))?
    );

    Ok(())
}
