mod common;

use anyhow::Result;
use campus_records::application::AppError;
use campus_records::domain::{Course, DEFAULT_CREDITS, DEFAULT_DEPARTMENT, Semester};
use common::{StandardCatalog, test_service};

#[tokio::test]
async fn test_students_are_listed_by_reg_no() -> Result<()> {
    let (service, _temp) = test_service().await?;
    StandardCatalog::create_basic(&service).await?;
    service
        .add_student("22BEY10001", "Riya Sen", "riya.sen@vitbhopal.ac.in")
        .await?;

    let reg_nos: Vec<_> = service
        .list_students()
        .await?
        .into_iter()
        .map(|s| s.reg_no)
        .collect();
    assert_eq!(reg_nos, ["22BEY10001", "23BEY10154", "24BEY10140"]);

    Ok(())
}

#[tokio::test]
async fn test_student_keys_are_unique_case_insensitively() -> Result<()> {
    let (service, _temp) = test_service().await?;
    StandardCatalog::create_basic(&service).await?;

    let err = service
        .add_student("24bey10140", "Someone Else", "someone@vitbhopal.ac.in")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::StudentAlreadyExists(_)));

    let found = service.find_student("24bey10140").await?.unwrap();
    assert_eq!(found.full_name, "Akshat Aditya");
    assert!(service.find_student("00XXX00000").await?.is_none());

    Ok(())
}

#[tokio::test]
async fn test_invalid_email_is_rejected() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let err = service
        .add_student("24BEY10140", "Akshat Aditya", "akshat-at-example")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidEmail(_)));
    assert!(service.list_students().await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_emails_are_trimmed_before_validation_and_storage() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let student = service
        .add_student("22BEY10001", "Riya Sen", "  riya.sen@vitbhopal.ac.in  ")
        .await?;
    assert_eq!(student.email, "riya.sen@vitbhopal.ac.in");

    let updated = service
        .update_email("22BEY10001", "\triya@example.org ")
        .await?;
    assert_eq!(updated.email, "riya@example.org");
    assert_eq!(service.get_student("22BEY10001").await?.email, "riya@example.org");

    // The rejected value is reported the same way from both paths
    let err = service
        .add_student("22BEY10002", "Kabir Rao", " kabir-at-example ")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidEmail(ref email) if email == "kabir-at-example"));
    let err = service
        .update_email("22BEY10001", " kabir-at-example ")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidEmail(ref email) if email == "kabir-at-example"));

    Ok(())
}

#[tokio::test]
async fn test_update_email_and_deactivate() -> Result<()> {
    let (service, _temp) = test_service().await?;
    StandardCatalog::create_basic(&service).await?;

    service
        .update_email("23BEY10154", "devansh@example.org")
        .await?;
    let err = service
        .update_email("23BEY10154", "not-an-email")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidEmail(_)));

    let deactivated = service.deactivate_student("23BEY10154").await?;
    assert!(!deactivated.active);

    let student = service.get_student("23BEY10154").await?;
    assert_eq!(student.email, "devansh@example.org");
    assert!(!student.active);
    assert_eq!(student.status_str(), "inactive");

    let err = service.deactivate_student("00XXX00000").await.unwrap_err();
    assert!(err.is_not_found());

    Ok(())
}

#[tokio::test]
async fn test_course_defaults_and_validation() -> Result<()> {
    let (service, _temp) = test_service().await?;

    let course = service
        .add_course(Course::new("ENG1001", "Technical English"))
        .await?;
    assert_eq!(course.credits, DEFAULT_CREDITS);
    assert_eq!(course.department, DEFAULT_DEPARTMENT);
    assert_eq!(course.semester, Semester::Fall);

    let err = service
        .add_course(Course::new("eng1001", "Duplicate"))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::CourseAlreadyExists(_)));

    let err = service
        .add_course(Course::new("ZERO100", "No Credits").with_credits(0))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::InvalidCredits { .. }));

    let stored = service.get_course("ENG1001").await?;
    assert_eq!(stored.title, "Technical English");
    assert_eq!(service.list_courses().await?.len(), 1);

    Ok(())
}

#[tokio::test]
async fn test_search_by_department() -> Result<()> {
    let (service, _temp) = test_service().await?;
    StandardCatalog::create_basic(&service).await?;
    service
        .add_course(
            Course::new("CSE1001", "Programming in C")
                .with_department("CSE")
                .with_semester(Semester::Spring),
        )
        .await?;

    let codes: Vec<_> = service
        .search_by_department("cse")
        .await?
        .into_iter()
        .map(|c| c.code)
        .collect();
    assert_eq!(codes, ["CSE1001", "CSE2006"]);

    assert!(service.search_by_department("Physics").await?.is_empty());

    Ok(())
}

#[tokio::test]
async fn test_assign_instructor_and_search() -> Result<()> {
    let (service, _temp) = test_service().await?;
    StandardCatalog::create_basic(&service).await?;

    let assignment = service
        .assign_instructor("CSE2006", "Dr. Meera Iyer", "meera.iyer@vitbhopal.ac.in", "CSE")
        .await?;
    assert_eq!(
        assignment.course.instructor_id,
        Some(assignment.instructor.id)
    );

    let stored = service.get_course("CSE2006").await?;
    assert_eq!(stored.instructor_id, Some(assignment.instructor.id));

    let instructor = service
        .get_instructor(assignment.instructor.id)
        .await?
        .unwrap();
    assert_eq!(instructor.department, "CSE");

    let courses = service.search_by_instructor("dr. meera iyer").await?;
    assert_eq!(courses.len(), 1);
    assert_eq!(courses[0].code, "CSE2006");

    assert!(service.search_by_instructor("Nobody").await?.is_empty());

    let err = service
        .assign_instructor("PHY0000", "Dr. Meera Iyer", "meera.iyer@vitbhopal.ac.in", "CSE")
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::CourseNotFound(_)));

    Ok(())
}
