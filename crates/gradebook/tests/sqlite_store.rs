use std::sync::Arc;

use chrono::NaiveDate;
use gradebook::records::{
    NewCourse, NewResult, NewSemester, NewStudent, RecordStore, RecordsService,
    RecordsServiceError, RepositoryError, ResultFilter, SqliteRecordStore,
};

fn student(code: &str) -> NewStudent {
    NewStudent {
        student_code: code.to_string(),
        first_name: "Ngozi".to_string(),
        last_name: "Eze".to_string(),
        email: "ngozi.eze@students.example.edu".to_string(),
        phone_number: "+2348051112222".to_string(),
        program: "Electrical Engineering".to_string(),
        year_of_study: 1,
    }
}

fn semester(name: &str, month: u32, is_current: bool) -> NewSemester {
    NewSemester {
        name: name.to_string(),
        year: 2025,
        start_date: NaiveDate::from_ymd_opt(2025, month, 1).expect("valid date"),
        end_date: NaiveDate::from_ymd_opt(2025, month + 4, 30).expect("valid date"),
        is_current,
    }
}

fn service() -> (RecordsService<SqliteRecordStore>, Arc<SqliteRecordStore>) {
    let store = Arc::new(SqliteRecordStore::open_in_memory().expect("sqlite opens"));
    (RecordsService::new(store.clone()), store)
}

#[test]
fn duplicate_result_is_a_conflict() {
    let (service, _) = service();
    let student = service.register_student(student("EEE/2025/010")).expect("student");
    let course = service
        .add_course(NewCourse {
            code: "EEE101".to_string(),
            title: "Circuit Theory".to_string(),
            credit_units: 4,
        })
        .expect("course");
    let semester = service.add_semester(semester("First", 1, true)).expect("semester");
    let entry = NewResult {
        student_id: student.id,
        course_id: course.id,
        semester_id: semester.id,
        score: 52.0,
    };

    service.record_result(entry.clone()).expect("first insert");

    assert!(matches!(
        service.record_result(entry),
        Err(RecordsServiceError::Repository(RepositoryError::Conflict(_)))
    ));
}

#[test]
fn duplicate_student_code_is_a_conflict() {
    let (service, _) = service();
    service.register_student(student("EEE/2025/010")).expect("student");

    assert!(matches!(
        service.register_student(student("EEE/2025/010")),
        Err(RecordsServiceError::Repository(RepositoryError::Conflict(_)))
    ));
}

#[test]
fn unknown_references_are_rejected() {
    let (service, _) = service();
    let student = service.register_student(student("EEE/2025/010")).expect("student");
    let semester = service.add_semester(semester("First", 1, false)).expect("semester");

    let outcome = service.record_result(NewResult {
        student_id: student.id,
        course_id: gradebook::records::CourseId::generate(),
        semester_id: semester.id,
        score: 70.0,
    });

    assert!(matches!(
        outcome,
        Err(RecordsServiceError::Repository(
            RepositoryError::UnknownReference(_)
        ))
    ));
}

#[test]
fn notified_flag_survives_score_updates() {
    let (service, store) = service();
    let student = service.register_student(student("EEE/2025/010")).expect("student");
    let course = service
        .add_course(NewCourse {
            code: "EEE101".to_string(),
            title: "Circuit Theory".to_string(),
            credit_units: 4,
        })
        .expect("course");
    let semester = service.add_semester(semester("First", 1, false)).expect("semester");
    let result = service
        .record_result(NewResult {
            student_id: student.id,
            course_id: course.id,
            semester_id: semester.id,
            score: 52.0,
        })
        .expect("result");

    store.mark_notified(result.id).expect("marked");
    let updated = service.update_score(result.id, 61.0).expect("score updated");
    assert!(updated.notified);

    let stored = store
        .fetch_result(result.id)
        .expect("fetch")
        .expect("present");
    assert!(stored.notified);
    assert_eq!(stored.grade_point, 3.0);
    assert!(store
        .list_result_details(ResultFilter::pending())
        .expect("pending")
        .is_empty());
}

#[test]
fn only_one_semester_is_current() {
    let (service, store) = service();
    let first = service.add_semester(semester("First", 1, true)).expect("semester");
    let second = service.add_semester(semester("Second", 6, true)).expect("semester");

    let semesters = store.list_semesters().expect("list");
    assert_eq!(
        semesters.iter().map(|s| (s.id, s.is_current)).collect::<Vec<_>>(),
        vec![(first.id, false), (second.id, true)]
    );

    service.set_current_semester(first.id).expect("promoted");
    let current: Vec<_> = store
        .list_semesters()
        .expect("list")
        .into_iter()
        .filter(|s| s.is_current)
        .map(|s| s.id)
        .collect();
    assert_eq!(current, vec![first.id]);
}

#[test]
fn deleting_a_student_cascades() {
    let (service, store) = service();
    let student = service.register_student(student("EEE/2025/010")).expect("student");
    let course = service
        .add_course(NewCourse {
            code: "EEE101".to_string(),
            title: "Circuit Theory".to_string(),
            credit_units: 4,
        })
        .expect("course");
    let semester = service.add_semester(semester("First", 1, false)).expect("semester");
    service
        .record_result(NewResult {
            student_id: student.id,
            course_id: course.id,
            semester_id: semester.id,
            score: 77.0,
        })
        .expect("result");
    service
        .close_semester(student.id, semester.id)
        .expect("semester closes");

    service.remove_student(student.id).expect("removed");

    assert!(store.fetch_student(student.id).expect("fetch").is_none());
    assert!(store
        .list_result_details(ResultFilter::default())
        .expect("list")
        .is_empty());
    assert!(store.list_cgpa_records().expect("list").is_empty());
    assert_eq!(store.list_courses().expect("list").len(), 1);
}

#[test]
fn records_persist_across_reopen() {
    let path = std::env::temp_dir().join(format!("gradebook-{}.db", uuid::Uuid::new_v4()));
    {
        let store = Arc::new(SqliteRecordStore::open(&path).expect("sqlite opens"));
        RecordsService::new(store)
            .register_student(student("EEE/2025/011"))
            .expect("student");
    }

    let reopened = SqliteRecordStore::open(&path).expect("sqlite reopens");
    let found = reopened
        .fetch_student_by_code("EEE/2025/011")
        .expect("fetch")
        .expect("student persisted");
    assert_eq!(found.first_name, "Ngozi");

    drop(reopened);
    let _ = std::fs::remove_file(&path);
}
