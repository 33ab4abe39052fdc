use super::common::*;
use std::sync::Arc;

use crate::records::advisory::{RiskLevel, Trend, DECLINE_WARNING};
use crate::records::repository::{RecordStore, RepositoryError};
use crate::records::{
    AccessDenied, AccessPolicy, Capability, HonoursClass, LetterGrade, RecordsService,
    RecordsServiceError, ResultFilter, ValidationError,
};

#[test]
fn record_result_derives_grade_from_score() {
    let (service, _) = build_service();
    let enrolment = Enrolment::seed(&service);

    let result = service
        .record_result(enrolment.result(&enrolment.maths, &enrolment.first, 72.0))
        .expect("result recorded");

    assert_eq!(result.grade, LetterGrade::A);
    assert_eq!(result.grade_point, 4.0);
    assert!(!result.notified);
}

#[test]
fn record_result_rejects_scores_outside_range_before_writing() {
    let (service, store) = build_service();
    let enrolment = Enrolment::seed(&service);

    match service.record_result(enrolment.result(&enrolment.maths, &enrolment.first, 100.5)) {
        Err(RecordsServiceError::Validation(ValidationError::ScoreOutOfRange { .. })) => {}
        other => panic!("expected score validation error, got {other:?}"),
    }
    assert!(store
        .list_result_details(ResultFilter::default())
        .expect("list succeeds")
        .is_empty());
}

#[test]
fn duplicate_result_for_same_course_and_semester_conflicts() {
    let (service, _) = build_service();
    let enrolment = Enrolment::seed(&service);
    service
        .record_result(enrolment.result(&enrolment.maths, &enrolment.first, 64.0))
        .expect("first result recorded");

    match service.record_result(enrolment.result(&enrolment.maths, &enrolment.first, 80.0)) {
        Err(RecordsServiceError::Repository(RepositoryError::Conflict(_))) => {}
        other => panic!("expected conflict, got {other:?}"),
    }
}

#[test]
fn result_for_unknown_course_is_an_unknown_reference() {
    let (service, _) = build_service();
    let enrolment = Enrolment::seed(&service);
    let mut entry = enrolment.result(&enrolment.maths, &enrolment.first, 64.0);
    entry.course_id = crate::records::CourseId::generate();

    assert!(matches!(
        service.record_result(entry),
        Err(RecordsServiceError::Repository(
            RepositoryError::UnknownReference(_)
        ))
    ));
}

#[test]
fn changing_a_score_recomputes_grade_and_grade_point() {
    let (service, _) = build_service();
    let enrolment = Enrolment::seed(&service);
    let result = service
        .record_result(enrolment.result(&enrolment.maths, &enrolment.first, 72.0))
        .expect("result recorded");

    let updated = service
        .update_score(result.id, 48.0)
        .expect("score updated");
    assert_eq!(updated.grade, LetterGrade::D);
    assert_eq!(updated.grade_point, 1.0);

    let stored = service.result(result.id).expect("result present");
    assert_eq!(stored.result.score, 48.0);
    assert_eq!(stored.result.grade, LetterGrade::D);
}

#[test]
fn cumulative_gpa_is_credit_weighted_across_semesters() {
    let (service, _) = build_service();
    let e = Enrolment::seed(&service);
    for entry in [
        e.result(&e.maths, &e.first, 72.0),
        e.result(&e.physics, &e.first, 55.0),
        e.result(&e.physics, &e.second, 45.0),
        e.result(&e.maths, &e.second, 65.0),
    ] {
        service.record_result(entry).expect("result recorded");
    }

    let first = service
        .close_semester(e.student.id, e.first.id)
        .expect("first semester closes");
    assert_eq!(first.semester_gpa, 3.2);
    assert_eq!(first.cumulative_gpa, 3.2);
    assert_eq!(first.total_credit_units, 5);

    let second = service
        .close_semester(e.student.id, e.second.id)
        .expect("second semester closes");
    assert_eq!(second.semester_gpa, 2.2);
    assert_eq!(second.cumulative_gpa, 2.7);
    assert_eq!(second.total_credit_units, 10);

    let history = service.cgpa_history(e.student.id).expect("history loads");
    assert_eq!(history, vec![first, second]);
}

#[test]
fn closing_a_semester_without_results_is_rejected() {
    let (service, _) = build_service();
    let e = Enrolment::seed(&service);

    match service.close_semester(e.student.id, e.first.id) {
        Err(RecordsServiceError::Validation(ValidationError::NoResultsForSemester {
            semester,
        })) => assert_eq!(semester, "First 2023"),
        other => panic!("expected missing results error, got {other:?}"),
    }
}

#[test]
fn closing_the_same_semester_twice_conflicts() {
    let (service, _) = build_service();
    let e = Enrolment::seed(&service);
    service
        .record_result(e.result(&e.maths, &e.first, 61.0))
        .expect("result recorded");
    service
        .close_semester(e.student.id, e.first.id)
        .expect("semester closes");

    assert!(matches!(
        service.close_semester(e.student.id, e.first.id),
        Err(RecordsServiceError::Repository(RepositoryError::Conflict(_)))
    ));
}

#[test]
fn standing_combines_classification_and_advisory() {
    let (service, _) = build_service();
    let e = Enrolment::seed(&service);
    for entry in [
        e.result(&e.maths, &e.first, 72.0),
        e.result(&e.physics, &e.first, 55.0),
        e.result(&e.physics, &e.second, 45.0),
        e.result(&e.maths, &e.second, 65.0),
    ] {
        service.record_result(entry).expect("result recorded");
    }
    service
        .close_semester(e.student.id, e.first.id)
        .expect("first semester closes");
    service
        .close_semester(e.student.id, e.second.id)
        .expect("second semester closes");

    let standing = service.standing(e.student.id).expect("standing computed");

    assert_eq!(standing.cgpa, 2.7);
    assert_eq!(standing.classification, HonoursClass::SecondClassLower);
    assert_eq!(
        standing.classification_label,
        "Second Class Honours (Lower Division)"
    );
    assert_eq!(standing.advisory.risk_level, RiskLevel::Low);
    assert_eq!(standing.advisory.trend, Trend::Down);
    assert_eq!(
        standing.advisory.recommendations.last().map(String::as_str),
        Some(DECLINE_WARNING)
    );
    assert_eq!(standing.history.len(), 2);
}

#[test]
fn standing_before_any_closed_semester_uses_recorded_results() {
    let (service, _) = build_service();
    let e = Enrolment::seed(&service);
    service
        .record_result(e.result(&e.maths, &e.first, 35.0))
        .expect("result recorded");

    let standing = service.standing(e.student.id).expect("standing computed");
    assert_eq!(standing.cgpa, 0.0);
    assert_eq!(standing.total_credit_units, 3);
    assert_eq!(standing.classification, HonoursClass::Pass);
    assert_eq!(standing.advisory.risk_level, RiskLevel::High);
    assert_eq!(standing.advisory.trend, Trend::Stable);
    assert!(standing.history.is_empty());
}

#[test]
fn read_only_policy_rejects_writes_and_allows_reads() {
    let store = Arc::new(crate::records::InMemoryRecordStore::default());
    let writer = RecordsService::new(store.clone());
    let e = Enrolment::seed(&writer);
    let reader = RecordsService::with_access(store, AccessPolicy::read_only());

    match reader.register_student(new_student("CSC/2021/002", "Ben", "+2348030000002")) {
        Err(RecordsServiceError::Access(AccessDenied(Capability::ManageStudents))) => {}
        other => panic!("expected access denial, got {other:?}"),
    }
    assert!(matches!(
        reader.record_result(e.result(&e.maths, &e.first, 70.0)),
        Err(RecordsServiceError::Access(AccessDenied(
            Capability::RecordResults
        )))
    ));

    assert_eq!(reader.students().expect("reads allowed").len(), 1);
    assert_eq!(reader.courses().expect("reads allowed").len(), 2);
    assert!(reader.summary().is_ok());
}

#[test]
fn marking_a_semester_current_clears_the_flag_elsewhere() {
    let (service, _) = build_service();
    let mut current = new_semester("First", 2024, 1);
    current.is_current = true;
    let first = service.add_semester(current).expect("semester added");
    let second = service
        .add_semester(new_semester("Second", 2024, 6))
        .expect("semester added");
    assert!(first.is_current);

    let promoted = service
        .set_current_semester(second.id)
        .expect("semester promoted");
    assert!(promoted.is_current);

    let current: Vec<_> = service
        .semesters()
        .expect("semesters list")
        .into_iter()
        .filter(|semester| semester.is_current)
        .map(|semester| semester.id)
        .collect();
    assert_eq!(current, vec![second.id]);
}

#[test]
fn removing_a_student_cascades_to_results_and_records() {
    let (service, store) = build_service();
    let e = Enrolment::seed(&service);
    service
        .record_result(e.result(&e.maths, &e.first, 58.0))
        .expect("result recorded");
    service
        .close_semester(e.student.id, e.first.id)
        .expect("semester closes");

    service.remove_student(e.student.id).expect("student removed");

    assert!(matches!(
        service.student(e.student.id),
        Err(RecordsServiceError::Repository(RepositoryError::NotFound))
    ));
    assert!(store
        .list_result_details(ResultFilter::default())
        .expect("list succeeds")
        .is_empty());
    assert!(store.list_cgpa_records().expect("list succeeds").is_empty());
}

#[test]
fn summary_reflects_results_and_latest_cgpa() {
    let (service, _) = build_service();
    let e = Enrolment::seed(&service);
    service
        .record_result(e.result(&e.maths, &e.first, 75.0))
        .expect("result recorded");
    service
        .record_result(e.result(&e.physics, &e.first, 71.0))
        .expect("result recorded");
    service
        .close_semester(e.student.id, e.first.id)
        .expect("semester closes");

    let summary = service.summary().expect("summary computed");
    assert_eq!(summary.total_students, 1);
    assert_eq!(summary.total_courses, 2);
    assert_eq!(summary.total_results, 2);
    assert_eq!(summary.pending_results, 2);
    assert_eq!(summary.average_cgpa, 4.0);
    assert_eq!(summary.grade_histogram.get(&LetterGrade::A), Some(&2));
    assert_eq!(
        summary.honours_distribution[0].classification,
        HonoursClass::FirstClass
    );
}

#[test]
fn store_failures_surface_verbatim() {
    let service = RecordsService::new(Arc::new(UnavailableStore));

    match service.students() {
        Err(RecordsServiceError::Repository(RepositoryError::Unavailable(reason))) => {
            assert_eq!(reason, "database offline")
        }
        other => panic!("expected unavailable store, got {other:?}"),
    }
}
