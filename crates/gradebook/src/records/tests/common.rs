use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::NaiveDate;
use serde_json::Value;

use crate::records::domain::{
    CgpaRecord, Course, CourseId, ExamResult, NewCourse, NewResult, NewSemester, NewStudent,
    ResultDetail, ResultFilter, ResultId, Semester, SemesterId, Student, StudentId,
};
use crate::records::repository::{RecordStore, RepositoryError, SmsTransport, TransportError};
use crate::records::{records_router, AccessPolicy, InMemoryRecordStore, RecordsApi, RecordsService};

pub(super) fn new_student(code: &str, first_name: &str, phone_number: &str) -> NewStudent {
    NewStudent {
        student_code: code.to_string(),
        first_name: first_name.to_string(),
        last_name: "Okafor".to_string(),
        email: format!("{}@students.example.edu", code.to_ascii_lowercase()),
        phone_number: phone_number.to_string(),
        program: "Computer Science".to_string(),
        year_of_study: 2,
    }
}

pub(super) fn new_course(code: &str, credit_units: u32) -> NewCourse {
    NewCourse {
        code: code.to_string(),
        title: format!("{code} lectures"),
        credit_units,
    }
}

pub(super) fn new_semester(name: &str, year: i32, start_month: u32) -> NewSemester {
    NewSemester {
        name: name.to_string(),
        year,
        start_date: NaiveDate::from_ymd_opt(year, start_month, 1).expect("valid start"),
        end_date: NaiveDate::from_ymd_opt(year, start_month + 3, 28).expect("valid end"),
        is_current: false,
    }
}

pub(super) fn build_service() -> (RecordsService<InMemoryRecordStore>, Arc<InMemoryRecordStore>) {
    let store = Arc::new(InMemoryRecordStore::default());
    let service = RecordsService::new(store.clone());
    (service, store)
}

/// One student, two courses (3 and 2 credit units) and two consecutive semesters.
pub(super) struct Enrolment {
    pub(super) student: Student,
    pub(super) maths: Course,
    pub(super) physics: Course,
    pub(super) first: Semester,
    pub(super) second: Semester,
}

impl Enrolment {
    pub(super) fn seed<S: RecordStore + 'static>(service: &RecordsService<S>) -> Self {
        Self {
            student: service
                .register_student(new_student("CSC/2021/001", "Ada", "+2348030000001"))
                .expect("student registers"),
            maths: service
                .add_course(new_course("mth101", 3))
                .expect("course added"),
            physics: service
                .add_course(new_course("phy101", 2))
                .expect("course added"),
            first: service
                .add_semester(new_semester("First", 2023, 1))
                .expect("semester added"),
            second: service
                .add_semester(new_semester("Second", 2023, 6))
                .expect("semester added"),
        }
    }

    pub(super) fn result(&self, course: &Course, semester: &Semester, score: f64) -> NewResult {
        NewResult {
            student_id: self.student.id,
            course_id: course.id,
            semester_id: semester.id,
            score,
        }
    }
}

/// Transport that remembers every message it accepted.
#[derive(Default, Clone)]
pub(super) struct MemoryTransport {
    sent: Arc<Mutex<Vec<(String, String)>>>,
}

impl MemoryTransport {
    pub(super) fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().expect("transport mutex poisoned").clone()
    }
}

impl SmsTransport for MemoryTransport {
    fn send(&self, destination_phone: &str, message: &str) -> Result<(), TransportError> {
        self.sent
            .lock()
            .expect("transport mutex poisoned")
            .push((destination_phone.to_string(), message.to_string()));
        Ok(())
    }
}

/// Transport that rejects a configurable set of destinations.
#[derive(Default, Clone)]
pub(super) struct FlakyTransport {
    failing: Arc<Mutex<HashSet<String>>>,
    attempts: Arc<Mutex<Vec<String>>>,
}

impl FlakyTransport {
    pub(super) fn failing_for(destination: &str) -> Self {
        let transport = Self::default();
        transport
            .failing
            .lock()
            .expect("transport mutex poisoned")
            .insert(destination.to_string());
        transport
    }

    pub(super) fn recover(&self) {
        self.failing.lock().expect("transport mutex poisoned").clear();
    }

    pub(super) fn attempts(&self) -> Vec<String> {
        self.attempts.lock().expect("transport mutex poisoned").clone()
    }
}

impl SmsTransport for FlakyTransport {
    fn send(&self, destination_phone: &str, _message: &str) -> Result<(), TransportError> {
        self.attempts
            .lock()
            .expect("transport mutex poisoned")
            .push(destination_phone.to_string());
        if self
            .failing
            .lock()
            .expect("transport mutex poisoned")
            .contains(destination_phone)
        {
            return Err(TransportError::Unavailable("gateway timeout".to_string()));
        }
        Ok(())
    }
}

pub(super) struct UnavailableStore;

fn offline<T>() -> Result<T, RepositoryError> {
    Err(RepositoryError::Unavailable("database offline".to_string()))
}

impl RecordStore for UnavailableStore {
    fn insert_student(&self, _student: Student) -> Result<Student, RepositoryError> {
        offline()
    }
    fn update_student(&self, _student: Student) -> Result<(), RepositoryError> {
        offline()
    }
    fn fetch_student(&self, _id: StudentId) -> Result<Option<Student>, RepositoryError> {
        offline()
    }
    fn fetch_student_by_code(&self, _code: &str) -> Result<Option<Student>, RepositoryError> {
        offline()
    }
    fn list_students(&self) -> Result<Vec<Student>, RepositoryError> {
        offline()
    }
    fn delete_student(&self, _id: StudentId) -> Result<(), RepositoryError> {
        offline()
    }
    fn insert_course(&self, _course: Course) -> Result<Course, RepositoryError> {
        offline()
    }
    fn update_course(&self, _course: Course) -> Result<(), RepositoryError> {
        offline()
    }
    fn fetch_course(&self, _id: CourseId) -> Result<Option<Course>, RepositoryError> {
        offline()
    }
    fn fetch_course_by_code(&self, _code: &str) -> Result<Option<Course>, RepositoryError> {
        offline()
    }
    fn list_courses(&self) -> Result<Vec<Course>, RepositoryError> {
        offline()
    }
    fn insert_semester(&self, _semester: Semester) -> Result<Semester, RepositoryError> {
        offline()
    }
    fn update_semester(&self, _semester: Semester) -> Result<(), RepositoryError> {
        offline()
    }
    fn fetch_semester(&self, _id: SemesterId) -> Result<Option<Semester>, RepositoryError> {
        offline()
    }
    fn list_semesters(&self) -> Result<Vec<Semester>, RepositoryError> {
        offline()
    }
    fn mark_current_semester(&self, _id: SemesterId) -> Result<Semester, RepositoryError> {
        offline()
    }
    fn insert_result(&self, _result: ExamResult) -> Result<ExamResult, RepositoryError> {
        offline()
    }
    fn update_result(&self, _result: ExamResult) -> Result<(), RepositoryError> {
        offline()
    }
    fn fetch_result(&self, _id: ResultId) -> Result<Option<ExamResult>, RepositoryError> {
        offline()
    }
    fn fetch_result_detail(&self, _id: ResultId) -> Result<Option<ResultDetail>, RepositoryError> {
        offline()
    }
    fn list_result_details(
        &self,
        _filter: ResultFilter,
    ) -> Result<Vec<ResultDetail>, RepositoryError> {
        offline()
    }
    fn mark_notified(&self, _id: ResultId) -> Result<(), RepositoryError> {
        offline()
    }
    fn insert_cgpa_record(&self, _record: CgpaRecord) -> Result<CgpaRecord, RepositoryError> {
        offline()
    }
    fn cgpa_history(&self, _student_id: StudentId) -> Result<Vec<CgpaRecord>, RepositoryError> {
        offline()
    }
    fn list_cgpa_records(&self) -> Result<Vec<CgpaRecord>, RepositoryError> {
        offline()
    }
}

pub(super) fn build_api(
    access: AccessPolicy,
) -> (
    Arc<RecordsApi<InMemoryRecordStore, MemoryTransport>>,
    Arc<InMemoryRecordStore>,
    MemoryTransport,
) {
    let store = Arc::new(InMemoryRecordStore::default());
    let transport = MemoryTransport::default();
    let api = Arc::new(RecordsApi::new(
        store.clone(),
        Arc::new(transport.clone()),
        access,
    ));
    (api, store, transport)
}

pub(super) fn router_with_api(
    api: Arc<RecordsApi<InMemoryRecordStore, MemoryTransport>>,
) -> axum::Router {
    records_router(api)
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
