use super::domain::{
    CgpaRecord, Course, CourseId, ExamResult, ResultDetail, ResultFilter, ResultId, Semester,
    SemesterId, Student, StudentId,
};

/// Storage abstraction so the service and dispatcher can be exercised in isolation.
///
/// Each call is atomic on its own; nothing spans multiple calls. Backends enforce uniqueness
/// of student codes, course codes, results per (student, course, semester) and CGPA records
/// per (student, semester), and reject rows that reference missing parents.
pub trait RecordStore: Send + Sync {
    fn insert_student(&self, student: Student) -> Result<Student, RepositoryError>;
    fn update_student(&self, student: Student) -> Result<(), RepositoryError>;
    fn fetch_student(&self, id: StudentId) -> Result<Option<Student>, RepositoryError>;
    fn fetch_student_by_code(&self, code: &str) -> Result<Option<Student>, RepositoryError>;
    fn list_students(&self) -> Result<Vec<Student>, RepositoryError>;
    /// Removes the student together with their results and CGPA records.
    fn delete_student(&self, id: StudentId) -> Result<(), RepositoryError>;

    fn insert_course(&self, course: Course) -> Result<Course, RepositoryError>;
    fn update_course(&self, course: Course) -> Result<(), RepositoryError>;
    fn fetch_course(&self, id: CourseId) -> Result<Option<Course>, RepositoryError>;
    fn fetch_course_by_code(&self, code: &str) -> Result<Option<Course>, RepositoryError>;
    fn list_courses(&self) -> Result<Vec<Course>, RepositoryError>;

    fn insert_semester(&self, semester: Semester) -> Result<Semester, RepositoryError>;
    fn update_semester(&self, semester: Semester) -> Result<(), RepositoryError>;
    fn fetch_semester(&self, id: SemesterId) -> Result<Option<Semester>, RepositoryError>;
    /// Semesters in chronological order.
    fn list_semesters(&self) -> Result<Vec<Semester>, RepositoryError>;
    /// Flags `id` as the current semester and clears the flag everywhere else.
    fn mark_current_semester(&self, id: SemesterId) -> Result<Semester, RepositoryError>;

    fn insert_result(&self, result: ExamResult) -> Result<ExamResult, RepositoryError>;
    fn update_result(&self, result: ExamResult) -> Result<(), RepositoryError>;
    fn fetch_result(&self, id: ResultId) -> Result<Option<ExamResult>, RepositoryError>;
    fn fetch_result_detail(&self, id: ResultId) -> Result<Option<ResultDetail>, RepositoryError>;
    /// Matching results joined with their student, course and semester, oldest first.
    fn list_result_details(
        &self,
        filter: ResultFilter,
    ) -> Result<Vec<ResultDetail>, RepositoryError>;
    /// Flips the notified flag to true. The flag never reverts.
    fn mark_notified(&self, id: ResultId) -> Result<(), RepositoryError>;

    fn insert_cgpa_record(&self, record: CgpaRecord) -> Result<CgpaRecord, RepositoryError>;
    /// CGPA records of one student in semester chronology.
    fn cgpa_history(&self, student_id: StudentId) -> Result<Vec<CgpaRecord>, RepositoryError>;
    fn list_cgpa_records(&self) -> Result<Vec<CgpaRecord>, RepositoryError>;

    fn pending_notifications(&self) -> Result<Vec<ResultDetail>, RepositoryError> {
        self.list_result_details(ResultFilter::pending())
    }
}

/// Error enumeration for repository failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists: {0}")]
    Conflict(String),
    #[error("record not found")]
    NotFound,
    #[error("unknown {0} referenced")]
    UnknownReference(&'static str),
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

/// Outbound SMS hook. Delivery receipts are not modelled.
pub trait SmsTransport: Send + Sync {
    fn send(&self, destination_phone: &str, message: &str) -> Result<(), TransportError>;
}

/// SMS dispatch error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    #[error("sms transport unavailable: {0}")]
    Unavailable(String),
    #[error("destination {0} rejected by sms transport")]
    Rejected(String),
}
