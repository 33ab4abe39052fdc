//! Student records: grading, CGPA accumulation, advisory and result notifications.
//!
//! Every write goes through [`RecordsService`] (validation, access policy, grade derivation)
//! before reaching a [`RecordStore`]. Notifications drain unnotified results through an
//! [`SmsTransport`] and only flip the notified flag after a successful send.

pub mod access;
pub mod advisory;
pub mod domain;
pub mod grading;
pub mod import;
pub mod memory;
pub mod notifications;
pub mod report;
pub mod repository;
pub mod router;
pub mod service;
pub mod sqlite;
pub(crate) mod validation;

#[cfg(test)]
mod tests;

pub use access::{AccessDenied, AccessPolicy, Capability};
pub use advisory::{advise, Advisory, RiskLevel, Trend};
pub use domain::{
    CgpaRecord, CgpaRecordId, Course, CourseId, ExamResult, NewCourse, NewResult, NewSemester,
    NewStudent, ResultDetail, ResultFilter, ResultId, Semester, SemesterId, Student, StudentId,
};
pub use grading::{
    classify_cgpa, grade_for_score, GradeAssignment, HonoursClass, LetterGrade,
};
pub use import::{ImportIssue, ImportReport, ResultImportError, ResultImporter};
pub use memory::InMemoryRecordStore;
pub use notifications::{
    render_message, DispatchError, DispatchFailure, DispatchSummary, NotificationDispatcher,
    NotificationReceipt,
};
pub use report::{ClassificationPreview, GradePreview, RecordsSummary, StudentStanding};
pub use repository::{RecordStore, RepositoryError, SmsTransport, TransportError};
pub use router::{records_router, RecordsApi};
pub use service::{RecordsService, RecordsServiceError};
pub use sqlite::SqliteRecordStore;
pub use validation::ValidationError;
