use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::error;

use super::access::AccessPolicy;
use super::domain::{
    CourseId, NewCourse, NewResult, NewSemester, NewStudent, ResultFilter, ResultId, SemesterId,
    StudentId,
};
use super::grading::grade_for_score;
use super::import::{ResultImportError, ResultImporter};
use super::notifications::{DispatchError, NotificationDispatcher};
use super::report::{ClassificationPreview, GradePreview};
use super::repository::{RecordStore, RepositoryError, SmsTransport};
use super::service::{RecordsService, RecordsServiceError};
use super::validation::RecordGuard;

/// Shared handler state: the records service and the dispatcher over the same store.
pub struct RecordsApi<S, T> {
    pub records: RecordsService<S>,
    pub notifications: NotificationDispatcher<S, T>,
}

impl<S, T> RecordsApi<S, T>
where
    S: RecordStore + 'static,
    T: SmsTransport + 'static,
{
    pub fn new(store: Arc<S>, transport: Arc<T>, access: AccessPolicy) -> Self {
        Self {
            records: RecordsService::with_access(Arc::clone(&store), access.clone()),
            notifications: NotificationDispatcher::with_access(store, transport, access),
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct CloseSemesterRequest {
    pub semester_id: SemesterId,
}

#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
pub struct ScoreUpdate {
    pub score: f64,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct GradeQuery {
    pub score: f64,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ClassificationQuery {
    pub cgpa: f64,
}

/// Router builder exposing the student records and notification endpoints.
pub fn records_router<S, T>(api: Arc<RecordsApi<S, T>>) -> Router
where
    S: RecordStore + 'static,
    T: SmsTransport + 'static,
{
    Router::new()
        .route(
            "/api/v1/students",
            post(register_student::<S, T>).get(list_students::<S, T>),
        )
        .route(
            "/api/v1/students/:student_id",
            get(get_student::<S, T>)
                .put(update_student::<S, T>)
                .delete(delete_student::<S, T>),
        )
        .route(
            "/api/v1/students/:student_id/results",
            get(student_results::<S, T>),
        )
        .route(
            "/api/v1/students/:student_id/cgpa",
            post(close_semester::<S, T>).get(cgpa_history::<S, T>),
        )
        .route(
            "/api/v1/students/:student_id/standing",
            get(student_standing::<S, T>),
        )
        .route(
            "/api/v1/courses",
            post(add_course::<S, T>).get(list_courses::<S, T>),
        )
        .route(
            "/api/v1/courses/:course_id",
            get(get_course::<S, T>).put(update_course::<S, T>),
        )
        .route(
            "/api/v1/semesters",
            post(add_semester::<S, T>).get(list_semesters::<S, T>),
        )
        .route(
            "/api/v1/semesters/:semester_id",
            put(update_semester::<S, T>),
        )
        .route(
            "/api/v1/semesters/:semester_id/current",
            post(set_current_semester::<S, T>),
        )
        .route(
            "/api/v1/results",
            post(record_result::<S, T>).get(list_results::<S, T>),
        )
        .route("/api/v1/results/import", post(import_results::<S, T>))
        .route(
            "/api/v1/results/:result_id",
            get(get_result::<S, T>).put(update_score::<S, T>),
        )
        .route(
            "/api/v1/notifications/dispatch",
            post(dispatch_pending::<S, T>),
        )
        .route(
            "/api/v1/notifications/:result_id",
            post(notify_result::<S, T>),
        )
        .route("/api/v1/summary", get(summary::<S, T>))
        .route("/api/v1/grading/grade", get(grade_preview))
        .route("/api/v1/grading/classification", get(classification_preview))
        .with_state(api)
}

pub(crate) async fn register_student<S, T>(
    State(api): State<Arc<RecordsApi<S, T>>>,
    Json(entry): Json<NewStudent>,
) -> Response
where
    S: RecordStore + 'static,
    T: SmsTransport + 'static,
{
    blocking(api, move |api| {
        respond(StatusCode::CREATED, api.records.register_student(entry))
    })
    .await
}

pub(crate) async fn list_students<S, T>(State(api): State<Arc<RecordsApi<S, T>>>) -> Response
where
    S: RecordStore + 'static,
    T: SmsTransport + 'static,
{
    blocking(api, move |api| {
        respond(StatusCode::OK, api.records.students())
    })
    .await
}

pub(crate) async fn get_student<S, T>(
    State(api): State<Arc<RecordsApi<S, T>>>,
    Path(student_id): Path<StudentId>,
) -> Response
where
    S: RecordStore + 'static,
    T: SmsTransport + 'static,
{
    blocking(api, move |api| {
        respond(StatusCode::OK, api.records.student(student_id))
    })
    .await
}

pub(crate) async fn update_student<S, T>(
    State(api): State<Arc<RecordsApi<S, T>>>,
    Path(student_id): Path<StudentId>,
    Json(entry): Json<NewStudent>,
) -> Response
where
    S: RecordStore + 'static,
    T: SmsTransport + 'static,
{
    blocking(api, move |api| {
        respond(StatusCode::OK, api.records.update_student(student_id, entry))
    })
    .await
}

pub(crate) async fn delete_student<S, T>(
    State(api): State<Arc<RecordsApi<S, T>>>,
    Path(student_id): Path<StudentId>,
) -> Response
where
    S: RecordStore + 'static,
    T: SmsTransport + 'static,
{
    blocking(api, move |api| {
        match api.records.remove_student(student_id) {
            Ok(()) => StatusCode::NO_CONTENT.into_response(),
            Err(err) => service_failure(err),
        }
    })
    .await
}

pub(crate) async fn student_results<S, T>(
    State(api): State<Arc<RecordsApi<S, T>>>,
    Path(student_id): Path<StudentId>,
) -> Response
where
    S: RecordStore + 'static,
    T: SmsTransport + 'static,
{
    blocking(api, move |api| {
        let outcome = api
            .records
            .student(student_id)
            .and_then(|_| api.records.results(ResultFilter::for_student(student_id)));
        respond(StatusCode::OK, outcome)
    })
    .await
}

pub(crate) async fn close_semester<S, T>(
    State(api): State<Arc<RecordsApi<S, T>>>,
    Path(student_id): Path<StudentId>,
    Json(request): Json<CloseSemesterRequest>,
) -> Response
where
    S: RecordStore + 'static,
    T: SmsTransport + 'static,
{
    blocking(api, move |api| {
        respond(
            StatusCode::CREATED,
            api.records.close_semester(student_id, request.semester_id),
        )
    })
    .await
}

pub(crate) async fn cgpa_history<S, T>(
    State(api): State<Arc<RecordsApi<S, T>>>,
    Path(student_id): Path<StudentId>,
) -> Response
where
    S: RecordStore + 'static,
    T: SmsTransport + 'static,
{
    blocking(api, move |api| {
        respond(StatusCode::OK, api.records.cgpa_history(student_id))
    })
    .await
}

pub(crate) async fn student_standing<S, T>(
    State(api): State<Arc<RecordsApi<S, T>>>,
    Path(student_id): Path<StudentId>,
) -> Response
where
    S: RecordStore + 'static,
    T: SmsTransport + 'static,
{
    blocking(api, move |api| {
        respond(StatusCode::OK, api.records.standing(student_id))
    })
    .await
}

pub(crate) async fn add_course<S, T>(
    State(api): State<Arc<RecordsApi<S, T>>>,
    Json(entry): Json<NewCourse>,
) -> Response
where
    S: RecordStore + 'static,
    T: SmsTransport + 'static,
{
    blocking(api, move |api| {
        respond(StatusCode::CREATED, api.records.add_course(entry))
    })
    .await
}

pub(crate) async fn list_courses<S, T>(State(api): State<Arc<RecordsApi<S, T>>>) -> Response
where
    S: RecordStore + 'static,
    T: SmsTransport + 'static,
{
    blocking(api, move |api| {
        respond(StatusCode::OK, api.records.courses())
    })
    .await
}

pub(crate) async fn get_course<S, T>(
    State(api): State<Arc<RecordsApi<S, T>>>,
    Path(course_id): Path<CourseId>,
) -> Response
where
    S: RecordStore + 'static,
    T: SmsTransport + 'static,
{
    blocking(api, move |api| {
        respond(StatusCode::OK, api.records.course(course_id))
    })
    .await
}

pub(crate) async fn update_course<S, T>(
    State(api): State<Arc<RecordsApi<S, T>>>,
    Path(course_id): Path<CourseId>,
    Json(entry): Json<NewCourse>,
) -> Response
where
    S: RecordStore + 'static,
    T: SmsTransport + 'static,
{
    blocking(api, move |api| {
        respond(StatusCode::OK, api.records.update_course(course_id, entry))
    })
    .await
}

pub(crate) async fn add_semester<S, T>(
    State(api): State<Arc<RecordsApi<S, T>>>,
    Json(entry): Json<NewSemester>,
) -> Response
where
    S: RecordStore + 'static,
    T: SmsTransport + 'static,
{
    blocking(api, move |api| {
        respond(StatusCode::CREATED, api.records.add_semester(entry))
    })
    .await
}

pub(crate) async fn list_semesters<S, T>(State(api): State<Arc<RecordsApi<S, T>>>) -> Response
where
    S: RecordStore + 'static,
    T: SmsTransport + 'static,
{
    blocking(api, move |api| {
        respond(StatusCode::OK, api.records.semesters())
    })
    .await
}

pub(crate) async fn update_semester<S, T>(
    State(api): State<Arc<RecordsApi<S, T>>>,
    Path(semester_id): Path<SemesterId>,
    Json(entry): Json<NewSemester>,
) -> Response
where
    S: RecordStore + 'static,
    T: SmsTransport + 'static,
{
    blocking(api, move |api| {
        respond(
            StatusCode::OK,
            api.records.update_semester(semester_id, entry),
        )
    })
    .await
}

pub(crate) async fn set_current_semester<S, T>(
    State(api): State<Arc<RecordsApi<S, T>>>,
    Path(semester_id): Path<SemesterId>,
) -> Response
where
    S: RecordStore + 'static,
    T: SmsTransport + 'static,
{
    blocking(api, move |api| {
        respond(StatusCode::OK, api.records.set_current_semester(semester_id))
    })
    .await
}

pub(crate) async fn record_result<S, T>(
    State(api): State<Arc<RecordsApi<S, T>>>,
    Json(entry): Json<NewResult>,
) -> Response
where
    S: RecordStore + 'static,
    T: SmsTransport + 'static,
{
    blocking(api, move |api| {
        respond(StatusCode::CREATED, api.records.record_result(entry))
    })
    .await
}

pub(crate) async fn list_results<S, T>(
    State(api): State<Arc<RecordsApi<S, T>>>,
    Query(filter): Query<ResultFilter>,
) -> Response
where
    S: RecordStore + 'static,
    T: SmsTransport + 'static,
{
    blocking(api, move |api| {
        respond(StatusCode::OK, api.records.results(filter))
    })
    .await
}

pub(crate) async fn get_result<S, T>(
    State(api): State<Arc<RecordsApi<S, T>>>,
    Path(result_id): Path<ResultId>,
) -> Response
where
    S: RecordStore + 'static,
    T: SmsTransport + 'static,
{
    blocking(api, move |api| {
        respond(StatusCode::OK, api.records.result(result_id))
    })
    .await
}

pub(crate) async fn update_score<S, T>(
    State(api): State<Arc<RecordsApi<S, T>>>,
    Path(result_id): Path<ResultId>,
    Json(update): Json<ScoreUpdate>,
) -> Response
where
    S: RecordStore + 'static,
    T: SmsTransport + 'static,
{
    blocking(api, move |api| {
        respond(
            StatusCode::OK,
            api.records.update_score(result_id, update.score),
        )
    })
    .await
}

pub(crate) async fn import_results<S, T>(
    State(api): State<Arc<RecordsApi<S, T>>>,
    body: String,
) -> Response
where
    S: RecordStore + 'static,
    T: SmsTransport + 'static,
{
    blocking(api, move |api| {
        match ResultImporter::from_reader(&api.records, body.as_bytes()) {
            Ok(report) => (StatusCode::OK, Json(report)).into_response(),
            Err(err) => {
                let status = match &err {
                    ResultImportError::Access(_) => StatusCode::FORBIDDEN,
                    ResultImportError::Repository(inner) => repository_status(inner),
                    ResultImportError::Io(_) | ResultImportError::Csv(_) => StatusCode::BAD_REQUEST,
                };
                failure(status, err.to_string())
            }
        }
    })
    .await
}

pub(crate) async fn notify_result<S, T>(
    State(api): State<Arc<RecordsApi<S, T>>>,
    Path(result_id): Path<ResultId>,
) -> Response
where
    S: RecordStore + 'static,
    T: SmsTransport + 'static,
{
    blocking(api, move |api| {
        match api.notifications.notify(result_id) {
            Ok(receipt) => (StatusCode::OK, Json(receipt)).into_response(),
            Err(err) => dispatch_failure(err),
        }
    })
    .await
}

pub(crate) async fn dispatch_pending<S, T>(State(api): State<Arc<RecordsApi<S, T>>>) -> Response
where
    S: RecordStore + 'static,
    T: SmsTransport + 'static,
{
    blocking(api, move |api| {
        match api.notifications.notify_pending() {
            Ok(summary) => {
                let payload = json!({
                    "message": summary.message(),
                    "attempted": summary.attempted,
                    "succeeded": summary.succeeded,
                    "failed": summary.failed,
                    "failures": summary.failures,
                });
                (StatusCode::OK, Json(payload)).into_response()
            }
            Err(err) => dispatch_failure(err),
        }
    })
    .await
}

pub(crate) async fn summary<S, T>(State(api): State<Arc<RecordsApi<S, T>>>) -> Response
where
    S: RecordStore + 'static,
    T: SmsTransport + 'static,
{
    blocking(api, move |api| {
        respond(StatusCode::OK, api.records.summary())
    })
    .await
}

pub(crate) async fn grade_preview(Query(query): Query<GradeQuery>) -> Response {
    match RecordGuard.score(query.score) {
        Ok(score) => {
            let preview = GradePreview::new(score, grade_for_score(score));
            (StatusCode::OK, Json(preview)).into_response()
        }
        Err(err) => failure(StatusCode::UNPROCESSABLE_ENTITY, err.to_string()),
    }
}

pub(crate) async fn classification_preview(
    Query(query): Query<ClassificationQuery>,
) -> Response {
    match RecordGuard.cgpa(query.cgpa) {
        Ok(cgpa) => (StatusCode::OK, Json(ClassificationPreview::new(cgpa))).into_response(),
        Err(err) => failure(StatusCode::UNPROCESSABLE_ENTITY, err.to_string()),
    }
}

/// Store calls may touch disk, so handler work runs on the blocking pool.
async fn blocking<S, T, F>(api: Arc<RecordsApi<S, T>>, work: F) -> Response
where
    S: RecordStore + 'static,
    T: SmsTransport + 'static,
    F: FnOnce(&RecordsApi<S, T>) -> Response + Send + 'static,
{
    match tokio::task::spawn_blocking(move || work(&api)).await {
        Ok(response) => response,
        Err(err) => {
            error!(error = %err, "records handler task failed");
            failure(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
        }
    }
}

fn respond<V: Serialize>(status: StatusCode, outcome: Result<V, RecordsServiceError>) -> Response {
    match outcome {
        Ok(value) => (status, Json(value)).into_response(),
        Err(err) => service_failure(err),
    }
}

fn service_failure(err: RecordsServiceError) -> Response {
    let status = match &err {
        RecordsServiceError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        RecordsServiceError::Access(_) => StatusCode::FORBIDDEN,
        RecordsServiceError::Repository(inner) => repository_status(inner),
    };
    failure(status, err.to_string())
}

fn dispatch_failure(err: DispatchError) -> Response {
    let status = match &err {
        DispatchError::Access(_) => StatusCode::FORBIDDEN,
        DispatchError::Repository(inner) => repository_status(inner),
        DispatchError::Transport(_) => StatusCode::BAD_GATEWAY,
        DispatchError::AlreadyNotified(_) => StatusCode::CONFLICT,
    };
    failure(status, err.to_string())
}

fn repository_status(err: &RepositoryError) -> StatusCode {
    match err {
        RepositoryError::Conflict(_) => StatusCode::CONFLICT,
        RepositoryError::NotFound => StatusCode::NOT_FOUND,
        RepositoryError::UnknownReference(_) => StatusCode::UNPROCESSABLE_ENTITY,
        RepositoryError::Unavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn failure(status: StatusCode, message: String) -> Response {
    let payload = json!({
        "error": message,
    });
    (status, Json(payload)).into_response()
}
