use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::access::{AccessDenied, Capability};
use super::domain::{NewResult, ResultId, Semester};
use super::repository::{RecordStore, RepositoryError};
use super::service::{RecordsService, RecordsServiceError};

/// Row-level problem encountered while importing a results sheet.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportIssue {
    /// 1-based data row, not counting the header.
    pub row: usize,
    pub reason: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ImportReport {
    pub imported: Vec<ResultId>,
    pub issues: Vec<ImportIssue>,
}

#[derive(Debug)]
pub enum ResultImportError {
    Io(std::io::Error),
    Csv(csv::Error),
    Access(AccessDenied),
    Repository(RepositoryError),
}

impl std::fmt::Display for ResultImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResultImportError::Io(err) => write!(f, "failed to read results sheet: {}", err),
            ResultImportError::Csv(err) => write!(f, "invalid results CSV data: {}", err),
            ResultImportError::Access(err) => write!(f, "{}", err),
            ResultImportError::Repository(err) => {
                write!(f, "could not resolve results sheet references: {}", err)
            }
        }
    }
}

impl std::error::Error for ResultImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ResultImportError::Io(err) => Some(err),
            ResultImportError::Csv(err) => Some(err),
            ResultImportError::Access(err) => Some(err),
            ResultImportError::Repository(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for ResultImportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for ResultImportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

impl From<AccessDenied> for ResultImportError {
    fn from(err: AccessDenied) -> Self {
        Self::Access(err)
    }
}

impl From<RepositoryError> for ResultImportError {
    fn from(err: RepositoryError) -> Self {
        Self::Repository(err)
    }
}

#[derive(Debug, Deserialize)]
struct ResultRow {
    student_code: String,
    course_code: String,
    semester_name: String,
    semester_year: i32,
    score: f64,
}

/// Bulk entry of results from a CSV sheet with the columns
/// `student_code,course_code,semester_name,semester_year,score`.
pub struct ResultImporter;

impl ResultImporter {
    pub fn from_path<S, P>(
        service: &RecordsService<S>,
        path: P,
    ) -> Result<ImportReport, ResultImportError>
    where
        S: RecordStore + 'static,
        P: AsRef<Path>,
    {
        let file = std::fs::File::open(path)?;
        Self::from_reader(service, file)
    }

    /// The whole sheet is parsed before any write so a malformed file records nothing.
    pub fn from_reader<S, R>(
        service: &RecordsService<S>,
        reader: R,
    ) -> Result<ImportReport, ResultImportError>
    where
        S: RecordStore + 'static,
        R: Read,
    {
        service.access().authorize(Capability::RecordResults)?;

        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);
        let rows = csv_reader
            .deserialize::<ResultRow>()
            .collect::<Result<Vec<_>, _>>()?;

        let store = service.store();
        let semesters = store.list_semesters()?;
        let mut report = ImportReport::default();

        for (index, row) in rows.into_iter().enumerate() {
            let row_number = index + 1;
            match Self::import_row(service, &semesters, row) {
                Ok(id) => report.imported.push(id),
                Err(reason) => {
                    warn!(row = row_number, %reason, "results sheet row skipped");
                    report.issues.push(ImportIssue {
                        row: row_number,
                        reason,
                    });
                }
            }
        }

        info!(
            imported = report.imported.len(),
            skipped = report.issues.len(),
            "results sheet imported"
        );
        Ok(report)
    }

    fn import_row<S>(
        service: &RecordsService<S>,
        semesters: &[Semester],
        row: ResultRow,
    ) -> Result<ResultId, String>
    where
        S: RecordStore + 'static,
    {
        let store = service.store();
        let student = store
            .fetch_student_by_code(&row.student_code)
            .map_err(|err| err.to_string())?
            .ok_or_else(|| format!("unknown student code '{}'", row.student_code))?;
        let course = store
            .fetch_course_by_code(&row.course_code.to_ascii_uppercase())
            .map_err(|err| err.to_string())?
            .ok_or_else(|| format!("unknown course code '{}'", row.course_code))?;
        let mut matches = semesters.iter().filter(|semester| {
            semester.year == row.semester_year
                && semester.name.eq_ignore_ascii_case(&row.semester_name)
        });
        let semester = match (matches.next(), matches.next()) {
            (Some(semester), None) => semester,
            (Some(_), Some(_)) => {
                return Err(format!(
                    "semester '{} {}' matches more than one semester",
                    row.semester_name, row.semester_year
                ))
            }
            (None, _) => {
                return Err(format!(
                    "unknown semester '{} {}'",
                    row.semester_name, row.semester_year
                ))
            }
        };

        let entry = NewResult {
            student_id: student.id,
            course_id: course.id,
            semester_id: semester.id,
            score: row.score,
        };

        match service.record_result(entry) {
            Ok(result) => Ok(result.id),
            Err(RecordsServiceError::Repository(RepositoryError::Conflict(_))) => Err(format!(
                "a result for {} in {} {} already exists",
                course.code, semester.name, semester.year
            )),
            Err(err) => Err(err.to_string()),
        }
    }
}
