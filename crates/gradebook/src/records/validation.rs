use super::domain::{NewCourse, NewResult, NewSemester, NewStudent};

/// Validation errors raised before any write reaches the store.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("{field} is required")]
    MissingField { field: &'static str },
    #[error("score must be between 0 and 100 (found {found})")]
    ScoreOutOfRange { found: f64 },
    #[error("CGPA must be between 0.0 and 4.0 (found {found})")]
    CgpaOutOfRange { found: f64 },
    #[error("email address '{0}' is malformed")]
    MalformedEmail(String),
    #[error("phone number '{0}' must contain 7 to 15 digits")]
    MalformedPhone(String),
    #[error("year of study must be at least 1")]
    InvalidYearOfStudy,
    #[error("credit units must be at least 1")]
    InvalidCreditUnits,
    #[error("semester must end on or after its start date")]
    SemesterDatesInverted,
    #[error("no results recorded for {semester} to compute a grade-point average from")]
    NoResultsForSemester { semester: String },
}

/// Guard that normalises inbound entries before they reach the store.
#[derive(Debug, Clone, Copy, Default)]
pub struct RecordGuard;

impl RecordGuard {
    pub fn student(&self, mut entry: NewStudent) -> Result<NewStudent, ValidationError> {
        entry.student_code = required("student_code", &entry.student_code)?;
        entry.first_name = required("first_name", &entry.first_name)?;
        entry.last_name = required("last_name", &entry.last_name)?;
        entry.email = required("email", &entry.email)?;
        entry.phone_number = required("phone_number", &entry.phone_number)?;
        entry.program = required("program", &entry.program)?;

        if !looks_like_email(&entry.email) {
            return Err(ValidationError::MalformedEmail(entry.email));
        }

        let digits = entry
            .phone_number
            .chars()
            .filter(|c| c.is_ascii_digit())
            .count();
        let allowed = entry
            .phone_number
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '+' | ' ' | '-' | '(' | ')'));
        if !allowed || !(7..=15).contains(&digits) {
            return Err(ValidationError::MalformedPhone(entry.phone_number));
        }

        if entry.year_of_study == 0 {
            return Err(ValidationError::InvalidYearOfStudy);
        }

        Ok(entry)
    }

    pub fn course(&self, mut entry: NewCourse) -> Result<NewCourse, ValidationError> {
        entry.code = required("code", &entry.code)?.to_ascii_uppercase();
        entry.title = required("title", &entry.title)?;
        if entry.credit_units == 0 {
            return Err(ValidationError::InvalidCreditUnits);
        }
        Ok(entry)
    }

    pub fn semester(&self, mut entry: NewSemester) -> Result<NewSemester, ValidationError> {
        entry.name = required("name", &entry.name)?;
        if entry.end_date < entry.start_date {
            return Err(ValidationError::SemesterDatesInverted);
        }
        Ok(entry)
    }

    pub fn result(&self, entry: NewResult) -> Result<NewResult, ValidationError> {
        self.score(entry.score)?;
        Ok(entry)
    }

    pub fn score(&self, score: f64) -> Result<f64, ValidationError> {
        if !score.is_finite() || !(0.0..=100.0).contains(&score) {
            return Err(ValidationError::ScoreOutOfRange { found: score });
        }
        Ok(score)
    }

    pub fn cgpa(&self, cgpa: f64) -> Result<f64, ValidationError> {
        if !cgpa.is_finite() || !(0.0..=4.0).contains(&cgpa) {
            return Err(ValidationError::CgpaOutOfRange { found: cgpa });
        }
        Ok(cgpa)
    }
}

fn required(field: &'static str, value: &str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::MissingField { field });
    }
    Ok(trimmed.to_string())
}

fn looks_like_email(value: &str) -> bool {
    match value.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !value.contains(char::is_whitespace)
        }
        None => false,
    }
}
