use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::grading::LetterGrade;

macro_rules! record_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn generate() -> Self {
                Self(Uuid::new_v4())
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::Display::fmt(&self.0, f)
            }
        }
    };
}

record_id!(
    /// Identifier wrapper for enrolled students.
    StudentId
);
record_id!(
    /// Identifier wrapper for catalogue courses.
    CourseId
);
record_id!(
    /// Identifier wrapper for academic semesters.
    SemesterId
);
record_id!(
    /// Identifier wrapper for exam results.
    ResultId
);
record_id!(
    /// Identifier wrapper for per-semester CGPA records.
    CgpaRecordId
);

/// Administrative entry for a new student.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewStudent {
    pub student_code: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: String,
    pub program: String,
    pub year_of_study: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    pub id: StudentId,
    pub student_code: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone_number: String,
    pub program: String,
    pub year_of_study: u8,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Student {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }

    pub(crate) fn apply(&mut self, update: NewStudent, now: DateTime<Utc>) {
        self.student_code = update.student_code;
        self.first_name = update.first_name;
        self.last_name = update.last_name;
        self.email = update.email;
        self.phone_number = update.phone_number;
        self.program = update.program;
        self.year_of_study = update.year_of_study;
        self.updated_at = now;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewCourse {
    pub code: String,
    pub title: String,
    pub credit_units: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Course {
    pub id: CourseId,
    pub code: String,
    pub title: String,
    pub credit_units: u32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSemester {
    pub name: String,
    pub year: i32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub is_current: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Semester {
    pub id: SemesterId,
    pub name: String,
    pub year: i32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub is_current: bool,
    pub created_at: DateTime<Utc>,
}

impl Semester {
    /// Chronological ordering key shared by every store backend.
    pub fn chronology_key(&self) -> (NaiveDate, i32, &str) {
        (self.start_date, self.year, self.name.as_str())
    }

    pub fn label(&self) -> String {
        format!("{} {}", self.name, self.year)
    }
}

/// Raw score entry for a (student, course, semester) triple.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewResult {
    pub student_id: StudentId,
    pub course_id: CourseId,
    pub semester_id: SemesterId,
    pub score: f64,
}

/// Persisted exam result with its derived grade.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExamResult {
    pub id: ResultId,
    pub student_id: StudentId,
    pub course_id: CourseId,
    pub semester_id: SemesterId,
    pub score: f64,
    pub grade: LetterGrade,
    pub grade_point: f64,
    pub notified: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A result fetched together with the rows it references.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultDetail {
    pub result: ExamResult,
    pub student: Student,
    pub course: Course,
    pub semester: Semester,
}

/// Filters accepted when listing results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultFilter {
    #[serde(default)]
    pub student_id: Option<StudentId>,
    #[serde(default)]
    pub semester_id: Option<SemesterId>,
    #[serde(default)]
    pub notified: Option<bool>,
}

impl ResultFilter {
    pub fn pending() -> Self {
        Self {
            notified: Some(false),
            ..Self::default()
        }
    }

    pub fn for_student(student_id: StudentId) -> Self {
        Self {
            student_id: Some(student_id),
            ..Self::default()
        }
    }

    pub fn matches(&self, result: &ExamResult) -> bool {
        self.student_id.map_or(true, |id| id == result.student_id)
            && self.semester_id.map_or(true, |id| id == result.semester_id)
            && self.notified.map_or(true, |flag| flag == result.notified)
    }
}

/// Grade-point snapshot for one student at the close of a semester.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CgpaRecord {
    pub id: CgpaRecordId,
    pub student_id: StudentId,
    pub semester_id: SemesterId,
    pub semester_gpa: f64,
    pub cumulative_gpa: f64,
    pub total_credit_units: u32,
    pub created_at: DateTime<Utc>,
}
