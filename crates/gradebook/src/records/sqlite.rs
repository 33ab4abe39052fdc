use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::types::Type;
use rusqlite::{ffi, params, Connection, ErrorCode, OptionalExtension, Row};
use tracing::debug;
use uuid::Uuid;

use super::domain::{
    CgpaRecord, CgpaRecordId, Course, CourseId, ExamResult, ResultDetail, ResultFilter, ResultId,
    Semester, SemesterId, Student, StudentId,
};
use super::grading::LetterGrade;
use super::repository::{RecordStore, RepositoryError};

const SCHEMA_SQL: &str = "
CREATE TABLE IF NOT EXISTS students(
    id BLOB PRIMARY KEY,
    student_code TEXT NOT NULL UNIQUE,
    first_name TEXT NOT NULL,
    last_name TEXT NOT NULL,
    email TEXT NOT NULL,
    phone_number TEXT NOT NULL,
    program TEXT NOT NULL,
    year_of_study INTEGER NOT NULL CHECK (year_of_study > 0),
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS courses(
    id BLOB PRIMARY KEY,
    code TEXT NOT NULL UNIQUE,
    title TEXT NOT NULL,
    credit_units INTEGER NOT NULL CHECK (credit_units > 0),
    created_at TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS semesters(
    id BLOB PRIMARY KEY,
    name TEXT NOT NULL,
    year INTEGER NOT NULL,
    start_date TEXT NOT NULL,
    end_date TEXT NOT NULL,
    is_current INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL
);
CREATE TABLE IF NOT EXISTS results(
    id BLOB PRIMARY KEY,
    student_id BLOB NOT NULL,
    course_id BLOB NOT NULL,
    semester_id BLOB NOT NULL,
    score REAL NOT NULL CHECK (score >= 0 AND score <= 100),
    grade TEXT NOT NULL,
    grade_point REAL NOT NULL CHECK (grade_point >= 0 AND grade_point <= 4),
    notified INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    UNIQUE(student_id, course_id, semester_id),
    FOREIGN KEY(student_id) REFERENCES students(id) ON DELETE CASCADE,
    FOREIGN KEY(course_id) REFERENCES courses(id) ON DELETE CASCADE,
    FOREIGN KEY(semester_id) REFERENCES semesters(id) ON DELETE CASCADE
);
CREATE INDEX IF NOT EXISTS idx_results_student ON results(student_id);
CREATE INDEX IF NOT EXISTS idx_results_pending ON results(notified);
CREATE TABLE IF NOT EXISTS cgpa_records(
    id BLOB PRIMARY KEY,
    student_id BLOB NOT NULL,
    semester_id BLOB NOT NULL,
    semester_gpa REAL NOT NULL,
    cumulative_gpa REAL NOT NULL,
    total_credit_units INTEGER NOT NULL,
    created_at TEXT NOT NULL,
    UNIQUE(student_id, semester_id),
    FOREIGN KEY(student_id) REFERENCES students(id) ON DELETE CASCADE,
    FOREIGN KEY(semester_id) REFERENCES semesters(id) ON DELETE CASCADE
);
CREATE INDEX IF NOT EXISTS idx_cgpa_records_student ON cgpa_records(student_id);
";

const STUDENT_COLUMNS: &str = "s.id, s.student_code, s.first_name, s.last_name, s.email, \
     s.phone_number, s.program, s.year_of_study, s.created_at, s.updated_at";
const COURSE_COLUMNS: &str = "c.id, c.code, c.title, c.credit_units, c.created_at";
const SEMESTER_COLUMNS: &str =
    "sem.id, sem.name, sem.year, sem.start_date, sem.end_date, sem.is_current, sem.created_at";
const RESULT_COLUMNS: &str = "r.id, r.student_id, r.course_id, r.semester_id, r.score, r.grade, \
     r.grade_point, r.notified, r.created_at, r.updated_at";
const CGPA_COLUMNS: &str = "g.id, g.student_id, g.semester_id, g.semester_gpa, g.cumulative_gpa, \
     g.total_credit_units, g.created_at";

const STUDENT_WIDTH: usize = 10;
const COURSE_WIDTH: usize = 5;
const RESULT_WIDTH: usize = 10;

/// SQLite-backed store. One connection guarded by a mutex; every trait call is one statement
/// or one short read sequence under the same lock.
pub struct SqliteRecordStore {
    db: Mutex<Connection>,
}

impl SqliteRecordStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, RepositoryError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)
                .map_err(|err| RepositoryError::Unavailable(err.to_string()))?;
        }
        let conn = Connection::open(path).map_err(map_sqlite_error)?;
        Self::initialise(conn)
    }

    pub fn open_in_memory() -> Result<Self, RepositoryError> {
        let conn = Connection::open_in_memory().map_err(map_sqlite_error)?;
        Self::initialise(conn)
    }

    fn initialise(conn: Connection) -> Result<Self, RepositoryError> {
        conn.execute("PRAGMA foreign_keys = ON", [])
            .map_err(map_sqlite_error)?;
        conn.execute_batch(SCHEMA_SQL).map_err(map_sqlite_error)?;
        debug!("sqlite record schema ready");
        Ok(Self {
            db: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, RepositoryError> {
        self.db
            .lock()
            .map_err(|_| RepositoryError::Unavailable("sqlite connection mutex poisoned".to_string()))
    }
}

impl std::fmt::Debug for SqliteRecordStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteRecordStore").finish_non_exhaustive()
    }
}

impl RecordStore for SqliteRecordStore {
    fn insert_student(&self, student: Student) -> Result<Student, RepositoryError> {
        let db = self.conn()?;
        db.execute(
            "INSERT INTO students (id, student_code, first_name, last_name, email, phone_number,
                program, year_of_study, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                student.id.0,
                student.student_code,
                student.first_name,
                student.last_name,
                student.email,
                student.phone_number,
                student.program,
                student.year_of_study,
                student.created_at,
                student.updated_at,
            ],
        )
        .map_err(map_sqlite_error)?;
        Ok(student)
    }

    fn update_student(&self, student: Student) -> Result<(), RepositoryError> {
        let db = self.conn()?;
        let changed = db
            .execute(
                "UPDATE students SET student_code = ?2, first_name = ?3, last_name = ?4,
                    email = ?5, phone_number = ?6, program = ?7, year_of_study = ?8,
                    updated_at = ?9
                 WHERE id = ?1",
                params![
                    student.id.0,
                    student.student_code,
                    student.first_name,
                    student.last_name,
                    student.email,
                    student.phone_number,
                    student.program,
                    student.year_of_study,
                    student.updated_at,
                ],
            )
            .map_err(map_sqlite_error)?;
        expect_changed(changed)
    }

    fn fetch_student(&self, id: StudentId) -> Result<Option<Student>, RepositoryError> {
        let db = self.conn()?;
        db.query_row(
            &format!("SELECT {STUDENT_COLUMNS} FROM students s WHERE s.id = ?1"),
            [id.0],
            |row| student_from_row(row, 0),
        )
        .optional()
        .map_err(map_sqlite_error)
    }

    fn fetch_student_by_code(&self, code: &str) -> Result<Option<Student>, RepositoryError> {
        let db = self.conn()?;
        db.query_row(
            &format!("SELECT {STUDENT_COLUMNS} FROM students s WHERE s.student_code = ?1"),
            [code],
            |row| student_from_row(row, 0),
        )
        .optional()
        .map_err(map_sqlite_error)
    }

    fn list_students(&self) -> Result<Vec<Student>, RepositoryError> {
        let db = self.conn()?;
        let mut stmt = db
            .prepare(&format!(
                "SELECT {STUDENT_COLUMNS} FROM students s
                 ORDER BY s.last_name, s.first_name, s.student_code"
            ))
            .map_err(map_sqlite_error)?;
        let rows = stmt
            .query_map([], |row| student_from_row(row, 0))
            .map_err(map_sqlite_error)?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(map_sqlite_error)
    }

    fn delete_student(&self, id: StudentId) -> Result<(), RepositoryError> {
        let db = self.conn()?;
        let changed = db
            .execute("DELETE FROM students WHERE id = ?1", [id.0])
            .map_err(map_sqlite_error)?;
        expect_changed(changed)
    }

    fn insert_course(&self, course: Course) -> Result<Course, RepositoryError> {
        let db = self.conn()?;
        db.execute(
            "INSERT INTO courses (id, code, title, credit_units, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                course.id.0,
                course.code,
                course.title,
                course.credit_units,
                course.created_at,
            ],
        )
        .map_err(map_sqlite_error)?;
        Ok(course)
    }

    fn update_course(&self, course: Course) -> Result<(), RepositoryError> {
        let db = self.conn()?;
        let changed = db
            .execute(
                "UPDATE courses SET code = ?2, title = ?3, credit_units = ?4 WHERE id = ?1",
                params![course.id.0, course.code, course.title, course.credit_units],
            )
            .map_err(map_sqlite_error)?;
        expect_changed(changed)
    }

    fn fetch_course(&self, id: CourseId) -> Result<Option<Course>, RepositoryError> {
        let db = self.conn()?;
        db.query_row(
            &format!("SELECT {COURSE_COLUMNS} FROM courses c WHERE c.id = ?1"),
            [id.0],
            |row| course_from_row(row, 0),
        )
        .optional()
        .map_err(map_sqlite_error)
    }

    fn fetch_course_by_code(&self, code: &str) -> Result<Option<Course>, RepositoryError> {
        let db = self.conn()?;
        db.query_row(
            &format!("SELECT {COURSE_COLUMNS} FROM courses c WHERE c.code = ?1"),
            [code],
            |row| course_from_row(row, 0),
        )
        .optional()
        .map_err(map_sqlite_error)
    }

    fn list_courses(&self) -> Result<Vec<Course>, RepositoryError> {
        let db = self.conn()?;
        let mut stmt = db
            .prepare(&format!("SELECT {COURSE_COLUMNS} FROM courses c ORDER BY c.code"))
            .map_err(map_sqlite_error)?;
        let rows = stmt
            .query_map([], |row| course_from_row(row, 0))
            .map_err(map_sqlite_error)?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(map_sqlite_error)
    }

    fn insert_semester(&self, semester: Semester) -> Result<Semester, RepositoryError> {
        let db = self.conn()?;
        db.execute(
            "INSERT INTO semesters (id, name, year, start_date, end_date, is_current, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                semester.id.0,
                semester.name,
                semester.year,
                semester.start_date,
                semester.end_date,
                semester.is_current,
                semester.created_at,
            ],
        )
        .map_err(map_sqlite_error)?;
        Ok(semester)
    }

    fn update_semester(&self, semester: Semester) -> Result<(), RepositoryError> {
        let db = self.conn()?;
        let changed = db
            .execute(
                "UPDATE semesters SET name = ?2, year = ?3, start_date = ?4, end_date = ?5,
                    is_current = ?6
                 WHERE id = ?1",
                params![
                    semester.id.0,
                    semester.name,
                    semester.year,
                    semester.start_date,
                    semester.end_date,
                    semester.is_current,
                ],
            )
            .map_err(map_sqlite_error)?;
        expect_changed(changed)
    }

    fn fetch_semester(&self, id: SemesterId) -> Result<Option<Semester>, RepositoryError> {
        let db = self.conn()?;
        fetch_semester_with(&db, id)
    }

    fn list_semesters(&self) -> Result<Vec<Semester>, RepositoryError> {
        let db = self.conn()?;
        let mut stmt = db
            .prepare(&format!(
                "SELECT {SEMESTER_COLUMNS} FROM semesters sem
                 ORDER BY sem.start_date, sem.year, sem.name"
            ))
            .map_err(map_sqlite_error)?;
        let rows = stmt
            .query_map([], |row| semester_from_row(row, 0))
            .map_err(map_sqlite_error)?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(map_sqlite_error)
    }

    fn mark_current_semester(&self, id: SemesterId) -> Result<Semester, RepositoryError> {
        let db = self.conn()?;
        if fetch_semester_with(&db, id)?.is_none() {
            return Err(RepositoryError::NotFound);
        }
        db.execute("UPDATE semesters SET is_current = (id = ?1)", [id.0])
            .map_err(map_sqlite_error)?;
        fetch_semester_with(&db, id)?.ok_or(RepositoryError::NotFound)
    }

    fn insert_result(&self, result: ExamResult) -> Result<ExamResult, RepositoryError> {
        let db = self.conn()?;
        ensure_exists(&db, "students", "student", result.student_id.0)?;
        ensure_exists(&db, "courses", "course", result.course_id.0)?;
        ensure_exists(&db, "semesters", "semester", result.semester_id.0)?;
        db.execute(
            "INSERT INTO results (id, student_id, course_id, semester_id, score, grade,
                grade_point, notified, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                result.id.0,
                result.student_id.0,
                result.course_id.0,
                result.semester_id.0,
                result.score,
                result.grade.label(),
                result.grade_point,
                result.notified,
                result.created_at,
                result.updated_at,
            ],
        )
        .map_err(map_sqlite_error)?;
        Ok(result)
    }

    fn update_result(&self, result: ExamResult) -> Result<(), RepositoryError> {
        let db = self.conn()?;
        let changed = db
            .execute(
                "UPDATE results SET student_id = ?2, course_id = ?3, semester_id = ?4,
                    score = ?5, grade = ?6, grade_point = ?7, notified = (notified OR ?8),
                    updated_at = ?9
                 WHERE id = ?1",
                params![
                    result.id.0,
                    result.student_id.0,
                    result.course_id.0,
                    result.semester_id.0,
                    result.score,
                    result.grade.label(),
                    result.grade_point,
                    result.notified,
                    result.updated_at,
                ],
            )
            .map_err(map_sqlite_error)?;
        expect_changed(changed)
    }

    fn fetch_result(&self, id: ResultId) -> Result<Option<ExamResult>, RepositoryError> {
        let db = self.conn()?;
        db.query_row(
            &format!("SELECT {RESULT_COLUMNS} FROM results r WHERE r.id = ?1"),
            [id.0],
            |row| result_from_row(row, 0),
        )
        .optional()
        .map_err(map_sqlite_error)
    }

    fn fetch_result_detail(&self, id: ResultId) -> Result<Option<ResultDetail>, RepositoryError> {
        let db = self.conn()?;
        db.query_row(
            &format!("{} WHERE r.id = ?1", detail_select()),
            [id.0],
            detail_from_row,
        )
        .optional()
        .map_err(map_sqlite_error)
    }

    fn list_result_details(
        &self,
        filter: ResultFilter,
    ) -> Result<Vec<ResultDetail>, RepositoryError> {
        let db = self.conn()?;
        let mut stmt = db
            .prepare(&format!(
                "{} WHERE (?1 IS NULL OR r.student_id = ?1)
                   AND (?2 IS NULL OR r.semester_id = ?2)
                   AND (?3 IS NULL OR r.notified = ?3)
                 ORDER BY r.created_at, r.rowid",
                detail_select()
            ))
            .map_err(map_sqlite_error)?;
        let rows = stmt
            .query_map(
                params![
                    filter.student_id.map(|id| id.0),
                    filter.semester_id.map(|id| id.0),
                    filter.notified,
                ],
                detail_from_row,
            )
            .map_err(map_sqlite_error)?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(map_sqlite_error)
    }

    fn mark_notified(&self, id: ResultId) -> Result<(), RepositoryError> {
        let db = self.conn()?;
        let changed = db
            .execute(
                "UPDATE results SET notified = 1, updated_at = ?2 WHERE id = ?1",
                params![id.0, chrono::Utc::now()],
            )
            .map_err(map_sqlite_error)?;
        expect_changed(changed)
    }

    fn insert_cgpa_record(&self, record: CgpaRecord) -> Result<CgpaRecord, RepositoryError> {
        let db = self.conn()?;
        ensure_exists(&db, "students", "student", record.student_id.0)?;
        ensure_exists(&db, "semesters", "semester", record.semester_id.0)?;
        db.execute(
            "INSERT INTO cgpa_records (id, student_id, semester_id, semester_gpa, cumulative_gpa,
                total_credit_units, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                record.id.0,
                record.student_id.0,
                record.semester_id.0,
                record.semester_gpa,
                record.cumulative_gpa,
                record.total_credit_units,
                record.created_at,
            ],
        )
        .map_err(map_sqlite_error)?;
        Ok(record)
    }

    fn cgpa_history(&self, student_id: StudentId) -> Result<Vec<CgpaRecord>, RepositoryError> {
        let db = self.conn()?;
        let mut stmt = db
            .prepare(&format!(
                "SELECT {CGPA_COLUMNS} FROM cgpa_records g
                 JOIN semesters sem ON sem.id = g.semester_id
                 WHERE g.student_id = ?1
                 ORDER BY sem.start_date, sem.year, sem.name, g.created_at"
            ))
            .map_err(map_sqlite_error)?;
        let rows = stmt
            .query_map([student_id.0], cgpa_from_row)
            .map_err(map_sqlite_error)?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(map_sqlite_error)
    }

    fn list_cgpa_records(&self) -> Result<Vec<CgpaRecord>, RepositoryError> {
        let db = self.conn()?;
        let mut stmt = db
            .prepare(&format!(
                "SELECT {CGPA_COLUMNS} FROM cgpa_records g
                 JOIN semesters sem ON sem.id = g.semester_id
                 ORDER BY sem.start_date, sem.year, sem.name, g.created_at"
            ))
            .map_err(map_sqlite_error)?;
        let rows = stmt
            .query_map([], cgpa_from_row)
            .map_err(map_sqlite_error)?;
        rows.collect::<Result<Vec<_>, _>>()
            .map_err(map_sqlite_error)
    }
}

fn detail_select() -> String {
    format!(
        "SELECT {RESULT_COLUMNS}, {STUDENT_COLUMNS}, {COURSE_COLUMNS}, {SEMESTER_COLUMNS}
         FROM results r
         JOIN students s ON s.id = r.student_id
         JOIN courses c ON c.id = r.course_id
         JOIN semesters sem ON sem.id = r.semester_id"
    )
}

fn fetch_semester_with(db: &Connection, id: SemesterId) -> Result<Option<Semester>, RepositoryError> {
    db.query_row(
        &format!("SELECT {SEMESTER_COLUMNS} FROM semesters sem WHERE sem.id = ?1"),
        [id.0],
        |row| semester_from_row(row, 0),
    )
    .optional()
    .map_err(map_sqlite_error)
}

fn ensure_exists(
    db: &Connection,
    table: &'static str,
    entity: &'static str,
    id: Uuid,
) -> Result<(), RepositoryError> {
    let found: bool = db
        .query_row(
            &format!("SELECT EXISTS(SELECT 1 FROM {table} WHERE id = ?1)"),
            [id],
            |row| row.get(0),
        )
        .map_err(map_sqlite_error)?;
    if found {
        Ok(())
    } else {
        Err(RepositoryError::UnknownReference(entity))
    }
}

fn expect_changed(changed: usize) -> Result<(), RepositoryError> {
    if changed == 0 {
        Err(RepositoryError::NotFound)
    } else {
        Ok(())
    }
}

fn map_sqlite_error(err: rusqlite::Error) -> RepositoryError {
    match err {
        rusqlite::Error::SqliteFailure(failure, message)
            if failure.code == ErrorCode::ConstraintViolation =>
        {
            if failure.extended_code == ffi::SQLITE_CONSTRAINT_FOREIGNKEY {
                RepositoryError::UnknownReference("parent record")
            } else {
                RepositoryError::Conflict(message.unwrap_or_else(|| failure.to_string()))
            }
        }
        other => RepositoryError::Unavailable(other.to_string()),
    }
}

fn student_from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<Student> {
    Ok(Student {
        id: StudentId(row.get(offset)?),
        student_code: row.get(offset + 1)?,
        first_name: row.get(offset + 2)?,
        last_name: row.get(offset + 3)?,
        email: row.get(offset + 4)?,
        phone_number: row.get(offset + 5)?,
        program: row.get(offset + 6)?,
        year_of_study: row.get(offset + 7)?,
        created_at: row.get(offset + 8)?,
        updated_at: row.get(offset + 9)?,
    })
}

fn course_from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<Course> {
    Ok(Course {
        id: CourseId(row.get(offset)?),
        code: row.get(offset + 1)?,
        title: row.get(offset + 2)?,
        credit_units: row.get(offset + 3)?,
        created_at: row.get(offset + 4)?,
    })
}

fn semester_from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<Semester> {
    Ok(Semester {
        id: SemesterId(row.get(offset)?),
        name: row.get(offset + 1)?,
        year: row.get(offset + 2)?,
        start_date: row.get(offset + 3)?,
        end_date: row.get(offset + 4)?,
        is_current: row.get(offset + 5)?,
        created_at: row.get(offset + 6)?,
    })
}

fn result_from_row(row: &Row<'_>, offset: usize) -> rusqlite::Result<ExamResult> {
    let grade_column = offset + 5;
    let raw_grade: String = row.get(grade_column)?;
    let grade = LetterGrade::parse(&raw_grade).ok_or_else(|| {
        rusqlite::Error::InvalidColumnType(grade_column, "grade".to_string(), Type::Text)
    })?;

    Ok(ExamResult {
        id: ResultId(row.get(offset)?),
        student_id: StudentId(row.get(offset + 1)?),
        course_id: CourseId(row.get(offset + 2)?),
        semester_id: SemesterId(row.get(offset + 3)?),
        score: row.get(offset + 4)?,
        grade,
        grade_point: row.get(offset + 6)?,
        notified: row.get(offset + 7)?,
        created_at: row.get(offset + 8)?,
        updated_at: row.get(offset + 9)?,
    })
}

fn detail_from_row(row: &Row<'_>) -> rusqlite::Result<ResultDetail> {
    let student_offset = RESULT_WIDTH;
    let course_offset = student_offset + STUDENT_WIDTH;
    let semester_offset = course_offset + COURSE_WIDTH;

    Ok(ResultDetail {
        result: result_from_row(row, 0)?,
        student: student_from_row(row, student_offset)?,
        course: course_from_row(row, course_offset)?,
        semester: semester_from_row(row, semester_offset)?,
    })
}

fn cgpa_from_row(row: &Row<'_>) -> rusqlite::Result<CgpaRecord> {
    Ok(CgpaRecord {
        id: CgpaRecordId(row.get(0)?),
        student_id: StudentId(row.get(1)?),
        semester_id: SemesterId(row.get(2)?),
        semester_gpa: row.get(3)?,
        cumulative_gpa: row.get(4)?,
        total_credit_units: row.get(5)?,
        created_at: row.get(6)?,
    })
}
