use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use super::access::{AccessDenied, AccessPolicy, Capability};
use super::advisory::advise;
use super::domain::{
    CgpaRecord, CgpaRecordId, Course, CourseId, ExamResult, NewCourse, NewResult, NewSemester,
    NewStudent, ResultDetail, ResultFilter, ResultId, Semester, SemesterId, Student, StudentId,
};
use super::grading::{accumulate, classify_cgpa, grade_for_score, WeightedGrade};
use super::report::{summarize, RecordsSummary, StudentStanding};
use super::repository::{RecordStore, RepositoryError};
use super::validation::{RecordGuard, ValidationError};

/// Service composing validation, access control, the record store and the grading rules.
pub struct RecordsService<S> {
    store: Arc<S>,
    guard: RecordGuard,
    access: AccessPolicy,
}

impl<S> RecordsService<S>
where
    S: RecordStore + 'static,
{
    pub fn new(store: Arc<S>) -> Self {
        Self::with_access(store, AccessPolicy::default())
    }

    pub fn with_access(store: Arc<S>, access: AccessPolicy) -> Self {
        Self {
            store,
            guard: RecordGuard,
            access,
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn access(&self) -> &AccessPolicy {
        &self.access
    }

    pub fn register_student(&self, entry: NewStudent) -> Result<Student, RecordsServiceError> {
        self.access.authorize(Capability::ManageStudents)?;
        let entry = self.guard.student(entry)?;
        let now = Utc::now();

        let student = Student {
            id: StudentId::generate(),
            student_code: entry.student_code,
            first_name: entry.first_name,
            last_name: entry.last_name,
            email: entry.email,
            phone_number: entry.phone_number,
            program: entry.program,
            year_of_study: entry.year_of_study,
            created_at: now,
            updated_at: now,
        };

        Ok(self.store.insert_student(student)?)
    }

    pub fn update_student(
        &self,
        id: StudentId,
        entry: NewStudent,
    ) -> Result<Student, RecordsServiceError> {
        self.access.authorize(Capability::ManageStudents)?;
        let entry = self.guard.student(entry)?;
        let mut student = self.student(id)?;
        student.apply(entry, Utc::now());
        self.store.update_student(student.clone())?;
        Ok(student)
    }

    /// Deletes the student together with their results and CGPA records.
    pub fn remove_student(&self, id: StudentId) -> Result<(), RecordsServiceError> {
        self.access.authorize(Capability::ManageStudents)?;
        self.store.delete_student(id)?;
        info!(student_id = %id, "student removed with dependent records");
        Ok(())
    }

    pub fn student(&self, id: StudentId) -> Result<Student, RecordsServiceError> {
        let student = self
            .store
            .fetch_student(id)?
            .ok_or(RepositoryError::NotFound)?;
        Ok(student)
    }

    pub fn students(&self) -> Result<Vec<Student>, RecordsServiceError> {
        Ok(self.store.list_students()?)
    }

    pub fn add_course(&self, entry: NewCourse) -> Result<Course, RecordsServiceError> {
        self.access.authorize(Capability::ManageCourses)?;
        let entry = self.guard.course(entry)?;
        let course = Course {
            id: CourseId::generate(),
            code: entry.code,
            title: entry.title,
            credit_units: entry.credit_units,
            created_at: Utc::now(),
        };
        Ok(self.store.insert_course(course)?)
    }

    pub fn update_course(
        &self,
        id: CourseId,
        entry: NewCourse,
    ) -> Result<Course, RecordsServiceError> {
        self.access.authorize(Capability::ManageCourses)?;
        let entry = self.guard.course(entry)?;
        let mut course = self.course(id)?;
        course.code = entry.code;
        course.title = entry.title;
        course.credit_units = entry.credit_units;
        self.store.update_course(course.clone())?;
        Ok(course)
    }

    pub fn course(&self, id: CourseId) -> Result<Course, RecordsServiceError> {
        let course = self
            .store
            .fetch_course(id)?
            .ok_or(RepositoryError::NotFound)?;
        Ok(course)
    }

    pub fn courses(&self) -> Result<Vec<Course>, RecordsServiceError> {
        Ok(self.store.list_courses()?)
    }

    pub fn add_semester(&self, entry: NewSemester) -> Result<Semester, RecordsServiceError> {
        self.access.authorize(Capability::ManageSemesters)?;
        let entry = self.guard.semester(entry)?;
        let semester = Semester {
            id: SemesterId::generate(),
            name: entry.name,
            year: entry.year,
            start_date: entry.start_date,
            end_date: entry.end_date,
            is_current: false,
            created_at: Utc::now(),
        };
        let stored = self.store.insert_semester(semester)?;

        if entry.is_current {
            return Ok(self.store.mark_current_semester(stored.id)?);
        }
        Ok(stored)
    }

    pub fn update_semester(
        &self,
        id: SemesterId,
        entry: NewSemester,
    ) -> Result<Semester, RecordsServiceError> {
        self.access.authorize(Capability::ManageSemesters)?;
        let entry = self.guard.semester(entry)?;
        let mut semester = self
            .store
            .fetch_semester(id)?
            .ok_or(RepositoryError::NotFound)?;
        let becomes_current = entry.is_current && !semester.is_current;

        semester.name = entry.name;
        semester.year = entry.year;
        semester.start_date = entry.start_date;
        semester.end_date = entry.end_date;
        semester.is_current = entry.is_current && semester.is_current;
        self.store.update_semester(semester.clone())?;

        if becomes_current {
            return Ok(self.store.mark_current_semester(id)?);
        }
        Ok(semester)
    }

    /// Make `id` the only current semester.
    pub fn set_current_semester(&self, id: SemesterId) -> Result<Semester, RecordsServiceError> {
        self.access.authorize(Capability::ManageSemesters)?;
        Ok(self.store.mark_current_semester(id)?)
    }

    pub fn semesters(&self) -> Result<Vec<Semester>, RecordsServiceError> {
        Ok(self.store.list_semesters()?)
    }

    /// Validate the score, derive its grade and persist the result.
    pub fn record_result(&self, entry: NewResult) -> Result<ExamResult, RecordsServiceError> {
        self.access.authorize(Capability::RecordResults)?;
        let entry = self.guard.result(entry)?;
        let assignment = grade_for_score(entry.score);
        let now = Utc::now();

        let result = ExamResult {
            id: ResultId::generate(),
            student_id: entry.student_id,
            course_id: entry.course_id,
            semester_id: entry.semester_id,
            score: entry.score,
            grade: assignment.grade,
            grade_point: assignment.grade_point,
            notified: false,
            created_at: now,
            updated_at: now,
        };

        let stored = self.store.insert_result(result)?;
        info!(
            result_id = %stored.id,
            student_id = %stored.student_id,
            grade = %stored.grade,
            "result recorded"
        );
        Ok(stored)
    }

    /// Change a score; the grade and grade point are always re-derived with it.
    pub fn update_score(
        &self,
        id: ResultId,
        score: f64,
    ) -> Result<ExamResult, RecordsServiceError> {
        self.access.authorize(Capability::RecordResults)?;
        let score = self.guard.score(score)?;
        let mut result = self
            .store
            .fetch_result(id)?
            .ok_or(RepositoryError::NotFound)?;

        let assignment = grade_for_score(score);
        result.score = score;
        result.grade = assignment.grade;
        result.grade_point = assignment.grade_point;
        result.updated_at = Utc::now();

        self.store.update_result(result.clone())?;
        Ok(result)
    }

    pub fn result(&self, id: ResultId) -> Result<ResultDetail, RecordsServiceError> {
        let detail = self
            .store
            .fetch_result_detail(id)?
            .ok_or(RepositoryError::NotFound)?;
        Ok(detail)
    }

    pub fn results(&self, filter: ResultFilter) -> Result<Vec<ResultDetail>, RecordsServiceError> {
        Ok(self.store.list_result_details(filter)?)
    }

    /// Compute and append the CGPA record of `student_id` for `semester_id`.
    ///
    /// The cumulative average is credit weighted over every result of the student in semesters
    /// up to and including the target one.
    pub fn close_semester(
        &self,
        student_id: StudentId,
        semester_id: SemesterId,
    ) -> Result<CgpaRecord, RecordsServiceError> {
        self.access.authorize(Capability::ComputeCgpa)?;
        self.student(student_id)?;
        let semester = self
            .store
            .fetch_semester(semester_id)?
            .ok_or(RepositoryError::UnknownReference("semester"))?;

        let details = self
            .store
            .list_result_details(ResultFilter::for_student(student_id))?;
        let cutoff = semester.chronology_key();
        let to_date: Vec<&ResultDetail> = details
            .iter()
            .filter(|detail| detail.semester.chronology_key() <= cutoff)
            .collect();

        let term = accumulate(
            to_date
                .iter()
                .filter(|detail| detail.result.semester_id == semester_id)
                .map(|detail| weighted(detail)),
        );
        if term.credit_units == 0 {
            return Err(ValidationError::NoResultsForSemester {
                semester: semester.label(),
            }
            .into());
        }
        let cumulative = accumulate(to_date.iter().map(|detail| weighted(detail)));

        let record = CgpaRecord {
            id: CgpaRecordId::generate(),
            student_id,
            semester_id,
            semester_gpa: term.average(),
            cumulative_gpa: cumulative.average(),
            total_credit_units: cumulative.credit_units,
            created_at: Utc::now(),
        };

        let stored = self.store.insert_cgpa_record(record)?;
        info!(
            %student_id,
            semester = %semester.label(),
            cumulative_gpa = stored.cumulative_gpa,
            "cgpa record appended"
        );
        Ok(stored)
    }

    pub fn cgpa_history(
        &self,
        student_id: StudentId,
    ) -> Result<Vec<CgpaRecord>, RecordsServiceError> {
        self.student(student_id)?;
        Ok(self.store.cgpa_history(student_id)?)
    }

    /// Classification and advisory from the latest CGPA record, or from every recorded result
    /// when no semester has been closed yet.
    pub fn standing(&self, student_id: StudentId) -> Result<StudentStanding, RecordsServiceError> {
        let student = self.student(student_id)?;
        let history = self.store.cgpa_history(student_id)?;

        let (cgpa, total_credit_units) = match history.last() {
            Some(latest) => (latest.cumulative_gpa, latest.total_credit_units),
            None => {
                let details = self
                    .store
                    .list_result_details(ResultFilter::for_student(student_id))?;
                let tally = accumulate(details.iter().map(weighted));
                (tally.average(), tally.credit_units)
            }
        };

        let classification = classify_cgpa(cgpa);
        let advisory = advise(cgpa, &history);

        Ok(StudentStanding {
            student,
            cgpa,
            total_credit_units,
            classification,
            classification_label: classification.label(),
            advisory,
            history,
        })
    }

    pub fn summary(&self) -> Result<RecordsSummary, RecordsServiceError> {
        let students = self.store.list_students()?;
        let courses = self.store.list_courses()?;
        let results: Vec<ExamResult> = self
            .store
            .list_result_details(ResultFilter::default())?
            .into_iter()
            .map(|detail| detail.result)
            .collect();
        let cgpa_records = self.store.list_cgpa_records()?;

        Ok(summarize(
            students.len(),
            courses.len(),
            &results,
            &cgpa_records,
        ))
    }
}

fn weighted(detail: &ResultDetail) -> WeightedGrade {
    WeightedGrade {
        grade_point: detail.result.grade_point,
        credit_units: detail.course.credit_units,
    }
}

/// Error raised by the records service.
#[derive(Debug, thiserror::Error)]
pub enum RecordsServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Access(#[from] AccessDenied),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
