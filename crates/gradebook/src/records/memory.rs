use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use super::domain::{
    CgpaRecord, Course, CourseId, ExamResult, ResultDetail, ResultFilter, ResultId, Semester,
    SemesterId, Student, StudentId,
};
use super::repository::{RecordStore, RepositoryError};

#[derive(Debug, Default)]
struct Tables {
    students: HashMap<StudentId, Student>,
    courses: HashMap<CourseId, Course>,
    semesters: HashMap<SemesterId, Semester>,
    results: Vec<ExamResult>,
    cgpa_records: Vec<CgpaRecord>,
}

impl Tables {
    fn detail(&self, result: &ExamResult) -> Result<ResultDetail, RepositoryError> {
        let student = self
            .students
            .get(&result.student_id)
            .ok_or(RepositoryError::UnknownReference("student"))?;
        let course = self
            .courses
            .get(&result.course_id)
            .ok_or(RepositoryError::UnknownReference("course"))?;
        let semester = self
            .semesters
            .get(&result.semester_id)
            .ok_or(RepositoryError::UnknownReference("semester"))?;

        Ok(ResultDetail {
            result: result.clone(),
            student: student.clone(),
            course: course.clone(),
            semester: semester.clone(),
        })
    }

    fn check_references(
        &self,
        student_id: StudentId,
        semester_id: SemesterId,
        course_id: Option<CourseId>,
    ) -> Result<(), RepositoryError> {
        if !self.students.contains_key(&student_id) {
            return Err(RepositoryError::UnknownReference("student"));
        }
        if let Some(course_id) = course_id {
            if !self.courses.contains_key(&course_id) {
                return Err(RepositoryError::UnknownReference("course"));
            }
        }
        if !self.semesters.contains_key(&semester_id) {
            return Err(RepositoryError::UnknownReference("semester"));
        }
        Ok(())
    }

    fn sort_chronologically(&self, records: &mut [CgpaRecord]) {
        records.sort_by(|a, b| {
            let left = self.semesters.get(&a.semester_id).map(Semester::chronology_key);
            let right = self.semesters.get(&b.semester_id).map(Semester::chronology_key);
            left.cmp(&right).then(a.created_at.cmp(&b.created_at))
        });
    }
}

/// Process-local store used by the demo, the default server setup and tests.
#[derive(Debug, Default, Clone)]
pub struct InMemoryRecordStore {
    tables: Arc<Mutex<Tables>>,
}

impl InMemoryRecordStore {
    fn lock(&self) -> Result<MutexGuard<'_, Tables>, RepositoryError> {
        self.tables
            .lock()
            .map_err(|_| RepositoryError::Unavailable("record store mutex poisoned".to_string()))
    }
}

impl RecordStore for InMemoryRecordStore {
    fn insert_student(&self, student: Student) -> Result<Student, RepositoryError> {
        let mut tables = self.lock()?;
        if tables.students.contains_key(&student.id)
            || tables
                .students
                .values()
                .any(|existing| existing.student_code == student.student_code)
        {
            return Err(RepositoryError::Conflict(format!(
                "student code {}",
                student.student_code
            )));
        }
        tables.students.insert(student.id, student.clone());
        Ok(student)
    }

    fn update_student(&self, student: Student) -> Result<(), RepositoryError> {
        let mut tables = self.lock()?;
        if !tables.students.contains_key(&student.id) {
            return Err(RepositoryError::NotFound);
        }
        if tables
            .students
            .values()
            .any(|existing| existing.id != student.id && existing.student_code == student.student_code)
        {
            return Err(RepositoryError::Conflict(format!(
                "student code {}",
                student.student_code
            )));
        }
        tables.students.insert(student.id, student);
        Ok(())
    }

    fn fetch_student(&self, id: StudentId) -> Result<Option<Student>, RepositoryError> {
        Ok(self.lock()?.students.get(&id).cloned())
    }

    fn fetch_student_by_code(&self, code: &str) -> Result<Option<Student>, RepositoryError> {
        Ok(self
            .lock()?
            .students
            .values()
            .find(|student| student.student_code == code)
            .cloned())
    }

    fn list_students(&self) -> Result<Vec<Student>, RepositoryError> {
        let mut students: Vec<Student> = self.lock()?.students.values().cloned().collect();
        students.sort_by(|a, b| {
            (&a.last_name, &a.first_name, &a.student_code).cmp(&(
                &b.last_name,
                &b.first_name,
                &b.student_code,
            ))
        });
        Ok(students)
    }

    fn delete_student(&self, id: StudentId) -> Result<(), RepositoryError> {
        let mut tables = self.lock()?;
        if tables.students.remove(&id).is_none() {
            return Err(RepositoryError::NotFound);
        }
        tables.results.retain(|result| result.student_id != id);
        tables.cgpa_records.retain(|record| record.student_id != id);
        Ok(())
    }

    fn insert_course(&self, course: Course) -> Result<Course, RepositoryError> {
        let mut tables = self.lock()?;
        if tables.courses.contains_key(&course.id)
            || tables
                .courses
                .values()
                .any(|existing| existing.code == course.code)
        {
            return Err(RepositoryError::Conflict(format!("course code {}", course.code)));
        }
        tables.courses.insert(course.id, course.clone());
        Ok(course)
    }

    fn update_course(&self, course: Course) -> Result<(), RepositoryError> {
        let mut tables = self.lock()?;
        if !tables.courses.contains_key(&course.id) {
            return Err(RepositoryError::NotFound);
        }
        if tables
            .courses
            .values()
            .any(|existing| existing.id != course.id && existing.code == course.code)
        {
            return Err(RepositoryError::Conflict(format!("course code {}", course.code)));
        }
        tables.courses.insert(course.id, course);
        Ok(())
    }

    fn fetch_course(&self, id: CourseId) -> Result<Option<Course>, RepositoryError> {
        Ok(self.lock()?.courses.get(&id).cloned())
    }

    fn fetch_course_by_code(&self, code: &str) -> Result<Option<Course>, RepositoryError> {
        Ok(self
            .lock()?
            .courses
            .values()
            .find(|course| course.code == code)
            .cloned())
    }

    fn list_courses(&self) -> Result<Vec<Course>, RepositoryError> {
        let mut courses: Vec<Course> = self.lock()?.courses.values().cloned().collect();
        courses.sort_by(|a, b| a.code.cmp(&b.code));
        Ok(courses)
    }

    fn insert_semester(&self, semester: Semester) -> Result<Semester, RepositoryError> {
        let mut tables = self.lock()?;
        if tables.semesters.contains_key(&semester.id) {
            return Err(RepositoryError::Conflict(format!("semester {}", semester.id)));
        }
        tables.semesters.insert(semester.id, semester.clone());
        Ok(semester)
    }

    fn update_semester(&self, semester: Semester) -> Result<(), RepositoryError> {
        let mut tables = self.lock()?;
        match tables.semesters.get_mut(&semester.id) {
            Some(existing) => {
                *existing = semester;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn fetch_semester(&self, id: SemesterId) -> Result<Option<Semester>, RepositoryError> {
        Ok(self.lock()?.semesters.get(&id).cloned())
    }

    fn list_semesters(&self) -> Result<Vec<Semester>, RepositoryError> {
        let mut semesters: Vec<Semester> = self.lock()?.semesters.values().cloned().collect();
        semesters.sort_by(|a, b| a.chronology_key().cmp(&b.chronology_key()));
        Ok(semesters)
    }

    fn mark_current_semester(&self, id: SemesterId) -> Result<Semester, RepositoryError> {
        let mut tables = self.lock()?;
        if !tables.semesters.contains_key(&id) {
            return Err(RepositoryError::NotFound);
        }
        for semester in tables.semesters.values_mut() {
            semester.is_current = semester.id == id;
        }
        tables
            .semesters
            .get(&id)
            .cloned()
            .ok_or(RepositoryError::NotFound)
    }

    fn insert_result(&self, result: ExamResult) -> Result<ExamResult, RepositoryError> {
        let mut tables = self.lock()?;
        tables.check_references(result.student_id, result.semester_id, Some(result.course_id))?;
        if tables.results.iter().any(|existing| {
            existing.id == result.id
                || (existing.student_id == result.student_id
                    && existing.course_id == result.course_id
                    && existing.semester_id == result.semester_id)
        }) {
            return Err(RepositoryError::Conflict(
                "result for this student, course and semester".to_string(),
            ));
        }
        tables.results.push(result.clone());
        Ok(result)
    }

    fn update_result(&self, result: ExamResult) -> Result<(), RepositoryError> {
        let mut tables = self.lock()?;
        tables.check_references(result.student_id, result.semester_id, Some(result.course_id))?;
        if tables.results.iter().any(|existing| {
            existing.id != result.id
                && existing.student_id == result.student_id
                && existing.course_id == result.course_id
                && existing.semester_id == result.semester_id
        }) {
            return Err(RepositoryError::Conflict(
                "result for this student, course and semester".to_string(),
            ));
        }
        match tables
            .results
            .iter_mut()
            .find(|existing| existing.id == result.id)
        {
            Some(existing) => {
                // notified only ever moves forward
                let notified = existing.notified || result.notified;
                *existing = ExamResult { notified, ..result };
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn fetch_result(&self, id: ResultId) -> Result<Option<ExamResult>, RepositoryError> {
        Ok(self
            .lock()?
            .results
            .iter()
            .find(|result| result.id == id)
            .cloned())
    }

    fn fetch_result_detail(&self, id: ResultId) -> Result<Option<ResultDetail>, RepositoryError> {
        let tables = self.lock()?;
        tables
            .results
            .iter()
            .find(|result| result.id == id)
            .map(|result| tables.detail(result))
            .transpose()
    }

    fn list_result_details(
        &self,
        filter: ResultFilter,
    ) -> Result<Vec<ResultDetail>, RepositoryError> {
        let tables = self.lock()?;
        tables
            .results
            .iter()
            .filter(|result| filter.matches(result))
            .map(|result| tables.detail(result))
            .collect()
    }

    fn mark_notified(&self, id: ResultId) -> Result<(), RepositoryError> {
        let mut tables = self.lock()?;
        match tables.results.iter_mut().find(|result| result.id == id) {
            Some(result) => {
                result.notified = true;
                result.updated_at = chrono::Utc::now();
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn insert_cgpa_record(&self, record: CgpaRecord) -> Result<CgpaRecord, RepositoryError> {
        let mut tables = self.lock()?;
        tables.check_references(record.student_id, record.semester_id, None)?;
        if tables.cgpa_records.iter().any(|existing| {
            existing.student_id == record.student_id && existing.semester_id == record.semester_id
        }) {
            return Err(RepositoryError::Conflict(
                "cgpa record for this student and semester".to_string(),
            ));
        }
        tables.cgpa_records.push(record.clone());
        Ok(record)
    }

    fn cgpa_history(&self, student_id: StudentId) -> Result<Vec<CgpaRecord>, RepositoryError> {
        let tables = self.lock()?;
        let mut history: Vec<CgpaRecord> = tables
            .cgpa_records
            .iter()
            .filter(|record| record.student_id == student_id)
            .cloned()
            .collect();
        tables.sort_chronologically(&mut history);
        Ok(history)
    }

    fn list_cgpa_records(&self) -> Result<Vec<CgpaRecord>, RepositoryError> {
        let tables = self.lock()?;
        let mut records = tables.cgpa_records.clone();
        tables.sort_chronologically(&mut records);
        Ok(records)
    }
}
