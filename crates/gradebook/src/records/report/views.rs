use std::collections::BTreeMap;

use serde::Serialize;

use super::super::advisory::Advisory;
use super::super::domain::{CgpaRecord, Student};
use super::super::grading::{classify_cgpa, GradeAssignment, HonoursClass, LetterGrade};

#[derive(Debug, Clone, Serialize)]
pub struct HonoursCount {
    pub classification: HonoursClass,
    pub label: &'static str,
    pub students: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct RecordsSummary {
    pub total_students: usize,
    pub total_courses: usize,
    pub total_results: usize,
    pub notified_results: usize,
    pub pending_results: usize,
    pub average_cgpa: f64,
    pub grade_histogram: BTreeMap<LetterGrade, usize>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub honours_distribution: Vec<HonoursCount>,
}

/// Academic standing of one student: latest CGPA, honours band and advisory.
#[derive(Debug, Clone, Serialize)]
pub struct StudentStanding {
    pub student: Student,
    pub cgpa: f64,
    pub total_credit_units: u32,
    pub classification: HonoursClass,
    pub classification_label: &'static str,
    pub advisory: Advisory,
    pub history: Vec<CgpaRecord>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GradePreview {
    pub score: f64,
    pub grade: LetterGrade,
    pub grade_point: f64,
}

impl GradePreview {
    pub fn new(score: f64, assignment: GradeAssignment) -> Self {
        Self {
            score,
            grade: assignment.grade,
            grade_point: assignment.grade_point,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ClassificationPreview {
    pub cgpa: f64,
    pub classification: HonoursClass,
    pub label: &'static str,
}

impl ClassificationPreview {
    pub fn new(cgpa: f64) -> Self {
        let classification = classify_cgpa(cgpa);
        Self {
            cgpa,
            classification,
            label: classification.label(),
        }
    }
}
