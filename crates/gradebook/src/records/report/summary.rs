use std::collections::{BTreeMap, HashMap};

use super::super::domain::{CgpaRecord, ExamResult, StudentId};
use super::super::grading::{classify_cgpa, round_gpa, HonoursClass};
use super::views::{HonoursCount, RecordsSummary};

/// Roll up the full record collections. Empty inputs produce zeros, never an error.
///
/// `cgpa_records` must be in semester chronology so the last record per student is their latest.
pub fn summarize(
    total_students: usize,
    total_courses: usize,
    results: &[ExamResult],
    cgpa_records: &[CgpaRecord],
) -> RecordsSummary {
    let notified_results = results.iter().filter(|result| result.notified).count();

    let mut grade_histogram = BTreeMap::new();
    for result in results {
        *grade_histogram.entry(result.grade).or_insert(0) += 1;
    }

    let average_cgpa = if cgpa_records.is_empty() {
        0.0
    } else {
        let total: f64 = cgpa_records.iter().map(|record| record.cumulative_gpa).sum();
        round_gpa(total / cgpa_records.len() as f64)
    };

    let mut latest: HashMap<StudentId, f64> = HashMap::new();
    for record in cgpa_records {
        latest.insert(record.student_id, record.cumulative_gpa);
    }

    let mut bands: HashMap<HonoursClass, usize> = HashMap::new();
    for cgpa in latest.values() {
        *bands.entry(classify_cgpa(*cgpa)).or_insert(0) += 1;
    }

    let honours_distribution = HonoursClass::ordered()
        .into_iter()
        .filter_map(|classification| {
            bands.get(&classification).map(|students| HonoursCount {
                classification,
                label: classification.label(),
                students: *students,
            })
        })
        .collect();

    RecordsSummary {
        total_students,
        total_courses,
        total_results: results.len(),
        notified_results,
        pending_results: results.len() - notified_results,
        average_cgpa,
        grade_histogram,
        honours_distribution,
    }
}
