//! Score-to-grade mapping, honours classification and grade-point averaging.
//!
//! These are the only implementations of the grading tables. Store backends persist whatever
//! the service derives here and HTTP clients preview grades through the grading endpoints.

mod cgpa;
mod classification;

pub use cgpa::{accumulate, round_gpa, GradePointTally, WeightedGrade};
pub use classification::{classify_cgpa, HonoursClass};

use serde::{Deserialize, Serialize};

/// Letter grades in descending order of merit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum LetterGrade {
    A,
    B,
    C,
    D,
    E,
    F,
}

impl LetterGrade {
    pub const fn ordered() -> [Self; 6] {
        [Self::A, Self::B, Self::C, Self::D, Self::E, Self::F]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
            Self::D => "D",
            Self::E => "E",
            Self::F => "F",
        }
    }

    pub const fn grade_point(self) -> f64 {
        match self {
            Self::A => 4.0,
            Self::B => 3.0,
            Self::C => 2.0,
            Self::D => 1.0,
            Self::E | Self::F => 0.0,
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim() {
            "A" | "a" => Some(Self::A),
            "B" | "b" => Some(Self::B),
            "C" | "c" => Some(Self::C),
            "D" | "d" => Some(Self::D),
            "E" | "e" => Some(Self::E),
            "F" | "f" => Some(Self::F),
            _ => None,
        }
    }
}

impl std::fmt::Display for LetterGrade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Grade derived from a single score.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GradeAssignment {
    pub grade: LetterGrade,
    pub grade_point: f64,
}

const GRADE_BANDS: [(f64, LetterGrade); 5] = [
    (70.0, LetterGrade::A),
    (60.0, LetterGrade::B),
    (50.0, LetterGrade::C),
    (45.0, LetterGrade::D),
    (40.0, LetterGrade::E),
];

/// Map a score in `[0, 100]` to its letter grade. Range checks belong to the caller.
pub fn grade_for_score(score: f64) -> GradeAssignment {
    let grade = GRADE_BANDS
        .iter()
        .find(|(floor, _)| score >= *floor)
        .map(|(_, grade)| *grade)
        .unwrap_or(LetterGrade::F);

    GradeAssignment {
        grade,
        grade_point: grade.grade_point(),
    }
}
