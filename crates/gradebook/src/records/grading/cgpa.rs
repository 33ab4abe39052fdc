use serde::{Deserialize, Serialize};

/// One graded course weighted by its credit units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightedGrade {
    pub grade_point: f64,
    pub credit_units: u32,
}

/// Running sum of credit-weighted grade points.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize)]
pub struct GradePointTally {
    pub weighted_points: f64,
    pub credit_units: u32,
}

impl GradePointTally {
    pub fn add(&mut self, grade: WeightedGrade) {
        self.weighted_points += grade.grade_point * f64::from(grade.credit_units);
        self.credit_units = self.credit_units.saturating_add(grade.credit_units);
    }

    /// Credit-weighted average rounded to two decimals; zero when nothing was counted.
    pub fn average(&self) -> f64 {
        if self.credit_units == 0 {
            return 0.0;
        }
        round_gpa(self.weighted_points / f64::from(self.credit_units))
    }
}

pub fn accumulate<I>(grades: I) -> GradePointTally
where
    I: IntoIterator<Item = WeightedGrade>,
{
    let mut tally = GradePointTally::default();
    for grade in grades {
        tally.add(grade);
    }
    tally
}

pub fn round_gpa(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
