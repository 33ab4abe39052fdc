use serde::{Deserialize, Serialize};

use super::domain::CgpaRecord;
use super::grading::round_gpa;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        }
    }
}

/// Direction of the two most recent cumulative GPAs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Up,
    Down,
    Stable,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Advisory {
    pub risk_level: RiskLevel,
    pub trend: Trend,
    pub recommendations: Vec<String>,
}

const TREND_THRESHOLD: f64 = 0.2;

const HIGH_RISK_RECOMMENDATIONS: [&str; 4] = [
    "Schedule an urgent meeting with your academic advisor",
    "Enroll in tutoring for every course graded below C",
    "Reduce your course load next semester to focus on core courses",
    "Follow a structured weekly study timetable and track your progress",
];

const MEDIUM_RISK_RECOMMENDATIONS: [&str; 4] = [
    "Attend lecturer office hours for the courses you find most challenging",
    "Join a study group to reinforce difficult topics",
    "Review or retake courses graded D, E or F",
    "Aim for at least a B in every course next semester",
];

const MAINTENANCE_RECOMMENDATIONS: [&str; 3] = [
    "Maintain your current study habits",
    "Focus on turning B grades into A grades",
    "Review weaker topics well before examinations",
];

const EXCELLENCE_RECOMMENDATIONS: [&str; 4] = [
    "Excellent work, keep up the strong performance",
    "Consider peer tutoring to support fellow students",
    "Explore research or internship opportunities in your field",
    "Apply for academic scholarships and awards",
];

pub const DECLINE_WARNING: &str =
    "Warning: declining performance, your CGPA has dropped since last semester";
pub const IMPROVEMENT_NOTE: &str =
    "Great improvement: your CGPA has risen significantly since last semester";

/// Derive risk, trend and recommendations from a CGPA and the chronological record history.
pub fn advise(cgpa: f64, history: &[CgpaRecord]) -> Advisory {
    let (risk_level, base): (RiskLevel, &[&str]) = if cgpa < 2.0 {
        (RiskLevel::High, &HIGH_RISK_RECOMMENDATIONS)
    } else if cgpa < 2.7 {
        (RiskLevel::Medium, &MEDIUM_RISK_RECOMMENDATIONS)
    } else if cgpa < 3.3 {
        (RiskLevel::Low, &MAINTENANCE_RECOMMENDATIONS)
    } else {
        (RiskLevel::Low, &EXCELLENCE_RECOMMENDATIONS)
    };

    let mut recommendations: Vec<String> = base.iter().map(|line| line.to_string()).collect();

    let trend = match latest_pair(history) {
        Some((previous, latest)) => {
            let delta = round_gpa(latest - previous);
            if delta < -TREND_THRESHOLD {
                recommendations.push(DECLINE_WARNING.to_string());
            } else if delta > TREND_THRESHOLD {
                recommendations.push(IMPROVEMENT_NOTE.to_string());
            }

            if latest > previous {
                Trend::Up
            } else if latest < previous {
                Trend::Down
            } else {
                Trend::Stable
            }
        }
        None => Trend::Stable,
    };

    Advisory {
        risk_level,
        trend,
        recommendations,
    }
}

fn latest_pair(history: &[CgpaRecord]) -> Option<(f64, f64)> {
    match history {
        [.., previous, latest] => Some((previous.cumulative_gpa, latest.cumulative_gpa)),
        _ => None,
    }
}
