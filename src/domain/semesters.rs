//! Semester domain types
//!
//! A semester is an ordered list of phases. Exactly one teaching period is
//! needed to build a week calendar; breaks only relabel weeks inside it.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Semester phase type
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum PhaseType {
    TeachingPeriod,
    MidSemesterBreak,
    SwotVac,
    FinalAssessments,
}

impl PhaseType {
    /// Breaks relabel the weeks they overlap. Final assessments do not.
    pub fn is_break(&self) -> bool {
        matches!(self, PhaseType::MidSemesterBreak | PhaseType::SwotVac)
    }

    /// Human-readable label, used as the content of break weeks.
    pub fn label(&self) -> &'static str {
        match self {
            PhaseType::TeachingPeriod => "Teaching Period",
            PhaseType::MidSemesterBreak => "Mid-Semester Break",
            PhaseType::SwotVac => "SWOT VAC",
            PhaseType::FinalAssessments => "Final Assessments",
        }
    }
}

impl std::fmt::Display for PhaseType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PhaseType::TeachingPeriod => write!(f, "teaching_period"),
            PhaseType::MidSemesterBreak => write!(f, "mid_semester_break"),
            PhaseType::SwotVac => write!(f, "swot_vac"),
            PhaseType::FinalAssessments => write!(f, "final_assessments"),
        }
    }
}

/// One dated phase of a semester (inclusive bounds)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SemesterPhase {
    #[serde(rename = "type")]
    pub phase_type: PhaseType,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl SemesterPhase {
    pub fn new(phase_type: PhaseType, start_date: NaiveDate, end_date: NaiveDate) -> Self {
        Self {
            phase_type,
            start_date,
            end_date,
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start_date && date <= self.end_date
    }
}

/// Semester entity
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Semester {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub phases: Vec<SemesterPhase>,
}

impl Semester {
    /// The first teaching period in phase order, if any.
    pub fn teaching_period(&self) -> Option<&SemesterPhase> {
        self.phases
            .iter()
            .find(|p| p.phase_type == PhaseType::TeachingPeriod)
    }

    /// Break phases in phase order.
    pub fn breaks(&self) -> impl Iterator<Item = &SemesterPhase> {
        self.phases.iter().filter(|p| p.phase_type.is_break())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deserializes_backend_phase_shape() {
        let json = r#"{
            "id": "s1-2024",
            "name": "Semester 1",
            "year": 2024,
            "phases": [
                {"type": "teaching_period", "start_date": "2024-03-04", "end_date": "2024-06-23"},
                {"type": "mid_semester_break", "start_date": "2024-04-15", "end_date": "2024-04-28"},
                {"type": "final_assessments", "start_date": "2024-06-24", "end_date": "2024-07-12"}
            ]
        }"#;

        let semester: Semester = serde_json::from_str(json).unwrap();

        assert_eq!(semester.phases.len(), 3);
        let teaching = semester.teaching_period().unwrap();
        assert_eq!(teaching.start_date, NaiveDate::from_ymd_opt(2024, 3, 4).unwrap());
        let breaks: Vec<_> = semester.breaks().collect();
        assert_eq!(breaks.len(), 1);
        assert_eq!(breaks[0].phase_type, PhaseType::MidSemesterBreak);
    }

    #[test]
    fn contains_is_inclusive() {
        let phase = SemesterPhase::new(
            PhaseType::SwotVac,
            NaiveDate::from_ymd_opt(2024, 6, 3).unwrap(),
            NaiveDate::from_ymd_opt(2024, 6, 9).unwrap(),
        );

        assert!(phase.contains(NaiveDate::from_ymd_opt(2024, 6, 3).unwrap()));
        assert!(phase.contains(NaiveDate::from_ymd_opt(2024, 6, 9).unwrap()));
        assert!(!phase.contains(NaiveDate::from_ymd_opt(2024, 6, 10).unwrap()));
    }
}
