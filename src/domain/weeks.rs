//! Week calendar domain types

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::semesters::PhaseType;

/// Week type
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum WeekType {
    Teaching,
    Midsem,
    Swotvac,
}

impl WeekType {
    /// Week type for a break phase. Non-break phases map to teaching.
    pub fn for_phase(phase_type: PhaseType) -> Self {
        match phase_type {
            PhaseType::MidSemesterBreak => WeekType::Midsem,
            PhaseType::SwotVac => WeekType::Swotvac,
            PhaseType::TeachingPeriod | PhaseType::FinalAssessments => WeekType::Teaching,
        }
    }
}

impl std::fmt::Display for WeekType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WeekType::Teaching => write!(f, "teaching"),
            WeekType::Midsem => write!(f, "midsem"),
            WeekType::Swotvac => write!(f, "swotvac"),
        }
    }
}

/// One week of a unit's semester calendar
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WeekDescriptor {
    pub week_id: u32,
    /// 0 for break weeks
    pub teaching_week_number: u32,
    pub week_type: WeekType,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub content: String,
}

impl WeekDescriptor {
    pub fn is_teaching(&self) -> bool {
        self.week_type == WeekType::Teaching
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.start_date && date <= self.end_date
    }

    /// Manual date edit. Contiguity with neighbouring weeks is not re-checked.
    pub fn with_dates(mut self, start_date: NaiveDate, end_date: NaiveDate) -> Self {
        self.start_date = start_date;
        self.end_date = end_date;
        self
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    /// Short label for listings, e.g. "Week 3" or "Mid-Semester Break".
    pub fn label(&self) -> String {
        if self.is_teaching() {
            format!("Week {}", self.teaching_week_number)
        } else {
            self.content.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn week() -> WeekDescriptor {
        WeekDescriptor {
            week_id: 7,
            teaching_week_number: 0,
            week_type: WeekType::Midsem,
            start_date: NaiveDate::from_ymd_opt(2024, 4, 15).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 4, 21).unwrap(),
            content: "Mid-Semester Break".to_string(),
        }
    }

    #[test]
    fn serializes_in_camel_case() {
        let value = serde_json::to_value(week()).unwrap();

        assert_eq!(value["weekId"], 7);
        assert_eq!(value["teachingWeekNumber"], 0);
        assert_eq!(value["weekType"], "midsem");
        assert_eq!(value["startDate"], "2024-04-15");
        assert_eq!(value["endDate"], "2024-04-21");
    }

    #[test]
    fn manual_edits_are_not_validated() {
        let edited = week().with_dates(
            NaiveDate::from_ymd_opt(2024, 5, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 4, 1).unwrap(),
        );

        assert!(edited.end_date < edited.start_date);
    }

    #[test]
    fn label_prefers_teaching_number() {
        let teaching = WeekDescriptor {
            week_type: WeekType::Teaching,
            teaching_week_number: 3,
            content: "Recursion".to_string(),
            ..week()
        };

        assert_eq!(teaching.label(), "Week 3");
        assert_eq!(week().label(), "Mid-Semester Break");
    }
}
