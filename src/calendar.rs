//! Semester week calendar generation
//!
//! Maps a semester's teaching period and breaks to a fixed number of
//! seven-day weeks. Weeks always advance one week at a time from the start of
//! the teaching period; a break only relabels the weeks it overlaps and never
//! pushes later weeks back.

use chrono::{Days, NaiveDate};

use crate::domain::{Semester, SemesterPhase, WeekDescriptor, WeekType};
use crate::error::{ApiError, ApiResult};

pub const DEFAULT_NUMBER_OF_WEEKS: u32 = 16;

/// Upper bound on a generated calendar, a full year of weeks.
pub const MAX_NUMBER_OF_WEEKS: u32 = 53;

/// Generate the default 16-week calendar for a semester.
pub fn generate_weeks(semester: &Semester) -> ApiResult<Vec<WeekDescriptor>> {
    generate_weeks_from_semester(semester, DEFAULT_NUMBER_OF_WEEKS)
}

/// Generate `number_of_weeks` contiguous weeks starting at the teaching period.
///
/// A week is a break week when its start or end date lies inside a
/// `mid_semester_break` or `swot_vac` phase; the first such phase in phase
/// order wins. Break weeks carry teaching number 0 and the break's label as
/// content. Fails if the semester has no teaching period or more than
/// [`MAX_NUMBER_OF_WEEKS`] weeks are requested.
pub fn generate_weeks_from_semester(
    semester: &Semester,
    number_of_weeks: u32,
) -> ApiResult<Vec<WeekDescriptor>> {
    if number_of_weeks > MAX_NUMBER_OF_WEEKS {
        return Err(ApiError::Validation(format!(
            "Cannot generate {} weeks, the limit is {}",
            number_of_weeks, MAX_NUMBER_OF_WEEKS
        )));
    }
    let teaching = semester.teaching_period().ok_or_else(|| {
        ApiError::Validation(format!(
            "Semester '{}' has no teaching period",
            semester.name
        ))
    })?;
    let breaks: Vec<&SemesterPhase> = semester.breaks().collect();

    let mut weeks = Vec::with_capacity(number_of_weeks as usize);
    let mut teaching_week_number = 0;

    for index in 0..number_of_weeks {
        let start_date = add_days(teaching.start_date, 7 * u64::from(index))?;
        let end_date = add_days(start_date, 6)?;

        let week = match breaks
            .iter()
            .find(|b| b.contains(start_date) || b.contains(end_date))
        {
            Some(phase) => WeekDescriptor {
                week_id: index + 1,
                teaching_week_number: 0,
                week_type: WeekType::for_phase(phase.phase_type),
                start_date,
                end_date,
                content: phase.phase_type.label().to_string(),
            },
            None => {
                teaching_week_number += 1;
                WeekDescriptor {
                    week_id: index + 1,
                    teaching_week_number,
                    week_type: WeekType::Teaching,
                    start_date,
                    end_date,
                    content: String::new(),
                }
            }
        };
        weeks.push(week);
    }

    tracing::debug!(
        semester = %semester.id,
        weeks = weeks.len(),
        teaching_weeks = teaching_week_number,
        "Generated week calendar"
    );

    Ok(weeks)
}

/// The week whose date range contains `date`.
pub fn week_for_date(weeks: &[WeekDescriptor], date: NaiveDate) -> Option<&WeekDescriptor> {
    weeks.iter().find(|w| w.contains(date))
}

/// The week with `week_id`, or `NotFound` naming it.
pub fn find_week(weeks: &[WeekDescriptor], week_id: u32) -> ApiResult<&WeekDescriptor> {
    weeks
        .iter()
        .find(|w| w.week_id == week_id)
        .ok_or_else(|| ApiError::NotFound(format!("Week {} not found", week_id)))
}

pub fn teaching_weeks(weeks: &[WeekDescriptor]) -> impl Iterator<Item = &WeekDescriptor> {
    weeks.iter().filter(|w| w.is_teaching())
}

fn add_days(date: NaiveDate, days: u64) -> ApiResult<NaiveDate> {
    date.checked_add_days(Days::new(days))
        .ok_or_else(|| ApiError::Validation(format!("Date out of range: {} + {} days", date, days)))
}
