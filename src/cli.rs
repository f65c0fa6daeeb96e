use clap::{Parser, Subcommand};

use unit_dashboard::domain::TaskKind;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Output JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Acting user id (defaults to DASHBOARD_USER_ID, then the signed-in profile)
    #[arg(long, global = true)]
    pub user: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the week calendar generated for a semester
    ///
    /// Example: unit-dashboard weeks --semester s1-2024 --weeks 13
    Weeks {
        #[arg(long)]
        semester: String,
        #[arg(long, default_value_t = unit_dashboard::calendar::DEFAULT_NUMBER_OF_WEEKS)]
        weeks: u32,
    },
    /// Generate a report for one week of a unit and wait for it
    ///
    /// Example: unit-dashboard run --unit FIT1045 --kind faq --week 3
    Run {
        #[arg(long)]
        unit: String,
        /// faq, question-clustering or assessment-analysis
        #[arg(long)]
        kind: TaskKind,
        /// Week id within the unit's calendar
        #[arg(long)]
        week: Option<u32>,
        /// Semester used when the unit has no saved calendar
        #[arg(long)]
        semester: Option<String>,
    },
    /// Resume polling a report left in flight by an earlier run
    Resume {
        #[arg(long)]
        unit: String,
    },
    /// Cancel the report in flight for a unit
    Cancel {
        #[arg(long)]
        unit: String,
    },
    /// List report run history for a unit
    Runs {
        #[arg(long)]
        unit: String,
    },
    /// Sync forum threads for a unit
    Sync {
        #[arg(long)]
        unit: String,
    },
}
