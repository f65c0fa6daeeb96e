mod cli;

use anyhow::Result;
use clap::Parser;
use std::sync::Arc;

use cli::{Cli, Command};
use unit_dashboard::calendar;
use unit_dashboard::config::Settings;
use unit_dashboard::domain::{Semester, TaskRun, WeekDescriptor};
use unit_dashboard::logging;
use unit_dashboard::services::{ApiClient, FileCheckpoint, PollState, ReportRunner, TaskApi};
use unit_dashboard::stores::{UnitStore, UserStore};
use unit_dashboard::{ApiError, ApiResult};

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    // Load configuration
    let settings = Settings::from_env()?;

    // Initialize logging
    logging::init_logging(&settings.env);

    tracing::debug!(
        env = ?settings.env,
        api_base_url = %settings.api_base_url,
        "Starting unit dashboard client"
    );

    let client = ApiClient::new(
        &settings.api_base_url,
        &settings.api_token,
        settings.api_timeout_seconds,
    )?;

    if let Err(e) = run(cli, &settings, client).await {
        tracing::debug!(code = e.code(), error = %e, "Command failed");
        eprintln!("error: {}", e.user_message());
        std::process::exit(1);
    }

    Ok(())
}

async fn run(cli: Cli, settings: &Settings, client: ApiClient) -> ApiResult<()> {
    match cli.command {
        Command::Weeks { semester, weeks } => {
            let semester = find_semester(&client, &semester).await?;
            let weeks = calendar::generate_weeks_from_semester(&semester, weeks)?;
            print_weeks(&weeks, cli.json)
        }
        Command::Run {
            unit,
            kind,
            week,
            semester,
        } => {
            let user_id = resolve_user(&client, settings, cli.user).await?;
            let units = UnitStore::new(client.clone());
            let loaded = units.load_unit(&unit).await?;

            let weeks = if loaded.weeks.is_empty() {
                let semester_id = semester.or(loaded.semester_id).ok_or_else(|| {
                    ApiError::Validation(format!(
                        "Unit {} has no calendar; pass --semester to generate one",
                        unit
                    ))
                })?;
                let semester = find_semester(&client, &semester_id).await?;
                units.generate_weeks(&unit, &semester, calendar::DEFAULT_NUMBER_OF_WEEKS)?
            } else {
                loaded.weeks
            };
            let selected = week.map(|id| calendar::find_week(&weeks, id)).transpose()?;

            let runner = report_runner(&client, settings, &unit, &user_id);
            let submitted = runner.submit(kind, selected).await?;
            println!("Submitted {} ({})", submitted.name, submitted.transaction_id);

            follow(&runner).await?;
            print_runs(&runner.history().runs(), cli.json)
        }
        Command::Resume { unit } => {
            let user_id = resolve_user(&client, settings, cli.user).await?;
            let runner = report_runner(&client, settings, &unit, &user_id);

            if !runner.resume() {
                match runner.state() {
                    PollState::Terminal(status) => println!(
                        "Last report {} already finished with status {}",
                        status.transaction_id, status.status
                    ),
                    _ => println!("No report in flight for unit {}", unit),
                }
                return Ok(());
            }

            follow(&runner).await?;
            print_runs(&runner.history().runs(), cli.json)
        }
        Command::Cancel { unit } => {
            let user_id = resolve_user(&client, settings, cli.user).await?;
            let runner = report_runner(&client, settings, &unit, &user_id);
            runner.cancel().await?;
            println!("Cancelled report for unit {}", unit);
            Ok(())
        }
        Command::Runs { unit } => {
            let user_id = resolve_user(&client, settings, cli.user).await?;
            let runs = client.task_runs(&unit, &user_id).await?;
            print_runs(&runs, cli.json)
        }
        Command::Sync { unit } => {
            let units = UnitStore::new(client);
            let result = units.sync_threads(&unit).await?;
            if cli.json {
                println!("{}", to_json(&result)?);
            } else {
                println!(
                    "Synced {} threads ({} new, {} updated)",
                    result.synced, result.created, result.updated
                );
            }
            Ok(())
        }
    }
}

fn report_runner(
    client: &ApiClient,
    settings: &Settings,
    unit_id: &str,
    user_id: &str,
) -> ReportRunner {
    let api: Arc<dyn TaskApi> = Arc::new(client.clone());
    let checkpoint = Arc::new(FileCheckpoint::new(&settings.checkpoint_dir));
    ReportRunner::new(api, checkpoint, unit_id, user_id, settings.poll_config())
}

/// Print progress until the report settles.
async fn follow(runner: &ReportRunner) -> ApiResult<()> {
    let mut rx = runner.subscribe();
    let mut last_progress = None;

    loop {
        let state = rx.borrow_and_update().clone();
        match state {
            PollState::Polling {
                status: Some(status),
                ..
            } => {
                if last_progress != Some(status.progress) {
                    println!("{} {:>5.1}%", status.status, status.progress);
                    last_progress = Some(status.progress);
                }
            }
            PollState::Polling { status: None, .. } => {}
            _ => break,
        }
        if rx.changed().await.is_err() {
            break;
        }
    }

    match runner.wait().await? {
        PollState::Terminal(status) => {
            println!("Report {} finished: {}", status.transaction_id, status.status);
            Ok(())
        }
        PollState::Cancelled => {
            println!("Polling cancelled");
            Ok(())
        }
        _ => Ok(()),
    }
}

async fn resolve_user(
    client: &ApiClient,
    settings: &Settings,
    user: Option<String>,
) -> ApiResult<String> {
    if let Some(user_id) = user.or_else(|| settings.user_id.clone()) {
        return Ok(user_id);
    }
    let users = UserStore::new(client.clone());
    Ok(users.load().await?.id)
}

async fn find_semester(client: &ApiClient, semester_id: &str) -> ApiResult<Semester> {
    client
        .semesters()
        .await?
        .into_iter()
        .find(|s| s.id == semester_id)
        .ok_or_else(|| ApiError::NotFound(format!("Semester {} not found", semester_id)))
}

fn to_json<T: serde::Serialize>(value: &T) -> ApiResult<String> {
    serde_json::to_string_pretty(value).map_err(|e| ApiError::Internal(e.into()))
}

fn print_weeks(weeks: &[WeekDescriptor], json: bool) -> ApiResult<()> {
    if json {
        println!("{}", to_json(&weeks)?);
        return Ok(());
    }

    for week in weeks {
        println!(
            "{:>2} | {} - {} | {:<8} | {}",
            week.week_id,
            week.start_date,
            week.end_date,
            week.week_type.to_string(),
            week.label()
        );
    }
    Ok(())
}

fn print_runs(runs: &[TaskRun], json: bool) -> ApiResult<()> {
    if json {
        println!("{}", to_json(&runs)?);
        return Ok(());
    }

    if runs.is_empty() {
        println!("No report runs yet");
    }
    for run in runs {
        let completed = run
            .completed_at
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "{} | {} | {} | {} | {}{}",
            run.transaction_id,
            run.name,
            run.status,
            run.created_at.format("%Y-%m-%d %H:%M"),
            completed,
            run.error_message
                .as_deref()
                .map(|m| format!(" | {}", m))
                .unwrap_or_default()
        );
    }
    Ok(())
}
