//! Report task domain types
//!
//! Report jobs (FAQ generation, question clustering, assessment analysis) run
//! on the backend. The client only submits them and reads their status.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Report job kinds the backend can run
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    Faq,
    QuestionClustering,
    AssessmentAnalysis,
}

impl TaskKind {
    /// Path segment used by the task endpoints.
    pub fn path_segment(&self) -> &'static str {
        match self {
            TaskKind::Faq => "faq",
            TaskKind::QuestionClustering => "question-clustering",
            TaskKind::AssessmentAnalysis => "assessment-analysis",
        }
    }
}

impl std::fmt::Display for TaskKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskKind::Faq => write!(f, "faq"),
            TaskKind::QuestionClustering => write!(f, "question_clustering"),
            TaskKind::AssessmentAnalysis => write!(f, "assessment_analysis"),
        }
    }
}

impl std::str::FromStr for TaskKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "faq" => Ok(TaskKind::Faq),
            "question_clustering" | "clustering" => Ok(TaskKind::QuestionClustering),
            "assessment_analysis" | "assessment" => Ok(TaskKind::AssessmentAnalysis),
            other => Err(format!("unknown task kind: {}", other)),
        }
    }
}

/// Task status as reported by the backend
///
/// Statuses the client does not know about are kept verbatim and treated as
/// still in progress.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(from = "String", into = "String")]
pub enum TaskStatus {
    Received,
    Pending,
    Completed,
    Success,
    Failure,
    Error,
    Unknown(String),
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskStatus::Completed | TaskStatus::Success | TaskStatus::Failure | TaskStatus::Error
        )
    }

    pub fn is_success(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Success)
    }

    pub fn is_failure(&self) -> bool {
        matches!(self, TaskStatus::Failure | TaskStatus::Error)
    }
}

impl From<String> for TaskStatus {
    fn from(s: String) -> Self {
        match s.to_lowercase().as_str() {
            "received" => TaskStatus::Received,
            "pending" => TaskStatus::Pending,
            "completed" => TaskStatus::Completed,
            "success" => TaskStatus::Success,
            "failure" => TaskStatus::Failure,
            "error" => TaskStatus::Error,
            _ => TaskStatus::Unknown(s),
        }
    }
}

impl From<TaskStatus> for String {
    fn from(status: TaskStatus) -> Self {
        status.to_string()
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskStatus::Received => write!(f, "received"),
            TaskStatus::Pending => write!(f, "pending"),
            TaskStatus::Completed => write!(f, "completed"),
            TaskStatus::Success => write!(f, "success"),
            TaskStatus::Failure => write!(f, "failure"),
            TaskStatus::Error => write!(f, "error"),
            TaskStatus::Unknown(s) => write!(f, "{}", s),
        }
    }
}

/// Status of an in-flight task, also the durable checkpoint record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TaskRunStatusResponse {
    #[serde(alias = "transaction_id")]
    pub transaction_id: String,
    pub status: TaskStatus,
    /// 0-100, clamped on decode
    #[serde(default, deserialize_with = "clamped_progress")]
    pub progress: f64,
    #[serde(default)]
    pub name: String,
    #[serde(default, alias = "week_id", skip_serializing_if = "Option::is_none")]
    pub week_id: Option<u32>,
}

impl TaskRunStatusResponse {
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

/// Request DTO for submitting a report job
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RunTaskRequest {
    pub unit_id: String,
    pub user_id: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub week_id: Option<u32>,
}

/// Input recorded with a persisted task run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TaskRunInput {
    #[serde(alias = "unit_id")]
    pub unit_id: String,
    #[serde(alias = "user_id")]
    pub user_id: String,
    #[serde(alias = "start_date")]
    pub start_date: NaiveDate,
    #[serde(alias = "end_date")]
    pub end_date: NaiveDate,
}

/// Output of a completed report job
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct TaskRunResult {
    #[serde(default)]
    pub report: Option<String>,
    #[serde(default)]
    pub questions: Vec<serde_json::Value>,
}

/// Persisted task run, as listed in the run history
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskRun {
    #[serde(alias = "transactionId")]
    pub transaction_id: String,
    pub status: TaskStatus,
    #[serde(default, deserialize_with = "clamped_progress")]
    pub progress: f64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub week_id: Option<u32>,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub input: Option<TaskRunInput>,
    #[serde(default)]
    pub result: Option<TaskRunResult>,
    #[serde(default)]
    pub error_message: Option<String>,
}

/// Backend progress is a percentage; anything outside 0-100 is pulled back in.
fn clamped_progress<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = f64::deserialize(deserializer)?;
    if value.is_nan() {
        return Ok(0.0);
    }
    Ok(value.clamp(0.0, 100.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_statuses() {
        for s in ["completed", "success", "failure", "error"] {
            assert!(TaskStatus::from(s.to_string()).is_terminal(), "{s}");
        }
        for s in ["received", "pending", "STARTED"] {
            assert!(!TaskStatus::from(s.to_string()).is_terminal(), "{s}");
        }
        assert!(TaskStatus::Success.is_success());
        assert!(!TaskStatus::Failure.is_success());
        assert!(TaskStatus::Error.is_failure());
    }

    #[test]
    fn unknown_status_is_preserved() {
        let status: TaskStatus = serde_json::from_str("\"retrying\"").unwrap();
        assert_eq!(status, TaskStatus::Unknown("retrying".to_string()));
        assert_eq!(serde_json::to_string(&status).unwrap(), "\"retrying\"");
    }

    #[test]
    fn status_response_accepts_both_casings() {
        let camel: TaskRunStatusResponse = serde_json::from_str(
            r#"{"transactionId":"tx-1","status":"pending","progress":40,"name":"faq","weekId":3}"#,
        )
        .unwrap();
        let snake: TaskRunStatusResponse = serde_json::from_str(
            r#"{"transaction_id":"tx-1","status":"pending","progress":40,"name":"faq","week_id":3}"#,
        )
        .unwrap();

        assert_eq!(camel, snake);
        assert_eq!(camel.week_id, Some(3));
        assert_eq!(camel.progress, 40.0);
    }

    #[test]
    fn progress_is_clamped_to_percentage() {
        let over: TaskRunStatusResponse =
            serde_json::from_str(r#"{"transactionId":"tx-1","status":"pending","progress":140}"#)
                .unwrap();
        let under: TaskRunStatusResponse =
            serde_json::from_str(r#"{"transactionId":"tx-1","status":"pending","progress":-5}"#)
                .unwrap();
        let missing: TaskRunStatusResponse =
            serde_json::from_str(r#"{"transactionId":"tx-1","status":"pending"}"#).unwrap();

        assert_eq!(over.progress, 100.0);
        assert_eq!(under.progress, 0.0);
        assert_eq!(missing.progress, 0.0);
    }

    #[test]
    fn task_run_history_shape() {
        let run: TaskRun = serde_json::from_str(
            r#"{
                "transaction_id": "tx-9",
                "status": "completed",
                "name": "faq",
                "created_at": "2024-04-01T10:00:00Z",
                "completed_at": "2024-04-01T10:01:30Z",
                "input": {"unitId": "u1", "userId": "me", "startDate": "2024-03-04", "endDate": "2024-03-10"},
                "result": {"report": "FAQ", "questions": [{"q": "When is the exam?"}]},
                "error_message": null
            }"#,
        )
        .unwrap();

        assert!(run.status.is_success());
        assert_eq!(run.input.unwrap().unit_id, "u1");
        assert_eq!(run.result.unwrap().questions.len(), 1);
    }

    #[test]
    fn task_kind_parsing() {
        assert_eq!("faq".parse::<TaskKind>().unwrap(), TaskKind::Faq);
        assert_eq!(
            "question-clustering".parse::<TaskKind>().unwrap(),
            TaskKind::QuestionClustering
        );
        assert_eq!(TaskKind::AssessmentAnalysis.path_segment(), "assessment-analysis");
        assert!("poetry".parse::<TaskKind>().is_err());
    }
}
