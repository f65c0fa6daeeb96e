use anyhow::{Context, Result};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::services::poller::PollConfig;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Environment {
    Dev,
    Staging,
    Prod,
}

impl Environment {
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "prod" | "production" => Self::Prod,
            "staging" => Self::Staging,
            _ => Self::Dev,
        }
    }

    pub fn is_dev(&self) -> bool {
        matches!(self, Self::Dev)
    }

    pub fn is_prod(&self) -> bool {
        matches!(self, Self::Prod)
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub env: Environment,

    // Dashboard backend
    pub api_base_url: String,
    pub api_token: String,
    pub api_timeout_seconds: u64,

    // Task polling
    pub poll_interval_ms: u64,
    pub poll_timeout_seconds: u64,

    // Durable in-flight task records
    pub checkpoint_dir: PathBuf,

    // Default user for CLI commands
    pub user_id: Option<String>,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        let env = Environment::from_str(&env::var("ENV").unwrap_or_else(|_| "dev".to_string()));

        // Dashboard backend
        let api_base_url =
            env::var("API_BASE_URL").unwrap_or_else(|_| "http://localhost:8000".to_string());
        url::Url::parse(&api_base_url)
            .with_context(|| format!("API_BASE_URL is not a valid URL: {}", api_base_url))?;
        let api_token = env::var("API_TOKEN").context("API_TOKEN must be set")?;
        let api_timeout_seconds = env::var("API_TIMEOUT_SECONDS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(30);

        // Task polling
        let poll_interval_ms = env::var("POLL_INTERVAL_MS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(2000);
        let poll_timeout_seconds = env::var("POLL_TIMEOUT_SECONDS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(120); // 2 minutes, matches the backend job budget

        let checkpoint_dir = match env::var("CHECKPOINT_DIR") {
            Ok(dir) if !dir.trim().is_empty() => PathBuf::from(dir),
            _ => default_checkpoint_dir()?,
        };

        let user_id = env::var("DASHBOARD_USER_ID")
            .ok()
            .filter(|s| !s.trim().is_empty());

        Ok(Settings {
            env,
            api_base_url,
            api_token,
            api_timeout_seconds,
            poll_interval_ms,
            poll_timeout_seconds,
            checkpoint_dir,
            user_id,
        })
    }

    pub fn poll_config(&self) -> PollConfig {
        PollConfig {
            interval: Duration::from_millis(self.poll_interval_ms),
            timeout: Duration::from_secs(self.poll_timeout_seconds),
        }
    }
}

fn default_checkpoint_dir() -> Result<PathBuf> {
    let home = env::var("HOME").context("HOME must be set when CHECKPOINT_DIR is not")?;
    Ok(PathBuf::from(home)
        .join(".local")
        .join("state")
        .join("unit-dashboard"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn environment_parsing_defaults_to_dev() {
        assert_eq!(Environment::from_str("PRODUCTION"), Environment::Prod);
        assert_eq!(Environment::from_str("staging"), Environment::Staging);
        assert_eq!(Environment::from_str("anything"), Environment::Dev);
        assert!(Environment::Dev.is_dev());
        assert!(Environment::Prod.is_prod());
    }

    #[test]
    fn poll_config_uses_configured_values() {
        let settings = Settings {
            env: Environment::Dev,
            api_base_url: "http://localhost:8000".to_string(),
            api_token: "token".to_string(),
            api_timeout_seconds: 30,
            poll_interval_ms: 500,
            poll_timeout_seconds: 10,
            checkpoint_dir: PathBuf::from("/tmp"),
            user_id: None,
        };

        let config = settings.poll_config();
        assert_eq!(config.interval, Duration::from_millis(500));
        assert_eq!(config.timeout, Duration::from_secs(10));
    }
}
