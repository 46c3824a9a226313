use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use anyhow::{bail, Context, Result};

/// What the orchestrator does when one field agent fails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum AgentFailurePolicy {
    /// Any agent failure fails the whole extraction.
    #[default]
    AllOrNothing,
    /// A failed section falls back to its empty value and is listed in the metadata.
    Degrade,
}

impl FromStr for AgentFailurePolicy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "all_or_nothing" | "strict" => Ok(Self::AllOrNothing),
            "degrade" => Ok(Self::Degrade),
            other => bail!("Unknown AGENT_FAILURE_POLICY '{other}' (expected all_or_nothing or degrade)"),
        }
    }
}

/// Knobs the extraction pipeline reads on every request.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub reference_data_dir: PathBuf,
    pub agent_timeout: Duration,
    pub failure_policy: AgentFailurePolicy,
    pub scan_skills_without_role: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            reference_data_dir: PathBuf::from("data/db"),
            agent_timeout: Duration::from_secs(90),
            failure_policy: AgentFailurePolicy::AllOrNothing,
            scan_skills_without_role: false,
        }
    }
}

/// Application configuration loaded from environment variables.
/// Fails at startup if required variables are missing.
#[derive(Debug, Clone)]
pub struct Config {
    pub s3_bucket: String,
    pub s3_endpoint: String,
    pub aws_access_key_id: String,
    pub aws_secret_access_key: String,
    pub anthropic_api_key: String,
    pub port: u16,
    pub rust_log: String,
    pub max_upload_bytes: usize,
    pub pipeline: PipelineConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        let defaults = PipelineConfig::default();
        let pipeline = PipelineConfig {
            reference_data_dir: std::env::var("REFERENCE_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.reference_data_dir),
            agent_timeout: Duration::from_secs(parse_env("AGENT_TIMEOUT_SECS", 90)?),
            failure_policy: std::env::var("AGENT_FAILURE_POLICY")
                .ok()
                .map(|v| v.parse())
                .transpose()?
                .unwrap_or_default(),
            scan_skills_without_role: parse_env("SCAN_SKILLS_WITHOUT_ROLE", false)?,
        };

        Ok(Config {
            s3_bucket: require_env("S3_BUCKET")?,
            s3_endpoint: require_env("S3_ENDPOINT")?,
            aws_access_key_id: require_env("AWS_ACCESS_KEY_ID")?,
            aws_secret_access_key: require_env("AWS_SECRET_ACCESS_KEY")?,
            anthropic_api_key: require_env("ANTHROPIC_API_KEY")?,
            port: parse_env("PORT", 8080)?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
            max_upload_bytes: parse_env("MAX_UPLOAD_BYTES", 10 * 1024 * 1024)?,
            pipeline,
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}

fn parse_env<T>(key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .with_context(|| format!("{key} has an invalid value '{raw}'")),
        Err(_) => Ok(default),
    }
}
