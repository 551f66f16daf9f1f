// Contract-Drafter: Error types

use std::time::Duration;

/// Errors surfaced by the drafting pipeline.
///
/// Only a handful of these ever reach a caller: the coordinator and the
/// workers convert everything into log lines, default sections, or the
/// informational `error` string on the session state.
#[derive(Debug, thiserror::Error)]
pub enum DrafterError {
    #[error("LLM error: {0}")]
    Llm(String),

    #[error("LLM call timed out after {0:?}")]
    Timeout(Duration),

    #[error("Failed to parse model output: {0}")]
    Parse(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Prompt not found: {0}")]
    Prompt(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl From<anyhow::Error> for DrafterError {
    fn from(err: anyhow::Error) -> Self {
        DrafterError::Llm(err.to_string())
    }
}

/// Failure of a single worker attempt. Never escapes the worker.
#[derive(Debug, thiserror::Error)]
pub enum WorkerError {
    #[error("model call failed: {0}")]
    Llm(String),

    #[error("model call timed out after {0:?}")]
    Timeout(Duration),

    #[error("response is not valid JSON: {0}")]
    InvalidJson(String),

    #[error("response contained no data for section '{0}'")]
    EmptyBody(String),
}

pub type Result<T> = std::result::Result<T, DrafterError>;
