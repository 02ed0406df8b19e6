//! LLM call logging (spec A.3, ambient regardless of Non-goals): gated by
//! the `HCME_LOG_LLM_CALLS` environment flag, one `{prompt.txt, response.txt,
//! metadata.json}` triplet per call under `<log_dir>/<caller>/<timestamp>/`.

use crate::Result;
use chrono::Utc;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

const LOG_ENV_FLAG: &str = "HCME_LOG_LLM_CALLS";
const ANALYSIS_ENV_FLAG: &str = "HCME_LOG_LLM_ANALYSIS";

pub fn analysis_enabled() -> bool {
    std::env::var(ANALYSIS_ENV_FLAG).map(|v| v != "0").unwrap_or(false)
}

/// Schedules a best-effort, out-of-band analysis pass over a logged call.
/// Never propagates failures to the caller — this is a diagnostic side
/// channel, not part of the primary request path (spec A.3).
pub fn schedule_analysis<F>(task: F)
where
    F: std::future::Future<Output = Result<()>> + Send + 'static,
{
    if !analysis_enabled() {
        return;
    }
    tokio::spawn(async move {
        if let Err(err) = task.await {
            eprintln!("llm call analysis pass failed: {err}");
        }
    });
}

#[derive(Debug, Serialize)]
pub struct CallMetadata {
    pub caller: String,
    pub model: String,
    pub duration_ms: u64,
    pub success: bool,
}

pub struct LlmCallLogger {
    log_dir: PathBuf,
    enabled: bool,
}

impl LlmCallLogger {
    pub fn new(log_dir: PathBuf) -> Self {
        Self {
            log_dir,
            enabled: std::env::var(LOG_ENV_FLAG).map(|v| v != "0").unwrap_or(false),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Writes the call triplet and returns the directory it wrote to, or
    /// `None` when logging is disabled.
    pub fn log_call(&self, prompt: &str, response: &str, metadata: &CallMetadata) -> Result<Option<PathBuf>> {
        if !self.enabled {
            return Ok(None);
        }
        let call_dir = self.log_dir.join(&metadata.caller).join(Utc::now().format("%Y%m%dT%H%M%S%.3f").to_string());
        write_call(&call_dir, prompt, response, metadata)?;
        Ok(Some(call_dir))
    }
}

fn write_call(dir: &Path, prompt: &str, response: &str, metadata: &CallMetadata) -> Result<()> {
    fs::create_dir_all(dir)?;
    fs::write(dir.join("prompt.txt"), prompt)?;
    fs::write(dir.join("response.txt"), response)?;
    let metadata_json = serde_json::to_string_pretty(metadata).map_err(|e| crate::Error::Config(e.to_string()))?;
    fs::write(dir.join("metadata.json"), metadata_json)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn disabled_logger_writes_nothing() {
        std::env::remove_var(LOG_ENV_FLAG);
        let dir = TempDir::new().unwrap();
        let logger = LlmCallLogger::new(dir.path().to_path_buf());
        let metadata = CallMetadata {
            caller: "summarizer".to_string(),
            model: "test-model".to_string(),
            duration_ms: 10,
            success: true,
        };
        let result = logger.log_call("prompt", "response", &metadata).unwrap();
        assert!(result.is_none());
        assert!(fs::read_dir(dir.path()).unwrap().next().is_none());
    }

    #[test]
    fn enabled_logger_writes_triplet() {
        std::env::set_var(LOG_ENV_FLAG, "1");
        let dir = TempDir::new().unwrap();
        let logger = LlmCallLogger::new(dir.path().to_path_buf());
        let metadata = CallMetadata {
            caller: "summarizer".to_string(),
            model: "test-model".to_string(),
            duration_ms: 10,
            success: true,
        };
        let call_dir = logger.log_call("my prompt", "my response", &metadata).unwrap().unwrap();
        assert_eq!(fs::read_to_string(call_dir.join("prompt.txt")).unwrap(), "my prompt");
        assert_eq!(fs::read_to_string(call_dir.join("response.txt")).unwrap(), "my response");
        assert!(call_dir.join("metadata.json").exists());
        std::env::remove_var(LOG_ENV_FLAG);
    }
}
