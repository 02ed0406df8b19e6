use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Resolve the workspace data directory: explicit path, then `HCME_PATH`,
/// then the XDG data dir, then `~/.hcme`.
pub fn resolve_workspace_path(explicit_path: Option<&str>) -> Result<PathBuf> {
    if let Some(path) = explicit_path {
        return Ok(expand_tilde(path));
    }
    if let Ok(env_path) = std::env::var("HCME_PATH") {
        return Ok(expand_tilde(&env_path));
    }
    if let Some(data_dir) = dirs::data_dir() {
        return Ok(data_dir.join("hcme"));
    }
    if let Some(home) = std::env::var_os("HOME") {
        return Ok(PathBuf::from(home).join(".hcme"));
    }
    Err(Error::Config(
        "could not determine workspace path: no HOME directory or XDG data directory found".to_string(),
    ))
}

fn expand_tilde(path: &str) -> PathBuf {
    if let Some(stripped) = path.strip_prefix("~/")
        && let Some(home) = std::env::var_os("HOME")
    {
        return PathBuf::from(home).join(stripped);
    }
    PathBuf::from(path)
}

/// The single immutable configuration record (spec §6, expanded in full at
/// A.5). Per-call overrides live in the caller's own options structs, never
/// here.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub max_context_chars: usize,
    pub l1_threshold_percent: u8,
    pub l2_threshold_percent: u8,
    pub last_user_queries_percent: u8,
    pub recent_turns_percent: u8,
    pub recent_l1_summaries_percent: u8,
    pub code_search_percent: u8,
    pub code_search_initial_limit: usize,
    pub embedding_soft_cap_chars: usize,
    pub batch_fanout: usize,
    pub max_iterations: usize,
    pub max_tool_call_rounds: usize,
    pub tool_context_summarize_threshold_chars: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_context_chars: 100_000,
            l1_threshold_percent: 10,
            l2_threshold_percent: 10,
            last_user_queries_percent: 5,
            recent_turns_percent: 5,
            recent_l1_summaries_percent: 10,
            code_search_percent: 10,
            code_search_initial_limit: 100,
            embedding_soft_cap_chars: 4_000,
            batch_fanout: 5,
            max_iterations: 10,
            max_tool_call_rounds: 10,
            tool_context_summarize_threshold_chars: 50_000,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::default_path()?)
    }

    pub fn load_from(path: &PathBuf) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::default_path()?)
    }

    pub fn save_to(&self, path: &PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self).map_err(Error::from)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn default_path() -> Result<PathBuf> {
        Ok(resolve_workspace_path(None)?.join("config.toml"))
    }

    /// `l1_threshold_percent`/`l2_threshold_percent` are expressed as a
    /// share of `max_context_chars`; the trigger functions in
    /// `hcme-engine::summarization` take an absolute char count.
    pub fn l1_threshold_chars(&self) -> u64 {
        (self.max_context_chars as u64) * self.l1_threshold_percent as u64 / 100
    }

    pub fn l2_threshold_chars(&self) -> u64 {
        (self.max_context_chars as u64) * self.l2_threshold_percent as u64 / 100
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn default_config_matches_spec_defaults() {
        let config = Config::default();
        assert_eq!(config.max_context_chars, 100_000);
        assert_eq!(config.batch_fanout, 5);
        assert_eq!(config.tool_context_summarize_threshold_chars, 50_000);
    }

    #[test]
    fn threshold_chars_derive_from_percent_of_max() {
        let config = Config {
            max_context_chars: 1000,
            l1_threshold_percent: 10,
            l2_threshold_percent: 25,
            ..Config::default()
        };
        assert_eq!(config.l1_threshold_chars(), 100);
        assert_eq!(config.l2_threshold_chars(), 250);
    }

    #[test]
    fn save_and_load_round_trips() -> Result<()> {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        let config = Config {
            max_context_chars: 5_000,
            ..Config::default()
        };
        config.save_to(&path)?;
        let loaded = Config::load_from(&path)?;
        assert_eq!(loaded, config);
        Ok(())
    }

    #[test]
    fn load_from_missing_path_returns_default() -> Result<()> {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing.toml");
        let loaded = Config::load_from(&path)?;
        assert_eq!(loaded, Config::default());
        Ok(())
    }
}
