//! Result record emitted once per playthrough.
//!
//! This is the only artifact reporting consumes, so the JSON layout is kept
//! flat and stable.

use chrono::{DateTime, Utc};
use epsilon_error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// How the agent issues actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Modality {
    /// One free-text command per turn
    Text,
    /// Structured tool calls, several per turn allowed
    Tools,
}

impl Modality {
    pub fn as_str(&self) -> &'static str {
        match self {
            Modality::Text => "text",
            Modality::Tools => "tools",
        }
    }
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Modality {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "text" | "bash" => Ok(Modality::Text),
            "tools" | "mcp" => Ok(Modality::Tools),
            other => Err(Error::parse_failed(format!("unknown modality '{}'", other))
                .with_context("expected", "text | tools")),
        }
    }
}

/// Why a playthrough stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Termination {
    Won,
    GaveUp,
    TokenLimit,
    ForcedStop,
    ProviderError,
}

impl Termination {
    pub fn as_str(&self) -> &'static str {
        match self {
            Termination::Won => "won",
            Termination::GaveUp => "gave-up",
            Termination::TokenLimit => "token-limit",
            Termination::ForcedStop => "forced-stop",
            Termination::ProviderError => "provider-error",
        }
    }
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One executed command and what came back
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandEntry {
    pub command: String,
    /// Tool name when the command came from a tool call
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool: Option<String>,
    pub output: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunRecord {
    pub model: String,
    /// Display label; defaults to the model id
    pub label: String,
    pub mode: Modality,
    /// Executor that served the text modality ("engine" or "shell")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend: Option<String>,
    pub won: bool,
    pub gave_up: bool,
    pub termination: Termination,
    /// Provider failure message when `termination` is `provider-error`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
    pub total_tokens: usize,
    pub turns: usize,
    pub commands: Vec<CommandEntry>,
    pub timestamp: DateTime<Utc>,
}

impl RunRecord {
    /// `<label>_<mode>.json`, with path separators and spaces made safe
    pub fn file_name(&self) -> String {
        format!("{}_{}.json", safe_label(&self.label), self.mode)
    }

    /// Write as pretty JSON into `dir`, creating it if needed
    pub fn save(&self, dir: &Path) -> Result<PathBuf> {
        std::fs::create_dir_all(dir)
            .map_err(|e| Error::from(e).with_operation("record::save"))?;

        let path = dir.join(self.file_name());
        let json = serde_json::to_string_pretty(self).map_err(|e| {
            Error::serialization_failed(e.to_string())
                .with_operation("record::save")
                .set_source(e)
        })?;
        std::fs::write(&path, json).map_err(|e| {
            Error::from(e)
                .with_operation("record::save")
                .with_context("path", path.display().to_string())
        })?;
        Ok(path)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            Error::from(e)
                .with_operation("record::load")
                .with_context("path", path.display().to_string())
        })?;
        serde_json::from_str(&text).map_err(|e| {
            Error::parse_failed(e.to_string())
                .with_operation("record::load")
                .with_context("path", path.display().to_string())
                .set_source(e)
        })
    }
}

pub fn safe_label(label: &str) -> String {
    label.replace([' ', '/'], "_")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record() -> RunRecord {
        RunRecord {
            model: "openai/gpt-oss-120b".into(),
            label: "gpt oss/120b".into(),
            mode: Modality::Tools,
            backend: None,
            won: true,
            gave_up: false,
            termination: Termination::Won,
            error: None,
            prompt_tokens: 900,
            completion_tokens: 100,
            total_tokens: 1000,
            turns: 4,
            commands: vec![CommandEntry {
                command: "go north".into(),
                tool: Some("go".into()),
                output: "You enter the Corridor.".into(),
            }],
            timestamp: Utc::now(),
        }
    }

    #[test]
    fn test_modality_parse() {
        assert_eq!("text".parse::<Modality>().unwrap(), Modality::Text);
        assert_eq!("MCP".parse::<Modality>().unwrap(), Modality::Tools);
        assert!("voice".parse::<Modality>().is_err());
    }

    #[test]
    fn test_termination_serializes_kebab_case() {
        let json = serde_json::to_value(Termination::ProviderError).unwrap();
        assert_eq!(json, "provider-error");
        assert_eq!(Termination::TokenLimit.to_string(), "token-limit");
    }

    #[test]
    fn test_file_name_is_safe() {
        assert_eq!(record().file_name(), "gpt_oss_120b_tools.json");
    }

    #[test]
    fn test_save_and_load() {
        let dir = TempDir::new().unwrap();
        let rec = record();

        let path = rec.save(&dir.path().join("logs")).unwrap();
        assert!(path.exists());

        let json: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(json["mode"], "tools");
        assert_eq!(json["termination"], "won");
        assert!(json.get("error").is_none());
        assert!(json["timestamp"].as_str().unwrap().contains('T'));

        assert_eq!(RunRecord::load(&path).unwrap(), rec);
    }

    #[test]
    fn test_load_rejects_incomplete_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("partial.json");
        std::fs::write(&path, r#"{"model": "x"}"#).unwrap();

        let err = RunRecord::load(&path).unwrap_err();
        assert_eq!(err.kind(), epsilon_error::ErrorKind::ParseFailed);
    }
}
