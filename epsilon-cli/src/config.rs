//! Model roster and provider selection

use epsilon_agent::ProviderConfig;
use epsilon_error::{Error, Result};
use serde::Deserialize;
use std::path::Path;

pub const OPENROUTER_KEY_VAR: &str = "OPENROUTER_API_KEY";
pub const OPENAI_KEY_VAR: &str = "OPENAI_API_KEY";

/// One `[[models]]` entry of the roster file
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ModelEntry {
    pub name: String,
    #[serde(default)]
    pub label: Option<String>,
}

impl ModelEntry {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            label: None,
        }
    }

    pub fn label(&self) -> &str {
        self.label.as_deref().unwrap_or(&self.name)
    }
}

#[derive(Debug, Deserialize)]
struct Roster {
    #[serde(default)]
    models: Vec<ModelEntry>,
}

pub fn parse_models(text: &str) -> Result<Vec<ModelEntry>> {
    let roster: Roster = toml::from_str(text).map_err(|e| {
        Error::config_invalid(e.to_string())
            .with_operation("config::parse_models")
            .set_source(e)
    })?;

    if roster.models.is_empty() {
        return Err(Error::config_invalid("no [[models]] entries").with_operation("config::parse_models"));
    }
    Ok(roster.models)
}

pub fn load_models(path: &Path) -> Result<Vec<ModelEntry>> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        Error::from(e)
            .with_operation("config::load_models")
            .with_context("path", path.display().to_string())
    })?;
    parse_models(&text).map_err(|e| e.with_context("path", path.display().to_string()))
}

/// Pick a provider for `model`.
///
/// An explicit base URL wins (any OpenAI-compatible server). Otherwise an
/// OpenRouter key selects OpenRouter, then an OpenAI key selects OpenAI.
/// A leading `openrouter/` on the model name is routing syntax, not part of
/// the model id, and is stripped.
pub fn resolve_provider(
    model: &str,
    base_url: Option<&str>,
    openrouter_key: Option<String>,
    openai_key: Option<String>,
) -> Result<ProviderConfig> {
    let model_id = model.strip_prefix("openrouter/").unwrap_or(model);

    if let Some(url) = base_url {
        let mut config = ProviderConfig::local(url, model_id);
        config.api_key = openrouter_key.or(openai_key);
        return Ok(config);
    }

    if let Some(key) = openrouter_key {
        return Ok(ProviderConfig::openrouter(key).with_model(model_id));
    }
    if let Some(key) = openai_key {
        return Ok(ProviderConfig::openai(key).with_model(model_id));
    }

    Err(Error::config_invalid(format!(
        "no API key: set {} or {}",
        OPENROUTER_KEY_VAR, OPENAI_KEY_VAR
    ))
    .with_operation("config::resolve_provider")
    .with_context("model", model))
}

/// `resolve_provider` with keys read from the environment
pub fn provider_from_env(model: &str, base_url: Option<&str>) -> Result<ProviderConfig> {
    resolve_provider(model, base_url, env_key(OPENROUTER_KEY_VAR), env_key(OPENAI_KEY_VAR))
}

fn env_key(var: &str) -> Option<String> {
    std::env::var(var).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use epsilon_agent::ProviderType;
    use epsilon_error::ErrorKind;
    use tempfile::TempDir;

    #[test]
    fn test_parse_models() {
        let models = parse_models(
            r#"
            [[models]]
            name = "openrouter/openai/gpt-oss-120b"
            label = "gpt-oss-120b"

            [[models]]
            name = "openrouter/google/gemini-2.5-flash"
            "#,
        )
        .unwrap();

        assert_eq!(models.len(), 2);
        assert_eq!(models[0].label(), "gpt-oss-120b");
        assert_eq!(models[1].label(), "openrouter/google/gemini-2.5-flash");
    }

    #[test]
    fn test_parse_models_rejects_empty_and_invalid() {
        assert_eq!(parse_models("").unwrap_err().kind(), ErrorKind::ConfigInvalid);
        assert_eq!(
            parse_models("[[models]]\nlabel = 3").unwrap_err().kind(),
            ErrorKind::ConfigInvalid
        );
    }

    #[test]
    fn test_load_models_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = load_models(&dir.path().join("models.toml")).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::FileNotFound);
    }

    #[test]
    fn test_resolve_prefers_openrouter() {
        let config = resolve_provider(
            "openrouter/openai/gpt-oss-120b",
            None,
            Some("or-key".into()),
            Some("oa-key".into()),
        )
        .unwrap();
        assert_eq!(config.provider_type, ProviderType::OpenRouter);
        assert_eq!(config.default_model.as_deref(), Some("openai/gpt-oss-120b"));
        assert_eq!(config.api_key.as_deref(), Some("or-key"));
    }

    #[test]
    fn test_resolve_falls_back_to_openai() {
        let config = resolve_provider("gpt-4o-mini", None, None, Some("oa-key".into())).unwrap();
        assert_eq!(config.provider_type, ProviderType::OpenAI);
        assert_eq!(config.default_model.as_deref(), Some("gpt-4o-mini"));
    }

    #[test]
    fn test_resolve_base_url_needs_no_key() {
        let config = resolve_provider("llama3", Some("http://localhost:11434/v1"), None, None).unwrap();
        assert_eq!(config.provider_type, ProviderType::Local);
        assert!(config.api_key.is_none());
    }

    #[test]
    fn test_resolve_without_key_fails() {
        let err = resolve_provider("gpt-4o", None, None, None).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ConfigInvalid);
        assert!(err.message().contains(OPENROUTER_KEY_VAR));
    }
}
