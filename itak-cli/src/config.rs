//! Configuration discovery, `ITAK_SET_` overrides, and the typed
//! `ItakConfig` document.
//!
//! Grounded directly on `clawft-platform::config_loader`: the same
//! `ITAK_CONFIG`-env-var-then-home-dir fallback chain and camelCase ->
//! snake_case key normalization, adapted per SPEC_FULL.md §B (the legacy
//! `.nanobot` fallback is replaced with `./itak.config.json`, since iTaK
//! has no such legacy name to carry over).

use itak_core::AgentConfig;
use itak_types::secret::SecretString;
use serde::Deserialize;
use serde_json::Value;
use std::path::PathBuf;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub provider: String,
    pub base_url: String,
    pub model_name: String,
    pub api_key: SecretString,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            provider: "openai".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            model_name: "gpt-4o-mini".to_string(),
            api_key: SecretString::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RateLimitsConfig {
    pub daily_budget_usd: f64,
}

impl Default for RateLimitsConfig {
    fn default() -> Self {
        Self { daily_budget_usd: 5.0 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub web_search_endpoint: Option<String>,
    pub memory_path: PathBuf,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self { web_search_endpoint: None, memory_path: PathBuf::from("data/memory/MEMORY.md") }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ItakConfig {
    pub agent: AgentConfig,
    pub model: ModelConfig,
    pub rate_limits: RateLimitsConfig,
    pub tools: ToolsConfig,
    #[serde(default)]
    pub mcp_servers: Vec<itak_types::mcp::MCPServerConfig>,
    pub data_dir: PathBuf,
}

impl Default for ItakConfig {
    fn default() -> Self {
        Self {
            agent: AgentConfig::default(),
            model: ModelConfig::default(),
            rate_limits: RateLimitsConfig::default(),
            tools: ToolsConfig::default(),
            mcp_servers: Vec::new(),
            data_dir: PathBuf::from("data"),
        }
    }
}

/// Discovers the config file path: `ITAK_CONFIG` env var, else
/// `~/.itak/config.json`, else `./itak.config.json`. Returns `None` if
/// nothing exists at any candidate.
pub fn discover_config_path(explicit: Option<&str>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(PathBuf::from(path));
    }
    if let Ok(env_path) = std::env::var("ITAK_CONFIG") {
        return Some(PathBuf::from(env_path));
    }
    if let Some(home) = dirs::home_dir() {
        let candidate = home.join(".itak").join("config.json");
        if candidate.exists() {
            return Some(candidate);
        }
    }
    let local = PathBuf::from("itak.config.json");
    if local.exists() {
        return Some(local);
    }
    None
}

/// Loads raw JSON from the discovered config path, normalizing camelCase
/// keys to snake_case. A missing or unreadable file yields an empty
/// object, never an error -- config is always optional.
pub fn load_config_raw(explicit: Option<&str>) -> Value {
    let Some(path) = discover_config_path(explicit) else {
        tracing::info!("no config file found, using defaults");
        return Value::Object(serde_json::Map::new());
    };
    match std::fs::read_to_string(&path) {
        Ok(contents) => match serde_json::from_str(&contents) {
            Ok(value) => normalize_keys(value),
            Err(err) => {
                tracing::warn!(path = %path.display(), %err, "failed to parse config file, using defaults");
                Value::Object(serde_json::Map::new())
            }
        },
        Err(err) => {
            tracing::warn!(path = %path.display(), %err, "failed to read config file, using defaults");
            Value::Object(serde_json::Map::new())
        }
    }
}

pub fn normalize_keys(value: Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut out = serde_json::Map::new();
            for (key, val) in map {
                out.insert(camel_to_snake(&key), normalize_keys(val));
            }
            Value::Object(out)
        }
        Value::Array(arr) => Value::Array(arr.into_iter().map(normalize_keys).collect()),
        other => other,
    }
}

fn camel_to_snake(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut result = String::with_capacity(name.len() + 4);
    for (i, &ch) in chars.iter().enumerate() {
        if ch.is_uppercase() && i > 0 {
            let prev = chars[i - 1];
            let next = chars.get(i + 1).copied();
            if prev.is_lowercase() || (prev.is_uppercase() && next.is_some_and(|c| c.is_lowercase())) {
                result.push('_');
            }
        }
        result.push(ch.to_ascii_lowercase());
    }
    result
}

/// One `ITAK_SET_<DOTTED.PATH>` override that couldn't be applied because
/// its path doesn't resolve against the existing document.
#[derive(Debug, Clone)]
pub struct ConfigOverrideError {
    pub path: String,
    pub reason: String,
}

/// Applies every `ITAK_SET_<DOTTED.PATH>=<value>` environment variable to
/// `config` in place (spec.md §6). A path segment that doesn't resolve to
/// an existing object is collected as a warning, never a hard failure.
pub fn apply_env_overrides(config: &mut Value) -> Vec<ConfigOverrideError> {
    let mut errors = Vec::new();
    for (key, value) in std::env::vars() {
        let Some(dotted) = key.strip_prefix("ITAK_SET_") else {
            continue;
        };
        let path: Vec<String> = dotted.split('.').map(|s| s.to_lowercase()).collect();
        if path.is_empty() {
            continue;
        }
        if let Err(reason) = set_path(config, &path, Value::String(value)) {
            errors.push(ConfigOverrideError { path: dotted.to_string(), reason });
        }
    }
    for err in &errors {
        tracing::warn!(path = %err.path, reason = %err.reason, "ITAK_SET_ override could not be applied");
    }
    errors
}

fn set_path(root: &mut Value, path: &[String], value: Value) -> Result<(), String> {
    let Some((last, rest)) = path.split_last() else {
        return Err("empty override path".to_string());
    };
    let mut current = root;
    for segment in rest {
        if !current.is_object() {
            *current = Value::Object(serde_json::Map::new());
        }
        current = current
            .as_object_mut()
            .unwrap()
            .entry(segment.clone())
            .or_insert_with(|| Value::Object(serde_json::Map::new()));
    }
    if !current.is_object() {
        return Err(format!("path segment '{segment}' is not an object", segment = rest.last().unwrap_or(last)));
    }
    current.as_object_mut().unwrap().insert(last.clone(), value);
    Ok(())
}

/// Loads the full typed config: discover -> normalize -> override ->
/// deserialize. Override failures are logged, never fatal.
pub fn load(explicit: Option<&str>) -> ItakConfig {
    let mut raw = load_config_raw(explicit);
    apply_env_overrides(&mut raw);
    serde_json::from_value(raw).unwrap_or_else(|err| {
        tracing::warn!(%err, "config document failed to deserialize, using defaults");
        ItakConfig::default()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn camel_to_snake_basic() {
        assert_eq!(camel_to_snake("maxIterations"), "max_iterations");
        assert_eq!(camel_to_snake("already_snake"), "already_snake");
    }

    #[test]
    fn normalize_keys_nested() {
        let input = serde_json::json!({"modelName": "gpt-4", "agent": {"maxIterations": 10}});
        let expected = serde_json::json!({"model_name": "gpt-4", "agent": {"max_iterations": 10}});
        assert_eq!(normalize_keys(input), expected);
    }

    #[test]
    fn empty_document_deserializes_to_defaults() {
        let config: ItakConfig = serde_json::from_value(serde_json::json!({})).unwrap();
        assert_eq!(config.agent.max_iterations, 25);
        assert_eq!(config.model.provider, "openai");
    }

    #[test]
    fn set_path_builds_missing_objects() {
        let mut doc = serde_json::json!({});
        set_path(&mut doc, &["agent".to_string(), "max_iterations".to_string()], serde_json::json!(10)).unwrap();
        assert_eq!(doc["agent"]["max_iterations"], serde_json::json!(10));
    }

    #[test]
    fn set_path_rejects_non_object_segment() {
        let mut doc = serde_json::json!({"agent": "not-an-object"});
        let result = set_path(&mut doc, &["agent".to_string(), "max_iterations".to_string()], serde_json::json!(10));
        assert!(result.is_err());
    }
}
