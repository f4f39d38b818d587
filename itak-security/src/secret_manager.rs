//! Two-store secret resolution: `.env` file + well-known OS environment
//! variables, with `{{placeholder}}` substitution (SPEC_FULL.md §B).
//!
//! Grounded directly, field-for-field, on
//! `original_source/security/secrets.py`.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashMap;
use std::path::Path;

static PLACEHOLDER_PATTERN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{\{(\w+)\}\}").unwrap());

/// OS environment keys consulted when a value is absent from the loaded
/// `.env` file (docker/CI style injection).
const WELL_KNOWN_ENV_KEYS: &[&str] = &[
    "OPENAI_API_KEY",
    "ANTHROPIC_API_KEY",
    "GOOGLE_API_KEY",
    "OPENROUTER_API_KEY",
    "GROQ_API_KEY",
    "DISCORD_TOKEN",
    "TELEGRAM_TOKEN",
    "SLACK_TOKEN",
    "SLACK_APP_TOKEN",
    "NEO4J_PASSWORD",
    "WEAVIATE_API_KEY",
];

/// Loads secrets from a `.env` file and a fixed set of well-known OS
/// environment variables, and resolves `{{placeholder}}` references in
/// prompt/config text against them.
pub struct SecretManager {
    secrets: HashMap<String, String>,
}

impl SecretManager {
    /// Loads `.env` from `env_path` (missing file is a warning, not an
    /// error) and falls back to the OS environment for well-known keys.
    pub fn load(env_path: &Path) -> Self {
        let mut secrets = HashMap::new();
        Self::load_env_file(env_path, &mut secrets);
        Self::load_os_env(&mut secrets);
        Self { secrets }
    }

    fn load_env_file(path: &Path, secrets: &mut HashMap<String, String>) {
        let iter = match dotenvy::from_path_iter(path) {
            Ok(iter) => iter,
            Err(_) => {
                tracing::warn!(path = %path.display(), "env file not found");
                return;
            }
        };
        for item in iter {
            match item {
                Ok((key, value)) => {
                    if !value.is_empty() {
                        secrets.insert(key, value);
                    }
                }
                Err(err) => tracing::warn!(%err, "failed to parse .env line"),
            }
        }
        tracing::info!(count = secrets.len(), "loaded secrets from .env");
    }

    fn load_os_env(secrets: &mut HashMap<String, String>) {
        for key in WELL_KNOWN_ENV_KEYS {
            if secrets.contains_key(*key) {
                continue;
            }
            if let Ok(val) = std::env::var(key) {
                if !val.is_empty() {
                    secrets.insert((*key).to_string(), val);
                }
            }
        }
    }

    /// Gets a secret by key, falling back to the OS environment, then a
    /// caller-supplied default.
    pub fn get(&self, key: &str, default: &str) -> String {
        self.secrets
            .get(key)
            .cloned()
            .or_else(|| std::env::var(key).ok())
            .unwrap_or_else(|| default.to_string())
    }

    /// Resolves a config value of the form `"$ENV_VAR"` against the loaded
    /// store. Values not starting with `$` pass through unchanged.
    pub fn resolve_config_value(&self, value: &str) -> String {
        match value.strip_prefix('$') {
            Some(env_key) => {
                let resolved = self.get(env_key, value);
                resolved
            }
            None => value.to_string(),
        }
    }

    /// Replaces every `{{key}}` occurrence in `text` with its resolved
    /// value. An unresolved placeholder is left as-is and logged at warn
    /// level -- never a hard error, since config/prompts may legitimately
    /// reference secrets this deployment doesn't configure.
    pub fn replace_placeholders(&self, text: &str) -> String {
        PLACEHOLDER_PATTERN
            .replace_all(text, |caps: &regex::Captures| {
                let key = &caps[1];
                let value = self.get(key, "");
                if !value.is_empty() {
                    value
                } else {
                    tracing::warn!(placeholder = key, "unresolved placeholder");
                    caps[0].to_string()
                }
            })
            .into_owned()
    }

    /// Masks all known secret values occurring verbatim in `text` (used for
    /// internal log payloads, not the `OutputGuard` pattern-based redactor).
    pub fn mask_in_text(&self, text: &str) -> String {
        let mut result = text.to_string();
        for value in self.secrets.values() {
            if value.len() > 3 && result.contains(value.as_str()) {
                result = result.replace(value.as_str(), &mask_value(value));
            }
        }
        result
    }

    /// Registers every loaded secret value with the structured event
    /// logger's mask registry (spec.md §4.6 layer 1, SPEC_FULL.md §B).
    pub fn register_with_logger(&self, logger: &mut crate::LoggerSecretSink) {
        for value in self.secrets.values() {
            if value.len() > 3 {
                logger.register_secret(value);
            }
        }
    }

    /// Secret key names only -- never the values.
    pub fn available_keys(&self) -> Vec<&str> {
        self.secrets.keys().map(String::as_str).collect()
    }

    pub fn has(&self, key: &str) -> bool {
        self.secrets.contains_key(key) || std::env::var(key).is_ok()
    }
}

/// Same masking scheme as `SecretManager::mask_in_text`, exposed standalone
/// so `itak_core::logger::Logger` can apply it without depending back on
/// `SecretManager`.
pub fn mask_value(value: &str) -> String {
    if value.len() > 5 {
        format!("{}***{}", &value[..3], &value[value.len() - 2..])
    } else if value.len() > 3 {
        format!("{}***", &value[..3])
    } else {
        "***".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_env_file(contents: &str) -> tempfile_path::TempEnvFile {
        tempfile_path::TempEnvFile::new(contents)
    }

    // Minimal self-contained temp-file helper, avoiding a `tempfile`
    // dependency for a single test module.
    mod tempfile_path {
        use std::io::Write;
        pub struct TempEnvFile {
            pub path: std::path::PathBuf,
        }
        impl TempEnvFile {
            pub fn new(contents: &str) -> Self {
                let path = std::env::temp_dir().join(format!(
                    "itak-secret-test-{}.env",
                    std::process::id()
                ));
                let mut f = std::fs::File::create(&path).unwrap();
                f.write_all(contents.as_bytes()).unwrap();
                Self { path }
            }
        }
        impl Drop for TempEnvFile {
            fn drop(&mut self) {
                let _ = std::fs::remove_file(&self.path);
            }
        }
    }

    #[test]
    fn loads_key_value_pairs_from_env_file() {
        let f = write_env_file("OPENAI_API_KEY=sk-test-123456\n# comment\nEMPTY=\n");
        let mgr = SecretManager::load(&f.path);
        assert_eq!(mgr.get("OPENAI_API_KEY", ""), "sk-test-123456");
        assert!(!mgr.has("EMPTY"));
    }

    #[test]
    fn strips_surrounding_quotes() {
        let f = write_env_file("TOKEN=\"quoted-value\"\n");
        let mgr = SecretManager::load(&f.path);
        assert_eq!(mgr.get("TOKEN", ""), "quoted-value");
    }

    #[test]
    fn resolve_config_value_handles_dollar_prefix() {
        let f = write_env_file("MY_KEY=abc123\n");
        let mgr = SecretManager::load(&f.path);
        assert_eq!(mgr.resolve_config_value("$MY_KEY"), "abc123");
        assert_eq!(mgr.resolve_config_value("plain"), "plain");
    }

    #[test]
    fn replace_placeholders_substitutes_known_and_leaves_unknown() {
        let f = write_env_file("NAME=iTaK\n");
        let mgr = SecretManager::load(&f.path);
        let out = mgr.replace_placeholders("hello {{NAME}}, {{MISSING}}");
        assert_eq!(out, "hello iTaK, {{MISSING}}");
    }

    #[test]
    fn mask_value_keeps_prefix_and_suffix_for_long_values() {
        assert_eq!(mask_value("sk-abcdefgh"), "sk-***gh");
    }

    #[test]
    fn mask_value_short_values_have_no_suffix() {
        assert_eq!(mask_value("abcd"), "abc***");
    }

    #[test]
    fn mask_in_text_replaces_occurrences() {
        let f = write_env_file("TOKEN=super-secret-value-123\n");
        let mgr = SecretManager::load(&f.path);
        let out = mgr.mask_in_text("the token is super-secret-value-123 ok");
        assert!(!out.contains("super-secret-value-123"));
        assert!(out.contains("sup***23"));
    }
}
