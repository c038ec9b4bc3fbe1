//! Application configuration for Underwriter.
//!
//! User config lives at `~/.underwriter/underwriter.toml`.
//! CLI flags override config file values, which override defaults.
//! The API key itself is never stored; only the name of the env var holding it.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Result, UnderwriterError};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "underwriter.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".underwriter";

/// Default attachment size ceiling (50 MiB).
pub const DEFAULT_MAX_ATTACHMENT_BYTES: u64 = 50 * 1024 * 1024;

// ---------------------------------------------------------------------------
// Config structs (matching underwriter.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Model endpoint settings.
    #[serde(default)]
    pub anthropic: AnthropicConfig,

    /// System instruction document.
    #[serde(default)]
    pub prompt: PromptConfig,

    /// Attachment ingestion limits.
    #[serde(default)]
    pub attachments: AttachmentsConfig,

    /// HTTP API listener.
    #[serde(default)]
    pub server: ServerConfig,
}

/// `[anthropic]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnthropicConfig {
    /// Name of the env var holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Model identifier sent with every request.
    #[serde(default = "default_model")]
    pub model: String,

    /// Maximum output tokens per answer.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Messages endpoint URL.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Value of the `anthropic-version` header.
    #[serde(default = "default_api_version")]
    pub api_version: String,

    /// Request timeout in seconds; 0 disables it.
    #[serde(default)]
    pub timeout_secs: u64,
}

impl Default for AnthropicConfig {
    fn default() -> Self {
        Self {
            api_key_env: default_api_key_env(),
            model: default_model(),
            max_tokens: default_max_tokens(),
            endpoint: default_endpoint(),
            api_version: default_api_version(),
            timeout_secs: 0,
        }
    }
}

fn default_api_key_env() -> String {
    "ANTHROPIC_API_KEY".into()
}
fn default_model() -> String {
    "claude-sonnet-4-5".into()
}
fn default_max_tokens() -> u32 {
    16_000
}
fn default_endpoint() -> String {
    "https://api.anthropic.com/v1/messages".into()
}
fn default_api_version() -> String {
    "2023-06-01".into()
}

/// `[prompt]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptConfig {
    /// Path to the system instruction document, relative to the working directory.
    #[serde(default = "default_system_prompt_path")]
    pub system_prompt_path: String,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            system_prompt_path: default_system_prompt_path(),
        }
    }
}

fn default_system_prompt_path() -> String {
    "system_prompt.txt".into()
}

/// `[attachments]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AttachmentsConfig {
    /// Largest accepted file, in bytes.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: u64,
}

impl Default for AttachmentsConfig {
    fn default() -> Self {
        Self {
            max_bytes: default_max_bytes(),
        }
    }
}

fn default_max_bytes() -> u64 {
    DEFAULT_MAX_ATTACHMENT_BYTES
}

/// `[server]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".into()
}
fn default_port() -> u16 {
    3000
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.underwriter/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| UnderwriterError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.underwriter/underwriter.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| UnderwriterError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        UnderwriterError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| UnderwriterError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| UnderwriterError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| UnderwriterError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Read the model API key from the configured env var.
pub fn resolve_api_key(config: &AppConfig) -> Result<String> {
    let var_name = &config.anthropic.api_key_env;
    match std::env::var(var_name) {
        Ok(val) if !val.trim().is_empty() => Ok(val),
        _ => Err(UnderwriterError::config(format!(
            "{var_name} is not set. Add it to your environment."
        ))),
    }
}

/// Read the system instruction document from the configured path.
///
/// Relative paths resolve against the current working directory.
pub fn load_system_prompt(config: &AppConfig) -> Result<String> {
    let configured = PathBuf::from(&config.prompt.system_prompt_path);
    let path = if configured.is_absolute() {
        configured
    } else {
        let cwd = std::env::current_dir().map_err(|e| UnderwriterError::io(".", e))?;
        cwd.join(configured)
    };

    if !path.is_file() {
        return Err(UnderwriterError::config(format!(
            "system_prompt.txt not found at {}. Ensure it exists at the project root.",
            path.display()
        )));
    }

    std::fs::read_to_string(&path).map_err(|e| UnderwriterError::io(&path, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_serializes() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize default config");
        assert!(toml_str.contains("ANTHROPIC_API_KEY"));
        assert!(toml_str.contains("system_prompt.txt"));
    }

    #[test]
    fn config_roundtrip() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).expect("serialize");
        let parsed: AppConfig = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.anthropic.max_tokens, 16_000);
        assert_eq!(parsed.anthropic.api_version, "2023-06-01");
        assert_eq!(parsed.attachments.max_bytes, DEFAULT_MAX_ATTACHMENT_BYTES);
        assert_eq!(parsed.server.port, 3000);
    }

    #[test]
    fn partial_config_fills_defaults() {
        let toml_str = r#"
[anthropic]
model = "claude-opus-4"

[attachments]
max_bytes = 1024
"#;
        let config: AppConfig = toml::from_str(toml_str).expect("parse");
        assert_eq!(config.anthropic.model, "claude-opus-4");
        assert_eq!(config.anthropic.api_key_env, "ANTHROPIC_API_KEY");
        assert_eq!(config.attachments.max_bytes, 1024);
        assert_eq!(config.prompt.system_prompt_path, "system_prompt.txt");
    }

    #[test]
    fn load_config_from_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("underwriter.toml");
        std::fs::write(&path, "[server]\nport = 8088\n").expect("write");
        let config = load_config_from(&path).expect("load");
        assert_eq!(config.server.port, 8088);
        assert_eq!(config.server.host, "127.0.0.1");
    }

    #[test]
    fn api_key_missing() {
        let mut config = AppConfig::default();
        // Use a unique env var name to avoid interfering with other tests
        config.anthropic.api_key_env = "UW_TEST_NONEXISTENT_KEY_12345".into();
        let err = resolve_api_key(&config).unwrap_err();
        assert!(matches!(err, UnderwriterError::Config { .. }));
        assert!(err.to_string().contains("UW_TEST_NONEXISTENT_KEY_12345 is not set"));
    }

    #[test]
    fn system_prompt_missing_and_present() {
        let dir = tempfile::tempdir().expect("tempdir");
        let mut config = AppConfig::default();

        let path = dir.path().join("system_prompt.txt");
        config.prompt.system_prompt_path = path.to_string_lossy().into_owned();
        let err = load_system_prompt(&config).unwrap_err();
        assert!(err.to_string().contains("not found"));

        std::fs::write(&path, "You are an underwriter.").expect("write");
        let text = load_system_prompt(&config).expect("load");
        assert_eq!(text, "You are an underwriter.");
    }
}
