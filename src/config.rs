use std::path::{Path, PathBuf};
use std::time::Duration;

use eyre::Result;
use log::debug;
use serde::{Deserialize, Serialize};

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub model: String,
    pub max_output_tokens: u32,
    /// Override for the completion API base URL (gateways, local stubs)
    pub api_base: Option<String>,
    /// Proxy hosts tried in order by the proxy-network caption provider
    pub proxy_instances: Vec<String>,
    pub captions_timeout_secs: u64,
    pub proxy_timeout_secs: u64,
    pub subtitle_timeout_secs: u64,
    pub completion_timeout_secs: u64,
    /// Program plus leading arguments, e.g. `["python3", "-m", "yt_dlp"]`
    pub subtitle_tool: Vec<String>,
    pub subtitle_client: String,
    pub scratch_dir: Option<PathBuf>,
    pub bind: String,
    pub max_upload_bytes: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            max_output_tokens: 8192,
            api_base: None,
            proxy_instances: vec![
                "https://inv.nadeko.net".to_string(),
                "https://invidious.nerdvpn.de".to_string(),
                "https://yewtu.be".to_string(),
            ],
            captions_timeout_secs: 15,
            proxy_timeout_secs: 8,
            subtitle_timeout_secs: 120,
            completion_timeout_secs: 180,
            subtitle_tool: vec!["yt-dlp".to_string()],
            subtitle_client: "android".to_string(),
            scratch_dir: None,
            bind: "127.0.0.1:8000".to_string(),
            max_upload_bytes: 25 * 1024 * 1024,
        }
    }
}

impl Config {
    /// Load config from ~/.config/studyx/config.toml if it exists
    pub fn load() -> Result<Self> {
        Self::load_from(&config_path())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            debug!("Loading config from {}", path.display());
            let content = std::fs::read_to_string(path)?;
            let config: Config = toml::from_str(&content)?;
            Ok(config)
        } else {
            debug!("No config file found at {}", path.display());
            Ok(Config::default())
        }
    }

    /// Directory holding per-invocation temp files
    pub fn scratch_dir(&self) -> PathBuf {
        self.scratch_dir.clone().unwrap_or_else(std::env::temp_dir)
    }

    pub fn captions_timeout(&self) -> Duration {
        Duration::from_secs(self.captions_timeout_secs)
    }

    pub fn proxy_timeout(&self) -> Duration {
        Duration::from_secs(self.proxy_timeout_secs)
    }

    pub fn subtitle_timeout(&self) -> Duration {
        Duration::from_secs(self.subtitle_timeout_secs)
    }

    pub fn completion_timeout(&self) -> Duration {
        Duration::from_secs(self.completion_timeout_secs)
    }
}

pub fn config_path() -> PathBuf {
    dirs::config_dir()
        .unwrap_or_else(|| PathBuf::from(".config"))
        .join("studyx")
        .join("config.toml")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_config() {
        let toml_str = r#"
model = "claude-sonnet-4-6"
max_output_tokens = 4096
proxy_instances = ["https://a.example", "https://b.example"]
proxy_timeout_secs = 3
subtitle_tool = ["python3", "-m", "yt_dlp"]
scratch_dir = "/var/tmp/studyx"
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.model, "claude-sonnet-4-6");
        assert_eq!(config.max_output_tokens, 4096);
        assert_eq!(config.proxy_instances, vec!["https://a.example", "https://b.example"]);
        assert_eq!(config.proxy_timeout(), Duration::from_secs(3));
        assert_eq!(config.subtitle_tool, vec!["python3", "-m", "yt_dlp"]);
        assert_eq!(config.scratch_dir(), PathBuf::from("/var/tmp/studyx"));
    }

    #[test]
    fn test_parse_empty_config() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.max_output_tokens, 8192);
        assert!(!config.proxy_instances.is_empty());
        assert_eq!(config.subtitle_tool, vec!["yt-dlp"]);
    }

    #[test]
    fn test_parse_partial_config() {
        let config: Config = toml::from_str(r#"proxy_instances = []"#).unwrap();
        assert!(config.proxy_instances.is_empty());
        assert_eq!(config.model, DEFAULT_MODEL);
        assert!(config.api_base.is_none());
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.bind, "127.0.0.1:8000");
    }

    #[test]
    fn test_load_invalid_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "model = [").unwrap();
        assert!(Config::load_from(&path).is_err());
    }
}
