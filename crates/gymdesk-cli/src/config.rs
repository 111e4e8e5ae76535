use anyhow::Context;
use gymdesk_gateway::{GatewayConfig, HttpClientConfig};
use gymdesk_observability::LoggingConfig;
use gymdesk_search::SearchConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Config file looked up when `--config` is not given
pub const DEFAULT_CONFIG_PATH: &str = "~/.gymdesk/config.yaml";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub credentials: CredentialsConfig,

    #[serde(default)]
    pub search: SearchSettings,

    #[serde(default)]
    pub notifications: NotificationsConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
            connect_timeout_secs: default_connect_timeout_secs(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialsConfig {
    #[serde(default = "default_credentials_path")]
    pub path: String,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            path: default_credentials_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchSettings {
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    #[serde(default = "default_top_k")]
    pub top_k: usize,

    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            top_k: default_top_k(),
            page_size: default_page_size(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationsConfig {
    #[serde(default = "default_session_expired_title")]
    pub session_expired_title: String,

    #[serde(default = "default_session_expired_text")]
    pub session_expired_text: String,
}

impl Default for NotificationsConfig {
    fn default() -> Self {
        Self {
            session_expired_title: default_session_expired_title(),
            session_expired_text: default_session_expired_text(),
        }
    }
}

impl AppConfig {
    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let config = if path.extension().and_then(|s| s.to_str()) == Some("toml") {
            toml::from_str(&contents)
                .with_context(|| format!("Invalid TOML in {}", path.display()))?
        } else {
            // Default to YAML
            serde_yaml::from_str(&contents)
                .with_context(|| format!("Invalid YAML in {}", path.display()))?
        };

        Ok(config)
    }

    /// Load `path`, or the default config file if it exists, then apply
    /// environment overrides
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(expand(path))?,
            None => {
                let default_path = PathBuf::from(shellexpand::tilde(DEFAULT_CONFIG_PATH).as_ref());
                if default_path.exists() {
                    Self::from_file(default_path)?
                } else {
                    Self::default()
                }
            }
        };
        config.merge_env();
        Ok(config)
    }

    /// Merge environment variables into config (env vars take precedence)
    pub fn merge_env(&mut self) {
        if let Ok(val) = std::env::var("GYMDESK_API_URL") {
            self.api.base_url = val;
        }

        if let Ok(val) = std::env::var("GYMDESK_API_TIMEOUT_SECS") {
            match val.parse::<u64>() {
                Ok(secs) => self.api.timeout_secs = secs,
                Err(_) => eprintln!("Warning: Invalid GYMDESK_API_TIMEOUT_SECS '{}', ignored", val),
            }
        }

        if let Ok(val) = std::env::var("GYMDESK_CREDENTIALS_PATH") {
            self.credentials.path = val;
        }

        if let Ok(val) = std::env::var("GYMDESK_SEARCH_DEBOUNCE_MS") {
            match val.parse::<u64>() {
                Ok(ms) => self.search.debounce_ms = ms,
                Err(_) => eprintln!("Warning: Invalid GYMDESK_SEARCH_DEBOUNCE_MS '{}', ignored", val),
            }
        }

        if let Ok(val) = std::env::var("GYMDESK_LOG_LEVEL") {
            self.logging.level = val;
        }

        if let Ok(val) = std::env::var("GYMDESK_LOG_JSON") {
            if let Ok(json) = val.parse::<bool>() {
                self.logging.json = json;
            }
        }
    }

    pub fn credentials_path(&self) -> PathBuf {
        expand(Path::new(&self.credentials.path))
    }

    pub fn gateway_config(&self) -> GatewayConfig {
        GatewayConfig {
            base_url: self.api.base_url.clone(),
            client: HttpClientConfig {
                timeout_secs: self.api.timeout_secs,
                connect_timeout_secs: self.api.connect_timeout_secs,
                ..Default::default()
            },
            session_expired_title: self.notifications.session_expired_title.clone(),
            session_expired_text: self.notifications.session_expired_text.clone(),
        }
    }

    pub fn search_config(&self) -> SearchConfig {
        SearchConfig {
            debounce: Duration::from_millis(self.search.debounce_ms),
            top_k: self.search.top_k,
            page_size: self.search.page_size,
        }
    }
}

fn expand(path: &Path) -> PathBuf {
    PathBuf::from(shellexpand::tilde(&path.to_string_lossy()).as_ref())
}

fn default_base_url() -> String {
    "http://127.0.0.1:8000".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_credentials_path() -> String {
    "~/.gymdesk/credentials.json".to_string()
}

fn default_debounce_ms() -> u64 {
    300
}

fn default_top_k() -> usize {
    5
}

fn default_page_size() -> u32 {
    20
}

fn default_session_expired_title() -> String {
    "Session expired".to_string()
}

fn default_session_expired_text() -> String {
    "Please sign in again.".to_string()
}
