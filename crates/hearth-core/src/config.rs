use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const DEFAULT_PORT: u16 = 5000;
pub const DEFAULT_BIND: &str = "0.0.0.0";
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";
pub const DEFAULT_MODEL: &str = "mistral:7b";
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 16 * 1024 * 1024; // 16 MiB
pub const DEFAULT_CONFIG_FILE: &str = "hearth.toml";

/// Top-level config (hearth.toml + HEARTH_* env overrides).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HearthConfig {
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub ollama: OllamaConfig,
    #[serde(default)]
    pub web: WebConfig,
    /// Optional per-mode persona overrides.
    #[serde(default)]
    pub modes: ModesConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            bind: default_bind(),
        }
    }
}

/// Upstream Ollama server.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OllamaConfig {
    #[serde(default = "default_ollama_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Applies to connecting and to every wait for the next streamed chunk.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self {
            base_url: default_ollama_base_url(),
            model: default_model(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebConfig {
    /// Directory served at `/` (chat UI).
    #[serde(default = "default_static_dir")]
    pub static_dir: String,
    /// Where uploaded images are stored; served at `/uploads/`.
    #[serde(default = "default_uploads_dir")]
    pub uploads_dir: String,
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,
}

impl Default for WebConfig {
    fn default() -> Self {
        Self {
            static_dir: default_static_dir(),
            uploads_dir: default_uploads_dir(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }
}

/// Replacement persona texts. `None` keeps the built-in text for that mode.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModesConfig {
    pub neutral: Option<String>,
    pub gf: Option<String>,
    pub professional: Option<String>,
    pub funny: Option<String>,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_bind() -> String {
    DEFAULT_BIND.to_string()
}
fn default_ollama_base_url() -> String {
    DEFAULT_OLLAMA_URL.to_string()
}
fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}
fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT_SECS
}
fn default_static_dir() -> String {
    "static".to_string()
}
fn default_uploads_dir() -> String {
    "uploads".to_string()
}
fn default_max_upload_bytes() -> usize {
    DEFAULT_MAX_UPLOAD_BYTES
}

impl HearthConfig {
    /// Load config from a TOML file with HEARTH_* env var overrides.
    ///
    /// The file is the explicit path when given, else `./hearth.toml`.
    /// A missing file is not an error; every field has a default.
    /// Nested keys use a double underscore: `HEARTH_OLLAMA__MODEL=llama3`.
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path.unwrap_or(DEFAULT_CONFIG_FILE);
        debug!(path, "loading config");

        Self::figment(path)
            .extract()
            .map_err(|e| crate::error::HearthError::Config(e.to_string()))
    }

    fn figment(path: &str) -> Figment {
        Figment::new()
            .merge(Toml::file(path))
            .merge(Env::prefixed("HEARTH_").split("__"))
    }

    /// Full URL of the Ollama generate endpoint.
    pub fn generate_url(&self) -> String {
        generate_url(&self.ollama.base_url)
    }
}

/// Ollama's streaming generate endpoint under `base_url`.
pub fn generate_url(base_url: &str) -> String {
    format!("{}/api/generate", base_url.trim_end_matches('/'))
}
