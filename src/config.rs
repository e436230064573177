use anyhow::{ Context, Result };
use serde::{ Deserialize, Serialize };
use std::path::{ Path, PathBuf };

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Base URL of the search service used by the client commands and the shell
    #[serde(default = "default_service_url")]
    pub service_url: String,

    /// Address the server binds to
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// RocksDB directory holding the embeddings
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Number of results returned per query
    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Largest accepted multipart upload, in bytes
    #[serde(default = "default_max_upload_bytes")]
    pub max_upload_bytes: usize,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_service_url() -> String {
    std::env::var("MMSEARCH_URL").unwrap_or_else(|_| "http://localhost:8000".to_string())
}

fn default_host() -> String {
    std::env::var("MMSEARCH_HOST").unwrap_or_else(|_| "0.0.0.0".to_string())
}

fn default_port() -> u16 {
    std::env::var("MMSEARCH_PORT")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(8000)
}

fn default_db_path() -> PathBuf {
    if let Ok(path) = std::env::var("MMSEARCH_DB") {
        return PathBuf::from(path);
    }
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mmsearch")
        .join("db")
}

fn default_top_k() -> usize {
    5
}

fn default_max_upload_bytes() -> usize {
    10 * 1024 * 1024
}

fn default_request_timeout_secs() -> u64 {
    60
}

impl Default for Config {
    fn default() -> Self {
        Self {
            service_url: default_service_url(),
            host: default_host(),
            port: default_port(),
            db_path: default_db_path(),
            top_k: default_top_k(),
            max_upload_bytes: default_max_upload_bytes(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl Config {
    /// Load a JSON config file. Missing fields fall back to their defaults.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs
            ::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config = serde_json
            ::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.top_k == 0 {
            anyhow::bail!("top_k must be at least 1");
        }
        if !self.service_url.starts_with("http://") && !self.service_url.starts_with("https://") {
            anyhow::bail!("service_url must start with http:// or https://, got {}", self.service_url);
        }
        Ok(())
    }
}
