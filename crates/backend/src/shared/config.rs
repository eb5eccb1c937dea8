use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub sheets: SheetsConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub port: u16,
    /// Directory with the upload form
    pub static_dir: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct SheetsConfig {
    /// Target spreadsheet; rows always go to its first worksheet
    pub spreadsheet_id: String,
    /// Service account key: a TOML secrets file or a JSON key file
    pub secrets_path: String,
    /// Table inside a TOML secrets file that holds the key
    #[serde(default = "default_secrets_table")]
    pub secrets_table: String,
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_secrets_table() -> String {
    "gspread".to_string()
}

fn default_api_base_url() -> String {
    "https://sheets.googleapis.com".to_string()
}

fn default_request_timeout_secs() -> u64 {
    30
}

/// Default configuration embedded in the binary
const DEFAULT_CONFIG: &str = r#"
[server]
port = 3000
static_dir = "static"

[sheets]
spreadsheet_id = "1b_Ud2KcCKmLW3yp3tjrfWLvywieKwp6LclmetIGtsXA"
secrets_path = "secrets.toml"
secrets_table = "gspread"
api_base_url = "https://sheets.googleapis.com"
request_timeout_secs = 30
"#;

/// Load configuration from config.toml file
///
/// Search order:
/// 1. Next to the executable (for production)
/// 2. Current working directory
/// 3. Falls back to embedded default config
pub fn load_config() -> anyhow::Result<Config> {
    for config_path in candidate_config_paths() {
        if config_path.exists() {
            tracing::info!("Loading config from: {}", config_path.display());
            return load_config_from(&config_path);
        }
        tracing::debug!("config.toml not found at: {}", config_path.display());
    }

    tracing::info!("Using default embedded configuration");
    let config: Config = toml::from_str(DEFAULT_CONFIG)?;
    Ok(config)
}

/// Parse a specific config file
pub fn load_config_from(path: &Path) -> anyhow::Result<Config> {
    let contents = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&contents)
        .map_err(|e| anyhow::anyhow!("Invalid config {}: {}", path.display(), e))?;
    Ok(config)
}

fn candidate_config_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Some(exe_dir) = exe_dir() {
        paths.push(exe_dir.join("config.toml"));
    }
    paths.push(PathBuf::from("config.toml"));
    paths
}

fn exe_dir() -> Option<PathBuf> {
    std::env::current_exe()
        .ok()
        .and_then(|p| p.parent().map(Path::to_path_buf))
}

/// Resolve a configured path.
/// Absolute paths are used as is; relative ones are looked up next to the
/// executable first, then relative to the current directory.
pub fn resolve_path(configured: &str) -> PathBuf {
    let path = Path::new(configured);

    if path.is_absolute() {
        return path.to_path_buf();
    }

    if let Some(exe_dir) = exe_dir() {
        let resolved = exe_dir.join(path);
        if resolved.exists() {
            return resolved;
        }
    }

    PathBuf::from(configured)
}
