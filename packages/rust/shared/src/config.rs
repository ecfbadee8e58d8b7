//! Application configuration for the campus-services data layer.
//!
//! User config lives at `~/.campus/campus.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CampusError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "campus.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".campus";

// ---------------------------------------------------------------------------
// Config structs (matching campus.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Dish catalog source settings.
    #[serde(default)]
    pub catalog: CatalogConfig,

    /// Laundry device API settings.
    #[serde(default)]
    pub laundry: LaundryConfig,

    /// Shared HTTP transport settings.
    #[serde(default)]
    pub http: HttpConfig,
}

/// Which loader backs the dish catalog.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// Remote paginated dish API.
    #[default]
    Api,
    /// Bundled CSV snapshot.
    Csv,
}

impl std::str::FromStr for SourceKind {
    type Err = CampusError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "api" => Ok(Self::Api),
            "csv" => Ok(Self::Csv),
            other => Err(CampusError::config(format!(
                "unknown catalog source '{other}' (expected 'api' or 'csv')"
            ))),
        }
    }
}

impl std::fmt::Display for SourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Api => f.write_str("api"),
            Self::Csv => f.write_str("csv"),
        }
    }
}

/// `[catalog]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Loader used for the catalog.
    #[serde(default)]
    pub source: SourceKind,

    /// Base URL of the dish API (the list lives at `/api/dish/list`).
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// CSV snapshot location: an http(s) URL or a local path.
    #[serde(default = "default_csv_location")]
    pub csv_location: String,

    /// Page size used when walking the full remote list.
    #[serde(default = "default_fetch_page_size")]
    pub fetch_page_size: u32,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            source: SourceKind::default(),
            api_base_url: default_api_base_url(),
            csv_location: default_csv_location(),
            fetch_page_size: default_fetch_page_size(),
        }
    }
}

fn default_api_base_url() -> String {
    "https://cau-ai-backend.sanbei101.xyz".into()
}
fn default_csv_location() -> String {
    "resource/dishes.csv".into()
}
fn default_fetch_page_size() -> u32 {
    100
}

/// `[laundry]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LaundryConfig {
    /// Device detail page endpoint (POST).
    #[serde(default = "default_laundry_endpoint")]
    pub endpoint: String,

    /// Building / position identifier.
    #[serde(default = "default_position_id")]
    pub position_id: u64,

    /// Device category code.
    #[serde(default = "default_category_code")]
    pub category_code: String,

    /// Floor code, e.g. `"08"`.
    #[serde(default = "default_floor_code")]
    pub floor_code: String,

    /// Devices per page.
    #[serde(default = "default_laundry_page_size")]
    pub page_size: u32,
}

impl Default for LaundryConfig {
    fn default() -> Self {
        Self {
            endpoint: default_laundry_endpoint(),
            position_id: default_position_id(),
            category_code: default_category_code(),
            floor_code: default_floor_code(),
            page_size: default_laundry_page_size(),
        }
    }
}

fn default_laundry_endpoint() -> String {
    "https://yshz-user.haier-ioc.com/position/deviceDetailPage".into()
}
fn default_position_id() -> u64 {
    27958
}
fn default_category_code() -> String {
    "00".into()
}
fn default_floor_code() -> String {
    "08".into()
}
fn default_laundry_page_size() -> u32 {
    10
}

/// `[http]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    /// Request timeout in seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
        }
    }
}

fn default_timeout_secs() -> u64 {
    10
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.campus/`).
pub fn config_dir() -> Result<PathBuf> {
    let home =
        dirs::home_dir().ok_or_else(|| CampusError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.campus/campus.toml`).
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
    let content = std::fs::read_to_string(path).map_err(|e| CampusError::io(path, e))?;

    let config: AppConfig = toml::from_str(&content)
        .map_err(|e| CampusError::config(format!("failed to parse {}: {e}", path.display())))?;
    validate_config(&config)?;
    Ok(config)
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| CampusError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let content = render_config(&AppConfig::default())?;

    std::fs::write(&path, content).map_err(|e| CampusError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Serialize a config back to TOML.
pub fn render_config(config: &AppConfig) -> Result<String> {
    toml::to_string_pretty(config).map_err(|e| CampusError::config(e.to_string()))
}

/// Reject values no loader can work with.
pub fn validate_config(config: &AppConfig) -> Result<()> {
    url::Url::parse(&config.catalog.api_base_url).map_err(|e| {
        CampusError::config(format!(
            "catalog.api_base_url '{}' is not a valid URL: {e}",
            config.catalog.api_base_url
        ))
    })?;
    url::Url::parse(&config.laundry.endpoint).map_err(|e| {
        CampusError::config(format!(
            "laundry.endpoint '{}' is not a valid URL: {e}",
            config.laundry.endpoint
        ))
    })?;
    if config.catalog.csv_location.trim().is_empty() {
        return Err(CampusError::config("catalog.csv_location must not be empty"));
    }
    if config.catalog.fetch_page_size == 0 {
        return Err(CampusError::config("catalog.fetch_page_size must be positive"));
    }
    if config.http.timeout_secs == 0 {
        return Err(CampusError::config("http.timeout_secs must be positive"));
    }
    Ok(())
}
