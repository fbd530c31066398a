//! Application configuration for Curricula.
//!
//! User config lives at `~/.curricula/curricula.toml`.
//! CLI flags (and their env vars) override config file values, which override defaults.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{CurriculaError, Result};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "curricula.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".curricula";

// ---------------------------------------------------------------------------
// Config structs (matching curricula.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Where program pages are harvested from.
    #[serde(default)]
    pub source: SourceConfig,

    /// Where the intermediate document is written.
    #[serde(default)]
    pub output: OutputConfig,

    /// Target relational store.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Import engine behavior.
    #[serde(default)]
    pub import: ImportConfig,
}

/// `[source]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Site origin used to resolve relative program links.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Path of the page listing all programs.
    #[serde(default = "default_listing_path")]
    pub listing_path: String,

    /// Delay after each page fetch, giving the site time to settle.
    #[serde(default = "default_settle_ms")]
    pub settle_ms: u64,

    /// HTTP request timeout.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            listing_path: default_listing_path(),
            settle_ms: default_settle_ms(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl SourceConfig {
    /// Absolute URL of the program listing page.
    pub fn listing_url(&self) -> String {
        format!(
            "{}{}",
            self.base_url.trim_end_matches('/'),
            self.listing_path
        )
    }
}

fn default_base_url() -> String {
    "https://www.hcw.ac.at".into()
}
fn default_listing_path() -> String {
    "/studium-weiterbildung/studienangebot".into()
}
fn default_settle_ms() -> u64 {
    500
}
fn default_timeout_secs() -> u64 {
    15
}

/// `[output]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Path of the intermediate JSON document.
    #[serde(default = "default_document_path")]
    pub document_path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            document_path: default_document_path(),
        }
    }
}

fn default_document_path() -> String {
    "data/programs.json".into()
}

/// `[database]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Local file path, or a `libsql://` / `https://` URL for a remote store.
    #[serde(default = "default_db_url")]
    pub url: String,

    /// Name of the env var holding the remote auth token (never store the token itself).
    #[serde(default = "default_token_env")]
    pub auth_token_env: String,

    /// Apply the bundled migrations on connect. Disable when the schema is managed elsewhere.
    #[serde(default = "default_true")]
    pub apply_migrations: bool,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_db_url(),
            auth_token_env: default_token_env(),
            apply_migrations: true,
        }
    }
}

impl DatabaseConfig {
    /// Whether the URL points at a remote libSQL server.
    pub fn is_remote(&self) -> bool {
        self.url.starts_with("libsql://")
            || self.url.starts_with("https://")
            || self.url.starts_with("http://")
    }
}

fn default_db_url() -> String {
    "data/curricula.db".into()
}
fn default_token_env() -> String {
    "CURRICULA_DB_TOKEN".into()
}
fn default_true() -> bool {
    true
}

/// `[import]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportConfig {
    /// Wait before touching the store (e.g. while a database container boots).
    #[serde(default)]
    pub startup_delay_secs: u64,

    /// How long to wait for the schema to appear.
    #[serde(default = "default_schema_timeout")]
    pub schema_timeout_secs: u64,

    /// Interval between schema readiness checks.
    #[serde(default = "default_schema_poll")]
    pub schema_poll_ms: u64,
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            startup_delay_secs: 0,
            schema_timeout_secs: default_schema_timeout(),
            schema_poll_ms: default_schema_poll(),
        }
    }
}

fn default_schema_timeout() -> u64 {
    60
}
fn default_schema_poll() -> u64 {
    2000
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.curricula/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| CurriculaError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.curricula/curricula.toml`).
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
    let content = std::fs::read_to_string(path).map_err(|e| CurriculaError::io(path, e))?;

    toml::from_str(&content)
        .map_err(|e| CurriculaError::config(format!("failed to parse {}: {e}", path.display())))
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| CurriculaError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| CurriculaError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| CurriculaError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}

/// Resolve the credential for the configured database.
///
/// Local stores need none. A remote store requires the token env var to be set
/// and non-empty; this check runs before any I/O.
pub fn resolve_db_token(config: &DatabaseConfig) -> Result<Option<String>> {
    if !config.is_remote() {
        return Ok(None);
    }
    let var_name = &config.auth_token_env;
    match std::env::var(var_name) {
        Ok(val) if !val.is_empty() => Ok(Some(val)),
        _ => Err(CurriculaError::config(format!(
            "database token not found. Set the {var_name} environment variable \
             to connect to {}",
            config.url
        ))),
    }
}
