use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::AppError;

const TOKEN_PLACEHOLDER: &str = "your_token_here";

/// Business and parser settings for one run.
///
/// Loaded from the JSON config file; the credential comes from the environment.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    /// City name used for the locality flag, e.g. "Москва".
    pub city: String,
    /// Wordstat region id, e.g. 213 for Moscow.
    pub region_code: u32,
    /// Device filter sent to the API, e.g. ["all"] or ["desktop", "phone"].
    pub devices: Vec<String>,
    /// How many related phrases to show per query.
    pub results_limit: usize,
    /// Pause between consecutive queries.
    pub request_delay: Duration,
}

/// Application configuration loaded from environment variables and files.
#[derive(Debug, Clone)]
pub struct Config {
    pub settings: Settings,
    /// Wordstat OAuth token.
    pub token: String,
    pub queries_path: PathBuf,
    pub output_dir: PathBuf,
}

#[derive(Debug, Deserialize)]
struct ConfigFile {
    business_info: BusinessInfo,
    parser_settings: ParserSettings,
}

#[derive(Debug, Deserialize)]
struct BusinessInfo {
    city: String,
    region_code: u32,
}

#[derive(Debug, Deserialize)]
struct ParserSettings {
    devices: Vec<String>,
    #[serde(default = "default_results_limit")]
    results_limit: usize,
    #[serde(default = "default_request_delay_secs")]
    request_delay_secs: f64,
}

fn default_results_limit() -> usize {
    50
}

fn default_request_delay_secs() -> f64 {
    1.0
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// Required:
    /// - `YANDEX_WORDSTAT_TOKEN`: Wordstat OAuth token
    ///
    /// Optional:
    /// - `WORDSTAT_CONFIG_PATH`: settings file (default `config.json`)
    /// - `WORDSTAT_QUERIES_PATH`: phrase list (default `queries.txt`)
    /// - `WORDSTAT_OUTPUT_DIR`: report directory (default `output`)
    pub fn from_env() -> Result<Self, AppError> {
        let token = std::env::var("YANDEX_WORDSTAT_TOKEN").map_err(|_| {
            AppError::Config("YANDEX_WORDSTAT_TOKEN environment variable is required".to_string())
        })?;
        let token = validate_token(&token)?;

        let config_path = env_path("WORDSTAT_CONFIG_PATH", "config.json");
        let settings = load_settings(&config_path)?;

        Ok(Self {
            settings,
            token,
            queries_path: env_path("WORDSTAT_QUERIES_PATH", "queries.txt"),
            output_dir: env_path("WORDSTAT_OUTPUT_DIR", "output"),
        })
    }

    pub fn report_path(&self) -> PathBuf {
        self.output_dir.join("results.md")
    }

    pub fn csv_path(&self) -> PathBuf {
        self.output_dir.join("results.csv")
    }
}

fn env_path(var: &str, default: &str) -> PathBuf {
    std::env::var(var)
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from(default))
}

fn validate_token(token: &str) -> Result<String, AppError> {
    let token = token.trim();
    if token.is_empty() || token == TOKEN_PLACEHOLDER {
        return Err(AppError::Config(
            "YANDEX_WORDSTAT_TOKEN is empty or still set to the placeholder".to_string(),
        ));
    }
    Ok(token.to_string())
}

/// Read and validate the settings file.
pub fn load_settings(path: &Path) -> Result<Settings, AppError> {
    let content = std::fs::read_to_string(path).map_err(|source| AppError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let file: ConfigFile = serde_json::from_str(&content).map_err(|source| AppError::Json {
        path: path.display().to_string(),
        source,
    })?;
    settings_from_file(file)
}

fn settings_from_file(file: ConfigFile) -> Result<Settings, AppError> {
    let city = file.business_info.city.trim().to_string();
    if city.is_empty() {
        return Err(AppError::Config("business_info.city must not be empty".to_string()));
    }

    let devices: Vec<String> = file
        .parser_settings
        .devices
        .iter()
        .map(|d| d.trim().to_string())
        .filter(|d| !d.is_empty())
        .collect();
    if devices.is_empty() {
        return Err(AppError::Config(
            "parser_settings.devices must name at least one device".to_string(),
        ));
    }

    if file.parser_settings.results_limit == 0 {
        return Err(AppError::Config(
            "parser_settings.results_limit must be positive".to_string(),
        ));
    }

    let delay = file.parser_settings.request_delay_secs;
    let request_delay = Duration::try_from_secs_f64(delay).map_err(|_| {
        AppError::Config(format!(
            "parser_settings.request_delay_secs must be a non-negative number of seconds, got {delay}"
        ))
    })?;

    Ok(Settings {
        city,
        region_code: file.business_info.region_code,
        devices,
        results_limit: file.parser_settings.results_limit,
        request_delay,
    })
}

/// Read the phrase list: one phrase per line, blank lines skipped.
pub fn load_queries(path: &Path) -> Result<Vec<String>, AppError> {
    let content = std::fs::read_to_string(path).map_err(|source| AppError::Io {
        path: path.display().to_string(),
        source,
    })?;
    let queries: Vec<String> = content
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect();
    if queries.is_empty() {
        return Err(AppError::Config(format!(
            "{} contains no queries",
            path.display()
        )));
    }
    Ok(queries)
}
