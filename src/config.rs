use crate::aggregate::{Averaging, SnowfallSummary};
use crate::anomaly::AnomalyThresholds;
use crate::error::{AppError, Result};
use chrono::FixedOffset;
use serde::{Deserialize, Deserializer};
use std::path::{Path, PathBuf};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub source: SourceConfig,
    pub scheduler: SchedulerConfig,
    pub output: OutputConfig,
    #[serde(default)]
    pub thresholds: AnomalyThresholds,
    #[serde(default)]
    pub display: DisplayConfig,
    #[serde(default)]
    pub stations: StationFilter,
}

/// Where the fetch job's documents live: an HTTPS base URL or a local directory.
#[derive(Debug, Deserialize, Clone)]
pub struct SourceConfig {
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub data_dir: Option<PathBuf>,
    #[serde(default = "default_stations_file")]
    pub stations_file: String,
    #[serde(default = "default_metadata_file")]
    pub metadata_file: String,
}

fn default_stations_file() -> String {
    "all_stations.json".to_string()
}

fn default_metadata_file() -> String {
    "metadata.json".to_string()
}

#[derive(Debug, Deserialize, Clone)]
pub struct SchedulerConfig {
    pub interval_minutes: u64,
    #[serde(default = "default_initial_delay")]
    pub initial_delay_seconds: u64,
}

fn default_initial_delay() -> u64 {
    0
}

#[derive(Debug, Deserialize, Clone)]
pub struct OutputConfig {
    pub dir: PathBuf,
    #[serde(default = "default_output_file")]
    pub file_name: String,
}

fn default_output_file() -> String {
    "series.json".to_string()
}

impl OutputConfig {
    pub fn path(&self) -> PathBuf {
        self.dir.join(&self.file_name)
    }
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct DisplayConfig {
    /// Chart window in hours. Defaults to the retention window in metadata.
    #[serde(default)]
    pub window_hours: Option<u32>,
    /// Offset of the stations' wall clock from UTC, in whole hours.
    #[serde(default, deserialize_with = "deserialize_offset")]
    pub utc_offset_hours: i32,
    #[serde(default)]
    pub averaging: Averaging,
    #[serde(default)]
    pub snowfall: SnowfallSummary,
    /// Use the older rule table that reads precipitation from SWE columns.
    #[serde(default)]
    pub simplified_columns: bool,
}

impl DisplayConfig {
    pub fn offset(&self) -> Result<FixedOffset> {
        FixedOffset::east_opt(self.utc_offset_hours * 3600).ok_or_else(|| {
            AppError::Config(format!(
                "utc_offset_hours {} is not a valid offset",
                self.utc_offset_hours
            ))
        })
    }
}

/// Custom deserializer that handles the offset as both number and string
///
/// Accepts:
/// - `utc_offset_hours: -7` (number)
/// - `utc_offset_hours: "-7"` (string that parses to number)
/// - `utc_offset_hours: ${UTC_OFFSET}` (env var substituted to either)
fn deserialize_offset<'de, D>(deserializer: D) -> std::result::Result<i32, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OffsetValue {
        Number(i32),
        String(String),
    }

    match OffsetValue::deserialize(deserializer)? {
        OffsetValue::Number(n) => Ok(n),
        OffsetValue::String(s) => s
            .trim()
            .parse::<i32>()
            .map_err(|_| serde::de::Error::custom(format!("Invalid UTC offset: '{}'", s))),
    }
}

/// Station selection for aggregates. Empty selects every station.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct StationFilter {
    #[serde(default)]
    pub ids: Vec<String>,
    #[serde(default)]
    pub patterns: Vec<String>,
}

impl StationFilter {
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty() && self.patterns.is_empty()
    }

    pub fn matches(&self, station_id: &str) -> bool {
        if self.is_empty() {
            return true;
        }

        if self.ids.iter().any(|id| id.eq_ignore_ascii_case(station_id)) {
            return true;
        }

        self.patterns.iter().any(|pattern| {
            glob::Pattern::new(pattern)
                .map(|p| p.matches(station_id))
                .unwrap_or(false)
        })
    }

    /// The matching subset of `station_ids`, order preserved.
    pub fn select<'a, I>(&self, station_ids: I) -> Vec<&'a str>
    where
        I: IntoIterator<Item = &'a str>,
    {
        station_ids.into_iter().filter(|id| self.matches(id)).collect()
    }
}

impl Config {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| AppError::Config(format!("Failed to read config file: {}", e)))?;

        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        // Substitute environment variables
        let expanded = expand_env_vars(content)?;

        let config: Config = serde_yaml::from_str(&expanded)
            .map_err(|e| AppError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    /// Validate configuration values
    ///
    /// Checks for:
    /// - Exactly one data source, HTTPS when remote
    /// - Positive thresholds and intervals
    /// - A representable UTC offset
    /// - Well-formed station patterns
    fn validate(&self) -> Result<()> {
        match (&self.source.base_url, &self.source.data_dir) {
            (Some(_), Some(_)) => {
                return Err(AppError::Config(
                    "Set either source.base_url or source.data_dir, not both".to_string(),
                ))
            }
            (None, None) => {
                return Err(AppError::Config(
                    "One of source.base_url or source.data_dir is required".to_string(),
                ))
            }
            (Some(base_url), None) => {
                let parsed = url::Url::parse(base_url).map_err(|e| {
                    AppError::Config(format!("Invalid source base_url '{}': {}", base_url, e))
                })?;
                if parsed.scheme() != "https" {
                    return Err(AppError::Config(format!(
                        "Source base_url must use HTTPS, got: {}",
                        parsed.scheme()
                    )));
                }
            }
            (None, Some(dir)) => {
                if dir.as_os_str().is_empty() {
                    return Err(AppError::Config(
                        "Source data_dir cannot be empty".to_string(),
                    ));
                }
            }
        }

        if self.source.stations_file.is_empty() || self.source.metadata_file.is_empty() {
            return Err(AppError::Config(
                "Source stations_file and metadata_file cannot be empty".to_string(),
            ));
        }

        if self.scheduler.interval_minutes == 0 {
            return Err(AppError::Config(
                "Scheduler interval_minutes must be greater than 0".to_string(),
            ));
        }

        let thresholds = [
            ("max_new_snow_24h", self.thresholds.max_new_snow_24h),
            ("max_swe", self.thresholds.max_swe),
            ("max_depth_jump", self.thresholds.max_depth_jump),
        ];
        for (name, value) in thresholds {
            if !value.is_finite() || value <= 0.0 {
                return Err(AppError::Config(format!(
                    "Threshold {} must be a positive number, got {}",
                    name, value
                )));
            }
        }

        if !(-12..=14).contains(&self.display.utc_offset_hours) {
            return Err(AppError::Config(format!(
                "display.utc_offset_hours {} must be between -12 and 14",
                self.display.utc_offset_hours
            )));
        }

        if self.display.window_hours == Some(0) {
            return Err(AppError::Config(
                "display.window_hours must be greater than 0".to_string(),
            ));
        }

        for pattern in &self.stations.patterns {
            if let Err(e) = glob::Pattern::new(pattern) {
                return Err(AppError::Config(format!(
                    "Invalid station pattern '{}': {}",
                    pattern, e
                )));
            }
        }

        Ok(())
    }
}

fn expand_env_vars(content: &str) -> Result<String> {
    let mut result = content.to_string();
    let re = regex_lite::Regex::new(r"\$\{([^}]+)\}")
        .map_err(|e| AppError::Config(format!("Invalid env var pattern: {}", e)))?;

    let mut missing_vars = Vec::new();

    for cap in re.captures_iter(content) {
        let var_name = &cap[1];
        match std::env::var(var_name) {
            Ok(value) => {
                result = result.replace(&cap[0], &value);
            }
            Err(_) => {
                missing_vars.push(var_name.to_string());
            }
        }
    }

    if !missing_vars.is_empty() {
        return Err(AppError::Config(format!(
            "Missing required environment variable{}: {}\n\n\
             To fix this:\n\
             1. Create a .env file in the project root\n\
             2. Set the missing variable{}: export {}=<value>",
            if missing_vars.len() > 1 { "s" } else { "" },
            missing_vars.join(", "),
            if missing_vars.len() > 1 { "s" } else { "" },
            missing_vars[0],
        )));
    }

    Ok(result)
}
