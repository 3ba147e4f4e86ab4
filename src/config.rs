//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.gradebook.toml` files.

use crate::grading::GradeThresholds;
use anyhow::{Context, Result};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Default configuration file name.
pub const CONFIG_FILE_NAME: &str = ".gradebook.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Letter grade thresholds.
    #[serde(default)]
    pub grading: GradingConfig,

    /// Notification settings.
    #[serde(default)]
    pub notifications: NotificationConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Student data file.
    #[serde(default = "default_data_file")]
    pub data_file: PathBuf,

    /// Report output path. The report goes to stdout when unset.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<PathBuf>,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            data_file: default_data_file(),
            output: None,
        }
    }
}

fn default_data_file() -> PathBuf {
    PathBuf::from("gradebook.json")
}

/// Minimum percentage for each letter grade.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradingConfig {
    #[serde(default = "default_a_threshold")]
    pub a_threshold: Decimal,

    #[serde(default = "default_b_threshold")]
    pub b_threshold: Decimal,

    #[serde(default = "default_c_threshold")]
    pub c_threshold: Decimal,

    #[serde(default = "default_d_threshold")]
    pub d_threshold: Decimal,
}

impl Default for GradingConfig {
    fn default() -> Self {
        Self {
            a_threshold: default_a_threshold(),
            b_threshold: default_b_threshold(),
            c_threshold: default_c_threshold(),
            d_threshold: default_d_threshold(),
        }
    }
}

fn default_a_threshold() -> Decimal {
    Decimal::from(90)
}

fn default_b_threshold() -> Decimal {
    Decimal::from(80)
}

fn default_c_threshold() -> Decimal {
    Decimal::from(70)
}

fn default_d_threshold() -> Decimal {
    Decimal::from(60)
}

impl GradingConfig {
    /// Thresholds for the grade calculator.
    pub fn thresholds(&self) -> GradeThresholds {
        GradeThresholds {
            a: self.a_threshold,
            b: self.b_threshold,
            c: self.c_threshold,
            d: self.d_threshold,
        }
    }
}

/// Notification settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// Send notifications at all.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Send email messages.
    #[serde(default = "default_true")]
    pub email: bool,

    /// Send text messages.
    #[serde(default = "default_true")]
    pub sms: bool,

    /// Minimum seconds between notifications to the same student.
    #[serde(default = "default_debounce_seconds")]
    pub debounce_seconds: u64,

    /// Name used to sign messages.
    #[serde(default = "default_institution")]
    pub institution: String,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            email: true,
            sms: true,
            debounce_seconds: default_debounce_seconds(),
            institution: default_institution(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_debounce_seconds() -> u64 {
    2
}

fn default_institution() -> String {
    "Gradebook University".to_string()
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE_NAME);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    /// Only explicitly provided arguments override the file.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref data) = args.data {
            self.general.data_file = data.clone();
        }
        if let Some(ref output) = args.output {
            self.general.output = Some(output.clone());
        }

        if let Some(a) = args.a_threshold {
            self.grading.a_threshold = a;
        }
        if let Some(b) = args.b_threshold {
            self.grading.b_threshold = b;
        }
        if let Some(c) = args.c_threshold {
            self.grading.c_threshold = c;
        }
        if let Some(d) = args.d_threshold {
            self.grading.d_threshold = d;
        }

        if args.no_notify {
            self.notifications.enabled = false;
        }
    }

    /// Log a warning when thresholds do not decrease from A to D.
    pub fn warn_on_unusual_thresholds(&self) {
        let thresholds = self.grading.thresholds();
        if !thresholds.is_monotonic() {
            warn!(
                "Grade thresholds are not decreasing (A={}, B={}, C={}, D={}); letters are still tested A to D",
                thresholds.a, thresholds.b, thresholds.c, thresholds.d
            );
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
