use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::data::chart::DEFAULT_HISTOGRAM_BINS;

/// Environment variable naming an optional JSON settings file.
pub const CONFIG_ENV: &str = "DATA_SWEEPER_CONFIG";

/// Shell defaults. Every field is optional in the file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShellConfig {
    /// Rows shown in each file's preview table.
    pub preview_rows: usize,
    pub histogram_bins: usize,
    /// Initial window size in points.
    pub window_size: [f32; 2],
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            preview_rows: 5,
            histogram_bins: DEFAULT_HISTOGRAM_BINS,
            window_size: [1200.0, 800.0],
        }
    }
}

impl ShellConfig {
    pub fn from_path(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        serde_json::from_str(&text).context("parsing config JSON")
    }

    /// Settings from `$DATA_SWEEPER_CONFIG`, falling back to defaults.
    pub fn from_env() -> Self {
        let Some(path) = std::env::var_os(CONFIG_ENV) else {
            return Self::default();
        };
        match Self::from_path(Path::new(&path)) {
            Ok(config) => {
                log::info!("using config {}", Path::new(&path).display());
                config
            }
            Err(e) => {
                log::error!("ignoring config: {e:#}");
                Self::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_take_defaults() {
        let config: ShellConfig = serde_json::from_str(r#"{ "histogram_bins": 10 }"#).unwrap();
        assert_eq!(config.histogram_bins, 10);
        assert_eq!(config.preview_rows, 5);
    }

    #[test]
    fn unreadable_file_is_an_error() {
        assert!(ShellConfig::from_path(Path::new("/nonexistent/sweeper.json")).is_err());
    }
}
