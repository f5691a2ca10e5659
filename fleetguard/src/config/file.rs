//! Configuration file loading.
//!
//! Loads `fleetguard.ini`. A missing file yields defaults; a present file
//! overrides defaults per key; a malformed value is an error carrying the
//! section, key, and offending text.

use super::settings::*;
use ini::Ini;
use std::path::Path;
use thiserror::Error;

/// Configuration file errors.
#[derive(Debug, Error)]
pub enum ConfigFileError {
    /// Failed to read or parse the INI file.
    #[error("failed to read config file: {0}")]
    ReadError(#[from] ini::Error),

    /// A key parsed but carried an unusable value.
    #[error("invalid configuration: {section}.{key} = '{value}' - {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },
}

impl ConfigFile {
    /// Loads configuration from a specific path.
    ///
    /// Returns defaults when the file does not exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigFileError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let ini = Ini::load_from_file(path)?;
        Self::from_ini(&ini)
    }

    fn from_ini(ini: &Ini) -> Result<Self, ConfigFileError> {
        let mut config = Self::default();

        if let Some(section) = ini.section(Some("engine")) {
            if let Some(raw) = section.get("intake_capacity") {
                config.engine.intake_capacity = parse_value("engine", "intake_capacity", raw)?;
            }
            if let Some(raw) = section.get("drain_tick_ms") {
                config.engine.drain_tick_ms = parse_value("engine", "drain_tick_ms", raw)?;
            }
        }

        if let Some(section) = ini.section(Some("propagation")) {
            if let Some(raw) = section.get("max_in_flight") {
                config.propagation.max_in_flight =
                    parse_value("propagation", "max_in_flight", raw)?;
            }
            if let Some(raw) = section.get("chunk_size") {
                config.propagation.chunk_size = parse_value("propagation", "chunk_size", raw)?;
            }
            if let Some(raw) = section.get("send_timeout_ms") {
                config.propagation.send_timeout_ms =
                    parse_value("propagation", "send_timeout_ms", raw)?;
            }
        }

        if let Some(section) = ini.section(Some("escalation")) {
            if let Some(raw) = section.get("sweep_interval_secs") {
                config.escalation.sweep_interval_secs =
                    parse_value("escalation", "sweep_interval_secs", raw)?;
            }
            if let Some(raw) = section.get("thresholds_secs") {
                config.escalation.thresholds_secs =
                    parse_threshold_list("escalation", "thresholds_secs", raw)?;
            }
        }

        if let Some(section) = ini.section(Some("metrics")) {
            if let Some(raw) = section.get("report_interval_secs") {
                config.metrics.report_interval_secs =
                    parse_value("metrics", "report_interval_secs", raw)?;
            }
        }

        if let Some(section) = ini.section(Some("logging")) {
            if let Some(raw) = section.get("directory") {
                config.logging.directory = raw.to_string();
            }
            if let Some(raw) = section.get("file") {
                config.logging.file = raw.to_string();
            }
        }

        Ok(config)
    }
}

fn parse_value<T: std::str::FromStr>(
    section: &str,
    key: &str,
    raw: &str,
) -> Result<T, ConfigFileError> {
    raw.trim().parse().map_err(|_| ConfigFileError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: raw.to_string(),
        reason: "expected a non-negative integer".to_string(),
    })
}

/// Parses a comma-separated, strictly increasing threshold ladder.
fn parse_threshold_list(
    section: &str,
    key: &str,
    raw: &str,
) -> Result<Vec<u64>, ConfigFileError> {
    let invalid = |reason: &str| ConfigFileError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: raw.to_string(),
        reason: reason.to_string(),
    };

    let thresholds: Vec<u64> = raw
        .split(',')
        .map(|part| part.trim().parse::<u64>())
        .collect::<Result<_, _>>()
        .map_err(|_| invalid("expected comma-separated seconds"))?;

    if thresholds.is_empty() {
        return Err(invalid("at least one threshold is required"));
    }
    if !thresholds.windows(2).all(|pair| pair[0] < pair[1]) {
        return Err(invalid("thresholds must be strictly increasing"));
    }
    Ok(thresholds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn test_config_path(contents: &str) -> PathBuf {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        let path = std::env::temp_dir().join(format!("fleetguard_config_{}.ini", nanos));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let path = PathBuf::from("/nonexistent/fleetguard.ini");
        let config = ConfigFile::load_from(&path).unwrap();
        assert_eq!(config, ConfigFile::default());
    }

    #[test]
    fn test_partial_file_overrides_only_named_keys() {
        let path = test_config_path(
            "[propagation]\nmax_in_flight = 4\n\n[escalation]\nthresholds_secs = 60, 120, 300\n",
        );
        let config = ConfigFile::load_from(&path).unwrap();

        assert_eq!(config.propagation.max_in_flight, 4);
        assert_eq!(config.escalation.thresholds_secs, vec![60, 120, 300]);
        // Untouched sections keep their defaults.
        assert_eq!(config.engine, EngineSettings::default());

        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_invalid_integer_is_rejected() {
        let path = test_config_path("[engine]\ndrain_tick_ms = soon\n");
        let error = ConfigFile::load_from(&path).unwrap_err();
        match error {
            ConfigFileError::InvalidValue { section, key, .. } => {
                assert_eq!(section, "engine");
                assert_eq!(key, "drain_tick_ms");
            }
            other => panic!("unexpected error: {other}"),
        }
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_non_increasing_thresholds_rejected() {
        let path = test_config_path("[escalation]\nthresholds_secs = 600, 300\n");
        assert!(matches!(
            ConfigFile::load_from(&path),
            Err(ConfigFileError::InvalidValue { .. })
        ));
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_logging_section_strings() {
        let path = test_config_path("[logging]\ndirectory = /var/log/fleetguard\nfile = ops.log\n");
        let config = ConfigFile::load_from(&path).unwrap();
        assert_eq!(config.logging.directory, "/var/log/fleetguard");
        assert_eq!(config.logging.file, "ops.log");
        std::fs::remove_file(&path).unwrap();
    }
}
