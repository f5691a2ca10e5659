//! Settings structs for all configuration sections.
//!
//! Each struct represents one `[section]` of the INI config file. These are
//! pure data types with no parsing logic.

use super::defaults::*;
use std::time::Duration;

/// Complete engine configuration loaded from the config file.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ConfigFile {
    pub engine: EngineSettings,
    pub propagation: PropagationSettings,
    pub escalation: EscalationSettings,
    pub metrics: MetricsSettings,
    pub logging: LoggingSettings,
}

/// `[engine]`: intake and drain-loop behavior.
#[derive(Clone, Debug, PartialEq)]
pub struct EngineSettings {
    /// Capacity of the intake channel feeding the drain loop.
    pub intake_capacity: usize,
    /// Safety-net tick in case a queue wake-up is missed.
    pub drain_tick_ms: u64,
}

impl EngineSettings {
    pub fn drain_tick(&self) -> Duration {
        Duration::from_millis(self.drain_tick_ms)
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            intake_capacity: DEFAULT_INTAKE_CAPACITY,
            drain_tick_ms: DEFAULT_DRAIN_TICK_MS,
        }
    }
}

/// `[propagation]`: notification fan-out behavior.
#[derive(Clone, Debug, PartialEq)]
pub struct PropagationSettings {
    /// Concurrency cap per channel batch.
    pub max_in_flight: usize,
    /// Chunk size when splitting large batches.
    pub chunk_size: usize,
    /// Budget for one individual send.
    pub send_timeout_ms: u64,
}

impl PropagationSettings {
    pub fn send_timeout(&self) -> Duration {
        Duration::from_millis(self.send_timeout_ms)
    }
}

impl Default for PropagationSettings {
    fn default() -> Self {
        Self {
            max_in_flight: DEFAULT_FANOUT_MAX_IN_FLIGHT,
            chunk_size: DEFAULT_FANOUT_CHUNK_SIZE,
            send_timeout_ms: DEFAULT_SEND_TIMEOUT_MS,
        }
    }
}

/// `[escalation]`: unacknowledged-incident escalation.
#[derive(Clone, Debug, PartialEq)]
pub struct EscalationSettings {
    /// Sweep interval for the escalation monitor.
    pub sweep_interval_secs: u64,
    /// Ordered thresholds; index N is the timeout promoting level N to N+1.
    pub thresholds_secs: Vec<u64>,
}

impl EscalationSettings {
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    /// Threshold for the given current level, if one remains.
    pub fn threshold_for_level(&self, level: u8) -> Option<Duration> {
        self.thresholds_secs
            .get(level as usize)
            .map(|secs| Duration::from_secs(*secs))
    }

    /// The highest escalation level this ladder can reach.
    pub fn max_level(&self) -> u8 {
        self.thresholds_secs.len() as u8
    }
}

impl Default for EscalationSettings {
    fn default() -> Self {
        Self {
            sweep_interval_secs: DEFAULT_ESCALATION_SWEEP_SECS,
            thresholds_secs: DEFAULT_ESCALATION_THRESHOLDS_SECS.to_vec(),
        }
    }
}

/// `[metrics]`: health reporting cadence.
#[derive(Clone, Debug, PartialEq)]
pub struct MetricsSettings {
    pub report_interval_secs: u64,
}

impl MetricsSettings {
    pub fn report_interval(&self) -> Duration {
        Duration::from_secs(self.report_interval_secs)
    }
}

impl Default for MetricsSettings {
    fn default() -> Self {
        Self {
            report_interval_secs: DEFAULT_HEALTH_REPORT_SECS,
        }
    }
}

/// `[logging]`: log output destination.
#[derive(Clone, Debug, PartialEq)]
pub struct LoggingSettings {
    pub directory: String,
    pub file: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            directory: DEFAULT_LOG_DIR.to_string(),
            file: DEFAULT_LOG_FILE.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_wired() {
        let engine = EngineSettings::default();
        assert_eq!(engine.intake_capacity, DEFAULT_INTAKE_CAPACITY);
        assert_eq!(engine.drain_tick(), Duration::from_millis(250));
    }

    #[test]
    fn test_escalation_ladder_lookup() {
        let escalation = EscalationSettings::default();
        assert_eq!(escalation.threshold_for_level(0), Some(Duration::from_secs(300)));
        assert_eq!(escalation.threshold_for_level(2), Some(Duration::from_secs(1_200)));
        assert_eq!(escalation.threshold_for_level(3), None);
        assert_eq!(escalation.max_level(), 3);
    }

    #[test]
    fn test_thresholds_are_increasing() {
        let escalation = EscalationSettings::default();
        let thresholds = &escalation.thresholds_secs;
        assert!(thresholds.windows(2).all(|pair| pair[0] < pair[1]));
    }
}
