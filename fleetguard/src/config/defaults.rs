//! Default configuration values.

/// Intake channel capacity between the service facade and the drain loop.
pub const DEFAULT_INTAKE_CAPACITY: usize = 256;

/// Safety-net tick for the drain loop, in milliseconds. Sub-second so a
/// missed wake-up can never stall a pending alert for long.
pub const DEFAULT_DRAIN_TICK_MS: u64 = 250;

/// Maximum concurrent in-flight sends per notification channel.
pub const DEFAULT_FANOUT_MAX_IN_FLIGHT: usize = 16;

/// Chunk size for large per-channel notification batches.
pub const DEFAULT_FANOUT_CHUNK_SIZE: usize = 32;

/// Per-send timeout for notification deliveries, in milliseconds.
pub const DEFAULT_SEND_TIMEOUT_MS: u64 = 3_000;

/// Escalation sweep interval, in seconds.
pub const DEFAULT_ESCALATION_SWEEP_SECS: u64 = 30;

/// Ordered escalation thresholds (level 0 -> 1, 1 -> 2, 2 -> 3), in seconds.
pub const DEFAULT_ESCALATION_THRESHOLDS_SECS: [u64; 3] = [300, 600, 1_200];

/// Health report interval, in seconds.
pub const DEFAULT_HEALTH_REPORT_SECS: u64 = 60;

/// Default log directory.
pub const DEFAULT_LOG_DIR: &str = "logs";

/// Default log file name.
pub const DEFAULT_LOG_FILE: &str = "fleetguard.log";

/// Processing-time target for critical incidents, in milliseconds. The
/// fraction of critical incidents under this target is the primary SLO.
pub const PROCESSING_TARGET_MS: u64 = 5_000;
