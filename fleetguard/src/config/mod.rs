//! Configuration for the incident engine.
//!
//! Settings structs are pure data, one per `[section]` of the INI config
//! file; defaults are named constants; loading lives in [`file`]. A missing
//! config file yields defaults; a malformed value is an error, never a
//! silent fallback.

mod defaults;
mod file;
mod settings;

pub use defaults::*;
pub use file::ConfigFileError;
pub use settings::{
    ConfigFile, EngineSettings, EscalationSettings, LoggingSettings, MetricsSettings,
    PropagationSettings,
};
