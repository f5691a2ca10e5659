//! CLI error types.

use std::fmt;
use std::io;

/// Errors terminating the daemon.
#[derive(Debug)]
pub enum CliError {
    /// Configuration could not be loaded.
    Config(fleetguard::config::ConfigFileError),
    /// Logging or journal setup failed.
    Io(io::Error),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Config(error) => write!(f, "configuration error: {error}"),
            Self::Io(error) => write!(f, "I/O error: {error}"),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Config(error) => Some(error),
            Self::Io(error) => Some(error),
        }
    }
}

impl From<fleetguard::config::ConfigFileError> for CliError {
    fn from(error: fleetguard::config::ConfigFileError) -> Self {
        Self::Config(error)
    }
}

impl From<io::Error> for CliError {
    fn from(error: io::Error) -> Self {
        Self::Io(error)
    }
}
