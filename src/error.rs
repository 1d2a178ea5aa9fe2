// StrideBeat — Error Types
//
// Typed errors for the collaborator seams (sensor, music backend, settings).
// Application-level code wraps these in `anyhow`.

use thiserror::Error;

use crate::events::Playlist;

/// A single failed accelerometer read.  Always transient.
#[derive(Debug, Error)]
pub enum SensorError {
    #[error("sensor bus error: {0}")]
    Bus(String),
    #[error("sensor read timed out")]
    Timeout,
}

/// The external music backend could not carry out a command.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BackendError {
    #[error("music backend unreachable")]
    Unreachable,
    #[error("music backend rejected command (code {0:#04x})")]
    Rejected(u16),
    #[error("malformed reply from music backend")]
    Protocol,
}

/// Startup-only configuration problems.  Fatal.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("playlist `{}` has no tracks on the backend", .0.name())]
    MissingPlaylist(Playlist),
    #[error("invalid setting `{0}`: {1}")]
    Invalid(&'static str, &'static str),
}
