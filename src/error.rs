//! Error types.
//!
//! Most hub and bus operations are *recoverable and local*: the plain methods
//! (`snapshot`, `clear`, `get`, `set`, ...) log a warning and return a safe
//! default instead of failing. The `try_*` variants surface the same
//! conditions as these error values for callers that want to handle them.
//!
//! Only [`BackendError`] is meant to be fatal: if an input backend cannot
//! start, the input path is unusable and startup should abort.

use thiserror::Error;

/// Errors reported by [`DeviceHub`](crate::hub::DeviceHub).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HubError {
    /// Slot index outside `0..len`.
    #[error("slot index {index} out of range (hub has {len} slots)")]
    OutOfRange { index: usize, len: usize },

    /// Operation needs a bound slot.
    #[error("slot {0} is not bound to a device")]
    Unbound(usize),

    /// Attempt to claim a slot that already has a device.
    #[error("slot {0} is already bound")]
    AlreadyBound(usize),
}

/// Errors reported by [`SignalBus`](crate::signal::SignalBus).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SignalError {
    /// Channel id outside `0..CHANNEL_COUNT`.
    #[error("channel {0} out of range")]
    OutOfRange(usize),
}

/// Fatal input backend failures.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Platform registration (window class, Raw Input, XInput, gilrs) failed.
    #[error("{backend}: initialization failed: {reason}")]
    Init {
        backend: &'static str,
        reason: String,
    },

    /// The backend worker thread could not be spawned.
    #[error("{backend}: failed to spawn worker thread: {source}")]
    Thread {
        backend: &'static str,
        #[source]
        source: std::io::Error,
    },

    /// The backend is not available in this build or on this platform.
    #[error("{0}: not supported on this platform or build")]
    Unsupported(&'static str),
}

/// Configuration loading failures.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid TOML: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("unsupported config extension: {0:?}")]
    UnknownFormat(String),

    #[error("invalid value: {0}")]
    Invalid(String),
}
