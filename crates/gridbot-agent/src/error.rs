//! Error types for the agent binary.
//!
//! [`AgentError`] is the top-level error type that wraps every failure
//! mode during agent startup.

/// Top-level error for the agent binary.
///
/// Each variant wraps a specific subsystem error, providing a single
/// error type that `main` can propagate with `?`.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// Configuration loading or validation failed.
    #[error("config error: {source}")]
    Config {
        /// The underlying config error.
        #[from]
        source: gridbot_core::config::ConfigError,
    },

    /// The initial world state could not be built.
    #[error("world error: {source}")]
    World {
        /// The underlying world error.
        #[from]
        source: gridbot_world::WorldError,
    },

    /// The authority could not be reached.
    #[error("failed to connect to authority at {addr}: {source}")]
    Connect {
        /// Address that was dialed.
        addr: String,
        /// The underlying I/O error.
        source: std::io::Error,
    },

    /// Installing the signal handler failed.
    #[error("signal handler error: {source}")]
    Signal {
        /// The underlying I/O error.
        source: std::io::Error,
    },
}
