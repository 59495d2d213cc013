//! Error types for the simulation harness

use thiserror::Error;
use wifi_radiotap::EncodeError;
use wifi_spectrum::{ConfigError, NodeId};

/// Errors raised while building or running a simulation
#[derive(Debug, Error)]
pub enum SimError {
    /// PHY, transmitter or spectrum configuration rejected
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Capture record could not be built
    #[error("capture error: {0}")]
    Capture(#[from] EncodeError),

    /// Scenario file could not be parsed
    #[error("scenario error: {0}")]
    Scenario(#[from] serde_json::Error),

    /// Reference to a node that was never added
    #[error("unknown node: {0}")]
    UnknownNode(NodeId),

    /// Node id used twice
    #[error("duplicate node: {0}")]
    DuplicateNode(NodeId),
}
