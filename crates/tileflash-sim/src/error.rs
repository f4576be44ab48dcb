//! Error types for tileflash-sim.

use thiserror::Error;
use tileflash_topology::HexCoord;
use tileflash_viral::{ConfigError, ImageError};

/// Result type for simulator operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while setting up a simulation.
#[derive(Debug, Error)]
pub enum Error {
    /// Protocol timing is inconsistent.
    #[error("invalid protocol config: {0}")]
    Config(#[from] ConfigError),

    /// The program to distribute cannot be staged.
    #[error("invalid program image: {0}")]
    Image(#[from] ImageError),

    /// A cluster needs at least one tile.
    #[error("cluster has no tiles")]
    EmptyCluster,

    /// Two tiles cannot share a coordinate.
    #[error("two tiles placed at {0}")]
    DuplicateTile(HexCoord),

    /// The seeding tile is not part of the cluster.
    #[error("root tile {root} outside cluster of {tiles}")]
    RootOutOfRange { root: usize, tiles: usize },

    /// A fault probability outside `0.0..=1.0`.
    #[error("{name} must lie in 0.0..=1.0, got {value}")]
    InvalidRate { name: &'static str, value: f64 },

    /// Frames need at least one tick in flight.
    #[error("link latency must be at least 1ms")]
    ZeroLatency,

    #[error("failed to parse simulation config: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
