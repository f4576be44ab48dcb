//! Tileflash Cluster Simulator
//!
//! Runs the viral propagation protocol on a cluster of simulated tiles
//! joined face to face, with deterministic timing and seeded link faults.
//!
//! # Architecture
//!
//! - **Cluster**: where the tiles sit and which faces touch
//! - **Simulation**: a 1 ms virtual clock driving every tile's loop
//! - **Events**: a timeline of commits, pages, go signals and link faults
//! - **Report**: per-tile outcome and flash wear at the end of a run
//!
//! # Usage
//!
//! ```no_run
//! use tileflash_sim::{Cluster, Simulation, SimulationConfig};
//!
//! let cluster = Cluster::spiral(19)?;
//! let mut sim = Simulation::new(cluster, SimulationConfig::fast())?;
//! let report = sim.run();
//! assert!(report.all_staged());
//! # Ok::<(), tileflash_sim::Error>(())
//! ```

mod cluster;
mod config;
mod error;
mod events;
mod simulation;

pub use cluster::{Cluster, TileId};
pub use config::SimulationConfig;
pub use error::{Error, Result};
pub use events::{DropReason, SimEvent};
pub use simulation::{LinkStats, Report, Simulation, TileReport};
