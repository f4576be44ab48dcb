//! Simulation parameters.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tileflash_viral::{ImageError, ViralConfig, MAX_PAGES};

use crate::error::{Error, Result};

/// Configuration for the simulation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimulationConfig {
    /// Seed for the link fault generator.
    pub seed: u64,
    /// Probability that a frame vanishes in flight.
    pub loss_rate: f64,
    /// Probability that one byte of a frame is flipped in flight.
    pub corrupt_rate: f64,
    /// Time a frame spends on the link. While it is in flight the
    /// receiving face is busy and refuses to send.
    pub latency_ms: u32,
    /// Give up on the run after this much virtual time.
    pub max_ms: u64,
    /// Index of the seeding tile.
    pub root: usize,
    /// Size of the program the root distributes.
    pub pages: u8,
    /// Protocol timing shared by every tile.
    pub viral: ViralConfig,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: 42,
            loss_rate: 0.0,
            corrupt_rate: 0.0,
            latency_ms: 2,
            max_ms: 60_000,
            root: 0,
            pages: 8,
            viral: ViralConfig::default(),
        }
    }
}

impl SimulationConfig {
    /// Tenfold faster protocol timing, for tests.
    #[must_use]
    pub fn fast() -> Self {
        Self {
            max_ms: 10_000,
            viral: ViralConfig::fast(),
            ..Self::default()
        }
    }

    /// Parse a JSON document. Missing fields take their defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a JSON config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_json(&fs::read_to_string(path)?)
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    #[must_use]
    pub fn with_loss_rate(mut self, rate: f64) -> Self {
        self.loss_rate = rate;
        self
    }

    #[must_use]
    pub fn with_corrupt_rate(mut self, rate: f64) -> Self {
        self.corrupt_rate = rate;
        self
    }

    #[must_use]
    pub fn with_latency(mut self, ms: u32) -> Self {
        self.latency_ms = ms;
        self
    }

    #[must_use]
    pub fn with_max_ms(mut self, ms: u64) -> Self {
        self.max_ms = ms;
        self
    }

    #[must_use]
    pub fn with_root(mut self, root: usize) -> Self {
        self.root = root;
        self
    }

    #[must_use]
    pub fn with_pages(mut self, pages: u8) -> Self {
        self.pages = pages;
        self
    }

    #[must_use]
    pub fn with_viral(mut self, viral: ViralConfig) -> Self {
        self.viral = viral;
        self
    }

    /// Check everything that does not depend on the cluster.
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [("loss_rate", self.loss_rate), ("corrupt_rate", self.corrupt_rate)] {
            if !(0.0..=1.0).contains(&value) {
                return Err(Error::InvalidRate { name, value });
            }
        }
        if self.latency_ms == 0 {
            return Err(Error::ZeroLatency);
        }
        if self.pages == 0 {
            return Err(ImageError::Empty.into());
        }
        if usize::from(self.pages) > MAX_PAGES {
            return Err(ImageError::TooLarge {
                pages: usize::from(self.pages),
                max: MAX_PAGES,
            }
            .into());
        }
        self.viral.validate()?;
        Ok(())
    }
}
