//! Error types for tileflash-viral.
//!
//! None of these ever leave [`Propagator::step`](crate::Propagator::step):
//! a frame that fails to decode is treated exactly like a frame that never
//! arrived. They surface only where images and configurations are built.

use thiserror::Error;

/// Result type for tileflash-viral operations.
pub type Result<T, E = DecodeError> = std::result::Result<T, E>;

/// Reasons an inbound frame is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Zero-length frame.
    #[error("empty frame")]
    Empty,

    /// The first byte is not one of the known kind tags.
    #[error("unknown kind tag {0:#010b}")]
    UnknownTag(u8),

    /// The frame length does not match what its kind requires.
    #[error("{kind} frame has length {actual}, expected {expected}")]
    Length {
        kind: &'static str,
        expected: usize,
        actual: usize,
    },

    /// The trailing checksum byte does not match the frame contents.
    #[error("{kind} frame checksum mismatch: carried {carried:#04x}, computed {computed:#04x}")]
    Checksum {
        kind: &'static str,
        carried: u8,
        computed: u8,
    },
}

/// Errors building a [`ProgramImage`](crate::ProgramImage).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImageError {
    /// Nothing to distribute.
    #[error("program image is empty")]
    Empty,

    /// The program does not fit the application area.
    #[error("program needs {pages} pages, at most {max} fit")]
    TooLarge { pages: usize, max: usize },
}

/// Errors validating a [`ViralConfig`](crate::ViralConfig).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// A timer interval that must be positive is zero.
    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    /// The active window must outlast one retry interval and expire within two.
    #[error("active window {active_ms}ms must exceed the retry interval {retry_ms}ms and stay below twice it")]
    ActiveWindow { active_ms: u32, retry_ms: u32 },

    /// The go flood must be sent at least once.
    #[error("go_repeats must be at least 1")]
    NoGoRepeats,
}
