//! Viral Program Propagation
//!
//! Distributes a program image across a cluster of docked hexagonal tiles
//! that share no bus and no addresses. Each tile talks only to its six
//! neighbors over half-duplex, lossy IR links.
//!
//! # How It Spreads
//!
//! One tile (the root) starts with the complete program and offers it
//! round-robin on its faces. A neighbor that accepts the offer locks onto
//! that face as its source, pulls the program page by page, and starts
//! offering it to its own neighbors as soon as it holds the first page.
//! Propagation is pipelined: a relay serves page `k` downstream while still
//! fetching page `k + 1` from upstream.
//!
//! # Safety Rules
//!
//! - Pages are pulled, never pushed. A relay only sends a page it holds, and
//!   only when asked for it.
//! - A node accepts pages only from its source, strictly in order.
//! - A node that fails to get the whole program falls back to the program it
//!   already had.
//!
//! # Modules
//!
//! - [`propagation`]: the per-node state machine
//! - [`packet`]: wire codec and integrity checks
//! - [`state`]: download progress and roles
//! - [`timer`]: non-blocking countdowns
//! - [`link`], [`flash`], [`status`]: the hardware seams, with in-memory
//!   implementations

pub mod config;
pub mod error;
pub mod flash;
pub mod image;
pub mod link;
pub mod packet;
pub mod propagation;
pub mod state;
pub mod status;
pub mod timer;

pub use config::ViralConfig;
pub use error::{ConfigError, DecodeError, ImageError};
pub use flash::{Flash, MemoryFlash};
pub use image::{fold_program_checksum, page_checksum, ProgramImage, ERASED};
pub use link::{Link, Mailbox, MailboxLink};
pub use packet::{Frame, Packet, PacketKind, PageData, HOLD_PAGE, MAX_FRAME_LEN};
pub use propagation::{Outcome, Program, Propagator, Step};
pub use state::{BootMode, DownloadState, Role};
pub use status::{Color, StatusIndicator};
pub use timer::{Countdown, Timers};

pub use tileflash_topology::{Face, FaceSet, FACE_COUNT};

/// Bytes per flash page, and per `Page` packet payload.
pub const PAGE_SIZE: usize = 128;

/// Pages in the application area. A program never spans more.
pub const MAX_PAGES: usize = 56;

// Page indices and counts travel as single bytes.
const _: () = assert!(MAX_PAGES < u8::MAX as usize);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn largest_frame_is_a_page() {
        for kind in PacketKind::ALL {
            assert!(kind.frame_len() <= MAX_FRAME_LEN);
        }
        assert_eq!(PacketKind::Page.frame_len(), MAX_FRAME_LEN);
    }
}
