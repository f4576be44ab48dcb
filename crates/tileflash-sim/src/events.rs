//! Events recorded while a simulation runs.

use serde::{Deserialize, Serialize};
use tileflash_topology::Face;
use tileflash_viral::{PacketKind, Program};

use crate::cluster::TileId;

/// Why a frame never reached its receiver's mailbox.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    /// Lost on the link.
    Lost,
    /// Arrived while the previous frame on that face was still unread.
    Overrun,
}

/// Things that happen during a run, stamped with virtual time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum SimEvent {
    /// A listener accepted an offer and locked onto a source.
    Committed {
        tile: TileId,
        source: TileId,
        face: Face,
        total_pages: u8,
        at_ms: u64,
    },

    /// A page was stored in the staging area.
    PageAccepted { tile: TileId, page: u8, at_ms: u64 },

    /// A relay holds the whole program.
    Completed { tile: TileId, at_ms: u64 },

    /// A tile saw the go signal, from its source or by originating it.
    GoObserved {
        tile: TileId,
        originated: bool,
        at_ms: u64,
    },

    /// A tile left the loader.
    Finished {
        tile: TileId,
        program: Program,
        at_ms: u64,
    },

    FrameDropped {
        from: TileId,
        to: TileId,
        kind: Option<PacketKind>,
        reason: DropReason,
        at_ms: u64,
    },

    FrameCorrupted {
        from: TileId,
        to: TileId,
        kind: Option<PacketKind>,
        offset: usize,
        at_ms: u64,
    },
}

impl SimEvent {
    /// Virtual time of the event.
    pub fn at_ms(&self) -> u64 {
        match self {
            SimEvent::Committed { at_ms, .. }
            | SimEvent::PageAccepted { at_ms, .. }
            | SimEvent::Completed { at_ms, .. }
            | SimEvent::GoObserved { at_ms, .. }
            | SimEvent::Finished { at_ms, .. }
            | SimEvent::FrameDropped { at_ms, .. }
            | SimEvent::FrameCorrupted { at_ms, .. } => *at_ms,
        }
    }

    /// The tile the event is about. For link faults, the receiver.
    pub fn tile(&self) -> TileId {
        match self {
            SimEvent::Committed { tile, .. }
            | SimEvent::PageAccepted { tile, .. }
            | SimEvent::Completed { tile, .. }
            | SimEvent::GoObserved { tile, .. }
            | SimEvent::Finished { tile, .. } => *tile,
            SimEvent::FrameDropped { to, .. } | SimEvent::FrameCorrupted { to, .. } => *to,
        }
    }
}
