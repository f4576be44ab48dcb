//! The per-face packet link the protocol drives.
//!
//! The physical layer turns IR pulses into framed byte packets in the
//! background; by the time the protocol sees a packet it is complete. Each
//! face holds at most one unread packet, and anything that arrives while
//! that slot is occupied is lost.

use tileflash_topology::{Face, FaceSet, FACE_COUNT};

use crate::packet::Frame;

/// Six independent half-duplex packet channels.
pub trait Link {
    /// Start sending `frame` on `face`. Returns `false` without sending if
    /// a receive is in progress on that face; never blocks.
    fn try_send(&mut self, face: Face, frame: &[u8]) -> bool;

    /// The unread inbound packet on `face`, if any.
    fn poll(&self, face: Face) -> Option<&[u8]>;

    /// Release the inbound slot on `face` for the next packet.
    fn consume(&mut self, face: Face);
}

/// A single-slot inbound buffer.
#[derive(Debug, Clone, Default)]
pub struct Mailbox {
    slot: Option<Frame>,
}

impl Mailbox {
    /// Store an arriving frame. Returns `false` (dropping the frame) if
    /// the previous one has not been consumed yet.
    pub fn deliver(&mut self, frame: Frame) -> bool {
        if self.slot.is_some() {
            return false;
        }
        self.slot = Some(frame);
        true
    }

    pub fn peek(&self) -> Option<&Frame> {
        self.slot.as_ref()
    }

    pub fn take(&mut self) -> Option<Frame> {
        self.slot.take()
    }

    pub fn is_full(&self) -> bool {
        self.slot.is_some()
    }
}

/// An in-memory [`Link`]: one mailbox per face for inbound packets and an
/// outbox the surrounding environment drains and carries to neighbors.
#[derive(Debug, Clone, Default)]
pub struct MailboxLink {
    inbox: [Mailbox; FACE_COUNT],
    receiving: FaceSet,
    outbox: Vec<(Face, Frame)>,
}

impl MailboxLink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hand a complete inbound frame to `face`. `false` if it was dropped.
    pub fn deliver(&mut self, face: Face, frame: Frame) -> bool {
        self.inbox[face.index()].deliver(frame)
    }

    /// Mark whether a frame is currently arriving on `face`. While set,
    /// sends on that face are refused.
    pub fn set_receiving(&mut self, face: Face, receiving: bool) {
        if receiving {
            self.receiving.insert(face);
        } else {
            self.receiving.remove(face);
        }
    }

    pub fn is_receiving(&self, face: Face) -> bool {
        self.receiving.contains(face)
    }

    /// Frames sent since the last drain, in send order.
    pub fn outbox(&self) -> &[(Face, Frame)] {
        &self.outbox
    }

    /// Remove and return everything sent since the last drain.
    pub fn drain_outbox(&mut self) -> std::vec::Drain<'_, (Face, Frame)> {
        self.outbox.drain(..)
    }
}

impl Link for MailboxLink {
    fn try_send(&mut self, face: Face, frame: &[u8]) -> bool {
        if self.receiving.contains(face) {
            return false;
        }
        match Frame::from_slice(frame) {
            Some(frame) => {
                self.outbox.push((face, frame));
                true
            }
            None => false,
        }
    }

    fn poll(&self, face: Face) -> Option<&[u8]> {
        self.inbox[face.index()].peek().map(|f| &f[..])
    }

    fn consume(&mut self, face: Face) {
        self.inbox[face.index()].take();
    }
}
