//! Wire format of propagation packets.
//!
//! Every frame starts with a one-byte kind tag. The tags are far apart in
//! Hamming distance so a one- or two-bit error cannot turn one kind into
//! another. Frames that carry state others will act on (`Offer`, `Page`,
//! `Go`) end with a checksum byte: the bitwise inverse of the wrapping sum
//! of every preceding byte, tag included. Inverting keeps an all-zero frame
//! from passing.
//!
//! | Kind    | Layout                                             |
//! |---------|----------------------------------------------------|
//! | Offer   | tag, total_pages, checksum lo, checksum hi, check  |
//! | Request | tag, page                                          |
//! | Page    | tag, data[PAGE_SIZE], page, check                  |
//! | Go      | tag, check                                         |
//!
//! The liveness ping is a `Request` for `page == total_pages`: an index past
//! the end of the image that no node can ever answer. A `Request` for
//! [`HOLD_PAGE`] is the hold: a complete node with a quiet subtree asking its
//! source whether the run is still going. The source answers with an `Offer`
//! and does not count it as a pull.

use std::fmt;
use std::ops::Deref;

use serde::{Deserialize, Serialize};

use crate::error::{DecodeError, Result};
use crate::PAGE_SIZE;

/// One page of program data.
pub type PageData = [u8; PAGE_SIZE];

/// Page index a hold request carries. Never a real page.
pub const HOLD_PAGE: u8 = u8::MAX;

/// Length of the largest frame (a `Page`).
pub const MAX_FRAME_LEN: usize = PAGE_SIZE + 3;

const OFFER_LEN: usize = 5;
const REQUEST_LEN: usize = 2;
const PAGE_LEN: usize = MAX_FRAME_LEN;
const GO_LEN: usize = 2;

/// Packet kinds and their tag bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[repr(u8)]
pub enum PacketKind {
    /// "I have a program for you."
    Offer = 0b0110_1010,
    /// Pull one page, or ping liveness.
    Request = 0b0101_1101,
    /// One page of program data.
    Page = 0b1101_1011,
    /// Everyone switch to the new program now.
    Go = 0b1010_0110,
}

impl PacketKind {
    pub const ALL: [Self; 4] = [Self::Offer, Self::Request, Self::Page, Self::Go];

    #[inline]
    pub const fn tag(self) -> u8 {
        self as u8
    }

    pub fn from_tag(tag: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.tag() == tag)
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::Offer => "offer",
            Self::Request => "request",
            Self::Page => "page",
            Self::Go => "go",
        }
    }

    /// Length of a well-formed frame of this kind.
    pub const fn frame_len(self) -> usize {
        match self {
            Self::Offer => OFFER_LEN,
            Self::Request => REQUEST_LEN,
            Self::Page => PAGE_LEN,
            Self::Go => GO_LEN,
        }
    }
}

impl fmt::Display for PacketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Wrapping byte sum.
#[inline]
pub fn sum(bytes: &[u8]) -> u8 {
    bytes.iter().fold(0u8, |acc, b| acc.wrapping_add(*b))
}

/// The trailing check byte for a frame whose body is `bytes`.
#[inline]
pub fn check_byte(bytes: &[u8]) -> u8 {
    !sum(bytes)
}

/// A framed packet ready for the link, at most [`MAX_FRAME_LEN`] bytes.
#[derive(Clone, PartialEq, Eq)]
pub struct Frame {
    bytes: [u8; MAX_FRAME_LEN],
    len: usize,
}

impl Frame {
    fn empty() -> Self {
        Self {
            bytes: [0; MAX_FRAME_LEN],
            len: 0,
        }
    }

    /// Copy raw bytes into a frame. `None` if they do not fit.
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        if bytes.len() > MAX_FRAME_LEN {
            return None;
        }
        let mut frame = Self::empty();
        frame.bytes[..bytes.len()].copy_from_slice(bytes);
        frame.len = bytes.len();
        Some(frame)
    }

    #[inline]
    fn push(&mut self, byte: u8) {
        self.bytes[self.len] = byte;
        self.len += 1;
    }

    fn extend(&mut self, bytes: &[u8]) {
        self.bytes[self.len..self.len + bytes.len()].copy_from_slice(bytes);
        self.len += bytes.len();
    }

    fn seal(&mut self) {
        let check = check_byte(&self.bytes[..self.len]);
        self.push(check);
    }

    /// Mutable access to the framed bytes, for fault injection.
    pub fn bytes_mut(&mut self) -> &mut [u8] {
        &mut self.bytes[..self.len]
    }
}

impl Deref for Frame {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.bytes[..self.len]
    }
}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Frame({})", hex::encode(&self[..]))
    }
}

/// A decoded propagation packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Packet {
    Offer { total_pages: u8, program_checksum: u16 },
    Request { page: u8 },
    Page { page: u8, data: Box<PageData> },
    Go,
}

impl Packet {
    /// The liveness form of a request for an image of `total_pages` pages.
    pub fn alive(total_pages: u8) -> Self {
        Self::Request { page: total_pages }
    }

    /// A request asking the source to confirm the run is still under way.
    pub fn hold() -> Self {
        Self::Request { page: HOLD_PAGE }
    }

    pub fn kind(&self) -> PacketKind {
        match self {
            Self::Offer { .. } => PacketKind::Offer,
            Self::Request { .. } => PacketKind::Request,
            Self::Page { .. } => PacketKind::Page,
            Self::Go => PacketKind::Go,
        }
    }

    /// Serialize into a frame.
    pub fn encode(&self) -> Frame {
        let mut frame = Frame::empty();
        frame.push(self.kind().tag());
        match self {
            Self::Offer {
                total_pages,
                program_checksum,
            } => {
                frame.push(*total_pages);
                frame.extend(&program_checksum.to_le_bytes());
                frame.seal();
            }
            Self::Request { page } => frame.push(*page),
            Self::Page { page, data } => {
                frame.extend(&data[..]);
                frame.push(*page);
                frame.seal();
            }
            Self::Go => frame.seal(),
        }
        frame
    }

    /// Parse and verify a frame.
    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let (&tag, _) = bytes.split_first().ok_or(DecodeError::Empty)?;
        let kind = PacketKind::from_tag(tag).ok_or(DecodeError::UnknownTag(tag))?;

        if bytes.len() != kind.frame_len() {
            return Err(DecodeError::Length {
                kind: kind.name(),
                expected: kind.frame_len(),
                actual: bytes.len(),
            });
        }

        if kind != PacketKind::Request {
            let (&carried, body) = bytes.split_last().ok_or(DecodeError::Empty)?;
            let computed = check_byte(body);
            if carried != computed {
                return Err(DecodeError::Checksum {
                    kind: kind.name(),
                    carried,
                    computed,
                });
            }
        }

        let packet = match kind {
            PacketKind::Offer => Self::Offer {
                total_pages: bytes[1],
                program_checksum: u16::from_le_bytes([bytes[2], bytes[3]]),
            },
            PacketKind::Request => Self::Request { page: bytes[1] },
            PacketKind::Page => {
                let mut data = Box::new([0u8; PAGE_SIZE]);
                data.copy_from_slice(&bytes[1..=PAGE_SIZE]);
                Self::Page {
                    page: bytes[PAGE_SIZE + 1],
                    data,
                }
            }
            PacketKind::Go => Self::Go,
        };
        Ok(packet)
    }
}
