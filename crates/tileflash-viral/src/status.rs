//! Per-face status colors.
//!
//! Purely observational: the protocol paints what it is doing so a person
//! watching the tiles can follow a run. Nothing reads these back.

use serde::{Deserialize, Serialize};
use tileflash_topology::{Face, FACE_COUNT};

/// A coarse palette, two bits per channel on the real hardware.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Color {
    #[default]
    Off,
    Red,
    Green,
    DimGreen,
    Blue,
    DimBlue,
    Orange,
    Yellow,
    Cyan,
    Magenta,
    Pink,
}

impl Color {
    /// Red, green and blue levels, each `0..=3`.
    pub const fn levels(self) -> (u8, u8, u8) {
        match self {
            Self::Off => (0, 0, 0),
            Self::Red => (3, 0, 0),
            Self::Green => (0, 3, 0),
            Self::DimGreen => (0, 1, 0),
            Self::Blue => (0, 0, 3),
            Self::DimBlue => (0, 0, 2),
            Self::Orange => (3, 2, 0),
            Self::Yellow => (3, 3, 0),
            Self::Cyan => (0, 3, 3),
            Self::Magenta => (3, 0, 3),
            Self::Pink => (3, 2, 3),
        }
    }
}

/// Something that can show a color on each face.
pub trait StatusIndicator {
    fn set_face(&mut self, face: Face, color: Color);

    fn set_all(&mut self, color: Color) {
        for face in Face::ALL {
            self.set_face(face, color);
        }
    }
}

/// No display attached.
impl StatusIndicator for () {
    fn set_face(&mut self, _face: Face, _color: Color) {}
}

/// Remember the last color per face.
impl StatusIndicator for [Color; FACE_COUNT] {
    fn set_face(&mut self, face: Face, color: Color) {
        self[face.index()] = color;
    }
}
