//! Hexagonal coordinate system using axial coordinates.
//!
//! Axial coordinates use two axes (q, r) at 60 degrees, with an implicit
//! third axis s = -q - r. Tiles lie flat on a table, so there is no layer
//! axis: every tile touches at most six others, one per face.

use std::ops::{Add, Neg, Sub};

use crate::face::{Face, FACE_COUNT};

/// The position of a tile in a flat hexagonal cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HexCoord {
    /// First axial coordinate
    pub q: i64,
    /// Second axial coordinate
    pub r: i64,
}

impl HexCoord {
    /// Origin of the coordinate system.
    pub const ORIGIN: Self = Self { q: 0, r: 0 };

    /// Create a new coordinate.
    pub const fn new(q: i64, r: i64) -> Self {
        Self { q, r }
    }

    /// Compute the implicit third axis: s = -q - r.
    pub const fn s(&self) -> i64 {
        -self.q - self.r
    }

    /// Hexagonal distance between two coordinates.
    ///
    /// max(|dq|, |dr|, |ds|) where ds = -dq - dr
    pub fn hex_distance(&self, other: &Self) -> u64 {
        let dq = (self.q - other.q).unsigned_abs();
        let dr = (self.r - other.r).unsigned_abs();
        let ds = ((self.q - other.q) + (self.r - other.r)).unsigned_abs();
        dq.max(dr).max(ds)
    }

    /// Ring number in the spiral (0 = origin, 1 = first ring, etc.)
    pub fn ring(&self) -> u64 {
        self.hex_distance(&Self::ORIGIN)
    }

    /// The six neighbor directions, indexed by face.
    ///
    /// Consecutive entries are physically adjacent edges of the tile, and
    /// entry `i + 3` points the opposite way from entry `i`.
    pub const DIRECTIONS: [Self; FACE_COUNT] = [
        Self { q: 1, r: 0 },  // East
        Self { q: 1, r: -1 }, // Northeast
        Self { q: 0, r: -1 }, // Northwest
        Self { q: -1, r: 0 }, // West
        Self { q: -1, r: 1 }, // Southwest
        Self { q: 0, r: 1 },  // Southeast
    ];

    /// The coordinate reached by stepping out through `face`.
    pub fn neighbor(&self, face: Face) -> Self {
        *self + face.direction()
    }

    /// All six neighbors, indexed by face.
    pub fn neighbors(&self) -> [Self; FACE_COUNT] {
        Self::DIRECTIONS.map(|d| *self + d)
    }

    /// The face of this tile that touches `other`, if the two are adjacent.
    pub fn face_toward(&self, other: &Self) -> Option<Face> {
        let diff = *other - *self;
        Face::ALL.into_iter().find(|f| f.direction() == diff)
    }
}

impl Add for HexCoord {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Self {
            q: self.q + other.q,
            r: self.r + other.r,
        }
    }
}

impl Sub for HexCoord {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Self {
            q: self.q - other.q,
            r: self.r - other.r,
        }
    }
}

impl Neg for HexCoord {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Self {
            q: -self.q,
            r: -self.r,
        }
    }
}

impl std::fmt::Display for HexCoord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.q, self.r)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn s_axis_constraint() {
        let coords = [
            HexCoord::new(0, 0),
            HexCoord::new(1, 0),
            HexCoord::new(1, -1),
            HexCoord::new(-3, 5),
        ];
        for c in coords {
            assert_eq!(c.q + c.r + c.s(), 0);
        }
    }

    #[test]
    fn hex_distance_from_origin() {
        assert_eq!(HexCoord::ORIGIN.ring(), 0);

        for dir in HexCoord::DIRECTIONS {
            assert_eq!(dir.ring(), 1);
        }

        assert_eq!(HexCoord::new(2, 0).ring(), 2);
        assert_eq!(HexCoord::new(1, 1).ring(), 2);
    }

    #[test]
    fn six_unique_neighbors() {
        let neighbors = HexCoord::ORIGIN.neighbors();

        for n in neighbors {
            assert_eq!(n.hex_distance(&HexCoord::ORIGIN), 1);
        }

        let mut sorted: Vec<_> = neighbors.iter().collect();
        sorted.sort_by_key(|c| (c.q, c.r));
        for i in 0..sorted.len() - 1 {
            assert_ne!(sorted[i], sorted[i + 1]);
        }
    }

    #[test]
    fn opposite_directions_cancel() {
        for face in Face::ALL {
            assert_eq!(face.direction() + face.opposite().direction(), HexCoord::ORIGIN);
        }
    }

    #[test]
    fn face_toward_finds_adjacent_tiles_only() {
        let a = HexCoord::new(3, -2);
        for face in Face::ALL {
            let b = a.neighbor(face);
            assert_eq!(a.face_toward(&b), Some(face));
            assert_eq!(b.face_toward(&a), Some(face.opposite()));
        }
        assert_eq!(a.face_toward(&HexCoord::new(5, -2)), None);
        assert_eq!(a.face_toward(&a), None);
    }

    #[test]
    fn addition_subtraction() {
        let a = HexCoord::new(1, 2);
        let b = HexCoord::new(4, -1);

        assert_eq!(a + b, HexCoord::new(5, 1));
        assert_eq!(a - b, HexCoord::new(-3, 3));
        assert_eq!(a + (-b), a - b);
    }
}
