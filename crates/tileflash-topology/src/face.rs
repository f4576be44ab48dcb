//! Faces of a tile and small per-face bookkeeping types.
//!
//! A tile has six edges, each carrying one independent half-duplex IR link.
//! Faces are numbered counter-clockwise starting at east, so faces `i` and
//! `i + 1 (mod 6)` share a corner and face `i + 3 (mod 6)` points away.

use thiserror::Error;

use crate::HexCoord;

/// Number of faces (and therefore potential neighbors) per tile.
pub const FACE_COUNT: usize = 6;

/// One edge of a tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(try_from = "u8", into = "u8")
)]
pub struct Face(u8);

impl Face {
    /// Every face in index order.
    pub const ALL: [Self; FACE_COUNT] = [Self(0), Self(1), Self(2), Self(3), Self(4), Self(5)];

    /// Create a face from its index, or `None` if out of range.
    #[inline]
    pub const fn new(index: u8) -> Option<Self> {
        if (index as usize) < FACE_COUNT {
            Some(Self(index))
        } else {
            None
        }
    }

    /// Index of this face, `0..FACE_COUNT`.
    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// The face pointing the other way. Two touching tiles always meet on
    /// opposite faces.
    #[inline]
    pub const fn opposite(self) -> Self {
        Self((self.0 + 3) % FACE_COUNT as u8)
    }

    /// Whether the two faces share a corner of the tile.
    pub const fn is_adjacent(self, other: Self) -> bool {
        let diff = (self.0 + FACE_COUNT as u8 - other.0) % FACE_COUNT as u8;
        diff == 1 || diff == FACE_COUNT as u8 - 1
    }

    /// Step from a tile to the neighbor touching this face.
    #[inline]
    pub const fn direction(self) -> HexCoord {
        HexCoord::DIRECTIONS[self.0 as usize]
    }
}

impl TryFrom<u8> for Face {
    type Error = InvalidFace;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value).ok_or(InvalidFace(value))
    }
}

impl From<Face> for u8 {
    fn from(face: Face) -> Self {
        face.0
    }
}

impl std::fmt::Display for Face {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "face{}", self.0)
    }
}

/// A face index outside `0..FACE_COUNT`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("face index {0} out of range 0..6")]
pub struct InvalidFace(pub u8);

/// A set of faces packed into one byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FaceSet(u8);

impl FaceSet {
    /// The empty set.
    pub const EMPTY: Self = Self(0);

    /// Every face.
    pub const fn full() -> Self {
        Self((1 << FACE_COUNT) - 1)
    }

    /// Add a face. Returns `true` if it was not already present.
    pub fn insert(&mut self, face: Face) -> bool {
        let fresh = !self.contains(face);
        self.0 |= 1 << face.0;
        fresh
    }

    /// Remove a face. Returns `true` if it was present.
    pub fn remove(&mut self, face: Face) -> bool {
        let present = self.contains(face);
        self.0 &= !(1 << face.0);
        present
    }

    pub const fn contains(&self, face: Face) -> bool {
        self.0 & (1 << face.0) != 0
    }

    pub const fn len(&self) -> usize {
        self.0.count_ones() as usize
    }

    pub const fn is_empty(&self) -> bool {
        self.0 == 0
    }

    /// Faces in the set, in index order.
    pub fn iter(&self) -> impl Iterator<Item = Face> + '_ {
        Face::ALL.into_iter().filter(move |f| self.contains(*f))
    }
}

impl FromIterator<Face> for FaceSet {
    fn from_iter<I: IntoIterator<Item = Face>>(iter: I) -> Self {
        let mut set = Self::EMPTY;
        for face in iter {
            set.insert(face);
        }
        set
    }
}

/// Successor of each face in the probe cycle, indexed by face.
///
/// The cycle is 0 → 2 → 4 → 1 → 5 → 3 → 0. No step, including the wrap,
/// lands on a face adjacent to the previous one, so two untouched neighbors
/// sitting on adjacent faces of a seeding tile tend to be reached far apart
/// in time and can start serving each other in the meantime.
const NEXT_PROBE: [u8; FACE_COUNT] = [2, 5, 4, 0, 1, 3];

/// The probe cycle starting from face 0.
pub const PROBE_ORDER: [Face; FACE_COUNT] = [Face(0), Face(2), Face(4), Face(1), Face(5), Face(3)];

/// The face probed after `face`.
#[inline]
pub const fn next_probe_face(face: Face) -> Face {
    Face(NEXT_PROBE[face.0 as usize])
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn face_range_enforced() {
        assert!(Face::new(5).is_some());
        assert!(Face::new(6).is_none());
        assert_eq!(Face::try_from(9u8), Err(InvalidFace(9)));
    }

    #[test]
    fn opposite_is_involution() {
        for face in Face::ALL {
            assert_ne!(face.opposite(), face);
            assert_eq!(face.opposite().opposite(), face);
            assert!(!face.is_adjacent(face.opposite()));
        }
    }

    #[test]
    fn each_face_has_two_adjacent_faces() {
        for face in Face::ALL {
            let count = Face::ALL.iter().filter(|f| face.is_adjacent(**f)).count();
            assert_eq!(count, 2, "{face}");
        }
    }

    #[test]
    fn probe_order_follows_successor_table() {
        for i in 0..FACE_COUNT {
            let next = PROBE_ORDER[(i + 1) % FACE_COUNT];
            assert_eq!(next_probe_face(PROBE_ORDER[i]), next);
        }
    }

    #[test]
    fn probe_cycle_visits_every_face_once() {
        let mut seen = FaceSet::EMPTY;
        let mut face = Face::ALL[0];
        for _ in 0..FACE_COUNT {
            assert!(seen.insert(face), "{face} visited twice");
            face = next_probe_face(face);
        }
        assert_eq!(seen, FaceSet::full());
        assert_eq!(face, Face::ALL[0]);
    }

    #[test]
    fn probe_cycle_never_steps_to_adjacent_face() {
        for face in Face::ALL {
            assert!(!face.is_adjacent(next_probe_face(face)));
        }
    }

    #[test]
    fn face_set_operations() {
        let mut set = FaceSet::EMPTY;
        assert!(set.is_empty());
        assert!(set.insert(Face::ALL[1]));
        assert!(!set.insert(Face::ALL[1]));
        set.insert(Face::ALL[4]);
        assert_eq!(set.len(), 2);
        assert_eq!(set.iter().collect::<Vec<_>>(), vec![Face::ALL[1], Face::ALL[4]]);
        assert!(set.remove(Face::ALL[1]));
        assert!(!set.contains(Face::ALL[1]));
        assert_eq!(FaceSet::full().len(), FACE_COUNT);
    }

    proptest! {
        #[test]
        fn face_set_matches_bool_array(ops in proptest::collection::vec((0u8..6, any::<bool>()), 0..32)) {
            let mut set = FaceSet::EMPTY;
            let mut model = [false; FACE_COUNT];
            for (index, add) in ops {
                let face = Face::new(index).unwrap();
                if add {
                    set.insert(face);
                } else {
                    set.remove(face);
                }
                model[index as usize] = add;
            }
            for face in Face::ALL {
                prop_assert_eq!(set.contains(face), model[face.index()]);
            }
            prop_assert_eq!(set.len(), model.iter().filter(|b| **b).count());
        }
    }
}
