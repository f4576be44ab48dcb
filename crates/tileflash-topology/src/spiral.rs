//! Spiral enumeration of hexagonal positions.
//!
//! Walking outward ring by ring gives a compact cluster for any tile count:
//! the first `1 + 3n(n+1)` slots fill a perfect hexagon of radius `n`, and
//! every slot after the origin touches at least one earlier slot, so a
//! spiral cluster is always connected.

use crate::HexCoord;

/// A slot in the spiral enumeration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SpiralIndex(pub u64);

impl SpiralIndex {
    /// Origin slot.
    pub const ORIGIN: Self = Self(0);

    #[inline]
    pub const fn new(index: u64) -> Self {
        Self(index)
    }

    #[inline]
    pub const fn value(&self) -> u64 {
        self.0
    }

    /// Determine which ring this index falls in.
    ///
    /// Ring 0: index 0
    /// Ring 1: indices 1-6
    /// Ring 2: indices 7-18
    pub fn ring(&self) -> u64 {
        if self.0 == 0 {
            return 0;
        }

        let mut low = 1u64;
        let mut high = ((self.0 as f64).sqrt() as u64) + 2;

        while low < high {
            let mid = (low + high) / 2;
            if total_slots_through(mid) <= self.0 {
                low = mid + 1;
            } else {
                high = mid;
            }
        }
        low
    }

    /// Offset within the ring (0 to 6n-1 for ring n > 0).
    pub fn offset_in_ring(&self) -> u64 {
        let ring = self.ring();
        if ring == 0 {
            return 0;
        }
        self.0 - total_slots_through(ring - 1)
    }
}

impl From<u64> for SpiralIndex {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// Number of slots in ring n: 1 for the origin, 6n otherwise.
#[inline]
pub const fn slots_in_ring(ring: u64) -> u64 {
    if ring == 0 {
        1
    } else {
        6 * ring
    }
}

/// Total slots through ring n (inclusive): 1 + 3n(n+1).
#[inline]
pub const fn total_slots_through(ring: u64) -> u64 {
    1 + 3 * ring * (ring + 1)
}

// Ring n starts at the corner (n, 0) and walks six edges of length n.
const CORNERS: [(i64, i64); 6] = [(1, 0), (0, 1), (-1, 1), (-1, 0), (0, -1), (1, -1)];
const EDGE_STEPS: [(i64, i64); 6] = [(-1, 1), (-1, 0), (0, -1), (1, -1), (1, 0), (0, 1)];

/// Convert a spiral index to its coordinate.
pub fn spiral_to_coord(index: SpiralIndex) -> HexCoord {
    if index.0 == 0 {
        return HexCoord::ORIGIN;
    }

    let ring = index.ring();
    let offset = index.offset_in_ring();
    let edge = (offset / ring) as usize;
    let pos = (offset % ring) as i64;
    let n = ring as i64;

    let (cq, cr) = CORNERS[edge];
    let (dq, dr) = EDGE_STEPS[edge];
    HexCoord::new(cq * n + dq * pos, cr * n + dr * pos)
}

/// Convert a coordinate back to its spiral index.
pub fn coord_to_spiral(coord: HexCoord) -> SpiralIndex {
    if coord == HexCoord::ORIGIN {
        return SpiralIndex::ORIGIN;
    }

    let ring = coord.ring();
    let n = ring as i64;
    let base = total_slots_through(ring - 1);

    for edge in 0..6 {
        let (cq, cr) = CORNERS[edge];
        let (dq, dr) = EDGE_STEPS[edge];
        // Solve corner + step * pos == coord for pos on this edge.
        let (start_q, start_r) = (cq * n, cr * n);
        let pos = if dq != 0 {
            (coord.q - start_q) / dq
        } else {
            (coord.r - start_r) / dr
        };
        if (0..n).contains(&pos) && start_q + dq * pos == coord.q && start_r + dr * pos == coord.r {
            return SpiralIndex(base + edge as u64 * ring + pos as u64);
        }
    }

    unreachable!("every coordinate at distance {ring} lies on one edge of its ring")
}

/// Iterator over spiral coordinates.
pub struct Spiral {
    current: u64,
    limit: Option<u64>,
}

impl Spiral {
    /// An infinite spiral starting from the origin.
    pub fn new() -> Self {
        Self {
            current: 0,
            limit: None,
        }
    }

    /// The first `count` coordinates.
    pub fn take_slots(count: u64) -> Self {
        Self {
            current: 0,
            limit: Some(count),
        }
    }

    /// Every coordinate in rings `start_ring..=end_ring`.
    pub fn rings(start_ring: u64, end_ring: u64) -> Self {
        let start_slot = if start_ring == 0 {
            0
        } else {
            total_slots_through(start_ring - 1)
        };

        Self {
            current: start_slot,
            limit: Some(total_slots_through(end_ring)),
        }
    }
}

impl Default for Spiral {
    fn default() -> Self {
        Self::new()
    }
}

impl Iterator for Spiral {
    type Item = HexCoord;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(limit) = self.limit {
            if self.current >= limit {
                return None;
            }
        }

        let coord = spiral_to_coord(SpiralIndex(self.current));
        self.current += 1;
        Some(coord)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        match self.limit {
            Some(limit) => {
                let remaining = limit.saturating_sub(self.current) as usize;
                (remaining, Some(remaining))
            }
            None => (usize::MAX, None),
        }
    }
}
