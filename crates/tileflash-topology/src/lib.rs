//! Tile Cluster Topology
//!
//! Geometry of hexagonal tiles that dock edge to edge on a flat surface.
//!
//! # Faces
//!
//! Each tile has [`FACE_COUNT`] faces, numbered counter-clockwise from east.
//! A face is one end of a point-to-point IR link; two touching tiles always
//! meet on opposite faces (`f` and `f + 3 mod 6`).
//!
//! # Coordinates
//!
//! Tiles are placed on axial hexagonal coordinates. The neighbor through
//! face `f` sits at `coord + HexCoord::DIRECTIONS[f]`.
//!
//! # Probe Order
//!
//! [`PROBE_ORDER`] is the fixed round-robin a seeding tile uses to court its
//! neighbors. It visits every face once per cycle and never steps between
//! adjacent faces.

mod face;
mod hex;
mod spiral;

pub use face::{next_probe_face, Face, FaceSet, InvalidFace, FACE_COUNT, PROBE_ORDER};
pub use hex::HexCoord;
pub use spiral::{coord_to_spiral, slots_in_ring, spiral_to_coord, total_slots_through, Spiral, SpiralIndex};

// Ring 1 of the spiral is exactly the set of a tile's neighbors.
const _: () = assert!(FACE_COUNT as u64 == slots_in_ring(1));

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ring_one_is_the_neighborhood() {
        let ring: Vec<_> = Spiral::rings(1, 1).collect();
        for n in HexCoord::ORIGIN.neighbors() {
            assert!(ring.contains(&n));
        }
    }
}
