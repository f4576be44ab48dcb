//! Physical layout of a cluster of docked tiles.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tileflash_topology::{Face, HexCoord, Spiral};

use crate::error::{Error, Result};

/// Index of a tile within its cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TileId(pub usize);

impl fmt::Display for TileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tile{}", self.0)
    }
}

/// Tiles placed on a hexagonal grid. Tiles on adjacent coordinates are
/// docked: the face pointing at a neighbor is linked to the neighbor's
/// opposite face.
#[derive(Debug, Clone)]
pub struct Cluster {
    coords: Vec<HexCoord>,
    by_coord: HashMap<HexCoord, TileId>,
}

impl Cluster {
    /// Tiles at the given coordinates, numbered in iteration order.
    pub fn from_coords(coords: impl IntoIterator<Item = HexCoord>) -> Result<Self> {
        let mut cluster = Self {
            coords: Vec::new(),
            by_coord: HashMap::new(),
        };
        for coord in coords {
            let id = TileId(cluster.coords.len());
            if cluster.by_coord.insert(coord, id).is_some() {
                return Err(Error::DuplicateTile(coord));
            }
            cluster.coords.push(coord);
        }
        if cluster.coords.is_empty() {
            return Err(Error::EmptyCluster);
        }
        Ok(cluster)
    }

    /// A straight chain running east from the origin.
    pub fn line(tiles: usize) -> Result<Self> {
        Self::from_coords((0..tiles as i64).map(|q| HexCoord::new(q, 0)))
    }

    /// A compact blob grown ring by ring around the origin.
    pub fn spiral(tiles: usize) -> Result<Self> {
        Self::from_coords(Spiral::take_slots(tiles as u64))
    }

    pub fn len(&self) -> usize {
        self.coords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }

    pub fn tiles(&self) -> impl Iterator<Item = TileId> {
        (0..self.coords.len()).map(TileId)
    }

    pub fn coord(&self, tile: TileId) -> HexCoord {
        self.coords[tile.0]
    }

    pub fn tile_at(&self, coord: HexCoord) -> Option<TileId> {
        self.by_coord.get(&coord).copied()
    }

    /// The tile docked on `face` of `tile`, and the face it sees us on.
    pub fn neighbor(&self, tile: TileId, face: Face) -> Option<(TileId, Face)> {
        let there = self.coord(tile).neighbor(face);
        self.tile_at(there).map(|other| (other, face.opposite()))
    }

    /// Longest shortest path (in hops) from `from` to any tile, or `None`
    /// if some tile cannot be reached at all.
    pub fn depth_from(&self, from: TileId) -> Option<usize> {
        let mut hops = vec![usize::MAX; self.len()];
        let mut frontier = vec![from];
        hops[from.0] = 0;
        while let Some(tile) = frontier.pop() {
            for face in Face::ALL {
                if let Some((next, _)) = self.neighbor(tile, face) {
                    if hops[next.0] > hops[tile.0] + 1 {
                        hops[next.0] = hops[tile.0] + 1;
                        frontier.push(next);
                    }
                }
            }
        }
        hops.into_iter().try_fold(0, |deepest, h| (h != usize::MAX).then(|| deepest.max(h)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn line_links_east_west() {
        let cluster = Cluster::line(3).unwrap();
        let east = Face::ALL[0];
        assert_eq!(cluster.neighbor(TileId(0), east), Some((TileId(1), east.opposite())));
        assert_eq!(cluster.neighbor(TileId(1), east.opposite()), Some((TileId(0), east)));
        assert_eq!(cluster.neighbor(TileId(2), east), None);
        assert_eq!(cluster.depth_from(TileId(0)), Some(2));
    }

    #[test]
    fn spiral_center_touches_ring_one() {
        let cluster = Cluster::spiral(7).unwrap();
        let neighbors: Vec<_> = Face::ALL
            .into_iter()
            .filter_map(|f| cluster.neighbor(TileId(0), f))
            .collect();
        assert_eq!(neighbors.len(), 6);
        assert_eq!(cluster.depth_from(TileId(0)), Some(1));
    }

    #[test]
    fn links_are_symmetric() {
        let cluster = Cluster::spiral(19).unwrap();
        for tile in cluster.tiles() {
            for face in Face::ALL {
                if let Some((other, back)) = cluster.neighbor(tile, face) {
                    assert_eq!(cluster.neighbor(other, back), Some((tile, face)));
                }
            }
        }
    }

    #[test]
    fn rejects_duplicates_and_empty() {
        let dup = Cluster::from_coords([HexCoord::ORIGIN, HexCoord::new(1, 0), HexCoord::ORIGIN]);
        assert!(matches!(dup, Err(Error::DuplicateTile(c)) if c == HexCoord::ORIGIN));
        assert!(matches!(Cluster::line(0), Err(Error::EmptyCluster)));
    }

    #[test]
    fn disconnected_cluster_has_no_depth() {
        let cluster = Cluster::from_coords([HexCoord::ORIGIN, HexCoord::new(5, 0)]).unwrap();
        assert_eq!(cluster.depth_from(TileId(0)), None);
    }
}
