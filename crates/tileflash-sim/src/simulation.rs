//! Virtual-clock simulation of a tile cluster.
//!
//! Time advances in 1 ms steps. Each step delivers the frames whose latency
//! has elapsed, runs one pass of every tile that is still in the loader, and
//! puts what the tiles sent on the links, where seeded faults may lose or
//! corrupt it.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use tileflash_topology::{Face, HexCoord, FACE_COUNT};
use tileflash_viral::{
    Color, Frame, MailboxLink, MemoryFlash, Outcome, PacketKind, Program, ProgramImage, Propagator, Role, Step,
    MAX_PAGES,
};
use tracing::{debug, info, trace};

use crate::cluster::{Cluster, TileId};
use crate::config::SimulationConfig;
use crate::error::{Error, Result};
use crate::events::{DropReason, SimEvent};

struct Tile {
    node: Propagator,
    link: MailboxLink,
    flash: MemoryFlash,
    status: [Color; FACE_COUNT],
    finished_at_ms: Option<u64>,
}

/// What the event log cares about, sampled around each pass.
#[derive(Clone, Copy)]
struct Progress {
    role: Role,
    total_pages: u8,
    next_page: u8,
    complete: bool,
    go_observed: bool,
    go_received: bool,
}

impl Progress {
    fn of(node: &Propagator) -> Self {
        let state = node.state();
        Self {
            role: state.role(),
            total_pages: state.total_pages(),
            next_page: state.next_page(),
            complete: state.is_complete(),
            go_observed: state.go_observed(),
            go_received: state.go_signal_received(),
        }
    }
}

struct InFlight {
    from: TileId,
    to: TileId,
    face: Face,
    frame: Frame,
    arrives_at_ms: u64,
}

/// Frame counters over the whole run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkStats {
    /// Frames put on a link toward a docked neighbor.
    pub sent: u64,
    pub lost: u64,
    pub corrupted: u64,
    /// Frames that reached a full mailbox.
    pub overrun: u64,
}

/// Per-tile summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TileReport {
    pub tile: TileId,
    pub coord: HexCoord,
    pub role: Role,
    /// Pages held.
    pub pages: u8,
    pub total_pages: u8,
    pub outcome: Option<Program>,
    pub finished_at_ms: Option<u64>,
    pub go_observed: bool,
    pub flash_writes: u32,
    /// Most writes any single page received.
    pub max_writes_per_page: u32,
    /// The staging area holds the distributed program.
    pub holds_program: bool,
}

/// State of the whole cluster at one point in virtual time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Report {
    pub elapsed_ms: u64,
    /// Hops from the seeding tile to the farthest tile, `None` if some
    /// tile cannot be reached.
    pub depth: Option<usize>,
    pub tiles: Vec<TileReport>,
    pub links: LinkStats,
}

impl Report {
    pub fn tile(&self, tile: TileId) -> &TileReport {
        &self.tiles[tile.0]
    }

    pub fn staged_count(&self) -> usize {
        self.count_outcome(Program::Staged)
    }

    pub fn fallback_count(&self) -> usize {
        self.count_outcome(Program::Fallback)
    }

    pub fn unfinished_count(&self) -> usize {
        self.tiles.iter().filter(|t| t.outcome.is_none()).count()
    }

    /// Every tile is running the distributed program.
    pub fn all_staged(&self) -> bool {
        self.staged_count() == self.tiles.len()
    }

    pub fn all_go_observed(&self) -> bool {
        self.tiles.iter().all(|t| t.go_observed)
    }

    fn count_outcome(&self, program: Program) -> usize {
        self.tiles.iter().filter(|t| t.outcome == Some(program)).count()
    }
}

/// Runs a propagation across a cluster and records what happens.
pub struct Simulation {
    config: SimulationConfig,
    cluster: Cluster,
    image: ProgramImage,
    tiles: Vec<Tile>,
    in_flight: Vec<InFlight>,
    rng: StdRng,
    now_ms: u64,
    events: Vec<SimEvent>,
    stats: LinkStats,
}

impl Simulation {
    /// Seed `config.root` with a patterned program of `config.pages` pages.
    pub fn new(cluster: Cluster, config: SimulationConfig) -> Result<Self> {
        let image = ProgramImage::patterned(config.pages)?;
        Self::with_image(cluster, image, config)
    }

    /// Seed `config.root` with `image`. `config.pages` is ignored.
    pub fn with_image(cluster: Cluster, image: ProgramImage, config: SimulationConfig) -> Result<Self> {
        config.validate()?;
        if config.root >= cluster.len() {
            return Err(Error::RootOutOfRange {
                root: config.root,
                tiles: cluster.len(),
            });
        }

        let tiles = cluster
            .tiles()
            .map(|id| {
                let (node, flash) = if id.0 == config.root {
                    (Propagator::seed(&image, config.viral), MemoryFlash::with_program(&image))
                } else {
                    (Propagator::listen(config.viral), MemoryFlash::erased())
                };
                Tile {
                    node,
                    link: MailboxLink::new(),
                    flash,
                    status: [Color::Off; FACE_COUNT],
                    finished_at_ms: None,
                }
            })
            .collect();

        debug!(
            tiles = cluster.len(),
            pages = image.page_count(),
            root = config.root,
            seed = config.seed,
            "simulation ready"
        );

        Ok(Self {
            rng: StdRng::seed_from_u64(config.seed),
            config,
            cluster,
            image,
            tiles,
            in_flight: Vec::new(),
            now_ms: 0,
            events: Vec::new(),
            stats: LinkStats::default(),
        })
    }

    pub fn config(&self) -> &SimulationConfig {
        &self.config
    }

    pub fn cluster(&self) -> &Cluster {
        &self.cluster
    }

    pub fn image(&self) -> &ProgramImage {
        &self.image
    }

    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    pub fn events(&self) -> &[SimEvent] {
        &self.events
    }

    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    pub fn node(&self, tile: TileId) -> &Propagator {
        &self.tiles[tile.0].node
    }

    pub fn flash(&self, tile: TileId) -> &MemoryFlash {
        &self.tiles[tile.0].flash
    }

    /// Last color shown on each face of `tile`.
    pub fn status(&self, tile: TileId) -> &[Color; FACE_COUNT] {
        &self.tiles[tile.0].status
    }

    pub fn stats(&self) -> LinkStats {
        self.stats
    }

    /// Every tile has left the loader.
    pub fn is_finished(&self) -> bool {
        self.tiles.iter().all(|t| t.finished_at_ms.is_some())
    }

    /// Run until every tile finishes or `max_ms` of virtual time passes.
    pub fn run(&mut self) -> Report {
        while !self.is_finished() && self.now_ms < self.config.max_ms {
            self.step();
        }
        let report = self.report();
        info!(
            elapsed_ms = report.elapsed_ms,
            depth = ?report.depth,
            staged = report.staged_count(),
            fallback = report.fallback_count(),
            unfinished = report.unfinished_count(),
            frames = report.links.sent,
            "simulation finished"
        );
        report
    }

    /// Advance at most `ms` steps, stopping early once every tile finishes.
    pub fn run_for(&mut self, ms: u64) {
        for _ in 0..ms {
            if self.is_finished() {
                break;
            }
            self.step();
        }
    }

    /// Advance virtual time by one millisecond.
    pub fn step(&mut self) {
        self.now_ms += 1;
        self.deliver();
        for index in 0..self.tiles.len() {
            self.step_tile(TileId(index));
        }
        self.transmit();
    }

    pub fn report(&self) -> Report {
        let tiles = self
            .tiles
            .iter()
            .enumerate()
            .map(|(index, tile)| {
                let state = tile.node.state();
                TileReport {
                    tile: TileId(index),
                    coord: self.cluster.coord(TileId(index)),
                    role: state.role(),
                    pages: state.next_page(),
                    total_pages: state.total_pages(),
                    outcome: tile.node.outcome().map(|Outcome::RunProgram(program)| program),
                    finished_at_ms: tile.finished_at_ms,
                    go_observed: state.go_observed(),
                    flash_writes: tile.flash.total_writes(),
                    max_writes_per_page: (0..MAX_PAGES as u8)
                        .map(|page| tile.flash.write_count(page))
                        .max()
                        .unwrap_or(0),
                    holds_program: tile.flash.holds(&self.image),
                }
            })
            .collect();

        Report {
            elapsed_ms: self.now_ms,
            depth: self.cluster.depth_from(TileId(self.config.root)),
            tiles,
            links: self.stats,
        }
    }

    fn deliver(&mut self) {
        let now = self.now_ms;
        let (due, pending): (Vec<_>, Vec<_>) = std::mem::take(&mut self.in_flight)
            .into_iter()
            .partition(|f| f.arrives_at_ms <= now);
        self.in_flight = pending;

        for flight in due {
            let tile = &mut self.tiles[flight.to.0];
            // A tile that jumped to its program no longer listens.
            if tile.finished_at_ms.is_some() {
                continue;
            }
            let kind = flight.frame.first().and_then(|tag| PacketKind::from_tag(*tag));
            if !tile.link.deliver(flight.face, flight.frame) {
                self.stats.overrun += 1;
                self.events.push(SimEvent::FrameDropped {
                    from: flight.from,
                    to: flight.to,
                    kind,
                    reason: DropReason::Overrun,
                    at_ms: now,
                });
            }
        }

        for tile in &mut self.tiles {
            for face in Face::ALL {
                tile.link.set_receiving(face, false);
            }
        }
        for flight in &self.in_flight {
            self.tiles[flight.to.0].link.set_receiving(flight.face, true);
        }
    }

    fn step_tile(&mut self, id: TileId) {
        let now = self.now_ms;
        let tile = &mut self.tiles[id.0];
        if tile.finished_at_ms.is_some() {
            return;
        }

        let before = Progress::of(&tile.node);
        tile.node.tick(1);
        let step = tile.node.step(&mut tile.link, &mut tile.flash, &mut tile.status);
        let after = Progress::of(&tile.node);
        if matches!(step, Step::Done(_)) {
            tile.finished_at_ms = Some(now);
        }

        self.record(id, before, after, step);
    }

    fn record(&mut self, tile: TileId, before: Progress, after: Progress, step: Step) {
        let at_ms = self.now_ms;

        if let (Role::Listener, Role::Relay { source: face }) = (before.role, after.role) {
            if let Some((source, _)) = self.cluster.neighbor(tile, face) {
                trace!(%tile, %source, at_ms, "committed");
                self.events.push(SimEvent::Committed {
                    tile,
                    source,
                    face,
                    total_pages: after.total_pages,
                    at_ms,
                });
            }
        }
        for page in before.next_page..after.next_page {
            self.events.push(SimEvent::PageAccepted { tile, page, at_ms });
        }
        if !before.complete && after.complete {
            self.events.push(SimEvent::Completed { tile, at_ms });
        }
        if !before.go_observed && after.go_observed {
            self.events.push(SimEvent::GoObserved {
                tile,
                originated: !after.go_received,
                at_ms,
            });
        }
        if let Step::Done(Outcome::RunProgram(program)) = step {
            debug!(%tile, ?program, at_ms, "tile finished");
            self.events.push(SimEvent::Finished { tile, program, at_ms });
        }
    }

    fn transmit(&mut self) {
        let arrives_at_ms = self.now_ms + u64::from(self.config.latency_ms);

        for index in 0..self.tiles.len() {
            let from = TileId(index);
            let sent: Vec<(Face, Frame)> = self.tiles[index].link.drain_outbox().collect();

            for (face, mut frame) in sent {
                // Nobody docked on that face.
                let Some((to, to_face)) = self.cluster.neighbor(from, face) else {
                    continue;
                };
                self.stats.sent += 1;
                let kind = frame.first().and_then(|tag| PacketKind::from_tag(*tag));

                if self.config.loss_rate > 0.0 && self.rng.gen_bool(self.config.loss_rate) {
                    self.stats.lost += 1;
                    self.events.push(SimEvent::FrameDropped {
                        from,
                        to,
                        kind,
                        reason: DropReason::Lost,
                        at_ms: self.now_ms,
                    });
                    continue;
                }

                if self.config.corrupt_rate > 0.0 && self.rng.gen_bool(self.config.corrupt_rate) {
                    let offset = self.rng.gen_range(0..frame.len());
                    let mask: u8 = self.rng.gen_range(1..=u8::MAX);
                    frame.bytes_mut()[offset] ^= mask;
                    self.stats.corrupted += 1;
                    self.events.push(SimEvent::FrameCorrupted {
                        from,
                        to,
                        kind,
                        offset,
                        at_ms: self.now_ms,
                    });
                }

                self.in_flight.push(InFlight {
                    from,
                    to,
                    face: to_face,
                    frame,
                    arrives_at_ms,
                });
            }
        }
    }
}
