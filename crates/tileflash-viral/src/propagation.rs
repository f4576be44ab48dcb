//! The propagation state machine.
//!
//! One [`Propagator`] runs on every tile for the length of a propagation run.
//! It is a cooperative, non-blocking loop body: the owner calls
//! [`tick`](Propagator::tick) with elapsed milliseconds and
//! [`step`](Propagator::step) as often as it likes, and every decision is of
//! the form "check a countdown, act if it expired, re-arm it".
//!
//! # Data flow
//!
//! Pages are pulled, never pushed. A node that has something to give sends
//! unsolicited `Offer`s round-robin to its faces. A node that accepts an
//! offer locks onto that face as its source and asks for page 0; every page
//! it accepts triggers an immediate request for the next one, so transfer
//! runs as a tight request/response ping-pong. Lost requests or replies are
//! recovered by the `retry` countdown.
//!
//! # Termination
//!
//! Any pull from a child re-arms `active`. Once a relay's `active` runs out
//! it stops sending liveness requests upstream, so quiescence climbs the tree
//! one active window at a time until the root's `active` expires. The root
//! then floods `Go`, which each node forwards to its own children before
//! jumping.
//!
//! A complete relay whose subtree went quiet sends holds to its source
//! instead. The source answers each with an `Offer` while it is still
//! running, which re-arms the relay's `startup` without counting as a pull,
//! so a relay waits for the root's `Go` however long the rest of the cluster
//! takes. A node whose `startup` budget runs dry without useful activity
//! gives up: it runs the new program if it holds all of it, and the resident
//! one otherwise.

use serde::{Deserialize, Serialize};
use tileflash_topology::{next_probe_face, Face, PROBE_ORDER};
use tracing::{debug, info, trace, warn};

use crate::config::ViralConfig;
use crate::flash::Flash;
use crate::image::ProgramImage;
use crate::link::Link;
use crate::packet::{Packet, PageData, HOLD_PAGE};
use crate::state::{BootMode, DownloadState, Role};
use crate::status::{Color, StatusIndicator};
use crate::timer::Timers;

/// Which program to transfer control to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Program {
    /// The program now sitting in the staging area.
    Staged,
    /// The previously resident, known-good program.
    Fallback,
}

/// How a propagation run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Outcome {
    /// Jump to this program. No propagation state survives the jump.
    RunProgram(Program),
}

/// Result of one pass through the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Running,
    Done(Outcome),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Propagating,
    Flooding { remaining: u8 },
    Finished(Outcome),
}

/// Drives one node through a propagation run.
#[derive(Debug, Clone)]
pub struct Propagator {
    config: ViralConfig,
    state: DownloadState,
    timers: Timers,
    probe_next: Face,
    phase: Phase,
}

impl Propagator {
    /// Start a run as the root, distributing `image`.
    ///
    /// `config` is taken as valid; see [`ViralConfig::validate`].
    pub fn seed(image: &ProgramImage, config: ViralConfig) -> Self {
        let mut timers = Timers::default();
        timers.startup.arm(config.startup_budget_ms);
        // The root has no child yet; give it the whole budget to find one.
        timers.active.arm(config.startup_budget_ms);

        debug!(
            pages = image.page_count(),
            checksum = image.checksum(),
            "seeding cluster"
        );
        Self::with_state(DownloadState::root(image), timers, config)
    }

    /// Start a run waiting to be offered a program.
    ///
    /// `config` is taken as valid; see [`ViralConfig::validate`].
    pub fn listen(config: ViralConfig) -> Self {
        let mut timers = Timers::default();
        timers.startup.arm(config.startup_budget_ms);

        debug!("listening for offers");
        Self::with_state(DownloadState::listener(), timers, config)
    }

    /// Start the run the boot marker asked for. `resident` is what a
    /// seeding tile distributes.
    pub fn boot(mode: BootMode, resident: &ProgramImage, config: ViralConfig) -> Self {
        match mode {
            BootMode::Seed => Self::seed(resident, config),
            BootMode::Download => Self::listen(config),
        }
    }

    fn with_state(state: DownloadState, timers: Timers, config: ViralConfig) -> Self {
        debug_assert!(config.validate().is_ok(), "invalid propagation config: {config:?}");
        Self {
            config,
            state,
            timers,
            probe_next: PROBE_ORDER[0],
            phase: Phase::Propagating,
        }
    }

    pub fn state(&self) -> &DownloadState {
        &self.state
    }

    pub fn timers(&self) -> &Timers {
        &self.timers
    }

    pub fn config(&self) -> &ViralConfig {
        &self.config
    }

    pub fn role(&self) -> Role {
        self.state.role()
    }

    /// The outcome, once the run has finished.
    pub fn outcome(&self) -> Option<Outcome> {
        match self.phase {
            Phase::Finished(outcome) => Some(outcome),
            _ => None,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.outcome().is_some()
    }

    /// Advance every countdown by `elapsed_ms`.
    pub fn tick(&mut self, elapsed_ms: u32) {
        self.timers.tick(elapsed_ms);
    }

    /// One pass of the loop: service inbound packets on every face, keep the
    /// pull toward the source alive, probe one face if due, and check for
    /// termination.
    pub fn step<L, F, S>(&mut self, link: &mut L, flash: &mut F, status: &mut S) -> Step
    where
        L: Link,
        F: Flash,
        S: StatusIndicator,
    {
        match self.phase {
            Phase::Finished(outcome) => return Step::Done(outcome),
            Phase::Flooding { remaining } => return self.flood_go(link, remaining),
            Phase::Propagating => {}
        }

        if self.state.role() == Role::Listener {
            status.set_all(Color::Orange);
        }
        for face in Face::ALL {
            self.service_face(face, link, flash, status);
        }
        self.service_source(link);
        self.probe(link, status);

        if self.should_exit() {
            self.finish(status)
        } else {
            Step::Running
        }
    }

    fn service_face<L, F, S>(&mut self, face: Face, link: &mut L, flash: &mut F, status: &mut S)
    where
        L: Link,
        F: Flash,
        S: StatusIndicator,
    {
        let decoded = match link.poll(face) {
            Some(bytes) => {
                let decoded = Packet::decode(bytes);
                if let Err(err) = &decoded {
                    trace!(%face, %err, frame = %hex::encode(bytes), "dropping frame");
                }
                decoded
            }
            None => return,
        };
        link.consume(face);

        match decoded {
            Ok(Packet::Request { page }) => self.on_request(face, page, link, flash, status),
            Ok(Packet::Page { page, data }) => self.on_page(face, page, &data, link, flash, status),
            Ok(Packet::Offer {
                total_pages,
                program_checksum,
            }) => self.on_offer(face, total_pages, program_checksum, link, status),
            Ok(Packet::Go) => self.on_go(face),
            Err(_) => status.set_face(face, Color::Red),
        }
    }

    fn on_request<L, F, S>(&mut self, face: Face, page: u8, link: &mut L, flash: &mut F, status: &mut S)
    where
        L: Link,
        F: Flash,
        S: StatusIndicator,
    {
        // Our source never pulls from us, and with no run under way there
        // is nothing a pull could refer to.
        if self.state.source_face() == Some(face) || self.state.total_pages() == 0 {
            return;
        }
        if page == HOLD_PAGE {
            self.answer_hold(face, link);
            return;
        }

        if self.state.engage(face) {
            debug!(%face, "neighbor engaged");
        }
        self.timers.active.arm(self.config.active_window_ms);
        self.timers.startup.arm(self.config.startup_budget_ms);

        if !self.state.has_page(page) {
            trace!(%face, page, next_page = self.state.next_page(), "pull not servable");
            return;
        }

        let data = flash.read_page(page);
        let frame = Packet::Page {
            page,
            data: Box::new(data),
        }
        .encode();

        if link.try_send(face, &frame) {
            trace!(%face, page, "served page");
            status.set_face(face, if page & 1 == 1 { Color::Magenta } else { Color::Pink });
            self.timers.probe.extend(self.config.serve_backoff_ms);
        } else {
            status.set_face(face, Color::Cyan);
        }
    }

    fn on_page<L, F, S>(
        &mut self,
        face: Face,
        page: u8,
        data: &PageData,
        link: &mut L,
        flash: &mut F,
        status: &mut S,
    ) where
        L: Link,
        F: Flash,
        S: StatusIndicator,
    {
        if !self.state.expects_page(face, page) {
            if self.state.source_face() == Some(face) {
                status.set_face(face, Color::Orange);
            }
            trace!(%face, page, next_page = self.state.next_page(), "discarding unexpected page");
            return;
        }

        flash.write_page(page, data);
        self.state.advance(data);
        self.timers.startup.arm(self.config.startup_budget_ms);

        let next_page = self.state.next_page();
        trace!(%face, page, next_page, total_pages = self.state.total_pages(), "accepted page");
        status.set_face(face, if next_page & 1 == 1 { Color::Green } else { Color::DimGreen });

        if self.state.is_complete() {
            debug!(pages = next_page, "download complete");
            status.set_all(Color::Blue);
            if self.state.received_checksum() != self.state.program_checksum() {
                warn!(
                    offered = self.state.program_checksum(),
                    received = self.state.received_checksum(),
                    "program checksum mismatch"
                );
            }
        }

        // Ask for the next page (or ping liveness) right away instead of
        // waiting out the retry countdown.
        self.request_from_source(link);
    }

    /// A quiet child asking whether the run is still going. A hold is not a
    /// pull: it touches neither `active` nor `startup`.
    fn answer_hold<L: Link>(&mut self, face: Face, link: &mut L) {
        let sent = link.try_send(face, &self.offer().encode());
        trace!(%face, sent, "answered hold");
    }

    fn on_offer<L, S>(&mut self, face: Face, total_pages: u8, program_checksum: u16, link: &mut L, status: &mut S)
    where
        L: Link,
        S: StatusIndicator,
    {
        if !self.state.commit(face, total_pages, program_checksum) {
            if self.source_still_running(face, program_checksum) {
                trace!(%face, "source still running, waiting for go");
                status.set_face(face, Color::DimBlue);
                self.timers.startup.arm(self.config.startup_budget_ms);
            } else {
                trace!(%face, total_pages, "ignoring offer");
            }
            return;
        }

        debug!(%face, total_pages, program_checksum, "committed to source");
        status.set_all(Color::Off);
        status.set_face(face, Color::Blue);

        self.timers.startup.arm(self.config.startup_budget_ms);
        self.timers.active.arm(self.config.active_window_ms);
        self.timers.retry.expire();
        self.request_from_source(link);
    }

    /// An offer of our own program from our source, once we hold all of it,
    /// is the answer to a hold.
    fn source_still_running(&self, face: Face, program_checksum: u16) -> bool {
        self.state.source_face() == Some(face)
            && self.state.is_complete()
            && self.state.program_checksum() == program_checksum
    }

    fn on_go(&mut self, face: Face) {
        if self.state.observe_go(face) {
            debug!(%face, "go signal received");
            self.timers.startup.expire();
        }
    }

    /// Re-request from the source when the retry countdown runs out, as
    /// long as pages are still missing or children are still pulling.
    /// Otherwise send a hold.
    fn service_source<L: Link>(&mut self, link: &mut L) {
        if self.state.source_face().is_none() || !self.timers.retry.is_expired() {
            return;
        }
        let needs_pages = !self.state.is_complete();
        let active = !self.timers.active.is_expired();
        if needs_pages || active {
            self.request_from_source(link);
        } else {
            self.send_to_source(link, &Packet::hold());
        }
    }

    /// Request `next_page` from the source, which is the liveness form once
    /// the download is complete.
    fn request_from_source<L: Link>(&mut self, link: &mut L) -> bool {
        let page = self.state.next_page();
        self.send_to_source(link, &Packet::Request { page })
    }

    /// A refused send leaves `retry` expired so the next pass tries again.
    fn send_to_source<L: Link>(&mut self, link: &mut L, packet: &Packet) -> bool {
        let Some(source) = self.state.source_face() else {
            return false;
        };
        let sent = link.try_send(source, &packet.encode());
        if sent {
            self.timers.retry.arm(self.config.retry_interval_ms);
        }
        sent
    }

    fn offer(&self) -> Packet {
        Packet::Offer {
            total_pages: self.state.total_pages(),
            program_checksum: self.state.program_checksum(),
        }
    }

    /// Offer the program to the next face in the probe cycle.
    ///
    /// Every expiry consumes one slot of the cycle. A slot landing on the
    /// source or on an engaged face sends nothing, so `FACE_COUNT` probes
    /// visit each other face exactly once.
    fn probe<L, S>(&mut self, link: &mut L, status: &mut S)
    where
        L: Link,
        S: StatusIndicator,
    {
        if !self.timers.probe.is_expired() || self.state.next_page() == 0 {
            return;
        }

        let face = self.probe_next;
        self.probe_next = next_probe_face(face);
        self.timers.probe.arm(self.config.probe_interval_ms);

        if self.state.source_face() == Some(face) || self.state.engaged().contains(face) {
            return;
        }

        if link.try_send(face, &self.offer().encode()) {
            trace!(%face, "probed");
            status.set_face(face, Color::Yellow);
        }
    }

    fn should_exit(&self) -> bool {
        if self.state.go_signal_received() || self.timers.startup.is_expired() {
            return true;
        }
        // A relay whose subtree went quiet keeps waiting for go; only a
        // node with nobody above it ends the run on inactivity.
        self.state.source_face().is_none() && self.state.is_root() && self.timers.active.is_expired()
    }

    fn finish<S: StatusIndicator>(&mut self, status: &mut S) -> Step {
        if self.state.is_complete() {
            if !self.state.go_signal_received() {
                self.state.originate_go();
            }
            info!(
                role = ?self.state.role(),
                pages = self.state.total_pages(),
                originated = !self.state.go_signal_received(),
                "propagation finished, flooding go"
            );
            self.phase = Phase::Flooding {
                remaining: self.config.go_repeats,
            };
            Step::Running
        } else {
            warn!(
                role = ?self.state.role(),
                next_page = self.state.next_page(),
                total_pages = self.state.total_pages(),
                "propagation incomplete, falling back to resident program"
            );
            status.set_all(Color::Red);
            let outcome = Outcome::RunProgram(Program::Fallback);
            self.phase = Phase::Finished(outcome);
            Step::Done(outcome)
        }
    }

    fn flood_go<L: Link>(&mut self, link: &mut L, remaining: u8) -> Step {
        let go = Packet::Go.encode();
        let source = self.state.source_face();
        for face in Face::ALL.into_iter().filter(|f| Some(*f) != source) {
            // Collisions are expected; the repeats are what get through.
            link.try_send(face, &go);
        }

        let remaining = remaining.saturating_sub(1);
        if remaining == 0 {
            let outcome = Outcome::RunProgram(Program::Staged);
            self.phase = Phase::Finished(outcome);
            Step::Done(outcome)
        } else {
            self.phase = Phase::Flooding { remaining };
            Step::Running
        }
    }
}
