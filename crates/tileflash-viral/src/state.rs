//! Per-node download progress for one propagation run.
//!
//! Sentinels carry the protocol's meaning: `next_page == total_pages` means
//! "fully loaded" (and is what a liveness request asks for), and a node with
//! no source face is either the root or still listening. [`Role`] gives the
//! same facts as a proper sum type.

use serde::{Deserialize, Serialize};
use tileflash_topology::{Face, FaceSet};

use crate::image::{fold_program_checksum, ProgramImage};
use crate::packet::PageData;
use crate::MAX_PAGES;

/// How the loader was entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BootMode {
    /// This tile holds a ready program and should seed the cluster.
    Seed,
    /// Wait to be found by a neighbor that has something to give.
    Download,
}

impl BootMode {
    /// Marker the application leaves behind to request seeding.
    pub const SEED_MARKER: u8 = b'S';
    /// Marker the application leaves behind to request downloading.
    pub const DOWNLOAD_MARKER: u8 = b'D';

    /// Decode the marker register. Anything but the seed marker downloads,
    /// which is also what a plain power-up leaves behind.
    pub fn from_register(value: u8) -> Self {
        if value == Self::SEED_MARKER {
            Self::Seed
        } else {
            Self::Download
        }
    }

    pub fn marker(self) -> u8 {
        match self {
            Self::Seed => Self::SEED_MARKER,
            Self::Download => Self::DOWNLOAD_MARKER,
        }
    }
}

/// Where a node stands in the distribution tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum Role {
    /// Started with the complete program. Never has a source.
    Root,
    /// Has nothing yet and has not accepted an offer.
    Listener,
    /// Downloading (or done downloading) from `source`.
    Relay { source: Face },
}

/// Download progress of one node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadState {
    root: bool,
    source_face: Option<Face>,
    total_pages: u8,
    next_page: u8,
    program_checksum: u16,
    received_checksum: u16,
    engaged: FaceSet,
    go_signal_received: bool,
    go_originated: bool,
}

impl DownloadState {
    /// State of a seeding node: everything already present.
    pub fn root(image: &ProgramImage) -> Self {
        let pages = image.page_count();
        let checksum = image.checksum();
        Self {
            root: true,
            source_face: None,
            total_pages: pages,
            next_page: pages,
            program_checksum: checksum,
            received_checksum: checksum,
            engaged: FaceSet::EMPTY,
            go_signal_received: false,
            go_originated: false,
        }
    }

    /// State of a node waiting to be found.
    pub fn listener() -> Self {
        Self {
            root: false,
            source_face: None,
            total_pages: 0,
            next_page: 0,
            program_checksum: 0,
            received_checksum: 0,
            engaged: FaceSet::EMPTY,
            go_signal_received: false,
            go_originated: false,
        }
    }

    pub fn role(&self) -> Role {
        match (self.root, self.source_face) {
            (true, _) => Role::Root,
            (false, Some(source)) => Role::Relay { source },
            (false, None) => Role::Listener,
        }
    }

    pub fn is_root(&self) -> bool {
        self.root
    }

    pub fn source_face(&self) -> Option<Face> {
        self.source_face
    }

    pub fn total_pages(&self) -> u8 {
        self.total_pages
    }

    pub fn next_page(&self) -> u8 {
        self.next_page
    }

    pub fn program_checksum(&self) -> u16 {
        self.program_checksum
    }

    /// Running checksum over the pages accepted so far.
    pub fn received_checksum(&self) -> u16 {
        self.received_checksum
    }

    /// Faces a neighbor has pulled on.
    pub fn engaged(&self) -> FaceSet {
        self.engaged
    }

    pub fn go_signal_received(&self) -> bool {
        self.go_signal_received
    }

    /// Whether this node has seen the go signal, either from its source or
    /// by originating it.
    pub fn go_observed(&self) -> bool {
        self.go_signal_received || self.go_originated
    }

    /// A run is known and every page of it is present.
    pub fn is_complete(&self) -> bool {
        self.total_pages > 0 && self.next_page == self.total_pages
    }

    /// Whether `page` is already present and can be served.
    pub fn has_page(&self, page: u8) -> bool {
        page < self.next_page
    }

    /// Lock in a source from an offer on `face`. Only the first valid offer
    /// a non-root node sees is taken.
    pub fn commit(&mut self, face: Face, total_pages: u8, program_checksum: u16) -> bool {
        if self.root || self.source_face.is_some() {
            return false;
        }
        if total_pages == 0 || usize::from(total_pages) > MAX_PAGES {
            return false;
        }
        self.source_face = Some(face);
        self.total_pages = total_pages;
        self.program_checksum = program_checksum;
        true
    }

    /// Whether a page arriving on `face` is the one this node needs now.
    pub fn expects_page(&self, face: Face, page: u8) -> bool {
        self.source_face == Some(face) && page == self.next_page && self.next_page < self.total_pages
    }

    /// Record that the expected page has been stored.
    pub(crate) fn advance(&mut self, data: &PageData) {
        debug_assert!(self.next_page < self.total_pages);
        self.received_checksum = fold_program_checksum(self.received_checksum, self.next_page, data);
        self.next_page += 1;
    }

    /// Mark `face` as pulled on. Returns `true` the first time.
    pub fn engage(&mut self, face: Face) -> bool {
        self.engaged.insert(face)
    }

    /// Take a go signal arriving on `face`. Only the source is believed.
    pub fn observe_go(&mut self, face: Face) -> bool {
        if self.source_face != Some(face) {
            return false;
        }
        self.go_signal_received = true;
        true
    }

    pub(crate) fn originate_go(&mut self) {
        self.go_originated = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PAGE_SIZE;
    use proptest::prelude::*;

    fn face(i: u8) -> Face {
        Face::new(i).unwrap()
    }

    #[test]
    fn boot_marker_decoding() {
        assert_eq!(BootMode::from_register(b'S'), BootMode::Seed);
        assert_eq!(BootMode::from_register(b'D'), BootMode::Download);
        assert_eq!(BootMode::from_register(0), BootMode::Download);
        assert_eq!(BootMode::from_register(BootMode::Seed.marker()), BootMode::Seed);
    }

    #[test]
    fn root_starts_complete() {
        let image = ProgramImage::patterned(4).unwrap();
        let state = DownloadState::root(&image);
        assert_eq!(state.role(), Role::Root);
        assert!(state.is_complete());
        assert_eq!(state.next_page(), 4);
        assert!(state.has_page(3));
        assert!(!state.has_page(4));
        assert_eq!(state.program_checksum(), image.checksum());
    }

    #[test]
    fn root_never_commits() {
        let mut state = DownloadState::root(&ProgramImage::patterned(1).unwrap());
        assert!(!state.commit(face(0), 3, 0));
        assert_eq!(state.source_face(), None);
    }

    #[test]
    fn listener_is_not_complete() {
        let state = DownloadState::listener();
        assert_eq!(state.role(), Role::Listener);
        assert!(!state.is_complete());
        assert!(!state.has_page(0));
    }

    #[test]
    fn first_offer_wins() {
        let mut state = DownloadState::listener();
        assert!(state.commit(face(2), 4, 0xBEEF));
        assert!(!state.commit(face(5), 9, 0x1111));
        assert_eq!(state.role(), Role::Relay { source: face(2) });
        assert_eq!(state.total_pages(), 4);
        assert_eq!(state.program_checksum(), 0xBEEF);
    }

    #[test]
    fn offers_outside_the_application_area_ignored() {
        let mut state = DownloadState::listener();
        assert!(!state.commit(face(0), 0, 0));
        assert!(!state.commit(face(0), (MAX_PAGES + 1) as u8, 0));
        assert_eq!(state.role(), Role::Listener);
    }

    #[test]
    fn go_only_from_source() {
        let mut state = DownloadState::listener();
        assert!(!state.observe_go(face(1)));
        state.commit(face(1), 2, 0);
        assert!(!state.observe_go(face(4)));
        assert!(state.observe_go(face(1)));
        assert!(state.go_signal_received());
        assert!(state.go_observed());
    }

    #[test]
    fn originating_go_is_observed_but_not_received() {
        let mut state = DownloadState::root(&ProgramImage::patterned(1).unwrap());
        state.originate_go();
        assert!(state.go_observed());
        assert!(!state.go_signal_received());
    }

    proptest! {
        // Whatever arrives, pages are taken strictly in order from the
        // source and progress never runs backwards or past the end.
        #[test]
        fn pages_accepted_strictly_in_order(
            total in 1u8..8,
            arrivals in proptest::collection::vec((0u8..6, 0u8..10), 0..64),
        ) {
            let mut state = DownloadState::listener();
            state.commit(face(0), total, 0);
            let data = [0u8; PAGE_SIZE];
            for (from, page) in arrivals {
                let before = state.next_page();
                if state.expects_page(face(from), page) {
                    prop_assert_eq!(from, 0);
                    prop_assert_eq!(page, before);
                    state.advance(&data);
                    prop_assert_eq!(state.next_page(), before + 1);
                } else {
                    prop_assert_eq!(state.next_page(), before);
                }
                prop_assert!(state.next_page() <= state.total_pages());
            }
        }
    }
}
