//! The staging program area in flash.

use crate::image::{ProgramImage, ERASED};
use crate::packet::PageData;
use crate::{MAX_PAGES, PAGE_SIZE};

/// Page-granular access to the staging area.
///
/// Writes are synchronous erase-then-program and idempotent for a given
/// page. Only the propagation loop writes here, and only in increasing
/// page order.
pub trait Flash {
    fn write_page(&mut self, index: u8, data: &PageData);

    fn read_page(&self, index: u8) -> PageData;
}

/// A RAM-backed staging area that counts writes.
#[derive(Debug, Clone)]
pub struct MemoryFlash {
    pages: Vec<PageData>,
    writes: Vec<u32>,
}

impl Default for MemoryFlash {
    fn default() -> Self {
        Self {
            pages: vec![[ERASED; PAGE_SIZE]; MAX_PAGES],
            writes: vec![0; MAX_PAGES],
        }
    }
}

impl MemoryFlash {
    /// A fully erased staging area.
    pub fn erased() -> Self {
        Self::default()
    }

    /// A staging area already holding `image`, as on a seeding tile.
    /// Preloading is not counted as writes.
    pub fn with_program(image: &ProgramImage) -> Self {
        let mut flash = Self::default();
        for (slot, data) in flash.pages.iter_mut().zip(image.pages()) {
            *slot = *data;
        }
        flash
    }

    /// How many times `index` has been written.
    pub fn write_count(&self, index: u8) -> u32 {
        self.writes.get(usize::from(index)).copied().unwrap_or(0)
    }

    pub fn total_writes(&self) -> u32 {
        self.writes.iter().sum()
    }

    /// Whether the first `image.page_count()` pages match `image`.
    pub fn holds(&self, image: &ProgramImage) -> bool {
        self.pages.iter().zip(image.pages()).all(|(a, b)| a == b)
    }
}

impl Flash for MemoryFlash {
    fn write_page(&mut self, index: u8, data: &PageData) {
        let index = usize::from(index);
        if index < self.pages.len() {
            self.pages[index] = *data;
            self.writes[index] += 1;
        }
    }

    fn read_page(&self, index: u8) -> PageData {
        self.pages
            .get(usize::from(index))
            .copied()
            .unwrap_or([ERASED; PAGE_SIZE])
    }
}
