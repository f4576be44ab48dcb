//! Program images and their integrity values.

use crate::error::ImageError;
use crate::packet::{sum, PacketKind, PageData};
use crate::{MAX_PAGES, PAGE_SIZE};

/// Value of erased flash; pads the tail of the last page.
pub const ERASED: u8 = 0xFF;

/// Sum of a page as it appears in a `Page` frame: tag, data and index.
#[inline]
fn page_sum(page: u8, data: &PageData) -> u8 {
    PacketKind::Page.tag().wrapping_add(sum(data)).wrapping_add(page)
}

/// The check byte a `Page` frame for `page` carries.
pub fn page_checksum(page: u8, data: &PageData) -> u8 {
    !page_sum(page, data)
}

/// Fold one page into a running whole-program checksum.
///
/// Each page contributes its frame sum plus its index.
#[inline]
pub fn fold_program_checksum(acc: u16, page: u8, data: &PageData) -> u16 {
    acc.wrapping_add(u16::from(page_sum(page, data)))
        .wrapping_add(u16::from(page))
}

/// A complete program split into flash pages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgramImage {
    pages: Vec<PageData>,
}

impl ProgramImage {
    /// Split a binary into pages, padding the last one with erased bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ImageError> {
        if bytes.is_empty() {
            return Err(ImageError::Empty);
        }
        let count = bytes.len().div_ceil(PAGE_SIZE);
        if count > MAX_PAGES {
            return Err(ImageError::TooLarge {
                pages: count,
                max: MAX_PAGES,
            });
        }

        let pages = bytes
            .chunks(PAGE_SIZE)
            .map(|chunk| {
                let mut page = [ERASED; PAGE_SIZE];
                page[..chunk.len()].copy_from_slice(chunk);
                page
            })
            .collect();
        Ok(Self { pages })
    }

    /// A deterministic image of `pages` pages, each filled with a pattern
    /// derived from its index. Handy for tests and simulations.
    pub fn patterned(pages: u8) -> Result<Self, ImageError> {
        let bytes: Vec<u8> = (0..usize::from(pages) * PAGE_SIZE)
            .map(|i| ((i / PAGE_SIZE) as u8).wrapping_mul(31).wrapping_add(i as u8))
            .collect();
        Self::from_bytes(&bytes)
    }

    pub fn page_count(&self) -> u8 {
        // Bounded by MAX_PAGES at construction.
        self.pages.len() as u8
    }

    pub fn page(&self, index: u8) -> Option<&PageData> {
        self.pages.get(usize::from(index))
    }

    pub fn pages(&self) -> impl Iterator<Item = &PageData> {
        self.pages.iter()
    }

    /// Whole-program checksum carried in every offer.
    pub fn checksum(&self) -> u16 {
        self.pages
            .iter()
            .zip(0u8..)
            .fold(0, |acc, (data, page)| fold_program_checksum(acc, page, data))
    }
}
