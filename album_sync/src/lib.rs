pub mod browser;
pub mod config;
pub mod cover;
pub mod error;
pub mod extract;
pub mod merge;
pub mod render;
pub mod retry;
pub mod source;
pub mod store;
pub mod sync;
pub mod utils;

pub use error::{Error, Result};

use serde::{Deserialize, Serialize};

/// Element count stored when the extraction variant did not compute one.
pub const UNKNOWN_ELEMENTS: i64 = -1;

/// A finalized catalog entry. Field order is the persisted key order.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct Album {
    pub title: String,
    pub elements: i64,
    pub album_url: String,
    pub cover_image_url: String,
}

/// The `(title, album_url)` pair that decides whether two records are the same album.
///
/// Narrower than equality: element count and cover path may drift between
/// syncs without producing a second entry.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq, Hash)]
pub struct AlbumIdentity {
    pub title: String,
    pub album_url: String,
}

impl Album {
    pub fn new(title: String, elements: Option<i64>, album_url: String, cover_image_url: String) -> Self {
        Self {
            title,
            elements: elements.unwrap_or(UNKNOWN_ELEMENTS),
            album_url,
            cover_image_url,
        }
    }

    pub fn identity(&self) -> AlbumIdentity {
        AlbumIdentity {
            title: self.title.clone(),
            album_url: self.album_url.clone(),
        }
    }
}

/// An album entry as pulled from page structure, before dedup and cover normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawCandidate {
    pub title: String,
    pub elements: Option<i64>,
    pub album_url: String,
    pub cover_ref: String,
}

impl RawCandidate {
    pub fn identity(&self) -> AlbumIdentity {
        AlbumIdentity {
            title: self.title.clone(),
            album_url: self.album_url.clone(),
        }
    }
}

/// Order in which a source lists its entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceOrder {
    NewestFirst,
    OldestFirst,
}

/// Candidates from one extraction, tagged with the order the source produced them in.
#[derive(Debug, Clone)]
pub struct CandidateBatch {
    pub order: SourceOrder,
    pub candidates: Vec<RawCandidate>,
}

impl CandidateBatch {
    pub fn new(order: SourceOrder, candidates: Vec<RawCandidate>) -> Self {
        Self { order, candidates }
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// Oldest-first view, the order new albums are appended in.
    pub fn into_chronological(self) -> Vec<RawCandidate> {
        let mut candidates = self.candidates;
        if self.order == SourceOrder::NewestFirst {
            candidates.reverse();
        }
        candidates
    }
}
