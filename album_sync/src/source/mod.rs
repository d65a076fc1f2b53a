//! Where candidates come from: a saved page capture or the live albums page.

pub mod capture;
pub mod live;

use std::path::PathBuf;

use crate::config::Settings;
use crate::cover::BaseLocation;
use crate::extract::AlbumSelectors;
use crate::{CandidateBatch, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
    /// A saved HTML capture of the albums page.
    Capture(PathBuf),
    /// The albums page itself, driven through a browser.
    Live,
}

/// Candidates plus the location their relative image references are resolved against.
#[derive(Debug, Clone)]
pub struct Acquired {
    pub batch: CandidateBatch,
    pub base: BaseLocation,
}

pub async fn acquire(source: &Source, settings: &Settings, selectors: &AlbumSelectors) -> Result<Acquired> {
    match source {
        Source::Capture(path) => capture::read_capture(path, selectors),
        Source::Live => live::scrape_albums(settings, selectors).await,
    }
}
