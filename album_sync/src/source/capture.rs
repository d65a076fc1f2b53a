use std::fs;
use std::path::Path;

use tracing::info;

use super::Acquired;
use crate::cover::BaseLocation;
use crate::extract::AlbumSelectors;
use crate::{CandidateBatch, Error, Result, SourceOrder};

/// Extracts albums from a saved page. Entries appear newest first, as on the live page.
pub fn read_capture(path: &Path, selectors: &AlbumSelectors) -> Result<Acquired> {
    let markup = fs::read_to_string(path)
        .map_err(|e| Error::Usage(format!("cannot read page capture {}: {}", path.display(), e)))?;

    let candidates = selectors.extract_markup(&markup);
    info!("Found {} albums in {}", candidates.len(), path.display());

    let dir = path.parent().unwrap_or_else(|| Path::new("")).to_path_buf();
    Ok(Acquired {
        batch: CandidateBatch::new(SourceOrder::NewestFirst, candidates),
        base: BaseLocation::Directory(dir),
    })
}
