use std::fs;
use std::path::{Path, PathBuf};

use chrono::{Days, NaiveDate};
use tracing::info;

use crate::utils::save_text_if_absent;
use crate::{Album, Error, Result};

const PROGRESS_EVERY: usize = 25;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderReport {
    pub written: usize,
    pub skipped: usize,
}

/// Writes one Jekyll post per album. The post date encodes catalog position
/// (1970-01-01 plus the index in days), so posts sort like the catalog.
/// Posts that already exist are left as they are.
pub fn render_posts(catalog: &[Album], posts_dir: &Path) -> Result<RenderReport> {
    fs::create_dir_all(posts_dir)?;
    let mut report = RenderReport::default();

    for (index, album) in catalog.iter().enumerate() {
        let path = post_path(posts_dir, index, &album.title)?;
        if save_text_if_absent(&path, &front_matter(album))? {
            report.written += 1;
            if report.written % PROGRESS_EVERY == 0 {
                info!("{} posts written", report.written);
            }
        } else {
            report.skipped += 1;
        }
    }

    info!("{} posts written, {} already present", report.written, report.skipped);
    Ok(report)
}

pub fn post_path(posts_dir: &Path, index: usize, title: &str) -> Result<PathBuf> {
    let date = NaiveDate::from_ymd_opt(1970, 1, 1)
        .and_then(|epoch| epoch.checked_add_days(Days::new(index as u64)))
        .ok_or_else(|| Error::Usage(format!("no post date for catalog index {}", index)))?;
    let name = format!("{}-{}.md", date.format("%Y-%m-%d"), title).replace([' ', '/'], "-");
    Ok(posts_dir.join(name))
}

pub fn front_matter(album: &Album) -> String {
    format!(
        "---\ntitle: \"{}\"\nelements: {}\nalbum_url: {}\ncover_image_url: {}\ncategories: [ Uncategorized ]\n---\n",
        album.title.replace('\\', "\\\\").replace('"', "\\\""),
        album.elements,
        album.album_url,
        album.cover_image_url,
    )
}
