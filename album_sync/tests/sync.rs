use std::fs;
use std::path::{Path, PathBuf};

use album_sync::cover::{CoverPipeline, ImageResolver, COVER_SIZE};
use album_sync::extract::AlbumSelectors;
use album_sync::merge::MergeMode;
use album_sync::source::capture::read_capture;
use album_sync::store::{CatalogStore, IgnoreList};
use album_sync::sync::{synchronize, SyncReport};
use album_sync::{Album, Error};
use image::{Rgb, RgbImage};
use tempfile::TempDir;

/// A scratch site: page captures, cover sources, asset dir and catalog.
struct Site {
    dir: TempDir,
}

impl Site {
    fn new() -> Self {
        let site = Self {
            dir: tempfile::tempdir().unwrap(),
        };
        fs::create_dir_all(site.capture_dir().join("Albums_files")).unwrap();
        site
    }

    fn capture_dir(&self) -> PathBuf {
        self.dir.path().join("capture")
    }

    fn assets(&self) -> PathBuf {
        self.dir.path().join("assets")
    }

    fn store(&self) -> CatalogStore {
        CatalogStore::new(self.dir.path().join("albums.json"))
    }

    fn catalog_bytes(&self) -> Vec<u8> {
        fs::read(self.store().path()).unwrap()
    }

    fn asset_count(&self) -> usize {
        fs::read_dir(self.assets()).map(|d| d.count()).unwrap_or(0)
    }

    fn add_cover(&self, name: &str, width: u32, height: u32) {
        RgbImage::from_pixel(width, height, Rgb([20, 120, 220]))
            .save(self.capture_dir().join("Albums_files").join(name))
            .unwrap();
    }

    /// Writes a capture listing `albums` top to bottom (newest first).
    fn write_capture(&self, albums: &[(&str, &str)]) -> PathBuf {
        let entries: String = albums
            .iter()
            .map(|(title, cover)| {
                format!(
                    r#"<a class="MTmRkb" href="https://photosgooglecom/album/{id}">
                         <div class="FLmEnf" style="background-image: url(&quot;Albums_files/{cover}&quot;);"></div>
                         <div class="mfQCMe">{title}</div>
                         <div class="UV4Xae">{n} items</div>
                       </a>"#,
                    id = title.replace(' ', "_"),
                    cover = cover.replace(' ', "%20"),
                    title = title,
                    n = title.len(),
                )
            })
            .collect();
        let path = self.capture_dir().join("Albums.html");
        fs::write(&path, format!("<html><body>{}</body></html>", entries)).unwrap();
        path
    }

    async fn sync(&self, capture: &Path, mode: MergeMode) -> album_sync::Result<SyncReport> {
        let acquired = read_capture(capture, &AlbumSelectors::google_photos().unwrap())?;
        let pipeline = CoverPipeline::new(ImageResolver::new(acquired.base)?, self.assets(), "/assets/album_covers");
        synchronize(&self.store(), &IgnoreList::default(), &pipeline, acquired.batch, mode).await
    }
}

fn titles(catalog: &[Album]) -> Vec<&str> {
    catalog.iter().map(|a| a.title.as_str()).collect()
}

#[tokio::test]
async fn new_albums_are_appended_oldest_first() {
    let site = Site::new();
    site.add_cover("a.png", 400, 300);
    site.add_cover("b.png", 300, 400);
    site.add_cover("c.png", 64, 64);

    let capture = site.write_capture(&[("B", "b.png"), ("A", "a.png")]);
    let report = site.sync(&capture, MergeMode::Identity).await.unwrap();
    assert_eq!((report.found, report.added, report.total), (2, 2, 2));

    let first = site.store().load().unwrap();
    assert_eq!(titles(&first), ["A", "B"]);
    assert_eq!(first[0].album_url, "https://photos.google.com/album/A");
    assert_eq!(first[0].elements, 1);
    assert!(first[0].cover_image_url.starts_with("/assets/album_covers/A_"));

    let capture = site.write_capture(&[("C", "c.png"), ("B", "b.png"), ("A", "a.png")]);
    let report = site.sync(&capture, MergeMode::Identity).await.unwrap();
    assert_eq!((report.added, report.known), (1, 2));

    let second = site.store().load().unwrap();
    assert_eq!(titles(&second), ["A", "B", "C"]);
    assert_eq!(&second[..2], &first[..]);
    assert_eq!(site.asset_count(), 3);
}

#[tokio::test]
async fn unchanged_source_leaves_catalog_byte_identical() {
    let site = Site::new();
    site.add_cover("a b.png", 120, 80);
    let capture = site.write_capture(&[("Road Trip", "a b.png")]);

    site.sync(&capture, MergeMode::Identity).await.unwrap();
    let before = site.catalog_bytes();

    let report = site.sync(&capture, MergeMode::Identity).await.unwrap();
    assert_eq!(report.added, 0);
    assert_eq!(site.catalog_bytes(), before);
    assert_eq!(site.asset_count(), 1);
}

#[tokio::test]
async fn one_broken_cover_does_not_block_the_rest() {
    let site = Site::new();
    site.add_cover("a.png", 50, 50);
    site.add_cover("c.png", 50, 50);
    let capture = site.write_capture(&[("C", "c.png"), ("B", "missing.png"), ("A", "a.png")]);

    let report = site.sync(&capture, MergeMode::Identity).await.unwrap();
    assert_eq!((report.added, report.rejected), (2, 1));
    assert_eq!(titles(&site.store().load().unwrap()), ["A", "C"]);

    // The cover shows up later; the album is picked up on the next sync.
    site.add_cover("missing.png", 50, 50);
    site.sync(&capture, MergeMode::Identity).await.unwrap();
    assert_eq!(titles(&site.store().load().unwrap()), ["A", "C", "B"]);
}

#[tokio::test]
async fn corrupt_catalog_aborts_before_any_write() {
    let site = Site::new();
    site.add_cover("a.png", 50, 50);
    let capture = site.write_capture(&[("A", "a.png")]);
    fs::write(site.store().path(), "[{ not json").unwrap();

    let err = site.sync(&capture, MergeMode::Identity).await.unwrap_err();
    assert!(matches!(err, Error::CorruptState { .. }));
    assert_eq!(site.catalog_bytes(), b"[{ not json");
    assert_eq!(site.asset_count(), 0);
}

#[tokio::test]
async fn positional_mode_appends_the_trailing_entries() {
    let site = Site::new();
    site.add_cover("a.png", 50, 50);
    site.add_cover("b.png", 50, 50);
    let capture = site.write_capture(&[("A", "a.png")]);
    site.sync(&capture, MergeMode::Positional).await.unwrap();

    let capture = site.write_capture(&[("B", "b.png"), ("A", "a.png")]);
    let report = site.sync(&capture, MergeMode::Positional).await.unwrap();
    assert_eq!(report.added, 1);
    assert_eq!(titles(&site.store().load().unwrap()), ["A", "B"]);
}

#[tokio::test]
async fn written_covers_are_square_thumbnails() {
    let site = Site::new();
    site.add_cover("wide.png", 400, 300);
    let capture = site.write_capture(&[("Wide", "wide.png")]);
    site.sync(&capture, MergeMode::Identity).await.unwrap();

    let album = &site.store().load().unwrap()[0];
    let file = album.cover_image_url.rsplit('/').next().unwrap();
    let thumb = image::open(site.assets().join(file)).unwrap();
    assert_eq!((thumb.width(), thumb.height()), (COVER_SIZE, COVER_SIZE));
}

#[tokio::test]
async fn positional_mode_retries_a_failed_cover_next_sync() {
    let site = Site::new();
    site.add_cover("a.png", 50, 50);
    site.add_cover("c.png", 50, 50);
    site.add_cover("d.png", 50, 50);
    let capture = site.write_capture(&[("C", "c.png"), ("B", "b.png"), ("A", "a.png")]);

    let report = site.sync(&capture, MergeMode::Positional).await.unwrap();
    assert_eq!((report.added, report.rejected), (1, 1));
    assert_eq!(titles(&site.store().load().unwrap()), ["A"]);

    site.add_cover("b.png", 50, 50);
    let capture = site.write_capture(&[("D", "d.png"), ("C", "c.png"), ("B", "b.png"), ("A", "a.png")]);
    let report = site.sync(&capture, MergeMode::Positional).await.unwrap();
    assert_eq!(report.added, 3);
    assert_eq!(titles(&site.store().load().unwrap()), ["A", "B", "C", "D"]);
}
