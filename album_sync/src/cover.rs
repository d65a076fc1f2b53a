//! Cover image normalization: resolve a reference to pixels, center-crop to a
//! square, resize to a fixed canvas and write a JPEG under the asset directory.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::{DynamicImage, RgbImage};
use reqwest::Client;
use tracing::{debug, info};
use url::Url;
use uuid::Uuid;

use crate::{Error, Result};

/// Side of the square thumbnail, in pixels.
pub const COVER_SIZE: u32 = 202;
pub const JPEG_QUALITY: u8 = 95;

/// Characters dropped from titles before they become file names.
const UNSAFE_FILENAME_CHARS: &[char] = &[' ', '\'', ':', '/', '\\'];

/// Produces a normalized local cover for an album and returns its public path.
#[async_trait]
pub trait CoverNormalizer {
    async fn cover_for(&self, title: &str, image_ref: &str) -> Result<String>;
}

/// Centered square crop region of a `width` x `height` image.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropBox {
    pub left: u32,
    pub top: u32,
    pub size: u32,
}

impl CropBox {
    pub fn centered(width: u32, height: u32) -> Self {
        let size = width.min(height);
        Self {
            left: (width - size) / 2,
            top: (height - size) / 2,
            size,
        }
    }

    pub fn right(&self) -> u32 {
        self.left + self.size
    }

    pub fn bottom(&self) -> u32 {
        self.top + self.size
    }
}

/// Crop to the centered square, then resample onto the fixed canvas.
pub fn square_thumbnail(img: &DynamicImage) -> RgbImage {
    let crop = CropBox::centered(img.width(), img.height());
    img.crop_imm(crop.left, crop.top, crop.size, crop.size)
        .resize_exact(COVER_SIZE, COVER_SIZE, FilterType::Lanczos3)
        .to_rgb8()
}

pub fn encode_jpeg(img: &RgbImage) -> image::ImageResult<Vec<u8>> {
    let mut buf = Vec::new();
    JpegEncoder::new_with_quality(&mut buf, JPEG_QUALITY).encode_image(img)?;
    Ok(buf)
}

pub fn sanitize_title(title: &str) -> String {
    title.chars().filter(|c| !UNSAFE_FILENAME_CHARS.contains(c)).collect()
}

/// `<sanitized title>_<uuid>.jpg`; the token keeps repeated titles and repeated syncs apart.
pub fn cover_file_name(title: &str) -> String {
    format!("{}_{}.jpg", sanitize_title(title), Uuid::new_v4())
}

/// Where relative image references are resolved from.
#[derive(Debug, Clone)]
pub enum BaseLocation {
    /// Directory holding a saved page capture.
    Directory(PathBuf),
    /// Address of a live page.
    Url(Url),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Resolved {
    Remote(Url),
    Local(PathBuf),
}

pub struct ImageResolver {
    client: Client,
    base: BaseLocation,
}

impl ImageResolver {
    pub fn new(base: BaseLocation) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| Error::Usage(format!("cannot build HTTP client: {}", e)))?;
        Ok(Self { client, base })
    }

    fn resolve(&self, image_ref: &str) -> Result<Resolved> {
        let absolute = match Url::parse(image_ref) {
            Ok(url) => url,
            Err(url::ParseError::RelativeUrlWithoutBase) => match &self.base {
                BaseLocation::Directory(dir) => return Ok(Resolved::Local(dir.join(image_ref))),
                BaseLocation::Url(base) => base.join(image_ref).map_err(|e| Error::image(image_ref, e))?,
            },
            Err(e) => return Err(Error::image(image_ref, e)),
        };

        match absolute.scheme() {
            "http" | "https" => Ok(Resolved::Remote(absolute)),
            "file" => absolute
                .to_file_path()
                .map(Resolved::Local)
                .map_err(|_| Error::image(image_ref, "not a local file path")),
            other => Err(Error::image(image_ref, format!("unsupported scheme {}", other))),
        }
    }

    /// Raw bytes behind `image_ref`. No retries: an unreachable cover fails its album.
    pub async fn fetch(&self, image_ref: &str) -> Result<Vec<u8>> {
        match self.resolve(image_ref)? {
            Resolved::Remote(url) => {
                debug!("Fetching cover {}", url);
                let res = self
                    .client
                    .get(url)
                    .send()
                    .await
                    .and_then(|r| r.error_for_status())
                    .map_err(|e| Error::image(image_ref, e))?;
                let bytes = res.bytes().await.map_err(|e| Error::image(image_ref, e))?;
                Ok(bytes.to_vec())
            }
            Resolved::Local(path) => {
                debug!("Reading cover {}", path.display());
                tokio::fs::read(&path)
                    .await
                    .map_err(|e| Error::image(image_ref, format!("{}: {}", path.display(), e)))
            }
        }
    }
}

/// The production [`CoverNormalizer`]: fetch, crop, resize, encode, write.
pub struct CoverPipeline {
    resolver: ImageResolver,
    asset_dir: PathBuf,
    asset_mount: String,
}

impl CoverPipeline {
    pub fn new(resolver: ImageResolver, asset_dir: impl Into<PathBuf>, asset_mount: &str) -> Self {
        Self {
            resolver,
            asset_dir: asset_dir.into(),
            asset_mount: asset_mount.trim_end_matches('/').to_string(),
        }
    }

    pub async fn normalize(&self, image_ref: &str, output_path: &Path) -> Result<()> {
        let bytes = self.resolver.fetch(image_ref).await?;
        let img = image::load_from_memory(&bytes).map_err(|e| Error::image(image_ref, e))?;
        debug!("Decoded {} ({}x{})", image_ref, img.width(), img.height());

        let jpeg = encode_jpeg(&square_thumbnail(&img)).map_err(|e| Error::image(image_ref, e))?;
        tokio::fs::write(output_path, jpeg).await?;
        Ok(())
    }
}

#[async_trait]
impl CoverNormalizer for CoverPipeline {
    async fn cover_for(&self, title: &str, image_ref: &str) -> Result<String> {
        tokio::fs::create_dir_all(&self.asset_dir).await?;
        let file_name = cover_file_name(title);
        let output = self.asset_dir.join(&file_name);

        self.normalize(image_ref, &output).await?;
        info!("Wrote cover for {:?} to {}", title, output.display());
        Ok(format!("{}/{}", self.asset_mount, file_name))
    }
}
