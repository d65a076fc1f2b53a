use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::{Error, Result};

const DEFAULT_ALBUMS_JSON_PATH: &str = "albums.json";
const DEFAULT_IGNORE_PATH: &str = "albums_ignored.json";
const DEFAULT_ASSET_DIR: &str = "docs/assets/album_covers";
const DEFAULT_ASSET_MOUNT: &str = "/assets/album_covers";
const DEFAULT_POSTS_DIR: &str = "docs/_posts";
const DEFAULT_ALBUMS_PAGE_URL: &str = "https://photos.google.com/albums";

/// Runtime settings, read from the environment (and `.env`, once loaded by the binary).
#[derive(Debug, Clone)]
pub struct Settings {
    pub catalog_path: PathBuf,
    pub ignore_path: PathBuf,
    pub asset_dir: PathBuf,
    /// Public prefix under which `asset_dir` is served.
    pub asset_mount: String,
    pub posts_dir: PathBuf,
    pub albums_page_url: String,
    pub browser_profile_dir: Option<PathBuf>,
    /// Budget for browser startup.
    pub retry_budget: Duration,
    /// Budget for element queries.
    pub query_budget: Duration,
    /// How long the user gets to finish logging in.
    pub login_timeout: Duration,
    /// Blind wait after each scroll. No load-complete signal exists on the albums page.
    pub scroll_settle: Duration,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            catalog_path: PathBuf::from(DEFAULT_ALBUMS_JSON_PATH),
            ignore_path: PathBuf::from(DEFAULT_IGNORE_PATH),
            asset_dir: PathBuf::from(DEFAULT_ASSET_DIR),
            asset_mount: DEFAULT_ASSET_MOUNT.to_string(),
            posts_dir: PathBuf::from(DEFAULT_POSTS_DIR),
            albums_page_url: DEFAULT_ALBUMS_PAGE_URL.to_string(),
            browser_profile_dir: None,
            retry_budget: Duration::from_secs(10),
            query_budget: Duration::from_secs(30),
            login_timeout: Duration::from_secs(300),
            scroll_settle: Duration::from_secs(10),
        }
    }
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut settings = Settings::default();

        if let Some(v) = lookup("ALBUMS_JSON_PATH") {
            settings.catalog_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("ALBUMS_IGNORE_PATH") {
            settings.ignore_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("ALBUM_ASSET_DIR") {
            settings.asset_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("ALBUM_ASSET_MOUNT") {
            settings.asset_mount = v.trim_end_matches('/').to_string();
        }
        if let Some(v) = lookup("ALBUM_POSTS_DIR") {
            settings.posts_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("ALBUMS_PAGE_URL") {
            settings.albums_page_url = v;
        }
        settings.browser_profile_dir = lookup("BROWSER_PROFILE_DIR")
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from);

        if let Some(v) = lookup("RETRY_BUDGET_SECS") {
            settings.retry_budget = parse_secs("RETRY_BUDGET_SECS", &v)?;
        }
        if let Some(v) = lookup("QUERY_BUDGET_SECS") {
            settings.query_budget = parse_secs("QUERY_BUDGET_SECS", &v)?;
        }
        if let Some(v) = lookup("LOGIN_TIMEOUT_SECS") {
            settings.login_timeout = parse_secs("LOGIN_TIMEOUT_SECS", &v)?;
        }
        if let Some(v) = lookup("SCROLL_SETTLE_SECS") {
            settings.scroll_settle = parse_secs("SCROLL_SETTLE_SECS", &v)?;
        }

        Ok(settings)
    }
}

fn parse_secs(key: &str, value: &str) -> Result<Duration> {
    value
        .trim()
        .parse::<u64>()
        .map(Duration::from_secs)
        .map_err(|_| Error::Usage(format!("{} must be a whole number of seconds, got {:?}", key, value)))
}
