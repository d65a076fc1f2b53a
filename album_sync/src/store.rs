use std::collections::HashSet;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use tracing::{debug, info};

use crate::utils::{replace_file, to_pretty_json};
use crate::{Album, AlbumIdentity, Error, Result};

/// The ordered album list, as persisted.
pub type Catalog = Vec<Album>;

/// JSON file holding the catalog. `save` is the only write path and always writes the whole list.
#[derive(Debug, Clone)]
pub struct CatalogStore {
    path: PathBuf,
}

impl CatalogStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// A missing file is an empty catalog; a file that does not parse is `CorruptState`.
    pub fn load(&self) -> Result<Catalog> {
        let catalog: Catalog = read_json_or_default(&self.path)?;
        debug!("Loaded {} albums from {}", catalog.len(), self.path.display());
        Ok(catalog)
    }

    pub fn save(&self, catalog: &[Album]) -> Result<()> {
        let payload = to_pretty_json(catalog).map_err(std::io::Error::from)?;
        replace_file(&self.path, &payload)?;
        info!("Writing {} albums to {}", catalog.len(), self.path.display());
        Ok(())
    }
}

/// Identities a human has curated out of the catalog. Never appended by a sync.
#[derive(Debug, Clone, Default)]
pub struct IgnoreList {
    identities: HashSet<AlbumIdentity>,
}

impl IgnoreList {
    pub fn load(path: &Path) -> Result<Self> {
        let entries: Vec<AlbumIdentity> = read_json_or_default(path)?;
        if !entries.is_empty() {
            info!("Ignoring {} curated albums from {}", entries.len(), path.display());
        }
        Ok(entries.into_iter().collect())
    }

    pub fn contains(&self, identity: &AlbumIdentity) -> bool {
        self.identities.contains(identity)
    }

    pub fn len(&self) -> usize {
        self.identities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.identities.is_empty()
    }
}

impl FromIterator<AlbumIdentity> for IgnoreList {
    fn from_iter<I: IntoIterator<Item = AlbumIdentity>>(iter: I) -> Self {
        Self {
            identities: iter.into_iter().collect(),
        }
    }
}

fn read_json_or_default<T: DeserializeOwned + Default>(path: &Path) -> Result<T> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(T::default()),
        Err(e) => return Err(e.into()),
    };
    serde_json::from_str(&raw).map_err(|source| Error::CorruptState {
        path: path.to_path_buf(),
        source,
    })
}
