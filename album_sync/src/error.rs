use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// A browser or network call kept failing until its retry budget ran out.
    #[error("{what} failed after retrying: {message}")]
    TransientAcquisition { what: String, message: String },

    /// An album node is missing a required part. The node is skipped.
    #[error("malformed album entry: {reason}")]
    MalformedCandidate { reason: String },

    /// A cover image could not be fetched, decoded or written. The album is not merged.
    #[error("cover image {image_ref} could not be normalized: {reason}")]
    ImageResolution { image_ref: String, reason: String },

    /// Persisted state that does not parse. Nothing is written afterwards.
    #[error("{} is corrupt: {source}", .path.display())]
    CorruptState {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("usage error: {0}")]
    Usage(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl Error {
    pub fn malformed(reason: impl Into<String>) -> Self {
        Error::MalformedCandidate { reason: reason.into() }
    }

    pub fn image(image_ref: &str, reason: impl ToString) -> Self {
        Error::ImageResolution {
            image_ref: image_ref.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn transient(what: &str, err: impl ToString) -> Self {
        Error::TransientAcquisition {
            what: what.to_string(),
            message: err.to_string(),
        }
    }

    /// Per-candidate failures are logged and skipped; everything else stops the sync.
    pub fn is_per_candidate(&self) -> bool {
        matches!(self, Error::MalformedCandidate { .. } | Error::ImageResolution { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
