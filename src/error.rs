use std::path::PathBuf;

use crate::media::{MediaKind, Variant};

/// Errors surfaced by the media pipeline.
///
/// The `Display` output is the human-readable reason shown to chat users.
#[derive(Debug, thiserror::Error)]
pub enum MediaError {
    #[error("An http error code of {status} occurred while fetching {url} for {context}")]
    ProviderHttp {
        status: u16,
        url: String,
        context: String,
    },

    #[error("No taxon code found for {species}")]
    NotFound { species: String },

    #[error("No Valid Images Found for {species} ({variant})")]
    NoValidMedia { species: String, variant: Variant },

    #[error("No {kind}s found for {species}")]
    NoMedia { species: String, kind: MediaKind },

    #[error("File too large ({size} bytes): {}", path.display())]
    FileTooLarge { path: PathBuf, size: u64 },

    #[error("Transport error while fetching {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Malformed response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("Bird name is blank")]
    BlankSpecies,

    #[error("Could not strip tags from {}: {source}", path.display())]
    Scrub {
        path: PathBuf,
        #[source]
        source: lofty::error::LoftyError,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Channel state error: {0}")]
    State(#[from] anyhow::Error),

    #[error("Download task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl MediaError {
    /// Build a provider error for a non-success response.
    pub(crate) fn http(status: reqwest::StatusCode, url: &str, context: String) -> Self {
        MediaError::ProviderHttp {
            status: status.as_u16(),
            url: url.to_string(),
            context,
        }
    }
}

pub type Result<T> = std::result::Result<T, MediaError>;
