use std::path::{Path, PathBuf};

use crate::error::Result;

use super::download::{Downloader, PARTIAL_EXTENSION};
use super::macaulay::MacaulayClient;
use super::types::{MediaQuery, Variant};

/// On-disk image cache, one directory per (species, variant).
///
/// A directory that exists and has at least one entry is a hit. Nothing is
/// ever evicted.
#[derive(Clone)]
pub struct MediaCache {
    root: PathBuf,
    macaulay: MacaulayClient,
    downloader: Downloader,
}

impl MediaCache {
    pub fn new(root: impl Into<PathBuf>, macaulay: MacaulayClient, downloader: Downloader) -> Self {
        Self {
            root: root.into(),
            macaulay,
            downloader,
        }
    }

    pub fn image_dir(&self, species: &str, variant: Variant) -> PathBuf {
        self.root
            .join("images")
            .join(format!("{}{}", species, variant.suffix()))
    }

    pub fn songs_dir(&self) -> PathBuf {
        self.root.join("songs")
    }

    /// Cached image paths for a species, downloading them on a miss.
    pub async fn get_or_fetch(&self, species: &str, variant: Variant) -> Result<Vec<PathBuf>> {
        let directory = self.image_dir(species, variant);

        // 1. Check the cache directory first
        if let Some(cached) = list_directory(&directory).await? {
            tracing::debug!(directory = %directory.display(), count = cached.len(), "image cache hit");
            return Ok(cached);
        }

        // 2. Fetch from the catalog
        tracing::info!("fetching images for {} ({})", species, variant);
        self.fetch(species, variant).await
    }

    /// Download the full catalog listing for a species into its directory.
    pub async fn fetch(&self, species: &str, variant: Variant) -> Result<Vec<PathBuf>> {
        let directory = self.image_dir(species, variant);
        let urls = self
            .macaulay
            .fetch_urls(species, MediaQuery::photos(variant))
            .await?;

        tokio::fs::create_dir_all(&directory).await?;

        let jobs = urls
            .into_iter()
            .enumerate()
            .map(|(index, url)| (url, directory.join(index.to_string())))
            .collect();
        let files = self.downloader.download_all(jobs).await?;

        tracing::info!("downloaded {} images for {}", files.len(), species);
        Ok(files)
    }
}

/// Entries of `directory` in the order the filesystem returns them, or
/// `None` when the directory is missing or holds no finished downloads.
async fn list_directory(directory: &Path) -> Result<Option<Vec<PathBuf>>> {
    let mut entries = match tokio::fs::read_dir(directory).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };

    let mut paths = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == PARTIAL_EXTENSION) {
            continue;
        }
        paths.push(path);
    }

    if paths.is_empty() {
        Ok(None)
    } else {
        Ok(Some(paths))
    }
}
