mod cache;
mod download;
mod macaulay;
mod rotation;
mod songs;
mod types;

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use futures::stream::{self, StreamExt};

use crate::config::Config;
use crate::db::ChannelStateStore;
use crate::error::Result;
use crate::species::SpeciesTable;

pub use cache::MediaCache;
pub use download::{extension_for_content_type, Downloader};
pub use macaulay::MacaulayClient;
pub use rotation::SelectionEngine;
pub use songs::{strip_tags, SongFetcher, TagScrubber};
pub use types::{
    Age, DownloadedFile, MediaKind, MediaQuery, MediaType, Sex, SoundType, Variant,
    CATALOG_PAGE_SIZE, MAX_FILE_SIZE, VALID_EXTENSIONS,
};

/// Build the shared connection pool for provider requests.
pub fn build_http_client(config: &Config, timeout: Duration) -> anyhow::Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(concat!("birdmedia/", env!("CARGO_PKG_VERSION")))
        .timeout(timeout)
        .pool_max_idle_per_host(config.max_connections)
        .build()
        .context("building http client")?;
    Ok(client)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PrecacheReport {
    pub cached: usize,
    pub failed: usize,
}

/// Entry point for the bot: images with per-channel rotation, and songs.
pub struct MediaService {
    cache: MediaCache,
    selection: SelectionEngine,
    songs: SongFetcher,
    precache_concurrency: usize,
}

impl MediaService {
    pub fn new(
        config: &Config,
        client: reqwest::Client,
        store: Arc<dyn ChannelStateStore>,
        birds: Arc<SpeciesTable>,
        song_birds: Arc<SpeciesTable>,
    ) -> Self {
        let cache = MediaCache::new(
            &config.cache_dir,
            MacaulayClient::new(client.clone(), &config.macaulay_base_url),
            Downloader::new(client.clone(), config.max_connections),
        );
        let songs = SongFetcher::new(
            client,
            &config.xeno_canto_base_url,
            cache.songs_dir(),
            song_birds,
        );

        Self {
            selection: SelectionEngine::new(cache.clone(), store, birds),
            cache,
            songs,
            precache_concurrency: config.precache_concurrency.max(1),
        }
    }

    /// Next image of `bird` for the channel.
    pub async fn get_image(
        &self,
        channel_id: &str,
        bird: &str,
        variant: Variant,
    ) -> Result<DownloadedFile> {
        self.selection.select_next(channel_id, bird, variant).await
    }

    /// A freshly downloaded, tag-stripped recording of `bird`.
    pub async fn fetch_song(&self, channel_id: &str, bird: &str) -> Result<DownloadedFile> {
        self.songs.fetch_song(channel_id, bird).await
    }

    /// Warm the image cache for every species in every variant.
    ///
    /// Species that are already cached are left alone. Failures are logged and
    /// counted without stopping the rest of the run.
    pub async fn precache_images(&self, species: &SpeciesTable) -> PrecacheReport {
        let mut report = PrecacheReport::default();

        for variant in Variant::ALL {
            let results: Vec<_> = stream::iter(species.scientific_names())
                .map(|name| async move {
                    let result = self.cache.get_or_fetch(name, variant).await;
                    (name, result)
                })
                .buffer_unordered(self.precache_concurrency)
                .collect()
                .await;

            for (name, result) in results {
                match result {
                    Ok(_) => report.cached += 1,
                    Err(e) => {
                        tracing::error!("Failed to cache {} ({}): {}", name, variant, e);
                        report.failed += 1;
                    }
                }
            }
        }

        tracing::info!(
            "Images Cached: {} ok, {} failed",
            report.cached,
            report.failed
        );
        report
    }
}
