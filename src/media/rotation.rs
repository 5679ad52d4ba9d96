use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;

use crate::db::ChannelStateStore;
use crate::error::{MediaError, Result};
use crate::models::{ChannelField, INITIAL_IMAGE_INDEX};
use crate::species::SpeciesTable;

use super::cache::MediaCache;
use super::types::{
    file_extension, is_valid_extension, DownloadedFile, MediaKind, Variant, MAX_FILE_SIZE,
};

/// Picks the next sendable image for a channel, cycling through the cached list.
#[derive(Clone)]
pub struct SelectionEngine {
    cache: MediaCache,
    store: Arc<dyn ChannelStateStore>,
    species: Arc<SpeciesTable>,
}

impl SelectionEngine {
    pub fn new(
        cache: MediaCache,
        store: Arc<dyn ChannelStateStore>,
        species: Arc<SpeciesTable>,
    ) -> Self {
        Self {
            cache,
            store,
            species,
        }
    }

    /// Select the next valid image for `bird` in `channel_id`.
    ///
    /// Scanning starts one past the channel's stored offset and runs to the
    /// end of the list without wrapping. When nothing in that range is
    /// sendable the offset still moves forward by one, so the next call
    /// starts further along and eventually wraps back to the front.
    pub async fn select_next(
        &self,
        channel_id: &str,
        bird: &str,
        variant: Variant,
    ) -> Result<DownloadedFile> {
        if bird.trim().is_empty() {
            tracing::error!("error - bird is blank");
            return Err(MediaError::BlankSpecies);
        }

        let species = self.species.to_scientific(bird);
        let images = self.cache.get_or_fetch(species, variant).await?;
        if images.is_empty() {
            return Err(MediaError::NoMedia {
                species: species.to_string(),
                kind: MediaKind::Image,
            });
        }

        let prev = self.previous_index(channel_id)?;
        let len = images.len() as i64;
        // reduce before stepping so any stored value is safe
        let start = ((prev.rem_euclid(len) + 1) % len) as usize;
        tracing::debug!(channel_id, prev, start, count = images.len(), "selecting image");

        match first_sendable(&images, start).await? {
            Some(index) => {
                self.store_index(channel_id, index)?;
                tracing::info!("found one! {}", images[index].display());
                Ok(DownloadedFile::new(images[index].clone()))
            }
            None => {
                self.store_index(channel_id, start)?;
                Err(MediaError::NoValidMedia {
                    species: species.to_string(),
                    variant,
                })
            }
        }
    }

    fn previous_index(&self, channel_id: &str) -> Result<i64> {
        let stored = self
            .store
            .get_field(channel_id, ChannelField::PrevImageIndex)?;

        match stored {
            Some(value) => {
                let index = value.trim().parse::<i64>().with_context(|| {
                    format!("invalid image index {:?} for channel {}", value, channel_id)
                })?;
                Ok(index)
            }
            None => Ok(INITIAL_IMAGE_INDEX),
        }
    }

    fn store_index(&self, channel_id: &str, index: usize) -> Result<()> {
        self.store
            .set_field(channel_id, ChannelField::PrevImageIndex, &index.to_string())?;
        Ok(())
    }
}

/// Index of the first sendable image at or after `start`, without wrapping.
async fn first_sendable(images: &[PathBuf], start: usize) -> Result<Option<usize>> {
    for (index, path) in images.iter().enumerate().skip(start) {
        let extension = file_extension(path);
        let size = tokio::fs::metadata(path).await?.len();
        tracing::debug!(extension = %extension, size, "checking {}", path.display());

        if is_valid_extension(&extension) && size <= MAX_FILE_SIZE {
            return Ok(Some(index));
        }
    }
    Ok(None)
}
