use serde::Deserialize;

use crate::error::{MediaError, Result};

use super::types::{MediaKind, MediaQuery, CATALOG_PAGE_SIZE};

/// Labeling mismatches between the species list and the library.
const TAXON_ALIASES: [(&str, &str); 2] = [
    ("Porphyrio martinicus", "Porphyrio martinica"),
    ("Strix acio", "Screech Owl"),
];

/// Only request media rated 3 stars or better.
const QUALITY_FLOOR: &str = "3,4,5";

#[derive(Debug, Deserialize)]
struct TaxonMatch {
    code: String,
}

#[derive(Debug, Deserialize)]
struct CatalogResponse {
    results: CatalogResults,
}

#[derive(Debug, Deserialize)]
struct CatalogResults {
    #[serde(default)]
    content: Vec<CatalogEntry>,
}

#[derive(Debug, Deserialize)]
struct CatalogEntry {
    #[serde(rename = "mediaUrl")]
    media_url: String,
}

/// Client for the Macaulay Library taxon search and media catalog.
#[derive(Clone)]
pub struct MacaulayClient {
    base_url: String,
    client: reqwest::Client,
}

impl MacaulayClient {
    pub fn new(client: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        }
    }

    /// Look up the library's taxon code for a species.
    ///
    /// Fails with [`MediaError::NotFound`] when the search has no matches.
    pub async fn resolve_taxon(&self, species: &str, kind: MediaKind) -> Result<String> {
        let species = corrected_name(species);
        let url = format!(
            "{}/api/v1/find/taxon?q={}",
            self.base_url,
            urlencoding::encode(&normalize_query(species))
        );

        tracing::debug!(species, url = %url, "resolving taxon code");

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|source| MediaError::Transport {
                url: url.clone(),
                source,
            })?;

        if response.status() != reqwest::StatusCode::OK {
            return Err(MediaError::http(
                response.status(),
                &url,
                format!("a {} for {}", kind, species),
            ));
        }

        let matches: Vec<TaxonMatch> = response
            .json()
            .await
            .map_err(|source| MediaError::Decode {
                url: url.clone(),
                source,
            })?;

        matches
            .into_iter()
            .next()
            .map(|m| m.code)
            .ok_or_else(|| MediaError::NotFound {
                species: species.to_string(),
            })
    }

    /// List catalog media urls for a taxon code.
    ///
    /// The list is returned as-is. Some urls may still be processing on the
    /// provider side and fail to download; callers skip those.
    pub async fn list_media(
        &self,
        taxon_code: &str,
        species: &str,
        query: MediaQuery,
    ) -> Result<Vec<String>> {
        let url = format!(
            "{}/catalog.json?searchField=species&taxonCode={}&count={}&mediaType={}&sex={}&age={}&behavior={}&qua={}",
            self.base_url,
            urlencoding::encode(taxon_code),
            CATALOG_PAGE_SIZE,
            query.media_type.as_str(),
            query.sex.as_str(),
            query.age.as_str(),
            query.sound_type.as_str(),
            QUALITY_FLOOR
        );

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|source| MediaError::Transport {
                url: url.clone(),
                source,
            })?;

        if response.status() != reqwest::StatusCode::OK {
            return Err(MediaError::http(
                response.status(),
                &url,
                format!("a {} for {}", query.media_type.kind(), species),
            ));
        }

        let catalog: CatalogResponse = response
            .json()
            .await
            .map_err(|source| MediaError::Decode {
                url: url.clone(),
                source,
            })?;

        Ok(catalog
            .results
            .content
            .into_iter()
            .map(|entry| entry.media_url)
            .collect())
    }

    /// Resolve the taxon code and list matching media in one go.
    pub async fn fetch_urls(&self, species: &str, query: MediaQuery) -> Result<Vec<String>> {
        tracing::info!("getting {} urls for {}", query.media_type.kind(), species);
        let taxon_code = self
            .resolve_taxon(species, query.media_type.kind())
            .await?;
        self.list_media(&taxon_code, species, query).await
    }
}

fn corrected_name(species: &str) -> &str {
    TAXON_ALIASES
        .iter()
        .find(|(listed, _)| *listed == species)
        .map(|(_, corrected)| *corrected)
        .unwrap_or(species)
}

fn normalize_query(species: &str) -> String {
    species.replace('-', " ").replace("'s", "")
}
