// Test utilities for cache fixtures and mocked providers
use std::path::Path;

use mockito::{Matcher, Mock, Server};
use tempfile::NamedTempFile;

use crate::config::Config;
use crate::db::{create_pool, init_database, SqliteChannelStore};
use crate::media::{Downloader, MacaulayClient, MediaCache};

/// Cache rooted at `root` whose provider calls go to `base_url`
pub fn test_cache(root: impl AsRef<Path>, base_url: &str) -> MediaCache {
    let client = reqwest::Client::new();
    MediaCache::new(
        root.as_ref(),
        MacaulayClient::new(client.clone(), base_url),
        Downloader::new(client, 8),
    )
}

/// Channel store over a fresh temporary database. Keep the file alive for the test.
pub fn test_store() -> (SqliteChannelStore, NamedTempFile) {
    let temp_file = NamedTempFile::new().unwrap();
    let pool = create_pool(temp_file.path().to_str().unwrap()).unwrap();
    init_database(&pool).unwrap();
    (SqliteChannelStore::new(pool), temp_file)
}

/// Config pointing every provider at a mock server
pub fn test_config(cache_dir: &Path, base_url: &str) -> Config {
    Config {
        cache_dir: cache_dir.to_path_buf(),
        macaulay_base_url: base_url.to_string(),
        xeno_canto_base_url: base_url.to_string(),
        precache_concurrency: 4,
        max_connections: 8,
        ..Config::default()
    }
}

/// Write a file of `size` bytes, creating parent directories
pub fn write_file(path: &Path, size: u64) {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, vec![0u8; size as usize]).unwrap();
}

/// Taxon search answering `code` for `species`, expected exactly once
pub async fn mock_taxon(server: &mut Server, species: &str, code: &str) -> Mock {
    server
        .mock("GET", "/api/v1/find/taxon")
        .match_query(Matcher::UrlEncoded("q".into(), species.into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(format!(r#"[{{"code": "{}"}}]"#, code))
        .expect(1)
        .create_async()
        .await
}

/// Catalog listing for `code` returning `urls`, expected exactly once
pub async fn mock_catalog(server: &mut Server, code: &str, urls: &[&str]) -> Mock {
    let content: Vec<_> = urls
        .iter()
        .map(|url| serde_json::json!({ "mediaUrl": url }))
        .collect();
    let body = serde_json::json!({ "results": { "content": content } });

    server
        .mock("GET", "/catalog.json")
        .match_query(Matcher::UrlEncoded("taxonCode".into(), code.into()))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(body.to_string())
        .expect(1)
        .create_async()
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_file_size() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nested").join("0.jpg");
        write_file(&path, 42);
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 42);
    }

    #[test]
    fn test_store_starts_empty() {
        let (store, _temp_file) = test_store();
        assert!(store.get_state("any").unwrap().is_none());
    }

    #[tokio::test]
    async fn test_mock_catalog_body() {
        let mut server = Server::new_async().await;
        let mock = mock_catalog(&mut server, "amerob", &["https://cdn.example.org/1"]).await;

        let body = reqwest::get(format!(
            "{}/catalog.json?taxonCode=amerob&count=20",
            server.url()
        ))
        .await
        .unwrap()
        .text()
        .await
        .unwrap();

        assert!(body.contains("https://cdn.example.org/1"));
        mock.assert_async().await;
    }
}
