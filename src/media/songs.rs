use std::path::{Path, PathBuf};
use std::sync::Arc;

use lofty::prelude::*;
use rand::Rng;
use serde::Deserialize;

use crate::error::{MediaError, Result};
use crate::species::SpeciesTable;

use super::download::stream_to_file;
use super::types::{DownloadedFile, MediaKind, MAX_FILE_SIZE};

/// Strips identifying metadata from a downloaded recording.
pub type TagScrubber = fn(&Path) -> Result<()>;

#[derive(Debug, Deserialize)]
struct RecordingsResponse {
    #[serde(default)]
    recordings: Vec<Recording>,
}

#[derive(Debug, Deserialize)]
struct Recording {
    file: String,
}

/// Fetches a random high quality recording from xeno-canto.
///
/// Songs are not cached between calls.
#[derive(Clone)]
pub struct SongFetcher {
    client: reqwest::Client,
    base_url: String,
    songs_dir: PathBuf,
    species: Arc<SpeciesTable>,
    scrubber: TagScrubber,
}

impl SongFetcher {
    pub fn new(
        client: reqwest::Client,
        base_url: impl Into<String>,
        songs_dir: impl Into<PathBuf>,
        species: Arc<SpeciesTable>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            songs_dir: songs_dir.into(),
            species,
            scrubber: strip_tags,
        }
    }

    pub fn with_scrubber(mut self, scrubber: TagScrubber) -> Self {
        self.scrubber = scrubber;
        self
    }

    pub async fn fetch_song(&self, channel_id: &str, bird: &str) -> Result<DownloadedFile> {
        if bird.trim().is_empty() {
            tracing::error!("error - bird is blank");
            return Err(MediaError::BlankSpecies);
        }

        let (scientific, common) = self.names_for(bird);
        tracing::info!(channel_id, "fetching song for {}", scientific);

        let mut recordings = self.search(scientific).await?;
        tracing::info!("found {} recordings for {}", recordings.len(), scientific);

        if recordings.is_empty() && common != scientific {
            // try with common name instead
            recordings = self.search(common).await?;
        }

        if recordings.is_empty() {
            return Err(MediaError::NoMedia {
                species: scientific.to_string(),
                kind: MediaKind::Song,
            });
        }

        let choice = rand::rng().random_range(0..recordings.len());
        let url = self.recording_url(&recordings[choice].file);
        tracing::info!("url: {}", url);

        let path = self
            .songs_dir
            .join(format!("{}.mp3", recording_id(&url)));
        self.download(&url, &path, scientific).await?;

        // remove spoilers in tag metadata
        (self.scrubber)(&path)?;

        let size = tokio::fs::metadata(&path).await?.len();
        if size > MAX_FILE_SIZE {
            return Err(MediaError::FileTooLarge { path, size });
        }

        Ok(DownloadedFile {
            path,
            extension: "mp3".to_string(),
        })
    }

    /// (scientific, common) names for a bird given either form.
    fn names_for<'a>(&'a self, bird: &'a str) -> (&'a str, &'a str) {
        if let Some(scientific) = self.species.scientific_for(bird) {
            (scientific, bird)
        } else if let Some(common) = self.species.common_for(bird) {
            (bird, common)
        } else {
            (bird, bird)
        }
    }

    async fn search(&self, name: &str) -> Result<Vec<Recording>> {
        let url = format!(
            "{}/api/2/recordings?query={}%20q:A&page=1",
            self.base_url,
            urlencoding::encode(name)
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
            tracing::error!("error: {}", response.status());
            return Err(MediaError::http(
                response.status(),
                &url,
                format!("a song for {}", name),
            ));
        }

        let data: RecordingsResponse = response
            .json()
            .await
            .map_err(|source| MediaError::Decode {
                url: url.clone(),
                source,
            })?;

        Ok(data.recordings)
    }

    async fn download(&self, url: &str, path: &Path, species: &str) -> Result<()> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|source| MediaError::Transport {
                url: url.to_string(),
                source,
            })?;

        if response.status() != reqwest::StatusCode::OK {
            tracing::error!("error: {}", response.status());
            return Err(MediaError::http(
                response.status(),
                url,
                format!("a song for {}", species),
            ));
        }

        stream_to_file(response, url, path).await
    }

    /// Recording file links are protocol-relative (`//host/id/download`).
    fn recording_url(&self, file: &str) -> String {
        if file.starts_with("//") {
            let scheme = self.base_url.split("://").next().unwrap_or("https");
            format!("{}:{}", scheme, file)
        } else {
            file.to_string()
        }
    }
}

/// First path segment of a recording url, used as the cached file name.
fn recording_id(url: &str) -> &str {
    url.split('/')
        .nth(3)
        .filter(|segment| !segment.is_empty())
        .unwrap_or("recording")
}

/// Remove every tag lofty can find in the file.
pub fn strip_tags(path: &Path) -> Result<()> {
    let scrub_error = |source| MediaError::Scrub {
        path: path.to_path_buf(),
        source,
    };

    let tagged = lofty::read_from_path(path).map_err(scrub_error)?;
    for tag in tagged.tags() {
        tag.remove_from_path(path).map_err(scrub_error)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lofty::config::WriteOptions;
    use lofty::tag::{Tag, TagType};
    use mockito::Matcher;
    use tempfile::TempDir;

    fn no_scrub(_: &Path) -> Result<()> {
        Ok(())
    }

    fn species() -> Arc<SpeciesTable> {
        Arc::new(SpeciesTable::from_pairs([(
            "American Robin",
            "Turdus migratorius",
        )]))
    }

    fn fetcher(server: &mockito::Server, dir: &TempDir) -> SongFetcher {
        SongFetcher::new(
            reqwest::Client::new(),
            server.url(),
            dir.path().join("songs"),
            species(),
        )
        .with_scrubber(no_scrub)
    }

    async fn mock_search(
        server: &mut mockito::Server,
        query: &str,
        body: String,
    ) -> mockito::Mock {
        server
            .mock("GET", "/api/2/recordings")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("query".into(), query.into()),
                Matcher::UrlEncoded("page".into(), "1".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body)
            .create_async()
            .await
    }

    #[test]
    fn test_recording_id() {
        assert_eq!(
            recording_id("https://www.xeno-canto.org/123456/download"),
            "123456"
        );
        assert_eq!(recording_id("https://www.xeno-canto.org"), "recording");
    }

    #[tokio::test]
    async fn test_falls_back_to_common_name() {
        let mut server = mockito::Server::new_async().await;
        let scientific = mock_search(
            &mut server,
            "Turdus migratorius q:A",
            r#"{"numRecordings": "0", "recordings": []}"#.to_string(),
        )
        .await;
        let common = mock_search(
            &mut server,
            "American Robin q:A",
            r#"{"numRecordings": "0", "recordings": []}"#.to_string(),
        )
        .await;

        let dir = TempDir::new().unwrap();
        let err = fetcher(&server, &dir)
            .fetch_song("chan", "Turdus migratorius")
            .await
            .unwrap_err();

        assert!(matches!(err, MediaError::NoMedia { kind: MediaKind::Song, .. }));
        scientific.assert_async().await;
        common.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetches_random_recording() {
        let mut server = mockito::Server::new_async().await;
        let file = format!("//{}/123456/download", server.host_with_port());
        let _search = mock_search(
            &mut server,
            "Turdus migratorius q:A",
            format!(r#"{{"recordings": [{{"file": "{}"}}]}}"#, file),
        )
        .await;
        let download = server
            .mock("GET", "/123456/download")
            .with_status(200)
            .with_header("content-type", "audio/mpeg")
            .with_body("song bytes")
            .create_async()
            .await;

        let dir = TempDir::new().unwrap();
        let song = fetcher(&server, &dir)
            .fetch_song("chan", "American Robin")
            .await
            .unwrap();

        assert_eq!(song.path, dir.path().join("songs").join("123456.mp3"));
        assert_eq!(song.extension, "mp3");
        assert_eq!(std::fs::read_to_string(&song.path).unwrap(), "song bytes");
        download.assert_async().await;
    }

    #[tokio::test]
    async fn test_common_name_result_is_used() {
        let mut server = mockito::Server::new_async().await;
        let file = format!("//{}/777/download", server.host_with_port());
        let _scientific = mock_search(
            &mut server,
            "Turdus migratorius q:A",
            r#"{"recordings": []}"#.to_string(),
        )
        .await;
        let _common = mock_search(
            &mut server,
            "American Robin q:A",
            format!(r#"{{"recordings": [{{"file": "{}"}}]}}"#, file),
        )
        .await;
        let _download = server
            .mock("GET", "/777/download")
            .with_status(200)
            .with_body("song")
            .create_async()
            .await;

        let dir = TempDir::new().unwrap();
        let song = fetcher(&server, &dir)
            .fetch_song("chan", "American Robin")
            .await
            .unwrap();

        assert_eq!(song.path, dir.path().join("songs").join("777.mp3"));
    }

    #[tokio::test]
    async fn test_search_error_is_reported() {
        let mut server = mockito::Server::new_async().await;
        let _search = server
            .mock("GET", "/api/2/recordings")
            .match_query(Matcher::Any)
            .with_status(502)
            .create_async()
            .await;

        let dir = TempDir::new().unwrap();
        let err = fetcher(&server, &dir)
            .fetch_song("chan", "American Robin")
            .await
            .unwrap_err();

        match err {
            MediaError::ProviderHttp { status, .. } => assert_eq!(status, 502),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_download_error_is_reported() {
        let mut server = mockito::Server::new_async().await;
        let file = format!("//{}/404404/download", server.host_with_port());
        let _search = mock_search(
            &mut server,
            "Turdus migratorius q:A",
            format!(r#"{{"recordings": [{{"file": "{}"}}]}}"#, file),
        )
        .await;
        let _download = server
            .mock("GET", "/404404/download")
            .with_status(404)
            .create_async()
            .await;

        let dir = TempDir::new().unwrap();
        let err = fetcher(&server, &dir)
            .fetch_song("chan", "Turdus migratorius")
            .await
            .unwrap_err();

        match err {
            MediaError::ProviderHttp { status, context, .. } => {
                assert_eq!(status, 404);
                assert_eq!(context, "a song for Turdus migratorius");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_oversized_song_is_rejected() {
        let mut server = mockito::Server::new_async().await;
        let file = format!("//{}/999/download", server.host_with_port());
        let _search = mock_search(
            &mut server,
            "Turdus migratorius q:A",
            format!(r#"{{"recordings": [{{"file": "{}"}}]}}"#, file),
        )
        .await;
        let _download = server
            .mock("GET", "/999/download")
            .with_status(200)
            .with_body(vec![0u8; (MAX_FILE_SIZE + 1) as usize])
            .create_async()
            .await;

        let dir = TempDir::new().unwrap();
        let err = fetcher(&server, &dir)
            .fetch_song("chan", "Turdus migratorius")
            .await
            .unwrap_err();

        match err {
            MediaError::FileTooLarge { size, .. } => assert_eq!(size, MAX_FILE_SIZE + 1),
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_blank_bird_is_rejected() {
        let server = mockito::Server::new_async().await;
        let dir = TempDir::new().unwrap();
        let err = fetcher(&server, &dir).fetch_song("chan", "").await.unwrap_err();
        assert!(matches!(err, MediaError::BlankSpecies));
    }

    /// Twenty silent MPEG-1 layer III frames with an ID3v2 tag naming the bird.
    fn write_tagged_mp3(path: &Path) {
        // 128 kbps, 44.1 kHz, no padding: 417 bytes per frame
        let mut frame = vec![0u8; 417];
        frame[..4].copy_from_slice(&[0xFF, 0xFB, 0x90, 0x64]);
        std::fs::write(path, frame.repeat(20)).unwrap();

        let mut tag = Tag::new(TagType::Id3v2);
        tag.set_title("American Robin".to_string());
        tag.set_artist("Turdus migratorius".to_string());
        tag.save_to_path(path, WriteOptions::default()).unwrap();
    }

    #[test]
    fn test_strip_tags_removes_id3() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("song.mp3");
        write_tagged_mp3(&path);
        assert!(!lofty::read_from_path(&path).unwrap().tags().is_empty());

        strip_tags(&path).unwrap();

        let tagged = lofty::read_from_path(&path).unwrap();
        assert!(tagged.tags().is_empty());
    }

    #[tokio::test]
    async fn test_fetched_song_has_no_tags() {
        let fixture_dir = TempDir::new().unwrap();
        let fixture = fixture_dir.path().join("fixture.mp3");
        write_tagged_mp3(&fixture);

        let mut server = mockito::Server::new_async().await;
        let file = format!("//{}/555/download", server.host_with_port());
        let _search = mock_search(
            &mut server,
            "Turdus migratorius q:A",
            format!(r#"{{"recordings": [{{"file": "{}"}}]}}"#, file),
        )
        .await;
        let _download = server
            .mock("GET", "/555/download")
            .with_status(200)
            .with_header("content-type", "audio/mpeg")
            .with_body(std::fs::read(&fixture).unwrap())
            .create_async()
            .await;

        let dir = TempDir::new().unwrap();
        let fetcher = SongFetcher::new(
            reqwest::Client::new(),
            server.url(),
            dir.path().join("songs"),
            species(),
        );
        let song = fetcher
            .fetch_song("chan", "American Robin")
            .await
            .unwrap();

        let tagged = lofty::read_from_path(&song.path).unwrap();
        assert!(tagged.tags().is_empty());
    }

    #[test]
    fn test_strip_tags_missing_file() {
        let err = strip_tags(Path::new("/nonexistent/song.mp3")).unwrap_err();
        assert!(matches!(err, MediaError::Scrub { .. }));
    }
}
