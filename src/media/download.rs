use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::error::{MediaError, Result};

use super::types::VALID_EXTENSIONS;

/// Write buffer size used while streaming a response to disk.
const CHUNK_SIZE: usize = 8 * 1024;

/// Known extensions per content type, most common first.
const CONTENT_TYPE_EXTENSIONS: &[(&str, &[&str])] = &[
    ("image/jpeg", &["jpg", "jpe", "jpeg"]),
    ("image/pjpeg", &["jpg", "jpeg"]),
    ("image/png", &["png"]),
    ("image/gif", &["gif"]),
    ("image/webp", &["webp"]),
    ("image/tiff", &["tiff", "tif"]),
    ("image/bmp", &["bmp"]),
    ("image/svg+xml", &["svg"]),
    ("audio/mpeg", &["mp3", "mp2"]),
    ("audio/mp3", &["mp3"]),
    ("audio/wav", &["wav"]),
    ("audio/x-wav", &["wav"]),
    ("audio/ogg", &["ogg"]),
    ("audio/flac", &["flac"]),
    ("video/mp4", &["mp4"]),
    ("text/html", &["html", "htm"]),
    ("text/plain", &["txt"]),
    ("application/json", &["json"]),
    ("application/octet-stream", &["bin"]),
];

fn guess_extensions(mime: &str) -> &'static [&'static str] {
    CONTENT_TYPE_EXTENSIONS
        .iter()
        .find(|(known, _)| *known == mime)
        .map(|(_, exts)| *exts)
        .unwrap_or(&[])
}

/// Pick a file extension for a `content-type` header value.
///
/// Image types are narrowed to the sendable extensions when possible so a
/// jpeg always lands on disk as `jpg`. Anything unknown becomes `bin`.
pub fn extension_for_content_type(content_type: &str) -> &'static str {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_lowercase();
    let guessed = guess_extensions(&mime);

    if mime.split('/').next() == Some("image") {
        if let Some(ext) = VALID_EXTENSIONS.iter().find(|ext| guessed.contains(*ext)) {
            return *ext;
        }
    }

    guessed.first().copied().unwrap_or("bin")
}

/// Fetches batches of media urls onto local disk.
///
/// Clones share one pool of connection permits, so concurrent batches
/// together never hold more than `max_connections` requests open.
#[derive(Clone)]
pub struct Downloader {
    client: reqwest::Client,
    permits: Arc<Semaphore>,
}

impl Downloader {
    pub fn new(client: reqwest::Client, max_connections: usize) -> Self {
        Self {
            client,
            permits: Arc::new(Semaphore::new(max_connections.max(1))),
        }
    }

    /// Download every `(url, path_prefix)` pair concurrently.
    ///
    /// Each file is written to `{path_prefix}.{ext}`. The returned paths keep
    /// the input order. Urls that answer with an error status (media still
    /// processing on the provider side) are skipped. A transport failure on
    /// any url cancels the remaining downloads and fails the batch; their
    /// partial files are removed before this returns.
    pub async fn download_all(&self, jobs: Vec<(String, PathBuf)>) -> Result<Vec<PathBuf>> {
        let total = jobs.len();
        let mut tasks = JoinSet::new();

        for (index, (url, prefix)) in jobs.into_iter().enumerate() {
            let client = self.client.clone();
            let permits = self.permits.clone();
            tasks.spawn(async move {
                let result = match permits.acquire_owned().await {
                    Ok(_permit) => download_one(&client, &url, &prefix).await,
                    Err(e) => Err(MediaError::State(e.into())),
                };
                (index, result)
            });
        }

        let mut slots: Vec<Option<PathBuf>> = vec![None; total];
        while let Some(joined) = tasks.join_next().await {
            let failure = match joined {
                Ok((index, Ok(path))) => {
                    slots[index] = path;
                    continue;
                }
                Ok((_, Err(e))) => e,
                Err(e) => e.into(),
            };

            tasks.abort_all();
            // wait for cancelled downloads so their partial files are gone
            while tasks.join_next().await.is_some() {}
            return Err(failure);
        }

        Ok(slots.into_iter().flatten().collect())
    }
}

async fn download_one(
    client: &reqwest::Client,
    url: &str,
    prefix: &Path,
) -> Result<Option<PathBuf>> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|source| MediaError::Transport {
            url: url.to_string(),
            source,
        })?;

    if !response.status().is_success() {
        tracing::warn!(url, status = %response.status(), "skipping unavailable media");
        return Ok(None);
    }

    let content_type = response
        .headers()
        .get(reqwest::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/octet-stream");
    let path = with_extension_appended(prefix, extension_for_content_type(content_type));

    stream_to_file(response, url, &path).await?;
    tracing::debug!(url, path = %path.display(), "downloaded media");

    Ok(Some(path))
}

/// Stream a response body to `path` without buffering it in memory.
///
/// The body goes to a `.part` sibling first and is renamed once complete, so
/// an interrupted download never shows up under the final name. The partial
/// file is removed on any error, and also when the future is dropped.
pub(crate) async fn stream_to_file(
    mut response: reqwest::Response,
    url: &str,
    path: &Path,
) -> Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }

    let partial = PartialFile::new(with_extension_appended(path, PARTIAL_EXTENSION));
    let file = tokio::fs::File::create(&partial.path).await?;
    let mut writer = BufWriter::with_capacity(CHUNK_SIZE, file);

    loop {
        let chunk = match response.chunk().await {
            Ok(Some(chunk)) => chunk,
            Ok(None) => break,
            Err(source) => {
                tracing::error!(url, path = %path.display(), "client error while downloading");
                return Err(MediaError::Transport {
                    url: url.to_string(),
                    source,
                });
            }
        };
        writer.write_all(&chunk).await?;
    }
    writer.flush().await?;
    drop(writer);

    tokio::fs::rename(&partial.path, path).await?;
    partial.keep();
    Ok(())
}

/// Extension of in-progress downloads. Never a cache entry.
pub(crate) const PARTIAL_EXTENSION: &str = "part";

/// Removes the partial file when dropped unless the download completed.
struct PartialFile {
    path: PathBuf,
    done: bool,
}

impl PartialFile {
    fn new(path: PathBuf) -> Self {
        Self { path, done: false }
    }

    fn keep(mut self) {
        self.done = true;
    }
}

impl Drop for PartialFile {
    fn drop(&mut self) {
        if !self.done {
            let _ = std::fs::remove_file(&self.path);
        }
    }
}

// `Path::with_extension` would replace the dot-suffix of names like "Sp. x/0"
fn with_extension_appended(path: &Path, ext: &str) -> PathBuf {
    let mut name = OsString::from(path.as_os_str());
    name.push(".");
    name.push(ext);
    PathBuf::from(name)
}
