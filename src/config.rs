use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

#[derive(Debug, Clone)]
pub struct Config {
    pub database_path: String,
    pub cache_dir: PathBuf,
    pub macaulay_base_url: String,
    pub xeno_canto_base_url: String,
    pub request_timeout: Duration,
    pub precache_timeout: Duration,
    pub precache_concurrency: usize,
    pub max_connections: usize,
    pub bird_list_path: PathBuf,
    pub sci_bird_list_path: PathBuf,
    pub song_birds_path: PathBuf,
    pub sci_song_birds_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database_path: "birdmedia.db".to_string(),
            cache_dir: PathBuf::from("cache"),
            macaulay_base_url: "https://search.macaulaylibrary.org".to_string(),
            xeno_canto_base_url: "https://www.xeno-canto.org".to_string(),
            request_timeout: Duration::from_secs(30),
            precache_timeout: Duration::from_secs(10 * 60),
            precache_concurrency: 100,
            max_connections: 100,
            bird_list_path: PathBuf::from("data/birdList.txt"),
            sci_bird_list_path: PathBuf::from("data/scibirds.txt"),
            song_birds_path: PathBuf::from("data/songbirds.txt"),
            sci_song_birds_path: PathBuf::from("data/scisongbirds.txt"),
        }
    }
}

impl Config {
    /// Read configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from any key lookup, falling back to defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let secs = |key: &str, default: Duration| -> Result<Duration> {
            match lookup(key) {
                Some(v) => v
                    .parse::<u64>()
                    .map(Duration::from_secs)
                    .with_context(|| format!("{} must be a number of seconds, got {:?}", key, v)),
                None => Ok(default),
            }
        };

        let count = |key: &str, default: usize| -> Result<usize> {
            match lookup(key) {
                Some(v) => v
                    .parse::<usize>()
                    .with_context(|| format!("{} must be a number, got {:?}", key, v)),
                None => Ok(default),
            }
        };

        Ok(Self {
            database_path: lookup("DATABASE_PATH").unwrap_or(defaults.database_path),
            cache_dir: lookup("CACHE_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.cache_dir),
            macaulay_base_url: lookup("MACAULAY_BASE_URL").unwrap_or(defaults.macaulay_base_url),
            xeno_canto_base_url: lookup("XENO_CANTO_BASE_URL")
                .unwrap_or(defaults.xeno_canto_base_url),
            request_timeout: secs("REQUEST_TIMEOUT_SECS", defaults.request_timeout)?,
            precache_timeout: secs("PRECACHE_TIMEOUT_SECS", defaults.precache_timeout)?,
            precache_concurrency: count("PRECACHE_CONCURRENCY", defaults.precache_concurrency)?,
            max_connections: count("MAX_CONNECTIONS", defaults.max_connections)?,
            bird_list_path: lookup("BIRD_LIST_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.bird_list_path),
            sci_bird_list_path: lookup("SCI_BIRD_LIST_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.sci_bird_list_path),
            song_birds_path: lookup("SONG_BIRDS_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.song_birds_path),
            sci_song_birds_path: lookup("SCI_SONG_BIRDS_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.sci_song_birds_path),
        })
    }
}
