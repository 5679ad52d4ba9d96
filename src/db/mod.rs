use anyhow::{Context, Result};
use chrono::Utc;
use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::{params, OptionalExtension};

use crate::models::{ChannelField, ChannelState, INITIAL_IMAGE_INDEX};

pub type DbPool = Pool<SqliteConnectionManager>;

pub fn create_pool(db_path: &str) -> Result<DbPool> {
    let manager = SqliteConnectionManager::file(db_path);
    let pool = Pool::new(manager)?;
    Ok(pool)
}

pub fn init_database(pool: &DbPool) -> Result<()> {
    let conn = pool.get()?;

    // One row per chat channel, one column per game field
    conn.execute(
        &format!(
            "CREATE TABLE IF NOT EXISTS channel_state (
                channel_id TEXT PRIMARY KEY,
                bird TEXT NOT NULL DEFAULT '',
                answered INTEGER NOT NULL DEFAULT 1,
                song_bird TEXT NOT NULL DEFAULT '',
                song_answered INTEGER NOT NULL DEFAULT 1,
                goatsucker TEXT NOT NULL DEFAULT '',
                goatsucker_answered INTEGER NOT NULL DEFAULT 1,
                total_correct INTEGER NOT NULL DEFAULT 0,
                prev_bird TEXT NOT NULL DEFAULT '',
                prev_song TEXT NOT NULL DEFAULT '',
                prev_image_index INTEGER NOT NULL DEFAULT {},
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL
            )",
            INITIAL_IMAGE_INDEX
        ),
        [],
    )?;

    Ok(())
}

/// Per-channel key-value access used by the media pipeline.
pub trait ChannelStateStore: Send + Sync {
    fn get_field(&self, channel_id: &str, field: ChannelField) -> Result<Option<String>>;

    fn set_field(&self, channel_id: &str, field: ChannelField, value: &str) -> Result<()>;
}

/// [`ChannelStateStore`] backed by the sqlite pool.
#[derive(Clone)]
pub struct SqliteChannelStore {
    pool: DbPool,
}

impl SqliteChannelStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Create the default record for a channel. Returns false if it already existed.
    pub fn setup_channel(&self, channel_id: &str) -> Result<bool> {
        let conn = self.pool.get()?;
        let now = Utc::now().timestamp();

        let inserted = conn.execute(
            "INSERT OR IGNORE INTO channel_state (channel_id, created_at, updated_at)
             VALUES (?1, ?2, ?3)",
            params![channel_id, now, now],
        )?;

        if inserted > 0 {
            tracing::info!("set up channel {}", channel_id);
        }
        Ok(inserted > 0)
    }

    pub fn get_state(&self, channel_id: &str) -> Result<Option<ChannelState>> {
        let conn = self.pool.get()?;

        let state = conn
            .query_row(
                "SELECT channel_id, bird, answered, song_bird, song_answered, goatsucker,
                        goatsucker_answered, total_correct, prev_bird, prev_song, prev_image_index
                 FROM channel_state WHERE channel_id = ?1",
                params![channel_id],
                |row| {
                    Ok(ChannelState {
                        channel_id: row.get(0)?,
                        bird: row.get(1)?,
                        answered: row.get::<_, i64>(2)? != 0,
                        song_bird: row.get(3)?,
                        song_answered: row.get::<_, i64>(4)? != 0,
                        goatsucker: row.get(5)?,
                        goatsucker_answered: row.get::<_, i64>(6)? != 0,
                        total_correct: row.get(7)?,
                        prev_bird: row.get(8)?,
                        prev_song: row.get(9)?,
                        prev_image_index: row.get(10)?,
                    })
                },
            )
            .optional()?;

        Ok(state)
    }

    /// Abandon the current image round after a fetch error.
    pub fn skip_image_round(&self, channel_id: &str) -> Result<()> {
        self.set_field(channel_id, ChannelField::Bird, "")?;
        self.set_field(channel_id, ChannelField::Answered, "1")
    }

    /// Abandon the current song round after a fetch error.
    pub fn skip_song_round(&self, channel_id: &str) -> Result<()> {
        self.set_field(channel_id, ChannelField::SongBird, "")?;
        self.set_field(channel_id, ChannelField::SongAnswered, "1")
    }

    pub fn skip_goatsucker_round(&self, channel_id: &str) -> Result<()> {
        self.set_field(channel_id, ChannelField::Goatsucker, "")?;
        self.set_field(channel_id, ChannelField::GoatsuckerAnswered, "1")
    }

    /// Put the image rotation back to where a fresh channel starts.
    pub fn reset_rotation(&self, channel_id: &str) -> Result<()> {
        self.set_field(
            channel_id,
            ChannelField::PrevImageIndex,
            &INITIAL_IMAGE_INDEX.to_string(),
        )
    }
}

impl ChannelStateStore for SqliteChannelStore {
    fn get_field(&self, channel_id: &str, field: ChannelField) -> Result<Option<String>> {
        let conn = self.pool.get()?;

        let value = conn
            .query_row(
                &format!(
                    "SELECT CAST({} AS TEXT) FROM channel_state WHERE channel_id = ?1",
                    field.column()
                ),
                params![channel_id],
                |row| row.get(0),
            )
            .optional()
            .with_context(|| format!("reading {} for channel {}", field.column(), channel_id))?;

        Ok(value)
    }

    fn set_field(&self, channel_id: &str, field: ChannelField, value: &str) -> Result<()> {
        let mut conn = self.pool.get()?;
        let now = Utc::now().timestamp();
        let tx = conn.transaction()?;

        // Channels that were never set up get the default record first
        tx.execute(
            "INSERT OR IGNORE INTO channel_state (channel_id, created_at, updated_at)
             VALUES (?1, ?2, ?3)",
            params![channel_id, now, now],
        )?;
        tx.execute(
            &format!(
                "UPDATE channel_state SET {} = ?1, updated_at = ?2 WHERE channel_id = ?3",
                field.column()
            ),
            params![value, now, channel_id],
        )
        .with_context(|| format!("writing {} for channel {}", field.column(), channel_id))?;

        tx.commit()?;
        Ok(())
    }
}
