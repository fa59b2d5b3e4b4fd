//! PostgreSQL storage for the song catalog
//!
//! Every statement runs under [`STORE_TIMEOUT`]. A missing row on a
//! single-song lookup, delete or update is reported as `NotFound`; every
//! other fault is a `StoreError`.

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::future::Future;
use std::time::Duration;
use tracing::{debug, info};

use crate::core::data::query;
use crate::core::song::{Page, Song, SongFilter, SongId};
use crate::error::{Result, SongError, StoreError};

pub const STORE_TIMEOUT: Duration = Duration::from_secs(5);

const NO_SUCH_SONG: &str = "Song with this id does not exist";

/// Capability interface of the song store.
#[async_trait]
pub trait SongRepository: Send + Sync {
    /// One page of songs matching `filter`. No match is an empty page.
    async fn get_lib(&self, filter: &SongFilter, page: Page) -> Result<Vec<Song>>;
    async fn get_text(&self, id: SongId) -> Result<String>;
    async fn del_song(&self, id: SongId) -> Result<()>;
    /// Overwrites the non-empty fields of the song with `song.id`.
    async fn change_song(&self, song: &Song) -> Result<()>;
    async fn create_song(&self, song: &Song) -> Result<SongId>;
}

#[derive(Debug, sqlx::FromRow)]
struct SongRow {
    id: i64,
    group_name: String,
    song_name: String,
    release_date: Option<NaiveDate>,
    text: String,
    link: String,
}

impl TryFrom<SongRow> for Song {
    type Error = SongError;

    fn try_from(row: SongRow) -> Result<Self> {
        let id = SongId::try_from(row.id)
            .map_err(|e| StoreError::Decode(sqlx::Error::Decode(Box::new(e))))?;

        Ok(Song {
            id,
            name: row.song_name,
            group: row.group_name,
            release_date: row.release_date,
            text: row.text,
            link: row.link,
        })
    }
}

pub struct PostgresSongStore {
    pool: PgPool,
    query_timeout: Duration,
}

impl PostgresSongStore {
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self> {
        debug!("Creating database connection pool");
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(STORE_TIMEOUT)
            .connect(database_url)
            .await
            .map_err(StoreError::Connection)?;

        info!("Database connection has been created");
        Ok(Self::from_pool(pool))
    }

    pub fn from_pool(pool: PgPool) -> Self {
        Self {
            pool,
            query_timeout: STORE_TIMEOUT,
        }
    }

    /// Applies the embedded migrations under `migrations/`.
    pub async fn migrate(&self) -> Result<()> {
        debug!("Migrating...");
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(StoreError::Migration)?;
        debug!("Migrations successfully applied");
        Ok(())
    }

    pub async fn close(&self) {
        debug!("Closing database connection");
        self.pool.close().await;
    }

    async fn with_timeout<T, F>(&self, operation: F) -> Result<T>
    where
        F: Future<Output = std::result::Result<T, sqlx::Error>>,
    {
        match tokio::time::timeout(self.query_timeout, operation).await {
            Ok(result) => result.map_err(|e| SongError::Store(e.into())),
            Err(_) => Err(StoreError::Timeout {
                seconds: self.query_timeout.as_secs(),
            }
            .into()),
        }
    }
}

#[async_trait]
impl SongRepository for PostgresSongStore {
    async fn get_lib(&self, filter: &SongFilter, page: Page) -> Result<Vec<Song>> {
        let mut query = query::select_songs(filter, page)?;
        let rows: Vec<SongRow> = self
            .with_timeout(query.build_query_as::<SongRow>().fetch_all(&self.pool))
            .await?;

        debug!("Library query returned {} songs", rows.len());
        rows.into_iter().map(Song::try_from).collect()
    }

    async fn get_text(&self, id: SongId) -> Result<String> {
        let key = query::db_id(id)?;
        let text = self
            .with_timeout(
                sqlx::query_scalar::<_, String>("SELECT text FROM song WHERE id = $1")
                    .bind(key)
                    .fetch_optional(&self.pool),
            )
            .await?;

        text.ok_or_else(|| SongError::not_found(NO_SUCH_SONG))
    }

    async fn del_song(&self, id: SongId) -> Result<()> {
        let key = query::db_id(id)?;
        let result = self
            .with_timeout(sqlx::query("DELETE FROM song WHERE id = $1").bind(key).execute(&self.pool))
            .await?;

        if result.rows_affected() == 0 {
            return Err(SongError::not_found(NO_SUCH_SONG));
        }
        debug!("Song {} deleted", id);
        Ok(())
    }

    async fn change_song(&self, song: &Song) -> Result<()> {
        let mut query = query::update_song(song)?;
        let result = self.with_timeout(query.build().execute(&self.pool)).await?;

        if result.rows_affected() == 0 {
            return Err(SongError::not_found(NO_SUCH_SONG));
        }
        debug!("Song {} updated", song.id);
        Ok(())
    }

    async fn create_song(&self, song: &Song) -> Result<SongId> {
        let id = self
            .with_timeout(
                sqlx::query_scalar::<_, i64>(
                    "INSERT INTO song (song_name, group_name, release_date, text, link) \
                     VALUES ($1, $2, $3, $4, $5) RETURNING id",
                )
                .bind(&song.name)
                .bind(&song.group)
                .bind(song.release_date)
                .bind(&song.text)
                .bind(&song.link)
                .fetch_one(&self.pool),
            )
            .await?;

        SongId::try_from(id).map_err(|e| StoreError::Decode(sqlx::Error::Decode(Box::new(e))).into())
    }
}
