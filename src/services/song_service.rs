//! Song service: the use cases behind the HTTP endpoints
//!
//! The service owns no data. It coordinates the song store, the text cache
//! and the lookup API client, and is shared by all requests behind an `Arc`.
//! Store and cache writes are separate calls with no transaction spanning
//! them.

use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;

use crate::core::data::SongRepository;
use crate::core::infrastructure::cache::TextCache;
use crate::core::services::metadata::MetadataClient;
use crate::core::song::{ensure_page, NewSongRequest, Page, Song, SongFilter, SongId};
use crate::error::{Result, SongError};

/// Verse separator as stored in the `text` column: a backslash-escaped
/// blank line, not real newline characters.
pub const VERSE_DELIMITER: &str = "\\n\\n";

pub struct SongService {
    store: Arc<dyn SongRepository>,
    cache: Arc<dyn TextCache>,
    metadata: MetadataClient,
}

impl SongService {
    pub fn new(store: Arc<dyn SongRepository>, cache: Arc<dyn TextCache>, metadata: MetadataClient) -> Self {
        Self { store, cache, metadata }
    }

    pub async fn get_lib(&self, filter: &SongFilter, page: Page) -> Result<Vec<Song>> {
        ensure_page(page)?;
        self.store.get_lib(filter, page).await
    }

    /// Verse `page` of the song text, read through the cache.
    pub async fn get_text(&self, id: SongId, page: Page) -> Result<String> {
        ensure_page(page)?;

        let text = match self.cache.get_text(id).await? {
            Some(text) => text,
            None => {
                debug!("Text of song {} not cached, reading from store", id);
                let text = self.store.get_text(id).await?;
                self.cache.create_key(id, &text).await?;
                text
            }
        };

        verse(&text, page)
    }

    /// Deletes the song, then its cached text.
    ///
    /// A cache failure is still reported after the row is gone.
    pub async fn del_song(&self, id: SongId) -> Result<()> {
        self.store.del_song(id).await?;

        if let Err(e) = self.cache.del_key(id).await {
            warn!("Song {} deleted but its cached text was not: {}", id, e);
            return Err(e);
        }

        info!("Song {} deleted", id);
        Ok(())
    }

    pub async fn change_song(&self, song: &Song) -> Result<()> {
        if song.is_empty_update() {
            return Err(SongError::invalid_input("Invalid body"));
        }
        self.store.change_song(song).await
    }

    /// Enriches `data` through the lookup API and stores the result.
    pub async fn create_song(&self, data: &NewSongRequest, api_url: &Url) -> Result<SongId> {
        let details = self.metadata.fetch_details(api_url, data).await?;

        let song = Song::new(&data.name, &data.group, details.release_date, &details.text, &details.link);
        let id = self.store.create_song(&song).await?;

        info!("Song {} created: {} - {}", id, song.group, song.name);
        Ok(id)
    }

    pub async fn close(&self) -> Result<()> {
        self.cache.close().await
    }
}

pub fn split_verses(text: &str) -> Vec<&str> {
    text.split(VERSE_DELIMITER).collect()
}

/// The 1-based `page`-th verse of `text`.
pub fn verse(text: &str, page: Page) -> Result<String> {
    ensure_page(page)?;
    let verses = split_verses(text);

    let index = page as usize - 1;
    verses
        .get(index)
        .map(|v| v.to_string())
        .ok_or_else(|| SongError::invalid_input(format!("This song have only {} verses", verses.len())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{CacheError, RequestError, StoreError};
    use crate::services::mock::{MockSongStore, MockTextCache};
    use crate::test_support::{closed_port_url, local_http_client, spawn_server};
    use axum::{routing::get, Json, Router};
    use chrono::NaiveDate;
    use serde_json::json;

    const THREE_VERSES: &str = "A\\n\\nB\\n\\nC";

    fn song(id: SongId, name: &str, group: &str, text: &str) -> Song {
        Song {
            id,
            name: name.to_string(),
            group: group.to_string(),
            release_date: None,
            text: text.to_string(),
            link: format!("https://example.com/{}", id),
        }
    }

    fn service(store: Arc<MockSongStore>, cache: Arc<MockTextCache>) -> SongService {
        SongService::new(store, cache, MetadataClient::with_client(local_http_client()))
    }

    fn request() -> NewSongRequest {
        NewSongRequest {
            group: "Muse".to_string(),
            name: "Supermassive Black Hole".to_string(),
        }
    }

    #[test]
    fn test_delimiter_is_literal_backslash_n() {
        assert_eq!(split_verses(THREE_VERSES), vec!["A", "B", "C"]);
        assert_eq!(split_verses("line one\n\nline two"), vec!["line one\n\nline two"]);
        assert_eq!(split_verses(""), vec![""]);
    }

    #[test]
    fn test_verse_out_of_range() {
        assert_eq!(verse(THREE_VERSES, 3).unwrap(), "C");

        let err = verse(THREE_VERSES, 4).unwrap_err();
        assert!(matches!(err, SongError::InvalidInput(_)));
        assert_eq!(err.to_string(), "This song have only 3 verses");

        assert!(matches!(verse(THREE_VERSES, 0), Err(SongError::InvalidInput(_))));
    }

    #[tokio::test]
    async fn test_get_text_falls_back_to_store_and_fills_cache() {
        let store = Arc::new(MockSongStore::with_songs(vec![song(1, "Song", "Group", THREE_VERSES)]));
        let cache = Arc::new(MockTextCache::new());
        let service = service(store.clone(), cache.clone());

        assert_eq!(service.get_text(1, 1).await.unwrap(), "A");
        assert_eq!(store.calls(), 1);
        assert_eq!(cache.get_text(1).await.unwrap().as_deref(), Some(THREE_VERSES));

        assert_eq!(service.get_text(1, 2).await.unwrap(), "B");
        assert_eq!(service.get_text(1, 3).await.unwrap(), "C");
        let err = service.get_text(1, 4).await.unwrap_err();
        assert!(err.to_string().contains("3 verses"));
        assert_eq!(err.status_code(), 400);

        // only the first read missed the cache
        assert_eq!(store.calls(), 1);
    }

    #[tokio::test]
    async fn test_cache_hit_never_touches_store() {
        let store = Arc::new(MockSongStore::new());
        let cache = Arc::new(MockTextCache::new());
        cache.create_key(7, "Only\\n\\nTwo").await.unwrap();
        let service = service(store.clone(), cache.clone());

        assert_eq!(service.get_text(7, 2).await.unwrap(), "Two");
        assert_eq!(store.calls(), 0);
    }

    #[tokio::test]
    async fn test_get_text_propagates_store_errors() {
        let store = Arc::new(MockSongStore::new());
        let cache = Arc::new(MockTextCache::new());
        let service = service(store.clone(), cache.clone());

        assert!(matches!(service.get_text(99, 1).await, Err(SongError::NotFound(_))));

        store.set_failing(true);
        assert!(matches!(service.get_text(99, 1).await, Err(SongError::Store(_))));
        assert_eq!(cache.get_text(99).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_cache_fill_failure_is_an_error() {
        let store = Arc::new(MockSongStore::with_songs(vec![song(1, "Song", "Group", THREE_VERSES)]));
        let cache = Arc::new(MockTextCache::new());
        cache.set_fail_create(true);
        let service = service(store, cache);

        let err = service.get_text(1, 1).await.unwrap_err();
        assert!(matches!(err, SongError::Cache(CacheError::Redis(_))));
        assert_eq!(err.status_code(), 500);
    }

    #[tokio::test]
    async fn test_page_zero_is_rejected_before_any_lookup() {
        let store = Arc::new(MockSongStore::new());
        let cache = Arc::new(MockTextCache::new());
        let service = service(store.clone(), cache.clone());

        assert!(matches!(service.get_text(1, 0).await, Err(SongError::InvalidInput(_))));
        assert!(matches!(service.get_lib(&Song::default(), 0).await, Err(SongError::InvalidInput(_))));
        assert_eq!(store.calls(), 0);
        assert_eq!(cache.calls(), 0);
    }

    #[tokio::test]
    async fn test_del_song_removes_row_and_cached_text() {
        let store = Arc::new(MockSongStore::with_songs(vec![song(1, "Song", "Group", THREE_VERSES)]));
        let cache = Arc::new(MockTextCache::new());
        cache.create_key(1, THREE_VERSES).await.unwrap();
        let service = service(store.clone(), cache.clone());

        service.del_song(1).await.unwrap();
        assert!(store.songs().is_empty());
        assert_eq!(cache.get_text(1).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_del_song_store_failure_leaves_cache_untouched() {
        let store = Arc::new(MockSongStore::with_songs(vec![song(1, "Song", "Group", THREE_VERSES)]));
        let cache = Arc::new(MockTextCache::new());
        cache.create_key(1, THREE_VERSES).await.unwrap();
        store.set_failing(true);
        let service = service(store, cache.clone());

        let calls_before = cache.calls();
        let err = service.del_song(1).await.unwrap_err();
        assert!(matches!(err, SongError::Store(StoreError::Timeout { .. })));
        assert_eq!(cache.calls(), calls_before);
        assert_eq!(cache.get_text(1).await.unwrap().as_deref(), Some(THREE_VERSES));
    }

    #[tokio::test]
    async fn test_del_song_reports_cache_failure_after_store_delete() {
        let store = Arc::new(MockSongStore::with_songs(vec![song(1, "Song", "Group", THREE_VERSES)]));
        let cache = Arc::new(MockTextCache::new());
        cache.set_fail_delete(true);
        let service = service(store.clone(), cache);

        let err = service.del_song(1).await.unwrap_err();
        assert!(matches!(err, SongError::Cache(_)));
        // the row is gone anyway, there is no rollback
        assert!(store.songs().is_empty());
    }

    #[tokio::test]
    async fn test_del_missing_song_is_not_found() {
        let service = service(Arc::new(MockSongStore::new()), Arc::new(MockTextCache::new()));
        assert!(matches!(service.del_song(5).await, Err(SongError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_empty_change_is_rejected_before_store() {
        let store = Arc::new(MockSongStore::with_songs(vec![song(1, "Song", "Group", THREE_VERSES)]));
        let service = service(store.clone(), Arc::new(MockTextCache::new()));

        let err = service.change_song(&Song { id: 1, ..Song::default() }).await.unwrap_err();
        assert!(matches!(err, SongError::InvalidInput(_)));
        assert_eq!(store.calls(), 0);
    }

    #[tokio::test]
    async fn test_change_song_only_overwrites_given_fields() {
        let store = Arc::new(MockSongStore::with_songs(vec![song(1, "Song", "Group", THREE_VERSES)]));
        let service = service(store.clone(), Arc::new(MockTextCache::new()));

        service
            .change_song(&Song {
                id: 1,
                name: "Renamed".to_string(),
                ..Song::default()
            })
            .await
            .unwrap();

        let stored = &store.songs()[0];
        assert_eq!(stored.name, "Renamed");
        assert_eq!(stored.group, "Group");
        assert_eq!(stored.text, THREE_VERSES);
    }

    #[tokio::test]
    async fn test_get_lib_pages_by_twenty() {
        let songs = (1..=45).map(|id| song(id, &format!("Track {}", id), "Band", "")).collect();
        let service = service(Arc::new(MockSongStore::with_songs(songs)), Arc::new(MockTextCache::new()));

        let first = service.get_lib(&Song::default(), 1).await.unwrap();
        let third = service.get_lib(&Song::default(), 3).await.unwrap();
        let fourth = service.get_lib(&Song::default(), 4).await.unwrap();

        assert_eq!(first.len(), 20);
        assert_eq!(first[0].id, 1);
        assert_eq!(third.len(), 5);
        assert_eq!(third[0].id, 41);
        assert!(fourth.is_empty());
    }

    #[tokio::test]
    async fn test_get_lib_id_filter_ignores_other_fields() {
        let songs = vec![song(1, "Alpha", "Band", ""), song(2, "Beta", "Band", "")];
        let service = service(Arc::new(MockSongStore::with_songs(songs)), Arc::new(MockTextCache::new()));

        let filter = Song {
            id: 2,
            name: "Alpha".to_string(),
            ..Song::default()
        };
        let found = service.get_lib(&filter, 1).await.unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Beta");
    }

    #[tokio::test]
    async fn test_create_song_then_list_by_id() {
        let router = Router::new().route(
            "/info",
            get(|| async {
                Json(json!({
                    "releaseDate": "2006-07-16T00:00:00Z",
                    "text": "Ooh baby\\n\\nOoh baby, can you hear me moan?",
                    "link": "https://www.youtube.com/watch?v=Xsp3_a-PMTw"
                }))
            }),
        );
        let api_url = spawn_server(router).await;
        let store = Arc::new(MockSongStore::new());
        let service = service(store.clone(), Arc::new(MockTextCache::new()));

        let id = service.create_song(&request(), &api_url).await.unwrap();
        let filter = Song { id, ..Song::default() };
        let found = service.get_lib(&filter, 1).await.unwrap();

        assert_eq!(found.len(), 1);
        let created = &found[0];
        assert_eq!(created.id, id);
        assert_eq!(created.group, "Muse");
        assert_eq!(created.name, "Supermassive Black Hole");
        assert_eq!(created.release_date, NaiveDate::from_ymd_opt(2006, 7, 16));
        assert_eq!(created.link, "https://www.youtube.com/watch?v=Xsp3_a-PMTw");
        assert_eq!(service.get_text(id, 2).await.unwrap(), "Ooh baby, can you hear me moan?");
    }

    #[tokio::test]
    async fn test_create_song_lookup_failures_are_distinct() {
        let store = Arc::new(MockSongStore::new());
        let service = service(store.clone(), Arc::new(MockTextCache::new()));

        let bad_base = Url::parse("mailto:someone@example.com").unwrap();
        let unreachable = closed_port_url().await;
        let garbage = spawn_server(Router::new().route("/info", get(|| async { "invalid json" }))).await;

        let cases = [
            (bad_base, "error creating request"),
            (unreachable, "error making request"),
            (garbage, "error decoding response"),
        ];
        for (api_url, expected) in cases {
            let err = service.create_song(&request(), &api_url).await.unwrap_err();
            assert!(matches!(err, SongError::Request(_)), "{}", expected);
            assert!(err.to_string().contains(expected), "{} not in {}", expected, err);
            assert_eq!(err.status_code(), 500);
        }

        assert_eq!(store.calls(), 0);
        assert!(matches!(
            service.create_song(&request(), &Url::parse("mailto:x@y.z").unwrap()).await,
            Err(SongError::Request(RequestError::Build(_)))
        ));
    }

    #[tokio::test]
    async fn test_close_closes_cache() {
        let cache = Arc::new(MockTextCache::new());
        let service = service(Arc::new(MockSongStore::new()), cache.clone());

        service.close().await.unwrap();
        assert!(matches!(cache.get_text(1).await, Err(SongError::Cache(CacheError::Closed))));
    }
}
