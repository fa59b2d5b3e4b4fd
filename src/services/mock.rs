//! In-memory stand-ins for the store and cache, with call counters and
//! switchable failures.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;

use crate::core::data::query::PAGE_SIZE;
use crate::core::data::SongRepository;
use crate::core::infrastructure::cache::{MemoryTextCache, TextCache};
use crate::core::song::{ensure_page, Page, Song, SongFilter, SongId};
use crate::error::{CacheError, Result, SongError, StoreError};

pub struct MockSongStore {
    songs: Mutex<Vec<Song>>,
    next_id: AtomicU64,
    calls: AtomicUsize,
    failing: AtomicBool,
}

impl MockSongStore {
    pub fn new() -> Self {
        Self::with_songs(Vec::new())
    }

    pub fn with_songs(songs: Vec<Song>) -> Self {
        let next_id = songs.iter().map(|s| s.id).max().unwrap_or(0) + 1;
        Self {
            songs: Mutex::new(songs),
            next_id: AtomicU64::new(next_id),
            calls: AtomicUsize::new(0),
            failing: AtomicBool::new(false),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Every following call fails with a store timeout.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn songs(&self) -> Vec<Song> {
        self.songs.lock().unwrap().clone()
    }

    fn enter(&self) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(StoreError::Timeout { seconds: 5 }.into());
        }
        Ok(())
    }

    fn matches(filter: &SongFilter, song: &Song) -> bool {
        if filter.id != 0 {
            return song.id == filter.id;
        }
        song.name.contains(&filter.name)
            && song.group.contains(&filter.group)
            && filter.release_date.map_or(true, |d| song.release_date == Some(d))
            && song.text.contains(&filter.text)
            && song.link.contains(&filter.link)
    }

    fn missing() -> SongError {
        SongError::not_found("Song with this id does not exist")
    }
}

#[async_trait]
impl SongRepository for MockSongStore {
    async fn get_lib(&self, filter: &SongFilter, page: Page) -> Result<Vec<Song>> {
        self.enter()?;
        ensure_page(page)?;
        let songs = self.songs.lock().unwrap();
        Ok(songs
            .iter()
            .filter(|song| Self::matches(filter, song))
            .skip(PAGE_SIZE as usize * (page as usize - 1))
            .take(PAGE_SIZE as usize)
            .cloned()
            .collect())
    }

    async fn get_text(&self, id: SongId) -> Result<String> {
        self.enter()?;
        let songs = self.songs.lock().unwrap();
        songs
            .iter()
            .find(|song| song.id == id)
            .map(|song| song.text.clone())
            .ok_or_else(Self::missing)
    }

    async fn del_song(&self, id: SongId) -> Result<()> {
        self.enter()?;
        let mut songs = self.songs.lock().unwrap();
        let before = songs.len();
        songs.retain(|song| song.id != id);
        if songs.len() == before {
            return Err(Self::missing());
        }
        Ok(())
    }

    async fn change_song(&self, update: &Song) -> Result<()> {
        self.enter()?;
        let mut songs = self.songs.lock().unwrap();
        let song = songs.iter_mut().find(|song| song.id == update.id).ok_or_else(Self::missing)?;
        if !update.name.is_empty() {
            song.name = update.name.clone();
        }
        if !update.group.is_empty() {
            song.group = update.group.clone();
        }
        if update.release_date.is_some() {
            song.release_date = update.release_date;
        }
        if !update.text.is_empty() {
            song.text = update.text.clone();
        }
        if !update.link.is_empty() {
            song.link = update.link.clone();
        }
        Ok(())
    }

    async fn create_song(&self, song: &Song) -> Result<SongId> {
        self.enter()?;
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        self.songs.lock().unwrap().push(Song { id, ..song.clone() });
        Ok(id)
    }
}

pub struct MockTextCache {
    inner: MemoryTextCache,
    calls: AtomicUsize,
    fail_create: AtomicBool,
    fail_delete: AtomicBool,
}

impl MockTextCache {
    pub fn new() -> Self {
        Self {
            inner: MemoryTextCache::new(),
            calls: AtomicUsize::new(0),
            fail_create: AtomicBool::new(false),
            fail_delete: AtomicBool::new(false),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn set_fail_create(&self, fail: bool) {
        self.fail_create.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_delete(&self, fail: bool) {
        self.fail_delete.store(fail, Ordering::SeqCst);
    }

    fn redis_failure() -> SongError {
        CacheError::Redis(redis::RedisError::from((redis::ErrorKind::IoError, "connection reset"))).into()
    }
}

#[async_trait]
impl TextCache for MockTextCache {
    async fn create_key(&self, id: SongId, text: &str) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(Self::redis_failure());
        }
        self.inner.create_key(id, text).await
    }

    async fn get_text(&self, id: SongId) -> Result<Option<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.inner.get_text(id).await
    }

    async fn del_key(&self, id: SongId) -> Result<()> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_delete.load(Ordering::SeqCst) {
            return Err(Self::redis_failure());
        }
        self.inner.del_key(id).await
    }

    async fn close(&self) -> Result<()> {
        self.inner.close().await
    }
}
