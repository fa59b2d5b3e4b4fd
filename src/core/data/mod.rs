//! Data layer: the song table and the SQL built against it

pub mod query;
pub mod song_store;

pub use song_store::{PostgresSongStore, SongRepository};
