//! Service layer
//!
//! - `SongService`: the catalog use cases behind the HTTP endpoints
//! - `SimpleServices`: builds the store, cache and service from `Config`

pub mod simple_container;
pub mod song_service;

#[cfg(test)]
pub mod mock;

pub use simple_container::SimpleServices;
pub use song_service::SongService;
