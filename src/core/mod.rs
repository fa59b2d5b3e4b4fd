//! Core functionality modules
//!
//! - `song`: domain types shared by every layer
//! - `data`: PostgreSQL song store
//! - `services`: external lookup API client
//! - `infrastructure`: text cache

pub mod data;
pub mod infrastructure;
pub mod services;
pub mod song;
