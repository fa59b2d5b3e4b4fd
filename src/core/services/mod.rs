//! External services integration

pub mod metadata;
