//! Infrastructure and cross-cutting concerns

pub mod cache;
