//! In-process adapters

pub mod cache;

pub use cache::InMemoryCache;
