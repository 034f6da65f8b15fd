//! SeaORM entity models
//!
//! Table definitions mirrored from `migrations/`. Domain types live in
//! `crate::domain::entities`; adapters convert between the two.

pub mod agents;
pub mod comments;
pub mod posts;
pub mod votes;
