//! SeaORM entity definitions for the gleaner database schema.

pub mod content_item;
pub mod prelude;
pub mod provider_kind;
pub mod subscription;
pub mod user;
