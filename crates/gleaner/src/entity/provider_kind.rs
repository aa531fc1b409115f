//! Provider kind enum for type-safe content provider handling.
//!
//! This identifies the *kind* of upstream a subscription or user lives on,
//! not a specific account. The external identity itself is stored alongside
//! it as an opaque string.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Supported content providers.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, EnumIter, DeriveActiveEnum, Serialize, Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::None)")]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Generic RSS/Atom feed. The external id is the feed URL for
    /// subscriptions and an OPML subscription list URL for users.
    #[sea_orm(string_value = "feed")]
    Feed,
    /// YouTube channel. The external id is the channel id.
    #[sea_orm(string_value = "youtube")]
    YouTube,
    /// Podcast show. The external id is the show's RSS feed URL.
    #[sea_orm(string_value = "podcast")]
    Podcast,
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderKind::Feed => write!(f, "feed"),
            ProviderKind::YouTube => write!(f, "youtube"),
            ProviderKind::Podcast => write!(f, "podcast"),
        }
    }
}

impl std::str::FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "feed" | "rss" | "atom" => Ok(ProviderKind::Feed),
            "youtube" | "yt" => Ok(ProviderKind::YouTube),
            "podcast" => Ok(ProviderKind::Podcast),
            _ => Err(format!("Unknown provider kind: {}", s)),
        }
    }
}
