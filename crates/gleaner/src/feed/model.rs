use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Thumbnail used when neither the feed nor the item carries an image.
pub const DEFAULT_THUMBNAIL_URL: &str = "/static/images/default-thumbnail.png";

/// Which syndication dialect a document uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedDialect {
    /// RSS 2.0 (`<rss><channel><item>`) and RSS 1.0 (`<rdf:RDF><item>`).
    Rss,
    /// Atom (`<feed><entry>`).
    Atom,
}

/// Document-level metadata.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedInfo {
    pub dialect: FeedDialect,
    pub title: String,
    pub link: String,
    pub description: String,
    pub language: Option<String>,
    pub thumbnail: String,
}

/// One normalized entry of a feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedItem {
    pub title: String,
    /// Canonical link; empty when the entry carries none.
    pub link: String,
    pub description: String,
    /// Publication time, epoch when missing or unparsable.
    pub published: DateTime<Utc>,
    pub thumbnail: String,
    /// Minimal standalone document holding only this item.
    ///
    /// Parsing it yields exactly one item equal to this one.
    pub raw_data: String,
}
