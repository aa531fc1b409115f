//! Field extraction for RSS and Atom documents.

use scraper::{Html, Selector};

use super::date::parse_timestamp;
use super::error::{FeedError, Result};
use super::model::{DEFAULT_THUMBNAIL_URL, FeedDialect, FeedInfo, FeedItem};
use super::tree::{Element, parse_document, write_fragment};
use crate::sync::epoch;

/// A parsed document: metadata plus items in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedDocument {
    pub info: FeedInfo,
    pub items: Vec<FeedItem>,
}

/// Parse feed metadata.
///
/// # Errors
/// `InvalidFeed` for malformed XML, `UnsupportedFormat` for a root that is
/// neither RSS nor Atom.
pub fn parse_feed_info(text: &str) -> Result<FeedInfo> {
    let root = parse_document(text)?;
    feed_info(&root, detect_dialect(&root)?)
}

/// Parse every item of a feed, in document order.
///
/// # Errors
/// Same as [`parse_feed_info`]. A bad date on one item is never an error.
pub fn parse_feed_items(text: &str) -> Result<Vec<FeedItem>> {
    let root = parse_document(text)?;
    feed_items(&root, detect_dialect(&root)?)
}

/// Parse metadata and items in one pass over the document.
pub fn parse_feed_document(text: &str) -> Result<FeedDocument> {
    let root = parse_document(text)?;
    let dialect = detect_dialect(&root)?;
    Ok(FeedDocument {
        info: feed_info(&root, dialect)?,
        items: feed_items(&root, dialect)?,
    })
}

/// Children are looked up by their literal names, so a prefixed `<atom:feed>`
/// is rejected. RSS 1.0 is the exception: its root is always `rdf:RDF` while
/// its items stay unprefixed.
fn detect_dialect(root: &Element) -> Result<FeedDialect> {
    match root.name.as_str() {
        "rss" => Ok(FeedDialect::Rss),
        "feed" => Ok(FeedDialect::Atom),
        _ if root.local_name() == "RDF" => Ok(FeedDialect::Rss),
        _ => Err(FeedError::UnsupportedFormat {
            root: root.name.clone(),
        }),
    }
}

// ─── Items ───────────────────────────────────────────────────────────────────

fn feed_items(root: &Element, dialect: FeedDialect) -> Result<Vec<FeedItem>> {
    let mut items = Vec::new();
    match dialect {
        FeedDialect::Rss => {
            if let Some(channel) = root.child("channel") {
                for item in channel.children_named("item") {
                    items.push(rss_item(&[root, channel], item)?);
                }
            }
            // RSS 1.0 keeps items beside the channel instead of inside it.
            for item in root.children_named("item") {
                items.push(rss_item(&[root], item)?);
            }
        }
        FeedDialect::Atom => {
            for entry in root.children_named("entry") {
                items.push(atom_entry(root, entry)?);
            }
        }
    }
    Ok(items)
}

fn rss_item(ancestors: &[&Element], item: &Element) -> Result<FeedItem> {
    let description = item
        .child_text("description")
        .or_else(|| item.child_text("content:encoded"))
        .unwrap_or_default();

    let link = item
        .child_text("link")
        .or_else(|| permalink_guid(item))
        .or_else(|| item.child("atom:link").and_then(|l| l.attr("href")).map(str::to_string))
        .or_else(|| attr_of(item.child("enclosure"), "url"))
        .unwrap_or_default();

    let published = published_from(item, &["pubDate", "dc:date", "atom:updated"]);

    Ok(FeedItem {
        title: item.child_text("title").unwrap_or_default(),
        link,
        thumbnail: item_thumbnail(item, &description, &["content:encoded"]),
        description,
        published,
        raw_data: write_fragment(ancestors, item)?,
    })
}

fn atom_entry(root: &Element, entry: &Element) -> Result<FeedItem> {
    let description = entry
        .child_text("summary")
        .or_else(|| entry.child_text("content"))
        .or_else(|| {
            entry
                .child("media:group")
                .and_then(|g| g.child_text("media:description"))
        })
        .unwrap_or_default();

    Ok(FeedItem {
        title: entry.child_text("title").unwrap_or_default(),
        link: atom_link(entry).unwrap_or_default(),
        thumbnail: item_thumbnail(entry, &description, &["content"]),
        description,
        published: published_from(entry, &["published", "updated"]),
        raw_data: write_fragment(&[root], entry)?,
    })
}

/// `guid` doubles as the link unless it is explicitly not a permalink.
fn permalink_guid(item: &Element) -> Option<String> {
    let guid = item.child("guid")?;
    if guid.attr("isPermaLink") == Some("false") {
        return None;
    }
    Some(guid.text().trim().to_string()).filter(|g| !g.is_empty())
}

/// `link[rel=alternate]` (a missing `rel` means alternate), else the first link.
fn atom_link(el: &Element) -> Option<String> {
    el.children_named("link")
        .find(|l| matches!(l.attr("rel"), None | Some("alternate")))
        .or_else(|| el.child("link"))
        .and_then(|l| l.attr("href"))
        .map(str::to_string)
}

fn attr_of(el: Option<&Element>, name: &str) -> Option<String> {
    el.and_then(|el| el.attr(name))
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn published_from(el: &Element, fields: &[&str]) -> chrono::DateTime<chrono::Utc> {
    let Some((field, raw)) = fields
        .iter()
        .find_map(|field| el.child_text(field).map(|raw| (*field, raw)))
    else {
        tracing::debug!(element = %el.name, "Feed entry has no date, using epoch");
        return epoch();
    };

    parse_timestamp(&raw).unwrap_or_else(|| {
        tracing::warn!(field, value = %raw, "Unparsable feed date, using epoch");
        epoch()
    })
}

// ─── Thumbnails ──────────────────────────────────────────────────────────────

fn item_thumbnail(el: &Element, description: &str, html_fields: &[&str]) -> String {
    let group = el.child("media:group");

    attr_of(el.child("media:thumbnail"), "url")
        .or_else(|| attr_of(group.and_then(|g| g.child("media:thumbnail")), "url"))
        .or_else(|| attr_of(el.child("itunes:image"), "href"))
        .or_else(|| image_media_content(el))
        .or_else(|| group.and_then(image_media_content))
        .or_else(|| {
            el.children_named("enclosure")
                .find(|e| e.attr("type").is_some_and(|t| t.starts_with("image/")))
                .and_then(|e| attr_of(Some(e), "url"))
        })
        .or_else(|| first_img_src(description))
        .or_else(|| {
            html_fields
                .iter()
                .filter_map(|field| el.child_text(field))
                .find_map(|html| first_img_src(&html))
        })
        .unwrap_or_else(|| DEFAULT_THUMBNAIL_URL.to_string())
}

fn image_media_content(el: &Element) -> Option<String> {
    el.children_named("media:content")
        .find(|c| {
            c.attr("medium") == Some("image")
                || c.attr("type").is_some_and(|t| t.starts_with("image/"))
        })
        .and_then(|c| attr_of(Some(c), "url"))
}

/// First `<img src>` inside an HTML snippet.
fn first_img_src(html: &str) -> Option<String> {
    if !html.contains("<img") {
        return None;
    }
    let selector = Selector::parse("img[src]").ok()?;
    let fragment = Html::parse_fragment(html);
    fragment
        .select(&selector)
        .filter_map(|img| img.value().attr("src"))
        .map(str::trim)
        .find(|src| !src.is_empty())
        .map(str::to_string)
}

// ─── Feed Metadata ───────────────────────────────────────────────────────────

fn feed_info(root: &Element, dialect: FeedDialect) -> Result<FeedInfo> {
    let root_lang = root.attr("xml:lang").map(str::to_string);

    Ok(match dialect {
        FeedDialect::Rss => {
            let channel = root.child("channel").unwrap_or(root);
            // RSS 1.0 puts <image> beside the channel.
            let image = channel.child("image").or_else(|| root.child("image"));
            FeedInfo {
                dialect,
                title: channel.child_text("title").unwrap_or_default(),
                link: channel.child_text("link").unwrap_or_default(),
                description: channel.child_text("description").unwrap_or_default(),
                language: channel
                    .child_text("language")
                    .or_else(|| channel.child_text("dc:language"))
                    .or(root_lang),
                thumbnail: image
                    .and_then(|i| i.child_text("url"))
                    .or_else(|| attr_of(channel.child("itunes:image"), "href"))
                    .or_else(|| attr_of(channel.child("media:thumbnail"), "url"))
                    .unwrap_or_else(|| DEFAULT_THUMBNAIL_URL.to_string()),
            }
        }
        FeedDialect::Atom => FeedInfo {
            dialect,
            title: root.child_text("title").unwrap_or_default(),
            link: atom_link(root).unwrap_or_default(),
            description: root.child_text("subtitle").unwrap_or_default(),
            language: root_lang,
            thumbnail: root
                .child_text("logo")
                .or_else(|| root.child_text("icon"))
                .unwrap_or_else(|| DEFAULT_THUMBNAIL_URL.to_string()),
        },
    })
}
