//! Feed normalization for RSS and Atom.
//!
//! Documents are parsed into an owned element tree, the dialect is picked
//! from the root element, and each item is reduced to a [`FeedItem`] through
//! per-field fallback chains. Every item also carries `raw_data`: the
//! document root's start tag (namespace declarations included), the RSS
//! `channel` start tag when present, and the item subtree, re-serialized
//! structurally. Parsing `raw_data` yields the same item again.
//!
//! # Example
//!
//! ```ignore
//! use gleaner::feed::{get_feed_items, parse_feed_items};
//!
//! let items = parse_feed_items(&xml)?;
//! let again = parse_feed_items(&items[0].raw_data)?;
//! assert_eq!(again, vec![items[0].clone()]);
//! ```

mod date;
mod error;
mod fetch;
mod model;
mod opml;
mod parse;
mod tree;

pub use error::{FeedError, Result};
pub use fetch::{
    get_feed_info, get_feed_info_with_retry, get_feed_items, get_feed_items_with_retry,
};
pub use model::{DEFAULT_THUMBNAIL_URL, FeedDialect, FeedInfo, FeedItem};
pub use opml::{OpmlOutline, get_opml_outlines, parse_opml};
pub use parse::{FeedDocument, parse_feed_document, parse_feed_info, parse_feed_items};

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};

    use super::*;
    use crate::http::MockTransport;
    use crate::retry::RetryConfig;
    use crate::sync::epoch;

    const RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0"
     xmlns:media="http://search.yahoo.com/mrss/"
     xmlns:itunes="http://www.itunes.com/dtds/podcast-1.0.dtd"
     xmlns:content="http://purl.org/rss/1.0/modules/content/"
     xmlns:dc="http://purl.org/dc/elements/1.1/">
  <channel>
    <title>Example Podcast</title>
    <link>https://podcast.example.com</link>
    <description>Weekly &amp; occasionally daily</description>
    <language>en-us</language>
    <image><url>https://podcast.example.com/cover.png</url></image>
    <item>
      <title>Episode 2</title>
      <link>https://podcast.example.com/2</link>
      <description><![CDATA[<p>Second <img src="https://cdn.example.com/2.jpg"> episode</p>]]></description>
      <pubDate>Tue, 05 Mar 2024 10:00:00 +0000</pubDate>
    </item>
    <item>
      <title>Episode 1</title>
      <guid>https://podcast.example.com/1</guid>
      <itunes:image href="https://cdn.example.com/1.jpg"/>
      <content:encoded>Full text</content:encoded>
      <dc:date>2024-02-27T10:00:00Z</dc:date>
    </item>
    <item>
      <guid isPermaLink="false">abc-123</guid>
      <enclosure url="https://cdn.example.com/0.mp3" type="audio/mpeg" length="1"/>
      <pubDate>not a date</pubDate>
    </item>
  </channel>
</rss>"#;

    const ATOM: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom"
      xmlns:yt="http://www.youtube.com/xml/schemas/2015"
      xmlns:media="http://search.yahoo.com/mrss/"
      xml:lang="en">
  <title>Example Channel</title>
  <subtitle>Videos about things</subtitle>
  <link rel="self" href="https://www.youtube.com/feeds/videos.xml?channel_id=UC1"/>
  <link rel="alternate" href="https://www.youtube.com/channel/UC1"/>
  <entry>
    <id>yt:video:abc</id>
    <yt:videoId>abc</yt:videoId>
    <title>First video</title>
    <link rel="alternate" href="https://www.youtube.com/watch?v=abc"/>
    <published>2024-03-01T12:00:00+00:00</published>
    <updated>2024-03-02T12:00:00+00:00</updated>
    <media:group>
      <media:title>First video</media:title>
      <media:thumbnail url="https://i.ytimg.com/vi/abc/hqdefault.jpg" width="480" height="360"/>
      <media:description>Watch &lt;this&gt;</media:description>
    </media:group>
  </entry>
  <entry>
    <title type="html">Second &amp;amp; last</title>
    <link href="https://example.com/second"/>
    <updated>2024-03-03T08:00:00Z</updated>
    <summary>Short</summary>
  </entry>
</feed>"#;

    #[test]
    fn rss_items_follow_fallback_chains() {
        let items = parse_feed_items(RSS).expect("valid rss");
        assert_eq!(items.len(), 3);

        assert_eq!(items[0].title, "Episode 2");
        assert_eq!(items[0].link, "https://podcast.example.com/2");
        assert_eq!(items[0].thumbnail, "https://cdn.example.com/2.jpg");
        assert_eq!(
            items[0].published,
            Utc.with_ymd_and_hms(2024, 3, 5, 10, 0, 0).unwrap()
        );

        assert_eq!(items[1].link, "https://podcast.example.com/1");
        assert_eq!(items[1].thumbnail, "https://cdn.example.com/1.jpg");
        assert_eq!(items[1].description, "Full text");
        assert_eq!(
            items[1].published,
            Utc.with_ymd_and_hms(2024, 2, 27, 10, 0, 0).unwrap()
        );

        assert_eq!(items[2].title, "");
        assert_eq!(items[2].link, "https://cdn.example.com/0.mp3");
        assert_eq!(items[2].thumbnail, DEFAULT_THUMBNAIL_URL);
        assert_eq!(items[2].published, epoch());
    }

    #[test]
    fn rss_info_reads_channel_metadata() {
        let info = parse_feed_info(RSS).expect("valid rss");
        assert_eq!(info.dialect, FeedDialect::Rss);
        assert_eq!(info.title, "Example Podcast");
        assert_eq!(info.link, "https://podcast.example.com");
        assert_eq!(info.description, "Weekly & occasionally daily");
        assert_eq!(info.language.as_deref(), Some("en-us"));
        assert_eq!(info.thumbnail, "https://podcast.example.com/cover.png");
    }

    #[test]
    fn atom_entries_follow_fallback_chains() {
        let items = parse_feed_items(ATOM).expect("valid atom");
        assert_eq!(items.len(), 2);

        assert_eq!(items[0].title, "First video");
        assert_eq!(items[0].link, "https://www.youtube.com/watch?v=abc");
        assert_eq!(items[0].thumbnail, "https://i.ytimg.com/vi/abc/hqdefault.jpg");
        assert_eq!(items[0].description, "Watch <this>");
        assert_eq!(
            items[0].published,
            Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
        );

        assert_eq!(items[1].title, "Second &amp; last");
        assert_eq!(items[1].link, "https://example.com/second");
        assert_eq!(items[1].description, "Short");
        assert_eq!(
            items[1].published,
            Utc.with_ymd_and_hms(2024, 3, 3, 8, 0, 0).unwrap()
        );
    }

    #[test]
    fn atom_info_uses_alternate_link_and_root_language() {
        let info = parse_feed_info(ATOM).expect("valid atom");
        assert_eq!(info.dialect, FeedDialect::Atom);
        assert_eq!(info.title, "Example Channel");
        assert_eq!(info.link, "https://www.youtube.com/channel/UC1");
        assert_eq!(info.description, "Videos about things");
        assert_eq!(info.language.as_deref(), Some("en"));
        assert_eq!(info.thumbnail, DEFAULT_THUMBNAIL_URL);
    }

    #[test]
    fn raw_data_reparses_to_the_identical_item() {
        for doc in [RSS, ATOM] {
            let items = parse_feed_items(doc).expect("valid feed");
            assert!(!items.is_empty());
            for item in items {
                let reparsed = parse_feed_items(&item.raw_data).expect("raw_data is a feed");
                assert_eq!(reparsed, vec![item.clone()], "raw_data: {}", item.raw_data);
            }
        }
    }

    #[test]
    fn raw_data_keeps_namespace_declarations() {
        let items = parse_feed_items(ATOM).unwrap();
        let raw = &items[0].raw_data;
        assert!(raw.starts_with("<feed "), "{raw}");
        assert!(raw.contains("xmlns:media=\"http://search.yahoo.com/mrss/\""), "{raw}");
        assert!(!raw.contains("Second"), "sibling entries must not leak: {raw}");
    }

    #[test]
    fn rss1_items_live_beside_the_channel() {
        let doc = r#"<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#" xmlns="http://purl.org/rss/1.0/" xmlns:dc="http://purl.org/dc/elements/1.1/">
  <channel><title>Old school</title><link>https://old.example.com</link></channel>
  <item><title>One</title><link>https://old.example.com/1</link><dc:date>2003-01-01T00:00:00Z</dc:date></item>
</rdf:RDF>"#;
        let doc_parsed = parse_feed_document(doc).expect("valid rss 1.0");
        assert_eq!(doc_parsed.info.title, "Old school");
        assert_eq!(doc_parsed.items.len(), 1);
        assert_eq!(doc_parsed.items[0].link, "https://old.example.com/1");

        let again = parse_feed_items(&doc_parsed.items[0].raw_data).unwrap();
        assert_eq!(again, doc_parsed.items);
    }

    #[test]
    fn malformed_xml_is_invalid_feed() {
        let err = parse_feed_items("<rss><channel><item></channel></rss>").expect_err("malformed");
        assert!(matches!(err, FeedError::InvalidFeed { .. }));
    }

    #[test]
    fn unknown_root_is_unsupported() {
        let err = parse_feed_items("<html><body/></html>").expect_err("not a feed");
        match err {
            FeedError::UnsupportedFormat { root } => assert_eq!(root, "html"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn prefixed_atom_root_is_unsupported() {
        let doc = r#"<atom:feed xmlns:atom="http://www.w3.org/2005/Atom">
  <atom:title>Prefixed</atom:title>
  <atom:entry><atom:title>One</atom:title><atom:link href="https://p.example.com/1"/></atom:entry>
</atom:feed>"#;
        match parse_feed_items(doc).expect_err("prefixed root") {
            FeedError::UnsupportedFormat { root } => assert_eq!(root, "atom:feed"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn empty_channel_has_no_items() {
        let items = parse_feed_items("<rss><channel><title>x</title></channel></rss>").unwrap();
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn not_found_feed_yields_no_items() {
        let transport = MockTransport::new();
        let url = "https://gone.example.com/feed.xml";
        transport.push_status(url, 404);

        let items = get_feed_items(&transport, url).await.expect("404 is not an error");
        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn not_found_feed_info_is_an_error() {
        let transport = MockTransport::new();
        let url = "https://gone.example.com/feed.xml";
        transport.push_status(url, 404);

        let err = get_feed_info(&transport, url).await.expect_err("no metadata");
        assert!(matches!(err, FeedError::NotFound { .. }));
    }

    #[tokio::test]
    async fn other_statuses_are_typed_errors() {
        let transport = MockTransport::new();
        let url = "https://private.example.com/feed.xml";
        transport.push_status(url, 403);

        let err = get_feed_items_with_retry(&transport, url, &RetryConfig::disabled())
            .await
            .expect_err("403 should fail");
        match err {
            FeedError::Http { status, .. } => assert_eq!(status, 403),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn transport_failures_are_retried() {
        let transport = MockTransport::new();
        let url = "https://flaky.example.com/feed.xml";
        transport.push_error(url, "connection reset");
        transport.push_status(url, 503);
        transport.push_body(url, RSS);

        let items = get_feed_items(&transport, url).await.expect("third attempt succeeds");
        assert_eq!(items.len(), 3);
        assert_eq!(transport.requests().len(), 3);
        assert_eq!(
            crate::http::header_get(&transport.requests()[0].headers, "accept"),
            Some(crate::http::FEED_ACCEPT)
        );
    }

    #[tokio::test]
    async fn malformed_body_is_invalid_feed() {
        let transport = MockTransport::new();
        let url = "https://broken.example.com/feed.xml";
        transport.push_body(url, "<rss><channel>");

        let err = get_feed_items(&transport, url).await.expect_err("malformed");
        assert!(matches!(err, FeedError::InvalidFeed { .. }));
    }
}
