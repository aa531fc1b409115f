//! OPML subscription lists.
//!
//! A user on the feed provider is identified by the URL of an OPML export;
//! every outline with an `xmlUrl` becomes a subscription.

use serde::{Deserialize, Serialize};
use url::Url;

use crate::http::HttpTransport;
use crate::retry::RetryConfig;

use super::error::{FeedError, Result};
use super::fetch::fetch_document;
use super::tree::{Element, parse_document};

const OPML_ACCEPT: &str = "text/x-opml, application/xml;q=0.9, text/xml;q=0.8";

/// One feed listed in an OPML document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpmlOutline {
    pub title: String,
    pub xml_url: String,
    pub html_url: Option<String>,
}

/// Collect every feed outline, nested folders included, in document order.
pub fn parse_opml(text: &str) -> Result<Vec<OpmlOutline>> {
    let root = parse_document(text)?;
    if root.name != "opml" {
        return Err(FeedError::UnsupportedFormat { root: root.name });
    }

    let mut outlines = Vec::new();
    if let Some(body) = root.child("body") {
        collect_outlines(body, &mut outlines);
    }
    Ok(outlines)
}

fn collect_outlines(parent: &Element, out: &mut Vec<OpmlOutline>) {
    for outline in parent.children_named("outline") {
        if let Some(xml_url) = outline.attr("xmlUrl").map(str::trim).filter(|u| !u.is_empty()) {
            let title = outline
                .attr("title")
                .or_else(|| outline.attr("text"))
                .unwrap_or(xml_url);
            out.push(OpmlOutline {
                title: title.to_string(),
                xml_url: xml_url.to_string(),
                html_url: outline.attr("htmlUrl").map(str::to_string),
            });
        }
        collect_outlines(outline, out);
    }
}

/// Fetch and parse an OPML document. A 404 yields no outlines.
pub async fn get_opml_outlines(
    transport: &dyn HttpTransport,
    url: &str,
    retry: &RetryConfig,
) -> Result<Vec<OpmlOutline>> {
    let Some(body) = fetch_document(transport, url, OPML_ACCEPT, retry).await? else {
        return Ok(Vec::new());
    };
    let mut outlines = parse_opml(&body)?;
    if let Ok(base) = Url::parse(url) {
        for outline in &mut outlines {
            outline.xml_url = resolve(&base, &outline.xml_url);
            if let Some(html_url) = &outline.html_url {
                outline.html_url = Some(resolve(&base, html_url));
            }
        }
    }
    Ok(outlines)
}

/// Resolve a possibly relative outline URL against the document URL.
fn resolve(base: &Url, href: &str) -> String {
    base.join(href)
        .map(String::from)
        .unwrap_or_else(|_| href.to_string())
}
