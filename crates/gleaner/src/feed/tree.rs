//! Owned XML element tree with a structural writer.
//!
//! Names are kept exactly as written (`media:thumbnail`, `atom:link`), which is
//! how feed extensions are matched in practice. Comments, processing
//! instructions and doctypes are dropped.

use quick_xml::Reader;
use quick_xml::Writer;
use quick_xml::events::{BytesCData, BytesEnd, BytesStart, BytesText, Event};

use super::error::{FeedError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Node {
    Element(Element),
    Text(String),
    CData(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Element {
    pub name: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Element {
    fn from_start(start: &BytesStart<'_>) -> Result<Self> {
        let name = decode_name(start.name().as_ref())?;
        let mut attrs = Vec::new();
        for attr in start.attributes() {
            let attr = attr.map_err(|e| FeedError::invalid(format!("bad attribute in <{name}>: {e}")))?;
            let key = decode_name(attr.key.as_ref())?;
            let value = match attr.unescape_value() {
                Ok(value) => value.into_owned(),
                // Undeclared HTML entities such as `&nbsp;` are kept verbatim.
                Err(_) => String::from_utf8_lossy(&attr.value).into_owned(),
            };
            attrs.push((key, value));
        }
        Ok(Self {
            name,
            attrs,
            children: Vec::new(),
        })
    }

    /// Local part of the name, without any namespace prefix.
    pub fn local_name(&self) -> &str {
        self.name.rsplit(':').next().unwrap_or(&self.name)
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Child elements in document order.
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|node| match node {
            Node::Element(el) => Some(el),
            _ => None,
        })
    }

    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> {
        self.elements().filter(move |el| el.name == name)
    }

    pub fn child(&self, name: &str) -> Option<&Element> {
        self.elements().find(|el| el.name == name)
    }

    /// All descendant text, CDATA included, concatenated in document order.
    pub fn text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        for node in &self.children {
            match node {
                Node::Text(text) | Node::CData(text) => out.push_str(text),
                Node::Element(el) => el.collect_text(out),
            }
        }
    }

    /// Trimmed text of the first child named `name`, if non-empty.
    pub fn child_text(&self, name: &str) -> Option<String> {
        self.child(name)
            .map(|el| el.text().trim().to_string())
            .filter(|text| !text.is_empty())
    }

    fn start_event(&self) -> BytesStart<'_> {
        let mut start = BytesStart::new(self.name.as_str());
        for (key, value) in &self.attrs {
            start.push_attribute((key.as_str(), value.as_str()));
        }
        start
    }
}

fn decode_name(raw: &[u8]) -> Result<String> {
    std::str::from_utf8(raw)
        .map(str::to_string)
        .map_err(|e| FeedError::invalid(format!("element name is not UTF-8: {e}")))
}

fn attach(stack: &mut [Element], root: &mut Option<Element>, el: Element) -> Result<()> {
    match stack.last_mut() {
        Some(parent) => parent.children.push(Node::Element(el)),
        None if root.is_none() => *root = Some(el),
        None => {
            return Err(FeedError::invalid(format!(
                "second root element <{}>",
                el.name
            )));
        }
    }
    Ok(())
}

/// Parse a whole document into its root element.
pub(crate) fn parse_document(xml: &str) -> Result<Element> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().trim_text(false);

    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        let event = reader.read_event().map_err(|e| {
            FeedError::invalid(format!(
                "{e} at position {}",
                reader.error_position()
            ))
        })?;

        match event {
            Event::Start(start) => {
                if root.is_some() && stack.is_empty() {
                    return Err(FeedError::invalid("content after the root element"));
                }
                stack.push(Element::from_start(&start)?);
            }
            Event::Empty(start) => {
                let el = Element::from_start(&start)?;
                attach(&mut stack, &mut root, el)?;
            }
            Event::End(_) => {
                let el = stack
                    .pop()
                    .ok_or_else(|| FeedError::invalid("unexpected closing tag"))?;
                attach(&mut stack, &mut root, el)?;
            }
            Event::Text(text) => {
                let value = match text.unescape() {
                    Ok(value) => value.into_owned(),
                    Err(_) => String::from_utf8_lossy(&text).into_owned(),
                };
                match stack.last_mut() {
                    Some(parent) => parent.children.push(Node::Text(value)),
                    None if value.trim().is_empty() => {}
                    None => return Err(FeedError::invalid("text outside the root element")),
                }
            }
            Event::CData(cdata) => {
                let value = String::from_utf8_lossy(&cdata).into_owned();
                match stack.last_mut() {
                    Some(parent) => parent.children.push(Node::CData(value)),
                    None => return Err(FeedError::invalid("CDATA outside the root element")),
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(FeedError::invalid(format!("unclosed element <{}>", open.name)));
    }
    root.ok_or_else(|| FeedError::invalid("document has no root element"))
}

/// Serialize `leaf` wrapped in the start tags of `ancestors`, outermost first.
///
/// Ancestors contribute only their name and attributes, so namespace
/// declarations survive while sibling content is left out.
pub(crate) fn write_fragment(ancestors: &[&Element], leaf: &Element) -> Result<String> {
    let mut writer = Writer::new(Vec::new());

    for ancestor in ancestors {
        writer
            .write_event(Event::Start(ancestor.start_event()))
            .map_err(write_error)?;
    }
    write_element(&mut writer, leaf)?;
    for ancestor in ancestors.iter().rev() {
        writer
            .write_event(Event::End(BytesEnd::new(ancestor.name.as_str())))
            .map_err(write_error)?;
    }

    String::from_utf8(writer.into_inner()).map_err(|e| FeedError::invalid(e.to_string()))
}

fn write_element(writer: &mut Writer<Vec<u8>>, el: &Element) -> Result<()> {
    if el.children.is_empty() {
        return writer
            .write_event(Event::Empty(el.start_event()))
            .map_err(write_error);
    }

    writer
        .write_event(Event::Start(el.start_event()))
        .map_err(write_error)?;
    for node in &el.children {
        match node {
            Node::Element(child) => write_element(writer, child)?,
            Node::Text(text) => writer
                .write_event(Event::Text(BytesText::new(text)))
                .map_err(write_error)?,
            Node::CData(text) => writer
                .write_event(Event::CData(BytesCData::new(text.as_str())))
                .map_err(write_error)?,
        }
    }
    writer
        .write_event(Event::End(BytesEnd::new(el.name.as_str())))
        .map_err(write_error)
}

fn write_error(e: impl std::fmt::Display) -> FeedError {
    FeedError::invalid(format!("failed to serialize fragment: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_keeps_prefixed_names_attributes_and_cdata() {
        let root = parse_document(
            r#"<?xml version="1.0"?>
<rss xmlns:media="http://search.yahoo.com/mrss/" version="2.0">
  <channel>
    <item><media:thumbnail url="a.jpg?x=1&amp;y=2"/><description><![CDATA[<b>hi</b>]]></description></item>
  </channel>
</rss>"#,
        )
        .expect("well-formed");

        assert_eq!(root.name, "rss");
        assert_eq!(root.attr("version"), Some("2.0"));
        let item = root.child("channel").and_then(|c| c.child("item")).unwrap();
        assert_eq!(
            item.child("media:thumbnail").and_then(|t| t.attr("url")),
            Some("a.jpg?x=1&y=2")
        );
        assert_eq!(item.child("media:thumbnail").unwrap().local_name(), "thumbnail");
        assert_eq!(item.child_text("description").as_deref(), Some("<b>hi</b>"));
    }

    #[test]
    fn child_and_children_named_match_exact_names() {
        let root = parse_document("<opml><body><outline a=\"1\"/><x/><outline a=\"2\"/></body></opml>")
            .unwrap();
        let body = root.child("body").unwrap();
        let wanted = String::from("outline");

        let attrs: Vec<_> = body
            .children_named(&wanted)
            .filter_map(|el| el.attr("a"))
            .collect();
        assert_eq!(attrs, ["1", "2"]);
        assert_eq!(body.child(&wanted).and_then(|el| el.attr("a")), Some("1"));
        assert!(body.child("missing").is_none());
    }

    #[test]
    fn parse_rejects_malformed_documents() {
        for doc in [
            "",
            "not xml at all",
            "<rss><channel></rss>",
            "<rss><channel>",
            "<a/><b/>",
        ] {
            let err = parse_document(doc).expect_err(doc);
            assert!(matches!(err, FeedError::InvalidFeed { .. }), "{doc}: {err:?}");
        }
    }

    #[test]
    fn write_fragment_round_trips_the_leaf() {
        let root = parse_document(
            r#"<feed xmlns="http://www.w3.org/2005/Atom"><entry><title>a &lt; b</title><link href="x?a=1&amp;b=2"/></entry></feed>"#,
        )
        .unwrap();
        let entry = root.child("entry").unwrap();

        let fragment = write_fragment(&[&root], entry).unwrap();
        let reparsed = parse_document(&fragment).unwrap();

        assert_eq!(reparsed.attrs, root.attrs);
        assert_eq!(reparsed.child("entry"), Some(entry));
        assert_eq!(write_fragment(&[&reparsed], reparsed.child("entry").unwrap()).unwrap(), fragment);
    }
}
