//! RSS 2.0, RSS 1.0 (RDF) and Atom documents.
//!
//! The root element decides the format; each format is read with serde
//! through quick-xml and mapped onto [`FeedDocument`].

use super::{FeedDocument, FeedItem};
use quick_xml::Reader;
use quick_xml::events::Event;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FeedParseError {
    #[error("not a feed document (root element `{0}`)")]
    UnknownRoot(String),
    #[error("document has no root element")]
    NoRoot,
    #[error("malformed XML: {0}")]
    Xml(#[from] quick_xml::DeError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FeedFormat {
    Rss,
    Rdf,
    Atom,
}

/// Local name of the first element.
fn root_element(xml: &str) -> Result<String, FeedParseError> {
    let mut reader = Reader::from_str(xml);
    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) | Ok(Event::Empty(e)) => {
                return Ok(String::from_utf8_lossy(e.local_name().as_ref()).into_owned());
            }
            Ok(Event::Eof) => return Err(FeedParseError::NoRoot),
            Err(e) => return Err(FeedParseError::Xml(e.into())),
            Ok(_) => {}
        }
    }
}

fn detect(xml: &str) -> Result<FeedFormat, FeedParseError> {
    match root_element(xml)?.as_str() {
        "rss" => Ok(FeedFormat::Rss),
        "RDF" => Ok(FeedFormat::Rdf),
        "feed" => Ok(FeedFormat::Atom),
        other => Err(FeedParseError::UnknownRoot(other.to_owned())),
    }
}

/// Parse a feed document of any supported format.
pub fn parse_feed(xml: &str) -> Result<FeedDocument, FeedParseError> {
    match detect(xml)? {
        FeedFormat::Rss => {
            let doc: RssDocument = quick_xml::de::from_str(xml)?;
            Ok(FeedDocument {
                title: text(doc.channel.title),
                items: doc.channel.items.into_iter().map(RssItem::into_item).collect(),
            })
        }
        FeedFormat::Rdf => {
            let doc: RdfDocument = quick_xml::de::from_str(xml)?;
            Ok(FeedDocument {
                title: doc.channel.and_then(|c| text(c.title)),
                items: doc.items.into_iter().map(RssItem::into_item).collect(),
            })
        }
        FeedFormat::Atom => {
            let doc: AtomFeed = quick_xml::de::from_str(xml)?;
            Ok(FeedDocument {
                title: text(doc.title),
                items: doc.entries.into_iter().map(AtomEntry::into_item).collect(),
            })
        }
    }
}

// ---------------------------------------------------------------------------
// Shared pieces
// ---------------------------------------------------------------------------

/// Text content of an element, attributes ignored.
#[derive(Debug, Default, Deserialize)]
struct TextNode {
    #[serde(rename = "$text", default)]
    value: String,
}

fn text(node: Option<TextNode>) -> Option<String> {
    node.map(|n| n.value.trim().to_owned())
        .filter(|s| !s.is_empty())
}

/// First non-empty text among repeated elements.
fn first_text(nodes: Vec<TextNode>) -> Option<String> {
    nodes.into_iter().find_map(|n| text(Some(n)))
}

// ---------------------------------------------------------------------------
// RSS 2.0 / 1.0
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RssDocument {
    channel: RssChannel,
}

#[derive(Debug, Deserialize)]
struct RssChannel {
    title: Option<TextNode>,
    #[serde(rename = "item", default)]
    items: Vec<RssItem>,
}

#[derive(Debug, Deserialize)]
struct RdfDocument {
    channel: Option<RdfChannel>,
    #[serde(rename = "item", default)]
    items: Vec<RssItem>,
}

#[derive(Debug, Deserialize)]
struct RdfChannel {
    title: Option<TextNode>,
}

#[derive(Debug, Deserialize)]
struct RssItem {
    title: Option<TextNode>,
    // `<atom:link>` shares the local name, so links repeat.
    #[serde(rename = "link", default)]
    links: Vec<TextNode>,
    guid: Option<TextNode>,
    description: Option<TextNode>,
    #[serde(rename = "author", default)]
    authors: Vec<TextNode>,
    #[serde(rename = "dc:creator", alias = "creator", default)]
    creators: Vec<TextNode>,
    #[serde(rename = "pubDate")]
    pub_date: Option<TextNode>,
    #[serde(rename = "dc:date", alias = "date")]
    dc_date: Option<TextNode>,
}

impl RssItem {
    fn into_item(self) -> FeedItem {
        FeedItem {
            guid: text(self.guid),
            title: text(self.title),
            link: first_text(self.links),
            author: first_text(self.authors).or_else(|| first_text(self.creators)),
            published: text(self.pub_date).or_else(|| text(self.dc_date)),
            description: text(self.description),
        }
    }
}

// ---------------------------------------------------------------------------
// Atom
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct AtomFeed {
    title: Option<TextNode>,
    #[serde(rename = "entry", default)]
    entries: Vec<AtomEntry>,
}

#[derive(Debug, Deserialize)]
struct AtomEntry {
    id: Option<TextNode>,
    title: Option<TextNode>,
    #[serde(rename = "link", default)]
    links: Vec<AtomLink>,
    published: Option<TextNode>,
    updated: Option<TextNode>,
    summary: Option<TextNode>,
    #[serde(rename = "author", default)]
    authors: Vec<AtomAuthor>,
}

#[derive(Debug, Deserialize)]
struct AtomLink {
    #[serde(rename = "@href")]
    href: Option<String>,
    #[serde(rename = "@rel")]
    rel: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AtomAuthor {
    name: Option<TextNode>,
}

impl AtomEntry {
    /// The `alternate` link, or the first link without a `rel`.
    fn permalink(&self) -> Option<String> {
        self.links
            .iter()
            .find(|l| l.rel.as_deref() == Some("alternate"))
            .or_else(|| self.links.iter().find(|l| l.rel.is_none()))
            .and_then(|l| l.href.clone())
            .filter(|href| !href.is_empty())
    }

    fn into_item(self) -> FeedItem {
        let link = self.permalink();
        FeedItem {
            guid: text(self.id),
            title: text(self.title),
            link,
            author: self.authors.into_iter().find_map(|a| text(a.name)),
            published: text(self.published).or_else(|| text(self.updated)),
            description: text(self.summary),
        }
    }
}
