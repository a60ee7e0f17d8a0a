//! RSS 2.0 writer for filtered feeds.
//!
//! Output is built event-by-event with `quick-xml` so that optional
//! elements (channel description, enclosure attributes, authors) can be
//! omitted outright instead of being written empty.

use chrono::Utc;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;
use std::io::Cursor;

use super::codec::CodecError;
use super::types::{AuthorRecord, FeedEntry, OutputChannel};

const ITUNES_NS: &str = "http://www.itunes.com/dtds/podcast-1.0.dtd";
const CONTENT_NS: &str = "http://purl.org/rss/1.0/modules/content/";
const DC_NS: &str = "http://purl.org/dc/elements/1.1/";
/// Namespace for item data RSS 2.0 has no repeatable element for: the
/// second and later enclosures and content blocks.
const EXTRAS_NS: &str = "urn:podfilter:extras";
pub(crate) const EXTRAS_PREFIX: &str = "podfilter";
const EXTRA_ENCLOSURE: &str = "podfilter:enclosure";
const EXTRA_CONTENT: &str = "podfilter:content";
const GENERATOR: &str = concat!("podfilter ", env!("CARGO_PKG_VERSION"));

type XmlWriter = Writer<Cursor<Vec<u8>>>;

fn render_err(e: impl std::fmt::Display) -> CodecError {
    CodecError::Render(e.to_string())
}

fn start(writer: &mut XmlWriter, element: BytesStart<'_>) -> Result<(), CodecError> {
    writer.write_event(Event::Start(element)).map_err(render_err)
}

fn end(writer: &mut XmlWriter, name: &str) -> Result<(), CodecError> {
    writer
        .write_event(Event::End(BytesEnd::new(name)))
        .map_err(render_err)
}

fn text_element(writer: &mut XmlWriter, name: &str, text: &str) -> Result<(), CodecError> {
    start(writer, BytesStart::new(name))?;
    writer
        .write_event(Event::Text(BytesText::new(text)))
        .map_err(render_err)?;
    end(writer, name)
}

/// Renders channel metadata and entries as an RSS 2.0 document.
///
/// Entries appear in slice order. Every entry field is optional; absent
/// fields produce no element.
pub fn render_rss(channel: &OutputChannel, entries: &[FeedEntry]) -> Result<Vec<u8>, CodecError> {
    let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);

    writer
        .write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))
        .map_err(render_err)?;

    let mut rss = BytesStart::new("rss");
    rss.push_attribute(("version", "2.0"));
    rss.push_attribute(("xmlns:itunes", ITUNES_NS));
    rss.push_attribute(("xmlns:content", CONTENT_NS));
    rss.push_attribute(("xmlns:dc", DC_NS));
    rss.push_attribute(("xmlns:podfilter", EXTRAS_NS));
    start(&mut writer, rss)?;
    start(&mut writer, BytesStart::new("channel"))?;

    text_element(&mut writer, "title", &channel.title)?;
    if let Some(link) = &channel.link {
        text_element(&mut writer, "link", link)?;
    }
    if let Some(description) = &channel.description {
        text_element(&mut writer, "description", description)?;
    }
    text_element(&mut writer, "lastBuildDate", &Utc::now().to_rfc2822())?;
    text_element(&mut writer, "generator", GENERATOR)?;
    if channel.private {
        text_element(&mut writer, "itunes:block", "yes")?;
    }

    for entry in entries {
        write_item(&mut writer, entry)?;
    }

    end(&mut writer, "channel")?;
    end(&mut writer, "rss")?;

    let mut bytes = writer.into_inner().into_inner();
    bytes.push(b'\n');
    Ok(bytes)
}

fn write_item(writer: &mut XmlWriter, entry: &FeedEntry) -> Result<(), CodecError> {
    start(writer, BytesStart::new("item"))?;

    if let Some(title) = &entry.title {
        text_element(writer, "title", title)?;
    }
    if let Some(link) = &entry.link {
        text_element(writer, "link", link)?;
    }
    if let Some(description) = entry.summary.as_ref().or(entry.description.as_ref()) {
        text_element(writer, "description", description)?;
    }
    if let Some(identity) = entry.identity() {
        let mut guid = BytesStart::new("guid");
        guid.push_attribute(("isPermaLink", "false"));
        start(writer, guid)?;
        writer
            .write_event(Event::Text(BytesText::new(identity)))
            .map_err(render_err)?;
        end(writer, "guid")?;
    }
    if let Some(published) = &entry.published {
        text_element(writer, "pubDate", published)?;
    }

    // At most one <author>; author lists are all dc:creator.
    match entry.authors.as_slice() {
        [only] if only.email.is_some() => {
            if let Some(text) = author_text(only) {
                text_element(writer, "author", &text)?;
            }
        }
        authors => {
            for text in authors.iter().filter_map(author_text) {
                text_element(writer, "dc:creator", &text)?;
            }
        }
    }

    let mut content = entry.content.iter();
    if let Some(first) = content.next() {
        text_element(writer, "content:encoded", &first.value)?;
    }
    for block in content {
        let mut element = BytesStart::new(EXTRA_CONTENT);
        if let Some(mime_type) = &block.mime_type {
            element.push_attribute(("type", mime_type.as_str()));
        }
        start(writer, element)?;
        writer
            .write_event(Event::Text(BytesText::new(&block.value)))
            .map_err(render_err)?;
        end(writer, EXTRA_CONTENT)?;
    }

    for (i, enclosure) in entry.enclosures.iter().enumerate() {
        let length = enclosure.length.map(|l| l.to_string());
        let mut element = BytesStart::new(if i == 0 { "enclosure" } else { EXTRA_ENCLOSURE });
        element.push_attribute(("url", enclosure.href.as_str()));
        if let Some(length) = &length {
            element.push_attribute(("length", length.as_str()));
        }
        if let Some(mime_type) = &enclosure.mime_type {
            element.push_attribute(("type", mime_type.as_str()));
        }
        writer
            .write_event(Event::Empty(element))
            .map_err(render_err)?;
    }

    end(writer, "item")
}

/// `email (Name)`, bare email, or bare name.
fn author_text(author: &AuthorRecord) -> Option<String> {
    match (&author.email, &author.name) {
        (Some(email), Some(name)) => Some(format!("{} ({})", email, name)),
        (Some(email), None) => Some(email.clone()),
        (None, Some(name)) => Some(name.clone()),
        (None, None) => None,
    }
}
