use std::collections::HashMap;

use super::author::{extract_authors, AuthorValue};
use super::codec::CodecError;
use super::render::EXTRAS_PREFIX;
use super::types::{ContentBlock, DecodedFeed, Enclosure, FeedEntry, RemoteChannel};

/// Decodes a feed, trying RSS 2.0 first and falling back to Atom.
pub fn parse_feed(bytes: &[u8]) -> Result<DecodedFeed, CodecError> {
    match rss::Channel::read_from(bytes) {
        Ok(channel) => {
            tracing::debug!(items = channel.items().len(), "Decoded feed as RSS");
            Ok(from_rss(&channel))
        }
        Err(rss_err) => match atom_syndication::Feed::read_from(bytes) {
            Ok(feed) => {
                tracing::debug!(entries = feed.entries().len(), "Decoded feed as Atom");
                Ok(from_atom(&feed))
            }
            Err(atom_err) => Err(CodecError::Unrecognized {
                rss: rss_err.to_string(),
                atom: atom_err.to_string(),
            }),
        },
    }
}

fn non_empty(s: &str) -> Option<String> {
    if s.trim().is_empty() {
        None
    } else {
        Some(s.to_string())
    }
}

/// Empty attributes count as absent.
fn enclosure(url: &str, length: Option<&str>, mime_type: Option<&str>) -> Option<Enclosure> {
    non_empty(url).map(|href| Enclosure {
        href,
        length: length.and_then(|len| len.trim().parse().ok()),
        mime_type: mime_type.and_then(non_empty),
    })
}

fn from_rss(channel: &rss::Channel) -> DecodedFeed {
    let summary = channel
        .itunes_ext()
        .and_then(|ext| ext.summary())
        .and_then(non_empty);

    DecodedFeed {
        channel: RemoteChannel {
            title: non_empty(channel.title()),
            link: non_empty(channel.link()),
            description: non_empty(channel.description()),
            subtitle: None,
            summary,
        },
        entries: channel.items().iter().map(rss_entry).collect(),
    }
}

fn rss_entry(item: &rss::Item) -> FeedEntry {
    let mut author_fields = HashMap::new();
    let author = item
        .author()
        .or_else(|| item.itunes_ext().and_then(|ext| ext.author()));
    if let Some(author) = author {
        author_fields.insert("author", AuthorValue::text(author));
    }
    if let Some(dc) = item.dublin_core_ext() {
        if !dc.creators().is_empty() {
            author_fields.insert(
                "dc_creator",
                AuthorValue::List(dc.creators().iter().map(AuthorValue::text).collect()),
            );
        }
    }

    let extras = item.extensions().get(EXTRAS_PREFIX);
    let extra = |name: &str| {
        extras
            .and_then(|ext| ext.get(name))
            .map(Vec::as_slice)
            .unwrap_or_default()
    };

    let content = item
        .content()
        .and_then(non_empty)
        .map(|value| ContentBlock {
            value,
            mime_type: Some("text/html".to_string()),
        })
        .into_iter()
        .chain(extra("content").iter().filter_map(|ext| {
            ext.value().and_then(non_empty).map(|value| ContentBlock {
                value,
                mime_type: ext.attrs().get("type").and_then(|t| non_empty(t)),
            })
        }))
        .collect();

    let enclosures = item
        .enclosure()
        .and_then(|enc| enclosure(enc.url(), Some(enc.length()), Some(enc.mime_type())))
        .into_iter()
        .chain(extra("enclosure").iter().filter_map(|ext| {
            let attr = |key: &str| ext.attrs().get(key).map(String::as_str);
            enclosure(attr("url")?, attr("length"), attr("type"))
        }))
        .collect();

    FeedEntry {
        id: item.guid().and_then(|g| non_empty(g.value())),
        title: item.title().and_then(non_empty),
        description: item.description().and_then(non_empty),
        summary: None,
        link: item.link().and_then(non_empty),
        published: item.pub_date().and_then(non_empty),
        authors: extract_authors(&author_fields),
        content,
        enclosures,
    }
}

fn from_atom(feed: &atom_syndication::Feed) -> DecodedFeed {
    DecodedFeed {
        channel: RemoteChannel {
            title: non_empty(&feed.title().value),
            link: alternate_link(feed.links()),
            description: None,
            subtitle: feed.subtitle().and_then(|s| non_empty(&s.value)),
            summary: None,
        },
        entries: feed.entries().iter().map(atom_entry).collect(),
    }
}

fn alternate_link(links: &[atom_syndication::Link]) -> Option<String> {
    links
        .iter()
        .filter(|l| l.rel() == "alternate")
        .find_map(|l| non_empty(l.href()))
}

fn atom_entry(entry: &atom_syndication::Entry) -> FeedEntry {
    let mut author_fields = HashMap::new();
    if !entry.authors().is_empty() {
        author_fields.insert(
            "authors",
            AuthorValue::List(
                entry
                    .authors()
                    .iter()
                    .map(|p| {
                        AuthorValue::mapping([
                            ("name", Some(p.name())),
                            ("email", p.email()),
                            ("uri", p.uri()),
                        ])
                    })
                    .collect(),
            ),
        );
    }

    let content = entry
        .content()
        .and_then(|c| {
            c.value().and_then(non_empty).map(|value| ContentBlock {
                value,
                mime_type: c.content_type().map(str::to_string),
            })
        })
        .into_iter()
        .collect();

    let enclosures = entry
        .links()
        .iter()
        .filter(|l| l.rel() == "enclosure")
        .filter_map(|l| enclosure(l.href(), l.length(), l.mime_type()))
        .collect();

    FeedEntry {
        id: non_empty(entry.id()),
        title: non_empty(&entry.title().value),
        description: None,
        summary: entry.summary().and_then(|s| non_empty(&s.value)),
        link: alternate_link(entry.links()),
        published: entry.published().map(|dt| dt.to_rfc2822()),
        authors: extract_authors(&author_fields),
        content,
        enclosures,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::types::AuthorRecord;
    use pretty_assertions::assert_eq;

    const PODCAST_RSS: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0"
     xmlns:itunes="http://www.itunes.com/dtds/podcast-1.0.dtd"
     xmlns:content="http://purl.org/rss/1.0/modules/content/"
     xmlns:dc="http://purl.org/dc/elements/1.1/">
<channel>
    <title>Test Podcast</title>
    <link>https://example.com</link>
    <description>A show about things</description>
    <itunes:summary>Longer summary</itunes:summary>
    <item>
        <title>Episode 1</title>
        <link>https://example.com/ep1</link>
        <guid isPermaLink="false">ep1</guid>
        <description>First episode</description>
        <pubDate>Mon, 01 Jan 2024 12:00:00 GMT</pubDate>
        <author>host@example.com (The Host)</author>
        <content:encoded><![CDATA[<p>Show notes</p>]]></content:encoded>
        <enclosure url="https://example.com/ep1.mp3" length="1234" type="audio/mpeg"/>
    </item>
    <item>
        <title>Episode 2</title>
        <link>https://example.com/ep2</link>
        <dc:creator>Guest Host</dc:creator>
        <enclosure url="https://example.com/ep2.mp3" length="" type=""/>
    </item>
    <item>
        <title>No identity</title>
    </item>
</channel>
</rss>"#;

    const ATOM: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
    <title>Atom Feed</title>
    <subtitle>Atom subtitle</subtitle>
    <link href="https://atom.example.com/" rel="alternate"/>
    <id>urn:feed</id>
    <updated>2024-01-01T00:00:00Z</updated>
    <entry>
        <title>Atom Entry</title>
        <id>urn:entry:1</id>
        <link href="https://atom.example.com/1" rel="alternate"/>
        <link href="https://atom.example.com/1.mp3" rel="enclosure" type="audio/mpeg" length="99"/>
        <updated>2024-01-01T00:00:00Z</updated>
        <published>2024-01-01T00:00:00Z</published>
        <summary>Atom summary</summary>
        <author><name>Writer</name><email>writer@example.com</email></author>
    </entry>
</feed>"#;

    #[test]
    fn test_parse_rss_channel() {
        let feed = parse_feed(PODCAST_RSS.as_bytes()).unwrap();
        assert_eq!(feed.channel.title.as_deref(), Some("Test Podcast"));
        assert_eq!(feed.channel.link.as_deref(), Some("https://example.com"));
        assert_eq!(
            feed.channel.description.as_deref(),
            Some("A show about things")
        );
        assert_eq!(feed.channel.summary.as_deref(), Some("Longer summary"));
        assert_eq!(feed.entries.len(), 3);
    }

    #[test]
    fn test_parse_rss_item_fields() {
        let feed = parse_feed(PODCAST_RSS.as_bytes()).unwrap();
        let ep1 = &feed.entries[0];
        assert_eq!(ep1.identity(), Some("ep1"));
        assert_eq!(ep1.title.as_deref(), Some("Episode 1"));
        assert_eq!(ep1.description.as_deref(), Some("First episode"));
        assert_eq!(
            ep1.published.as_deref(),
            Some("Mon, 01 Jan 2024 12:00:00 GMT")
        );
        assert_eq!(
            ep1.authors,
            vec![AuthorRecord {
                name: Some("The Host".into()),
                email: Some("host@example.com".into()),
            }]
        );
        assert_eq!(ep1.content.len(), 1);
        assert_eq!(ep1.content[0].value, "<p>Show notes</p>");
        assert_eq!(
            ep1.enclosures,
            vec![Enclosure {
                href: "https://example.com/ep1.mp3".into(),
                length: Some(1234),
                mime_type: Some("audio/mpeg".into()),
            }]
        );
    }

    #[test]
    fn test_parse_rss_item_fallbacks() {
        let feed = parse_feed(PODCAST_RSS.as_bytes()).unwrap();
        let ep2 = &feed.entries[1];
        assert_eq!(ep2.id, None);
        assert_eq!(ep2.identity(), Some("https://example.com/ep2"));
        assert_eq!(ep2.authors, vec![AuthorRecord::named("Guest Host").unwrap()]);
        assert_eq!(ep2.enclosures[0].length, None);
        assert_eq!(ep2.enclosures[0].mime_type, None);

        assert_eq!(feed.entries[2].identity(), None);
    }

    #[test]
    fn test_parse_atom() {
        let feed = parse_feed(ATOM.as_bytes()).unwrap();
        assert_eq!(feed.channel.title.as_deref(), Some("Atom Feed"));
        assert_eq!(feed.channel.subtitle.as_deref(), Some("Atom subtitle"));
        assert_eq!(
            feed.channel.link.as_deref(),
            Some("https://atom.example.com/")
        );

        let entry = &feed.entries[0];
        assert_eq!(entry.identity(), Some("urn:entry:1"));
        assert_eq!(entry.link.as_deref(), Some("https://atom.example.com/1"));
        assert_eq!(entry.summary.as_deref(), Some("Atom summary"));
        assert!(entry.published.is_some());
        assert_eq!(
            entry.authors,
            vec![AuthorRecord {
                name: Some("Writer".into()),
                email: Some("writer@example.com".into()),
            }]
        );
        assert_eq!(entry.enclosures.len(), 1);
        assert_eq!(entry.enclosures[0].length, Some(99));
    }

    #[test]
    fn test_parse_atom_link_ignores_non_alternate_rels() {
        let xml = r#"<?xml version="1.0" encoding="utf-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
    <title>Media Only</title>
    <id>urn:feed</id>
    <updated>2024-01-01T00:00:00Z</updated>
    <entry>
        <title>Audio only</title>
        <id>urn:entry:audio</id>
        <link href="https://atom.example.com/a.mp3" rel="enclosure" type="audio/mpeg"/>
        <updated>2024-01-01T00:00:00Z</updated>
    </entry>
    <entry>
        <title>Implicit alternate</title>
        <id>urn:entry:page</id>
        <link href="https://atom.example.com/page"/>
        <updated>2024-01-01T00:00:00Z</updated>
    </entry>
</feed>"#;
        let feed = parse_feed(xml.as_bytes()).unwrap();

        let audio = &feed.entries[0];
        assert_eq!(audio.link, None);
        assert_eq!(audio.enclosures.len(), 1);

        assert_eq!(
            feed.entries[1].link.as_deref(),
            Some("https://atom.example.com/page")
        );
    }

    #[test]
    fn test_parse_garbage_fails() {
        let result = parse_feed(b"this is not a feed at all");
        assert!(matches!(result, Err(CodecError::Unrecognized { .. })));
    }

    #[test]
    fn test_parse_empty_channel() {
        let feed =
            parse_feed(br#"<?xml version="1.0"?><rss version="2.0"><channel></channel></rss>"#)
                .unwrap();
        assert!(feed.entries.is_empty());
        assert_eq!(feed.channel.title, None);
    }
}
