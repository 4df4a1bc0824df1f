//! RSS 2.0 rendering for channel and playlist feeds.
//!
//! Output is podcast-flavored RSS: the usual channel metadata plus the
//! itunes tags aggregators look for, one `<item>` with an `<enclosure>`
//! per media entry.

use quick_xml::events::{BytesDecl, BytesText, Event};
use quick_xml::writer::Writer;
use time::format_description::well_known::{Rfc2822, Rfc3339};
use time::OffsetDateTime;

const ITUNES_NS: &str = "http://www.itunes.com/dtds/podcast-1.0.dtd";
const GENERATOR: &str = concat!("podproxy ", env!("CARGO_PKG_VERSION"));

#[derive(Clone, Debug)]
pub struct FeedMeta {
    pub title: String,
    pub link: String,
    pub description: String,
    pub author: String,
    pub image: Option<String>,
}

#[derive(Clone, Debug)]
pub struct FeedEntry {
    pub guid: String,
    pub title: String,
    pub link: String,
    pub description: String,
    pub author: String,
    pub image: Option<String>,
    /// RFC 3339 timestamp from the upstream; rendered as RFC 2822.
    pub published_at: String,
    pub enclosure_url: String,
    pub enclosure_type: String,
}

pub fn render(meta: &FeedMeta, entries: &[FeedEntry]) -> String {
    let mut writer = Writer::new(Vec::new());
    let _ = writer.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)));

    let _ = writer
        .create_element("rss")
        .with_attributes([("version", "2.0"), ("xmlns:itunes", ITUNES_NS)])
        .write_inner_content(|rss| {
            rss.create_element("channel").write_inner_content(|ch| {
                text_element(ch, "title", &meta.title);
                text_element(ch, "link", &meta.link);
                text_element(ch, "description", blank_to_space(&meta.description));
                text_element(ch, "generator", GENERATOR);
                text_element(ch, "language", "en-US");
                text_element(ch, "itunes:author", &meta.author);
                text_element(ch, "itunes:summary", blank_to_space(&meta.description));
                text_element(ch, "itunes:explicit", "no");
                if let Some(image) = &meta.image {
                    let _ = ch
                        .create_element("itunes:image")
                        .with_attribute(("href", image.as_str()))
                        .write_empty();
                    let _ = ch.create_element("image").write_inner_content(|img| {
                        text_element(img, "url", image);
                        text_element(img, "title", &meta.title);
                        text_element(img, "link", &meta.link);
                        Ok::<_, std::io::Error>(())
                    });
                }
                for entry in entries {
                    let _ = ch.create_element("item").write_inner_content(|item| {
                        text_element(item, "title", &entry.title);
                        text_element(item, "guid", &entry.guid);
                        text_element(item, "link", &entry.link);
                        text_element(item, "description", &entry.description);
                        text_element(item, "pubDate", &rfc2822(&entry.published_at));
                        text_element(item, "author", &entry.author);
                        text_element(item, "itunes:author", &entry.author);
                        text_element(item, "itunes:summary", &entry.description);
                        if let Some(image) = &entry.image {
                            let _ = item
                                .create_element("itunes:image")
                                .with_attribute(("href", image.as_str()))
                                .write_empty();
                        }
                        let _ = item
                            .create_element("enclosure")
                            .with_attributes([
                                ("url", entry.enclosure_url.as_str()),
                                ("type", entry.enclosure_type.as_str()),
                                ("length", "0"),
                            ])
                            .write_empty();
                        Ok::<_, std::io::Error>(())
                    });
                }
                Ok::<_, std::io::Error>(())
            })?;
            Ok::<_, std::io::Error>(())
        });

    String::from_utf8(writer.into_inner()).unwrap_or_default()
}

fn text_element<W: std::io::Write>(writer: &mut Writer<W>, name: &str, value: &str) {
    let _ = writer
        .create_element(name)
        .write_text_content(BytesText::new(value));
}

/// Aggregators choke on empty description elements; the original served a
/// single space instead.
fn blank_to_space(value: &str) -> &str {
    if value.is_empty() { " " } else { value }
}

fn rfc2822(rfc3339: &str) -> String {
    OffsetDateTime::parse(rfc3339, &Rfc3339)
        .ok()
        .and_then(|stamp| stamp.format(&Rfc2822).ok())
        .unwrap_or_else(|| rfc3339.to_string())
}
