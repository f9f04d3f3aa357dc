//! RSS 2.0 reading (upstream feed) and writing (subscriber feeds).

use std::io::Cursor;

use chrono::{DateTime, Utc};
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::reader::Reader;
use quick_xml::writer::Writer;

use super::types::{FeedError, FeedItem, SubscriberFeedItem};

/// Parse an upstream RSS document into feed items.
///
/// Items without a title, link or parseable `pubDate` are dropped; they could
/// not take part in change detection anyway.
pub fn parse_rss(xml: &[u8]) -> Result<Vec<FeedItem>, FeedError> {
    let mut reader = Reader::from_reader(xml);
    reader.config_mut().trim_text(true);

    let mut items = Vec::new();
    let mut buf = Vec::new();

    let mut current_item: Option<FeedItemBuilder> = None;
    let mut current_element = String::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Ok(Event::Start(e)) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).to_string();
                if name == "item" {
                    current_item = Some(FeedItemBuilder::default());
                }
                current_element = name;
            }
            Ok(Event::End(e)) => {
                if e.name().as_ref() == b"item" {
                    if let Some(builder) = current_item.take() {
                        match builder.build() {
                            Some(item) => items.push(item),
                            None => tracing::debug!("Skipping incomplete feed item"),
                        }
                    }
                }
                current_element.clear();
            }
            Ok(Event::Text(e)) => {
                if let Some(ref mut item) = current_item {
                    let text = e.unescape().unwrap_or_default().to_string();
                    item.set(&current_element, text);
                }
            }
            Ok(Event::CData(e)) => {
                if let Some(ref mut item) = current_item {
                    let text = String::from_utf8_lossy(&e.into_inner()).to_string();
                    item.set(&current_element, text);
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => return Err(FeedError::Parse(format!("XML parse error: {}", e))),
            _ => {}
        }
        buf.clear();
    }

    Ok(items)
}

#[derive(Default)]
struct FeedItemBuilder {
    title: Option<String>,
    link: Option<String>,
    pub_date: Option<String>,
}

impl FeedItemBuilder {
    fn set(&mut self, element: &str, text: String) {
        let text = text.trim().to_string();
        if text.is_empty() {
            return;
        }
        match element {
            "title" => self.title = Some(text),
            "link" => self.link = Some(text),
            "pubDate" => self.pub_date = Some(text),
            _ => {}
        }
    }

    fn build(self) -> Option<FeedItem> {
        let published_at = DateTime::parse_from_rfc2822(self.pub_date.as_deref()?)
            .ok()?
            .with_timezone(&Utc);
        Some(FeedItem {
            title: self.title?,
            link: self.link?,
            published_at,
        })
    }
}

/// Render a subscriber's feed as an RSS 2.0 document.
pub fn render_rss(
    channel_title: &str,
    channel_link: &str,
    items: &[SubscriberFeedItem],
) -> Result<String, FeedError> {
    let mut writer = Writer::new_with_indent(Cursor::new(Vec::new()), b' ', 2);

    write(
        &mut writer,
        Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)),
    )?;
    write(
        &mut writer,
        Event::Start(BytesStart::new("rss").with_attributes([("version", "2.0")])),
    )?;
    write(&mut writer, Event::Start(BytesStart::new("channel")))?;
    text_element(&mut writer, "title", channel_title)?;
    text_element(&mut writer, "link", channel_link)?;
    text_element(&mut writer, "description", channel_title)?;

    for item in items {
        write(&mut writer, Event::Start(BytesStart::new("item")))?;
        text_element(&mut writer, "title", &item.title)?;
        text_element(&mut writer, "link", &item.link)?;
        text_element(&mut writer, "guid", &item.link)?;
        text_element(&mut writer, "pubDate", &item.published_at.to_rfc2822())?;
        write(&mut writer, Event::End(BytesEnd::new("item")))?;
    }

    write(&mut writer, Event::End(BytesEnd::new("channel")))?;
    write(&mut writer, Event::End(BytesEnd::new("rss")))?;

    String::from_utf8(writer.into_inner().into_inner()).map_err(|e| FeedError::Parse(e.to_string()))
}

fn text_element(
    writer: &mut Writer<Cursor<Vec<u8>>>,
    name: &str,
    text: &str,
) -> Result<(), FeedError> {
    write(writer, Event::Start(BytesStart::new(name)))?;
    write(writer, Event::Text(BytesText::new(text)))?;
    write(writer, Event::End(BytesEnd::new(name)))
}

fn write(writer: &mut Writer<Cursor<Vec<u8>>>, event: Event<'_>) -> Result<(), FeedError> {
    writer
        .write_event(event)
        .map_err(|e| FeedError::Parse(format!("XML write error: {}", e)))
}
