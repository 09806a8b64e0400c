use crate::types::{DispatchError, ParsedEntry, ParsedFeed, Result};
use feed_rs::model::Entry;
use feed_rs::parser;
use tracing::debug;

pub struct FeedParser;

impl FeedParser {
    /// Parses an RSS/Atom/JSON feed document, keeping document order.
    ///
    /// Runs synchronously; callers on the async runtime should move it to the
    /// blocking pool.
    pub fn parse_feed(content: &str) -> Result<ParsedFeed> {
        debug!("Parsing feed content ({} bytes)", content.len());

        // feed-rs synthesizes ids for entries that have none. An empty
        // generated id keeps "no id" distinguishable so the link can stand in.
        let parser = parser::Builder::new()
            .id_generator(|_links, _title, _uri| String::new())
            .build();

        let feed = parser
            .parse(content.as_bytes())
            .map_err(|e| DispatchError::Parse(format!("Failed to parse feed: {}", e)))?;

        let title = feed.title.map(|t| t.content);
        let entries: Vec<ParsedEntry> = feed.entries.into_iter().map(Self::parse_entry).collect();

        debug!("Parsed feed with {} entries", entries.len());

        Ok(ParsedFeed { title, entries })
    }

    fn parse_entry(entry: Entry) -> ParsedEntry {
        let guid = non_empty(entry.id);
        let url = entry.links.into_iter().map(|l| l.href).find(|href| !href.trim().is_empty());
        let title = entry.title.map(|t| t.content).and_then(non_empty);

        // Prefer the summary; Atom feeds often carry only content.
        let summary = entry
            .summary
            .map(|s| s.content)
            .or_else(|| entry.content.and_then(|c| c.body))
            .and_then(non_empty);

        let thumbnail_url = entry
            .media
            .iter()
            .flat_map(|media| media.thumbnails.iter())
            .map(|thumbnail| thumbnail.image.uri.trim())
            .find(|uri| !uri.is_empty())
            .map(str::to_string);

        ParsedEntry {
            guid,
            url,
            title,
            summary,
            thumbnail_url,
        }
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}
