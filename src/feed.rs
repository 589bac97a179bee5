//! Atom feed decoding for the listing service.
//!
//! arXiv's query API answers with an Atom payload; entries are decoded in a
//! single forward pass with quick-xml (namespaces make regex parsing
//! brittle). Decoding is tolerant at the field level: an entry missing
//! optional fields still yields a partial [`RawEntry`], and it is the
//! normalizer's job to reject records lacking required fields. Only a
//! structurally broken payload fails the whole parse.

use crate::error::MalformedFeed;
use quick_xml::events::Event;
use quick_xml::Reader;

/// Raw field mapping for one feed entry, before normalization.
///
/// Every field is optional here; see [`Paper::from_raw`](crate::paper::Paper::from_raw)
/// for which ones are required downstream.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawEntry {
    /// Entry id, typically the abstract page URL
    pub id: Option<String>,
    pub title: Option<String>,
    pub summary: Option<String>,
    /// RFC 3339 timestamp string
    pub published: Option<String>,
    /// Author names in feed order
    pub authors: Vec<String>,
    /// `term` attributes of repeated category annotations
    pub categories: Vec<String>,
    /// First-seen link `href`
    pub link: Option<String>,
}

/// Decode a raw feed payload into its entry records.
///
/// Single forward pass, no backtracking. Fails with [`MalformedFeed`] when
/// the payload is not well-formed XML; individual entries are never rejected
/// here.
pub fn parse_feed(payload: &[u8]) -> Result<Vec<RawEntry>, MalformedFeed> {
    if !starts_with_marker(payload) {
        return Err(MalformedFeed("payload does not start with '<'".to_string()));
    }

    let mut reader = Reader::from_reader(payload);
    let mut buf = Vec::new();

    let mut entries: Vec<RawEntry> = Vec::new();
    let mut current: Option<RawEntry> = None;
    let mut in_author = false;
    let mut text = String::new();

    loop {
        match reader.read_event_into(&mut buf) {
            Err(err) => return Err(MalformedFeed(err.to_string())),
            Ok(Event::Eof) => break,
            Ok(Event::Start(start)) => {
                match start.local_name().as_ref() {
                    b"entry" => current = Some(RawEntry::default()),
                    b"author" if current.is_some() => in_author = true,
                    b"category" => collect_category(&start, current.as_mut()),
                    b"link" => collect_link(&start, current.as_mut()),
                    _ => {}
                }
                text.clear();
            }
            Ok(Event::Empty(empty)) => match empty.local_name().as_ref() {
                b"category" => collect_category(&empty, current.as_mut()),
                b"link" => collect_link(&empty, current.as_mut()),
                _ => {}
            },
            Ok(Event::Text(chunk)) => {
                let unescaped = chunk
                    .unescape()
                    .map_err(|err| MalformedFeed(err.to_string()))?;
                text.push_str(&unescaped);
            }
            Ok(Event::End(end)) => {
                if end.local_name().as_ref() == b"entry" {
                    in_author = false;
                    if let Some(done) = current.take() {
                        entries.push(done);
                    }
                } else if let Some(entry) = current.as_mut() {
                    let content = normalize_ws(&text);
                    match end.local_name().as_ref() {
                        b"id" => entry.id = Some(content),
                        b"title" => entry.title = Some(content),
                        b"summary" => entry.summary = Some(content),
                        b"published" => entry.published = Some(content),
                        b"name" if in_author && !content.is_empty() => {
                            entry.authors.push(content);
                        }
                        b"author" => in_author = false,
                        _ => {}
                    }
                }
                text.clear();
            }
            _ => {}
        }
        buf.clear();
    }

    Ok(entries)
}

/// Cheap structural check: a feed payload always opens with `<`.
pub(crate) fn starts_with_marker(payload: &[u8]) -> bool {
    payload
        .iter()
        .find(|byte| !byte.is_ascii_whitespace())
        .is_some_and(|byte| *byte == b'<')
}

fn collect_category(element: &quick_xml::events::BytesStart<'_>, entry: Option<&mut RawEntry>) {
    let Some(entry) = entry else { return };
    for attr in element.attributes().flatten() {
        if attr.key.as_ref() == b"term" {
            if let Ok(term) = attr.unescape_value() {
                let term = term.trim().to_string();
                if !term.is_empty() {
                    entry.categories.push(term);
                }
            }
        }
    }
}

fn collect_link(element: &quick_xml::events::BytesStart<'_>, entry: Option<&mut RawEntry>) {
    let Some(entry) = entry else { return };
    if entry.link.is_some() {
        return;
    }
    for attr in element.attributes().flatten() {
        if attr.key.as_ref() == b"href" {
            if let Ok(href) = attr.unescape_value() {
                entry.link = Some(href.to_string());
            }
        }
    }
}

/// Trim surrounding whitespace and collapse internal runs. arXiv hard-wraps
/// titles and abstracts, so raw text content is full of stray newlines.
fn normalize_ws(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>ArXiv Query Results</title>
  <entry>
    <id>http://arxiv.org/abs/0805.3415v1</id>
    <published>2008-05-22T00:00:00Z</published>
    <title> On Upper-Confidence Bound Policies
        for Non-Stationary Bandit Problems </title>
    <summary>  Some abstract here.  </summary>
    <author><name>A. Author</name></author>
    <author><name>B. Author</name></author>
    <category term="cs.LG" />
    <category term="stat.ML" />
    <link href="http://arxiv.org/abs/0805.3415v1" rel="alternate" type="text/html"/>
    <link href="http://arxiv.org/pdf/0805.3415v1" rel="related" type="application/pdf"/>
  </entry>
  <entry>
    <id>http://arxiv.org/abs/1305.2545v2</id>
    <published>2013-05-11T00:00:00Z</published>
    <title>Bandits with Knapsacks</title>
    <summary>Abstract two.</summary>
  </entry>
</feed>
"#;

    #[test]
    fn test_parse_feed_extracts_entries() {
        let entries = parse_feed(FEED.as_bytes()).unwrap();
        assert_eq!(entries.len(), 2);

        let first = &entries[0];
        assert_eq!(first.id.as_deref(), Some("http://arxiv.org/abs/0805.3415v1"));
        assert_eq!(
            first.title.as_deref(),
            Some("On Upper-Confidence Bound Policies for Non-Stationary Bandit Problems")
        );
        assert_eq!(first.summary.as_deref(), Some("Some abstract here."));
        assert_eq!(first.published.as_deref(), Some("2008-05-22T00:00:00Z"));
        assert_eq!(first.authors, vec!["A. Author", "B. Author"]);
        assert_eq!(first.categories, vec!["cs.LG", "stat.ML"]);
    }

    #[test]
    fn test_first_link_wins() {
        let entries = parse_feed(FEED.as_bytes()).unwrap();
        assert_eq!(
            entries[0].link.as_deref(),
            Some("http://arxiv.org/abs/0805.3415v1")
        );
    }

    #[test]
    fn test_missing_optional_fields_yield_partial_entry() {
        let entries = parse_feed(FEED.as_bytes()).unwrap();
        let second = &entries[1];
        assert!(second.authors.is_empty());
        assert!(second.categories.is_empty());
        assert!(second.link.is_none());
        assert_eq!(second.title.as_deref(), Some("Bandits with Knapsacks"));
    }

    #[test]
    fn test_non_xml_payload_is_malformed() {
        assert!(parse_feed(b"503 Service Unavailable").is_err());
        assert!(parse_feed(b"").is_err());
    }

    #[test]
    fn test_parse_is_idempotent() {
        let first_pass: Vec<_> = parse_feed(FEED.as_bytes())
            .unwrap()
            .into_iter()
            .filter_map(crate::paper::Paper::from_raw)
            .collect();
        let second_pass: Vec<_> = parse_feed(FEED.as_bytes())
            .unwrap()
            .into_iter()
            .filter_map(crate::paper::Paper::from_raw)
            .collect();
        assert_eq!(first_pass.len(), 2);
        assert_eq!(first_pass, second_pass);
    }

    #[test]
    fn test_marker_check() {
        assert!(starts_with_marker(b"<feed>"));
        assert!(starts_with_marker(b"  \n<feed>"));
        assert!(!starts_with_marker(b"feed"));
        assert!(!starts_with_marker(b""));
    }
}
