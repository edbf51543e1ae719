//! Atom feed parser
//!
//! A single forward scan over `<entry>` blocks. Each block is read with a
//! handful of flat patterns rather than a full XML grammar, so a malformed
//! entry only costs that entry.

use paperpulse_common::config::FeedConfig;
use paperpulse_common::records::{self, FeedLink, PaperRecord};
use regex_lite::Regex;
use std::sync::LazyLock;
use tracing::debug;

static ENTRY_OPEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<entry(?:\s[^>]*)?>").expect("entry pattern"));
static ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<id(?:\s[^>]*)?>(.*?)</id>").expect("id pattern"));
static TITLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<title(?:\s[^>]*)?>(.*?)</title>").expect("title pattern"));
static SUMMARY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<summary(?:\s[^>]*)?>(.*?)</summary>").expect("summary pattern")
});
static PUBLISHED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<published(?:\s[^>]*)?>(.*?)</published>").expect("published pattern")
});
static AUTHOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<author(?:\s[^>]*)?>.*?<name(?:\s[^>]*)?>(.*?)</name>.*?</author>")
        .expect("author pattern")
});
static CATEGORY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<category\s([^>]*?)/?>").expect("category pattern"));
static LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<link\s([^>]*?)/?>").expect("link pattern"));
static ATTRIBUTE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([A-Za-z_][A-Za-z0-9_:.-]*)\s*=\s*(?:"([^"]*)"|'([^']*)')"#)
        .expect("attribute pattern")
});

/// Parses raw feed documents into `PaperRecord`s
#[derive(Debug, Clone)]
pub struct FeedParser {
    abs_base: String,
    pdf_base: String,
}

impl FeedParser {
    pub fn new(abs_base: impl Into<String>, pdf_base: impl Into<String>) -> Self {
        Self {
            abs_base: abs_base.into(),
            pdf_base: pdf_base.into(),
        }
    }

    pub fn from_config(config: &FeedConfig) -> Self {
        Self::new(&config.abs_base, &config.pdf_base)
    }

    /// Parse every well-formed entry, in document order.
    ///
    /// Entries without an id, title or abstract are skipped.
    pub fn parse(&self, raw: &str) -> Vec<PaperRecord> {
        let mut papers = Vec::new();
        let mut skipped = 0usize;

        for body in entry_bodies(raw) {
            match body.and_then(|body| self.parse_entry(body)) {
                Some(paper) => papers.push(paper),
                None => skipped += 1,
            }
        }

        if skipped > 0 {
            debug!(skipped, parsed = papers.len(), "Skipped incomplete feed entries");
        }

        papers
    }

    fn parse_entry(&self, entry: &str) -> Option<PaperRecord> {
        let external_id = first_text(&ID, entry).and_then(|id| last_segment(&id))?;
        let title = first_text(&TITLE, entry)?;
        let abstract_text = first_text(&SUMMARY, entry)?;

        let authors = AUTHOR
            .captures_iter(entry)
            .filter_map(|c| c.get(1).map(|m| clean_text(m.as_str())))
            .filter(|name| !name.is_empty())
            .collect();

        let mut categories: Vec<String> = Vec::new();
        for tag in CATEGORY.captures_iter(entry) {
            let Some(attrs) = tag.get(1) else { continue };
            if let Some(term) = attribute(attrs.as_str(), "term") {
                if !term.is_empty() && !categories.contains(&term) {
                    categories.push(term);
                }
            }
        }

        let links: Vec<FeedLink> = LINK
            .captures_iter(entry)
            .filter_map(|tag| {
                let attrs = tag.get(1)?.as_str();
                Some(FeedLink {
                    href: attribute(attrs, "href")?,
                    rel: attribute(attrs, "rel").unwrap_or_default(),
                    media_type: attribute(attrs, "type"),
                })
            })
            .collect();

        let published = first_text(&PUBLISHED, entry).unwrap_or_default();

        Some(PaperRecord {
            source_url: records::source_url(&self.abs_base, &external_id),
            document_url: records::document_url(&links, &self.pdf_base, &external_id),
            external_id,
            title,
            abstract_text,
            authors,
            categories,
            published,
            links,
        })
    }
}

/// Body of every `<entry>` in document order.
///
/// Each entry may only close before the next one opens, so an unclosed
/// entry yields `None` instead of swallowing its neighbour.
fn entry_bodies(raw: &str) -> Vec<Option<&str>> {
    let opens: Vec<(usize, usize)> = ENTRY_OPEN
        .find_iter(raw)
        .map(|m| (m.start(), m.end()))
        .collect();

    opens
        .iter()
        .enumerate()
        .map(|(i, &(_, body_start))| {
            let limit = opens.get(i + 1).map_or(raw.len(), |&(next, _)| next);
            let segment = &raw[body_start..limit];
            segment.find("</entry>").map(|close| &segment[..close])
        })
        .collect()
}

/// Cleaned text of the first match, `None` when absent or blank
fn first_text(pattern: &Regex, entry: &str) -> Option<String> {
    let text = clean_text(pattern.captures(entry)?.get(1)?.as_str());
    (!text.is_empty()).then_some(text)
}

/// `http://arxiv.org/abs/2401.01234v1` -> `2401.01234v1`
fn last_segment(id: &str) -> Option<String> {
    id.trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
        .map(String::from)
}

fn attribute(attrs: &str, name: &str) -> Option<String> {
    ATTRIBUTE.captures_iter(attrs).find_map(|c| {
        if c.get(1)?.as_str() != name {
            return None;
        }
        let value = c.get(2).or_else(|| c.get(3))?.as_str();
        Some(decode_entities(value.trim()))
    })
}

/// Strip CDATA markers, decode entities and collapse whitespace
fn clean_text(raw: &str) -> String {
    let stripped = raw.replace("<![CDATA[", "").replace("]]>", "");
    decode_entities(&stripped)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Decode the predefined XML entities and numeric character references.
///
/// Unknown or malformed references are kept verbatim.
fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find('&') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        let decoded = tail
            .find(';')
            .filter(|&end| end <= MAX_ENTITY_LEN)
            .and_then(|end| entity(&tail[1..end]).map(|c| (c, end)));
        match decoded {
            Some((c, end)) => {
                out.push(c);
                rest = &tail[end + 1..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

/// Longest reference worth trying, `&#x10FFFF;` included
const MAX_ENTITY_LEN: usize = 9;

fn entity(name: &str) -> Option<char> {
    match name {
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "amp" => Some('&'),
        _ => {
            let code = name.strip_prefix('#')?;
            let value = match code.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None if code.bytes().all(|b| b.is_ascii_digit()) => code.parse().ok()?,
                None => return None,
            };
            char::from_u32(value)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parser() -> FeedParser {
        FeedParser::new("https://arxiv.org/abs", "https://arxiv.org/pdf")
    }

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title type="html">ArXiv Query</title>
  <id>http://arxiv.org/api/query-id</id>
  <entry>
    <id>http://arxiv.org/abs/2401.00001v1</id>
    <published>2024-01-02T18:59:59Z</published>
    <title>Designing   Interfaces
      for &amp; with People</title>
    <summary><![CDATA[ We study <b>things</b>. ]]></summary>
    <author><name>Ada Lovelace</name></author>
    <author><name>Alan Turing</name><arxiv:affiliation>Bletchley</arxiv:affiliation></author>
    <link href="http://arxiv.org/abs/2401.00001v1" rel="alternate" type="text/html"/>
    <link title="pdf" type="application/pdf" rel="related" href="http://arxiv.org/pdf/2401.00001v1"/>
    <arxiv:primary_category term="cs.HC" scheme="http://arxiv.org/schemas/atom"/>
    <category term="cs.HC" scheme="http://arxiv.org/schemas/atom"/>
    <category term="cs.AI" scheme="http://arxiv.org/schemas/atom"/>
    <category term="cs.HC" scheme="http://arxiv.org/schemas/atom"/>
  </entry>
  <entry>
    <id>http://arxiv.org/abs/2401.00002v1</id>
    <published>2024-01-03T00:00:00Z</published>
    <summary>No title here.</summary>
  </entry>
  <entry>
    <id>http://arxiv.org/abs/2401.00003v2</id>
    <title>Third</title>
    <summary>Abstract three.</summary>
    <link href="http://dx.doi.org/10.1/xyz" rel="related"/>
  </entry>
</feed>"#;

    #[test]
    fn test_parse_skips_incomplete_entries_in_order() {
        let papers = parser().parse(FEED);
        let ids: Vec<&str> = papers.iter().map(|p| p.external_id.as_str()).collect();
        assert_eq!(ids, vec!["2401.00001v1", "2401.00003v2"]);
    }

    #[test]
    fn test_parse_full_entry() {
        let papers = parser().parse(FEED);
        let paper = &papers[0];

        assert_eq!(paper.title, "Designing Interfaces for & with People");
        assert_eq!(paper.abstract_text, "We study <b>things</b>.");
        assert_eq!(paper.authors, vec!["Ada Lovelace", "Alan Turing"]);
        assert_eq!(paper.categories, vec!["cs.HC", "cs.AI"]);
        assert_eq!(paper.published, "2024-01-02T18:59:59Z");
        assert_eq!(paper.links.len(), 2);
        assert_eq!(paper.source_url, "https://arxiv.org/abs/2401.00001v1");
        assert_eq!(paper.document_url, "http://arxiv.org/pdf/2401.00001v1");
    }

    #[test]
    fn test_parse_falls_back_to_constructed_document_url() {
        let papers = parser().parse(FEED);
        let paper = &papers[1];

        assert_eq!(paper.document_url, "https://arxiv.org/pdf/2401.00003v2.pdf");
        assert!(paper.authors.is_empty());
        assert!(paper.categories.is_empty());
        assert_eq!(paper.published, "");
        assert_eq!(paper.published_date(), None);
    }

    #[test]
    fn test_parse_empty_feed() {
        assert!(parser().parse("").is_empty());
        assert!(parser()
            .parse(r#"<feed xmlns="http://www.w3.org/2005/Atom"></feed>"#)
            .is_empty());
    }

    #[test]
    fn test_helpers() {
        assert_eq!(
            last_segment("http://arxiv.org/abs/2401.01234v1").as_deref(),
            Some("2401.01234v1")
        );
        assert_eq!(last_segment("/"), None);
        assert_eq!(
            attribute(r#"rel='related' href="a?x=1&amp;y=2""#, "href").as_deref(),
            Some("a?x=1&y=2")
        );
        assert_eq!(decode_entities("&lt;a&gt; &quot;b&apos;"), "<a> \"b'");
        assert_eq!(decode_entities("&amp;lt;"), "&lt;");
    }

    #[test]
    fn test_numeric_references_are_decoded() {
        assert_eq!(decode_entities("Don&#39;t"), "Don't");
        assert_eq!(decode_entities("1990&#x2013;2000"), "1990\u{2013}2000");
        assert_eq!(decode_entities("&#X41;&#66;"), "AB");
        assert_eq!(decode_entities("&#xD800; &bogus; &#;"), "&#xD800; &bogus; &#;");
        assert_eq!(decode_entities("R&D; a & b"), "R&D; a & b");

        let feed = "<feed><entry><id>http://arxiv.org/abs/2401.00009v1</id>\
                    <title>Users&#8217; Trust</title><summary>It&#39;s fine</summary>\
                    </entry></feed>";
        let papers = parser().parse(feed);
        assert_eq!(papers[0].title, "Users\u{2019} Trust");
        assert_eq!(papers[0].abstract_text, "It's fine");
    }

    #[test]
    fn test_unclosed_entry_does_not_swallow_next() {
        let feed = r#"<feed>
          <entry>
            <id>http://arxiv.org/abs/BROKEN</id>
            <title>Never closed</title>
            <summary>Lost</summary>
          <entry>
            <id>http://arxiv.org/abs/2401.00002v1</id>
            <title>Valid</title>
            <summary>Kept</summary>
          </entry>
          <entry>
            <id>http://arxiv.org/abs/2401.00003v1</id>
            <title>Trailing</title>
            <summary>Unclosed at end of document</summary>
        </feed>"#;

        let ids: Vec<String> = parser()
            .parse(feed)
            .into_iter()
            .map(|p| p.external_id)
            .collect();
        assert_eq!(ids, vec!["2401.00002v1"]);
    }

    #[test]
    fn test_entry_bodies_ignore_lookalike_tags() {
        let raw = "<entryx>no</entryx><entry a=\"1\">one</entry><entry>two</entry>";
        assert_eq!(entry_bodies(raw), vec![Some("one"), Some("two")]);
    }
}
