//! Records produced by the feed parser and consumed by the paper store

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Media type the feed uses for downloadable documents
pub const DOCUMENT_MEDIA_TYPE: &str = "application/pdf";

/// An outbound link attached to a feed entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedLink {
    pub href: String,
    pub rel: String,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub media_type: Option<String>,
}

impl FeedLink {
    /// A `related` link pointing at a downloadable document
    pub fn is_document(&self) -> bool {
        self.rel == "related" && self.media_type.as_deref() == Some(DOCUMENT_MEDIA_TYPE)
    }
}

/// A paper as parsed from the external feed, before storage
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaperRecord {
    pub external_id: String,
    pub title: String,
    #[serde(rename = "abstract")]
    pub abstract_text: String,
    pub authors: Vec<String>,
    pub categories: Vec<String>,
    /// Raw timestamp from the feed, empty when the feed omitted it
    pub published: String,
    pub links: Vec<FeedLink>,
    pub source_url: String,
    pub document_url: String,
}

impl PaperRecord {
    /// Calendar date of publication, if the feed supplied a usable one
    pub fn published_date(&self) -> Option<NaiveDate> {
        let day = self.published.trim().get(..10)?;
        NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
    }
}

/// `<abs_base>/<id>`
pub fn source_url(abs_base: &str, external_id: &str) -> String {
    format!("{}/{}", abs_base.trim_end_matches('/'), external_id)
}

/// Document link selection, in order:
/// 1. a `related` link typed as a downloadable document
/// 2. `<pdf_base>/<id>.pdf`
pub fn document_url(links: &[FeedLink], pdf_base: &str, external_id: &str) -> String {
    links
        .iter()
        .find(|link| link.is_document())
        .map(|link| link.href.clone())
        .unwrap_or_else(|| format!("{}/{}.pdf", pdf_base.trim_end_matches('/'), external_id))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn link(rel: &str, media_type: Option<&str>, href: &str) -> FeedLink {
        FeedLink {
            href: href.to_string(),
            rel: rel.to_string(),
            media_type: media_type.map(String::from),
        }
    }

    #[test]
    fn test_document_url_prefers_related_pdf_link() {
        let links = vec![
            link("alternate", Some("text/html"), "http://arxiv.org/abs/2401.01234v1"),
            link("related", Some("application/pdf"), "http://arxiv.org/pdf/2401.01234v1"),
        ];
        assert_eq!(
            document_url(&links, "https://arxiv.org/pdf", "2401.01234v1"),
            "http://arxiv.org/pdf/2401.01234v1"
        );
    }

    #[test]
    fn test_document_url_ignores_untyped_related_link() {
        let links = vec![link("related", None, "http://dx.doi.org/10.1/abc")];
        assert_eq!(
            document_url(&links, "https://arxiv.org/pdf/", "2401.01234"),
            "https://arxiv.org/pdf/2401.01234.pdf"
        );
    }

    #[test]
    fn test_source_url() {
        assert_eq!(
            source_url("https://arxiv.org/abs", "2401.01234"),
            "https://arxiv.org/abs/2401.01234"
        );
    }

    #[test]
    fn test_published_date() {
        let mut record = PaperRecord {
            external_id: "x".into(),
            title: "t".into(),
            abstract_text: "a".into(),
            authors: vec![],
            categories: vec![],
            published: "2024-01-02T18:59:59Z".into(),
            links: vec![],
            source_url: String::new(),
            document_url: String::new(),
        };
        assert_eq!(
            record.published_date(),
            NaiveDate::from_ymd_opt(2024, 1, 2)
        );

        record.published = String::new();
        assert_eq!(record.published_date(), None);

        record.published = "yesterday".into();
        assert_eq!(record.published_date(), None);
    }
}
