//! arXiv search over the public Atom API.

use roxmltree::{Document, Node};
use serde::Serialize;
use tracing::debug;

use crate::error::{Error, Result};

pub const DEFAULT_API_URL: &str = "https://export.arxiv.org/api/query";

/// Metadata kept for one paper.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Paper {
    #[serde(skip)]
    pub id: String,
    pub title: String,
    pub authors: Vec<String>,
    pub summary: String,
    pub pdf_url: String,
    pub published: String,
}

/// Minimal arXiv API client.
#[derive(Debug, Clone)]
pub struct ArxivClient {
    http: reqwest::Client,
    api_url: String,
}

impl Default for ArxivClient {
    fn default() -> Self {
        Self::new(DEFAULT_API_URL)
    }
}

impl ArxivClient {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_url: api_url.into(),
        }
    }

    /// Most relevant papers for `topic`.
    pub async fn search(&self, topic: &str, max_results: usize) -> Result<Vec<Paper>> {
        let max_results = max_results.to_string();
        let url = reqwest::Url::parse_with_params(
            &self.api_url,
            [
                ("search_query", topic),
                ("start", "0"),
                ("max_results", max_results.as_str()),
                ("sortBy", "relevance"),
                ("sortOrder", "descending"),
            ],
        )
        .map_err(|e| Error::Query(format!("bad API URL {}: {e}", self.api_url)))?;

        let response = self.http.get(url).send().await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(Error::Status {
                status: status.as_u16(),
                body,
            });
        }

        let papers = parse_feed(&body)?;
        debug!(%topic, found = papers.len(), "arXiv search complete");
        Ok(papers)
    }
}

/// Parse an arXiv Atom feed.
pub fn parse_feed(xml: &str) -> Result<Vec<Paper>> {
    let doc = Document::parse(xml)?;
    let mut papers = Vec::new();

    for entry in doc.descendants().filter(|n| n.has_tag_name("entry")) {
        let id = child_text(entry, "id")
            .ok_or_else(|| Error::Feed("entry without id".into()))?;

        if id.contains("/api/errors") {
            let reason = child_text(entry, "summary").unwrap_or_else(|| id.clone());
            return Err(Error::Query(reason));
        }

        let authors = entry
            .children()
            .filter(|n| n.has_tag_name("author"))
            .filter_map(|author| child_text(author, "name"))
            .collect();

        let pdf_url = entry
            .children()
            .find(|n| n.has_tag_name("link") && n.attribute("title") == Some("pdf"))
            .and_then(|link| link.attribute("href"))
            .unwrap_or_default()
            .to_string();

        let published = child_text(entry, "published").unwrap_or_default();

        papers.push(Paper {
            id: short_id(&id).to_string(),
            title: child_text(entry, "title").unwrap_or_default(),
            authors,
            summary: child_text(entry, "summary").unwrap_or_default(),
            pdf_url,
            published: published.get(..10).unwrap_or(published.as_str()).to_string(),
        });
    }

    Ok(papers)
}

/// `http://arxiv.org/abs/1310.7911v2` → `1310.7911v2`.
pub fn short_id(id: &str) -> &str {
    id.split_once("/abs/").map_or(id, |(_, short)| short)
}

fn child_text(node: Node<'_, '_>, name: &str) -> Option<String> {
    node.children()
        .find(|n| n.has_tag_name(name))
        .and_then(|n| n.text())
        .map(|text| text.split_whitespace().collect::<Vec<_>>().join(" "))
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom" xmlns:arxiv="http://arxiv.org/schemas/atom">
  <title type="html">ArXiv Query: search_query=computers</title>
  <entry>
    <id>http://arxiv.org/abs/1310.7911v2</id>
    <published>2013-10-29T19:59:28Z</published>
    <title>Computers and
      the Theory of Everything</title>
    <summary>  A short
      abstract.  </summary>
    <author><name>Ada Lovelace</name></author>
    <author><name>Alan Turing</name></author>
    <link href="http://arxiv.org/abs/1310.7911v2" rel="alternate" type="text/html"/>
    <link title="pdf" href="http://arxiv.org/pdf/1310.7911v2" rel="related" type="application/pdf"/>
  </entry>
  <entry>
    <id>http://arxiv.org/abs/2001.00001v1</id>
    <published>2020-01-01T00:00:00Z</published>
    <title>Second</title>
    <summary>Another.</summary>
    <author><name>Grace Hopper</name></author>
  </entry>
</feed>"#;

    #[test]
    fn parse_entries() {
        let papers = parse_feed(FEED).unwrap();
        assert_eq!(papers.len(), 2);

        let first = &papers[0];
        assert_eq!(first.id, "1310.7911v2");
        assert_eq!(first.title, "Computers and the Theory of Everything");
        assert_eq!(first.summary, "A short abstract.");
        assert_eq!(first.authors, vec!["Ada Lovelace", "Alan Turing"]);
        assert_eq!(first.pdf_url, "http://arxiv.org/pdf/1310.7911v2");
        assert_eq!(first.published, "2013-10-29");

        assert_eq!(papers[1].pdf_url, "");
    }

    #[test]
    fn empty_feed_has_no_papers() {
        let xml = r#"<feed xmlns="http://www.w3.org/2005/Atom"><title>none</title></feed>"#;
        assert!(parse_feed(xml).unwrap().is_empty());
    }

    #[test]
    fn api_error_entry_is_reported() {
        let xml = r#"<feed xmlns="http://www.w3.org/2005/Atom"><entry>
            <id>http://arxiv.org/api/errors#incorrect_id_format_for_1234</id>
            <summary>incorrect id format for 1234</summary>
        </entry></feed>"#;
        let err = parse_feed(xml).unwrap_err();
        assert!(matches!(err, Error::Query(ref m) if m == "incorrect id format for 1234"));
    }

    #[test]
    fn garbage_is_a_feed_error() {
        assert!(matches!(parse_feed("<feed>"), Err(Error::Feed(_))));
    }

    #[test]
    fn short_ids() {
        assert_eq!(short_id("http://arxiv.org/abs/1310.7911v2"), "1310.7911v2");
        assert_eq!(short_id("hep-th/9901001v1"), "hep-th/9901001v1");
    }
}
