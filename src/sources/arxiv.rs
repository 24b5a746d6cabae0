//! arXiv source implementation.

use async_trait::async_trait;
use feed_rs::parser;
use std::time::Duration;

use crate::models::{Query, Record, RecordBuilder, SearchType};
use crate::sources::{Source, SourceError};
use crate::utils::{HttpClient, RateLimiter};

/// Base URL for arXiv API
const ARXIV_API_URL: &str = "http://export.arxiv.org/api/query";

/// arXiv accepts at most this many results per request
const MAX_RESULTS: usize = 200;

/// arXiv source, queried through its Atom feed API
#[derive(Debug)]
pub struct ArxivSource {
    client: HttpClient,
    base_url: String,
    rate_limiter: RateLimiter,
}

impl ArxivSource {
    /// Create a new arXiv source
    pub fn new(client: HttpClient) -> Self {
        Self {
            client,
            base_url: ARXIV_API_URL.to_string(),
            rate_limiter: RateLimiter::new(Duration::from_millis(500)),
        }
    }

    /// Point the source at a different API endpoint (for testing)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Parse an arXiv ID from an entry id or abstract URL, dropping the version
    ///
    /// Handles formats like:
    /// - "2301.12345"
    /// - "2301.12345v1"
    /// - "http://arxiv.org/abs/2301.12345v1"
    /// - "http://arxiv.org/abs/math.GT/0104020v2"
    pub fn parse_id(id: &str) -> Option<String> {
        let id = id.trim();
        let id = match id.find("/abs/") {
            Some(pos) => &id[pos + 5..],
            None => id,
        };

        let id = match id.rfind('v') {
            Some(pos) if pos > 0 && id[pos + 1..].chars().all(|c| c.is_ascii_digit()) => {
                &id[..pos]
            }
            _ => id,
        };

        (!id.is_empty()).then(|| id.to_string())
    }

    /// DOI that arXiv registers for new-style identifiers
    fn doi_for(id: &str) -> Option<String> {
        let new_style = id.contains('.') && id.chars().all(|c| c.is_ascii_digit() || c == '.');
        new_style.then(|| format!("10.48550/arXiv.{}", id))
    }

    /// Build search query for arXiv API
    fn build_search_query(query: &Query) -> String {
        let field = match query.search_type {
            SearchType::Keyword => "all",
            SearchType::Title => "ti",
            SearchType::Author => "au",
        };

        let mut parts = vec![format!("{}:\"{}\"", field, query.text.trim())];

        // arXiv filters on submission date
        let filters = &query.filters;
        if filters.year_min.is_some() || filters.year_max.is_some() {
            let from = filters
                .year_min
                .map(|y| format!("{}01010000", y))
                .unwrap_or_else(|| "*".to_string());
            let to = filters
                .year_max
                .map(|y| format!("{}12312359", y))
                .unwrap_or_else(|| "*".to_string());
            parts.push(format!("submittedDate:[{} TO {}]", from, to));
        }

        parts.join(" AND ")
    }

    /// Parse arXiv Atom feed entry into a Record
    fn parse_entry(&self, entry: &feed_rs::model::Entry) -> Record {
        let title = entry
            .title
            .as_ref()
            .map(|t| t.content.as_str())
            .unwrap_or("");

        let authors = entry.authors.iter().map(|a| a.name.as_str());

        let year = entry
            .published
            .or(entry.updated)
            .map(|d| d.format("%Y").to_string())
            .unwrap_or_default();

        let url = entry
            .links
            .iter()
            .find(|l| l.rel.as_deref() == Some("alternate"))
            .or_else(|| entry.links.first())
            .map(|l| l.href.clone())
            .unwrap_or_else(|| entry.id.clone());

        let doi = Self::parse_id(&entry.id)
            .and_then(|id| Self::doi_for(&id))
            .unwrap_or_default();

        let license = entry
            .rights
            .as_ref()
            .map(|r| r.content.as_str())
            .unwrap_or("");

        RecordBuilder::new(title, self.name())
            .authors(authors)
            .year_text(&year)
            .venue("arXiv")
            .doi(doi)
            .license(license)
            .url(url)
            .build()
    }
}

#[async_trait]
impl Source for ArxivSource {
    fn id(&self) -> &str {
        "arxiv"
    }

    fn name(&self) -> &str {
        "arXiv"
    }

    fn rate_limiter(&self) -> &RateLimiter {
        &self.rate_limiter
    }

    async fn search(&self, query: &Query) -> Result<Vec<Record>, SourceError> {
        let params = [
            ("search_query", Self::build_search_query(query)),
            ("start", "0".to_string()),
            ("max_results", query.limit.min(MAX_RESULTS).to_string()),
            ("sortBy", "relevance".to_string()),
            ("sortOrder", "descending".to_string()),
        ];

        let body = self.client.get_text(&self.base_url, &params).await?;

        let feed = parser::parse(body.as_bytes())
            .map_err(|e| SourceError::Parse(format!("Failed to parse Atom feed: {}", e)))?;

        let records: Vec<Record> = feed
            .entries
            .iter()
            .map(|entry| self.parse_entry(entry))
            .take(query.limit)
            .collect();

        tracing::debug!("arXiv returned {} records", records.len());
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Doi, Year, NOT_AVAILABLE};
    use mockito::Matcher;

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
    <title>arXiv Search Results</title>
    <entry>
        <id>http://arxiv.org/abs/2301.12345v2</id>
        <title>Graph Neural
            Networks: A Review</title>
        <summary>Test abstract</summary>
        <published>2023-01-15T10:00:00Z</published>
        <author><name>Jie Zhou</name></author>
        <author><name>Ganqu Cui</name></author>
        <link rel="alternate" type="text/html" href="http://arxiv.org/abs/2301.12345v2"/>
        <link rel="related" type="application/pdf" href="http://arxiv.org/pdf/2301.12345v2.pdf"/>
    </entry>
    <entry>
        <id>http://arxiv.org/abs/math.GT/0104020v1</id>
        <title>Old Style Identifier</title>
        <published>2001-04-02T00:00:00Z</published>
        <author><name>Someone</name></author>
    </entry>
</feed>"#;

    fn source_for(server: &mockito::Server) -> ArxivSource {
        let client = HttpClient::new(Duration::from_secs(5)).unwrap();
        ArxivSource::new(client).with_base_url(format!("{}/api/query", server.url()))
    }

    #[test]
    fn test_parse_id() {
        assert_eq!(ArxivSource::parse_id("2301.12345").as_deref(), Some("2301.12345"));
        assert_eq!(ArxivSource::parse_id("2301.12345v2").as_deref(), Some("2301.12345"));
        assert_eq!(
            ArxivSource::parse_id("http://arxiv.org/abs/2301.12345v1").as_deref(),
            Some("2301.12345")
        );
        assert_eq!(
            ArxivSource::parse_id("http://arxiv.org/abs/math.GT/0104020v2").as_deref(),
            Some("math.GT/0104020")
        );
        assert_eq!(ArxivSource::parse_id(""), None);
    }

    #[test]
    fn test_build_search_query() {
        let keyword = ArxivSource::build_search_query(&Query::new("graph neural networks"));
        assert_eq!(keyword, "all:\"graph neural networks\"");

        let title =
            ArxivSource::build_search_query(&Query::new("attention").search_type(SearchType::Title));
        assert_eq!(title, "ti:\"attention\"");

        let author = ArxivSource::build_search_query(
            &Query::new("Hinton")
                .search_type(SearchType::Author)
                .years(Some(2020), None),
        );
        assert_eq!(author, "au:\"Hinton\" AND submittedDate:[202001010000 TO *]");
    }

    #[tokio::test]
    async fn test_search_parses_feed() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/query")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("search_query".into(), "all:\"gnn\"".into()),
                Matcher::UrlEncoded("max_results".into(), "5".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/atom+xml")
            .with_body(FEED)
            .create_async()
            .await;

        let source = source_for(&server);
        let records = source.search(&Query::new("gnn").limit(5)).await.unwrap();

        mock.assert_async().await;
        assert_eq!(records.len(), 2);

        let first = &records[0];
        assert_eq!(first.title, "Graph Neural Networks: A Review");
        assert_eq!(first.authors, "Jie Zhou, Ganqu Cui");
        assert_eq!(first.year, Year::Dated(2023));
        assert_eq!(first.venue, "arXiv");
        assert_eq!(first.source, "arXiv");
        assert_eq!(first.doi, Doi::Valid("10.48550/arXiv.2301.12345".to_string()));
        assert_eq!(first.url, "http://arxiv.org/abs/2301.12345v2");
        assert_eq!(first.citation_count, 0);
        assert_eq!(first.license, NOT_AVAILABLE);

        assert_eq!(records[1].doi, Doi::Absent);
        assert_eq!(records[1].year, Year::Dated(2001));
    }

    #[tokio::test]
    async fn test_search_http_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/query")
            .match_query(Matcher::Any)
            .with_status(503)
            .create_async()
            .await;

        let result = source_for(&server).search(&Query::new("gnn")).await;
        assert!(matches!(result, Err(SourceError::Api(_))));
    }

    #[tokio::test]
    async fn test_search_invalid_feed() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/query")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body("not a feed")
            .create_async()
            .await;

        let result = source_for(&server).search(&Query::new("gnn")).await;
        assert!(matches!(result, Err(SourceError::Parse(_))));
    }
}
