//! Semantic Scholar source implementation.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use crate::models::{Query, Record, RecordBuilder, SearchType};
use crate::sources::{Source, SourceError};
use crate::utils::{HttpClient, RateLimiter};

const SEMANTIC_SCHOLAR_API_URL: &str = "https://api.semanticscholar.org/graph/v1/paper/search";

const FIELDS: &str = "title,authors,year,url,citationCount,venue,openAccessPdf,externalIds";

/// Semantic Scholar source
///
/// The graph search endpoint has no field-specific search, so title searches
/// are sent as an exact phrase and author searches as plain text. Year and
/// citation filters are passed through to the API.
#[derive(Debug)]
pub struct SemanticScholarSource {
    client: HttpClient,
    base_url: String,
    api_key: Option<String>,
    rate_limiter: RateLimiter,
}

impl SemanticScholarSource {
    pub fn new(client: HttpClient, api_key: Option<String>) -> Self {
        let api_key = api_key.filter(|k| !k.trim().is_empty());
        let rate_limiter = RateLimiter::for_credential(
            api_key.is_some(),
            Duration::from_secs(1),
            Duration::from_secs(10),
        );

        Self {
            client,
            base_url: SEMANTIC_SCHOLAR_API_URL.to_string(),
            api_key,
            rate_limiter,
        }
    }

    /// Point the source at a different API endpoint (for testing)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn build_params(query: &Query) -> Vec<(&'static str, String)> {
        let text = query.text.trim();
        let api_query = match query.search_type {
            SearchType::Title => format!("\"{}\"", text),
            SearchType::Keyword | SearchType::Author => text.to_string(),
        };

        let mut params = vec![
            ("query", api_query),
            ("limit", query.limit.min(100).to_string()),
            ("fields", FIELDS.to_string()),
        ];

        let year = match (query.filters.year_min, query.filters.year_max) {
            (Some(min), Some(max)) => Some(format!("{}-{}", min, max)),
            (Some(min), None) => Some(format!("{}-", min)),
            (None, Some(max)) => Some(format!("-{}", max)),
            (None, None) => None,
        };
        if let Some(year) = year {
            params.push(("year", year));
        }

        if let Some(min) = query.filters.min_citations {
            params.push(("minCitationCount", min.to_string()));
        }

        params
    }

    fn parse_paper(&self, paper: S2Paper) -> Record {
        let authors = paper.authors.iter().filter_map(|a| a.name.as_deref());

        let doi = paper
            .external_ids
            .as_ref()
            .and_then(|ids| ids.doi.as_deref())
            .unwrap_or("");

        let license = paper
            .open_access_pdf
            .as_ref()
            .and_then(|pdf| pdf.license.as_deref())
            .unwrap_or("");

        let mut builder = RecordBuilder::new(paper.title.as_deref().unwrap_or(""), self.name())
            .authors(authors)
            .venue(paper.venue.as_deref().unwrap_or(""))
            .citations(paper.citation_count.unwrap_or(0))
            .doi(doi)
            .license(license)
            .url(paper.url.as_deref().unwrap_or(""));

        if let Some(year) = paper.year {
            builder = builder.year(year);
        }

        builder.build()
    }
}

#[derive(Debug, Deserialize)]
struct S2SearchResponse {
    #[serde(default)]
    data: Vec<S2Paper>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct S2Paper {
    title: Option<String>,
    #[serde(default)]
    authors: Vec<S2Author>,
    year: Option<u16>,
    url: Option<String>,
    citation_count: Option<u32>,
    venue: Option<String>,
    open_access_pdf: Option<S2OpenAccessPdf>,
    external_ids: Option<S2ExternalIds>,
}

#[derive(Debug, Deserialize)]
struct S2Author {
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct S2OpenAccessPdf {
    license: Option<String>,
}

#[derive(Debug, Deserialize)]
struct S2ExternalIds {
    #[serde(rename = "DOI")]
    doi: Option<String>,
}

#[async_trait]
impl Source for SemanticScholarSource {
    fn id(&self) -> &str {
        "semantic"
    }

    fn name(&self) -> &str {
        "Semantic Scholar"
    }

    fn rate_limiter(&self) -> &RateLimiter {
        &self.rate_limiter
    }

    async fn search(&self, query: &Query) -> Result<Vec<Record>, SourceError> {
        let params = Self::build_params(query);

        let headers: Vec<(&str, &str)> = match &self.api_key {
            Some(key) => vec![("x-api-key", key.as_str())],
            None => Vec::new(),
        };

        let response: S2SearchResponse = self
            .client
            .get_json(&self.base_url, &params, &headers)
            .await?;

        let records: Vec<Record> = response
            .data
            .into_iter()
            .map(|paper| self.parse_paper(paper))
            .take(query.limit)
            .collect();

        tracing::debug!("Semantic Scholar returned {} records", records.len());
        Ok(records)
    }
}
