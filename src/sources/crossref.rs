//! CrossRef source implementation.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use crate::models::{Query, Record, RecordBuilder, SearchType};
use crate::sources::{Source, SourceError};
use crate::utils::{HttpClient, RateLimiter};

const CROSSREF_API_URL: &str = "https://api.crossref.org/works";

/// Fields requested from the works endpoint
const SELECT_FIELDS: &str =
    "title,author,container-title,DOI,created,license,URL,is-referenced-by-count";

/// CrossRef source
///
/// Uses the CrossRef REST works API. Supplying a contact e-mail (`mailto`)
/// moves requests into the polite pool, which allows a shorter interval.
#[derive(Debug)]
pub struct CrossRefSource {
    client: HttpClient,
    base_url: String,
    mailto: Option<String>,
    rate_limiter: RateLimiter,
}

impl CrossRefSource {
    pub fn new(client: HttpClient, mailto: Option<String>) -> Self {
        let mailto = mailto.filter(|m| !m.trim().is_empty());
        let rate_limiter = RateLimiter::for_credential(
            mailto.is_some(),
            Duration::from_secs(1),
            Duration::from_secs(2),
        );

        Self {
            client,
            base_url: CROSSREF_API_URL.to_string(),
            mailto,
            rate_limiter,
        }
    }

    /// Point the source at a different API endpoint (for testing)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn build_params(&self, query: &Query) -> Vec<(&'static str, String)> {
        let field = match query.search_type {
            SearchType::Keyword => "query",
            SearchType::Title => "query.title",
            SearchType::Author => "query.author",
        };

        let mut params = vec![
            (field, query.text.trim().to_string()),
            ("rows", query.limit.to_string()),
            ("select", SELECT_FIELDS.to_string()),
        ];

        let mut filters = Vec::new();
        if let Some(min) = query.filters.year_min {
            filters.push(format!("from-pub-date:{}", min));
        }
        if let Some(max) = query.filters.year_max {
            filters.push(format!("until-pub-date:{}", max));
        }
        if !filters.is_empty() {
            params.push(("filter", filters.join(",")));
        }

        if let Some(mailto) = &self.mailto {
            params.push(("mailto", mailto.clone()));
        }

        params
    }

    fn parse_item(&self, item: CrossRefItem) -> Record {
        let title = item.title.first().map(String::as_str).unwrap_or("");

        let authors = item.author.iter().filter_map(|a| {
            match (a.given.as_deref(), a.family.as_deref(), a.name.as_deref()) {
                (Some(given), Some(family), _) => Some(format!("{} {}", given, family)),
                (None, Some(family), _) => Some(family.to_string()),
                (_, None, Some(name)) => Some(name.to_string()),
                _ => None,
            }
        });

        let year = item
            .created
            .and_then(|c| c.date_time)
            .unwrap_or_default();

        let venue = item.container_title.first().map(String::as_str).unwrap_or("");

        let license = item
            .license
            .into_iter()
            .find_map(|l| l.url)
            .unwrap_or_default();

        RecordBuilder::new(title, self.name())
            .authors(authors)
            .year_text(&year)
            .venue(venue)
            .citations(item.is_referenced_by_count.unwrap_or(0))
            .doi(item.doi.unwrap_or_default())
            .license(license)
            .url(item.url.unwrap_or_default())
            .build()
    }
}

#[derive(Debug, Deserialize)]
struct CrossRefResponse {
    message: CrossRefMessage,
}

#[derive(Debug, Deserialize)]
struct CrossRefMessage {
    #[serde(default)]
    items: Vec<CrossRefItem>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct CrossRefItem {
    #[serde(default)]
    title: Vec<String>,
    #[serde(default)]
    author: Vec<CrossRefAuthor>,
    #[serde(default)]
    container_title: Vec<String>,
    #[serde(rename = "DOI", default)]
    doi: Option<String>,
    #[serde(default)]
    created: Option<CrossRefDate>,
    #[serde(default)]
    license: Vec<CrossRefLicense>,
    #[serde(rename = "URL", default)]
    url: Option<String>,
    #[serde(default)]
    is_referenced_by_count: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct CrossRefAuthor {
    given: Option<String>,
    family: Option<String>,
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CrossRefDate {
    #[serde(rename = "date-time")]
    date_time: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CrossRefLicense {
    #[serde(rename = "URL")]
    url: Option<String>,
}

#[async_trait]
impl Source for CrossRefSource {
    fn id(&self) -> &str {
        "crossref"
    }

    fn name(&self) -> &str {
        "CrossRef"
    }

    fn rate_limiter(&self) -> &RateLimiter {
        &self.rate_limiter
    }

    async fn search(&self, query: &Query) -> Result<Vec<Record>, SourceError> {
        let params = self.build_params(query);
        let response: CrossRefResponse = self.client.get_json(&self.base_url, &params, &[]).await?;

        let records: Vec<Record> = response
            .message
            .items
            .into_iter()
            .map(|item| self.parse_item(item))
            .take(query.limit)
            .collect();

        tracing::debug!("CrossRef returned {} records", records.len());
        Ok(records)
    }
}
