//! OpenAlex source implementation.

use async_trait::async_trait;
use serde::Deserialize;
use std::time::Duration;

use crate::models::{Query, Record, RecordBuilder, SearchType};
use crate::sources::{Source, SourceError};
use crate::utils::{HttpClient, RateLimiter};

const OPENALEX_API_URL: &str = "https://api.openalex.org/works";

const SELECT_FIELDS: &str = "id,display_name,publication_year,primary_location,authorships,cited_by_count,doi,best_oa_location";

/// OpenAlex source
///
/// A contact e-mail puts requests in the polite pool.
#[derive(Debug)]
pub struct OpenAlexSource {
    client: HttpClient,
    base_url: String,
    email: Option<String>,
    rate_limiter: RateLimiter,
}

impl OpenAlexSource {
    pub fn new(client: HttpClient, email: Option<String>) -> Self {
        let email = email.filter(|e| !e.trim().is_empty());
        let rate_limiter = RateLimiter::for_credential(
            email.is_some(),
            Duration::from_millis(100),
            Duration::from_millis(500),
        );

        Self {
            client,
            base_url: OPENALEX_API_URL.to_string(),
            email,
            rate_limiter,
        }
    }

    /// Point the source at a different API endpoint (for testing)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    fn build_params(&self, query: &Query) -> Vec<(&'static str, String)> {
        let text = query.text.trim();
        let mut params = vec![
            ("per-page", query.limit.min(200).to_string()),
            ("select", SELECT_FIELDS.to_string()),
        ];

        // Commas separate filters, so they cannot appear in a filter value
        let mut filters = Vec::new();
        match query.search_type {
            SearchType::Keyword => params.push(("search", text.to_string())),
            SearchType::Title => filters.push(format!("title.search:{}", text.replace(',', " "))),
            SearchType::Author => {
                filters.push(format!("raw_author_name.search:{}", text.replace(',', " ")))
            }
        }

        match (query.filters.year_min, query.filters.year_max) {
            (Some(min), Some(max)) => filters.push(format!("publication_year:{}-{}", min, max)),
            (Some(min), None) => filters.push(format!("publication_year:>{}", min.saturating_sub(1))),
            (None, Some(max)) => filters.push(format!("publication_year:<{}", max.saturating_add(1))),
            (None, None) => {}
        }

        if let Some(min) = query.filters.min_citations {
            if min > 0 {
                filters.push(format!("cited_by_count:>{}", min - 1));
            }
        }

        if !filters.is_empty() {
            params.push(("filter", filters.join(",")));
        }

        if let Some(email) = &self.email {
            params.push(("mailto", email.clone()));
        }

        params
    }

    fn parse_work(&self, work: OAWork) -> Record {
        let authors = work
            .authorships
            .iter()
            .filter_map(|a| a.author.as_ref())
            .filter_map(|a| a.display_name.as_deref());

        let venue = work
            .primary_location
            .as_ref()
            .and_then(|l| l.source.as_ref())
            .and_then(|s| s.display_name.as_deref())
            .unwrap_or("");

        let license = work
            .best_oa_location
            .as_ref()
            .and_then(|l| l.license.as_deref())
            .unwrap_or("");

        let mut builder = RecordBuilder::new(work.display_name.as_deref().unwrap_or(""), self.name())
            .authors(authors)
            .venue(venue)
            .citations(work.cited_by_count.unwrap_or(0))
            .doi(work.doi.as_deref().unwrap_or(""))
            .license(license)
            .url(work.id.as_deref().unwrap_or(""));

        if let Some(year) = work.publication_year {
            builder = builder.year(year);
        }

        builder.build()
    }
}

#[derive(Debug, Deserialize)]
struct OAWorksResponse {
    #[serde(default)]
    results: Vec<OAWork>,
}

#[derive(Debug, Deserialize)]
struct OAWork {
    id: Option<String>,
    display_name: Option<String>,
    publication_year: Option<u16>,
    primary_location: Option<OALocation>,
    #[serde(default)]
    authorships: Vec<OAAuthorship>,
    cited_by_count: Option<u32>,
    doi: Option<String>,
    best_oa_location: Option<OALocation>,
}

#[derive(Debug, Deserialize)]
struct OALocation {
    source: Option<OASource>,
    license: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OASource {
    display_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OAAuthorship {
    author: Option<OAAuthor>,
}

#[derive(Debug, Deserialize)]
struct OAAuthor {
    display_name: Option<String>,
}

#[async_trait]
impl Source for OpenAlexSource {
    fn id(&self) -> &str {
        "openalex"
    }

    fn name(&self) -> &str {
        "OpenAlex"
    }

    fn rate_limiter(&self) -> &RateLimiter {
        &self.rate_limiter
    }

    async fn search(&self, query: &Query) -> Result<Vec<Record>, SourceError> {
        let params = self.build_params(query);
        let response: OAWorksResponse = self.client.get_json(&self.base_url, &params, &[]).await?;

        let records: Vec<Record> = response
            .results
            .into_iter()
            .map(|work| self.parse_work(work))
            .take(query.limit)
            .collect();

        tracing::debug!("OpenAlex returned {} records", records.len());
        Ok(records)
    }
}
