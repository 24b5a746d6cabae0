//! PubMed source implementation using the NCBI E-utilities API.
//!
//! A search takes up to three requests: `esearch` returns matching PMIDs,
//! `efetch` returns the article XML for those ids, and the NIH iCite API
//! supplies citation counts, which E-utilities does not report.

use async_trait::async_trait;
use quick_xml::de::from_str;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

use crate::models::{Query, Record, RecordBuilder, SearchType};
use crate::sources::{Source, SourceError};
use crate::utils::{HttpClient, RateLimiter};

const EUTILS_BASE_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils";
const ICITE_API_URL: &str = "https://icite.od.nih.gov/api/pubs";

/// PubMed source
///
/// NCBI allows 10 requests per second with an API key and 3 without.
#[derive(Debug)]
pub struct PubMedSource {
    client: HttpClient,
    base_url: String,
    icite_url: String,
    api_key: Option<String>,
    rate_limiter: RateLimiter,
}

impl PubMedSource {
    pub fn new(client: HttpClient, api_key: Option<String>) -> Self {
        let api_key = api_key.filter(|k| !k.trim().is_empty());
        let rate_limiter = RateLimiter::for_credential(
            api_key.is_some(),
            Duration::from_millis(100),
            Duration::from_millis(330),
        );

        Self {
            client,
            base_url: EUTILS_BASE_URL.to_string(),
            icite_url: ICITE_API_URL.to_string(),
            api_key,
            rate_limiter,
        }
    }

    /// Point the source at a different E-utilities root (for testing)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    /// Point citation lookups at a different iCite endpoint (for testing)
    pub fn with_icite_url(mut self, icite_url: impl Into<String>) -> Self {
        self.icite_url = icite_url.into();
        self
    }

    fn search_term(query: &Query) -> String {
        let text = query.text.trim();
        match query.search_type {
            SearchType::Keyword => text.to_string(),
            SearchType::Title => format!("{}[Title]", text),
            SearchType::Author => format!("{}[Author]", text),
        }
    }

    fn build_search_params(&self, query: &Query) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("db", "pubmed".to_string()),
            ("term", Self::search_term(query)),
            ("retmode", "json".to_string()),
            ("retmax", query.limit.to_string()),
        ];

        if query.filters.year_min.is_some() || query.filters.year_max.is_some() {
            let min = query.filters.year_min.unwrap_or(1800);
            let max = query.filters.year_max.unwrap_or(3000);
            params.push(("datetype", "pdat".to_string()));
            params.push(("mindate", min.to_string()));
            params.push(("maxdate", max.to_string()));
        }

        self.push_api_key(&mut params);
        params
    }

    fn build_fetch_params(&self, pmids: &[String]) -> Vec<(&'static str, String)> {
        let mut params = vec![
            ("db", "pubmed".to_string()),
            ("id", pmids.join(",")),
            ("retmode", "xml".to_string()),
        ];
        self.push_api_key(&mut params);
        params
    }

    fn push_api_key(&self, params: &mut Vec<(&'static str, String)>) {
        if let Some(key) = &self.api_key {
            params.push(("api_key", key.clone()));
        }
    }

    /// Citation counts by PMID. A failed lookup leaves every count at zero.
    async fn citation_counts(&self, pmids: &[String]) -> HashMap<String, u32> {
        let params = [("pmids", pmids.join(","))];
        match self
            .client
            .get_json::<ICiteResponse>(&self.icite_url, &params, &[])
            .await
        {
            Ok(response) => response
                .data
                .into_iter()
                .map(|publication| (publication.pmid.to_string(), publication.citation_count))
                .collect(),
            Err(e) => {
                tracing::warn!("Could not fetch PubMed citation counts: {}", e);
                HashMap::new()
            }
        }
    }

    fn parse_articles(xml: &str) -> Result<Vec<PubmedArticle>, SourceError> {
        let set: PubmedArticleSet = from_str(xml)
            .map_err(|e| SourceError::Parse(format!("Failed to parse PubMed XML: {}", e)))?;
        Ok(set.articles)
    }

    fn parse_article(&self, article: PubmedArticle, citations: &HashMap<String, u32>) -> Record {
        let citation = article.citation;
        let pmid = citation.pmid.map(|p| p.value).unwrap_or_default();
        let details = citation.article;

        let authors = details
            .author_list
            .map(|list| list.authors)
            .unwrap_or_default()
            .into_iter()
            .filter_map(Author::display_name);

        let journal = details.journal;
        let year = journal
            .as_ref()
            .and_then(|j| j.issue.as_ref())
            .and_then(|i| i.pub_date.as_ref())
            .and_then(|d| d.year.as_deref().or(d.medline_date.as_deref()))
            .unwrap_or("");
        let venue = journal.as_ref().and_then(|j| j.title.as_deref()).unwrap_or("");

        let doi = article
            .pubmed_data
            .and_then(|data| data.article_ids)
            .and_then(|list| list.ids.into_iter().find(|id| id.id_type == "doi"))
            .map(|id| id.value)
            .unwrap_or_default();

        let url = if pmid.is_empty() {
            String::new()
        } else {
            format!("https://pubmed.ncbi.nlm.nih.gov/{}/", pmid)
        };

        RecordBuilder::new(details.title.unwrap_or_default(), self.name())
            .authors(authors)
            .year_text(year)
            .venue(venue)
            .citations(citations.get(&pmid).copied().unwrap_or(0))
            .doi(doi)
            .url(url)
            .build()
    }
}

#[derive(Debug, Deserialize)]
struct ESearchResponse {
    esearchresult: ESearchResult,
}

#[derive(Debug, Deserialize)]
struct ESearchResult {
    #[serde(default)]
    idlist: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ICiteResponse {
    #[serde(default)]
    data: Vec<ICitePublication>,
}

#[derive(Debug, Deserialize)]
struct ICitePublication {
    pmid: u64,
    #[serde(default, alias = "citations")]
    citation_count: u32,
}

#[derive(Debug, Deserialize)]
struct PubmedArticleSet {
    #[serde(rename = "PubmedArticle", default)]
    articles: Vec<PubmedArticle>,
}

#[derive(Debug, Deserialize)]
struct PubmedArticle {
    #[serde(rename = "MedlineCitation")]
    citation: MedlineCitation,
    #[serde(rename = "PubmedData")]
    pubmed_data: Option<PubmedData>,
}

#[derive(Debug, Deserialize)]
struct MedlineCitation {
    #[serde(rename = "PMID")]
    pmid: Option<Text>,
    #[serde(rename = "Article")]
    article: Article,
}

#[derive(Debug, Deserialize)]
struct Text {
    #[serde(rename = "$text", default)]
    value: String,
}

#[derive(Debug, Deserialize)]
struct Article {
    #[serde(rename = "Journal")]
    journal: Option<Journal>,
    #[serde(rename = "ArticleTitle")]
    title: Option<String>,
    #[serde(rename = "AuthorList")]
    author_list: Option<AuthorList>,
}

#[derive(Debug, Deserialize)]
struct Journal {
    #[serde(rename = "JournalIssue")]
    issue: Option<JournalIssue>,
    #[serde(rename = "Title")]
    title: Option<String>,
}

#[derive(Debug, Deserialize)]
struct JournalIssue {
    #[serde(rename = "PubDate")]
    pub_date: Option<PubDate>,
}

#[derive(Debug, Deserialize)]
struct PubDate {
    #[serde(rename = "Year")]
    year: Option<String>,
    #[serde(rename = "MedlineDate")]
    medline_date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AuthorList {
    #[serde(rename = "Author", default)]
    authors: Vec<Author>,
}

#[derive(Debug, Deserialize)]
struct Author {
    #[serde(rename = "LastName")]
    last_name: Option<String>,
    #[serde(rename = "ForeName")]
    fore_name: Option<String>,
    #[serde(rename = "CollectiveName")]
    collective_name: Option<String>,
}

impl Author {
    fn display_name(self) -> Option<String> {
        match (self.fore_name, self.last_name, self.collective_name) {
            (Some(fore), Some(last), _) => Some(format!("{} {}", fore, last)),
            (None, Some(last), _) => Some(last),
            (_, None, collective) => collective,
        }
    }
}

#[derive(Debug, Deserialize)]
struct PubmedData {
    #[serde(rename = "ArticleIdList")]
    article_ids: Option<ArticleIdList>,
}

#[derive(Debug, Deserialize)]
struct ArticleIdList {
    #[serde(rename = "ArticleId", default)]
    ids: Vec<ArticleId>,
}

#[derive(Debug, Deserialize)]
struct ArticleId {
    #[serde(rename = "@IdType", default)]
    id_type: String,
    #[serde(rename = "$text", default)]
    value: String,
}

#[async_trait]
impl Source for PubMedSource {
    fn id(&self) -> &str {
        "pubmed"
    }

    fn name(&self) -> &str {
        "PubMed"
    }

    fn rate_limiter(&self) -> &RateLimiter {
        &self.rate_limiter
    }

    async fn search(&self, query: &Query) -> Result<Vec<Record>, SourceError> {
        let search_url = format!("{}/esearch.fcgi", self.base_url);
        let found: ESearchResponse = self
            .client
            .get_json(&search_url, &self.build_search_params(query), &[])
            .await?;

        let mut pmids = found.esearchresult.idlist;
        pmids.truncate(query.limit);
        if pmids.is_empty() {
            tracing::debug!("PubMed found no articles");
            return Ok(Vec::new());
        }

        // The aggregator only paid for the esearch call
        self.rate_limiter.acquire().await;
        let fetch_url = format!("{}/efetch.fcgi", self.base_url);
        let xml = self
            .client
            .get_text(&fetch_url, &self.build_fetch_params(&pmids))
            .await?;
        let articles = Self::parse_articles(&xml)?;

        let citations = self.citation_counts(&pmids).await;
        let records: Vec<Record> = articles
            .into_iter()
            .map(|article| self.parse_article(article, &citations))
            .collect();

        tracing::debug!("PubMed returned {} records", records.len());
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Doi, Year, NOT_AVAILABLE};
    use mockito::Matcher;

    const ESEARCH: &str = r#"{
        "header": {"type": "esearch", "version": "0.3"},
        "esearchresult": {"count": "2", "retmax": "2", "idlist": ["31000001", "31000002"]}
    }"#;

    const EFETCH: &str = r#"<?xml version="1.0" ?>
<PubmedArticleSet>
  <PubmedArticle>
    <MedlineCitation Status="MEDLINE" Owner="NLM">
      <PMID Version="1">31000001</PMID>
      <Article PubModel="Print">
        <Journal>
          <JournalIssue CitedMedium="Internet">
            <PubDate><Year>2019</Year><Month>Jun</Month></PubDate>
          </JournalIssue>
          <Title>Nature methods</Title>
        </Journal>
        <ArticleTitle>Graph neural networks for protein interfaces.</ArticleTitle>
        <AuthorList CompleteYN="Y">
          <Author ValidYN="Y"><LastName>Smith</LastName><ForeName>Jane</ForeName></Author>
          <Author ValidYN="Y"><LastName>Doe</LastName></Author>
          <Author ValidYN="Y"><CollectiveName>GNN Consortium</CollectiveName></Author>
        </AuthorList>
      </Article>
    </MedlineCitation>
    <PubmedData>
      <ArticleIdList>
        <ArticleId IdType="pubmed">31000001</ArticleId>
        <ArticleId IdType="doi">10.1038/s41592-019-0001-x</ArticleId>
      </ArticleIdList>
    </PubmedData>
  </PubmedArticle>
  <PubmedArticle>
    <MedlineCitation Status="MEDLINE" Owner="NLM">
      <PMID Version="1">31000002</PMID>
      <Article PubModel="Print">
        <Journal>
          <JournalIssue CitedMedium="Print">
            <PubDate><MedlineDate>1998 Dec-1999 Jan</MedlineDate></PubDate>
          </JournalIssue>
        </Journal>
        <ArticleTitle>Sparse record</ArticleTitle>
      </Article>
    </MedlineCitation>
  </PubmedArticle>
</PubmedArticleSet>"#;

    const ICITE: &str = r#"{
        "meta": {"pmids": "31000001,31000002"},
        "data": [{"pmid": 31000001, "citation_count": 42, "year": 2019}]
    }"#;

    fn client() -> HttpClient {
        HttpClient::new(Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_rate_limit_depends_on_api_key() {
        let keyed = PubMedSource::new(client(), Some("key".into()));
        let anonymous = PubMedSource::new(client(), Some("  ".into()));

        assert_eq!(keyed.rate_limiter().interval(), Duration::from_millis(100));
        assert_eq!(anonymous.rate_limiter().interval(), Duration::from_millis(330));
    }

    #[test]
    fn test_build_search_params() {
        let source = PubMedSource::new(client(), Some("key".into()));

        let keyword = source.build_search_params(&Query::new("crispr").years(Some(2015), None));
        assert!(keyword.contains(&("term", "crispr".to_string())));
        assert!(keyword.contains(&("retmode", "json".to_string())));
        assert!(keyword.contains(&("mindate", "2015".to_string())));
        assert!(keyword.contains(&("maxdate", "3000".to_string())));
        assert!(keyword.contains(&("api_key", "key".to_string())));

        let title = PubMedSource::new(client(), None)
            .build_search_params(&Query::new("gene editing").search_type(SearchType::Title));
        assert!(title.contains(&("term", "gene editing[Title]".to_string())));
        assert!(!title.iter().any(|(k, _)| *k == "api_key" || *k == "datetype"));

        assert_eq!(
            PubMedSource::search_term(&Query::new("Doudna").search_type(SearchType::Author)),
            "Doudna[Author]"
        );
    }

    #[test]
    fn test_malformed_xml_is_parse_error() {
        let err = PubMedSource::parse_articles("<PubmedArticleSet><PubmedArticle>").unwrap_err();
        assert!(matches!(err, SourceError::Parse(_)));
    }

    #[tokio::test]
    async fn test_search_fetches_articles_and_citations() {
        let mut server = mockito::Server::new_async().await;
        let esearch = server
            .mock("GET", "/esearch.fcgi")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("term".into(), "graph neural networks".into()),
                Matcher::UrlEncoded("api_key".into(), "key".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(ESEARCH)
            .create_async()
            .await;
        let efetch = server
            .mock("GET", "/efetch.fcgi")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("id".into(), "31000001,31000002".into()),
                Matcher::UrlEncoded("retmode".into(), "xml".into()),
            ]))
            .with_status(200)
            .with_header("content-type", "text/xml")
            .with_body(EFETCH)
            .create_async()
            .await;
        let icite = server
            .mock("GET", "/icite")
            .match_query(Matcher::UrlEncoded("pmids".into(), "31000001,31000002".into()))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(ICITE)
            .create_async()
            .await;

        let source = PubMedSource::new(client(), Some("key".into()))
            .with_base_url(server.url())
            .with_icite_url(format!("{}/icite", server.url()));
        let records = source
            .search(&Query::new("graph neural networks"))
            .await
            .unwrap();

        esearch.assert_async().await;
        efetch.assert_async().await;
        icite.assert_async().await;
        assert_eq!(records.len(), 2);

        let first = &records[0];
        assert_eq!(first.title, "Graph neural networks for protein interfaces.");
        assert_eq!(first.authors, "Jane Smith, Doe, GNN Consortium");
        assert_eq!(first.year, Year::Dated(2019));
        assert_eq!(first.venue, "Nature methods");
        assert_eq!(first.source, "PubMed");
        assert_eq!(first.citation_count, 42);
        assert_eq!(first.doi, Doi::Valid("10.1038/s41592-019-0001-x".to_string()));
        assert_eq!(first.url, "https://pubmed.ncbi.nlm.nih.gov/31000001/");

        let sparse = &records[1];
        assert_eq!(sparse.year, Year::Dated(1998));
        assert_eq!(sparse.authors, NOT_AVAILABLE);
        assert_eq!(sparse.venue, NOT_AVAILABLE);
        assert_eq!(sparse.citation_count, 0);
        assert_eq!(sparse.doi, Doi::Absent);
    }

    #[tokio::test]
    async fn test_no_matches_skips_efetch() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/esearch.fcgi")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"esearchresult": {"count": "0", "idlist": []}}"#)
            .create_async()
            .await;
        let efetch = server
            .mock("GET", "/efetch.fcgi")
            .match_query(Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let source = PubMedSource::new(client(), None).with_base_url(server.url());
        let records = source.search(&Query::new("nothing")).await.unwrap();

        assert!(records.is_empty());
        efetch.assert_async().await;
    }

    #[tokio::test]
    async fn test_citation_lookup_failure_keeps_records() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/esearch.fcgi")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(ESEARCH)
            .create_async()
            .await;
        server
            .mock("GET", "/efetch.fcgi")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(EFETCH)
            .create_async()
            .await;
        server
            .mock("GET", "/icite")
            .match_query(Matcher::Any)
            .with_status(500)
            .create_async()
            .await;

        let source = PubMedSource::new(client(), Some("key".into()))
            .with_base_url(server.url())
            .with_icite_url(format!("{}/icite", server.url()));
        let records = source.search(&Query::new("gnn")).await.unwrap();

        assert_eq!(records.len(), 2);
        assert!(records.iter().all(|r| r.citation_count == 0));
    }

    #[tokio::test]
    async fn test_esearch_failure_is_reported() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/esearch.fcgi")
            .match_query(Matcher::Any)
            .with_status(429)
            .create_async()
            .await;

        let source = PubMedSource::new(client(), None).with_base_url(server.url());
        let err = source.search(&Query::new("gnn")).await.unwrap_err();
        assert!(matches!(err, SourceError::RateLimit));
    }
}
