//! Registry of available source adapters.
//!
//! Each compiled-in adapter contributes a [`SourceDescriptor`] whose factory
//! builds it from a [`SourceContext`]. An adapter whose factory fails is
//! skipped with a warning, so a missing runtime requirement never stops the
//! other providers from being used.

use std::sync::Arc;

use super::{Source, SourceError};
use crate::config::{Config, Credentials, SearchConfig};
use crate::utils::HttpClient;

/// Everything an adapter factory needs
#[derive(Debug, Clone)]
pub struct SourceContext {
    pub http: HttpClient,
    pub credentials: Credentials,
}

impl SourceContext {
    /// Build the shared HTTP client from configuration
    pub fn from_config(config: &Config) -> Result<Self, SourceError> {
        Ok(Self {
            http: HttpClient::new(config.http.timeout())?,
            credentials: config.credentials.clone(),
        })
    }
}

/// Factory signature of a compiled-in adapter
pub type SourceFactory = fn(&SourceContext) -> Result<Arc<dyn Source>, SourceError>;

/// A compiled-in adapter
#[derive(Clone, Copy)]
pub struct SourceDescriptor {
    /// Source id, e.g. "arxiv"
    pub id: &'static str,

    /// Human-readable provider name
    pub name: &'static str,

    /// Credential that speeds the provider up, if any
    pub credential: Option<&'static str>,

    pub factory: SourceFactory,
}

impl SourceDescriptor {
    /// Whether the `[search]` enabled/disabled lists allow this source
    pub fn is_enabled(&self, search: &SearchConfig) -> bool {
        is_source_enabled(
            self.id,
            search.enabled_sources.as_deref(),
            search.disabled_sources.as_deref(),
        )
    }

    /// Whether the credential this source benefits from is configured
    pub fn has_credential(&self, credentials: &Credentials) -> bool {
        let value = match self.credential {
            Some("S2_API_KEY") => &credentials.semantic_scholar_api_key,
            Some("OPENALEX_EMAIL") => &credentials.openalex_email,
            Some("CROSSREF_MAILTO") => &credentials.crossref_mailto,
            Some("PUBMED_API_KEY") => &credentials.pubmed_api_key,
            _ => return false,
        };
        value.as_deref().is_some_and(|v| !v.trim().is_empty())
    }
}

/// Adapters compiled into this build, in default submission order
pub fn available_sources() -> Vec<SourceDescriptor> {
    #[allow(unused_mut)]
    let mut descriptors: Vec<SourceDescriptor> = Vec::new();

    #[cfg(feature = "source-arxiv")]
    descriptors.push(SourceDescriptor {
        id: "arxiv",
        name: "arXiv",
        credential: None,
        factory: build_arxiv,
    });

    #[cfg(feature = "source-semantic")]
    descriptors.push(SourceDescriptor {
        id: "semantic",
        name: "Semantic Scholar",
        credential: Some("S2_API_KEY"),
        factory: build_semantic,
    });

    #[cfg(feature = "source-crossref")]
    descriptors.push(SourceDescriptor {
        id: "crossref",
        name: "CrossRef",
        credential: Some("CROSSREF_MAILTO"),
        factory: build_crossref,
    });

    #[cfg(feature = "source-openalex")]
    descriptors.push(SourceDescriptor {
        id: "openalex",
        name: "OpenAlex",
        credential: Some("OPENALEX_EMAIL"),
        factory: build_openalex,
    });

    #[cfg(feature = "source-pubmed")]
    descriptors.push(SourceDescriptor {
        id: "pubmed",
        name: "PubMed",
        credential: Some("PUBMED_API_KEY"),
        factory: build_pubmed,
    });

    descriptors
}

#[cfg(feature = "source-arxiv")]
fn build_arxiv(ctx: &SourceContext) -> Result<Arc<dyn Source>, SourceError> {
    Ok(Arc::new(super::ArxivSource::new(ctx.http.clone())))
}

#[cfg(feature = "source-semantic")]
fn build_semantic(ctx: &SourceContext) -> Result<Arc<dyn Source>, SourceError> {
    Ok(Arc::new(super::SemanticScholarSource::new(
        ctx.http.clone(),
        ctx.credentials.semantic_scholar_api_key.clone(),
    )))
}

#[cfg(feature = "source-crossref")]
fn build_crossref(ctx: &SourceContext) -> Result<Arc<dyn Source>, SourceError> {
    Ok(Arc::new(super::CrossRefSource::new(
        ctx.http.clone(),
        ctx.credentials.crossref_mailto.clone(),
    )))
}

#[cfg(feature = "source-openalex")]
fn build_openalex(ctx: &SourceContext) -> Result<Arc<dyn Source>, SourceError> {
    Ok(Arc::new(super::OpenAlexSource::new(
        ctx.http.clone(),
        ctx.credentials.openalex_email.clone(),
    )))
}

#[cfg(feature = "source-pubmed")]
fn build_pubmed(ctx: &SourceContext) -> Result<Arc<dyn Source>, SourceError> {
    Ok(Arc::new(super::PubMedSource::new(
        ctx.http.clone(),
        ctx.credentials.pubmed_api_key.clone(),
    )))
}

/// Ordered registry of instantiated sources
#[derive(Debug, Clone, Default)]
pub struct SourceRegistry {
    sources: Vec<Arc<dyn Source>>,
}

impl SourceRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Instantiate every compiled-in adapter, then apply the enabled/disabled
    /// source lists from the `[search]` config section
    pub fn from_config(config: &Config) -> Result<Self, SourceError> {
        let ctx = SourceContext::from_config(config)?;
        let mut registry = Self::new();

        for descriptor in available_sources() {
            if !descriptor.is_enabled(&config.search) {
                tracing::debug!("Source '{}' disabled by configuration", descriptor.id);
                continue;
            }

            match (descriptor.factory)(&ctx) {
                Ok(source) => registry.register(source),
                Err(e) => tracing::warn!("Skipping source '{}': {}", descriptor.id, e),
            }
        }

        tracing::debug!("Registered {} sources", registry.len());
        Ok(registry)
    }

    /// Register a source. A source with the same id is replaced in place.
    pub fn register(&mut self, source: Arc<dyn Source>) {
        match self.sources.iter().position(|s| s.id() == source.id()) {
            Some(index) => self.sources[index] = source,
            None => self.sources.push(source),
        }
    }

    /// Get a source by ID
    pub fn get(&self, id: &str) -> Option<&Arc<dyn Source>> {
        self.sources.iter().find(|s| s.id() == id)
    }

    /// Get all registered sources in registration order
    pub fn all(&self) -> impl Iterator<Item = &Arc<dyn Source>> {
        self.sources.iter()
    }

    /// Get all source IDs
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.sources.iter().map(|s| s.id())
    }

    /// Pick sources by id, in the order given. Unknown ids are an error.
    pub fn select<S: AsRef<str>>(&self, ids: &[S]) -> Result<Vec<Arc<dyn Source>>, SourceError> {
        ids.iter()
            .map(|id| {
                let id = id.as_ref().trim();
                self.get(id).cloned().ok_or_else(|| {
                    SourceError::InvalidRequest(format!(
                        "Unknown source '{}'. Available: {}",
                        id,
                        self.ids().collect::<Vec<_>>().join(", ")
                    ))
                })
            })
            .collect()
    }

    /// Check if a source exists
    pub fn has(&self, id: &str) -> bool {
        self.get(id).is_some()
    }

    /// Get the number of registered sources
    pub fn len(&self) -> usize {
        self.sources.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}

fn parse_source_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Whether a source id passes the enabled/disabled lists
fn is_source_enabled(id: &str, enabled: Option<&str>, disabled: Option<&str>) -> bool {
    if let Some(disabled) = disabled {
        if parse_source_list(disabled).iter().any(|s| s == id) {
            return false;
        }
    }

    match enabled {
        Some(enabled) => {
            let enabled = parse_source_list(enabled);
            enabled.is_empty() || enabled.iter().any(|s| s == id)
        }
        None => true,
    }
}
