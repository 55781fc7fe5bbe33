//! Request-level facade over the scraping pipeline.
//!
//! [`ScheduleService`] is what a chat front end talks to. It owns the
//! configuration, the page fetcher and the published [`LinkCatalog`], and
//! turns `(kind, source name)` requests into parsed pages or final
//! escaped messages.
//!
//! # Catalog Publication
//!
//! The catalog is rebuilt off to the side by [`ScheduleService::refresh_catalog`]
//! and then swapped in as a whole. Readers take an `Arc` snapshot and never
//! see a half-built catalog. Schedule requests share nothing else: every
//! request fetches and parses its page again.

use crate::api::{FetchError, PageFetcher, build_client};
use crate::config::AppConfig;
use crate::models::{
    LinkCatalog, ProbeResult, RecordsPage, Schedule, Section, SourceEntry, SourceKind,
};
use crate::outputs::message::{self, RenderOptions};
use crate::scrapers::{catalog, records, schedule, status};
use reqwest::Client;
use std::sync::{Arc, PoisonError, RwLock};
use tracing::{info, instrument, warn};

/// Result of resolving and loading one source page.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome<T> {
    /// The page was fetched and parsed.
    Ready(T),
    /// The name is not in the current catalog (stale or mistyped).
    InvalidSource,
    /// The page could not be fetched or did not contain the expected data.
    Unavailable,
}

pub type ScheduleOutcome = Outcome<Schedule>;
pub type RecordsOutcome = Outcome<RecordsPage>;

/// Schedule lookups, catalog management and message rendering.
pub struct ScheduleService<F> {
    config: AppConfig,
    fetcher: F,
    probe_client: Client,
    catalog: RwLock<Arc<LinkCatalog>>,
}

impl<F: PageFetcher> ScheduleService<F> {
    /// Create a service with an empty catalog.
    ///
    /// # Errors
    ///
    /// Fails only if the HTTP client for status probes cannot be built.
    pub fn new(config: AppConfig, fetcher: F) -> Result<Self, FetchError> {
        let probe_client = build_client(&config.fetch)?;
        Ok(Self {
            config,
            fetcher,
            probe_client,
            catalog: RwLock::new(Arc::new(LinkCatalog::default())),
        })
    }

    pub fn fetcher(&self) -> &F {
        &self.fetcher
    }

    /// Snapshot of the currently published catalog.
    pub fn catalog(&self) -> Arc<LinkCatalog> {
        self.catalog
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Rebuild the catalog from the index pages and publish it.
    #[instrument(level = "info", skip(self))]
    pub async fn refresh_catalog(&self) -> Arc<LinkCatalog> {
        let fresh = Arc::new(catalog::build_catalog(&self.fetcher, &self.config.site).await);
        *self.catalog.write().unwrap_or_else(PoisonError::into_inner) = Arc::clone(&fresh);
        info!("Published catalog");
        fresh
    }

    fn resolve(&self, section: Section, kind: SourceKind, name: &str) -> Option<SourceEntry> {
        let entry = self.catalog().lookup(section, kind, name).cloned();
        if entry.is_none() {
            warn!(?section, %kind, %name, "Source not in catalog");
        }
        entry
    }

    /// Fetch and parse the schedule of a catalogued source.
    #[instrument(level = "info", skip(self))]
    pub async fn schedule(&self, kind: SourceKind, name: &str) -> ScheduleOutcome {
        let Some(entry) = self.resolve(Section::Schedule, kind, name) else {
            return Outcome::InvalidSource;
        };
        match schedule::fetch_schedule(&self.fetcher, &entry.detail_url, kind, &self.config).await {
            Some(s) if !s.source_name.is_empty() => Outcome::Ready(s),
            Some(_) => {
                warn!(url = %entry.detail_url, "Schedule page has no recognizable title");
                Outcome::Unavailable
            }
            None => Outcome::Unavailable,
        }
    }

    /// Final escaped schedule message.
    ///
    /// `truncate` overrides the configured lesson name cap.
    pub async fn schedule_message(
        &self,
        kind: SourceKind,
        name: &str,
        truncate: Option<i32>,
    ) -> String {
        let outcome = self.schedule(kind, name).await;
        self.render_schedule_outcome(&outcome, truncate)
    }

    /// Escaped message for an already loaded schedule outcome.
    pub fn render_schedule_outcome(&self, outcome: &ScheduleOutcome, truncate: Option<i32>) -> String {
        match outcome {
            Outcome::Ready(s) => {
                let mut options = RenderOptions::from_config(&self.config);
                if let Some(n) = truncate {
                    options = options.with_max_name_length(n);
                }
                message::render_schedule(s, &options)
            }
            Outcome::InvalidSource => message::invalid_source_message(),
            Outcome::Unavailable => message::unavailable_message(),
        }
    }

    /// Fetch and parse the lesson-accounting page of a catalogued source.
    #[instrument(level = "info", skip(self))]
    pub async fn records(&self, kind: SourceKind, name: &str) -> RecordsOutcome {
        let Some(entry) = self.resolve(Section::Records, kind, name) else {
            return Outcome::InvalidSource;
        };
        match records::fetch_records(&self.fetcher, &entry.detail_url, &self.config).await {
            Some(page) if !page.source_name.is_empty() => Outcome::Ready(page),
            _ => Outcome::Unavailable,
        }
    }

    /// Final escaped lesson-accounting message.
    pub async fn records_message(&self, kind: SourceKind, name: &str) -> String {
        match self.records(kind, name).await {
            Outcome::Ready(page) => {
                message::render_records(&page, &RenderOptions::from_config(&self.config))
            }
            Outcome::InvalidSource => message::invalid_records_source_message(),
            Outcome::Unavailable => message::records_unavailable_message(),
        }
    }

    /// Probe the site's landing page.
    pub async fn status(&self) -> ProbeResult {
        status::probe(&self.probe_client, &self.config.site.index).await
    }

    /// Final escaped status message.
    pub async fn status_message(&self) -> String {
        message::status_message(&self.status().await)
    }
}
