//! Concurrent multi-catalog search.
//!
//! Fans a query out to every active, authenticated provider, absorbs
//! individual failures and timeouts, then merges and ranks whatever came
//! back. One misbehaving catalog never takes the search surface down.

mod ranking;

pub use ranking::{rank, relevance_score};

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use futures::future::join_all;
use serde::Serialize;
use tracing::{debug, warn};

use crate::provider::{MusicProvider, SearchResult, Service};
use crate::queue_store::QueueStore;

/// Availability of one catalog as seen by the admin surface.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceStatus {
    pub active: bool,
    pub authenticated: bool,
}

pub struct Aggregator {
    providers: HashMap<Service, Arc<dyn MusicProvider>>,
    store: Arc<dyn QueueStore>,
    search_timeout: Duration,
}

impl Aggregator {
    pub fn new(store: Arc<dyn QueueStore>, search_timeout: Duration) -> Self {
        Self {
            providers: HashMap::new(),
            store,
            search_timeout,
        }
    }

    pub fn register(&mut self, provider: Arc<dyn MusicProvider>) {
        self.providers.insert(provider.service(), provider);
    }

    /// Services currently switched on in the venue settings, restricted to
    /// those with a registered provider.
    pub fn get_active_services(&self) -> Result<Vec<Service>> {
        let settings = self.store.get_all_venue_settings()?;
        Ok(settings
            .iter()
            .filter(|s| s.is_active)
            .filter_map(|s| Service::parse(&s.service_name))
            .filter(|service| self.providers.contains_key(service))
            .collect())
    }

    /// Search every active catalog concurrently and return the merged,
    /// ranked results. Provider failures and timeouts degrade to empty
    /// result sets.
    pub async fn search_all(&self, query: &str) -> Result<Vec<SearchResult>> {
        let active = self.get_active_services()?;

        let searches = active.into_iter().filter_map(|service| {
            let provider = Arc::clone(self.providers.get(&service)?);
            Some(self.search_one(service, provider, query))
        });

        let per_service = join_all(searches).await;
        let merged: Vec<SearchResult> = per_service.into_iter().flatten().collect();
        Ok(rank(merged, query))
    }

    async fn search_one(
        &self,
        service: Service,
        provider: Arc<dyn MusicProvider>,
        query: &str,
    ) -> Vec<SearchResult> {
        let attempt = async {
            if !provider.is_authenticated().await {
                debug!("skipping {service}: not authenticated");
                return vec![];
            }
            match provider.search(query).await {
                Ok(results) => {
                    debug!("{service} returned {} results", results.len());
                    results
                }
                Err(err) => {
                    warn!("{service} search failed: {err}");
                    vec![]
                }
            }
        };

        match tokio::time::timeout(self.search_timeout, attempt).await {
            Ok(results) => results,
            Err(_) => {
                warn!("{service} search timed out after {:?}", self.search_timeout);
                vec![]
            }
        }
    }

    /// Per-service activity and authentication state, keyed by service name.
    pub async fn service_status(&self) -> Result<BTreeMap<String, ServiceStatus>> {
        let settings = self.store.get_all_venue_settings()?;
        let mut status = BTreeMap::new();

        for setting in settings {
            let authenticated = match Service::parse(&setting.service_name)
                .and_then(|service| self.providers.get(&service))
            {
                Some(provider) => provider.is_authenticated().await,
                None => false,
            };
            status.insert(
                setting.service_name,
                ServiceStatus {
                    active: setting.is_active,
                    authenticated,
                },
            );
        }

        Ok(status)
    }
}
