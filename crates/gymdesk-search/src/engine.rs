//! Incremental search engine
//!
//! Keystrokes feed [`SearchEngine::input`]. A query is committed once the
//! input has been quiet for the debounce period; each commit bumps the
//! snapshot generation and starts a dispatch. A dispatch may only write to
//! the snapshot while its generation is still current and the engine is
//! alive, so results are ordered by commit rather than by arrival and
//! nothing changes after [`SearchEngine::shutdown`].

use crate::backend::SearchBackend;
use crate::cache::{ResultsCache, SearchEntry};
use futures::StreamExt;
use futures::stream::FuturesUnordered;
use gymdesk_core::types::ClientStats;
use gymdesk_core::{Error, Result};
use gymdesk_observability::Metrics;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct SearchConfig {
    /// Quiet period before a query is committed
    pub debounce: Duration,
    /// Number of leading results enriched with statistics
    pub top_k: usize,
    /// Maximum number of results requested per query
    pub page_size: u32,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(300),
            top_k: 5,
            page_size: 20,
        }
    }
}

/// What a search view renders
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchSnapshot {
    /// Commit sequence number; bumped by every commit and every clear
    pub generation: u64,
    /// Last committed query
    pub query: String,
    pub entries: ResultsCache,
    /// Total matches reported by the backend
    pub total: u64,
    pub loading: bool,
    pub error: Option<String>,
    /// Id of the entry open in the detail view
    pub selected: Option<String>,
}

impl SearchSnapshot {
    pub fn selected_entry(&self) -> Option<&SearchEntry> {
        self.selected.as_deref().and_then(|id| self.entries.get(id))
    }
}

struct Shared {
    backend: Arc<dyn SearchBackend>,
    config: SearchConfig,
    snapshot: watch::Sender<SearchSnapshot>,
    liveness: CancellationToken,
    metrics: Option<Arc<Metrics>>,
}

impl Shared {
    /// Apply `f` only while alive and while `generation` is current
    fn update_if_current<F>(&self, generation: u64, f: F) -> bool
    where
        F: FnOnce(&mut SearchSnapshot) -> bool,
    {
        self.snapshot.send_if_modified(|snapshot| {
            if self.liveness.is_cancelled() || snapshot.generation != generation {
                return false;
            }
            f(snapshot)
        })
    }

    fn commit(&self, query: String) -> Option<u64> {
        let mut committed = None;
        self.snapshot.send_if_modified(|snapshot| {
            if self.liveness.is_cancelled() {
                return false;
            }
            snapshot.generation += 1;
            snapshot.query = query;
            snapshot.loading = true;
            snapshot.error = None;
            committed = Some(snapshot.generation);
            true
        });
        committed
    }

    fn clear(&self) {
        self.snapshot.send_if_modified(|snapshot| {
            if self.liveness.is_cancelled() {
                return false;
            }
            snapshot.generation += 1;
            snapshot.query.clear();
            snapshot.entries.clear();
            snapshot.total = 0;
            snapshot.loading = false;
            snapshot.error = None;
            snapshot.selected = None;
            true
        });
    }

    fn merge_stats(&self, generation: u64, id: &str, stats: ClientStats) {
        let merged = self.update_if_current(generation, |snapshot| {
            snapshot.entries.merge_stats(id, stats)
        });
        if !merged {
            debug!(generation, client_id = id, "Discarding stats for a superseded result set");
        }
    }

    fn discarded(&self, generation: u64) {
        debug!(generation, "Discarding results of a superseded search");
        if let Some(metrics) = &self.metrics {
            metrics.record_search_stale();
        }
    }
}

async fn dispatch(shared: Arc<Shared>, generation: u64, query: String) {
    debug!(generation, query = %query, "Dispatching search");
    if let Some(metrics) = &shared.metrics {
        metrics.record_search_dispatch();
    }

    let result = tokio::select! {
        _ = shared.liveness.cancelled() => return,
        result = shared.backend.search(&query, shared.config.page_size) => result,
    };

    let page = match result {
        Ok(page) => page,
        Err(e) => {
            warn!(query = %query, "Search failed: {}", e);
            let message = e.to_string();
            let applied = shared.update_if_current(generation, |snapshot| {
                snapshot.loading = false;
                snapshot.error = Some(message);
                true
            });
            if !applied {
                shared.discarded(generation);
            }
            return;
        }
    };

    let entries = ResultsCache::from_clients(page.items);
    let top = entries.top_ids(shared.config.top_k);
    let total = page.total;
    let applied = shared.update_if_current(generation, |snapshot| {
        if snapshot
            .selected
            .as_deref()
            .is_some_and(|id| !entries.contains(id))
        {
            snapshot.selected = None;
        }
        snapshot.entries = entries;
        snapshot.total = total;
        snapshot.loading = false;
        snapshot.error = None;
        true
    });
    if !applied {
        shared.discarded(generation);
        return;
    }

    let backend = &shared.backend;
    let mut fetches: FuturesUnordered<_> = top
        .into_iter()
        .map(|id| async move {
            let result = backend.stats(&id).await;
            (id, result)
        })
        .collect();

    loop {
        let next = tokio::select! {
            _ = shared.liveness.cancelled() => return,
            next = fetches.next() => next,
        };
        match next {
            Some((id, Ok(stats))) => shared.merge_stats(generation, &id, stats),
            Some((id, Err(e))) => warn!(client_id = %id, "Failed to fetch client stats: {}", e),
            None => break,
        }
    }
}

async fn enrich(shared: Arc<Shared>, generation: u64, id: String) {
    let result = tokio::select! {
        _ = shared.liveness.cancelled() => return,
        result = shared.backend.stats(&id) => result,
    };
    match result {
        Ok(stats) => shared.merge_stats(generation, &id, stats),
        Err(e) => warn!(client_id = %id, "Failed to fetch client stats: {}", e),
    }
}

pub struct SearchEngine {
    shared: Arc<Shared>,
    debounce: Mutex<Option<JoinHandle<()>>>,
}

impl SearchEngine {
    pub fn spawn(backend: Arc<dyn SearchBackend>, config: SearchConfig) -> Self {
        Self::spawn_with_metrics(backend, config, None)
    }

    pub fn spawn_with_metrics(
        backend: Arc<dyn SearchBackend>,
        config: SearchConfig,
        metrics: Option<Arc<Metrics>>,
    ) -> Self {
        let (snapshot, _) = watch::channel(SearchSnapshot::default());
        Self {
            shared: Arc::new(Shared {
                backend,
                config,
                snapshot,
                liveness: CancellationToken::new(),
                metrics,
            }),
            debounce: Mutex::new(None),
        }
    }

    /// Feed the current input text
    ///
    /// Restarts the debounce period. Blank input clears the results at once
    /// and supersedes any search still in flight. Ignored after shutdown.
    pub fn input(&self, text: &str) -> Result<()> {
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|_| Error::Config("search engine requires a Tokio runtime".to_string()))?;

        let mut pending = self.debounce.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(handle) = pending.take() {
            handle.abort();
        }
        if self.shared.liveness.is_cancelled() {
            return Ok(());
        }

        let query = text.trim().to_string();
        if query.is_empty() {
            self.shared.clear();
            return Ok(());
        }

        let shared = self.shared.clone();
        *pending = Some(runtime.spawn(async move {
            tokio::select! {
                _ = shared.liveness.cancelled() => return,
                _ = tokio::time::sleep(shared.config.debounce) => {}
            }
            if let Some(generation) = shared.commit(query.clone()) {
                tokio::spawn(dispatch(shared, generation, query));
            }
        }));
        Ok(())
    }

    pub fn subscribe(&self) -> watch::Receiver<SearchSnapshot> {
        self.shared.snapshot.subscribe()
    }

    pub fn snapshot(&self) -> SearchSnapshot {
        self.shared.snapshot.borrow().clone()
    }

    /// Open the detail view for `id`
    ///
    /// Fetches statistics for entries that have none yet. Returns `None` if
    /// `id` is not among the current results.
    pub fn select(&self, id: &str) -> Option<SearchEntry> {
        let mut chosen = None;
        self.shared.snapshot.send_if_modified(|snapshot| {
            if self.shared.liveness.is_cancelled() {
                return false;
            }
            match snapshot.entries.get(id) {
                Some(entry) => {
                    chosen = Some((snapshot.generation, entry.clone()));
                    snapshot.selected = Some(id.to_string());
                    true
                }
                None => false,
            }
        });

        let (generation, entry) = chosen?;
        if entry.stats.is_none() {
            match tokio::runtime::Handle::try_current() {
                Ok(runtime) => {
                    runtime.spawn(enrich(self.shared.clone(), generation, id.to_string()));
                }
                Err(_) => debug!(client_id = id, "No runtime, detail stays without stats"),
            }
        }
        Some(entry)
    }

    /// Close the detail view; the results are left as they are
    pub fn close_detail(&self) {
        self.shared.snapshot.send_if_modified(|snapshot| {
            !self.shared.liveness.is_cancelled() && snapshot.selected.take().is_some()
        });
    }

    /// Stop all work; no snapshot change happens afterwards
    pub fn shutdown(&self) {
        self.shared.liveness.cancel();
        if let Some(handle) = self
            .debounce
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
        {
            handle.abort();
        }
    }

    pub fn is_shut_down(&self) -> bool {
        self.shared.liveness.is_cancelled()
    }
}

impl Drop for SearchEngine {
    fn drop(&mut self) {
        self.shutdown();
    }
}
