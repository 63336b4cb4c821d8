//! Derived analysis fetcher
//!
//! Keeps the current [`AnalysisSnapshot`] in line with the *persisted*
//! selection. Runs once at mount and on every change of the selection key.
//!
//! # State machine
//!
//! ```text
//!   Idle ──sync()──▶ Fetching ──fetch resolved, persisted selection unchanged──▶ Idle
//!                      │  ▲
//!                      └──┘ persisted selection changed while fetching: fetch again
//! ```
//!
//! A trigger that arrives while `Fetching` is dropped, not queued. The
//! running sync re-reads the persisted selection after each fetch, so a burst
//! of triggers collapses into at most one more fetch, for the latest value.
//! A sync whose persisted selection equals the one behind the current
//! snapshot does nothing.
//!
//! Failures leave the current snapshot in place and are recorded in
//! [`FetchStatus`]; they never propagate to the trigger. A failed fetch ends
//! the sync unless triggers were dropped meanwhile and the persisted
//! selection has moved on, in which case the new value is fetched.

use crate::domain::{AnalysisQuery, AnalysisSnapshot, Selection};
use crate::infrastructure::client::AnalyticsApi;
use crate::infrastructure::storage::{PersistenceBridge, SELECTION_KEY};
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tracing::{debug, info, warn};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnalysisFetchError {
    #[error("Analysis request failed: {0}")]
    Api(String),

    #[error("Analysis request timed out after {0:?}")]
    Timeout(Duration),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchState {
    #[default]
    Idle,
    Fetching,
}

/// Passive observability for the reactive path
#[derive(Debug, Clone, Default)]
pub struct FetchStatus {
    pub state: FetchState,
    /// Set by the last failed fetch, cleared by the next success
    pub last_error: Option<AnalysisFetchError>,
    pub fetches: u64,
    pub dropped_triggers: u64,
    pub unchanged_syncs: u64,
    pub last_success_at: Option<DateTime<Utc>>,
}

/// The snapshot every dependent view reads, with the selection it answers
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CurrentAnalysis {
    /// Bumped on every publication; 0 before the first fetch lands
    pub revision: u64,
    /// Persisted selection the snapshot was fetched for (`None` = defaults)
    pub selection: Option<Selection>,
    pub snapshot: AnalysisSnapshot,
}

/// Result of one `sync_from_persisted_selection` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// New snapshot(s) published after this many fetches
    Applied { fetches: u32 },
    /// Persisted selection already matches the current snapshot
    Unchanged,
    /// Another sync was in flight
    Dropped,
    Failed(AnalysisFetchError),
}

#[derive(Debug, Clone, PartialEq)]
enum Applied {
    Nothing,
    For(Option<Selection>),
}

struct FetcherInner {
    state: FetchState,
    applied: Applied,
    status: FetchStatus,
}

pub struct AnalysisFetcher {
    api: Arc<dyn AnalyticsApi>,
    bridge: Arc<PersistenceBridge>,
    timeout: Duration,
    inner: Mutex<FetcherInner>,
    current: watch::Sender<Arc<CurrentAnalysis>>,
}

/// Returns the fetcher to `Idle` even if the sync future is dropped mid-fetch
struct FetchingGuard<'a> {
    inner: &'a Mutex<FetcherInner>,
}

impl Drop for FetchingGuard<'_> {
    fn drop(&mut self) {
        let mut inner = self.inner.lock();
        inner.state = FetchState::Idle;
        inner.status.state = FetchState::Idle;
    }
}

impl AnalysisFetcher {
    pub fn new(api: Arc<dyn AnalyticsApi>, bridge: Arc<PersistenceBridge>, timeout: Duration) -> Self {
        let (current, _) = watch::channel(Arc::new(CurrentAnalysis::default()));
        Self {
            api,
            bridge,
            timeout,
            inner: Mutex::new(FetcherInner {
                state: FetchState::Idle,
                applied: Applied::Nothing,
                status: FetchStatus::default(),
            }),
            current,
        }
    }

    /// Snapshot currently published
    pub fn current(&self) -> Arc<CurrentAnalysis> {
        self.current.borrow().clone()
    }

    /// Watch publications of new snapshots
    pub fn subscribe(&self) -> watch::Receiver<Arc<CurrentAnalysis>> {
        self.current.subscribe()
    }

    pub fn status(&self) -> FetchStatus {
        self.inner.lock().status.clone()
    }

    pub fn state(&self) -> FetchState {
        self.inner.lock().state
    }

    /// Bring the current snapshot in line with the persisted selection
    pub async fn sync_from_persisted_selection(&self) -> SyncOutcome {
        {
            let mut inner = self.inner.lock();
            if inner.state == FetchState::Fetching {
                inner.status.dropped_triggers += 1;
                debug!("Analysis sync already in flight, trigger dropped");
                return SyncOutcome::Dropped;
            }
            inner.state = FetchState::Fetching;
            inner.status.state = FetchState::Fetching;
        }
        let _guard = FetchingGuard { inner: &self.inner };

        let mut fetches = 0u32;
        let mut dropped_seen = self.inner.lock().status.dropped_triggers;
        loop {
            let persisted: Option<Selection> = self.bridge.load_or_absent(SELECTION_KEY);

            if self.inner.lock().applied == Applied::For(persisted.clone()) {
                if fetches == 0 {
                    self.inner.lock().status.unchanged_syncs += 1;
                    debug!("Persisted selection unchanged, nothing to fetch");
                    return SyncOutcome::Unchanged;
                }
                return SyncOutcome::Applied { fetches };
            }

            fetches += 1;
            let attempted = persisted.clone();
            if let Err(e) = self.fetch_and_publish(persisted).await {
                let dropped_now = self.inner.lock().status.dropped_triggers;
                let latest: Option<Selection> = self.bridge.load_or_absent(SELECTION_KEY);
                if dropped_now > dropped_seen && latest != attempted {
                    debug!("Selection changed during failed fetch, fetching again");
                    dropped_seen = dropped_now;
                    continue;
                }
                return SyncOutcome::Failed(e);
            }
        }
    }

    async fn fetch_and_publish(&self, persisted: Option<Selection>) -> Result<(), AnalysisFetchError> {
        let query = AnalysisQuery::for_selection(persisted.as_ref());
        self.inner.lock().status.fetches += 1;
        debug!("Fetching analysis with {:?}", query.to_query_params());

        let result = match tokio::time::timeout(self.timeout, self.api.product_analysis(&query)).await {
            Err(_) => Err(AnalysisFetchError::Timeout(self.timeout)),
            Ok(Err(e)) => Err(AnalysisFetchError::Api(e.to_string())),
            Ok(Ok(snapshot)) => Ok(snapshot),
        };

        let snapshot = match result {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!("Analysis fetch failed, keeping previous snapshot: {}", e);
                self.inner.lock().status.last_error = Some(e.clone());
                return Err(e);
            }
        };

        {
            let mut inner = self.inner.lock();
            inner.applied = Applied::For(persisted.clone());
            inner.status.last_error = None;
            inner.status.last_success_at = Some(Utc::now());
        }

        match &persisted {
            Some(selection) => info!("Analysis updated for {}", selection.label()),
            None => info!("Analysis updated with defaults (no persisted selection)"),
        }

        self.current.send_modify(|current| {
            *current = Arc::new(CurrentAnalysis {
                revision: current.revision + 1,
                selection: persisted,
                snapshot,
            });
        });
        Ok(())
    }
}
