//! Application Facade
//!
//! One [`Dashboard`] is one context on a shared storage area: its own
//! in-memory selection, its own persistence bridge and analysis fetcher.
//! Several dashboards on the same area behave like several browser tabs.

use super::analysis_fetcher::{AnalysisFetcher, CurrentAnalysis, FetchStatus, SyncOutcome};
use super::forecast::{ForecastError, ForecastGenerator};
use super::selection_store::SelectionStore;
use super::views::DashboardViews;
use crate::domain::{ForecastSnapshot, Selection, SelectionField, SelectionPatch};
use crate::infrastructure::client::{
    AnalyticsApi, ApiError, CommodityListing, MarketListing, RestAnalyticsClient,
};
use crate::infrastructure::config::DashboardConfig;
use crate::infrastructure::storage::{
    ChangeEvent, ChangeOrigin, PersistenceBridge, StorageArea, FORECAST_KEY, SELECTION_KEY,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

pub struct Dashboard {
    api: Arc<dyn AnalyticsApi>,
    store: Arc<SelectionStore>,
    bridge: Arc<PersistenceBridge>,
    generator: ForecastGenerator,
    fetcher: Arc<AnalysisFetcher>,
    listener: JoinHandle<()>,
    pump: JoinHandle<()>,
}

impl Dashboard {
    /// Attach a new context to `area` and run the mount-time sync.
    ///
    /// The persisted selection, if any, becomes the initial in-memory
    /// selection; a malformed record is treated as absent.
    pub async fn mount(
        area: &Arc<StorageArea>,
        api: Arc<dyn AnalyticsApi>,
        request_timeout: Duration,
    ) -> Self {
        let storage = area.attach();
        // Subscribe before the first read so no write slips past unseen
        let events = storage.events();
        let bridge = Arc::new(PersistenceBridge::new(storage));
        bridge.seed(SELECTION_KEY);
        bridge.seed(FORECAST_KEY);

        let store = Arc::new(SelectionStore::new());
        if let Some(selection) = bridge.load_or_absent::<Selection>(SELECTION_KEY) {
            debug!("Restored persisted selection {}", selection.label());
            store.replace(selection);
        }

        let generator = ForecastGenerator::new(api.clone(), bridge.clone(), request_timeout);
        let fetcher = Arc::new(AnalysisFetcher::new(api.clone(), bridge.clone(), request_timeout));

        let changes = bridge.subscribe();
        let listener = bridge.spawn_listener(events);
        let pump = spawn_change_pump(changes, store.clone(), fetcher.clone());

        info!("Dashboard context {} mounted", bridge.context_id());
        fetcher.sync_from_persisted_selection().await;

        Self {
            api,
            store,
            bridge,
            generator,
            fetcher,
            listener,
            pump,
        }
    }

    /// Open the configured storage and backend, then mount
    pub async fn from_config(config: &DashboardConfig) -> anyhow::Result<Self> {
        let area = match &config.storage.path {
            Some(path) => StorageArea::open_file(path)?,
            None => StorageArea::in_memory(),
        };
        let timeout = config.api.request_timeout();
        let api = Arc::new(RestAnalyticsClient::with_timeout(&config.api.base_url, timeout)?);
        Ok(Self::mount(&area, api, timeout).await)
    }

    // ==================== SELECTION ====================

    pub fn selection(&self) -> Selection {
        self.store.get_selection()
    }

    pub fn set_selection(&self, patch: SelectionPatch) {
        self.store.set_selection(patch);
    }

    pub fn is_complete(&self) -> bool {
        self.store.is_complete()
    }

    pub fn missing_fields(&self) -> Vec<SelectionField> {
        self.store.missing_fields()
    }

    // ==================== FORECAST ====================

    /// Generate a forecast for the current in-memory selection.
    ///
    /// Errors go straight back to the caller. On success the persisted
    /// selection changes, which in turn refreshes the analysis.
    pub async fn generate(&self) -> Result<ForecastSnapshot, ForecastError> {
        let selection = self.store.get_selection();
        self.generator.generate(&selection).await
    }

    /// Forecast last persisted by any context
    pub fn persisted_forecast(&self) -> Option<ForecastSnapshot> {
        self.bridge.load_or_absent(FORECAST_KEY)
    }

    pub fn persisted_selection(&self) -> Option<Selection> {
        self.bridge.load_or_absent(SELECTION_KEY)
    }

    // ==================== ANALYSIS ====================

    pub fn analysis(&self) -> Arc<CurrentAnalysis> {
        self.fetcher.current()
    }

    pub fn subscribe_analysis(&self) -> watch::Receiver<Arc<CurrentAnalysis>> {
        self.fetcher.subscribe()
    }

    pub fn views(&self) -> DashboardViews {
        DashboardViews::project(&self.fetcher.current().snapshot)
    }

    pub fn fetch_status(&self) -> FetchStatus {
        self.fetcher.status()
    }

    /// Run a sync directly, outside the change pump
    pub async fn sync_now(&self) -> SyncOutcome {
        self.fetcher.sync_from_persisted_selection().await
    }

    /// De-duplicated storage changes seen by this context
    pub fn subscribe_changes(&self) -> broadcast::Receiver<ChangeEvent> {
        self.bridge.subscribe()
    }

    pub fn bridge(&self) -> &Arc<PersistenceBridge> {
        &self.bridge
    }

    // ==================== CHOICE SETS ====================

    pub async fn markets(&self) -> Result<Vec<MarketListing>, ApiError> {
        self.api.markets().await
    }

    pub async fn commodities(&self) -> Result<Vec<CommodityListing>, ApiError> {
        self.api.commodities().await
    }
}

impl Drop for Dashboard {
    fn drop(&mut self) {
        self.listener.abort();
        self.pump.abort();
    }
}

/// Route selection-key changes to the fetcher.
///
/// Each change spawns a sync; the fetcher itself drops the ones that overlap
/// a running sync. Changes from other contexts also replace the local
/// in-memory selection.
fn spawn_change_pump(
    mut changes: broadcast::Receiver<ChangeEvent>,
    store: Arc<SelectionStore>,
    fetcher: Arc<AnalysisFetcher>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match changes.recv().await {
                Ok(change) if change.key == SELECTION_KEY => {
                    if change.origin != ChangeOrigin::Local {
                        store.replace(parse_selection(change.new_value.as_deref()));
                    }
                    trigger_sync(&fetcher);
                }
                Ok(_) => {}
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    warn!("Change pump missed {} events, forcing sync", missed);
                    trigger_sync(&fetcher);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

fn trigger_sync(fetcher: &Arc<AnalysisFetcher>) {
    let fetcher = Arc::clone(fetcher);
    tokio::spawn(async move {
        fetcher.sync_from_persisted_selection().await;
    });
}

fn parse_selection(raw: Option<&str>) -> Selection {
    match raw {
        None => Selection::default(),
        Some(raw) => serde_json::from_str(raw).unwrap_or_else(|e| {
            warn!("Malformed selection from another context ({}), using empty selection", e);
            Selection::default()
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_selection_fallbacks() {
        assert_eq!(parse_selection(None), Selection::default());
        assert_eq!(parse_selection(Some("garbage")), Selection::default());
        assert_eq!(
            parse_selection(Some(r#"{"market":"Vashi"}"#)).market.as_deref(),
            Some("Vashi")
        );
    }

    #[tokio::test]
    async fn test_from_config_in_memory() {
        let config = DashboardConfig::from_yaml(
            "api:\n  base_url: http://127.0.0.1:9\n  request_timeout_secs: 1\n",
        )
        .unwrap();
        let dashboard = Dashboard::from_config(&config).await.unwrap();

        // Backend unreachable: the mount sync fails quietly and defaults stay current
        assert_eq!(dashboard.analysis().revision, 0);
        assert!(dashboard.fetch_status().last_error.is_some());
        assert_eq!(dashboard.selection(), Selection::default());
    }
}
