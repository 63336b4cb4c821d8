//! Dashboard Sync Binary
//!
//! Mounts one dashboard context on the configured storage, optionally
//! generates a forecast, then follows analysis updates until Ctrl+C.
//!
//! Usage:
//!   ./dashboard-sync                                   # Follow persisted selection
//!   ./dashboard-sync state=DL city=Delhi market=Azadpur \
//!       category=Vegetable product=Potato days=7       # Generate, then follow

use anyhow::{bail, Result};
use commodity_dashboard::bin_common::{
    load_config_from_env, parse_args, parse_selection_args, BinaryRunner, ConfigType, RunConfig,
};
use market_insights::{
    init_tracing_with_level, CurrentAnalysis, Dashboard, DashboardConfig, DashboardViews,
    Heartbeat, SelectionPatch, ShutdownManager,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{error, info, warn};

struct DashboardSync {
    config: RunConfig,
    dashboard: Dashboard,
    patch: SelectionPatch,
    shutdown: Arc<ShutdownManager>,
    updates_seen: u64,
}

impl DashboardSync {
    async fn generate_if_requested(&self) {
        if self.patch == SelectionPatch::default() {
            return;
        }
        self.dashboard.set_selection(self.patch.clone());

        if !self.dashboard.is_complete() {
            let missing: Vec<&str> = self
                .dashboard
                .missing_fields()
                .iter()
                .map(|f| f.as_str())
                .collect();
            warn!("Selection incomplete, not generating (missing: {})", missing.join(", "));
            return;
        }

        match self.dashboard.generate().await {
            Ok(_) => info!("Forecast generated for {}", self.dashboard.selection().label()),
            Err(e) => error!("Forecast generation failed: {}", e),
        }
    }

    fn report(&mut self, current: &CurrentAnalysis) {
        self.updates_seen += 1;
        let views = DashboardViews::project(&current.snapshot);

        match &current.selection {
            Some(selection) => info!("Analysis #{} for {}", current.revision, selection.label()),
            None => info!("Analysis #{} (defaults)", current.revision),
        }
        info!(
            "  Stock: current {:.1}, recommended {:.1}, demand {:.1} ({:?})",
            views.stock.current_stock,
            views.stock.recommended_stock,
            views.stock.predicted_demand,
            views.stock.status
        );
        info!(
            "  Inventory: {} lines, total shortfall {:.1}",
            views.inventory.lines.len(),
            views.inventory.total_shortfall
        );
        for item in views.actions.iter().take(5) {
            info!(
                "  Action: {} {} @ {} (shortfall {:.1})",
                item.action, item.product, item.market, item.shortfall
            );
        }
        if let Some(festival) = &views.insights.top_festival {
            info!("  Festival impact: {} {:+.1}%", festival.name, festival.impact_pct);
        }
        if let Some(weather) = &views.insights.top_weather {
            info!("  Weather impact: {} {:+.1}%", weather.name, weather.impact_pct);
        }
        info!(
            "  Demand series: {} actual, {} predicted points",
            views.demand.actual.len(),
            views.demand.predicted.len()
        );
    }
}

impl BinaryRunner for DashboardSync {
    async fn run(&mut self) -> Result<()> {
        let mut updates: watch::Receiver<Arc<CurrentAnalysis>> = self.dashboard.subscribe_analysis();
        let current = updates.borrow_and_update().clone();
        self.report(&current);

        self.generate_if_requested().await;

        let mut heartbeat = Heartbeat::new(self.config.heartbeat_interval_secs);
        let poll = Duration::from_secs(self.config.poll_interval_secs);
        let shutdown = Arc::clone(&self.shutdown);

        while shutdown.is_running() {
            tokio::select! {
                changed = updates.changed() => {
                    if changed.is_err() {
                        warn!("Analysis publisher gone, stopping");
                        break;
                    }
                    let current = updates.borrow_and_update().clone();
                    self.report(&current);
                }
                _ = shutdown.interruptible_sleep(poll) => {}
            }

            if heartbeat.should_beat() {
                let status = self.dashboard.fetch_status();
                info!(
                    "Heartbeat: revision {}, {} fetches, {} dropped triggers, last error: {}",
                    self.dashboard.analysis().revision,
                    status.fetches,
                    status.dropped_triggers,
                    status
                        .last_error
                        .map(|e| e.to_string())
                        .unwrap_or_else(|| "none".to_string())
                );
                heartbeat.beat();
            }
        }
        Ok(())
    }

    fn config(&self) -> &RunConfig {
        &self.config
    }

    fn stats(&self) -> Option<String> {
        Some(format!("Analysis updates seen: {}", self.updates_seen))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // CONFIG_PATH may come from .env
    dotenv::dotenv().ok();
    let config_path = load_config_from_env(ConfigType::Dashboard);
    let config = DashboardConfig::load(&config_path)?;

    init_tracing_with_level(&config.log_level);
    config.log();

    let args = parse_args();
    let patch = match parse_selection_args(&args) {
        Ok(patch) => patch,
        Err(bad) => bail!(
            "Unrecognised argument '{}'. Expected key=value with key one of: \
             state, city, market, category, product, days",
            bad
        ),
    };

    let shutdown = Arc::new(ShutdownManager::new());
    shutdown.spawn_signal_handler();

    let dashboard = Dashboard::from_config(&config).await?;

    let mut app = DashboardSync {
        config: RunConfig::new("Dashboard Sync").with_heartbeat(config.heartbeat_interval_secs),
        dashboard,
        patch,
        shutdown,
        updates_seen: 0,
    };
    app.execute().await
}
