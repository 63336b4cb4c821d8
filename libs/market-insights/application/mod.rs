//! Application Layer
//!
//! The selection → forecast → analysis pipeline and its read-only views.
//! Depends on domain and infrastructure layers.

pub mod analysis_fetcher;
pub mod facade;
pub mod forecast;
pub mod selection_store;
pub mod views;

pub use analysis_fetcher::{
    AnalysisFetchError, AnalysisFetcher, CurrentAnalysis, FetchState, FetchStatus, SyncOutcome,
};
pub use facade::Dashboard;
pub use forecast::{ForecastError, ForecastGenerator};
pub use selection_store::SelectionStore;
pub use views::{
    action_required, decision_insights, demand_series, inventory_view, stock_comparison,
    DashboardViews, StockStatus,
};
