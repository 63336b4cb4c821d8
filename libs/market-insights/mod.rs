//! Market Insights
//!
//! Client-side core of the commodity analytics dashboard: the user's
//! market / product / horizon selection, forecast generation, and the
//! analysis payload every dashboard view is projected from.
//!
//! ## Layers
//!
//! - **domain**: selection and payload entities
//! - **infrastructure**: backend client, shared storage, config, logging
//! - **application**: selection store, forecast generator, analysis fetcher,
//!   view adapters and the `Dashboard` facade

pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::{
    AnalysisFetchError, AnalysisFetcher, CurrentAnalysis, Dashboard, DashboardViews, FetchState,
    FetchStatus, ForecastError, ForecastGenerator, SelectionStore, SyncOutcome,
};
pub use domain::{
    AnalysisQuery, AnalysisSnapshot, ForecastRange, ForecastSnapshot, Selection, SelectionField,
    SelectionPatch,
};
pub use infrastructure::{
    init_tracing, init_tracing_with_level, AnalyticsApi, ApiError, ChangeEvent, ChangeOrigin,
    DashboardConfig, Heartbeat, PersistenceBridge, PersistenceError, RestAnalyticsClient,
    ShutdownManager, StorageArea, FORECAST_KEY, SELECTION_KEY,
};
