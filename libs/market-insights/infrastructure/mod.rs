//! Infrastructure Layer
//!
//! Implementations of external interfaces: the analytics backend client,
//! the shared storage area, configuration and process plumbing.
//! Depends on the domain layer, never on the application layer.

pub mod client;
pub mod config;
pub mod heartbeat;
pub mod logging;
pub mod shutdown;
pub mod storage;

pub use client::{AnalyticsApi, ApiError, RestAnalyticsClient};
pub use config::{ConfigError, DashboardConfig};
pub use heartbeat::Heartbeat;
pub use logging::{init_tracing, init_tracing_with_level};
pub use shutdown::ShutdownManager;
pub use storage::{
    ChangeEvent, ChangeOrigin, PersistenceBridge, PersistenceError, StorageArea, StorageContext,
    FORECAST_KEY, SELECTION_KEY,
};
