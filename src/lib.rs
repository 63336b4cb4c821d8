//! Commodity Dashboard - Main Library
//!
//! Entry crate for the dashboard sync binary.
//!
//! ## Architecture
//!
//! - **bin_common**: Common utilities for binary executables (CLI, runners)
//! - **market_insights**: Selection, forecast and analysis pipeline (re-exported from workspace)
//!
//! ## Usage in Binaries
//!
//! ```rust,ignore
//! use commodity_dashboard::bin_common::{load_config_from_env, ConfigType};
//! use commodity_dashboard::market_insights::Dashboard;
//! ```

// Re-export workspace libraries for convenience
pub use market_insights;

// Binary common utilities
pub mod bin_common {
    //! Common utilities for binary executables

    pub mod cli;
    pub mod runner;

    pub use cli::{load_config_from_env, parse_args, parse_selection_args, ConfigType};
    pub use runner::{BinaryRunner, RunConfig};
}
