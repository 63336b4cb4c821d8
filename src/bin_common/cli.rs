//! CLI utilities for binaries
//!
//! Handles configuration lookup and the `key=value` selection arguments.

use market_insights::SelectionPatch;
use std::path::PathBuf;

/// Type of configuration to load
#[derive(Debug, Clone)]
pub enum ConfigType {
    /// Dashboard configuration (dashboard_config.yaml)
    Dashboard,
    /// Custom path
    Custom(String),
}

impl ConfigType {
    /// Get the default path for this config type
    pub fn default_path(&self) -> &str {
        match self {
            ConfigType::Dashboard => "config/dashboard_config.yaml",
            ConfigType::Custom(path) => path,
        }
    }

    /// Get the environment variable name for this config type
    pub fn env_var_name(&self) -> &str {
        "CONFIG_PATH"
    }
}

/// Load configuration path from environment or use default
pub fn load_config_from_env(config_type: ConfigType) -> PathBuf {
    std::env::var(config_type.env_var_name())
        .unwrap_or_else(|_| config_type.default_path().to_string())
        .into()
}

/// Parse command line arguments for a binary
///
/// Returns a vector of arguments (excluding the program name)
pub fn parse_args() -> Vec<String> {
    std::env::args().skip(1).collect()
}

/// Fold `key=value` arguments into one selection patch.
///
/// Later arguments win. Returns the first argument that isn't a recognised
/// pair as the error.
pub fn parse_selection_args(args: &[String]) -> Result<SelectionPatch, String> {
    let mut merged = SelectionPatch::default();
    for arg in args {
        let patch = SelectionPatch::parse_pair(arg).ok_or_else(|| arg.clone())?;
        merged = merge(merged, patch);
    }
    Ok(merged)
}

fn merge(base: SelectionPatch, next: SelectionPatch) -> SelectionPatch {
    SelectionPatch {
        state: next.state.or(base.state),
        city: next.city.or(base.city),
        market: next.market.or(base.market),
        category: next.category.or(base.category),
        product: next.product.or(base.product),
        forecast_range_days: next.forecast_range_days.or(base.forecast_range_days),
    }
}
