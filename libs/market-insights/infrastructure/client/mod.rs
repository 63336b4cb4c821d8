pub mod api;
pub mod rest;
pub mod types;

pub use api::{AnalyticsApi, ApiError};
pub use rest::RestAnalyticsClient;
pub use types::{CommodityListing, ForecastRequest, MarketListing};
