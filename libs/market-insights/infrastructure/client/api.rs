//! Backend contract used by the pipeline
//!
//! The generator and the fetcher only see this trait, so tests can swap in
//! a scripted backend and the binary plugs in the reqwest client.

use super::types::{CommodityListing, ForecastRequest, MarketListing};
use crate::domain::{AnalysisQuery, AnalysisSnapshot, ForecastSnapshot};
use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    #[error("API error ({status}): {body}")]
    Status { status: u16, body: String },

    #[error("Deserialization failed: {0}")]
    DeserializeFailed(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        ApiError::RequestFailed(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ApiError>;

/// Analytics backend endpoints consumed by the dashboard
#[async_trait]
pub trait AnalyticsApi: Send + Sync {
    /// `POST /api/forecast`
    async fn generate_forecast(&self, request: &ForecastRequest) -> Result<ForecastSnapshot>;

    /// `GET /api/product-analysis`. An empty query asks for defaults.
    async fn product_analysis(&self, query: &AnalysisQuery) -> Result<AnalysisSnapshot>;

    /// `GET /api/markets`
    async fn markets(&self) -> Result<Vec<MarketListing>>;

    /// `GET /api/commodities`
    async fn commodities(&self) -> Result<Vec<CommodityListing>>;
}
