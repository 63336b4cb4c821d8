use super::api::{AnalyticsApi, ApiError, Result};
use super::types::{CommodityListing, ForecastRequest, MarketListing};
use crate::domain::{AnalysisQuery, AnalysisSnapshot, ForecastSnapshot};
use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::{debug, warn};

/// reqwest-backed client for the analytics backend
pub struct RestAnalyticsClient {
    base_url: String,
    client: Client,
}

impl RestAnalyticsClient {
    /// Create new client against `base_url` (e.g. `http://localhost:5000`)
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client: Client::new(),
        }
    }

    /// Create client with a transport-level timeout
    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn decode<T: DeserializeOwned>(response: Response, what: &str) -> Result<T> {
        let status = response.status();

        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            warn!("{} failed ({}): {}", what, status, body);
            return Err(ApiError::Status {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json()
            .await
            .map_err(|e| ApiError::DeserializeFailed(e.to_string()))
    }
}

#[async_trait]
impl AnalyticsApi for RestAnalyticsClient {
    async fn generate_forecast(&self, request: &ForecastRequest) -> Result<ForecastSnapshot> {
        let url = self.url("/api/forecast");
        debug!("POST {} for {}/{}", url, request.market, request.product);

        let response = self.client.post(&url).json(request).send().await?;
        Self::decode(response, "Forecast request").await
    }

    async fn product_analysis(&self, query: &AnalysisQuery) -> Result<AnalysisSnapshot> {
        let url = self.url("/api/product-analysis");
        let params = query.to_query_params();
        debug!("GET {} with params {:?}", url, params);

        let mut request = self.client.get(&url);
        if !params.is_empty() {
            request = request.query(&params);
        }
        let response = request.send().await?;
        Self::decode(response, "Product analysis request").await
    }

    async fn markets(&self) -> Result<Vec<MarketListing>> {
        let url = self.url("/api/markets");
        debug!("GET {}", url);

        let response = self.client.get(&url).send().await?;
        Self::decode(response, "Markets request").await
    }

    async fn commodities(&self) -> Result<Vec<CommodityListing>> {
        let url = self.url("/api/commodities");
        debug!("GET {}", url);

        let response = self.client.get(&url).send().await?;
        Self::decode(response, "Commodities request").await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_creation() {
        let client = RestAnalyticsClient::new("http://localhost:5000/");
        assert_eq!(client.base_url(), "http://localhost:5000");
        assert_eq!(
            client.url("/api/forecast"),
            "http://localhost:5000/api/forecast"
        );
    }

    #[test]
    fn test_client_with_timeout() {
        let client =
            RestAnalyticsClient::with_timeout("http://localhost:5000", Duration::from_secs(5))
                .unwrap();
        assert_eq!(
            client.url("/api/product-analysis"),
            "http://localhost:5000/api/product-analysis"
        );
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_request_failure() {
        // Port 9 (discard) on localhost is closed on test machines
        let client = RestAnalyticsClient::with_timeout("http://127.0.0.1:9", Duration::from_secs(2))
            .unwrap();
        let err = client.markets().await.unwrap_err();
        assert!(matches!(err, ApiError::RequestFailed(_)));
    }
}
