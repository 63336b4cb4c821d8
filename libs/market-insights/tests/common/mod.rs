//! Common test utilities for pipeline integration tests
//!
//! Provides a scripted analytics backend and polling helpers.

#![allow(dead_code)]

use async_trait::async_trait;
use market_insights::domain::{
    AnalysisQuery, AnalysisSnapshot, ForecastRange, ForecastSnapshot, RecommendationRow, Selection,
    StockMetrics,
};
use market_insights::infrastructure::client::{
    AnalyticsApi, ApiError, CommodityListing, ForecastRequest, MarketListing,
};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::sync::Semaphore;

#[derive(Debug, Clone)]
pub enum ForecastBehaviour {
    Respond(Value),
    Fail,
    Hang,
}

/// Backend double that records every call
pub struct ScriptedApi {
    pub forecast_requests: Mutex<Vec<ForecastRequest>>,
    pub analysis_queries: Mutex<Vec<AnalysisQuery>>,
    forecast: Mutex<ForecastBehaviour>,
    forecast_delays: Mutex<HashMap<String, Duration>>,
    analysis_fail: AtomicBool,
    analysis_failures_left: AtomicUsize,
    hold_analysis: AtomicBool,
    analysis_gate: Semaphore,
    analysis_started: AtomicUsize,
}

impl ScriptedApi {
    pub fn new() -> Self {
        Self {
            forecast_requests: Mutex::new(Vec::new()),
            analysis_queries: Mutex::new(Vec::new()),
            forecast: Mutex::new(ForecastBehaviour::Respond(json!({
                "forecasts": [
                    {"date": "2024-10-01", "price": 21.5},
                    {"date": "2024-10-02", "price": 22.0}
                ]
            }))),
            forecast_delays: Mutex::new(HashMap::new()),
            analysis_fail: AtomicBool::new(false),
            analysis_failures_left: AtomicUsize::new(0),
            hold_analysis: AtomicBool::new(false),
            analysis_gate: Semaphore::new(0),
            analysis_started: AtomicUsize::new(0),
        }
    }

    pub fn set_forecast(&self, behaviour: ForecastBehaviour) {
        *self.forecast.lock() = behaviour;
    }

    /// Delay the forecast response for one product
    pub fn delay_forecast(&self, product: &str, delay: Duration) {
        self.forecast_delays.lock().insert(product.to_string(), delay);
    }

    pub fn fail_analysis(&self, fail: bool) {
        self.analysis_fail.store(fail, Ordering::SeqCst);
    }

    /// Fail only the next `count` analysis calls
    pub fn fail_next_analysis(&self, count: usize) {
        self.analysis_failures_left.store(count, Ordering::SeqCst);
    }

    /// Park every analysis call until [`ScriptedApi::release_analysis`]
    pub fn hold_analysis(&self) {
        self.hold_analysis.store(true, Ordering::SeqCst);
    }

    pub fn release_analysis(&self) {
        self.hold_analysis.store(false, Ordering::SeqCst);
        self.analysis_gate.add_permits(1000);
    }

    pub fn analysis_started(&self) -> usize {
        self.analysis_started.load(Ordering::SeqCst)
    }

    pub fn queries(&self) -> Vec<AnalysisQuery> {
        self.analysis_queries.lock().clone()
    }

    pub fn forecast_calls(&self) -> usize {
        self.forecast_requests.lock().len()
    }
}

#[async_trait]
impl AnalyticsApi for ScriptedApi {
    async fn generate_forecast(&self, request: &ForecastRequest) -> Result<ForecastSnapshot, ApiError> {
        self.forecast_requests.lock().push(request.clone());

        let delay = self.forecast_delays.lock().get(&request.product).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let behaviour = self.forecast.lock().clone();
        match behaviour {
            ForecastBehaviour::Respond(mut value) => {
                if let Some(obj) = value.as_object_mut() {
                    obj.insert("product".to_string(), json!(request.product));
                }
                Ok(ForecastSnapshot::new(value))
            }
            ForecastBehaviour::Fail => Err(ApiError::RequestFailed(
                "error sending request: connection refused".to_string(),
            )),
            ForecastBehaviour::Hang => std::future::pending().await,
        }
    }

    async fn product_analysis(&self, query: &AnalysisQuery) -> Result<AnalysisSnapshot, ApiError> {
        self.analysis_queries.lock().push(query.clone());
        self.analysis_started.fetch_add(1, Ordering::SeqCst);
        let scripted_failure = self
            .analysis_failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
            .is_ok();

        if self.hold_analysis.load(Ordering::SeqCst) {
            let permit = self.analysis_gate.acquire().await.map_err(|e| {
                ApiError::RequestFailed(e.to_string())
            })?;
            permit.forget();
        }

        if scripted_failure || self.analysis_fail.load(Ordering::SeqCst) {
            return Err(ApiError::Status {
                status: 503,
                body: "analysis unavailable".to_string(),
            });
        }

        Ok(analysis_for(query))
    }

    async fn markets(&self) -> Result<Vec<MarketListing>, ApiError> {
        Ok(vec![MarketListing {
            state: "DL".to_string(),
            city: "Delhi".to_string(),
            market: "Azadpur".to_string(),
        }])
    }

    async fn commodities(&self) -> Result<Vec<CommodityListing>, ApiError> {
        Ok(vec![CommodityListing {
            category: "Vegetable".to_string(),
            product: "Potato".to_string(),
        }])
    }
}

/// Deterministic analysis payload; defaults for an empty query
pub fn analysis_for(query: &AnalysisQuery) -> AnalysisSnapshot {
    if query.is_empty() {
        return AnalysisSnapshot::default();
    }

    let product = query.commodity_name.clone().unwrap_or_default();
    let market = query.market_name.clone().unwrap_or_default();
    let mut snapshot = AnalysisSnapshot::default();
    snapshot.selector_data.commodity_name = query.commodity_name.clone();
    snapshot.selector_data.market_name = query.market_name.clone();
    snapshot.selector_data.days = query.days;
    snapshot.stock_metrics = StockMetrics {
        current_stock: 800.0,
        recommended_stock: 1000.0,
        predicted_demand: 950.0,
        ..Default::default()
    };
    snapshot.recommendation_table = vec![RecommendationRow {
        product,
        market,
        current_stock: 800.0,
        recommended_stock: 1000.0,
        action: "restock".to_string(),
        priority: Some("high".to_string()),
    }];
    snapshot
}

pub fn selection(market: &str, product: &str, range: ForecastRange) -> Selection {
    Selection {
        state: Some("DL".to_string()),
        city: Some("Delhi".to_string()),
        market: Some(market.to_string()),
        category: Some("Vegetable".to_string()),
        product: Some(product.to_string()),
        forecast_range_days: Some(range),
    }
}

pub fn delhi_potato() -> Selection {
    selection("Azadpur", "Potato", ForecastRange::Week)
}

pub fn query(product: &str, market: &str, days: u32) -> AnalysisQuery {
    AnalysisQuery {
        commodity_name: Some(product.to_string()),
        market_name: Some(market.to_string()),
        days: Some(days),
    }
}

/// Poll `condition` until it holds, panicking after 5 seconds
pub async fn wait_until(what: &str, mut condition: impl FnMut() -> bool) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !condition() {
        if tokio::time::Instant::now() > deadline {
            panic!("timed out waiting for {}", what);
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

/// Give spawned tasks time to run (and to do something they shouldn't)
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(100)).await;
}

pub const TIMEOUT: Duration = Duration::from_secs(5);
