//! Forecast and analysis payloads
//!
//! `ForecastSnapshot` is opaque to the dashboard. `AnalysisSnapshot` is the
//! consolidated payload every dependent view projects from.

use super::selection::Selection;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Backend forecast response, kept verbatim
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ForecastSnapshot(pub Value);

impl ForecastSnapshot {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    pub fn as_json(&self) -> &Value {
        &self.0
    }
}

/// Query parameters for `/api/product-analysis`
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct AnalysisQuery {
    pub commodity_name: Option<String>,
    pub market_name: Option<String>,
    pub days: Option<u32>,
}

impl AnalysisQuery {
    /// Query for a persisted selection. `None` means nothing was ever
    /// persisted and the backend should answer with defaults.
    pub fn for_selection(selection: Option<&Selection>) -> Self {
        match selection {
            None => Self::default(),
            Some(s) => Self {
                commodity_name: s.product.clone().filter(|p| !p.is_empty()),
                market_name: s.market.clone().filter(|m| !m.is_empty()),
                days: s.forecast_range_days.map(|r| r.days()),
            },
        }
    }

    pub fn is_empty(&self) -> bool {
        self.commodity_name.is_none() && self.market_name.is_none() && self.days.is_none()
    }

    /// Query string pairs in the order the backend documents them
    pub fn to_query_params(&self) -> Vec<(String, String)> {
        let mut params = Vec::new();
        if let Some(commodity) = &self.commodity_name {
            params.push(("commodity_name".to_string(), commodity.clone()));
        }
        if let Some(market) = &self.market_name {
            params.push(("market_name".to_string(), market.clone()));
        }
        if let Some(days) = self.days {
            params.push(("days".to_string(), days.to_string()));
        }
        params
    }
}

/// Echo of the selector the backend answered for
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorData {
    pub commodity_name: Option<String>,
    pub market_name: Option<String>,
    pub days: Option<u32>,
}

/// Headline stock figures. All zero when the backend has nothing to report.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StockMetrics {
    pub current_stock: f64,
    pub recommended_stock: f64,
    pub predicted_demand: f64,
    pub safety_stock: f64,
    pub days_of_cover: f64,
}

impl StockMetrics {
    pub fn is_zero(&self) -> bool {
        self.current_stock == 0.0
            && self.recommended_stock == 0.0
            && self.predicted_demand == 0.0
            && self.safety_stock == 0.0
            && self.days_of_cover == 0.0
    }
}

/// One point of the demand chart
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DemandPoint {
    pub date: String,
    pub actual: Option<f64>,
    pub predicted: Option<f64>,
}

/// A festival or weather event with its expected effect on demand
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImpactEvent {
    pub name: String,
    pub date: Option<String>,
    /// Expected demand change in percent (negative = drop)
    pub impact_pct: f64,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImpactData {
    pub festival: Vec<ImpactEvent>,
    pub weather: Vec<ImpactEvent>,
}

/// One row of the inventory recommendation table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecommendationRow {
    pub product: String,
    pub market: String,
    pub current_stock: f64,
    pub recommended_stock: f64,
    /// Backend verdict, e.g. "restock", "reduce", "hold"
    pub action: String,
    pub priority: Option<String>,
}

impl RecommendationRow {
    /// Positive when more stock is needed
    pub fn shortfall(&self) -> f64 {
        self.recommended_stock - self.current_stock
    }
}

/// Consolidated payload of `/api/product-analysis`.
///
/// Every field defaults, so a defaults response (`{}` or zeros) parses into
/// the same value as [`AnalysisSnapshot::default`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AnalysisSnapshot {
    pub selector_data: SelectorData,
    pub stock_metrics: StockMetrics,
    pub demand_graph_data: Vec<DemandPoint>,
    pub impact_data: ImpactData,
    pub recommendation_table: Vec<RecommendationRow>,
}

impl AnalysisSnapshot {
    /// True for the defaults payload (nothing selected yet)
    pub fn is_default(&self) -> bool {
        self == &Self::default()
    }
}
