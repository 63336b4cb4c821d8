//! Wire types for the analytics backend

use crate::domain::Selection;
use serde::{Deserialize, Serialize};

/// Body of `POST /api/forecast`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForecastRequest {
    pub state: String,
    pub city: String,
    pub market: String,
    pub category: String,
    pub product: String,
    pub forecast_range: u32,
}

impl ForecastRequest {
    /// Build the request body. Returns `None` unless the selection is complete.
    pub fn from_selection(selection: &Selection) -> Option<Self> {
        if !selection.is_complete() {
            return None;
        }
        Some(Self {
            state: selection.state.clone()?,
            city: selection.city.clone()?,
            market: selection.market.clone()?,
            category: selection.category.clone()?,
            product: selection.product.clone()?,
            forecast_range: selection.forecast_range_days?.days(),
        })
    }
}

/// Entry of `GET /api/markets`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketListing {
    pub state: String,
    pub city: String,
    #[serde(alias = "market_name")]
    pub market: String,
}

/// Entry of `GET /api/commodities`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CommodityListing {
    pub category: String,
    #[serde(alias = "commodity_name")]
    pub product: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ForecastRange;
    use serde_json::json;

    #[test]
    fn test_request_body_shape() {
        let selection = Selection {
            state: Some("DL".to_string()),
            city: Some("Delhi".to_string()),
            market: Some("Azadpur".to_string()),
            category: Some("Vegetable".to_string()),
            product: Some("Potato".to_string()),
            forecast_range_days: Some(ForecastRange::Fortnight),
        };

        let request = ForecastRequest::from_selection(&selection).unwrap();
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({
                "state": "DL",
                "city": "Delhi",
                "market": "Azadpur",
                "category": "Vegetable",
                "product": "Potato",
                "forecast_range": 14
            })
        );
    }

    #[test]
    fn test_incomplete_selection_has_no_request() {
        let selection = Selection {
            product: Some("Potato".to_string()),
            ..Default::default()
        };
        assert!(ForecastRequest::from_selection(&selection).is_none());
    }

    #[test]
    fn test_listing_aliases() {
        let market: MarketListing =
            serde_json::from_value(json!({"state": "DL", "city": "Delhi", "market_name": "Azadpur"}))
                .unwrap();
        assert_eq!(market.market, "Azadpur");

        let commodity: CommodityListing =
            serde_json::from_value(json!({"category": "Vegetable", "commodity_name": "Potato"}))
                .unwrap();
        assert_eq!(commodity.product, "Potato");
    }
}
