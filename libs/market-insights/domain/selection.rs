//! Selection entity
//!
//! The user's market / product / forecast-range choice. Every derived view
//! in the dashboard hangs off the most recently persisted selection.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Forecast horizon offered by the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum ForecastRange {
    /// 7 days
    Week,
    /// 14 days
    Fortnight,
}

impl ForecastRange {
    /// Number of days covered by this range
    pub fn days(self) -> u32 {
        match self {
            ForecastRange::Week => 7,
            ForecastRange::Fortnight => 14,
        }
    }

    pub fn from_days(days: u32) -> Option<Self> {
        match days {
            7 => Some(ForecastRange::Week),
            14 => Some(ForecastRange::Fortnight),
            _ => None,
        }
    }
}

impl TryFrom<u32> for ForecastRange {
    type Error = String;

    fn try_from(days: u32) -> Result<Self, Self::Error> {
        Self::from_days(days).ok_or_else(|| format!("unsupported forecast range: {} days", days))
    }
}

impl From<ForecastRange> for u32 {
    fn from(range: ForecastRange) -> Self {
        range.days()
    }
}

impl fmt::Display for ForecastRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}d", self.days())
    }
}

/// Names of the six fields a selection needs before a forecast can run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionField {
    State,
    City,
    Market,
    Category,
    Product,
    ForecastRange,
}

impl SelectionField {
    pub fn as_str(self) -> &'static str {
        match self {
            SelectionField::State => "state",
            SelectionField::City => "city",
            SelectionField::Market => "market",
            SelectionField::Category => "category",
            SelectionField::Product => "product",
            SelectionField::ForecastRange => "forecastRangeDays",
        }
    }
}

impl fmt::Display for SelectionField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Market / product / horizon choice.
///
/// Fields fill in progressively (state → city → market, category → product),
/// so every field is optional. Serialized with camelCase keys, which is the
/// format stored under the `forecastSelection` key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Selection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub city: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub market: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub forecast_range_days: Option<ForecastRange>,
}

fn filled(value: &Option<String>) -> bool {
    value.as_deref().map_or(false, |v| !v.is_empty())
}

impl Selection {
    /// Fields that are still empty, in form order
    pub fn missing_fields(&self) -> Vec<SelectionField> {
        let mut missing = Vec::new();
        if !filled(&self.state) {
            missing.push(SelectionField::State);
        }
        if !filled(&self.city) {
            missing.push(SelectionField::City);
        }
        if !filled(&self.market) {
            missing.push(SelectionField::Market);
        }
        if !filled(&self.category) {
            missing.push(SelectionField::Category);
        }
        if !filled(&self.product) {
            missing.push(SelectionField::Product);
        }
        if self.forecast_range_days.is_none() {
            missing.push(SelectionField::ForecastRange);
        }
        missing
    }

    /// True once all six fields are non-empty
    pub fn is_complete(&self) -> bool {
        filled(&self.state)
            && filled(&self.city)
            && filled(&self.market)
            && filled(&self.category)
            && filled(&self.product)
            && self.forecast_range_days.is_some()
    }

    /// Merge a patch, keeping fields the patch does not mention
    pub fn apply(&mut self, patch: SelectionPatch) {
        if let Some(state) = patch.state {
            self.state = Some(state);
        }
        if let Some(city) = patch.city {
            self.city = Some(city);
        }
        if let Some(market) = patch.market {
            self.market = Some(market);
        }
        if let Some(category) = patch.category {
            self.category = Some(category);
        }
        if let Some(product) = patch.product {
            self.product = Some(product);
        }
        if let Some(range) = patch.forecast_range_days {
            self.forecast_range_days = Some(range);
        }
    }

    /// Short human-readable label for logs
    pub fn label(&self) -> String {
        format!(
            "{}/{} @ {} ({})",
            self.category.as_deref().unwrap_or("-"),
            self.product.as_deref().unwrap_or("-"),
            self.market.as_deref().unwrap_or("-"),
            self.forecast_range_days
                .map(|r| r.to_string())
                .unwrap_or_else(|| "-".to_string()),
        )
    }
}

/// Partial update for a [`Selection`]. `None` means "leave as is".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SelectionPatch {
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub market: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub product: Option<String>,
    #[serde(default)]
    pub forecast_range_days: Option<ForecastRange>,
}

impl SelectionPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(mut self, state: impl Into<String>) -> Self {
        self.state = Some(state.into());
        self
    }

    pub fn city(mut self, city: impl Into<String>) -> Self {
        self.city = Some(city.into());
        self
    }

    pub fn market(mut self, market: impl Into<String>) -> Self {
        self.market = Some(market.into());
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn product(mut self, product: impl Into<String>) -> Self {
        self.product = Some(product.into());
        self
    }

    pub fn forecast_range(mut self, range: ForecastRange) -> Self {
        self.forecast_range_days = Some(range);
        self
    }

    /// Build a patch from a `field=value` pair as typed on the command line
    pub fn parse_pair(pair: &str) -> Option<Self> {
        let (field, value) = pair.split_once('=')?;
        let value = value.trim();
        let patch = Self::new();
        match field.trim() {
            "state" => Some(patch.state(value)),
            "city" => Some(patch.city(value)),
            "market" => Some(patch.market(value)),
            "category" => Some(patch.category(value)),
            "product" => Some(patch.product(value)),
            "days" | "forecastRangeDays" | "forecast_range" => value
                .parse::<u32>()
                .ok()
                .and_then(ForecastRange::from_days)
                .map(|r| patch.forecast_range(r)),
            _ => None,
        }
    }
}

impl From<Selection> for SelectionPatch {
    fn from(selection: Selection) -> Self {
        Self {
            state: selection.state,
            city: selection.city,
            market: selection.market,
            category: selection.category,
            product: selection.product,
            forecast_range_days: selection.forecast_range_days,
        }
    }
}
