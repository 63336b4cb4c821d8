//! Dependent view adapters
//!
//! Pure projections of the current [`AnalysisSnapshot`]. They never fetch,
//! never touch the selection or storage; views are not a source of truth.

use crate::domain::{AnalysisSnapshot, DemandPoint, ImpactEvent, RecommendationRow};
use std::cmp::Ordering;

/// Relative gap under which stock counts as balanced
const BALANCED_TOLERANCE: f64 = 0.05;

/// Recommendation verdicts that need no follow-up
const NO_ACTION: [&str; 3] = ["", "hold", "none"];

// ==================== INVENTORY ====================

#[derive(Debug, Clone, PartialEq)]
pub struct InventoryLine {
    pub product: String,
    pub market: String,
    pub current_stock: f64,
    pub recommended_stock: f64,
    pub shortfall: f64,
    pub action: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct InventoryView {
    pub lines: Vec<InventoryLine>,
    /// Sum of positive shortfalls
    pub total_shortfall: f64,
}

pub fn inventory_view(snapshot: &AnalysisSnapshot) -> InventoryView {
    let lines: Vec<InventoryLine> = snapshot
        .recommendation_table
        .iter()
        .map(|row| InventoryLine {
            product: row.product.clone(),
            market: row.market.clone(),
            current_stock: row.current_stock,
            recommended_stock: row.recommended_stock,
            shortfall: row.shortfall(),
            action: row.action.clone(),
        })
        .collect();

    let total_shortfall = lines.iter().map(|l| l.shortfall.max(0.0)).sum();

    InventoryView {
        lines,
        total_shortfall,
    }
}

// ==================== STOCK COMPARISON ====================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StockStatus {
    Deficit,
    Surplus,
    Balanced,
    /// Defaults payload, nothing to compare
    NoData,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StockComparison {
    pub current_stock: f64,
    pub recommended_stock: f64,
    pub predicted_demand: f64,
    /// recommended - current
    pub gap: f64,
    pub status: StockStatus,
}

pub fn stock_comparison(snapshot: &AnalysisSnapshot) -> StockComparison {
    let metrics = &snapshot.stock_metrics;
    let gap = metrics.recommended_stock - metrics.current_stock;

    let status = if metrics.is_zero() {
        StockStatus::NoData
    } else if gap.abs() <= metrics.recommended_stock.abs() * BALANCED_TOLERANCE {
        StockStatus::Balanced
    } else if gap > 0.0 {
        StockStatus::Deficit
    } else {
        StockStatus::Surplus
    };

    StockComparison {
        current_stock: metrics.current_stock,
        recommended_stock: metrics.recommended_stock,
        predicted_demand: metrics.predicted_demand,
        gap,
        status,
    }
}

// ==================== ACTION REQUIRED ====================

#[derive(Debug, Clone, PartialEq)]
pub struct ActionItem {
    pub product: String,
    pub market: String,
    pub action: String,
    pub shortfall: f64,
    pub priority: Option<String>,
}

fn priority_rank(priority: Option<&str>) -> u8 {
    match priority.map(|p| p.to_ascii_lowercase()).as_deref() {
        Some("high") | Some("critical") => 0,
        Some("medium") => 1,
        Some("low") => 2,
        _ => 3,
    }
}

fn needs_action(row: &RecommendationRow) -> bool {
    !NO_ACTION.contains(&row.action.trim().to_ascii_lowercase().as_str())
}

/// Rows that need a decision, most urgent first
pub fn action_required(snapshot: &AnalysisSnapshot) -> Vec<ActionItem> {
    let mut items: Vec<ActionItem> = snapshot
        .recommendation_table
        .iter()
        .filter(|row| needs_action(row))
        .map(|row| ActionItem {
            product: row.product.clone(),
            market: row.market.clone(),
            action: row.action.clone(),
            shortfall: row.shortfall(),
            priority: row.priority.clone(),
        })
        .collect();

    items.sort_by(|a, b| {
        priority_rank(a.priority.as_deref())
            .cmp(&priority_rank(b.priority.as_deref()))
            .then_with(|| {
                b.shortfall
                    .abs()
                    .partial_cmp(&a.shortfall.abs())
                    .unwrap_or(Ordering::Equal)
            })
    });
    items
}

// ==================== DECISION INSIGHTS ====================

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DecisionInsights {
    /// Festival with the largest absolute effect on demand
    pub top_festival: Option<ImpactEvent>,
    pub top_weather: Option<ImpactEvent>,
    /// Sum of every festival and weather effect, in percent
    pub net_impact_pct: f64,
    /// Highest predicted demand point
    pub peak_demand: Option<DemandPoint>,
}

fn strongest(events: &[ImpactEvent]) -> Option<ImpactEvent> {
    events
        .iter()
        .max_by(|a, b| {
            a.impact_pct
                .abs()
                .partial_cmp(&b.impact_pct.abs())
                .unwrap_or(Ordering::Equal)
        })
        .cloned()
}

pub fn decision_insights(snapshot: &AnalysisSnapshot) -> DecisionInsights {
    let impact = &snapshot.impact_data;
    let net_impact_pct = impact
        .festival
        .iter()
        .chain(impact.weather.iter())
        .map(|e| e.impact_pct)
        .sum();

    let peak_demand = snapshot
        .demand_graph_data
        .iter()
        .filter(|p| p.predicted.is_some())
        .max_by(|a, b| {
            a.predicted
                .partial_cmp(&b.predicted)
                .unwrap_or(Ordering::Equal)
        })
        .cloned();

    DecisionInsights {
        top_festival: strongest(&impact.festival),
        top_weather: strongest(&impact.weather),
        net_impact_pct,
        peak_demand,
    }
}

// ==================== DEMAND SERIES ====================

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DemandSeries {
    pub actual: Vec<(String, f64)>,
    pub predicted: Vec<(String, f64)>,
}

/// Split the demand chart into its two lines, skipping gaps
pub fn demand_series(snapshot: &AnalysisSnapshot) -> DemandSeries {
    let mut series = DemandSeries::default();
    for point in &snapshot.demand_graph_data {
        if let Some(actual) = point.actual {
            series.actual.push((point.date.clone(), actual));
        }
        if let Some(predicted) = point.predicted {
            series.predicted.push((point.date.clone(), predicted));
        }
    }
    series
}

// ==================== ALL VIEWS ====================

/// Every projection of one snapshot, computed together
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardViews {
    pub inventory: InventoryView,
    pub stock: StockComparison,
    pub actions: Vec<ActionItem>,
    pub insights: DecisionInsights,
    pub demand: DemandSeries,
}

impl DashboardViews {
    pub fn project(snapshot: &AnalysisSnapshot) -> Self {
        Self {
            inventory: inventory_view(snapshot),
            stock: stock_comparison(snapshot),
            actions: action_required(snapshot),
            insights: decision_insights(snapshot),
            demand: demand_series(snapshot),
        }
    }
}
