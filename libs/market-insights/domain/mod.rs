//! Domain Layer
//!
//! Pure entities: the selection and the payloads derived from it.
//! No dependencies on infrastructure or application layers.

pub mod selection;
pub mod snapshot;

pub use selection::{ForecastRange, Selection, SelectionField, SelectionPatch};
pub use snapshot::{
    AnalysisQuery, AnalysisSnapshot, DemandPoint, ForecastSnapshot, ImpactData, ImpactEvent,
    RecommendationRow, SelectorData, StockMetrics,
};
