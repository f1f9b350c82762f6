//! The derived-metrics view model handed to presentation code. Nothing here is
//! transmitted by the simulation service; it is computed from its response.

use crate::wire::StageImpact;
use serde::{Serialize, Serializer};
use std::fmt;

/// A metric that may have no meaningful value, such as a percentage change
/// against a zero baseline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MetricValue {
    Defined(f64),
    Undefined,
}

impl MetricValue {
    pub fn value(self) -> Option<f64> {
        match self {
            MetricValue::Defined(v) => Some(v),
            MetricValue::Undefined => None,
        }
    }

    pub fn is_defined(self) -> bool {
        matches!(self, MetricValue::Defined(_))
    }
}

impl From<Option<f64>> for MetricValue {
    /// `None` and non-finite values are undefined.
    fn from(value: Option<f64>) -> Self {
        match value {
            Some(v) if v.is_finite() => MetricValue::Defined(v),
            _ => MetricValue::Undefined,
        }
    }
}

impl Serialize for MetricValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.value().serialize(serializer)
    }
}

impl fmt::Display for MetricValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MetricValue::Defined(v) => write!(f, "{:.1}", v),
            MetricValue::Undefined => f.write_str("undefined"),
        }
    }
}

/// Where a breakdown came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakdownSource {
    /// Supplied by the simulation service.
    Reported,
    /// Split from the scenario total with fixed stage weights.
    Estimated,
    /// Fixed illustrative constants, not derived from any input.
    Placeholder,
}

/// Stage-impact series per scenario. A scenario the service did not
/// evaluate has no series.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageSeries {
    pub linear: Option<StageImpact>,
    pub circular: Option<StageImpact>,
    pub source: BreakdownSource,
}

/// Percentage split of material inputs and losses for the circular scenario.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MaterialFlow {
    pub virgin_percent: f64,
    pub recycled_percent: f64,
    pub loss_percent: f64,
    pub source: BreakdownSource,
}

/// Everything the comparison view shows for one completed simulation.
/// A new simulation replaces it wholesale. Comparison metrics are undefined
/// when only one scenario was evaluated.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DerivedMetrics {
    pub co2_reduction_percent: MetricValue,
    pub cost_savings: MetricValue,
    pub stage_impact: StageSeries,
    pub material_flow: MaterialFlow,
    /// Circular-scenario MCI expressed as a percentage.
    pub circularity_score: MetricValue,
    pub recommendations: Vec<String>,
}
