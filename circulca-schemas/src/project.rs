use serde::{Deserialize, Serialize};
use std::fmt;

/// Which life-cycle scenarios the service should evaluate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scenario {
    Linear,
    Circular,
    #[default]
    Both,
}

impl Scenario {
    pub fn as_str(self) -> &'static str {
        match self {
            Scenario::Linear => "linear",
            Scenario::Circular => "circular",
            Scenario::Both => "both",
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Describes the product under study.
///
/// A built request owns its own copy; changing the metadata afterwards means
/// building a new request.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProjectMetadata {
    pub product_name: String,
    /// The reference quantity impacts are normalized against (e.g. "1 can").
    pub functional_unit: String,
    pub geographic_scope: String,
    #[serde(default)]
    pub scenario: Scenario,
}
