use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Company-level override parameters (CO₂ factors, yields, cost factors).
///
/// The pipeline only reads these and forwards them to the service untouched.
/// Whether a company has configured its own values is carried by the explicit
/// `custom` marker, never inferred from the parameter values themselves. An
/// unset record reads back as `{}`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CompanyDefaults {
    #[serde(default, skip_serializing_if = "is_false")]
    pub custom: bool,
    #[serde(flatten)]
    pub parameters: BTreeMap<String, serde_json::Value>,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl CompanyDefaults {
    /// True when the company has explicitly configured overrides.
    pub fn has_overrides(&self) -> bool {
        self.custom
    }
}
