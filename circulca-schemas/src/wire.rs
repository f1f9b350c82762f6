//! Request and response contracts exchanged with the imputation, simulation
//! and report service.
//!
//! Incoming values are validated here: a number field that carries anything
//! other than a finite number (or numeric text) is read as absent instead of
//! failing the whole response.

use crate::{
    defaults::CompanyDefaults,
    field::Field,
    metrics::StageSeries,
    project::ProjectMetadata,
};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// A typed view of one field's value on the wire.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum WireValue<'a> {
    Number(f64),
    Text(&'a str),
}

/// One row of the inventory as the service sees it: numbers are numbers,
/// labels are strings and anything missing is `null`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MaterialRecord {
    #[serde(rename = "Weight_kg", default, deserialize_with = "lenient_number")]
    pub weight_kg: Option<f64>,
    #[serde(rename = "Recycled_Content_percent", default, deserialize_with = "lenient_number")]
    pub recycled_content_percent: Option<f64>,
    #[serde(rename = "Energy_Extraction_MJ", default, deserialize_with = "lenient_number")]
    pub energy_extraction_mj: Option<f64>,
    #[serde(rename = "Energy_Manufacturing_MJ", default, deserialize_with = "lenient_number")]
    pub energy_manufacturing_mj: Option<f64>,
    #[serde(rename = "Transport_km", default, deserialize_with = "lenient_number")]
    pub transport_km: Option<f64>,
    #[serde(rename = "Transport_Mode", default, deserialize_with = "lenient_text")]
    pub transport_mode: Option<String>,
    #[serde(rename = "EoL_Method", default, deserialize_with = "lenient_text")]
    pub eol_method: Option<String>,
    #[serde(rename = "Recycling_Yield_percent", default, deserialize_with = "lenient_number")]
    pub recycling_yield_percent: Option<f64>,
    #[serde(rename = "CO2_Extraction_kg", default, deserialize_with = "lenient_number")]
    pub co2_extraction_kg: Option<f64>,
    #[serde(rename = "CO2_Manufacturing_kg", default, deserialize_with = "lenient_number")]
    pub co2_manufacturing_kg: Option<f64>,
    #[serde(rename = "Material_Cost_USD", default, deserialize_with = "lenient_number")]
    pub material_cost_usd: Option<f64>,
    #[serde(rename = "Transport_Cost_USD", default, deserialize_with = "lenient_number")]
    pub transport_cost_usd: Option<f64>,
}

impl MaterialRecord {
    fn number_slot(&mut self, field: Field) -> Option<&mut Option<f64>> {
        match field {
            Field::Weight => Some(&mut self.weight_kg),
            Field::RecycledContent => Some(&mut self.recycled_content_percent),
            Field::EnergyExtraction => Some(&mut self.energy_extraction_mj),
            Field::EnergyManufacturing => Some(&mut self.energy_manufacturing_mj),
            Field::TransportDistance => Some(&mut self.transport_km),
            Field::RecyclingYield => Some(&mut self.recycling_yield_percent),
            Field::Co2Extraction => Some(&mut self.co2_extraction_kg),
            Field::Co2Manufacturing => Some(&mut self.co2_manufacturing_kg),
            Field::MaterialCost => Some(&mut self.material_cost_usd),
            Field::TransportCost => Some(&mut self.transport_cost_usd),
            Field::TransportMode | Field::EndOfLifeMethod => None,
        }
    }

    fn text_slot(&mut self, field: Field) -> Option<&mut Option<String>> {
        match field {
            Field::TransportMode => Some(&mut self.transport_mode),
            Field::EndOfLifeMethod => Some(&mut self.eol_method),
            _ => None,
        }
    }

    /// The value held for `field`, or `None` when it is absent.
    pub fn value(&self, field: Field) -> Option<WireValue<'_>> {
        let number = match field {
            Field::Weight => self.weight_kg,
            Field::RecycledContent => self.recycled_content_percent,
            Field::EnergyExtraction => self.energy_extraction_mj,
            Field::EnergyManufacturing => self.energy_manufacturing_mj,
            Field::TransportDistance => self.transport_km,
            Field::RecyclingYield => self.recycling_yield_percent,
            Field::Co2Extraction => self.co2_extraction_kg,
            Field::Co2Manufacturing => self.co2_manufacturing_kg,
            Field::MaterialCost => self.material_cost_usd,
            Field::TransportCost => self.transport_cost_usd,
            Field::TransportMode => return self.transport_mode.as_deref().map(WireValue::Text),
            Field::EndOfLifeMethod => return self.eol_method.as_deref().map(WireValue::Text),
        };
        number.filter(|n| n.is_finite()).map(WireValue::Number)
    }

    /// Stores a number. Ignored for text fields; non-finite input is stored as absent.
    pub fn set_number(&mut self, field: Field, value: Option<f64>) {
        if let Some(slot) = self.number_slot(field) {
            *slot = value.filter(|n| n.is_finite());
        }
    }

    /// Stores a label. Ignored for numeric fields; empty text is stored as absent.
    pub fn set_text(&mut self, field: Field, value: Option<String>) {
        if let Some(slot) = self.text_slot(field) {
            *slot = value.filter(|s| !s.trim().is_empty());
        }
    }
}

fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n.as_f64().filter(|n| n.is_finite()),
        Some(Value::String(s)) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        _ => None,
    })
}

fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        _ => None,
    })
}

/// Payload shared by the imputation and simulation endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceRequest {
    pub project_metadata: ProjectMetadata,
    pub data: Vec<MaterialRecord>,
    pub custom_defaults: Option<CompanyDefaults>,
}

impl ServiceRequest {
    /// Canonical JSON text of the request; equal inputs give equal fingerprints.
    pub fn fingerprint(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Response of the imputation endpoint, positionally aligned with the request's `data`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImputationResponse {
    pub imputed_data: Vec<MaterialRecord>,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Circularity {
    #[serde(rename = "MCI", default)]
    pub mci: f64,
    #[serde(rename = "Recycling_rate", default)]
    pub recycling_rate: f64,
    #[serde(rename = "Loops", default)]
    pub loops: u32,
}

/// Impact attributed to each life-cycle stage, in kg CO₂.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct StageImpact {
    pub extraction: f64,
    pub manufacturing: f64,
    pub transport: f64,
    pub end_of_life: f64,
}

impl StageImpact {
    pub fn total(&self) -> f64 {
        self.extraction + self.manufacturing + self.transport + self.end_of_life
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ScenarioResult {
    #[serde(rename = "CO2_total_kg", default)]
    pub co2_total_kg: f64,
    #[serde(rename = "Cost_total_USD", default)]
    pub cost_total_usd: f64,
    #[serde(rename = "Energy_total_MJ", default, skip_serializing_if = "Option::is_none")]
    pub energy_total_mj: Option<f64>,
    #[serde(rename = "Circularity", default)]
    pub circularity: Circularity,
    #[serde(rename = "Virgin_Input_percent", default, skip_serializing_if = "Option::is_none")]
    pub virgin_input_percent: Option<f64>,
    #[serde(rename = "Recycled_Input_percent", default, skip_serializing_if = "Option::is_none")]
    pub recycled_input_percent: Option<f64>,
    #[serde(rename = "Stage_Impact", default, skip_serializing_if = "Option::is_none")]
    pub stage_impact: Option<StageImpact>,
    /// Set by the service when it fell back to zeros for this scenario.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SimulationResults {
    #[serde(default)]
    pub linear: Option<ScenarioResult>,
    #[serde(default)]
    pub circular: Option<ScenarioResult>,
    #[serde(default)]
    pub recommendation: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ImputationSummary {
    #[serde(default)]
    pub total_missing_values: usize,
    #[serde(default)]
    pub values_imputed: usize,
    #[serde(default)]
    pub columns_with_missing: usize,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RunMetadata {
    #[serde(default)]
    pub scenario: Option<String>,
    #[serde(default)]
    pub data_points: usize,
    #[serde(default)]
    pub imputation: Option<ImputationSummary>,
}

/// Raw response of the simulation endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationResponse {
    pub results: SimulationResults,
    #[serde(default)]
    pub metadata: Option<RunMetadata>,
}

/// Payload of the report endpoint.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRequest {
    pub linear: ScenarioResult,
    pub circular: ScenarioResult,
    pub recommendations: Vec<String>,
    pub stage_impact: StageSeries,
}
