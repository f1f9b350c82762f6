//! The canonical table schema for a product's material inventory.
//!
//! Every row in the pipeline carries exactly these twelve fields. The header
//! alias table below is the only place where free-form column titles are tied
//! to a schema field, so it can be exercised without touching any parser.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Whether a field holds a quantity or a label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FieldKind {
    Numeric,
    Text,
}

/// One column of the inventory table, in canonical order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Weight,
    RecycledContent,
    EnergyExtraction,
    EnergyManufacturing,
    TransportDistance,
    TransportMode,
    EndOfLifeMethod,
    RecyclingYield,
    Co2Extraction,
    Co2Manufacturing,
    MaterialCost,
    TransportCost,
}

impl Field {
    pub const COUNT: usize = 12;

    pub const ALL: [Field; Field::COUNT] = [
        Field::Weight,
        Field::RecycledContent,
        Field::EnergyExtraction,
        Field::EnergyManufacturing,
        Field::TransportDistance,
        Field::TransportMode,
        Field::EndOfLifeMethod,
        Field::RecyclingYield,
        Field::Co2Extraction,
        Field::Co2Manufacturing,
        Field::MaterialCost,
        Field::TransportCost,
    ];

    /// Position of the field in canonical order.
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn kind(self) -> FieldKind {
        match self {
            Field::TransportMode | Field::EndOfLifeMethod => FieldKind::Text,
            _ => FieldKind::Numeric,
        }
    }

    pub fn is_numeric(self) -> bool {
        self.kind() == FieldKind::Numeric
    }

    /// The normalized key, as produced by [`normalize_header`] on the canonical label.
    pub fn key(self) -> &'static str {
        match self {
            Field::Weight => "weight",
            Field::RecycledContent => "recycled_content",
            Field::EnergyExtraction => "energy_extraction",
            Field::EnergyManufacturing => "energy_manufacturing",
            Field::TransportDistance => "transport_distance",
            Field::TransportMode => "transport_mode",
            Field::EndOfLifeMethod => "end_of_life_method",
            Field::RecyclingYield => "recycling_yield",
            Field::Co2Extraction => "co2_extraction",
            Field::Co2Manufacturing => "co2_manufacturing",
            Field::MaterialCost => "material_cost",
            Field::TransportCost => "transport_cost",
        }
    }

    /// Column title used when a row set is written back out as CSV.
    pub fn label(self) -> &'static str {
        match self {
            Field::Weight => "Weight (kg)",
            Field::RecycledContent => "Recycled Content (%)",
            Field::EnergyExtraction => "Energy Extraction (MJ)",
            Field::EnergyManufacturing => "Energy Manufacturing (MJ)",
            Field::TransportDistance => "Transport Distance (km)",
            Field::TransportMode => "Transport Mode",
            Field::EndOfLifeMethod => "End of Life Method",
            Field::RecyclingYield => "Recycling Yield (%)",
            Field::Co2Extraction => "CO2 Extraction (kg)",
            Field::Co2Manufacturing => "CO2 Manufacturing (kg)",
            Field::MaterialCost => "Material Cost ($)",
            Field::TransportCost => "Transport Cost ($)",
        }
    }

    /// Column name understood by the imputation and simulation service.
    pub fn wire_name(self) -> &'static str {
        match self {
            Field::Weight => "Weight_kg",
            Field::RecycledContent => "Recycled_Content_percent",
            Field::EnergyExtraction => "Energy_Extraction_MJ",
            Field::EnergyManufacturing => "Energy_Manufacturing_MJ",
            Field::TransportDistance => "Transport_km",
            Field::TransportMode => "Transport_Mode",
            Field::EndOfLifeMethod => "EoL_Method",
            Field::RecyclingYield => "Recycling_Yield_percent",
            Field::Co2Extraction => "CO2_Extraction_kg",
            Field::Co2Manufacturing => "CO2_Manufacturing_kg",
            Field::MaterialCost => "Material_Cost_USD",
            Field::TransportCost => "Transport_Cost_USD",
        }
    }

    /// Resolves a raw column title to a schema field, if the title is known.
    pub fn from_header(header: &str) -> Option<Field> {
        let key = normalize_header(header);
        HEADER_ALIASES
            .iter()
            .find(|(alias, _)| *alias == key)
            .map(|(_, field)| *field)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Normalized header key → schema field.
pub const HEADER_ALIASES: &[(&str, Field)] = &[
    ("weight", Field::Weight),
    ("mass", Field::Weight),
    ("recycled_content", Field::RecycledContent),
    ("recycled", Field::RecycledContent),
    ("energy_extraction", Field::EnergyExtraction),
    ("extraction_energy", Field::EnergyExtraction),
    ("energy_manufacturing", Field::EnergyManufacturing),
    ("manufacturing_energy", Field::EnergyManufacturing),
    ("transport_distance", Field::TransportDistance),
    ("transport", Field::TransportDistance),
    ("distance", Field::TransportDistance),
    ("transport_mode", Field::TransportMode),
    ("end_of_life_method", Field::EndOfLifeMethod),
    ("end_of_life", Field::EndOfLifeMethod),
    ("eol_method", Field::EndOfLifeMethod),
    ("eol", Field::EndOfLifeMethod),
    ("recycling_yield", Field::RecyclingYield),
    ("co2_extraction", Field::Co2Extraction),
    ("extraction_co2", Field::Co2Extraction),
    ("co2_manufacturing", Field::Co2Manufacturing),
    ("manufacturing_co2", Field::Co2Manufacturing),
    ("material_cost", Field::MaterialCost),
    ("transport_cost", Field::TransportCost),
];

/// Unit tokens dropped from the end of a header.
const UNIT_SUFFIXES: &[&str] = &["%", "percent", "pct", "$", "usd", "kg", "mj", "kwh", "km"];

/// Turns a free-form column title into a schema key.
///
/// Lower-cases the title, drops bracketed annotations such as `(kg)` or `[MJ]`,
/// strips trailing unit tokens and joins the remaining words with underscores.
/// The result depends on the header text alone.
pub fn normalize_header(header: &str) -> String {
    let lowered = header.trim().to_lowercase().replace('₂', "2");

    let mut unbracketed = String::with_capacity(lowered.len());
    let mut depth = 0usize;
    for c in lowered.chars() {
        match c {
            '(' | '[' => depth += 1,
            ')' | ']' => depth = depth.saturating_sub(1),
            '%' | '$' if depth == 0 => {
                unbracketed.push(' ');
                unbracketed.push(c);
                unbracketed.push(' ');
            }
            _ if depth == 0 => unbracketed.push(c),
            _ => {}
        }
    }

    let mut tokens: Vec<&str> = unbracketed
        .split(|c: char| c.is_whitespace() || c == '_' || c == '-')
        .filter(|t| !t.is_empty())
        .collect();
    while tokens.len() > 1 && tokens.last().is_some_and(|t| UNIT_SUFFIXES.contains(t)) {
        tokens.pop();
    }
    tokens.join("_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_labels_resolve_to_their_own_field() {
        for field in Field::ALL {
            assert_eq!(normalize_header(field.label()), field.key());
            assert_eq!(Field::from_header(field.label()), Some(field));
        }
    }

    #[test]
    fn wire_names_resolve_to_their_own_field() {
        for field in Field::ALL {
            assert_eq!(Field::from_header(field.wire_name()), Some(field), "{}", field);
        }
    }

    #[test]
    fn unit_suffixes_are_stripped() {
        assert_eq!(normalize_header("Recycled Content %"), "recycled_content");
        assert_eq!(normalize_header("Recycled_Content_%"), "recycled_content");
        assert_eq!(normalize_header("Material Cost USD"), "material_cost");
        assert_eq!(normalize_header("  CO₂ Manufacturing [kg] "), "co2_manufacturing");
        assert_eq!(normalize_header("Transport (km)"), "transport");
    }

    #[test]
    fn a_bare_unit_is_not_reduced_to_nothing() {
        assert_eq!(normalize_header("kg"), "kg");
        assert_eq!(Field::from_header("kg"), None);
    }

    #[test]
    fn unknown_headers_do_not_resolve() {
        assert_eq!(Field::from_header("supplier"), None);
        assert_eq!(Field::from_header(""), None);
    }

    #[test]
    fn index_matches_canonical_order() {
        for (i, field) in Field::ALL.iter().enumerate() {
            assert_eq!(field.index(), i);
        }
    }
}
