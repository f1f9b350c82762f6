use crate::error::PipelineError;
use chrono::{DateTime, Utc};
use circulca_schemas::{metrics::DerivedMetrics, project::ProjectMetadata};
use csv::WriterBuilder;
use serde::Serialize;
use std::{
    fs::OpenOptions,
    path::{Path, PathBuf},
};

#[derive(Debug, Serialize)]
struct RunEntry<'a> {
    timestamp: String,
    product_name: &'a str,
    functional_unit: &'a str,
    scenario: &'a str,
    co2_reduction_percent: Option<f64>,
    cost_savings: Option<f64>,
    circularity_score: Option<f64>,
}

/// Appends one line per completed simulation to a CSV history file.
pub struct RunLog {
    path: PathBuf,
}

impl RunLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn record(
        &self,
        at: DateTime<Utc>,
        metadata: &ProjectMetadata,
        metrics: &DerivedMetrics,
    ) -> Result<(), PipelineError> {
        let display = self.path.display().to_string();
        let is_new = self
            .path
            .metadata()
            .map(|m| m.len() == 0)
            .unwrap_or(true);
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .map_err(|e| PipelineError::FileIO(display.clone(), e))?;

        let mut writer = WriterBuilder::new().has_headers(is_new).from_writer(file);
        writer
            .serialize(RunEntry {
                timestamp: at.to_rfc3339(),
                product_name: &metadata.product_name,
                functional_unit: &metadata.functional_unit,
                scenario: metadata.scenario.as_str(),
                co2_reduction_percent: metrics.co2_reduction_percent.value(),
                cost_savings: metrics.cost_savings.value(),
                circularity_score: metrics.circularity_score.value(),
            })
            .map_err(|e| PipelineError::RunLog(display.clone(), e))?;
        writer
            .flush()
            .map_err(|e| PipelineError::FileIO(display, e))?;
        Ok(())
    }
}
