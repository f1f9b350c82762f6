use crate::error::PipelineError;
use circulca_schemas::{
    defaults::CompanyDefaults,
    field::Field,
    project::ProjectMetadata,
    row::{Cell, Row, RowSet},
    wire::{MaterialRecord, ServiceRequest},
};
use tracing::debug;

/// A fluent builder for the payload sent to the imputation and simulation service.
///
/// Rows are coerced to typed records as they are added. A cell that does not
/// parse as a number in a numeric column is sent as absent, so one malformed
/// value never blocks a run.
#[derive(Default)]
pub struct SimulationRequestBuilder {
    metadata: Option<ProjectMetadata>,
    records: Vec<MaterialRecord>,
    company_defaults: Option<CompanyDefaults>,
}

impl SimulationRequestBuilder {
    /// Creates a new, empty `SimulationRequestBuilder`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the project metadata. The request keeps its own copy.
    pub fn with_metadata(mut self, metadata: ProjectMetadata) -> Self {
        self.metadata = Some(metadata);
        self
    }

    /// Sets the inventory rows, in table order.
    pub fn with_rows(mut self, rows: &RowSet) -> Self {
        self.records = rows.iter().map(coerce_row).collect();
        self
    }

    /// Sets the company defaults as currently stored. They are forwarded only
    /// when explicitly marked as custom.
    pub fn with_company_defaults(mut self, defaults: Option<&CompanyDefaults>) -> Self {
        self.company_defaults = defaults.filter(|d| d.has_overrides()).cloned();
        self
    }

    /// Consumes the builder and returns the request payload.
    ///
    /// # Errors
    ///
    /// Returns a `PipelineError` if no metadata or no rows have been provided.
    pub fn build(self) -> Result<ServiceRequest, PipelineError> {
        let project_metadata = self.metadata.ok_or(PipelineError::MetadataNotDefined)?;
        if self.records.is_empty() {
            return Err(PipelineError::NoRowsProvided);
        }
        Ok(ServiceRequest {
            project_metadata,
            data: self.records,
            custom_defaults: self.company_defaults,
        })
    }
}

/// Converts one table row to its typed wire form.
pub fn coerce_row(row: &Row) -> MaterialRecord {
    let mut record = MaterialRecord::default();
    for (field, cell) in row.cells() {
        if field.is_numeric() {
            record.set_number(field, coerce_number(row, field, cell));
        } else {
            record.set_text(field, cell.as_str().map(str::to_string));
        }
    }
    record
}

fn coerce_number(row: &Row, field: Field, cell: &Cell) -> Option<f64> {
    let text = cell.as_str()?;
    match text.trim().parse::<f64>() {
        Ok(n) if n.is_finite() => Some(n),
        _ => {
            debug!(row = %row.id, field = %field, value = text, "sending non-numeric value as absent");
            None
        }
    }
}
