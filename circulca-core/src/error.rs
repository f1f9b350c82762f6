use thiserror::Error;

#[derive(Debug, Error)]
pub enum IngestError {
    #[error("Input needs a header line and at least one data line")]
    EmptyInput,

    #[error("Line {line} has {observed} columns, expected {expected}")]
    SchemaMismatch {
        line: u64,
        expected: usize,
        observed: usize,
    },

    #[error("Column '{0}' maps to a field that is already present")]
    DuplicateColumn(String),

    #[error("Failed to process CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("I/O error for file '{0}': {1}")]
    FileIO(String, #[source] std::io::Error),
}

#[derive(Debug, Error)]
pub enum MergeError {
    #[error("Imputed data has {imputed} rows but the table has {original}")]
    Alignment { original: usize, imputed: usize },
}

#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("Simulation response has no scenario results")]
    NoScenarioResults,

    #[error("Simulation response has no {0} scenario")]
    MissingScenario(&'static str),
}

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error("Request to {0} failed: {1}")]
    Transport(String, #[source] reqwest::Error),

    #[error("Service returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to decode service response: {0}")]
    Decode(String),
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Project metadata is missing")]
    MetadataNotDefined,

    #[error("At least one row must be provided for the simulation")]
    NoRowsProvided,

    #[error("A {0} run is already in flight")]
    RunInFlight(&'static str),

    #[error("No simulation results are available yet")]
    NoResults,

    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error(transparent)]
    Merge(#[from] MergeError),

    #[error(transparent)]
    Metrics(#[from] MetricsError),

    #[error(transparent)]
    Service(#[from] ServiceError),

    #[error("I/O error for file '{0}': {1}")]
    FileIO(String, #[source] std::io::Error),

    #[error("Failed to parse YAML from '{0}': {1}")]
    YamlParsing(String, #[source] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParsing(#[from] serde_json::Error),

    #[error("Failed to write run log '{0}': {1}")]
    RunLog(String, #[source] csv::Error),
}
