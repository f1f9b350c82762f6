pub mod defaults_store;
pub mod error;
pub mod ingest;
pub mod logger;
pub mod merge;
pub mod metrics;
pub mod missingness;
pub mod pipeline;
pub mod service;
