pub mod defaults;
pub mod field;
pub mod metrics;
pub mod project;
pub mod row;
pub mod wire;
