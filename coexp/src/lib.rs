pub mod aggregate;
pub mod merge;
pub mod node_degree;
pub mod query;
pub mod records;
pub mod run_analyze;
pub mod run_trim;
pub mod sources;
pub mod trim;
