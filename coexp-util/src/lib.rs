pub mod bitvec;
pub mod common_io;
pub mod dataset_order;
pub mod errors;
pub mod stats;
