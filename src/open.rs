pub mod enricher;
pub mod policy;
pub mod schedule;
