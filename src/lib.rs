pub mod config;
pub mod data;
pub mod error;
pub mod io;
pub mod math;
pub mod open;
pub mod pipeline;
pub mod prelude;
pub mod report;
pub mod settlement;
pub mod signal;
