pub mod contracts;
pub mod enriched;
pub mod io;
pub mod polars_ext;
pub mod settlement;
pub mod signal;
