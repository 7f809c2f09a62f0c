pub mod correlator;
pub mod temporal;
pub mod trajectory;
