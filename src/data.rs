pub mod bar;
pub mod calendar;
pub mod contract;
pub mod cot;
pub mod domain;
pub mod series;
pub mod settlement;
