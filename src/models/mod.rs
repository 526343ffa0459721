pub mod config;
pub mod observation;
pub mod roi;
