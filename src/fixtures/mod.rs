pub mod data_generator;

pub use data_generator::*;
