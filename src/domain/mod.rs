pub mod geometry;
pub mod types;

pub use types::*;
