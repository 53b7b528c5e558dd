pub mod floor;
pub mod loader;

pub use floor::*;
pub use loader::*;
