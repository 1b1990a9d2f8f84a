pub mod field;
pub mod grid;
pub mod config;
pub mod errors;

pub use field::*;
pub use grid::*;
pub use config::*;
pub use errors::*;
