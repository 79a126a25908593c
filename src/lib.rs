pub mod error;
pub mod geo;
pub mod io;
pub mod terrain;
pub mod physics;
pub mod coverage;
pub mod render;
pub mod cache;

pub use error::{CoverageError, Result};
