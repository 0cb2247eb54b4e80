//! # mp-hist
//!
//! Binned containers used by the selection pipeline: a 1-D histogram that
//! can be filled, merged across workers and read back with edge clamping,
//! and a 2-D lookup grid for correction tables.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod grid;
pub mod histogram;

pub use error::{HistError, Result};
pub use grid::Grid2D;
pub use histogram::{FlowPolicy, Histogram};
