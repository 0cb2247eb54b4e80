//! # mp-core
//!
//! Shared foundation for the monophoton workspace: the error type, the
//! per-event data model and the traits that sit on the external data
//! boundaries (event sources and reduced-record sinks).

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod traits;
pub mod types;

pub use error::{Error, Result};
pub use traits::{EventSource, RecordSink, VecSink, VecSource};
pub use types::{Event, MissingEnergy, Photon, PhotonClass, ReducedRecord};
