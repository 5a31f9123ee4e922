//! Domain types.
//!
//! Validated identifier newtypes and the display-ready records they key.
//! Upstream feeds mix integer and string forms of the same identifiers,
//! so both id types canonicalize to a string of digits at construction.

mod departure;
mod stop;
mod vehicle;

pub use departure::Departure;
pub use stop::{InvalidStopId, StopId, StopRecord, TransportKind};
pub use vehicle::{InvalidVehicleCode, VehicleCode, VehicleRecord};
