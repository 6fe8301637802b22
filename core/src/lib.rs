//! Telemetry extraction and routing-topology reconstruction for Cooja
//! wireless sensor network experiments.
//!
//! The power side turns PowerTracker logs into per-cycle records; the
//! topology side turns RPL relationship logs and mote positions into a
//! colored DODAG that an external renderer can draw.

pub mod capture;
pub mod powertracker;
pub mod prelude;
pub mod telemetry;
pub mod topology;

pub use prelude::{CoreError, CoreResult, MoteId};
