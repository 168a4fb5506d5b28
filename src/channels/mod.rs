//! Messaging transport abstraction.

pub mod snapshot;
pub mod transport;

pub use snapshot::{Snapshot, SnapshotTransport, TransportAction};
pub use transport::*;
