//! Contract the syncer core imposes on external "buffered collector"
//! adapters (`spec.md` §4.3, component C4).
//!
//! Only the contract is defined here; OS sensor registration, threading and
//! actual callback wiring are explicitly out of scope (`spec.md` §1) and
//! live with whatever embeds this crate. Tests and the demo binaries in
//! `src/bin/` implement these traits over plain in-memory vectors.

use crate::measurement::Measurement;

/// The primary stream's adapter. Only the primary exposes
/// `drain_up_to_position`, since it alone drives the position-indexed
/// "measurement arrived" callback (`spec.md` §4.4.3).
pub trait PrimaryAdapter<M: Measurement> {
    /// Begin producing measurements seeded from `start_timestamp`. Returns
    /// `false` on failure (`spec.md` §4.4.1 / §7's `AdapterStartFailed`).
    fn start(&mut self, start_timestamp: i64) -> bool;

    fn stop(&mut self);

    /// Return all newly buffered measurements up to and including
    /// `position`, FIFO ordered, transferring ownership.
    fn drain_up_to_position(&mut self, position: usize) -> Vec<M>;

    /// Fraction of the adapter's own internal buffer in use, if it tracks
    /// one. `None` for adapters with no such notion (`spec.md` §6's
    /// `collector_usage`).
    fn collector_usage(&self) -> Option<f64> {
        None
    }
}

/// A secondary stream's adapter.
pub trait SecondaryAdapter<M: Measurement> {
    fn start(&mut self, start_timestamp: i64) -> bool;

    fn stop(&mut self);

    /// Return all buffered measurements with `timestamp <= timestamp`, FIFO
    /// ordered (`spec.md` §4.4.4).
    fn drain_before(&mut self, timestamp: i64) -> Vec<M>;

    fn collector_usage(&self) -> Option<f64> {
        None
    }
}
