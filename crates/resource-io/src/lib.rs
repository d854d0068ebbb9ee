//! # Resource I/O
//!
//! Atomic on-disk writes (§4.8) and the startup change tracker (§4.9) that
//! sits above them. Every write the resource subsystem performs against a
//! file another process might be reading — manifests, baselines, sync
//! output — goes through [`safe_write`] rather than a bare
//! `std::fs::write`.

mod baseline;
mod safe_write;

pub use baseline::{ChangeReport, ChangeTracker};
pub use safe_write::{safe_write, transaction, TransactionStep};
