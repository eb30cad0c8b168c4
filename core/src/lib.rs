//! Versioned, multi-slice profile snapshots.
//!
//! Builder reads live subsystems into a `SnapshotAggregate`, the store
//! persists it to a named, indexed slot, and the applier pushes a loaded
//! snapshot back into live subsystems. See `engine.rs` for the full flow.

pub mod applier;
pub mod builder;
pub mod clock;
pub mod codec;
pub mod config;
pub mod engine;
pub mod error;
pub mod slices;
pub mod snapshot;
pub mod store;
pub mod subsystem;
pub mod types;
