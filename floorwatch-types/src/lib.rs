//! # floorwatch-types
//!
//! Core types for factory-floor telemetry. This crate defines the schema shared
//! by the floorwatch engine, the live telemetry feed that pushes updates into
//! it, and anything that consumes its exports.
//!
//! ## Design Goals
//!
//! - **Plain data**: No runtime, no I/O, just the entities and their rules
//! - **Optional serialization**: Enable the `serde` feature for the JSON wire format
//! - **Closed station kinds**: [`MachineKind`] is a closed set, so lookups keyed
//!   by kind are data, not control flow
//!
//! ## Features
//!
//! - `serde`: JSON (and any other serde format) support, with the camelCase
//!   field names used on the wire (`lastUpdate`, `machineId`, ...)
//!
//! ## Example
//!
//! ```rust
//! use floorwatch_types::{Machine, MachineKind, MachinePatch, Status, Thresholds};
//!
//! let machine = Machine::new("M-B", "CNC Machine B", MachineKind::Cnc, 72.0);
//! assert_eq!(machine.status, Status::Ok);
//!
//! let patch = MachinePatch::new("M-B").temp(101.0);
//! assert_eq!(Thresholds::default().classify(patch.temp.unwrap()), Status::Alarm);
//! ```

mod command;
mod machine;
mod patch;
mod thresholds;

#[cfg(feature = "serde")]
pub mod timestamp;

pub use command::OutboundCommand;
pub use machine::{Machine, MachineKind, ParseKindError, ParseStatusError, Placement, Status};
pub use patch::MachinePatch;
pub use thresholds::Thresholds;

/// Re-exported so consumers name the same timestamp type.
pub use chrono::{DateTime, Utc};
