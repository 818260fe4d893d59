//! # floorwatch
//!
//! A telemetry state engine for factory-floor dashboards.
//!
//! floorwatch keeps one canonical, ordered collection of machine states and
//! feeds it from exactly one of two writers: a seeded simulation that
//! produces plausible synthetic readings, or a live push feed over a
//! WebSocket. Renderers pull snapshots and summary statistics; operators
//! send commands back over the live link and export point-in-time JSON.
//!
//! ## Architecture
//!
//! ```text
//!                 snapshot
//!   registry ─────────────────▶ stats, uptime, export
//!      ▲   ▲
//!      │   │ merge (only one writer at a time)
//!      │   └───────────────────┐
//!  simulation ◀── on/off ── telemetry ingestor ◀── dispatch
//!                                  │
//!                    Transport: WebSocket | Channel
//!                                  │
//!                                  ▼
//!                            external feed
//! ```
//!
//! - **[`registry`]**: the machine collection; atomic batch merges and snapshots
//! - **[`simulation`]**: seeded synthetic readings on a fixed cadence
//! - **[`telemetry`]**: the live link, its state machine and wire decoding
//! - **[`stats`]**, **[`uptime`]**, **[`export`]**: read-side views
//! - **[`dispatch`]**: operator commands over the live link
//! - **[`dashboard`]**: wires everything from [`Settings`]
//!
//! Entering live mode deactivates the simulation; leaving it for any reason
//! re-arms it. Exactly one writer is active at any time.
//!
//! ## Usage
//!
//! ### As a CLI tool
//!
//! ```bash
//! # Simulation only, reproducible
//! floorwatch --seed 42
//!
//! # Connect to a Node-RED flow on start, export on exit
//! floorwatch --endpoint ws://localhost:1880/ws/factory --connect --export-dir .
//! ```
//!
//! ### As a library
//!
//! ```no_run
//! use floorwatch::{Dashboard, Settings};
//!
//! # tokio_test::block_on(async {
//! let dashboard = Dashboard::new(&Settings::default()).unwrap();
//! println!("{}", dashboard.status_line());
//! dashboard.connect();
//! # });
//! ```
//!
//! ### With an in-memory feed
//!
//! ```
//! use std::sync::Arc;
//! use floorwatch::{ChannelTransport, Dashboard, SystemClock, Settings};
//!
//! # tokio_test::block_on(async {
//! let (transport, mut remote) = ChannelTransport::create();
//! let dashboard = Dashboard::with_parts(
//!     &Settings::default(),
//!     Arc::new(transport),
//!     SystemClock::shared(),
//! ).unwrap();
//!
//! dashboard.connect();
//! let peer = remote.accept().await.unwrap();
//! peer.send(r#"{"id": "M-B", "temp": 101}"#);
//! # });
//! ```

pub mod clock;
pub mod config;
pub mod console;
pub mod dashboard;
pub mod dispatch;
pub mod error;
pub mod export;
pub mod registry;
pub mod simulation;
pub mod stats;
pub mod telemetry;
pub mod uptime;

pub use clock::{Clock, ManualClock, SystemClock};
pub use crate::config::{MachineSeed, Settings};
pub use console::{parse_intent, Intent};
pub use dashboard::{Dashboard, Mode};
pub use dispatch::CommandDispatcher;
pub use error::{ConsoleError, ExportError, RegistryError, TelemetryError};
pub use export::{ExportArtifact, SnapshotExporter};
pub use registry::{MachineRegistry, MergeReport};
pub use simulation::{SimulationConfig, SimulationEngine, SimulationState};
pub use stats::{aggregate, FleetStats};
pub use telemetry::{
    ChannelPeer, ChannelRemote, ChannelTransport, ConnectionState, InboundMessage, TelemetryIngestor,
    Transport, WebSocketTransport,
};
pub use uptime::UptimeTracker;

pub use floorwatch_types::{Machine, MachineKind, MachinePatch, OutboundCommand, Status, Thresholds};
