//! The dashboard - wires every component together behind one handle.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Result};
use floorwatch_types::Machine;
use tracing::info;

use crate::clock::{Clock, SystemClock};
use crate::config::Settings;
use crate::console::{Intent, HELP};
use crate::dispatch::CommandDispatcher;
use crate::error::ExportError;
use crate::export::{ExportArtifact, SnapshotExporter};
use crate::registry::MachineRegistry;
use crate::simulation::SimulationEngine;
use crate::stats::{aggregate, FleetStats};
use crate::telemetry::{ConnectionState, IngestCounters, TelemetryIngestor, Transport, WebSocketTransport};
use crate::uptime::UptimeTracker;

/// Which writer currently owns the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Synthetic readings.
    Simulation,
    /// Readings from the live link.
    Live,
}

impl Mode {
    pub fn label(&self) -> &'static str {
        match self {
            Mode::Simulation => "SIMULATION",
            Mode::Live => "LIVE",
        }
    }
}

/// Main engine state.
#[derive(Debug)]
pub struct Dashboard {
    pub running: bool,

    endpoint: String,
    registry: MachineRegistry,
    simulation: SimulationEngine,
    ingestor: TelemetryIngestor,
    dispatcher: CommandDispatcher,
    uptime: Arc<UptimeTracker>,
    exporter: SnapshotExporter,
}

impl Dashboard {
    /// Build the engine with the WebSocket transport and the system clock.
    ///
    /// Must be called from within a tokio runtime; the simulation starts
    /// immediately.
    pub fn new(settings: &Settings) -> Result<Self> {
        Self::with_parts(settings, Arc::new(WebSocketTransport), SystemClock::shared())
    }

    /// Build the engine on a given transport and clock.
    pub fn with_parts(settings: &Settings, transport: Arc<dyn Transport>, clock: Arc<dyn Clock>) -> Result<Self> {
        settings.validate()?;

        let registry = MachineRegistry::new(settings.fleet(clock.now()), settings.thresholds, clock.clone())?;
        let simulation = SimulationEngine::spawn(
            registry.clone(),
            settings.simulation.clone(),
            settings.simulation.rng(),
        );
        let ingestor = TelemetryIngestor::new(registry.clone(), simulation.clone(), transport);
        let dispatcher = CommandDispatcher::new(ingestor.clone(), clock.clone());
        let uptime = Arc::new(UptimeTracker::spawn(clock.clone(), settings.uptime_interval()));
        let exporter = SnapshotExporter::new(registry.clone(), uptime.clone(), clock);

        info!(
            machines = registry.len(),
            endpoint = %settings.endpoint,
            seed = ?settings.simulation.seed,
            "dashboard ready"
        );

        Ok(Self {
            running: true,
            endpoint: settings.endpoint.clone(),
            registry,
            simulation,
            ingestor,
            dispatcher,
            uptime,
            exporter,
        })
    }

    pub fn snapshot(&self) -> Vec<Machine> {
        self.registry.snapshot()
    }

    pub fn stats(&self) -> FleetStats {
        aggregate(&self.registry.snapshot())
    }

    pub fn mode(&self) -> Mode {
        match self.ingestor.state() {
            ConnectionState::Connected => Mode::Live,
            ConnectionState::Connecting | ConnectionState::Disconnected => Mode::Simulation,
        }
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.ingestor.state()
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Change the endpoint used by the next [`connect`](Self::connect).
    ///
    /// An open link is left alone.
    pub fn set_endpoint(&mut self, endpoint: &str) -> Result<()> {
        let endpoint = endpoint.trim();
        if endpoint.is_empty() {
            bail!("endpoint must not be empty");
        }
        self.endpoint = endpoint.to_string();
        info!(endpoint, "endpoint changed");
        Ok(())
    }

    /// Open the live link. Returns false if a link is already open or pending.
    pub fn connect(&self) -> bool {
        self.ingestor.connect(&self.endpoint)
    }

    /// Drop the live link. Returns false if there was none.
    pub fn disconnect(&self) -> bool {
        self.ingestor.disconnect()
    }

    /// Send a command. A silent no-op unless connected.
    pub fn dispatch(&self, command: &str, machine_id: Option<&str>) -> bool {
        self.dispatcher.dispatch(command, machine_id)
    }

    pub fn export(&self) -> ExportArtifact {
        self.exporter.export()
    }

    /// Capture an export and write it into `dir`.
    pub fn export_to_dir(&self, dir: &Path) -> Result<PathBuf, ExportError> {
        self.exporter.export().write_to_dir(dir)
    }

    pub fn uptime(&self) -> &UptimeTracker {
        &self.uptime
    }

    pub fn registry(&self) -> &MachineRegistry {
        &self.registry
    }

    pub fn simulation(&self) -> &SimulationEngine {
        &self.simulation
    }

    pub fn ingestor(&self) -> &TelemetryIngestor {
        &self.ingestor
    }

    pub fn ingest_counters(&self) -> IngestCounters {
        self.ingestor.counters()
    }

    /// One-line summary for the status display.
    pub fn status_line(&self) -> String {
        let stats = self.stats();
        format!(
            "[{}] link={} endpoint={} machines={} ok={} warn={} alarm={} avg={:.1}°C uptime={}",
            self.mode().label(),
            self.connection_state(),
            self.endpoint,
            stats.total,
            stats.online,
            stats.warning,
            stats.alarm,
            stats.avg_temp,
            self.uptime.formatted(),
        )
    }

    /// Carry out an operator intent and return feedback for the operator.
    pub fn apply(&mut self, intent: Intent) -> String {
        match intent {
            Intent::Connect => {
                if self.connect() {
                    format!("connecting to {}", self.endpoint)
                } else {
                    format!("link already {}", self.connection_state())
                }
            }
            Intent::Disconnect => {
                if self.disconnect() {
                    "disconnected, simulation resumed".to_string()
                } else {
                    "not connected".to_string()
                }
            }
            Intent::SetEndpoint(url) => match self.set_endpoint(&url) {
                Ok(()) => format!("endpoint set to {}", self.endpoint),
                Err(e) => e.to_string(),
            },
            Intent::Command { name, machine_id } => {
                if self.dispatch(&name, machine_id.as_deref()) {
                    format!("sent {}", name)
                } else {
                    format!("not connected, {} dropped", name)
                }
            }
            Intent::Export(dir) => {
                let dir = dir.unwrap_or_else(|| PathBuf::from("."));
                match self.export_to_dir(&dir) {
                    Ok(path) => format!("exported to {}", path.display()),
                    Err(e) => e.to_string(),
                }
            }
            Intent::Status => self.status_line(),
            Intent::Help => HELP.to_string(),
            Intent::Quit => {
                self.running = false;
                "shutting down".to_string()
            }
        }
    }

    /// Close any open link and stop the simulation.
    pub async fn shutdown(&self) {
        self.ingestor.shutdown().await;
        self.simulation.deactivate();
        info!(uptime = %self.uptime.formatted(), "dashboard stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::telemetry::ChannelTransport;
    use std::time::Duration;

    fn dashboard() -> (Dashboard, crate::telemetry::ChannelRemote) {
        let mut settings = Settings::default();
        settings.simulation.seed = Some(11);
        let (transport, remote) = ChannelTransport::create();
        let dashboard = Dashboard::with_parts(&settings, Arc::new(transport), SystemClock::shared()).unwrap();
        (dashboard, remote)
    }

    #[tokio::test]
    async fn test_starts_in_simulation() {
        let (dashboard, _remote) = dashboard();
        assert_eq!(dashboard.mode(), Mode::Simulation);
        assert_eq!(dashboard.connection_state(), ConnectionState::Disconnected);
        assert!(dashboard.simulation().is_active());
        assert_eq!(dashboard.stats().total, 3);
        assert!(dashboard.status_line().starts_with("[SIMULATION] link=disconnected"));
    }

    #[tokio::test]
    async fn test_rejects_invalid_settings() {
        let mut settings = Settings::default();
        settings.thresholds.warn_above = 100.0;
        let (transport, _remote) = ChannelTransport::create();
        assert!(Dashboard::with_parts(&settings, Arc::new(transport), SystemClock::shared()).is_err());
    }

    #[tokio::test]
    async fn test_apply_connect_and_disconnect() {
        let (mut dashboard, mut remote) = dashboard();
        dashboard.apply(Intent::SetEndpoint("mem://line-2".to_string()));
        assert_eq!(dashboard.endpoint(), "mem://line-2");

        assert_eq!(dashboard.apply(Intent::Connect), "connecting to mem://line-2");
        let peer = remote.accept().await.unwrap();
        assert_eq!(peer.endpoint(), "mem://line-2");

        let mut state = dashboard.ingestor().subscribe_state();
        tokio::time::timeout(Duration::from_secs(1), state.wait_for(|s| *s == ConnectionState::Connected))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(dashboard.mode(), Mode::Live);
        assert!(!dashboard.simulation().is_active());

        assert_eq!(dashboard.apply(Intent::Disconnect), "disconnected, simulation resumed");
        assert_eq!(dashboard.mode(), Mode::Simulation);
        assert!(dashboard.simulation().is_active());
        assert_eq!(dashboard.apply(Intent::Disconnect), "not connected");
    }

    #[tokio::test]
    async fn test_apply_command_while_disconnected() {
        let (mut dashboard, _remote) = dashboard();
        let reply = dashboard.apply(Intent::Command {
            name: "emergency_stop".to_string(),
            machine_id: None,
        });
        assert_eq!(reply, "not connected, emergency_stop dropped");
    }

    #[tokio::test]
    async fn test_apply_export_and_quit() {
        let (mut dashboard, _remote) = dashboard();
        let dir = tempfile::tempdir().unwrap();

        let reply = dashboard.apply(Intent::Export(Some(dir.path().to_path_buf())));
        assert!(reply.starts_with("exported to "));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);

        assert!(dashboard.running);
        dashboard.apply(Intent::Quit);
        assert!(!dashboard.running);

        dashboard.shutdown().await;
        assert!(!dashboard.simulation().is_active());
    }

    #[tokio::test]
    async fn test_empty_endpoint_is_refused() {
        let (mut dashboard, _remote) = dashboard();
        assert!(dashboard.set_endpoint("   ").is_err());
        assert_eq!(dashboard.endpoint(), "ws://localhost:1880/ws/factory");
    }
}
