//! The telemetry ingestor - owns the live link and its state machine.
//!
//! ```text
//! Disconnected --connect--> Connecting --open--> Connected
//!      ^                        |                    |
//!      +------ error/close -----+---- error/close ---+
//! ```
//!
//! Entering `Connected` deactivates the simulation engine; entering
//! `Disconnected` for any reason re-arms it. Both happen under the ingestor
//! lock, so the two writers never overlap.
//!
//! Each `connect` starts a new epoch. The link task tags every event with the
//! epoch it was started under, and events from a superseded epoch are
//! dropped, so a late close from an old connection cannot tear down a new one.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::message::InboundMessage;
use super::transport::{Link, Transport};
use crate::registry::MachineRegistry;
use crate::simulation::SimulationEngine;

/// How long `shutdown` waits for a link task before aborting it.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(2);

/// Connection state of the live link.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Connected => "connected",
        }
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Running totals for the live feed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestCounters {
    /// Payloads that decoded and were merged.
    pub accepted: u64,
    /// Payloads (or batch entries) that failed to decode.
    pub discarded: u64,
    /// Machine updates applied to the registry.
    pub applied: u64,
    /// Patch items naming a machine that does not exist.
    pub unknown: u64,
}

/// Handle to the live telemetry link.
///
/// Cloning gives another handle to the same ingestor.
#[derive(Debug, Clone)]
pub struct TelemetryIngestor {
    shared: Arc<Shared>,
}

#[derive(Debug)]
struct Shared {
    registry: MachineRegistry,
    simulation: SimulationEngine,
    transport: Arc<dyn Transport>,
    state_tx: watch::Sender<ConnectionState>,
    link: Mutex<LinkState>,
}

#[derive(Debug, Default)]
struct LinkState {
    state: ConnectionState,
    epoch: u64,
    endpoint: Option<String>,
    outbound: Option<mpsc::UnboundedSender<String>>,
    stop: Option<watch::Sender<bool>>,
    tasks: Vec<JoinHandle<()>>,
    counters: IngestCounters,
}

impl TelemetryIngestor {
    /// Create a disconnected ingestor.
    pub fn new(
        registry: MachineRegistry,
        simulation: SimulationEngine,
        transport: Arc<dyn Transport>,
    ) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            shared: Arc::new(Shared {
                registry,
                simulation,
                transport,
                state_tx,
                link: Mutex::new(LinkState::default()),
            }),
        }
    }

    /// Start connecting to `endpoint`.
    ///
    /// Only valid from `Disconnected`; otherwise nothing happens and this
    /// returns false. The outcome is observed through [`state`](Self::state).
    /// Must be called from within a tokio runtime.
    pub fn connect(&self, endpoint: &str) -> bool {
        let mut link = self.shared.link.lock();
        if link.state != ConnectionState::Disconnected {
            debug!(state = %link.state, "connect ignored");
            return false;
        }

        link.epoch += 1;
        let epoch = link.epoch;
        link.endpoint = Some(endpoint.to_string());
        link.tasks.retain(|task| !task.is_finished());

        let (stop_tx, stop_rx) = watch::channel(false);
        link.stop = Some(stop_tx);
        let task = tokio::spawn(run_link(self.shared.clone(), epoch, endpoint.to_string(), stop_rx));
        link.tasks.push(task);

        self.shared.set_state(&mut link, ConnectionState::Connecting);
        info!(endpoint, "connecting");
        true
    }

    /// Drop the current link, if any, and return to simulation.
    ///
    /// Returns false if already disconnected. Once this returns, no message
    /// from the old link can reach the registry.
    pub fn disconnect(&self) -> bool {
        let mut link = self.shared.link.lock();
        if link.state == ConnectionState::Disconnected {
            return false;
        }

        link.epoch += 1;
        link.outbound = None;
        if let Some(stop) = link.stop.take() {
            let _ = stop.send(true);
        }
        self.shared.enter_disconnected(&mut link);
        info!("disconnected by request");
        true
    }

    /// Disconnect and wait for link tasks to finish closing.
    pub async fn shutdown(&self) {
        self.disconnect();

        let tasks = std::mem::take(&mut self.shared.link.lock().tasks);
        for mut task in tasks {
            if tokio::time::timeout(SHUTDOWN_GRACE, &mut task).await.is_err() {
                warn!("link task did not close in time, aborting");
                task.abort();
            }
        }
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        self.shared.link.lock().state
    }

    /// Watch connection state changes.
    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state_tx.subscribe()
    }

    /// Endpoint of the current or pending link.
    pub fn endpoint(&self) -> Option<String> {
        self.shared.link.lock().endpoint.clone()
    }

    /// Queue a text payload for the remote end.
    ///
    /// Returns false, sending nothing, unless the link is `Connected`.
    pub fn send_outbound(&self, payload: String) -> bool {
        let link = self.shared.link.lock();
        if link.state != ConnectionState::Connected {
            return false;
        }
        link.outbound
            .as_ref()
            .is_some_and(|tx| tx.send(payload).is_ok())
    }

    /// Totals since the ingestor was created.
    pub fn counters(&self) -> IngestCounters {
        self.shared.link.lock().counters
    }
}

impl Shared {
    fn set_state(&self, link: &mut LinkState, state: ConnectionState) {
        link.state = state;
        self.state_tx.send_replace(state);
    }

    fn enter_disconnected(&self, link: &mut LinkState) {
        link.endpoint = None;
        self.simulation.activate();
        self.set_state(link, ConnectionState::Disconnected);
    }

    /// Returns false if the epoch is stale and the link should be dropped.
    fn on_open(&self, epoch: u64, outbound: mpsc::UnboundedSender<String>) -> bool {
        let mut link = self.link.lock();
        if link.epoch != epoch {
            return false;
        }

        link.outbound = Some(outbound);
        self.simulation.deactivate();
        self.set_state(&mut link, ConnectionState::Connected);
        info!(endpoint = ?link.endpoint, "connected, live telemetry active");
        true
    }

    fn on_closed(&self, epoch: u64) {
        let mut link = self.link.lock();
        if link.epoch != epoch || link.state == ConnectionState::Disconnected {
            return;
        }

        link.outbound = None;
        link.stop = None;
        self.enter_disconnected(&mut link);
        info!("link closed, simulation resumed");
    }

    fn on_message(&self, epoch: u64, raw: &str) {
        let mut link = self.link.lock();
        if link.epoch != epoch || link.state != ConnectionState::Connected {
            return;
        }

        let message = match InboundMessage::parse(raw) {
            Ok(message) => message,
            Err(e) => {
                link.counters.discarded += 1;
                warn!(error = %e, "discarding telemetry payload");
                return;
            }
        };

        let malformed = message.malformed_count();
        if malformed > 0 {
            warn!(malformed, "skipping malformed batch entries");
        }

        let report = self.registry.merge_batch(&message.patches());
        link.counters.accepted += 1;
        link.counters.discarded += malformed as u64;
        link.counters.applied += report.applied.len() as u64;
        link.counters.unknown += report.unknown.len() as u64;
        debug!(
            applied = report.applied_count(),
            unknown = report.unknown.len(),
            rejected = report.rejected.len(),
            "telemetry merged"
        );
    }
}

async fn stopped(stop: &mut watch::Receiver<bool>) {
    // A dropped sender counts as a stop
    let _ = stop.wait_for(|stopped| *stopped).await;
}

async fn run_link(shared: Arc<Shared>, epoch: u64, endpoint: String, mut stop: watch::Receiver<bool>) {
    let opened = tokio::select! {
        biased;
        _ = stopped(&mut stop) => {
            debug!(endpoint = %endpoint, "connect cancelled");
            return;
        }
        opened = shared.transport.open(&endpoint) => opened,
    };

    let mut link = match opened {
        Ok(link) => link,
        Err(e) => {
            warn!(error = %e, "connection failed");
            shared.on_closed(epoch);
            return;
        }
    };

    let (out_tx, mut out_rx) = mpsc::unbounded_channel();
    if !shared.on_open(epoch, out_tx) {
        link.close().await;
        return;
    }

    pump(&shared, epoch, link.as_mut(), &mut out_rx, &mut stop).await;
    shared.on_closed(epoch);
}

async fn pump(
    shared: &Shared,
    epoch: u64,
    link: &mut dyn Link,
    outbound: &mut mpsc::UnboundedReceiver<String>,
    stop: &mut watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            biased;
            _ = stopped(stop) => {
                link.close().await;
                return;
            }
            Some(payload) = outbound.recv() => {
                if let Err(e) = link.send(payload).await {
                    warn!(error = %e, "send failed, dropping link");
                    return;
                }
            }
            incoming = link.recv() => match incoming {
                Some(Ok(raw)) => shared.on_message(epoch, &raw),
                Some(Err(e)) => {
                    warn!(error = %e, "link error");
                    return;
                }
                None => {
                    debug!("link closed by remote");
                    return;
                }
            },
        }
    }
}
