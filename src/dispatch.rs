//! Operator commands sent over the live link.
//!
//! Commands are conveniences, not durable requests. While the link is not
//! `Connected` a dispatch does nothing: it is not queued, retried, or
//! reported as an error.

use std::sync::Arc;

use floorwatch_types::OutboundCommand;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::telemetry::{ConnectionState, TelemetryIngestor};

/// Sends [`OutboundCommand`]s through the ingestor's link.
#[derive(Debug, Clone)]
pub struct CommandDispatcher {
    ingestor: TelemetryIngestor,
    clock: Arc<dyn Clock>,
}

impl CommandDispatcher {
    pub fn new(ingestor: TelemetryIngestor, clock: Arc<dyn Clock>) -> Self {
        Self { ingestor, clock }
    }

    /// Send `command` for `machine_id` (or the whole fleet when `None`).
    ///
    /// Returns true if the command was handed to the link.
    pub fn dispatch(&self, command: &str, machine_id: Option<&str>) -> bool {
        let state = self.ingestor.state();
        if state != ConnectionState::Connected {
            debug!(command, ?machine_id, %state, "not connected, command dropped");
            return false;
        }

        let outbound = OutboundCommand::new(command, machine_id.map(str::to_string), self.clock.now());
        let payload = match serde_json::to_string(&outbound) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(error = %e, "failed to encode command");
                return false;
            }
        };

        let sent = self.ingestor.send_outbound(payload);
        if sent {
            info!(command, ?machine_id, "command sent");
        }
        sent
    }
}
