#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeZone, Utc};
use floorwatch::*;

pub struct TestHarness {
    pub dashboard: Dashboard,
    pub remote: ChannelRemote,
    pub clock: Arc<ManualClock>,
}

impl TestHarness {
    /// Default three-station fleet, in-memory transport, and a seeded
    /// simulation whose cadence is too slow to tick during a test.
    pub fn new() -> Self {
        Self::with_interval(3_600_000)
    }

    /// Same fleet, with the simulation ticking every `interval_ms`.
    pub fn with_interval(interval_ms: u64) -> Self {
        let mut settings = Settings::default();
        settings.simulation.seed = Some(1234);
        settings.simulation.interval_ms = interval_ms;
        Self::with_settings(settings)
    }

    pub fn with_settings(settings: Settings) -> Self {
        let clock = Arc::new(ManualClock::new(Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap()));
        let (transport, remote) = ChannelTransport::create();
        let dashboard = Dashboard::with_parts(&settings, Arc::new(transport), clock.clone()).unwrap();
        Self {
            dashboard,
            remote,
            clock,
        }
    }

    pub fn registry(&self) -> &MachineRegistry {
        self.dashboard.registry()
    }

    pub fn machine(&self, id: &str) -> Machine {
        self.registry().get(id).unwrap()
    }

    /// Connect and return the remote end once the link is up.
    pub async fn go_live(&mut self) -> ChannelPeer {
        assert!(self.dashboard.connect());
        let peer = self.remote.accept().await.unwrap();
        self.wait_for_state(ConnectionState::Connected).await;
        peer
    }

    pub async fn wait_for_state(&self, want: ConnectionState) {
        let mut rx = self.dashboard.ingestor().subscribe_state();
        tokio::time::timeout(Duration::from_secs(1), rx.wait_for(|s| *s == want))
            .await
            .expect("connection state change timed out")
            .unwrap();
    }

    /// Wait until the ingestor has accepted `n` payloads in total.
    pub async fn wait_for_accepted(&self, n: u64) {
        for _ in 0..200 {
            if self.dashboard.ingest_counters().accepted >= n {
                return;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        panic!("ingestor accepted {} payloads, expected {}", self.dashboard.ingest_counters().accepted, n);
    }
}
