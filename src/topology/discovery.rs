//! Topology discovery loop
//!
//! One cycle probes every configured host concurrently, attributes sync
//! replicas from the master's `synchronous_standby_names`, orders live
//! hosts by probe RTT and publishes fresh view snapshots. Cycles run on a
//! fixed cadence; a slow cycle delays the next tick but never drops it,
//! and a new cycle never starts before the previous one has published.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, Instrument};

use crate::config::DiscoveryConfig;
use crate::dsn::Dsn;
use crate::metrics::metrics;
use crate::probe::Connector;

use super::host::HostState;
use super::role::{DsnIndex, HostRole};
use super::views::{DsnIndicesByRole, PublishedViews};

/// Handle to a running topology discoverer.
///
/// Construction runs one full discovery cycle before returning, so the
/// published views are never observed in their pre-initialized state.
pub struct Topology {
    dsns: Arc<Vec<Dsn>>,
    views: Arc<PublishedViews>,
    shutdown: CancellationToken,
    worker: tokio::task::JoinHandle<()>,
}

impl Topology {
    /// Run the initial discovery cycle, then start the periodic worker.
    pub async fn start(
        config: &DiscoveryConfig,
        dsns: Vec<Dsn>,
        connector: Arc<dyn Connector>,
    ) -> Self {
        let dsns = Arc::new(dsns);
        let views = Arc::new(PublishedViews::new());

        let mut worker = DiscoveryWorker::new(
            dsns.as_ref().clone(),
            connector,
            views.clone(),
            config.check_timeout(),
            config.interval(),
        );
        worker.run_discovery().await;

        let shutdown = CancellationToken::new();
        let handle = tokio::spawn(
            worker
                .run(shutdown.clone())
                .instrument(tracing::info_span!("pg_topology")),
        );

        Self {
            dsns,
            views,
            shutdown,
            worker: handle,
        }
    }

    /// The configured DSN list. Stable for the discoverer's lifetime;
    /// published views refer to hosts by position in this list.
    pub fn dsn_list(&self) -> &[Dsn] {
        &self.dsns
    }

    /// Snapshot of alive host indices, ascending RTT.
    pub fn alive_indices(&self) -> Arc<Vec<DsnIndex>> {
        self.views.alive_by_rtt()
    }

    /// Snapshot of alive host indices bucketed by role.
    pub fn indices_by_role(&self) -> Arc<DsnIndicesByRole> {
        self.views.indices_by_role()
    }

    /// Stop the periodic worker, waiting for any in-flight cycle and for
    /// every probe connection to close.
    pub async fn stop(self) {
        self.shutdown.cancel();
        if let Err(e) = self.worker.await {
            if !e.is_cancelled() {
                error!(error = %e, "discovery worker panicked");
            }
        }
    }
}

pub(crate) struct DiscoveryWorker {
    connector: Arc<dyn Connector>,
    host_states: Vec<HostState>,
    views: Arc<PublishedViews>,
    check_timeout: Duration,
    interval: Duration,
}

impl DiscoveryWorker {
    pub(crate) fn new(
        dsns: Vec<Dsn>,
        connector: Arc<dyn Connector>,
        views: Arc<PublishedViews>,
        check_timeout: Duration,
        interval: Duration,
    ) -> Self {
        Self {
            connector,
            host_states: dsns.into_iter().map(HostState::new).collect(),
            views,
            check_timeout,
            interval,
        }
    }

    async fn run(mut self, shutdown: CancellationToken) {
        // The initial cycle already ran; the first tick fires one interval
        // from now. Delayed ticks are made up for, never dropped.
        let mut ticker = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Burst);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    self.run_discovery().await;
                }
            }
        }

        info!("discovery worker shutting down");
        for state in &mut self.host_states {
            state.close_connection().await;
        }
    }

    /// One full discovery cycle: probe, attribute, sort, publish.
    pub(crate) async fn run_discovery(&mut self) {
        let cycle_started = Instant::now();

        let check_timeout = self.check_timeout;
        let connector = Arc::clone(&self.connector);
        let checks = self
            .host_states
            .iter_mut()
            .map(|state| state.run_check(connector.as_ref(), check_timeout));
        join_all(checks).await;

        let mut alive: Vec<DsnIndex> = Vec::new();
        for (idx, state) in self.host_states.iter().enumerate() {
            debug!(
                host = %state.app_name,
                role = %state.role,
                rtt_us = state.rtt.map(|rtt| rtt.as_micros() as u64),
                "host probed"
            );
            if state.role != HostRole::None {
                alive.push(idx);
            }
        }

        // Alive hosts are masters or slaves at this point; only the master
        // record can carry sync standby names.
        let sync_names: Vec<String> = self
            .host_states
            .iter()
            .find(|state| state.role == HostRole::Master)
            .map(|master| master.detected_sync_slaves.clone())
            .unwrap_or_default();

        // O(alive × names), fine for the expected cluster sizes.
        for name in &sync_names {
            for &idx in &alive {
                let state = &mut self.host_states[idx];
                if state.role == HostRole::Slave && state.app_name.eq_ignore_ascii_case(name) {
                    debug!(host = %state.app_name, "promoted to sync slave");
                    state.role = HostRole::SyncSlave;
                }
            }
        }

        alive.sort_by_key(|&idx| self.host_states[idx].rtt.unwrap_or(Duration::MAX));

        let mut by_role = DsnIndicesByRole::default();
        for &idx in &alive {
            let state = &self.host_states[idx];
            by_role.push(state.role, idx);
            // A sync slave remains a valid target for slave reads.
            if state.role == HostRole::SyncSlave {
                by_role.push(HostRole::Slave, idx);
            }
        }

        self.record_metrics(cycle_started.elapsed(), &alive);
        self.views.publish(by_role, alive);
    }

    fn record_metrics(&self, cycle_duration: Duration, alive: &[DsnIndex]) {
        let mut masters = 0;
        let mut sync_slaves = 0;
        let mut slaves = 0;
        for state in &self.host_states {
            match state.role {
                HostRole::Master => masters += 1,
                HostRole::SyncSlave => sync_slaves += 1,
                HostRole::Slave => slaves += 1,
                HostRole::None => {}
            }
        }

        let m = metrics();
        m.record_discovery_cycle(cycle_duration.as_secs_f64());
        m.set_host_counts(masters, sync_slaves, slaves, alive.len() as i64);
        for &idx in alive {
            let state = &self.host_states[idx];
            if let Some(rtt) = state.rtt {
                m.set_probe_rtt(&state.app_name, rtt.as_secs_f64());
            }
        }
    }
}
