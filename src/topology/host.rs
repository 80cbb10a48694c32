//! Per-host probe state
//!
//! One `HostState` per configured DSN, owned by the discovery loop for its
//! lifetime. A probe either succeeds and updates every result field
//! together with the retained connection, or fails and resets the state to
//! the unreachable tuple — the fields never describe a half-finished probe.

use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, warn};

use crate::dsn::Dsn;
use crate::metrics::metrics;
use crate::probe::{Connector, ProbeConnection, ProbeError};

use super::role::HostRole;
use super::standby::parse_sync_standby_names;

pub(crate) struct HostState {
    pub(crate) dsn: Dsn,
    /// Escaped host name matching the `application_name` column in
    /// `pg_stat_replication`. Constant after construction.
    pub(crate) app_name: String,
    /// Dedicated probe connection, created lazily and dropped on any
    /// probe failure so the next cycle reconnects from scratch.
    pub(crate) connection: Option<Box<dyn ProbeConnection>>,
    pub(crate) role: HostRole,
    /// Round-trip time of the last read-only check; `None` when the host
    /// was unreachable.
    pub(crate) rtt: Option<Duration>,
    /// Application names this host reported as synchronous standbys.
    /// Populated only when `role` is `Master`.
    pub(crate) detected_sync_slaves: Vec<String>,
}

struct ProbeOutcome {
    connection: Box<dyn ProbeConnection>,
    role: HostRole,
    rtt: Duration,
    detected_sync_slaves: Vec<String>,
}

impl HostState {
    pub(crate) fn new(dsn: Dsn) -> Self {
        let app_name = dsn.app_name();
        Self {
            dsn,
            app_name,
            connection: None,
            role: HostRole::None,
            rtt: None,
            detected_sync_slaves: Vec::new(),
        }
    }

    /// Probe this host once. The whole probe — connect if needed, read-only
    /// check, sync-standby query on a master — must finish within
    /// `check_timeout` or the host counts as unreachable for this cycle.
    pub(crate) async fn run_check(&mut self, connector: &dyn Connector, check_timeout: Duration) {
        let connection = self.connection.take();
        let probe = Self::probe(&self.dsn, connection, connector);

        match tokio::time::timeout(check_timeout, probe).await {
            Ok(Ok(outcome)) => {
                self.connection = Some(outcome.connection);
                self.role = outcome.role;
                self.rtt = Some(outcome.rtt);
                self.detected_sync_slaves = outcome.detected_sync_slaves;
            }
            Ok(Err(err)) => {
                match &err {
                    ProbeError::Connect(_) => {
                        warn!(dsn = %self.dsn.redacted(), error = %err, "failed to connect")
                    }
                    ProbeError::Query(_) => {
                        warn!(dsn = %self.dsn.redacted(), error = %err, "broken connection")
                    }
                }
                metrics().record_probe_failure(err.reason());
                self.reset();
            }
            Err(_) => {
                warn!(
                    dsn = %self.dsn.redacted(),
                    timeout_ms = check_timeout.as_millis() as u64,
                    "probe timed out"
                );
                metrics().record_probe_failure("timeout");
                self.reset();
            }
        }
    }

    async fn probe(
        dsn: &Dsn,
        connection: Option<Box<dyn ProbeConnection>>,
        connector: &dyn Connector,
    ) -> Result<ProbeOutcome, ProbeError> {
        let mut connection = match connection {
            Some(connection) => connection,
            None => connector.connect(dsn).await?,
        };

        let started = Instant::now();
        let read_only = connection.check_read_only().await?;
        let rtt = started.elapsed();

        let (role, detected_sync_slaves) = if read_only {
            (HostRole::Slave, Vec::new())
        } else {
            let raw = connection.show_sync_standby_names().await?;
            let names = parse_sync_standby_names(&raw);
            debug!(count = names.len(), "sync standbys detected");
            (HostRole::Master, names)
        };

        Ok(ProbeOutcome {
            connection,
            role,
            rtt,
            detected_sync_slaves,
        })
    }

    fn reset(&mut self) {
        // The connection was either never established or is possibly
        // broken; taking it out at probe start already dropped it.
        self.connection = None;
        self.role = HostRole::None;
        self.rtt = None;
        self.detected_sync_slaves.clear();
    }

    /// Close the probe connection, waiting for the close to complete.
    pub(crate) async fn close_connection(&mut self) {
        if let Some(connection) = self.connection.take() {
            connection.close().await;
        }
    }
}
