//! Probe connection layer
//!
//! The discoverer holds exactly one dedicated probe connection per host,
//! never shared with client traffic. The `Connector`/`ProbeConnection`
//! traits are the seam between discovery logic and the wire protocol; the
//! production implementation rides on sqlx's `PgConnection`.

use async_trait::async_trait;
use sqlx::postgres::{PgConnectOptions, PgConnection};
use sqlx::{Connection, Row};
use tracing::debug;

use crate::dsn::Dsn;

/// `application_name` set on every probe connection so probe sessions are
/// trivially identifiable in server logs.
pub const PROBE_APPLICATION_NAME: &str = "pgtopo-probe";

const SHOW_TRANSACTION_READ_ONLY: &str = "SHOW transaction_read_only";
const SHOW_SYNC_STANDBY_NAMES: &str = "SHOW synchronous_standby_names";

/// Per-host, per-cycle recoverable probe failure. Any variant costs the
/// host its role for the current cycle; the next cycle retries from scratch.
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    #[error("connect failed: {0}")]
    Connect(String),
    #[error("query failed: {0}")]
    Query(String),
}

impl ProbeError {
    pub(crate) fn reason(&self) -> &'static str {
        match self {
            ProbeError::Connect(_) => "connect",
            ProbeError::Query(_) => "query",
        }
    }
}

/// A live probe connection to a single host.
#[async_trait]
pub trait ProbeConnection: Send {
    /// `SHOW transaction_read_only`: true for replicas, false for primaries.
    async fn check_read_only(&mut self) -> Result<bool, ProbeError>;

    /// Raw value of `synchronous_standby_names` on this host.
    async fn show_sync_standby_names(&mut self) -> Result<String, ProbeError>;

    /// Close the connection, waiting for the server round-trip.
    async fn close(self: Box<Self>);
}

/// Factory for probe connections.
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(&self, dsn: &Dsn) -> Result<Box<dyn ProbeConnection>, ProbeError>;
}

/// sqlx-backed connector used in production.
#[derive(Debug, Default)]
pub struct PgConnector;

impl PgConnector {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Connector for PgConnector {
    async fn connect(&self, dsn: &Dsn) -> Result<Box<dyn ProbeConnection>, ProbeError> {
        let options: PgConnectOptions = dsn
            .as_str()
            .parse()
            .map_err(|e: sqlx::Error| ProbeError::Connect(e.to_string()))?;
        let options = options.application_name(PROBE_APPLICATION_NAME);

        let connection = PgConnection::connect_with(&options)
            .await
            .map_err(|e| ProbeError::Connect(e.to_string()))?;
        debug!(dsn = %dsn.redacted(), "probe connection established");

        Ok(Box::new(PgProbeConnection { connection }))
    }
}

struct PgProbeConnection {
    connection: PgConnection,
}

impl PgProbeConnection {
    async fn show(&mut self, sql: &str) -> Result<String, ProbeError> {
        let row = sqlx::query(sql)
            .fetch_one(&mut self.connection)
            .await
            .map_err(|e| ProbeError::Query(e.to_string()))?;
        row.try_get(0).map_err(|e| ProbeError::Query(e.to_string()))
    }
}

#[async_trait]
impl ProbeConnection for PgProbeConnection {
    async fn check_read_only(&mut self) -> Result<bool, ProbeError> {
        let value = self.show(SHOW_TRANSACTION_READ_ONLY).await?;
        Ok(value == "on")
    }

    async fn show_sync_standby_names(&mut self) -> Result<String, ProbeError> {
        self.show(SHOW_SYNC_STANDBY_NAMES).await
    }

    async fn close(self: Box<Self>) {
        if let Err(e) = self.connection.close().await {
            debug!(error = %e, "probe connection close failed");
        }
    }
}
