mod connection;

#[cfg(test)]
pub(crate) mod mock;

pub use connection::{Connector, PgConnector, ProbeConnection, ProbeError, PROBE_APPLICATION_NAME};
