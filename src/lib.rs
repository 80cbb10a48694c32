//! PostgreSQL cluster topology discovery for quorum-commit replication
//!
//! Given a fixed list of candidate DSNs, the discoverer continuously
//! classifies each host as master, synchronous replica, asynchronous
//! replica or unreachable, ranks live hosts by probe round-trip time and
//! publishes two snapshot views for client traffic: alive hosts ordered by
//! RTT, and host indices bucketed by role. Readers take stable snapshots
//! and never block the discovery loop.

pub mod config;
pub mod dsn;
pub mod metrics;
pub mod probe;
pub mod topology;
