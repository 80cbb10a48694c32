//! Discovery integration tests against a live PostgreSQL host

use std::sync::Arc;

use pgtopo::config::DiscoveryConfig;
use pgtopo::dsn::Dsn;
use pgtopo::probe::PgConnector;
use pgtopo::topology::Topology;

use crate::{should_run_integration_tests, test_dsn};

#[tokio::test]
async fn test_discovers_live_host() {
    if !should_run_integration_tests() {
        eprintln!("Skipping (set PGTOPO_RUN_INTEGRATION_TESTS=1 to run)");
        return;
    }

    let dsn = Dsn::new(test_dsn());
    let topology = Topology::start(
        &DiscoveryConfig::default(),
        vec![dsn],
        Arc::new(PgConnector::new()),
    )
    .await;

    let alive = topology.alive_indices();
    assert_eq!(*alive, vec![0], "live host should be discovered");

    let by_role = topology.indices_by_role();
    assert!(
        !by_role.masters.is_empty() || !by_role.slaves.is_empty(),
        "live host should be classified as master or slave"
    );

    topology.stop().await;
}

#[tokio::test]
async fn test_unreachable_host_yields_empty_views() {
    if !should_run_integration_tests() {
        eprintln!("Skipping (set PGTOPO_RUN_INTEGRATION_TESTS=1 to run)");
        return;
    }

    // Reserved TEST-NET-1 address, nothing listens there.
    let dsn = Dsn::new("postgres://postgres@192.0.2.1:5432/postgres");
    let topology = Topology::start(
        &DiscoveryConfig::default(),
        vec![dsn],
        Arc::new(PgConnector::new()),
    )
    .await;

    assert!(topology.alive_indices().is_empty());
    topology.stop().await;
}
