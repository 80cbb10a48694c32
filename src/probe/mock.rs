//! Scriptable connector for exercising probe and discovery logic in tests.
//!
//! Connections consult the current script on every call, so a host can be
//! reconfigured (e.g. taken down) between discovery cycles and an already
//! cached connection observes the change.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use super::connection::{Connector, ProbeConnection, ProbeError};
use crate::dsn::Dsn;

#[derive(Debug, Clone)]
pub(crate) struct MockHost {
    pub connect_fails: bool,
    pub check_fails: bool,
    pub show_fails: bool,
    pub read_only: bool,
    pub rtt: Duration,
    pub sync_standby_names: String,
}

impl MockHost {
    pub fn master(sync_standby_names: &str) -> Self {
        Self {
            connect_fails: false,
            check_fails: false,
            show_fails: false,
            read_only: false,
            rtt: Duration::from_millis(1),
            sync_standby_names: sync_standby_names.to_string(),
        }
    }

    pub fn replica() -> Self {
        Self {
            read_only: true,
            ..Self::master("")
        }
    }

    pub fn unreachable() -> Self {
        Self {
            connect_fails: true,
            ..Self::master("")
        }
    }

    pub fn with_rtt(mut self, rtt: Duration) -> Self {
        self.rtt = rtt;
        self
    }

    pub fn failing_check(mut self) -> Self {
        self.check_fails = true;
        self
    }

    pub fn failing_show(mut self) -> Self {
        self.show_fails = true;
        self
    }
}

#[derive(Default)]
struct MockState {
    hosts: Mutex<HashMap<String, MockHost>>,
    connects: Mutex<HashMap<String, usize>>,
    closed: AtomicUsize,
}

impl MockState {
    fn script(&self, key: &str) -> Option<MockHost> {
        self.hosts.lock().unwrap().get(key).cloned()
    }
}

/// Connector whose per-host behavior is scripted by tests.
#[derive(Clone, Default)]
pub(crate) struct MockConnector {
    state: Arc<MockState>,
}

impl MockConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, dsn: &Dsn, host: MockHost) {
        self.state
            .hosts
            .lock()
            .unwrap()
            .insert(dsn.as_str().to_string(), host);
    }

    pub fn connect_count(&self, dsn: &Dsn) -> usize {
        self.state
            .connects
            .lock()
            .unwrap()
            .get(dsn.as_str())
            .copied()
            .unwrap_or(0)
    }

    pub fn closed_count(&self) -> usize {
        self.state.closed.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(&self, dsn: &Dsn) -> Result<Box<dyn ProbeConnection>, ProbeError> {
        let key = dsn.as_str().to_string();
        *self.state.connects.lock().unwrap().entry(key.clone()).or_insert(0) += 1;

        let script = self
            .state
            .script(&key)
            .ok_or_else(|| ProbeError::Connect(format!("no script for {key}")))?;
        if script.connect_fails {
            return Err(ProbeError::Connect("connection refused".to_string()));
        }

        Ok(Box::new(MockConnection {
            key,
            state: self.state.clone(),
        }))
    }
}

struct MockConnection {
    key: String,
    state: Arc<MockState>,
}

impl MockConnection {
    fn script(&self) -> Result<MockHost, ProbeError> {
        self.state
            .script(&self.key)
            .ok_or_else(|| ProbeError::Query("script removed".to_string()))
    }
}

#[async_trait]
impl ProbeConnection for MockConnection {
    async fn check_read_only(&mut self) -> Result<bool, ProbeError> {
        let script = self.script()?;
        tokio::time::sleep(script.rtt).await;
        // A host taken down mid-lifetime breaks its cached connection too.
        if script.check_fails || script.connect_fails {
            return Err(ProbeError::Query("connection reset".to_string()));
        }
        Ok(script.read_only)
    }

    async fn show_sync_standby_names(&mut self) -> Result<String, ProbeError> {
        let script = self.script()?;
        if script.show_fails {
            return Err(ProbeError::Query("connection reset".to_string()));
        }
        Ok(script.sync_standby_names)
    }

    async fn close(self: Box<Self>) {
        self.state.closed.fetch_add(1, Ordering::SeqCst);
    }
}
