//! Read-optimized topology snapshots
//!
//! Two independent read-copy-update variables, one per view. Readers take a
//! stable `Arc` snapshot they may hold across await points; the discovery
//! loop replaces each snapshot atomically after a cycle. Old snapshots are
//! reclaimed by refcount once the last reader drops them.

use std::sync::Arc;

use arc_swap::ArcSwap;

use super::role::{DsnIndex, HostRole};

/// Alive host indices bucketed by role, each bucket in ascending RTT order.
///
/// Every synchronous replica is also listed in the `slaves` bucket: a sync
/// replica remains a valid target for slave reads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DsnIndicesByRole {
    pub masters: Vec<DsnIndex>,
    pub sync_slaves: Vec<DsnIndex>,
    pub slaves: Vec<DsnIndex>,
}

impl DsnIndicesByRole {
    pub fn of(&self, role: HostRole) -> &[DsnIndex] {
        match role {
            HostRole::Master => &self.masters,
            HostRole::SyncSlave => &self.sync_slaves,
            HostRole::Slave => &self.slaves,
            HostRole::None => &[],
        }
    }

    pub(crate) fn push(&mut self, role: HostRole, idx: DsnIndex) {
        match role {
            HostRole::Master => self.masters.push(idx),
            HostRole::SyncSlave => self.sync_slaves.push(idx),
            HostRole::Slave => self.slaves.push(idx),
            HostRole::None => {}
        }
    }
}

/// The two views exposed to client traffic. Both start empty; the initial
/// discovery cycle runs before any consumer can obtain a handle.
pub struct PublishedViews {
    alive_by_rtt: ArcSwap<Vec<DsnIndex>>,
    indices_by_role: ArcSwap<DsnIndicesByRole>,
}

impl PublishedViews {
    pub(crate) fn new() -> Self {
        Self {
            alive_by_rtt: ArcSwap::from_pointee(Vec::new()),
            indices_by_role: ArcSwap::from_pointee(DsnIndicesByRole::default()),
        }
    }

    /// Replace both snapshots. Each variable is swapped atomically on its
    /// own; a reader polling both may briefly pair the new value of one
    /// with the old value of the other.
    pub(crate) fn publish(&self, by_role: DsnIndicesByRole, alive_by_rtt: Vec<DsnIndex>) {
        self.indices_by_role.store(Arc::new(by_role));
        self.alive_by_rtt.store(Arc::new(alive_by_rtt));
    }

    pub fn alive_by_rtt(&self) -> Arc<Vec<DsnIndex>> {
        self.alive_by_rtt.load_full()
    }

    pub fn indices_by_role(&self) -> Arc<DsnIndicesByRole> {
        self.indices_by_role.load_full()
    }
}
