//! Cluster topology discovery for quorum-commit replication

mod discovery;
mod host;
mod role;
mod standby;
mod views;

pub use discovery::Topology;
pub use role::{DsnIndex, HostRole};
pub use standby::parse_sync_standby_names;
pub use views::{DsnIndicesByRole, PublishedViews};
