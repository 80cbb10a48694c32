use std::fmt;

/// Index of a host in the configured DSN list.
///
/// Indices are the stable external handle: published views refer to hosts
/// by position only, never by connection string.
pub type DsnIndex = usize;

/// Role of a cluster host as observed by the last discovery cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HostRole {
    /// Unreachable or not yet probed
    #[default]
    None,
    /// Read-write primary
    Master,
    /// Asynchronous replica
    Slave,
    /// Synchronous replica (derived; a host reports itself read-only and is
    /// promoted when the master lists its application name as synchronous)
    SyncSlave,
}

impl fmt::Display for HostRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            HostRole::None => "none",
            HostRole::Master => "master",
            HostRole::Slave => "slave",
            HostRole::SyncSlave => "sync_slave",
        };
        f.write_str(s)
    }
}
