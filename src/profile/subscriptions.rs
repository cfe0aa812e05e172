//! Client Characteristic Configuration state for the Detection characteristic.
//!
//! Owned by the protocol binding; the rest of the bridge only asks whether
//! anyone is subscribed and who to send to.

use heapless::Vec;

/// Upper bound on simultaneous links tracked by the table.
pub const MAX_LINKS: usize = 8;

/// CCC bit enabling notifications; the only bit this service accepts.
pub const CCC_NOTIFY: u16 = 0x0001;

/// Connection handle assigned by the stack.
pub type ConnHandle = u16;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
struct CccEntry {
    conn: ConnHandle,
    value: u16,
}

/// Per-connection CCC values.
#[derive(Debug, Default)]
pub struct SubscriptionTable {
    entries: Vec<CccEntry, MAX_LINKS>,
}

impl SubscriptionTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Track a new link with notifications disabled.
    ///
    /// Returns `false` when the table is full.
    pub fn connect(&mut self, conn: ConnHandle) -> bool {
        if self.contains(conn) {
            return true;
        }
        self.entries.push(CccEntry { conn, value: 0 }).is_ok()
    }

    pub fn contains(&self, conn: ConnHandle) -> bool {
        self.entries.iter().any(|e| e.conn == conn)
    }

    /// Forget a link and its configuration.
    pub fn disconnect(&mut self, conn: ConnHandle) {
        self.entries.retain(|e| e.conn != conn);
    }

    /// Store a CCC value for a tracked link.
    ///
    /// Returns `false` for a connection that never connected.
    pub fn set(&mut self, conn: ConnHandle, value: u16) -> bool {
        match self.entries.iter_mut().find(|e| e.conn == conn) {
            Some(entry) => {
                entry.value = value;
                true
            }
            None => false,
        }
    }

    pub fn get(&self, conn: ConnHandle) -> u16 {
        self.entries
            .iter()
            .find(|e| e.conn == conn)
            .map_or(0, |e| e.value)
    }

    pub fn any_subscribed(&self) -> bool {
        self.entries.iter().any(|e| e.value & CCC_NOTIFY != 0)
    }

    /// Connections with notifications enabled.
    pub fn subscribers(&self) -> Vec<ConnHandle, MAX_LINKS> {
        self.entries
            .iter()
            .filter(|e| e.value & CCC_NOTIFY != 0)
            .map(|e| e.conn)
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
