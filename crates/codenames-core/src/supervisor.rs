// Connection state and reconnect gating.
//
// The async driver in the client crate owns the socket and the timer; this is
// the state it consults. A reconnect is only ever attempted once a snapshot
// has been received (so a bad game id never spins) and only while the socket
// is down.

use crate::protocol::RawSnapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickAction {
    Idle,
    Reconnect,
}

#[derive(Debug, Default)]
pub struct ConnectionState {
    connected: bool,
    last_snapshot: Option<RawSnapshot>,
    reconnects: u64,
}

impl ConnectionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_connected(&self) -> bool {
        self.connected
    }

    pub fn last_snapshot(&self) -> Option<&RawSnapshot> {
        self.last_snapshot.as_ref()
    }

    /// Number of reconnects the timer has asked for.
    pub fn reconnects(&self) -> u64 {
        self.reconnects
    }

    /// The socket finished its handshake.
    pub fn on_open(&mut self) {
        self.connected = true;
    }

    /// A snapshot arrived. Replaces the previous one unconditionally.
    pub fn on_snapshot(&mut self, snapshot: RawSnapshot) {
        self.last_snapshot = Some(snapshot);
        self.connected = true;
    }

    /// The socket closed or errored. The last snapshot is kept.
    pub fn on_closed(&mut self) {
        self.connected = false;
    }

    pub fn should_reconnect(&self) -> bool {
        self.last_snapshot.is_some() && !self.connected
    }

    /// Called on every timer tick.
    pub fn on_tick(&mut self) -> TickAction {
        if self.should_reconnect() {
            self.reconnects += 1;
            TickAction::Reconnect
        } else {
            TickAction::Idle
        }
    }
}
