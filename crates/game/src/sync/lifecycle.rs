use std::time::Duration;

use crate::net::PlayerId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Disconnecting,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisconnectOutcome {
    /// The server echoed our DISCONNECT.
    Acknowledged,
    /// No echo before the drain deadline; the session was torn down anyway.
    TimedOut,
    /// The local identity was never bound, so there was nothing to hand back.
    NotConnected,
}

/// CONNECT/DISCONNECT handshake state.
///
/// `Disconnected -> Connecting -> Connected -> Disconnecting -> Disconnected`.
/// The last `Disconnected` is terminal: the engine is consumed by shutdown.
#[derive(Debug, Clone)]
pub struct Lifecycle {
    state: ConnectionState,
    connecting_for: Duration,
}

impl Default for Lifecycle {
    fn default() -> Self {
        Self::new()
    }
}

impl Lifecycle {
    pub fn new() -> Self {
        Self {
            state: ConnectionState::Disconnected,
            connecting_for: Duration::ZERO,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn begin_connect(&mut self, name: &str, port: u16) -> bool {
        if self.state != ConnectionState::Disconnected {
            log::warn!("Ignoring connect request in state {:?}", self.state);
            return false;
        }
        log::info!("Registering as {:?} from local port {}", name, port);
        self.state = ConnectionState::Connecting;
        self.connecting_for = Duration::ZERO;
        true
    }

    pub fn bind(&mut self, id: PlayerId) -> bool {
        match self.state {
            ConnectionState::Disconnected | ConnectionState::Connecting => {
                log::info!(
                    "Connected as player {} after {:.2?}",
                    id,
                    self.connecting_for
                );
                self.state = ConnectionState::Connected;
                true
            }
            state => {
                log::warn!("Ignoring identity bind in state {:?}", state);
                false
            }
        }
    }

    pub fn begin_disconnect(&mut self, id: PlayerId) -> bool {
        if self.state != ConnectionState::Connected {
            return false;
        }
        log::info!("Disconnecting player {}", id);
        self.state = ConnectionState::Disconnecting;
        true
    }

    pub fn finish(&mut self, outcome: DisconnectOutcome) {
        match outcome {
            DisconnectOutcome::Acknowledged => log::info!("Disconnect acknowledged"),
            DisconnectOutcome::TimedOut => {
                log::warn!("Disconnect not acknowledged, closing anyway")
            }
            DisconnectOutcome::NotConnected => log::info!("Closing unregistered session"),
        }
        self.state = ConnectionState::Disconnected;
    }

    /// Accumulates time spent waiting for the server to echo our CONNECT.
    pub fn advance(&mut self, elapsed: Duration) {
        if self.state == ConnectionState::Connecting {
            self.connecting_for += elapsed;
        }
    }

    /// How long registration has been outstanding, while connecting.
    pub fn connecting_elapsed(&self) -> Option<Duration> {
        (self.state == ConnectionState::Connecting).then_some(self.connecting_for)
    }
}
