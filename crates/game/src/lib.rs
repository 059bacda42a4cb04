//! Client-side state synchronization for a small UDP multiplayer game.
//!
//! The [`SyncEngine`] drains server events each tick, applies them to the
//! [`PlayerRegistry`], forwards local input and shots, and retransmits the
//! messages that must arrive until the server echoes them back.

pub mod config;
pub mod map;
pub mod net;
pub mod player;
pub mod shot;
pub mod sync;

pub use config::{ClientConfig, ConfigError, ShotConfig};
pub use map::{HexMap, HexTile, TILE_SIZE, TileMap};
pub use net::{
    ClientMessage, DEFAULT_PORT, DatagramChannel, InputSnapshot, Keys, LoopbackChannel,
    MAX_NAME_LEN, MAX_PACKET_SIZE, NetworkStats, PacketError, PacketLossSimulation, PacketTag,
    PlayerId, Reliability, ReliableHandle, ServerMessage, Session, ShotFired, TransportError,
    UdpChannel,
};
pub use player::{PlayerRegistry, PlayerState};
pub use shot::{Shot, ShotCharge, ShotTracker};
pub use sync::{
    Clock, ConnectionState, DisconnectOutcome, InputSample, InputSource, Lifecycle,
    LocalIdentity, ManualClock, SyncEngine, SystemClock, TickScheduler,
};
