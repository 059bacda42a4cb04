mod channel;
mod protocol;
mod stats;
mod transport;

pub use channel::{DatagramChannel, LoopbackChannel, UdpChannel};
pub use protocol::{
    ClientMessage, DEFAULT_PORT, InputSnapshot, Keys, MAX_NAME_LEN, MAX_PACKET_SIZE, PacketError,
    PacketTag, PlayerId, ServerMessage, ShotFired,
};
pub use stats::{NetworkStats, PacketLossSimulation};
pub use transport::{Reliability, ReliableHandle, Session, TransportError};
