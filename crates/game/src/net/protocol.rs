//! Fixed-layout wire codec.
//!
//! Every datagram starts with a one byte type tag followed by the fields of
//! that message type. Multi-byte fields are big-endian. Strings are a `u32`
//! byte length followed by UTF-8 bytes.
//!
//! | Tag | Message | Fields |
//! |-----|---------|--------|
//! | 0 | CONNECT | id:u8, name:string, port:u16 |
//! | 1 | UPDATE (client) | id:u8, w:u8, a:u8, s:u8, d:u8, mouse_dx:i32 |
//! | 1 | UPDATE (server) | id:u8, direction:f64, x:f64, y:f64, hover:u8 |
//! | 2 | DISCONNECT | id:u8 |
//! | 3 | DEATH | id:u8 |
//! | 4 | SHOT | id:u8, x:f64, y:f64, direction:f64, distance:f64 |
//! | 5 | TILE_DAMAGED | x:f32, y:f32, id:u8 |

use bitflags::bitflags;
use glam::DVec2;

pub const MAX_PACKET_SIZE: usize = 1200;
pub const MAX_NAME_LEN: usize = 255;
pub const DEFAULT_PORT: u16 = 59243;

const KEY_PRESSED: u8 = 1;
const KEY_NOT_PRESSED: u8 = 0;

/// Server-assigned identifier of a connected player.
pub type PlayerId = u8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum PacketTag {
    Connect = 0,
    Update = 1,
    Disconnect = 2,
    Death = 3,
    Shot = 4,
    TileDamaged = 5,
}

impl PacketTag {
    pub fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(PacketTag::Connect),
            1 => Some(PacketTag::Update),
            2 => Some(PacketTag::Disconnect),
            3 => Some(PacketTag::Death),
            4 => Some(PacketTag::Shot),
            5 => Some(PacketTag::TileDamaged),
            _ => None,
        }
    }
}

bitflags! {
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Hash)]
    pub struct Keys: u8 {
        const W = 1 << 0;
        const A = 1 << 1;
        const S = 1 << 2;
        const D = 1 << 3;
    }
}

/// Local input as forwarded to the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct InputSnapshot {
    pub keys: Keys,
    pub mouse_dx: i32,
}

impl InputSnapshot {
    pub fn new(keys: Keys, mouse_dx: i32) -> Self {
        Self { keys, mouse_dx }
    }
}

/// Payload of a SHOT message; identical in both directions.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ShotFired {
    pub id: PlayerId,
    pub origin: DVec2,
    pub direction: f64,
    pub distance: f64,
}

/// Messages a client sends to the server.
#[derive(Debug, Clone, PartialEq)]
pub enum ClientMessage {
    /// Registration request. The id on the wire is a zero placeholder.
    Connect { name: String, port: u16 },
    Update { id: PlayerId, input: InputSnapshot },
    Disconnect { id: PlayerId },
    Shot(ShotFired),
}

/// Messages the server broadcasts to clients.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerMessage {
    Connect {
        id: PlayerId,
        name: String,
        port: u16,
    },
    Update {
        id: PlayerId,
        direction: f64,
        position: DVec2,
        hover: bool,
    },
    Disconnect {
        id: PlayerId,
    },
    Death {
        id: PlayerId,
    },
    Shot(ShotFired),
    TileDamaged {
        x: f32,
        y: f32,
        id: PlayerId,
    },
}

#[derive(Debug, thiserror::Error)]
pub enum PacketError {
    #[error("packet truncated: needed {needed} bytes, {remaining} remaining")]
    Truncated { needed: usize, remaining: usize },
    #[error("player name is not valid UTF-8")]
    InvalidString,
    #[error("player name of {0} bytes exceeds the limit")]
    StringTooLong(usize),
    #[error("encoded packet of {0} bytes exceeds MTU")]
    PayloadTooLarge(usize),
}

impl ClientMessage {
    pub fn tag(&self) -> PacketTag {
        match self {
            ClientMessage::Connect { .. } => PacketTag::Connect,
            ClientMessage::Update { .. } => PacketTag::Update,
            ClientMessage::Disconnect { .. } => PacketTag::Disconnect,
            ClientMessage::Shot(_) => PacketTag::Shot,
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, PacketError> {
        let mut writer = PacketWriter::new(self.tag());
        match self {
            ClientMessage::Connect { name, port } => {
                writer.put_u8(0);
                writer.put_str(name)?;
                writer.put_u16(*port);
            }
            ClientMessage::Update { id, input } => {
                writer.put_u8(*id);
                for key in [Keys::W, Keys::A, Keys::S, Keys::D] {
                    writer.put_u8(if input.keys.contains(key) {
                        KEY_PRESSED
                    } else {
                        KEY_NOT_PRESSED
                    });
                }
                writer.put_i32(input.mouse_dx);
            }
            ClientMessage::Disconnect { id } => writer.put_u8(*id),
            ClientMessage::Shot(shot) => writer.put_shot(shot),
        }
        writer.finish()
    }

    /// Returns `Ok(None)` for a tag this protocol version does not know.
    pub fn decode(data: &[u8]) -> Result<Option<Self>, PacketError> {
        let mut reader = PacketReader::new(data);
        let Some(tag) = PacketTag::from_u8(reader.get_u8()?) else {
            return Ok(None);
        };

        let message = match tag {
            PacketTag::Connect => {
                let _placeholder = reader.get_u8()?;
                let name = reader.get_str()?;
                let port = reader.get_u16()?;
                ClientMessage::Connect { name, port }
            }
            PacketTag::Update => {
                let id = reader.get_u8()?;
                let mut keys = Keys::empty();
                for key in [Keys::W, Keys::A, Keys::S, Keys::D] {
                    keys.set(key, reader.get_u8()? != KEY_NOT_PRESSED);
                }
                let mouse_dx = reader.get_i32()?;
                ClientMessage::Update {
                    id,
                    input: InputSnapshot::new(keys, mouse_dx),
                }
            }
            PacketTag::Disconnect => ClientMessage::Disconnect {
                id: reader.get_u8()?,
            },
            PacketTag::Shot => ClientMessage::Shot(reader.get_shot()?),
            // Server-only messages are meaningless from a client.
            PacketTag::Death | PacketTag::TileDamaged => return Ok(None),
        };

        Ok(Some(message))
    }
}

impl ServerMessage {
    pub fn tag(&self) -> PacketTag {
        match self {
            ServerMessage::Connect { .. } => PacketTag::Connect,
            ServerMessage::Update { .. } => PacketTag::Update,
            ServerMessage::Disconnect { .. } => PacketTag::Disconnect,
            ServerMessage::Death { .. } => PacketTag::Death,
            ServerMessage::Shot(_) => PacketTag::Shot,
            ServerMessage::TileDamaged { .. } => PacketTag::TileDamaged,
        }
    }

    /// The player this message refers to.
    pub fn player_id(&self) -> PlayerId {
        match self {
            ServerMessage::Connect { id, .. }
            | ServerMessage::Update { id, .. }
            | ServerMessage::Disconnect { id }
            | ServerMessage::Death { id }
            | ServerMessage::TileDamaged { id, .. } => *id,
            ServerMessage::Shot(shot) => shot.id,
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, PacketError> {
        let mut writer = PacketWriter::new(self.tag());
        match self {
            ServerMessage::Connect { id, name, port } => {
                writer.put_u8(*id);
                writer.put_str(name)?;
                writer.put_u16(*port);
            }
            ServerMessage::Update {
                id,
                direction,
                position,
                hover,
            } => {
                writer.put_u8(*id);
                writer.put_f64(*direction);
                writer.put_f64(position.x);
                writer.put_f64(position.y);
                writer.put_u8(u8::from(*hover));
            }
            ServerMessage::Disconnect { id } | ServerMessage::Death { id } => writer.put_u8(*id),
            ServerMessage::Shot(shot) => writer.put_shot(shot),
            ServerMessage::TileDamaged { x, y, id } => {
                writer.put_f32(*x);
                writer.put_f32(*y);
                writer.put_u8(*id);
            }
        }
        writer.finish()
    }

    /// Returns `Ok(None)` for a tag this protocol version does not know.
    pub fn decode(data: &[u8]) -> Result<Option<Self>, PacketError> {
        let mut reader = PacketReader::new(data);
        let Some(tag) = PacketTag::from_u8(reader.get_u8()?) else {
            return Ok(None);
        };

        let message = match tag {
            PacketTag::Connect => ServerMessage::Connect {
                id: reader.get_u8()?,
                name: reader.get_str()?,
                port: reader.get_u16()?,
            },
            PacketTag::Update => {
                let id = reader.get_u8()?;
                let direction = reader.get_f64()?;
                let x = reader.get_f64()?;
                let y = reader.get_f64()?;
                let hover = reader.get_u8()? != 0;
                ServerMessage::Update {
                    id,
                    direction,
                    position: DVec2::new(x, y),
                    hover,
                }
            }
            PacketTag::Disconnect => ServerMessage::Disconnect {
                id: reader.get_u8()?,
            },
            PacketTag::Death => ServerMessage::Death {
                id: reader.get_u8()?,
            },
            PacketTag::Shot => ServerMessage::Shot(reader.get_shot()?),
            PacketTag::TileDamaged => ServerMessage::TileDamaged {
                x: reader.get_f32()?,
                y: reader.get_f32()?,
                id: reader.get_u8()?,
            },
        };

        Ok(Some(message))
    }
}

struct PacketWriter {
    buf: Vec<u8>,
}

impl PacketWriter {
    fn new(tag: PacketTag) -> Self {
        let mut buf = Vec::with_capacity(64);
        buf.push(tag as u8);
        Self { buf }
    }

    fn put_u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    fn put_u16(&mut self, value: u16) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    fn put_i32(&mut self, value: i32) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    fn put_f32(&mut self, value: f32) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    fn put_f64(&mut self, value: f64) {
        self.buf.extend_from_slice(&value.to_be_bytes());
    }

    fn put_str(&mut self, value: &str) -> Result<(), PacketError> {
        if value.len() > MAX_NAME_LEN {
            return Err(PacketError::StringTooLong(value.len()));
        }
        self.buf
            .extend_from_slice(&(value.len() as u32).to_be_bytes());
        self.buf.extend_from_slice(value.as_bytes());
        Ok(())
    }

    fn put_shot(&mut self, shot: &ShotFired) {
        self.put_u8(shot.id);
        self.put_f64(shot.origin.x);
        self.put_f64(shot.origin.y);
        self.put_f64(shot.direction);
        self.put_f64(shot.distance);
    }

    fn finish(self) -> Result<Vec<u8>, PacketError> {
        if self.buf.len() > MAX_PACKET_SIZE {
            return Err(PacketError::PayloadTooLarge(self.buf.len()));
        }
        Ok(self.buf)
    }
}

struct PacketReader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> PacketReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn take<const N: usize>(&mut self) -> Result<[u8; N], PacketError> {
        let bytes = self.take_slice(N)?;
        let mut out = [0u8; N];
        out.copy_from_slice(bytes);
        Ok(out)
    }

    fn take_slice(&mut self, len: usize) -> Result<&'a [u8], PacketError> {
        let remaining = self.data.len() - self.pos;
        if remaining < len {
            return Err(PacketError::Truncated {
                needed: len,
                remaining,
            });
        }
        let slice = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    fn get_u8(&mut self) -> Result<u8, PacketError> {
        Ok(self.take::<1>()?[0])
    }

    fn get_u16(&mut self) -> Result<u16, PacketError> {
        Ok(u16::from_be_bytes(self.take()?))
    }

    fn get_i32(&mut self) -> Result<i32, PacketError> {
        Ok(i32::from_be_bytes(self.take()?))
    }

    fn get_f32(&mut self) -> Result<f32, PacketError> {
        Ok(f32::from_be_bytes(self.take()?))
    }

    fn get_f64(&mut self) -> Result<f64, PacketError> {
        Ok(f64::from_be_bytes(self.take()?))
    }

    fn get_str(&mut self) -> Result<String, PacketError> {
        let len = u32::from_be_bytes(self.take()?) as usize;
        if len > MAX_NAME_LEN {
            return Err(PacketError::StringTooLong(len));
        }
        let bytes = self.take_slice(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| PacketError::InvalidString)
    }

    fn get_shot(&mut self) -> Result<ShotFired, PacketError> {
        let id = self.get_u8()?;
        let x = self.get_f64()?;
        let y = self.get_f64()?;
        let direction = self.get_f64()?;
        let distance = self.get_f64()?;
        Ok(ShotFired {
            id,
            origin: DVec2::new(x, y),
            direction,
            distance,
        })
    }
}
