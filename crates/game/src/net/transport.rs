use std::io;
use std::net::ToSocketAddrs;
use std::time::{Duration, Instant};

use super::channel::{DatagramChannel, UdpChannel};
use super::protocol::MAX_PACKET_SIZE;
use super::stats::{NetworkStats, PacketLossSimulation};

/// Upper bound on receive calls made by one `poll_incoming`, successful or
/// not, so a channel that keeps failing cannot stall the tick.
const MAX_RECV_ATTEMPTS_PER_POLL: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reliability {
    /// Transmitted once on the next flush.
    Unreliable,
    /// Retransmitted on every flush until acknowledged or abandoned.
    Reliable,
}

/// Identifies one entry in the session's retry set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ReliableHandle(u32);

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("failed to open datagram channel: {0}")]
    Io(#[from] io::Error),
}

#[derive(Debug)]
struct PendingSend {
    handle: ReliableHandle,
    payload: Vec<u8>,
    attempts: u32,
    first_sent: Option<Instant>,
}

impl PendingSend {
    fn age(&self) -> Duration {
        self.first_sent
            .map_or(Duration::ZERO, |sent| sent.elapsed())
    }
}

/// A datagram channel to one remote endpoint plus the bookkeeping for
/// selective reliability.
///
/// Failures on the channel are logged and counted, never returned: the game
/// loop keeps running on a degraded link and the next flush retries.
pub struct Session<C: DatagramChannel> {
    channel: C,
    outbox: Vec<Vec<u8>>,
    reliable: Vec<PendingSend>,
    next_handle: u32,
    stats: NetworkStats,
    loss_sim: PacketLossSimulation,
    recv_buffer: [u8; MAX_PACKET_SIZE],
}

impl Session<UdpChannel> {
    pub fn connect_udp<A: ToSocketAddrs>(server: A) -> Result<Self, TransportError> {
        let channel = UdpChannel::connect(server)?;
        log::info!(
            "Opened session {} -> {}",
            channel.local_addr(),
            channel.remote_addr()
        );
        Ok(Self::new(channel))
    }
}

impl<C: DatagramChannel> Session<C> {
    pub fn new(channel: C) -> Self {
        Self {
            channel,
            outbox: Vec::new(),
            reliable: Vec::new(),
            next_handle: 0,
            stats: NetworkStats::default(),
            loss_sim: PacketLossSimulation::default(),
            recv_buffer: [0u8; MAX_PACKET_SIZE],
        }
    }

    pub fn set_packet_loss(&mut self, loss_sim: PacketLossSimulation) {
        self.loss_sim = loss_sim;
    }

    pub fn local_port(&self) -> u16 {
        self.channel.local_port()
    }

    pub fn stats(&self) -> &NetworkStats {
        &self.stats
    }

    pub(crate) fn record_decode_error(&mut self) {
        self.stats.decode_errors += 1;
    }

    pub fn channel_mut(&mut self) -> &mut C {
        &mut self.channel
    }

    /// Every datagram received since the last call. Never blocks.
    ///
    /// A failed receive is counted and skipped; data queued behind it is
    /// still drained.
    pub fn poll_incoming(&mut self) -> Vec<Vec<u8>> {
        let mut packets = Vec::new();

        for _ in 0..MAX_RECV_ATTEMPTS_PER_POLL {
            match self.channel.recv(&mut self.recv_buffer) {
                Ok(Some(size)) => {
                    self.stats.packets_received += 1;
                    self.stats.bytes_received += size as u64;
                    packets.push(self.recv_buffer[..size].to_vec());
                }
                Ok(None) => break,
                // ICMP port unreachable from an earlier send surfaces here on
                // a connected socket, ahead of datagrams already queued.
                Err(e) if e.kind() == io::ErrorKind::ConnectionRefused => {
                    log::debug!("Receive failed: {}", e);
                    self.stats.receive_errors += 1;
                }
                Err(e) => {
                    log::warn!("Receive failed: {}", e);
                    self.stats.receive_errors += 1;
                }
            }
        }

        packets
    }

    /// Queues `payload` for the next flush. Reliable sends return the handle
    /// used to acknowledge or abandon them.
    pub fn send(&mut self, payload: Vec<u8>, reliability: Reliability) -> Option<ReliableHandle> {
        match reliability {
            Reliability::Unreliable => {
                self.outbox.push(payload);
                None
            }
            Reliability::Reliable => {
                let handle = ReliableHandle(self.next_handle);
                self.next_handle = self.next_handle.wrapping_add(1);
                self.reliable.push(PendingSend {
                    handle,
                    payload,
                    attempts: 0,
                    first_sent: None,
                });
                Some(handle)
            }
        }
    }

    /// Removes a confirmed reliable send from the retry set.
    pub fn acknowledge(&mut self, handle: ReliableHandle) -> bool {
        match self.take_pending(handle) {
            Some(pending) => {
                log::debug!(
                    "Reliable send {:?} confirmed after {} attempt(s) in {:.2?}",
                    handle,
                    pending.attempts,
                    pending.age()
                );
                true
            }
            None => false,
        }
    }

    /// Gives up on a reliable send without confirmation.
    pub fn abandon(&mut self, handle: ReliableHandle) -> bool {
        match self.take_pending(handle) {
            Some(pending) => {
                log::warn!(
                    "Abandoned reliable send {:?} after {} attempt(s) in {:.2?}",
                    handle,
                    pending.attempts,
                    pending.age()
                );
                true
            }
            None => false,
        }
    }

    pub fn is_pending(&self, handle: ReliableHandle) -> bool {
        self.reliable.iter().any(|p| p.handle == handle)
    }

    pub fn pending_reliable(&self) -> usize {
        self.reliable.len()
    }

    pub fn attempts(&self, handle: ReliableHandle) -> Option<u32> {
        self.reliable
            .iter()
            .find(|p| p.handle == handle)
            .map(|p| p.attempts)
    }

    /// The tick's outbound pass: queued unreliable datagrams once, then
    /// every outstanding reliable datagram.
    pub fn flush(&mut self) {
        for payload in self.outbox.drain(..) {
            transmit(&mut self.channel, &mut self.stats, &self.loss_sim, &payload);
        }

        for pending in &mut self.reliable {
            if pending.attempts > 0 {
                self.stats.retransmissions += 1;
            }
            pending.attempts += 1;
            pending.first_sent.get_or_insert_with(Instant::now);
            transmit(
                &mut self.channel,
                &mut self.stats,
                &self.loss_sim,
                &pending.payload,
            );
        }
    }

    fn take_pending(&mut self, handle: ReliableHandle) -> Option<PendingSend> {
        let index = self.reliable.iter().position(|p| p.handle == handle)?;
        Some(self.reliable.remove(index))
    }
}

fn transmit<C: DatagramChannel>(
    channel: &mut C,
    stats: &mut NetworkStats,
    loss_sim: &PacketLossSimulation,
    payload: &[u8],
) {
    if loss_sim.should_drop() {
        stats.packets_dropped += 1;
        return;
    }

    match channel.send(payload) {
        Ok(bytes) => {
            stats.packets_sent += 1;
            stats.bytes_sent += bytes as u64;
        }
        Err(e) => {
            log::warn!("Send failed: {}", e);
            stats.send_errors += 1;
        }
    }
}
