use std::cell::RefCell;
use std::collections::VecDeque;
use std::io;
use std::net::{SocketAddr, ToSocketAddrs, UdpSocket};
use std::rc::Rc;

/// One unreliable datagram path to a single remote endpoint.
pub trait DatagramChannel {
    fn send(&mut self, data: &[u8]) -> io::Result<usize>;

    /// Non-blocking. `Ok(None)` when nothing is waiting.
    fn recv(&mut self, buf: &mut [u8]) -> io::Result<Option<usize>>;

    /// The local port doubles as the identity disambiguator sent with CONNECT.
    fn local_port(&self) -> u16;
}

pub struct UdpChannel {
    socket: UdpSocket,
    local_addr: SocketAddr,
    remote_addr: SocketAddr,
}

impl UdpChannel {
    /// Binds an ephemeral port and associates it with `server`.
    pub fn connect<A: ToSocketAddrs>(server: A) -> io::Result<Self> {
        let remote_addr = server
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "no server address"))?;

        let bind_addr: SocketAddr = if remote_addr.is_ipv4() {
            SocketAddr::from(([0, 0, 0, 0], 0))
        } else {
            SocketAddr::from(([0u16; 8], 0))
        };

        let socket = UdpSocket::bind(bind_addr)?;
        socket.connect(remote_addr)?;
        socket.set_nonblocking(true)?;
        let local_addr = socket.local_addr()?;

        Ok(Self {
            socket,
            local_addr,
            remote_addr,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    pub fn remote_addr(&self) -> SocketAddr {
        self.remote_addr
    }
}

impl DatagramChannel for UdpChannel {
    fn send(&mut self, data: &[u8]) -> io::Result<usize> {
        self.socket.send(data)
    }

    fn recv(&mut self, buf: &mut [u8]) -> io::Result<Option<usize>> {
        match self.socket.recv(buf) {
            Ok(size) => Ok(Some(size)),
            Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn local_port(&self) -> u16 {
        self.local_addr.port()
    }
}

#[derive(Debug, Default)]
struct Mailbox {
    queue: VecDeque<Vec<u8>>,
}

/// In-memory datagram channel. Two ends created by [`LoopbackChannel::pair`]
/// deliver to each other in order; `drop_next` discards outgoing datagrams
/// for deterministic loss.
#[derive(Debug)]
pub struct LoopbackChannel {
    port: u16,
    inbox: Rc<RefCell<Mailbox>>,
    outbox: Rc<RefCell<Mailbox>>,
    drop_remaining: usize,
    sent: usize,
}

impl LoopbackChannel {
    pub fn pair(port_a: u16, port_b: u16) -> (Self, Self) {
        let a_to_b = Rc::new(RefCell::new(Mailbox::default()));
        let b_to_a = Rc::new(RefCell::new(Mailbox::default()));

        let a = Self {
            port: port_a,
            inbox: Rc::clone(&b_to_a),
            outbox: Rc::clone(&a_to_b),
            drop_remaining: 0,
            sent: 0,
        };
        let b = Self {
            port: port_b,
            inbox: a_to_b,
            outbox: b_to_a,
            drop_remaining: 0,
            sent: 0,
        };

        (a, b)
    }

    pub fn drop_next(&mut self, count: usize) {
        self.drop_remaining += count;
    }

    /// Datagrams handed to `send`, including dropped ones.
    pub fn sent_count(&self) -> usize {
        self.sent
    }

    pub fn pending(&self) -> usize {
        self.inbox.borrow().queue.len()
    }

    /// Drains every datagram waiting for this end.
    pub fn recv_all(&mut self) -> Vec<Vec<u8>> {
        self.inbox.borrow_mut().queue.drain(..).collect()
    }
}

impl DatagramChannel for LoopbackChannel {
    fn send(&mut self, data: &[u8]) -> io::Result<usize> {
        self.sent += 1;
        if self.drop_remaining > 0 {
            self.drop_remaining -= 1;
            return Ok(data.len());
        }
        self.outbox.borrow_mut().queue.push_back(data.to_vec());
        Ok(data.len())
    }

    fn recv(&mut self, buf: &mut [u8]) -> io::Result<Option<usize>> {
        let Some(data) = self.inbox.borrow_mut().queue.pop_front() else {
            return Ok(None);
        };
        let size = data.len().min(buf.len());
        buf[..size].copy_from_slice(&data[..size]);
        Ok(Some(size))
    }

    fn local_port(&self) -> u16 {
        self.port
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_loopback_pair_delivers_both_ways() {
        let (mut client, mut server) = LoopbackChannel::pair(4000, 59243);

        client.send(b"hello").unwrap();
        assert_eq!(server.recv_all(), vec![b"hello".to_vec()]);
        assert_eq!(client.pending(), 0);

        server.send(b"world").unwrap();
        let mut buf = [0u8; 16];
        assert_eq!(client.recv(&mut buf).unwrap(), Some(5));
        assert_eq!(&buf[..5], b"world");
        assert_eq!(client.recv(&mut buf).unwrap(), None);
    }

    #[test]
    fn test_loopback_drop_next() {
        let (mut client, mut server) = LoopbackChannel::pair(1, 2);
        client.drop_next(2);

        for payload in [b"a", b"b", b"c"] {
            client.send(payload).unwrap();
        }

        assert_eq!(client.sent_count(), 3);
        assert_eq!(server.recv_all(), vec![b"c".to_vec()]);
    }

    #[test]
    fn test_udp_channel_nonblocking_recv() {
        let server = UdpSocket::bind("127.0.0.1:0").unwrap();
        let server_addr = server.local_addr().unwrap();

        let mut channel = UdpChannel::connect(server_addr).unwrap();
        assert_ne!(channel.local_port(), 0);
        assert_eq!(channel.remote_addr(), server_addr);

        let mut buf = [0u8; 32];
        assert_eq!(channel.recv(&mut buf).unwrap(), None);
    }
}
