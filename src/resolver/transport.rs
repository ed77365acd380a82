//! DNS transport.

use hickory_proto::{
    error::ProtoError,
    op::Message,
    serialize::binary::{BinDecodable, BinEncodable},
};
use std::{
    io::{self, Read, Write},
    net::{Ipv4Addr, Ipv6Addr, SocketAddr, TcpStream, ToSocketAddrs, UdpSocket},
    time::{Duration, Instant},
};

/// Receive buffer size. Servers may send more than the EDNS0 payload size we
/// advertise, so this covers the largest possible datagram.
pub const MAX_UDP_PAYLOAD: usize = 65535;

/// Errors encountered while exchanging a message with a single server.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// Socket errors, including timeouts.
    #[error("exchanging with name server: {0}")]
    Io(#[from] io::Error),
    /// The query couldn't be encoded or the response couldn't be decoded.
    #[error("dns message: {0}")]
    Proto(#[from] ProtoError),
    /// The server endpoint didn't resolve to any socket address.
    #[error("name server {0:?} has no usable address")]
    Resolve(String),
}

/// Represents the ability to perform a single query/response exchange with
/// a name server.
pub trait Exchange: Send + Sync {
    /// Sends `query` to `server` (a `host:port` endpoint) and waits for the
    /// matching response, for at most `timeout` if one is given.
    fn exchange(
        &self,
        query: &Message,
        server: &str,
        timeout: Option<Duration>,
    ) -> Result<Message, TransportError>;
}

/// Blocking transport that queries over UDP and retries over TCP when the
/// response comes back truncated.
#[derive(Debug, Clone, Copy, Default)]
pub struct UdpTransport;

impl UdpTransport {
    #[cfg_attr(not(feature = "log"), allow(unused_variables))]
    fn exchange_udp(
        &self,
        wire: &[u8],
        id: u16,
        addr: SocketAddr,
        timeout: Option<Duration>,
    ) -> Result<Message, TransportError> {
        let local: SocketAddr = match addr {
            SocketAddr::V4(_) => (Ipv4Addr::UNSPECIFIED, 0).into(),
            SocketAddr::V6(_) => (Ipv6Addr::UNSPECIFIED, 0).into(),
        };
        let socket = UdpSocket::bind(local)?;
        socket.set_read_timeout(timeout)?;
        socket.set_write_timeout(timeout)?;
        socket.connect(addr)?;
        socket.send(wire)?;

        // Stray datagrams must not extend the exchange past the timeout
        let deadline = timeout.map(|timeout| Instant::now() + timeout);
        let mut buf = vec![0u8; MAX_UDP_PAYLOAD];
        loop {
            if let Some(deadline) = deadline {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    return Err(io::Error::from(io::ErrorKind::TimedOut).into());
                }
                socket.set_read_timeout(Some(remaining))?;
            }
            let len = socket.recv(&mut buf)?;
            let response = match Message::from_bytes(&buf[..len]) {
                Ok(response) => response,
                Err(e) => {
                    #[cfg(feature = "log")]
                    tracing::trace!(%addr, %e, "Discarding undecodable datagram");
                    continue;
                }
            };
            if response.id() == id {
                return Ok(response);
            }
            #[cfg(feature = "log")]
            tracing::trace!(%addr, expected = id, got = response.id(), "Discarding response with mismatched id");
        }
    }

    fn exchange_tcp(
        &self,
        wire: &[u8],
        addr: SocketAddr,
        timeout: Option<Duration>,
    ) -> Result<Message, TransportError> {
        let mut stream = match timeout {
            Some(timeout) => TcpStream::connect_timeout(&addr, timeout)?,
            None => TcpStream::connect(addr)?,
        };
        stream.set_read_timeout(timeout)?;
        stream.set_write_timeout(timeout)?;

        let len = u16::try_from(wire.len())
            .map_err(|_| io::Error::new(io::ErrorKind::InvalidInput, "query too large"))?;
        let mut framed = Vec::with_capacity(wire.len() + 2);
        framed.extend_from_slice(&len.to_be_bytes());
        framed.extend_from_slice(wire);
        stream.write_all(&framed)?;

        let mut len = [0u8; 2];
        stream.read_exact(&mut len)?;
        let mut buf = vec![0u8; u16::from_be_bytes(len) as usize];
        stream.read_exact(&mut buf)?;
        Ok(Message::from_bytes(&buf)?)
    }
}

impl Exchange for UdpTransport {
    fn exchange(
        &self,
        query: &Message,
        server: &str,
        timeout: Option<Duration>,
    ) -> Result<Message, TransportError> {
        // A zero timeout is rejected by the socket API; treat it as unset
        let timeout = timeout.filter(|t| !t.is_zero());
        let addr = server
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| TransportError::Resolve(server.to_string()))?;
        let wire = query.to_bytes()?;

        let response = self.exchange_udp(&wire, query.id(), addr, timeout)?;
        if !response.truncated() {
            return Ok(response);
        }

        #[cfg(feature = "log")]
        tracing::debug!(%addr, "Truncated response, retrying over TCP");
        self.exchange_tcp(&wire, addr, timeout)
    }
}
