//! LAN session discovery over UDP broadcast.
//!
//! A host answers every valid request with its name and game port. A client
//! broadcasts one request and collects answers until its deadline.

use std::{
    collections::HashSet,
    io,
    net::{IpAddr, Ipv4Addr, SocketAddr, UdpSocket},
    time::{Duration, Instant},
};

use thiserror::Error;

/// UDP port hosts listen on for discovery requests.
pub const DISCOVERY_PORT: u16 = 47777;

/// Marker identifying discovery datagrams.
pub const DISCOVERY_MAGIC: u32 = 0x5444_5344;

/// Capacity of the host name field, including the terminating NUL.
pub const HOST_NAME_LEN: usize = 64;

/// Size of every discovery datagram.
pub const PACKET_LEN: usize = 4 + 1 + HOST_NAME_LEN + 2;

const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Direction of a discovery datagram.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum PacketKind {
    /// A client looking for hosts.
    Request,
    /// A host announcing itself.
    Response,
}

/// A discovery datagram.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DiscoveryPacket {
    /// Direction of the datagram.
    pub kind: PacketKind,
    /// Name the host advertises; empty in requests.
    pub host_name: String,
    /// TCP port of the advertised game; zero in requests.
    pub game_port: u16,
}

/// Failures while discovering sessions.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// The datagram is not [`PACKET_LEN`] bytes long.
    #[error("discovery packet has {0} bytes")]
    WrongLength(usize),
    /// The datagram does not carry the discovery marker.
    #[error("bad discovery magic {0:#010x}")]
    BadMagic(u32),
    /// The direction byte is out of range.
    #[error("unknown discovery packet kind {0}")]
    UnknownKind(u8),
    /// A socket operation failed.
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl DiscoveryPacket {
    /// A request as broadcast by clients.
    #[must_use]
    pub fn request() -> Self {
        Self {
            kind: PacketKind::Request,
            host_name: String::new(),
            game_port: 0,
        }
    }

    /// Serializes the packet; names longer than the field are truncated.
    #[must_use]
    pub fn encode(&self) -> [u8; PACKET_LEN] {
        let mut packet = [0u8; PACKET_LEN];
        packet[0..4].copy_from_slice(&DISCOVERY_MAGIC.to_le_bytes());
        packet[4] = match self.kind {
            PacketKind::Request => 0,
            PacketKind::Response => 1,
        };
        let name = self.host_name.as_bytes();
        let name_len = name.len().min(HOST_NAME_LEN - 1);
        packet[5..5 + name_len].copy_from_slice(&name[..name_len]);
        packet[5 + HOST_NAME_LEN..].copy_from_slice(&self.game_port.to_le_bytes());
        packet
    }

    /// Parses a received datagram.
    pub fn decode(datagram: &[u8]) -> Result<Self, DiscoveryError> {
        let packet: &[u8; PACKET_LEN] = datagram
            .try_into()
            .map_err(|_| DiscoveryError::WrongLength(datagram.len()))?;
        let magic = u32::from_le_bytes([packet[0], packet[1], packet[2], packet[3]]);
        if magic != DISCOVERY_MAGIC {
            return Err(DiscoveryError::BadMagic(magic));
        }
        let kind = match packet[4] {
            0 => PacketKind::Request,
            1 => PacketKind::Response,
            other => return Err(DiscoveryError::UnknownKind(other)),
        };
        let field = &packet[5..5 + HOST_NAME_LEN];
        let end = field.iter().position(|byte| *byte == 0).unwrap_or(field.len());
        let game_port = u16::from_le_bytes([packet[5 + HOST_NAME_LEN], packet[6 + HOST_NAME_LEN]]);
        Ok(Self {
            kind,
            host_name: String::from_utf8_lossy(&field[..end]).into_owned(),
            game_port,
        })
    }
}

/// A host found on the network.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DiscoveredSession {
    /// Name the host advertised.
    pub name: String,
    /// Address the answer came from.
    pub ip: IpAddr,
    /// Game port the host listens on.
    pub port: u16,
}

impl DiscoveredSession {
    /// Address to connect the game session to.
    #[must_use]
    pub fn address(&self) -> SocketAddr {
        SocketAddr::new(self.ip, self.port)
    }
}

/// Host side of discovery: answers requests without blocking.
#[derive(Debug)]
pub struct DiscoveryHost {
    socket: UdpSocket,
    announcement: [u8; PACKET_LEN],
}

impl DiscoveryHost {
    /// Listens for requests on `port` and advertises `host_name` with
    /// `game_port`.
    pub fn bind(port: u16, host_name: &str, game_port: u16) -> Result<Self, DiscoveryError> {
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, port))?;
        socket.set_nonblocking(true)?;
        let announcement = DiscoveryPacket {
            kind: PacketKind::Response,
            host_name: host_name.to_owned(),
            game_port,
        }
        .encode();
        tracing::info!(port, host_name, game_port, "answering discovery requests");
        Ok(Self {
            socket,
            announcement,
        })
    }

    /// Port the host listens on.
    pub fn local_port(&self) -> Result<u16, DiscoveryError> {
        Ok(self.socket.local_addr()?.port())
    }

    /// Answers every pending request and returns how many were answered.
    pub fn poll(&mut self) -> Result<usize, DiscoveryError> {
        let mut answered = 0;
        let mut buffer = [0u8; PACKET_LEN + 1];
        loop {
            let (received, peer) = match self.socket.recv_from(&mut buffer) {
                Ok(datagram) => datagram,
                Err(error) if error.kind() == io::ErrorKind::WouldBlock => return Ok(answered),
                Err(error) => return Err(error.into()),
            };
            match DiscoveryPacket::decode(&buffer[..received]) {
                Ok(packet) if packet.kind == PacketKind::Request => {
                    let _sent = self.socket.send_to(&self.announcement, peer)?;
                    answered += 1;
                    tracing::debug!(%peer, "answered discovery request");
                }
                Ok(_) => {}
                Err(error) => tracing::debug!(%error, %peer, "ignoring datagram"),
            }
        }
    }
}

/// Broadcasts a request on the local network and collects answers.
pub fn find_sessions(
    port: u16,
    timeout: Duration,
    max_sessions: usize,
) -> Result<Vec<DiscoveredSession>, DiscoveryError> {
    find_sessions_at(
        SocketAddr::new(IpAddr::V4(Ipv4Addr::BROADCAST), port),
        timeout,
        max_sessions,
    )
}

/// Sends a request to `target` and collects answers until `timeout` elapses
/// or `max_sessions` distinct hosts answered.
pub fn find_sessions_at(
    target: SocketAddr,
    timeout: Duration,
    max_sessions: usize,
) -> Result<Vec<DiscoveredSession>, DiscoveryError> {
    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0))?;
    socket.set_broadcast(true)?;
    socket.set_read_timeout(Some(POLL_INTERVAL))?;
    let _sent = socket.send_to(&DiscoveryPacket::request().encode(), target)?;

    let deadline = Instant::now() + timeout;
    let mut seen = HashSet::new();
    let mut sessions = Vec::new();
    let mut buffer = [0u8; PACKET_LEN + 1];

    while Instant::now() < deadline && sessions.len() < max_sessions {
        let (received, peer) = match socket.recv_from(&mut buffer) {
            Ok(datagram) => datagram,
            Err(error)
                if matches!(
                    error.kind(),
                    io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut
                ) =>
            {
                continue
            }
            Err(error) => return Err(error.into()),
        };
        let packet = match DiscoveryPacket::decode(&buffer[..received]) {
            Ok(packet) if packet.kind == PacketKind::Response => packet,
            Ok(_) => continue,
            Err(error) => {
                tracing::debug!(%error, %peer, "ignoring datagram");
                continue;
            }
        };
        let session = DiscoveredSession {
            name: packet.host_name,
            ip: peer.ip(),
            port: packet.game_port,
        };
        if seen.insert(session.address()) {
            tracing::debug!(name = %session.name, address = %session.address(), "session found");
            sessions.push(session);
        }
    }
    Ok(sessions)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn packet_layout_is_seventy_one_bytes() {
        let packet = DiscoveryPacket {
            kind: PacketKind::Response,
            host_name: "lan-box".to_owned(),
            game_port: 7777,
        };
        let bytes = packet.encode();
        assert_eq!(bytes.len(), 71);
        assert_eq!(&bytes[0..4], &0x5444_5344u32.to_le_bytes());
        assert_eq!(bytes[4], 1);
        assert_eq!(&bytes[5..12], b"lan-box");
        assert_eq!(bytes[12], 0);
        assert_eq!(&bytes[69..71], &7777u16.to_le_bytes());
        assert_eq!(DiscoveryPacket::decode(&bytes).expect("decode"), packet);
    }

    #[test]
    fn long_names_keep_a_terminator() {
        let packet = DiscoveryPacket {
            kind: PacketKind::Response,
            host_name: "x".repeat(100),
            game_port: 1,
        };
        let decoded = DiscoveryPacket::decode(&packet.encode()).expect("decode");
        assert_eq!(decoded.host_name.len(), HOST_NAME_LEN - 1);
    }

    #[test]
    fn rejects_foreign_datagrams() {
        assert!(matches!(
            DiscoveryPacket::decode(&[0u8; 12]),
            Err(DiscoveryError::WrongLength(12))
        ));
        let mut bytes = DiscoveryPacket::request().encode();
        bytes[0] = 0;
        assert!(matches!(
            DiscoveryPacket::decode(&bytes),
            Err(DiscoveryError::BadMagic(_))
        ));
        let mut bytes = DiscoveryPacket::request().encode();
        bytes[4] = 7;
        assert!(matches!(
            DiscoveryPacket::decode(&bytes),
            Err(DiscoveryError::UnknownKind(7))
        ));
    }
}
