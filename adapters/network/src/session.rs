//! TCP session carrying protocol frames between the two peers.

use std::{
    io::{self, Read, Write},
    net::{SocketAddr, TcpListener, TcpStream, ToSocketAddrs},
    time::{Duration, Instant},
};

use thiserror::Error;

use crate::{
    protocol::{self, Envelope, Message, FRAME_LEN},
    Link,
};

/// Port the host listens on unless configured otherwise.
pub const DEFAULT_GAME_PORT: u16 = 7777;

const DEFAULT_FRAME_WINDOW: Duration = Duration::from_millis(250);

/// Lifecycle of a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SessionStatus {
    /// Nothing opened yet.
    Idle,
    /// Host waiting for the peer to connect.
    Listening,
    /// Client dialling the host.
    Connecting,
    /// Frames may flow in both directions.
    Connected,
    /// The session ended; nothing more will be sent or received.
    Closed,
}

/// Failures opening or using a session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The listening socket could not be opened.
    #[error("failed to listen on {address}")]
    Bind {
        /// Requested listen address.
        address: String,
        /// Underlying failure.
        #[source]
        source: io::Error,
    },
    /// The host could not be reached.
    #[error("failed to connect to {address}")]
    Connect {
        /// Host address.
        address: SocketAddr,
        /// Underlying failure.
        #[source]
        source: io::Error,
    },
    /// The session is not connected.
    #[error("session is closed")]
    Closed,
    /// A transport failure on an established session.
    #[error(transparent)]
    Io(#[from] io::Error),
}

/// Tunables for a session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionConfig {
    /// Empty accept polls after which a host gives up; `None` waits forever.
    pub accept_attempt_limit: Option<u32>,
    /// Upper bound on a client's connect; `None` uses the OS default.
    pub connect_timeout: Option<Duration>,
    /// Time allowed to finish a frame once its first bytes arrived, and to
    /// write a full frame.
    pub frame_window: Duration,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            accept_attempt_limit: None,
            connect_timeout: None,
            frame_window: DEFAULT_FRAME_WINDOW,
        }
    }
}

/// One end of a duel connection.
#[derive(Debug)]
pub struct Session {
    status: SessionStatus,
    listener: Option<TcpListener>,
    stream: Option<TcpStream>,
    config: SessionConfig,
    epoch: Instant,
    empty_polls: u32,
}

impl Default for Session {
    fn default() -> Self {
        Self::with_status(SessionStatus::Idle, SessionConfig::default())
    }
}

impl Session {
    fn with_status(status: SessionStatus, config: SessionConfig) -> Self {
        Self {
            status,
            listener: None,
            stream: None,
            config,
            epoch: Instant::now(),
            empty_polls: 0,
        }
    }

    /// Opens a non-blocking listener and waits for a peer.
    pub fn host<A>(address: A, config: SessionConfig) -> Result<Self, SessionError>
    where
        A: ToSocketAddrs + std::fmt::Debug,
    {
        let bind_error = |source| SessionError::Bind {
            address: format!("{address:?}"),
            source,
        };
        let listener = TcpListener::bind(&address).map_err(bind_error)?;
        listener.set_nonblocking(true).map_err(bind_error)?;
        tracing::info!(address = ?listener.local_addr().ok(), "hosting duel");

        let mut session = Self::with_status(SessionStatus::Listening, config);
        session.listener = Some(listener);
        Ok(session)
    }

    /// Dials the host, blocking until connected or failed.
    pub fn connect(address: SocketAddr, config: SessionConfig) -> Result<Self, SessionError> {
        let mut session = Self::with_status(SessionStatus::Connecting, config);
        let connect_error = |source| SessionError::Connect { address, source };
        let stream = match config.connect_timeout {
            Some(timeout) => TcpStream::connect_timeout(&address, timeout),
            None => TcpStream::connect(address),
        }
        .map_err(connect_error)?;
        session.attach(stream).map_err(connect_error)?;
        tracing::info!(%address, "connected to host");
        Ok(session)
    }

    fn attach(&mut self, stream: TcpStream) -> io::Result<()> {
        stream.set_nonblocking(false)?;
        stream.set_nodelay(true)?;
        stream.set_read_timeout(Some(self.config.frame_window))?;
        stream.set_write_timeout(Some(self.config.frame_window))?;
        self.stream = Some(stream);
        self.status = SessionStatus::Connected;
        self.epoch = Instant::now();
        Ok(())
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn status(&self) -> SessionStatus {
        self.status
    }

    /// Address the listener is bound to, while listening.
    #[must_use]
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.listener
            .as_ref()
            .and_then(|listener| listener.local_addr().ok())
            .or_else(|| self.stream.as_ref().and_then(|s| s.local_addr().ok()))
    }

    /// Checks once for a waiting peer without blocking.
    ///
    /// On success the listener is dropped and the session is connected.
    pub fn poll_accept(&mut self) -> SessionStatus {
        if self.status != SessionStatus::Listening {
            return self.status;
        }
        let Some(listener) = self.listener.as_ref() else {
            self.status = SessionStatus::Closed;
            return self.status;
        };

        match listener.accept() {
            Ok((stream, peer)) => {
                self.listener = None;
                match self.attach(stream) {
                    Ok(()) => tracing::info!(%peer, "peer connected"),
                    Err(error) => {
                        tracing::warn!(%error, %peer, "failed to configure peer stream");
                        self.status = SessionStatus::Closed;
                    }
                }
            }
            Err(error) if error.kind() == io::ErrorKind::WouldBlock => {
                self.empty_polls = self.empty_polls.saturating_add(1);
                if self
                    .config
                    .accept_attempt_limit
                    .is_some_and(|limit| self.empty_polls >= limit)
                {
                    tracing::info!(attempts = self.empty_polls, "no peer arrived, giving up");
                    self.shut_down();
                }
            }
            Err(error) => {
                tracing::warn!(%error, "accept failed");
                self.shut_down();
            }
        }
        self.status
    }

    fn timestamp(&self) -> u32 {
        u32::try_from(self.epoch.elapsed().as_millis()).unwrap_or(u32::MAX)
    }

    fn write_frame(&mut self, message: &Message) -> Result<(), SessionError> {
        let frame = protocol::encode(&Envelope {
            timestamp_ms: self.timestamp(),
            message: *message,
        });
        let stream = self.stream.as_mut().ok_or(SessionError::Closed)?;
        stream.write_all(&frame)?;
        stream.flush()?;
        Ok(())
    }

    fn read_frame(&mut self) -> io::Result<Option<[u8; FRAME_LEN]>> {
        let Some(stream) = self.stream.as_mut() else {
            return Ok(None);
        };
        let mut frame = [0u8; FRAME_LEN];

        stream.set_nonblocking(true)?;
        let first = stream.read(&mut frame);
        stream.set_nonblocking(false)?;

        let received = match first {
            Ok(0) => return Err(io::ErrorKind::UnexpectedEof.into()),
            Ok(received) => received,
            Err(error)
                if matches!(
                    error.kind(),
                    io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
                ) =>
            {
                return Ok(None)
            }
            Err(error) => return Err(error),
        };
        if received < FRAME_LEN {
            stream.read_exact(&mut frame[received..])?;
        }
        Ok(Some(frame))
    }

    fn shut_down(&mut self) {
        self.listener = None;
        self.stream = None;
        self.status = SessionStatus::Closed;
    }
}

impl Link for Session {
    fn send(&mut self, message: &Message) -> Result<(), SessionError> {
        if self.status != SessionStatus::Connected {
            return Err(SessionError::Closed);
        }
        if let Err(error) = self.write_frame(message) {
            tracing::warn!(%error, "send failed, closing session");
            self.shut_down();
            return Err(error);
        }
        Ok(())
    }

    fn receive(&mut self) -> Option<Envelope> {
        if self.status != SessionStatus::Connected {
            return None;
        }
        loop {
            let frame = match self.read_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => return None,
                Err(error) => {
                    tracing::warn!(%error, "connection lost");
                    self.shut_down();
                    return None;
                }
            };
            match protocol::decode(&frame) {
                Ok(envelope) => {
                    if envelope.message == Message::Disconnect {
                        tracing::info!("peer disconnected");
                        self.shut_down();
                    }
                    return Some(envelope);
                }
                Err(error) => tracing::warn!(%error, "dropping undecodable frame"),
            }
        }
    }

    fn is_connected(&self) -> bool {
        self.status == SessionStatus::Connected
    }

    fn close(&mut self) {
        if self.status == SessionStatus::Connected {
            if let Err(error) = self.write_frame(&Message::Disconnect) {
                tracing::debug!(%error, "disconnect notice not delivered");
            }
        }
        self.shut_down();
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.close();
    }
}
