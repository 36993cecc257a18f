#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Networking for two-player duels: the fixed-frame wire protocol, the TCP
//! session, LAN discovery and an in-memory link for local rehearsal.
//!
//! Everything here is synchronous and polled from the frame loop. Accepting
//! and receiving never block; sending blocks for at most one frame window.

pub mod discovery;
pub mod memory;
pub mod protocol;
pub mod session;

pub use discovery::{DiscoveredSession, DiscoveryError, DiscoveryHost};
pub use memory::MemoryLink;
pub use protocol::{Envelope, GameSnapshot, Message, MessageType, WireError};
pub use session::{Session, SessionConfig, SessionError, SessionStatus};

/// Bidirectional message channel to the opponent.
pub trait Link {
    /// Sends a message. A failure closes the link.
    fn send(&mut self, message: &Message) -> Result<(), SessionError>;

    /// Returns the next received message, if one is waiting.
    fn receive(&mut self) -> Option<Envelope>;

    /// Reports whether messages can still flow.
    fn is_connected(&self) -> bool;

    /// Notifies the peer on a best-effort basis and closes the link.
    fn close(&mut self);
}
