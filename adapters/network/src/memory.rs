//! In-process link used to rehearse duels without sockets.

use std::{
    cell::RefCell,
    collections::VecDeque,
    rc::Rc,
    time::Instant,
};

use crate::{
    protocol::{self, Envelope, Message, FRAME_LEN},
    session::SessionError,
    Link,
};

type Queue = Rc<RefCell<VecDeque<[u8; FRAME_LEN]>>>;

/// One end of a connected in-memory pair.
///
/// Frames go through the wire codec exactly as they would over TCP. Each end
/// tracks its own connection: closing one end queues a `Disconnect`, and the
/// peer drops the link once it receives it.
#[derive(Debug)]
pub struct MemoryLink {
    outbound: Queue,
    inbound: Queue,
    connected: bool,
    epoch: Instant,
}

impl MemoryLink {
    /// Creates two connected ends.
    #[must_use]
    pub fn pair() -> (Self, Self) {
        let forward = Queue::default();
        let backward = Queue::default();
        let epoch = Instant::now();
        (
            Self {
                outbound: Rc::clone(&forward),
                inbound: Rc::clone(&backward),
                connected: true,
                epoch,
            },
            Self {
                outbound: backward,
                inbound: forward,
                connected: true,
                epoch,
            },
        )
    }

    /// Frames waiting to be received by this end.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.inbound.borrow().len()
    }
}

impl Link for MemoryLink {
    fn send(&mut self, message: &Message) -> Result<(), SessionError> {
        if !self.connected {
            return Err(SessionError::Closed);
        }
        let timestamp_ms = u32::try_from(self.epoch.elapsed().as_millis()).unwrap_or(u32::MAX);
        self.outbound.borrow_mut().push_back(protocol::encode(&Envelope {
            timestamp_ms,
            message: *message,
        }));
        Ok(())
    }

    fn receive(&mut self) -> Option<Envelope> {
        if !self.connected {
            return None;
        }
        while let Some(frame) = self.inbound.borrow_mut().pop_front() {
            match protocol::decode(&frame) {
                Ok(envelope) => {
                    if envelope.message == Message::Disconnect {
                        self.connected = false;
                    }
                    return Some(envelope);
                }
                Err(error) => tracing::warn!(%error, "dropping undecodable frame"),
            }
        }
        None
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn close(&mut self) {
        if self.connected {
            let _ = self.send(&Message::Disconnect);
        }
        self.connected = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frames_cross_in_order() {
        let (mut left, mut right) = MemoryLink::pair();
        left.send(&Message::TowerBuild { spot: 1 }).expect("send");
        left.send(&Message::WaveComplete).expect("send");

        assert_eq!(right.pending(), 2);
        assert_eq!(
            right.receive().map(|envelope| envelope.message),
            Some(Message::TowerBuild { spot: 1 })
        );
        assert_eq!(
            right.receive().map(|envelope| envelope.message),
            Some(Message::WaveComplete)
        );
        assert_eq!(right.receive(), None);
        assert_eq!(left.receive(), None);
    }

    #[test]
    fn peer_drains_queued_frames_before_the_disconnect() {
        let (mut left, mut right) = MemoryLink::pair();
        left.send(&Message::TowerBuild { spot: 2 }).expect("send");
        left.close();
        assert!(!left.is_connected());
        assert!(left.send(&Message::Ping).is_err());
        assert!(right.is_connected());

        assert_eq!(
            right.receive().map(|envelope| envelope.message),
            Some(Message::TowerBuild { spot: 2 })
        );
        assert!(right.is_connected());
        assert_eq!(
            right.receive().map(|envelope| envelope.message),
            Some(Message::Disconnect)
        );
        assert!(!right.is_connected());
        assert!(right.send(&Message::Ping).is_err());
        assert_eq!(right.receive(), None);
    }
}
