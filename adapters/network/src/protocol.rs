//! Fixed-size binary frames exchanged between the two peers of a duel.
//!
//! Every frame is exactly [`FRAME_LEN`] bytes, little-endian:
//! `version:u8 | type:u8 | timestamp:u32 | payload_len:u16 | payload:[u8; 504]`.

use thiserror::Error;
use tower_duel_core::{Phase, TowerLevel};

/// Size of every frame on the wire.
pub const FRAME_LEN: usize = 512;

/// Bytes preceding the payload.
pub const HEADER_LEN: usize = 8;

/// Bytes available to a message payload.
pub const PAYLOAD_CAPACITY: usize = FRAME_LEN - HEADER_LEN;

/// Protocol revision stamped into every frame.
pub const PROTOCOL_VERSION: u8 = 1;

const WAVE_NONE: i16 = -1;

/// Discriminant of a frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum MessageType {
    /// Keep-alive.
    Ping,
    /// A tower was built.
    TowerBuild,
    /// A tower was upgraded.
    TowerUpgrade,
    /// Enemies were bought for the opponent.
    SendEnemies,
    /// The sender finished its current wave.
    WaveComplete,
    /// The sender started a wave.
    WaveStart,
    /// Periodic snapshot of the sender's match.
    GameSync,
    /// The sender is leaving.
    Disconnect,
}

impl MessageType {
    /// Code written to the type byte.
    #[must_use]
    pub const fn code(self) -> u8 {
        match self {
            Self::Ping => 1,
            Self::TowerBuild => 2,
            Self::TowerUpgrade => 3,
            Self::SendEnemies => 4,
            Self::WaveComplete => 5,
            Self::WaveStart => 6,
            Self::GameSync => 7,
            Self::Disconnect => 8,
        }
    }

    /// Resolves a type byte.
    #[must_use]
    pub const fn from_code(code: u8) -> Option<Self> {
        Some(match code {
            1 => Self::Ping,
            2 => Self::TowerBuild,
            3 => Self::TowerUpgrade,
            4 => Self::SendEnemies,
            5 => Self::WaveComplete,
            6 => Self::WaveStart,
            7 => Self::GameSync,
            8 => Self::Disconnect,
            _ => return None,
        })
    }
}

/// Summary of a match sent once per second.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GameSnapshot {
    /// Sender's gold.
    pub money: u32,
    /// Sender's remaining lives.
    pub lives: i32,
    /// Sender's wave; `None` before the first wave. Encoded as a signed
    /// 16-bit value, saturating at `i16::MAX`.
    pub wave: Option<u16>,
    /// Enemies on the sender's field.
    pub enemies_alive: u16,
    /// Sender's kill count.
    pub enemies_defeated: u32,
    /// Sender's lifecycle phase.
    pub phase: Phase,
}

/// A decoded protocol message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Message {
    /// Keep-alive.
    Ping,
    /// The sender built a tower on the spot.
    TowerBuild {
        /// Spot index.
        spot: u8,
    },
    /// The sender upgraded the tower on the spot.
    TowerUpgrade {
        /// Spot index.
        spot: u8,
        /// Level the tower reached.
        level: TowerLevel,
    },
    /// The sender bought enemies for the receiver.
    SendEnemies {
        /// Number of enemies to spawn.
        count: u8,
    },
    /// The sender has spawned out and cleared its current wave.
    WaveComplete,
    /// The sender started the wave.
    WaveStart {
        /// Index of the started wave.
        wave: u16,
    },
    /// Snapshot of the sender's match.
    GameSync(GameSnapshot),
    /// The sender is leaving.
    Disconnect,
}

impl Message {
    /// Discriminant of the message.
    #[must_use]
    pub const fn message_type(&self) -> MessageType {
        match self {
            Self::Ping => MessageType::Ping,
            Self::TowerBuild { .. } => MessageType::TowerBuild,
            Self::TowerUpgrade { .. } => MessageType::TowerUpgrade,
            Self::SendEnemies { .. } => MessageType::SendEnemies,
            Self::WaveComplete => MessageType::WaveComplete,
            Self::WaveStart { .. } => MessageType::WaveStart,
            Self::GameSync(_) => MessageType::GameSync,
            Self::Disconnect => MessageType::Disconnect,
        }
    }
}

/// A message together with its send time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Envelope {
    /// Milliseconds since the sender's session started.
    pub timestamp_ms: u32,
    /// The carried message.
    pub message: Message,
}

/// Reasons a frame cannot be decoded.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum WireError {
    /// The frame was produced by another protocol revision.
    #[error("unsupported protocol version {0}")]
    UnsupportedVersion(u8),
    /// The type byte names no known message.
    #[error("unknown message type {0}")]
    UnknownType(u8),
    /// The declared payload length exceeds the frame.
    #[error("payload length {0} exceeds frame capacity")]
    PayloadTooLong(u16),
    /// The payload is shorter than its message requires.
    #[error("{kind:?} payload needs {needed} bytes, got {available}")]
    Truncated {
        /// Message being decoded.
        kind: MessageType,
        /// Bytes required.
        needed: usize,
        /// Bytes declared.
        available: usize,
    },
    /// A tower level byte is out of range.
    #[error("invalid tower level {0}")]
    InvalidLevel(u8),
    /// A phase byte is out of range.
    #[error("invalid phase {0}")]
    InvalidPhase(u8),
}

/// Encodes the envelope into a full frame.
#[must_use]
pub fn encode(envelope: &Envelope) -> [u8; FRAME_LEN] {
    let mut payload = Vec::with_capacity(32);
    match envelope.message {
        Message::Ping | Message::WaveComplete | Message::Disconnect => {}
        Message::TowerBuild { spot } => payload.push(spot),
        Message::TowerUpgrade { spot, level } => payload.extend([spot, level.index()]),
        Message::SendEnemies { count } => payload.push(count),
        Message::WaveStart { wave } => payload.extend(wave.to_le_bytes()),
        Message::GameSync(snapshot) => {
            let wave = snapshot
                .wave
                .map_or(WAVE_NONE, |wave| i16::try_from(wave).unwrap_or(i16::MAX));
            payload.extend(snapshot.money.to_le_bytes());
            payload.extend(snapshot.lives.to_le_bytes());
            payload.extend(wave.to_le_bytes());
            payload.extend(snapshot.enemies_alive.to_le_bytes());
            payload.extend(snapshot.enemies_defeated.to_le_bytes());
            payload.push(phase_code(snapshot.phase));
        }
    }

    let mut frame = [0u8; FRAME_LEN];
    frame[0] = PROTOCOL_VERSION;
    frame[1] = envelope.message.message_type().code();
    frame[2..6].copy_from_slice(&envelope.timestamp_ms.to_le_bytes());
    frame[6..8].copy_from_slice(&(payload.len() as u16).to_le_bytes());
    frame[HEADER_LEN..HEADER_LEN + payload.len()].copy_from_slice(&payload);
    frame
}

/// Decodes a full frame.
pub fn decode(frame: &[u8; FRAME_LEN]) -> Result<Envelope, WireError> {
    if frame[0] != PROTOCOL_VERSION {
        return Err(WireError::UnsupportedVersion(frame[0]));
    }
    let kind = MessageType::from_code(frame[1]).ok_or(WireError::UnknownType(frame[1]))?;
    let timestamp_ms = u32::from_le_bytes([frame[2], frame[3], frame[4], frame[5]]);
    let declared = u16::from_le_bytes([frame[6], frame[7]]);
    if usize::from(declared) > PAYLOAD_CAPACITY {
        return Err(WireError::PayloadTooLong(declared));
    }
    let mut reader = Reader {
        kind,
        payload: &frame[HEADER_LEN..HEADER_LEN + usize::from(declared)],
        offset: 0,
    };

    let message = match kind {
        MessageType::Ping => Message::Ping,
        MessageType::WaveComplete => Message::WaveComplete,
        MessageType::Disconnect => Message::Disconnect,
        MessageType::TowerBuild => Message::TowerBuild {
            spot: reader.u8()?,
        },
        MessageType::TowerUpgrade => {
            let spot = reader.u8()?;
            let level = reader.u8()?;
            Message::TowerUpgrade {
                spot,
                level: TowerLevel::from_index(level).ok_or(WireError::InvalidLevel(level))?,
            }
        }
        MessageType::SendEnemies => Message::SendEnemies {
            count: reader.u8()?,
        },
        MessageType::WaveStart => Message::WaveStart {
            wave: u16::from_le_bytes(reader.bytes()?),
        },
        MessageType::GameSync => {
            let money = u32::from_le_bytes(reader.bytes()?);
            let lives = i32::from_le_bytes(reader.bytes()?);
            let wave = i16::from_le_bytes(reader.bytes()?);
            let enemies_alive = u16::from_le_bytes(reader.bytes()?);
            let enemies_defeated = u32::from_le_bytes(reader.bytes()?);
            let phase = reader.u8()?;
            Message::GameSync(GameSnapshot {
                money,
                lives,
                wave: u16::try_from(wave).ok(),
                enemies_alive,
                enemies_defeated,
                phase: phase_from_code(phase).ok_or(WireError::InvalidPhase(phase))?,
            })
        }
    };

    Ok(Envelope {
        timestamp_ms,
        message,
    })
}

struct Reader<'a> {
    kind: MessageType,
    payload: &'a [u8],
    offset: usize,
}

impl Reader<'_> {
    fn bytes<const N: usize>(&mut self) -> Result<[u8; N], WireError> {
        let end = self.offset + N;
        let bytes = self
            .payload
            .get(self.offset..end)
            .and_then(|slice| <[u8; N]>::try_from(slice).ok())
            .ok_or(WireError::Truncated {
                kind: self.kind,
                needed: end,
                available: self.payload.len(),
            })?;
        self.offset = end;
        Ok(bytes)
    }

    fn u8(&mut self) -> Result<u8, WireError> {
        self.bytes::<1>().map(|[byte]| byte)
    }
}

const fn phase_code(phase: Phase) -> u8 {
    match phase {
        Phase::Start => 0,
        Phase::Playing => 1,
        Phase::WaveBreak => 2,
        Phase::GameOver => 3,
    }
}

const fn phase_from_code(code: u8) -> Option<Phase> {
    match code {
        0 => Some(Phase::Start),
        1 => Some(Phase::Playing),
        2 => Some(Phase::WaveBreak),
        3 => Some(Phase::GameOver),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn envelope(message: Message) -> Envelope {
        Envelope {
            timestamp_ms: 123_456,
            message,
        }
    }

    #[test]
    fn roundtrip_every_message_type() {
        let messages = [
            Message::Ping,
            Message::TowerBuild { spot: 2 },
            Message::TowerUpgrade {
                spot: 3,
                level: TowerLevel::Level1,
            },
            Message::SendEnemies { count: 10 },
            Message::WaveComplete,
            Message::WaveStart { wave: 14 },
            Message::GameSync(GameSnapshot {
                money: 1_250,
                lives: -2,
                wave: Some(7),
                enemies_alive: 12,
                enemies_defeated: 340,
                phase: Phase::WaveBreak,
            }),
            Message::Disconnect,
        ];
        for message in messages {
            let sent = envelope(message);
            let decoded = decode(&encode(&sent)).expect("decode");
            assert_eq!(decoded, sent);
        }
    }

    #[test]
    fn frame_header_layout() {
        let frame = encode(&envelope(Message::WaveStart { wave: 0x0102 }));
        assert_eq!(frame.len(), FRAME_LEN);
        assert_eq!(frame[0], PROTOCOL_VERSION);
        assert_eq!(frame[1], 6);
        assert_eq!(&frame[2..6], &123_456u32.to_le_bytes());
        assert_eq!(&frame[6..8], &[2, 0]);
        assert_eq!(&frame[8..10], &[0x02, 0x01]);
        assert!(frame[10..].iter().all(|byte| *byte == 0));
    }

    #[test]
    fn snapshot_without_wave_uses_negative_one() {
        let snapshot = GameSnapshot {
            money: 0,
            lives: 100,
            wave: None,
            enemies_alive: 0,
            enemies_defeated: 0,
            phase: Phase::Start,
        };
        let frame = encode(&envelope(Message::GameSync(snapshot)));
        assert_eq!(&frame[16..18], &(-1i16).to_le_bytes());
        let decoded = decode(&frame).expect("decode");
        assert_eq!(decoded.message, Message::GameSync(snapshot));
    }

    #[test]
    fn rejects_foreign_frames() {
        let mut frame = encode(&envelope(Message::Ping));
        frame[0] = 9;
        assert_eq!(decode(&frame), Err(WireError::UnsupportedVersion(9)));

        let mut frame = encode(&envelope(Message::Ping));
        frame[1] = 42;
        assert_eq!(decode(&frame), Err(WireError::UnknownType(42)));

        let mut frame = encode(&envelope(Message::Ping));
        frame[6..8].copy_from_slice(&600u16.to_le_bytes());
        assert_eq!(decode(&frame), Err(WireError::PayloadTooLong(600)));
    }

    #[test]
    fn rejects_short_and_invalid_payloads() {
        let mut frame = encode(&envelope(Message::TowerUpgrade {
            spot: 1,
            level: TowerLevel::Level1,
        }));
        frame[6..8].copy_from_slice(&1u16.to_le_bytes());
        assert_eq!(
            decode(&frame),
            Err(WireError::Truncated {
                kind: MessageType::TowerUpgrade,
                needed: 2,
                available: 1
            })
        );

        let mut frame = encode(&envelope(Message::TowerUpgrade {
            spot: 1,
            level: TowerLevel::Level1,
        }));
        frame[9] = 5;
        assert_eq!(decode(&frame), Err(WireError::InvalidLevel(5)));
    }
}
