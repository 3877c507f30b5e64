//! Wire protocol: the three message kinds exchanged per session and their
//! binary codec.
//!
//! Per session the sequence is fixed: one Parameters message (host to
//! guest), one Positions message per side, then an unbounded alternating
//! run of Attack/Outcome pairs. Each message is bincode-encoded; the TCP
//! transport frames it with a big-endian u32 length prefix.

use serde::{Deserialize, Serialize};

use crate::boat::{BoatSpec, Placement};
use crate::common::{AttackOutcome, ValidationError};
use crate::config::{standard_fleet, DEFAULT_HEIGHT, DEFAULT_WIDTH};
use crate::grid::Coordinates;

/// Game parameters, fixed by the host and transmitted once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameters {
    pub width: u16,
    pub height: u16,
    pub fleet: Vec<BoatSpec>,
}

impl Parameters {
    /// The default 10x10 game with the standard fleet.
    pub fn standard() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            fleet: standard_fleet(),
        }
    }

    /// Total number of boat cells in the fleet.
    pub fn fleet_cells(&self) -> u32 {
        self.fleet.iter().map(|s| u32::from(s.size)).sum()
    }

    /// Check that a game with these parameters is playable: nonzero
    /// dimensions, a nonempty fleet, every boat at least one cell and no
    /// longer than the longer grid axis, and a fleet that fits the area.
    pub fn validate(&self) -> Result<(), ProtocolError> {
        if self.width == 0 || self.height == 0 {
            return Err(ProtocolError::InvalidParameters("grid dimensions must be nonzero"));
        }
        if self.fleet.is_empty() {
            return Err(ProtocolError::InvalidParameters("fleet must not be empty"));
        }
        let longest_axis = self.width.max(self.height);
        for spec in &self.fleet {
            if spec.size == 0 {
                return Err(ProtocolError::InvalidParameters("boat size must be at least 1"));
            }
            if u16::from(spec.size) > longest_axis {
                return Err(ProtocolError::InvalidParameters("boat does not fit the grid"));
            }
        }
        if self.fleet_cells() > u32::from(self.width) * u32::from(self.height) {
            return Err(ProtocolError::InvalidParameters("fleet does not fit the grid area"));
        }
        Ok(())
    }
}

/// Messages exchanged between the two sides of a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Message {
    /// Game parameters, host to guest only.
    Parameters(Parameters),
    /// The sender's complete fleet placement.
    Positions(Vec<Placement>),
    /// An attack on the receiver's grid.
    Attack { target: Coordinates },
    /// The resolved outcome of the peer's last attack.
    Outcome {
        target: Coordinates,
        outcome: AttackOutcome,
    },
}

/// Encode a message body for transmission.
pub fn encode(msg: &Message) -> Result<Vec<u8>, ProtocolError> {
    bincode::serialize(msg).map_err(|e| ProtocolError::Encode(e.to_string()))
}

/// Decode a received message body. Anything unrecognized is fatal to the
/// connection.
pub fn decode(bytes: &[u8]) -> Result<Message, ProtocolError> {
    bincode::deserialize(bytes).map_err(|e| ProtocolError::Malformed(e.to_string()))
}

/// Fatal protocol failures: the session aborts and the connection is torn
/// down, no recovery in place.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    /// A message failed to serialize.
    Encode(String),
    /// A received frame did not decode to a known message.
    Malformed(String),
    /// A well-formed message arrived outside the allowed sequence.
    Unexpected(&'static str),
    /// Received parameters that do not describe a playable game.
    InvalidParameters(&'static str),
    /// The peer's placements do not match the negotiated fleet.
    FleetMismatch,
    /// The peer attacked when it was not its turn.
    OutOfTurn,
    /// The peer's attack was invalid against the local grid.
    InvalidAttack(ValidationError),
    /// An outcome arrived that matches no outstanding attack.
    UnexpectedOutcome,
}

impl core::fmt::Display for ProtocolError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ProtocolError::Encode(e) => write!(f, "failed to encode message: {}", e),
            ProtocolError::Malformed(e) => write!(f, "malformed message: {}", e),
            ProtocolError::Unexpected(what) => write!(f, "unexpected message: {}", what),
            ProtocolError::InvalidParameters(why) => write!(f, "invalid parameters: {}", why),
            ProtocolError::FleetMismatch => {
                write!(f, "peer placements do not match the negotiated fleet")
            }
            ProtocolError::OutOfTurn => write!(f, "peer attacked out of turn"),
            ProtocolError::InvalidAttack(e) => write!(f, "invalid attack from peer: {}", e),
            ProtocolError::UnexpectedOutcome => {
                write!(f, "outcome does not match any outstanding attack")
            }
        }
    }
}

impl std::error::Error for ProtocolError {}
