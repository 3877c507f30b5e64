//! Common types shared across the crate: attack outcomes and validation errors.

use serde::{Deserialize, Serialize};

use crate::boat::BoatKind;

/// Result of resolving one attack against a grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttackOutcome {
    /// The attack missed every boat.
    Miss,
    /// The attack hit a boat that still has unhit cells.
    Hit,
    /// The attack hit the last unhit cell of a boat, sinking it.
    Sunk(BoatKind),
}

/// Errors returned for rejected local actions. The action is reported back
/// to the caller synchronously and session state is left untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    /// The action is not valid in the session's current phase.
    WrongPhase,
    /// A placement or attack target lies outside the grid.
    OutOfBounds,
    /// A placement overlaps a boat already on the grid.
    Overlap,
    /// The requested boat kind is not part of the negotiated fleet.
    UnknownKind,
    /// Every boat of the requested kind has already been placed.
    KindExhausted,
    /// The target cell was already attacked.
    AlreadyAttacked,
    /// It is not the local side's turn to attack.
    NotYourTurn,
    /// No free position was found for a random placement.
    UnableToPlace,
}

impl core::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ValidationError::WrongPhase => write!(f, "action is not valid in the current phase"),
            ValidationError::OutOfBounds => write!(f, "target is outside the grid"),
            ValidationError::Overlap => write!(f, "placement overlaps another boat"),
            ValidationError::UnknownKind => write!(f, "boat kind is not part of the fleet"),
            ValidationError::KindExhausted => write!(f, "all boats of this kind are already placed"),
            ValidationError::AlreadyAttacked => write!(f, "cell was already attacked"),
            ValidationError::NotYourTurn => write!(f, "it is not your turn"),
            ValidationError::UnableToPlace => write!(f, "unable to find a free position"),
        }
    }
}

impl std::error::Error for ValidationError {}
