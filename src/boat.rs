//! Boat catalogue and placement geometry.

use serde::{Deserialize, Serialize};

use crate::grid::Coordinates;

/// Alignment of a boat on the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Alignment {
    Horizontal,
    Vertical,
}

/// The closed catalogue of boat kinds. Behaviour is data: each kind has a
/// display name and a canonical size, and the negotiated fleet may override
/// the size via [`BoatSpec`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum BoatKind {
    AircraftCarrier,
    Cruiser,
    Submarine,
    Destroyer,
    TorpedoBoat,
}

impl BoatKind {
    /// Display name of the kind.
    pub const fn name(self) -> &'static str {
        match self {
            BoatKind::AircraftCarrier => "Aircraft carrier",
            BoatKind::Cruiser => "Cruiser",
            BoatKind::Submarine => "Submarine",
            BoatKind::Destroyer => "Destroyer",
            BoatKind::TorpedoBoat => "Torpedo boat",
        }
    }

    /// Canonical size of the kind, in cells.
    pub const fn size(self) -> u8 {
        match self {
            BoatKind::AircraftCarrier => 4,
            BoatKind::Cruiser => 3,
            BoatKind::Submarine => 3,
            BoatKind::Destroyer => 2,
            BoatKind::TorpedoBoat => 1,
        }
    }
}

impl core::fmt::Display for BoatKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.name())
    }
}

/// One boat of the negotiated fleet: a kind together with the size it has
/// in this game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BoatSpec {
    pub kind: BoatKind,
    pub size: u8,
}

impl BoatSpec {
    /// A spec with the kind's canonical size.
    pub const fn standard(kind: BoatKind) -> Self {
        Self {
            kind,
            size: kind.size(),
        }
    }
}

/// A boat's fixed position and alignment on a grid, as exchanged in the
/// Positions message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Placement {
    pub kind: BoatKind,
    pub origin: Coordinates,
    pub alignment: Alignment,
}

/// The ordered cells covered by a boat of `size` cells starting at `origin`.
///
/// Deterministic in `{origin, alignment, size}`; the caller ensures the run
/// stays within coordinate range (the grid rejects out-of-bounds placements
/// before expanding them).
pub fn occupied_cells(
    origin: Coordinates,
    alignment: Alignment,
    size: u8,
) -> impl Iterator<Item = Coordinates> {
    (0..u16::from(size)).map(move |i| match alignment {
        Alignment::Horizontal => Coordinates::new(origin.x + i, origin.y),
        Alignment::Vertical => Coordinates::new(origin.x, origin.y + i),
    })
}
