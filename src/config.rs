use crate::boat::{BoatKind, BoatSpec};

/// Default grid width.
pub const DEFAULT_WIDTH: u16 = 10;
/// Default grid height.
pub const DEFAULT_HEIGHT: u16 = 10;
/// Default listening port offered to the user (first port of the dynamic
/// range; any port in 1..=65535 is accepted).
pub const DEFAULT_PORT: u16 = 49152;

/// The standard catalogue: one boat of each kind.
pub const CATALOGUE: [BoatKind; 5] = [
    BoatKind::AircraftCarrier,
    BoatKind::Cruiser,
    BoatKind::Submarine,
    BoatKind::Destroyer,
    BoatKind::TorpedoBoat,
];

/// The standard fleet composition: every catalogue kind at its canonical size.
pub fn standard_fleet() -> Vec<BoatSpec> {
    CATALOGUE.iter().map(|k| BoatSpec::standard(*k)).collect()
}
