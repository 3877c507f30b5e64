//! Grid state: cell tracking, placement validity and attack resolution.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::boat::{occupied_cells, Alignment, BoatSpec, Placement};
use crate::common::{AttackOutcome, ValidationError};

/// A cell position, 0-based from the top-left corner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coordinates {
    pub x: u16,
    pub y: u16,
}

impl Coordinates {
    pub const fn new(x: u16, y: u16) -> Self {
        Self { x, y }
    }
}

impl core::fmt::Display for Coordinates {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// State of a single grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellState {
    Empty,
    Boat,
    Hit,
    Miss,
}

/// A boat placed on the grid, with its hit count.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlacedBoat {
    spec: BoatSpec,
    origin: Coordinates,
    alignment: Alignment,
    hits: u8,
}

impl PlacedBoat {
    /// The spec this boat was placed from.
    pub fn spec(&self) -> BoatSpec {
        self.spec
    }

    /// The placement exchanged in the Positions message.
    pub fn placement(&self) -> Placement {
        Placement {
            kind: self.spec.kind,
            origin: self.origin,
            alignment: self.alignment,
        }
    }

    /// All cells are hit.
    pub fn is_sunk(&self) -> bool {
        self.hits == self.spec.size
    }

    fn covers(&self, target: Coordinates) -> bool {
        occupied_cells(self.origin, self.alignment, self.spec.size).any(|c| c == target)
    }
}

/// A player's grid: width x height cells plus the boats placed on it.
///
/// The same type backs the opponent-shadow grid, which has no boats and only
/// ever accumulates Hit/Miss markers via [`Grid::record_outcome`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    width: u16,
    height: u16,
    cells: Vec<CellState>,
    boats: Vec<PlacedBoat>,
}

impl Grid {
    /// Create an empty grid. Dimensions must be nonzero.
    pub fn new(width: u16, height: u16) -> Self {
        Self {
            width,
            height,
            cells: vec![CellState::Empty; usize::from(width) * usize::from(height)],
            boats: Vec::new(),
        }
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn height(&self) -> u16 {
        self.height
    }

    /// Cell state at `target`, or `None` outside the grid.
    pub fn cell(&self, target: Coordinates) -> Option<CellState> {
        self.index(target).map(|i| self.cells[i])
    }

    /// Boats placed on this grid, in placement order.
    pub fn boats(&self) -> &[PlacedBoat] {
        &self.boats
    }

    fn index(&self, target: Coordinates) -> Option<usize> {
        if target.x < self.width && target.y < self.height {
            Some(usize::from(target.y) * usize::from(self.width) + usize::from(target.x))
        } else {
            None
        }
    }

    /// Whether a boat of `spec` placed at `origin` would stay within bounds.
    fn fits(&self, spec: BoatSpec, origin: Coordinates, alignment: Alignment) -> bool {
        let (x, y, len) = (u32::from(origin.x), u32::from(origin.y), u32::from(spec.size));
        match alignment {
            Alignment::Horizontal => x + len <= u32::from(self.width) && y < u32::from(self.height),
            Alignment::Vertical => y + len <= u32::from(self.height) && x < u32::from(self.width),
        }
    }

    /// Place a boat. The full cell run is validated before any cell is
    /// marked, so a rejected placement leaves the grid untouched.
    pub fn place(
        &mut self,
        spec: BoatSpec,
        origin: Coordinates,
        alignment: Alignment,
    ) -> Result<(), ValidationError> {
        if !self.fits(spec, origin, alignment) {
            return Err(ValidationError::OutOfBounds);
        }
        let mut indices = Vec::with_capacity(usize::from(spec.size));
        for cell in occupied_cells(origin, alignment, spec.size) {
            let idx = self.index(cell).ok_or(ValidationError::OutOfBounds)?;
            if self.cells[idx] != CellState::Empty {
                return Err(ValidationError::Overlap);
            }
            indices.push(idx);
        }
        for idx in indices {
            self.cells[idx] = CellState::Boat;
        }
        self.boats.push(PlacedBoat {
            spec,
            origin,
            alignment,
            hits: 0,
        });
        Ok(())
    }

    /// Resolve an incoming attack against this grid.
    ///
    /// Marks the cell Hit or Miss and reports the outcome; re-attacking an
    /// already resolved cell is rejected without touching state.
    pub fn resolve_attack(&mut self, target: Coordinates) -> Result<AttackOutcome, ValidationError> {
        let idx = self.index(target).ok_or(ValidationError::OutOfBounds)?;
        if matches!(self.cells[idx], CellState::Hit | CellState::Miss) {
            return Err(ValidationError::AlreadyAttacked);
        }
        match self.boats.iter_mut().find(|b| b.covers(target)) {
            Some(boat) => {
                self.cells[idx] = CellState::Hit;
                boat.hits += 1;
                if boat.is_sunk() {
                    Ok(AttackOutcome::Sunk(boat.spec.kind))
                } else {
                    Ok(AttackOutcome::Hit)
                }
            }
            None => {
                self.cells[idx] = CellState::Miss;
                Ok(AttackOutcome::Miss)
            }
        }
    }

    /// Record a peer-reported outcome on the opponent-shadow grid.
    ///
    /// The shadow only ever holds Hit/Miss markers, never boat locations.
    pub fn record_outcome(
        &mut self,
        target: Coordinates,
        outcome: AttackOutcome,
    ) -> Result<(), ValidationError> {
        let idx = self.index(target).ok_or(ValidationError::OutOfBounds)?;
        if self.cells[idx] != CellState::Empty {
            return Err(ValidationError::AlreadyAttacked);
        }
        self.cells[idx] = match outcome {
            AttackOutcome::Miss => CellState::Miss,
            AttackOutcome::Hit | AttackOutcome::Sunk(_) => CellState::Hit,
        };
        Ok(())
    }

    /// The fleet is defeated: at least one boat is placed and every placed
    /// boat is sunk.
    pub fn all_sunk(&self) -> bool {
        !self.boats.is_empty() && self.boats.iter().all(PlacedBoat::is_sunk)
    }

    /// Find a random valid position for a boat of `spec`.
    pub fn random_placement<R: Rng>(
        &self,
        rng: &mut R,
        spec: BoatSpec,
    ) -> Result<(Coordinates, Alignment), ValidationError> {
        let len = u16::from(spec.size);
        if len > self.width && len > self.height {
            return Err(ValidationError::UnableToPlace);
        }
        let mut attempts = 0;
        while attempts < 100 {
            attempts += 1;
            let alignment = if rng.random() {
                Alignment::Horizontal
            } else {
                Alignment::Vertical
            };
            let (max_x, max_y) = match alignment {
                Alignment::Horizontal if len <= self.width => (self.width - len, self.height - 1),
                Alignment::Vertical if len <= self.height => (self.width - 1, self.height - len),
                _ => continue,
            };
            let origin = Coordinates::new(rng.random_range(0..=max_x), rng.random_range(0..=max_y));
            let free = occupied_cells(origin, alignment, spec.size)
                .all(|c| self.cell(c) == Some(CellState::Empty));
            if free {
                return Ok((origin, alignment));
            }
        }
        Err(ValidationError::UnableToPlace)
    }
}
