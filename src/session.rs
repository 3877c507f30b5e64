//! Session state machine: lifecycle phases, turn ownership and attack
//! resolution for one side of a game.
//!
//! A session is driven from two places at once, the local caller (UI) and
//! the connection's inbound loop, so every public operation runs under one
//! mutex via [`SessionHandle`]. Validation, state mutation and the outbound
//! enqueue form a single critical section; the connection manager drains
//! the outbound queue in order.

use std::sync::{Arc, Mutex};

use rand::Rng;
use tokio::sync::mpsc::UnboundedSender;

use crate::boat::{Alignment, BoatKind, BoatSpec, Placement};
use crate::common::{AttackOutcome, ValidationError};
use crate::connection::ConnectionError;
use crate::grid::{CellState, Coordinates, Grid};
use crate::protocol::{Message, Parameters, ProtocolError};

/// Which participant fixed the parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Host,
    Guest,
}

/// One of the two sides of a session, seen from the local player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Local,
    Peer,
}

/// Lifecycle phase of a session. Construction is the transition out of the
/// initial state: a host starts in `Positioning` (its parameters are
/// authoritative), a guest in `AwaitingParameters`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    AwaitingParameters,
    Positioning,
    AwaitingOpponentPositioning,
    InProgress,
    Finished,
    Aborted,
}

/// Fatal failure that moved the session to [`Phase::Aborted`].
#[derive(Debug)]
pub enum SessionError {
    Connection(ConnectionError),
    Protocol(ProtocolError),
}

impl core::fmt::Display for SessionError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            SessionError::Connection(e) => write!(f, "connection failed: {}", e),
            SessionError::Protocol(e) => write!(f, "protocol violation: {}", e),
        }
    }
}

impl std::error::Error for SessionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SessionError::Connection(e) => Some(e),
            SessionError::Protocol(e) => Some(e),
        }
    }
}

/// Notifications consumed by the layer driving the session.
#[derive(Debug)]
pub enum SessionEvent {
    /// The peer connection is established.
    Connected,
    /// Parameters arrived from the host (guest only); positioning may begin.
    ParametersReady(Parameters),
    /// Both sides finished positioning; the game is in progress.
    PositioningComplete { first_turn: Side },
    /// The outcome of the local side's outstanding attack arrived.
    AttackResult {
        target: Coordinates,
        outcome: AttackOutcome,
    },
    /// The peer attacked the local grid.
    OpponentAttacked {
        target: Coordinates,
        outcome: AttackOutcome,
    },
    /// One fleet is destroyed.
    GameFinished { winner: Side },
    /// The session failed fatally and accepts no further actions.
    Aborted(SessionError),
}

struct Boards {
    grid: Grid,
    shadow: Grid,
    unplaced: Vec<BoatSpec>,
}

impl Boards {
    fn new(params: &Parameters) -> Self {
        Self {
            grid: Grid::new(params.width, params.height),
            shadow: Grid::new(params.width, params.height),
            unplaced: params.fleet.clone(),
        }
    }
}

/// One side of a game: own grid, opponent-shadow grid, negotiated
/// parameters, turn owner and lifecycle phase.
pub struct Session {
    role: Role,
    phase: Phase,
    turn: Side,
    params: Option<Parameters>,
    boards: Option<Boards>,
    opponent_ready: bool,
    positions_sent: bool,
    pending_attack: Option<Coordinates>,
    enemy_cells_remaining: u32,
    events: UnboundedSender<SessionEvent>,
    outbound: Option<UnboundedSender<Message>>,
}

impl Session {
    /// Start as host: fixes the parameters, queues them for the guest and
    /// begins positioning immediately.
    pub fn host(
        params: Parameters,
        events: UnboundedSender<SessionEvent>,
        outbound: UnboundedSender<Message>,
    ) -> Result<Self, ProtocolError> {
        params.validate()?;
        let mut session = Self {
            role: Role::Host,
            phase: Phase::Positioning,
            turn: Side::Peer,
            enemy_cells_remaining: params.fleet_cells(),
            boards: Some(Boards::new(&params)),
            params: Some(params.clone()),
            opponent_ready: false,
            positions_sent: false,
            pending_attack: None,
            events,
            outbound: Some(outbound),
        };
        session.send(Message::Parameters(params));
        Ok(session)
    }

    /// Start as guest: waits for the host's parameters.
    pub fn guest(
        events: UnboundedSender<SessionEvent>,
        outbound: UnboundedSender<Message>,
    ) -> Self {
        Self {
            role: Role::Guest,
            phase: Phase::AwaitingParameters,
            turn: Side::Peer,
            params: None,
            boards: None,
            opponent_ready: false,
            positions_sent: false,
            pending_attack: None,
            enemy_cells_remaining: 0,
            events,
            outbound: Some(outbound),
        }
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Side whose attack the session currently accepts. Meaningful only in
    /// [`Phase::InProgress`].
    pub fn turn(&self) -> Side {
        self.turn
    }

    /// The negotiated parameters, once known.
    pub fn parameters(&self) -> Option<&Parameters> {
        self.params.as_ref()
    }

    /// Boats of the fleet not yet placed.
    pub fn remaining_fleet(&self) -> &[BoatSpec] {
        self.boards.as_ref().map_or(&[], |b| b.unplaced.as_slice())
    }

    /// Read-only view of the local grid, once parameters are known.
    pub fn own_grid(&self) -> Option<&Grid> {
        self.boards.as_ref().map(|b| &b.grid)
    }

    /// Read-only view of the opponent-shadow grid (Hit/Miss markers only).
    pub fn shadow_grid(&self) -> Option<&Grid> {
        self.boards.as_ref().map(|b| &b.shadow)
    }

    /// Signal that the peer connection is established.
    pub fn connected(&mut self) {
        self.emit(SessionEvent::Connected);
    }

    /// Place one boat of the fleet. Valid only while positioning; once the
    /// fleet is complete the full placement set is sent to the peer.
    pub fn place_boat(
        &mut self,
        kind: BoatKind,
        origin: Coordinates,
        alignment: Alignment,
    ) -> Result<(), ValidationError> {
        if self.phase != Phase::Positioning {
            return Err(ValidationError::WrongPhase);
        }
        let boards = self.boards.as_mut().ok_or(ValidationError::WrongPhase)?;
        let index = match boards.unplaced.iter().position(|s| s.kind == kind) {
            Some(i) => i,
            None => {
                let in_fleet = self
                    .params
                    .as_ref()
                    .is_some_and(|p| p.fleet.iter().any(|s| s.kind == kind));
                return Err(if in_fleet {
                    ValidationError::KindExhausted
                } else {
                    ValidationError::UnknownKind
                });
            }
        };
        let spec = boards.unplaced[index];
        boards.grid.place(spec, origin, alignment)?;
        boards.unplaced.remove(index);
        if boards.unplaced.is_empty() {
            let placements: Vec<Placement> =
                boards.grid.boats().iter().map(|b| b.placement()).collect();
            self.send(Message::Positions(placements));
            self.positions_sent = true;
            if self.opponent_ready {
                self.start_game();
            } else {
                self.phase = Phase::AwaitingOpponentPositioning;
            }
        }
        Ok(())
    }

    /// Place every remaining boat of the fleet at a random valid position.
    pub fn place_fleet_randomly<R: Rng>(&mut self, rng: &mut R) -> Result<(), ValidationError> {
        if self.phase != Phase::Positioning {
            return Err(ValidationError::WrongPhase);
        }
        loop {
            let Some(boards) = self.boards.as_ref() else {
                return Err(ValidationError::WrongPhase);
            };
            let Some(spec) = boards.unplaced.first().copied() else {
                return Ok(());
            };
            let (origin, alignment) = boards.grid.random_placement(rng, spec)?;
            self.place_boat(spec.kind, origin, alignment)?;
        }
    }

    /// Attack the opponent's grid. Valid only in progress, on the local
    /// side's turn, against a cell not attacked before. The outcome arrives
    /// later as [`SessionEvent::AttackResult`].
    pub fn attack(&mut self, target: Coordinates) -> Result<(), ValidationError> {
        if self.phase != Phase::InProgress {
            return Err(ValidationError::WrongPhase);
        }
        if self.turn != Side::Local {
            return Err(ValidationError::NotYourTurn);
        }
        let boards = self.boards.as_ref().ok_or(ValidationError::WrongPhase)?;
        match boards.shadow.cell(target) {
            None => return Err(ValidationError::OutOfBounds),
            Some(CellState::Empty) => {}
            Some(_) => return Err(ValidationError::AlreadyAttacked),
        }
        self.pending_attack = Some(target);
        self.turn = Side::Peer;
        self.send(Message::Attack { target });
        Ok(())
    }

    /// Dispatch one decoded inbound message. A returned error is fatal to
    /// the session; the connection manager aborts and tears the link down.
    pub fn handle_message(&mut self, msg: Message) -> Result<(), ProtocolError> {
        match msg {
            Message::Parameters(params) => self.on_parameters(params),
            Message::Positions(placements) => self.on_positions(placements),
            Message::Attack { target } => self.on_attack(target),
            Message::Outcome { target, outcome } => self.on_outcome(target, outcome),
        }
    }

    fn on_parameters(&mut self, params: Parameters) -> Result<(), ProtocolError> {
        if self.role != Role::Guest || self.phase != Phase::AwaitingParameters {
            return Err(ProtocolError::Unexpected("Parameters"));
        }
        params.validate()?;
        self.enemy_cells_remaining = params.fleet_cells();
        self.boards = Some(Boards::new(&params));
        self.params = Some(params.clone());
        self.phase = Phase::Positioning;
        self.emit(SessionEvent::ParametersReady(params));
        Ok(())
    }

    fn on_positions(&mut self, placements: Vec<Placement>) -> Result<(), ProtocolError> {
        let positioning = matches!(
            self.phase,
            Phase::Positioning | Phase::AwaitingOpponentPositioning
        );
        if !positioning || self.opponent_ready {
            return Err(ProtocolError::Unexpected("Positions"));
        }
        // Completeness only: the multiset of kinds must match the negotiated
        // fleet. Cell detail is discarded; the shadow never learns boat
        // locations.
        let params = self
            .params
            .as_ref()
            .ok_or(ProtocolError::Unexpected("Positions"))?;
        let mut got: Vec<BoatKind> = placements.iter().map(|p| p.kind).collect();
        let mut want: Vec<BoatKind> = params.fleet.iter().map(|s| s.kind).collect();
        got.sort();
        want.sort();
        if got != want {
            return Err(ProtocolError::FleetMismatch);
        }
        self.opponent_ready = true;
        if self.positions_sent {
            self.start_game();
        }
        Ok(())
    }

    fn on_attack(&mut self, target: Coordinates) -> Result<(), ProtocolError> {
        if self.phase != Phase::InProgress {
            return Err(ProtocolError::Unexpected("Attack"));
        }
        if self.turn != Side::Peer || self.pending_attack.is_some() {
            return Err(ProtocolError::OutOfTurn);
        }
        let boards = self
            .boards
            .as_mut()
            .ok_or(ProtocolError::Unexpected("Attack"))?;
        let outcome = boards
            .grid
            .resolve_attack(target)
            .map_err(ProtocolError::InvalidAttack)?;
        let defeated = boards.grid.all_sunk();
        self.turn = Side::Local;
        self.send(Message::Outcome { target, outcome });
        self.emit(SessionEvent::OpponentAttacked { target, outcome });
        if defeated {
            self.finish(Side::Peer);
        }
        Ok(())
    }

    fn on_outcome(
        &mut self,
        target: Coordinates,
        outcome: AttackOutcome,
    ) -> Result<(), ProtocolError> {
        if self.phase != Phase::InProgress {
            return Err(ProtocolError::Unexpected("Outcome"));
        }
        if self.pending_attack != Some(target) {
            return Err(ProtocolError::UnexpectedOutcome);
        }
        let boards = self
            .boards
            .as_mut()
            .ok_or(ProtocolError::Unexpected("Outcome"))?;
        boards
            .shadow
            .record_outcome(target, outcome)
            .map_err(|_| ProtocolError::UnexpectedOutcome)?;
        self.pending_attack = None;
        if !matches!(outcome, AttackOutcome::Miss) {
            self.enemy_cells_remaining = self.enemy_cells_remaining.saturating_sub(1);
        }
        self.emit(SessionEvent::AttackResult { target, outcome });
        if self.enemy_cells_remaining == 0 {
            self.finish(Side::Local);
        }
        Ok(())
    }

    fn start_game(&mut self) {
        self.phase = Phase::InProgress;
        self.turn = if self.role == Role::Host {
            Side::Local
        } else {
            Side::Peer
        };
        log::info!("both fleets positioned, host moves first");
        self.emit(SessionEvent::PositioningComplete {
            first_turn: self.turn,
        });
    }

    fn finish(&mut self, winner: Side) {
        self.phase = Phase::Finished;
        self.outbound = None;
        log::info!(
            "game finished, {} wins",
            match winner {
                Side::Local => "local side",
                Side::Peer => "peer",
            }
        );
        self.emit(SessionEvent::GameFinished { winner });
    }

    /// Move the session to its aborted terminal state. Idempotent; a no-op
    /// once the session already reached a terminal phase.
    pub fn abort(&mut self, error: SessionError) {
        if matches!(self.phase, Phase::Finished | Phase::Aborted) {
            return;
        }
        log::warn!("session aborted: {}", error);
        self.phase = Phase::Aborted;
        self.outbound = None;
        self.emit(SessionEvent::Aborted(error));
    }

    fn send(&mut self, msg: Message) {
        if let Some(outbound) = &self.outbound {
            let _ = outbound.send(msg);
        }
    }

    fn emit(&mut self, event: SessionEvent) {
        let _ = self.events.send(event);
    }
}

/// Shared handle to a session; every operation takes the session lock.
#[derive(Clone)]
pub struct SessionHandle {
    inner: Arc<Mutex<Session>>,
}

impl SessionHandle {
    pub fn new(inner: Arc<Mutex<Session>>) -> Self {
        Self { inner }
    }

    pub fn place_boat(
        &self,
        kind: BoatKind,
        origin: Coordinates,
        alignment: Alignment,
    ) -> Result<(), ValidationError> {
        self.inner.lock().unwrap().place_boat(kind, origin, alignment)
    }

    pub fn place_fleet_randomly<R: Rng>(&self, rng: &mut R) -> Result<(), ValidationError> {
        self.inner.lock().unwrap().place_fleet_randomly(rng)
    }

    pub fn attack(&self, target: Coordinates) -> Result<(), ValidationError> {
        self.inner.lock().unwrap().attack(target)
    }

    pub fn phase(&self) -> Phase {
        self.inner.lock().unwrap().phase()
    }

    pub fn turn(&self) -> Side {
        self.inner.lock().unwrap().turn()
    }

    pub fn parameters(&self) -> Option<Parameters> {
        self.inner.lock().unwrap().parameters().cloned()
    }

    pub fn remaining_fleet(&self) -> Vec<BoatSpec> {
        self.inner.lock().unwrap().remaining_fleet().to_vec()
    }
}
