//! State-machine tests driving two sessions directly, pumping each side's
//! outbound queue into the other. No transport, no runtime.

use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};

use seabattle::protocol::{Message, Parameters, ProtocolError};
use seabattle::{
    Alignment, AttackOutcome, BoatKind, BoatSpec, Coordinates, Phase, Placement, Session,
    SessionEvent, Side, ValidationError,
};

struct TestSide {
    session: Session,
    events: UnboundedReceiver<SessionEvent>,
    outbound: UnboundedReceiver<Message>,
}

fn host_side(params: Parameters) -> TestSide {
    let (events_tx, events) = unbounded_channel();
    let (out_tx, outbound) = unbounded_channel();
    TestSide {
        session: Session::host(params, events_tx, out_tx).unwrap(),
        events,
        outbound,
    }
}

fn guest_side() -> TestSide {
    let (events_tx, events) = unbounded_channel();
    let (out_tx, outbound) = unbounded_channel();
    TestSide {
        session: Session::guest(events_tx, out_tx),
        events,
        outbound,
    }
}

/// Shuttle queued messages between the two sides until both queues drain.
fn pump(a: &mut TestSide, b: &mut TestSide) {
    loop {
        let mut moved = false;
        while let Ok(msg) = a.outbound.try_recv() {
            b.session.handle_message(msg).unwrap();
            moved = true;
        }
        while let Ok(msg) = b.outbound.try_recv() {
            a.session.handle_message(msg).unwrap();
            moved = true;
        }
        if !moved {
            break;
        }
    }
}

fn drain_events(side: &mut TestSide) -> Vec<SessionEvent> {
    let mut events = Vec::new();
    while let Ok(event) = side.events.try_recv() {
        events.push(event);
    }
    events
}

fn c(x: u16, y: u16) -> Coordinates {
    Coordinates::new(x, y)
}

fn lone_carrier_params() -> Parameters {
    Parameters {
        width: 10,
        height: 10,
        fleet: vec![BoatSpec::standard(BoatKind::AircraftCarrier)],
    }
}

fn two_boat_params() -> Parameters {
    Parameters {
        width: 10,
        height: 10,
        fleet: vec![
            BoatSpec::standard(BoatKind::AircraftCarrier),
            BoatSpec::standard(BoatKind::Destroyer),
        ],
    }
}

#[test]
fn test_host_queues_parameters_immediately() {
    let mut host = host_side(lone_carrier_params());
    assert_eq!(host.session.phase(), Phase::Positioning);
    assert_eq!(
        host.outbound.try_recv().unwrap(),
        Message::Parameters(lone_carrier_params())
    );
}

#[test]
fn test_invalid_parameters_are_rejected() {
    let (events_tx, _events) = unbounded_channel();
    let (out_tx, _outbound) = unbounded_channel();
    let params = Parameters {
        width: 0,
        height: 10,
        fleet: vec![BoatSpec::standard(BoatKind::Destroyer)],
    };
    assert!(matches!(
        Session::host(params, events_tx, out_tx),
        Err(ProtocolError::InvalidParameters(_))
    ));

    let (events_tx, _events) = unbounded_channel();
    let (out_tx, _outbound) = unbounded_channel();
    let params = Parameters {
        width: 3,
        height: 3,
        fleet: vec![BoatSpec {
            kind: BoatKind::AircraftCarrier,
            size: 4,
        }],
    };
    assert!(matches!(
        Session::host(params, events_tx, out_tx),
        Err(ProtocolError::InvalidParameters(_))
    ));
}

#[test]
fn test_guest_waits_for_parameters() {
    let mut guest = guest_side();
    assert_eq!(guest.session.phase(), Phase::AwaitingParameters);
    assert_eq!(
        guest
            .session
            .place_boat(BoatKind::AircraftCarrier, c(0, 0), Alignment::Horizontal)
            .unwrap_err(),
        ValidationError::WrongPhase
    );

    guest
        .session
        .handle_message(Message::Parameters(lone_carrier_params()))
        .unwrap();
    assert_eq!(guest.session.phase(), Phase::Positioning);
    let events = drain_events(&mut guest);
    assert!(matches!(events[0], SessionEvent::ParametersReady(_)));
}

#[test]
fn test_host_never_accepts_parameters() {
    let mut host = host_side(lone_carrier_params());
    assert!(matches!(
        host.session
            .handle_message(Message::Parameters(lone_carrier_params())),
        Err(ProtocolError::Unexpected(_))
    ));
}

#[test]
fn test_placement_completion_sends_positions() {
    let mut host = host_side(lone_carrier_params());
    let _params_msg = host.outbound.try_recv().unwrap();

    host.session
        .place_boat(BoatKind::AircraftCarrier, c(0, 0), Alignment::Horizontal)
        .unwrap();
    assert_eq!(host.session.phase(), Phase::AwaitingOpponentPositioning);
    match host.outbound.try_recv().unwrap() {
        Message::Positions(placements) => {
            assert_eq!(
                placements,
                vec![Placement {
                    kind: BoatKind::AircraftCarrier,
                    origin: c(0, 0),
                    alignment: Alignment::Horizontal,
                }]
            );
        }
        other => panic!("expected Positions, got {:?}", other),
    }
}

#[test]
fn test_unknown_and_exhausted_kinds_are_rejected() {
    let mut host = host_side(two_boat_params());
    assert_eq!(
        host.session
            .place_boat(BoatKind::Submarine, c(0, 0), Alignment::Horizontal)
            .unwrap_err(),
        ValidationError::UnknownKind
    );

    host.session
        .place_boat(BoatKind::AircraftCarrier, c(0, 0), Alignment::Horizontal)
        .unwrap();
    assert_eq!(
        host.session
            .place_boat(BoatKind::AircraftCarrier, c(0, 2), Alignment::Horizontal)
            .unwrap_err(),
        ValidationError::KindExhausted
    );
    assert_eq!(host.session.remaining_fleet().len(), 1);
}

#[test]
fn test_rejected_placement_leaves_state_unchanged() {
    let mut host = host_side(two_boat_params());
    assert_eq!(
        host.session
            .place_boat(BoatKind::AircraftCarrier, c(8, 0), Alignment::Horizontal)
            .unwrap_err(),
        ValidationError::OutOfBounds
    );
    assert_eq!(host.session.phase(), Phase::Positioning);
    assert_eq!(host.session.remaining_fleet().len(), 2);
}

#[test]
fn test_fleet_mismatch_is_a_protocol_error() {
    let mut host = host_side(two_boat_params());
    let incomplete = vec![Placement {
        kind: BoatKind::AircraftCarrier,
        origin: c(0, 0),
        alignment: Alignment::Horizontal,
    }];
    assert!(matches!(
        host.session.handle_message(Message::Positions(incomplete)),
        Err(ProtocolError::FleetMismatch)
    ));
}

#[test]
fn test_attack_requires_game_in_progress() {
    let mut host = host_side(lone_carrier_params());
    assert_eq!(
        host.session.attack(c(0, 0)).unwrap_err(),
        ValidationError::WrongPhase
    );
}

#[test]
fn test_turn_alternation_is_enforced() {
    let mut host = host_side(lone_carrier_params());
    let mut guest = guest_side();
    pump(&mut host, &mut guest);
    host.session
        .place_boat(BoatKind::AircraftCarrier, c(0, 0), Alignment::Horizontal)
        .unwrap();
    guest
        .session
        .place_boat(BoatKind::AircraftCarrier, c(0, 5), Alignment::Horizontal)
        .unwrap();
    pump(&mut host, &mut guest);

    assert_eq!(host.session.phase(), Phase::InProgress);
    assert_eq!(guest.session.phase(), Phase::InProgress);
    assert_eq!(host.session.turn(), Side::Local);
    assert_eq!(guest.session.turn(), Side::Peer);

    // guest may not open the game
    assert_eq!(
        guest.session.attack(c(0, 0)).unwrap_err(),
        ValidationError::NotYourTurn
    );

    // an attack arriving while it is the local side's move is a protocol
    // error
    assert!(matches!(
        host.session.handle_message(Message::Attack { target: c(1, 1) }),
        Err(ProtocolError::OutOfTurn)
    ));

    // host attacks once, then must wait for the exchange to come back
    host.session.attack(c(9, 9)).unwrap();
    assert_eq!(
        host.session.attack(c(9, 8)).unwrap_err(),
        ValidationError::NotYourTurn
    );
    // an attack arriving before our outstanding attack was resolved is a
    // protocol error as well
    assert!(matches!(
        host.session.handle_message(Message::Attack { target: c(1, 1) }),
        Err(ProtocolError::OutOfTurn)
    ));
    pump(&mut host, &mut guest);
    assert_eq!(guest.session.turn(), Side::Local);
}

#[test]
fn test_attacking_same_cell_twice_is_rejected() {
    let mut host = host_side(lone_carrier_params());
    let mut guest = guest_side();
    pump(&mut host, &mut guest);
    host.session
        .place_boat(BoatKind::AircraftCarrier, c(0, 0), Alignment::Horizontal)
        .unwrap();
    guest
        .session
        .place_boat(BoatKind::AircraftCarrier, c(0, 5), Alignment::Horizontal)
        .unwrap();
    pump(&mut host, &mut guest);

    host.session.attack(c(4, 4)).unwrap();
    pump(&mut host, &mut guest);
    guest.session.attack(c(9, 9)).unwrap();
    pump(&mut host, &mut guest);

    assert_eq!(
        host.session.attack(c(4, 4)).unwrap_err(),
        ValidationError::AlreadyAttacked
    );
    assert_eq!(
        host.session.attack(c(20, 4)).unwrap_err(),
        ValidationError::OutOfBounds
    );
}

/// The reference scenario: 10x10 grid, fleet of one aircraft carrier placed
/// at the top-left corner, sunk by the guest in four attacks.
#[test]
fn test_guest_sinks_lone_carrier_and_wins() {
    let mut host = host_side(lone_carrier_params());
    let mut guest = guest_side();
    pump(&mut host, &mut guest);

    host.session
        .place_boat(BoatKind::AircraftCarrier, c(0, 0), Alignment::Horizontal)
        .unwrap();
    guest
        .session
        .place_boat(BoatKind::AircraftCarrier, c(0, 5), Alignment::Horizontal)
        .unwrap();
    pump(&mut host, &mut guest);

    let host_targets = [c(9, 9), c(8, 9), c(7, 9), c(6, 9)];
    let guest_targets = [c(0, 0), c(1, 0), c(2, 0), c(3, 0)];
    for i in 0..4 {
        host.session.attack(host_targets[i]).unwrap();
        pump(&mut host, &mut guest);
        guest.session.attack(guest_targets[i]).unwrap();
        pump(&mut host, &mut guest);
    }

    assert_eq!(host.session.phase(), Phase::Finished);
    assert_eq!(guest.session.phase(), Phase::Finished);

    let guest_events = drain_events(&mut guest);
    assert!(matches!(
        guest_events.last(),
        Some(SessionEvent::GameFinished {
            winner: Side::Local
        })
    ));
    // the guest's last attack result reports the carrier sunk
    assert!(guest_events.iter().any(|e| matches!(
        e,
        SessionEvent::AttackResult {
            outcome: AttackOutcome::Sunk(BoatKind::AircraftCarrier),
            ..
        }
    )));

    let host_events = drain_events(&mut host);
    assert!(matches!(
        host_events.last(),
        Some(SessionEvent::GameFinished { winner: Side::Peer })
    ));

    // a finished session accepts no further attacks in either direction
    assert_eq!(
        guest.session.attack(c(5, 5)).unwrap_err(),
        ValidationError::WrongPhase
    );
    assert!(host
        .session
        .handle_message(Message::Attack { target: c(5, 5) })
        .is_err());
}

#[test]
fn test_positions_may_cross_before_local_placement_finishes() {
    let mut host = host_side(lone_carrier_params());
    let mut guest = guest_side();
    pump(&mut host, &mut guest);

    // guest finishes first; host receives Positions while still positioning
    guest
        .session
        .place_boat(BoatKind::AircraftCarrier, c(2, 2), Alignment::Vertical)
        .unwrap();
    pump(&mut host, &mut guest);
    assert_eq!(host.session.phase(), Phase::Positioning);
    assert_eq!(guest.session.phase(), Phase::AwaitingOpponentPositioning);

    host.session
        .place_boat(BoatKind::AircraftCarrier, c(0, 0), Alignment::Horizontal)
        .unwrap();
    pump(&mut host, &mut guest);
    assert_eq!(host.session.phase(), Phase::InProgress);
    assert_eq!(guest.session.phase(), Phase::InProgress);

    let events = drain_events(&mut host);
    assert!(events.iter().any(|e| matches!(
        e,
        SessionEvent::PositioningComplete {
            first_turn: Side::Local
        }
    )));
}
