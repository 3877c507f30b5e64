use seabattle::protocol::{decode, encode, Message, Parameters, ProtocolError};
use seabattle::{
    Alignment, AttackOutcome, BoatKind, BoatSpec, Coordinates, Placement,
};

fn roundtrip(msg: Message) {
    let bytes = encode(&msg).unwrap();
    assert_eq!(decode(&bytes).unwrap(), msg);
}

#[test]
fn test_parameters_roundtrip() {
    roundtrip(Message::Parameters(Parameters::standard()));

    // overridden sizes and duplicate kinds survive the trip
    roundtrip(Message::Parameters(Parameters {
        width: 25,
        height: 12,
        fleet: vec![
            BoatSpec {
                kind: BoatKind::AircraftCarrier,
                size: 6,
            },
            BoatSpec {
                kind: BoatKind::Destroyer,
                size: 2,
            },
            BoatSpec {
                kind: BoatKind::Destroyer,
                size: 2,
            },
        ],
    }));
}

#[test]
fn test_positions_roundtrip() {
    roundtrip(Message::Positions(vec![
        Placement {
            kind: BoatKind::AircraftCarrier,
            origin: Coordinates::new(0, 0),
            alignment: Alignment::Horizontal,
        },
        Placement {
            kind: BoatKind::TorpedoBoat,
            origin: Coordinates::new(9, 9),
            alignment: Alignment::Vertical,
        },
    ]));
    roundtrip(Message::Positions(Vec::new()));
}

#[test]
fn test_attack_and_outcome_roundtrip() {
    roundtrip(Message::Attack {
        target: Coordinates::new(3, 7),
    });
    roundtrip(Message::Outcome {
        target: Coordinates::new(3, 7),
        outcome: AttackOutcome::Miss,
    });
    roundtrip(Message::Outcome {
        target: Coordinates::new(0, 65535),
        outcome: AttackOutcome::Hit,
    });
    roundtrip(Message::Outcome {
        target: Coordinates::new(65535, 0),
        outcome: AttackOutcome::Sunk(BoatKind::Submarine),
    });
}

#[test]
fn test_garbage_is_rejected() {
    assert!(matches!(
        decode(&[0xFF; 16]),
        Err(ProtocolError::Malformed(_))
    ));
    assert!(matches!(decode(&[]), Err(ProtocolError::Malformed(_))));
}

#[test]
fn test_truncated_message_is_rejected() {
    let bytes = encode(&Message::Attack {
        target: Coordinates::new(5, 5),
    })
    .unwrap();
    assert!(matches!(
        decode(&bytes[..bytes.len() - 1]),
        Err(ProtocolError::Malformed(_))
    ));
}
