use pieceworks_core::{
    decode, encode, from_json, CameraRecord, EngineEvent, GroupRecord, PieceRecord, SavedPuzzle,
};

fn sample() -> SavedPuzzle {
    let mut saved = SavedPuzzle::new(4, 7);
    saved.pieces.push(PieceRecord {
        id: 2,
        x: 10.5,
        y: -3.0,
        is_placed: true,
        is_locked: false,
        z_index: 5,
        group_id: 9,
    });
    saved.groups.push(GroupRecord {
        id: 9,
        members: vec![2],
    });
    saved.camera = Some(CameraRecord {
        x: 12.0,
        y: 4.0,
        scale: 1.5,
    });
    saved
}

#[test]
fn saved_puzzle_survives_binary_encoding() {
    let saved = sample();
    let bytes = encode(&saved).expect("encode");
    let decoded: SavedPuzzle = decode(&bytes).expect("decode");
    assert_eq!(decoded, saved);
}

#[test]
fn sparse_json_fills_defaults() {
    let text = r#"{"piece_count": 4, "shape_seed": 7, "pieces": [{"id": 1, "x": 3.0, "y": 4.0, "group_id": 1}]}"#;
    let saved: SavedPuzzle = from_json(text).expect("json");
    assert_eq!(saved.version, 1);
    assert!(saved.groups.is_empty());
    assert!(saved.camera.is_none());
    assert!(!saved.pieces[0].is_locked);
    assert_eq!(saved.pieces[0].z_index, 0);
}

#[test]
fn malformed_bytes_are_an_error() {
    assert!(decode::<SavedPuzzle>(&[1, 2, 3]).is_err());
}

#[test]
fn events_are_tagged_in_json() {
    let event = EngineEvent::SelectionChange {
        selected: vec![3, 4],
        reference_selected: false,
    };
    let text = pieceworks_core::to_json(&event).expect("json");
    assert!(text.contains("\"type\":\"selection_change\""));
    assert_eq!(event.name(), "selection_change");
}
