use image::{Rgba, RgbaImage};
use pieceworks::config::EngineConfig;
use pieceworks::engine::{Engine, EngineHooks};
use pieceworks::input::{InputEvent, InputEventKind};
use pieceworks::renderer::{DrawItem, PixmapSurface, BACKGROUND_COLOR};
use pieceworks::renderer_stub::{DrawOp, RecordingSurface};
use pieceworks_core::{CameraRecord, RemoteUpdate, SelectionRecord};

const COLOR: [u8; 4] = [200, 40, 10, 255];

fn engine(config: EngineConfig, positions: &[(f32, f32, u32, bool)]) -> Engine {
    let image = RgbaImage::from_pixel(400, 400, Rgba(COLOR));
    let mut engine = Engine::new(config, (800.0, 600.0), EngineHooks::empty());
    engine.cut_and_load(&image, 4, Some(11)).expect("cut");
    let mut saved = engine.save_state();
    for (record, (x, y, z, locked)) in saved.pieces.iter_mut().zip(positions) {
        record.x = *x;
        record.y = *y;
        record.z_index = *z;
        record.is_locked = *locked;
    }
    saved.camera = Some(CameraRecord {
        x: 0.0,
        y: 0.0,
        scale: 1.0,
    });
    engine.apply_saved(&saved);
    engine
}

#[test]
fn frame_paints_in_layer_order() {
    let config = EngineConfig {
        show_debug: true,
        ..EngineConfig::default()
    };
    let mut engine = engine(
        config,
        &[
            (1000.0, 1000.0, 10, false),
            (1600.0, 1000.0, 2, false),
            (1000.0, 1600.0, 5, false),
            (0.0, 0.0, 0, true),
        ],
    );
    engine.toggle_reference();
    engine.handle_input(InputEvent::mouse(InputEventKind::Down, 1100.0, 1100.0, 0.0));
    engine.handle_input(InputEvent::mouse(InputEventKind::Up, 1100.0, 1100.0, 30.0));
    engine.apply_remote_update(
        &RemoteUpdate {
            pieces: Vec::new(),
            selections: vec![SelectionRecord {
                user_id: "remote".to_string(),
                name: "Remote".to_string(),
                color: [0, 200, 120, 255],
                piece_ids: vec![2],
                positions: Vec::new(),
                reference_selected: false,
                reference_pos: None,
            }],
        },
        40.0,
    );

    let mut surface = RecordingSurface::new(800, 600);
    engine.render(&mut surface);
    let at = |item| surface.position_of(item).expect("drawn");

    assert!(matches!(surface.ops.first(), Some(DrawOp::Clear(_))));
    assert!(at(DrawItem::Piece(3)) < at(DrawItem::Reference));
    assert!(at(DrawItem::Reference) < at(DrawItem::Piece(1)));
    assert!(at(DrawItem::Piece(1)) < at(DrawItem::Piece(2)));
    assert!(at(DrawItem::Piece(2)) < at(DrawItem::Piece(0)));
    assert!(at(DrawItem::Piece(0)) < at(DrawItem::SelectionOutline(0)));
    assert!(at(DrawItem::SelectionOutline(0)) < at(DrawItem::RemoteOutline(2)));
    assert!(at(DrawItem::RemoteOutline(2)) < at(DrawItem::RemoteTag));
    let reset = surface
        .ops
        .iter()
        .position(|op| matches!(op, DrawOp::ResetTransform))
        .expect("reset");
    assert!(at(DrawItem::RemoteTag) < reset);
    assert!(reset < at(DrawItem::Debug));
    assert_eq!(surface.position_of(DrawItem::SelectionOutline(3)), None);
}

#[test]
fn hidden_reference_and_idle_overlays_are_skipped() {
    let engine = engine(
        EngineConfig::default(),
        &[
            (1000.0, 1000.0, 0, false),
            (1600.0, 1000.0, 1, false),
            (1000.0, 1600.0, 2, false),
            (1600.0, 1600.0, 3, false),
        ],
    );
    let mut surface = RecordingSurface::new(800, 600);
    engine.render(&mut surface);
    let items = surface.items();
    assert_eq!(
        items,
        vec![
            DrawItem::Piece(0),
            DrawItem::Piece(1),
            DrawItem::Piece(2),
            DrawItem::Piece(3),
        ]
    );
}

#[test]
fn raster_frame_shows_pieces_over_background() {
    let engine = engine(
        EngineConfig::default(),
        &[
            (100.0, 100.0, 0, false),
            (1000.0, 1000.0, 1, false),
            (1000.0, 1600.0, 2, false),
            (1600.0, 1600.0, 3, false),
        ],
    );
    let mut surface = PixmapSurface::new(800, 600).expect("surface");
    engine.render(&mut surface);
    let frame = surface.to_rgba_image();
    let close = |a: [u8; 4], b: [u8; 4]| a.iter().zip(b).all(|(x, y)| x.abs_diff(y) <= 2);
    assert!(close(frame.get_pixel(200, 200).0, COLOR));
    assert!(close(frame.get_pixel(700, 500).0, BACKGROUND_COLOR));
}
