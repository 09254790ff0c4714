use image::{Rgba, RgbaImage};
use pieceworks::cutter::{cut, cut_with_settings};
use pieceworks::shape::{ShapeSettings, TabDirection};
use pieceworks::CutError;
use pieceworks_core::game::{DIR_DOWN, DIR_LEFT, DIR_RIGHT, DIR_UP};

fn landscape() -> RgbaImage {
    RgbaImage::from_fn(1200, 800, |x, y| {
        Rgba([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8, 255])
    })
}

#[test]
fn landscape_hundred_cuts_twelve_by_eight() {
    let puzzle = cut(&landscape(), 100, Some(7)).expect("cut");
    assert_eq!((puzzle.cols(), puzzle.rows()), (12, 8));
    assert_eq!(puzzle.piece_count(), 96);
    assert_eq!(puzzle.pieces.len(), 96);
    assert_eq!(puzzle.cell_width, 100.0);
    assert_eq!(puzzle.cell_height, 100.0);
    for piece in &puzzle.pieces {
        assert!(piece.bitmap.opaque_pixel_count() > 0, "piece {} is empty", piece.id);
        assert_eq!(piece.correct, (piece.col as f32 * 100.0, piece.row as f32 * 100.0));
    }
}

#[test]
fn same_seed_cuts_identically() {
    let image = landscape();
    let a = cut(&image, 48, Some(99)).expect("cut a");
    let b = cut(&image, 48, Some(99)).expect("cut b");
    assert_eq!(a.pieces.len(), b.pieces.len());
    for (left, right) in a.pieces.iter().zip(&b.pieces) {
        assert_eq!(left.sides, right.sides);
        assert_eq!(left.current, right.current);
        assert_eq!(left.outline().to_svg(), right.outline().to_svg());
        assert_eq!(left.bitmap.pixmap().data(), right.bitmap.pixmap().data());
    }
}

#[test]
fn different_seeds_change_the_cut() {
    let image = landscape();
    let a = cut(&image, 48, Some(1)).expect("cut a");
    let b = cut(&image, 48, Some(2)).expect("cut b");
    let same = a
        .pieces
        .iter()
        .zip(&b.pieces)
        .all(|(left, right)| left.sides == right.sides);
    assert!(!same);
}

#[test]
fn neighbouring_sides_interlock() {
    let puzzle = cut(&landscape(), 100, Some(7)).expect("cut");
    let cols = puzzle.cols();
    for piece in &puzzle.pieces {
        let row = piece.row as usize;
        let col = piece.col as usize;
        if col + 1 < cols {
            let right = &puzzle.pieces[piece.id + 1];
            assert_eq!(piece.sides[DIR_RIGHT].direction.inverted(), right.sides[DIR_LEFT].direction);
            assert_eq!(piece.sides[DIR_RIGHT].variation, right.sides[DIR_LEFT].variation);
            assert_ne!(piece.sides[DIR_RIGHT].direction, TabDirection::Flat);
        } else {
            assert!(piece.sides[DIR_RIGHT].is_flat());
        }
        if row + 1 < puzzle.rows() {
            let below = &puzzle.pieces[piece.id + cols];
            assert_eq!(piece.sides[DIR_DOWN].direction.inverted(), below.sides[DIR_UP].direction);
        } else {
            assert!(piece.sides[DIR_DOWN].is_flat());
        }
        if row == 0 {
            assert!(piece.sides[DIR_UP].is_flat());
        }
        if col == 0 {
            assert!(piece.sides[DIR_LEFT].is_flat());
        }
    }
}

#[test]
fn no_piece_starts_solved() {
    let puzzle = cut(&landscape(), 24, Some(3)).expect("cut");
    for piece in &puzzle.pieces {
        assert!(piece.distance_to_correct() > 0.0, "piece {} starts solved", piece.id);
    }
}

#[test]
fn scatter_stays_on_the_board() {
    let puzzle = cut(&landscape(), 100, Some(5)).expect("cut");
    let max_x = (puzzle.cols() - 1) as f32 * puzzle.cell_width;
    let max_y = (puzzle.rows() - 1) as f32 * puzzle.cell_height;
    for piece in &puzzle.pieces {
        assert!(piece.current.0 >= 0.0 && piece.current.0 <= max_x);
        assert!(piece.current.1 >= 0.0 && piece.current.1 <= max_y);
    }
}

#[test]
fn bitmaps_carry_image_pixels() {
    let image = RgbaImage::from_pixel(400, 400, Rgba([200, 40, 10, 255]));
    let puzzle = cut(&image, 4, Some(1)).expect("cut");
    let piece = &puzzle.pieces[0];
    let inside = (
        (piece.padding + piece.cell_width * 0.5) as i64,
        (piece.padding + piece.cell_height * 0.5) as i64,
    );
    assert_eq!(piece.bitmap.alpha_at(inside.0, inside.1), 255);
    assert_eq!(piece.bitmap.alpha_at(0, 0), 0);
    assert_eq!(piece.bitmap.alpha_at(-5, 3), 0);
}

#[test]
fn extreme_shape_settings_are_clamped() {
    let settings = ShapeSettings {
        tab_size_ratio: 9.0,
        ..ShapeSettings::default()
    };
    let puzzle = cut_with_settings(&landscape(), 24, Some(4), &settings).expect("cut");
    assert!(puzzle.tab_size < puzzle.cell_width.min(puzzle.cell_height));
    assert!(puzzle.pieces.iter().all(|piece| piece.bitmap.opaque_pixel_count() > 0));
}

#[test]
fn degenerate_inputs_are_rejected() {
    let empty = RgbaImage::new(0, 0);
    assert!(matches!(cut(&empty, 24, Some(1)), Err(CutError::EmptyImage)));
    assert!(matches!(
        cut(&landscape(), 0, Some(1)),
        Err(CutError::InvalidPieceCount(0))
    ));
    let tiny = RgbaImage::from_pixel(3, 3, Rgba([0, 0, 0, 255]));
    assert!(matches!(
        cut(&tiny, 100, Some(1)),
        Err(CutError::InvalidPieceCount(100))
    ));
    assert!(matches!(
        cut(&landscape(), u32::MAX, Some(1)),
        Err(CutError::InvalidPieceCount(u32::MAX))
    ));
}
