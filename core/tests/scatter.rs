use pieceworks_core::game::{cell_origin, distance, scatter_positions};
use pieceworks_core::grid::grid_for_count;

#[test]
fn scatter_never_starts_on_the_solved_cell() {
    for seed in [0u32, 1, 7, 42, 0xDEAD_BEEF] {
        for target in [4u32, 24, 100, 300] {
            let choice = grid_for_count(1200, 800, target).expect("grid");
            let cols = choice.cols as usize;
            let rows = choice.rows as usize;
            let (cell_w, cell_h) = (1200.0 / cols as f32, 800.0 / rows as f32);
            let positions = scatter_positions(seed, cols, rows, cell_w, cell_h, 0.15);
            assert_eq!(positions.len(), cols * rows);
            for (id, pos) in positions.iter().enumerate() {
                let solved = cell_origin(id, cols, cell_w, cell_h);
                assert!(
                    distance(*pos, solved) > 1.0,
                    "piece {id} starts solved (seed {seed}, target {target})"
                );
            }
        }
    }
}

#[test]
fn scatter_stays_inside_the_puzzle_area() {
    let positions = scatter_positions(9, 6, 4, 50.0, 40.0, 0.3);
    for (x, y) in positions {
        assert!((0.0..=250.0).contains(&x));
        assert!((0.0..=120.0).contains(&y));
    }
}

#[test]
fn scatter_is_deterministic_per_seed() {
    let a = scatter_positions(42, 12, 8, 100.0, 100.0, 0.15);
    let b = scatter_positions(42, 12, 8, 100.0, 100.0, 0.15);
    let c = scatter_positions(43, 12, 8, 100.0, 100.0, 0.15);
    assert_eq!(a, b);
    assert_ne!(a, c);
}
