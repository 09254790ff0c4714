pub type PieceId = usize;
pub type GroupId = usize;

pub const DIR_UP: usize = 0;
pub const DIR_RIGHT: usize = 1;
pub const DIR_DOWN: usize = 2;
pub const DIR_LEFT: usize = 3;
pub const DIRECTIONS: [usize; 4] = [DIR_UP, DIR_RIGHT, DIR_DOWN, DIR_LEFT];

pub const SCATTER_SALT: u32 = 0x5CA7_7EED;
pub const SCATTER_JITTER_RATIO_DEFAULT: f32 = 0.15;
pub const SCATTER_JITTER_RATIO_MAX: f32 = 0.3;

pub fn splitmix32(mut value: u32) -> u32 {
    value = value.wrapping_add(0x9E37_79B9);
    let mut z = value;
    z = (z ^ (z >> 16)).wrapping_mul(0x85EB_CA6B);
    z = (z ^ (z >> 13)).wrapping_mul(0xC2B2_AE35);
    z ^ (z >> 16)
}

/// Uniform value in `[0, 1)` derived from `(seed, salt)` alone.
pub fn rand_unit(seed: u32, salt: u32) -> f32 {
    let mixed = splitmix32(seed ^ splitmix32(salt));
    let top = mixed >> 8;
    top as f32 / ((1u32 << 24) as f32)
}

pub fn rand_range(seed: u32, salt: u32, min: f32, max: f32) -> f32 {
    min + (max - min) * rand_unit(seed, salt)
}

pub fn edge_seed(base: u32, orientation: u32, row: u32, col: u32) -> u32 {
    base ^ orientation.wrapping_mul(0x9E37_79B9)
        ^ row.wrapping_mul(0x85EB_CA6B)
        ^ col.wrapping_mul(0xC2B2_AE35)
}

pub fn neighbor_id(id: PieceId, cols: usize, rows: usize, dir: usize) -> Option<PieceId> {
    if cols == 0 || id >= cols * rows {
        return None;
    }
    let col = id % cols;
    let row = id / cols;
    match dir {
        DIR_UP if row > 0 => Some(id - cols),
        DIR_RIGHT if col + 1 < cols => Some(id + 1),
        DIR_DOWN if row + 1 < rows => Some(id + cols),
        DIR_LEFT if col > 0 => Some(id - 1),
        _ => None,
    }
}

pub fn opposite_dir(dir: usize) -> usize {
    match dir {
        DIR_UP => DIR_DOWN,
        DIR_RIGHT => DIR_LEFT,
        DIR_DOWN => DIR_UP,
        DIR_LEFT => DIR_RIGHT,
        _ => DIR_UP,
    }
}

/// Solved top-left corner of cell `id`.
pub fn cell_origin(id: PieceId, cols: usize, cell_width: f32, cell_height: f32) -> (f32, f32) {
    let cols = cols.max(1);
    (
        (id % cols) as f32 * cell_width,
        (id / cols) as f32 * cell_height,
    )
}

/// Seeded Fisher-Yates over the grid cells, followed by a pass that swaps
/// any cell left on itself with its successor. The result never maps an
/// index onto itself when `total >= 2`.
pub fn scatter_order(seed: u32, total: usize) -> Vec<usize> {
    let mut order: Vec<usize> = (0..total).collect();
    for i in (1..order.len()).rev() {
        let salt = 0xC0DE_u32.wrapping_add(i as u32);
        let j = ((rand_unit(seed, salt) * (i as f32 + 1.0)) as usize).min(i);
        order.swap(i, j);
    }
    if total >= 2 {
        for i in 0..total {
            if order[i] == i {
                let j = (i + 1) % total;
                order.swap(i, j);
            }
        }
    }
    order
}

/// Initial positions: each piece takes another piece's cell, nudged by a
/// bounded jitter and kept inside the puzzle's own area.
pub fn scatter_positions(
    seed: u32,
    cols: usize,
    rows: usize,
    cell_width: f32,
    cell_height: f32,
    jitter_ratio: f32,
) -> Vec<(f32, f32)> {
    let total = cols * rows;
    let seed = seed ^ SCATTER_SALT;
    let order = scatter_order(seed, total);
    let jitter = jitter_ratio.clamp(0.0, SCATTER_JITTER_RATIO_MAX);
    let jitter_x = cell_width * jitter;
    let jitter_y = cell_height * jitter;
    let max_x = (cols.saturating_sub(1)) as f32 * cell_width;
    let max_y = (rows.saturating_sub(1)) as f32 * cell_height;
    order
        .iter()
        .enumerate()
        .map(|(id, slot)| {
            let (sx, sy) = cell_origin(*slot, cols, cell_width, cell_height);
            let salt = 0x0005_CA77_u32.wrapping_add((id as u32) << 1);
            let x = sx + rand_range(seed, salt, -jitter_x, jitter_x);
            let y = sy + rand_range(seed, salt.wrapping_add(1), -jitter_y, jitter_y);
            (x.clamp(0.0, max_x), y.clamp(0.0, max_y))
        })
        .collect()
}

pub fn distance(a: (f32, f32), b: (f32, f32)) -> f32 {
    let dx = a.0 - b.0;
    let dy = a.1 - b.1;
    (dx * dx + dy * dy).sqrt()
}
