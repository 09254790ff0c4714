use pieceworks_core::game::{
    edge_seed, rand_range, rand_unit, DIR_DOWN, DIR_LEFT, DIR_RIGHT, DIR_UP,
};
use serde::{Deserialize, Serialize};
use std::fmt::Write;

pub const TAB_SIZE_RATIO_MIN: f32 = 0.05;
pub const TAB_SIZE_RATIO_MAX: f32 = 0.3;
pub const TAB_SIZE_RATIO_DEFAULT: f32 = 0.2;

/// Cut tunables. Variation ranges are fractions of the base tab size.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShapeSettings {
    pub tab_size_ratio: f32,
    pub neck_width: (f32, f32),
    pub head_width: (f32, f32),
    pub head_height: (f32, f32),
    pub neck_depth: (f32, f32),
    pub scatter_jitter_ratio: f32,
}

impl Default for ShapeSettings {
    fn default() -> Self {
        Self {
            tab_size_ratio: TAB_SIZE_RATIO_DEFAULT,
            neck_width: (0.8, 1.1),
            head_width: (1.3, 1.7),
            head_height: (0.55, 0.75),
            neck_depth: (0.35, 0.5),
            scatter_jitter_ratio: pieceworks_core::game::SCATTER_JITTER_RATIO_DEFAULT,
        }
    }
}

fn sanitize_range(range: (f32, f32), min: f32, max: f32, fallback: (f32, f32)) -> (f32, f32) {
    if !range.0.is_finite() || !range.1.is_finite() {
        return fallback;
    }
    let lo = range.0.min(range.1).clamp(min, max);
    let hi = range.0.max(range.1).clamp(min, max);
    (lo, hi)
}

impl ShapeSettings {
    pub fn sanitized(&self) -> Self {
        let defaults = Self::default();
        let tab_size_ratio = if self.tab_size_ratio.is_finite() {
            self.tab_size_ratio
                .clamp(TAB_SIZE_RATIO_MIN, TAB_SIZE_RATIO_MAX)
        } else {
            defaults.tab_size_ratio
        };
        let scatter_jitter_ratio = if self.scatter_jitter_ratio.is_finite() {
            self.scatter_jitter_ratio
                .clamp(0.0, pieceworks_core::game::SCATTER_JITTER_RATIO_MAX)
        } else {
            defaults.scatter_jitter_ratio
        };
        Self {
            tab_size_ratio,
            neck_width: sanitize_range(self.neck_width, 0.3, 1.4, defaults.neck_width),
            head_width: sanitize_range(self.head_width, 0.5, 2.0, defaults.head_width),
            head_height: sanitize_range(self.head_height, 0.2, 1.0, defaults.head_height),
            neck_depth: sanitize_range(self.neck_depth, 0.1, 0.8, defaults.neck_depth),
            scatter_jitter_ratio,
        }
    }

    /// Base tab size for a cell: a fraction of the smaller cell dimension.
    pub fn tab_size(&self, cell_width: f32, cell_height: f32) -> f32 {
        cell_width.min(cell_height) * self.tab_size_ratio
    }

    /// Furthest any tab can reach past its cell edge.
    pub fn max_protrusion(&self, tab_size: f32) -> f32 {
        tab_size * (self.neck_depth.1 + self.head_height.1)
    }

    /// Symmetric bitmap padding around the nominal cell.
    pub fn padding(&self, tab_size: f32) -> f32 {
        self.max_protrusion(tab_size).ceil() + 1.0
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TabDirection {
    Tab,
    Blank,
    Flat,
}

impl TabDirection {
    pub fn sign(self) -> f32 {
        match self {
            TabDirection::Tab => 1.0,
            TabDirection::Blank => -1.0,
            TabDirection::Flat => 0.0,
        }
    }

    pub fn inverted(self) -> Self {
        match self {
            TabDirection::Tab => TabDirection::Blank,
            TabDirection::Blank => TabDirection::Tab,
            TabDirection::Flat => TabDirection::Flat,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TabVariation {
    pub neck_width: f32,
    pub head_width: f32,
    pub head_height: f32,
    pub neck_depth: f32,
}

impl TabVariation {
    pub const ZERO: TabVariation = TabVariation {
        neck_width: 0.0,
        head_width: 0.0,
        head_height: 0.0,
        neck_depth: 0.0,
    };
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct SideDescriptor {
    pub direction: TabDirection,
    pub variation: TabVariation,
}

impl SideDescriptor {
    pub const FLAT: SideDescriptor = SideDescriptor {
        direction: TabDirection::Flat,
        variation: TabVariation::ZERO,
    };

    pub fn is_flat(&self) -> bool {
        self.direction == TabDirection::Flat
    }

    /// The touching side of the neighbouring piece.
    pub fn complement(&self) -> Self {
        Self {
            direction: self.direction.inverted(),
            variation: self.variation,
        }
    }
}

/// One internal edge. `direction` is seen from the top/left piece.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Edge {
    pub direction: TabDirection,
    pub variation: TabVariation,
}

pub fn edge_from_seed(seed: u32, settings: &ShapeSettings) -> Edge {
    let direction = if rand_unit(seed, 0) < 0.5 {
        TabDirection::Tab
    } else {
        TabDirection::Blank
    };
    let pick = |salt: u32, range: (f32, f32)| rand_range(seed, salt, range.0, range.1);
    Edge {
        direction,
        variation: TabVariation {
            neck_width: pick(1, settings.neck_width),
            head_width: pick(2, settings.head_width),
            head_height: pick(3, settings.head_height),
            neck_depth: pick(4, settings.neck_depth),
        },
    }
}

/// `horizontal[row][col]` is the top edge of cell `(row, col)`,
/// `vertical[row][col]` its left edge. Boundary slots stay `None`.
#[derive(Clone, Debug)]
pub struct EdgeMaps {
    pub rows: usize,
    pub cols: usize,
    pub horizontal: Vec<Vec<Option<Edge>>>,
    pub vertical: Vec<Vec<Option<Edge>>>,
}

pub fn build_edge_maps(rows: u32, cols: u32, seed: u32, settings: &ShapeSettings) -> EdgeMaps {
    let mut horizontal = vec![vec![None; cols as usize]; (rows + 1) as usize];
    for row in 1..rows {
        for col in 0..cols {
            let seed = edge_seed(seed, 0, row, col);
            horizontal[row as usize][col as usize] = Some(edge_from_seed(seed, settings));
        }
    }

    let mut vertical = vec![vec![None; (cols + 1) as usize]; rows as usize];
    for row in 0..rows {
        for col in 1..cols {
            let seed = edge_seed(seed, 1, row, col);
            vertical[row as usize][col as usize] = Some(edge_from_seed(seed, settings));
        }
    }

    EdgeMaps {
        rows: rows as usize,
        cols: cols as usize,
        horizontal,
        vertical,
    }
}

impl EdgeMaps {
    /// Side descriptors indexed by `DIR_UP`, `DIR_RIGHT`, `DIR_DOWN`, `DIR_LEFT`.
    pub fn piece_sides(&self, row: usize, col: usize) -> [SideDescriptor; 4] {
        let near = |edge: Option<&Edge>| {
            edge.map(|edge| SideDescriptor {
                direction: edge.direction,
                variation: edge.variation,
            })
            .unwrap_or(SideDescriptor::FLAT)
        };
        let mut sides = [SideDescriptor::FLAT; 4];
        sides[DIR_UP] = near(self.horizontal[row][col].as_ref()).complement();
        sides[DIR_DOWN] = near(self.horizontal[row + 1][col].as_ref());
        sides[DIR_LEFT] = near(self.vertical[row][col].as_ref()).complement();
        sides[DIR_RIGHT] = near(self.vertical[row][col + 1].as_ref());
        sides
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum PathCommand {
    MoveTo(f32, f32),
    LineTo(f32, f32),
    CubicTo {
        c1: (f32, f32),
        c2: (f32, f32),
        to: (f32, f32),
    },
    Close,
}

/// Closed piece outline in cell-local coordinates; `(0, 0)` is the cell's
/// top-left corner and tabs may reach into negative coordinates.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct PiecePath {
    pub commands: Vec<PathCommand>,
}

pub fn fmt_f32(value: f32) -> String {
    format!("{:.3}", value)
}

impl PiecePath {
    pub fn translated(&self, dx: f32, dy: f32) -> Self {
        let shift = |p: (f32, f32)| (p.0 + dx, p.1 + dy);
        let commands = self
            .commands
            .iter()
            .map(|command| match *command {
                PathCommand::MoveTo(x, y) => PathCommand::MoveTo(x + dx, y + dy),
                PathCommand::LineTo(x, y) => PathCommand::LineTo(x + dx, y + dy),
                PathCommand::CubicTo { c1, c2, to } => PathCommand::CubicTo {
                    c1: shift(c1),
                    c2: shift(c2),
                    to: shift(to),
                },
                PathCommand::Close => PathCommand::Close,
            })
            .collect();
        Self { commands }
    }

    pub fn to_skia_path(&self) -> Option<tiny_skia::Path> {
        let mut builder = tiny_skia::PathBuilder::new();
        for command in &self.commands {
            match *command {
                PathCommand::MoveTo(x, y) => builder.move_to(x, y),
                PathCommand::LineTo(x, y) => builder.line_to(x, y),
                PathCommand::CubicTo { c1, c2, to } => {
                    builder.cubic_to(c1.0, c1.1, c2.0, c2.1, to.0, to.1)
                }
                PathCommand::Close => builder.close(),
            }
        }
        builder.finish()
    }

    pub fn to_svg(&self) -> String {
        let mut out = String::new();
        for command in &self.commands {
            if !out.is_empty() {
                out.push(' ');
            }
            let _ = match *command {
                PathCommand::MoveTo(x, y) => write!(out, "M {} {}", fmt_f32(x), fmt_f32(y)),
                PathCommand::LineTo(x, y) => write!(out, "L {} {}", fmt_f32(x), fmt_f32(y)),
                PathCommand::CubicTo { c1, c2, to } => write!(
                    out,
                    "C {} {} {} {} {} {}",
                    fmt_f32(c1.0),
                    fmt_f32(c1.1),
                    fmt_f32(c2.0),
                    fmt_f32(c2.1),
                    fmt_f32(to.0),
                    fmt_f32(to.1)
                ),
                PathCommand::Close => write!(out, "Z"),
            };
        }
        out
    }
}

/// A side segment in its own frame: `t` runs along the side, `o` points
/// away from the piece.
#[derive(Clone, Copy, Debug)]
enum SideSegment {
    Line((f32, f32)),
    Cubic((f32, f32), (f32, f32), (f32, f32)),
}

fn side_profile(len: f32, side: &SideDescriptor, tab_size: f32) -> Vec<SideSegment> {
    if side.is_flat() {
        return vec![SideSegment::Line((len, 0.0))];
    }
    let s = side.direction.sign();
    let v = side.variation;
    let mid = len * 0.5;
    let neck = v.neck_width * tab_size * 0.5;
    let head = v.head_width * tab_size * 0.5;
    let nd = v.neck_depth * tab_size;
    let hh = v.head_height * tab_size;
    let o = |value: f32| value * s;

    vec![
        SideSegment::Line((mid - neck, 0.0)),
        SideSegment::Cubic(
            (mid - neck, o(nd)),
            (mid - head, o(nd)),
            (mid - head, o(nd + hh * 0.5)),
        ),
        SideSegment::Cubic(
            (mid - head, o(nd + hh * 0.9)),
            (mid - head * 0.5, o(nd + hh)),
            (mid, o(nd + hh)),
        ),
        SideSegment::Cubic(
            (mid + head * 0.5, o(nd + hh)),
            (mid + head, o(nd + hh * 0.9)),
            (mid + head, o(nd + hh * 0.5)),
        ),
        SideSegment::Cubic(
            (mid + head, o(nd)),
            (mid + neck, o(nd)),
            (mid + neck, 0.0),
        ),
        SideSegment::Line((len, 0.0)),
    ]
}

fn map_side_point(dir: usize, width: f32, height: f32, (t, o): (f32, f32)) -> (f32, f32) {
    match dir {
        DIR_UP => (t, 0.0 - o),
        DIR_RIGHT => (width + o, t),
        DIR_DOWN => (width - t, height + o),
        _ => (0.0 - o, height - t),
    }
}

/// Builds the clockwise outline starting at the top-left corner. Used both
/// to rasterize the bitmap and to redraw highlights, so the two match.
pub fn build_piece_path(
    width: f32,
    height: f32,
    sides: &[SideDescriptor; 4],
    tab_size: f32,
) -> PiecePath {
    let mut commands = vec![PathCommand::MoveTo(0.0, 0.0)];
    for dir in [DIR_UP, DIR_RIGHT, DIR_DOWN, DIR_LEFT] {
        let len = if dir == DIR_UP || dir == DIR_DOWN {
            width
        } else {
            height
        };
        let map = |p: (f32, f32)| map_side_point(dir, width, height, p);
        for segment in side_profile(len, &sides[dir], tab_size) {
            commands.push(match segment {
                SideSegment::Line(p) => {
                    let (x, y) = map(p);
                    PathCommand::LineTo(x, y)
                }
                SideSegment::Cubic(c1, c2, to) => PathCommand::CubicTo {
                    c1: map(c1),
                    c2: map(c2),
                    to: map(to),
                },
            });
        }
    }
    commands.push(PathCommand::Close);
    PiecePath { commands }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_piece_is_a_rectangle() {
        let path = build_piece_path(10.0, 20.0, &[SideDescriptor::FLAT; 4], 2.0);
        assert_eq!(
            path.to_svg(),
            "M 0.000 0.000 L 10.000 0.000 L 10.000 20.000 L 0.000 20.000 L 0.000 0.000 Z"
        );
    }

    #[test]
    fn tab_protrudes_and_blank_recedes() {
        let settings = ShapeSettings::default();
        let variation = TabVariation {
            neck_width: 1.0,
            head_width: 1.5,
            head_height: 0.6,
            neck_depth: 0.4,
        };
        let mut sides = [SideDescriptor::FLAT; 4];
        sides[DIR_UP] = SideDescriptor {
            direction: TabDirection::Tab,
            variation,
        };
        let path = build_piece_path(100.0, 100.0, &sides, 20.0);
        let min_y = path
            .commands
            .iter()
            .filter_map(|command| match command {
                PathCommand::CubicTo { to, .. } => Some(to.1),
                _ => None,
            })
            .fold(f32::MAX, f32::min);
        assert!((min_y + 20.0).abs() < 1e-4);
        assert!(settings.max_protrusion(20.0) >= 20.0);

        sides[DIR_UP] = sides[DIR_UP].complement();
        let path = build_piece_path(100.0, 100.0, &sides, 20.0);
        let max_y = path
            .commands
            .iter()
            .filter_map(|command| match command {
                PathCommand::CubicTo { to, .. } => Some(to.1),
                _ => None,
            })
            .fold(f32::MIN, f32::max);
        assert!((max_y - 20.0).abs() < 1e-4);
    }

    #[test]
    fn touching_sides_complement_each_other() {
        let maps = build_edge_maps(3, 4, 99, &ShapeSettings::default());
        for row in 0..3 {
            for col in 0..4 {
                let sides = maps.piece_sides(row, col);
                if col + 1 < 4 {
                    let right = maps.piece_sides(row, col + 1);
                    assert_eq!(sides[DIR_RIGHT].complement(), right[DIR_LEFT]);
                } else {
                    assert!(sides[DIR_RIGHT].is_flat());
                }
                if row + 1 < 3 {
                    let below = maps.piece_sides(row + 1, col);
                    assert_eq!(sides[DIR_DOWN].complement(), below[DIR_UP]);
                } else {
                    assert!(sides[DIR_DOWN].is_flat());
                }
            }
        }
    }

    #[test]
    fn sanitize_orders_and_clamps_ranges() {
        let settings = ShapeSettings {
            tab_size_ratio: 4.0,
            neck_width: (1.1, 0.8),
            head_height: (f32::NAN, 0.5),
            ..ShapeSettings::default()
        }
        .sanitized();
        assert_eq!(settings.tab_size_ratio, TAB_SIZE_RATIO_MAX);
        assert_eq!(settings.neck_width, (0.8, 1.1));
        assert_eq!(settings.head_height, ShapeSettings::default().head_height);
    }
}
