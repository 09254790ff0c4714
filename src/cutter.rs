use image::RgbaImage;
use pieceworks_core::game::{cell_origin, scatter_positions};
use pieceworks_core::grid::{grid_for_count, GridChoice};
use tiny_skia::{FillRule, Mask, Pixmap, Transform};
use tracing::{debug, info};

use crate::error::CutError;
use crate::model::{Piece, PieceBitmap};
use crate::shape::{build_edge_maps, build_piece_path, ShapeSettings};

/// Output of a cut: geometry shared by every piece plus the pieces
/// themselves, already scattered.
#[derive(Clone, Debug)]
pub struct CutPuzzle {
    pub grid: GridChoice,
    pub image_width: u32,
    pub image_height: u32,
    pub cell_width: f32,
    pub cell_height: f32,
    pub tab_size: f32,
    pub padding: f32,
    pub seed: u32,
    pub shape: ShapeSettings,
    pub pieces: Vec<Piece>,
    pub reference: PieceBitmap,
}

impl CutPuzzle {
    pub fn cols(&self) -> usize {
        self.grid.cols as usize
    }

    pub fn rows(&self) -> usize {
        self.grid.rows as usize
    }

    pub fn piece_count(&self) -> usize {
        self.pieces.len()
    }
}

pub fn cut(image: &RgbaImage, target: u32, seed: Option<u32>) -> Result<CutPuzzle, CutError> {
    cut_with_settings(image, target, seed, &ShapeSettings::default())
}

pub fn cut_with_settings(
    image: &RgbaImage,
    target: u32,
    seed: Option<u32>,
    settings: &ShapeSettings,
) -> Result<CutPuzzle, CutError> {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return Err(CutError::EmptyImage);
    }
    let grid = grid_for_count(width, height, target).ok_or(CutError::InvalidPieceCount(target))?;
    if grid.cols > width || grid.rows > height {
        return Err(CutError::InvalidPieceCount(target));
    }
    let settings = settings.sanitized();
    let seed = seed.unwrap_or_else(rand::random::<u32>);
    let cols = grid.cols as usize;
    let rows = grid.rows as usize;
    let cell_width = width as f32 / grid.cols as f32;
    let cell_height = height as f32 / grid.rows as f32;
    let tab_size = settings.tab_size(cell_width, cell_height);
    let padding = settings.padding(tab_size);

    let edges = build_edge_maps(grid.rows, grid.cols, seed, &settings);
    let scatter = scatter_positions(
        seed,
        cols,
        rows,
        cell_width,
        cell_height,
        settings.scatter_jitter_ratio,
    );

    let mut pieces = Vec::with_capacity(grid.total());
    for id in 0..grid.total() {
        let row = id / cols;
        let col = id % cols;
        let sides = edges.piece_sides(row, col);
        let correct = cell_origin(id, cols, cell_width, cell_height);
        let bitmap = rasterize_piece(
            image,
            id,
            correct,
            cell_width,
            cell_height,
            padding,
            &sides,
            tab_size,
        )?;
        pieces.push(Piece {
            id,
            row: row as u32,
            col: col as u32,
            correct,
            current: scatter[id],
            cell_width,
            cell_height,
            padding,
            tab_size,
            sides,
            bitmap,
            is_placed: false,
            is_locked: false,
            is_selected: false,
            z_index: id as u32,
        });
    }

    let reference = rgba_to_pixmap(image)
        .map(PieceBitmap::new)
        .ok_or(CutError::EmptyImage)?;
    info!(
        cols,
        rows,
        seed,
        target,
        actual = grid.actual_count,
        "cut puzzle"
    );

    Ok(CutPuzzle {
        grid,
        image_width: width,
        image_height: height,
        cell_width,
        cell_height,
        tab_size,
        padding,
        seed,
        shape: settings,
        pieces,
        reference,
    })
}

#[allow(clippy::too_many_arguments)]
fn rasterize_piece(
    image: &RgbaImage,
    id: usize,
    origin: (f32, f32),
    cell_width: f32,
    cell_height: f32,
    padding: f32,
    sides: &[crate::shape::SideDescriptor; 4],
    tab_size: f32,
) -> Result<PieceBitmap, CutError> {
    let bitmap_w = (cell_width + padding * 2.0).ceil() as u32;
    let bitmap_h = (cell_height + padding * 2.0).ceil() as u32;
    let path = build_piece_path(cell_width, cell_height, sides, tab_size)
        .translated(padding, padding)
        .to_skia_path()
        .ok_or(CutError::Raster(id))?;
    let mut mask = Mask::new(bitmap_w, bitmap_h).ok_or(CutError::Raster(id))?;
    mask.fill_path(&path, FillRule::Winding, true, Transform::identity());
    let mut pixmap = Pixmap::new(bitmap_w, bitmap_h).ok_or(CutError::Raster(id))?;

    let (image_w, image_h) = image.dimensions();
    let src_x0 = origin.0 - padding;
    let src_y0 = origin.1 - padding;
    let coverage = mask.data();
    let data = pixmap.data_mut();
    for y in 0..bitmap_h {
        let sy = ((src_y0 + y as f32).floor().max(0.0) as u32).min(image_h - 1);
        for x in 0..bitmap_w {
            let index = (y * bitmap_w + x) as usize;
            let cover = coverage[index] as u32;
            if cover == 0 {
                continue;
            }
            let sx = ((src_x0 + x as f32).floor().max(0.0) as u32).min(image_w - 1);
            let [r, g, b, a] = image.get_pixel(sx, sy).0;
            let alpha = a as u32 * cover / 255;
            let out = index * 4;
            data[out] = (r as u32 * alpha / 255) as u8;
            data[out + 1] = (g as u32 * alpha / 255) as u8;
            data[out + 2] = (b as u32 * alpha / 255) as u8;
            data[out + 3] = alpha as u8;
        }
    }
    debug!(id, bitmap_w, bitmap_h, "rasterized piece");
    Ok(PieceBitmap::new(pixmap))
}

/// Copies straight RGBA into a premultiplied pixmap.
pub fn rgba_to_pixmap(image: &RgbaImage) -> Option<Pixmap> {
    let (width, height) = image.dimensions();
    let mut pixmap = Pixmap::new(width, height)?;
    for (dst, src) in pixmap.data_mut().chunks_exact_mut(4).zip(image.pixels()) {
        let [r, g, b, a] = src.0;
        let alpha = a as u32;
        dst[0] = (r as u32 * alpha / 255) as u8;
        dst[1] = (g as u32 * alpha / 255) as u8;
        dst[2] = (b as u32 * alpha / 255) as u8;
        dst[3] = a;
    }
    Some(pixmap)
}
