use image::RgbaImage;
use pieceworks_core::game::PieceId;
use tiny_skia::{
    Color, FillRule, Paint, PathBuilder, Pixmap, PixmapPaint, Rect, Stroke, StrokeDash, Transform,
};

use crate::camera::Camera;
use crate::model::{Piece, PieceBitmap};
use crate::reference::ReferenceImage;
use crate::remote::RemoteSelections;
use crate::shape::PiecePath;

pub const BACKGROUND_COLOR: [u8; 4] = [0x2B, 0x2D, 0x31, 0xFF];
pub const SELECTION_COLOR: [u8; 4] = [0xFF, 0xD5, 0x4A, 0xFF];
pub const LASSO_COLOR: [u8; 4] = [0x7F, 0xB8, 0xFF, 0xFF];
pub const DEBUG_COLOR: [u8; 4] = [0xE8, 0xE8, 0xE8, 0xFF];
pub const TOUCH_COLOR: [u8; 4] = [0xFF, 0xFF, 0xFF, 0x80];
pub const OUTLINE_WIDTH_PX: f32 = 2.0;
pub const REMOTE_DASH_PX: [f32; 2] = [6.0, 4.0];
const TOUCH_MARKER_PX: f32 = 24.0;

/// What a draw call is for; surfaces that only paint can ignore it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DrawItem {
    Piece(PieceId),
    Reference,
    SelectionOutline(PieceId),
    ReferenceOutline,
    Lasso,
    RemoteOutline(PieceId),
    RemoteReference,
    RemoteTag,
    TouchPoint,
    Debug,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StrokeStyle {
    pub color: [u8; 4],
    pub width: f32,
    pub dash: Option<[f32; 2]>,
}

/// Drawing backend. World-space calls happen between `set_camera` and
/// `reset_transform`; everything after the reset is in screen pixels.
pub trait Surface {
    fn size(&self) -> (u32, u32);
    fn clear(&mut self, color: [u8; 4]);
    fn set_camera(&mut self, camera: &Camera);
    fn reset_transform(&mut self);
    fn draw_bitmap(&mut self, item: DrawItem, bitmap: &PieceBitmap, origin: (f32, f32), opacity: f32);
    fn stroke_path(&mut self, item: DrawItem, path: &PiecePath, style: &StrokeStyle);
    fn stroke_rect(&mut self, item: DrawItem, rect: (f32, f32, f32, f32), style: &StrokeStyle);
    fn fill_rect(&mut self, item: DrawItem, rect: (f32, f32, f32, f32), color: [u8; 4]);
    fn draw_label(&mut self, item: DrawItem, text: &str, at: (f32, f32), color: [u8; 4]);
}

/// Everything one frame needs, borrowed from the engine.
pub struct FrameScene<'a> {
    pub pieces: &'a [Piece],
    pub camera: Camera,
    pub reference: Option<&'a ReferenceImage>,
    pub lasso: Option<((f32, f32), (f32, f32))>,
    pub remote: &'a RemoteSelections,
    pub touches: Vec<(f32, f32)>,
    pub debug_text: Option<String>,
}

fn normalized_rect(a: (f32, f32), b: (f32, f32)) -> (f32, f32, f32, f32) {
    let x = a.0.min(b.0);
    let y = a.1.min(b.1);
    (x, y, (a.0 - b.0).abs(), (a.1 - b.1).abs())
}

/// Paint order: locked pieces, reference overlay, unlocked pieces by
/// z-index, local highlights, remote highlights, then screen overlays.
pub fn compose_frame(surface: &mut dyn Surface, scene: &FrameScene<'_>) {
    surface.clear(BACKGROUND_COLOR);
    surface.set_camera(&scene.camera);
    let scale = scene.camera.scale.max(1.0e-4);
    let line = OUTLINE_WIDTH_PX / scale;

    let mut locked: Vec<&Piece> = scene.pieces.iter().filter(|p| p.is_locked).collect();
    locked.sort_by_key(|piece| (piece.z_index, piece.id));
    for piece in locked {
        surface.draw_bitmap(DrawItem::Piece(piece.id), &piece.bitmap, piece.bitmap_origin(), 1.0);
    }

    if let Some(reference) = scene.reference.filter(|reference| reference.visible) {
        surface.draw_bitmap(
            DrawItem::Reference,
            &reference.bitmap,
            reference.position,
            reference.opacity,
        );
    }

    let mut loose: Vec<&Piece> = scene.pieces.iter().filter(|p| !p.is_locked).collect();
    loose.sort_by_key(|piece| (piece.z_index, piece.id));
    for piece in &loose {
        surface.draw_bitmap(DrawItem::Piece(piece.id), &piece.bitmap, piece.bitmap_origin(), 1.0);
    }

    let selected = StrokeStyle {
        color: SELECTION_COLOR,
        width: line,
        dash: None,
    };
    for piece in loose.iter().filter(|piece| piece.is_selected) {
        surface.stroke_path(
            DrawItem::SelectionOutline(piece.id),
            &piece.world_outline(),
            &selected,
        );
    }
    if let Some(reference) = scene
        .reference
        .filter(|reference| reference.visible && reference.is_selected)
    {
        let (w, h) = reference.size();
        surface.stroke_rect(
            DrawItem::ReferenceOutline,
            (reference.position.0, reference.position.1, w, h),
            &selected,
        );
    }

    if let Some((a, b)) = scene.lasso {
        surface.stroke_rect(
            DrawItem::Lasso,
            normalized_rect(a, b),
            &StrokeStyle {
                color: LASSO_COLOR,
                width: line,
                dash: Some([REMOTE_DASH_PX[0] / scale, REMOTE_DASH_PX[1] / scale]),
            },
        );
    }

    for remote in scene.remote.iter() {
        let style = StrokeStyle {
            color: remote.color,
            width: line,
            dash: Some([REMOTE_DASH_PX[0] / scale, REMOTE_DASH_PX[1] / scale]),
        };
        let mut tag_at: Option<(f32, f32)> = None;
        for id in &remote.piece_ids {
            let Some(piece) = scene.pieces.get(*id) else {
                continue;
            };
            surface.stroke_path(DrawItem::RemoteOutline(*id), &piece.world_outline(), &style);
            tag_at.get_or_insert(piece.bitmap_origin());
        }
        if let Some(reference) = scene.reference.filter(|_| remote.reference_selected) {
            let (w, h) = reference.size();
            let origin = remote.reference_pos.unwrap_or(reference.position);
            surface.stroke_rect(DrawItem::RemoteReference, (origin.0, origin.1, w, h), &style);
            tag_at.get_or_insert(origin);
        }
        if let Some(at) = tag_at {
            surface.draw_label(DrawItem::RemoteTag, &remote.name, at, remote.color);
        }
    }

    surface.reset_transform();
    for touch in &scene.touches {
        let half = TOUCH_MARKER_PX * 0.5;
        surface.fill_rect(
            DrawItem::TouchPoint,
            (touch.0 - half, touch.1 - half, TOUCH_MARKER_PX, TOUCH_MARKER_PX),
            TOUCH_COLOR,
        );
    }
    if let Some(text) = &scene.debug_text {
        surface.draw_label(DrawItem::Debug, text, (8.0, 8.0), DEBUG_COLOR);
    }
}

fn paint_for(color: [u8; 4]) -> Paint<'static> {
    let mut paint = Paint::default();
    paint.set_color_rgba8(color[0], color[1], color[2], color[3]);
    paint.anti_alias = true;
    paint
}

fn skia_stroke(style: &StrokeStyle) -> Stroke {
    Stroke {
        width: style.width.max(1.0e-3),
        dash: style
            .dash
            .and_then(|[on, off]| StrokeDash::new(vec![on, off], 0.0)),
        ..Stroke::default()
    }
}

/// Un-premultiplies a pixmap into a straight-alpha image.
pub fn pixmap_to_rgba(pixmap: &Pixmap) -> RgbaImage {
    let mut out = RgbaImage::new(pixmap.width(), pixmap.height());
    for (dst, src) in out.pixels_mut().zip(pixmap.pixels()) {
        let color = src.demultiply();
        dst.0 = [color.red(), color.green(), color.blue(), color.alpha()];
    }
    out
}

/// Raster surface backed by a tiny-skia pixmap.
pub struct PixmapSurface {
    pixmap: Pixmap,
    transform: Transform,
}

impl PixmapSurface {
    pub fn new(width: u32, height: u32) -> Option<Self> {
        Some(Self {
            pixmap: Pixmap::new(width, height)?,
            transform: Transform::identity(),
        })
    }

    pub fn pixmap(&self) -> &Pixmap {
        &self.pixmap
    }

    pub fn to_rgba_image(&self) -> RgbaImage {
        pixmap_to_rgba(&self.pixmap)
    }

    fn rect_path(rect: (f32, f32, f32, f32)) -> Option<tiny_skia::Path> {
        let rect = Rect::from_xywh(rect.0, rect.1, rect.2.max(1.0e-3), rect.3.max(1.0e-3))?;
        Some(PathBuilder::from_rect(rect))
    }
}

impl Surface for PixmapSurface {
    fn size(&self) -> (u32, u32) {
        (self.pixmap.width(), self.pixmap.height())
    }

    fn clear(&mut self, color: [u8; 4]) {
        self.pixmap
            .fill(Color::from_rgba8(color[0], color[1], color[2], color[3]));
    }

    fn set_camera(&mut self, camera: &Camera) {
        self.transform = camera.to_transform();
    }

    fn reset_transform(&mut self) {
        self.transform = Transform::identity();
    }

    fn draw_bitmap(&mut self, _item: DrawItem, bitmap: &PieceBitmap, origin: (f32, f32), opacity: f32) {
        let paint = PixmapPaint {
            opacity: opacity.clamp(0.0, 1.0),
            ..PixmapPaint::default()
        };
        self.pixmap.draw_pixmap(
            0,
            0,
            bitmap.pixmap().as_ref(),
            &paint,
            self.transform.pre_translate(origin.0, origin.1),
            None,
        );
    }

    fn stroke_path(&mut self, _item: DrawItem, path: &PiecePath, style: &StrokeStyle) {
        let Some(path) = path.to_skia_path() else {
            return;
        };
        self.pixmap.stroke_path(
            &path,
            &paint_for(style.color),
            &skia_stroke(style),
            self.transform,
            None,
        );
    }

    fn stroke_rect(&mut self, _item: DrawItem, rect: (f32, f32, f32, f32), style: &StrokeStyle) {
        let Some(path) = Self::rect_path(rect) else {
            return;
        };
        self.pixmap.stroke_path(
            &path,
            &paint_for(style.color),
            &skia_stroke(style),
            self.transform,
            None,
        );
    }

    fn fill_rect(&mut self, _item: DrawItem, rect: (f32, f32, f32, f32), color: [u8; 4]) {
        let Some(path) = Self::rect_path(rect) else {
            return;
        };
        self.pixmap.fill_path(
            &path,
            &paint_for(color),
            FillRule::Winding,
            self.transform,
            None,
        );
    }

    /// tiny-skia has no text shaping; labels render as a badge sized to
    /// the text.
    fn draw_label(&mut self, item: DrawItem, text: &str, at: (f32, f32), color: [u8; 4]) {
        let scale = self.transform.sx.max(1.0e-4);
        let width = (text.chars().count() as f32 * 7.0 + 8.0) / scale;
        let height = 16.0 / scale;
        self.fill_rect(item, (at.0, at.1 - height, width, height), color);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clear_fills_every_pixel() {
        let mut surface = PixmapSurface::new(4, 3).expect("surface");
        surface.clear([10, 20, 30, 255]);
        let image = surface.to_rgba_image();
        assert!(image.pixels().all(|p| p.0 == [10, 20, 30, 255]));
    }

    #[test]
    fn bitmap_lands_under_camera_transform() {
        let mut surface = PixmapSurface::new(40, 40).expect("surface");
        surface.clear([0, 0, 0, 255]);
        let mut pixmap = Pixmap::new(4, 4).expect("pixmap");
        pixmap.fill(Color::from_rgba8(255, 0, 0, 255));
        let bitmap = PieceBitmap::new(pixmap);
        surface.set_camera(&Camera {
            x: 10.0,
            y: 10.0,
            scale: 2.0,
        });
        surface.draw_bitmap(DrawItem::Reference, &bitmap, (2.0, 2.0), 1.0);
        let image = surface.to_rgba_image();
        assert_eq!(image.get_pixel(16, 16).0, [255, 0, 0, 255]);
        assert_eq!(image.get_pixel(5, 5).0, [0, 0, 0, 255]);
    }
}
