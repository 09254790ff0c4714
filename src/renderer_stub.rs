use crate::camera::Camera;
use crate::model::PieceBitmap;
use crate::renderer::{DrawItem, StrokeStyle, Surface};
use crate::shape::PiecePath;

#[derive(Clone, Debug, PartialEq)]
pub enum DrawOp {
    Clear([u8; 4]),
    SetCamera(Camera),
    ResetTransform,
    Bitmap {
        item: DrawItem,
        origin: (f32, f32),
        size: (u32, u32),
        opacity: f32,
    },
    StrokePath {
        item: DrawItem,
        svg: String,
        style: StrokeStyle,
    },
    StrokeRect {
        item: DrawItem,
        rect: (f32, f32, f32, f32),
        style: StrokeStyle,
    },
    FillRect {
        item: DrawItem,
        rect: (f32, f32, f32, f32),
        color: [u8; 4],
    },
    Label {
        item: DrawItem,
        text: String,
        at: (f32, f32),
        color: [u8; 4],
    },
}

impl DrawOp {
    pub fn item(&self) -> Option<DrawItem> {
        match self {
            DrawOp::Bitmap { item, .. }
            | DrawOp::StrokePath { item, .. }
            | DrawOp::StrokeRect { item, .. }
            | DrawOp::FillRect { item, .. }
            | DrawOp::Label { item, .. } => Some(*item),
            DrawOp::Clear(_) | DrawOp::SetCamera(_) | DrawOp::ResetTransform => None,
        }
    }
}

/// Display-list surface: records calls instead of painting.
#[derive(Clone, Debug, Default)]
pub struct RecordingSurface {
    pub width: u32,
    pub height: u32,
    pub ops: Vec<DrawOp>,
}

impl RecordingSurface {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            ops: Vec::new(),
        }
    }

    pub fn items(&self) -> Vec<DrawItem> {
        self.ops.iter().filter_map(DrawOp::item).collect()
    }

    pub fn position_of(&self, item: DrawItem) -> Option<usize> {
        self.ops.iter().position(|op| op.item() == Some(item))
    }

    pub fn clear_ops(&mut self) {
        self.ops.clear();
    }
}

impl Surface for RecordingSurface {
    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    fn clear(&mut self, color: [u8; 4]) {
        self.ops.push(DrawOp::Clear(color));
    }

    fn set_camera(&mut self, camera: &Camera) {
        self.ops.push(DrawOp::SetCamera(*camera));
    }

    fn reset_transform(&mut self) {
        self.ops.push(DrawOp::ResetTransform);
    }

    fn draw_bitmap(&mut self, item: DrawItem, bitmap: &PieceBitmap, origin: (f32, f32), opacity: f32) {
        self.ops.push(DrawOp::Bitmap {
            item,
            origin,
            size: (bitmap.width(), bitmap.height()),
            opacity,
        });
    }

    fn stroke_path(&mut self, item: DrawItem, path: &PiecePath, style: &StrokeStyle) {
        self.ops.push(DrawOp::StrokePath {
            item,
            svg: path.to_svg(),
            style: *style,
        });
    }

    fn stroke_rect(&mut self, item: DrawItem, rect: (f32, f32, f32, f32), style: &StrokeStyle) {
        self.ops.push(DrawOp::StrokeRect {
            item,
            rect,
            style: *style,
        });
    }

    fn fill_rect(&mut self, item: DrawItem, rect: (f32, f32, f32, f32), color: [u8; 4]) {
        self.ops.push(DrawOp::FillRect { item, rect, color });
    }

    fn draw_label(&mut self, item: DrawItem, text: &str, at: (f32, f32), color: [u8; 4]) {
        self.ops.push(DrawOp::Label {
            item,
            text: text.to_string(),
            at,
            color,
        });
    }
}
