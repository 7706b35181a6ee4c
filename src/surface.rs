use crate::error::PreviewError;
use crate::geometry::Point;
use image::{ImageFormat, Rgba, RgbaImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_line_segment_mut, draw_polygon_mut};
use serde::Serialize;
use std::io::Cursor;

/// One round-capped line, already in surface pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Stroke {
    pub from: Point,
    pub to: Point,
    pub rgb: [u8; 3],
    pub width: f64,
}

/// Anything a render can draw onto.
pub trait Surface {
    /// Drop all previous content and resize.
    fn reset(&mut self, width: u32, height: u32);
    fn stroke(&mut self, stroke: &Stroke);
}

/// Pixel surface used for thumbnails and exact output comparisons.
pub struct RasterSurface {
    image: RgbaImage,
    background: Rgba<u8>,
}

impl RasterSurface {
    pub fn new(background: [u8; 4]) -> Self {
        Self {
            image: RgbaImage::new(0, 0),
            background: Rgba(background),
        }
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    pub fn to_png(&self) -> Result<Vec<u8>, PreviewError> {
        let mut bytes = Vec::new();
        self.image
            .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)?;
        Ok(bytes)
    }
}

impl Default for RasterSurface {
    fn default() -> Self {
        Self::new([255, 255, 255, 0])
    }
}

fn to_pixel(p: Point) -> imageproc::point::Point<i32> {
    imageproc::point::Point::new(p.x.round() as i32, p.y.round() as i32)
}

impl Surface for RasterSurface {
    fn reset(&mut self, width: u32, height: u32) {
        self.image = RgbaImage::from_pixel(width, height, self.background);
    }

    fn stroke(&mut self, stroke: &Stroke) {
        let [r, g, b] = stroke.rgb;
        let color = Rgba([r, g, b, 255]);
        let half = stroke.width / 2.0;
        let (dx, dy) = (stroke.to.x - stroke.from.x, stroke.to.y - stroke.from.y);
        let length = dx.hypot(dy);

        if length > 0.0 {
            let (nx, ny) = (-dy / length * half, dx / length * half);
            let quad = [
                to_pixel(Point::new(stroke.from.x + nx, stroke.from.y + ny)),
                to_pixel(Point::new(stroke.to.x + nx, stroke.to.y + ny)),
                to_pixel(Point::new(stroke.to.x - nx, stroke.to.y - ny)),
                to_pixel(Point::new(stroke.from.x - nx, stroke.from.y - ny)),
            ];
            // Hairlines collapse to a closed polygon, which imageproc rejects.
            if quad[0] != quad[3] && quad[1] != quad[2] {
                draw_polygon_mut(&mut self.image, &quad, color);
            } else {
                draw_line_segment_mut(
                    &mut self.image,
                    (stroke.from.x as f32, stroke.from.y as f32),
                    (stroke.to.x as f32, stroke.to.y as f32),
                    color,
                );
            }
        }

        let radius = half.round() as i32;
        if radius >= 1 {
            for end in [stroke.from, stroke.to] {
                let center = to_pixel(end);
                draw_filled_circle_mut(&mut self.image, (center.x, center.y), radius, color);
            }
        }
    }
}

/// Records strokes so a frame can be replayed onto a webview canvas.
#[derive(Debug, Default, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StrokeList {
    pub width: u32,
    pub height: u32,
    /// Set when the receiver must wipe its canvas before drawing `strokes`.
    pub cleared: bool,
    pub strokes: Vec<Stroke>,
}

impl StrokeList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hand over everything recorded since the last call.
    pub fn take(&mut self) -> StrokeList {
        let frame = StrokeList {
            width: self.width,
            height: self.height,
            cleared: self.cleared,
            strokes: std::mem::take(&mut self.strokes),
        };
        self.cleared = false;
        frame
    }
}

impl Surface for StrokeList {
    fn reset(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.cleared = true;
        self.strokes.clear();
    }

    fn stroke(&mut self, stroke: &Stroke) {
        self.strokes.push(*stroke);
    }
}
