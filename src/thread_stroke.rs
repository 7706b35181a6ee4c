//! Thread-like rendering of a single stitch.
//!
//! Each segment is drawn three times: a darkened shadow nudged to one side,
//! the thread itself, and a thin lightened highlight nudged to the other
//! side. Together they read as a slightly raised strand of thread.

use crate::config::{PreviewConfig, DEFAULT_PALETTE};
use crate::error::PreviewError;
use crate::geometry::Point;
use crate::surface::{Stroke, Surface};
use palette::{LinSrgb, Mix, Srgb};

/// Segments shorter than this (in pixels) are skipped.
pub const MIN_SEGMENT_LENGTH: f64 = 0.01;

const SHADOW_OFFSET: f64 = 0.25;
const HIGHLIGHT_OFFSET: f64 = 0.15;
const HIGHLIGHT_WIDTH: f64 = 0.4;

/// Base, shadow and highlight tones for one palette entry
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThreadShades {
    pub base: [u8; 3],
    pub shadow: [u8; 3],
    pub highlight: [u8; 3],
}

fn blend(base: Srgb<u8>, toward: LinSrgb, factor: f32) -> [u8; 3] {
    let linear: LinSrgb = base.into_format::<f32>().into_linear();
    let mixed: Srgb<u8> = Srgb::<f32>::from_linear(linear.mix(toward, factor)).into_format();
    [mixed.red, mixed.green, mixed.blue]
}

impl ThreadShades {
    pub fn from_color(base: Srgb<u8>, shadow_factor: f32, highlight_factor: f32) -> Self {
        Self {
            base: [base.red, base.green, base.blue],
            shadow: blend(base, LinSrgb::new(0.0, 0.0, 0.0), shadow_factor),
            highlight: blend(base, LinSrgb::new(1.0, 1.0, 1.0), highlight_factor),
        }
    }
}

fn parse_palette<H: AsRef<str>>(hexes: &[H]) -> Result<Vec<Srgb<u8>>, PreviewError> {
    hexes
        .iter()
        .map(|hex| {
            let hex = hex.as_ref();
            hex.parse::<Srgb<u8>>()
                .map_err(|_| PreviewError::Config(format!("invalid palette color {hex:?}")))
        })
        .collect()
}

/// Stateless stroke policy for one render: palette plus a width fixed by the
/// render's scale.
#[derive(Debug, Clone)]
pub struct ThreadStrokeRenderer {
    shades: Vec<ThreadShades>,
    width: f64,
}

impl ThreadStrokeRenderer {
    pub fn new(config: &PreviewConfig, scale: f64) -> Result<Self, PreviewError> {
        let colors = if config.palette.is_empty() {
            parse_palette(DEFAULT_PALETTE)?
        } else {
            parse_palette(&config.palette)?
        };

        let shades = colors
            .into_iter()
            .map(|color| {
                ThreadShades::from_color(color, config.shadow_factor, config.highlight_factor)
            })
            .collect();

        Ok(Self {
            shades,
            width: stroke_width(config, scale),
        })
    }

    /// Same palette, stroke width recomputed for `scale`.
    pub fn with_scale(&self, config: &PreviewConfig, scale: f64) -> Self {
        Self {
            shades: self.shades.clone(),
            width: stroke_width(config, scale),
        }
    }

    pub fn shades(&self, color_index: usize) -> ThreadShades {
        self.shades[color_index % self.shades.len()]
    }

    /// Draw the segment `from -> to`. Returns false when it was too short to
    /// draw.
    pub fn draw_segment<S: Surface + ?Sized>(
        &self,
        surface: &mut S,
        from: Point,
        to: Point,
        color_index: usize,
    ) -> bool {
        let length = from.distance(to);
        if length.is_nan() || length < MIN_SEGMENT_LENGTH {
            return false;
        }

        let shades = self.shades(color_index);
        let (px, py) = (-(to.y - from.y) / length, (to.x - from.x) / length);
        let offset =
            |point: Point, amount: f64| Point::new(point.x + px * amount, point.y + py * amount);

        let shadow = self.width * SHADOW_OFFSET;
        let highlight = -self.width * HIGHLIGHT_OFFSET;

        surface.stroke(&Stroke {
            from: offset(from, shadow),
            to: offset(to, shadow),
            rgb: shades.shadow,
            width: self.width,
        });
        surface.stroke(&Stroke {
            from,
            to,
            rgb: shades.base,
            width: self.width,
        });
        surface.stroke(&Stroke {
            from: offset(from, highlight),
            to: offset(to, highlight),
            rgb: shades.highlight,
            width: self.width * HIGHLIGHT_WIDTH,
        });
        true
    }
}

/// Stroke width for a render at `scale`, kept readable at any zoom.
pub fn stroke_width(config: &PreviewConfig, scale: f64) -> f64 {
    let width = config.thread_width * scale;
    if width.is_finite() {
        width.clamp(config.min_stroke_width, config.max_stroke_width)
    } else {
        config.max_stroke_width
    }
}
