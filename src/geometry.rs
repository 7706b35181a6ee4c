use crate::error::PreviewError;
use crate::pattern::Bounds;
use serde::{Deserialize, Serialize};

/// Scale used when a design has no extent on either axis.
pub const FALLBACK_SCALE: f64 = 1.0;

/// Largest drawing surface side, in pixels, a render may allocate.
pub const MAX_SURFACE_SIDE: u32 = 8192;

/// Tolerance when snapping the drawing surface to whole pixels, so float
/// noise like `400.00000000000006` does not grow the surface by a pixel.
const GRID_EPSILON: f64 = 1e-6;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
    pub padding: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64, padding: f64) -> Self {
        Self {
            width,
            height,
            padding,
        }
    }

    pub fn validate(&self) -> Result<(), PreviewError> {
        let limit = f64::from(MAX_SURFACE_SIDE);
        for (name, value) in [
            ("width", self.width),
            ("height", self.height),
            ("padding", self.padding),
        ] {
            if !(value.is_finite() && value >= 0.0) {
                return Err(PreviewError::Viewport(format!(
                    "{name} must be finite and non-negative"
                )));
            }
            if value > limit {
                return Err(PreviewError::Viewport(format!("{name} {value} exceeds {limit}")));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn distance(&self, other: Point) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }
}

/// Design-space to surface-space transform for one render.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mapping {
    pub scale: f64,
    pub origin_x: f64,
    pub origin_y: f64,
    pub padding: f64,
    pub surface_width: u32,
    pub surface_height: u32,
}

impl Mapping {
    pub fn to_surface(&self, x: f64, y: f64) -> Point {
        Point::new(
            (x - self.origin_x) * self.scale + self.padding,
            (y - self.origin_y) * self.scale + self.padding,
        )
    }
}

fn snap_to_grid(length: f64) -> u32 {
    (length - GRID_EPSILON).ceil().max(1.0) as u32
}

/// Fit `bounds` into `viewport`, keeping aspect ratio.
///
/// A zero extent on one axis is ignored when choosing the scale; with no
/// extent on either axis the design is drawn at [`FALLBACK_SCALE`].
pub fn fit_to_viewport(bounds: &Bounds, viewport: &Viewport) -> Mapping {
    let padding = if viewport.padding.is_finite() {
        viewport.padding.max(0.0)
    } else {
        0.0
    };
    let available_w = (viewport.width - 2.0 * padding).max(1.0);
    let available_h = (viewport.height - 2.0 * padding).max(1.0);
    let pattern_w = bounds.width();
    let pattern_h = bounds.height();

    let scale = [(available_w, pattern_w), (available_h, pattern_h)]
        .into_iter()
        .filter(|(_, extent)| *extent > 0.0)
        .map(|(available, extent)| available / extent)
        .filter(|ratio| ratio.is_finite() && *ratio > 0.0)
        .reduce(f64::min)
        .unwrap_or(FALLBACK_SCALE);

    Mapping {
        scale,
        origin_x: bounds.min_x,
        origin_y: bounds.min_y,
        padding,
        surface_width: snap_to_grid(pattern_w * scale + 2.0 * padding),
        surface_height: snap_to_grid(pattern_h * scale + 2.0 * padding),
    }
}
