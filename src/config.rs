use crate::error::PreviewError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Thread colors used when no palette is configured.
pub const DEFAULT_PALETTE: &[&str] = &[
    "#CE1938", // Red
    "#13438D", // Royal Blue
    "#2E7D09", // Bright Green
    "#FFC723", // Topaz
    "#9C4E97", // Dark Lavender
    "#FF6F30", // Bright Orange
    "#4D999A", // Dark Turquoise
    "#85511F", // Medium Brown
    "#CD5E8D", // Dusty Rose
    "#86B500", // Kelly Green
    "#13213C", // Very Dark Navy Blue
    "#D3D3D3", // Pearl Gray
];

/// Pixel geometry of the tab strip, needed to resolve drag targets
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TabStripGeometry {
    pub header_height: f64,
    pub tab_width: f64,
    pub tab_spacing: f64,
    /// Space taken by controls placed before the first tab
    pub leading_offset: f64,
}

impl Default for TabStripGeometry {
    fn default() -> Self {
        Self {
            header_height: 40.0,
            tab_width: 160.0,
            tab_spacing: 4.0,
            leading_offset: 80.0,
        }
    }
}

impl TabStripGeometry {
    /// Distance between the left edges of two neighbouring tabs.
    pub fn slot_width(&self) -> f64 {
        self.tab_width + self.tab_spacing
    }
}

/// Preview configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    pub padding: f64,
    /// Stitches walked per frame
    pub batch_size: usize,
    pub palette: Vec<String>,
    /// Thread thickness in design units, before scaling
    pub thread_width: f64,
    pub min_stroke_width: f64,
    pub max_stroke_width: f64,
    pub shadow_factor: f32,
    pub highlight_factor: f32,
    pub tab_strip: TabStripGeometry,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            padding: 40.0,
            batch_size: 2000,
            palette: DEFAULT_PALETTE.iter().map(|hex| hex.to_string()).collect(),
            thread_width: 3.0,
            min_stroke_width: 0.75,
            max_stroke_width: 6.0,
            shadow_factor: 0.35,
            highlight_factor: 0.45,
            tab_strip: TabStripGeometry::default(),
        }
    }
}

impl PreviewConfig {
    pub fn from_json(raw: &str) -> Result<Self, PreviewError> {
        let config: Self =
            serde_json::from_str(raw).map_err(|err| PreviewError::Config(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read a config file, falling back to defaults when it does not exist.
    pub fn load(path: &Path) -> Result<Self, PreviewError> {
        if !path.exists() {
            log::info!("No preview config at {}, using defaults", path.display());
            return Ok(Self::default());
        }
        let raw = fs::read_to_string(path)?;
        Self::from_json(&raw)
    }

    pub fn validate(&self) -> Result<(), PreviewError> {
        if !(self.padding.is_finite() && self.padding >= 0.0) {
            return Err(PreviewError::Config(
                "padding must be finite and non-negative".to_string(),
            ));
        }
        if self.batch_size == 0 {
            return Err(PreviewError::Config("batch_size must be positive".to_string()));
        }
        if !(self.min_stroke_width > 0.0 && self.min_stroke_width <= self.max_stroke_width) {
            return Err(PreviewError::Config(
                "stroke widths must satisfy 0 < min <= max".to_string(),
            ));
        }
        if self.tab_strip.slot_width() <= 0.0 {
            return Err(PreviewError::Config("tab slot width must be positive".to_string()));
        }
        for factor in [self.shadow_factor, self.highlight_factor] {
            if !(0.0..=1.0).contains(&factor) {
                return Err(PreviewError::Config(
                    "blend factors must lie in 0..=1".to_string(),
                ));
            }
        }
        Ok(())
    }
}
