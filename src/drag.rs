use crate::config::TabStripGeometry;
use serde::Serialize;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DropZone {
    Header,
    Content,
    #[default]
    None,
}

/// Transient hover state; reset on leave and after every drop.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DragState {
    pub zone: DropZone,
    pub insertion_index: Option<usize>,
}

/// Tab strip state that changes while the window is open.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TabStripState {
    pub scroll_offset: f64,
    pub tab_count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropAction {
    InsertTab { path: PathBuf, index: usize },
    ReplaceActive { path: PathBuf },
}

/// Tab slot a pointer at `x` would insert before. Crossing the midpoint
/// between two tab centers moves to the next slot.
pub fn insertion_index(geometry: &TabStripGeometry, x: f64, strip: &TabStripState) -> usize {
    let slots = (x - geometry.leading_offset + strip.scroll_offset) / geometry.slot_width();
    let rounded = (slots + 0.5).floor();
    if rounded.is_nan() || rounded <= 0.0 {
        0
    } else {
        (rounded as usize).min(strip.tab_count)
    }
}

pub fn resolve(geometry: &TabStripGeometry, x: f64, y: f64, strip: &TabStripState) -> DragState {
    if y < geometry.header_height {
        DragState {
            zone: DropZone::Header,
            insertion_index: Some(insertion_index(geometry, x, strip)),
        }
    } else {
        DragState {
            zone: DropZone::Content,
            insertion_index: None,
        }
    }
}

/// Follows one file drag gesture over the window.
#[derive(Debug, Default)]
pub struct DragTracker {
    geometry: TabStripGeometry,
    state: DragState,
}

impl DragTracker {
    pub fn new(geometry: TabStripGeometry) -> Self {
        Self {
            geometry,
            state: DragState::default(),
        }
    }

    pub fn hover(&mut self, x: f64, y: f64, strip: &TabStripState) -> DragState {
        self.state = resolve(&self.geometry, x, y, strip);
        self.state
    }

    pub fn leave(&mut self) {
        self.state = DragState::default();
    }

    /// Resolve a drop. Only the first path is used.
    pub fn drop_paths(
        &mut self,
        paths: &[PathBuf],
        x: f64,
        y: f64,
        strip: &TabStripState,
    ) -> Option<DropAction> {
        let resolved = resolve(&self.geometry, x, y, strip);
        self.state = DragState::default();

        let path = paths.first()?.clone();
        Some(match resolved.insertion_index {
            Some(index) => DropAction::InsertTab { path, index },
            None => DropAction::ReplaceActive { path },
        })
    }
}
