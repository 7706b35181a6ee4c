use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

use crate::pattern::{Pattern, PatternStatistics};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TabId(pub u64);

#[derive(Debug, Clone)]
pub struct Tab {
    pub id: TabId,
    pub display_name: String,
    pub source_path: Option<PathBuf>,
    pub pattern: Option<Arc<Pattern>>,
}

impl Tab {
    pub fn is_empty(&self) -> bool {
        self.pattern.is_none()
    }
}

/// Where a finished load should land.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadTarget {
    ReplaceTab(TabId),
    NewTab { insert_at: Option<usize> },
}

/// An outstanding parse. Hand it back to the store together with the result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadTicket {
    pub id: u64,
    pub path: PathBuf,
    pub target: LoadTarget,
}

/// What an open request asks the caller to do next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OpenRequest {
    /// The file is already open; that tab is now active.
    Focused(TabId),
    /// Parse `ticket.path`, then call `complete_load`.
    Parse(LoadTicket),
    /// A parse for this path is already running.
    AlreadyLoading,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "tabId", rename_all = "camelCase")]
pub enum LoadOutcome {
    Applied(TabId),
    Focused(TabId),
    /// The result arrived for a tab that no longer exists.
    Discarded,
    AlreadyLoading,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TabSummary {
    pub id: TabId,
    pub display_name: String,
    pub source_path: Option<String>,
    pub has_pattern: bool,
    pub loading: bool,
    pub label: Option<String>,
    pub stitch_count: usize,
    pub color_changes: u32,
    pub statistics: Option<PatternStatistics>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub tabs: Vec<TabSummary>,
    pub active_tab_id: TabId,
}
