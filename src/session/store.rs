use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::drag::DropAction;
use crate::dst::PatternParser;
use crate::error::PreviewError;
use crate::pattern::Pattern;

use super::models::{
    LoadOutcome, LoadTarget, LoadTicket, OpenRequest, SessionSnapshot, Tab, TabId, TabSummary,
};

/// Extensions that may be handed to the parser, compared case-insensitively.
pub const SUPPORTED_EXTENSIONS: &[&str] = &["dst"];

const EMPTY_TAB_NAME: &str = "New Tab";

pub fn is_supported_design(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            SUPPORTED_EXTENSIONS
                .iter()
                .any(|supported| supported.eq_ignore_ascii_case(ext))
        })
}

/// Last segment of `path`, accepting either separator.
pub fn display_name(path: &Path) -> String {
    let raw = path.to_string_lossy();
    raw.rsplit(['/', '\\'])
        .find(|segment| !segment.is_empty())
        .unwrap_or(raw.as_ref())
        .to_string()
}

fn normalize_path(path: &Path) -> PathBuf {
    path.components().collect()
}

/// Ordered tabs plus the active selection.
///
/// Tabs are addressed by id only; positions shift on insert and close.
pub struct SessionStore {
    tabs: Vec<Tab>,
    active: TabId,
    next_tab_id: u64,
    next_ticket_id: u64,
    pending: HashMap<u64, LoadTicket>,
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStore {
    pub fn new() -> Self {
        let first = Tab {
            id: TabId(1),
            display_name: EMPTY_TAB_NAME.to_string(),
            source_path: None,
            pattern: None,
        };
        Self {
            active: first.id,
            tabs: vec![first],
            next_tab_id: 2,
            next_ticket_id: 1,
            pending: HashMap::new(),
        }
    }

    pub fn tabs(&self) -> &[Tab] {
        &self.tabs
    }

    pub fn tab_count(&self) -> usize {
        self.tabs.len()
    }

    pub fn tab(&self, id: TabId) -> Option<&Tab> {
        self.tabs.iter().find(|tab| tab.id == id)
    }

    pub fn active_tab_id(&self) -> TabId {
        self.active
    }

    pub fn active_tab(&self) -> &Tab {
        self.tab(self.active).unwrap_or(&self.tabs[0])
    }

    pub fn active_pattern(&self) -> Option<Arc<Pattern>> {
        self.active_tab().pattern.clone()
    }

    pub fn find_by_path(&self, path: &Path) -> Option<TabId> {
        let wanted = normalize_path(path);
        self.tabs
            .iter()
            .find(|tab| tab.source_path.as_deref() == Some(wanted.as_path()))
            .map(|tab| tab.id)
    }

    fn position(&self, id: TabId) -> Option<usize> {
        self.tabs.iter().position(|tab| tab.id == id)
    }

    fn allocate_tab_id(&mut self) -> TabId {
        let id = TabId(self.next_tab_id);
        self.next_tab_id += 1;
        id
    }

    fn is_loading(&self, path: &Path) -> bool {
        self.pending.values().any(|ticket| ticket.path == path)
    }

    pub fn switch_tab(&mut self, id: TabId) -> bool {
        if self.tab(id).is_none() {
            log::warn!("Ignoring switch to unknown tab {}", id.0);
            return false;
        }
        self.active = id;
        true
    }

    /// Activate an existing empty tab, or append a new one.
    pub fn add_empty_tab(&mut self) -> TabId {
        if let Some(existing) = self.tabs.iter().find(|tab| tab.is_empty()) {
            self.active = existing.id;
            return existing.id;
        }

        let id = self.allocate_tab_id();
        self.tabs.push(Tab {
            id,
            display_name: EMPTY_TAB_NAME.to_string(),
            source_path: None,
            pattern: None,
        });
        self.active = id;
        id
    }

    /// Remove a tab. The last remaining tab cannot be closed.
    pub fn close_tab(&mut self, id: TabId) -> bool {
        if self.tabs.len() <= 1 {
            return false;
        }
        let Some(index) = self.position(id) else {
            return false;
        };

        let closed = self.tabs.remove(index);
        if closed.id == self.active {
            self.active = self.tabs[0].id;
        }
        log::info!("Closed tab {} ({})", closed.id.0, closed.display_name);
        true
    }

    fn begin(&mut self, path: &Path, target: LoadTarget) -> Result<OpenRequest, PreviewError> {
        if !is_supported_design(path) {
            log::warn!("Rejected unsupported file {}", path.display());
            return Err(PreviewError::UnsupportedFormat(path.to_path_buf()));
        }

        let path = normalize_path(path);
        if let Some(existing) = self.find_by_path(&path) {
            self.active = existing;
            return Ok(OpenRequest::Focused(existing));
        }
        if self.is_loading(&path) {
            return Ok(OpenRequest::AlreadyLoading);
        }

        let ticket = LoadTicket {
            id: self.next_ticket_id,
            path,
            target,
        };
        self.next_ticket_id += 1;
        self.pending.insert(ticket.id, ticket.clone());
        log::info!("Loading {} (ticket {})", ticket.path.display(), ticket.id);
        Ok(OpenRequest::Parse(ticket))
    }

    /// Start loading `path` into the active tab, unless it is already open.
    pub fn begin_open(&mut self, path: &Path) -> Result<OpenRequest, PreviewError> {
        self.begin(path, LoadTarget::ReplaceTab(self.active))
    }

    /// Start loading `path` into a new tab at `insert_at` (appended when
    /// absent or out of range), unless it is already open.
    pub fn begin_open_in_new_tab(
        &mut self,
        path: &Path,
        insert_at: Option<usize>,
    ) -> Result<OpenRequest, PreviewError> {
        self.begin(path, LoadTarget::NewTab { insert_at })
    }

    /// Start the load a resolved file drop asks for.
    pub fn begin_drop(&mut self, action: &DropAction) -> Result<OpenRequest, PreviewError> {
        match action {
            DropAction::InsertTab { path, index } => self.begin_open_in_new_tab(path, Some(*index)),
            DropAction::ReplaceActive { path } => self.begin_open(path),
        }
    }

    /// Apply the result of a parse started by `begin_open*`.
    ///
    /// Results for tickets that are no longer outstanding, or whose target
    /// tab has been closed meanwhile, are dropped. On failure the tabs are
    /// left exactly as they were.
    pub fn complete_load(
        &mut self,
        ticket: &LoadTicket,
        result: Result<Pattern, PreviewError>,
    ) -> Result<LoadOutcome, PreviewError> {
        let Some(ticket) = self.pending.remove(&ticket.id) else {
            log::warn!("Dropping result for unknown load ticket {}", ticket.id);
            return Ok(LoadOutcome::Discarded);
        };

        let pattern = match result {
            Ok(pattern) => Arc::new(pattern),
            Err(err) => {
                log::warn!("Failed to load {}: {}", ticket.path.display(), err);
                return Err(match err {
                    err @ (PreviewError::ParseFailure(_) | PreviewError::UnsupportedFormat(_)) => {
                        err
                    }
                    other => PreviewError::ParseFailure(other.to_string()),
                });
            }
        };

        let holder = self.find_by_path(&ticket.path);
        let name = display_name(&ticket.path);

        match ticket.target {
            LoadTarget::ReplaceTab(target) => {
                if let Some(existing) = holder.filter(|id| *id != target) {
                    self.active = existing;
                    return Ok(LoadOutcome::Focused(existing));
                }
                let Some(index) = self.position(target) else {
                    log::warn!(
                        "Tab {} closed before {} finished loading",
                        target.0,
                        ticket.path.display()
                    );
                    return Ok(LoadOutcome::Discarded);
                };
                let tab = &mut self.tabs[index];
                tab.display_name = name;
                tab.source_path = Some(ticket.path);
                tab.pattern = Some(pattern);
                Ok(LoadOutcome::Applied(target))
            }
            LoadTarget::NewTab { insert_at } => {
                if let Some(existing) = holder {
                    self.active = existing;
                    return Ok(LoadOutcome::Focused(existing));
                }
                let id = self.allocate_tab_id();
                let index = insert_at
                    .filter(|index| *index <= self.tabs.len())
                    .unwrap_or(self.tabs.len());
                self.tabs.insert(
                    index,
                    Tab {
                        id,
                        display_name: name,
                        source_path: Some(ticket.path),
                        pattern: Some(pattern),
                    },
                );
                self.active = id;
                Ok(LoadOutcome::Applied(id))
            }
        }
    }

    fn run_load(
        &mut self,
        parser: &dyn PatternParser,
        request: OpenRequest,
    ) -> Result<LoadOutcome, PreviewError> {
        match request {
            OpenRequest::Focused(id) => Ok(LoadOutcome::Focused(id)),
            OpenRequest::AlreadyLoading => Ok(LoadOutcome::AlreadyLoading),
            OpenRequest::Parse(ticket) => {
                let result = parser.parse(&ticket.path);
                self.complete_load(&ticket, result)
            }
        }
    }

    /// Focus `path` if open, otherwise parse it into the active tab.
    pub fn open_or_focus(
        &mut self,
        parser: &dyn PatternParser,
        path: &Path,
    ) -> Result<LoadOutcome, PreviewError> {
        let request = self.begin_open(path)?;
        self.run_load(parser, request)
    }

    /// Focus `path` if open, otherwise parse it into a new tab.
    pub fn open_or_focus_in_new_tab(
        &mut self,
        parser: &dyn PatternParser,
        path: &Path,
        insert_at: Option<usize>,
    ) -> Result<LoadOutcome, PreviewError> {
        let request = self.begin_open_in_new_tab(path, insert_at)?;
        self.run_load(parser, request)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        let tabs = self
            .tabs
            .iter()
            .map(|tab| {
                let pattern = tab.pattern.as_deref();
                TabSummary {
                    id: tab.id,
                    display_name: tab.display_name.clone(),
                    source_path: tab
                        .source_path
                        .as_ref()
                        .map(|path| path.to_string_lossy().to_string()),
                    has_pattern: pattern.is_some(),
                    loading: self.pending.values().any(|ticket| {
                        ticket.target == LoadTarget::ReplaceTab(tab.id)
                    }),
                    label: pattern.and_then(|p| p.metadata.label.clone()),
                    stitch_count: pattern.map(|p| p.stitches.len()).unwrap_or(0),
                    color_changes: pattern.map(|p| p.color_changes).unwrap_or(0),
                    statistics: pattern.and_then(|p| p.statistics.clone()),
                }
            })
            .collect();

        SessionSnapshot {
            tabs,
            active_tab_id: self.active,
        }
    }
}
