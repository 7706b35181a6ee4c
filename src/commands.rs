use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use rfd::FileDialog;
use serde::Serialize;
use tauri::State;

use crate::config::PreviewConfig;
use crate::drag::{DragState, DragTracker, TabStripState};
use crate::dst::{DstParser, PatternParser};
use crate::error::PreviewError;
use crate::preview::{self, surface_for, PreviewController};
use crate::render_scheduler::StepOutcome;
use crate::session::{
    LoadOutcome, OpenRequest, SessionSnapshot, SessionStore, TabId, SUPPORTED_EXTENSIONS,
};
use crate::surface::StrokeList;

/// Everything the window works on. One lock guards it; parsing happens
/// with the lock released. `canvas` is the one preview surface and always
/// shows the active tab.
pub struct Workbench {
    session: SessionStore,
    preview: PreviewController,
    canvas: StrokeList,
    drag: DragTracker,
}

impl Workbench {
    pub fn new(config: PreviewConfig) -> Result<Self, PreviewError> {
        let drag = DragTracker::new(config.tab_strip);
        Ok(Self {
            session: SessionStore::new(),
            preview: PreviewController::new(config)?,
            canvas: StrokeList::new(),
            drag,
        })
    }
}

pub struct WorkbenchLock(pub Mutex<Workbench>);

impl WorkbenchLock {
    fn lock(&self) -> Result<MutexGuard<'_, Workbench>, String> {
        self.0
            .lock()
            .map_err(|_| "Workbench lock poisoned".to_string())
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderFrame {
    pub outcome: StepOutcome,
    pub frame: StrokeList,
}

async fn run_request(
    state: &WorkbenchLock,
    request: OpenRequest,
) -> Result<LoadOutcome, String> {
    let ticket = match request {
        OpenRequest::Focused(id) => return Ok(LoadOutcome::Focused(id)),
        OpenRequest::AlreadyLoading => return Ok(LoadOutcome::AlreadyLoading),
        OpenRequest::Parse(ticket) => ticket,
    };

    let path = ticket.path.clone();
    // A failed task still hands its ticket back so the path is not left loading.
    let result = match tauri::async_runtime::spawn_blocking(move || DstParser.parse(&path)).await
    {
        Ok(result) => result,
        Err(e) => Err(PreviewError::ParseFailure(format!(
            "Design loading task failed: {}",
            e
        ))),
    };

    let mut workbench = state.lock()?;
    workbench
        .session
        .complete_load(&ticket, result)
        .map_err(|err| err.to_string())
}

#[tauri::command]
pub fn session_snapshot(state: State<'_, WorkbenchLock>) -> Result<SessionSnapshot, String> {
    Ok(state.lock()?.session.snapshot())
}

#[tauri::command]
pub async fn open_design(
    state: State<'_, WorkbenchLock>,
    path: String,
) -> Result<LoadOutcome, String> {
    let request = state
        .lock()?
        .session
        .begin_open(Path::new(&path))
        .map_err(|err| err.to_string())?;
    run_request(&state, request).await
}

#[tauri::command]
pub async fn open_design_in_new_tab(
    state: State<'_, WorkbenchLock>,
    path: String,
    insert_at: Option<usize>,
) -> Result<LoadOutcome, String> {
    let request = state
        .lock()?
        .session
        .begin_open_in_new_tab(Path::new(&path), insert_at)
        .map_err(|err| err.to_string())?;
    run_request(&state, request).await
}

#[tauri::command]
pub fn new_tab(state: State<'_, WorkbenchLock>) -> Result<TabId, String> {
    Ok(state.lock()?.session.add_empty_tab())
}

#[tauri::command]
pub fn close_tab(state: State<'_, WorkbenchLock>, tab_id: TabId) -> Result<bool, String> {
    Ok(state.lock()?.session.close_tab(tab_id))
}

#[tauri::command]
pub fn switch_tab(state: State<'_, WorkbenchLock>, tab_id: TabId) -> Result<bool, String> {
    Ok(state.lock()?.session.switch_tab(tab_id))
}

#[tauri::command]
pub fn drag_hover(
    state: State<'_, WorkbenchLock>,
    x: f64,
    y: f64,
    scroll_offset: f64,
) -> Result<DragState, String> {
    let mut workbench = state.lock()?;
    let strip = TabStripState {
        scroll_offset,
        tab_count: workbench.session.tab_count(),
    };
    Ok(workbench.drag.hover(x, y, &strip))
}

#[tauri::command]
pub fn drag_leave(state: State<'_, WorkbenchLock>) -> Result<(), String> {
    state.lock()?.drag.leave();
    Ok(())
}

#[tauri::command]
pub async fn drag_drop(
    state: State<'_, WorkbenchLock>,
    paths: Vec<String>,
    x: f64,
    y: f64,
    scroll_offset: f64,
) -> Result<Option<LoadOutcome>, String> {
    let paths: Vec<PathBuf> = paths.into_iter().map(PathBuf::from).collect();
    let request = {
        let mut workbench = state.lock()?;
        let strip = TabStripState {
            scroll_offset,
            tab_count: workbench.session.tab_count(),
        };
        let Some(action) = workbench.drag.drop_paths(&paths, x, y, &strip) else {
            return Ok(None);
        };
        workbench
            .session
            .begin_drop(&action)
            .map_err(|err| err.to_string())?
    };
    run_request(&state, request).await.map(Some)
}

/// Bring the active tab's preview up to date with the canvas size, then
/// draw the next batch. The webview replays the returned strokes.
#[tauri::command]
pub fn render_frame(
    state: State<'_, WorkbenchLock>,
    width: f64,
    height: f64,
) -> Result<RenderFrame, String> {
    let mut guard = state.lock()?;
    let workbench = &mut *guard;
    workbench
        .preview
        .recompute(&workbench.session, width, height, &mut workbench.canvas)
        .map_err(|err| err.to_string())?;
    let target = surface_for(workbench.session.active_tab_id());
    let outcome = workbench.preview.frame(target, &mut workbench.canvas);
    Ok(RenderFrame {
        outcome,
        frame: workbench.canvas.take(),
    })
}

#[tauri::command]
pub async fn render_thumbnail(
    state: State<'_, WorkbenchLock>,
    tab_id: TabId,
    width: f64,
    height: f64,
) -> Result<Vec<u8>, String> {
    let (config, pattern) = {
        let workbench = state.lock()?;
        let pattern = workbench
            .session
            .tab(tab_id)
            .and_then(|tab| tab.pattern.clone())
            .ok_or_else(|| format!("Tab {} has no design loaded", tab_id.0))?;
        (workbench.preview.config().clone(), pattern)
    };

    tauri::async_runtime::spawn_blocking(move || {
        preview::render_thumbnail(&config, pattern, width, height)
    })
    .await
    .map_err(|e| format!("Thumbnail task failed: {}", e))?
    .map_err(|err| err.to_string())
}

#[tauri::command]
pub fn select_design_file(title: Option<String>) -> Option<String> {
    let mut dialog = FileDialog::new().add_filter("Embroidery designs", SUPPORTED_EXTENSIONS);
    if let Some(title) = title {
        dialog = dialog.set_title(&title);
    }

    dialog
        .pick_file()
        .map(|path| path.to_string_lossy().to_string())
}

#[tauri::command]
pub fn reveal_design_in_folder(path: String) -> Result<(), String> {
    let path_buf = PathBuf::from(path);
    let target = if path_buf.is_dir() {
        path_buf
    } else {
        path_buf.parent().map(Path::to_path_buf).unwrap_or(path_buf)
    };

    opener::open(target).map_err(|err| err.to_string())
}
