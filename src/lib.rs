pub mod config;
pub mod drag;
pub mod dst;
pub mod error;
pub mod geometry;
pub mod pattern;
pub mod preview;
pub mod render_scheduler;
pub mod session;
pub mod surface;
pub mod thread_stroke;

#[cfg(feature = "desktop")]
mod commands;

pub use config::PreviewConfig;
pub use dst::{parse_dst, DstParser, PatternParser};
pub use error::PreviewError;
pub use pattern::{Pattern, Stitch, StitchCommand};
pub use preview::{render_thumbnail, PreviewController};
pub use session::SessionStore;

#[cfg(feature = "desktop")]
const PREVIEW_CONFIG_FILE: &str = "preview_config.json";

#[cfg(feature = "desktop")]
fn load_preview_config(app: &tauri::AppHandle) -> PreviewConfig {
    use tauri::Manager;

    let path = match app.path().app_data_dir() {
        Ok(dir) => dir.join(PREVIEW_CONFIG_FILE),
        Err(err) => {
            log::warn!("Failed to resolve app data directory: {err}");
            return PreviewConfig::default();
        }
    };

    match PreviewConfig::load(&path) {
        Ok(config) => config,
        Err(err) => {
            log::warn!("Ignoring {}: {}", path.display(), err);
            PreviewConfig::default()
        }
    }
}

#[cfg(feature = "desktop")]
#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
    use commands::{Workbench, WorkbenchLock};
    use std::sync::Mutex;
    use tauri::Manager;

    tauri::Builder::default()
        .invoke_handler(tauri::generate_handler![
            commands::session_snapshot,
            commands::open_design,
            commands::open_design_in_new_tab,
            commands::new_tab,
            commands::close_tab,
            commands::switch_tab,
            commands::drag_hover,
            commands::drag_leave,
            commands::drag_drop,
            commands::render_frame,
            commands::render_thumbnail,
            commands::select_design_file,
            commands::reveal_design_in_folder,
        ])
        .setup(|app| {
            if cfg!(debug_assertions) {
                app.handle().plugin(
                    tauri_plugin_log::Builder::default()
                        .level(log::LevelFilter::Info)
                        .build(),
                )?;
            }
            let config = load_preview_config(app.handle());
            app.manage(WorkbenchLock(Mutex::new(Workbench::new(config)?)));
            Ok(())
        })
        .run(tauri::generate_context!())
        .expect("error while running tauri application");
}
