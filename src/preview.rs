use crate::config::PreviewConfig;
use crate::error::PreviewError;
use crate::geometry::Viewport;
use crate::pattern::Pattern;
use crate::render_scheduler::{RenderScheduler, RenderTicket, StepOutcome, SurfaceId};
use crate::session::{SessionStore, TabId};
use crate::surface::{RasterSurface, Surface};
use std::sync::Arc;

/// What the canvas currently shows, so unchanged input is not redrawn.
struct Shown {
    pattern: Arc<Pattern>,
    viewport: Viewport,
    ticket: RenderTicket,
}

/// Keeps the single preview canvas in step with the active tab.
///
/// Call [`PreviewController::recompute`] after every session operation and
/// [`PreviewController::frame`] once per host frame. Switching tabs cancels
/// the render of the tab being left and redraws the canvas from scratch, so
/// only one walk ever draws onto it.
pub struct PreviewController {
    scheduler: RenderScheduler,
    shown: Option<Shown>,
    blank: Arc<Pattern>,
}

pub fn surface_for(tab: TabId) -> SurfaceId {
    SurfaceId(tab.0)
}

impl PreviewController {
    pub fn new(config: PreviewConfig) -> Result<Self, PreviewError> {
        Ok(Self {
            scheduler: RenderScheduler::new(config)?,
            shown: None,
            blank: Arc::new(Pattern::new()),
        })
    }

    pub fn config(&self) -> &PreviewConfig {
        self.scheduler.config()
    }

    /// Start a render for the active tab if what the canvas should show
    /// changed. Returns the new ticket, or `None` when it is up to date.
    pub fn recompute<S: Surface + ?Sized>(
        &mut self,
        session: &SessionStore,
        width: f64,
        height: f64,
        surface: &mut S,
    ) -> Result<Option<RenderTicket>, PreviewError> {
        let target = surface_for(session.active_tab_id());
        let pattern = session
            .active_pattern()
            .unwrap_or_else(|| self.blank.clone());
        let viewport = Viewport::new(width, height, self.config().padding);

        if let Some(shown) = &self.shown {
            if shown.ticket.surface == target
                && Arc::ptr_eq(&shown.pattern, &pattern)
                && shown.viewport == viewport
            {
                return Ok(None);
            }
        }

        let ticket = self
            .scheduler
            .start(target, pattern.clone(), viewport, surface)?;
        if let Some(previous) = self.shown.take() {
            let left = previous.ticket.surface;
            if left != target && self.scheduler.cancel(left) {
                log::debug!("Left surface {} with its render unfinished", left.0);
            }
        }

        log::info!(
            "Rendering {} stitches on surface {}",
            pattern.stitches.len(),
            target.0
        );
        self.shown = Some(Shown {
            pattern,
            viewport,
            ticket,
        });
        Ok(Some(ticket))
    }

    /// Advance the render in flight on `target` by one batch.
    pub fn frame<S: Surface + ?Sized>(&mut self, target: SurfaceId, surface: &mut S) -> StepOutcome {
        match &self.shown {
            Some(shown) if shown.ticket.surface == target => {
                self.scheduler.step(shown.ticket, surface)
            }
            _ => StepOutcome::Stale,
        }
    }
}

/// Render `pattern` in one go and encode it as PNG.
pub fn render_thumbnail(
    config: &PreviewConfig,
    pattern: Arc<Pattern>,
    width: f64,
    height: f64,
) -> Result<Vec<u8>, PreviewError> {
    let mut scheduler = RenderScheduler::new(config.clone())?;
    let mut surface = RasterSurface::default();
    let viewport = Viewport::new(width, height, config.padding.min(width.min(height) / 8.0));
    let ticket = scheduler.start(SurfaceId(0), pattern, viewport, &mut surface)?;
    scheduler.run_to_completion(ticket, &mut surface);
    surface.to_png()
}
