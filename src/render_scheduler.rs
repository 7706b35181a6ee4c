//! Incremental rendering of stitch sequences.
//!
//! A render is a [`RenderJob`] owned by the scheduler and advanced one batch
//! per host frame. Starting a new render on a surface replaces its job, so a
//! continuation holding the old [`RenderTicket`] finds nothing to resume.

use crate::config::PreviewConfig;
use crate::error::PreviewError;
use crate::geometry::{fit_to_viewport, Mapping, Point, Viewport, MAX_SURFACE_SIDE};
use crate::pattern::{Pattern, StitchCommand};
use crate::surface::Surface;
use crate::thread_stroke::ThreadStrokeRenderer;
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;

/// Identifies one drawing target, typically the canvas of a visible tab.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct SurfaceId(pub u64);

/// Handle for resuming a particular render.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderTicket {
    pub surface: SurfaceId,
    pub generation: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum StepOutcome {
    /// More stitches remain; call again next frame.
    Progress { processed: usize, total: usize },
    Finished { segments: usize },
    /// The ticket was superseded or cancelled.
    Stale,
}

/// Walk state carried from one batch to the next.
struct RenderJob {
    generation: u64,
    pattern: Arc<Pattern>,
    mapping: Option<Mapping>,
    renderer: ThreadStrokeRenderer,
    cursor: usize,
    color_index: usize,
    previous: Option<Point>,
    segments: usize,
    ended: bool,
}

impl RenderJob {
    fn is_done(&self) -> bool {
        self.ended || self.mapping.is_none() || self.cursor >= self.pattern.stitches.len()
    }

    fn advance<S: Surface + ?Sized>(&mut self, surface: &mut S, budget: usize) {
        let Some(mapping) = self.mapping else {
            return;
        };
        let stop = self.cursor.saturating_add(budget).min(self.pattern.stitches.len());

        while self.cursor < stop {
            let stitch = self.pattern.stitches[self.cursor];
            self.cursor += 1;
            let current = mapping.to_surface(stitch.x, stitch.y);

            match stitch.command {
                StitchCommand::Stitch => {
                    if let Some(previous) = self.previous {
                        if self
                            .renderer
                            .draw_segment(surface, previous, current, self.color_index)
                        {
                            self.segments += 1;
                        }
                    }
                    self.previous = Some(current);
                }
                StitchCommand::Move => self.previous = Some(current),
                StitchCommand::ColorChange => {
                    self.color_index += 1;
                    self.previous = Some(current);
                }
                StitchCommand::End => {
                    self.ended = true;
                    return;
                }
                StitchCommand::Trim
                | StitchCommand::SequinMode
                | StitchCommand::SequinEject
                | StitchCommand::Unknown => {}
            }
        }
    }
}

/// Drives at most one render per surface, a batch at a time.
pub struct RenderScheduler {
    config: PreviewConfig,
    renderer: ThreadStrokeRenderer,
    jobs: HashMap<SurfaceId, RenderJob>,
    next_generation: u64,
}

impl RenderScheduler {
    pub fn new(config: PreviewConfig) -> Result<Self, PreviewError> {
        config.validate()?;
        let renderer = ThreadStrokeRenderer::new(&config, 1.0)?;
        Ok(Self {
            config,
            renderer,
            jobs: HashMap::new(),
            next_generation: 1,
        })
    }

    pub fn config(&self) -> &PreviewConfig {
        &self.config
    }

    /// Begin rendering `pattern` onto `surface`, cancelling whatever was
    /// still drawing there. The surface is reset before this returns.
    ///
    /// A viewport that would need a surface larger than
    /// [`MAX_SURFACE_SIDE`] is rejected and leaves the surface untouched.
    pub fn start<S: Surface + ?Sized>(
        &mut self,
        target: SurfaceId,
        pattern: Arc<Pattern>,
        viewport: Viewport,
        surface: &mut S,
    ) -> Result<RenderTicket, PreviewError> {
        viewport.validate()?;
        let mapping = pattern
            .bounds
            .as_ref()
            .map(|bounds| fit_to_viewport(bounds, &viewport));
        let (width, height) = match &mapping {
            Some(mapping) => (mapping.surface_width, mapping.surface_height),
            None => (viewport.width.round() as u32, viewport.height.round() as u32),
        };
        if width > MAX_SURFACE_SIDE || height > MAX_SURFACE_SIDE {
            return Err(PreviewError::Viewport(format!(
                "surface {width}x{height} exceeds {MAX_SURFACE_SIDE}"
            )));
        }

        if self.cancel(target) {
            log::debug!("Cancelled unfinished render on surface {}", target.0);
        }
        surface.reset(width, height);

        let scale = mapping.map(|m| m.scale).unwrap_or(1.0);
        let generation = self.next_generation;
        self.next_generation += 1;

        self.jobs.insert(
            target,
            RenderJob {
                generation,
                pattern,
                mapping,
                renderer: self.renderer.with_scale(&self.config, scale),
                cursor: 0,
                color_index: 0,
                previous: None,
                segments: 0,
                ended: false,
            },
        );

        Ok(RenderTicket {
            surface: target,
            generation,
        })
    }

    /// Process one batch of the render identified by `ticket`.
    pub fn step<S: Surface + ?Sized>(
        &mut self,
        ticket: RenderTicket,
        surface: &mut S,
    ) -> StepOutcome {
        let batch_size = self.config.batch_size.max(1);
        let Some(job) = self.jobs.get_mut(&ticket.surface) else {
            return StepOutcome::Stale;
        };
        if job.generation != ticket.generation {
            return StepOutcome::Stale;
        }

        job.advance(surface, batch_size);
        log::debug!(
            "Render {} on surface {}: {}/{} stitches",
            job.generation,
            ticket.surface.0,
            job.cursor,
            job.pattern.stitches.len()
        );

        if job.is_done() {
            let segments = job.segments;
            self.jobs.remove(&ticket.surface);
            StepOutcome::Finished { segments }
        } else {
            StepOutcome::Progress {
                processed: job.cursor,
                total: job.pattern.stitches.len(),
            }
        }
    }

    /// Step until the render finishes or is superseded.
    pub fn run_to_completion<S: Surface + ?Sized>(
        &mut self,
        ticket: RenderTicket,
        surface: &mut S,
    ) -> StepOutcome {
        loop {
            match self.step(ticket, surface) {
                StepOutcome::Progress { .. } => continue,
                outcome => return outcome,
            }
        }
    }

    /// Drop the render in flight on `target`, if any.
    pub fn cancel(&mut self, target: SurfaceId) -> bool {
        self.jobs.remove(&target).is_some()
    }

    pub fn is_rendering(&self, target: SurfaceId) -> bool {
        self.jobs.contains_key(&target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::Stitch;
    use crate::surface::{RasterSurface, StrokeList};
    use proptest::prelude::*;

    const SURFACE: SurfaceId = SurfaceId(1);

    fn viewport() -> Viewport {
        Viewport::new(400.0, 400.0, 10.0)
    }

    fn scheduler(batch_size: usize) -> RenderScheduler {
        let config = PreviewConfig {
            batch_size,
            ..PreviewConfig::default()
        };
        RenderScheduler::new(config).unwrap()
    }

    fn render_all<S: Surface>(
        batch_size: usize,
        pattern: &Arc<Pattern>,
        surface: &mut S,
    ) -> StepOutcome {
        let mut scheduler = scheduler(batch_size);
        let ticket = scheduler.start(SURFACE, pattern.clone(), viewport(), surface).unwrap();
        scheduler.run_to_completion(ticket, surface)
    }

    fn stitch(x: f64, y: f64, command: StitchCommand) -> Stitch {
        Stitch::new(x, y, command)
    }

    #[test]
    fn test_move_stitch_color_change_sequence() {
        let pattern = Arc::new(Pattern::from_stitches([
            stitch(0.0, 0.0, StitchCommand::Move),
            stitch(10.0, 0.0, StitchCommand::Stitch),
            stitch(10.0, 0.0, StitchCommand::ColorChange),
            stitch(10.0, 10.0, StitchCommand::Stitch),
        ]));
        let mut list = StrokeList::new();
        let mut scheduler = scheduler(100);
        let ticket = scheduler.start(SURFACE, pattern.clone(), viewport(), &mut list).unwrap();
        let outcome = scheduler.run_to_completion(ticket, &mut list);
        assert_eq!(outcome, StepOutcome::Finished { segments: 2 });

        let mapping = fit_to_viewport(pattern.bounds.as_ref().unwrap(), &viewport());
        let renderer = ThreadStrokeRenderer::new(scheduler.config(), mapping.scale).unwrap();
        let main: Vec<_> = list.strokes.iter().skip(1).step_by(3).collect();
        assert_eq!(main.len(), 2);
        assert_eq!(main[0].from, mapping.to_surface(0.0, 0.0));
        assert_eq!(main[0].to, mapping.to_surface(10.0, 0.0));
        assert_eq!(main[0].rgb, renderer.shades(0).base);
        assert_eq!(main[1].from, mapping.to_surface(10.0, 0.0));
        assert_eq!(main[1].to, mapping.to_surface(10.0, 10.0));
        assert_eq!(main[1].rgb, renderer.shades(1).base);
    }

    #[test]
    fn test_first_stitch_without_previous_point_draws_nothing() {
        let pattern = Arc::new(Pattern::from_stitches([
            stitch(0.0, 0.0, StitchCommand::Stitch),
            stitch(5.0, 5.0, StitchCommand::Stitch),
        ]));
        let mut list = StrokeList::new();
        assert_eq!(
            render_all(10, &pattern, &mut list),
            StepOutcome::Finished { segments: 1 }
        );
        assert_eq!(list.strokes.len(), 3);
    }

    #[test]
    fn test_end_stops_walk() {
        let pattern = Arc::new(Pattern::from_stitches([
            stitch(0.0, 0.0, StitchCommand::Move),
            stitch(5.0, 0.0, StitchCommand::Stitch),
            stitch(5.0, 0.0, StitchCommand::End),
            stitch(9.0, 9.0, StitchCommand::Stitch),
            stitch(0.0, 9.0, StitchCommand::Stitch),
        ]));
        let mut list = StrokeList::new();
        assert_eq!(
            render_all(1, &pattern, &mut list),
            StepOutcome::Finished { segments: 1 }
        );
    }

    #[test]
    fn test_unrecognized_commands_leave_state_alone() {
        let pattern = Arc::new(Pattern::from_stitches([
            stitch(0.0, 0.0, StitchCommand::Move),
            stitch(50.0, 50.0, StitchCommand::Unknown),
            stitch(60.0, 0.0, StitchCommand::Trim),
            stitch(10.0, 0.0, StitchCommand::Stitch),
        ]));
        let mut list = StrokeList::new();
        render_all(10, &pattern, &mut list);

        let mapping = fit_to_viewport(pattern.bounds.as_ref().unwrap(), &viewport());
        assert_eq!(list.strokes.len(), 3);
        assert_eq!(list.strokes[1].from, mapping.to_surface(0.0, 0.0));
        assert_eq!(list.strokes[1].to, mapping.to_surface(10.0, 0.0));
    }

    #[test]
    fn test_progress_reported_per_batch() {
        let pattern = Arc::new(Pattern::from_stitches(
            (0..10).map(|i| stitch(i as f64, 0.0, StitchCommand::Stitch)),
        ));
        let mut list = StrokeList::new();
        let mut scheduler = scheduler(4);
        let ticket = scheduler.start(SURFACE, pattern, viewport(), &mut list).unwrap();

        assert_eq!(
            scheduler.step(ticket, &mut list),
            StepOutcome::Progress { processed: 4, total: 10 }
        );
        assert_eq!(
            scheduler.step(ticket, &mut list),
            StepOutcome::Progress { processed: 8, total: 10 }
        );
        assert_eq!(
            scheduler.step(ticket, &mut list),
            StepOutcome::Finished { segments: 9 }
        );
        assert!(!scheduler.is_rendering(SURFACE));
        assert_eq!(scheduler.step(ticket, &mut list), StepOutcome::Stale);
    }

    #[test]
    fn test_restart_cancels_previous_render() {
        let first = Arc::new(Pattern::from_stitches(
            (0..20).map(|i| stitch(i as f64, 0.0, StitchCommand::Stitch)),
        ));
        let second = Arc::new(Pattern::from_stitches([
            stitch(0.0, 0.0, StitchCommand::Move),
            stitch(0.0, 30.0, StitchCommand::Stitch),
        ]));
        let mut list = StrokeList::new();
        let mut scheduler = scheduler(5);

        let old = scheduler.start(SURFACE, first, viewport(), &mut list).unwrap();
        scheduler.step(old, &mut list);
        list.take();

        let new = scheduler.start(SURFACE, second, viewport(), &mut list).unwrap();
        assert_eq!(scheduler.step(old, &mut list), StepOutcome::Stale);
        assert_eq!(
            scheduler.step(new, &mut list),
            StepOutcome::Finished { segments: 1 }
        );

        let frame = list.take();
        assert!(frame.cleared);
        assert_eq!(frame.strokes.len(), 3);
    }

    #[test]
    fn test_surfaces_render_independently() {
        let pattern = Arc::new(Pattern::from_stitches(
            (0..6).map(|i| stitch(i as f64, i as f64, StitchCommand::Stitch)),
        ));
        let (mut a, mut b) = (StrokeList::new(), StrokeList::new());
        let mut scheduler = scheduler(2);
        let ta = scheduler.start(SurfaceId(1), pattern.clone(), viewport(), &mut a).unwrap();
        let tb = scheduler.start(SurfaceId(2), pattern, viewport(), &mut b).unwrap();

        let finished = StepOutcome::Finished { segments: 5 };
        assert_eq!(scheduler.run_to_completion(ta, &mut a), finished);
        assert_eq!(scheduler.run_to_completion(tb, &mut b), finished);
        assert_eq!(a.strokes, b.strokes);
    }

    #[test]
    fn test_rejects_invalid_config() {
        let config = PreviewConfig {
            min_stroke_width: 9.0,
            max_stroke_width: 2.0,
            ..PreviewConfig::default()
        };
        assert!(matches!(
            RenderScheduler::new(config),
            Err(PreviewError::Config(_))
        ));
    }

    #[test]
    fn test_oversized_viewport_leaves_render_running() {
        let pattern = Arc::new(Pattern::from_stitches(
            (0..6).map(|i| stitch(i as f64, 0.0, StitchCommand::Stitch)),
        ));
        let mut list = StrokeList::new();
        let mut scheduler = scheduler(2);
        let ticket = scheduler.start(SURFACE, pattern.clone(), viewport(), &mut list).unwrap();
        list.take();

        for huge in [
            Viewport::new(1e12, 1e12, 10.0),
            Viewport::new(f64::INFINITY, 400.0, 10.0),
            Viewport::new(100.0, 100.0, 8000.0),
        ] {
            let result = scheduler.start(SURFACE, pattern.clone(), huge, &mut list);
            assert!(matches!(result, Err(PreviewError::Viewport(_))));
        }
        assert!(!list.cleared);
        assert!(matches!(
            scheduler.step(ticket, &mut list),
            StepOutcome::Progress { .. }
        ));
    }

    #[test]
    fn test_empty_pattern_draws_nothing() {
        let pattern = Arc::new(Pattern::new());
        let mut surface = RasterSurface::default();
        assert_eq!(
            render_all(10, &pattern, &mut surface),
            StepOutcome::Finished { segments: 0 }
        );
        assert_eq!(surface.image().dimensions(), (400, 400));
        assert!(surface.image().pixels().all(|p| p[3] == 0));
    }

    #[test]
    fn test_single_point_pattern() {
        let pattern = Arc::new(Pattern::from_stitches([
            stitch(3.0, 3.0, StitchCommand::Move),
            stitch(3.0, 3.0, StitchCommand::Stitch),
        ]));
        let mut list = StrokeList::new();
        assert_eq!(
            render_all(10, &pattern, &mut list),
            StepOutcome::Finished { segments: 0 }
        );
        assert_eq!((list.width, list.height), (20, 20));
    }

    fn command() -> impl Strategy<Value = StitchCommand> {
        prop_oneof![
            6 => Just(StitchCommand::Stitch),
            2 => Just(StitchCommand::Move),
            2 => Just(StitchCommand::ColorChange),
            1 => Just(StitchCommand::Trim),
            1 => Just(StitchCommand::Unknown),
            1 => Just(StitchCommand::End),
        ]
    }

    fn stitches() -> impl Strategy<Value = Vec<Stitch>> {
        prop::collection::vec(
            (0u8..20, 0u8..20, command())
                .prop_map(|(x, y, command)| Stitch::new(x as f64, y as f64, command)),
            0..60,
        )
    }

    proptest! {
        #[test]
        fn test_batching_does_not_change_output(stitches in stitches(), batch in 1usize..8) {
            let pattern = Arc::new(Pattern::from_stitches(stitches));

            let mut whole = StrokeList::new();
            let mut chunked = StrokeList::new();
            render_all(usize::MAX, &pattern, &mut whole);
            render_all(batch, &pattern, &mut chunked);
            prop_assert_eq!(&whole.strokes, &chunked.strokes);

            let mut whole = RasterSurface::default();
            let mut chunked = RasterSurface::default();
            render_all(usize::MAX, &pattern, &mut whole);
            render_all(batch, &pattern, &mut chunked);
            prop_assert!(whole.image() == chunked.image());
        }

        #[test]
        fn test_color_index_counts_prior_color_changes(stitches in stitches(), batch in 1usize..8) {
            let palette: Vec<String> = (0..64u32)
                .map(|i| format!("#{:02X}{:02X}80", i * 3, 255 - i * 3))
                .collect();
            let config = PreviewConfig { batch_size: batch, palette, ..PreviewConfig::default() };
            let mut scheduler = RenderScheduler::new(config.clone()).unwrap();
            let pattern = Arc::new(Pattern::from_stitches(stitches.clone()));
            let mut list = StrokeList::new();
            let ticket = scheduler.start(SURFACE, pattern.clone(), viewport(), &mut list).unwrap();
            scheduler.run_to_completion(ticket, &mut list);

            let scale = pattern.bounds.map(|b| fit_to_viewport(&b, &viewport()).scale).unwrap_or(1.0);
            let renderer = ThreadStrokeRenderer::new(&config, scale).unwrap();

            let mut expected = Vec::new();
            let mut previous: Option<(f64, f64)> = None;
            for (i, s) in stitches.iter().enumerate() {
                match s.command {
                    StitchCommand::End => break,
                    StitchCommand::Stitch => {
                        if previous.is_some_and(|p| p != (s.x, s.y)) {
                            let color_changes = stitches[..i]
                                .iter()
                                .filter(|p| p.command == StitchCommand::ColorChange)
                                .count();
                            expected.push(renderer.shades(color_changes).base);
                        }
                        previous = Some((s.x, s.y));
                    }
                    StitchCommand::Move | StitchCommand::ColorChange => previous = Some((s.x, s.y)),
                    _ => {}
                }
            }

            let drawn: Vec<_> = list.strokes.iter().skip(1).step_by(3).map(|s| s.rgb).collect();
            prop_assert_eq!(drawn, expected);
        }
    }
}
