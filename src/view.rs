//! The warp view: owns edit/geometry/playback state on the UI context and
//! composes the active session onto the canvas.
//!
//! Render-surface capability: hosts drive it through `on_resize`,
//! `on_gesture`, `on_source_event`, and `render`, independent of the
//! windowing toolkit.

use std::sync::Arc;

use crossbeam_channel::Sender;
use image::RgbaImage;
use tracing::{debug, info, warn};

use crate::canvas::{self, Canvas};
use crate::events::{Gesture, LoaderMsg, PointerPhase, SourceEvent};
use crate::geometry::{self, Homography};
use crate::handles::HandleEditor;
use crate::media::FrameSource;
use crate::playlist::{self, MediaEntry, Playlist};

/// The at-most-one active playback session. Replacing the value releases the
/// previous decoder/stream before the new one takes the surface.
enum Session {
    /// Nothing requested yet.
    Idle,
    /// A load is in flight for the current generation.
    Pending,
    /// Decoded still, displayed from the cached warp buffer.
    Still(RgbaImage),
    /// Live stream, warped at composite time.
    Video(Box<dyn FrameSource>),
    /// Placeholder display after a failure or an empty playlist.
    Fallback,
}

impl Session {
    fn kind(&self) -> SessionKind {
        match self {
            Self::Idle => SessionKind::Idle,
            Self::Pending => SessionKind::Pending,
            Self::Still(_) => SessionKind::Still,
            Self::Video(_) => SessionKind::Video,
            Self::Fallback => SessionKind::Fallback,
        }
    }
}

/// Observable session state, mostly for hosts and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionKind {
    Idle,
    Pending,
    Still,
    Video,
    Fallback,
}

/// Tunables resolved from configuration.
#[derive(Debug, Clone)]
pub struct ViewOptions {
    pub handle_radius_px: f64,
    pub show_handles_always: bool,
    pub fallback_image: Option<Arc<RgbaImage>>,
    pub alignment_overlay: Option<Arc<RgbaImage>>,
}

impl Default for ViewOptions {
    fn default() -> Self {
        Self {
            handle_radius_px: 40.0,
            show_handles_always: false,
            fallback_image: None,
            alignment_overlay: None,
        }
    }
}

pub struct WarpView {
    editor: HandleEditor,
    playlist: Playlist,
    session: Session,
    generation: u64,
    transform: Homography,
    warped: Option<RgbaImage>,
    view_w: u32,
    view_h: u32,
    opts: ViewOptions,
    fallback: Arc<RgbaImage>,
    to_loader: Sender<LoaderMsg>,
}

impl WarpView {
    pub fn new(view_w: u32, view_h: u32, opts: ViewOptions, to_loader: Sender<LoaderMsg>) -> Self {
        let fallback = opts.fallback_image.clone().unwrap_or_else(|| {
            Arc::new(RgbaImage::from_pixel(16, 16, canvas::PLACEHOLDER))
        });
        Self {
            editor: HandleEditor::new(f64::from(view_w), f64::from(view_h), opts.handle_radius_px),
            playlist: Playlist::new(),
            session: Session::Idle,
            generation: 0,
            transform: Homography::IDENTITY,
            warped: None,
            view_w: view_w.max(1),
            view_h: view_h.max(1),
            opts,
            fallback,
            to_loader,
        }
    }

    pub fn playlist(&self) -> &Playlist {
        &self.playlist
    }

    pub fn session_kind(&self) -> SessionKind {
        self.session.kind()
    }

    pub fn editor(&self) -> &HandleEditor {
        &self.editor
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// A live stream needs continuous repaints; stills repaint on demand.
    pub fn is_animating(&self) -> bool {
        matches!(self.session, Session::Video(_))
    }

    /// View-size change: corners reset to the new bounding rectangle and the
    /// cached warp is rebuilt.
    pub fn on_resize(&mut self, w: u32, h: u32) {
        self.view_w = w.max(1);
        self.view_h = h.max(1);
        self.editor.reset_to_rect(f64::from(self.view_w), f64::from(self.view_h));
        self.refresh_geometry();
    }

    /// Replace the playlist wholesale (initial scan or rescan).
    pub fn load_entries(&mut self, entries: Vec<MediaEntry>) {
        let first = self.playlist.load(entries).cloned();
        match first {
            Some(entry) => self.start_playback(entry),
            None => self.show_fallback("empty playlist"),
        }
    }

    /// A failed folder scan. With no playlist yet this is the cold-start
    /// missing-folder case and the fallback image is shown; with a playlist
    /// loaded the current entries keep playing.
    pub fn on_scan_error(&mut self) {
        if self.playlist.is_empty() {
            self.show_fallback("media folder unavailable");
        }
    }

    /// Feed one gesture. Returns true when the display needs a repaint.
    pub fn on_gesture(&mut self, gesture: Gesture) -> bool {
        match gesture {
            Gesture::DoubleTap => {
                self.editor.toggle();
                debug!(edit = self.editor.edit_enabled(), "edit mode toggled");
                true
            }
            Gesture::Pointer(ev) => {
                let response = self.editor.on_pointer(ev);
                if response.geometry_changed {
                    self.refresh_geometry();
                    return true;
                }
                if response.consumed {
                    return true;
                }
                // Unconsumed pointer-up in the center region advances the
                // playlist; the regions never overlap with corner handles.
                if ev.phase == PointerPhase::Up
                    && playlist::in_center_region(
                        ev.x,
                        ev.y,
                        f64::from(self.view_w),
                        f64::from(self.view_h),
                    )
                {
                    self.advance();
                    return true;
                }
                false
            }
        }
    }

    /// Center-tap advance: circular step plus playback dispatch.
    pub fn advance(&mut self) {
        if let Some(entry) = self.playlist.advance().cloned() {
            info!(index = self.playlist.index(), path = %entry.path.display(), "advancing");
            self.start_playback(entry);
        }
    }

    /// Tear down the current session and request the next one. The previous
    /// decoder/stream is released here, before the new load is issued, so at
    /// most one session ever holds the surface.
    fn start_playback(&mut self, entry: MediaEntry) {
        self.session = Session::Pending;
        self.warped = None;
        self.generation += 1;
        let msg = LoaderMsg::Load {
            generation: self.generation,
            entry,
            target: (self.view_w, self.view_h),
        };
        if self.to_loader.send(msg).is_err() {
            warn!("loader unavailable");
            self.show_fallback("loader channel closed");
        }
    }

    /// Deliver a loader result onto the view. Results from superseded
    /// generations are discarded so a late decode can never clobber a newer
    /// session.
    pub fn on_source_event(&mut self, event: SourceEvent) -> bool {
        if event.generation() != self.generation {
            debug!(
                stale = event.generation(),
                current = self.generation,
                "dropping stale loader result"
            );
            return false;
        }
        match event {
            SourceEvent::StillReady { still, .. } => {
                debug!(path = %still.path.display(), "still ready");
                self.session = Session::Still(still.image);
                self.rewarp();
                true
            }
            SourceEvent::VideoReady { stream, .. } => {
                debug!("video stream ready");
                self.session = Session::Video(stream);
                self.refresh_geometry();
                true
            }
            SourceEvent::Failed { path, error, .. } => {
                warn!(path = %path.display(), %error, "media failed");
                self.show_fallback("load failure");
                true
            }
        }
    }

    fn show_fallback(&mut self, reason: &str) {
        info!(reason, "showing fallback image");
        self.session = Session::Fallback;
        self.rewarp();
    }

    /// Recompute the mapping after a corner drag or resize. A degenerate quad
    /// keeps the last-good transform (and its cached warp) on screen.
    fn refresh_geometry(&mut self) {
        let (sw, sh) = match &self.session {
            Session::Video(stream) => {
                let (w, h) = stream.dimensions();
                (f64::from(w), f64::from(h))
            }
            Session::Still(_) | Session::Fallback => {
                self.rewarp();
                return;
            }
            // No source yet; keep a view-sized transform for draw_matrix.
            Session::Idle | Session::Pending => (f64::from(self.view_w), f64::from(self.view_h)),
        };
        match Homography::map_rect_to_quad(sw, sh, self.editor.quad()) {
            Ok(h) => self.transform = h,
            Err(err) => warn!(%err, "keeping previous transform"),
        }
    }

    /// Rebuild the cached warp buffer for still-like content. Triggered on
    /// geometry, size, or content changes; never run redundantly per paint.
    fn rewarp(&mut self) {
        let source: Option<&RgbaImage> = match &self.session {
            Session::Still(img) => Some(img),
            Session::Fallback => Some(&self.fallback),
            _ => None,
        };
        let Some(src) = source else {
            self.warped = None;
            return;
        };
        match Homography::map_rect_to_quad(
            f64::from(src.width()),
            f64::from(src.height()),
            self.editor.quad(),
        ) {
            Ok(h) => {
                self.transform = h;
                match geometry::apply_to_buffer(&h, src, self.view_w, self.view_h) {
                    Ok(buf) => self.warped = Some(buf),
                    Err(err) => warn!(%err, "keeping previous warp buffer"),
                }
            }
            Err(err) => warn!(%err, "keeping previous transform"),
        }
    }

    /// The draw matrix hosts can use to composite live frames themselves.
    pub fn draw_matrix(&self) -> [f32; 9] {
        self.transform.as_draw_matrix()
    }

    /// Compose one output frame. Tolerates an absent source: the canvas is
    /// cleared and only the handles (in edit mode) are drawn.
    pub fn render(&mut self, canvas: &mut Canvas) {
        canvas.clear(canvas::BACKGROUND);

        let frame = match &mut self.session {
            Session::Video(stream) => Some(stream.next_frame()),
            _ => None,
        };
        match frame {
            Some(Ok(frame)) => {
                // Draw-matrix path: the frame is warped while being
                // composited, no intermediate buffer.
                if let Err(err) = geometry::warp_over(&self.transform, &frame, canvas.image_mut()) {
                    warn!(%err, "skipping frame with invalid transform");
                }
            }
            Some(Err(err)) => {
                // Async playback failure: release the stream, fall back.
                warn!(%err, "video stream failed mid-playback");
                self.show_fallback("stream failure");
                if let Some(warped) = &self.warped {
                    canvas.composite(warped);
                }
            }
            None => {
                if matches!(self.session, Session::Still(_) | Session::Fallback) {
                    if self.warped.is_none() {
                        self.rewarp();
                    }
                    if let Some(warped) = &self.warped {
                        canvas.composite(warped);
                    }
                }
            }
        }

        if self.editor.edit_enabled() {
            if let Some(overlay) = self.opts.alignment_overlay.clone() {
                self.draw_overlay(canvas, &overlay);
            }
        }

        if self.editor.edit_enabled() || self.opts.show_handles_always {
            for corner in &self.editor.quad().corners {
                canvas.fill_circle(
                    corner.x,
                    corner.y,
                    self.opts.handle_radius_px / 2.0,
                    canvas::HANDLE_COLOR,
                );
            }
        }
    }

    fn draw_overlay(&self, canvas: &mut Canvas, overlay: &RgbaImage) {
        // Stretch the alignment graphic onto the full destination quad.
        match Homography::map_rect_to_quad(
            f64::from(overlay.width()),
            f64::from(overlay.height()),
            self.editor.quad(),
        ) {
            Ok(h) => {
                if let Err(err) = geometry::warp_over(&h, overlay, canvas.image_mut()) {
                    warn!(%err, "overlay skipped");
                }
            }
            Err(err) => debug!(%err, "overlay skipped for degenerate quad"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::PointerEvent;
    use crossbeam_channel::unbounded;

    fn view() -> (WarpView, crossbeam_channel::Receiver<LoaderMsg>) {
        let (tx, rx) = unbounded();
        (WarpView::new(800, 600, ViewOptions::default(), tx), rx)
    }

    #[test]
    fn renders_nothing_without_a_source_but_handles_in_edit_mode() {
        let (mut v, _rx) = view();
        let mut canvas = Canvas::new(800, 600);
        v.render(&mut canvas);
        assert_eq!(canvas.image().get_pixel(400, 300).0, canvas::BACKGROUND.0);

        v.on_gesture(Gesture::DoubleTap);
        v.render(&mut canvas);
        assert_eq!(canvas.image().get_pixel(0, 0).0, canvas::HANDLE_COLOR.0);
    }

    #[test]
    fn drag_refreshes_geometry_and_requests_repaint() {
        let (mut v, _rx) = view();
        v.on_gesture(Gesture::DoubleTap);
        assert!(v.on_gesture(Gesture::Pointer(PointerEvent {
            phase: PointerPhase::Down,
            x: 5.0,
            y: 5.0,
        })));
        let repaint = v.on_gesture(Gesture::Pointer(PointerEvent {
            phase: PointerPhase::Moved,
            x: 45.0,
            y: 30.0,
        }));
        assert!(repaint);
        let c = v.editor().quad().corners[0];
        assert!((c.x - 40.0).abs() < 1e-9 && (c.y - 25.0).abs() < 1e-9);
    }

    #[test]
    fn center_tap_is_ignored_while_dragging() {
        let (mut v, rx) = view();
        v.load_entries(vec![
            MediaEntry::classify("a.png".into()).unwrap(),
            MediaEntry::classify("b.png".into()).unwrap(),
        ]);
        // Drain the initial load request.
        assert!(matches!(rx.try_recv(), Ok(LoaderMsg::Load { .. })));

        v.on_gesture(Gesture::DoubleTap);
        // Drag the top-left handle into the center region and release there.
        v.on_gesture(Gesture::Pointer(PointerEvent {
            phase: PointerPhase::Down,
            x: 2.0,
            y: 2.0,
        }));
        v.on_gesture(Gesture::Pointer(PointerEvent {
            phase: PointerPhase::Moved,
            x: 400.0,
            y: 300.0,
        }));
        v.on_gesture(Gesture::Pointer(PointerEvent {
            phase: PointerPhase::Up,
            x: 400.0,
            y: 300.0,
        }));
        // The release ended a drag, so no advance was dispatched.
        assert_eq!(v.playlist().index(), 0);
        assert!(rx.try_recv().is_err());
    }
}
