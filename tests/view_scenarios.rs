use std::path::PathBuf;

use crossbeam_channel::{Receiver, unbounded};
use image::RgbaImage;
use vj_frame::canvas::{self, Canvas};
use vj_frame::error::Error;
use vj_frame::events::{Gesture, LoaderMsg, PointerEvent, PointerPhase, PreparedStill, SourceEvent};
use vj_frame::media::FrameSource;
use vj_frame::playlist::{MediaEntry, MediaKind};
use vj_frame::view::{SessionKind, ViewOptions, WarpView};

const VIEW_W: u32 = 800;
const VIEW_H: u32 = 600;

fn view() -> (WarpView, Receiver<LoaderMsg>) {
    let (tx, rx) = unbounded();
    let mut v = WarpView::new(VIEW_W, VIEW_H, ViewOptions::default(), tx);
    v.on_resize(VIEW_W, VIEW_H);
    (v, rx)
}

fn entry(name: &str) -> MediaEntry {
    MediaEntry::classify(PathBuf::from(name)).unwrap()
}

fn center_tap(v: &mut WarpView) {
    let (x, y) = (f64::from(VIEW_W) / 2.0, f64::from(VIEW_H) / 2.0);
    v.on_gesture(Gesture::Pointer(PointerEvent {
        phase: PointerPhase::Down,
        x,
        y,
    }));
    v.on_gesture(Gesture::Pointer(PointerEvent {
        phase: PointerPhase::Up,
        x,
        y,
    }));
}

fn expect_load(rx: &Receiver<LoaderMsg>) -> (u64, MediaEntry) {
    match rx.try_recv().expect("expected a load request") {
        LoaderMsg::Load {
            generation, entry, ..
        } => (generation, entry),
        LoaderMsg::Quit => panic!("unexpected Quit"),
    }
}

fn still_ready(generation: u64, name: &str) -> SourceEvent {
    SourceEvent::StillReady {
        generation,
        still: PreparedStill {
            path: PathBuf::from(name),
            image: RgbaImage::from_pixel(32, 32, image::Rgba([255, 0, 0, 255])),
        },
    }
}

struct SolidStream;

impl FrameSource for SolidStream {
    fn next_frame(&mut self) -> Result<RgbaImage, Error> {
        Ok(RgbaImage::from_pixel(16, 16, image::Rgba([0, 255, 0, 255])))
    }
    fn dimensions(&self) -> (u32, u32) {
        (16, 16)
    }
}

struct BrokenStream;

impl FrameSource for BrokenStream {
    fn next_frame(&mut self) -> Result<RgbaImage, Error> {
        Err(Error::playback("vid1.mp4", "decoder died"))
    }
    fn dimensions(&self) -> (u32, u32) {
        (16, 16)
    }
}

#[test]
fn load_then_taps_walk_the_circular_playlist() {
    let (mut v, rx) = view();
    v.load_entries(vec![entry("img1.png"), entry("vid1.mp4")]);

    // initial load: index 0, still path
    let (g1, e1) = expect_load(&rx);
    assert_eq!(e1.kind, MediaKind::StillImage);
    assert_eq!(e1.path, PathBuf::from("img1.png"));
    assert!(v.on_source_event(still_ready(g1, "img1.png")));
    assert_eq!(v.session_kind(), SessionKind::Still);

    // center tap: index 1, video path
    center_tap(&mut v);
    assert_eq!(v.playlist().index(), 1);
    let (g2, e2) = expect_load(&rx);
    assert_eq!(e2.kind, MediaKind::Video);
    assert!(v.on_source_event(SourceEvent::VideoReady {
        generation: g2,
        stream: Box::new(SolidStream),
    }));
    assert_eq!(v.session_kind(), SessionKind::Video);
    assert!(v.is_animating());

    // center tap again: wraps to index 0, still path, video released
    center_tap(&mut v);
    assert_eq!(v.playlist().index(), 0);
    let (_g3, e3) = expect_load(&rx);
    assert_eq!(e3.path, PathBuf::from("img1.png"));
    assert_eq!(v.session_kind(), SessionKind::Pending);
    assert!(!v.is_animating());
}

#[test]
fn stale_decode_cannot_clobber_a_newer_session() {
    let (mut v, rx) = view();
    v.load_entries(vec![entry("a.png"), entry("b.png")]);
    let (g_a, _) = expect_load(&rx);

    // advance before A's decode finishes
    center_tap(&mut v);
    let (g_b, _) = expect_load(&rx);
    assert!(g_b > g_a);

    // A's late result is discarded
    assert!(!v.on_source_event(still_ready(g_a, "a.png")));
    assert_eq!(v.session_kind(), SessionKind::Pending);

    // B's result lands normally
    assert!(v.on_source_event(still_ready(g_b, "b.png")));
    assert_eq!(v.session_kind(), SessionKind::Still);
}

#[test]
fn decode_failure_enters_fallback_exactly_once() {
    let (mut v, rx) = view();
    v.load_entries(vec![entry("bad.png")]);
    let (g, _) = expect_load(&rx);

    assert!(v.on_source_event(SourceEvent::Failed {
        generation: g,
        path: PathBuf::from("bad.png"),
        error: Error::decode("bad.png", "corrupt"),
    }));
    assert_eq!(v.session_kind(), SessionKind::Fallback);

    // a duplicate/late failure from the same generation changes nothing more
    assert!(!v.on_source_event(SourceEvent::Failed {
        generation: g.wrapping_sub(1),
        path: PathBuf::from("bad.png"),
        error: Error::decode("bad.png", "corrupt"),
    }));
    assert_eq!(v.session_kind(), SessionKind::Fallback);

    // fallback renders without panicking
    let mut canvas = Canvas::new(VIEW_W, VIEW_H);
    v.render(&mut canvas);
}

#[test]
fn async_stream_failure_releases_session_and_falls_back() {
    let (mut v, rx) = view();
    v.load_entries(vec![entry("vid1.mp4")]);
    let (g, _) = expect_load(&rx);
    v.on_source_event(SourceEvent::VideoReady {
        generation: g,
        stream: Box::new(BrokenStream),
    });
    assert_eq!(v.session_kind(), SessionKind::Video);

    let mut canvas = Canvas::new(VIEW_W, VIEW_H);
    v.render(&mut canvas);
    assert_eq!(v.session_kind(), SessionKind::Fallback);
    assert!(!v.is_animating());
}

#[test]
fn empty_playlist_shows_fallback_and_taps_are_noops() {
    let (mut v, rx) = view();
    v.load_entries(Vec::new());
    assert_eq!(v.session_kind(), SessionKind::Fallback);
    assert!(rx.try_recv().is_err());

    center_tap(&mut v);
    assert_eq!(v.session_kind(), SessionKind::Fallback);
    assert!(rx.try_recv().is_err());

    let mut canvas = Canvas::new(VIEW_W, VIEW_H);
    v.render(&mut canvas);
}

#[test]
fn missing_media_folder_shows_fallback_not_a_black_screen() {
    let (mut v, rx) = view();
    v.on_scan_error();
    assert_eq!(v.session_kind(), SessionKind::Fallback);
    assert!(rx.try_recv().is_err());

    // the placeholder is warped onto the full-view quad, not left blank
    let mut canvas = Canvas::new(VIEW_W, VIEW_H);
    v.render(&mut canvas);
    assert_eq!(canvas.image().get_pixel(400, 300).0, canvas::PLACEHOLDER.0);
}

#[test]
fn failed_rescan_keeps_the_current_playlist_playing() {
    let (mut v, rx) = view();
    v.load_entries(vec![entry("a.png")]);
    let (g, _) = expect_load(&rx);
    v.on_source_event(still_ready(g, "a.png"));

    v.on_scan_error();
    assert_eq!(v.session_kind(), SessionKind::Still);
    assert_eq!(v.playlist().len(), 1);
}

#[test]
fn degenerate_drag_keeps_the_previous_transform_on_screen() {
    let (mut v, rx) = view();
    v.load_entries(vec![entry("img1.png")]);
    let (g, _) = expect_load(&rx);
    v.on_source_event(still_ready(g, "img1.png"));

    let mut canvas = Canvas::new(VIEW_W, VIEW_H);
    v.render(&mut canvas);
    let before = v.draw_matrix();

    // drag the bottom-right corner exactly onto the top-right one: the quad
    // collapses and the mapping becomes undefined
    v.on_gesture(Gesture::DoubleTap);
    v.on_gesture(Gesture::Pointer(PointerEvent {
        phase: PointerPhase::Down,
        x: 795.0,
        y: 595.0,
    }));
    v.on_gesture(Gesture::Pointer(PointerEvent {
        phase: PointerPhase::Moved,
        x: 800.0,
        y: 0.0,
    }));
    v.on_gesture(Gesture::Pointer(PointerEvent {
        phase: PointerPhase::Up,
        x: 800.0,
        y: 0.0,
    }));
    v.on_gesture(Gesture::DoubleTap); // leave edit mode so no handles draw

    // the last-good transform and its warped buffer are retained
    assert_eq!(v.draw_matrix(), before);
    v.render(&mut canvas);
    assert_eq!(canvas.image().get_pixel(400, 300).0, [255, 0, 0, 255]);
}

#[test]
fn still_frame_lands_inside_the_dragged_quad() {
    let (mut v, rx) = view();
    v.load_entries(vec![entry("img1.png")]);
    let (g, _) = expect_load(&rx);
    v.on_source_event(still_ready(g, "img1.png"));

    // drag the top-left corner inward so the quad shrinks
    v.on_gesture(Gesture::DoubleTap);
    v.on_gesture(Gesture::Pointer(PointerEvent {
        phase: PointerPhase::Down,
        x: 5.0,
        y: 5.0,
    }));
    v.on_gesture(Gesture::Pointer(PointerEvent {
        phase: PointerPhase::Moved,
        x: 205.0,
        y: 155.0,
    }));
    v.on_gesture(Gesture::Pointer(PointerEvent {
        phase: PointerPhase::Up,
        x: 205.0,
        y: 155.0,
    }));
    v.on_gesture(Gesture::DoubleTap); // leave edit mode so no handles draw

    let mut canvas = Canvas::new(VIEW_W, VIEW_H);
    v.render(&mut canvas);

    // interior of the new quad shows the red still
    assert_eq!(canvas.image().get_pixel(400, 300).0, [255, 0, 0, 255]);
    // the vacated top-left corner shows background
    assert_eq!(canvas.image().get_pixel(10, 10).0[0], 0);
}
