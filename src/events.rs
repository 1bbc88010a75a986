//! Message types shared between the UI/event context and the loader thread.

use std::path::PathBuf;

use image::RgbaImage;

use crate::error::Error;
use crate::media::FrameSource;
use crate::playlist::MediaEntry;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointerPhase {
    Down,
    Moved,
    Up,
    Cancelled,
}

/// One pointer event in view coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointerEvent {
    pub phase: PointerPhase,
    pub x: f64,
    pub y: f64,
}

/// Input consumed by the core. The double-tap arrives pre-debounced from the
/// host's gesture recognizer as a single atomic event.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Gesture {
    Pointer(PointerEvent),
    DoubleTap,
}

/// Request sent to the background loader thread.
#[derive(Debug)]
pub enum LoaderMsg {
    /// Decode/prepare this entry. `target` is the current view size, used to
    /// bound still downscaling.
    Load {
        generation: u64,
        entry: MediaEntry,
        target: (u32, u32),
    },
    /// Stop the loader thread.
    Quit,
}

/// A decoded still, orientation-corrected and sized for the view.
#[derive(Debug)]
pub struct PreparedStill {
    pub path: PathBuf,
    pub image: RgbaImage,
}

/// Result delivered back onto the UI context. Every variant carries the
/// generation of the request that produced it; the view discards anything
/// that does not match its current generation (stale-result suppression).
pub enum SourceEvent {
    StillReady {
        generation: u64,
        still: PreparedStill,
    },
    VideoReady {
        generation: u64,
        stream: Box<dyn FrameSource>,
    },
    Failed {
        generation: u64,
        path: PathBuf,
        error: Error,
    },
}

impl SourceEvent {
    pub fn generation(&self) -> u64 {
        match self {
            Self::StillReady { generation, .. }
            | Self::VideoReady { generation, .. }
            | Self::Failed { generation, .. } => *generation,
        }
    }
}
