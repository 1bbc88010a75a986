//! Ordered circular playlist over discovered media entries.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

/// Playable media classes, decided by file extension (case-insensitive).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    StillImage,
    Video,
}

pub const STILL_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif"];
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "ogv"];

impl MediaKind {
    /// Classify a path by its extension; `None` if it is not playable.
    pub fn classify(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        if STILL_EXTENSIONS.contains(&ext.as_str()) {
            Some(Self::StillImage)
        } else if VIDEO_EXTENSIONS.contains(&ext.as_str()) {
            Some(Self::Video)
        } else {
            None
        }
    }
}

/// One playable unit. Owned exclusively by the playlist; the collection is
/// rebuilt wholesale on each folder scan, never patched element-by-element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaEntry {
    pub path: PathBuf,
    pub kind: MediaKind,
}

impl MediaEntry {
    pub fn classify(path: PathBuf) -> Option<Self> {
        MediaKind::classify(&path).map(|kind| Self { path, kind })
    }
}

/// Circular playlist: `advance` wraps from the last entry back to the first.
#[derive(Debug, Default)]
pub struct Playlist {
    entries: Vec<MediaEntry>,
    index: usize,
}

impl Playlist {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole list. A non-empty list resets the index to 0 and
    /// returns the first entry for playback; an empty list means the caller
    /// enters the fallback state.
    pub fn load(&mut self, entries: Vec<MediaEntry>) -> Option<&MediaEntry> {
        self.entries = entries;
        self.index = 0;
        if self.entries.is_empty() {
            warn!("playlist loaded empty; showing fallback");
            None
        } else {
            debug!(count = self.entries.len(), "playlist loaded");
            self.entries.first()
        }
    }

    /// Step to the next entry, wrapping at the end. Empty list is a logged
    /// no-op, not an error.
    pub fn advance(&mut self) -> Option<&MediaEntry> {
        if self.entries.is_empty() {
            warn!("no media to advance to");
            return None;
        }
        self.index = (self.index + 1) % self.entries.len();
        self.entries.get(self.index)
    }

    pub fn current(&self) -> Option<&MediaEntry> {
        self.entries.get(self.index)
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// True if (x, y) falls in the central advance region: a rectangle centered
/// on the view, 20% of its width and 20% of its height. Deliberately disjoint
/// from the corner-handle regions so the two gestures never conflict.
pub fn in_center_region(x: f64, y: f64, view_w: f64, view_h: f64) -> bool {
    let cx = view_w / 2.0;
    let cy = view_h / 2.0;
    let half_w = view_w * 0.1;
    let half_h = view_h * 0.1;
    x >= cx - half_w && x <= cx + half_w && y >= cy - half_h && y <= cy + half_h
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(name: &str) -> MediaEntry {
        MediaEntry::classify(PathBuf::from(name)).unwrap()
    }

    #[test]
    fn classifies_by_extension_case_insensitively() {
        assert_eq!(
            MediaKind::classify(Path::new("a.PNG")),
            Some(MediaKind::StillImage)
        );
        assert_eq!(
            MediaKind::classify(Path::new("b.JpEg")),
            Some(MediaKind::StillImage)
        );
        assert_eq!(
            MediaKind::classify(Path::new("c.Mp4")),
            Some(MediaKind::Video)
        );
        assert_eq!(
            MediaKind::classify(Path::new("d.ogv")),
            Some(MediaKind::Video)
        );
        assert_eq!(MediaKind::classify(Path::new("e.txt")), None);
        assert_eq!(MediaKind::classify(Path::new("no-extension")), None);
    }

    #[test]
    fn advance_wraps_around_after_full_cycle() {
        let mut pl = Playlist::new();
        pl.load(vec![entry("a.png"), entry("b.jpg"), entry("c.mp4")]);
        assert_eq!(pl.index(), 0);
        for _ in 0..3 {
            pl.advance();
        }
        assert_eq!(pl.index(), 0);
        assert_eq!(pl.current(), Some(&entry("a.png")));
    }

    #[test]
    fn advance_on_empty_playlist_is_a_noop() {
        let mut pl = Playlist::new();
        assert!(pl.advance().is_none());
        assert!(pl.current().is_none());
        assert_eq!(pl.index(), 0);
    }

    #[test]
    fn load_replaces_wholesale_and_resets_index() {
        let mut pl = Playlist::new();
        pl.load(vec![entry("a.png"), entry("b.png")]);
        pl.advance();
        assert_eq!(pl.index(), 1);
        let first = pl.load(vec![entry("x.ogv")]).cloned();
        assert_eq!(first, Some(entry("x.ogv")));
        assert_eq!(pl.index(), 0);
        assert_eq!(pl.len(), 1);
    }

    #[test]
    fn empty_load_enters_fallback() {
        let mut pl = Playlist::new();
        pl.load(vec![entry("a.png")]);
        assert!(pl.load(Vec::new()).is_none());
        assert!(pl.is_empty());
    }

    #[test]
    fn center_region_is_twenty_percent_each_axis() {
        // 1000x500 view: region spans x 400..600, y 200..300.
        assert!(in_center_region(500.0, 250.0, 1000.0, 500.0));
        assert!(in_center_region(401.0, 201.0, 1000.0, 500.0));
        assert!(in_center_region(599.0, 299.0, 1000.0, 500.0));
        assert!(!in_center_region(399.0, 250.0, 1000.0, 500.0));
        assert!(!in_center_region(500.0, 301.0, 1000.0, 500.0));
        assert!(!in_center_region(0.0, 0.0, 1000.0, 500.0));
    }
}
