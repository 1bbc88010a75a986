//! Live media-folder watching.
//!
//! Filesystem events are bridged from the notify callback onto a crossbeam
//! channel; the UI context drains it and rebuilds the playlist wholesale.
//! Individual add/remove events are never patched into the list.

use std::path::Path;

use crossbeam_channel::Sender;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher, recommended_watcher};
use tracing::{debug, error, info};

use crate::playlist::MediaKind;

/// Signal that the media folder changed and a rescan is due.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RescanRequest;

/// Start watching `root`. The returned watcher must stay alive for events to
/// flow; dropping it stops the watch.
pub fn watch_media_dir(
    root: &Path,
    rescan_tx: Sender<RescanRequest>,
) -> notify::Result<RecommendedWatcher> {
    let mut watcher = recommended_watcher(move |res: notify::Result<Event>| match res {
        Ok(event) => {
            if is_relevant(&event) {
                debug!(kind = ?event.kind, paths = ?event.paths, "media folder changed");
                let _ = rescan_tx.send(RescanRequest);
            }
        }
        Err(err) => error!("watch error: {err}"),
    })?;
    watcher.watch(root, RecursiveMode::Recursive)?;
    match root.canonicalize() {
        Ok(abs) => info!(watching = %abs.display(), "media watcher initialized"),
        Err(_) => info!(watching = %root.display(), "media watcher initialized"),
    }
    Ok(watcher)
}

fn is_relevant(event: &Event) -> bool {
    let touches_media = event.paths.iter().any(|p| MediaKind::classify(p).is_some());
    match event.kind {
        EventKind::Create(_) | EventKind::Remove(_) | EventKind::Modify(_) => touches_media,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use notify::event::{CreateKind, EventKind};
    use std::path::PathBuf;

    #[test]
    fn ignores_events_for_non_media_paths() {
        let ev = Event {
            kind: EventKind::Create(CreateKind::File),
            paths: vec![PathBuf::from("/media/notes.txt")],
            attrs: Default::default(),
        };
        assert!(!is_relevant(&ev));
    }

    #[test]
    fn create_of_media_file_requests_rescan() {
        let ev = Event {
            kind: EventKind::Create(CreateKind::File),
            paths: vec![PathBuf::from("/media/clip.mp4")],
            attrs: Default::default(),
        };
        assert!(is_relevant(&ev));
    }
}
