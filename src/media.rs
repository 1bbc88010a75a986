//! Media source boundary: a request-driven loader thread that decodes stills
//! and prepares video streams off the UI context.
//!
//! Results come back over a channel stamped with the request generation; the
//! UI context drains them between events and discards stale ones. Concrete
//! video codecs live behind [`VideoBackend`], injected by the host.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::Arc;
use std::thread;

use crossbeam_channel::{Receiver, Sender};
use image::RgbaImage;
use tracing::{debug, warn};

use crate::error::Error;
use crate::events::{LoaderMsg, PreparedStill, SourceEvent};
use crate::playlist::MediaKind;

/// A prepared, looping video stream. Implementations decode lazily; dropping
/// the box stops and releases the underlying player.
pub trait FrameSource: Send {
    /// Produce the next RGBA frame, wrapping back to the start at the end of
    /// the stream. An error here is an async playback failure; the view
    /// releases the session and falls back.
    fn next_frame(&mut self) -> Result<RgbaImage, Error>;

    fn dimensions(&self) -> (u32, u32);
}

/// Opens a video file into a [`FrameSource`]. The shipped binary installs
/// [`NoVideoBackend`]; hosts with a real decoder install their own.
pub trait VideoBackend: Send + Sync {
    fn open(&self, path: &Path) -> Result<Box<dyn FrameSource>, Error>;
}

/// Backend for hosts without a video decoder: every open fails, which routes
/// video entries to the fallback display instead of crashing.
pub struct NoVideoBackend;

impl VideoBackend for NoVideoBackend {
    fn open(&self, path: &Path) -> Result<Box<dyn FrameSource>, Error> {
        Err(Error::playback(path, "no video backend configured"))
    }
}

/// Spawn the loader thread. Requests are coalesced: when several loads are
/// queued, only the newest is decoded, since the older ones are already stale
/// from the UI's point of view.
pub fn spawn_loader(
    backend: Arc<dyn VideoBackend>,
    rx: Receiver<LoaderMsg>,
    tx: Sender<SourceEvent>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        while let Ok(mut msg) = rx.recv() {
            // Only the newest queued load matters; a queued Quit always wins.
            while !matches!(msg, LoaderMsg::Quit) {
                match rx.try_recv() {
                    Ok(newer) => msg = newer,
                    Err(_) => break,
                }
            }
            match msg {
                LoaderMsg::Quit => break,
                LoaderMsg::Load {
                    generation,
                    entry,
                    target,
                } => {
                    let event = match entry.kind {
                        MediaKind::StillImage => match decode_still(&entry.path, target) {
                            Ok(image) => SourceEvent::StillReady {
                                generation,
                                still: PreparedStill {
                                    path: entry.path,
                                    image,
                                },
                            },
                            Err(error) => SourceEvent::Failed {
                                generation,
                                path: entry.path,
                                error,
                            },
                        },
                        MediaKind::Video => match backend.open(&entry.path) {
                            Ok(stream) => SourceEvent::VideoReady { generation, stream },
                            Err(error) => SourceEvent::Failed {
                                generation,
                                path: entry.path,
                                error,
                            },
                        },
                    };
                    if tx.send(event).is_err() {
                        break;
                    }
                }
            }
        }
    })
}

/// Decode a still to RGBA8, apply EXIF orientation if present, and bound its
/// size by the target view so the warp resample stays cheap.
pub fn decode_still(path: &Path, target: (u32, u32)) -> Result<RgbaImage, Error> {
    let img = image::ImageReader::open(path)
        .map_err(|e| Error::decode(path, e.to_string()))?
        .with_guessed_format()
        .map_err(|e| Error::decode(path, e.to_string()))?
        .decode()
        .map_err(|e| Error::decode(path, e.to_string()))?;

    let mut img = img.to_rgba8();

    let orientation = read_orientation(path).unwrap_or(1);
    match orientation {
        1 => {}
        2 => img = image::imageops::flip_horizontal(&img),
        3 => img = image::imageops::rotate180(&img),
        4 => img = image::imageops::flip_vertical(&img),
        5 => {
            img = image::imageops::rotate90(&img);
            img = image::imageops::flip_horizontal(&img);
        }
        6 => img = image::imageops::rotate90(&img),
        7 => {
            img = image::imageops::rotate270(&img);
            img = image::imageops::flip_horizontal(&img);
        }
        8 => img = image::imageops::rotate270(&img),
        _ => {}
    }

    let (tw, th) = (target.0.max(1), target.1.max(1));
    if img.width() > tw || img.height() > th {
        let scaled = image::DynamicImage::ImageRgba8(img).resize(
            tw,
            th,
            image::imageops::FilterType::Triangle,
        );
        img = scaled.to_rgba8();
        debug!(path = %path.display(), w = img.width(), h = img.height(), "downscaled still");
    }

    Ok(img)
}

fn read_orientation(path: &Path) -> Option<u16> {
    let file = File::open(path).ok()?;
    let mut buf = BufReader::new(file);
    let exif = exif::Reader::new().read_from_container(&mut buf).ok()?;
    let field = exif.get_field(exif::Tag::Orientation, exif::In::PRIMARY)?;
    let val = field.value.get_uint(0)?;
    if !(1..=8).contains(&(val as u16)) {
        warn!(path = %path.display(), orientation = val, "unexpected exif orientation");
        return None;
    }
    Some(val as u16)
}
