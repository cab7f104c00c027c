//! Polling directory watcher for operator-dropped frames.
//!
//! A collaborator process drops processed frames into a directory; we sweep
//! it once a second, hand each decodable image to a handler, and delete the
//! file afterwards so the directory acts as a queue.

use crate::mailbox::ShutdownFlag;
use anyhow::Context;
use image::DynamicImage;
use log::warn;
use std::fs;
use std::path::Path;
use std::thread;
use std::time::Duration;

pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Extensions we attempt to decode. Everything else is left in place.
fn is_image_path(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase).as_deref(),
        Some("png" | "tif" | "tiff" | "jpg" | "jpeg" | "bmp")
    )
}

/// Sweep `dir` once. Returns the number of frames handled.
///
/// Files that fail to decode are logged and left alone so a partially
/// written file gets another chance on the next sweep. Handled files are
/// removed.
pub fn poll_once<F>(dir: &Path, handler: &mut F) -> anyhow::Result<usize>
where
    F: FnMut(&Path, DynamicImage) -> anyhow::Result<()>,
{
    let mut handled = 0;
    let entries =
        fs::read_dir(dir).with_context(|| format!("reading watch directory {}", dir.display()))?;
    for entry in entries {
        let entry = entry.with_context(|| format!("listing {}", dir.display()))?;
        let path = entry.path();
        if !path.is_file() || !is_image_path(&path) {
            continue;
        }
        let frame = match image::open(&path) {
            Ok(frame) => frame,
            Err(err) => {
                warn!("skipping {}: {err}", path.display());
                continue;
            }
        };
        handler(&path, frame)?;
        fs::remove_file(&path).with_context(|| format!("removing {}", path.display()))?;
        handled += 1;
    }
    Ok(handled)
}

/// Sweep `dir` until `shutdown` is raised, sleeping `interval` only after
/// an empty sweep. A busy sweep re-polls immediately in case more frames
/// are already waiting.
pub fn watch_directory<F>(
    dir: &Path,
    interval: Duration,
    shutdown: &ShutdownFlag,
    mut handler: F,
) -> anyhow::Result<()>
where
    F: FnMut(&Path, DynamicImage) -> anyhow::Result<()>,
{
    while !shutdown.is_raised() {
        if poll_once(dir, &mut handler)? == 0 {
            thread::sleep(interval);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::GrayImage;

    #[test]
    fn test_is_image_path_accepts_known_extensions() {
        assert!(is_image_path(Path::new("frame.png")));
        assert!(is_image_path(Path::new("frame.TIFF")));
        assert!(is_image_path(Path::new("frame.jpg")));
        assert!(!is_image_path(Path::new("frame.txt")));
        assert!(!is_image_path(Path::new("frame")));
    }

    #[test]
    fn test_poll_once_handles_and_removes_frames() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("frame.png");
        GrayImage::from_pixel(4, 4, image::Luma([42])).save(&path).unwrap();

        let mut seen = Vec::new();
        let handled = poll_once(dir.path(), &mut |p, frame| {
            seen.push((p.to_path_buf(), frame.to_luma8()[(0, 0)][0]));
            Ok(())
        })
        .unwrap();

        assert_eq!(handled, 1);
        assert_eq!(seen, vec![(path.clone(), 42)]);
        assert!(!path.exists());
    }

    #[test]
    fn test_poll_once_skips_undecodable_files() {
        let dir = tempfile::tempdir().unwrap();
        let bad = dir.path().join("broken.png");
        fs::write(&bad, b"not a png").unwrap();

        let handled = poll_once(dir.path(), &mut |_, _| Ok(())).unwrap();

        assert_eq!(handled, 0);
        // Left in place for the next sweep.
        assert!(bad.exists());
    }

    #[test]
    fn test_poll_once_ignores_non_image_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("notes.txt"), b"hello").unwrap();

        let handled = poll_once(dir.path(), &mut |_, _| {
            panic!("handler must not run for non-image files")
        })
        .unwrap();
        assert_eq!(handled, 0);
    }

    #[test]
    fn test_busy_sweeps_do_not_sleep() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().to_path_buf();
        GrayImage::from_pixel(2, 2, image::Luma([1]))
            .save(root.join("frame0.png"))
            .unwrap();

        let shutdown = ShutdownFlag::new();
        let stop = shutdown.clone();
        let mut handled = 0u32;
        let start = std::time::Instant::now();

        // Each handled frame drops the next one in, so every sweep is busy
        // until the third frame stops the loop. With the idle interval this
        // long, any sleep between busy sweeps would blow the elapsed bound.
        watch_directory(dir.path(), Duration::from_secs(30), &shutdown, |_, _| {
            handled += 1;
            if handled < 3 {
                GrayImage::from_pixel(2, 2, image::Luma([1]))
                    .save(root.join(format!("frame{handled}.png")))?;
            } else {
                stop.raise();
            }
            Ok(())
        })
        .unwrap();

        assert_eq!(handled, 3);
        assert!(start.elapsed() < Duration::from_secs(30));
    }

    #[test]
    fn test_poll_once_missing_directory_errors() {
        let dir = tempfile::tempdir().unwrap();
        let gone = dir.path().join("missing");
        assert!(poll_once(&gone, &mut |_, _| Ok(())).is_err());
    }
}
