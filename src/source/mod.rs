//! Frame sources.
//!
//! This module provides the backends sequences load frames from:
//! - Synthetic frames (`stub://`, testing)
//! - Caller-supplied in-memory frames
//! - Directories of numbered image files
//! - Local video files (feature: source-ffmpeg)
//!
//! A [`FrameSource`] is an immutable description of where frames live; it
//! hands out independent [`SourceReader`] sessions on demand. Streamed
//! sequences open a fresh session per traversal and drop it when the
//! traversal ends, so readers must not assume they run to exhaustion.
//!
//! Sources MUST NOT:
//! - Fetch remote URLs
//! - Cache decoded frames between sessions

use std::path::Path;
use std::rc::Rc;

use crate::error::{CaptureError, CaptureResult};
use crate::frame::Frame;

#[cfg(feature = "source-ffmpeg")]
pub(crate) mod ffmpeg;
mod image_dir;
mod synthetic;

#[cfg(feature = "source-ffmpeg")]
pub use ffmpeg::FfmpegSource;
pub use image_dir::ImageDirSource;
pub use synthetic::{MemorySource, SyntheticSource};

/// A place frames can be read from, any number of times.
pub trait FrameSource {
    /// Start a new read session at the first frame.
    fn open(&self) -> CaptureResult<Box<dyn SourceReader>>;

    /// Human-readable identity of the source, used in logs and errors.
    fn describe(&self) -> String;
}

/// One in-progress read session.
///
/// Dropping a reader releases whatever it holds (file handles, decoder
/// state); no explicit close call exists.
pub trait SourceReader {
    /// Number of frames the source claims to hold. Decoding may reveal a
    /// different count; callers treat this as a hint for sizing.
    fn frame_count(&self) -> usize;

    /// Decode the next frame, or `None` at the end of the source.
    fn read(&mut self) -> CaptureResult<Option<Frame>>;

    /// Reposition so the next `read` returns the frame at `position`.
    fn seek(&mut self, position: usize) -> CaptureResult<()>;
}

/// Pick a backend for `path`.
///
/// `stub://N/HxWxC` yields N synthetic frames of the given shape,
/// directories are read as image sequences, anything else goes to the
/// video decoder when the `source-ffmpeg` feature is enabled.
pub fn from_path(path: &str) -> CaptureResult<Rc<dyn FrameSource>> {
    if let Some(rest) = path.strip_prefix("stub://") {
        let source = SyntheticSource::parse(rest).ok_or_else(|| CaptureError::SourceUnreadable {
            path: path.to_string(),
        })?;
        return Ok(Rc::new(source));
    }
    if path.contains("://") {
        log::warn!("rejecting non-local source '{path}'");
        return Err(CaptureError::SourceUnreadable {
            path: path.to_string(),
        });
    }
    let local = Path::new(path);
    if local.is_dir() {
        return Ok(Rc::new(ImageDirSource::new(local)?));
    }
    #[cfg(feature = "source-ffmpeg")]
    {
        Ok(Rc::new(FfmpegSource::new(local)?))
    }
    #[cfg(not(feature = "source-ffmpeg"))]
    {
        log::warn!("video decoding requires the source-ffmpeg feature");
        Err(CaptureError::SourceUnreadable {
            path: path.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stub_paths_parse_into_synthetic_sources() {
        let source = from_path("stub://5/8x6x3").unwrap();
        let mut reader = source.open().unwrap();
        assert_eq!(reader.frame_count(), 5);
        let frame = reader.read().unwrap().unwrap();
        assert_eq!(frame.shape(), crate::frame::Shape::new(8, 6, 3));
    }

    #[test]
    fn url_schemes_are_rejected() {
        assert!(matches!(
            from_path("rtsp://camera/feed"),
            Err(CaptureError::SourceUnreadable { .. })
        ));
    }

    #[test]
    fn malformed_stub_specs_are_rejected() {
        assert!(from_path("stub://").is_err());
        assert!(from_path("stub://3/4x4").is_err());
    }
}
