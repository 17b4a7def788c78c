//! Directory-of-images source.
//!
//! Treats a directory of PNG/JPEG files, sorted by file name, as a frame
//! sequence. Files are decoded lazily, one per `read`, and converted to
//! 8-bit interleaved RGB. The first decoded frame fixes the shape; any
//! later file that decodes to a different shape fails the traversal.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{CaptureError, CaptureResult};
use crate::frame::{Frame, Shape};

use super::{FrameSource, SourceReader};

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg"];

#[derive(Clone, Debug)]
pub struct ImageDirSource {
    dir: PathBuf,
    files: Vec<PathBuf>,
}

impl ImageDirSource {
    /// Scan `dir` for image files. The listing is taken once; files added
    /// or removed later are not picked up by existing sources.
    pub fn new(dir: &Path) -> CaptureResult<Self> {
        let entries = fs::read_dir(dir).map_err(|err| {
            log::warn!("cannot list '{}': {err}", dir.display());
            CaptureError::SourceUnreadable {
                path: dir.display().to_string(),
            }
        })?;
        let mut files: Vec<PathBuf> = Vec::new();
        for entry in entries {
            let path = entry?.path();
            let matches = path
                .extension()
                .and_then(|ext| ext.to_str())
                .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
                .unwrap_or(false);
            if matches {
                files.push(path);
            }
        }
        files.sort();
        log::debug!("image dir '{}' holds {} frames", dir.display(), files.len());
        Ok(Self {
            dir: dir.to_path_buf(),
            files,
        })
    }
}

impl FrameSource for ImageDirSource {
    fn open(&self) -> CaptureResult<Box<dyn SourceReader>> {
        Ok(Box::new(ImageDirReader {
            files: self.files.clone(),
            position: 0,
            shape: None,
        }))
    }

    fn describe(&self) -> String {
        self.dir.display().to_string()
    }
}

struct ImageDirReader {
    files: Vec<PathBuf>,
    position: usize,
    // fixed by the first decode of this session
    shape: Option<Shape>,
}

impl ImageDirReader {
    fn decode(&mut self, path: &Path) -> CaptureResult<Frame> {
        let decoded = image::open(path)?.into_rgb8();
        let shape = Shape::new(decoded.height() as usize, decoded.width() as usize, 3);
        if let Some(expected) = self.shape {
            if shape != expected {
                return Err(CaptureError::ShapeMismatch {
                    expected,
                    actual: shape,
                });
            }
        } else {
            self.shape = Some(shape);
        }
        Frame::new(shape, decoded.into_raw())
    }
}

impl SourceReader for ImageDirReader {
    fn frame_count(&self) -> usize {
        self.files.len()
    }

    fn read(&mut self) -> CaptureResult<Option<Frame>> {
        let Some(path) = self.files.get(self.position).cloned() else {
            return Ok(None);
        };
        let frame = self.decode(&path)?;
        self.position += 1;
        Ok(Some(frame))
    }

    fn seek(&mut self, position: usize) -> CaptureResult<()> {
        if position >= self.files.len() {
            return Err(CaptureError::PositionOutOfRange {
                position,
                length: self.files.len(),
            });
        }
        self.position = position;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{ImageBuffer, Rgb};

    fn write_png(dir: &Path, name: &str, width: u32, height: u32, value: u8) {
        let img: ImageBuffer<Rgb<u8>, Vec<u8>> =
            ImageBuffer::from_pixel(width, height, Rgb([value, value, value]));
        img.save(dir.join(name)).unwrap();
    }

    #[test]
    fn files_are_read_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        write_png(dir.path(), "frame_002.png", 4, 3, 2);
        write_png(dir.path(), "frame_000.png", 4, 3, 0);
        write_png(dir.path(), "frame_001.png", 4, 3, 1);
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let source = ImageDirSource::new(dir.path()).unwrap();
        let mut reader = source.open().unwrap();
        assert_eq!(reader.frame_count(), 3);
        for expected in 0u8..3 {
            let frame = reader.read().unwrap().unwrap();
            assert_eq!(frame.shape(), Shape::new(3, 4, 3));
            assert_eq!(frame.get(0, 0, 0), expected);
        }
        assert_eq!(reader.read().unwrap(), None);
    }

    #[test]
    fn shape_drift_fails_the_session() {
        let dir = tempfile::tempdir().unwrap();
        write_png(dir.path(), "a.png", 4, 4, 0);
        write_png(dir.path(), "b.png", 5, 4, 0);

        let source = ImageDirSource::new(dir.path()).unwrap();
        let mut reader = source.open().unwrap();
        reader.read().unwrap();
        assert!(matches!(
            reader.read(),
            Err(CaptureError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn missing_directory_is_unreadable() {
        assert!(matches!(
            ImageDirSource::new(Path::new("/nonexistent/frames")),
            Err(CaptureError::SourceUnreadable { .. })
        ));
    }
}
