//! Synthetic and in-memory sources for tests and pipelines that start from
//! frames built by the caller.

use crate::error::{CaptureError, CaptureResult};
use crate::frame::{Frame, Shape};

use super::{FrameSource, SourceReader};

/// Deterministic generated frames. Frame `n` holds pixel values derived
/// from `n` and the pixel offset, so any two readers agree byte for byte.
#[derive(Clone, Debug)]
pub struct SyntheticSource {
    length: usize,
    shape: Shape,
}

impl SyntheticSource {
    pub fn new(length: usize, shape: Shape) -> Self {
        Self { length, shape }
    }

    /// Parse the `stub://` payload, `N/HxWxC`.
    pub(crate) fn parse(payload: &str) -> Option<Self> {
        let (count, dims) = payload.split_once('/')?;
        let length: usize = count.parse().ok()?;
        let mut parts = dims.split('x');
        let height: usize = parts.next()?.parse().ok()?;
        let width: usize = parts.next()?.parse().ok()?;
        let channels: usize = parts.next()?.parse().ok()?;
        if parts.next().is_some() || channels == 0 {
            return None;
        }
        Some(Self::new(length, Shape::new(height, width, channels)))
    }

    fn generate(&self, position: usize) -> Frame {
        let mut frame = Frame::filled(self.shape, 0);
        for (offset, value) in frame.as_bytes_mut().iter_mut().enumerate() {
            *value = ((position * 31 + offset) % 256) as u8;
        }
        frame
    }
}

impl FrameSource for SyntheticSource {
    fn open(&self) -> CaptureResult<Box<dyn SourceReader>> {
        Ok(Box::new(SyntheticReader {
            source: self.clone(),
            position: 0,
        }))
    }

    fn describe(&self) -> String {
        format!("stub://{}/{}", self.length, self.shape)
    }
}

struct SyntheticReader {
    source: SyntheticSource,
    position: usize,
}

impl SourceReader for SyntheticReader {
    fn frame_count(&self) -> usize {
        self.source.length
    }

    fn read(&mut self) -> CaptureResult<Option<Frame>> {
        if self.position >= self.source.length {
            return Ok(None);
        }
        let frame = self.source.generate(self.position);
        self.position += 1;
        Ok(Some(frame))
    }

    fn seek(&mut self, position: usize) -> CaptureResult<()> {
        if position >= self.source.length {
            return Err(CaptureError::PositionOutOfRange {
                position,
                length: self.source.length,
            });
        }
        self.position = position;
        Ok(())
    }
}

/// Caller-supplied frames, cloned out on every read.
#[derive(Clone, Debug)]
pub struct MemorySource {
    frames: Vec<Frame>,
}

impl MemorySource {
    pub fn new(frames: Vec<Frame>) -> Self {
        Self { frames }
    }
}

impl FrameSource for MemorySource {
    fn open(&self) -> CaptureResult<Box<dyn SourceReader>> {
        Ok(Box::new(MemoryReader {
            frames: self.frames.clone(),
            position: 0,
        }))
    }

    fn describe(&self) -> String {
        format!("memory ({} frames)", self.frames.len())
    }
}

struct MemoryReader {
    frames: Vec<Frame>,
    position: usize,
}

impl SourceReader for MemoryReader {
    fn frame_count(&self) -> usize {
        self.frames.len()
    }

    fn read(&mut self) -> CaptureResult<Option<Frame>> {
        match self.frames.get(self.position) {
            Some(frame) => {
                self.position += 1;
                Ok(Some(frame.clone()))
            }
            None => Ok(None),
        }
    }

    fn seek(&mut self, position: usize) -> CaptureResult<()> {
        if position >= self.frames.len() {
            return Err(CaptureError::PositionOutOfRange {
                position,
                length: self.frames.len(),
            });
        }
        self.position = position;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthetic_frames_are_deterministic() {
        let source = SyntheticSource::new(3, Shape::new(2, 2, 1));
        let mut a = source.open().unwrap();
        let mut b = source.open().unwrap();
        assert_eq!(a.read().unwrap(), b.read().unwrap());
        assert_eq!(a.read().unwrap(), b.read().unwrap());
    }

    #[test]
    fn seek_repositions_the_reader() {
        let source = SyntheticSource::new(5, Shape::new(2, 2, 1));
        let mut reader = source.open().unwrap();
        let third = {
            let mut scan = source.open().unwrap();
            scan.read().unwrap();
            scan.read().unwrap();
            scan.read().unwrap().unwrap()
        };
        reader.seek(2).unwrap();
        assert_eq!(reader.read().unwrap().unwrap(), third);
        assert!(reader.seek(5).is_err());
    }

    #[test]
    fn memory_source_replays_caller_frames() {
        let frames = vec![
            Frame::filled(Shape::new(1, 1, 1), 7),
            Frame::filled(Shape::new(1, 1, 1), 8),
        ];
        let source = MemorySource::new(frames.clone());
        let mut reader = source.open().unwrap();
        assert_eq!(reader.read().unwrap().unwrap(), frames[0]);
        assert_eq!(reader.read().unwrap().unwrap(), frames[1]);
        assert_eq!(reader.read().unwrap(), None);
    }
}
