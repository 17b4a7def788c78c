//! Pixel frames.
//!
//! A [`Frame`] is a rectangular pixel buffer with a fixed shape
//! (height, width, channel-count), one byte per channel, row-major with
//! interleaved channels. Frames carry no identity beyond the label a
//! sequence attaches to them; the sequence contract only ever requires
//! shape equality. Value equality is derived because tests rely on it.

use std::fmt;

use crate::error::{CaptureError, CaptureResult};

/// Shape of a frame: height x width x channel-count.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Shape {
    pub height: usize,
    pub width: usize,
    pub channels: usize,
}

impl Shape {
    pub fn new(height: usize, width: usize, channels: usize) -> Self {
        Self {
            height,
            width,
            channels,
        }
    }

    /// Total number of bytes a frame of this shape occupies.
    pub fn byte_len(&self) -> usize {
        self.height * self.width * self.channels
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}x{}", self.height, self.width, self.channels)
    }
}

/// Owned pixel buffer with a shape.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    shape: Shape,
    data: Vec<u8>,
}

impl Frame {
    /// Wrap an existing pixel buffer. The buffer length must match the shape.
    pub fn new(shape: Shape, data: Vec<u8>) -> CaptureResult<Self> {
        if data.len() != shape.byte_len() {
            return Err(CaptureError::Codec(format!(
                "pixel buffer length {} does not match shape {}",
                data.len(),
                shape
            )));
        }
        Ok(Self { shape, data })
    }

    /// A frame filled with a single byte value.
    pub fn filled(shape: Shape, value: u8) -> Self {
        Self {
            shape,
            data: vec![value; shape.byte_len()],
        }
    }

    /// Zero-sized stand-in used when moving frames out of storage.
    pub(crate) fn placeholder() -> Self {
        Self {
            shape: Shape::new(0, 0, 0),
            data: Vec::new(),
        }
    }

    pub fn shape(&self) -> Shape {
        self.shape
    }

    pub fn height(&self) -> usize {
        self.shape.height
    }

    pub fn width(&self) -> usize {
        self.shape.width
    }

    pub fn channels(&self) -> usize {
        self.shape.channels
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn as_bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    fn offset(&self, row: usize, col: usize, channel: usize) -> usize {
        (row * self.shape.width + col) * self.shape.channels + channel
    }

    /// Read one channel byte. Panics on out-of-bounds coordinates, like
    /// slice indexing; transforms validate against the shape first.
    pub fn get(&self, row: usize, col: usize, channel: usize) -> u8 {
        self.data[self.offset(row, col, channel)]
    }

    pub fn set(&mut self, row: usize, col: usize, channel: usize, value: u8) {
        let at = self.offset(row, col, channel);
        self.data[at] = value;
    }

    /// One row of interleaved pixel bytes.
    pub fn row(&self, row: usize) -> &[u8] {
        let stride = self.shape.width * self.shape.channels;
        &self.data[row * stride..(row + 1) * stride]
    }

    /// Write `color` into every pixel of the rectangle
    /// [top, bottom) x [left, right), clamped to the frame bounds. `color`
    /// must have exactly one byte per channel.
    pub fn fill_rect(
        &mut self,
        top: isize,
        bottom: isize,
        left: isize,
        right: isize,
        color: &[u8],
    ) -> CaptureResult<()> {
        if color.len() != self.shape.channels {
            return Err(CaptureError::Codec(format!(
                "fill color has {} bytes for {} channels",
                color.len(),
                self.shape.channels
            )));
        }
        let top = top.max(0) as usize;
        let left = left.max(0) as usize;
        let bottom = (bottom.max(0) as usize).min(self.shape.height);
        let right = (right.max(0) as usize).min(self.shape.width);
        for row in top..bottom {
            for col in left..right {
                for (channel, value) in color.iter().enumerate() {
                    self.set(row, col, channel, *value);
                }
            }
        }
        Ok(())
    }

    /// Copy out the sub-frame [top, bottom) x [left, right).
    pub fn crop(
        &self,
        top: usize,
        bottom: usize,
        left: usize,
        right: usize,
    ) -> CaptureResult<Frame> {
        if bottom > self.shape.height || right > self.shape.width || top > bottom || left > right {
            return Err(CaptureError::Codec(format!(
                "crop [{top}, {bottom})x[{left}, {right}) outside frame {}",
                self.shape
            )));
        }
        let shape = Shape::new(bottom - top, right - left, self.shape.channels);
        let mut data = Vec::with_capacity(shape.byte_len());
        for row in top..bottom {
            let line = self.row(row);
            let from = left * self.shape.channels;
            let to = right * self.shape.channels;
            data.extend_from_slice(&line[from..to]);
        }
        Frame::new(shape, data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_rejects_wrong_buffer_length() {
        let shape = Shape::new(2, 2, 1);
        assert!(Frame::new(shape, vec![0; 3]).is_err());
        assert!(Frame::new(shape, vec![0; 4]).is_ok());
    }

    #[test]
    fn get_set_round_trip() {
        let mut frame = Frame::filled(Shape::new(3, 4, 2), 0);
        frame.set(2, 3, 1, 77);
        assert_eq!(frame.get(2, 3, 1), 77);
        assert_eq!(frame.get(2, 3, 0), 0);
    }

    #[test]
    fn fill_rect_clamps_to_bounds() {
        let mut frame = Frame::filled(Shape::new(4, 4, 1), 0);
        frame.fill_rect(-2, 2, -2, 2, &[9]).unwrap();
        assert_eq!(frame.get(0, 0, 0), 9);
        assert_eq!(frame.get(1, 1, 0), 9);
        assert_eq!(frame.get(2, 2, 0), 0);
    }

    #[test]
    fn crop_extracts_sub_frame() {
        let mut frame = Frame::filled(Shape::new(4, 4, 1), 0);
        frame.set(1, 1, 0, 5);
        let inner = frame.crop(1, 3, 1, 3).unwrap();
        assert_eq!(inner.shape(), Shape::new(2, 2, 1));
        assert_eq!(inner.get(0, 0, 0), 5);
    }
}
