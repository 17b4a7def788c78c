//! Per-frame transform factories.
//!
//! Each factory returns a closure shaped for `apply` (or `rolling` for the
//! window transforms) with no companion data. All transforms are pure:
//! given the same inputs they return the same frame, so the lazy variant's
//! replay pass may invoke them twice.
//!
//! Coordinates follow the image convention of the label store: `x` runs
//! along columns, `y` along rows.

use crate::error::{CaptureError, CaptureResult};
use crate::frame::{Frame, Shape};
use crate::labels::LabelStore;
use crate::sequence::{Entry, Label};

/// Keep a single channel; output shape (H, W, 1).
pub fn select_channel(
    channel: usize,
) -> impl Fn(Label, Frame, Option<&()>) -> CaptureResult<Frame> {
    move |_, frame, _| {
        let shape = frame.shape();
        if channel >= shape.channels {
            return Err(CaptureError::Codec(format!(
                "channel {channel} out of range for {shape}"
            )));
        }
        let out_shape = Shape::new(shape.height, shape.width, 1);
        let mut data = Vec::with_capacity(out_shape.byte_len());
        for row in 0..shape.height {
            for col in 0..shape.width {
                data.push(frame.get(row, col, channel));
            }
        }
        Frame::new(out_shape, data)
    }
}

/// Replicate a single-channel frame into `channels` identical channels.
pub fn replicate_channel(
    channels: usize,
) -> impl Fn(Label, Frame, Option<&()>) -> CaptureResult<Frame> {
    move |_, frame, _| {
        let shape = frame.shape();
        if shape.channels != 1 {
            return Err(CaptureError::ShapeMismatch {
                expected: Shape::new(shape.height, shape.width, 1),
                actual: shape,
            });
        }
        let out_shape = Shape::new(shape.height, shape.width, channels);
        let mut data = Vec::with_capacity(out_shape.byte_len());
        for value in frame.as_bytes() {
            for _ in 0..channels {
                data.push(*value);
            }
        }
        Frame::new(out_shape, data)
    }
}

/// Blank (or with `hard`, crop away) a border band of `pixels`.
pub fn remove_borders(
    pixels: usize,
    hard: bool,
) -> impl Fn(Label, Frame, Option<&()>) -> CaptureResult<Frame> {
    move |_, mut frame, _| {
        let shape = frame.shape();
        if hard {
            return frame.crop(
                pixels,
                shape.height.saturating_sub(pixels),
                pixels,
                shape.width.saturating_sub(pixels),
            );
        }
        let zero = vec![0u8; shape.channels];
        let (height, width) = (shape.height as isize, shape.width as isize);
        let band = pixels as isize;
        frame.fill_rect(0, band, 0, width, &zero)?;
        frame.fill_rect(height - band, height, 0, width, &zero)?;
        frame.fill_rect(0, height, 0, band, &zero)?;
        frame.fill_rect(0, height, width - band, width, &zero)?;
        Ok(frame)
    }
}

/// Zero every pixel outside the ellipse centered at `center` with the
/// given half-axes; with `hard`, also crop to the ellipse's bounding box
/// clamped to the frame.
pub fn mask_outside_ellipse(
    center: (f64, f64),
    radius: (f64, f64),
    hard: bool,
) -> impl Fn(Label, Frame, Option<&()>) -> CaptureResult<Frame> {
    move |_, mut frame, _| {
        let shape = frame.shape();
        let (cx, cy) = center;
        let (rx, ry) = radius;
        if rx <= 0.0 || ry <= 0.0 {
            return Err(CaptureError::Codec(format!(
                "ellipse half-axes must be positive, got ({rx}, {ry})"
            )));
        }
        for row in 0..shape.height {
            for col in 0..shape.width {
                let dy = (row as f64 - cy) / ry;
                let dx = (col as f64 - cx) / rx;
                if dy * dy + dx * dx > 1.0 {
                    for channel in 0..shape.channels {
                        frame.set(row, col, channel, 0);
                    }
                }
            }
        }
        if hard {
            let top = (cy - ry).max(0.0) as usize;
            let bottom = ((cy + ry) as usize).min(shape.height.saturating_sub(1));
            let left = (cx - rx).max(0.0) as usize;
            let right = ((cx + rx) as usize).min(shape.width.saturating_sub(1));
            return frame.crop(top, bottom, left, right);
        }
        Ok(frame)
    }
}

/// Draw a filled square of side `2 * size` at each stored position, in
/// `color` (one byte per channel). Frames without a position pass through.
pub fn annotate(
    store: LabelStore,
    size: usize,
    color: Vec<u8>,
) -> impl Fn(Label, Frame, Option<&()>) -> CaptureResult<Frame> {
    move |label, mut frame, _| {
        if let Some(position) = store.get(label) {
            let (x, y) = position.rounded();
            let half = size as isize;
            let (x, y) = (x as isize, y as isize);
            frame.fill_rect(y - half, y + half, x - half, x + half, &color)?;
        }
        Ok(frame)
    }
}

/// Rolling transform: mean of the window, computed in u32 to avoid
/// overflow, truncated back to bytes.
pub fn average_window() -> impl Fn(Label, &[Entry], Option<&()>) -> CaptureResult<Frame> {
    |_, window, _| {
        let first = &window[0].1;
        let mut sums: Vec<u32> = first.as_bytes().iter().map(|v| u32::from(*v)).collect();
        for (_, frame) in &window[1..] {
            for (sum, value) in sums.iter_mut().zip(frame.as_bytes()) {
                *sum += u32::from(*value);
            }
        }
        let count = window.len() as u32;
        let data: Vec<u8> = sums.iter().map(|sum| (sum / count) as u8).collect();
        Frame::new(first.shape(), data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::labels::Position;

    fn gradient(shape: Shape) -> Frame {
        let mut frame = Frame::filled(shape, 0);
        for (offset, value) in frame.as_bytes_mut().iter_mut().enumerate() {
            *value = (offset % 256) as u8;
        }
        frame
    }

    #[test]
    fn select_channel_keeps_one_plane() {
        let frame = gradient(Shape::new(2, 2, 3));
        let out = select_channel(1)(0, frame.clone(), None).unwrap();
        assert_eq!(out.shape(), Shape::new(2, 2, 1));
        assert_eq!(out.get(1, 1, 0), frame.get(1, 1, 1));
        assert!(select_channel(3)(0, frame, None).is_err());
    }

    #[test]
    fn replicate_channel_triples_a_mono_frame() {
        let frame = gradient(Shape::new(2, 2, 1));
        let out = replicate_channel(3)(0, frame.clone(), None).unwrap();
        assert_eq!(out.shape(), Shape::new(2, 2, 3));
        for channel in 0..3 {
            assert_eq!(out.get(1, 0, channel), frame.get(1, 0, 0));
        }
    }

    #[test]
    fn remove_borders_soft_blanks_the_band() {
        let frame = Frame::filled(Shape::new(4, 4, 1), 9);
        let out = remove_borders(1, false)(0, frame, None).unwrap();
        assert_eq!(out.shape(), Shape::new(4, 4, 1));
        assert_eq!(out.get(0, 2, 0), 0);
        assert_eq!(out.get(2, 0, 0), 0);
        assert_eq!(out.get(3, 3, 0), 0);
        assert_eq!(out.get(1, 1, 0), 9);
    }

    #[test]
    fn remove_borders_hard_crops() {
        let frame = Frame::filled(Shape::new(4, 6, 1), 9);
        let out = remove_borders(1, true)(0, frame, None).unwrap();
        assert_eq!(out.shape(), Shape::new(2, 4, 1));
    }

    #[test]
    fn ellipse_mask_zeroes_corners_keeps_center() {
        let frame = Frame::filled(Shape::new(5, 5, 1), 9);
        let out = mask_outside_ellipse((2.0, 2.0), (2.0, 2.0), false)(0, frame, None).unwrap();
        assert_eq!(out.get(2, 2, 0), 9);
        assert_eq!(out.get(0, 0, 0), 0);
        assert_eq!(out.get(4, 4, 0), 0);
        assert_eq!(out.get(2, 0, 0), 9);
    }

    #[test]
    fn annotate_draws_at_stored_positions_only() {
        let store: LabelStore = [(1, Position::new(2.0, 2.0))].into_iter().collect();
        let draw = annotate(store, 1, vec![255]);
        let marked = draw(1, Frame::filled(Shape::new(5, 5, 1), 0), None).unwrap();
        assert_eq!(marked.get(2, 2, 0), 255);
        assert_eq!(marked.get(1, 1, 0), 255);
        assert_eq!(marked.get(2, 3, 0), 0);
        let untouched = draw(7, Frame::filled(Shape::new(5, 5, 1), 0), None).unwrap();
        assert_eq!(untouched.get(2, 2, 0), 0);
    }

    #[test]
    fn average_window_means_bytewise() {
        let entries: Vec<Entry> = vec![
            (0, Frame::filled(Shape::new(1, 2, 1), 10)),
            (1, Frame::filled(Shape::new(1, 2, 1), 20)),
            (2, Frame::filled(Shape::new(1, 2, 1), 33)),
        ];
        let out = average_window()(1, &entries, None).unwrap();
        assert_eq!(out.get(0, 0, 0), 21);
    }
}
