//! Geometric augmentation: mirrors and quarter-turn rotations for frames,
//! with the matching position transforms for label stores.
//!
//! Rotations are counterclockwise and swap height and width for the
//! quarter turns; pipelines rotating a sequence pass the swapped shape as
//! `new_shape`. Position transforms take the pre-transform frame size as
//! `(width, height)`.

use crate::error::CaptureResult;
use crate::frame::{Frame, Shape};
use crate::labels::Position;
use crate::sequence::Label;

/// Flip along the column axis.
pub fn mirror_horizontal(_: Label, frame: Frame, _: Option<&()>) -> CaptureResult<Frame> {
    let shape = frame.shape();
    let mut out = Frame::filled(shape, 0);
    for row in 0..shape.height {
        for col in 0..shape.width {
            for channel in 0..shape.channels {
                let value = frame.get(row, shape.width - 1 - col, channel);
                out.set(row, col, channel, value);
            }
        }
    }
    Ok(out)
}

/// Flip along the row axis.
pub fn mirror_vertical(_: Label, frame: Frame, _: Option<&()>) -> CaptureResult<Frame> {
    let shape = frame.shape();
    let mut out = Frame::filled(shape, 0);
    for row in 0..shape.height {
        let source = frame.row(shape.height - 1 - row);
        let stride = shape.width * shape.channels;
        out.as_bytes_mut()[row * stride..(row + 1) * stride].copy_from_slice(source);
    }
    Ok(out)
}

/// Quarter turn counterclockwise; output shape (W, H, C).
pub fn rotate90(_: Label, frame: Frame, _: Option<&()>) -> CaptureResult<Frame> {
    let shape = frame.shape();
    let out_shape = Shape::new(shape.width, shape.height, shape.channels);
    let mut out = Frame::filled(out_shape, 0);
    for row in 0..out_shape.height {
        for col in 0..out_shape.width {
            for channel in 0..shape.channels {
                let value = frame.get(col, shape.width - 1 - row, channel);
                out.set(row, col, channel, value);
            }
        }
    }
    Ok(out)
}

/// Half turn; shape preserved.
pub fn rotate180(label: Label, frame: Frame, companion: Option<&()>) -> CaptureResult<Frame> {
    let flipped = mirror_horizontal(label, frame, companion)?;
    mirror_vertical(label, flipped, companion)
}

/// Quarter turn clockwise; output shape (W, H, C).
pub fn rotate270(_: Label, frame: Frame, _: Option<&()>) -> CaptureResult<Frame> {
    let shape = frame.shape();
    let out_shape = Shape::new(shape.width, shape.height, shape.channels);
    let mut out = Frame::filled(out_shape, 0);
    for row in 0..out_shape.height {
        for col in 0..out_shape.width {
            for channel in 0..shape.channels {
                let value = frame.get(shape.height - 1 - col, row, channel);
                out.set(row, col, channel, value);
            }
        }
    }
    Ok(out)
}

// ----- position counterparts -----

pub fn mirror_horizontal_position(position: Position, size: (f32, f32)) -> Position {
    Position::new(size.0 - position.x, position.y)
}

pub fn mirror_vertical_position(position: Position, size: (f32, f32)) -> Position {
    Position::new(position.x, size.1 - position.y)
}

fn rotate_position(position: Position, size: (f32, f32), turns: u32) -> Position {
    let (half_w, half_h) = (size.0 / 2.0, size.1 / 2.0);
    let mut vec = (position.x - half_w, position.y - half_h);
    for _ in 0..turns {
        vec = (-vec.1, vec.0);
    }
    Position::new(vec.0 + half_w, vec.1 + half_h)
}

pub fn rotate90_position(position: Position, size: (f32, f32)) -> Position {
    rotate_position(position, size, 1)
}

pub fn rotate180_position(position: Position, size: (f32, f32)) -> Position {
    rotate_position(position, size, 2)
}

pub fn rotate270_position(position: Position, size: (f32, f32)) -> Position {
    rotate_position(position, size, 3)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn marked(shape: Shape, row: usize, col: usize) -> Frame {
        let mut frame = Frame::filled(shape, 0);
        frame.set(row, col, 0, 9);
        frame
    }

    #[test]
    fn mirrors_move_the_marker() {
        let frame = marked(Shape::new(3, 4, 1), 0, 1);
        let h = mirror_horizontal(0, frame.clone(), None).unwrap();
        assert_eq!(h.get(0, 2, 0), 9);
        let v = mirror_vertical(0, frame, None).unwrap();
        assert_eq!(v.get(2, 1, 0), 9);
    }

    #[test]
    fn quarter_turns_swap_dimensions_and_compose() {
        let frame = marked(Shape::new(2, 3, 1), 0, 2);
        let once = rotate90(0, frame.clone(), None).unwrap();
        assert_eq!(once.shape(), Shape::new(3, 2, 1));
        // column 2 of the top row lands at the top of the left column
        assert_eq!(once.get(0, 0, 0), 9);

        let back = rotate270(0, once, None).unwrap();
        assert_eq!(back, frame);

        let half = rotate180(0, frame.clone(), None).unwrap();
        let double = rotate90(0, rotate90(0, frame, None).unwrap(), None).unwrap();
        assert_eq!(half, double);
    }

    #[test]
    fn position_transforms_match_the_frame_motion() {
        let size = (4.0, 4.0);
        let p = Position::new(1.0, 0.0);
        assert_eq!(mirror_horizontal_position(p, size), Position::new(3.0, 0.0));
        assert_eq!(mirror_vertical_position(p, size), Position::new(1.0, 4.0));
        let r = rotate180_position(Position::new(1.0, 1.0), size);
        assert_eq!(r, Position::new(3.0, 3.0));
    }
}
