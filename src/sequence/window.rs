//! Sliding-window buffer shared by both sequence variants.
//!
//! The buffer always holds entries in ascending storage order, whichever
//! direction they arrive in, and advances exactly one entry per emission.
//! Forward traversal appends at the back and trims the front; reverse
//! traversal inserts at the front and trims the back.
//!
//! Call sequence per fed entry: `push`, then if `is_warm` use `view` and
//! finish with `trim`.

use super::{Direction, Entry, Label};

pub(crate) struct SlidingWindow {
    window: usize,
    direction: Direction,
    buffer: Vec<Entry>,
}

impl SlidingWindow {
    pub(crate) fn new(window: usize, direction: Direction) -> Self {
        Self {
            window,
            direction,
            buffer: Vec::with_capacity(window),
        }
    }

    /// Feed the next entry in traversal order.
    pub(crate) fn push(&mut self, entry: Entry) {
        match self.direction {
            Direction::Forward => self.buffer.push(entry),
            Direction::Reverse => self.buffer.insert(0, entry),
        }
    }

    /// True once the buffer holds a full window.
    pub(crate) fn is_warm(&self) -> bool {
        self.buffer.len() == self.window
    }

    /// Center label and the full buffer. Only meaningful when warm.
    pub(crate) fn view(&self) -> (Label, &[Entry]) {
        (self.buffer[self.window / 2].0, &self.buffer)
    }

    /// Drop the trailing edge so the window advances one entry.
    pub(crate) fn trim(&mut self) {
        match self.direction {
            Direction::Forward => {
                self.buffer.remove(0);
            }
            Direction::Reverse => {
                self.buffer.pop();
            }
        }
    }
}

/// Storage position of the center produced by the `emitted`-th emission of a
/// window pass over `length` entries.
pub(crate) fn center_position(
    direction: Direction,
    length: usize,
    half: usize,
    emitted: usize,
) -> usize {
    match direction {
        Direction::Forward => half + emitted,
        Direction::Reverse => length.saturating_sub(1 + half + emitted),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::frame::{Frame, Shape};

    fn entry(label: Label) -> Entry {
        (label, Frame::filled(Shape::new(1, 1, 1), label as u8))
    }

    fn run(direction: Direction, labels: &[Label], window: usize) -> Vec<(Label, Vec<Label>)> {
        let mut sw = SlidingWindow::new(window, direction);
        let mut out = Vec::new();
        for &label in labels {
            sw.push(entry(label));
            if !sw.is_warm() {
                continue;
            }
            let (center, buffer) = sw.view();
            out.push((center, buffer.iter().map(|(l, _)| *l).collect::<Vec<_>>()));
            sw.trim();
        }
        out
    }

    #[test]
    fn forward_windows_are_ascending_and_centered() {
        let out = run(Direction::Forward, &[0, 1, 2, 3, 4], 3);
        assert_eq!(
            out,
            vec![(1, vec![0, 1, 2]), (2, vec![1, 2, 3]), (3, vec![2, 3, 4])]
        );
    }

    #[test]
    fn reverse_windows_stay_in_storage_order() {
        let out = run(Direction::Reverse, &[4, 3, 2, 1, 0], 3);
        assert_eq!(
            out,
            vec![(3, vec![2, 3, 4]), (2, vec![1, 2, 3]), (1, vec![0, 1, 2])]
        );
    }

    #[test]
    fn window_equal_to_length_emits_once() {
        let out = run(Direction::Forward, &[0, 1, 2], 3);
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].0, 1);
    }

    #[test]
    fn center_positions_mirror_between_directions() {
        assert_eq!(center_position(Direction::Forward, 10, 1, 0), 1);
        assert_eq!(center_position(Direction::Forward, 10, 1, 7), 8);
        assert_eq!(center_position(Direction::Reverse, 10, 1, 0), 8);
        assert_eq!(center_position(Direction::Reverse, 10, 1, 7), 1);
    }
}
