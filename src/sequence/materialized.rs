//! Materialized (eager) sequence: every frame held in memory.
//!
//! Operations mutate the stored entries in place. A failed in-place
//! `apply`/`rolling` leaves the sequence partially mutated; callers must
//! treat the value as undefined after such a failure.

use std::rc::Rc;

use crate::error::{CaptureError, CaptureResult};
use crate::frame::{Frame, Shape};
use crate::source::FrameSource;

use super::window::{center_position, SlidingWindow};
use super::{
    check_concat_shapes, check_shape, companion_value, concat_offsets, position_for,
    validate_companion, validate_window, Direction, Entry, FrameIter, FrameSequence, IterOptions,
    Label, PassOptions,
};

/// Ordered in-memory collection of labeled frames.
///
/// `Clone` is a deep copy: the clone owns independent frame storage and
/// mutating it never affects the original.
#[derive(Clone, Debug)]
pub struct MaterializedSequence {
    shape: Shape,
    entries: Vec<Entry>,
}

impl MaterializedSequence {
    /// Build a sequence directly from entries. Labels must be strictly
    /// increasing and every frame must match `shape`.
    pub fn from_entries(shape: Shape, entries: Vec<Entry>) -> CaptureResult<Self> {
        for pair in entries.windows(2) {
            if pair[1].0 <= pair[0].0 {
                return Err(CaptureError::AlignmentMismatch(format!(
                    "labels must be strictly increasing, got {} after {}",
                    pair[1].0, pair[0].0
                )));
            }
        }
        for (_, frame) in &entries {
            check_shape(frame, shape)?;
        }
        Ok(Self { shape, entries })
    }

    fn labels(&self) -> Vec<Label> {
        self.entries.iter().map(|(label, _)| *label).collect()
    }
}

impl FrameSequence for MaterializedSequence {
    fn load(source: Rc<dyn FrameSource>) -> CaptureResult<Self> {
        let mut reader = match source.open() {
            Ok(reader) => reader,
            Err(err) => {
                log::warn!("failed to open source '{}': {err}", source.describe());
                return Err(CaptureError::SourceUnreadable {
                    path: source.describe(),
                });
            }
        };
        let first = match reader.read() {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                return Err(CaptureError::SourceUnreadable {
                    path: source.describe(),
                })
            }
            Err(err) => {
                log::warn!("first read from '{}' failed: {err}", source.describe());
                return Err(CaptureError::SourceUnreadable {
                    path: source.describe(),
                });
            }
        };
        let shape = first.shape();
        let reported = reader.frame_count();
        let mut entries = vec![(0 as Label, first)];
        while let Some(frame) = reader.read()? {
            check_shape(&frame, shape)?;
            entries.push((entries.len() as Label, frame));
        }
        if reported != entries.len() {
            log::debug!(
                "source '{}' reported {} frames, decoded {}",
                source.describe(),
                reported,
                entries.len()
            );
        }
        log::debug!(
            "materialized {} frames of {} from '{}'",
            entries.len(),
            shape,
            source.describe()
        );
        Ok(Self { shape, entries })
    }

    fn concat(parts: Vec<Self>) -> CaptureResult<Self> {
        let shapes: Vec<Shape> = parts.iter().map(|part| part.shape).collect();
        let shape = check_concat_shapes(&shapes)?;
        let bounds: Vec<Option<(Label, Label)>> = parts
            .iter()
            .map(|part| match (part.entries.first(), part.entries.last()) {
                (Some((min, _)), Some((max, _))) => Some((*min, *max)),
                _ => None,
            })
            .collect();
        let offsets = concat_offsets(&bounds);
        let mut entries = Vec::with_capacity(parts.iter().map(|p| p.entries.len()).sum());
        for (part, offset) in parts.into_iter().zip(offsets) {
            entries.extend(
                part.entries
                    .into_iter()
                    .map(|(label, frame)| (label + offset, frame)),
            );
        }
        Ok(Self { shape, entries })
    }

    fn length(&self) -> usize {
        self.entries.len()
    }

    fn shape(&self) -> Shape {
        self.shape
    }

    fn frame(&self, label: Label) -> CaptureResult<Frame> {
        self.entries
            .iter()
            .find(|(stored, _)| *stored == label)
            .map(|(_, frame)| frame.clone())
            .ok_or(CaptureError::IndexNotFound(label))
    }

    fn frame_at(&self, position: usize) -> CaptureResult<Frame> {
        self.entries
            .get(position)
            .map(|(_, frame)| frame.clone())
            .ok_or(CaptureError::PositionOutOfRange {
                position,
                length: self.entries.len(),
            })
    }

    fn index(&self) -> CaptureResult<Vec<Label>> {
        Ok(self.labels())
    }

    fn reset_index(&mut self) {
        for (position, entry) in self.entries.iter_mut().enumerate() {
            entry.0 = position as Label;
        }
    }

    fn frames(&self, direction: Direction) -> FrameIter<'_> {
        match direction {
            Direction::Forward => Box::new(self.entries.iter().map(|entry| Ok(entry.clone()))),
            Direction::Reverse => {
                Box::new(self.entries.iter().rev().map(|entry| Ok(entry.clone())))
            }
        }
    }

    fn filter<P>(&mut self, predicate: P) -> CaptureResult<()>
    where
        P: Fn(Label, &Frame) -> bool + 'static,
    {
        self.entries
            .retain(|(label, frame)| predicate(*label, frame));
        Ok(())
    }

    fn extract<T, F>(&self, mut f: F) -> CaptureResult<Vec<T>>
    where
        F: FnMut(Label, &Frame) -> CaptureResult<T>,
    {
        self.entries
            .iter()
            .map(|(label, frame)| f(*label, frame))
            .collect()
    }

    fn for_each<V, F>(&self, options: IterOptions<V>, mut f: F) -> CaptureResult<()>
    where
        V: 'static,
        F: FnMut(Label, &Frame, Option<&V>) -> CaptureResult<()>,
    {
        self.fold(options, (), move |label, frame, value, ()| {
            f(label, frame, value)
        })
    }

    fn fold<V, A, F>(&self, options: IterOptions<V>, init: A, mut f: F) -> CaptureResult<A>
    where
        V: 'static,
        A: 'static,
        F: FnMut(Label, &Frame, Option<&V>, A) -> CaptureResult<A>,
    {
        let IterOptions {
            companion,
            direction,
        } = options;
        let length = self.entries.len();
        validate_companion(&companion, length, || Ok(self.labels()))?;
        let mut acc = init;
        for step in 0..length {
            let position = position_for(direction, length, step);
            let (label, frame) = &self.entries[position];
            let value = companion_value(&companion, position, *label);
            acc = f(*label, frame, value, acc)?;
        }
        Ok(acc)
    }

    fn apply<V, F>(&mut self, options: PassOptions<V>, mut f: F) -> CaptureResult<()>
    where
        V: 'static,
        F: FnMut(Label, Frame, Option<&V>) -> CaptureResult<Frame> + 'static,
    {
        self.apply_acc(options, (), move |label, frame, value, ()| {
            f(label, frame, value).map(|frame| (frame, ()))
        })
    }

    fn apply_acc<V, A, F>(&mut self, options: PassOptions<V>, init: A, mut f: F) -> CaptureResult<()>
    where
        V: 'static,
        A: Clone + 'static,
        F: FnMut(Label, Frame, Option<&V>, A) -> CaptureResult<(Frame, A)> + 'static,
    {
        let PassOptions {
            companion,
            direction,
            new_shape,
        } = options;
        let length = self.entries.len();
        validate_companion(&companion, length, || Ok(self.labels()))?;
        let expected = new_shape.unwrap_or(self.shape);
        let mut acc = init;
        for step in 0..length {
            let position = position_for(direction, length, step);
            let label = self.entries[position].0;
            let value = companion_value(&companion, position, label);
            let frame = std::mem::replace(&mut self.entries[position].1, Frame::placeholder());
            let (frame, next) = f(label, frame, value, acc)?;
            check_shape(&frame, expected)?;
            self.entries[position].1 = frame;
            acc = next;
        }
        if let Some(shape) = new_shape {
            self.shape = shape;
        }
        Ok(())
    }

    fn rolling<V, F>(&mut self, window: usize, options: PassOptions<V>, mut f: F) -> CaptureResult<()>
    where
        V: 'static,
        F: FnMut(Label, &[Entry], Option<&V>) -> CaptureResult<Frame> + 'static,
    {
        self.rolling_acc(window, options, (), move |label, buffer, value, ()| {
            f(label, buffer, value).map(|frame| (frame, ()))
        })
    }

    fn rolling_acc<V, A, F>(
        &mut self,
        window: usize,
        options: PassOptions<V>,
        init: A,
        mut f: F,
    ) -> CaptureResult<()>
    where
        V: 'static,
        A: Clone + 'static,
        F: FnMut(Label, &[Entry], Option<&V>, A) -> CaptureResult<(Frame, A)> + 'static,
    {
        let PassOptions {
            companion,
            direction,
            new_shape,
        } = options;
        let length = self.entries.len();
        let half = validate_window(window, length)?;
        validate_companion(&companion, length, || Ok(self.labels()))?;
        let expected = new_shape.unwrap_or(self.shape);
        let mut sw = SlidingWindow::new(window, direction);
        let mut out: Vec<Entry> = Vec::with_capacity(length - (window - 1));
        let mut emitted = 0usize;
        let mut acc = init;
        for step in 0..length {
            let position = position_for(direction, length, step);
            sw.push(self.entries[position].clone());
            if !sw.is_warm() {
                continue;
            }
            let (center, buffer) = sw.view();
            let center_pos = center_position(direction, length, half, emitted);
            let value = companion_value(&companion, center_pos, center);
            let (frame, next) = f(center, buffer, value, acc)?;
            check_shape(&frame, expected)?;
            out.push((center, frame));
            acc = next;
            emitted += 1;
            sw.trim();
        }
        if direction.is_reverse() {
            out.reverse();
        }
        self.entries = out;
        if let Some(shape) = new_shape {
            self.shape = shape;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::SyntheticSource;

    fn sequence(labels: &[Label], value: u8) -> MaterializedSequence {
        let shape = Shape::new(2, 2, 1);
        let entries = labels
            .iter()
            .map(|&label| (label, Frame::filled(shape, value)))
            .collect();
        MaterializedSequence::from_entries(shape, entries).unwrap()
    }

    #[test]
    fn from_entries_rejects_unsorted_labels() {
        let shape = Shape::new(1, 1, 1);
        let entries = vec![
            (3, Frame::filled(shape, 0)),
            (3, Frame::filled(shape, 0)),
        ];
        assert!(MaterializedSequence::from_entries(shape, entries).is_err());
    }

    #[test]
    fn load_reads_every_frame() {
        let source = Rc::new(SyntheticSource::new(5, Shape::new(4, 4, 1)));
        let seq = MaterializedSequence::load(source).unwrap();
        assert_eq!(seq.length(), 5);
        assert_eq!(seq.index().unwrap(), vec![0, 1, 2, 3, 4]);
        assert_eq!(seq.shape(), Shape::new(4, 4, 1));
    }

    #[test]
    fn frame_lookup_by_label_and_position() {
        let seq = sequence(&[10, 20, 30], 7);
        assert!(seq.frame(20).is_ok());
        assert!(matches!(
            seq.frame(15),
            Err(CaptureError::IndexNotFound(15))
        ));
        assert!(seq.frame_at(2).is_ok());
        assert!(matches!(
            seq.frame_at(3),
            Err(CaptureError::PositionOutOfRange { .. })
        ));
    }

    #[test]
    fn reset_index_densifies_labels() {
        let mut seq = sequence(&[5, 9, 40], 0);
        seq.reset_index();
        assert_eq!(seq.index().unwrap(), vec![0, 1, 2]);
    }

    #[test]
    fn clone_is_independent() {
        let seq = sequence(&[0, 1], 1);
        let mut copy = seq.clone();
        copy.apply(PassOptions::new(), |_, mut frame, _| {
            frame.as_bytes_mut().fill(9);
            Ok(frame)
        })
        .unwrap();
        assert_eq!(seq.frame(0).unwrap().as_bytes(), &[1, 1, 1, 1]);
        assert_eq!(copy.frame(0).unwrap().as_bytes(), &[9, 9, 9, 9]);
    }

    #[test]
    fn concat_relabels_subsequent_parts() {
        let a = sequence(&[0, 1, 2], 1);
        let b = sequence(&[0, 1], 2);
        let joined = MaterializedSequence::concat(vec![a, b]).unwrap();
        assert_eq!(joined.length(), 5);
        assert_eq!(joined.index().unwrap(), vec![0, 1, 2, 3, 4]);
        assert_eq!(joined.frame(4).unwrap().as_bytes(), &[2, 2, 2, 2]);
    }

    #[test]
    fn concat_rejects_shape_disagreement() {
        let a = sequence(&[0], 0);
        let shape = Shape::new(3, 3, 1);
        let b = MaterializedSequence::from_entries(shape, vec![(0, Frame::filled(shape, 0))])
            .unwrap();
        assert!(matches!(
            MaterializedSequence::concat(vec![a, b]),
            Err(CaptureError::ShapeMismatch { .. })
        ));
        assert!(matches!(
            MaterializedSequence::concat(Vec::new()),
            Err(CaptureError::EmptyConcat)
        ));
    }

    #[test]
    fn failed_apply_may_leave_partial_state() {
        let mut seq = sequence(&[0, 1, 2], 1);
        let result = seq.apply(PassOptions::new(), |label, mut frame, _| {
            if label == 2 {
                return Err(CaptureError::Codec("boom".into()));
            }
            frame.as_bytes_mut().fill(8);
            Ok(frame)
        });
        assert!(result.is_err());
        // Entries before the failure were already replaced.
        assert_eq!(seq.frame(0).unwrap().as_bytes(), &[8, 8, 8, 8]);
    }
}
