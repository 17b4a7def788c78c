//! Ordered sequences of labeled frames.
//!
//! Two interchangeable variants implement the same [`FrameSequence`]
//! contract:
//!
//! - [`MaterializedSequence`]: every frame held in memory, operations mutate
//!   storage in place.
//! - [`StreamedSequence`]: frames recomputed from a source on every
//!   traversal; operations wrap the producer with another pipeline stage.
//!
//! Consumers chain filter/apply/rolling stages without knowing which variant
//! they hold. Fully traversed in the same direction, both variants yield
//! identical (label, frame) pairs for the same source and operation chain.

use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use crate::error::{CaptureError, CaptureResult};
use crate::frame::{Frame, Shape};
use crate::sink::FrameSink;
use crate::source::FrameSource;

pub mod materialized;
pub mod streamed;
pub(crate) mod window;

pub use materialized::MaterializedSequence;
pub use streamed::StreamedSequence;

/// Label attached to a frame's original position. Not required to be
/// contiguous or 0-based, only strictly monotonic in traversal order.
pub type Label = i64;

/// One sequence entry.
pub type Entry = (Label, Frame);

/// Fallible pull-based iterator of sequence entries.
pub type FrameIter<'a> = Box<dyn Iterator<Item = CaptureResult<Entry>> + 'a>;

/// Traversal direction, threaded through every operation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Reverse,
}

impl Direction {
    pub fn is_reverse(self) -> bool {
        matches!(self, Direction::Reverse)
    }
}

/// Storage position of the `step`-th entry visited when traversing a
/// sequence of `length` entries in `direction`.
pub(crate) fn position_for(direction: Direction, length: usize, step: usize) -> usize {
    match direction {
        Direction::Forward => step,
        Direction::Reverse => length.saturating_sub(1 + step),
    }
}

// -------------------- Companions --------------------

/// Auxiliary per-entry values handed to a transform alongside each frame.
///
/// Either an ordered run aligned by storage position, or a mapping keyed by
/// label (which may omit labels; the transform then sees `None`).
#[derive(Clone, Debug)]
pub enum Companion<V> {
    Positional(Vec<V>),
    ByLabel(HashMap<Label, V>),
}

/// Check companion alignment once, up front. `labels` is only invoked for
/// by-label companions, so positional validation stays cheap on streamed
/// sequences.
pub(crate) fn validate_companion<V>(
    companion: &Option<Companion<V>>,
    length: usize,
    labels: impl FnOnce() -> CaptureResult<Vec<Label>>,
) -> CaptureResult<()> {
    match companion {
        None => Ok(()),
        Some(Companion::Positional(values)) => {
            if values.len() != length {
                return Err(CaptureError::AlignmentMismatch(format!(
                    "positional companion has {} entries for sequence length {}",
                    values.len(),
                    length
                )));
            }
            Ok(())
        }
        Some(Companion::ByLabel(map)) => {
            let known: HashSet<Label> = labels()?.into_iter().collect();
            for key in map.keys() {
                if !known.contains(key) {
                    return Err(CaptureError::AlignmentMismatch(format!(
                        "companion label {key} not present in sequence"
                    )));
                }
            }
            Ok(())
        }
    }
}

/// Companion value for the entry at `position` with label `label`.
pub(crate) fn companion_value<V>(
    companion: &Option<Companion<V>>,
    position: usize,
    label: Label,
) -> Option<&V> {
    match companion {
        None => None,
        Some(Companion::Positional(values)) => values.get(position),
        Some(Companion::ByLabel(map)) => map.get(&label),
    }
}

// -------------------- Option bundles --------------------

/// Options for the read-only traversals (`for_each`, `fold`).
#[derive(Clone, Debug)]
pub struct IterOptions<V> {
    pub companion: Option<Companion<V>>,
    pub direction: Direction,
}

impl IterOptions<()> {
    pub fn new() -> Self {
        Self {
            companion: None,
            direction: Direction::Forward,
        }
    }
}

impl Default for IterOptions<()> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> IterOptions<V> {
    pub fn direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    pub fn reverse(self) -> Self {
        self.direction(Direction::Reverse)
    }

    /// Attach a companion, fixing its value type.
    pub fn companion<W>(self, companion: Companion<W>) -> IterOptions<W> {
        IterOptions {
            companion: Some(companion),
            direction: self.direction,
        }
    }
}

/// Options for the frame-replacing passes (`apply`, `rolling`).
#[derive(Clone, Debug)]
pub struct PassOptions<V> {
    pub companion: Option<Companion<V>>,
    pub direction: Direction,
    /// Declared shape of the replacement frames. When set, the sequence's
    /// width/height/channel-count are updated once, after the full pass.
    pub new_shape: Option<Shape>,
}

impl PassOptions<()> {
    pub fn new() -> Self {
        Self {
            companion: None,
            direction: Direction::Forward,
            new_shape: None,
        }
    }
}

impl Default for PassOptions<()> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> PassOptions<V> {
    pub fn direction(mut self, direction: Direction) -> Self {
        self.direction = direction;
        self
    }

    pub fn reverse(self) -> Self {
        self.direction(Direction::Reverse)
    }

    pub fn new_shape(mut self, shape: Shape) -> Self {
        self.new_shape = Some(shape);
        self
    }

    /// Attach a companion, fixing its value type.
    pub fn companion<W>(self, companion: Companion<W>) -> PassOptions<W> {
        PassOptions {
            companion: Some(companion),
            direction: self.direction,
            new_shape: self.new_shape,
        }
    }
}

pub(crate) fn check_shape(frame: &Frame, expected: Shape) -> CaptureResult<()> {
    if frame.shape() != expected {
        return Err(CaptureError::ShapeMismatch {
            expected,
            actual: frame.shape(),
        });
    }
    Ok(())
}

// -------------------- The sequence contract --------------------

/// Shared contract of the materialized and streamed variants.
///
/// Accumulator-carrying flavors are separate methods (`apply_acc`,
/// `rolling_acc`, `fold`) rather than optional arguments; the accumulator is
/// threaded by value through successive transform calls in traversal order.
///
/// Closure bounds carry `'static` because the streamed variant stores
/// transforms inside its producer for later traversals.
pub trait FrameSequence: Clone + Sized {
    /// Build a sequence from an external source. Fails with
    /// [`CaptureError::SourceUnreadable`] when the first read yields nothing.
    fn load(source: Rc<dyn FrameSource>) -> CaptureResult<Self>;

    /// Join sequences end to end. All parts must share one shape; each
    /// subsequent part is relabeled to continue strictly after the maximum
    /// label of its predecessor.
    fn concat(parts: Vec<Self>) -> CaptureResult<Self>;

    /// Number of entries.
    fn length(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.length() == 0
    }

    /// Shape shared by every frame in the sequence.
    fn shape(&self) -> Shape;

    /// Frame whose stored label equals `label`.
    fn frame(&self, label: Label) -> CaptureResult<Frame>;

    /// Frame at the 0-based storage position.
    fn frame_at(&self, position: usize) -> CaptureResult<Frame>;

    /// Ordered labels.
    fn index(&self) -> CaptureResult<Vec<Label>>;

    /// Replace labels with a dense 0..length-1 run, preserving frame order.
    fn reset_index(&mut self);

    /// Restartable traversal in the given direction. Each call yields a
    /// fresh exhaustible iterator; abandoning one early never disturbs
    /// later traversals.
    fn frames(&self, direction: Direction) -> FrameIter<'_>;

    /// Retain entries satisfying the predicate; the length is updated to
    /// the retained count, order is preserved.
    fn filter<P>(&mut self, predicate: P) -> CaptureResult<()>
    where
        P: Fn(Label, &Frame) -> bool + 'static;

    /// Map every entry to a value without mutating the sequence.
    fn extract<T, F>(&self, f: F) -> CaptureResult<Vec<T>>
    where
        F: FnMut(Label, &Frame) -> CaptureResult<T>;

    /// Visit entries in the requested direction.
    fn for_each<V, F>(&self, options: IterOptions<V>, f: F) -> CaptureResult<()>
    where
        V: 'static,
        F: FnMut(Label, &Frame, Option<&V>) -> CaptureResult<()>;

    /// Visit entries threading an accumulator; returns the final value.
    fn fold<V, A, F>(&self, options: IterOptions<V>, init: A, f: F) -> CaptureResult<A>
    where
        V: 'static,
        A: 'static,
        F: FnMut(Label, &Frame, Option<&V>, A) -> CaptureResult<A>;

    /// Replace every frame with the transform's output. Each returned frame
    /// must match `new_shape` when given, else the current shape.
    fn apply<V, F>(&mut self, options: PassOptions<V>, f: F) -> CaptureResult<()>
    where
        V: 'static,
        F: FnMut(Label, Frame, Option<&V>) -> CaptureResult<Frame> + 'static;

    /// Like [`FrameSequence::apply`] with an accumulator threaded between
    /// calls in the pass direction.
    fn apply_acc<V, A, F>(&mut self, options: PassOptions<V>, init: A, f: F) -> CaptureResult<()>
    where
        V: 'static,
        A: Clone + 'static,
        F: FnMut(Label, Frame, Option<&V>, A) -> CaptureResult<(Frame, A)> + 'static;

    /// Windowed fold: the transform sees the center label and a buffer of
    /// `window` consecutive entries in ascending storage order. The
    /// symmetric `window / 2` boundary entries are dropped; the resulting
    /// length is the original minus (window - 1). `window` must be a
    /// positive odd integer not exceeding the length.
    fn rolling<V, F>(&mut self, window: usize, options: PassOptions<V>, f: F) -> CaptureResult<()>
    where
        V: 'static,
        F: FnMut(Label, &[Entry], Option<&V>) -> CaptureResult<Frame> + 'static;

    /// Like [`FrameSequence::rolling`] with an accumulator.
    fn rolling_acc<V, A, F>(
        &mut self,
        window: usize,
        options: PassOptions<V>,
        init: A,
        f: F,
    ) -> CaptureResult<()>
    where
        V: 'static,
        A: Clone + 'static,
        F: FnMut(Label, &[Entry], Option<&V>, A) -> CaptureResult<(Frame, A)> + 'static;

    /// Write every frame forward into the sink. Requires three channels;
    /// writing a zero-length sequence is a no-op.
    fn write_to(&self, sink: &mut dyn FrameSink) -> CaptureResult<()> {
        if self.length() == 0 {
            return Ok(());
        }
        let shape = self.shape();
        if shape.channels != 3 {
            return Err(CaptureError::ShapeMismatch {
                expected: Shape::new(shape.height, shape.width, 3),
                actual: shape,
            });
        }
        for item in self.frames(Direction::Forward) {
            let (_, frame) = item?;
            sink.write_frame(&frame)?;
        }
        sink.finish()
    }
}

// -------------------- Concat relabeling --------------------

/// Label offsets for `concat`: per part, `(min, max)` labels or `None` when
/// empty. The first non-empty part keeps its labels; every later part is
/// shifted so its smallest label lands one past the running maximum.
pub(crate) fn concat_offsets(bounds: &[Option<(Label, Label)>]) -> Vec<Label> {
    let mut offsets = Vec::with_capacity(bounds.len());
    let mut running_max: Option<Label> = None;
    for part in bounds {
        match part {
            None => offsets.push(0),
            Some((min, max)) => {
                let offset = match running_max {
                    None => 0,
                    Some(top) => top + 1 - min,
                };
                offsets.push(offset);
                running_max = Some(max + offset);
            }
        }
    }
    offsets
}

/// Shape agreement check for `concat`.
pub(crate) fn check_concat_shapes(shapes: &[Shape]) -> CaptureResult<Shape> {
    let Some(first) = shapes.first().copied() else {
        return Err(CaptureError::EmptyConcat);
    };
    for shape in &shapes[1..] {
        if *shape != first {
            return Err(CaptureError::ShapeMismatch {
                expected: first,
                actual: *shape,
            });
        }
    }
    Ok(first)
}

/// Window legality check; returns the half-window.
pub(crate) fn validate_window(window: usize, length: usize) -> CaptureResult<usize> {
    if window == 0 || window % 2 == 0 || window > length {
        return Err(CaptureError::InvalidWindow { window, length });
    }
    Ok(window / 2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positions_follow_direction() {
        assert_eq!(position_for(Direction::Forward, 5, 0), 0);
        assert_eq!(position_for(Direction::Forward, 5, 4), 4);
        assert_eq!(position_for(Direction::Reverse, 5, 0), 4);
        assert_eq!(position_for(Direction::Reverse, 5, 4), 0);
    }

    #[test]
    fn positional_companion_must_match_length() {
        let companion = Some(Companion::Positional(vec![1u32, 2, 3]));
        assert!(validate_companion(&companion, 3, || Ok(vec![])).is_ok());
        let err = validate_companion(&companion, 4, || Ok(vec![])).unwrap_err();
        assert!(matches!(err, CaptureError::AlignmentMismatch(_)));
    }

    #[test]
    fn by_label_companion_must_be_subset() {
        let mut map = HashMap::new();
        map.insert(2i64, "two");
        map.insert(9i64, "nine");
        let companion = Some(Companion::ByLabel(map));
        assert!(validate_companion(&companion, 3, || Ok(vec![1, 2, 9])).is_ok());
        assert!(validate_companion(&companion, 3, || Ok(vec![1, 2, 3])).is_err());
    }

    #[test]
    fn concat_offsets_continue_after_running_max() {
        // [0,1,2] then [0,1]: second part starts at 3.
        let offsets = concat_offsets(&[Some((0, 2)), Some((0, 1))]);
        assert_eq!(offsets, vec![0, 3]);

        // Gapped labels are preserved relative to the part start.
        let offsets = concat_offsets(&[Some((5, 9)), Some((5, 9))]);
        assert_eq!(offsets, vec![0, 5]);

        // Empty parts do not advance the running maximum.
        let offsets = concat_offsets(&[Some((0, 4)), None, Some((0, 0))]);
        assert_eq!(offsets, vec![0, 0, 5]);
    }

    #[test]
    fn window_validation() {
        assert!(validate_window(3, 10).is_ok());
        assert_eq!(validate_window(5, 5).unwrap(), 2);
        assert!(validate_window(0, 10).is_err());
        assert!(validate_window(4, 10).is_err());
        assert!(validate_window(11, 10).is_err());
    }
}
