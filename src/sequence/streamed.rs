//! Streamed (lazy) sequence: frames recomputed from the source on every
//! traversal.
//!
//! The sequence owns a resettable producer, a pure function from direction
//! to a single-use exhaustible iterator, plus cached length/shape metadata.
//! Pipeline stages (`filter`, `apply`, `rolling`, `reset_index`) wrap the
//! previous producer in a new closure; no frame is cached across traversals.
//!
//! Accumulator-carrying stages remember the direction they were installed
//! with (the production direction). When a later traversal pulls in the
//! opposite direction, the stage replays: one enumeration in production
//! order records the accumulator value fed to the transform at each
//! position, then a second enumeration in the requested order re-applies
//! the transform with the recorded value for that position. Transforms are
//! assumed pure, so the double evaluation is observable only in cost.

use std::cell::RefCell;
use std::fmt;
use std::iter;
use std::rc::Rc;

use crate::error::{CaptureError, CaptureResult};
use crate::frame::{Frame, Shape};
use crate::source::FrameSource;

use super::window::{center_position, SlidingWindow};
use super::{
    check_concat_shapes, companion_value, concat_offsets, position_for, validate_companion,
    validate_window, Direction, Entry, FrameIter, FrameSequence, IterOptions, Label, PassOptions,
};

type Producer = Rc<dyn Fn(Direction) -> FrameIter<'static>>;

/// Lazily recomputed sequence of labeled frames.
///
/// `Clone` shares the producer (closures are immutable pipeline
/// descriptions); no frame storage is ever shared because there is none.
#[derive(Clone)]
pub struct StreamedSequence {
    length: usize,
    shape: Shape,
    producer: Producer,
}

impl fmt::Debug for StreamedSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamedSequence")
            .field("length", &self.length)
            .field("shape", &self.shape)
            .finish_non_exhaustive()
    }
}

fn error_iter(err: CaptureError) -> FrameIter<'static> {
    Box::new(iter::once(Err(err)))
}

fn shape_error(expected: Shape, frame: &Frame) -> CaptureError {
    CaptureError::ShapeMismatch {
        expected,
        actual: frame.shape(),
    }
}

// -------------------- Source traversal --------------------

/// One traversal session against the external source. Owns the reader;
/// dropping the iterator (even before exhaustion) releases the session.
struct SourceTraversal {
    reader: Box<dyn crate::source::SourceReader>,
    direction: Direction,
    next_label: Label,
    next_position: Option<usize>,
    done: bool,
}

impl SourceTraversal {
    fn start(source: &Rc<dyn FrameSource>, direction: Direction) -> CaptureResult<Self> {
        let reader = source.open()?;
        let next_position = match direction {
            Direction::Forward => None,
            Direction::Reverse => reader.frame_count().checked_sub(1),
        };
        Ok(Self {
            reader,
            direction,
            next_label: 0,
            next_position,
            done: false,
        })
    }
}

impl Iterator for SourceTraversal {
    type Item = CaptureResult<Entry>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        match self.direction {
            Direction::Forward => match self.reader.read() {
                Ok(Some(frame)) => {
                    let label = self.next_label;
                    self.next_label += 1;
                    Some(Ok((label, frame)))
                }
                Ok(None) => {
                    self.done = true;
                    None
                }
                Err(err) => {
                    self.done = true;
                    Some(Err(err))
                }
            },
            Direction::Reverse => {
                let Some(position) = self.next_position else {
                    self.done = true;
                    return None;
                };
                if let Err(err) = self.reader.seek(position) {
                    self.done = true;
                    return Some(Err(err));
                }
                match self.reader.read() {
                    Ok(Some(frame)) => {
                        self.next_position = position.checked_sub(1);
                        Some(Ok((position as Label, frame)))
                    }
                    Ok(None) => {
                        self.done = true;
                        None
                    }
                    Err(err) => {
                        self.done = true;
                        Some(Err(err))
                    }
                }
            }
        }
    }
}

// -------------------- The sequence --------------------

impl FrameSequence for StreamedSequence {
    fn load(source: Rc<dyn FrameSource>) -> CaptureResult<Self> {
        // Feasibility probe: one read fixes the metadata, then the session
        // is released and every traversal re-opens its own.
        let (shape, length) = {
            let mut reader = match source.open() {
                Ok(reader) => reader,
                Err(err) => {
                    log::warn!("failed to open source '{}': {err}", source.describe());
                    return Err(CaptureError::SourceUnreadable {
                        path: source.describe(),
                    });
                }
            };
            match reader.read() {
                Ok(Some(frame)) => (frame.shape(), reader.frame_count()),
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
            }
        };
        log::debug!(
            "streaming {length} frames of {shape} from '{}'",
            source.describe()
        );
        // Every decoded frame must match the probed shape; a drifting
        // source fails mid-traversal rather than leaking mixed shapes.
        let producer: Producer = Rc::new(move |direction| {
            let mut inner = match SourceTraversal::start(&source, direction) {
                Ok(traversal) => traversal,
                Err(err) => return error_iter(err),
            };
            let mut failed = false;
            Box::new(iter::from_fn(move || {
                if failed {
                    return None;
                }
                match inner.next()? {
                    Ok((label, frame)) => {
                        if frame.shape() != shape {
                            failed = true;
                            return Some(Err(shape_error(shape, &frame)));
                        }
                        Some(Ok((label, frame)))
                    }
                    Err(err) => {
                        failed = true;
                        Some(Err(err))
                    }
                }
            }))
        });
        Ok(Self {
            length,
            shape,
            producer,
        })
    }

    fn concat(parts: Vec<Self>) -> CaptureResult<Self> {
        let shapes: Vec<Shape> = parts.iter().map(|part| part.shape).collect();
        let shape = check_concat_shapes(&shapes)?;
        // Label bounds require one forward enumeration per part, paid once
        // at concat time so traversals need no pre-scan.
        let mut bounds = Vec::with_capacity(parts.len());
        for part in &parts {
            let labels = part.index()?;
            bounds.push(match (labels.first(), labels.last()) {
                (Some(min), Some(max)) => Some((*min, *max)),
                _ => None,
            });
        }
        let offsets = concat_offsets(&bounds);
        let length = parts.iter().map(|part| part.length).sum();
        let stages: Rc<Vec<(Producer, Label)>> = Rc::new(
            parts
                .iter()
                .map(|part| Rc::clone(&part.producer))
                .zip(offsets)
                .collect(),
        );
        let producer: Producer = Rc::new(move |direction| {
            let stages = Rc::clone(&stages);
            let order: Vec<usize> = match direction {
                Direction::Forward => (0..stages.len()).collect(),
                Direction::Reverse => (0..stages.len()).rev().collect(),
            };
            let mut at = 0usize;
            let mut current: Option<FrameIter<'static>> = None;
            let mut failed = false;
            Box::new(iter::from_fn(move || {
                if failed {
                    return None;
                }
                loop {
                    if current.is_none() {
                        let slot = *order.get(at)?;
                        current = Some((stages[slot].0)(direction));
                    }
                    let slot = order[at];
                    match current.as_mut().and_then(|it| it.next()) {
                        Some(Ok((label, frame))) => {
                            return Some(Ok((label + stages[slot].1, frame)))
                        }
                        Some(Err(err)) => {
                            failed = true;
                            return Some(Err(err));
                        }
                        None => {
                            current = None;
                            at += 1;
                        }
                    }
                }
            }))
        });
        Ok(Self {
            length,
            shape,
            producer,
        })
    }

    fn length(&self) -> usize {
        self.length
    }

    fn shape(&self) -> Shape {
        self.shape
    }

    fn frame(&self, label: Label) -> CaptureResult<Frame> {
        for item in self.frames(Direction::Forward) {
            let (stored, frame) = item?;
            if stored == label {
                return Ok(frame);
            }
        }
        Err(CaptureError::IndexNotFound(label))
    }

    fn frame_at(&self, position: usize) -> CaptureResult<Frame> {
        let miss = |length| CaptureError::PositionOutOfRange { position, length };
        if position >= self.length {
            return Err(miss(self.length));
        }
        let mut traversal = self.frames(Direction::Forward);
        for _ in 0..position {
            match traversal.next() {
                Some(Ok(_)) => {}
                Some(Err(err)) => return Err(err),
                None => return Err(miss(self.length)),
            }
        }
        match traversal.next() {
            Some(Ok((_, frame))) => Ok(frame),
            Some(Err(err)) => Err(err),
            None => Err(miss(self.length)),
        }
    }

    fn index(&self) -> CaptureResult<Vec<Label>> {
        let mut labels = Vec::with_capacity(self.length);
        for item in self.frames(Direction::Forward) {
            labels.push(item?.0);
        }
        Ok(labels)
    }

    fn reset_index(&mut self) {
        let prev = Rc::clone(&self.producer);
        let length = self.length;
        self.producer = Rc::new(move |direction| {
            let mut step = 0usize;
            Box::new(prev(direction).map(move |item| {
                item.map(|(_, frame)| {
                    let label = position_for(direction, length, step) as Label;
                    step += 1;
                    (label, frame)
                })
            }))
        });
    }

    fn frames(&self, direction: Direction) -> FrameIter<'_> {
        (self.producer)(direction)
    }

    fn filter<P>(&mut self, predicate: P) -> CaptureResult<()>
    where
        P: Fn(Label, &Frame) -> bool + 'static,
    {
        let predicate = Rc::new(predicate);
        // The new length is unknown without enumeration: drain one forward
        // pass. The predicate is assumed pure, so this extra evaluation has
        // no observable side effects.
        let mut kept = 0usize;
        for item in (self.producer)(Direction::Forward) {
            let (label, frame) = item?;
            if predicate(label, &frame) {
                kept += 1;
            }
        }
        log::debug!("filter kept {kept} of {} entries", self.length);
        let prev = Rc::clone(&self.producer);
        let shared = Rc::clone(&predicate);
        self.producer = Rc::new(move |direction| {
            let predicate = Rc::clone(&shared);
            Box::new(prev(direction).filter(move |item| match item {
                Ok((label, frame)) => predicate(*label, frame),
                Err(_) => true,
            }))
        });
        self.length = kept;
        Ok(())
    }

    fn extract<T, F>(&self, mut f: F) -> CaptureResult<Vec<T>>
    where
        F: FnMut(Label, &Frame) -> CaptureResult<T>,
    {
        let mut out = Vec::with_capacity(self.length);
        for item in self.frames(Direction::Forward) {
            let (label, frame) = item?;
            out.push(f(label, &frame)?);
        }
        Ok(out)
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
        validate_companion(&companion, self.length, || self.index())?;
        let length = self.length;
        let mut acc = init;
        let mut step = 0usize;
        for item in self.frames(direction) {
            let (label, frame) = item?;
            let position = position_for(direction, length, step);
            step += 1;
            let value = companion_value(&companion, position, label);
            acc = f(label, &frame, value, acc)?;
        }
        Ok(acc)
    }

    fn apply<V, F>(&mut self, options: PassOptions<V>, f: F) -> CaptureResult<()>
    where
        V: 'static,
        F: FnMut(Label, Frame, Option<&V>) -> CaptureResult<Frame> + 'static,
    {
        let PassOptions {
            companion,
            direction: _,
            new_shape,
        } = options;
        validate_companion(&companion, self.length, || self.index())?;
        let expected = new_shape.unwrap_or(self.shape);
        let prev = Rc::clone(&self.producer);
        let f = Rc::new(RefCell::new(f));
        let companion = Rc::new(companion);
        let length = self.length;
        // Without an accumulator the transform is order-independent: every
        // traversal runs a single pass in the consumption direction.
        self.producer = Rc::new(move |direction| {
            let f = Rc::clone(&f);
            let companion = Rc::clone(&companion);
            let mut inner = prev(direction);
            let mut step = 0usize;
            let mut failed = false;
            Box::new(iter::from_fn(move || {
                if failed {
                    return None;
                }
                match inner.next()? {
                    Err(err) => {
                        failed = true;
                        Some(Err(err))
                    }
                    Ok((label, frame)) => {
                        let position = position_for(direction, length, step);
                        step += 1;
                        let value = companion_value(&companion, position, label);
                        match (f.borrow_mut())(label, frame, value) {
                            Ok(frame) => {
                                if frame.shape() != expected {
                                    failed = true;
                                    return Some(Err(shape_error(expected, &frame)));
                                }
                                Some(Ok((label, frame)))
                            }
                            Err(err) => {
                                failed = true;
                                Some(Err(err))
                            }
                        }
                    }
                }
            }))
        });
        if let Some(shape) = new_shape {
            self.shape = shape;
        }
        Ok(())
    }

    fn apply_acc<V, A, F>(&mut self, options: PassOptions<V>, init: A, f: F) -> CaptureResult<()>
    where
        V: 'static,
        A: Clone + 'static,
        F: FnMut(Label, Frame, Option<&V>, A) -> CaptureResult<(Frame, A)> + 'static,
    {
        let PassOptions {
            companion,
            direction: production,
            new_shape,
        } = options;
        validate_companion(&companion, self.length, || self.index())?;
        let expected = new_shape.unwrap_or(self.shape);
        let prev = Rc::clone(&self.producer);
        let f = Rc::new(RefCell::new(f));
        let companion = Rc::new(companion);
        let length = self.length;
        self.producer = Rc::new(move |consume| {
            let f = Rc::clone(&f);
            let companion = Rc::clone(&companion);
            let init = init.clone();
            if consume == production {
                // Single pass: the fold restarts from the initial
                // accumulator on every traversal.
                let mut inner = prev(consume);
                let mut step = 0usize;
                let mut acc = Some(init);
                let mut failed = false;
                Box::new(iter::from_fn(move || {
                    if failed {
                        return None;
                    }
                    match inner.next()? {
                        Err(err) => {
                            failed = true;
                            Some(Err(err))
                        }
                        Ok((label, frame)) => {
                            let position = position_for(consume, length, step);
                            step += 1;
                            let value = companion_value(&companion, position, label);
                            let current = acc.take()?;
                            match (f.borrow_mut())(label, frame, value, current) {
                                Ok((frame, next)) => {
                                    if frame.shape() != expected {
                                        failed = true;
                                        return Some(Err(shape_error(expected, &frame)));
                                    }
                                    acc = Some(next);
                                    Some(Ok((label, frame)))
                                }
                                Err(err) => {
                                    failed = true;
                                    Some(Err(err))
                                }
                            }
                        }
                    }
                }))
            } else {
                log::debug!(
                    "apply: replaying {production:?} accumulator for a {consume:?} traversal"
                );
                // Pass 1, production order: record the accumulator fed to
                // the transform at each position; frames are discarded.
                let mut recorded: Vec<A> = Vec::with_capacity(length);
                let mut acc = init;
                let mut step = 0usize;
                for item in prev(production) {
                    let (label, frame) = match item {
                        Ok(entry) => entry,
                        Err(err) => return error_iter(err),
                    };
                    let position = position_for(production, length, step);
                    step += 1;
                    let value = companion_value(&companion, position, label);
                    recorded.push(acc.clone());
                    match (f.borrow_mut())(label, frame, value, acc) {
                        Ok((_, next)) => acc = next,
                        Err(err) => return error_iter(err),
                    }
                }
                // Pass 2, consumption order: the entry consumed at step k
                // sits at distance k from the end opposite to production
                // order, so its recorded value is at total - 1 - k.
                let total = recorded.len();
                let mut inner = prev(consume);
                let mut step = 0usize;
                let mut failed = false;
                Box::new(iter::from_fn(move || {
                    if failed {
                        return None;
                    }
                    match inner.next()? {
                        Err(err) => {
                            failed = true;
                            Some(Err(err))
                        }
                        Ok((label, frame)) => {
                            let position = position_for(consume, length, step);
                            let produced_at = total.checked_sub(1 + step)?;
                            step += 1;
                            let value = companion_value(&companion, position, label);
                            let current = recorded[produced_at].clone();
                            match (f.borrow_mut())(label, frame, value, current) {
                                Ok((frame, _)) => {
                                    if frame.shape() != expected {
                                        failed = true;
                                        return Some(Err(shape_error(expected, &frame)));
                                    }
                                    Some(Ok((label, frame)))
                                }
                                Err(err) => {
                                    failed = true;
                                    Some(Err(err))
                                }
                            }
                        }
                    }
                }))
            }
        });
        if let Some(shape) = new_shape {
            self.shape = shape;
        }
        Ok(())
    }

    fn rolling<V, F>(&mut self, window: usize, options: PassOptions<V>, f: F) -> CaptureResult<()>
    where
        V: 'static,
        F: FnMut(Label, &[Entry], Option<&V>) -> CaptureResult<Frame> + 'static,
    {
        let PassOptions {
            companion,
            direction: _,
            new_shape,
        } = options;
        let half = validate_window(window, self.length)?;
        validate_companion(&companion, self.length, || self.index())?;
        let expected = new_shape.unwrap_or(self.shape);
        let prev = Rc::clone(&self.producer);
        let f = Rc::new(RefCell::new(f));
        let companion = Rc::new(companion);
        let length = self.length;
        self.producer = Rc::new(move |direction| {
            let f = Rc::clone(&f);
            let companion = Rc::clone(&companion);
            let mut inner = prev(direction);
            let mut sw = SlidingWindow::new(window, direction);
            let mut emitted = 0usize;
            let mut failed = false;
            Box::new(iter::from_fn(move || {
                if failed {
                    return None;
                }
                loop {
                    match inner.next()? {
                        Err(err) => {
                            failed = true;
                            return Some(Err(err));
                        }
                        Ok(entry) => {
                            sw.push(entry);
                            if !sw.is_warm() {
                                continue;
                            }
                            let (center, buffer) = sw.view();
                            let center_pos = center_position(direction, length, half, emitted);
                            let value = companion_value(&companion, center_pos, center);
                            let result = (f.borrow_mut())(center, buffer, value);
                            sw.trim();
                            emitted += 1;
                            return match result {
                                Ok(frame) => {
                                    if frame.shape() != expected {
                                        failed = true;
                                        Some(Err(shape_error(expected, &frame)))
                                    } else {
                                        Some(Ok((center, frame)))
                                    }
                                }
                                Err(err) => {
                                    failed = true;
                                    Some(Err(err))
                                }
                            };
                        }
                    }
                }
            }))
        });
        self.length = length - (window - 1);
        if let Some(shape) = new_shape {
            self.shape = shape;
        }
        Ok(())
    }

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
        F: FnMut(Label, &[Entry], Option<&V>, A) -> CaptureResult<(Frame, A)> + 'static,
    {
        let PassOptions {
            companion,
            direction: production,
            new_shape,
        } = options;
        let half = validate_window(window, self.length)?;
        validate_companion(&companion, self.length, || self.index())?;
        let expected = new_shape.unwrap_or(self.shape);
        let prev = Rc::clone(&self.producer);
        let f = Rc::new(RefCell::new(f));
        let companion = Rc::new(companion);
        let length = self.length;
        self.producer = Rc::new(move |consume| {
            let f = Rc::clone(&f);
            let companion = Rc::clone(&companion);
            let init = init.clone();
            if consume == production {
                let mut inner = prev(consume);
                let mut sw = SlidingWindow::new(window, consume);
                let mut emitted = 0usize;
                let mut acc = Some(init);
                let mut failed = false;
                Box::new(iter::from_fn(move || {
                    if failed {
                        return None;
                    }
                    loop {
                        match inner.next()? {
                            Err(err) => {
                                failed = true;
                                return Some(Err(err));
                            }
                            Ok(entry) => {
                                sw.push(entry);
                                if !sw.is_warm() {
                                    continue;
                                }
                                let (center, buffer) = sw.view();
                                let center_pos = center_position(consume, length, half, emitted);
                                let value = companion_value(&companion, center_pos, center);
                                let current = acc.take()?;
                                let result = (f.borrow_mut())(center, buffer, value, current);
                                sw.trim();
                                emitted += 1;
                                return match result {
                                    Ok((frame, next)) => {
                                        if frame.shape() != expected {
                                            failed = true;
                                            Some(Err(shape_error(expected, &frame)))
                                        } else {
                                            acc = Some(next);
                                            Some(Ok((center, frame)))
                                        }
                                    }
                                    Err(err) => {
                                        failed = true;
                                        Some(Err(err))
                                    }
                                };
                            }
                        }
                    }
                }))
            } else {
                log::debug!(
                    "rolling: replaying {production:?} accumulator for a {consume:?} traversal"
                );
                // Pass 1, production order: window the source exactly as a
                // plain traversal would and record the accumulator fed to
                // each emission.
                let mut recorded: Vec<A> = Vec::new();
                {
                    let mut sw = SlidingWindow::new(window, production);
                    let mut emitted = 0usize;
                    let mut acc = init;
                    for item in prev(production) {
                        let entry = match item {
                            Ok(entry) => entry,
                            Err(err) => return error_iter(err),
                        };
                        sw.push(entry);
                        if !sw.is_warm() {
                            continue;
                        }
                        let (center, buffer) = sw.view();
                        let center_pos = center_position(production, length, half, emitted);
                        let value = companion_value(&companion, center_pos, center);
                        recorded.push(acc.clone());
                        let result = (f.borrow_mut())(center, buffer, value, acc);
                        sw.trim();
                        emitted += 1;
                        match result {
                            Ok((_, next)) => acc = next,
                            Err(err) => return error_iter(err),
                        }
                    }
                }
                // Pass 2, consumption order.
                let total = recorded.len();
                let mut inner = prev(consume);
                let mut sw = SlidingWindow::new(window, consume);
                let mut emitted = 0usize;
                let mut failed = false;
                Box::new(iter::from_fn(move || {
                    if failed {
                        return None;
                    }
                    loop {
                        match inner.next()? {
                            Err(err) => {
                                failed = true;
                                return Some(Err(err));
                            }
                            Ok(entry) => {
                                sw.push(entry);
                                if !sw.is_warm() {
                                    continue;
                                }
                                let produced_at = total.checked_sub(1 + emitted)?;
                                let (center, buffer) = sw.view();
                                let center_pos = center_position(consume, length, half, emitted);
                                let value = companion_value(&companion, center_pos, center);
                                let current = recorded[produced_at].clone();
                                let result = (f.borrow_mut())(center, buffer, value, current);
                                sw.trim();
                                emitted += 1;
                                return match result {
                                    Ok((frame, _)) => {
                                        if frame.shape() != expected {
                                            failed = true;
                                            Some(Err(shape_error(expected, &frame)))
                                        } else {
                                            Some(Ok((center, frame)))
                                        }
                                    }
                                    Err(err) => {
                                        failed = true;
                                        Some(Err(err))
                                    }
                                };
                            }
                        }
                    }
                }))
            }
        });
        self.length = length - (window - 1);
        if let Some(shape) = new_shape {
            self.shape = shape;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{MemorySource, SyntheticSource};

    fn load(frames: usize) -> StreamedSequence {
        let source = Rc::new(SyntheticSource::new(frames, Shape::new(4, 4, 1)));
        StreamedSequence::load(source).unwrap()
    }

    #[test]
    fn traversals_are_independently_restartable() {
        let seq = load(6);
        let first: Vec<Label> = seq
            .frames(Direction::Forward)
            .map(|item| item.unwrap().0)
            .collect();
        let second: Vec<Label> = seq
            .frames(Direction::Forward)
            .map(|item| item.unwrap().0)
            .collect();
        assert_eq!(first, second);
        assert_eq!(first, vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn abandoned_traversal_does_not_disturb_later_ones() {
        let seq = load(6);
        let mut partial = seq.frames(Direction::Forward);
        partial.next();
        partial.next();
        drop(partial);
        assert_eq!(seq.index().unwrap(), vec![0, 1, 2, 3, 4, 5]);
    }

    #[test]
    fn reverse_traversal_counts_down() {
        let seq = load(4);
        let labels: Vec<Label> = seq
            .frames(Direction::Reverse)
            .map(|item| item.unwrap().0)
            .collect();
        assert_eq!(labels, vec![3, 2, 1, 0]);
    }

    #[test]
    fn filter_updates_length_by_draining_once() {
        let mut seq = load(10);
        seq.filter(|label, _| label % 2 == 0).unwrap();
        assert_eq!(seq.length(), 5);
        assert_eq!(seq.index().unwrap(), vec![0, 2, 4, 6, 8]);
    }

    #[test]
    fn reset_index_densifies_in_both_directions() {
        let mut seq = load(5);
        seq.filter(|label, _| label >= 2).unwrap();
        seq.reset_index();
        assert_eq!(seq.index().unwrap(), vec![0, 1, 2]);
        let reversed: Vec<Label> = seq
            .frames(Direction::Reverse)
            .map(|item| item.unwrap().0)
            .collect();
        assert_eq!(reversed, vec![2, 1, 0]);
    }

    #[test]
    fn drifting_source_shapes_fail_the_traversal() {
        let frames = vec![
            Frame::filled(Shape::new(2, 2, 1), 1),
            Frame::filled(Shape::new(3, 3, 1), 2),
        ];
        let seq = StreamedSequence::load(Rc::new(MemorySource::new(frames))).unwrap();
        assert_eq!(seq.shape(), Shape::new(2, 2, 1));
        let mut traversal = seq.frames(Direction::Forward);
        assert!(traversal.next().unwrap().is_ok());
        assert!(matches!(
            traversal.next(),
            Some(Err(CaptureError::ShapeMismatch { .. }))
        ));
        assert!(traversal.next().is_none());
    }

    #[test]
    fn empty_source_is_unreadable() {
        let source = Rc::new(SyntheticSource::new(0, Shape::new(2, 2, 1)));
        assert!(matches!(
            StreamedSequence::load(source),
            Err(CaptureError::SourceUnreadable { .. })
        ));
    }
}
