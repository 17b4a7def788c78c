//! framecap
//!
//! Composable eager/lazy frame-sequence pipelines over video and image
//! sources.
//!
//! # Architecture
//!
//! The crate is built around one contract with two implementations:
//!
//! 1. **Materialized**: frames fully decoded into memory, mutated in place.
//! 2. **Streamed**: a resettable producer recomputes frames from the
//!    external source on every traversal; transforms stack as pipeline
//!    stages wrapping the previous producer.
//!
//! Fully traversed in the same direction, both variants yield identical
//! (label, frame) pairs for the same source and operation chain.
//!
//! # Module Structure
//!
//! - `frame`: pixel buffers and shapes
//! - `sequence`: the `FrameSequence` contract and both variants
//! - `source` / `sink`: decoding and encoding collaborators
//! - `transforms` / `augment`: per-frame transform factories
//! - `labels` / `eval`: position stores and prediction scoring
//! - `config`: TOML pipeline configuration

pub mod augment;
pub mod config;
pub mod error;
pub mod eval;
pub mod frame;
pub mod labels;
pub mod sequence;
pub mod sink;
pub mod source;
pub mod transforms;

pub use error::{CaptureError, CaptureResult};
pub use frame::{Frame, Shape};
pub use labels::{LabelStore, Position};
pub use sequence::{
    Companion, Direction, Entry, FrameSequence, IterOptions, Label, MaterializedSequence,
    PassOptions, StreamedSequence,
};
pub use sink::{FrameSink, ImageSequenceSink, MemorySink};
pub use source::{FrameSource, ImageDirSource, MemorySource, SourceReader, SyntheticSource};
