//! Label store: frame label to 2-D position.
//!
//! Backs annotation and evaluation. Positions come either from a particle
//! tracker's results file or from callers building predictions in memory.
//! Labels may be missing; lookups return `Option`.
//!
//! The results format is whitespace-separated text with one header line.
//! Column 5 is the X coordinate, column 6 the Y coordinate, column 7 the
//! frame (slice) number. When the tracker emits several particles for one
//! slice, only the first line of each run counts.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;

use crate::error::{CaptureError, CaptureResult};
use crate::sequence::Label;

/// Sub-pixel position inside a frame; `x` runs along columns, `y` along
/// rows, matching the tracker's X/Y output columns.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Nearest-pixel coordinates, truncated like the tracker reports them.
    pub fn rounded(&self) -> (i64, i64) {
        (self.x as i64, self.y as i64)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({:.1}, {:.1})", self.x, self.y)
    }
}

#[derive(Clone, Debug, Default)]
pub struct LabelStore {
    positions: HashMap<Label, Position>,
}

impl LabelStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a tracker results file.
    pub fn load(path: &Path) -> CaptureResult<Self> {
        let text = fs::read_to_string(path).map_err(|err| {
            log::warn!("cannot read results file '{}': {err}", path.display());
            CaptureError::SourceUnreadable {
                path: path.display().to_string(),
            }
        })?;
        let mut positions = HashMap::new();
        let mut last_slice: Option<Label> = None;
        for (number, line) in text.lines().enumerate() {
            if number == 0 {
                continue;
            }
            let fields: Vec<&str> = line.split_whitespace().collect();
            let parsed = (|| {
                let x: f32 = fields.get(5)?.parse().ok()?;
                let y: f32 = fields.get(6)?.parse().ok()?;
                let slice: Label = fields.get(7)?.parse().ok()?;
                Some((x, y, slice))
            })();
            let Some((x, y, slice)) = parsed else {
                return Err(CaptureError::Codec(format!(
                    "malformed results line {} in '{}'",
                    number + 1,
                    path.display()
                )));
            };
            if last_slice == Some(slice) {
                continue;
            }
            last_slice = Some(slice);
            positions.insert(slice, Position::new(x, y));
        }
        log::debug!(
            "loaded {} positions from '{}'",
            positions.len(),
            path.display()
        );
        Ok(Self { positions })
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn get(&self, label: Label) -> Option<Position> {
        self.positions.get(&label).copied()
    }

    pub fn insert(&mut self, label: Label, position: Position) {
        self.positions.insert(label, position);
    }

    /// Labels in ascending order.
    pub fn keys(&self) -> Vec<Label> {
        let mut keys: Vec<Label> = self.positions.keys().copied().collect();
        keys.sort_unstable();
        keys
    }

    /// A new store with every position transformed.
    pub fn map<F>(&self, f: F) -> Self
    where
        F: Fn(Position) -> Position,
    {
        Self {
            positions: self
                .positions
                .iter()
                .map(|(label, position)| (*label, f(*position)))
                .collect(),
        }
    }

    /// Labels present in both stores, ascending.
    pub fn common_labels(&self, other: &Self) -> Vec<Label> {
        let mut common: Vec<Label> = self
            .positions
            .keys()
            .filter(|label| other.positions.contains_key(label))
            .copied()
            .collect();
        common.sort_unstable();
        common
    }
}

impl FromIterator<(Label, Position)> for LabelStore {
    fn from_iter<I: IntoIterator<Item = (Label, Position)>>(iter: I) -> Self {
        Self {
            positions: iter.into_iter().collect(),
        }
    }
}
