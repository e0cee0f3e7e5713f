use std::{
    fmt,
    ops::{Range, RangeFrom, RangeFull, RangeTo},
};

use crate::error::{Error, Result};

/// A slice with Python semantics: optional bounds that may be negative
/// (counted from the end) and an optional non-zero step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Slice {
    pub start: Option<isize>,
    pub stop: Option<isize>,
    pub step: Option<isize>,
}

/// Resolved slice bounds, see [`Slice::indices`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SliceIndices {
    pub start: isize,
    pub stop: isize,
    pub step: isize,
}

impl Slice {
    /// `[:]`
    pub const FULL: Slice = Slice {
        start: None,
        stop: None,
        step: None,
    };

    pub const fn new(start: Option<isize>, stop: Option<isize>, step: Option<isize>) -> Self {
        Self { start, stop, step }
    }

    /// `[start:stop]`
    pub const fn range(start: isize, stop: isize) -> Self {
        Self::new(Some(start), Some(stop), None)
    }

    pub const fn with_step(self, step: isize) -> Self {
        Self {
            step: Some(step),
            ..self
        }
    }

    /// Clamps the bounds against a sequence of length `len`.
    pub fn indices(&self, len: usize) -> Result<SliceIndices> {
        let step = self.step.unwrap_or(1);
        if step == 0 {
            return Err(Error::ZeroStep);
        }
        let len = len as isize;
        let (lower, upper) = if step < 0 { (-1, len - 1) } else { (0, len) };

        let clamp = |bound: isize| {
            if bound < 0 {
                (bound + len).max(lower)
            } else {
                bound.min(upper)
            }
        };

        let start = match self.start {
            Some(start) => clamp(start),
            None if step < 0 => upper,
            None => lower,
        };
        let stop = match self.stop {
            Some(stop) => clamp(stop),
            None if step < 0 => lower,
            None => upper,
        };
        Ok(SliceIndices { start, stop, step })
    }

    /// Number of elements selected from a sequence of length `len`.
    pub fn len_for(&self, len: usize) -> Result<usize> {
        Ok(self.indices(len)?.len())
    }
}

impl SliceIndices {
    pub fn len(&self) -> usize {
        let Self { start, stop, step } = *self;
        let forward = if step > 0 { stop > start } else { start > stop };
        if !forward {
            return 0;
        }
        (stop.abs_diff(start) - 1) / step.unsigned_abs() + 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The selected positions, in iteration order.
    pub fn iter(&self) -> impl Iterator<Item = usize> {
        let Self { start, step, .. } = *self;
        (0..self.len()).map(move |i| (start + i as isize * step) as usize)
    }
}

impl fmt::Display for Slice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bound = |b: Option<isize>| b.map(|b| b.to_string()).unwrap_or_default();
        write!(f, "{}:{}", bound(self.start), bound(self.stop))?;
        if let Some(step) = self.step {
            write!(f, ":{step}")?;
        }
        Ok(())
    }
}

impl From<Range<isize>> for Slice {
    fn from(r: Range<isize>) -> Self {
        Slice::range(r.start, r.end)
    }
}

impl From<RangeFrom<isize>> for Slice {
    fn from(r: RangeFrom<isize>) -> Self {
        Slice::new(Some(r.start), None, None)
    }
}

impl From<RangeTo<isize>> for Slice {
    fn from(r: RangeTo<isize>) -> Self {
        Slice::new(None, Some(r.end), None)
    }
}

impl From<RangeFull> for Slice {
    fn from(_: RangeFull) -> Self {
        Slice::FULL
    }
}
