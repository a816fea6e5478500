// mldata-core/src/dataset/key.rs

use std::fmt;
use std::ops::{Range, RangeFrom, RangeFull};

use super::element::Element;
use crate::error::{ClientError, Result};

/// How a caller addresses elements of a dataset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementKey {
    /// Zero-based logical position.
    Index(usize),
    /// A run of logical positions.
    Slice(SliceKey),
    /// A server-side element identifier.
    Id(String),
}

impl ElementKey {
    pub fn id(id: impl Into<String>) -> Self {
        ElementKey::Id(id.into())
    }
}

impl fmt::Display for ElementKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ElementKey::Index(index) => write!(f, "{}", index),
            ElementKey::Slice(slice) => write!(f, "{}", slice),
            ElementKey::Id(id) => write!(f, "{}", id),
        }
    }
}

impl From<usize> for ElementKey {
    fn from(index: usize) -> Self {
        ElementKey::Index(index)
    }
}

impl From<SliceKey> for ElementKey {
    fn from(slice: SliceKey) -> Self {
        ElementKey::Slice(slice)
    }
}

impl From<Range<usize>> for ElementKey {
    fn from(range: Range<usize>) -> Self {
        ElementKey::Slice(range.into())
    }
}

/// `start:stop:step` over logical positions.
///
/// `stop` of `None` or `0` means the dataset length; a negative `stop`
/// counts back from the length. `step` defaults to 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SliceKey {
    pub start: usize,
    pub stop: Option<isize>,
    pub step: Option<usize>,
}

impl SliceKey {
    pub fn new(start: usize, stop: Option<isize>) -> Self {
        Self {
            start,
            stop,
            step: None,
        }
    }

    /// Every element.
    pub fn full() -> Self {
        Self::default()
    }

    pub fn with_step(mut self, step: usize) -> Self {
        self.step = Some(step);
        self
    }

    /// Logical indices this slice selects from a collection of `len`
    /// elements, in increasing order.
    ///
    /// Indices are not clamped to `len`: a slice reaching past the end
    /// fails as `NotFound` on the first missing position.
    ///
    /// # Errors
    ///
    /// `InvalidArgument` for a step of zero, `NotFound` when a selected
    /// index is `>= len`.
    pub fn indices(&self, len: usize) -> Result<Vec<usize>> {
        let step = self.step.unwrap_or(1);
        if step == 0 {
            return Err(ClientError::invalid_argument("slice step cannot be zero"));
        }

        let stop = match self.stop {
            None | Some(0) => len,
            Some(stop) if stop < 0 => len.saturating_sub(stop.unsigned_abs()),
            Some(stop) => stop as usize,
        };

        if let Some(missing) = self.first_index_from(len, step).filter(|&index| index < stop) {
            return Err(ClientError::not_found(missing.to_string()));
        }

        Ok((self.start..stop).step_by(step).collect())
    }

    /// Smallest index `>= len` reachable from `start` by `step`.
    fn first_index_from(&self, len: usize, step: usize) -> Option<usize> {
        if self.start >= len {
            return Some(self.start);
        }
        let steps = (len - self.start).div_ceil(step);
        steps.checked_mul(step)?.checked_add(self.start)
    }
}

impl fmt::Display for SliceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:", self.start)?;
        if let Some(stop) = self.stop {
            write!(f, "{}", stop)?;
        }
        if let Some(step) = self.step {
            write!(f, ":{}", step)?;
        }
        Ok(())
    }
}

impl From<Range<usize>> for SliceKey {
    fn from(range: Range<usize>) -> Self {
        // Saturates at isize::MAX.
        let stop = isize::try_from(range.end).unwrap_or(isize::MAX);
        Self::new(range.start, Some(stop))
    }
}

impl From<RangeFrom<usize>> for SliceKey {
    fn from(range: RangeFrom<usize>) -> Self {
        Self::new(range.start, None)
    }
}

impl From<RangeFull> for SliceKey {
    fn from(_: RangeFull) -> Self {
        Self::full()
    }
}

/// Result of a keyed lookup: one element, or several in logical order.
#[derive(Debug, Clone)]
pub enum Selection {
    One(Element),
    Many(Vec<Element>),
}

impl Selection {
    /// Wraps fetched elements. Zero elements is `NotFound` for `key`.
    pub(crate) fn from_elements(key: &ElementKey, mut elements: Vec<Element>) -> Result<Self> {
        match elements.len() {
            0 => Err(ClientError::not_found(key.to_string())),
            1 => Ok(Selection::One(elements.remove(0))),
            _ => Ok(Selection::Many(elements)),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Selection::One(_) => 1,
            Selection::Many(elements) => elements.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The first selected element.
    pub fn first(&self) -> Option<&Element> {
        match self {
            Selection::One(element) => Some(element),
            Selection::Many(elements) => elements.first(),
        }
    }

    pub fn into_vec(self) -> Vec<Element> {
        match self {
            Selection::One(element) => vec![element],
            Selection::Many(elements) => elements,
        }
    }
}

impl IntoIterator for Selection {
    type Item = Element;
    type IntoIter = std::vec::IntoIter<Element>;

    fn into_iter(self) -> Self::IntoIter {
        self.into_vec().into_iter()
    }
}
