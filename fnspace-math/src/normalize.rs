//! Normalization of user supplied parameters and index expressions.

use std::{
    fmt,
    ops::{Range, RangeFrom, RangeFull, RangeTo},
};

use smallvec::{smallvec, SmallVec};

use crate::slice::Slice;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum NormalizeError {
    #[error("`length` must be positive, got {0}")]
    NonPositiveLength(usize),
    #[error("sequence `param` has length {found}, expected {expected}")]
    SequenceLength { found: usize, expected: usize },
    #[error("failed to convert parameter {index}: {msg}")]
    Conversion { index: usize, msg: String },
    #[error("cannot use more than one ellipsis")]
    MultipleEllipsis,
    #[error("index {index} is out of bounds for axis {axis} with size {len}")]
    IndexOutOfBounds { index: isize, axis: usize, len: usize },
    #[error("slices with empty axes not allowed (axis {axis})")]
    EmptyAxis { axis: usize },
    #[error("creating new axes is not supported")]
    NewAxis,
    #[error("too many indices: {found} > {ndim}")]
    TooManyIndices { found: usize, ndim: usize },
}

/// A parameter given either once for all axes or once per axis.
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarParam<T> {
    Single(T),
    Seq(Vec<T>),
}

impl<T> ScalarParam<T> {
    pub fn single(value: T) -> Self {
        ScalarParam::Single(value)
    }
}

impl<T> From<Vec<T>> for ScalarParam<T> {
    fn from(v: Vec<T>) -> Self {
        ScalarParam::Seq(v)
    }
}

impl<T, const N: usize> From<[T; N]> for ScalarParam<T> {
    fn from(v: [T; N]) -> Self {
        ScalarParam::Seq(v.into())
    }
}

impl<T: Clone> From<&[T]> for ScalarParam<T> {
    fn from(v: &[T]) -> Self {
        ScalarParam::Seq(v.to_vec())
    }
}

impl<T> From<Option<T>> for ScalarParam<Option<T>> {
    fn from(v: Option<T>) -> Self {
        ScalarParam::Single(v)
    }
}

macro_rules! impl_single_param {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for ScalarParam<$ty> {
                fn from(v: $ty) -> Self {
                    ScalarParam::Single(v)
                }
            }
        )*
    };
}

impl_single_param!(f32, f64, i8, i16, i32, i64, isize, u8, u16, u32, u64, usize, bool, String);

impl<'a> From<&'a str> for ScalarParam<&'a str> {
    fn from(v: &'a str) -> Self {
        ScalarParam::Single(v)
    }
}

/// Broadcasts `param` to a list of `length` entries.
///
/// A single value is repeated. A sequence of length 1 is treated as a single
/// value, and a sequence of length `length` is returned as is. Any other
/// sequence length is an error.
///
/// ```
/// # use fnspace_math::normalize::normalized_scalar_param_list;
/// assert_eq!(normalized_scalar_param_list(5, 3).unwrap(), [5, 5, 5]);
/// assert_eq!(normalized_scalar_param_list([1, 2, 3], 3).unwrap(), [1, 2, 3]);
/// assert!(normalized_scalar_param_list([1, 2], 3).is_err());
/// ```
pub fn normalized_scalar_param_list<T: Clone>(
    param: impl Into<ScalarParam<T>>,
    length: usize,
) -> Result<Vec<T>, NormalizeError> {
    if length == 0 {
        return Err(NormalizeError::NonPositiveLength(length));
    }
    match param.into() {
        ScalarParam::Single(p) => Ok(vec![p; length]),
        ScalarParam::Seq(mut seq) if seq.len() == 1 => {
            let p = seq.remove(0);
            Ok(vec![p; length])
        }
        ScalarParam::Seq(seq) if seq.len() == length => Ok(seq),
        ScalarParam::Seq(seq) => Err(NormalizeError::SequenceLength {
            found: seq.len(),
            expected: length,
        }),
    }
}

/// [`normalized_scalar_param_list`] followed by `conv` on every entry.
pub fn normalized_scalar_param_list_with<T: Clone, U>(
    param: impl Into<ScalarParam<T>>,
    length: usize,
    conv: impl FnMut(T) -> U,
) -> Result<Vec<U>, NormalizeError> {
    Ok(normalized_scalar_param_list(param, length)?
        .into_iter()
        .map(conv)
        .collect())
}

/// [`normalized_scalar_param_list`] followed by a fallible `conv` on every entry.
pub fn try_normalized_scalar_param_list<T: Clone, U, E: fmt::Display>(
    param: impl Into<ScalarParam<T>>,
    length: usize,
    mut conv: impl FnMut(T) -> Result<U, E>,
) -> Result<Vec<U>, NormalizeError> {
    normalized_scalar_param_list(param, length)?
        .into_iter()
        .enumerate()
        .map(|(index, p)| {
            conv(p).map_err(|e| NormalizeError::Conversion {
                index,
                msg: e.to_string(),
            })
        })
        .collect()
}

/// Broadcasts an optional parameter and converts its entries.
///
/// With `keep_none`, missing entries stay `None` and are not passed to
/// `conv`. Otherwise `conv` sees every entry, missing or not.
///
/// ```
/// # use fnspace_math::normalize::normalized_optional_param_list;
/// let conv = |p: Option<f64>| p.map_or(false, |v| v != 0.0);
/// let param = vec![Some(0.0), None, Some(3.0)];
/// let out = normalized_optional_param_list(param, 3, conv, false);
/// assert_eq!(out.unwrap(), [Some(false), Some(false), Some(true)]);
/// ```
pub fn normalized_optional_param_list<T: Clone, U>(
    param: impl Into<ScalarParam<Option<T>>>,
    length: usize,
    mut conv: impl FnMut(Option<T>) -> U,
    keep_none: bool,
) -> Result<Vec<Option<U>>, NormalizeError> {
    Ok(normalized_scalar_param_list(param, length)?
        .into_iter()
        .map(|p| match p {
            None if keep_none => None,
            p => Some(conv(p)),
        })
        .collect())
}

/// One entry of an index expression.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexItem {
    Int(isize),
    Slice(Slice),
    Ellipsis,
    NewAxis,
}

impl From<isize> for IndexItem {
    fn from(i: isize) -> Self {
        IndexItem::Int(i)
    }
}

impl From<Slice> for IndexItem {
    fn from(s: Slice) -> Self {
        IndexItem::Slice(s)
    }
}

impl From<Range<isize>> for IndexItem {
    fn from(r: Range<isize>) -> Self {
        IndexItem::Slice(r.into())
    }
}

impl From<RangeFrom<isize>> for IndexItem {
    fn from(r: RangeFrom<isize>) -> Self {
        IndexItem::Slice(r.into())
    }
}

impl From<RangeTo<isize>> for IndexItem {
    fn from(r: RangeTo<isize>) -> Self {
        IndexItem::Slice(r.into())
    }
}

impl From<RangeFull> for IndexItem {
    fn from(_: RangeFull) -> Self {
        IndexItem::Slice(Slice::FULL)
    }
}

/// An index expression: a sequence of [`IndexItem`]s.
///
/// A bare integer `i` means `[i, ...]`, any other bare item is a one
/// element sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexExpr(pub SmallVec<[IndexItem; 4]>);

impl From<IndexItem> for IndexExpr {
    fn from(item: IndexItem) -> Self {
        match item {
            IndexItem::Int(_) => IndexExpr(smallvec![item, IndexItem::Ellipsis]),
            _ => IndexExpr(smallvec![item]),
        }
    }
}

impl From<isize> for IndexExpr {
    fn from(i: isize) -> Self {
        IndexItem::Int(i).into()
    }
}

impl From<Slice> for IndexExpr {
    fn from(s: Slice) -> Self {
        IndexItem::Slice(s).into()
    }
}

impl From<Vec<IndexItem>> for IndexExpr {
    fn from(items: Vec<IndexItem>) -> Self {
        IndexExpr(items.into())
    }
}

impl From<&[IndexItem]> for IndexExpr {
    fn from(items: &[IndexItem]) -> Self {
        IndexExpr(items.into())
    }
}

impl<const N: usize> From<[IndexItem; N]> for IndexExpr {
    fn from(items: [IndexItem; N]) -> Self {
        IndexExpr(items.into_iter().collect())
    }
}

impl From<&[isize]> for IndexExpr {
    fn from(items: &[isize]) -> Self {
        IndexExpr(items.iter().map(|&i| IndexItem::Int(i)).collect())
    }
}

impl<const N: usize> From<[isize; N]> for IndexExpr {
    fn from(items: [isize; N]) -> Self {
        IndexExpr(items.into_iter().map(IndexItem::Int).collect())
    }
}

/// A normalized per-axis index.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AxisIndex {
    /// A non-negative, in bounds integer index.
    Index(usize),
    Slice(Slice),
}

impl fmt::Display for AxisIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AxisIndex::Index(i) => write!(f, "{i}"),
            AxisIndex::Slice(s) => write!(f, "{s}"),
        }
    }
}

/// Expands `indices` to exactly one entry per axis of `shape`.
///
/// Missing trailing entries and the (single) ellipsis become full slices.
/// Integers are bounds checked, negative ones counting from the end, and
/// returned wrapped; with `int_to_slice` they become unit slices.
/// Empty slices and new axes are rejected.
///
/// ```
/// # use fnspace_math::normalize::{normalized_index_expression, AxisIndex, IndexItem};
/// # use fnspace_math::slice::Slice;
/// let expr = [IndexItem::Int(1), IndexItem::Ellipsis];
/// let idx = normalized_index_expression(expr, &[3, 4, 5], false)?;
/// assert_eq!(
///     idx.as_slice(),
///     [AxisIndex::Index(1), AxisIndex::Slice(Slice::FULL), AxisIndex::Slice(Slice::FULL)]
/// );
/// # Ok::<(), fnspace_math::normalize::NormalizeError>(())
/// ```
pub fn normalized_index_expression(
    indices: impl Into<IndexExpr>,
    shape: &[usize],
    int_to_slice: bool,
) -> Result<SmallVec<[AxisIndex; 4]>, NormalizeError> {
    let ndim = shape.len();
    let IndexExpr(mut items) = indices.into();

    let ellipses = items
        .iter()
        .filter(|item| **item == IndexItem::Ellipsis)
        .count();
    if ellipses > 1 {
        return Err(NormalizeError::MultipleEllipsis);
    }
    if ellipses == 0 && items.len() < ndim {
        items.push(IndexItem::Ellipsis);
    }
    if let Some(pos) = items.iter().position(|item| *item == IndexItem::Ellipsis) {
        let extra = (ndim + 1).saturating_sub(items.len());
        items.remove(pos);
        items.insert_many(pos, std::iter::repeat(IndexItem::Slice(Slice::FULL)).take(extra));
    }

    for (axis, (item, &len)) in items.iter_mut().zip(shape).enumerate() {
        if let IndexItem::Int(index) = *item {
            let wrapped = if index < 0 { index + len as isize } else { index };
            if !(0..len as isize).contains(&wrapped) {
                return Err(NormalizeError::IndexOutOfBounds { index, axis, len });
            }
            *item = if int_to_slice {
                IndexItem::Slice(Slice::range(wrapped, wrapped + 1))
            } else {
                IndexItem::Int(wrapped)
            };
        }
    }

    for (axis, (item, &len)) in items.iter().zip(shape).enumerate() {
        if let IndexItem::Slice(s) = item {
            if (s.start.is_some() && s.start == s.stop) || s.start == Some(len as isize) {
                return Err(NormalizeError::EmptyAxis { axis });
            }
        }
    }

    if items.contains(&IndexItem::NewAxis) {
        return Err(NormalizeError::NewAxis);
    }
    if items.len() > ndim {
        return Err(NormalizeError::TooManyIndices {
            found: items.len(),
            ndim,
        });
    }

    Ok(items
        .into_iter()
        .map(|item| match item {
            IndexItem::Int(i) => AxisIndex::Index(i as usize),
            IndexItem::Slice(s) => AxisIndex::Slice(s),
            IndexItem::Ellipsis | IndexItem::NewAxis => unreachable!("removed above"),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    const FULL: AxisIndex = AxisIndex::Slice(Slice::FULL);

    #[test]
    fn broadcast_single() {
        assert_eq!(normalized_scalar_param_list(5, 3).unwrap(), [5, 5, 5]);
        assert_eq!(
            normalized_scalar_param_list("10", 3).unwrap(),
            ["10", "10", "10"]
        );
        assert_eq!(
            normalized_scalar_param_list(None::<i32>, 2).unwrap(),
            [None, None]
        );
    }

    #[test]
    fn broadcast_sequences() {
        assert_eq!(
            normalized_scalar_param_list([1, 2, 3], 3).unwrap(),
            [1, 2, 3]
        );
        assert_eq!(normalized_scalar_param_list(vec![7.5], 4).unwrap(), [7.5; 4]);
        assert_eq!(
            normalized_scalar_param_list([1, 2], 3),
            Err(NormalizeError::SequenceLength {
                found: 2,
                expected: 3
            })
        );
        assert_eq!(
            normalized_scalar_param_list(1, 0),
            Err(NormalizeError::NonPositiveLength(0))
        );
    }

    #[test]
    fn conversions() {
        assert_eq!(
            normalized_scalar_param_list_with(1, 3, |v: i32| f64::from(v)).unwrap(),
            [1.0, 1.0, 1.0]
        );
        assert_eq!(
            try_normalized_scalar_param_list("10", 3, str::parse::<i32>).unwrap(),
            [10, 10, 10]
        );
        let err =
            try_normalized_scalar_param_list(["1", "x"], 2, str::parse::<i32>).unwrap_err();
        assert!(matches!(err, NormalizeError::Conversion { index: 1, .. }));
    }

    #[test]
    fn optional_conversions() {
        let out = normalized_optional_param_list(
            vec![Some(1.0), None, Some(3.0)],
            3,
            |p: Option<f64>| p.unwrap_or_default() as i32,
            true,
        );
        assert_eq!(out.unwrap(), [Some(1), None, Some(3)]);
    }

    #[test]
    fn index_padding() {
        let idx = normalized_index_expression([1isize, 2, 3], &[3, 4, 5], false).unwrap();
        assert_eq!(
            idx.as_slice(),
            [AxisIndex::Index(1), AxisIndex::Index(2), AxisIndex::Index(3)]
        );

        let idx = normalized_index_expression([1isize, 2], &[3, 4, 5], false).unwrap();
        assert_eq!(idx.as_slice(), [AxisIndex::Index(1), AxisIndex::Index(2), FULL]);

        let items = [IndexItem::Slice(Slice::new(None, Some(2), None)), IndexItem::Int(2)];
        let idx = normalized_index_expression(items, &[3, 4, 5], false).unwrap();
        assert_eq!(
            idx.as_slice(),
            [
                AxisIndex::Slice(Slice::new(None, Some(2), None)),
                AxisIndex::Index(2),
                FULL
            ]
        );
    }

    #[test]
    fn ellipsis() {
        let items = [IndexItem::Int(1), IndexItem::Ellipsis];
        let idx = normalized_index_expression(items, &[3, 4, 5], false).unwrap();
        assert_eq!(idx.as_slice(), [AxisIndex::Index(1), FULL, FULL]);

        let items = [IndexItem::Ellipsis, IndexItem::Int(-1)];
        let idx = normalized_index_expression(items, &[3, 4, 5], false).unwrap();
        assert_eq!(idx.as_slice(), [FULL, FULL, AxisIndex::Index(4)]);

        let idx = normalized_index_expression(2isize, &[3, 4], false).unwrap();
        assert_eq!(idx.as_slice(), [AxisIndex::Index(2), FULL]);

        let items = [IndexItem::Ellipsis, IndexItem::Int(0), IndexItem::Ellipsis];
        assert_eq!(
            normalized_index_expression(items, &[3, 4, 5], false),
            Err(NormalizeError::MultipleEllipsis)
        );
    }

    #[test]
    fn int_to_slice() {
        let idx = normalized_index_expression([1isize, 2, 3], &[3, 4, 5], true).unwrap();
        assert_eq!(
            idx.as_slice(),
            [
                AxisIndex::Slice(Slice::range(1, 2)),
                AxisIndex::Slice(Slice::range(2, 3)),
                AxisIndex::Slice(Slice::range(3, 4)),
            ]
        );
    }

    #[test]
    fn invalid_expressions() {
        assert_eq!(
            normalized_index_expression([3isize], &[3, 4], false),
            Err(NormalizeError::IndexOutOfBounds {
                index: 3,
                axis: 0,
                len: 3
            })
        );
        assert!(normalized_index_expression([0isize, -5], &[3, 4], false).is_err());
        assert_eq!(
            normalized_index_expression(Slice::range(1, 1), &[3], false),
            Err(NormalizeError::EmptyAxis { axis: 0 })
        );
        assert_eq!(
            normalized_index_expression(Slice::new(Some(3), None, None), &[3], false),
            Err(NormalizeError::EmptyAxis { axis: 0 })
        );
        assert_eq!(
            normalized_index_expression([IndexItem::NewAxis, IndexItem::Int(0)], &[3, 4], false),
            Err(NormalizeError::NewAxis)
        );
        assert_eq!(
            normalized_index_expression([0isize, 0, 0], &[3, 4], false),
            Err(NormalizeError::TooManyIndices { found: 3, ndim: 2 })
        );
    }
}
