//! Compaction of code points into contiguous character regions.

use core::{fmt, ops, slice};
use std::collections::{btree_set, BTreeSet};

use crate::errors::UnsortedError;

/// Deduplicated set of code points supported by a font, as returned by
/// [`Font::code_points()`](crate::Font::code_points()).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodePointSet {
    inner: BTreeSet<u32>,
}

impl CodePointSet {
    /// Returns the number of code points in this set.
    pub fn len(&self) -> usize {
        self.inner.len()
    }

    /// Checks whether this set is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Checks whether this set contains the specified code point.
    pub fn contains(&self, code_point: u32) -> bool {
        self.inner.contains(&code_point)
    }

    /// Iterates over code points in this set in the ascending order.
    pub fn iter(&self) -> btree_set::Iter<'_, u32> {
        self.inner.iter()
    }

    /// Renders this set as an ascending sequence.
    pub fn to_sorted(&self) -> SortedCodePoints {
        SortedCodePoints(self.inner.iter().copied().collect())
    }

    pub(crate) fn insert(&mut self, code_point: u32) {
        self.inner.insert(code_point);
    }
}

impl FromIterator<u32> for CodePointSet {
    fn from_iter<I: IntoIterator<Item = u32>>(iter: I) -> Self {
        Self {
            inner: iter.into_iter().collect(),
        }
    }
}

impl Extend<u32> for CodePointSet {
    fn extend<I: IntoIterator<Item = u32>>(&mut self, iter: I) {
        self.inner.extend(iter);
    }
}

impl<'a> IntoIterator for &'a CodePointSet {
    type Item = &'a u32;
    type IntoIter = btree_set::Iter<'a, u32>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Strictly ascending sequence of code points.
///
/// Can be obtained from a [`CodePointSet`], or from a `Vec<u32>` via the checked [`TryFrom`]
/// conversion, which rejects out-of-order and duplicate code points.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SortedCodePoints(Vec<u32>);

impl TryFrom<Vec<u32>> for SortedCodePoints {
    type Error = UnsortedError;

    fn try_from(points: Vec<u32>) -> Result<Self, Self::Error> {
        let unsorted_pos = points.windows(2).position(|window| window[0] >= window[1]);
        if let Some(pos) = unsorted_pos {
            return Err(UnsortedError {
                index: pos + 1,
                previous: points[pos],
                current: points[pos + 1],
            });
        }
        Ok(Self(points))
    }
}

impl SortedCodePoints {
    /// Returns code points as a slice.
    pub fn as_slice(&self) -> &[u32] {
        &self.0
    }

    /// Returns the number of code points.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Checks whether there are no code points.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Compacts these code points into regions with the specified gap tolerance.
    /// This is a shortcut for [`RegionList::new()`].
    pub fn compact(&self, tolerance: u32) -> RegionList {
        RegionList::new(self, tolerance)
    }
}

/// Inclusive interval of code points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Region {
    start: u32,
    end: u32,
}

impl fmt::Display for Region {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{}..={}", self.start, self.end)
    }
}

impl Region {
    /// Creates a region. Returns `None` if `start > end`.
    pub const fn new(start: u32, end: u32) -> Option<Self> {
        if start > end {
            None
        } else {
            Some(Self { start, end })
        }
    }

    const fn single(point: u32) -> Self {
        Self {
            start: point,
            end: point,
        }
    }

    /// Returns the first code point in this region.
    pub const fn start(&self) -> u32 {
        self.start
    }

    /// Returns the last code point in this region (inclusive).
    pub const fn end(&self) -> u32 {
        self.end
    }

    /// Returns the number of code points spanned by this region. Never zero.
    #[allow(clippy::len_without_is_empty)] // regions are never empty
    pub fn len(&self) -> u64 {
        u64::from(self.end - self.start) + 1
    }

    /// Checks whether this region contains the specified code point.
    pub const fn contains(&self, code_point: u32) -> bool {
        self.start <= code_point && code_point <= self.end
    }

    /// Iterates over all code points spanned by this region.
    pub fn code_points(&self) -> ops::RangeInclusive<u32> {
        self.start..=self.end
    }
}

/// Ordered list of maximal [`Region`]s covering a [`SortedCodePoints`] sequence.
///
/// Regions are ascending and non-overlapping. For consecutive regions `prev` and `next`,
/// `next.start() - prev.end() > tolerance + 1`, i.e., more than `tolerance` unsupported code points
/// separate them. Within a region, gaps of up to `tolerance` unsupported code points are filled in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegionList {
    regions: Vec<Region>,
    tolerance: u32,
}

impl RegionList {
    /// Compacts `points` into regions, merging points separated by at most `tolerance`
    /// missing code points.
    pub fn new(points: &SortedCodePoints, tolerance: u32) -> Self {
        let max_step = u64::from(tolerance) + 1;
        let mut regions = vec![];
        let mut pending: Option<Region> = None;

        for &point in points.as_slice() {
            if let Some(region) = &mut pending {
                // `point > region.end` is guaranteed by `SortedCodePoints` invariants.
                if u64::from(point - region.end) <= max_step {
                    region.end = point;
                    continue;
                }
                regions.push(*region);
            }
            pending = Some(Region::single(point));
        }
        regions.extend(pending);

        let this = Self { regions, tolerance };
        log::debug!(
            "compacted {} code point(s) into {} region(s) covering {} code point(s) with tolerance {tolerance}",
            points.len(),
            this.len(),
            this.total_covered()
        );
        this
    }

    /// Returns the regions.
    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    /// Returns the gap tolerance these regions were built with.
    pub fn tolerance(&self) -> u32 {
        self.tolerance
    }

    /// Returns the number of regions.
    pub fn len(&self) -> usize {
        self.regions.len()
    }

    /// Checks whether there are no regions. This is the case iff the compacted code points are empty.
    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }

    /// Iterates over regions in the ascending order.
    pub fn iter(&self) -> slice::Iter<'_, Region> {
        self.regions.iter()
    }

    /// Returns the total number of code points spanned by the regions. This includes code points
    /// in the filled-in gaps, so it may exceed the number of compacted code points if the tolerance
    /// is non-zero.
    pub fn total_covered(&self) -> u64 {
        self.regions.iter().map(Region::len).sum()
    }

    /// Iterates over all code points spanned by the regions in the ascending order.
    pub fn covered_code_points(&self) -> impl Iterator<Item = u32> + '_ {
        self.regions.iter().flat_map(Region::code_points)
    }
}

impl<'a> IntoIterator for &'a RegionList {
    type Item = &'a Region;
    type IntoIter = slice::Iter<'a, Region>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Reconstructs sorted code points from the regions' spans.
impl From<&RegionList> for SortedCodePoints {
    fn from(regions: &RegionList) -> Self {
        Self(regions.covered_code_points().collect())
    }
}
