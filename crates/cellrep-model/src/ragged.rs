//! Ragged sequences stored as one flat arena plus an offsets array.
//!
//! Layout invariants for a `Ragged<T>` with outer length N:
//! - `offsets.len() == N + 1`
//! - `offsets[0] == 0`
//! - `offsets` is non-decreasing
//! - `offsets[N] == values.len()`
//! - entry `i` is `values[offsets[i]..offsets[i + 1]]`
//!
//! Every transformation returns a new value; nothing is mutated in place.

use std::ops::Index;

use serde::Serialize;

use crate::error::{ModelError, Result};
use crate::selector::Selector;

/// Per-entry inner lengths in outer order, kept as offsets.
///
/// Produced by [`Ragged::flatten`] and consumed by [`Ragged::regroup`].
/// A grouping may also carry one owner key per entry, which callers that
/// know how to key their values check on regroup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Grouping {
    offsets: Vec<usize>,
    keys: Option<Vec<Option<String>>>,
}

impl Grouping {
    fn from_offsets(offsets: Vec<usize>) -> Self {
        Self {
            offsets,
            keys: None,
        }
    }

    pub fn from_lengths(lengths: &[usize]) -> Self {
        let mut offsets = Vec::with_capacity(lengths.len() + 1);
        let mut total = 0usize;
        offsets.push(0);
        for &len in lengths {
            total += len;
            offsets.push(total);
        }
        Self::from_offsets(offsets)
    }

    /// Attaches one owner key per entry; `None` leaves an entry unchecked.
    pub fn with_keys(self, keys: Vec<Option<String>>) -> Result<Self> {
        if keys.len() != self.len() {
            return Err(ModelError::shape(
                "grouping keys",
                format_args!("{} keys", self.len()),
                format_args!("{} keys", keys.len()),
            ));
        }
        Ok(Self {
            offsets: self.offsets,
            keys: Some(keys),
        })
    }

    /// Keys taken from the grouped values themselves, one per entry.
    pub(crate) fn keyed(mut self, keys: Vec<Option<String>>) -> Self {
        debug_assert_eq!(keys.len(), self.len());
        self.keys = Some(keys);
        self
    }

    /// Owner key of `entry`, if keys were attached and the entry has one.
    pub fn key(&self, entry: usize) -> Option<&str> {
        self.keys.as_ref()?.get(entry)?.as_deref()
    }

    /// Outer length.
    pub fn len(&self) -> usize {
        self.offsets.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of flat rows described.
    pub fn total(&self) -> usize {
        self.offsets[self.offsets.len() - 1]
    }

    pub fn lengths(&self) -> Vec<usize> {
        self.offsets.windows(2).map(|w| w[1] - w[0]).collect()
    }

    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }

    /// Outer position of every flat row, in flat order.
    pub fn owners(&self) -> Vec<usize> {
        let mut owners = Vec::with_capacity(self.total());
        for (entry, w) in self.offsets.windows(2).enumerate() {
            owners.extend(std::iter::repeat_n(entry, w[1] - w[0]));
        }
        owners
    }
}

/// A length-N sequence of variable-length groups.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Ragged<T> {
    values: Vec<T>,
    offsets: Vec<usize>,
}

impl<T> Ragged<T> {
    /// N empty groups.
    pub fn empty(len: usize) -> Self {
        Self {
            values: Vec::new(),
            offsets: vec![0; len + 1],
        }
    }

    pub fn from_groups(groups: impl IntoIterator<Item = Vec<T>>) -> Self {
        let mut values = Vec::new();
        let mut offsets = vec![0];
        for group in groups {
            values.extend(group);
            offsets.push(values.len());
        }
        Self { values, offsets }
    }

    /// Assembles a ragged sequence from raw parts, checking the layout.
    pub fn from_parts(values: Vec<T>, offsets: Vec<usize>) -> Result<Self> {
        if offsets.first() != Some(&0) {
            return Err(ModelError::shape(
                "from_parts",
                "offsets starting at 0",
                format_args!("{:?}", offsets.first()),
            ));
        }
        if let Some(pos) = offsets.windows(2).position(|w| w[0] > w[1]) {
            return Err(ModelError::shape(
                "from_parts",
                "non-decreasing offsets",
                format_args!("decrease after entry {pos}"),
            ));
        }
        let last = offsets[offsets.len() - 1];
        if last != values.len() {
            return Err(ModelError::shape(
                "from_parts",
                format_args!("{last} values"),
                format_args!("{} values", values.len()),
            ));
        }
        Ok(Self { values, offsets })
    }

    /// Groups `items` under N outer positions.
    ///
    /// `position_of` maps an item to its outer position; items mapped to
    /// `None` are dropped and counted in the returned number. Items keep
    /// their input order inside each group.
    pub fn group_by_key<F>(
        items: impl IntoIterator<Item = T>,
        len: usize,
        mut position_of: F,
    ) -> (Self, usize)
    where
        F: FnMut(&T) -> Option<usize>,
    {
        let mut dropped = 0usize;
        let mut keyed: Vec<(usize, T)> = Vec::new();
        for item in items {
            match position_of(&item) {
                Some(pos) if pos < len => keyed.push((pos, item)),
                _ => dropped += 1,
            }
        }
        // sort_by_key is stable, which keeps input order within a group.
        keyed.sort_by_key(|(pos, _)| *pos);

        let mut counts = vec![0usize; len];
        for (pos, _) in &keyed {
            counts[*pos] += 1;
        }
        let grouping = Grouping::from_lengths(&counts);
        let values = keyed.into_iter().map(|(_, item)| item).collect();
        (
            Self {
                values,
                offsets: grouping.offsets,
            },
            dropped,
        )
    }

    /// Outer length N.
    pub fn len(&self) -> usize {
        self.offsets.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of inner elements across all groups.
    pub fn total_len(&self) -> usize {
        self.values.len()
    }

    pub fn get(&self, index: usize) -> Option<&[T]> {
        if index >= self.len() {
            return None;
        }
        Some(&self.values[self.offsets[index]..self.offsets[index + 1]])
    }

    pub fn inner_len(&self, index: usize) -> Option<usize> {
        self.get(index).map(<[T]>::len)
    }

    pub fn lengths(&self) -> Vec<usize> {
        self.offsets.windows(2).map(|w| w[1] - w[0]).collect()
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = &[T]> + '_ {
        self.offsets
            .windows(2)
            .map(move |w| &self.values[w[0]..w[1]])
    }

    pub fn values(&self) -> &[T] {
        &self.values
    }

    pub fn offsets(&self) -> &[usize] {
        &self.offsets
    }

    pub fn grouping(&self) -> Grouping {
        Grouping::from_offsets(self.offsets.clone())
    }

    /// Applies `f` to every inner element; outer and inner lengths are kept.
    pub fn map<U>(&self, f: impl FnMut(&T) -> U) -> Ragged<U> {
        Ragged {
            values: self.values.iter().map(f).collect(),
            offsets: self.offsets.clone(),
        }
    }

    pub fn try_map<U, E>(
        &self,
        f: impl FnMut(&T) -> std::result::Result<U, E>,
    ) -> std::result::Result<Ragged<U>, E> {
        Ok(Ragged {
            values: self
                .values
                .iter()
                .map(f)
                .collect::<std::result::Result<_, _>>()?,
            offsets: self.offsets.clone(),
        })
    }

    /// Per-entry count of elements satisfying `predicate`.
    pub fn count_where(&self, mut predicate: impl FnMut(&T) -> bool) -> Vec<usize> {
        self.iter()
            .map(|group| group.iter().filter(|&item| predicate(item)).count())
            .collect()
    }

    /// Fails with a shape mismatch unless `other` has the same outer length
    /// and the same inner length at every entry.
    pub fn check_shape<U>(&self, other: &Ragged<U>, context: &'static str) -> Result<()> {
        if self.len() != other.len() {
            return Err(ModelError::shape(
                context,
                format_args!("outer length {}", self.len()),
                format_args!("outer length {}", other.len()),
            ));
        }
        let mismatch = self
            .offsets
            .windows(2)
            .zip(other.offsets.windows(2))
            .enumerate()
            .find(|(_, (a, b))| a[1] - a[0] != b[1] - b[0]);
        if let Some((entry, (a, b))) = mismatch {
            return Err(ModelError::shape(
                context,
                format_args!("inner length {} at entry {entry}", a[1] - a[0]),
                format_args!("inner length {} at entry {entry}", b[1] - b[0]),
            ));
        }
        Ok(())
    }

    /// Consumes the sequence into flat values plus the grouping needed to
    /// rebuild it.
    pub fn into_flat(self) -> (Vec<T>, Grouping) {
        (self.values, Grouping::from_offsets(self.offsets))
    }

    /// Inverse of [`Ragged::flatten`]: `values` must hold exactly
    /// `grouping.total()` rows in outer-then-inner order.
    pub fn regroup(values: Vec<T>, grouping: &Grouping) -> Result<Self> {
        if values.len() != grouping.total() {
            return Err(ModelError::shape(
                "regroup",
                format_args!("{} rows", grouping.total()),
                format_args!("{} rows", values.len()),
            ));
        }
        Ok(Self {
            values,
            offsets: grouping.offsets.clone(),
        })
    }
}

impl<T: Clone> Ragged<T> {
    /// Flat copy of every element in outer-then-inner order.
    pub fn flatten(&self) -> (Vec<T>, Grouping) {
        self.clone().into_flat()
    }

    /// Keeps inner elements whose mask value is true.
    ///
    /// The mask must have exactly this shape; the outer length never
    /// changes, groups may become empty.
    pub fn filter_inner(&self, mask: &Ragged<bool>) -> Result<Self> {
        self.check_shape(mask, "filter_inner")?;
        let mut values = Vec::with_capacity(mask.values.iter().filter(|keep| **keep).count());
        let mut offsets = Vec::with_capacity(self.offsets.len());
        offsets.push(0);
        for (group, keep) in self.iter().zip(mask.iter()) {
            values.extend(
                group
                    .iter()
                    .zip(keep)
                    .filter(|(_, keep)| **keep)
                    .map(|(item, _)| item.clone()),
            );
            offsets.push(values.len());
        }
        Ok(Self { values, offsets })
    }

    /// Selects whole entries; the result has one entry per selected
    /// position, each carried over unchanged.
    pub fn subset_outer(&self, selector: &Selector) -> Result<Self> {
        let positions = selector.resolve(self.len())?;
        let mut values = Vec::new();
        let mut offsets = Vec::with_capacity(positions.len() + 1);
        offsets.push(0);
        for pos in positions {
            values.extend_from_slice(&self.values[self.offsets[pos]..self.offsets[pos + 1]]);
            offsets.push(values.len());
        }
        Ok(Self { values, offsets })
    }
}

impl<T> Index<usize> for Ragged<T> {
    type Output = [T];

    fn index(&self, index: usize) -> &Self::Output {
        &self.values[self.offsets[index]..self.offsets[index + 1]]
    }
}

impl<T> FromIterator<Vec<T>> for Ragged<T> {
    fn from_iter<I: IntoIterator<Item = Vec<T>>>(iter: I) -> Self {
        Self::from_groups(iter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_parts_checks_layout() {
        assert!(Ragged::from_parts(vec![1, 2, 3], vec![0, 2, 3]).is_ok());
        assert!(Ragged::from_parts(vec![1, 2, 3], vec![1, 2, 3]).is_err());
        assert!(Ragged::from_parts(vec![1, 2, 3], vec![0, 2, 1, 3]).is_err());
        assert!(Ragged::from_parts(vec![1, 2, 3], vec![0, 2]).is_err());
        assert!(Ragged::<i32>::from_parts(vec![], vec![]).is_err());
    }

    #[test]
    fn group_by_key_is_stable_and_counts_drops() {
        let items = vec![(1usize, 'a'), (0, 'b'), (9, 'x'), (1, 'c')];
        let (ragged, dropped) =
            Ragged::group_by_key(items, 3, |(pos, _)| if *pos < 3 { Some(*pos) } else { None });
        assert_eq!(dropped, 1);
        assert_eq!(ragged.lengths(), vec![1, 2, 0]);
        assert_eq!(&ragged[1], &[(1, 'a'), (1, 'c')]);
        assert!(ragged.get(2).is_some_and(<[_]>::is_empty));
    }

    #[test]
    fn check_shape_names_the_entry() {
        let a = Ragged::from_groups(vec![vec![1, 2], vec![3]]);
        let b = Ragged::from_groups(vec![vec![true, true], vec![]]);
        let err = a.check_shape(&b, "test").unwrap_err();
        assert_eq!(
            err.to_string(),
            "shape mismatch in test: expected inner length 1 at entry 1, found inner length 0 at entry 1"
        );
    }

    #[test]
    fn grouping_owners() {
        let grouping = Grouping::from_lengths(&[2, 0, 1]);
        assert_eq!(grouping.owners(), vec![0, 0, 2]);
        assert_eq!(grouping.total(), 3);
        assert_eq!(grouping.len(), 3);
    }

    #[test]
    fn grouping_keys_must_cover_every_entry() {
        let grouping = Grouping::from_lengths(&[1, 0]);
        assert!(grouping.clone().with_keys(vec![None]).is_err());
        let keyed = grouping
            .with_keys(vec![Some("c1".to_string()), None])
            .unwrap();
        assert_eq!(keyed.key(0), Some("c1"));
        assert_eq!(keyed.key(1), None);
        assert_eq!(keyed.lengths(), vec![1, 0]);
    }

    #[test]
    fn count_where_per_entry() {
        let ragged = Ragged::from_groups(vec![vec![true, false, true], vec![], vec![false]]);
        assert_eq!(ragged.count_where(|v| *v), vec![2, 0, 0]);
    }
}
