//! The primary index: the authoritative, ordered universe of entities.

use std::collections::HashMap;

use crate::error::{ModelError, Result};
use crate::ids::Barcode;
use crate::selector::Selector;

/// Ordered entity identifiers with O(1) position lookup.
///
/// Identifiers are unique; grouping against an index with repeated ids
/// would be ambiguous, so construction fails fast instead.
#[derive(Debug, Clone, Default)]
pub struct PrimaryIndex {
    ids: Vec<Barcode>,
    positions: HashMap<Barcode, usize>,
}

impl PrimaryIndex {
    pub fn new(ids: Vec<Barcode>) -> Result<Self> {
        let mut positions = HashMap::with_capacity(ids.len());
        for (pos, id) in ids.iter().enumerate() {
            if let Some(first) = positions.insert(id.clone(), pos) {
                return Err(ModelError::DuplicateKey {
                    key: id.to_string(),
                    first,
                    second: pos,
                });
            }
        }
        Ok(Self { ids, positions })
    }

    /// Parses and indexes raw identifier strings.
    pub fn from_strs<S: AsRef<str>>(ids: &[S]) -> Result<Self> {
        let ids = ids
            .iter()
            .map(|id| Barcode::new(id.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Self::new(ids)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn ids(&self) -> &[Barcode] {
        &self.ids
    }

    pub fn get(&self, position: usize) -> Option<&Barcode> {
        self.ids.get(position)
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.positions.get(id).copied()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.positions.contains_key(id)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Barcode> {
        self.ids.iter()
    }

    /// The index restricted to `selector`. Repeated positions would repeat
    /// ids and therefore fail with [`ModelError::DuplicateKey`].
    pub fn subset(&self, selector: &Selector) -> Result<Self> {
        let positions = selector.resolve(self.len())?;
        Self::new(positions.into_iter().map(|pos| self.ids[pos].clone()).collect())
    }
}

impl PartialEq for PrimaryIndex {
    fn eq(&self, other: &Self) -> bool {
        self.ids == other.ids
    }
}

impl Eq for PrimaryIndex {}
