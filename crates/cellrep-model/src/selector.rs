//! Outer (entity-level) selection.

use crate::error::{ModelError, Result};

/// Chooses entities of a length-N container.
///
/// A mask keeps entries in their original order; explicit positions may
/// reorder and repeat entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    Mask(Vec<bool>),
    Positions(Vec<usize>),
}

impl Selector {
    /// Explicit positions for a container of length `len`.
    pub fn resolve(&self, len: usize) -> Result<Vec<usize>> {
        match self {
            Selector::Mask(mask) => {
                if mask.len() != len {
                    return Err(ModelError::shape(
                        "subset_outer",
                        format_args!("mask of length {len}"),
                        format_args!("mask of length {}", mask.len()),
                    ));
                }
                Ok(mask
                    .iter()
                    .enumerate()
                    .filter_map(|(pos, keep)| keep.then_some(pos))
                    .collect())
            }
            Selector::Positions(positions) => {
                if let Some(&position) = positions.iter().find(|&&pos| pos >= len) {
                    return Err(ModelError::PositionOutOfRange { position, len });
                }
                Ok(positions.clone())
            }
        }
    }
}

impl From<Vec<bool>> for Selector {
    fn from(mask: Vec<bool>) -> Self {
        Selector::Mask(mask)
    }
}

impl From<Vec<usize>> for Selector {
    fn from(positions: Vec<usize>) -> Self {
        Selector::Positions(positions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_resolves_in_order() {
        let selector = Selector::from(vec![true, false, true]);
        assert_eq!(selector.resolve(3).unwrap(), vec![0, 2]);
        assert!(selector.resolve(4).unwrap_err().is_shape_mismatch());
    }

    #[test]
    fn positions_allow_repeats_but_not_overflow() {
        let selector = Selector::from(vec![2, 0, 2]);
        assert_eq!(selector.resolve(3).unwrap(), vec![2, 0, 2]);
        assert_eq!(
            selector.resolve(2),
            Err(ModelError::PositionOutOfRange {
                position: 2,
                len: 2
            })
        );
    }
}
