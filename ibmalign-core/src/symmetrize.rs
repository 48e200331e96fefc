//! Symmetrization of two oppositely trained alignments.

use std::collections::btree_set;
use std::collections::BTreeSet;

use hashbrown::HashSet;

use crate::model2::TrainedModel;
use crate::types::*;

/// Set of `(source_pos, target_pos)` links, 1-based. Many-to-many links are
/// allowed; iteration is sorted.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AlignmentPairSet {
    pairs: BTreeSet<(Position, Position)>,
}

impl AlignmentPairSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, pair: (Position, Position)) -> bool {
        self.pairs.insert(pair)
    }

    pub fn contains(&self, pair: &(Position, Position)) -> bool {
        self.pairs.contains(pair)
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn iter(&self) -> btree_set::Iter<'_, (Position, Position)> {
        self.pairs.iter()
    }

    pub fn is_superset_of<'a, I>(&self, other: I) -> bool
    where
        I: IntoIterator<Item = &'a (Position, Position)>,
    {
        other.into_iter().all(|p| self.pairs.contains(p))
    }
}

impl FromIterator<(Position, Position)> for AlignmentPairSet {
    fn from_iter<I: IntoIterator<Item = (Position, Position)>>(iter: I) -> Self {
        AlignmentPairSet { pairs: iter.into_iter().collect() }
    }
}

impl<'a> IntoIterator for &'a AlignmentPairSet {
    type Item = &'a (Position, Position);
    type IntoIter = btree_set::Iter<'a, (Position, Position)>;

    fn into_iter(self) -> Self::IntoIter {
        self.pairs.iter()
    }
}

const NEIGHBOURS: [(isize, isize); 8] = [
    (-1, 0),  // up
    (1, 0),   // down
    (0, -1),  // left
    (0, 1),   // right
    (-1, -1), // up-left
    (-1, 1),  // up-right
    (1, -1),  // down-left
    (1, 1),   // down-right
];

/// Aligns `target` against `source` with `forward` (trained target <- source)
/// and `source` against `target` with `backward` (trained on the reversed
/// corpus), then merges both link sets with [`merge`].
pub fn symmetrize(
    target: &[Token],
    source: &[Token],
    forward: &TrainedModel,
    backward: &TrainedModel,
) -> AlignmentPairSet {
    let fwd: HashSet<(Position, Position)> = forward.align(target, source).pairs().collect();
    // backward links are (target_pos, source_pos); flip them into (source, target)
    let bwd: HashSet<(Position, Position)> = backward
        .align(source, target)
        .pairs()
        .map(|(j, i)| (i, j))
        .collect();
    merge(&fwd, &bwd, source.len(), target.len())
}

/// Intersection, then neighbour growth to a fixed point, then union fallback.
///
/// - Start from `forward ∩ backward`.
/// - Scan the grid source-major. For every aligned cell, look at its 8
///   neighbours; a neighbour is added when it belongs to `forward ∪ backward`
///   and its source row or its target column has no link yet. Repeat whole
///   scans until one adds nothing.
/// - Finally scan the grid once more and add every union cell whose row or
///   column is still free.
pub fn merge(
    forward: &HashSet<(Position, Position)>,
    backward: &HashSet<(Position, Position)>,
    source_len: usize,
    target_len: usize,
) -> AlignmentPairSet {
    let union: HashSet<(Position, Position)> = forward.union(backward).copied().collect();
    let mut alignment: AlignmentPairSet = forward.intersection(backward).copied().collect();

    let mut rows: HashSet<Position> = alignment.iter().map(|&(i, _)| i).collect();
    let mut cols: HashSet<Position> = alignment.iter().map(|&(_, j)| j).collect();

    let mut add = |alignment: &mut AlignmentPairSet, cell: (Position, Position)| {
        if (!rows.contains(&cell.0) || !cols.contains(&cell.1)) && union.contains(&cell) {
            alignment.insert(cell);
            rows.insert(cell.0);
            cols.insert(cell.1);
        }
    };

    loop {
        let before = alignment.len();
        for i in 1..=source_len {
            for j in 1..=target_len {
                let cell = (i as Position, j as Position);
                if !alignment.contains(&cell) {
                    continue;
                }
                for &(di, dj) in &NEIGHBOURS {
                    let ni = i as isize + di;
                    let nj = j as isize + dj;
                    if ni < 1 || nj < 1 || ni as usize > source_len || nj as usize > target_len {
                        continue;
                    }
                    add(&mut alignment, (ni as Position, nj as Position));
                }
            }
        }
        if alignment.len() == before {
            break;
        }
    }

    for i in 1..=source_len {
        for j in 1..=target_len {
            add(&mut alignment, (i as Position, j as Position));
        }
    }

    alignment
}
