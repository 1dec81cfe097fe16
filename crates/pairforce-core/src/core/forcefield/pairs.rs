use super::exceptions::ExceptionTable;
use crate::core::utils::geometry::separation;
use nalgebra::{Point3, Vector3};

/// Candidate particle pairs for cutoff evaluation.
///
/// Lists are trusted: the interaction does not re-check them against the
/// exception table, so a list must not contain excepted pairs. Lists from
/// [`NeighborList::build`] never do; [`NeighborList::without_exceptions`]
/// sanitizes one that came from elsewhere.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NeighborList {
    pairs: Vec<(usize, usize)>,
}

impl NeighborList {
    pub fn from_pairs(pairs: Vec<(usize, usize)>) -> Self {
        Self { pairs }
    }

    /// All non-excepted pairs closer than `cutoff`, using the minimum image
    /// when a periodic box is given.
    pub fn build(
        positions: &[Point3<f64>],
        cutoff: f64,
        periodic_box: Option<&Vector3<f64>>,
        exceptions: &ExceptionTable,
    ) -> Self {
        let cutoff2 = cutoff * cutoff;
        let mut pairs = Vec::new();
        for (i, pos_i) in positions.iter().enumerate() {
            for (j, pos_j) in positions.iter().enumerate().skip(i + 1) {
                if exceptions.contains(i, j) {
                    continue;
                }
                if separation(pos_i, pos_j, periodic_box).r2 < cutoff2 {
                    pairs.push((i, j));
                }
            }
        }
        Self { pairs }
    }

    pub fn without_exceptions(&self, exceptions: &ExceptionTable) -> Self {
        Self {
            pairs: self
                .pairs
                .iter()
                .copied()
                .filter(|&(i, j)| !exceptions.contains(i, j))
                .collect(),
        }
    }

    pub fn pairs(&self) -> &[(usize, usize)] {
        &self.pairs
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

/// Where the generic pass draws its pairs from.
#[derive(Debug, Clone, Copy)]
pub enum PairSource<'a> {
    NeighborList(&'a NeighborList),
    Exhaustive {
        num_particles: usize,
        exceptions: &'a ExceptionTable,
    },
}

impl<'a> PairSource<'a> {
    pub fn pairs(self) -> Pairs<'a> {
        match self {
            PairSource::NeighborList(list) => Pairs::Listed(list.pairs.iter()),
            PairSource::Exhaustive {
                num_particles,
                exceptions,
            } => Pairs::Exhaustive(ExhaustivePairs::new(num_particles, exceptions)),
        }
    }
}

pub enum Pairs<'a> {
    Listed(std::slice::Iter<'a, (usize, usize)>),
    Exhaustive(ExhaustivePairs<'a>),
}

impl Iterator for Pairs<'_> {
    type Item = (usize, usize);

    #[inline]
    fn next(&mut self) -> Option<Self::Item> {
        match self {
            Pairs::Listed(iter) => iter.next().copied(),
            Pairs::Exhaustive(iter) => iter.next(),
        }
    }
}

/// Every `(i, j)` with `i < j`, skipping pairs that have an exception entry.
///
/// `marker[j] == Some(i)` means `j` is excepted against the current `i`; the
/// marker is refreshed each time `i` advances.
pub struct ExhaustivePairs<'a> {
    num_particles: usize,
    exceptions: &'a ExceptionTable,
    marker: Vec<Option<usize>>,
    i: usize,
    j: usize,
}

impl<'a> ExhaustivePairs<'a> {
    fn new(num_particles: usize, exceptions: &'a ExceptionTable) -> Self {
        let mut pairs = Self {
            num_particles,
            exceptions,
            marker: vec![None; num_particles],
            i: 0,
            j: 1,
        };
        if num_particles > 0 {
            pairs.mark_partners();
        }
        pairs
    }

    fn mark_partners(&mut self) {
        let exceptions = self.exceptions;
        for &partner in exceptions.partners(self.i) {
            if let Some(slot) = self.marker.get_mut(partner) {
                *slot = Some(self.i);
            }
        }
    }
}

impl Iterator for ExhaustivePairs<'_> {
    type Item = (usize, usize);

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if self.i >= self.num_particles {
                return None;
            }
            if self.j >= self.num_particles {
                self.i += 1;
                self.j = self.i + 1;
                if self.i < self.num_particles {
                    self.mark_partners();
                }
                continue;
            }
            let j = self.j;
            self.j += 1;
            if self.marker[j] != Some(self.i) {
                return Some((self.i, j));
            }
        }
    }
}
