/// What an exception does to its particle pair.
#[derive(Debug, Clone, PartialEq)]
pub enum PairOverride {
    /// No interaction at all between the pair.
    Excluded,
    /// Already-combined parameter values, bypassing the combining rules.
    Override(Vec<f64>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExceptionPair {
    pub particle1: usize,
    pub particle2: usize,
    pub kind: PairOverride,
}

/// Validated exception table. Every unordered pair appears at most once and
/// both indices are known to be in range.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExceptionTable {
    entries: Vec<ExceptionPair>,
    partners: Vec<Vec<usize>>,
}

impl ExceptionTable {
    pub fn new(num_particles: usize) -> Self {
        Self {
            entries: Vec::new(),
            partners: vec![Vec::new(); num_particles],
        }
    }

    pub(crate) fn push(&mut self, particle1: usize, particle2: usize, kind: PairOverride) {
        self.partners[particle1].push(particle2);
        self.partners[particle2].push(particle1);
        self.entries.push(ExceptionPair {
            particle1,
            particle2,
            kind,
        });
    }

    #[inline]
    pub fn num_particles(&self) -> usize {
        self.partners.len()
    }

    pub fn entries(&self) -> &[ExceptionPair] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Particles that share an exception entry with `particle`, in either direction.
    #[inline]
    pub fn partners(&self, particle: usize) -> &[usize] {
        self.partners.get(particle).map_or(&[], Vec::as_slice)
    }

    pub fn contains(&self, a: usize, b: usize) -> bool {
        self.partners(a).contains(&b)
    }

    /// Entries carrying explicit parameters, as `(particle1, particle2, parameters)`.
    pub fn overrides(&self) -> impl Iterator<Item = (usize, usize, &[f64])> + '_ {
        self.entries.iter().filter_map(|e| match &e.kind {
            PairOverride::Override(values) => Some((e.particle1, e.particle2, values.as_slice())),
            PairOverride::Excluded => None,
        })
    }

    pub fn num_overrides(&self) -> usize {
        self.overrides().count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_table() -> ExceptionTable {
        let mut table = ExceptionTable::new(4);
        table.push(0, 2, PairOverride::Excluded);
        table.push(3, 1, PairOverride::Override(vec![2.0]));
        table
    }

    #[test]
    fn partners_are_recorded_symmetrically() {
        let table = sample_table();
        assert_eq!(table.partners(0), &[2]);
        assert_eq!(table.partners(2), &[0]);
        assert_eq!(table.partners(1), &[3]);
        assert!(table.contains(1, 3));
        assert!(table.contains(3, 1));
        assert!(!table.contains(0, 1));
    }

    #[test]
    fn overrides_skips_pure_exclusions() {
        let table = sample_table();
        let overrides: Vec<_> = table.overrides().collect();
        assert_eq!(overrides, vec![(3, 1, [2.0].as_slice())]);
        assert_eq!(table.num_overrides(), 1);
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn partners_of_unknown_particle_is_empty() {
        let table = sample_table();
        assert!(table.partners(10).is_empty());
    }
}
