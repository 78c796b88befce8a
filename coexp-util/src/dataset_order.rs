use crate::errors::CoexError;
use fnv::FnvHashMap as HashMap;

/// A stable, dense ordering of dataset ids for one analysis scope.
///
/// Every bit-vector in the system is addressed through one of these:
/// dataset at position `i` corresponds to bit `i`. The ordering is built
/// by sorting the ids ascending, so the same id set always yields the
/// same ordering, and it is never mutated afterwards. A vector is only
/// meaningful relative to the ordering it was encoded with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetOrder {
    ids: Vec<u64>,
    positions: HashMap<u64, usize>,
}

impl DatasetOrder {
    /// Build an ordering from a collection of dataset ids. Duplicates are
    /// collapsed; an empty collection yields a valid zero-length ordering.
    pub fn new<I>(dataset_ids: I) -> Self
    where
        I: IntoIterator<Item = u64>,
    {
        let mut ids: Vec<u64> = dataset_ids.into_iter().collect();
        ids.sort_unstable();
        ids.dedup();

        let positions = ids.iter().enumerate().map(|(i, &id)| (id, i)).collect();

        DatasetOrder { ids, positions }
    }

    /// Position of a dataset id within the ordering.
    pub fn position_of(&self, id: u64) -> Result<usize, CoexError> {
        self.positions
            .get(&id)
            .copied()
            .ok_or(CoexError::NotInOrdering(id))
    }

    /// Dataset id at a position, if the position is in range.
    pub fn id_at(&self, position: usize) -> Option<u64> {
        self.ids.get(position).copied()
    }

    pub fn contains(&self, id: u64) -> bool {
        self.positions.contains_key(&id)
    }

    /// All ids, ascending.
    pub fn ids(&self) -> &[u64] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Number of bytes a bit-vector over this ordering occupies.
    pub fn num_bytes(&self) -> usize {
        self.ids.len().div_ceil(8)
    }
}
