use crate::error::{Error, Result};
use crate::types::{Global, Rank, Scalar, Size};

use std::collections::HashMap;

/// Assignment of global indices `0..size` to the workers of a group.
///
/// Every index is owned by exactly one worker. Within a worker the order of
/// the ids is the order of its local rows.
#[derive(Debug, Clone, PartialEq)]
pub struct Partition {
    size: Global,
    parts: Vec<Vec<Global>>,
}

impl Partition {
    /// Validates an explicit assignment: the parts must cover `0..size` with
    /// no index owned twice.
    pub fn new(size: Global, parts: Vec<Vec<Global>>) -> Result<Self> {
        if size < 0 || size > Global::from(Size::MAX) {
            return Err(Error::InvalidPartition(format!(
                "global size {} does not fit the wire",
                size
            )));
        }

        let mut owner: HashMap<Global, Rank> = HashMap::new();
        for (rank, part) in parts.iter().enumerate() {
            for &id in part {
                if id < 0 || id >= size {
                    return Err(Error::InvalidPartition(format!(
                        "worker {} owns {} outside 0..{}",
                        rank, id, size
                    )));
                }
                if let Some(first) = owner.insert(id, rank) {
                    return Err(Error::InvalidPartition(format!(
                        "index {} owned by workers {} and {}",
                        id, first, rank
                    )));
                }
            }
        }

        if owner.len() as Global != size {
            return Err(Error::InvalidPartition(format!(
                "parts cover {} of {} indices",
                owner.len(),
                size
            )));
        }

        Ok(Self { size, parts })
    }

    /// Splits `0..size` into `group_size` consecutive blocks. The first
    /// `size % group_size` workers take one extra index.
    pub fn contiguous(size: Global, group_size: usize) -> Result<Self> {
        if group_size == 0 {
            return Err(Error::InvalidPartition("empty group".to_string()));
        }

        let total = usize::try_from(size)
            .map_err(|_| Error::InvalidPartition(format!("negative global size {}", size)))?;
        let base = total / group_size;
        let remainder = total % group_size;

        let mut parts = Vec::with_capacity(group_size);
        let mut start = 0;
        for rank in 0..group_size {
            let len = base + usize::from(rank < remainder);
            parts.push((start..start + len).map(|id| id as Global).collect());
            start += len;
        }

        Self::new(size, parts)
    }

    pub fn size(&self) -> Global {
        self.size
    }

    pub fn group_size(&self) -> usize {
        self.parts.len()
    }

    /// Number of indices each worker owns, as scattered on the wire.
    pub fn counts(&self) -> Vec<Size> {
        self.parts.iter().map(|part| part.len() as Size).collect()
    }

    pub fn part(&self, rank: Rank) -> Option<&[Global]> {
        self.parts.get(rank).map(Vec::as_slice)
    }

    pub fn parts(&self) -> &[Vec<Global>] {
        &self.parts
    }

    pub fn owner_of(&self, id: Global) -> Option<Rank> {
        self.parts.iter().position(|part| part.contains(&id))
    }

    /// Reorders per-worker values (each in local-row order) into global-index order.
    pub fn assemble(&self, per_worker: &[Vec<Scalar>]) -> Result<Vec<Scalar>> {
        if per_worker.len() != self.parts.len() {
            return Err(Error::InvalidArgument(format!(
                "expected values from {} workers, got {}",
                self.parts.len(),
                per_worker.len()
            )));
        }

        let mut assembled = vec![0.0; self.size as usize];
        for (rank, (part, values)) in self.parts.iter().zip(per_worker).enumerate() {
            if part.len() != values.len() {
                return Err(Error::InvalidArgument(format!(
                    "worker {} owns {} indices but returned {} values",
                    rank,
                    part.len(),
                    values.len()
                )));
            }
            for (&id, &value) in part.iter().zip(values) {
                assembled[id as usize] = value;
            }
        }

        Ok(assembled)
    }
}
