//! Static partitioning of dispatch entries across workers.

use serde::{Deserialize, Serialize};

/// How entries are grouped into worker tasks.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum Partition {
    /// One task per entry.
    #[default]
    PerEntry,
    /// `n` tasks over contiguous runs of entries.
    Chunks(usize),
    /// `n` tasks, entry `i` going to task `i % n`.
    RoundRobin(usize),
}

impl Partition {
    /// Split `0..len` into non-empty groups. Every index appears exactly once.
    pub fn assign(&self, len: usize) -> Vec<Vec<usize>> {
        let groups: Vec<Vec<usize>> = match *self {
            Partition::PerEntry => (0..len).map(|i| vec![i]).collect(),
            Partition::Chunks(n) => {
                let size = len.div_ceil(n.max(1)).max(1);
                (0..len)
                    .collect::<Vec<_>>()
                    .chunks(size)
                    .map(<[usize]>::to_vec)
                    .collect()
            }
            Partition::RoundRobin(n) => {
                let n = n.max(1);
                let mut groups = vec![Vec::new(); n];
                for i in 0..len {
                    groups[i % n].push(i);
                }
                groups
            }
        };
        groups.into_iter().filter(|g| !g.is_empty()).collect()
    }
}
