use crate::host::Host;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchPlan {
    pub host_count: usize,
    pub batch_size: usize,
    pub batches: Vec<Batch>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Batch {
    pub index: usize, // 0-based
    pub hosts: Vec<Host>,
}

impl Batch {
    pub fn len(&self) -> usize {
        self.hosts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hosts.is_empty()
    }
}

impl BatchPlan {
    /// Slices `hosts` in order into batches of at most `batch_size` (at least 1).
    pub fn partition(hosts: &[Host], batch_size: usize) -> BatchPlan {
        let batch_size = batch_size.max(1);
        let batches = hosts
            .chunks(batch_size)
            .enumerate()
            .map(|(index, chunk)| Batch {
                index,
                hosts: chunk.to_vec(),
            })
            .collect();

        BatchPlan {
            host_count: hosts.len(),
            batch_size,
            batches,
        }
    }
}
