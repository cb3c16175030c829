use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

use super::merge::{Batch, Sample};

/// How an arriving batch combines with what is already on screen.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase", tag = "mode")]
pub enum MergePolicy {
    /// The window shows exactly the latest payload.
    Replace,
    /// The window accumulates payloads, keeping the newest `capacity` samples.
    Append { capacity: usize },
}

impl Default for MergePolicy {
    fn default() -> Self {
        MergePolicy::Replace
    }
}

/// The visible window of one session, oldest sample first.
#[derive(Debug, Clone, Default)]
pub struct History {
    policy: MergePolicy,
    samples: VecDeque<Sample>,
}

impl History {
    pub fn new(policy: MergePolicy) -> Self {
        Self {
            policy,
            samples: VecDeque::new(),
        }
    }

    pub fn policy(&self) -> MergePolicy {
        self.policy
    }

    pub fn merge(&mut self, batch: Batch) {
        match self.policy {
            MergePolicy::Replace => {
                self.samples.clear();
                self.samples.extend(batch.samples);
            }
            MergePolicy::Append { capacity } => {
                self.samples.extend(batch.samples);
                let overflow = self.samples.len().saturating_sub(capacity);
                self.samples.drain(..overflow);
            }
        }
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn samples(&self) -> impl Iterator<Item = &Sample> + '_ {
        self.samples.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::Row;

    fn batch(timestamps: &[i64]) -> Batch {
        Batch {
            samples: timestamps
                .iter()
                .map(|&ts| Sample {
                    row: Row::new([0.0; 6], ts),
                    prediction: None,
                })
                .collect(),
            dropped: 0,
        }
    }

    fn timestamps(history: &History) -> Vec<i64> {
        history.samples().map(|s| s.row.timestamp_ms()).collect()
    }

    #[test]
    fn replace_keeps_only_the_latest_batch() {
        let mut history = History::new(MergePolicy::Replace);
        history.merge(batch(&[1, 2, 3]));
        history.merge(batch(&[4]));
        assert_eq!(timestamps(&history), vec![4]);
    }

    #[test]
    fn append_is_capped_from_the_oldest_end() {
        let mut history = History::new(MergePolicy::Append { capacity: 3 });
        history.merge(batch(&[1, 2]));
        history.merge(batch(&[3, 4]));
        assert_eq!(timestamps(&history), vec![2, 3, 4]);
        history.merge(batch(&[5, 6, 7, 8]));
        assert_eq!(timestamps(&history), vec![6, 7, 8]);
    }

    #[test]
    fn policy_reads_from_config_json() {
        let policy: MergePolicy =
            serde_json::from_str(r#"{"mode":"append","capacity":120}"#).unwrap();
        assert_eq!(policy, MergePolicy::Append { capacity: 120 });
        let policy: MergePolicy = serde_json::from_str(r#"{"mode":"replace"}"#).unwrap();
        assert_eq!(policy, MergePolicy::Replace);
    }
}
