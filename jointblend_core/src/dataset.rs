//! The recorded pose dataset.
//!
//! Maps each sample position to its per-joint rotation table. Entries keep
//! insertion order, which is the tie-break order for nearest-neighbor
//! queries. The dataset is owned by the caller and only borrowed by the
//! engine, so it can be shared read-only across threads.

use jointblend_env::{EulerAngles, JointRotationSet, PoseRecord, SamplePoint};
use std::collections::HashMap;

/// One sample: a position and its joint rotations.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetEntry {
    pub position: SamplePoint,
    pub rotations: JointRotationSet,
}

/// Insertion-ordered mapping from sample position to joint rotations.
#[derive(Debug, Clone, Default)]
pub struct PoseDataset {
    entries: Vec<DatasetEntry>,

    /// Exact-coordinate key -> index into `entries`
    index: HashMap<[u64; 3], usize>,

    /// Optional joint names, in joint order
    joint_names: Vec<String>,
}

impl PoseDataset {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a dataset from recorded poses.
    ///
    /// Joint names are taken from the first record that has any. Records at
    /// a position already seen replace the earlier rotations.
    pub fn from_records<'a, I>(records: I) -> Self
    where
        I: IntoIterator<Item = &'a PoseRecord>,
    {
        let mut dataset = Self::new();
        for record in records {
            if dataset.joint_names.is_empty() && !record.joints.is_empty() {
                dataset.joint_names = record.joint_names();
            }
            dataset.insert(record.target, record.rotation_set());
        }
        dataset
    }

    /// Sets the joint names.
    pub fn with_joint_names(mut self, names: Vec<String>) -> Self {
        self.joint_names = names;
        self
    }

    /// Inserts a sample.
    ///
    /// If the position already exists its rotations are replaced in place
    /// (keeping the original insertion slot) and the old table is returned.
    pub fn insert(&mut self, position: SamplePoint, rotations: JointRotationSet) -> Option<JointRotationSet> {
        let key = position_key(&position);
        match self.index.get(&key) {
            Some(&slot) => Some(std::mem::replace(&mut self.entries[slot].rotations, rotations)),
            None => {
                self.index.insert(key, self.entries.len());
                self.entries.push(DatasetEntry { position, rotations });
                None
            }
        }
    }

    /// Looks up the rotations recorded at exactly `position`.
    pub fn get(&self, position: &SamplePoint) -> Option<&[EulerAngles]> {
        self.index
            .get(&position_key(position))
            .map(|&slot| self.entries[slot].rotations.as_slice())
    }

    /// Returns a copy of the dataset without the entry at `slot`.
    ///
    /// Used for leave-one-out evaluation.
    pub fn excluding(&self, slot: usize) -> Self {
        let mut rest = Self::new().with_joint_names(self.joint_names.clone());
        for (i, entry) in self.entries.iter().enumerate() {
            if i != slot {
                rest.insert(entry.position, entry.rotations.clone());
            }
        }
        rest
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterates entries in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &DatasetEntry> {
        self.entries.iter()
    }

    pub fn entries(&self) -> &[DatasetEntry] {
        &self.entries
    }

    pub fn joint_names(&self) -> &[String] {
        &self.joint_names
    }

    /// Number of joints every entry can answer for.
    ///
    /// This is the shortest rotation table in the dataset (0 when empty),
    /// so indexing below it never fails.
    pub fn joint_count(&self) -> usize {
        self.entries
            .iter()
            .map(|e| e.rotations.len())
            .min()
            .unwrap_or(0)
    }

    /// Longest rotation table in the dataset (0 when empty).
    pub fn max_joint_count(&self) -> usize {
        self.entries
            .iter()
            .map(|e| e.rotations.len())
            .max()
            .unwrap_or(0)
    }

    /// True when every entry has the same number of joints.
    pub fn is_uniform(&self) -> bool {
        let mut lengths = self.entries.iter().map(|e| e.rotations.len());
        match lengths.next() {
            Some(first) => lengths.all(|len| len == first),
            None => true,
        }
    }
}

impl FromIterator<(SamplePoint, JointRotationSet)> for PoseDataset {
    fn from_iter<T: IntoIterator<Item = (SamplePoint, JointRotationSet)>>(iter: T) -> Self {
        let mut dataset = Self::new();
        for (position, rotations) in iter {
            dataset.insert(position, rotations);
        }
        dataset
    }
}

/// Exact-value hash key for a position. `-0.0` and `0.0` share a key.
fn position_key(p: &SamplePoint) -> [u64; 3] {
    let bits = |v: f64| if v == 0.0 { 0u64 } else { v.to_bits() };
    [bits(p.x), bits(p.y), bits(p.z)]
}
