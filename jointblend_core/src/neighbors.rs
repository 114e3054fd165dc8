//! Nearest-neighbor selection over a pose dataset.

use crate::dataset::PoseDataset;
use crate::error::{InterpolationError, Result};
use jointblend_env::{EulerAngles, SamplePoint};
use tracing::trace;

/// A dataset entry selected by [`find_nearest`], borrowing its rotations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor<'a> {
    pub position: SamplePoint,
    pub rotations: &'a [EulerAngles],

    /// Euclidean distance to the query target
    pub distance: f64,
}

impl<'a> Neighbor<'a> {
    pub fn new(position: SamplePoint, rotations: &'a [EulerAngles], distance: f64) -> Self {
        Self {
            position,
            rotations,
            distance,
        }
    }

    /// Rotation recorded for `joint_index`.
    pub fn rotation(&self, joint_index: usize) -> Result<&'a EulerAngles> {
        self.rotations
            .get(joint_index)
            .ok_or(InterpolationError::JointIndexOutOfRange {
                joint_index,
                available: self.rotations.len(),
            })
    }
}

/// Neighbors sorted by ascending distance to the query target.
pub type NeighborSet<'a> = Vec<Neighbor<'a>>;

/// Returns the `k` entries closest to `target`, nearest first.
///
/// Equal distances keep the dataset's insertion order. An empty dataset (or
/// `k == 0`) gives an empty set.
pub fn find_nearest<'a>(dataset: &'a PoseDataset, target: &SamplePoint, k: usize) -> NeighborSet<'a> {
    let mut neighbors: NeighborSet<'a> = dataset
        .iter()
        .map(|entry| {
            let distance = nalgebra::distance(&entry.position, target);
            Neighbor::new(entry.position, &entry.rotations, distance)
        })
        .collect();

    // Stable sort, so ties stay in insertion order
    neighbors.sort_by(|a, b| a.distance.total_cmp(&b.distance));
    neighbors.truncate(k);

    trace!(
        "find_nearest: target=({:.3}, {:.3}, {:.3}) k={} dataset={} -> {}",
        target.x,
        target.y,
        target.z,
        k,
        dataset.len(),
        neighbors.len()
    );

    neighbors
}

#[cfg(test)]
mod tests {
    use super::*;
    use jointblend_env::JointRotationSet;

    fn line_dataset(n: usize) -> PoseDataset {
        (0..n)
            .map(|i| {
                let rotations: JointRotationSet = vec![EulerAngles::new(i as f64, 0.0, 0.0)];
                (SamplePoint::new(i as f64, 0.0, 0.0), rotations)
            })
            .collect()
    }

    #[test]
    fn test_three_nearest_on_a_line() {
        let dataset = line_dataset(6);
        let result = find_nearest(&dataset, &SamplePoint::origin(), 3);

        let keys: Vec<SamplePoint> = result.iter().map(|n| n.position).collect();
        assert_eq!(
            keys,
            vec![
                SamplePoint::new(0.0, 0.0, 0.0),
                SamplePoint::new(1.0, 0.0, 0.0),
                SamplePoint::new(2.0, 0.0, 0.0),
            ]
        );
    }

    #[test]
    fn test_results_sorted_by_distance() {
        let dataset = line_dataset(6);
        let result = find_nearest(&dataset, &SamplePoint::new(3.4, 1.0, 0.0), 6);

        assert_eq!(result.len(), 6);
        assert!(result.windows(2).all(|w| w[0].distance <= w[1].distance));
        assert_eq!(result[0].position.x, 3.0);
    }

    #[test]
    fn test_k_larger_than_dataset() {
        let dataset = line_dataset(2);
        assert_eq!(find_nearest(&dataset, &SamplePoint::origin(), 5).len(), 2);
    }

    #[test]
    fn test_ties_keep_insertion_order() {
        let dataset: PoseDataset = vec![
            (SamplePoint::new(1.0, 0.0, 0.0), vec![EulerAngles::new(1.0, 0.0, 0.0)]),
            (SamplePoint::new(-1.0, 0.0, 0.0), vec![EulerAngles::new(2.0, 0.0, 0.0)]),
            (SamplePoint::new(0.0, 1.0, 0.0), vec![EulerAngles::new(3.0, 0.0, 0.0)]),
        ]
        .into_iter()
        .collect();

        let result = find_nearest(&dataset, &SamplePoint::origin(), 3);
        let xs: Vec<f64> = result.iter().map(|n| n.rotations[0].x).collect();
        assert_eq!(xs, vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_empty_dataset_gives_empty_set() {
        let dataset = PoseDataset::new();
        assert!(find_nearest(&dataset, &SamplePoint::origin(), 5).is_empty());
    }

    #[test]
    fn test_rotation_out_of_range() {
        let dataset = line_dataset(1);
        let result = find_nearest(&dataset, &SamplePoint::origin(), 1);

        assert!(result[0].rotation(0).is_ok());
        assert_eq!(
            result[0].rotation(3),
            Err(InterpolationError::JointIndexOutOfRange {
                joint_index: 3,
                available: 1
            })
        );
    }
}
