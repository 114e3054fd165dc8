//! Synthetic calibration grid.
//!
//! Stands in for the recording rig: samples a smooth joint-angle model at
//! every point of the calibration grid, optionally adding seeded Gaussian
//! noise so runs are reproducible from a single `u64`.

use jointblend_core::PoseDataset;
use jointblend_env::{EulerAngles, JointRotationSet, PoseRecord, SamplePoint};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};

/// Target X positions the rig records at.
pub const GRID_X: [f64; 8] = [-0.55, -0.4, -0.25, -0.1, 0.25, 0.5, 0.75, 1.0];

/// Target Y positions (heights).
pub const GRID_Y: [f64; 6] = [0.86, 1.0, 1.25, 1.5, 1.75, 2.0];

/// Target Z positions (depths).
pub const GRID_Z: [f64; 3] = [0.0, 0.5, 1.25];

/// Joints driven by the model, in joint-index order.
pub const JOINT_NAMES: [&str; 4] = ["Base", "Shoulder", "Elbow", "Wrist"];

/// Noise-free joint angles (degrees) at `target`.
///
/// Every angle is an affine function of the target, kept small enough that
/// neighboring grid samples differ by a few degrees.
pub fn model_rotations(target: &SamplePoint) -> JointRotationSet {
    let (x, y, z) = (target.x, target.y - 1.4, target.z);
    vec![
        EulerAngles::new(0.0, 12.0 * x, 0.0),
        EulerAngles::new(15.0 * y + 6.0 * z, 0.0, 4.0 * x),
        EulerAngles::new(-20.0 * y + 8.0 * z, 3.0 * x, 0.0),
        EulerAngles::new(5.0 * x, 6.0 * z, -10.0 * y),
    ]
}

/// Deterministic generator for the calibration grid.
pub struct CalibrationGrid {
    seed: u64,
    rng: ChaCha8Rng,

    /// Per-angle noise in degrees, if any
    noise: Option<Normal<f64>>,
}

impl CalibrationGrid {
    pub fn new(seed: u64) -> Self {
        Self {
            seed,
            rng: ChaCha8Rng::seed_from_u64(seed),
            noise: None,
        }
    }

    /// Adds Gaussian noise with standard deviation `std_deg` to every angle.
    ///
    /// Zero, negative or non-finite values disable noise.
    pub fn with_noise(mut self, std_deg: f64) -> Self {
        self.noise = if std_deg > 0.0 {
            Normal::new(0.0, std_deg).ok()
        } else {
            None
        };
        self
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn joint_count(&self) -> usize {
        JOINT_NAMES.len()
    }

    pub fn joint_names(&self) -> Vec<String> {
        JOINT_NAMES.iter().map(|n| n.to_string()).collect()
    }

    /// All grid points, X fastest, then Z, then Y.
    pub fn sample_points() -> Vec<SamplePoint> {
        let mut points = Vec::with_capacity(GRID_X.len() * GRID_Y.len() * GRID_Z.len());
        for &y in &GRID_Y {
            for &z in &GRID_Z {
                for &x in &GRID_X {
                    points.push(SamplePoint::new(x, y, z));
                }
            }
        }
        points
    }

    /// One record per grid point, with noise applied.
    pub fn records(&mut self) -> Vec<PoseRecord> {
        Self::sample_points()
            .into_iter()
            .map(|target| {
                let rotations = model_rotations(&target);
                JOINT_NAMES
                    .iter()
                    .zip(rotations)
                    .fold(PoseRecord::new(target), |record, (name, angles)| {
                        record.with_joint(*name, self.perturb(angles))
                    })
            })
            .collect()
    }

    /// The grid as a dataset, joint names included.
    pub fn dataset(&mut self) -> PoseDataset {
        PoseDataset::from_records(&self.records())
    }

    /// Uniform random target inside the grid's bounding box.
    pub fn random_target(&mut self) -> SamplePoint {
        SamplePoint::new(
            self.rng.gen_range(GRID_X[0]..=GRID_X[GRID_X.len() - 1]),
            self.rng.gen_range(GRID_Y[0]..=GRID_Y[GRID_Y.len() - 1]),
            self.rng.gen_range(GRID_Z[0]..=GRID_Z[GRID_Z.len() - 1]),
        )
    }

    fn perturb(&mut self, angles: EulerAngles) -> EulerAngles {
        match &self.noise {
            Some(normal) => EulerAngles::new(
                angles.x + normal.sample(&mut self.rng),
                angles.y + normal.sample(&mut self.rng),
                angles.z + normal.sample(&mut self.rng),
            ),
            None => angles,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_grid_covers_every_point() {
        let mut grid = CalibrationGrid::new(42);
        let dataset = grid.dataset();

        assert_eq!(dataset.len(), 8 * 6 * 3);
        assert_eq!(dataset.joint_count(), 4);
        assert!(dataset.is_uniform());
        assert_eq!(dataset.joint_names()[1], "Shoulder");
    }

    #[test]
    fn test_noise_free_matches_model() {
        let mut grid = CalibrationGrid::new(1);
        for record in grid.records() {
            assert_eq!(record.rotation_set(), model_rotations(&record.target));
        }
    }

    #[test]
    fn test_same_seed_same_noise() {
        let a = CalibrationGrid::new(7).with_noise(0.5).records();
        let b = CalibrationGrid::new(7).with_noise(0.5).records();
        let c = CalibrationGrid::new(8).with_noise(0.5).records();

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_invalid_noise_disables_noise() {
        let mut grid = CalibrationGrid::new(3).with_noise(-1.0);
        let record = &grid.records()[0];
        assert_eq!(record.rotation_set(), model_rotations(&record.target));
    }

    proptest! {
        #[test]
        fn prop_random_targets_stay_in_bounds(seed in any::<u64>()) {
            let mut grid = CalibrationGrid::new(seed);
            for _ in 0..16 {
                let t = grid.random_target();
                prop_assert!((GRID_X[0]..=GRID_X[7]).contains(&t.x));
                prop_assert!((GRID_Y[0]..=GRID_Y[5]).contains(&t.y));
                prop_assert!((GRID_Z[0]..=GRID_Z[2]).contains(&t.z));
            }
        }
    }
}
