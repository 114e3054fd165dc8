//! Engine test scenarios.

/// Scenario identifiers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScenarioId {
    /// JB-001: Two samples, target halfway between them
    Midpoint,

    /// JB-002: Random targets on the calibration grid vs the true model
    GridSweep,

    /// JB-003: Hold out each grid sample and predict it from the rest
    LeaveOneOut,

    /// JB-004: Near-coincident samples make the RBF system singular
    DuplicateSamples,

    /// JB-005: Solving against an empty dataset
    EmptyDataset,

    /// JB-006: Per-pose solve time stays under the control-tick budget
    Latency,
}

impl ScenarioId {
    /// Returns a list of all scenarios.
    pub fn all() -> Vec<ScenarioId> {
        vec![
            ScenarioId::Midpoint,
            ScenarioId::GridSweep,
            ScenarioId::LeaveOneOut,
            ScenarioId::DuplicateSamples,
            ScenarioId::EmptyDataset,
            ScenarioId::Latency,
        ]
    }

    /// Returns the scenario name.
    pub fn name(&self) -> &'static str {
        match self {
            ScenarioId::Midpoint => "midpoint",
            ScenarioId::GridSweep => "grid_sweep",
            ScenarioId::LeaveOneOut => "leave_one_out",
            ScenarioId::DuplicateSamples => "duplicate_samples",
            ScenarioId::EmptyDataset => "empty_dataset",
            ScenarioId::Latency => "latency",
        }
    }

    /// Returns a description of the scenario.
    pub fn description(&self) -> &'static str {
        match self {
            ScenarioId::Midpoint => "IDW and RBF halfway between 0° and 90° about X land near 45°",
            ScenarioId::GridSweep => "Random targets inside the grid stay close to the true joint model",
            ScenarioId::LeaveOneOut => "Every grid sample is predicted from the others",
            ScenarioId::DuplicateSamples => "Coincident samples report SingularSystem, IDW fallback recovers",
            ScenarioId::EmptyDataset => "No samples gives identity rotations, never a panic",
            ScenarioId::Latency => "Each pose solves in under 30 ms",
        }
    }

    /// Returns true if the scenario needs the synthetic model as ground truth.
    pub fn needs_model(&self) -> bool {
        matches!(self, ScenarioId::GridSweep)
    }
}

impl std::fmt::Display for ScenarioId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for ScenarioId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "midpoint" | "jb-001" => Ok(ScenarioId::Midpoint),
            "grid_sweep" | "gridsweep" | "jb-002" => Ok(ScenarioId::GridSweep),
            "leave_one_out" | "loo" | "jb-003" => Ok(ScenarioId::LeaveOneOut),
            "duplicate_samples" | "duplicates" | "jb-004" => Ok(ScenarioId::DuplicateSamples),
            "empty_dataset" | "empty" | "jb-005" => Ok(ScenarioId::EmptyDataset),
            "latency" | "jb-006" => Ok(ScenarioId::Latency),
            _ => Err(format!("Unknown scenario: {}", s)),
        }
    }
}
