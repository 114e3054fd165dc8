//! Dataset input and persistence abstractions.

use crate::error::EnvError;
use crate::types::PoseRecord;

/// Supplies recorded poses to the engine.
///
/// # Implementations
///
/// - **Filesystem**: `DirectorySource` - one text record per `*.txt` file
/// - **Tests/simulation**: any `Vec<PoseRecord>` (see the blanket impl)
pub trait PoseSource {
    /// Loads every available record.
    ///
    /// Duplicate target positions are allowed here; the dataset built from
    /// the records keeps the last one.
    fn load(&self) -> Result<Vec<PoseRecord>, EnvError>;
}

impl PoseSource for Vec<PoseRecord> {
    fn load(&self) -> Result<Vec<PoseRecord>, EnvError> {
        Ok(self.clone())
    }
}

/// Persists recorded poses, one record per call.
pub trait PoseRecorder {
    /// Appends one record.
    fn append(&mut self, record: &PoseRecord) -> Result<(), EnvError>;
}

/// In-memory recorder, mostly for tests and dry runs.
#[derive(Debug, Default, Clone)]
pub struct MemoryRecorder {
    pub records: Vec<PoseRecord>,
}

impl MemoryRecorder {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PoseRecorder for MemoryRecorder {
    fn append(&mut self, record: &PoseRecord) -> Result<(), EnvError> {
        self.records.push(record.clone());
        Ok(())
    }
}
