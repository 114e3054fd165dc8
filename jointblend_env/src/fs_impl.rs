//! Filesystem-backed dataset source and recorder.

use crate::error::EnvError;
use crate::record_format::{format_record, parse_record};
use crate::source::{PoseRecorder, PoseSource};
use crate::types::PoseRecord;
use std::fs;
use std::path::{Path, PathBuf};

/// Reads every `*.txt` record in a folder.
///
/// Files are read in file-name order so repeated loads build the same
/// dataset.
#[derive(Debug, Clone)]
pub struct DirectorySource {
    folder: PathBuf,
}

impl DirectorySource {
    pub fn new(folder: impl Into<PathBuf>) -> Self {
        Self {
            folder: folder.into(),
        }
    }

    pub fn folder(&self) -> &Path {
        &self.folder
    }

    /// Lists the record files, sorted by name.
    pub fn record_files(&self) -> Result<Vec<PathBuf>, EnvError> {
        if !self.folder.is_dir() {
            return Err(EnvError::NotADirectory(self.folder.clone()));
        }

        let entries = fs::read_dir(&self.folder).map_err(|e| EnvError::io(&self.folder, e))?;

        let mut files = Vec::new();
        for entry in entries {
            let path = entry.map_err(|e| EnvError::io(&self.folder, e))?.path();
            let is_txt = path.extension().map(|ext| ext == "txt").unwrap_or(false);
            if is_txt && path.is_file() {
                files.push(path);
            }
        }
        files.sort();
        Ok(files)
    }
}

impl PoseSource for DirectorySource {
    fn load(&self) -> Result<Vec<PoseRecord>, EnvError> {
        let files = self.record_files()?;
        let mut records = Vec::with_capacity(files.len());

        for path in files {
            let text = fs::read_to_string(&path).map_err(|e| EnvError::io(&path, e))?;
            let record = parse_record(&text)?;
            tracing::trace!(file = %path.display(), joints = record.joints.len(), "loaded record");
            records.push(record);
        }

        tracing::debug!(
            folder = %self.folder.display(),
            records = records.len(),
            "loaded pose records"
        );
        Ok(records)
    }
}

/// Writes each appended record to its own file in a folder.
///
/// File names encode the target position with three decimals; an existing
/// file for the same position is replaced.
#[derive(Debug, Clone)]
pub struct DirectoryRecorder {
    folder: PathBuf,
}

impl DirectoryRecorder {
    /// Creates the recorder, creating the folder if needed.
    pub fn create(folder: impl Into<PathBuf>) -> Result<Self, EnvError> {
        let folder = folder.into();
        fs::create_dir_all(&folder).map_err(|e| EnvError::io(&folder, e))?;
        Ok(Self { folder })
    }

    /// Path the given record is written to.
    pub fn path_for(&self, record: &PoseRecord) -> PathBuf {
        self.folder.join(format!(
            "RecordedTransforms_X{:.3}_Y{:.3}_Z{:.3}.txt",
            record.target.x, record.target.y, record.target.z
        ))
    }
}

impl PoseRecorder for DirectoryRecorder {
    fn append(&mut self, record: &PoseRecord) -> Result<(), EnvError> {
        let path = self.path_for(record);
        if path.exists() {
            tracing::debug!(file = %path.display(), "replacing existing record");
        }
        fs::write(&path, format_record(record)).map_err(|e| EnvError::io(&path, e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EulerAngles, SamplePoint};

    fn record_at(x: f64, angle: f64) -> PoseRecord {
        PoseRecord::new(SamplePoint::new(x, 0.86, 0.0))
            .with_joint("Link1", EulerAngles::new(angle, 0.0, 0.0))
            .with_joint("Link2", EulerAngles::new(0.0, angle, 0.0))
    }

    #[test]
    fn test_recorder_then_source() {
        let dir = tempfile::tempdir().unwrap();
        let mut recorder = DirectoryRecorder::create(dir.path()).unwrap();

        recorder.append(&record_at(0.5, 10.0)).unwrap();
        recorder.append(&record_at(-0.25, 20.0)).unwrap();

        let records = DirectorySource::new(dir.path()).load().unwrap();
        assert_eq!(records.len(), 2);

        // Sorted by file name: X-0.250 sorts before X0.500
        assert_eq!(records[0], record_at(-0.25, 20.0));
        assert_eq!(records[1], record_at(0.5, 10.0));
    }

    #[test]
    fn test_recorder_replaces_same_position() {
        let dir = tempfile::tempdir().unwrap();
        let mut recorder = DirectoryRecorder::create(dir.path()).unwrap();

        recorder.append(&record_at(1.0, 10.0)).unwrap();
        recorder.append(&record_at(1.0, 45.0)).unwrap();

        let records = DirectorySource::new(dir.path()).load().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].joints[0].rotation.x, 45.0);
    }

    #[test]
    fn test_source_ignores_other_files() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("notes.md"), "not a record").unwrap();

        let records = DirectorySource::new(dir.path()).load().unwrap();
        assert!(records.is_empty());
    }

    #[test]
    fn test_missing_folder() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");

        let err = DirectorySource::new(&missing).load().unwrap_err();
        assert!(matches!(err, EnvError::NotADirectory(_)));
    }
}
