//! Prediction CSV writer.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument};

use crate::IoError;

/// Writes per-record positive-class probabilities as an `ID,Label` CSV.
pub struct PredictionWriter {
    path: PathBuf,
}

impl PredictionWriter {
    /// Create a writer targeting `path`. Nothing is touched until [`write`](Self::write).
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    /// Write one `ID,Label` row per record, in the order given.
    ///
    /// Creates missing parent directories and overwrites an existing file.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`IoError::LengthMismatch`] | `ids` and `probabilities` differ in length |
    /// | [`IoError::OutputDirCreate`] | The parent directory cannot be created |
    /// | [`IoError::WriteFile`] | The file cannot be created or flushed |
    /// | [`IoError::CsvWrite`] | A record cannot be written |
    #[instrument(skip_all, fields(path = %self.path.display(), n_rows = ids.len()))]
    pub fn write<S: AsRef<str>>(&self, ids: &[S], probabilities: &[f64]) -> Result<(), IoError> {
        if ids.len() != probabilities.len() {
            return Err(IoError::LengthMismatch {
                ids: ids.len(),
                probabilities: probabilities.len(),
            });
        }

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent).map_err(|e| IoError::OutputDirCreate {
                path: parent.to_path_buf(),
                source: e,
            })?;
            debug!("output directory ready");
        }

        let file = fs::File::create(&self.path).map_err(|e| IoError::WriteFile {
            path: self.path.clone(),
            source: e,
        })?;
        let mut wtr = csv::Writer::from_writer(file);

        wtr.write_record(["ID", "Label"])
            .map_err(|e| self.csv_error(e))?;
        for (id, p) in ids.iter().zip(probabilities) {
            wtr.write_record([id.as_ref(), format!("{p:?}").as_str()])
                .map_err(|e| self.csv_error(e))?;
        }
        wtr.flush().map_err(|e| IoError::WriteFile {
            path: self.path.clone(),
            source: e,
        })?;

        info!(path = %self.path.display(), n_rows = ids.len(), "predictions written");
        Ok(())
    }

    fn csv_error(&self, e: csv::Error) -> IoError {
        IoError::CsvWrite {
            path: self.path.clone(),
            source: e,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn writes_header_and_rows_in_order() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.csv");
        PredictionWriter::new(&path)
            .write(&["b", "a"], &[0.25, 1.0])
            .unwrap();
        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content, "ID,Label\nb,0.25\na,1.0\n");
    }

    #[test]
    fn creates_missing_parent_directories() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("deeper").join("out.csv");
        PredictionWriter::new(&path).write(&["1"], &[0.5]).unwrap();
        assert!(path.exists());
    }

    #[test]
    fn overwrites_existing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.csv");
        fs::write(&path, "stale contents\n").unwrap();
        PredictionWriter::new(&path).write(&["7"], &[0.0]).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "ID,Label\n7,0.0\n");
    }

    #[test]
    fn length_mismatch_rejected() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.csv");
        let err = PredictionWriter::new(&path)
            .write(&["1", "2"], &[0.5])
            .unwrap_err();
        assert!(matches!(err, IoError::LengthMismatch { ids: 2, probabilities: 1 }));
        assert!(!path.exists());
    }
}
