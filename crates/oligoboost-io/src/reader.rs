//! CSV sequence table reader with full input validation.

use std::path::{Path, PathBuf};

use tracing::{debug, info, instrument};

use crate::IoError;
use crate::domain::{Label, SequenceId, SequenceRecord, SequenceTable};

const ID_COLUMN: &str = "ID";
const SEQUENCE_COLUMN: &str = "Sequence";
const LABEL_COLUMN: &str = "Label";

/// Reads a sequence table from a CSV file.
///
/// Expected CSV format:
/// - Header row required; columns are located by name, extra columns ignored
/// - `ID` and `Sequence` always required, `Label` (`0`/`1`) for labeled tables
/// - Header names, `Sequence` and `Label` cells are trimmed of surrounding
///   whitespace; `ID` cells are kept verbatim
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::FileNotFound`] | File doesn't exist or is unreadable |
/// | [`IoError::CsvParse`] | Malformed CSV record |
/// | [`IoError::MissingColumn`] | A required column is not in the header |
/// | [`IoError::EmptyDataset`] | Zero data rows after header |
/// | [`IoError::EmptyId`] | An `ID` cell is empty |
/// | [`IoError::EmptySequence`] | A `Sequence` cell is empty |
/// | [`IoError::InvalidLabel`] | A `Label` cell is not `0` or `1` |
pub struct SequenceReader {
    path: PathBuf,
}

struct ColumnIndices {
    id: usize,
    sequence: usize,
    label: Option<usize>,
}

impl SequenceReader {
    /// Create a new reader for the given CSV file path.
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    /// Read a training table; every row must carry a `Label`.
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn read_labeled(&self) -> Result<SequenceTable, IoError> {
        self.read(true)
    }

    /// Read a test table; any `Label` column is ignored.
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn read_unlabeled(&self) -> Result<SequenceTable, IoError> {
        self.read(false)
    }

    fn read(&self, labeled: bool) -> Result<SequenceTable, IoError> {
        let file = std::fs::File::open(&self.path).map_err(|e| IoError::FileNotFound {
            path: self.path.clone(),
            source: e,
        })?;

        let mut rdr = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::Headers)
            .from_reader(file);

        let header = rdr.headers().map_err(|e| self.parse_error(e))?;
        let columns = ColumnIndices {
            id: self.locate(header, ID_COLUMN)?,
            sequence: self.locate(header, SEQUENCE_COLUMN)?,
            label: if labeled {
                Some(self.locate(header, LABEL_COLUMN)?)
            } else {
                None
            },
        };
        debug!(n_columns = header.len(), "read CSV header");

        let mut records = Vec::new();
        for (row_index, result) in rdr.records().enumerate() {
            let record = result.map_err(|e| self.parse_error(e))?;
            records.push(self.parse_row(&record, row_index, &columns)?);
        }

        if records.is_empty() {
            return Err(IoError::EmptyDataset {
                path: self.path.clone(),
            });
        }

        let n_positive = records
            .iter()
            .filter(|r| r.label == Some(Label::Positive))
            .count();
        info!(
            n_records = records.len(),
            labeled,
            n_positive,
            "sequence table loaded"
        );

        Ok(SequenceTable::new(records))
    }

    fn parse_row(
        &self,
        record: &csv::StringRecord,
        row_index: usize,
        columns: &ColumnIndices,
    ) -> Result<SequenceRecord, IoError> {
        let id = record.get(columns.id).unwrap_or("");
        if id.is_empty() {
            return Err(IoError::EmptyId {
                path: self.path.clone(),
                row_index,
            });
        }

        let sequence = record.get(columns.sequence).unwrap_or("").trim();
        if sequence.is_empty() {
            return Err(IoError::EmptySequence {
                path: self.path.clone(),
                row_index,
                id: id.to_string(),
            });
        }

        let label = match columns.label {
            Some(col) => {
                let raw = record.get(col).unwrap_or("").trim();
                Some(Label::parse(raw).ok_or_else(|| IoError::InvalidLabel {
                    path: self.path.clone(),
                    row_index,
                    id: id.to_string(),
                    raw: raw.to_string(),
                })?)
            }
            None => None,
        };

        Ok(SequenceRecord {
            id: SequenceId::new(id.to_string()),
            sequence: sequence.to_string(),
            label,
        })
    }

    fn locate(&self, header: &csv::StringRecord, column: &'static str) -> Result<usize, IoError> {
        header
            .iter()
            .position(|name| name == column)
            .ok_or_else(|| IoError::MissingColumn {
                path: self.path.clone(),
                column,
            })
    }

    fn parse_error(&self, e: csv::Error) -> IoError {
        IoError::CsvParse {
            path: self.path.clone(),
            offset: e.position().map_or(0, |p| p.byte()),
            source: e,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_csv(content: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f.flush().unwrap();
        f
    }

    #[test]
    fn read_labeled_table() {
        let f = write_csv("ID,Sequence,Label\n1,ACGU,1\n2,AACC,0\n");
        let table = SequenceReader::new(f.path()).read_labeled().unwrap();
        assert_eq!(table.len(), 2);
        assert_eq!(table.ids()[0].as_str(), "1");
        assert_eq!(table.sequences(), vec!["ACGU", "AACC"]);
        assert_eq!(table.labels(), Some(vec![1, 0]));
    }

    #[test]
    fn columns_located_by_name() {
        let f = write_csv("Label,Extra,Sequence,ID\n0,x,GGUU,a\n1,y,CA,b\n");
        let table = SequenceReader::new(f.path()).read_labeled().unwrap();
        assert_eq!(table.ids()[1].as_str(), "b");
        assert_eq!(table.sequences(), vec!["GGUU", "CA"]);
        assert_eq!(table.labels(), Some(vec![0, 1]));
    }

    #[test]
    fn unlabeled_ignores_label_column() {
        let f = write_csv("ID,Sequence,Label\n3,ACGU,maybe\n");
        let table = SequenceReader::new(f.path()).read_unlabeled().unwrap();
        assert_eq!(table.records()[0].label, None);
        assert_eq!(table.labels(), None);
    }

    #[test]
    fn sequence_and_label_trimmed_id_verbatim() {
        let f = write_csv(" ID , Sequence , Label \n 9 , ACG , 1 \n");
        let table = SequenceReader::new(f.path()).read_labeled().unwrap();
        assert_eq!(table.ids()[0].as_str(), " 9 ");
        assert_eq!(table.sequences(), vec!["ACG"]);
        assert_eq!(table.labels(), Some(vec![1]));
    }

    #[test]
    fn insertion_order_preserved() {
        let f = write_csv("ID,Sequence\nZZZ,A\nAAA,C\nMMM,G\n");
        let table = SequenceReader::new(f.path()).read_unlabeled().unwrap();
        let ids: Vec<&str> = table.ids().iter().map(|id| id.as_str()).collect();
        assert_eq!(ids, vec!["ZZZ", "AAA", "MMM"]);
    }

    #[test]
    fn error_file_not_found() {
        let result = SequenceReader::new(Path::new("/nonexistent/file.csv")).read_labeled();
        assert!(matches!(result, Err(IoError::FileNotFound { .. })));
    }

    #[test]
    fn error_missing_label_column() {
        let f = write_csv("ID,Sequence\n1,ACGU\n");
        let result = SequenceReader::new(f.path()).read_labeled();
        assert!(matches!(
            result,
            Err(IoError::MissingColumn { column: "Label", .. })
        ));
    }

    #[test]
    fn error_missing_sequence_column() {
        let f = write_csv("ID,Seq\n1,ACGU\n");
        let result = SequenceReader::new(f.path()).read_unlabeled();
        assert!(matches!(
            result,
            Err(IoError::MissingColumn { column: "Sequence", .. })
        ));
    }

    #[test]
    fn error_empty_dataset() {
        let f = write_csv("ID,Sequence,Label\n");
        let result = SequenceReader::new(f.path()).read_labeled();
        assert!(matches!(result, Err(IoError::EmptyDataset { .. })));
    }

    #[test]
    fn error_empty_sequence() {
        let f = write_csv("ID,Sequence,Label\n1,ACGU,1\n2,,0\n");
        let result = SequenceReader::new(f.path()).read_labeled();
        assert!(matches!(
            result,
            Err(IoError::EmptySequence { row_index: 1, .. })
        ));
    }

    #[test]
    fn error_empty_id() {
        let f = write_csv("ID,Sequence\n,ACGU\n");
        let result = SequenceReader::new(f.path()).read_unlabeled();
        assert!(matches!(result, Err(IoError::EmptyId { row_index: 0, .. })));
    }

    #[test]
    fn error_invalid_label() {
        let f = write_csv("ID,Sequence,Label\n1,ACGU,2\n");
        let result = SequenceReader::new(f.path()).read_labeled();
        match result {
            Err(IoError::InvalidLabel { raw, id, .. }) => {
                assert_eq!(raw, "2");
                assert_eq!(id, "1");
            }
            other => panic!("expected InvalidLabel, got {other:?}"),
        }
    }

    #[test]
    fn error_ragged_row() {
        let f = write_csv("ID,Sequence,Label\n1,ACGU,1\n2,AACC\n");
        let result = SequenceReader::new(f.path()).read_labeled();
        assert!(matches!(result, Err(IoError::CsvParse { .. })));
    }
}
