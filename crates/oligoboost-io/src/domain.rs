//! Domain types for oligoboost-io.

use std::fmt;

/// A record identifier from the `ID` column.
///
/// Wraps a non-empty string; numeric IDs are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SequenceId(String);

impl SequenceId {
    pub(crate) fn new(id: String) -> Self {
        debug_assert!(!id.is_empty(), "sequence ID must not be empty");
        Self(id)
    }

    /// Return the ID as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for SequenceId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SequenceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Binary class label from the `Label` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Label {
    /// Label `0`.
    Negative = 0,
    /// Label `1`.
    Positive = 1,
}

impl Label {
    /// Parse a label cell; only `0` and `1` are accepted.
    pub(crate) fn parse(raw: &str) -> Option<Self> {
        match raw {
            "0" => Some(Self::Negative),
            "1" => Some(Self::Positive),
            _ => None,
        }
    }

    /// Return the zero-based class index (0 or 1).
    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }
}

/// One row of an input table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SequenceRecord {
    /// Record identifier.
    pub id: SequenceId,
    /// Nucleotide string, never empty.
    pub sequence: String,
    /// Class label; `None` for unlabeled (test) tables.
    pub label: Option<Label>,
}

/// An ordered, non-empty table of sequence records.
///
/// Produced by [`SequenceReader`](crate::SequenceReader); row order matches
/// the CSV file.
#[derive(Debug, Clone)]
pub struct SequenceTable {
    records: Vec<SequenceRecord>,
}

impl SequenceTable {
    pub(crate) fn new(records: Vec<SequenceRecord>) -> Self {
        Self { records }
    }

    /// Return the records in file order.
    #[must_use]
    pub fn records(&self) -> &[SequenceRecord] {
        &self.records
    }

    /// Return the number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Return `true` if the table holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Return the IDs in file order.
    #[must_use]
    pub fn ids(&self) -> Vec<&SequenceId> {
        self.records.iter().map(|r| &r.id).collect()
    }

    /// Return the sequences in file order.
    #[must_use]
    pub fn sequences(&self) -> Vec<&str> {
        self.records.iter().map(|r| r.sequence.as_str()).collect()
    }

    /// Return every label as a class index, or `None` if any record is unlabeled.
    #[must_use]
    pub fn labels(&self) -> Option<Vec<usize>> {
        self.records
            .iter()
            .map(|r| r.label.map(Label::index))
            .collect()
    }
}
