//! CSV loading of sequence tables and prediction output for the oligoboost pipeline.

mod domain;
mod error;
mod reader;
mod writer;

pub use domain::{Label, SequenceId, SequenceRecord, SequenceTable};
pub use error::IoError;
pub use reader::SequenceReader;
pub use writer::PredictionWriter;
