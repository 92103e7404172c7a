//! Sequence feature extraction: one-hot encoding, length feature, scaling.
//!
//! Pure math library with zero I/O. Turns RNA sequences into fixed-width
//! numeric rows and standardizes them with parameters learned on a training
//! partition only.

mod assemble;
mod error;
mod onehot;
mod scaler;

pub use assemble::{FeatureAssembler, FeatureMatrix};
pub use error::EncodeError;
pub use onehot::{ALPHABET_SIZE, Nucleotide, OneHotEncoder, max_sequence_length};
pub use scaler::StandardScaler;
