//! One-hot encoding of RNA sequences into fixed-width numeric rows.

use std::fmt;

use tracing::{debug, instrument};

/// Number of recognised symbols, and so the width of one encoded position.
pub const ALPHABET_SIZE: usize = 4;

/// An RNA nucleotide. The discriminant is the hot position within a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Nucleotide {
    /// Adenine.
    A = 0,
    /// Cytosine.
    C = 1,
    /// Guanine.
    G = 2,
    /// Uracil.
    U = 3,
}

impl Nucleotide {
    /// Parse a sequence symbol.
    ///
    /// Only upper-case `A`, `C`, `G` and `U` are recognised; every other
    /// character (including `T`, `N` and lower-case letters) returns `None`.
    #[must_use]
    pub fn from_symbol(symbol: char) -> Option<Self> {
        match symbol {
            'A' => Some(Self::A),
            'C' => Some(Self::C),
            'G' => Some(Self::G),
            'U' => Some(Self::U),
            _ => None,
        }
    }

    /// Return the zero-based position of this nucleotide's hot bit.
    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Nucleotide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let symbol = match self {
            Self::A => 'A',
            Self::C => 'C',
            Self::G => 'G',
            Self::U => 'U',
        };
        write!(f, "{symbol}")
    }
}

/// Return the length, in symbols, of the longest sequence.
///
/// Returns 0 for an empty iterator.
pub fn max_sequence_length<'a, I>(sequences: I) -> usize
where
    I: IntoIterator<Item = &'a str>,
{
    sequences
        .into_iter()
        .map(|s| s.chars().count())
        .max()
        .unwrap_or(0)
}

/// Encodes sequences as `max_length` blocks of [`ALPHABET_SIZE`] values.
///
/// Block order within a position is A, C, G, U. Sequences shorter than
/// `max_length` are zero-padded at the end; longer sequences keep their first
/// `max_length` symbols. Unknown symbols encode to an all-zero block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OneHotEncoder {
    max_length: usize,
}

impl OneHotEncoder {
    /// Create an encoder padding or truncating to `max_length` positions.
    #[must_use]
    pub fn new(max_length: usize) -> Self {
        Self { max_length }
    }

    /// Return the number of encoded positions.
    #[must_use]
    pub fn max_length(&self) -> usize {
        self.max_length
    }

    /// Return the width of an encoded row (`max_length * 4`).
    #[must_use]
    pub fn width(&self) -> usize {
        self.max_length * ALPHABET_SIZE
    }

    /// Encode a single sequence.
    #[must_use]
    pub fn encode(&self, sequence: &str) -> Vec<f64> {
        let mut row = vec![0.0; self.width()];
        for (position, symbol) in sequence.chars().take(self.max_length).enumerate() {
            if let Some(nucleotide) = Nucleotide::from_symbol(symbol) {
                row[position * ALPHABET_SIZE + nucleotide.index()] = 1.0;
            }
        }
        row
    }

    /// Encode a batch of sequences, preserving order.
    #[instrument(skip_all, fields(n = sequences.len(), max_length = self.max_length))]
    pub fn encode_batch<S: AsRef<str>>(&self, sequences: &[S]) -> Vec<Vec<f64>> {
        let rows: Vec<Vec<f64>> = sequences.iter().map(|s| self.encode(s.as_ref())).collect();
        debug!(width = self.width(), "sequences one-hot encoded");
        rows
    }
}
