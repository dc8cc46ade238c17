use std::collections::HashMap;

use crate::error::{Error, Result};

/// Read access to named sequences.
///
/// Implementations return the inclusive range `[start, end]` in upper-case
/// IUPAC; `None` for the end means to the end of the sequence. Ranges past
/// the end are clamped.
pub trait SequenceAccessor {
    fn load(&self, seq_id: &str, start: usize, end: Option<usize>) -> Result<Vec<u8>>;
}

/// In-memory accessor backed by a name → sequence map.
#[derive(Debug, Default)]
pub struct MemoryAccessor {
    sequences: HashMap<String, Vec<u8>>,
}

impl MemoryAccessor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, seq_id: impl Into<String>, sequence: impl Into<Vec<u8>>) {
        let mut sequence = sequence.into();
        sequence.make_ascii_uppercase();
        self.sequences.insert(seq_id.into(), sequence);
    }
}

impl SequenceAccessor for MemoryAccessor {
    fn load(&self, seq_id: &str, start: usize, end: Option<usize>) -> Result<Vec<u8>> {
        let sequence = self
            .sequences
            .get(seq_id)
            .ok_or_else(|| Error::SequenceNotFound(seq_id.to_string()))?;
        if sequence.is_empty() || start >= sequence.len() {
            return Ok(Vec::new());
        }
        let end = end.map_or(sequence.len() - 1, |e| e.min(sequence.len() - 1));
        if start > end {
            return Ok(Vec::new());
        }
        Ok(sequence[start..=end].to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ranges_are_inclusive_and_clamped() {
        let mut accessor = MemoryAccessor::new();
        accessor.insert("chr", "acgtacgt");

        assert_eq!(accessor.load("chr", 0, None).unwrap(), b"ACGTACGT");
        assert_eq!(accessor.load("chr", 2, Some(5)).unwrap(), b"GTAC");
        assert_eq!(accessor.load("chr", 6, Some(100)).unwrap(), b"GT");
        assert!(accessor.load("chr", 100, None).unwrap().is_empty());
        assert!(matches!(
            accessor.load("missing", 0, None),
            Err(Error::SequenceNotFound(_))
        ));
    }
}
