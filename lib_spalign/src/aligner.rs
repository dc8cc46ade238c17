use crate::error::Result;

pub mod nw_spliced;

pub use nw_spliced::NwSplicedAligner;

/// One aligned exon as reported by a spliced aligner.
///
/// Coordinates are 0-based, end-inclusive, local to the sequences the
/// aligner was given. `details` is the per-column transcript (M match,
/// R mismatch, I insertion on the subject, D deletion on the subject);
/// `annotation` carries the two subject bases on each side of the exon in
/// the `"xx<exon>yy"` layout.
#[derive(Debug, Clone, PartialEq)]
pub struct ExonRecord {
    pub identity: f64,
    pub len: usize,
    pub q_lo: usize,
    pub q_hi: usize,
    pub s_lo: usize,
    pub s_hi: usize,
    pub annotation: String,
    pub details: String,
}

/// Capability interface of the pattern-guided spliced alignment kernel.
///
/// Concrete implementations are passed in by the caller; the engine only
/// drives this interface per alignment zone.
pub trait SplicedAligner {
    /// Hand the aligner the (sub)sequences to align. The aligner copies them
    /// into its own buffers.
    fn set_sequences(&mut self, seq1: &[u8], seq2: &[u8]);

    /// Anchor pattern as a flat vector of quadruples
    /// (q_lo, q_hi, s_lo, s_hi), zone-local, plus strand.
    fn set_pattern(&mut self, anchors: &[usize]) -> Result<()>;

    fn set_end_space_free(&mut self, left1: bool, right1: bool, left2: bool, right2: bool);

    fn run(&mut self) -> Result<()>;

    /// Exon table of the last run.
    fn exons(&self) -> &[ExonRecord];

    /// Re-score a per-column transcript under the aligner's scoring scheme.
    fn score_from_transcript(&self, details: &str) -> Result<i32>;
}
