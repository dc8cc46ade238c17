use hit_filter::Strand;

use crate::error::{Error, Result};

/// Immutable engine configuration, validated once per invocation.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Exons below this identity are demoted to gaps.
    pub min_exon_identity: f64,
    /// Minimal fraction of the query a compartment's hits must cover.
    pub min_query_coverage: f64,
    /// Compartments scoring below this fraction of the query length are
    /// rejected.
    pub compartment_penalty: f64,
    /// Subject flank, in bp, included around a compartment.
    pub max_genomic_extension: usize,
    /// Subject gap above which hits are no longer grouped into one
    /// compartment.
    pub max_intron: usize,
    /// Improve terminal exons even when their identity passes the threshold.
    pub end_gap_detection: bool,
    /// Detect, trim and extend a 3' poly-A tail on the query.
    pub polya_detection: bool,
    /// Query orientation; `Minus` reverse-complements the query before
    /// alignment and reports original coordinates on output.
    pub query_strand: Strand,
    /// Id assigned to the first aligned compartment.
    pub model_id_seed: u32,
    /// Subdivide pattern anchors longer than this on the query.
    ///
    /// Disabled by default: the longest perfect match is worth keeping whole,
    /// and there is no direct relationship between hits and exons.
    pub max_anchor_length: Option<usize>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_exon_identity: 0.75,
            min_query_coverage: 0.25,
            compartment_penalty: 0.75,
            max_genomic_extension: 75_000,
            max_intron: 1_200_000,
            end_gap_detection: true,
            polya_detection: true,
            query_strand: Strand::Plus,
            model_id_seed: 0,
            max_anchor_length: None,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.min_exon_identity) {
            return Err(Error::BadIdentityThreshold);
        }
        if !(0.0..=1.0).contains(&self.min_query_coverage)
            || !(0.0..=1.0).contains(&self.compartment_penalty)
        {
            return Err(Error::QueryCoverageOutOfRange);
        }
        Ok(())
    }
}
