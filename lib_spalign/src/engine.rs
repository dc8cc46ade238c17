use std::collections::VecDeque;

use hit_filter::compartment::{CompartmentParams, find_compartments};
use hit_filter::filter::{FilterParams, HitFilter, Method, Mode, SplitMode, StrandPolicy};
use hit_filter::hit::{cleave_off_by_tail, hits_min_max};
use hit_filter::{Hit, Strand};
use log::{debug, info};

use crate::accessor::SequenceAccessor;
use crate::aligner::SplicedAligner;
use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::pattern::{AlnMapElem, build_pattern};
use crate::postprocess::{SUBJ_PER_QUERY, postprocess};
use crate::segment::{Exon, Gap, Segment, is_consensus_splice};
use crate::util::reverse_complement;

/// Non-covered query ends shorter than this get a per-base genomic
/// extension instead of the configured maximum.
const NON_COVERED_END_THRESHOLD: usize = 55;

/// One aligned compartment of the result.
///
/// Failed compartments are reported in place, error-flagged and without
/// segments, so that compartment ids stay dense.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AlignedCompartment {
    pub id: u32,
    pub error: bool,
    pub message: String,
    pub query_strand: Strand,
    pub subj_strand: Strand,
    pub segments: Vec<Segment>,
}

impl AlignedCompartment {
    fn failed(id: u32, message: String, query_strand: Strand) -> Self {
        Self {
            id,
            error: true,
            message,
            query_strand,
            subj_strand: Strand::Plus,
            segments: Vec::new(),
        }
    }

    /// Overall identity: matches over all aligned and gapped query columns.
    pub fn identity(&self) -> f64 {
        let mut matches = 0usize;
        let mut total = 0usize;
        for segment in &self.segments {
            match segment {
                Segment::Exon(exon) => {
                    total += exon.details.len();
                    matches += exon.details.bytes().filter(|&c| c == b'M').count();
                }
                Segment::Gap(gap) => total += gap.len,
            }
        }
        if total == 0 {
            0.0
        } else {
            matches as f64 / total as f64
        }
    }
}

/// The spliced alignment engine.
///
/// Owns its scratch buffers and processes compartments one at a time; run
/// one engine per worker for parallelism. Collaborators are injected
/// through [`SequenceAccessor`] and [`SplicedAligner`].
pub struct Engine {
    config: EngineConfig,
    aligner: Option<Box<dyn SplicedAligner>>,
    accessor: Option<Box<dyn SequenceAccessor>>,
    next_model_id: u32,
    mrna: Vec<u8>,
    genomic: Vec<u8>,
    pattern: Vec<usize>,
    alnmap: Vec<AlnMapElem>,
    segments: VecDeque<Segment>,
    polya_start: Option<usize>,
}

impl Engine {
    pub fn new(config: EngineConfig) -> Self {
        let next_model_id = config.model_id_seed;
        Self {
            config,
            aligner: None,
            accessor: None,
            next_model_id,
            mrna: Vec::new(),
            genomic: Vec::new(),
            pattern: Vec::new(),
            alnmap: Vec::new(),
            segments: VecDeque::new(),
            polya_start: None,
        }
    }

    pub fn set_aligner(&mut self, aligner: Box<dyn SplicedAligner>) -> &mut Self {
        self.aligner = Some(aligner);
        self
    }

    pub fn set_accessor(&mut self, accessor: Box<dyn SequenceAccessor>) -> &mut Self {
        self.accessor = Some(accessor);
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Poly-A start detected on the query during the last compartment, in
    /// the strand-normalized frame.
    pub fn polya_start(&self) -> Option<usize> {
        self.polya_start
    }

    /// Align all compartments of one query/subject hit set.
    ///
    /// Compartments are emitted subject-ascending; a failing compartment
    /// yields an error-flagged entry and processing continues.
    pub fn run(&mut self, hits: Vec<Hit>) -> Result<Vec<AlignedCompartment>> {
        self.config.validate()?;
        if self.accessor.is_none() {
            return Err(Error::SequenceAccessorNotSpecified);
        }
        if self.aligner.is_none() {
            return Err(Error::AlignerNotSpecified);
        }
        if hits.is_empty() {
            return Err(Error::EmptyHitVector);
        }

        let query = hits[0].query_id.clone();
        let subj = hits[0].subj_id.clone();

        self.mrna = self.load(&query, 0, None)?;
        if self.config.query_strand == Strand::Minus {
            reverse_complement(&mut self.mrna);
        }
        let mrna_size = self.mrna.len();
        let min_coverage_bp = (self.config.min_query_coverage * mrna_size as f64) as usize;
        let penalty_bp = (self.config.compartment_penalty * mrna_size as f64) as usize;

        let compartments = find_compartments(
            &hits,
            &CompartmentParams {
                penalty_bp,
                min_coverage_bp,
                max_intron: self.config.max_intron,
            },
        );
        info!(
            "{} compartment(s) for {query} vs {subj}",
            compartments.len()
        );

        // compartments share the subject between them
        let mut results = Vec::with_capacity(compartments.len());
        let mut range_left = 0usize;
        for (i, compartment) in compartments.iter().enumerate() {
            let same_strand_next = compartments
                .get(i + 1)
                .is_some_and(|next| next.strand() == compartment.strand());
            let range_right = if same_strand_next {
                Some((compartments[i + 1].bounds()[2] as usize).saturating_sub(1))
            } else {
                None
            };

            let id = self.next_model_id;
            self.next_model_id += 1;

            let mut compartment_hits = compartment.hits().to_vec();
            match self.run_on_compartment(&mut compartment_hits, range_left, range_right, &subj) {
                Ok(mut aligned) => {
                    aligned.id = id;
                    results.push(aligned);
                }
                Err(error) => {
                    debug!("compartment {id} failed: {error}");
                    results.push(AlignedCompartment::failed(
                        id,
                        error.to_string(),
                        self.config.query_strand,
                    ));
                }
            }
            range_left = if same_strand_next {
                compartment.bounds()[3] as usize + 1
            } else {
                0
            };
        }
        Ok(results)
    }

    fn load(&self, seq_id: &str, start: usize, end: Option<usize>) -> Result<Vec<u8>> {
        self.accessor
            .as_ref()
            .ok_or(Error::SequenceAccessorNotSpecified)?
            .load(seq_id, start, end)
    }

    fn run_on_compartment(
        &mut self,
        hits: &mut Vec<Hit>,
        range_left: usize,
        range_right: Option<usize>,
        subj: &str,
    ) -> Result<AlignedCompartment> {
        self.segments.clear();
        if let Some(right) = range_right {
            if range_left > right {
                return Err(Error::InvalidRange);
            }
        }

        let params = FilterParams {
            strand: StrandPolicy::Both,
            same_order: false,
            method: Method::MaxScore,
            split_query: SplitMode::Clear,
            split_subject: SplitMode::Clear,
            ..FilterParams::default()
        };
        *hits = HitFilter::run(params, std::mem::take(hits), Mode::Normal)?;

        let mrna_size = self.mrna.len();
        if self.config.query_strand == Strand::Minus {
            for hit in hits.iter_mut() {
                hit.mirror_query(mrna_size as i64);
            }
        }

        self.polya_start = if self.config.polya_detection {
            test_polya(&self.mrna)
        } else {
            None
        };
        if let Some(polya_start) = self.polya_start {
            cleave_off_by_tail(hits, polya_start);
            if hits.is_empty() {
                return Err(Error::NoHitsBeyondPolyA);
            }
        }

        let envelope = hits_min_max(hits);
        let (qmin, qmax) = (envelope[0] as usize, envelope[1] as usize);

        // select terminal genomic extents based on the non-covered end sizes
        let extent_left = if qmin >= NON_COVERED_END_THRESHOLD {
            self.config.max_genomic_extension
        } else {
            (SUBJ_PER_QUERY + 1) * qmin
        };
        let qspace = mrna_size - 1 - qmax;
        let extent_right = if qspace >= NON_COVERED_END_THRESHOLD {
            self.config.max_genomic_extension
        } else {
            (SUBJ_PER_QUERY + 1) * qspace
        };

        let subj_plus = hits[0].is_plus_strand();
        let (extent_left, extent_right) = if subj_plus {
            (extent_left, extent_right)
        } else {
            (extent_right, extent_left)
        };

        let mut smin = (envelope[2] as usize).saturating_sub(extent_left);
        let mut smax = envelope[3] as usize + extent_right;
        if smin < range_left {
            smin = range_left;
        }
        if let Some(right) = range_right {
            smax = smax.min(right);
        }

        self.genomic = self.load(subj, smin, Some(smax))?;
        if self.genomic.is_empty() {
            return Err(Error::NoAlignment);
        }
        let loaded_end = smin + self.genomic.len() - 1;
        if loaded_end < smax {
            smax = loaded_end;
        }

        if !subj_plus {
            reverse_complement(&mut self.genomic);
            for hit in hits.iter_mut() {
                hit.mirror_subject_window(smin as i64, smax as i64);
            }
        }
        for hit in hits.iter_mut() {
            hit.translate(0, -(smin as i64));
        }

        // regardless of hits, all cDNA is aligned, without the tail if any
        let seq_len1 = self.polya_start.unwrap_or(mrna_size);
        let (pattern, alnmap) = build_pattern(
            hits,
            &self.mrna,
            &self.genomic,
            seq_len1,
            self.config.max_anchor_length,
        )?;
        self.pattern = pattern;
        self.alnmap = alnmap;

        {
            let Self {
                config,
                aligner,
                mrna,
                genomic,
                pattern,
                alnmap,
                segments,
                ..
            } = self;
            let aligner = aligner.as_mut().ok_or(Error::AlignerNotSpecified)?;
            align_zones(aligner.as_mut(), mrna, genomic, pattern, alnmap, segments)?;
            if segments.is_empty() {
                return Err(Error::NoAlignment);
            }
            postprocess(segments, mrna, genomic, seq_len1, config, aligner.as_ref())?;
        }

        self.extend_into_polya()?;
        self.reclassify_trailing_polya()?;

        // convert coordinates back to the originals
        for segment in self.segments.iter_mut() {
            let (q0, q1) = segment.q_box();
            let q_box = if self.config.query_strand == Strand::Plus {
                (q0, q1)
            } else {
                (mrna_size - 1 - q0, mrna_size - 1 - q1)
            };
            match segment {
                Segment::Exon(exon) => {
                    exon.q_box = q_box;
                    exon.s_box = denormalize_subject(exon.s_box, subj_plus, smin, smax);
                }
                Segment::Gap(gap) => {
                    gap.q_box = q_box;
                    if gap.s_box.1 >= gap.s_box.0 {
                        gap.s_box = denormalize_subject(gap.s_box, subj_plus, smin, smax);
                    }
                }
            }
        }

        Ok(AlignedCompartment {
            id: 0,
            error: false,
            message: "Ok".to_string(),
            query_strand: self.config.query_strand,
            subj_strand: if subj_plus { Strand::Plus } else { Strand::Minus },
            segments: self.segments.drain(..).collect(),
        })
    }

    /// Walk the last exon forward while query and subject both read 'A'.
    fn extend_into_polya(&mut self) -> Result<()> {
        if self.polya_start.is_none() {
            return Ok(());
        }
        let Self {
            aligner,
            mrna,
            genomic,
            segments,
            polya_start,
            ..
        } = self;
        let Some(Segment::Exon(last)) = segments.back_mut() else {
            return Ok(());
        };

        let p0 = last.q_box.1 + 1;
        let s0 = last.s_box.1 + 1;
        let mut shift = 0usize;
        while p0 + shift < mrna.len() && s0 + shift < genomic.len() {
            let base = mrna[p0 + shift];
            if base != b'A' || base != genomic[s0 + shift] {
                break;
            }
            shift += 1;
        }
        if shift == 0 {
            return Ok(());
        }

        last.q_box.1 += shift;
        last.s_box.1 += shift;
        last.details.push_str(&"M".repeat(shift));
        let aligner = aligner.as_ref().ok_or(Error::AlignerNotSpecified)?;
        last.update(aligner.as_ref())?;

        let adim = last.annot.len();
        if adim > 2 && last.annot.as_bytes()[adim - 3] == b'>' {
            let donor: String = [1usize, 2]
                .into_iter()
                .map(|offset| genomic.get(last.s_box.1 + offset).map_or(' ', |&c| c as char))
                .collect();
            last.annot.replace_range(adim - 2.., &donor);
        }
        *polya_start = polya_start.map(|p| p + shift);
        Ok(())
    }

    /// Walk back from the end, absorbing trailing segments that are mostly
    /// 'A' on the query into the poly-A tail.
    fn reclassify_trailing_polya(&mut self) -> Result<()> {
        let seg_dim = self.segments.len();
        let mut j = seg_dim as i64 - 1;
        while j >= 0 {
            let segment = &self.segments[j as usize];
            let (q0, q1) = segment.q_box();
            let len = (q1 + 1).saturating_sub(q0);
            let a_count = self.mrna[q0..q0 + len]
                .iter()
                .filter(|&&c| c == b'A')
                .count();

            let mut min_a_content = 0.799;
            if let Segment::Exon(exon) = segment {
                if j > 0 {
                    if let Some(prev) = self.segments[j as usize - 1].as_exon() {
                        if !is_consensus_splice(prev.donor(), exon.acceptor()) {
                            min_a_content = 0.599;
                        }
                    }
                }
            } else {
                min_a_content = if segment.len() > 4 { 0.599 } else { -1.0 };
            }

            let a_content = if len > 0 {
                a_count as f64 / len as f64
            } else {
                1.0
            };
            if a_content < min_a_content {
                break;
            }
            j -= 1;
        }

        if j >= 0 && (j as usize) < seg_dim.saturating_sub(1) {
            self.polya_start = Some(self.segments[j as usize].q_box().1 + 1);
        }

        let kept = (j + 1).max(0) as usize;
        if !self.segments.iter().take(kept).any(Segment::is_exon) {
            return Err(Error::NoExonsAboveIdtyLimit);
        }
        self.segments.truncate(kept);
        Ok(())
    }
}

fn denormalize_subject(
    s_box: (usize, usize),
    subj_plus: bool,
    smin: usize,
    smax: usize,
) -> (usize, usize) {
    if subj_plus {
        (s_box.0 + smin, s_box.1 + smin)
    } else {
        (smax - s_box.0, smax - s_box.1)
    }
}

/// Naive poly-A detection: index just after the last non-'A', when the 'A'
/// suffix is longer than three bases.
fn test_polya(mrna: &[u8]) -> Option<usize> {
    let mut i = mrna.len() as i64 - 1;
    while i >= 0 && mrna[i as usize] == b'A' {
        i -= 1;
    }
    let tail = mrna.len() as i64 - i - 1;
    (tail > 3).then_some((i + 1) as usize)
}

/// Drive the aligner zone by zone and collect raw segments: exons, the
/// intron gaps between them, and gaps between zones.
fn align_zones(
    aligner: &mut dyn SplicedAligner,
    mrna: &[u8],
    genomic: &[u8],
    pattern: &[usize],
    alnmap: &[AlnMapElem],
    segments: &mut VecDeque<Segment>,
) -> Result<()> {
    for (i, zone) in alnmap.iter().enumerate() {
        let Some((first, last)) = zone.pattern else {
            continue;
        };
        aligner.set_sequences(
            &mrna[zone.q_box.0..=zone.q_box.1],
            &genomic[zone.s_box.0..=zone.s_box.1],
        );

        let mut local = pattern[first * 4..(last + 1) * 4].to_vec();
        for quad in local.chunks_mut(4) {
            quad[0] -= zone.q_box.0;
            quad[1] -= zone.q_box.0;
            quad[2] -= zone.s_box.0;
            quad[3] -= zone.s_box.0;
        }
        aligner.set_pattern(&local)?;
        aligner.set_end_space_free(true, true, true, true);
        aligner.run()?;

        let records = aligner.exons().to_vec();
        let mut previous: Option<(usize, usize)> = None;
        for record in records {
            let q_lo = record.q_lo + zone.q_box.0;
            let q_hi = record.q_hi + zone.q_box.0;
            let s_lo = record.s_lo + zone.s_box.0;
            let s_hi = record.s_hi + zone.s_box.0;

            if let Some((prev_q, prev_s)) = previous {
                if q_lo > prev_q + 1 || s_lo > prev_s + 1 {
                    segments.push_back(Segment::Gap(Gap::new(
                        prev_q + 1,
                        q_lo - 1,
                        prev_s + 1,
                        s_lo - 1,
                    )));
                }
            }

            let mut exon = Exon {
                q_box: (q_lo, q_hi),
                s_box: (s_lo, s_hi),
                details: record.details,
                annot: record.annotation,
                idty: record.identity,
                len: record.len,
                score: 0,
            };
            exon.update(&*aligner)?;
            segments.push_back(Segment::Exon(exon));
            previous = Some((q_hi, s_hi));
        }

        if i + 1 < alnmap.len() {
            let next = &alnmap[i + 1];
            segments.push_back(Segment::Gap(Gap::new(
                zone.q_box.1 + 1,
                next.q_box.0.saturating_sub(1),
                zone.s_box.1 + 1,
                next.s_box.0.saturating_sub(1),
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests;
