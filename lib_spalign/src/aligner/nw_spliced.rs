use log::debug;
use ndarray::Array2;

use crate::aligner::{ExonRecord, SplicedAligner};
use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy)]
pub struct ScoringTable {
    pub match_score: i32,
    pub mismatch_score: i32,
    pub gap_open_score: i32,
    pub gap_extend_score: i32,
}

impl Default for ScoringTable {
    fn default() -> Self {
        Self {
            match_score: 1,
            mismatch_score: -1,
            gap_open_score: -2,
            gap_extend_score: -1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Start,
    Match,
    Mismatch,
    Insertion,
    Deletion,
}

#[derive(Debug, Clone, Copy)]
struct Entry {
    score: i32,
    step: Step,
}

/// Pattern-guided Needleman-Wunsch spliced aligner.
///
/// Anchors are merged into exon groups wherever the inter-anchor subject gap
/// stays close to the query gap; a subject gap exceeding the query gap by at
/// least `min_intron` opens an intron. Consecutive groups are joined by a
/// diagonal split search over the inter-group query span that maximizes
/// matches and favours GT/GC..AG intron walls; terminal groups are extended
/// to the query ends. Each group is then aligned with a full
/// Needleman-Wunsch over its window and reported as one exon.
pub struct NwSplicedAligner {
    scoring: ScoringTable,
    min_intron: usize,
    seq1: Vec<u8>,
    seq2: Vec<u8>,
    pattern: Vec<usize>,
    end_space_free: [bool; 4],
    exons: Vec<ExonRecord>,
}

impl Default for NwSplicedAligner {
    fn default() -> Self {
        Self::new()
    }
}

impl NwSplicedAligner {
    pub fn new() -> Self {
        Self::with_scoring(ScoringTable::default())
    }

    pub fn with_scoring(scoring: ScoringTable) -> Self {
        Self {
            scoring,
            min_intron: 25,
            seq1: Vec::new(),
            seq2: Vec::new(),
            pattern: Vec::new(),
            end_space_free: [false; 4],
            exons: Vec::new(),
        }
    }

    /// Merge pattern anchors into exon groups, opening an intron wherever
    /// the subject gap outgrows the query gap by `min_intron`.
    fn exon_groups(&self) -> Vec<[usize; 4]> {
        let mut groups: Vec<[usize; 4]> = Vec::new();
        for quad in self.pattern.chunks(4) {
            let anchor = [quad[0], quad[1], quad[2], quad[3]];
            match groups.last_mut() {
                Some(group) => {
                    let q_gap = anchor[0] - group[1] - 1;
                    let s_gap = anchor[2] - group[3] - 1;
                    if s_gap >= q_gap + self.min_intron {
                        groups.push(anchor);
                    } else {
                        group[1] = anchor[1];
                        group[3] = anchor[3];
                    }
                }
                None => groups.push(anchor),
            }
        }
        groups
    }

    /// Distribute each inter-group query span between the two flanking
    /// groups, choosing the split that maximizes diagonal matches and
    /// consensus splice walls.
    fn resolve_intron_splits(&self, groups: &mut [[usize; 4]]) {
        for i in 0..groups.len().saturating_sub(1) {
            let (g1, g2) = (groups[i], groups[i + 1]);
            let span = g2[0] - g1[1] - 1;
            if span == 0 {
                continue;
            }
            let mut best = (i64::MIN, 0);
            for k in 0..=span {
                let gain = self.split_gain(&g1, &g2, span, k);
                if gain > best.0 {
                    best = (gain, k);
                }
            }
            let k = best.1;
            groups[i][1] += k;
            groups[i][3] += k;
            groups[i + 1][0] -= span - k;
            groups[i + 1][2] -= span - k;
        }
    }

    fn split_gain(&self, g1: &[usize; 4], g2: &[usize; 4], span: usize, k: usize) -> i64 {
        let mut gain = 0i64;
        for t in 0..k {
            gain += if self.seq1[g1[1] + 1 + t] == self.seq2[g1[3] + 1 + t] {
                2
            } else {
                -1
            };
        }
        let back = span - k;
        for t in 0..back {
            gain += if self.seq1[g2[0] - 1 - t] == self.seq2[g2[2] - 1 - t] {
                2
            } else {
                -1
            };
        }
        // favour consensus walls of the remaining intron
        let donor = g1[3] + k + 1;
        if donor + 1 < self.seq2.len()
            && self.seq2[donor] == b'G'
            && (self.seq2[donor + 1] == b'T' || self.seq2[donor + 1] == b'C')
        {
            gain += 3;
        }
        let acceptor_end = g2[2] - back;
        if acceptor_end >= 2 && self.seq2[acceptor_end - 2] == b'A' && self.seq2[acceptor_end - 1] == b'G'
        {
            gain += 3;
        }
        gain
    }
}

impl SplicedAligner for NwSplicedAligner {
    fn set_sequences(&mut self, seq1: &[u8], seq2: &[u8]) {
        self.seq1.clear();
        self.seq1.extend_from_slice(seq1);
        self.seq2.clear();
        self.seq2.extend_from_slice(seq2);
        self.exons.clear();
    }

    fn set_pattern(&mut self, anchors: &[usize]) -> Result<()> {
        if anchors.len() % 4 != 0 {
            return Err(Error::InvalidPatternCoordinates(
                "Pattern must have a dimension multiple of four",
            ));
        }
        self.pattern = anchors.to_vec();
        Ok(())
    }

    fn set_end_space_free(&mut self, left1: bool, right1: bool, left2: bool, right2: bool) {
        self.end_space_free = [left1, right1, left2, right2];
    }

    fn run(&mut self) -> Result<()> {
        self.exons.clear();
        if self.seq1.is_empty() || self.seq2.is_empty() {
            return Ok(());
        }
        let mut previous: Option<&[usize]> = None;
        for quad in self.pattern.chunks(4) {
            if quad[0] > quad[1]
                || quad[2] > quad[3]
                || quad[1] >= self.seq1.len()
                || quad[3] >= self.seq2.len()
            {
                return Err(Error::InvalidRange);
            }
            if let Some(previous) = previous {
                if quad[0] <= previous[1] || quad[2] <= previous[3] {
                    return Err(Error::InvalidPatternCoordinates(
                        "Pattern hits coordinates must be sorted",
                    ));
                }
            }
            previous = Some(quad);
        }

        let mut groups = self.exon_groups();
        if groups.is_empty() {
            groups.push([0, self.seq1.len() - 1, 0, self.seq2.len() - 1]);
        } else {
            self.resolve_intron_splits(&mut groups);

            // free left and right ends admit the query overhangs
            if self.end_space_free[0] || self.end_space_free[2] {
                let overhang = groups[0][0];
                groups[0][0] = 0;
                groups[0][2] = groups[0][2].saturating_sub(overhang);
            }
            if self.end_space_free[1] || self.end_space_free[3] {
                let last = groups.len() - 1;
                let overhang = self.seq1.len() - 1 - groups[last][1];
                groups[last][1] = self.seq1.len() - 1;
                groups[last][3] = (groups[last][3] + overhang).min(self.seq2.len() - 1);
            }
        }
        debug!("aligning {} exon group(s)", groups.len());

        for group in &groups {
            let details = nw_align(
                &self.seq1[group[0]..=group[1]],
                &self.seq2[group[2]..=group[3]],
                &self.scoring,
            );
            let matches = details.bytes().filter(|&c| c == b'M').count();
            let len = details.len();
            self.exons.push(ExonRecord {
                identity: matches as f64 / len as f64,
                len,
                q_lo: group[0],
                q_hi: group[1],
                s_lo: group[2],
                s_hi: group[3],
                annotation: annotate(&self.seq2, group[2], group[3]),
                details,
            });
        }
        Ok(())
    }

    fn exons(&self) -> &[ExonRecord] {
        &self.exons
    }

    fn score_from_transcript(&self, details: &str) -> Result<i32> {
        let ScoringTable {
            match_score: wm,
            mismatch_score: wms,
            gap_open_score: wg,
            gap_extend_score: ws,
        } = self.scoring;

        let bytes = details.as_bytes();
        let Some(&first) = bytes.first() else {
            return Ok(0);
        };

        let mut score = 0;
        let (mut in_insertion, mut in_deletion) = match first {
            b'M' | b'R' => (false, false),
            b'I' => {
                score += wg;
                (true, false)
            }
            b'D' => {
                score += wg;
                (false, true)
            }
            other => return Err(Error::UnknownTranscriptSymbol(other as char)),
        };

        for &symbol in bytes {
            match symbol {
                b'M' => {
                    in_insertion = false;
                    in_deletion = false;
                    score += wm;
                }
                b'R' => {
                    in_insertion = false;
                    in_deletion = false;
                    score += wms;
                }
                b'I' => {
                    if !in_insertion {
                        score += wg;
                    }
                    in_insertion = true;
                    in_deletion = false;
                    score += ws;
                }
                b'D' => {
                    if !in_deletion {
                        score += wg;
                    }
                    in_insertion = false;
                    in_deletion = true;
                    score += ws;
                }
                other => return Err(Error::UnknownTranscriptSymbol(other as char)),
            }
        }
        Ok(score)
    }
}

/// Global alignment of two byte sequences; returns the M/R/I/D transcript.
pub(crate) fn nw_align(seq1: &[u8], seq2: &[u8], scoring: &ScoringTable) -> String {
    let (n, m) = (seq1.len(), seq2.len());
    let mut matrix = Array2::from_elem(
        (n + 1, m + 1),
        Entry {
            score: 0,
            step: Step::Start,
        },
    );

    for i in 1..=n {
        let open = if i == 1 { scoring.gap_open_score } else { 0 };
        matrix[[i, 0]] = Entry {
            score: matrix[[i - 1, 0]].score + scoring.gap_extend_score + open,
            step: Step::Deletion,
        };
    }
    for j in 1..=m {
        let open = if j == 1 { scoring.gap_open_score } else { 0 };
        matrix[[0, j]] = Entry {
            score: matrix[[0, j - 1]].score + scoring.gap_extend_score + open,
            step: Step::Insertion,
        };
    }

    for i in 1..=n {
        for j in 1..=m {
            let diag = matrix[[i - 1, j - 1]];
            let (step, gain) = if seq1[i - 1] == seq2[j - 1] {
                (Step::Match, scoring.match_score)
            } else {
                (Step::Mismatch, scoring.mismatch_score)
            };
            let mut entry = Entry {
                score: diag.score + gain,
                step,
            };

            let up = matrix[[i - 1, j]];
            let deletion = up.score
                + scoring.gap_extend_score
                + if up.step == Step::Deletion {
                    0
                } else {
                    scoring.gap_open_score
                };
            if deletion > entry.score {
                entry = Entry {
                    score: deletion,
                    step: Step::Deletion,
                };
            }

            let left = matrix[[i, j - 1]];
            let insertion = left.score
                + scoring.gap_extend_score
                + if left.step == Step::Insertion {
                    0
                } else {
                    scoring.gap_open_score
                };
            if insertion > entry.score {
                entry = Entry {
                    score: insertion,
                    step: Step::Insertion,
                };
            }

            matrix[[i, j]] = entry;
        }
    }

    let (mut i, mut j) = (n, m);
    let mut details = String::with_capacity(n + m);
    while i > 0 || j > 0 {
        match matrix[[i, j]].step {
            Step::Match => {
                details.push('M');
                i -= 1;
                j -= 1;
            }
            Step::Mismatch => {
                details.push('R');
                i -= 1;
                j -= 1;
            }
            Step::Deletion => {
                details.push('D');
                i -= 1;
            }
            Step::Insertion => {
                details.push('I');
                j -= 1;
            }
            Step::Start => break,
        }
    }
    details.chars().rev().collect()
}

/// Longest perfectly matched diagonal of the global alignment of two
/// windows, as (l1, r1, l2, r2) offsets within them.
pub fn longest_matched_segment(seq1: &[u8], seq2: &[u8]) -> Option<[usize; 4]> {
    if seq1.is_empty() || seq2.is_empty() {
        return None;
    }
    let details = nw_align(seq1, seq2, &ScoringTable::default());

    fn commit(
        run: &mut Option<(usize, usize, usize)>,
        best: &mut Option<[usize; 4]>,
        best_len: &mut usize,
    ) {
        if let Some((start1, start2, len)) = run.take() {
            if len > *best_len {
                *best_len = len;
                *best = Some([start1, start1 + len - 1, start2, start2 + len - 1]);
            }
        }
    }

    let (mut i, mut j) = (0usize, 0usize);
    let mut best = None;
    let mut best_len = 0;
    let mut run: Option<(usize, usize, usize)> = None;
    for symbol in details.bytes() {
        match symbol {
            b'M' => {
                match &mut run {
                    Some(r) => r.2 += 1,
                    None => run = Some((i, j, 1)),
                }
                i += 1;
                j += 1;
            }
            b'R' => {
                commit(&mut run, &mut best, &mut best_len);
                i += 1;
                j += 1;
            }
            b'I' => {
                commit(&mut run, &mut best, &mut best_len);
                j += 1;
            }
            b'D' => {
                commit(&mut run, &mut best, &mut best_len);
                i += 1;
            }
            _ => {}
        }
    }
    commit(&mut run, &mut best, &mut best_len);
    best
}

fn annotate(seq2: &[u8], s_lo: usize, s_hi: usize) -> String {
    let mut annot = String::with_capacity(10);
    for offset in [2usize, 1] {
        match s_lo.checked_sub(offset) {
            Some(pos) => annot.push(seq2[pos] as char),
            None => annot.push(' '),
        }
    }
    annot.push_str("<exon>");
    for pos in [s_hi + 1, s_hi + 2] {
        annot.push(seq2.get(pos).map_or(' ', |&c| c as char));
    }
    annot
}
