use crate::aligner::SplicedAligner;
use crate::error::Result;

pub const GAP_TAG: &str = "<GAP>";

/// An aligned segment of a compartment.
///
/// Coordinates are 0-based and end-inclusive. A gap between two exons that
/// abut on the query (an intron) carries an empty query box.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Segment {
    Exon(Exon),
    Gap(Gap),
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Exon {
    pub q_box: (usize, usize),
    pub s_box: (usize, usize),
    /// Per-column transcript: M match, R mismatch, I insertion on the
    /// subject, D deletion on the subject.
    pub details: String,
    /// Subject context in the `"xx<exon>yy"` layout; the two characters
    /// after '>' are the donor, the two before '<' the acceptor.
    pub annot: String,
    pub idty: f64,
    pub len: usize,
    pub score: i32,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Gap {
    pub q_box: (usize, usize),
    pub s_box: (usize, usize),
    pub len: usize,
}

impl Gap {
    pub fn new(q_lo: usize, q_hi: usize, s_lo: usize, s_hi: usize) -> Self {
        Self {
            q_box: (q_lo, q_hi),
            s_box: (s_lo, s_hi),
            len: (q_hi + 1).saturating_sub(q_lo),
        }
    }

    pub fn annot(&self) -> &'static str {
        GAP_TAG
    }
}

impl Segment {
    pub fn is_exon(&self) -> bool {
        matches!(self, Segment::Exon(_))
    }

    pub fn q_box(&self) -> (usize, usize) {
        match self {
            Segment::Exon(e) => e.q_box,
            Segment::Gap(g) => g.q_box,
        }
    }

    pub fn s_box(&self) -> (usize, usize) {
        match self {
            Segment::Exon(e) => e.s_box,
            Segment::Gap(g) => g.s_box,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Segment::Exon(e) => e.len,
            Segment::Gap(g) => g.len,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn idty(&self) -> f64 {
        match self {
            Segment::Exon(e) => e.idty,
            Segment::Gap(_) => 0.0,
        }
    }

    pub fn as_exon(&self) -> Option<&Exon> {
        match self {
            Segment::Exon(e) => Some(e),
            Segment::Gap(_) => None,
        }
    }

    pub fn as_exon_mut(&mut self) -> Option<&mut Exon> {
        match self {
            Segment::Exon(e) => Some(e),
            Segment::Gap(_) => None,
        }
    }

    /// Turn an exon into a gap over the same boxes.
    pub fn demote(&mut self) {
        if let Segment::Exon(e) = self {
            let (q_lo, q_hi) = e.q_box;
            let (s_lo, s_hi) = e.s_box;
            *self = Segment::Gap(Gap::new(q_lo, q_hi, s_lo, s_hi));
        }
    }
}

impl Exon {
    /// Refresh length, identity and score from the details transcript.
    pub fn update(&mut self, aligner: &dyn SplicedAligner) -> Result<()> {
        self.len = self.details.len();
        let matches = self.details.bytes().filter(|&c| c == b'M').count();
        self.idty = if self.len > 0 {
            matches as f64 / self.len as f64
        } else {
            0.0
        };
        self.score = aligner.score_from_transcript(&self.details)?;
        Ok(())
    }

    pub fn donor(&self) -> Option<[u8; 2]> {
        let annot = self.annot.as_bytes();
        let dim = annot.len();
        (dim > 2 && annot[dim - 3] == b'>').then(|| [annot[dim - 2], annot[dim - 1]])
    }

    pub fn acceptor(&self) -> Option<[u8; 2]> {
        let annot = self.annot.as_bytes();
        (annot.len() > 3 && annot[2] == b'<').then(|| [annot[0], annot[1]])
    }

    /// Try improving the exon by cutting it from the left.
    ///
    /// Walks the transcript from the right, tracking a running match score
    /// (M +1, R -1, I/D -1, gap opening free) and trims at the prefix
    /// boundary giving the best suffix score, extended by any further
    /// matching residues. The trim applies only when at least four query
    /// bases remain.
    pub fn improve_from_left(
        &mut self,
        seq1: &[u8],
        seq2: &[u8],
        aligner: &dyn SplicedAligner,
    ) -> Result<()> {
        const MIN_QUERY_SIZE: i64 = 4;

        let dimq = (self.q_box.1 - self.q_box.0 + 1) as i64;
        if dimq < MIN_QUERY_SIZE {
            return Ok(());
        }
        let dims = (self.s_box.1 - self.s_box.0 + 1) as i64;

        let bytes = self.details.as_bytes();
        let (wm, wms, wg, ws) = (1i64, -1i64, 0i64, -1i64);
        let (mut i0, mut i1) = (dimq, dims);
        let (mut i0_max, mut i1_max) = (i0, i1);
        let (mut score, mut score_max) = (0i64, 0i64);
        let mut kept_suffix = 0usize;

        for (k, &symbol) in bytes.iter().rev().enumerate() {
            match symbol {
                b'M' => {
                    score += wm;
                    i0 -= 1;
                    i1 -= 1;
                }
                b'R' => {
                    score += wms;
                    i0 -= 1;
                    i1 -= 1;
                }
                b'I' => {
                    score += ws;
                    if k > 0 && bytes[bytes.len() - k] != b'I' {
                        score += wg;
                    }
                    i1 -= 1;
                }
                b'D' => {
                    score += ws;
                    if k > 0 && bytes[bytes.len() - k] != b'D' {
                        score += wg;
                    }
                    i0 -= 1;
                }
                _ => {}
            }
            if score >= score_max {
                score_max = score;
                i0_max = i0;
                i1_max = i1;
                kept_suffix = k + 1;
            }
        }

        // equally optimal trims may cut through matching sequence; take the
        // matching residues back
        let mut head = 0usize;
        while i0_max > 0 && i1_max > 0 {
            if seq1[self.q_box.0 + i0_max as usize - 1] == seq2[self.s_box.0 + i1_max as usize - 1]
            {
                i0_max -= 1;
                i1_max -= 1;
                head += 1;
            } else {
                break;
            }
        }

        if dimq - i0_max >= MIN_QUERY_SIZE && i0_max > 0 {
            self.q_box.0 += i0_max as usize;
            self.s_box.0 += i1_max as usize;
            let cut_to = self.details.len() - kept_suffix;
            self.details.replace_range(..cut_to, "");
            self.details.insert_str(0, &"M".repeat(head));
            self.update(aligner)?;

            if self.annot.len() > 2 && self.annot.as_bytes()[2] == b'<' {
                let acceptor: String = [2usize, 1]
                    .into_iter()
                    .map(|offset| {
                        self.s_box
                            .0
                            .checked_sub(offset)
                            .map_or(' ', |pos| seq2[pos] as char)
                    })
                    .collect();
                self.annot.replace_range(..2, &acceptor);
            }
        }
        Ok(())
    }

    /// Mirror of [`Exon::improve_from_left`] for the right end.
    pub fn improve_from_right(
        &mut self,
        seq1: &[u8],
        seq2: &[u8],
        aligner: &dyn SplicedAligner,
    ) -> Result<()> {
        const MIN_QUERY_SIZE: i64 = 4;

        let mut dimq = (self.q_box.1 - self.q_box.0 + 1) as i64;
        if dimq < MIN_QUERY_SIZE {
            return Ok(());
        }
        let dims = (self.s_box.1 - self.s_box.0 + 1) as i64;

        let bytes = self.details.as_bytes();
        let (wm, wms, wg, ws) = (1i64, -1i64, 0i64, -1i64);
        let (mut i0, mut i1) = (-1i64, -1i64);
        let (mut i0_max, mut i1_max) = (i0, i1);
        let (mut score, mut score_max) = (0i64, 0i64);
        let mut kept_prefix = 0usize;

        for (k, &symbol) in bytes.iter().enumerate() {
            match symbol {
                b'M' => {
                    score += wm;
                    i0 += 1;
                    i1 += 1;
                }
                b'R' => {
                    score += wms;
                    i0 += 1;
                    i1 += 1;
                }
                b'I' => {
                    score += ws;
                    if k > 0 && bytes[k - 1] != b'I' {
                        score += wg;
                    }
                    i1 += 1;
                }
                b'D' => {
                    score += ws;
                    if k > 0 && bytes[k - 1] != b'D' {
                        score += wg;
                    }
                    i0 += 1;
                }
                _ => {}
            }
            if score >= score_max {
                score_max = score;
                i0_max = i0;
                i1_max = i1;
                kept_prefix = k + 1;
            }
        }

        let mut tail = 0usize;
        while i0_max < dimq - 1 && i1_max < dims - 1 {
            if seq1[self.q_box.0 + (i0_max + 1) as usize]
                == seq2[self.s_box.0 + (i1_max + 1) as usize]
            {
                i0_max += 1;
                i1_max += 1;
                tail += 1;
            } else {
                break;
            }
        }
        dimq += tail as i64;

        if i0_max >= MIN_QUERY_SIZE && i0_max < dimq - 1 {
            self.q_box.1 = self.q_box.0 + i0_max as usize;
            self.s_box.1 = self.s_box.0 + i1_max as usize;
            self.details.truncate(kept_prefix);
            self.details.push_str(&"M".repeat(tail));
            self.update(aligner)?;

            let adim = self.annot.len();
            if adim > 2 && self.annot.as_bytes()[adim - 3] == b'>' {
                let donor: String = [1usize, 2]
                    .into_iter()
                    .map(|offset| seq2.get(self.s_box.1 + offset).map_or(' ', |&c| c as char))
                    .collect();
                self.annot.replace_range(adim - 2.., &donor);
            }
        }
        Ok(())
    }
}

/// A donor-acceptor pair follows the splice consensus: GT or GC against AG.
pub fn is_consensus_splice(donor: Option<[u8; 2]>, acceptor: Option<[u8; 2]>) -> bool {
    match (donor, acceptor) {
        (Some(donor), Some(acceptor)) => {
            donor[0] == b'G'
                && (donor[1] == b'C' || donor[1] == b'T')
                && acceptor[0] == b'A'
                && acceptor[1] == b'G'
        }
        _ => false,
    }
}

#[cfg(test)]
mod tests;
