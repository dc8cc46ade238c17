use hit_filter::Hit;
use log::debug;

use crate::aligner::nw_spliced::longest_matched_segment;
use crate::error::{Error, Result};

/// Minimal query length for a hit to seed an anchor.
const MIN_ANCHOR_HIT_LEN: i64 = 10;

/// One alignment zone: a region of (query, subject) aligned in a single
/// aligner invocation, together with the anchors guiding it.
#[derive(Debug, Clone)]
pub struct AlnMapElem {
    pub q_box: (usize, usize),
    pub s_box: (usize, usize),
    /// Inclusive range of anchor quadruples in the pattern vector, or `None`
    /// when the zone has no anchors.
    pub pattern: Option<(usize, usize)>,
}

/// Build the anchor pattern and the alignment map for one compartment.
///
/// Hits are strand-normalized and zone-local at this point. Each hit of at
/// least ten query bases seeds one anchor: the hit window is realigned with
/// the unspliced aligner, the longest perfectly matched core is shrunk by
/// 20% per side and then pulled to at least a quarter of the hit length away
/// from each hit edge. A hit whose realignment yields no core keeps its raw
/// coordinates as the anchor. The map always holds exactly one zone spanning
/// both sequences.
pub fn build_pattern(
    hits: &mut [Hit],
    mrna: &[u8],
    genomic: &[u8],
    seq_len1: usize,
    max_anchor_length: Option<usize>,
) -> Result<(Vec<usize>, Vec<AlnMapElem>)> {
    hits.sort_by(Hit::cmp_query_start);

    let mut pattern0: Vec<usize> = Vec::new();
    for hit in hits.iter() {
        if hit.length_q() >= MIN_ANCHOR_HIT_LEN {
            pattern0.extend([
                hit.q_lo() as usize,
                hit.q_hi() as usize,
                hit.s_lo() as usize,
                hit.s_hi() as usize,
            ]);
        }
    }

    let seq_len2 = genomic.len();
    validate(&pattern0, seq_len1, seq_len2)?;

    let pattern0 = subdivide(pattern0, max_anchor_length);
    debug!("{} raw anchor(s)", pattern0.len() / 4);

    let mut pattern: Vec<usize> = Vec::new();
    let mut map_elem = AlnMapElem {
        q_box: (0, 0),
        s_box: (0, 0),
        pattern: None,
    };

    for quad in pattern0.chunks(4) {
        let anchor = realign_anchor(quad, mrna, genomic);
        pattern.extend(anchor);

        let quads = pattern.len() / 4;
        if map_elem.pattern.is_none() {
            map_elem.pattern = Some((quads - 1, quads - 1));
        } else if let Some((start, _)) = map_elem.pattern {
            map_elem.pattern = Some((start, quads - 1));
        }
    }

    map_elem.q_box = (0, seq_len1.saturating_sub(1));
    map_elem.s_box = (0, seq_len2.saturating_sub(1));

    Ok((pattern, vec![map_elem]))
}

fn validate(pattern: &[usize], seq_len1: usize, seq_len2: usize) -> Result<()> {
    for (index, quad) in pattern.chunks(4).enumerate() {
        if quad[0] > quad[1] || quad[2] > quad[3] {
            return Err(Error::InvalidPatternCoordinates(
                "Pattern hits must be specified in plus strand",
            ));
        }
        if index > 0 {
            let prev = &pattern[(index - 1) * 4..index * 4];
            if quad[0] <= prev[1] || quad[2] <= prev[3] {
                return Err(Error::InvalidPatternCoordinates(
                    "Pattern hits coordinates must be sorted",
                ));
            }
        }
        if quad[1] >= seq_len1 || quad[3] >= seq_len2 {
            return Err(Error::InvalidRange);
        }
    }
    Ok(())
}

/// Split anchors longer than `max_len` on the query into near-equal parts
/// with aligned endpoints.
fn subdivide(pattern0: Vec<usize>, max_len: Option<usize>) -> Vec<usize> {
    let Some(max_len) = max_len else {
        return pattern0;
    };
    let mut pattern = Vec::with_capacity(pattern0.len());
    for quad in pattern0.chunks(4) {
        let len_q = quad[1] - quad[0] + 1;
        if len_q <= max_len {
            pattern.extend_from_slice(quad);
            continue;
        }
        let parts = (len_q - 1) / max_len + 1;
        let inc = len_q / parts + 1;
        let (mut a, mut c) = (quad[0], quad[2]);
        while a < quad[1] {
            let mut b = a + inc - 1;
            let mut d = c + inc - 1;
            if b > quad[1] || d > quad[3] {
                b = quad[1];
                d = quad[3];
            }
            pattern.extend([a, b, c, d]);
            a = b + 1;
            c = d + 1;
        }
    }
    pattern
}

fn realign_anchor(quad: &[usize], mrna: &[u8], genomic: &[u8]) -> [usize; 4] {
    let raw = [quad[0], quad[1], quad[2], quad[3]];
    let Some(core) = longest_matched_segment(
        &mrna[quad[0]..=quad[1]],
        &genomic[quad[2]..=quad[3]],
    ) else {
        return raw;
    };
    let [mut l1, mut r1, mut l2, mut r2] = core;

    // shrink the core by a fifth on each side
    let cut = (1 + r1 - l1) / 5;
    let (l1c, l2c, r1c, r2c) = (l1 + cut, l2 + cut, r1 - cut.min(r1), r2 - cut.min(r2));
    if l1c < r1c && l2c < r2c {
        (l1, l2, r1, r2) = (l1c, l2c, r1c, r2c);
    }

    // keep the anchor at least a quarter of the hit length away from the
    // hit edges
    let hitlen_q = quad[1] - quad[0] + 1;
    let margin = hitlen_q / 4;

    let delta = margin.saturating_sub(l1);
    let q0 = quad[0] + l1 + delta;
    let s0 = quad[2] + l2 + delta;

    let room_right = hitlen_q - r1 - 1;
    let delta = margin.saturating_sub(room_right);
    let q1 = quad[0] as i64 + r1 as i64 - delta as i64;
    let s1 = quad[2] as i64 + r2 as i64 - delta as i64;

    if (q0 as i64) > q1 || (s0 as i64) > s1 {
        // the longest segment was probably too short
        [quad[0] + l1, quad[0] + r1, quad[2] + l2, quad[2] + r2]
    } else {
        [q0, q1 as usize, s0, s1 as usize]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hit_filter::Hit;

    fn hit(q_lo: i64, q_hi: i64, s_lo: i64, s_hi: i64) -> Hit {
        Hit::new("q", "s", q_lo, q_hi, s_lo, s_hi, (q_hi - q_lo + 1) as f64)
    }

    #[test]
    fn short_hits_do_not_seed_anchors() {
        let mrna = b"ACGTACGTACGTACGTACGT".to_vec();
        let genomic = mrna.clone();
        let mut hits = vec![hit(0, 4, 0, 4)];
        let (pattern, map) =
            build_pattern(&mut hits, &mrna, &genomic, mrna.len(), None).unwrap();
        assert!(pattern.is_empty());
        assert_eq!(map.len(), 1);
        assert!(map[0].pattern.is_none());
    }

    #[test]
    fn a_perfect_hit_yields_an_interior_anchor() {
        let mrna = b"ACGTACGTACGTACGTACGT".to_vec();
        let genomic = mrna.clone();
        let mut hits = vec![hit(0, 19, 0, 19)];
        let (pattern, map) =
            build_pattern(&mut hits, &mrna, &genomic, mrna.len(), None).unwrap();
        assert_eq!(pattern.len(), 4);
        assert_eq!(map[0].pattern, Some((0, 0)));
        assert_eq!(map[0].q_box, (0, 19));
        // the anchor sits a quarter of the hit length inside each edge
        assert_eq!(pattern, vec![5, 14, 5, 14]);
    }

    #[test]
    fn out_of_range_hits_are_rejected() {
        let mrna = b"ACGTACGTACGTACGTACGT".to_vec();
        let genomic = b"ACGTACGTACGT".to_vec();
        let mut hits = vec![hit(0, 19, 0, 19)];
        assert!(matches!(
            build_pattern(&mut hits, &mrna, &genomic, mrna.len(), None),
            Err(Error::InvalidRange)
        ));
    }

    #[test]
    fn unsorted_subject_coordinates_are_rejected() {
        let mrna = b"ACGTACGTACGTACGTACGTACGTACGTACGT".to_vec();
        let genomic = mrna.clone();
        let mut hits = vec![hit(0, 11, 12, 23), hit(12, 23, 0, 11)];
        assert!(matches!(
            build_pattern(&mut hits, &mrna, &genomic, mrna.len(), None),
            Err(Error::InvalidPatternCoordinates(_))
        ));
    }

    #[test]
    fn long_anchors_are_subdivided_when_capped() {
        let subdivided = subdivide(vec![0, 29, 100, 129], Some(10));
        assert_eq!(subdivided.len() % 4, 0);
        let quads: Vec<_> = subdivided.chunks(4).collect();
        assert!(quads.len() > 1);
        assert_eq!(quads[0][0], 0);
        assert_eq!(quads.last().unwrap()[1], 29);
        for pair in quads.windows(2) {
            assert_eq!(pair[1][0], pair[0][1] + 1);
            assert_eq!(pair[1][2], pair[0][3] + 1);
        }
        // query and subject endpoints stay aligned
        for quad in &quads {
            assert_eq!(quad[1] - quad[0], quad[3] - quad[2]);
        }
    }
}
