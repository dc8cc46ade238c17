use std::collections::VecDeque;

use crate::aligner::SplicedAligner;
use crate::config::EngineConfig;
use crate::error::Result;
use crate::segment::{Gap, Segment};

/// Terminal exons shorter than this are candidates for demotion.
pub(crate) const MIN_TERM_EXON_SIZE: usize = 20;
/// Identity below which a short terminal exon is demoted.
pub(crate) const MIN_TERM_EXON_IDTY: f64 = 0.90;
/// Subject bases admitted per non-covered query base.
pub(crate) const SUBJ_PER_QUERY: usize = 300;

#[derive(Clone, Copy)]
enum Side {
    Left,
    Right,
}

/// Segment-level post-processing of a raw alignment.
///
/// Improves boundary exons, closes boundary gaps, demotes low-identity,
/// weak-terminal and extra-short exons, and coalesces adjacent gaps.
/// `seq_len1` is the aligned query length (the poly-A tail excluded).
pub(crate) fn postprocess(
    segments: &mut VecDeque<Segment>,
    seq1: &[u8],
    seq2: &[u8],
    seq_len1: usize,
    config: &EngineConfig,
    aligner: &dyn SplicedAligner,
) -> Result<()> {
    if segments.is_empty() {
        return Ok(());
    }
    let min_idty = config.min_exon_identity.max(MIN_TERM_EXON_IDTY);

    // see whether boundary exons can be improved, starting from the left
    let mut k0 = 0;
    while k0 < segments.len() {
        if let Segment::Exon(exon) = &mut segments[k0] {
            if exon.idty < min_idty || config.end_gap_detection {
                exon.improve_from_left(seq1, seq2, aligner)?;
            }
            if exon.idty >= min_idty {
                break;
            }
        }
        k0 += 1;
    }

    // fill the left-hand gap, if any
    if let Some(first) = segments.front() {
        if first.is_exon() && first.q_box().0 > 0 {
            let (q0, _) = first.q_box();
            let (s0, _) = first.s_box();
            segments.push_front(Segment::Gap(Gap::new(0, q0 - 1, 0, s0.saturating_sub(1))));
            k0 += 1;
        }
    }

    let mut k1 = segments.len() as i64 - 1;
    while k1 >= k0 as i64 {
        if let Segment::Exon(exon) = &mut segments[k1 as usize] {
            if exon.idty < min_idty || config.end_gap_detection {
                exon.improve_from_right(seq1, seq2, aligner)?;
            }
            if exon.idty >= min_idty {
                break;
            }
        }
        k1 -= 1;
    }

    // fill the right-hand gap, if any
    let seq_len2 = seq2.len();
    if let Some(last) = segments.back() {
        if last.is_exon() && last.q_box().1 + 1 < seq_len1 {
            let (_, q1) = last.q_box();
            let (_, s1) = last.s_box();
            segments.push_back(Segment::Gap(Gap::new(
                q1 + 1,
                seq_len1 - 1,
                s1 + 1,
                seq_len2.saturating_sub(1),
            )));
        }
    }

    // turn to gaps exons with low identity
    for segment in segments.iter_mut() {
        if segment.is_exon() && segment.idty() < config.min_exon_identity {
            segment.demote();
        }
    }

    // turn to gaps short weak terminal exons
    process_terminal(segments, Side::Left);
    process_terminal(segments, Side::Right);

    // turn to gaps extra-short exons preceded or followed by gaps
    let dim = segments.len();
    for k in 0..dim {
        if !segments[k].is_exon() {
            continue;
        }
        let gap_prev = k > 0 && !segments[k - 1].is_exon();
        let gap_next = k + 1 < dim && !segments[k + 1].is_exon();
        let (q0, q1) = segments[k].q_box();
        if q1 - q0 + 1 <= 5 && (gap_prev || gap_next) {
            segments[k].demote();
        }
    }

    merge_adjacent_gaps(segments);
    Ok(())
}

/// Demote a short terminal exon whose identity is weak or whose intron to
/// the neighboring exon is out of proportion.
fn process_terminal(segments: &mut VecDeque<Segment>, side: Side) {
    let mut exons = Vec::with_capacity(2);
    let indices: Box<dyn Iterator<Item = usize>> = match side {
        Side::Left => Box::new(0..segments.len()),
        Side::Right => Box::new((0..segments.len()).rev()),
    };
    for i in indices {
        if segments[i].is_exon() {
            exons.push(i);
            if exons.len() == 2 {
                break;
            }
        }
    }
    if exons.len() != 2 {
        return;
    }
    let (term, inner) = (exons[0], exons[1]);

    let (q0, q1) = segments[term].q_box();
    let exon_size = q1 - q0 + 1;
    if exon_size >= MIN_TERM_EXON_SIZE {
        return;
    }

    let turn_to_gap = if segments[term].idty() < MIN_TERM_EXON_IDTY {
        true
    } else {
        let (intron_end, intron_start) = match side {
            Side::Left => (segments[inner].s_box().0, segments[term].s_box().1),
            Side::Right => (segments[term].s_box().0, segments[inner].s_box().1),
        };
        let intron_len = intron_end.saturating_sub(intron_start);
        intron_len > exon_size * SUBJ_PER_QUERY
    };

    if turn_to_gap {
        segments[term].demote();
    }
}

/// Merge every run of adjacent gaps into one gap spanning the union, with
/// its boxes squeezed against the neighboring exons.
fn merge_adjacent_gaps(segments: &mut VecDeque<Segment>) {
    let old: Vec<Segment> = segments.drain(..).collect();
    let mut open_gap: Option<Gap> = None;

    for (k, segment) in old.iter().enumerate() {
        match segment {
            Segment::Gap(gap) => {
                if open_gap.is_none() {
                    let mut gap = gap.clone();
                    if k > 0 {
                        gap.q_box.0 = old[k - 1].q_box().1 + 1;
                        gap.s_box.0 = old[k - 1].s_box().1 + 1;
                    }
                    open_gap = Some(gap);
                }
            }
            Segment::Exon(exon) => {
                if let Some(mut gap) = open_gap.take() {
                    gap.q_box.1 = exon.q_box.0.saturating_sub(1);
                    gap.s_box.1 = exon.s_box.0.saturating_sub(1);
                    gap.len = (gap.q_box.1 + 1).saturating_sub(gap.q_box.0);
                    segments.push_back(Segment::Gap(gap));
                }
                segments.push_back(segment.clone());
            }
        }
    }
    if let Some(mut gap) = open_gap.take() {
        let last = old.last().unwrap();
        gap.q_box.1 = last.q_box().1;
        gap.s_box.1 = last.s_box().1;
        gap.len = (gap.q_box.1 + 1).saturating_sub(gap.q_box.0);
        segments.push_back(Segment::Gap(gap));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aligner::NwSplicedAligner;
    use crate::segment::Exon;

    fn exon(q_box: (usize, usize), s_box: (usize, usize), details: &str) -> Segment {
        let mut exon = Exon {
            q_box,
            s_box,
            details: details.to_string(),
            annot: "  <exon>  ".to_string(),
            idty: 0.0,
            len: 0,
            score: 0,
        };
        exon.update(&NwSplicedAligner::new()).unwrap();
        Segment::Exon(exon)
    }

    fn run(
        segments: Vec<Segment>,
        seq1: &[u8],
        seq2: &[u8],
        seq_len1: usize,
        config: &EngineConfig,
    ) -> Vec<Segment> {
        let mut deque: VecDeque<Segment> = segments.into();
        postprocess(
            &mut deque,
            seq1,
            seq2,
            seq_len1,
            config,
            &NwSplicedAligner::new(),
        )
        .unwrap();
        deque.into()
    }

    #[test]
    fn boundary_gaps_close_the_query_range() {
        let seq = b"ACGTACGTACGTACGTACGTACGTACGTAC".to_vec();
        let segments = vec![exon((5, 24), (5, 24), &"M".repeat(20))];
        let out = run(segments, &seq, &seq, 30, &EngineConfig::default());

        assert_eq!(out.len(), 3);
        assert!(!out[0].is_exon() && out[0].q_box() == (0, 4));
        assert!(out[1].is_exon());
        assert!(!out[2].is_exon() && out[2].q_box() == (25, 29));
    }

    #[test]
    fn low_identity_exons_become_gaps() {
        let seq1 = b"ACGTACGTACTTTTTTTTTTACGTACGTAC".to_vec();
        let seq2 = b"ACGTACGTACAAAAAAAAAAACGTACGTAC".to_vec();
        let segments = vec![
            exon((0, 9), (0, 9), &"M".repeat(10)),
            exon((10, 19), (10, 19), &"R".repeat(10)),
            exon((20, 29), (20, 29), &"M".repeat(10)),
        ];
        let out = run(segments, &seq1, &seq2, 30, &EngineConfig::default());

        assert_eq!(out.len(), 3);
        assert!(out[0].is_exon() && out[2].is_exon());
        assert!(!out[1].is_exon());
        // the gap exactly fills the inter-exon query span
        assert_eq!(out[1].q_box(), (10, 19));
    }

    #[test]
    fn tiny_exons_next_to_gaps_are_demoted_and_gaps_merged() {
        let seq = b"ACGTACGTACGTACGTACGT".to_vec();
        let segments = vec![
            exon((0, 9), (0, 9), &"M".repeat(10)),
            Segment::Gap(Gap::new(10, 14, 10, 14)),
            exon((15, 19), (15, 19), &"M".repeat(5)),
        ];
        let out = run(segments, &seq, &seq, 20, &EngineConfig::default());

        assert_eq!(out.len(), 2);
        assert!(out[0].is_exon());
        assert!(!out[1].is_exon());
        assert_eq!(out[1].q_box(), (10, 19));
        assert_eq!(out[1].len(), 10);
    }

    #[test]
    fn short_terminal_exon_with_overlong_intron_is_demoted() {
        let mut seq2 = b"ACGTACGTAC".to_vec();
        seq2.extend(std::iter::repeat_n(b'T', 49_990));
        seq2.extend_from_slice(b"ACGTACGTACGTACGTACGT");
        let seq1 = b"ACGTACGTACACGTACGTACGTACGTACGT".to_vec();

        let segments = vec![
            exon((0, 9), (0, 9), &"M".repeat(10)),
            exon((10, 29), (50_000, 50_019), &"M".repeat(20)),
        ];
        let out = run(segments, &seq1, &seq2, 30, &EngineConfig::default());

        assert_eq!(out.len(), 2);
        assert!(!out[0].is_exon());
        assert!(out[1].is_exon());
    }

    #[test]
    fn no_two_adjacent_gaps_survive() {
        let seq = b"ACGTACGTACGTACGTACGTACGTACGTAC".to_vec();
        let segments = vec![
            Segment::Gap(Gap::new(0, 4, 0, 4)),
            Segment::Gap(Gap::new(5, 9, 5, 9)),
            exon((10, 29), (10, 29), &"M".repeat(20)),
        ];
        let out = run(segments, &seq, &seq, 30, &EngineConfig::default());

        assert_eq!(out.len(), 2);
        assert!(!out[0].is_exon());
        assert_eq!(out[0].q_box(), (0, 9));
        assert!(out[1].is_exon());
    }
}
