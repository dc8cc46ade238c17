use super::{Exon, Gap, Segment, is_consensus_splice};
use crate::aligner::NwSplicedAligner;

fn exon(q_box: (usize, usize), s_box: (usize, usize), details: &str, annot: &str) -> Exon {
    let mut exon = Exon {
        q_box,
        s_box,
        details: details.to_string(),
        annot: annot.to_string(),
        idty: 0.0,
        len: 0,
        score: 0,
    };
    exon.update(&NwSplicedAligner::new()).unwrap();
    exon
}

#[test]
fn update_recomputes_identity_length_and_score() {
    let exon = exon((0, 9), (0, 9), "MMMMMRRMMM", "  <exon>GT");
    assert_eq!(exon.len, 10);
    assert!((exon.idty - 0.8).abs() < 1e-9);
    assert_eq!(exon.score, 6);
}

#[test]
fn donor_and_acceptor_come_from_the_annotation() {
    let exon = exon((0, 9), (10, 19), "MMMMMMMMMM", "AG<exon>GT");
    assert_eq!(exon.donor(), Some(*b"GT"));
    assert_eq!(exon.acceptor(), Some(*b"AG"));

    let gap_like = exon_annotless();
    assert_eq!(gap_like.donor(), None);
    assert_eq!(gap_like.acceptor(), None);
}

fn exon_annotless() -> Exon {
    exon((0, 9), (0, 9), "MMMMMMMMMM", "")
}

#[test]
fn consensus_splice_accepts_gt_and_gc_donors() {
    assert!(is_consensus_splice(Some(*b"GT"), Some(*b"AG")));
    assert!(is_consensus_splice(Some(*b"GC"), Some(*b"AG")));
    assert!(!is_consensus_splice(Some(*b"GA"), Some(*b"AG")));
    assert!(!is_consensus_splice(Some(*b"GT"), Some(*b"AC")));
    assert!(!is_consensus_splice(None, Some(*b"AG")));
}

#[test]
fn improve_from_left_cuts_a_mismatched_head() {
    let aligner = NwSplicedAligner::new();
    let seq1 = b"TTACGTACGT";
    let seq2 = b"GGACGTACGT";
    let mut exon = exon((0, 9), (0, 9), "RRMMMMMMMM", "GG<exon>  ");

    exon.improve_from_left(seq1, seq2, &aligner).unwrap();
    assert_eq!(exon.q_box, (2, 9));
    assert_eq!(exon.s_box, (2, 9));
    assert_eq!(exon.details, "MMMMMMMM");
    assert_eq!(exon.idty, 1.0);
}

#[test]
fn improve_from_right_cuts_a_mismatched_tail() {
    let aligner = NwSplicedAligner::new();
    let seq1 = b"ACGTACGTTT";
    let seq2 = b"ACGTACGTGG";
    let mut exon = exon((0, 9), (0, 9), "MMMMMMMMRR", "  <exon>GG");

    exon.improve_from_right(seq1, seq2, &aligner).unwrap();
    assert_eq!(exon.q_box, (0, 7));
    assert_eq!(exon.s_box, (0, 7));
    assert_eq!(exon.details, "MMMMMMMM");
    assert_eq!(exon.idty, 1.0);
}

#[test]
fn improvement_leaves_short_and_clean_exons_alone() {
    let aligner = NwSplicedAligner::new();
    let seq1 = b"ACG";
    let seq2 = b"TCG";
    let mut short = exon((0, 2), (0, 2), "RMM", "  <exon>  ");
    let before = short.clone();
    short.improve_from_left(seq1, seq2, &aligner).unwrap();
    assert_eq!(short, before);

    let seq1 = b"ACGTACGT";
    let mut clean = exon((0, 7), (0, 7), "MMMMMMMM", "  <exon>  ");
    let before = clean.clone();
    clean.improve_from_left(seq1, seq1, &aligner).unwrap();
    clean.improve_from_right(seq1, seq1, &aligner).unwrap();
    assert_eq!(clean, before);
}

#[test]
fn demotion_turns_an_exon_into_a_gap() {
    let mut segment = Segment::Exon(exon((5, 14), (100, 109), "MMMMMMMMMM", "  <exon>  "));
    segment.demote();
    assert_eq!(
        segment,
        Segment::Gap(Gap::new(5, 14, 100, 109))
    );
    assert_eq!(segment.len(), 10);
    assert_eq!(segment.idty(), 0.0);
}

#[test]
fn intron_gaps_have_an_empty_query_box() {
    let gap = Gap::new(10, 9, 100, 299);
    assert_eq!(gap.len, 0);
    assert_eq!(gap.s_box, (100, 299));
}
