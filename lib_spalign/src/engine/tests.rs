use hit_filter::{Hit, Strand};

use super::{Engine, test_polya};
use crate::accessor::MemoryAccessor;
use crate::aligner::NwSplicedAligner;
use crate::config::EngineConfig;
use crate::error::Error;
use crate::segment::Segment;

fn engine(config: EngineConfig, accessor: MemoryAccessor) -> Engine {
    let mut engine = Engine::new(config);
    engine
        .set_aligner(Box::new(NwSplicedAligner::new()))
        .set_accessor(Box::new(accessor));
    engine
}

fn hit(q_lo: i64, q_hi: i64, s_lo: i64, s_hi: i64, score: f64) -> Hit {
    Hit::new("query", "subj", q_lo, q_hi, s_lo, s_hi, score)
}

fn exon(segment: &Segment) -> &crate::segment::Exon {
    segment.as_exon().expect("expected an exon")
}

#[test]
fn single_exon_plus_strand() {
    let query = b"ATGAAACCCGGGTTT".to_vec();
    let mut subject = vec![b'C'; 100];
    subject.extend_from_slice(&query);
    subject.extend(vec![b'C'; 100]);

    let mut accessor = MemoryAccessor::new();
    accessor.insert("query", query);
    accessor.insert("subj", subject);

    let mut engine = engine(EngineConfig::default(), accessor);
    let results = engine.run(vec![hit(0, 14, 100, 114, 15.0)]).unwrap();

    assert_eq!(results.len(), 1);
    let aligned = &results[0];
    assert!(!aligned.error);
    assert_eq!(aligned.id, 0);
    assert_eq!(aligned.query_strand, Strand::Plus);
    assert_eq!(aligned.subj_strand, Strand::Plus);
    assert_eq!(aligned.segments.len(), 1);

    let first = exon(&aligned.segments[0]);
    assert_eq!(first.q_box, (0, 14));
    assert_eq!(first.s_box, (100, 114));
    assert_eq!(first.idty, 1.0);
    assert_eq!(first.details, "MMMMMMMMMMMMMMM");
    assert_eq!(aligned.identity(), 1.0);
}

#[test]
fn two_exons_with_consensus_intron() {
    let exon1 = b"ATGGCCAAATTTGGGCCCAAATTTGGGCCA";
    let exon2 = b"TTACCGGTTACCGGTTACCGGTTACCGGAA";
    let mut intron = b"GT".to_vec();
    intron.extend(std::iter::repeat_n(b'C', 196));
    intron.extend_from_slice(b"AG");

    let mut query = exon1.to_vec();
    query.extend_from_slice(exon2);
    let mut subject = vec![b'T'; 100];
    subject.extend_from_slice(exon1);
    subject.extend_from_slice(&intron);
    subject.extend_from_slice(exon2);
    subject.extend(vec![b'T'; 50]);

    let mut accessor = MemoryAccessor::new();
    accessor.insert("query", query);
    accessor.insert("subj", subject);

    let mut engine = engine(EngineConfig::default(), accessor);
    let results = engine
        .run(vec![
            hit(0, 29, 100, 129, 30.0),
            hit(30, 59, 330, 359, 30.0),
        ])
        .unwrap();

    assert_eq!(results.len(), 1);
    let aligned = &results[0];
    assert!(!aligned.error, "{}", aligned.message);
    assert_eq!(aligned.segments.len(), 3);

    let first = exon(&aligned.segments[0]);
    assert_eq!(first.q_box, (0, 29));
    assert_eq!(first.s_box, (100, 129));
    assert_eq!(first.donor(), Some(*b"GT"));

    let Segment::Gap(intron_gap) = &aligned.segments[1] else {
        panic!("expected the intron gap");
    };
    assert_eq!(intron_gap.s_box, (130, 329));
    assert_eq!(intron_gap.len, 0);

    let second = exon(&aligned.segments[2]);
    assert_eq!(second.q_box, (30, 59));
    assert_eq!(second.s_box, (330, 359));
    assert_eq!(second.acceptor(), Some(*b"AG"));
}

#[test]
fn minus_strand_query_reports_original_coordinates() {
    // the stored query is the reverse complement of the genomic exon
    let query = b"AAACCCGGGTTTCAT".to_vec();
    let mut subject = vec![b'C'; 100];
    subject.extend_from_slice(b"ATGAAACCCGGGTTT");
    subject.extend(vec![b'C'; 100]);

    let mut accessor = MemoryAccessor::new();
    accessor.insert("query", query);
    accessor.insert("subj", subject);

    let config = EngineConfig {
        query_strand: Strand::Minus,
        ..EngineConfig::default()
    };
    let mut engine = engine(config, accessor);
    let results = engine.run(vec![hit(0, 14, 114, 100, 15.0)]).unwrap();

    assert_eq!(results.len(), 1);
    let aligned = &results[0];
    assert!(!aligned.error, "{}", aligned.message);
    assert_eq!(aligned.query_strand, Strand::Minus);
    assert_eq!(aligned.subj_strand, Strand::Plus);
    assert_eq!(aligned.segments.len(), 1);

    let first = exon(&aligned.segments[0]);
    assert_eq!(first.q_box, (14, 0));
    assert_eq!(first.s_box, (100, 114));
    assert_eq!(first.details, "MMMMMMMMMMMMMMM");
}

#[test]
fn polya_tail_is_excluded_from_the_alignment() {
    let exon_seq = b"ATGGCCAAATTTGGGCCCAAATTTGGGCCG";
    let mut query = exon_seq.to_vec();
    query.extend_from_slice(b"AAAAAAAA");
    let mut subject = vec![b'C'; 100];
    subject.extend_from_slice(exon_seq);
    subject.extend(vec![b'G'; 50]);

    let mut accessor = MemoryAccessor::new();
    accessor.insert("query", query);
    accessor.insert("subj", subject);

    let mut engine = engine(EngineConfig::default(), accessor);
    let results = engine.run(vec![hit(0, 29, 100, 129, 30.0)]).unwrap();

    assert_eq!(engine.polya_start(), Some(30));
    let aligned = &results[0];
    assert!(!aligned.error, "{}", aligned.message);
    assert_eq!(aligned.segments.len(), 1);

    let first = exon(&aligned.segments[0]);
    assert_eq!(first.q_box, (0, 29));
    assert_eq!(first.s_box, (100, 129));
}

#[test]
fn mismatched_leading_region_is_trimmed_to_a_gap() {
    let head_q = b"AAAAACCCCCGGGGG";
    let head_s = b"TTTTTGGGGGCCCCC";
    let tail = b"ACGTACGTACGTACGTACGTACGTACGTACGTACG";

    let mut query = head_q.to_vec();
    query.extend_from_slice(tail);
    let mut subject = vec![b'T'; 100];
    subject.extend_from_slice(head_s);
    subject.extend_from_slice(tail);
    subject.extend(vec![b'T'; 30]);

    let mut accessor = MemoryAccessor::new();
    accessor.insert("query", query);
    accessor.insert("subj", subject);

    let mut engine = engine(EngineConfig::default(), accessor);
    let results = engine.run(vec![hit(0, 49, 100, 149, 50.0)]).unwrap();

    let aligned = &results[0];
    assert!(!aligned.error, "{}", aligned.message);
    assert_eq!(aligned.segments.len(), 2);

    assert!(!aligned.segments[0].is_exon());
    assert_eq!(aligned.segments[0].q_box(), (0, 14));

    let second = exon(&aligned.segments[1]);
    assert_eq!(second.q_box, (15, 49));
    assert_eq!(second.s_box, (115, 149));
    assert_eq!(second.idty, 1.0);
}

#[test]
fn a_failing_compartment_does_not_stop_the_run() {
    let region = b"ATGGCCAAATTTGGGCCCAAATTTGGGCCA";
    let mut subject = vec![b'C'; 100];
    subject.extend_from_slice(region);
    subject.extend(vec![b'C'; 170]);

    let mut accessor = MemoryAccessor::new();
    accessor.insert("query", region.to_vec());
    accessor.insert("subj", subject);

    let mut engine = engine(EngineConfig::default(), accessor);
    let results = engine
        .run(vec![
            hit(0, 29, 100, 129, 30.0),
            // a second gene copy past the end of the loaded subject
            hit(0, 29, 5000, 5029, 30.0),
        ])
        .unwrap();

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].id, 0);
    assert!(!results[0].error);
    assert_eq!(results[1].id, 1);
    assert!(results[1].error);
    assert!(results[1].segments.is_empty());
}

#[test]
fn missing_collaborators_and_bad_config_abort_the_run() {
    let hits = vec![hit(0, 14, 100, 114, 15.0)];

    let mut bare = Engine::new(EngineConfig::default());
    assert!(matches!(
        bare.run(hits.clone()),
        Err(Error::SequenceAccessorNotSpecified)
    ));

    bare.set_accessor(Box::new(MemoryAccessor::new()));
    assert!(matches!(
        bare.run(hits.clone()),
        Err(Error::AlignerNotSpecified)
    ));

    bare.set_aligner(Box::new(NwSplicedAligner::new()));
    assert!(matches!(bare.run(Vec::new()), Err(Error::EmptyHitVector)));

    let config = EngineConfig {
        min_exon_identity: 1.5,
        ..EngineConfig::default()
    };
    let mut invalid = Engine::new(config);
    invalid
        .set_aligner(Box::new(NwSplicedAligner::new()))
        .set_accessor(Box::new(MemoryAccessor::new()));
    assert!(matches!(
        invalid.run(hits),
        Err(Error::BadIdentityThreshold)
    ));
}

#[test]
fn polya_detection_requires_at_least_four_trailing_a() {
    assert_eq!(test_polya(b"ATGCCC"), None);
    assert_eq!(test_polya(b"ATGCCCAAA"), None);
    assert_eq!(test_polya(b"ATGCCCAAAA"), Some(6));
    assert_eq!(test_polya(b"AAAAAA"), Some(0));
}
