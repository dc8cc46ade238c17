use log::debug;

use crate::coverage::{Axis, covered_length};
use crate::hit::{Hit, Strand, hits_min_max};

#[derive(Debug, Clone)]
pub struct CompartmentParams {
    /// Minimal summed hit score for a compartment, in query bp equivalents.
    pub penalty_bp: usize,
    /// Minimal covered query length, in bp.
    pub min_coverage_bp: usize,
    /// Subject gap above which a run of hits is closed.
    pub max_intron: usize,
}

impl Default for CompartmentParams {
    fn default() -> Self {
        Self {
            penalty_bp: 0,
            min_coverage_bp: 0,
            max_intron: 1_200_000,
        }
    }
}

/// A co-linear group of hits corresponding to one candidate gene model.
#[derive(Debug, Clone)]
pub struct Compartment {
    strand: Strand,
    bounds: [i64; 4],
    hits: Vec<Hit>,
    score: f64,
    query_coverage: i64,
}

impl Compartment {
    pub fn strand(&self) -> Strand {
        self.strand
    }

    /// (qmin, qmax, smin, smax) envelope of the compartment's hits.
    pub fn bounds(&self) -> [i64; 4] {
        self.bounds
    }

    pub fn hits(&self) -> &[Hit] {
        &self.hits
    }

    pub fn into_hits(self) -> Vec<Hit> {
        self.hits
    }

    pub fn score(&self) -> f64 {
        self.score
    }

    pub fn query_coverage(&self) -> i64 {
        self.query_coverage
    }
}

/// Group hits into compartments, subject-ascending.
///
/// Per strand, hits are walked along the subject in the direction that makes
/// the query advance with them (downstream for plus, upstream for minus). A
/// run is closed when the next hit would step back on the query or when the
/// subject gap exceeds the intron limit. Runs below the coverage or penalty
/// thresholds are discarded.
pub fn find_compartments(hits: &[Hit], params: &CompartmentParams) -> Vec<Compartment> {
    let mut compartments = Vec::new();

    for strand in [Strand::Plus, Strand::Minus] {
        let mut stranded: Vec<Hit> = hits
            .iter()
            .filter(|h| h.strand() == strand)
            .cloned()
            .collect();
        if stranded.is_empty() {
            continue;
        }
        match strand {
            Strand::Plus => stranded.sort_by(|a, b| {
                a.s_lo().cmp(&b.s_lo()).then_with(|| a.q_lo().cmp(&b.q_lo()))
            }),
            Strand::Minus => stranded.sort_by(|a, b| {
                b.s_hi().cmp(&a.s_hi()).then_with(|| a.q_lo().cmp(&b.q_lo()))
            }),
        }

        let mut run: Vec<Hit> = Vec::new();
        for hit in stranded {
            if let Some(last) = run.last() {
                let advances = hit.q_lo() > last.q_lo();
                let subject_gap = match strand {
                    Strand::Plus => hit.s_lo() - last.s_hi() - 1,
                    Strand::Minus => last.s_lo() - hit.s_hi() - 1,
                };
                if !advances || subject_gap > params.max_intron as i64 {
                    flush_run(&mut run, strand, params, &mut compartments);
                }
            }
            run.push(hit);
        }
        flush_run(&mut run, strand, params, &mut compartments);
    }

    compartments.sort_by(|a, b| a.bounds[2].cmp(&b.bounds[2]));
    compartments
}

fn flush_run(
    run: &mut Vec<Hit>,
    strand: Strand,
    params: &CompartmentParams,
    compartments: &mut Vec<Compartment>,
) {
    if run.is_empty() {
        return;
    }
    let hits = std::mem::take(run);
    let query_coverage = covered_length(&hits, Axis::Query);
    let score: f64 = hits.iter().map(Hit::score).sum();
    if query_coverage < params.min_coverage_bp as i64 || score < params.penalty_bp as f64 {
        debug!(
            "run of {} hits rejected (coverage {query_coverage}, score {score})",
            hits.len()
        );
        return;
    }
    let mut hits = hits;
    hits.sort_by(Hit::cmp_query_start);
    compartments.push(Compartment {
        strand,
        bounds: hits_min_max(&hits),
        hits,
        score,
        query_coverage,
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(q_lo: i64, q_hi: i64, s_lo: i64, s_hi: i64, score: f64) -> Hit {
        Hit::new("q", "s", q_lo, q_hi, s_lo, s_hi, score)
    }

    fn params(penalty: usize, coverage: usize, max_intron: usize) -> CompartmentParams {
        CompartmentParams {
            penalty_bp: penalty,
            min_coverage_bp: coverage,
            max_intron,
        }
    }

    #[test]
    fn colinear_hits_form_one_compartment() {
        let hits = vec![
            hit(0, 99, 1000, 1099, 100.0),
            hit(100, 199, 1300, 1399, 100.0),
        ];
        let comps = find_compartments(&hits, &params(50, 50, 1000));
        assert_eq!(comps.len(), 1);
        assert_eq!(comps[0].bounds(), [0, 199, 1000, 1399]);
        assert_eq!(comps[0].strand(), Strand::Plus);
        assert_eq!(comps[0].query_coverage(), 200);
    }

    #[test]
    fn long_subject_gap_splits_compartments() {
        let hits = vec![
            hit(0, 99, 1000, 1099, 100.0),
            hit(100, 199, 1300, 1399, 100.0),
            hit(200, 299, 10_000, 10_099, 100.0),
        ];
        let comps = find_compartments(&hits, &params(50, 50, 1000));
        assert_eq!(comps.len(), 2);
        assert_eq!(comps[0].bounds(), [0, 199, 1000, 1399]);
        assert_eq!(comps[1].bounds(), [200, 299, 10_000, 10_099]);
    }

    #[test]
    fn query_step_back_splits_compartments() {
        // the second hit restarts the query: a separate gene copy
        let hits = vec![
            hit(0, 199, 1000, 1199, 200.0),
            hit(0, 199, 1500, 1699, 200.0),
        ];
        let comps = find_compartments(&hits, &params(0, 0, 1_200_000));
        assert_eq!(comps.len(), 2);
    }

    #[test]
    fn low_coverage_and_low_score_runs_are_rejected() {
        let hits = vec![hit(0, 39, 1000, 1039, 40.0)];
        assert!(find_compartments(&hits, &params(0, 50, 1000)).is_empty());
        assert!(find_compartments(&hits, &params(50, 0, 1000)).is_empty());
        assert_eq!(find_compartments(&hits, &params(40, 40, 1000)).len(), 1);
    }

    #[test]
    fn minus_strand_walks_the_subject_upstream() {
        let hits = vec![
            hit(0, 99, 5099, 5000, 100.0),
            hit(100, 199, 4099, 4000, 100.0),
        ];
        let comps = find_compartments(&hits, &params(0, 0, 1500));
        assert_eq!(comps.len(), 1);
        assert_eq!(comps[0].strand(), Strand::Minus);
        assert_eq!(comps[0].bounds(), [0, 199, 4000, 5099]);
        // hits are exposed in query order
        assert_eq!(comps[0].hits()[0].q_lo(), 0);
    }

    #[test]
    fn compartments_are_ordered_by_subject_start() {
        let hits = vec![
            hit(0, 199, 9000, 9199, 200.0),
            hit(0, 199, 1000, 1199, 200.0),
        ];
        let comps = find_compartments(&hits, &params(0, 0, 1000));
        assert_eq!(comps.len(), 2);
        assert!(comps[0].bounds()[2] < comps[1].bounds()[2]);
    }
}
