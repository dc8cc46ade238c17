use std::collections::HashMap;

use itertools::Itertools;
use log::debug;

use crate::coverage::{Axis, covered_length};
use crate::error::{Error, Result};
use crate::hit::{Hit, Q_HI, Q_LO, S_HI, S_LO, same_order};

/// Which strands take part in filtering.
///
/// `Auto` runs the filter once per strand and then keeps the higher-scoring
/// strand, or merges both when all groups are requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrandPolicy {
    Plus,
    Minus,
    Both,
    Auto,
}

/// How an overlap between a kept hit and a candidate hit is resolved on one
/// axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SplitMode {
    /// Move the candidate's offending end just past the kept hit, splitting
    /// the candidate in two when it embraces the kept hit.
    MaxScore,
    /// Trim the candidate so it no longer overlaps; remove it on containment.
    Clear,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    MaxScore,
    MaxScoreGroupSelect,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupIdentification {
    None,
    QueryCoverage,
    SubjectCoverage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Combine,
    GroupSelect,
    Normal,
}

#[derive(Debug, Clone)]
pub struct FilterParams {
    pub method: Method,
    pub strand: StrandPolicy,
    pub same_order: bool,
    pub split_query: SplitMode,
    pub split_subject: SplitMode,
    /// Round trims to codon boundaries (protein-to-nucleotide hit sets).
    pub frame_preserving: bool,
    pub proximity_pre: Option<f64>,
    pub proximity_post: Option<f64>,
    pub max_hit_dist_query: i64,
    pub max_hit_dist_subj: i64,
    pub group_identification: GroupIdentification,
    /// Minimal sensible coverage raise for a coverage-driven group split.
    pub coverage_step: f64,
    pub output_all_groups: bool,
}

impl Default for FilterParams {
    fn default() -> Self {
        Self {
            method: Method::MaxScore,
            strand: StrandPolicy::Auto,
            same_order: true,
            split_query: SplitMode::MaxScore,
            split_subject: SplitMode::MaxScore,
            frame_preserving: false,
            proximity_pre: None,
            proximity_post: None,
            max_hit_dist_query: i64::MAX,
            max_hit_dist_subj: i64::MAX,
            group_identification: GroupIdentification::None,
            coverage_step: 0.9,
            output_all_groups: false,
        }
    }
}

/// Greedy resolution of overlapping hits into a conflict-free subset.
///
/// The filter deduplicates the input, translates all coordinates so the
/// global envelope starts at the origin, resolves overlaps per the configured
/// split modes, and restores the original frame on output. Hits emptied by
/// clipping are dropped on the way out.
pub struct HitFilter {
    params: FilterParams,
    hits: Vec<Hit>,
    envelope: [i64; 4],
    origin: [i64; 2],
    next_group_id: u32,
}

impl HitFilter {
    pub fn run(params: FilterParams, hits: Vec<Hit>, mode: Mode) -> Result<Vec<Hit>> {
        if hits.is_empty() {
            return Err(Error::NoHits);
        }
        if params.same_order && params.strand == StrandPolicy::Both {
            return Err(Error::IncompatibleStrandPolicy);
        }

        let mut filter = Self {
            params,
            hits,
            envelope: [0; 4],
            origin: [0; 2],
            next_group_id: 0,
        };
        debug!("filtering {} hits", filter.hits.len());

        filter.remove_equal();
        filter.transform_coordinates(true);
        let pre = filter.params.proximity_pre;
        filter.combine(pre);

        let mut inverse = Vec::new();
        match filter.params.strand {
            StrandPolicy::Plus => filter.hits.retain(Hit::is_plus_strand),
            StrandPolicy::Minus => filter.hits.retain(|h| !h.is_plus_strand()),
            StrandPolicy::Auto => {
                let (plus, minus): (Vec<Hit>, Vec<Hit>) = std::mem::take(&mut filter.hits)
                    .into_iter()
                    .partition(Hit::is_plus_strand);
                filter.hits = plus;
                inverse = minus;
            }
            StrandPolicy::Both => {}
        }

        filter.calc_global_envelope();
        filter.run_mode(mode);

        if filter.params.strand == StrandPolicy::Auto {
            let plus_out = std::mem::replace(&mut filter.hits, inverse);
            filter.calc_global_envelope();
            filter.run_mode(mode);

            if mode != Mode::Normal || filter.params.output_all_groups {
                filter.hits.extend(plus_out);
            } else {
                let plus_score: f64 = plus_out.iter().map(Hit::score).sum();
                let minus_score: f64 = filter.hits.iter().map(Hit::score).sum();
                if plus_score > minus_score {
                    filter.hits = plus_out;
                }
            }
        }

        let post = filter.params.proximity_post;
        filter.combine(post);
        filter.transform_coordinates(false);

        if filter.hits.is_empty() {
            return Err(Error::NoHitsAfterFiltering);
        }
        debug!("{} hits kept", filter.hits.len());
        Ok(filter.hits)
    }

    fn run_mode(&mut self, mode: Mode) {
        match mode {
            Mode::Combine => {}
            Mode::GroupSelect => self.run_msgs(true),
            Mode::Normal => {
                self.identify_max_dist_groups();
                match self.params.method {
                    Method::MaxScore => self.run_max_score(),
                    Method::MaxScoreGroupSelect => self.run_msgs(false),
                }
                if !self.params.output_all_groups {
                    // connecting hits may have perished, so cluster again
                    self.identify_max_dist_groups();
                    self.filter_by_max_dist();
                }
            }
        }
    }

    fn calc_global_envelope(&mut self) {
        if self.hits.is_empty() {
            self.envelope = [0; 4];
            return;
        }
        self.envelope = crate::hit::hits_min_max(&self.hits);
    }

    /// Deduplicate by checksum, then by equality on the four original
    /// endpoints.
    fn remove_equal(&mut self) {
        let mut seen: HashMap<i64, Vec<[i64; 4]>> = HashMap::new();
        self.hits.retain(|h| {
            let endpoints = [
                h.original_boundary(Q_LO),
                h.original_boundary(Q_HI),
                h.original_boundary(S_LO),
                h.original_boundary(S_HI),
            ];
            let checksum = endpoints.iter().sum::<i64>() % 1000;
            let bucket = seen.entry(checksum).or_default();
            if bucket.contains(&endpoints) {
                false
            } else {
                bucket.push(endpoints);
                true
            }
        });
    }

    fn transform_coordinates(&mut self, forward: bool) {
        if forward {
            self.calc_global_envelope();
            self.origin = [self.envelope[0], self.envelope[2]];
            for hit in &mut self.hits {
                hit.translate(-self.origin[0], -self.origin[1]);
            }
        } else {
            for hit in &mut self.hits {
                hit.translate(self.origin[0], self.origin[1]);
            }
            // delete the slack
            self.hits
                .retain(|h| h.q_hi() != h.q_lo() && h.s_hi() != h.s_lo());
        }
        self.calc_global_envelope();
    }

    /// Normalized proximity of two hits, 0 (same place) to 1 (unrelated).
    fn proximity(&self, h1: &Hit, h2: &Hit) -> f64 {
        let widths = [
            self.envelope[1] - self.envelope[0] + 1,
            self.envelope[3] - self.envelope[2] + 1,
        ];
        let dm = widths[0].max(widths[1]) as f64;

        let mut ad = [0.0f64; 2];
        for axis in 0..2 {
            let (lo, hi) = (axis * 2, axis * 2 + 1);
            let (a0, a1) = (h1.boundary(lo), h1.boundary(hi));
            let (b0, b1) = (h2.boundary(lo), h2.boundary(hi));
            ad[axis] = if a1 <= b0 {
                (b0 - a1 - 1) as f64 / dm
            } else if b1 <= a0 {
                (a0 - b1 - 1) as f64 / dm
            } else if (a0 <= b0 && b1 <= a1) || (b0 <= a0 && a1 <= b1) {
                1.0
            } else if b0 <= a0 && a0 <= b1 {
                (b1 - a0 + 1) as f64 / (a1 - b0 + 1) as f64
            } else {
                (a1 - b0 + 1) as f64 / (b1 - a0 + 1) as f64
            };
        }
        ad[0].max(ad[1])
    }

    /// Repeatedly merge hit pairs closer than the given proximity, per
    /// strand, highest scores first.
    fn combine(&mut self, proximity: Option<f64>) {
        let Some(limit) = proximity else {
            return;
        };
        if self.hits.is_empty() {
            return;
        }
        self.calc_global_envelope();

        let (mut plus, mut minus): (Vec<Hit>, Vec<Hit>) = std::mem::take(&mut self.hits)
            .into_iter()
            .partition(Hit::is_plus_strand);

        for stranded in [&mut plus, &mut minus] {
            if stranded.len() < 2 {
                continue;
            }
            loop {
                stranded.sort_by(Hit::cmp_score_desc);
                let mut slots: Vec<Option<Hit>> = stranded.drain(..).map(Some).collect();
                let mut count = 0;
                for i1 in 0..slots.len() {
                    if slots[i1].is_none() {
                        continue;
                    }
                    for j1 in i1 + 1..slots.len() {
                        let Some(candidate) = slots[j1].as_ref() else {
                            continue;
                        };
                        let keeper = slots[i1].as_ref().unwrap();
                        if self.proximity(keeper, candidate) <= limit {
                            let merged = keeper.combined(candidate);
                            slots[i1] = Some(merged);
                            slots[j1] = None;
                            count += 1;
                        }
                    }
                }
                stranded.extend(slots.into_iter().flatten());
                if count == 0 {
                    break;
                }
            }
        }

        self.hits = plus;
        self.hits.append(&mut minus);
        self.hits.sort_by(Hit::cmp_score_desc);
    }

    /// One hit is contained in the other on at least one axis.
    fn detect_inclusion(h1: &Hit, h2: &Hit) -> bool {
        for axis in 0..2 {
            let (lo, hi) = (axis * 2, axis * 2 + 1);
            if h2.boundary(lo) <= h1.boundary(lo) && h1.boundary(hi) <= h2.boundary(hi) {
                return true;
            }
            if h1.boundary(lo) <= h2.boundary(lo) && h2.boundary(hi) <= h1.boundary(hi) {
                return true;
            }
        }
        false
    }

    /// Trim the candidate so it no longer overlaps the kept hit on the given
    /// axis (0 = query, 1 = subject).
    fn clear_trim(&self, kept: &Hit, candidate: &mut Hit, axis: usize) {
        let (lo, hi) = (axis * 2, axis * 2 + 1);
        if kept.boundary(lo) <= candidate.boundary(lo)
            && candidate.boundary(lo) <= kept.boundary(hi)
        {
            let mut n = kept.boundary(hi) + 1;
            if self.params.frame_preserving {
                while (n - candidate.boundary(lo)) % 3 != 0 {
                    n += 1;
                }
            }
            candidate.move_boundary(lo, n);
        } else if kept.boundary(lo) <= candidate.boundary(hi)
            && candidate.boundary(hi) <= kept.boundary(hi)
        {
            let mut n = kept.boundary(lo) - 1;
            if self.params.frame_preserving {
                while (candidate.boundary(hi) - n) % 3 != 0 {
                    n -= 1;
                }
            }
            candidate.move_boundary(hi, n);
        }
    }

    /// Maximum score method: repeatedly take the top-scoring hit and resolve
    /// every other hit against it so the top hit stays intact and overlap
    /// free. Splits re-run the whole loop.
    fn run_max_score(&mut self) {
        let mut restart = true;
        while restart {
            restart = false;
            let mut i0 = 0;
            while i0 + 1 < self.hits.len() {
                self.hits[i0..].sort_by(Hit::cmp_score_desc);
                let kept = self.hits[i0].clone();

                let mut j0 = self.hits.len() - 1;
                while j0 > i0 {
                    self.resolve_pair(&kept, j0, &mut restart);
                    if restart {
                        break;
                    }
                    j0 -= 1;
                }

                if self.params.same_order {
                    self.filter_by_order(i0);
                }
                if restart {
                    break;
                }
                i0 += 1;
            }
        }
    }

    /// Resolve the candidate at `j0` against the kept hit. Returns true when
    /// the candidate was removed from the vector.
    fn resolve_pair(&mut self, kept: &Hit, j0: usize, restart: &mut bool) -> bool {
        let clear_query = self.params.split_query == SplitMode::Clear;
        let clear_subject = self.params.split_subject == SplitMode::Clear;

        if (clear_query || clear_subject) && Self::detect_inclusion(kept, &self.hits[j0]) {
            self.hits.remove(j0);
            return true;
        }
        if clear_query {
            let mut candidate = self.hits[j0].clone();
            self.clear_trim(kept, &mut candidate, 0);
            if !candidate.is_consistent() {
                self.hits.remove(j0);
                return true;
            }
            self.hits[j0] = candidate;
        }
        if clear_subject {
            let mut candidate = self.hits[j0].clone();
            self.clear_trim(kept, &mut candidate, 1);
            if !candidate.is_consistent() {
                self.hits.remove(j0);
                return true;
            }
            self.hits[j0] = candidate;
        }

        // Two possibilities remain: at least one end of the candidate lies
        // inside the kept hit, or the candidate embraces the kept hit.

        // (1) ends inside: move the offending end just past the kept hit,
        // rechecking until no end is left inside.
        let mut b = [false; 4];
        let mut first_loop = true;
        loop {
            if !first_loop {
                for i in 0..4 {
                    if b[i] {
                        let candidate = &mut self.hits[j0];
                        match i {
                            0 => {
                                candidate.move_boundary(Q_LO, kept.boundary(Q_HI) + 1);
                                for d in 2..4 {
                                    b[d] = kept.boundary(S_LO) <= candidate.boundary(d)
                                        && candidate.boundary(d) <= kept.boundary(S_HI);
                                }
                            }
                            1 => {
                                candidate.move_boundary(Q_HI, kept.boundary(Q_LO) - 1);
                                for d in 2..4 {
                                    b[d] = kept.boundary(S_LO) <= candidate.boundary(d)
                                        && candidate.boundary(d) <= kept.boundary(S_HI);
                                }
                            }
                            2 => {
                                candidate.move_boundary(S_LO, kept.boundary(S_HI) + 1);
                                for d in 0..2 {
                                    b[d] = kept.boundary(Q_LO) <= candidate.boundary(d)
                                        && candidate.boundary(d) <= kept.boundary(Q_HI);
                                }
                            }
                            3 => {
                                candidate.move_boundary(S_HI, kept.boundary(S_LO) - 1);
                                for d in 0..2 {
                                    b[d] = kept.boundary(Q_LO) <= candidate.boundary(d)
                                        && candidate.boundary(d) <= kept.boundary(Q_HI);
                                }
                            }
                            _ => unreachable!(),
                        }
                    }
                    if !self.hits[j0].is_consistent() {
                        self.hits.remove(j0);
                        return true;
                    }
                }
            } else {
                first_loop = false;
            }

            let candidate = &self.hits[j0];
            for i in 0..2 {
                b[i] = kept.boundary(Q_LO) <= candidate.boundary(i)
                    && candidate.boundary(i) <= kept.boundary(Q_HI);
            }
            for i in 2..4 {
                b[i] = kept.boundary(S_LO) <= candidate.boundary(i)
                    && candidate.boundary(i) <= kept.boundary(S_HI);
            }
            if (b[0] && b[1]) || (b[2] && b[3]) {
                self.hits.remove(j0);
                return true;
            }
            if !(b[0] || b[1] || b[2] || b[3]) {
                break;
            }
        }

        // (2) embrace: split the candidate at the kept hit's boundaries,
        // cutting on the axes that minimize the overlap given the strand.
        let candidate = &self.hits[j0];
        let ad = [
            kept.boundary(Q_LO) - candidate.boundary(Q_LO),
            candidate.boundary(Q_HI) - kept.boundary(Q_HI),
            kept.boundary(S_LO) - candidate.boundary(S_LO),
            candidate.boundary(S_HI) - kept.boundary(S_HI),
        ];
        let ab = [ad[0] > 0, ad[1] > 0, ad[2] > 0, ad[3] > 0];
        if !((ab[0] && ab[1]) || (ab[2] && ab[3])) {
            return false;
        }

        let (n1, n1x, n2, n2x) = if candidate.is_plus_strand() {
            if !(ab[2] && ab[3]) {
                (Q_HI, kept.boundary(Q_LO) - 1, Q_LO, kept.boundary(Q_HI) + 1)
            } else if !(ab[0] && ab[1]) {
                (S_HI, kept.boundary(S_LO) - 1, S_LO, kept.boundary(S_HI) + 1)
            } else {
                let (n1, n1x) = if ad[0] < ad[2] {
                    (Q_HI, kept.boundary(Q_LO) - 1)
                } else {
                    (S_HI, kept.boundary(S_LO) - 1)
                };
                let (n2, n2x) = if ad[1] < ad[3] {
                    (Q_LO, kept.boundary(Q_HI) + 1)
                } else {
                    (S_LO, kept.boundary(S_HI) + 1)
                };
                (n1, n1x, n2, n2x)
            }
        } else if !(ab[2] && ab[3]) {
            (Q_HI, kept.boundary(Q_LO) - 1, Q_LO, kept.boundary(Q_HI) + 1)
        } else if !(ab[0] && ab[1]) {
            (S_LO, kept.boundary(S_HI) + 1, S_HI, kept.boundary(S_LO) - 1)
        } else {
            let (n1, n1x) = if ad[0] < ad[3] {
                (Q_HI, kept.boundary(Q_LO) - 1)
            } else {
                (S_LO, kept.boundary(S_HI) + 1)
            };
            let (n2, n2x) = if ad[1] < ad[2] {
                (Q_LO, kept.boundary(Q_HI) + 1)
            } else {
                (S_HI, kept.boundary(S_LO) - 1)
            };
            (n1, n1x, n2, n2x)
        };

        let mut second = self.hits[j0].clone();
        let mut removed = false;

        let first = &mut self.hits[j0];
        first.move_boundary(n1, n1x);
        if first.is_consistent() {
            // trapezoidal hits may still overlap
            *restart = true;
        } else {
            self.hits.remove(j0);
            removed = true;
        }

        second.move_boundary(n2, n2x);
        if second.is_consistent() {
            *restart = true;
            self.hits.push(second);
        }

        removed
    }

    /// Drop hits whose order relative to the anchor hit at `offset` violates
    /// monotonicity on either axis.
    fn filter_by_order(&mut self, offset: usize) {
        if offset >= self.hits.len() {
            return;
        }
        let anchor = self.hits[offset].clone();
        let tail: Vec<Hit> = self
            .hits
            .split_off(offset + 1)
            .into_iter()
            .filter(|h| same_order(&anchor, h))
            .collect();
        self.hits.extend(tail);
    }

    /// Max-score group-select: identify groups, resolve conflicts within
    /// each, keep the top-scoring group.
    fn run_msgs(&mut self, select_groups_only: bool) {
        if self.params.group_identification != GroupIdentification::None || select_groups_only {
            let axis = match self.params.group_identification {
                GroupIdentification::SubjectCoverage => Axis::Subject,
                _ => Axis::Query,
            };
            let stop = self.hits.len();
            self.groups_identify_by_coverage(0, stop, 0, axis);
            self.sync_groups_by_max_dist();
        }

        if self.params.output_all_groups && !select_groups_only && !self.hits.is_empty() {
            // ambiguities are intentionally left unresolved in this mode
            self.relabel_group_subjects();
            return;
        }
        if select_groups_only {
            return;
        }

        let all = std::mem::take(&mut self.hits);
        let mut best = Vec::new();
        let mut best_score = 0.0;
        let groups = all.into_iter().chunk_by(|hit| hit.group_id);
        for (_, group) in &groups {
            self.hits = group.collect();
            self.run_max_score();
            let group_score: f64 = self.hits.iter().map(Hit::score).sum();
            if group_score > best_score {
                best_score = group_score;
                best = std::mem::take(&mut self.hits);
            }
        }
        self.hits = best;
    }

    /// Tag every hit's subject id with its group number and strand so that
    /// downstream consumers can tell the groups apart.
    fn relabel_group_subjects(&mut self) {
        self.hits.sort_by(|a, b| a.group_id.cmp(&b.group_id));
        let base_subj = self.hits[0].subj_id.clone();

        let mut counts = [0usize; 3]; // plus, minus, mixed
        let mut i = 0;
        while i < self.hits.len() {
            let group_id = self.hits[i].group_id;
            let start = i;
            while i < self.hits.len() && self.hits[i].group_id == group_id {
                i += 1;
            }
            let all_plus = self.hits[start..i].iter().all(Hit::is_plus_strand);
            let all_minus = self.hits[start..i].iter().all(|h| !h.is_plus_strand());
            let (marker, slot) = if all_plus {
                ('p', 0)
            } else if all_minus {
                ('m', 1)
            } else {
                ('x', 2)
            };
            counts[slot] += 1;
            let new_subj = format!("{}_[{}{}]", base_subj, marker, counts[slot]);
            for hit in &mut self.hits[start..i] {
                hit.subj_id = new_subj.clone();
            }
        }
    }

    /// Recursively split `[start, stop)` at the gap giving the largest
    /// coverage raise. The split axis is the opposite of the coverage axis.
    fn groups_identify_by_coverage(
        &mut self,
        start: usize,
        stop: usize,
        total_coverage: i64,
        axis: Axis,
    ) {
        let top_level = start == 0 && stop == self.hits.len();
        let mut total = total_coverage;
        if top_level {
            self.calc_global_envelope();
            match axis {
                Axis::Query => self.hits[start..stop].sort_by(Hit::cmp_subj_start),
                Axis::Subject => self.hits[start..stop].sort_by(Hit::cmp_query_start),
            }
            total = covered_length(&self.hits[start..stop], axis);
        }

        self.next_group_id += 1;
        let group_id = self.next_group_id;
        for hit in &mut self.hits[start..stop] {
            hit.group_id = group_id;
        }

        if stop - start <= 1 || total <= 0 {
            return;
        }

        let (lo, hi) = match axis {
            Axis::Query => (S_LO, S_HI),
            Axis::Subject => (Q_LO, Q_HI),
        };
        let mut gaps: Vec<(i64, usize)> = (start..stop - 1)
            .filter_map(|i| {
                let gap = self.hits[i + 1].boundary(lo) - self.hits[i].boundary(hi);
                (gap > 0).then_some((gap, i))
            })
            .collect();
        gaps.sort_unstable_by(|a, b| b.cmp(a));

        for (_, i) in gaps {
            let left = covered_length(&self.hits[start..=i], axis);
            let right = covered_length(&self.hits[i + 1..stop], axis);
            let raised = (left + right) as f64;
            if (raised - total as f64) / total as f64 >= self.params.coverage_step {
                self.groups_identify_by_coverage(start, i + 1, total, axis);
                self.groups_identify_by_coverage(i + 1, stop, total, axis);
                return;
            }
        }
    }

    /// Renumber groups so that a group id never spans two distance clusters.
    fn sync_groups_by_max_dist(&mut self) {
        if self.hits.is_empty() {
            return;
        }
        self.hits.sort_by(|a, b| a.group_id.cmp(&b.group_id));

        let mut group_id = self.hits[0].group_id;
        let mut cluster = self.hits[0].max_dist_cluster;
        self.next_group_id += 1;
        self.hits[0].group_id = self.next_group_id;
        for k in 1..self.hits.len() {
            let h_group = self.hits[k].group_id;
            let h_cluster = self.hits[k].max_dist_cluster;
            if group_id == h_group && cluster != h_cluster {
                self.next_group_id += 1;
                cluster = h_cluster;
            }
            if group_id != h_group {
                self.next_group_id += 1;
                group_id = h_group;
            }
            self.hits[k].group_id = self.next_group_id;
        }
    }

    /// Single-linkage clustering of hits under the maximum-distance
    /// predicate.
    fn identify_max_dist_groups(&mut self) {
        let n = self.hits.len();
        for (j, hit) in self.hits.iter_mut().enumerate() {
            hit.max_dist_cluster = j as u32;
        }
        let mut pairs = Vec::new();
        for j in 0..n {
            for i in 0..j {
                if self.within_max_dist(&self.hits[i], &self.hits[j]) {
                    pairs.push((i, j));
                }
            }
        }
        for (i, j) in pairs {
            let a = self.hits[i].max_dist_cluster;
            let b = self.hits[j].max_dist_cluster;
            if a != b {
                for hit in &mut self.hits {
                    if hit.max_dist_cluster == a {
                        hit.max_dist_cluster = b;
                    }
                }
            }
        }
    }

    fn within_max_dist(&self, h1: &Hit, h2: &Hit) -> bool {
        let dist = |a_lo: i64, a_hi: i64, b_lo: i64, b_hi: i64| {
            (a_lo.max(b_lo) - a_hi.min(b_hi) - 1).max(0)
        };
        dist(h1.q_lo(), h1.q_hi(), h2.q_lo(), h2.q_hi()) <= self.params.max_hit_dist_query
            && dist(h1.s_lo(), h1.s_hi(), h2.s_lo(), h2.s_hi()) <= self.params.max_hit_dist_subj
    }

    /// Keep only the top-scoring distance cluster.
    fn filter_by_max_dist(&mut self) {
        if self.hits.is_empty() {
            return;
        }
        let mut scores: HashMap<u32, f64> = HashMap::new();
        for hit in &self.hits {
            *scores.entry(hit.max_dist_cluster).or_default() += hit.score();
        }
        let best = scores
            .into_iter()
            .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
            .map(|(cluster, _)| cluster)
            .unwrap();
        self.hits.retain(|h| h.max_dist_cluster == best);
    }
}
