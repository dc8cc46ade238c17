use hit_filter::Strand;
use lib_spalign::AlignedCompartment;
use lib_spalign::segment::Segment;

/// Toml-serializable wrapper around the result vector.
#[derive(serde::Serialize)]
pub struct Report<'a> {
    pub compartments: &'a [AlignedCompartment],
}

/// Render aligned compartments as text rows, one per segment.
///
/// Coordinates are printed 1-based; gaps print `-` for identity and subject
/// coordinates and a position tag instead of the exon annotation. Failed
/// compartments carry no segments and produce no rows.
pub fn as_text(results: &[AlignedCompartment], query_id: &str, subj_id: &str) -> String {
    let mut out = String::new();
    for compartment in results {
        let strand = if compartment.query_strand == Strand::Plus {
            '+'
        } else {
            '-'
        };
        let dim = compartment.segments.len();
        for (index, segment) in compartment.segments.iter().enumerate() {
            let id = compartment.id;
            match segment {
                Segment::Exon(exon) => {
                    out.push_str(&format!(
                        "{strand}{id}\t{query_id}\t{subj_id}\t{:.3}\t{}\t{}\t{}\t{}\t{}\t{}\t{}\n",
                        exon.idty,
                        exon.len,
                        exon.q_box.0 + 1,
                        exon.q_box.1 + 1,
                        exon.s_box.0 + 1,
                        exon.s_box.1 + 1,
                        exon.annot,
                        rle(&exon.details),
                    ));
                }
                Segment::Gap(gap) => {
                    let tag = if index == 0 {
                        "<L-Gap>"
                    } else if index == dim - 1 {
                        "<R-Gap>"
                    } else {
                        "<M-Gap>"
                    };
                    out.push_str(&format!(
                        "{strand}{id}\t{query_id}\t{subj_id}\t-\t{}\t{}\t{}\t-\t-\t{tag}\t-\n",
                        gap.len,
                        gap.q_box.0 + 1,
                        gap.q_box.1 + 1,
                    ));
                }
            }
        }
    }
    out
}

/// Run-length encode a details transcript: `MMMMRMM` becomes `M4RM2`.
pub fn rle(input: &str) -> String {
    let mut out = String::new();
    let mut chars = input.chars();
    let Some(mut current) = chars.next() else {
        return out;
    };
    let mut count = 1usize;
    for c in chars {
        if c == current {
            count += 1;
        } else {
            out.push(current);
            if count > 1 {
                out.push_str(&count.to_string());
            }
            current = c;
            count = 1;
        }
    }
    out.push(current);
    if count > 1 {
        out.push_str(&count.to_string());
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use lib_spalign::segment::{Exon, Gap};

    #[test]
    fn rle_compresses_runs() {
        assert_eq!(rle(""), "");
        assert_eq!(rle("M"), "M");
        assert_eq!(rle("MMMM"), "M4");
        assert_eq!(rle("MMMMRMM"), "M4RM2");
        assert_eq!(rle("MRID"), "MRID");
    }

    #[test]
    fn text_rows_follow_the_table_layout() {
        let compartment = AlignedCompartment {
            id: 2,
            error: false,
            message: "Ok".to_string(),
            query_strand: Strand::Plus,
            subj_strand: Strand::Plus,
            segments: vec![
                Segment::Gap(Gap::new(0, 4, 0, 99)),
                Segment::Exon(Exon {
                    q_box: (5, 14),
                    s_box: (100, 109),
                    details: "M".repeat(10),
                    annot: "  <exon>GT".to_string(),
                    idty: 1.0,
                    len: 10,
                    score: 10,
                }),
            ],
        };
        let text = as_text(&[compartment], "nm", "chr");
        let rows: Vec<&str> = text.lines().collect();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0], "+2\tnm\tchr\t-\t5\t1\t5\t-\t-\t<L-Gap>\t-");
        assert_eq!(rows[1], "+2\tnm\tchr\t1.000\t10\t6\t15\t101\t110\t  <exon>GT\tM10");
    }
}
