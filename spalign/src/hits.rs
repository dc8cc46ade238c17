use std::fs::File;
use std::io::{self, Read};

use anyhow::{Context, Result, anyhow};
use hit_filter::Hit;

/// Read hits in BLAST tabular layout (query, subject, identity, length,
/// mismatches, gap opens, q. start, q. end, s. start, s. end, evalue,
/// score), 1-based inclusive coordinates. Descending subject coordinates
/// mark a minus-strand hit. `-` reads standard input.
pub fn read_hits(source: &str) -> Result<Vec<Hit>> {
    let mut text = String::new();
    if source == "-" {
        io::stdin()
            .read_to_string(&mut text)
            .context("Failed to read hits from standard input")?;
    } else {
        File::open(source)
            .with_context(|| format!("Unable to open hit file {source}"))?
            .read_to_string(&mut text)
            .with_context(|| format!("Failed to read hit file {source}"))?;
    }
    parse_hits(&text)
}

pub fn parse_hits(text: &str) -> Result<Vec<Hit>> {
    let mut hits = Vec::new();
    for (number, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = line.split_whitespace().collect();
        if fields.len() < 12 {
            return Err(anyhow!(
                "Hit line {}: expected 12 columns, found {}",
                number + 1,
                fields.len()
            ));
        }
        let coordinate = |index: usize| -> Result<i64> {
            fields[index].parse().map_err(|error| {
                anyhow!(
                    "Hit line {}: bad coordinate {:?}: {error}",
                    number + 1,
                    fields[index]
                )
            })
        };
        let q_lo = coordinate(6)?;
        let q_hi = coordinate(7)?;
        let s_lo = coordinate(8)?;
        let s_hi = coordinate(9)?;
        let score: f64 = fields[11].parse().map_err(|error| {
            anyhow!("Hit line {}: bad score {:?}: {error}", number + 1, fields[11])
        })?;
        hits.push(Hit::new(
            fields[0],
            fields[1],
            q_lo - 1,
            q_hi - 1,
            s_lo - 1,
            s_hi - 1,
            score,
        ));
    }
    Ok(hits)
}

#[cfg(test)]
mod tests {
    use super::parse_hits;

    #[test]
    fn parses_both_strands_and_skips_comments() {
        let text = "\
# blast tabular output
NM_000001\tchr1\t98.5\t100\t1\t0\t1\t100\t5001\t5100\t1e-50\t190
NM_000001\tchr1\t95.0\t50\t2\t1\t101\t150\t9100\t9051\t1e-20\t80
";
        let hits = parse_hits(text).unwrap();
        assert_eq!(hits.len(), 2);

        assert_eq!(hits[0].query_id, "NM_000001");
        assert_eq!(hits[0].subj_id, "chr1");
        assert_eq!((hits[0].q_lo(), hits[0].q_hi()), (0, 99));
        assert_eq!((hits[0].s_lo(), hits[0].s_hi()), (5000, 5099));
        assert!(hits[0].is_plus_strand());
        assert_eq!(hits[0].score(), 190.0);

        assert!(!hits[1].is_plus_strand());
        assert_eq!((hits[1].s_lo(), hits[1].s_hi()), (9050, 9099));
    }

    #[test]
    fn short_rows_are_rejected() {
        assert!(parse_hits("q\ts\t1\t2\t3\n").is_err());
    }
}
