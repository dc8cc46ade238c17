use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{Result, anyhow};
use log::debug;

pub struct FastaRecord {
    pub id: String,
    pub sequence: Vec<u8>,
}

/// Read the first record of a fasta file; later records are ignored.
pub fn read_first_record(path: &Path) -> Result<FastaRecord> {
    debug!("Parsing fasta file {path:?}");
    let reader = BufReader::new(
        File::open(path).map_err(|error| anyhow!("Unable to open fasta file {path:?}: {error}"))?,
    );

    let mut id: Option<String> = None;
    let mut sequence = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if let Some(header) = line.strip_prefix('>') {
            if id.is_some() {
                break;
            }
            id = Some(
                header
                    .split_whitespace()
                    .next()
                    .unwrap_or_default()
                    .to_string(),
            );
        } else if id.is_some() {
            sequence.extend(line.bytes().filter(|b| !b.is_ascii_whitespace()));
        } else if !line.trim().is_empty() {
            return Err(anyhow!(
                "Found sequence data before the first fasta header in {path:?}"
            ));
        }
    }

    let id = id.ok_or_else(|| anyhow!("Fasta file {path:?} contains no record"))?;
    if id.is_empty() {
        return Err(anyhow!("Fasta file {path:?} has a record with no id"));
    }
    if sequence.is_empty() {
        return Err(anyhow!("Fasta record {id} in {path:?} has an empty sequence"));
    }
    sequence.make_ascii_uppercase();
    Ok(FastaRecord { id, sequence })
}

#[cfg(test)]
mod tests {
    use super::read_first_record;

    fn write_temp(name: &str, contents: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!("spalign-fasta-{}-{name}", std::process::id()));
        std::fs::write(&path, contents).unwrap();
        path
    }

    #[test]
    fn reads_the_first_record_only() {
        let path = write_temp("first", ">seq1 some comment\nacgt\nACGT\n>seq2\nTTTT\n");
        let record = read_first_record(&path).unwrap();
        assert_eq!(record.id, "seq1");
        assert_eq!(record.sequence, b"ACGTACGT");
        std::fs::remove_file(path).unwrap();
    }

    #[test]
    fn rejects_headerless_input() {
        let path = write_temp("headerless", "ACGT\n");
        assert!(read_first_record(&path).is_err());
        std::fs::remove_file(path).unwrap();
    }
}
