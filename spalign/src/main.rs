#![deny(clippy::mod_module_files)]

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;
use hit_filter::Strand;
use lib_spalign::accessor::MemoryAccessor;
use lib_spalign::aligner::NwSplicedAligner;
use lib_spalign::{Engine, EngineConfig};
use log::{LevelFilter, info};
use simplelog::{ColorChoice, TermLogger, TerminalMode};

mod fasta;
mod hits;
mod output;

/// Spliced alignment of a cDNA against a genomic sequence.
#[derive(Parser)]
struct Cli {
    #[clap(long, short = 'l', default_value = "info")]
    log_level: LevelFilter,

    /// The path to the query (cDNA) fasta file.
    #[clap(long, short = 'q')]
    query: PathBuf,

    /// The path to the subject (genomic) fasta file.
    #[clap(long, short = 's')]
    subject: PathBuf,

    /// Tab-separated hits in BLAST tabular layout; '-' reads standard input.
    #[clap(long, short = 'H', default_value = "-")]
    hits: String,

    /// Exons below this identity are reported as gaps.
    #[clap(long, default_value_t = 0.75)]
    min_exon_identity: f64,

    /// Minimal fraction of the query a compartment must cover.
    #[clap(long, default_value_t = 0.25)]
    min_query_coverage: f64,

    /// Penalty fraction for compartment scoring.
    #[clap(long, default_value_t = 0.75)]
    compartment_penalty: f64,

    /// Genomic flank included around a compartment, in bp.
    #[clap(long, default_value_t = 75_000)]
    max_genomic_extension: usize,

    /// Subject gap above which hits open a new compartment, in bp.
    #[clap(long, default_value_t = 1_200_000)]
    max_intron: usize,

    /// Do not force improvement of terminal exons.
    #[clap(long)]
    no_end_gap_detection: bool,

    /// Do not detect or trim a 3' poly-A tail.
    #[clap(long)]
    no_polya_detection: bool,

    /// Query orientation; minus reverse-complements before alignment.
    #[clap(long, default_value = "plus")]
    query_strand: QueryStrand,

    /// Id assigned to the first aligned compartment.
    #[clap(long, default_value_t = 0)]
    model_id_seed: u32,

    /// Subdivide pattern anchors longer than this on the query.
    #[clap(long)]
    max_anchor_length: Option<usize>,

    /// The file to store the aligned compartments in toml format.
    #[clap(long, short = 'o')]
    output: Option<PathBuf>,

    /// Exit non-zero when any compartment fails.
    #[clap(long)]
    strict: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
enum QueryStrand {
    Plus,
    Minus,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    TermLogger::init(
        cli.log_level,
        Default::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )
    .unwrap();

    let query = fasta::read_first_record(&cli.query)?;
    let subject = fasta::read_first_record(&cli.subject)?;
    info!(
        "query {} ({} bp), subject {} ({} bp)",
        query.id,
        query.sequence.len(),
        subject.id,
        subject.sequence.len()
    );

    let mut hits = hits::read_hits(&cli.hits)?;
    hits.retain(|hit| hit.query_id == query.id && hit.subj_id == subject.id);
    if hits.is_empty() {
        bail!(
            "No hits between {} and {} in the hit input",
            query.id,
            subject.id
        );
    }
    info!("{} hit(s) read", hits.len());

    let config = EngineConfig {
        min_exon_identity: cli.min_exon_identity,
        min_query_coverage: cli.min_query_coverage,
        compartment_penalty: cli.compartment_penalty,
        max_genomic_extension: cli.max_genomic_extension,
        max_intron: cli.max_intron,
        end_gap_detection: !cli.no_end_gap_detection,
        polya_detection: !cli.no_polya_detection,
        query_strand: match cli.query_strand {
            QueryStrand::Plus => Strand::Plus,
            QueryStrand::Minus => Strand::Minus,
        },
        model_id_seed: cli.model_id_seed,
        max_anchor_length: cli.max_anchor_length,
    };

    let mut accessor = MemoryAccessor::new();
    accessor.insert(query.id.clone(), query.sequence);
    accessor.insert(subject.id.clone(), subject.sequence);

    let mut engine = Engine::new(config);
    engine
        .set_aligner(Box::new(NwSplicedAligner::new()))
        .set_accessor(Box::new(accessor));

    let results = engine.run(hits).context("Alignment failed")?;

    print!("{}", output::as_text(&results, &query.id, &subject.id));

    if let Some(path) = &cli.output {
        let report = output::Report {
            compartments: &results,
        };
        let rendered = toml::to_string(&report).context("Failed to render the toml report")?;
        std::fs::write(path, rendered)
            .with_context(|| format!("Failed to write the report to {path:?}"))?;
    }

    let failures = results.iter().filter(|r| r.error).count();
    if failures > 0 {
        info!("{failures} compartment(s) failed");
        if cli.strict {
            bail!("{failures} compartment(s) failed");
        }
    }
    Ok(())
}
