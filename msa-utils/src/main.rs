use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use log::info;
use rayon::prelude::*;

use msa_utils::align::{self, header, AlignOptions, AlignTool, AlignmentOutcome, DuplicatePolicy, WaitPolicy, WorkPaths};
use msa_utils::io::fasta::{self, FastaRecord};
use msa_utils::stats;
use msa_utils::util::residue;

#[derive(Parser, Debug)]
#[command(name = "msa-utils", author, version, about = "Sequence alignment glue: MUSCLE orchestration, gap profiles, identity", arg_required_else_help = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Align FASTA files with an external MSA tool
    Align {
        /// Input FASTA files; each is aligned independently
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
        /// Directory for work files (defaults to each input's directory)
        #[arg(short = 'w', long = "work-dir")]
        work_dir: Option<PathBuf>,
        /// Aligned FASTA output (stdout if omitted; single input only)
        #[arg(short, long)]
        out: Option<PathBuf>,
        /// Alignment program
        #[arg(long, default_value = "muscle")]
        tool: PathBuf,
        /// Parse an existing alignment instead of re-running the tool
        #[arg(long)]
        reuse: bool,
        /// Also write a per-column gap profile to <prefix>.gaps.tsv
        #[arg(long)]
        gaps: bool,
        #[arg(long = "timeout-secs", default_value_t = 600)]
        timeout_secs: u64,
        #[arg(long = "poll-ms", default_value_t = 100)]
        poll_ms: u64,
        #[arg(long = "on-duplicate", value_enum, default_value_t = OnDuplicate::Error)]
        on_duplicate: OnDuplicate,
        #[arg(short = 't', long = "threads", default_value_t = 1)]
        threads: usize,
    },
    /// Per-column gap percentage of an aligned FASTA
    Gaps {
        aligned: PathBuf,
        /// Report columns with at least this gap percentage
        #[arg(long)]
        threshold: Option<f64>,
    },
    /// Pairwise identity matrix of an aligned FASTA
    Identity {
        aligned: PathBuf,
        #[arg(short = 't', long = "threads", default_value_t = 1)]
        threads: usize,
    },
    /// Identity of two equal-length sequences
    Score { a: String, b: String },
    /// Convert residue names (ALA, PSU, ...) to a one-letter sequence
    Resn {
        #[arg(required = true)]
        codes: Vec<String>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum OnDuplicate {
    Error,
    Overwrite,
    KeepFirst,
}

impl From<OnDuplicate> for DuplicatePolicy {
    fn from(d: OnDuplicate) -> Self {
        match d {
            OnDuplicate::Error => DuplicatePolicy::Error,
            OnDuplicate::Overwrite => DuplicatePolicy::WarnOverwrite,
            OnDuplicate::KeepFirst => DuplicatePolicy::WarnKeepFirst,
        }
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Align {
            inputs,
            work_dir,
            out,
            tool,
            reuse,
            gaps,
            timeout_secs,
            poll_ms,
            on_duplicate,
            threads,
        } => {
            let opt = AlignOptions {
                reuse_existing_output: reuse,
                compute_gap_profile: gaps,
                duplicate_policy: on_duplicate.into(),
                wait: WaitPolicy {
                    timeout: Duration::from_secs(timeout_secs),
                    poll_interval: Duration::from_millis(poll_ms),
                    ..WaitPolicy::default()
                },
                tool: AlignTool::muscle(tool),
            };
            run_align(&inputs, work_dir.as_deref(), out.as_deref(), &opt, threads)
        }
        Commands::Gaps { aligned, threshold } => run_gaps(&aligned, threshold),
        Commands::Identity { aligned, threads } => run_identity(&aligned, threads),
        Commands::Score { a, b } => {
            let s = stats::score_identity(&a, &b)?;
            println!("{:.4}", s);
            Ok(())
        }
        Commands::Resn { codes } => {
            println!("{}", residue::canonicalize_residues(codes.iter().map(String::as_str)));
            Ok(())
        }
    }
}

fn build_pool(threads: usize) -> Result<rayon::ThreadPool> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads.max(1))
        .build()
        .context("cannot build thread pool")
}

/// `<work_dir or input dir>/<input stem>.msa`
fn work_prefix(input: &Path, work_dir: Option<&Path>) -> PathBuf {
    let stem = input.file_stem().map(|s| s.to_string_lossy().into_owned()).unwrap_or_else(|| "input".to_string());
    let dir = work_dir
        .map(Path::to_path_buf)
        .or_else(|| input.parent().map(Path::to_path_buf))
        .unwrap_or_default();
    dir.join(format!("{}.msa", stem))
}

fn run_align(
    inputs: &[PathBuf],
    work_dir: Option<&Path>,
    out: Option<&Path>,
    opt: &AlignOptions,
    threads: usize,
) -> Result<()> {
    if out.is_some() && inputs.len() > 1 {
        anyhow::bail!("--out can only be used with a single input");
    }
    let prefixes: Vec<PathBuf> = inputs.iter().map(|p| work_prefix(p, work_dir)).collect();
    let mut seen = HashSet::new();
    for p in &prefixes {
        if !seen.insert(p) {
            anyhow::bail!("two inputs share the work prefix '{}'", p.display());
        }
    }

    let pool = build_pool(threads)?;
    let outcomes: Vec<AlignmentOutcome> = pool.install(|| {
        inputs
            .par_iter()
            .zip(prefixes.par_iter())
            .map(|(input, prefix)| align_one(input, prefix, opt))
            .collect::<Result<Vec<_>>>()
    })?;

    let mut writer: Box<dyn Write> = if let Some(p) = out {
        let fh = std::fs::File::create(p).with_context(|| format!("cannot create '{}'", p.display()))?;
        Box::new(std::io::BufWriter::new(fh))
    } else {
        Box::new(std::io::BufWriter::new(std::io::stdout()))
    };

    for (outcome, prefix) in outcomes.iter().zip(&prefixes) {
        outcome.aligned.write_fasta(&mut writer)?;
        if let Some(profile) = &outcome.gap_profile {
            let path = PathBuf::from(format!("{}.gaps.tsv", prefix.display()));
            let mut w = std::io::BufWriter::new(
                std::fs::File::create(&path).with_context(|| format!("cannot create '{}'", path.display()))?,
            );
            profile.write_tsv(&mut w)?;
            w.flush()?;
            info!("gap profile written: {}", path.display());
        }
    }
    writer.flush()?;
    Ok(())
}

fn align_one(input: &Path, prefix: &Path, opt: &AlignOptions) -> Result<AlignmentOutcome> {
    let records = fasta::read_fasta_file(input)
        .with_context(|| format!("cannot read FASTA '{}'", input.display()))?;
    if records.is_empty() {
        anyhow::bail!("FASTA file '{}' contains no sequences", input.display());
    }
    let ids = record_ids(&records)?;
    let seqs: Vec<&str> = records.iter().map(|r| r.seq.as_str()).collect();
    info!("{}: {} sequences", input.display(), records.len());
    let outcome = align::align(&seqs, &ids, prefix, opt)
        .with_context(|| format!("alignment of '{}' failed (output '{}')", input.display(), WorkPaths::new(prefix).output.display()))?;
    Ok(outcome)
}

fn read_aligned(path: &Path) -> Result<(Vec<String>, Vec<String>)> {
    let records = fasta::read_fasta_file(path)
        .with_context(|| format!("cannot read aligned FASTA '{}'", path.display()))?;
    if records.is_empty() {
        anyhow::bail!("FASTA file '{}' contains no sequences", path.display());
    }
    let ids = record_ids(&records)?.into_iter().map(str::to_string).collect();
    Ok((ids, records.into_iter().map(|r| r.seq).collect()))
}

/// `> Seq <id>` headers carry the identifier after the marker; any other
/// header is identified by its first token.
fn record_ids(records: &[FastaRecord]) -> Result<Vec<&str>> {
    records
        .iter()
        .map(|r| {
            if r.id == header::MARKER {
                Ok(header::parse_identifier(r)?)
            } else {
                Ok(r.id.as_str())
            }
        })
        .collect()
}

fn run_gaps(path: &Path, threshold: Option<f64>) -> Result<()> {
    let (_, seqs) = read_aligned(path)?;
    let profile = stats::compute_gap_profile(&seqs)?;
    let stdout = std::io::stdout();
    let mut w = std::io::BufWriter::new(stdout.lock());
    profile.write_tsv(&mut w)?;
    w.flush()?;
    if let Some(t) = threshold {
        let cols = profile.gapped_columns(t);
        info!("{} of {} columns have >= {:.2}% gaps", cols.len(), profile.len(), t);
    }
    Ok(())
}

fn run_identity(path: &Path, threads: usize) -> Result<()> {
    let (ids, seqs) = read_aligned(path)?;
    let pool = build_pool(threads)?;
    let matrix = pool.install(|| stats::identity_matrix(&seqs))?;

    let stdout = std::io::stdout();
    let mut w = std::io::BufWriter::new(stdout.lock());
    writeln!(w, "\t{}", ids.join("\t"))?;
    for (id, row) in ids.iter().zip(&matrix) {
        let cells: Vec<String> = row.iter().map(|v| format!("{:.4}", v)).collect();
        writeln!(w, "{}\t{}", id, cells.join("\t"))?;
    }
    w.flush()?;
    if let Some(mean) = pool.install(|| stats::mean_pairwise_identity(&seqs))? {
        info!("mean pairwise identity: {:.4}", mean);
    }
    Ok(())
}
