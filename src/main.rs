//! dirdupe - find whole directories that duplicate each other.
//!
//! Usage:
//!   dirdupe analyze [LISTING]   Analyze an fdupes listing (`-` reads stdin)
//!   dirdupe scan DIR            Run fdupes on DIR, then analyze its listing
//!   dirdupe tree [LISTING]      Dump the path tree built from a listing
//!   dirdupe --help              Show help

use std::io::Read;
use std::path::{Path, PathBuf};
use std::thread::JoinHandle;

use clap::{Args, Parser, Subcommand, ValueEnum};
use color_eyre::eyre::{Context, Result};
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::EnvFilter;

use dirdupe_analyze::{Analysis, Analyzer, TreeFormat, render_tree};
use dirdupe_core::{AnalyzeConfig, Checkpoint};
use dirdupe_scan::{FsOracle, ProgressTracker, build_from_str, run_fdupes};

#[derive(Parser)]
#[command(
    name = "dirdupe",
    version,
    about = "Find whole directories that duplicate each other",
    long_about = "dirdupe reads the file-level duplicate groups printed by `fdupes -r` \
                  and reports the largest directories whose entire content is \
                  duplicated elsewhere."
)]
struct Cli {
    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log errors and hide progress
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Analyze an existing duplicate listing
    Analyze {
        /// Listing produced by `fdupes -r` (`-` for stdin)
        #[arg(default_value = "-")]
        listing: PathBuf,

        #[command(flatten)]
        opts: AnalyzeArgs,
    },

    /// Run fdupes on a directory, then analyze its output
    Scan {
        /// Directory to search
        dir: PathBuf,

        /// Duplicate finder to run instead of the configured one
        #[arg(long)]
        fdupes: Option<String>,

        #[command(flatten)]
        opts: AnalyzeArgs,
    },

    /// Dump the path tree built from a listing
    Tree {
        /// Listing produced by `fdupes -r` (`-` for stdin)
        #[arg(default_value = "-")]
        listing: PathBuf,

        /// Output format
        #[arg(short, long, default_value = "text")]
        format: TreeOutput,

        /// Output file (defaults to stdout)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Classify and fingerprint against the filesystem before dumping
        #[arg(long)]
        analyzed: bool,

        /// Directory entry names to disregard (glob, repeatable)
        #[arg(long = "ignore", value_name = "GLOB")]
        ignore: Vec<String>,
    },
}

#[derive(Args)]
struct AnalyzeArgs {
    /// Save progress here and resume from it if it exists
    #[arg(long, value_name = "FILE")]
    checkpoint: Option<PathBuf>,

    /// Output format
    #[arg(short, long, default_value = "text")]
    format: OutputFormat,

    /// Output file (defaults to stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Directory entry names to disregard (glob, repeatable)
    #[arg(long = "ignore", value_name = "GLOB")]
    ignore: Vec<String>,

    /// Threads listing directories (0 = one per CPU)
    #[arg(short = 'j', long)]
    threads: Option<usize>,

    /// TOML configuration file
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum OutputFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, ValueEnum, Default)]
enum TreeOutput {
    #[default]
    Text,
    Dot,
    Graphml,
}

impl From<TreeOutput> for TreeFormat {
    fn from(format: TreeOutput) -> Self {
        match format {
            TreeOutput::Text => TreeFormat::Text,
            TreeOutput::Dot => TreeFormat::Dot,
            TreeOutput::Graphml => TreeFormat::GraphMl,
        }
    }
}

fn main() -> Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.quiet);
    let show_progress = !cli.quiet;

    match cli.command {
        Command::Analyze { listing, opts } => {
            let config = load_config(&opts)?;
            let analysis = run_pipeline(&config, show_progress, || read_listing(&listing))?;
            write_report(&analysis, &opts)?;
        }
        Command::Scan { dir, fdupes, opts } => {
            let mut config = load_config(&opts)?;
            if let Some(program) = fdupes {
                config.fdupes_program = program;
            }
            let analysis = run_pipeline(&config, show_progress, || {
                eprintln!("Running {} on {}...", config.fdupes_program, dir.display());
                run_fdupes(&config.fdupes_program, &dir).context("Duplicate scan failed")
            })?;
            write_report(&analysis, &opts)?;
        }
        Command::Tree {
            listing,
            format,
            output,
            analyzed,
            ignore,
        } => {
            run_tree(&listing, format, output.as_deref(), analyzed, ignore, show_progress)?;
        }
    }

    Ok(())
}

/// Install the log subscriber. `RUST_LOG` wins over the flags.
fn init_tracing(verbose: u8, quiet: bool) {
    let level = if quiet {
        "error"
    } else {
        match verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Merge the optional config file with command line flags.
fn load_config(opts: &AnalyzeArgs) -> Result<AnalyzeConfig> {
    let mut config = match &opts.config {
        Some(path) => AnalyzeConfig::from_toml_file(path)
            .with_context(|| format!("Invalid config file {}", path.display()))?,
        None => AnalyzeConfig::default(),
    };

    if let Some(threads) = opts.threads {
        config.threads = threads;
    }
    config.ignore_entries.extend(opts.ignore.iter().cloned());
    if let Some(checkpoint) = &opts.checkpoint {
        config.checkpoint = Some(checkpoint.clone());
    }
    Ok(config)
}

/// Read a listing from a file, or from stdin for `-`.
fn read_listing(source: &Path) -> Result<String> {
    let bytes = if source == Path::new("-") {
        let mut buf = Vec::new();
        std::io::stdin()
            .read_to_end(&mut buf)
            .context("Failed to read listing from stdin")?;
        buf
    } else {
        std::fs::read(source).with_context(|| format!("Failed to read {}", source.display()))?
    };
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

/// Resume from the configured checkpoint if there is a usable one, otherwise
/// build the tree from `listing` and run every pass.
fn run_pipeline(
    config: &AnalyzeConfig,
    show_progress: bool,
    listing: impl FnOnce() -> Result<String>,
) -> Result<Analysis> {
    let oracle = FsOracle::from_config(config).context("Invalid ignore pattern")?;
    let analyzer = Analyzer::from_config(oracle, config);

    let mut progress = ProgressTracker::new();
    let printer = show_progress.then(|| spawn_progress_printer(&progress));

    let analysis = match load_checkpoint(config) {
        Some(checkpoint) => analyzer
            .resume(checkpoint, &mut progress)
            .context("Analysis failed")?,
        None => {
            let text = listing()?;
            let built = build_from_str(&text, &mut progress).context("Failed to build tree")?;
            analyzer
                .run(built.tree, built.warnings, &mut progress)
                .context("Analysis failed")?
        }
    };

    drop(progress);
    if let Some(printer) = printer {
        let _ = printer.join();
    }
    Ok(analysis)
}

fn load_checkpoint(config: &AnalyzeConfig) -> Option<Checkpoint> {
    let path = config.checkpoint.as_ref()?;
    if !path.exists() {
        return None;
    }
    match Checkpoint::load(path) {
        Ok(checkpoint) => Some(checkpoint),
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "ignoring unusable checkpoint");
            None
        }
    }
}

/// Print pass progress to stderr until the tracker is dropped.
fn spawn_progress_printer(progress: &ProgressTracker) -> JoinHandle<()> {
    let mut rx = progress.subscribe();
    std::thread::spawn(move || {
        loop {
            match rx.blocking_recv() {
                Ok(update) if update.finished => {
                    eprintln!(
                        "\r{}: {} done in {:.2}s",
                        update.phase,
                        update.processed,
                        update.elapsed.as_secs_f64()
                    );
                }
                Ok(update) if update.total > 0 => {
                    eprint!(
                        "\r{}: {}/{} ({:.0}%)",
                        update.phase,
                        update.processed,
                        update.total,
                        update.fraction() * 100.0
                    );
                }
                Ok(update) => eprint!("\r{}: {}", update.phase, update.processed),
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            }
        }
    })
}

fn write_report(analysis: &Analysis, opts: &AnalyzeArgs) -> Result<()> {
    let report = &analysis.report;
    let rendered = match opts.format {
        OutputFormat::Text => report.to_text(),
        OutputFormat::Json => serde_json::to_string_pretty(report)? + "\n",
    };
    write_output(opts.output.as_deref(), &rendered)?;

    if report.has_duplicates() {
        eprintln!(
            "Found {} duplicate sets ({} directory, {} file)",
            report.sets.len(),
            report.directory_sets().count(),
            report.file_sets().count()
        );
    } else {
        eprintln!("No duplicate directories or files found.");
    }
    if !report.warnings.is_empty() {
        eprintln!("{} warning(s) during analysis", report.warnings.len());
    }
    Ok(())
}

fn run_tree(
    listing: &Path,
    format: TreeOutput,
    output: Option<&Path>,
    analyzed: bool,
    ignore: Vec<String>,
    show_progress: bool,
) -> Result<()> {
    let tree = if analyzed {
        let config = AnalyzeConfig {
            ignore_entries: ignore,
            ..AnalyzeConfig::default()
        };
        run_pipeline(&config, show_progress, || read_listing(listing))?.tree
    } else {
        let text = read_listing(listing)?;
        build_from_str(&text, &mut ProgressTracker::new())
            .context("Failed to build tree")?
            .tree
    };

    write_output(output, &render_tree(&tree, format.into()))
}

fn write_output(output: Option<&Path>, contents: &str) -> Result<()> {
    match output {
        Some(path) => std::fs::write(path, contents)
            .with_context(|| format!("Failed to write {}", path.display())),
        None => {
            print!("{contents}");
            Ok(())
        }
    }
}
