use clap::{Parser, Subcommand};
use landafix::archive::{DestinationArchive, SourceArchive, ZipSource};
use landafix::classify::{classify, declared_type_for_name, Classification};
use landafix::config::RepairConfig;
use landafix::orchestrator::{BatchOrchestrator, InputItem, Output};
use landafix::outcome::{FailurePolicy, Outcome};
use landafix::output::OutputNamer;
use landafix::RepairError;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "landafix", about = "Repair images in files, zip archives and folders")]
struct Cli {
    /// Log at debug level (RUST_LOG overrides)
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Repair images, zip archives and directories
    Repair {
        #[arg(required = true, num_args = 1..)]
        input: Vec<PathBuf>,
        /// Directory the repaired output is written to
        #[arg(short, long, default_value = ".")]
        output: PathBuf,
        /// JSON configuration file
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Add the repaired images to an existing zip instead of creating a new one
        #[arg(short, long)]
        append: Option<PathBuf>,
        /// Stop at the first image that cannot be read or decoded
        #[arg(long)]
        abort: bool,
        /// Also expand zip archives found inside zip archives
        #[arg(long)]
        nested: bool,
        /// JPEG re-encoding quality (1-100)
        #[arg(short, long)]
        quality: Option<u8>,
    },
    /// Show how paths would be classified
    Classify {
        #[arg(required = true, num_args = 1..)]
        paths: Vec<PathBuf>,
    },
    /// List the entries of a zip archive
    List {
        input: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {

        // ── Repair ───────────────────────────────────────────────────────────
        Commands::Repair { input, output, config, append, abort, nested, quality } => {
            let mut config = match config {
                Some(path) => RepairConfig::load(path)?,
                None       => RepairConfig::default(),
            };
            if abort  { config.failure_policy = FailurePolicy::Abort; }
            if nested { config.nested_archives = true; }
            if let Some(q) = quality {
                config.jpeg_quality = q;
                config.validate()?;
            }

            let namer = OutputNamer::new(config.output_prefix.clone());
            let pack  = config.pack_options();
            let items = input
                .iter()
                .map(|path| InputItem::from_path(path, config.page_size))
                .collect::<Result<Vec<_>, _>>()?;
            let single_name = match items.as_slice() {
                [only] => Some(only.name().to_owned()),
                _      => None,
            };
            let orchestrator = BatchOrchestrator::with_raster_codec(config);

            if let Some(zip_path) = append {
                let mut dest = DestinationArchive::open(std::fs::read(&zip_path)?)?;
                let report = orchestrator.process(items, Some(&mut dest))?;
                print_outcome(&report.outcome);
                let bytes = dest.finalize(&pack).map_err(RepairError::Write)?;
                std::fs::write(&zip_path, bytes)?;
                if let Output::Appended { added } = report.output {
                    println!("Updated: {} (+{} entries, {} total)", zip_path.display(), added, dest.len());
                }
                return Ok(());
            }

            let report = orchestrator.process(items, None)?;
            print_outcome(&report.outcome);
            match report.output {
                Output::Blob(blob) => {
                    let path = namer.save(&output, &namer.blob_name(&blob.name), &blob.bytes)?;
                    println!("Created: {}", path.display());
                }
                Output::Archive(dest) => {
                    let bytes = dest.finalize(&pack).map_err(RepairError::Write)?;
                    let name  = namer.archive_name(single_name.as_deref());
                    let path  = namer.save(&output, &name, &bytes)?;
                    println!("Created: {} ({} entries)", path.display(), dest.len());
                }
                Output::Appended { added } => {
                    println!("Added {added} entries");
                }
                Output::Skipped => {
                    println!("Nothing to repair");
                }
            }
        }

        // ── Classify ─────────────────────────────────────────────────────────
        Commands::Classify { paths } => {
            for path in &paths {
                let name = display_name(path);
                let verdict = classify(&name, declared_type_for_name(&name));
                let detail = match verdict {
                    Classification::Image(t) => t.mime(),
                    Classification::Archive  => landafix::classify::ZIP_MIME,
                    Classification::Ignored  => "-",
                };
                println!("{:<8} {:<16} {}", verdict.label(), detail, path.display());
            }
        }

        // ── List ─────────────────────────────────────────────────────────────
        Commands::List { input } => {
            let mut src = ZipSource::open(&input)?;
            println!("Archive: {}", input.display());
            println!("{:<40} {:>12}  Content hash", "Name", "Size");
            for entry in src.entries()? {
                if entry.is_dir {
                    continue;
                }
                let data = src.read(entry.index)?;
                let hash = blake3::hash(&data);
                println!("{:<40} {:>12}  {}", entry.path, data.len(), hex::encode(&hash.as_bytes()[..6]));
            }
        }
    }

    Ok(())
}

// ── helpers ──────────────────────────────────────────────────────────────────

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn print_outcome(outcome: &Outcome) {
    for path in outcome.written() {
        println!("  repaired  {path}");
    }
    for (path, err) in outcome.failures() {
        println!("  failed    {path}: {err}");
    }
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}
