//! EarnLab CLI: batch runs over an equity universe and cache inspection.
//!
//! Commands:
//! - `init`: write a default `earnlab.toml` and `universe.toml`
//! - `run`: align every entity of the universe for a run date
//! - `show`: print the aligned records of one entity
//! - `cache status`: list the entities cached for a run date
//! - `cache clean`: remove run-date directories older than N days

use anyhow::{bail, Context, Result};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use earnlab_core::data::{CsvRecordStore, Universe};
use earnlab_core::domain::AlignedRecord;
use earnlab_runner::{
    execute, init_logging, read_summary, BatchConfig, TracingProgress, LOG_FILE,
};
use std::path::{Path, PathBuf};

const DEFAULT_CONFIG: &str = "earnlab.toml";
const DEFAULT_UNIVERSE: &str = "universe.toml";

#[derive(Parser)]
#[command(
    name = "earnlab",
    about = "EarnLab CLI: align earnings announcements with trading sessions"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration and universe file.
    Init {
        /// Directory to write into. Defaults to the current directory.
        #[arg(long, default_value = ".")]
        dir: PathBuf,

        /// Overwrite existing files.
        #[arg(long, default_value_t = false)]
        force: bool,
    },
    /// Align every entity of the universe for a run date.
    Run {
        /// Path to a TOML config file. Defaults to ./earnlab.toml when present.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Run date (YYYY-MM-DD). Defaults to today.
        #[arg(long)]
        run_date: Option<String>,

        /// Worker pool size, overriding the config.
        #[arg(long)]
        workers: Option<usize>,
    },
    /// Print the aligned records of one entity.
    Show {
        /// Symbol to show (e.g., COST).
        symbol: String,

        #[arg(long)]
        config: Option<PathBuf>,

        /// Run date (YYYY-MM-DD). Defaults to today.
        #[arg(long)]
        run_date: Option<String>,

        /// Print JSON instead of a table.
        #[arg(long, default_value_t = false)]
        json: bool,
    },
    /// Cache management commands.
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// List cached entities and record counts for a run date.
    Status {
        #[arg(long)]
        config: Option<PathBuf>,

        /// Run date (YYYY-MM-DD). Defaults to today.
        #[arg(long)]
        run_date: Option<String>,
    },
    /// Remove run-date directories older than the given number of days.
    Clean {
        /// Keep run dates within this many days of today.
        #[arg(long)]
        older_than_days: i64,

        #[arg(long)]
        config: Option<PathBuf>,

        /// Actually delete (without this flag, only previews what would be removed).
        #[arg(long, default_value_t = false)]
        confirm: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Init { dir, force } => run_init(&dir, force),
        Commands::Run {
            config,
            run_date,
            workers,
        } => run_batch_cmd(config, run_date, workers),
        Commands::Show {
            symbol,
            config,
            run_date,
            json,
        } => run_show(&symbol, config, run_date, json),
        Commands::Cache { action } => match action {
            CacheAction::Status { config, run_date } => run_cache_status(config, run_date),
            CacheAction::Clean {
                older_than_days,
                config,
                confirm,
            } => run_cache_clean(config, older_than_days, confirm),
        },
    }
}

// ── Helpers ──────────────────────────────────────────────────────────

fn load_config(path: Option<PathBuf>) -> Result<BatchConfig> {
    match path {
        Some(path) => BatchConfig::from_file(&path)
            .with_context(|| format!("loading {}", path.display())),
        None if Path::new(DEFAULT_CONFIG).is_file() => {
            BatchConfig::from_file(Path::new(DEFAULT_CONFIG))
                .with_context(|| format!("loading {DEFAULT_CONFIG}"))
        }
        None => Ok(BatchConfig::default()),
    }
}

fn parse_run_date(arg: Option<&str>) -> Result<NaiveDate> {
    match arg {
        Some(s) => NaiveDate::parse_from_str(s, "%Y-%m-%d")
            .with_context(|| format!("invalid run date '{s}', expected YYYY-MM-DD")),
        None => Ok(chrono::Local::now().date_naive()),
    }
}

fn fmt_close(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{v:.2}"))
}

// ── Commands ─────────────────────────────────────────────────────────

fn run_init(dir: &Path, force: bool) -> Result<()> {
    std::fs::create_dir_all(dir)?;
    let config_path = dir.join(DEFAULT_CONFIG);
    let universe_path = dir.join(DEFAULT_UNIVERSE);

    for path in [&config_path, &universe_path] {
        if path.exists() && !force {
            bail!("{} already exists (pass --force to overwrite)", path.display());
        }
    }

    let mut config = BatchConfig::default();
    config.universe.file = Some(PathBuf::from(DEFAULT_UNIVERSE));
    std::fs::write(&config_path, config.to_toml()?)?;
    std::fs::write(&universe_path, Universe::default_us().to_toml()?)?;

    println!("Wrote {}", config_path.display());
    println!("Wrote {}", universe_path.display());
    Ok(())
}

fn run_batch_cmd(
    config_path: Option<PathBuf>,
    run_date: Option<String>,
    workers: Option<usize>,
) -> Result<()> {
    let mut config = load_config(config_path)?;
    if let Some(n) = workers {
        config.workers = n;
        config.validate()?;
    }
    let run_date = parse_run_date(run_date.as_deref())?;

    let store = CsvRecordStore::new(&config.output_dir);
    let log_file = config
        .logging
        .file
        .then(|| store.run_dir(run_date).join(LOG_FILE));
    init_logging(&config.logging, log_file.as_deref())?;

    let output = execute(&config, run_date, &TracingProgress::new())?;
    let summary = &output.summary;

    println!();
    println!("=== Batch {} ===", summary.run_date);
    println!("Entities:       {}", summary.total);
    println!("Cached:         {}", summary.cached);
    println!("Aligned:        {}", summary.aligned);
    println!("Failed:         {}", summary.failed);
    println!("Elapsed:        {:.1}s", summary.elapsed_ms as f64 / 1000.0);
    println!("Summary:        {}", output.summary_path.display());

    if summary.failed > 0 {
        println!();
        println!("Failed list: {}", summary.failed_entities().join(", "));
        for failure in &summary.failures {
            eprintln!("  {} [{:?}]: {}", failure.entity, failure.kind, failure.reason);
        }
        std::process::exit(1);
    }

    Ok(())
}

fn run_show(
    symbol: &str,
    config_path: Option<PathBuf>,
    run_date: Option<String>,
    json: bool,
) -> Result<()> {
    let config = load_config(config_path)?;
    let run_date = parse_run_date(run_date.as_deref())?;
    let store = CsvRecordStore::new(&config.output_dir);

    let records = store
        .peek(run_date, symbol)
        .with_context(|| format!("no records for {symbol} on {run_date}"))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    print_records(symbol, run_date, &records);
    Ok(())
}

fn print_records(symbol: &str, run_date: NaiveDate, records: &[AlignedRecord]) {
    println!("{symbol} (run {run_date}): {} record(s)", records.len());
    println!();
    println!(
        "{:<10}  {:>6}  {:>4}  {:>8}  {:>8}  {:>9}  {:>9}  {:>9}  {:>9}",
        "date", "timing", "side", "est", "act", "prev_prev", "prev", "next", "next_next"
    );
    for r in records {
        println!(
            "{:<10}  {:>6}  {:>4}  {:>8}  {:>8}  {:>9}  {:>9}  {:>9}  {:>9}",
            r.calendar_date.to_string(),
            r.timing.to_string(),
            r.session.to_string(),
            fmt_close(r.estimated_metric),
            fmt_close(r.actual_metric),
            fmt_close(r.prices.prev_prev_close),
            fmt_close(r.prices.prev_close),
            fmt_close(r.prices.next_close),
            fmt_close(r.prices.next_next_close),
        );
    }
}

fn run_cache_status(config_path: Option<PathBuf>, run_date: Option<String>) -> Result<()> {
    let config = load_config(config_path)?;
    let run_date = parse_run_date(run_date.as_deref())?;
    let store = CsvRecordStore::new(&config.output_dir);
    let run_dir = store.run_dir(run_date);

    if !run_dir.is_dir() {
        println!("No run directory for {run_date}: {}", run_dir.display());
        return Ok(());
    }

    let entities = store.entities(run_date)?;
    println!("Run directory: {}", run_dir.display());
    println!("Cached entities: {}", entities.len());

    if let Ok(summary) = read_summary(&run_dir) {
        println!(
            "Last batch: {} aligned, {} cached, {} failed",
            summary.aligned, summary.cached, summary.failed
        );
    }
    println!();

    for entity in &entities {
        match store.peek(run_date, entity) {
            Ok(records) => {
                let partial = records.iter().filter(|r| !r.prices.is_complete()).count();
                println!("  {entity:<10} {:>4} records  {partial:>3} with gaps", records.len());
            }
            Err(e) => println!("  {entity:<10} unreadable: {e}"),
        }
    }

    Ok(())
}

fn run_cache_clean(config_path: Option<PathBuf>, older_than_days: i64, confirm: bool) -> Result<()> {
    let config = load_config(config_path)?;
    let root = &config.output_dir;
    if !root.is_dir() {
        println!("Output directory does not exist: {}", root.display());
        return Ok(());
    }

    let cutoff = chrono::Local::now().date_naive() - chrono::Duration::days(older_than_days);
    let mut to_remove: Vec<(NaiveDate, PathBuf)> = Vec::new();

    for entry in std::fs::read_dir(root)? {
        let entry = entry?;
        let path = entry.path();
        if !path.is_dir() {
            continue;
        }
        // Only run-date directories; anything else is left alone
        let Some(date) = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(|n| NaiveDate::parse_from_str(n, "%Y-%m-%d").ok())
        else {
            continue;
        };
        if date < cutoff {
            to_remove.push((date, path));
        }
    }
    to_remove.sort();

    if to_remove.is_empty() {
        println!("No run dates older than {older_than_days} days to remove.");
        return Ok(());
    }

    println!(
        "Found {} run date(s) older than {older_than_days} days:",
        to_remove.len()
    );
    for (date, path) in &to_remove {
        println!("  {date} ({})", format_size(dir_size(path)));
    }

    if !confirm {
        println!();
        println!("Dry run: pass --confirm to actually delete.");
        return Ok(());
    }

    for (date, path) in &to_remove {
        std::fs::remove_dir_all(path)?;
        println!("Removed: {date}");
    }

    println!("Done. Removed {} run date(s).", to_remove.len());
    Ok(())
}

fn dir_size(path: &Path) -> u64 {
    let mut size = 0u64;
    if let Ok(entries) = std::fs::read_dir(path) {
        for entry in entries.flatten() {
            if let Ok(meta) = entry.metadata() {
                size += meta.len();
            }
        }
    }
    size
}

fn format_size(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{bytes} B")
    } else if bytes < 1024 * 1024 {
        format!("{:.1} KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1} MB", bytes as f64 / (1024.0 * 1024.0))
    }
}
