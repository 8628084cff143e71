mod navigator;
mod parser;
mod pipeline;
mod record;
mod settings;
mod sink;
mod source;
mod variants;

use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tracing::info;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use navigator::Navigator;
use parser::FieldExtractor;
use pipeline::Pipeline;
use settings::{Settings, SinkKind};
use source::{HttpFetcher, Session};

#[derive(Parser)]
#[command(name = "pokedex_scraper", about = "Pokédex scraper for pokemondb.net")]
struct Cli {
    /// Settings file (default: ./pokedex.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
    /// Override the configured sink
    #[arg(long, global = true, value_enum)]
    sink: Option<SinkKind>,
    /// Stop after this many catalog pages
    #[arg(short = 'n', long, global = true)]
    max_pages: Option<usize>,
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Walk the catalog from the entry page and persist every record (default)
    Run,
    /// Show statistics for the relational store
    Stats,
}

/// Terminal output, plus a plain-text copy in `log_file` when one is set.
fn init_tracing(log_file: Option<&Path>) -> anyhow::Result<()> {
    let file_layer = match log_file {
        Some(path) => Some(
            fmt::layer()
                .with_ansi(false)
                .with_writer(Arc::new(open_log_file(path)?)),
        ),
        None => None,
    };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .with(fmt::layer())
        .with(file_layer)
        .init();
    Ok(())
}

/// Create the log file and its directory, dropping the previous run's log.
fn open_log_file(path: &Path) -> anyhow::Result<File> {
    sink::ensure_parent(path)?;
    File::create(path).with_context(|| format!("failed to create log file {}", path.display()))
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let t0 = Instant::now();
    let cli = Cli::parse();

    let mut settings = Settings::load(cli.config.as_deref()).context("failed to load settings")?;
    let log_file = settings.log.file.as_deref().filter(|p| !p.as_os_str().is_empty());
    init_tracing(log_file)?;
    if let Some(kind) = cli.sink {
        settings.sink.kind = kind;
    }
    if cli.max_pages.is_some() {
        settings.run.max_pages = cli.max_pages;
    }

    let result = match cli.command.unwrap_or(Commands::Run) {
        Commands::Run => run(&settings).await,
        Commands::Stats => stats(&settings),
    };

    let elapsed = t0.elapsed();
    if elapsed.as_secs() >= 1 {
        println!("\nDone in {}", format_duration(elapsed));
    }

    result
}

async fn run(settings: &Settings) -> anyhow::Result<()> {
    let fields = settings
        .locators
        .compile_fields()
        .context("invalid field locators")?;
    let controls = settings
        .locators
        .compile_controls()
        .context("invalid control locators")?;
    let fetcher = HttpFetcher::new(&settings.source.user_agent, settings.source.timeout())
        .context("failed to build HTTP client")?;
    let sink = sink::open(&settings.sink).context("failed to open sink")?;

    let navigator = Navigator::from_slug(
        &settings.source.base_url,
        &settings.source.entry_slug,
        settings.run.max_pages,
    );
    info!(
        "Locators v{}, entry {}",
        settings.locators.version,
        navigator.entry_url()
    );

    let mut pipeline = Pipeline::new(navigator, FieldExtractor::new(fields), sink);
    let summary = pipeline.run(Session::new(fetcher, controls)).await?;

    println!(
        "Scraped {} records from {} pages ({} fields stored as null) in {}",
        summary.records,
        summary.pages,
        summary.recovered_fields,
        format_duration(summary.elapsed)
    );
    Ok(())
}

fn stats(settings: &Settings) -> anyhow::Result<()> {
    let path = &settings.sink.relational.path;
    if !path.exists() {
        bail!("no database at {}; run a relational scrape first", path.display());
    }
    let conn = sink::db::connect(path).with_context(|| format!("failed to open {}", path.display()))?;
    sink::db::init_schema(&conn)?;
    let s = sink::db::get_stats(&conn)?;
    println!("Rows:             {}", s.rows);
    println!("Catalog entries:  {}", s.entries);
    println!("Variant rows:     {}", s.variants);
    println!("Missing measures: {}", s.missing_measures);
    println!("No ability:       {}", s.no_ability);
    println!("Total mismatches: {}", s.total_mismatches);
    Ok(())
}

fn format_duration(d: std::time::Duration) -> String {
    let secs = d.as_secs();
    if secs < 60 {
        format!("{:.1}s", d.as_secs_f64())
    } else if secs < 3600 {
        format!("{}m {}s", secs / 60, secs % 60)
    } else {
        format!("{}h {}m {}s", secs / 3600, (secs % 3600) / 60, secs % 60)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn durations_are_human_readable() {
        assert_eq!(format_duration(Duration::from_millis(2500)), "2.5s");
        assert_eq!(format_duration(Duration::from_secs(125)), "2m 5s");
        assert_eq!(format_duration(Duration::from_secs(3725)), "1h 2m 5s");
    }

    #[test]
    fn bare_invocation_runs() {
        let cli = Cli::try_parse_from(["pokedex_scraper"]).unwrap();
        assert!(cli.command.is_none());
        assert!(cli.sink.is_none());
    }

    #[test]
    fn flags_parse() {
        let cli = Cli::try_parse_from(["pokedex_scraper", "--sink", "tabular", "-n", "5"]).unwrap();
        assert_eq!(cli.sink, Some(SinkKind::Tabular));
        assert_eq!(cli.max_pages, Some(5));
    }

    #[test]
    fn log_file_is_truncated_on_open() {
        let dir = std::env::temp_dir().join(format!("pokedex-log-{}", std::process::id()));
        let path = dir.join("logs").join("pokemon.log");
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "previous run\n").unwrap();

        let file = open_log_file(&path).unwrap();
        drop(file);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "");
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn log_directory_is_created() {
        let dir = std::env::temp_dir().join(format!("pokedex-logdir-{}", std::process::id()));
        let path = dir.join("nested").join("pokemon.log");
        open_log_file(&path).unwrap();
        assert!(path.exists());
        std::fs::remove_dir_all(&dir).ok();
    }
}
