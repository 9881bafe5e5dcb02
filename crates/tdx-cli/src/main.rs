//! CLI entry point for the textdex document indexer.
//!
//! This binary builds and inspects `index.json`, a manifest of every `.txt`
//! and `.md` file under a directory, and can expose it over HTTP.
//!
//! # Usage
//!
//! ```bash
//! tdx [OPTIONS] <COMMAND>
//!
//! # Index the current directory into ./index.json
//! tdx scan
//!
//! # Index another directory with a smaller size ceiling
//! tdx scan --root ./texts --max-bytes 1048576
//!
//! # Print stats and item paths of the last manifest
//! tdx show --items
//!
//! # Serve the manifest on port 3000 (or $PORT)
//! tdx serve
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

mod server;

use std::io::Write;

use camino::{Utf8Path, Utf8PathBuf};
use clap::{Parser, Subcommand};
use color_eyre::eyre::{WrapErr, eyre};
use tdx_core::{Config, Manifest};
use tdx_scanner::{ScanSummary, Scanner};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

// =============================================================================
// CLI ARGUMENT TYPES
// =============================================================================

/// Incremental indexer for plain-text and Markdown documents.
///
/// Walks a directory, reuses unchanged entries from the previous run, and
/// writes a JSON manifest of every eligible document.
#[derive(Parser)]
#[command(name = "tdx", version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Command to execute.
    #[command(subcommand)]
    command: Commands,

    /// JSON configuration file. Flags and environment variables override it.
    #[arg(short, long, global = true, env = "TDX_CONFIG")]
    config: Option<Utf8PathBuf>,

    /// Directory to index.
    #[arg(short, long, global = true, env = "TDX_ROOT")]
    root: Option<Utf8PathBuf>,

    /// Manifest location.
    ///
    /// Defaults to `index.json` inside `--root` when a root is given.
    #[arg(short, long, global = true, env = "TDX_OUTPUT")]
    output: Option<Utf8PathBuf>,

    /// Reject files larger than this many bytes.
    #[arg(long, global = true, env = "TDX_MAX_BYTES")]
    max_bytes: Option<u64>,

    /// Number of worker threads (default: CPU count clamped to 2..=8).
    #[arg(short = 'j', long, global = true, env = "TDX_CONCURRENCY")]
    concurrency: Option<usize>,

    /// Eligible extensions, comma separated (default: txt,md).
    #[arg(long = "ext", global = true, value_delimiter = ',')]
    extensions: Vec<String>,

    /// Follow symbolic links while walking.
    #[arg(long, global = true)]
    follow_links: bool,

    /// Enable verbose logging (debug level).
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,
}

/// Available subcommands.
#[derive(Subcommand)]
enum Commands {
    /// Build the manifest once and print a summary.
    Scan,

    /// Print the stats of the persisted manifest.
    Show {
        /// Also list every indexed path.
        #[arg(long)]
        items: bool,
    },

    /// Serve the manifest over HTTP.
    Serve {
        /// Interface to bind.
        #[arg(long, env = "TDX_HOST")]
        host: Option<String>,

        /// Port to bind.
        #[arg(short, long, env = "PORT")]
        port: Option<u16>,

        /// Skip the scan that normally runs at startup.
        #[arg(long)]
        no_initial_scan: bool,
    },
}

// =============================================================================
// INITIALIZATION FUNCTIONS
// =============================================================================

/// Initializes the tracing subscriber for logging.
///
/// Respects the `RUST_LOG` environment variable if set. Otherwise, uses
/// `debug` level if `--verbose` is set, or `info` level by default.
/// Noisy crates like `hyper` and `mio` are filtered to `warn` level.
fn init_tracing(verbose: bool, no_color: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        let level = if verbose { "debug" } else { "info" };
        EnvFilter::new(format!("{level},hyper=warn,mio=warn,tower_http=warn"))
    });

    // Check if colors should be disabled (flag or NO_COLOR env var)
    let use_ansi = !no_color && std::env::var("NO_COLOR").is_err();

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .with_ansi(use_ansi)
                .with_writer(std::io::stderr),
        )
        .with(filter)
        .init();
}

/// Builds a [`Config`]: defaults, then the config file, then flags and
/// environment variables.
fn build_config(cli: &Cli) -> color_eyre::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::from_json_file(path)
            .wrap_err_with(|| format!("Failed to load config file {path}"))?,
        None => Config::default(),
    };

    if let Some(root) = &cli.root {
        config.scan.root_path.clone_from(root);
        config.scan.output_path = root.join("index.json");
    }
    if let Some(output) = &cli.output {
        config.scan.output_path.clone_from(output);
    }
    if let Some(max_bytes) = cli.max_bytes {
        config.scan.max_bytes = max_bytes;
    }
    if let Some(concurrency) = cli.concurrency {
        config.scan.concurrency = Some(concurrency);
    }
    if !cli.extensions.is_empty() {
        config.scan.allowed_extensions = cli.extensions.iter().cloned().collect();
    }
    if cli.follow_links {
        config.scan.follow_links = true;
    }

    if let Commands::Serve {
        host,
        port,
        no_initial_scan,
    } = &cli.command
    {
        if let Some(host) = host {
            config.serve.host.clone_from(host);
        }
        if let Some(port) = port {
            config.serve.port = *port;
        }
        if *no_initial_scan {
            config.serve.scan_on_start = false;
        }
    }

    config.scan.validate()?;
    Ok(config)
}

/// Creates a [`Scanner`] from the configuration.
fn create_scanner(config: &Config) -> color_eyre::Result<Scanner> {
    Scanner::new(config.scan.clone()).wrap_err("Failed to create scanner")
}

// =============================================================================
// COMMAND IMPLEMENTATIONS
// =============================================================================

/// Runs one scan-and-persist cycle and prints the summary.
fn run_scan(config: &Config) -> color_eyre::Result<()> {
    let scanner = create_scanner(config)?;
    let (_, summary) = scanner.run().wrap_err("Failed to build the index")?;

    let stdout = std::io::stdout();
    write_summary(&mut stdout.lock(), &summary)?;
    Ok(())
}

/// Prints the persisted manifest.
fn run_show(config: &Config, items: bool) -> color_eyre::Result<()> {
    let path = &config.scan.output_path;
    let manifest = tdx_scanner::read_manifest(path)?
        .ok_or_else(|| eyre!("No manifest at {path}; run `tdx scan` first"))?;

    let stdout = std::io::stdout();
    write_manifest_report(&mut stdout.lock(), path, &manifest, items)?;
    Ok(())
}

/// Serves the manifest over HTTP until interrupted.
async fn run_serve(config: Config) -> color_eyre::Result<()> {
    info!(
        root = %config.scan.root_path,
        host = %config.serve.host,
        port = config.serve.port,
        "Starting server"
    );
    let scanner = create_scanner(&config)?;
    server::serve(scanner, &config.serve).await
}

// =============================================================================
// OUTPUT HELPERS
// =============================================================================

/// Writes the post-scan summary.
fn write_summary(out: &mut impl Write, summary: &ScanSummary) -> std::io::Result<()> {
    let file = summary
        .output_path
        .file_name()
        .unwrap_or(summary.output_path.as_str());

    writeln!(out, "Index ready: {file}")?;
    writeln!(
        out,
        "   Indexed: {} | Reused: {} | Failed: {}",
        summary.indexed, summary.reused, summary.failed
    )?;
    if summary.failed > 0 {
        writeln!(out, "   Check \"errors\" in {file} for details.")?;
    }
    Ok(())
}

/// Writes a human-readable view of a manifest.
fn write_manifest_report(
    out: &mut impl Write,
    path: &Utf8Path,
    manifest: &Manifest,
    items: bool,
) -> std::io::Result<()> {
    let stats = &manifest.stats;
    let base_dir = if manifest.base_dir.is_empty() {
        "."
    } else {
        manifest.base_dir.as_str()
    };

    writeln!(out, "Manifest:     {path}")?;
    writeln!(
        out,
        "Generated at: {}",
        tdx_core::timestamp::format(&manifest.generated_at)
    )?;
    writeln!(out, "Base dir:     {base_dir}")?;
    writeln!(out)?;
    writeln!(out, "Files seen:   {}", stats.total_files_seen)?;
    writeln!(out, "  Indexed:    {}", stats.indexed)?;
    writeln!(out, "  Reused:     {}", stats.reused)?;
    writeln!(out, "  Failed:     {}", stats.failed)?;
    writeln!(out, "Max bytes:    {}", stats.max_bytes)?;
    writeln!(out, "Concurrency:  {}", stats.concurrency)?;

    if items && !manifest.items.is_empty() {
        writeln!(out)?;
        writeln!(out, "Items ({}):", manifest.items.len())?;
        for entry in &manifest.items {
            writeln!(out, "  {} ({} bytes)", entry.rel_path, entry.size)?;
        }
    }

    if !manifest.errors.is_empty() {
        writeln!(out)?;
        writeln!(out, "Errors ({}):", manifest.errors.len())?;
        for failure in &manifest.errors {
            writeln!(out, "  {} - {}", failure.rel_path, failure.reason)?;
        }
    }
    Ok(())
}

// =============================================================================
// MAIN ENTRY POINT
// =============================================================================

/// Application entry point.
#[tokio::main]
async fn main() -> color_eyre::Result<()> {
    // 1. Install color-eyre FIRST (before any potential panics)
    color_eyre::install()?;

    // 2. Parse CLI arguments
    let cli = Cli::parse();

    // 3. Initialize tracing (handles --no-color for log output)
    init_tracing(cli.verbose, cli.no_color);

    // 4. Layer configuration sources
    let config = build_config(&cli)?;

    // 5. Route to appropriate command
    match &cli.command {
        Commands::Scan => run_scan(&config),
        Commands::Show { items } => run_show(&config, *items),
        Commands::Serve { .. } => run_serve(config).await,
    }
}
