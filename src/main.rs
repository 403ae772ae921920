use clap::Parser;
use colored::Colorize;
use depsweep::cleanup::{Cleanup, CleanupOptions};
use depsweep::config::{Config, FinishMode, PackageManagerKind};
use depsweep::report::{ReportFormat, Reporter};
use depsweep::CancellationToken;
use miette::{IntoDiagnostic, Result, WrapErr};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{info, warn};

/// depsweep - Find unused npm dependencies and remove them safely
#[derive(Parser, Debug)]
#[command(name = "depsweep")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to the project directory
    #[arg(default_value = ".")]
    path: PathBuf,

    /// Path to configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Path patterns to exclude from scanning (can be specified multiple times)
    #[arg(short, long)]
    exclude: Vec<String>,

    /// Dependency patterns never offered for removal (can be specified multiple times)
    #[arg(short, long)]
    retain: Vec<String>,

    /// Scanner worker threads (0 = one per core)
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Also consider devDependencies
    #[arg(long)]
    dev: bool,

    /// Package manager used to uninstall and re-sync
    #[arg(long, value_enum)]
    package_manager: Option<PackageManagerKind>,

    /// Command that must succeed after each removal
    #[arg(long, value_name = "CMD")]
    verify_cmd: Option<String>,

    /// Verification timeout in seconds
    #[arg(long, value_name = "SECS")]
    verify_timeout: Option<u64>,

    /// Prefix for per-dependency work branches
    #[arg(long, value_name = "PREFIX")]
    branch_prefix: Option<String>,

    /// Keep each verified branch instead of merging it back
    #[arg(long)]
    keep_branches: bool,

    /// Analyse and report only; never touch the project
    #[arg(long)]
    dry_run: bool,

    /// Choose which unused dependencies to remove
    #[arg(long)]
    interactive: bool,

    /// Output format
    #[arg(short, long, value_enum)]
    format: Option<OutputFormat>,

    /// Output file (for json format)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Write logs to this file instead of stderr
    #[arg(long, value_name = "FILE")]
    log_file: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Quiet mode - only output results
    #[arg(short, long)]
    quiet: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum OutputFormat {
    Terminal,
    Json,
}

impl From<OutputFormat> for ReportFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Terminal => ReportFormat::Terminal,
            OutputFormat::Json => ReportFormat::Json,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose, cli.quiet, cli.log_file.as_deref())?;

    info!("depsweep v{}", env!("CARGO_PKG_VERSION"));

    let config = load_config(&cli)?;

    run(&config, &cli)
}

fn init_logging(verbose: bool, quiet: bool, log_file: Option<&Path>) -> Result<()> {
    use std::sync::Mutex;
    use tracing_subscriber::{fmt, EnvFilter};

    let filter = if quiet {
        EnvFilter::new("error")
    } else if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    match log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .into_diagnostic()
                .wrap_err_with(|| format!("Failed to open log file: {}", path.display()))?;
            fmt()
                .with_env_filter(filter)
                .with_target(false)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => {
            fmt()
                .with_env_filter(filter)
                .with_target(false)
                .with_writer(std::io::stderr)
                .init();
        }
    }

    Ok(())
}

fn load_config(cli: &Cli) -> Result<Config> {
    let mut config = if let Some(config_path) = &cli.config {
        Config::from_file(config_path)?
    } else {
        // Try to load from default locations
        Config::from_default_locations(&cli.path)?
    };

    // Override with CLI arguments
    if !cli.exclude.is_empty() {
        config.exclude.extend(cli.exclude.clone());
    }
    if !cli.retain.is_empty() {
        config.retain.extend(cli.retain.clone());
    }
    if let Some(jobs) = cli.jobs {
        config.jobs = jobs;
    }
    if cli.dev && !config.sections.iter().any(|s| s == "devDependencies") {
        config.sections.push("devDependencies".to_string());
    }
    if let Some(pm) = cli.package_manager {
        config.transaction.package_manager = pm;
    }
    if let Some(cmd) = &cli.verify_cmd {
        config.verify.command = cmd.clone();
    }
    if let Some(secs) = cli.verify_timeout {
        config.verify.timeout_secs = secs;
    }
    if let Some(prefix) = &cli.branch_prefix {
        config.transaction.branch_prefix = prefix.clone();
    }
    if cli.keep_branches {
        config.transaction.finish = FinishMode::Keep;
    }
    if let Some(format) = cli.format {
        config.report.format = match format {
            OutputFormat::Terminal => "terminal".to_string(),
            OutputFormat::Json => "json".to_string(),
        };
    }
    if cli.output.is_some() {
        config.report.output = cli.output.clone();
    }

    Ok(config)
}

fn run(config: &Config, cli: &Cli) -> Result<()> {
    let start_time = Instant::now();

    let format = ReportFormat::from_name(&config.report.format).ok_or_else(|| {
        miette::miette!("Unknown report format: {}", config.report.format)
    })?;

    // First Ctrl-C stops after the open transaction is reverted or finished
    let cancel = CancellationToken::new();
    let handler_token = cancel.clone();
    ctrlc::set_handler(move || {
        if !handler_token.is_cancelled() {
            eprintln!("{}", "Interrupted - finishing the current step, then stopping...".yellow());
        }
        handler_token.cancel();
    })
    .into_diagnostic()
    .wrap_err("Failed to install Ctrl-C handler")?;

    let options = CleanupOptions {
        dry_run: cli.dry_run,
        interactive: cli.interactive,
        show_progress: !cli.quiet && format == ReportFormat::Terminal,
    };

    let report = Cleanup::new(config, &cli.path)
        .with_options(options)
        .with_cancellation(cancel)
        .run()?;

    let reporter = Reporter::new(format, config.report.output.clone());
    reporter.report(&report)?;

    info!("Completed in {:.2}s", start_time.elapsed().as_secs_f64());

    if report.cancelled {
        warn!("Run was cancelled");
    }
    if let Some(fatal) = report.fatal {
        return Err(miette::miette!("{}", fatal));
    }

    Ok(())
}
