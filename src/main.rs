use std::io;
use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use technique_ltl::config::CONFIG_ENV;
use technique_ltl::pipeline::{
    dry_run, init_default_config, CliOverrides, Harness, HarnessConfig, TraceWriter,
};
use technique_ltl::printer::{FormulaPrinter, JsonLinesPrinter, PrettyPrinter};
use technique_ltl::progress::{default_log_filter, ConsoleProgress};

#[derive(Parser, Debug)]
#[command(name = "technique-ltl")]
#[command(about = "Translate chained ATT&CK technique descriptions into temporal-logic formulas", long_about = None)]
struct Args {
    /// Generate default config, catalog, prompt and engine script, then exit
    #[arg(long)]
    init_config: bool,

    /// Directory to write config files (default: current directory)
    #[arg(long, value_name = "DIR")]
    init_config_dir: Option<PathBuf>,

    /// Overwrite existing files when used with --init-config
    #[arg(long)]
    force: bool,

    /// Config file path (default: search for technique-ltl.toml upwards)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Technique catalog TOML (default: built-in catalog)
    #[arg(long, value_name = "TOML")]
    catalog: Option<PathBuf>,

    /// Engine backend name from config
    #[arg(long)]
    engine: Option<String>,

    /// Model identifier passed to the engine
    #[arg(long)]
    model: Option<String>,

    /// Prompt template path passed to the engine
    #[arg(long)]
    prompt: Option<String>,

    /// Candidate filter: basic, greedy or none
    #[arg(long)]
    filter: Option<String>,

    /// Text placed between two adjacent descriptions
    #[arg(long)]
    connector: Option<String>,

    /// Print the combined utterances without calling the engine
    #[arg(long)]
    dry_run: bool,

    /// Emit one JSON object per pair instead of the console layout
    #[arg(long)]
    json: bool,

    /// Write per-pair utterances and results to the trace directory
    #[arg(long)]
    trace: bool,

    /// Trace directory (implies --trace)
    #[arg(long, value_name = "DIR")]
    trace_dir: Option<PathBuf>,

    /// Suppress progress lines and info logs on stderr
    #[arg(short, long)]
    quiet: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(default_log_filter(args.quiet))),
        )
        .with_writer(io::stderr)
        .init();

    if args.init_config {
        let dir = args
            .init_config_dir
            .clone()
            .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));
        let cfg_path = init_default_config(&dir, args.force).context("init default config")?;
        eprintln!("Wrote config: {}", cfg_path.display());
        return Ok(());
    }

    let workdir = std::env::current_dir().context("current dir")?;
    let cfg = HarnessConfig::load(
        &workdir,
        CliOverrides {
            config: args.config,
            config_env: std::env::var_os(CONFIG_ENV).map(PathBuf::from),
            engine_backend: args.engine,
            model: args.model,
            prompt: args.prompt,
            filter: args.filter,
            catalog: args.catalog,
            connector: args.connector,
            trace_dir: args.trace_dir,
            trace: args.trace,
            dry_run: args.dry_run,
        },
    )
    .context("build config")?;
    tracing::info!(
        config = %cfg.config_path.display(),
        catalog = %cfg
            .catalog_path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "built-in".to_string()),
        "loaded configuration"
    );

    let stdout = io::stdout().lock();
    if args.dry_run {
        dry_run(&cfg.catalog, &cfg.connector, args.json, stdout).context("dry run")?;
        return Ok(());
    }

    let progress = ConsoleProgress::new(!args.quiet);
    if args.json {
        run(&cfg, JsonLinesPrinter::new(stdout), progress)
    } else {
        run(&cfg, PrettyPrinter::new(stdout), progress)
    }
}

fn run<P: FormulaPrinter>(
    cfg: &HarnessConfig,
    printer: P,
    progress: ConsoleProgress,
) -> anyhow::Result<()> {
    let trace = TraceWriter::new(cfg.trace_dir.clone(), cfg.trace)?;
    let mut harness = Harness::new(cfg.command_engine(), printer, progress)
        .with_trace(trace)
        .with_log_max_chars(cfg.log_max_chars);
    harness.run(&cfg.catalog, &cfg.connector)?;
    Ok(())
}
