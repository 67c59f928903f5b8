use crate::{
    client::{ssllabs::SslLabsClient, ReportMode},
    config::{Config, Logging},
    error::{exit_code_for, FatalError},
    host,
    mail::SmtpMailer,
    report::{Aggregator, RunSummary},
    scheduler::{ScanScheduler, ScanSettings, ThreadSleeper},
    util::{ensure_dir, now_rfc3339},
};
use anyhow::{anyhow, Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const DEFAULT_CONFIG: &str = "tls-scan.toml";

#[derive(Parser, Debug)]
#[command(name = "tls-scan", version, disable_version_flag = true)]
#[command(about = "Automated TLS/SSL server tests for multiple hosts")]
pub struct Args {
    /// Print version.
    #[arg(short = 'v', long = "version", action = clap::ArgAction::Version)]
    version: (),

    /// Deliver cached assessment reports if available.
    #[arg(short = 'c')]
    pub cache: bool,

    /// Config file location (default: ./tls-scan.toml).
    #[arg(short = 'f', value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Print full assessment JSON per host instead of grades; disables -m.
    #[arg(short = 'j')]
    pub json: bool,

    /// Log level, 0 (errors only) to 3 (trace).
    #[arg(short = 'l', value_parser = clap::value_parser!(u8).range(0..=3))]
    pub log_level: Option<u8>,

    /// Send the report by mail.
    #[arg(short = 'm')]
    pub mail: bool,

    /// Number of simultaneous assessments.
    #[arg(short = 's', value_parser = clap::value_parser!(u8).range(2..=5))]
    pub concurrency: Option<u8>,

    /// Hosts to scan (overrides the config file list).
    #[arg(value_name = "HOST")]
    pub hosts: Vec<String>,
}

/// Runs the whole scan and returns the process exit code. Errors are logged here, while
/// the file writer is still alive to flush them.
pub fn dispatch(args: Args) -> i32 {
    let cfg = match load_config(args.config.as_deref()) {
        Ok(cfg) => cfg,
        Err(err) => {
            // Logging is configured from the file, so fall back to defaults to report this.
            let _ = init_logging(&args, &Logging::default(), None);
            error!("{:#}", err);
            return exit_code_for(&err);
        }
    };

    let log_path = resolve_log_path(&cfg);
    let _guard = match init_logging(&args, &cfg.logging, log_path.as_deref()) {
        Ok(guard) => guard,
        Err(err) => {
            eprintln!("{err:#}");
            return exit_code_for(&err);
        }
    };

    match run(&args, &cfg) {
        Ok(()) => {
            info!("exiting");
            0
        }
        Err(err) => {
            error!("{:#}", err);
            exit_code_for(&err)
        }
    }
}

fn load_config(user: Option<&Path>) -> Result<Config> {
    let path = match user {
        Some(p) => p.to_path_buf(),
        None => {
            let default = PathBuf::from(DEFAULT_CONFIG);
            if !default.exists() {
                return Ok(Config::default());
            }
            default
        }
    };
    Config::load(&path).map_err(|e| FatalError::Config(format!("{}: {e:#}", path.display())).into())
}

fn level_filter(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "error",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

fn init_logging(args: &Args, cfg: &Logging, file_path: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let level = args
        .log_level
        .map(level_filter)
        .unwrap_or(cfg.level.as_str());

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // stdout is reserved for the report.
    let console_layer = if cfg.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
            .boxed()
    };

    let (file_layer, guard) = if let Some(path) = file_path {
        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        ensure_dir(parent)?;
        let file = std::fs::File::create(path)
            .with_context(|| format!("create log file: {}", path.display()))?;
        let (non_blocking, guard) = tracing_appender::non_blocking(file);
        let layer = tracing_subscriber::fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false)
            .with_target(true)
            .boxed();
        (Some(layer), Some(guard))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow!("failed to init logging: {e}"))?;

    Ok(guard)
}

fn resolve_log_path(cfg: &Config) -> Option<PathBuf> {
    if !cfg.logging.write_to_file || cfg.logging.file_path.is_empty() {
        return None;
    }
    Some(PathBuf::from(&cfg.logging.file_path))
}

fn resolve_hosts(args: &Args, cfg: &Config) -> Result<Vec<host::Host>> {
    let raw = if args.hosts.is_empty() {
        &cfg.hosts
    } else {
        &args.hosts
    };
    if raw.is_empty() {
        return Err(FatalError::Config("no hosts given on the command line or in the config file".into()).into());
    }

    let cleaned = host::clean(raw);
    if !cleaned.invalid.is_empty() {
        error!("ignoring invalid hostname(s): {}", cleaned.invalid.join(", "));
    }
    if !cleaned.duplicates.is_empty() {
        warn!("ignoring duplicate hostname(s): {}", cleaned.duplicates.join(", "));
    }
    if cleaned.valid.is_empty() {
        return Err(FatalError::Config("no valid hostnames to scan".into()).into());
    }
    Ok(cleaned.valid)
}

fn run(args: &Args, cfg: &Config) -> Result<()> {
    let hosts = resolve_hosts(args, cfg)?;

    let mut scan_cfg = cfg.scan.clone();
    if let Some(conc) = args.concurrency {
        scan_cfg.concurrency = conc as usize;
    }
    let settings = ScanSettings::from_config(&scan_cfg);

    let mode = if args.json {
        ReportMode::Json
    } else {
        ReportMode::Grades
    };
    if args.json && args.mail {
        warn!("-j disables -m; the report will not be mailed");
    }

    info!("scanning {} host(s)... [cache: {}]", hosts.len(), args.cache);

    let client = SslLabsClient::new(&cfg.service, mode)?;
    crate::probe::check_capacity(&client, settings.concurrency, settings.cooldown)?;

    let started = now_rfc3339();
    let scheduler = ScanScheduler::new(client, ThreadSleeper, settings);
    let mut aggregator = Aggregator::new(mode, std::io::stdout());
    for event in scheduler.run(hosts, args.cache) {
        aggregator.collect(&event)?;
    }

    let summary = aggregator.summary().clone();
    info!(
        "scan finished: {} result(s), {} skipped, {} failed",
        summary.finished, summary.skipped, summary.failed
    );
    if !cfg.output.summary_path.is_empty() {
        write_summary(Path::new(&cfg.output.summary_path), &summary, &started)?;
    }

    if mode == ReportMode::Json {
        return Ok(());
    }

    let report = aggregator.finalize();
    if args.mail {
        match SmtpMailer::from_config(&cfg.mail).and_then(|m| m.send(&report)) {
            Ok(()) => return Ok(()),
            Err(e) => error!("mail delivery failed: {e:#}"),
        }
    }
    println!("{report}");
    Ok(())
}

fn write_summary(path: &Path, summary: &RunSummary, started: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        ensure_dir(parent)?;
    }
    let doc = serde_json::json!({
        "started": started,
        "finished": now_rfc3339(),
        "summary": summary,
    });
    std::fs::write(path, serde_json::to_string_pretty(&doc)?)
        .with_context(|| format!("writing summary: {}", path.display()))?;
    Ok(())
}
