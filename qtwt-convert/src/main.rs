//! QT Py Wavetable Converter (qtwt-convert) - Main entry point
//!
//! Converts audio files into `<name>_qtpy_<waves>x256.wav` wavetables and,
//! for multi-file batches, a zip archive of all of them.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use qtwt_common::config::{self, EngineKind, Settings, SettingsOverrides};
use qtwt_common::{EventBus, WaveCount};
use qtwt_convert::audio::{WavDecoder, WavetableSummary};
use qtwt_convert::transcoder::{engine_from_settings, EngineState};
use qtwt_convert::{
    ArchiveBundler, BatchController, ConversionPipeline, ConversionResult, InputFile, ZipBundler,
};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const DEFAULT_LOG_FILTER: &str = "qtwt_convert=info,qtwt_common=info";

/// Command-line arguments for qtwt-convert
#[derive(Parser, Debug)]
#[command(name = "qtwt-convert")]
#[command(about = "Convert audio files into QT Py synth wavetables")]
#[command(version)]
struct Cli {
    /// Config file (default: <config dir>/qtwt/config.toml)
    #[arg(long, global = true, env = "QTWT_CONFIG")]
    config: Option<PathBuf>,

    /// Log level or filter directive (overridden by RUST_LOG)
    #[arg(long, global = true, env = "QTWT_LOG_LEVEL")]
    log_level: Option<String>,

    #[command(flatten)]
    engine: EngineArgs,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct EngineArgs {
    /// Transcoder engine: symphonia (in-process) or ffmpeg
    #[arg(long, global = true, env = "QTWT_ENGINE")]
    engine: Option<EngineKind>,

    /// ffmpeg executable for the ffmpeg engine
    #[arg(long, global = true, env = "QTWT_FFMPEG_PATH")]
    ffmpeg_path: Option<PathBuf>,

    /// Scratch directory for the ffmpeg engine
    #[arg(long, global = true, env = "QTWT_WORK_DIR")]
    work_dir: Option<PathBuf>,

    /// Seconds allowed for the engine to load
    #[arg(long, global = true, env = "QTWT_LOAD_TIMEOUT")]
    load_timeout: Option<u64>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert audio files into wavetables
    Convert(ConvertArgs),

    /// Report the wave layout of existing wavetable files
    Inspect {
        #[arg(required = true)]
        files: Vec<PathBuf>,

        /// One JSON object per file instead of the text report
        #[arg(long)]
        json: bool,
    },

    /// Load the configured transcoder engine and report its state
    Check,

    /// Write a config file holding every default
    InitConfig {
        /// Destination (default: the resolved config path)
        path: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[derive(Args, Debug)]
struct ConvertArgs {
    /// Input audio files, converted in order
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Waves per wavetable: auto (64) or 1, 2, 4, ... 256
    #[arg(short, long, env = "QTWT_WAVES")]
    waves: Option<WaveCount>,

    /// Fade in at the start of the wavetable
    #[arg(long, env = "QTWT_FADE_IN", num_args = 0..=1, default_missing_value = "true")]
    fade_in: Option<bool>,

    /// Fade out at the end of the wavetable
    #[arg(long, env = "QTWT_FADE_OUT", num_args = 0..=1, default_missing_value = "true")]
    fade_out: Option<bool>,

    /// Fade length in samples (negative means no fade)
    #[arg(long, env = "QTWT_FADE_LEN", allow_negative_numbers = true)]
    fade_len: Option<i64>,

    /// Directory for the converted files
    #[arg(short, long, env = "QTWT_OUTPUT_DIR")]
    out_dir: Option<PathBuf>,

    /// Do not bundle multi-file batches into an archive
    #[arg(long)]
    no_archive: bool,

    /// Archive file name
    #[arg(long, env = "QTWT_ARCHIVE_NAME")]
    archive_name: Option<String>,

    /// Print progress events as JSON lines on stdout
    #[arg(long)]
    events_json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = config::resolve_config_path(cli.config.as_deref());
    let file_config = match &config_path {
        Some(path) => config::load_toml_config(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => None,
    };

    let settings = Settings::resolve(
        &overrides(&cli),
        file_config.as_ref().unwrap_or(&config::TomlConfig::default()),
    );
    init_tracing(&settings.log_level)?;

    // Config loading runs before the subscriber exists, so report it here
    match (&config_path, &file_config) {
        (Some(path), Some(_)) => info!("Config: {}", path.display()),
        (Some(path), None) => warn!("Config file not found: {} (using defaults)", path.display()),
        (None, _) => info!("No config directory, using defaults"),
    }

    match cli.command {
        Command::Convert(args) => convert(args, &settings).await,
        Command::Inspect { files, json } => inspect(&files, json).await,
        Command::Check => check(&settings).await,
        Command::InitConfig { path, force } => init_config(path.or(config_path), force),
    }
}

/// Command-line and environment values layered over the config file
fn overrides(cli: &Cli) -> SettingsOverrides {
    let mut overrides = SettingsOverrides {
        engine: cli.engine.engine,
        ffmpeg_path: cli.engine.ffmpeg_path.clone(),
        work_dir: cli.engine.work_dir.clone(),
        load_timeout_secs: cli.engine.load_timeout,
        log_level: cli.log_level.clone(),
        ..Default::default()
    };

    if let Command::Convert(args) = &cli.command {
        overrides.waves = args.waves;
        overrides.fade_in = args.fade_in;
        overrides.fade_out = args.fade_out;
        overrides.fade_length = args.fade_len;
        overrides.output_dir = args.out_dir.clone();
        overrides.archive = args.no_archive.then_some(false);
        overrides.archive_name = args.archive_name.clone();
    }

    overrides
}

/// RUST_LOG wins; otherwise the configured level applies to both crates
fn init_tracing(level: &str) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => {
            let directive = if level.contains('=') || level.contains(',') {
                level.to_string()
            } else if level.is_empty() {
                DEFAULT_LOG_FILTER.to_string()
            } else {
                format!("qtwt_convert={0},qtwt_common={0}", level)
            };
            EnvFilter::try_new(&directive)
                .with_context(|| format!("Invalid log level: {}", level))?
        }
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
    Ok(())
}

async fn convert(args: ConvertArgs, settings: &Settings) -> Result<()> {
    let events = EventBus::default();
    let printer = args.events_json.then(|| spawn_event_printer(&events));

    let engine = Arc::new(engine_from_settings(settings).with_events(events.clone()));
    info!("Engine: {}", engine.name());

    let pipeline = ConversionPipeline::new(engine).with_events(events.clone());
    let controller = BatchController::new(pipeline, events);

    let files: Vec<InputFile> = args.inputs.iter().map(InputFile::from_path).collect();
    let outcome = controller
        .run_batch(files, settings.conversion_request())
        .await;

    // Close the bus so the printer drains and exits
    drop(controller);
    if let Some(printer) = printer {
        let _ = printer.await;
    }

    let (results, failure) = match outcome {
        Ok(results) => (results, None),
        Err(failure) => (failure.completed, Some(failure.error)),
    };

    write_outputs(&results, settings).await?;

    match failure {
        Some(error) => Err(error).context("Batch stopped"),
        None => Ok(()),
    }
}

async fn write_outputs(results: &[ConversionResult], settings: &Settings) -> Result<()> {
    if results.is_empty() {
        return Ok(());
    }

    let out_dir = &settings.output_dir;
    tokio::fs::create_dir_all(out_dir)
        .await
        .with_context(|| format!("Failed to create output directory {}", out_dir.display()))?;

    for result in results {
        let path = out_dir.join(&result.output_name);
        tokio::fs::write(&path, &result.audio)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!("Wrote {}", path.display());

        if !result.cleanup_failures.is_empty() {
            warn!(
                "{}: {} temporary file(s) could not be removed",
                result.output_name,
                result.cleanup_failures.len()
            );
        }
    }

    if results.len() > 1 && settings.archive {
        let bundler = ZipBundler::new();
        let archive = bundler
            .bundle_results(results)
            .context("Failed to build archive")?;
        let path = out_dir.join(&settings.archive_name);
        tokio::fs::write(&path, archive)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!("Archive: {} ({} files)", path.display(), results.len());
    }

    Ok(())
}

fn spawn_event_printer(events: &EventBus) -> JoinHandle<()> {
    let mut rx = events.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => match event.to_json() {
                    Ok(line) => println!("{}", line),
                    Err(e) => warn!("Failed to serialize event: {}", e),
                },
                Err(tokio::sync::broadcast::error::RecvError::Lagged(n)) => {
                    warn!("Event printer lagged, {} events dropped", n);
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

async fn inspect(files: &[PathBuf], json: bool) -> Result<()> {
    let mut malformed = 0;

    for path in files {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let buffer = WavDecoder::decode(&bytes)
            .with_context(|| format!("{} is not a mono 16-bit PCM WAV", path.display()))?;
        let summary = WavetableSummary::from_buffer(&buffer);
        if !summary.is_well_formed() {
            malformed += 1;
        }

        if json {
            let line = serde_json::json!({
                "file": path.display().to_string(),
                "well_formed": summary.is_well_formed(),
                "summary": summary,
            });
            println!("{}", line);
            continue;
        }

        println!("{}", path.display());
        println!("  sample rate: {} Hz", summary.sample_rate);
        println!("  samples:     {}", summary.sample_count);
        println!("  waves:       {}", summary.wave_count);
        if summary.remainder != 0 {
            println!(
                "  WARNING: {} trailing samples do not form a whole 256-sample wave",
                summary.remainder
            );
        }
        if summary.silent_waves() > 0 {
            println!("  silent waves: {}", summary.silent_waves());
        }
        for (i, peak) in summary.wave_peaks.iter().enumerate() {
            println!("  wave {:>3}: peak {:>5}", i, peak);
        }
    }

    if malformed > 0 {
        bail!("{} of {} file(s) are not well-formed wavetables", malformed, files.len());
    }
    Ok(())
}

async fn check(settings: &Settings) -> Result<()> {
    let engine = engine_from_settings(settings);
    info!(
        "Loading {} engine (timeout {}s)",
        engine.name(),
        engine.load_timeout().as_secs()
    );

    let outcome = engine.initialize().await;
    println!("{}: {}", engine.name(), engine.state());

    match outcome {
        Ok(()) if engine.state() == EngineState::Ready => Ok(()),
        Ok(()) => bail!("{} engine is not ready", engine.name()),
        Err(e) => {
            error!("Self-check failed: {}", e);
            Err(e).context("Engine self-check failed")
        }
    }
}

fn init_config(path: Option<PathBuf>, force: bool) -> Result<()> {
    let Some(path) = path else {
        bail!("No config path; pass one explicitly");
    };
    write_default_config(&path, force)?;
    println!("Wrote {}", path.display());
    Ok(())
}

fn write_default_config(path: &Path, force: bool) -> Result<()> {
    if path.exists() && !force {
        bail!("{} already exists (use --force to overwrite)", path.display());
    }
    config::write_toml_config(&config::default_toml_config(), path)
        .with_context(|| format!("Failed to write {}", path.display()))
}
