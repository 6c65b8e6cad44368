use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use once_cell::sync::OnceCell;

use fieldrec::analysis::Gate;
use fieldrec::capture;
use fieldrec::config::{CaptureConfig, CliOverrides};
use fieldrec::io::{CpalSoundSource, HoundSoundFileWriter, SimpleTemplateExpander, SoundSource};

#[derive(Parser, Debug)]
#[command(name = "fieldrec", about = "Triggered bioacoustic capture engine")]
struct Cli {
    /// Path to a flat key=value config file
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    prebuffer_ms: Option<u32>,
    #[arg(long)]
    period_ms: Option<u32>,
    #[arg(long)]
    open_thresh: Option<f32>,
    #[arg(long)]
    close_thresh: Option<f32>,
    #[arg(long)]
    open_rate_per_sec: Option<f32>,
    #[arg(long)]
    close_rate_per_sec: Option<f32>,
    #[arg(long)]
    output_template: Option<String>,
    #[arg(long)]
    quota_file: Option<String>,
    /// Directory captured segments are written into
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Capture live from the default input device until interrupted
    Run,
    /// Feed a WAV file through the same pipeline for offline testing
    Replay {
        #[arg(long)]
        input: PathBuf,
    },
}

/// Process-wide shutdown flag, set from the Ctrl-C handler and consulted
/// at the top of the writer mainloop.
static SHUTDOWN: OnceCell<Arc<AtomicBool>> = OnceCell::new();

fn main() -> ExitCode {
    fieldrec::init_logging();
    match run() {
        Ok(code) => code,
        Err(err) => {
            log::error!("fieldrec: {err:?}");
            ExitCode::from(1)
        }
    }
}

fn run() -> Result<ExitCode> {
    let cli = Cli::parse();

    let mut config = cli
        .config
        .as_ref()
        .map(CaptureConfig::load_from_file)
        .unwrap_or_default();
    config.apply_overrides(&CliOverrides {
        prebuffer_ms: cli.prebuffer_ms,
        period_ms: cli.period_ms,
        open_thresh: cli.open_thresh,
        close_thresh: cli.close_thresh,
        open_rate_per_sec: cli.open_rate_per_sec,
        close_rate_per_sec: cli.close_rate_per_sec,
        output_template: cli.output_template.clone(),
        quota_file: cli.quota_file.clone(),
    });

    match cli.command {
        Commands::Run => run_live(&config, &cli.output_dir),
        Commands::Replay { input } => run_replay(&config, &cli.output_dir, &input),
    }
}

fn build_gate(config: &CaptureConfig, sample_rate: u32) -> Gate {
    let params = config.gate_params(sample_rate);
    Gate::new(
        config.open_thresh,
        params.open_count_thresh,
        params.open_window_periods,
        config.close_thresh,
        params.close_count_thresh,
        params.close_window_periods,
        params.period_size,
    )
}

fn run_live(config: &CaptureConfig, output_dir: &std::path::Path) -> Result<ExitCode> {
    let shutdown = Arc::new(AtomicBool::new(false));
    SHUTDOWN
        .set(Arc::clone(&shutdown))
        .map_err(|_| anyhow::anyhow!("shutdown flag already initialized"))?;
    {
        let shutdown = Arc::clone(&shutdown);
        ctrlc::set_handler(move || shutdown.store(true, Ordering::SeqCst))
            .context("failed to install Ctrl-C handler")?;
    }

    let mut source = CpalSoundSource::new();
    let sound_writer = HoundSoundFileWriter::new(output_dir, 44_100);
    let gate_placeholder_rate = 44_100; // refined once the device reports its real rate
    let gate = build_gate(config, gate_placeholder_rate);

    let (mut producer, mut writer) = capture::build(
        config.ringbuffer_capacity,
        config.prebuffer_capacity(gate_placeholder_rate),
        gate,
        sound_writer,
        SimpleTemplateExpander::new(),
        config.output_template.clone(),
        "fieldrec",
    );

    let sample_rate = source.start(Box::new(move |samples, frame_time| {
        producer.on_process(samples, frame_time);
    }))?;
    if sample_rate != gate_placeholder_rate {
        log::warn!(
            "fieldrec: device reports {sample_rate} Hz, gate was derived for {gate_placeholder_rate} Hz; \
             set an explicit sample rate assumption via config if onset timing looks off"
        );
    }
    log::info!("fieldrec: capturing at {sample_rate} Hz");

    while !shutdown.load(Ordering::Relaxed) {
        if let Err(err) = writer.flush() {
            log::error!("fieldrec: flush error: {err}");
        }
        thread::sleep(Duration::from_millis(5));
    }

    source.stop();
    // Drain whatever is left in the ringbuffer once, then close any
    // still-open segment rather than truncating it silently.
    let _ = writer.flush();
    let _ = writer.close_entry();

    Ok(ExitCode::from(0))
}

fn run_replay(config: &CaptureConfig, output_dir: &std::path::Path, input: &std::path::Path) -> Result<ExitCode> {
    let mut reader = hound::WavReader::open(input)
        .with_context(|| format!("opening {input:?}"))?;
    let spec = reader.spec();
    let sample_rate = spec.sample_rate;

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader.samples::<f32>().filter_map(Result::ok).collect(),
        hound::SampleFormat::Int => reader
            .samples::<i32>()
            .filter_map(Result::ok)
            .map(|s| s as f32 / i32::MAX as f32)
            .collect(),
    };
    // Downmix to mono if the file is multi-channel, preserving order.
    let channels = spec.channels as usize;
    let mono: Vec<f32> = if channels <= 1 {
        samples
    } else {
        samples
            .chunks(channels)
            .map(|c| c.iter().sum::<f32>() / channels as f32)
            .collect()
    };

    let gate = build_gate(config, sample_rate);
    let sound_writer = HoundSoundFileWriter::new(output_dir, sample_rate);
    let (mut producer, mut writer) = capture::build(
        config.ringbuffer_capacity,
        config.prebuffer_capacity(sample_rate),
        gate,
        sound_writer,
        SimpleTemplateExpander::new(),
        config.output_template.clone(),
        "fieldrec-replay",
    );

    let chunk_size = (sample_rate as usize / 100).max(64); // ~10 ms chunks
    let mut frame_time = 0u64;
    for chunk in mono.chunks(chunk_size) {
        producer.on_process(chunk, frame_time);
        frame_time += chunk.len() as u64;
        writer.flush()?;
    }
    writer.flush()?;
    writer.close_entry()?;

    Ok(ExitCode::from(0))
}
