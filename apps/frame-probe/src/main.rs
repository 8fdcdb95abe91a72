use anyhow::Result;
use clap::{ArgAction, Parser, ValueEnum};
use serde::Serialize;
use std::thread;
use std::time::{Duration, Instant};
use tracing::{info, warn};

use frame_source::{
    load_source_config, open_source, FrameSource, SourceConfig, SourceKind, SourceMode,
    SyntheticCapture,
};

#[derive(Parser, Debug)]
#[command(
    name = "frame-probe",
    version,
    about = "Open a frame source and report what a consumer sees"
)]
struct Cli {
    /// YAML source config; the flags below override its fields
    #[arg(long)]
    config: Option<String>,
    /// Device index like 0, or a path (synthetic backend: synthetic, synthetic:N)
    #[arg(long)]
    input: Option<String>,
    #[arg(long)]
    width: Option<u32>,
    #[arg(long)]
    height: Option<u32>,
    /// Flip frames horizontally (threaded sources only)
    #[arg(long, action = ArgAction::SetTrue)]
    mirror: bool,
    #[arg(long, value_enum)]
    mode: Option<Mode>,
    #[arg(long, value_enum, default_value_t = Backend::Synthetic)]
    backend: Backend,
    /// Number of read cycles
    #[arg(long, default_value_t = 30u32)]
    frames: u32,
    /// Pause between cycles on threaded sources
    #[arg(long, default_value_t = 33u64)]
    interval_ms: u64,
    /// Print the summary as JSON
    #[arg(long, action = ArgAction::SetTrue)]
    json: bool,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum Mode {
    Auto,
    Threaded,
    Synchronous,
}

impl From<Mode> for SourceMode {
    fn from(mode: Mode) -> Self {
        match mode {
            Mode::Auto => SourceMode::Auto,
            Mode::Threaded => SourceMode::Threaded,
            Mode::Synchronous => SourceMode::Synchronous,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum Backend {
    Synthetic,
    Opencv,
}

#[derive(Debug, Default, Serialize)]
struct ProbeSummary {
    input: String,
    kind: Option<SourceKind>,
    cycles: u32,
    frames: u32,
    empty_cycles: u32,
    ended: bool,
    last_size: Option<(u32, u32)>,
    elapsed_ms: u64,
}

fn main() -> Result<()> {
    setup_tracing();
    let cli = Cli::parse();

    let config = resolve_config(&cli)?;
    info!(
        input = %config.input,
        resolution = %config.resolution(),
        kind = %config.kind(),
        "opening frame source"
    );
    let mut source = open_with_backend(&config, cli.backend)?;
    let summary = probe(
        source.as_mut(),
        cli.frames,
        Duration::from_millis(cli.interval_ms),
    );

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!(
            "{} ({}): {} frames in {} cycles, {} empty, ended={}, last size {:?}, {} ms",
            summary.input,
            config.kind(),
            summary.frames,
            summary.cycles,
            summary.empty_cycles,
            summary.ended,
            summary.last_size,
            summary.elapsed_ms
        );
    }
    Ok(())
}

fn setup_tracing() {
    // Best-effort; avoid panics if already set
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();
}

fn resolve_config(cli: &Cli) -> Result<SourceConfig> {
    let mut config = match (&cli.config, &cli.input) {
        (Some(path), _) => load_source_config(path)?,
        (None, Some(input)) => SourceConfig::new(input.clone()),
        (None, None) => SourceConfig::new("synthetic:30"),
    };
    if let (Some(_), Some(input)) = (&cli.config, &cli.input) {
        config.input = input.clone();
    }
    if let Some(width) = cli.width {
        config.width = width;
    }
    if let Some(height) = cli.height {
        config.height = height;
    }
    if cli.mirror {
        config.mirror = true;
    }
    if let Some(mode) = cli.mode {
        config.mode = mode.into();
    }
    config.validate()?;
    Ok(config)
}

fn open_with_backend(config: &SourceConfig, backend: Backend) -> Result<Box<dyn FrameSource>> {
    match backend {
        Backend::Synthetic => Ok(open_source::<SyntheticCapture>(config)?),
        Backend::Opencv => {
            #[cfg(feature = "opencv")]
            {
                Ok(open_source::<frame_source::OpenCvCapture>(config)?)
            }
            #[cfg(not(feature = "opencv"))]
            {
                anyhow::bail!("OpenCV backend not enabled at compile time; rebuild with --features opencv")
            }
        }
    }
}

/// Drive `source` the way a pipeline would: one read per cycle.
///
/// An empty read on a threaded source is a cycle without a new frame; on a
/// synchronous source it ends the stream.
fn probe(source: &mut dyn FrameSource, cycles: u32, interval: Duration) -> ProbeSummary {
    let kind = source.kind();
    let mut summary = ProbeSummary {
        input: source.input().to_string(),
        kind: Some(kind),
        ..ProbeSummary::default()
    };
    let start = Instant::now();

    for _ in 0..cycles {
        summary.cycles += 1;
        match source.read_frame() {
            Some(frame) => {
                summary.frames += 1;
                summary.last_size = Some((frame.width, frame.height));
            }
            None if kind == SourceKind::Synchronous => {
                summary.ended = true;
                break;
            }
            None => summary.empty_cycles += 1,
        }
        if kind == SourceKind::Threaded && !interval.is_zero() {
            thread::sleep(interval);
        }
    }

    source.close();
    summary.elapsed_ms = start.elapsed().as_millis() as u64;
    if summary.frames == 0 {
        warn!(input = %summary.input, "no frames received");
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::parse_from(std::iter::once("frame-probe").chain(args.iter().copied()))
    }

    #[test]
    fn flags_build_a_config() {
        let cli = parse(&[
            "--input", "0", "--width", "320", "--height", "240", "--mirror", "--mode", "threaded",
        ]);
        let config = resolve_config(&cli).unwrap();
        assert_eq!(
            config,
            SourceConfig::new("0")
                .with_resolution(320, 240)
                .with_mirror(true)
                .with_mode(SourceMode::Threaded)
        );
    }

    #[test]
    fn zero_width_is_rejected() {
        let cli = parse(&["--input", "0", "--width", "0"]);
        assert!(resolve_config(&cli).is_err());
    }

    #[test]
    fn synchronous_probe_stops_at_end_of_stream() {
        let config = SourceConfig::new("synthetic:3").with_resolution(8, 4);
        let mut source = open_with_backend(&config, Backend::Synthetic).unwrap();
        let summary = probe(source.as_mut(), 10, Duration::ZERO);
        assert_eq!(summary.frames, 3);
        assert_eq!(summary.cycles, 4);
        assert!(summary.ended);
        assert_eq!(summary.last_size, Some((8, 4)));
    }

    #[test]
    fn threaded_probe_counts_empty_cycles_instead_of_stopping() {
        let config = SourceConfig::new("synthetic")
            .with_resolution(8, 4)
            .with_mode(SourceMode::Threaded);
        let mut source = open_with_backend(&config, Backend::Synthetic).unwrap();
        let summary = probe(source.as_mut(), 5, Duration::from_millis(5));
        assert_eq!(summary.cycles, 5);
        assert_eq!(summary.frames + summary.empty_cycles, 5);
        assert!(!summary.ended);
    }
}
