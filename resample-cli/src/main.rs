//! Command-line front end: resample raw PCM or canonical WAV files.

use anyhow::{bail, Context};
use clap::Parser;
use resample::{Quality, Resampler, ResamplerConfig, SampleFormat};
use resample_wav::{read_header, WavSpec, WavWriter};
use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use tracing::info;

/// Command-line arguments for the resample tool.
#[derive(Parser, Debug)]
#[command(name = "resample")]
#[command(version)]
#[command(about = "Bandlimited PCM sample-rate converter")]
#[command(long_about = "Resample converts interleaved little-endian PCM between\n\
    arbitrary sample rates using a bandlimited polyphase filter.\n\n\
    Inputs and outputs are raw PCM byte streams; files with a .wav\n\
    extension are read and written with a canonical 44-byte header\n\
    instead, taking format, channels and input rate from the header.\n\n\
    EXAMPLES:\n    \
    resample --ir 44100 --or 16000 in.raw out.raw\n    \
    resample --or 48000 in.wav out.wav\n    \
    resample --format f64 --ch 1 --ir 8000 --or 44100 -q kaiser_best in.raw out.raw")]
struct Args {
    /// Input file: raw little-endian PCM, or WAV when the extension is .wav
    input: PathBuf,

    /// Output file: raw little-endian PCM, or WAV when the extension is .wav
    output: PathBuf,

    /// PCM element format (i16, i32, i64, f32, f64); ignored for WAV input
    #[arg(long, default_value = "i16")]
    format: String,

    /// Number of interleaved channels; ignored for WAV input
    #[arg(long, default_value_t = 2)]
    ch: usize,

    /// Input sample rate in Hz; ignored for WAV input
    #[arg(long, default_value_t = 44100)]
    ir: u32,

    /// Output sample rate in Hz
    #[arg(long)]
    or: u32,

    /// Quality preset (linear, kaiser_fastest, kaiser_fast, kaiser_best)
    #[arg(short, long, default_value = "kaiser_fast")]
    quality: String,

    /// Disable the per-phase weight cache
    #[arg(long)]
    no_memoization: bool,

    /// Worker count for the convolution fan-out (default: 4 per core)
    #[arg(long, conflicts_with = "sequential")]
    workers: Option<usize>,

    /// Compute on the calling thread only
    #[arg(long)]
    sequential: bool,

    /// Verbose logging
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    /// Suppress logging
    #[arg(short = 'Q', long)]
    quiet: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    if !args.quiet {
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(if args.verbose {
                tracing::Level::DEBUG
            } else {
                tracing::Level::INFO
            })
            .with_target(false)
            .finish();
        let _ = tracing::subscriber::set_global_default(subscriber);
    }

    let result = run(&args);
    if result.is_err() {
        // Leave no partially written output behind.
        let _ = fs::remove_file(&args.output);
    }
    result
}

fn run(args: &Args) -> anyhow::Result<()> {
    let quality = Quality::from_str(&args.quality).ok_or(resample::Error::UnknownQuality {
        name: args.quality.clone(),
    })?;

    let input = File::open(&args.input)
        .with_context(|| format!("opening {}", args.input.display()))?;
    let mut reader = BufReader::new(input);

    let (format, channels, in_rate, data_size) = if is_wav(&args.input) {
        let (spec, data_size) = read_header(&mut reader)
            .with_context(|| format!("reading WAV header of {}", args.input.display()))?;
        info!(
            format = %spec.sample_format,
            channels = spec.channels,
            rate = spec.sample_rate,
            "input WAV"
        );
        (
            spec.sample_format,
            spec.channels as usize,
            spec.sample_rate,
            Some(data_size),
        )
    } else {
        let format = SampleFormat::from_str(&args.format).ok_or(resample::Error::UnknownFormat {
            name: args.format.clone(),
        })?;
        (format, args.ch, args.ir, None)
    };

    let mut config = ResamplerConfig::new()
        .with_quality(quality)
        .with_memoization(!args.no_memoization);
    if args.sequential {
        config = config.sequential();
    } else if let Some(workers) = args.workers {
        config = config.with_workers(workers);
    }

    let output = File::create(&args.output)
        .with_context(|| format!("creating {}", args.output.display()))?;

    let frames = if is_wav(&args.output) {
        if channels > u16::MAX as usize {
            bail!("{} channels do not fit a WAV header", channels);
        }
        let spec = WavSpec {
            sample_format: format,
            channels: channels as u16,
            sample_rate: args.or,
        };
        let writer = WavWriter::new(BufWriter::new(output), spec)?;
        let mut engine =
            Resampler::with_config(writer, format, in_rate, args.or, channels, config)?;
        pump(&mut engine, &mut reader, data_size)?;
        let frames = engine.processed_frames();
        engine.into_inner().finalize().context("finalizing WAV header")?;
        frames
    } else {
        let mut engine = Resampler::with_config(
            BufWriter::new(output),
            format,
            in_rate,
            args.or,
            channels,
            config,
        )?;
        pump(&mut engine, &mut reader, data_size)?;
        let frames = engine.processed_frames();
        engine.into_inner().flush().context("flushing output")?;
        frames
    };

    info!(frames, rate = args.or, "resampling complete");
    Ok(())
}

/// Stream the input through the engine, honoring a WAV data-size bound
/// when one was declared.
fn pump<W: Write, R: Read>(
    engine: &mut Resampler<W>,
    reader: &mut R,
    data_size: Option<u32>,
) -> resample::Result<u64> {
    match data_size {
        Some(size) => {
            let mut limited = reader.by_ref().take(size as u64);
            engine.read_from(&mut limited)
        }
        None => engine.read_from(reader),
    }
}

fn is_wav(path: &Path) -> bool {
    path.extension()
        .map_or(false, |e| e.eq_ignore_ascii_case("wav"))
}
