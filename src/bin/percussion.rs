//! `percussion`: render instruments, plot and compare spectra, tune
//! settings against a recording.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};

use percussion_core::config::{AnalyserConfig, PlotConfig, TunerConfig, WINDOW_LENGTHS};
use percussion_core::export::{self, WavFormat};
use percussion_core::spectrogram::Spectrogram;
use percussion_core::{Analyser, Instrument, InstrumentSettings, Silence, SliceSource, SynthError, Tuner};

#[derive(Parser, Debug)]
#[command(name = "percussion", version)]
#[command(about = "Percussion synthesis, spectral analysis and parameter tuning", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render an instrument to a WAV file
    Render {
        /// hat-closed, hat-open, cymbal, kick, snare, tom-high or tom-low
        instrument: Instrument,

        /// Output file (default: <instrument>.wav)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        #[arg(long, value_enum, default_value_t = Format::S24)]
        format: Format,

        #[arg(long, value_name = "HZ", default_value_t = 44100)]
        rate: u32,

        /// Settings JSON, as written by `tune`
        #[arg(long, value_name = "FILE")]
        settings: Option<PathBuf>,
    },

    /// Analyse a WAV file, optionally against a second one
    Analyse {
        input: PathBuf,

        /// Plot and measure the spectral difference to this file
        #[arg(long, value_name = "FILE")]
        compare: Option<PathBuf>,

        /// Spectrogram PNG
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        /// FFT window length: 512, 1024, 2048, 4096 or 8192
        #[arg(long, value_name = "SAMPLES", default_value_t = 1024, value_parser = parse_window)]
        window: usize,

        /// Windows overlapping each sample
        #[arg(long, default_value_t = 8)]
        overlaps: usize,

        /// X-axis exponent, 1.0 is a linear frequency axis
        #[arg(long, default_value_t = 1.0)]
        linearity: f64,

        #[arg(long, default_value_t = 1.0)]
        scale: f64,

        #[arg(long, default_value_t = 32.0)]
        exposure: f64,
    },

    /// Tune an instrument's settings towards a reference recording
    Tune {
        instrument: Instrument,

        reference: PathBuf,

        /// Starting settings JSON (default: factory settings)
        #[arg(long, value_name = "FILE")]
        settings: Option<PathBuf>,

        #[arg(long, default_value_t = 24)]
        generations: usize,

        #[arg(long, default_value_t = 16)]
        population: usize,

        #[arg(long, default_value_t = 1)]
        seed: u64,

        /// Where to save the tuned settings (default: print them)
        #[arg(long, value_name = "FILE")]
        settings_out: Option<PathBuf>,

        /// Render the tuned instrument to this WAV file
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Format {
    S24,
    F64,
}

impl From<Format> for WavFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::S24 => WavFormat::S24,
            Format::F64 => WavFormat::F64,
        }
    }
}

fn parse_window(s: &str) -> Result<usize, String> {
    let n: usize = s.parse().map_err(|e| format!("{e}"))?;
    if WINDOW_LENGTHS.contains(&n) {
        Ok(n)
    } else {
        Err(format!("window length must be one of {WINDOW_LENGTHS:?}"))
    }
}

fn load_settings(path: &Path) -> Result<InstrumentSettings, SynthError> {
    let json = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&json)?)
}

fn render(
    instrument: Instrument,
    output: Option<PathBuf>,
    format: Format,
    rate: u32,
    settings: Option<PathBuf>,
) -> Result<(), SynthError> {
    let samples = match settings {
        Some(path) => instrument.render_with(&load_settings(&path)?, rate as f64)?,
        None => instrument.render(rate as f64),
    };

    let output = output.unwrap_or_else(|| PathBuf::from(format!("{instrument}.wav")));
    export::write_wav(&output, &samples, rate, format.into())?;

    println!(
        "{}: {} samples ({:.1} ms) -> {}",
        instrument,
        samples.len(),
        samples.len() as f64 * 1000.0 / rate as f64,
        output.display()
    );
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn analyse(
    input: PathBuf,
    compare: Option<PathBuf>,
    output: Option<PathBuf>,
    window: usize,
    overlaps: usize,
    linearity: f64,
    scale: f64,
    exposure: f64,
) -> Result<(), SynthError> {
    let mut analyser = Analyser::from_config(&AnalyserConfig { window_length: window, overlaps })?;

    let (primary, rate) = export::read_wav(&input)?;
    let secondary = match &compare {
        Some(path) => {
            let (samples, other_rate) = export::read_wav(path)?;
            if other_rate != rate {
                log::warn!("Sample rates differ: {rate} Hz vs {other_rate} Hz");
            }
            Some(samples)
        }
        None => None,
    };

    let mut plot = match output {
        Some(_) => Some(Spectrogram::new(PlotConfig {
            linearity,
            scale,
            exposure,
            ..PlotConfig::default()
        })?),
        None => None,
    };

    let mut on_window = |index: usize, _len: usize, bins: &[f32]| {
        if let Some(plot) = plot.as_mut() {
            plot.draw_row(index, bins);
        }
    };
    let result = match &secondary {
        Some(samples) => analyser.analyse(SliceSource::new(&primary), SliceSource::new(samples), &mut on_window),
        None => analyser.analyse(SliceSource::new(&primary), Silence, &mut on_window),
    };

    println!("{}: {} samples at {} Hz", input.display(), primary.len(), rate);
    println!("Analysed {} windows", result.windows);
    if secondary.is_some() {
        println!("Difference: {:.3}", result.difference);
    }

    if let (Some(plot), Some(path)) = (plot, output) {
        plot.save_png(&path)?;
        println!("Plot -> {}", path.display());
    }
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn tune(
    instrument: Instrument,
    reference: PathBuf,
    settings: Option<PathBuf>,
    generations: usize,
    population: usize,
    seed: u64,
    settings_out: Option<PathBuf>,
    output: Option<PathBuf>,
) -> Result<(), SynthError> {
    let (reference, rate) = export::read_wav(&reference)?;
    let initial = match settings {
        Some(path) => load_settings(&path)?,
        None => instrument.default_settings(),
    };
    if !initial.fits(instrument) {
        return Err(SynthError::InvalidConfig(format!(
            "{} settings cannot tune {}",
            initial.kind(),
            instrument
        )));
    }

    let mut tuner = Tuner::new(TunerConfig {
        generations,
        population,
        seed,
        sampling_frequency: rate as f64,
        ..TunerConfig::default()
    });
    let outcome = initial.tune(&mut tuner, &reference)?;

    println!(
        "Best difference {:.3} after {} generations",
        outcome.best_difference,
        outcome.history.len()
    );

    let json = serde_json::to_string_pretty(&outcome.settings)?;
    match settings_out {
        Some(path) => {
            std::fs::write(&path, json)?;
            println!("Settings -> {}", path.display());
        }
        None => println!("{json}"),
    }

    if let Some(path) = output {
        let samples = outcome.settings.render(rate as f64);
        export::write_wav(&path, &samples, rate, WavFormat::S24)?;
        println!("Render -> {}", path.display());
    }
    Ok(())
}

fn run(cli: Cli) -> Result<(), SynthError> {
    match cli.command {
        Command::Render { instrument, output, format, rate, settings } => {
            render(instrument, output, format, rate, settings)
        }
        Command::Analyse { input, compare, output, window, overlaps, linearity, scale, exposure } => {
            analyse(input, compare, output, window, overlaps, linearity, scale, exposure)
        }
        Command::Tune {
            instrument,
            reference,
            settings,
            generations,
            population,
            seed,
            settings_out,
            output,
        } => tune(instrument, reference, settings, generations, population, seed, settings_out, output),
    }
}

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    match run(Cli::parse()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
