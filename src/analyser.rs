//! Spectral analyser: overlapped, Hann-windowed FFT of one signal, or the
//! per-bin spectral distance between two.
//!
//! Samples are pulled from [`SampleSource`]s one hop at a time into a pair
//! of window buffers that scroll left as new hops arrive. Every window is
//! handed to a callback, so the analyser knows nothing about plotting or
//! statistics.

use std::f32::consts::TAU;
use std::fmt;
use std::sync::Arc;

use rustfft::{Fft, FftPlanner, num_complex::Complex};

use crate::config::AnalyserConfig;
use crate::error::SynthError;

/// Per-bin differences are scaled by this before integer accumulation.
pub const DIFFERENCE_SCALE: f32 = 10000.0;

/// A pull source of mono samples.
pub trait SampleSource {
    /// Fill as much of `out` as is available and return the count written.
    /// Returning fewer than `out.len()` marks the end of the stream.
    fn read(&mut self, out: &mut [f32]) -> usize;
}

impl<F> SampleSource for F
where
    F: FnMut(&mut [f32]) -> usize,
{
    fn read(&mut self, out: &mut [f32]) -> usize {
        self(out)
    }
}

/// Reads sequentially from a borrowed slice.
#[derive(Debug, Clone)]
pub struct SliceSource<'a, T> {
    samples: &'a [T],
    position: usize,
}

impl<'a, T> SliceSource<'a, T> {
    pub fn new(samples: &'a [T]) -> Self {
        SliceSource { samples, position: 0 }
    }

    fn take(&mut self, len: usize) -> &'a [T] {
        let start = self.position.min(self.samples.len());
        let end = (start + len).min(self.samples.len());
        self.position = end;
        &self.samples[start..end]
    }
}

impl SampleSource for SliceSource<'_, f32> {
    fn read(&mut self, out: &mut [f32]) -> usize {
        let chunk = self.take(out.len());
        out[..chunk.len()].copy_from_slice(chunk);
        chunk.len()
    }
}

impl SampleSource for SliceSource<'_, f64> {
    fn read(&mut self, out: &mut [f32]) -> usize {
        let chunk = self.take(out.len());
        for (o, &s) in out.iter_mut().zip(chunk) {
            *o = s as f32;
        }
        chunk.len()
    }
}

/// A source with nothing in it. As the secondary input it selects
/// single-signal analysis.
#[derive(Debug, Clone, Copy, Default)]
pub struct Silence;

impl SampleSource for Silence {
    fn read(&mut self, _out: &mut [f32]) -> usize {
        0
    }
}

/// Summary of one [`Analyser::analyse`] run.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct AnalyserOutput {
    /// Windows analysed.
    pub windows: usize,
    /// Mean absolute spectral distance, scaled by [`DIFFERENCE_SCALE`].
    /// Zero unless a secondary signal was supplied.
    pub difference: f64,
}

/// Windowed FFT analyser. All buffers are sized once at construction and
/// reused by every [`analyse`](Analyser::analyse) call.
pub struct Analyser {
    window_length: usize,
    hop_length: usize,

    fft: Arc<dyn Fft<f32>>,
    scratch: Vec<Complex<f32>>,
    hann: Vec<f32>,

    buffer_a: Vec<f32>,
    buffer_b: Vec<f32>,
    spectrum_a: Vec<Complex<f32>>,
    spectrum_b: Vec<Complex<f32>>,
    bins: Vec<f32>,
}

impl fmt::Debug for Analyser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Analyser")
            .field("window_length", &self.window_length)
            .field("hop_length", &self.hop_length)
            .finish_non_exhaustive()
    }
}

impl Analyser {
    /// `window_length` must be a power of two and `overlaps` must divide it.
    pub fn new(window_length: usize, overlaps: usize) -> Result<Self, SynthError> {
        Self::from_config(&AnalyserConfig { window_length, overlaps })
    }

    pub fn from_config(config: &AnalyserConfig) -> Result<Self, SynthError> {
        config.validate()?;

        let n = config.window_length;
        let fft = FftPlanner::<f32>::new().plan_fft_forward(n);
        let scratch = vec![Complex::new(0.0, 0.0); fft.get_inplace_scratch_len()];
        let hann = (0..n)
            .map(|i| 0.5 * (1.0 - (TAU * i as f32 / n as f32).cos()))
            .collect();

        log::debug!(
            "Analyser: window {} samples, hop {} samples, {} bins",
            n,
            config.hop_length(),
            n / 2
        );

        Ok(Analyser {
            window_length: n,
            hop_length: config.hop_length(),
            fft,
            scratch,
            hann,
            buffer_a: vec![0.0; n],
            buffer_b: vec![0.0; n],
            spectrum_a: vec![Complex::new(0.0, 0.0); n],
            spectrum_b: vec![Complex::new(0.0, 0.0); n],
            bins: vec![0.0; n / 2],
        })
    }

    pub fn window_length(&self) -> usize {
        self.window_length
    }

    pub fn hop_length(&self) -> usize {
        self.hop_length
    }

    /// Bins per window handed to the callback (`window_length / 2`).
    pub fn bin_count(&self) -> usize {
        self.window_length / 2
    }

    /// Analyse `primary`, optionally against `secondary`.
    ///
    /// The secondary input counts as present when its first read returns
    /// any samples; pass [`Silence`] to analyse a single signal. For every
    /// window, `on_window(index, window_length, bins)` receives either the
    /// normalized magnitude spectrum or, with two inputs, the per-bin
    /// absolute difference of both magnitude spectra. `index` counts from 0,
    /// so the last window of a run is `windows - 1` and an index doubles as
    /// a plot row.
    ///
    /// Analysis continues past the end of the input until the last samples
    /// have scrolled out of the window, so the tail is seen at every
    /// overlap position. Inputs of different lengths are zero-padded.
    pub fn analyse<A, B, F>(&mut self, mut primary: A, mut secondary: B, mut on_window: F) -> AnalyserOutput
    where
        A: SampleSource,
        B: SampleSource,
        F: FnMut(usize, usize, &[f32]),
    {
        let n = self.window_length;
        let hop = self.hop_length;
        let retained = n - hop;
        let normalization = (n / 2) as f32;

        self.buffer_a.fill(0.0);
        self.buffer_b.fill(0.0);

        let mut primary_open = true;
        let mut secondary_open = true;
        let mut dual: Option<bool> = None;

        let mut output = AnalyserOutput::default();
        let mut diff_sum: i64 = 0;
        let mut diff_count: i64 = 0;

        loop {
            read_hop(&mut primary, &mut primary_open, &mut self.buffer_a[retained..]);
            let read_b = read_hop(&mut secondary, &mut secondary_open, &mut self.buffer_b[retained..]);
            let dual = *dual.get_or_insert(read_b > 0);

            window_into(&self.buffer_a, &self.hann, &mut self.spectrum_a);
            self.fft.process_with_scratch(&mut self.spectrum_a, &mut self.scratch);

            if dual {
                window_into(&self.buffer_b, &self.hann, &mut self.spectrum_b);
                self.fft.process_with_scratch(&mut self.spectrum_b, &mut self.scratch);

                for ((bin, a), b) in self.bins.iter_mut().zip(&self.spectrum_a).zip(&self.spectrum_b) {
                    let distance = (a.norm() / normalization - b.norm() / normalization).abs();
                    *bin = distance;
                    diff_sum += (distance * DIFFERENCE_SCALE).round() as i64;
                    diff_count += 1;
                }
            } else {
                for (bin, a) in self.bins.iter_mut().zip(&self.spectrum_a) {
                    *bin = a.norm() / normalization;
                }
            }

            on_window(output.windows, n, &self.bins);
            output.windows += 1;

            self.buffer_a.copy_within(hop.., 0);
            if dual {
                self.buffer_b.copy_within(hop.., 0);
            }

            let inputs_ended = !primary_open && (!dual || !secondary_open);
            let drained = is_silent(&self.buffer_a[..retained])
                && (!dual || is_silent(&self.buffer_b[..retained]));

            if inputs_ended && drained {
                break;
            }
        }

        if diff_count != 0 {
            output.difference = diff_sum as f64 / diff_count as f64;
        }

        log::debug!(
            "Analysed {} windows ({} mode), difference {:.3}",
            output.windows,
            if dual == Some(true) { "dual" } else { "single" },
            output.difference
        );

        output
    }
}

/// Read one hop into `hop`, zero-padding a short read. A source that came
/// up short is closed and never polled again.
fn read_hop<S: SampleSource>(source: &mut S, open: &mut bool, hop: &mut [f32]) -> usize {
    let read = if *open { source.read(hop).min(hop.len()) } else { 0 };
    if read < hop.len() {
        *open = false;
        hop[read..].fill(0.0);
    }
    read
}

fn window_into(buffer: &[f32], hann: &[f32], spectrum: &mut [Complex<f32>]) {
    for ((out, &x), &w) in spectrum.iter_mut().zip(buffer).zip(hann) {
        *out = Complex::new(x * w, 0.0);
    }
}

fn is_silent(samples: &[f32]) -> bool {
    samples.iter().all(|&s| s == 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f64::consts::PI;

    fn sine(freq: f64, sample_rate: f64, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| (2.0 * PI * freq * i as f64 / sample_rate).sin() as f32)
            .collect()
    }

    fn peak_bin(bins: &[f32]) -> usize {
        bins.iter()
            .enumerate()
            .fold((0, f32::MIN), |best, (i, &m)| if m > best.1 { (i, m) } else { best })
            .0
    }

    #[test]
    fn rejects_invalid_windows() {
        assert!(Analyser::new(1000, 4).is_err());
        assert!(Analyser::new(1024, 0).is_err());
        assert!(Analyser::new(1024, 3).is_err());
        let analyser = Analyser::new(1024, 8).unwrap();
        assert_eq!(analyser.hop_length(), 128);
        assert_eq!(analyser.bin_count(), 512);
    }

    #[test]
    fn bin_centred_sine_peaks_at_its_bin() {
        let n = 1024;
        let fs = 44100.0;
        for k in [5usize, 20, 100, 300] {
            let signal = sine(k as f64 * fs / n as f64, fs, 44100);
            let mut analyser = Analyser::new(n, 8).unwrap();
            let mut checked = 0;

            analyser.analyse(SliceSource::new(&signal), Silence, |index, len, bins| {
                assert_eq!(len, n);
                assert_eq!(bins.len(), n / 2);
                // Fully populated windows only
                if index >= 8 && (index + 1) * 128 <= signal.len() {
                    let peak = peak_bin(bins);
                    assert!(peak.abs_diff(k) <= 1, "bin {k}: peak at {peak}");
                    // Hann coherent gain of 0.5 on a unit sine
                    assert!((bins[k] - 0.5).abs() < 0.01, "bin {k}: magnitude {}", bins[k]);
                    checked += 1;
                }
            });
            assert!(checked > 300);
        }
    }

    #[test]
    fn identical_inputs_have_no_difference() {
        let signal = sine(440.0, 44100.0, 22050);
        let mut analyser = Analyser::new(2048, 4).unwrap();
        let output = analyser.analyse(
            SliceSource::new(&signal),
            SliceSource::new(&signal),
            |_, _, bins| assert!(bins.iter().all(|&d| d == 0.0)),
        );
        assert!(output.windows > 0);
        assert_eq!(output.difference, 0.0);
    }

    #[test]
    fn silent_reference_measures_mean_magnitude() {
        let signal = sine(1000.0, 44100.0, 8192);
        let silent = vec![0.0f32; signal.len()];
        let mut analyser = Analyser::new(512, 4).unwrap();

        let mut scaled_sum = 0i64;
        let mut bins_seen = 0i64;
        let single = analyser.analyse(SliceSource::new(&signal), Silence, |_, _, bins| {
            for &m in bins {
                scaled_sum += (m * DIFFERENCE_SCALE).round() as i64;
                bins_seen += 1;
            }
        });
        assert_eq!(single.difference, 0.0);

        let dual = analyser.analyse(SliceSource::new(&signal), SliceSource::new(&silent), |_, _, _| {});
        assert_eq!(dual.windows, single.windows);
        assert_eq!(dual.difference, scaled_sum as f64 / bins_seen as f64);
        assert!(dual.difference > 0.0);
    }

    #[test]
    fn larger_gain_change_differs_more() {
        let reference = sine(500.0, 44100.0, 8192);
        let slightly: Vec<f32> = reference.iter().map(|s| s * 0.9).collect();
        let halved: Vec<f32> = reference.iter().map(|s| s * 0.5).collect();
        let mut analyser = Analyser::new(1024, 2).unwrap();

        let near = analyser.analyse(SliceSource::new(&slightly), SliceSource::new(&reference), |_, _, _| {});
        let far = analyser.analyse(SliceSource::new(&halved), SliceSource::new(&reference), |_, _, _| {});
        assert!(near.difference < far.difference);
    }

    #[test]
    fn tail_scrolls_through_every_overlap() {
        // 8 samples, window 8, hop 4: [0000 1111], [1111 1111], [1111 0000]
        let signal = [1.0f32; 8];
        let mut analyser = Analyser::new(8, 2).unwrap();
        let output = analyser.analyse(SliceSource::new(&signal), Silence, |_, _, _| {});
        assert_eq!(output.windows, 3);
    }

    #[test]
    fn leading_silence_does_not_end_the_run() {
        let mut signal = vec![0.0f32; 4096];
        signal.extend(sine(2000.0, 44100.0, 4096));
        let mut analyser = Analyser::new(1024, 8).unwrap();

        let mut loudest = 0.0f32;
        let output = analyser.analyse(SliceSource::new(&signal), Silence, |_, _, bins| {
            loudest = loudest.max(bins.iter().cloned().fold(0.0, f32::max));
        });
        assert!(output.windows >= 64, "only {} windows", output.windows);
        assert!(loudest > 0.3);
    }

    #[test]
    fn exhausted_source_is_not_polled_again() {
        let mut calls = 0;
        let mut remaining = 300usize;
        let source = |out: &mut [f32]| {
            calls += 1;
            let n = remaining.min(out.len());
            out[..n].fill(0.25);
            remaining -= n;
            n
        };
        let mut analyser = Analyser::new(256, 2).unwrap();
        let output = analyser.analyse(source, Silence, |_, _, _| {});
        // Reads of 128, 128, 44 (short) and nothing after that
        assert_eq!(calls, 3);
        assert_eq!(output.windows, 4);
    }

    #[test]
    fn window_indices_count_from_zero() {
        let signal: Vec<f32> = (0..2000).map(|i| (i as f32 * 0.2).sin()).collect();
        let mut analyser = Analyser::new(512, 4).unwrap();
        let mut indices = Vec::new();
        let output = analyser.analyse(SliceSource::new(&signal), Silence, |index, _, _| indices.push(index));
        assert_eq!(indices, (0..output.windows).collect::<Vec<_>>());
    }

    #[test]
    fn f64_slices_read_like_f32() {
        let wide: Vec<f64> = (0..1000).map(|i| (i as f64 * 0.01).sin()).collect();
        let narrow: Vec<f32> = wide.iter().map(|&s| s as f32).collect();
        let mut analyser = Analyser::new(256, 4).unwrap();
        let output = analyser.analyse(SliceSource::new(&wide), SliceSource::new(&narrow), |_, _, _| {});
        assert_eq!(output.difference, 0.0);
    }

    #[test]
    fn analyser_is_reusable() {
        let signal = sine(3000.0, 44100.0, 5000);
        let mut analyser = Analyser::new(512, 8).unwrap();
        let mut first = Vec::new();
        let a = analyser.analyse(SliceSource::new(&signal), Silence, |_, _, bins| first.push(bins.to_vec()));
        let mut second = Vec::new();
        let b = analyser.analyse(SliceSource::new(&signal), Silence, |_, _, bins| second.push(bins.to_vec()));
        assert_eq!(a, b);
        assert_eq!(first, second);
    }
}
