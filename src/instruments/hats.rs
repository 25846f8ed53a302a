//! Metallic instruments: open and closed hi-hat, cymbal.
//!
//! All three start from the same source, six detuned square waves averaged
//! together, and differ in how that source is filtered, distorted and
//! enveloped.

use serde::{Deserialize, Serialize};

use crate::dsp::filter::{FilterChain, FilterStage, FilterType, TwoPolesFilter};
use crate::dsp::math::{distortion, mix, ms_to_samples, normalize};
use crate::dsp::{AdEnvelope, NoiseGenerator, SquareOscillator};
use crate::tuner::Tunable;

use super::finish;

const SQUARE_FREQUENCIES: [f64; 6] = [
    619.0 * 1.38,
    437.0 * 1.12,
    415.0 * 1.67,
    365.0 * 1.16,
    306.0 * 1.28,
    245.0 * 1.43,
];

/// Band-pass applied to the square bank for every metallic sound.
const METALLIC_BAND: [FilterStage; 4] = [
    FilterStage::two_poles(FilterType::Highpass, 6900.0, 3.3),
    FilterStage::one_pole(FilterType::Lowpass, 7800.0),
    FilterStage::one_pole(FilterType::Lowpass, 7950.0),
    FilterStage::one_pole(FilterType::Lowpass, 10000.0),
];

/// Lower band feeding the cymbal's companion voice.
const COMPANION_BAND: [FilterStage; 2] = [
    FilterStage::two_poles(FilterType::Lowpass, 3500.0, 4.0),
    FilterStage::two_poles(FilterType::Highpass, 800.0, 0.75),
];

/// Removes the offset left by asymmetric distortion.
const ASYMMETRY_HIGHPASS: FilterStage = FilterStage::two_poles(FilterType::Highpass, 8400.0, 0.75);
const COMPANION_LOWPASS: FilterStage = FilterStage::two_poles(FilterType::Lowpass, 3500.0, 4.0);
const AIR_LOWPASS: FilterStage = FilterStage::two_poles(FilterType::Lowpass, 14000.0, 0.25);
const AIR_LOWPASS_WET: f64 = 0.75;

const HAT_ATTACK_SAMPLES: usize = 10;
const CYMBAL_ATTACK_SAMPLES: usize = 80;
const COMPANION_MIX: f64 = 0.04;

const ATTACK_SHAPE: f64 = 0.01;
const LONG_DECAY_SHAPE: f64 = 2.5;
const SHORT_DECAY_SHAPE: f64 = 9.0;

fn two_poles(sampling_frequency: f64, stage: FilterStage) -> TwoPolesFilter {
    TwoPolesFilter::new(sampling_frequency, stage.filter_type, stage.cutoff, stage.q)
}

struct SquareBank {
    oscillators: [SquareOscillator; 6],
}

impl SquareBank {
    fn new(sampling_frequency: f64) -> Self {
        SquareBank {
            oscillators: SQUARE_FREQUENCIES.map(|f| SquareOscillator::new(sampling_frequency, f)),
        }
    }

    fn step(&mut self) -> f64 {
        self.oscillators.iter_mut().map(SquareOscillator::step).sum::<f64>() / 6.0
    }
}

/// Open or closed hi-hat.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HatSettings {
    /// Decay of the ringing envelope, in milliseconds.
    pub long_length: f64,
    /// Decay of the transient envelope, in milliseconds.
    pub short_length: f64,
    pub long_gain: f64,
    pub short_gain: f64,
    pub distortion: f64,
    /// Negative-half distortion ratio; 1.0 is symmetric.
    pub distortion_symmetry: f64,
    pub noise_gain: f64,
}

impl HatSettings {
    pub fn default_open() -> Self {
        HatSettings {
            long_length: 1500.0,
            short_length: 500.0,
            long_gain: 1.0,
            short_gain: 0.8,
            distortion: 6.0,
            distortion_symmetry: 0.125,
            noise_gain: 0.02,
        }
    }

    pub fn default_closed() -> Self {
        HatSettings {
            long_length: 0.0,
            short_length: 150.0,
            long_gain: 0.0,
            short_gain: 1.0,
            ..Self::default_open()
        }
    }

    pub fn render(&self, sampling_frequency: f64) -> Vec<f64> {
        let fs = sampling_frequency.max(1.0);

        let mut envelope_long = AdEnvelope::from_samples(
            HAT_ATTACK_SAMPLES,
            ms_to_samples(fs, self.long_length),
            ATTACK_SHAPE,
            LONG_DECAY_SHAPE,
        );
        let mut envelope_short = AdEnvelope::from_samples(
            HAT_ATTACK_SAMPLES,
            ms_to_samples(fs, self.short_length),
            ATTACK_SHAPE,
            SHORT_DECAY_SHAPE,
        );
        let len = envelope_long.total_samples().max(envelope_short.total_samples());

        let mut squares = SquareBank::new(fs);
        let mut band = FilterChain::new(fs, &METALLIC_BAND);
        let mut output: Vec<f64> = (0..len).map(|_| band.step(squares.step())).collect();

        // Distortion depends on level
        normalize(&mut output);

        let mut noise = NoiseGenerator::default();
        let mut hp = two_poles(fs, ASYMMETRY_HIGHPASS);
        let mut lp = two_poles(fs, AIR_LOWPASS);

        for sample in output.iter_mut() {
            let e_long = envelope_long.step();
            let e_short = envelope_short.step();

            let mut signal = distortion(*sample, -self.distortion, self.distortion_symmetry);
            signal = hp.step(signal);
            signal *= e_long * self.long_gain + e_short * self.short_gain;
            signal += noise.step() * (self.noise_gain * e_short * self.short_gain);
            signal = mix(signal, lp.step(signal), AIR_LOWPASS_WET);

            *sample = signal;
        }

        finish(&mut output);
        output
    }
}

impl Tunable for HatSettings {
    const BOUNDS: &'static [(f64, f64)] = &[
        (0.0, 4000.0),
        (10.0, 2000.0),
        (0.0, 2.0),
        (0.0, 2.0),
        (0.1, 24.0),
        (0.01, 1.0),
        (0.0, 0.5),
    ];

    fn parameters(&self) -> Vec<f64> {
        vec![
            self.long_length,
            self.short_length,
            self.long_gain,
            self.short_gain,
            self.distortion,
            self.distortion_symmetry,
            self.noise_gain,
        ]
    }

    fn with_parameters(&self, values: &[f64]) -> Self {
        HatSettings {
            long_length: values[0],
            short_length: values[1],
            long_gain: values[2],
            short_gain: values[3],
            distortion: values[4],
            distortion_symmetry: values[5],
            noise_gain: values[6],
        }
    }
}

/// Cymbal: the hat source plus a lower, separately enveloped companion band.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CymbalSettings {
    pub long_length: f64,
    pub short_length: f64,
    pub companion_length: f64,
    pub long_gain: f64,
    pub short_gain: f64,
    pub companion_gain: f64,
    pub distortion: f64,
    pub distortion_symmetry: f64,
    pub noise_gain: f64,
}

impl Default for CymbalSettings {
    fn default() -> Self {
        CymbalSettings {
            long_length: 1000.0,
            short_length: 200.0,
            companion_length: 1600.0,
            long_gain: 0.17,
            short_gain: 0.8,
            companion_gain: 0.17,
            distortion: 6.0,
            distortion_symmetry: 0.125,
            noise_gain: 0.02,
        }
    }
}

impl CymbalSettings {
    pub fn render(&self, sampling_frequency: f64) -> Vec<f64> {
        let fs = sampling_frequency.max(1.0);
        let envelope = |length_ms: f64, decay_shape: f64| {
            AdEnvelope::from_samples(
                CYMBAL_ATTACK_SAMPLES,
                ms_to_samples(fs, length_ms),
                ATTACK_SHAPE,
                decay_shape,
            )
        };

        let mut envelope_long = envelope(self.long_length, LONG_DECAY_SHAPE);
        let mut envelope_short = envelope(self.short_length, SHORT_DECAY_SHAPE);
        let mut envelope_companion = envelope(self.companion_length, LONG_DECAY_SHAPE);
        let len = envelope_long
            .total_samples()
            .max(envelope_short.total_samples())
            .max(envelope_companion.total_samples());

        let mut squares = SquareBank::new(fs);
        let mut band = FilterChain::new(fs, &METALLIC_BAND);
        let mut companion_band = FilterChain::new(fs, &COMPANION_BAND);

        let (mut output, mut companion): (Vec<f64>, Vec<f64>) = (0..len)
            .map(|_| {
                let signal = squares.step();
                (band.step(signal), companion_band.step(signal))
            })
            .unzip();

        normalize(&mut output);
        normalize(&mut companion);

        let mut noise = NoiseGenerator::default();
        let mut hp = two_poles(fs, ASYMMETRY_HIGHPASS);
        let mut companion_lp = two_poles(fs, COMPANION_LOWPASS);
        let mut lp = two_poles(fs, AIR_LOWPASS);

        for (sample, &companion_sample) in output.iter_mut().zip(&companion) {
            let e_long = envelope_long.step();
            let e_companion = envelope_companion.step();
            let e_short = envelope_short.step();

            let mut main = distortion(*sample, -self.distortion, self.distortion_symmetry);
            main = hp.step(main);
            main *= e_long * self.long_gain + e_short * self.short_gain;

            let mut side = distortion(companion_sample, -self.distortion, self.distortion_symmetry);
            side = companion_lp.step(side);
            side *= e_companion * self.companion_gain;

            let mut signal = mix(main, side, COMPANION_MIX);
            signal += noise.step() * (self.noise_gain * e_long * self.long_gain);
            signal = mix(signal, lp.step(signal), AIR_LOWPASS_WET);

            *sample = signal;
        }

        finish(&mut output);
        output
    }
}

impl Tunable for CymbalSettings {
    const BOUNDS: &'static [(f64, f64)] = &[
        (10.0, 5000.0),
        (10.0, 2000.0),
        (10.0, 5000.0),
        (0.0, 2.0),
        (0.0, 2.0),
        (0.0, 2.0),
        (0.1, 24.0),
        (0.01, 1.0),
        (0.0, 0.5),
    ];

    fn parameters(&self) -> Vec<f64> {
        vec![
            self.long_length,
            self.short_length,
            self.companion_length,
            self.long_gain,
            self.short_gain,
            self.companion_gain,
            self.distortion,
            self.distortion_symmetry,
            self.noise_gain,
        ]
    }

    fn with_parameters(&self, values: &[f64]) -> Self {
        CymbalSettings {
            long_length: values[0],
            short_length: values[1],
            companion_length: values[2],
            long_gain: values[3],
            short_gain: values[4],
            companion_gain: values[5],
            distortion: values[6],
            distortion_symmetry: values[7],
            noise_gain: values[8],
        }
    }
}
