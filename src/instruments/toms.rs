use std::f64::consts::FRAC_PI_2;

use serde::{Deserialize, Serialize};

use crate::dsp::{AdEnvelope, NoiseGenerator, OnePoleFilter, Oscillator};
use crate::tuner::Tunable;

use super::finish;

/// Click lengths at 44.1 kHz, scaled with the sampling frequency.
const CLICK_ATTACK_SAMPLES: f64 = 10.0;
const CLICK_DECAY_SAMPLES: f64 = 40.0;
const CLICK_REFERENCE_RATE: f64 = 44100.0;

const NOISE_CUTOFF: f64 = 700.0;

/// Pitch sweep curve of the body. Positive holds the starting pitch before
/// gliding down.
const SWEEP_SHAPE: f64 = 8.0;

/// High or low tom.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TomSettings {
    /// Decay of the body and length of its pitch sweep, in milliseconds.
    pub oscillator_length: f64,
    pub noise_length: f64,
    pub oscillator_gain: f64,
    pub noise_gain: f64,
    pub click_gain: f64,
    /// Pitch at the start of the sweep.
    pub frequency_a: f64,
    /// Pitch the sweep settles on.
    pub frequency_b: f64,
    pub feedback: f64,
}

impl TomSettings {
    pub fn default_high() -> Self {
        TomSettings {
            oscillator_length: 280.0,
            noise_length: 60.0,
            oscillator_gain: 1.0,
            noise_gain: 0.16,
            click_gain: 0.65,
            frequency_a: 200.0,
            frequency_b: 190.0,
            feedback: 0.2,
        }
    }

    pub fn default_low() -> Self {
        TomSettings {
            oscillator_length: 430.0,
            noise_length: 60.0,
            oscillator_gain: 1.0,
            noise_gain: 0.16,
            click_gain: 1.0,
            frequency_a: 180.0,
            frequency_b: 118.0,
            feedback: 0.15,
        }
    }

    pub fn render(&self, sampling_frequency: f64) -> Vec<f64> {
        let fs = sampling_frequency.max(1.0);

        let mut envelope_oscillator = AdEnvelope::new(fs, 0.0, self.oscillator_length, 0.01, 8.0);
        let mut envelope_noise = AdEnvelope::new(fs, 0.0, self.noise_length, 0.01, 4.0);
        let mut oscillator = self.body_oscillator(fs);
        let mut noise = NoiseGenerator::default();
        let mut lp = OnePoleFilter::lowpass(fs, NOISE_CUTOFF);

        let rate_ratio = fs / CLICK_REFERENCE_RATE;
        let click_attack = ((CLICK_ATTACK_SAMPLES * rate_ratio) as usize).max(1);
        let click_decay = ((CLICK_DECAY_SAMPLES * rate_ratio) as usize).max(1);
        let click_len = click_attack + click_decay;
        let body_len = envelope_oscillator.total_samples().max(envelope_noise.total_samples());

        let mut output = Vec::with_capacity(click_len + body_len);
        for i in 0..click_len {
            let signal = click_shape(i, click_attack, click_decay);
            output.push(-signal * self.click_gain);
        }

        for _ in 0..body_len {
            let e_o = envelope_oscillator.step();
            let e_n = envelope_noise.step();
            let o = oscillator.step();
            let n = lp.step(noise.step());
            output.push(o * e_o * self.oscillator_gain + n * e_n * self.noise_gain);
        }

        finish(&mut output);
        output
    }

    fn body_oscillator(&self, fs: f64) -> Oscillator {
        Oscillator::with_shape(
            fs,
            self.frequency_a,
            self.frequency_b,
            self.feedback,
            0.0,
            self.oscillator_length,
            SWEEP_SHAPE,
        )
    }
}

/// Sine-shaped rise, then a fall blended from an exponential into a sine
/// quarter.
fn click_shape(i: usize, attack: usize, decay: usize) -> f64 {
    const RISE: f64 = 0.5;
    const FALL: f64 = -3.0;

    if i < attack {
        let t = i as f64 / attack as f64;
        (t * FRAC_PI_2).sin().powf(RISE)
    } else {
        let t = 1.0 - (i - attack) as f64 / decay as f64;
        let exponential = (2.0_f64.powf(FALL * t) - 1.0) / (2.0_f64.powf(FALL) - 1.0);
        exponential * (1.0 - t) + (t * FRAC_PI_2).sin() * t
    }
}

impl Tunable for TomSettings {
    const BOUNDS: &'static [(f64, f64)] = &[
        (20.0, 3000.0),
        (5.0, 1000.0),
        (0.0, 2.0),
        (0.0, 1.0),
        (0.0, 2.0),
        (20.0, 2000.0),
        (20.0, 2000.0),
        (0.0, 1.0),
    ];

    fn parameters(&self) -> Vec<f64> {
        vec![
            self.oscillator_length,
            self.noise_length,
            self.oscillator_gain,
            self.noise_gain,
            self.click_gain,
            self.frequency_a,
            self.frequency_b,
            self.feedback,
        ]
    }

    fn with_parameters(&self, values: &[f64]) -> Self {
        TomSettings {
            oscillator_length: values[0],
            noise_length: values[1],
            oscillator_gain: values[2],
            noise_gain: values[3],
            click_gain: values[4],
            frequency_a: values[5],
            frequency_b: values[6],
            feedback: values[7],
        }
    }
}
