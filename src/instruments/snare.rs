use serde::{Deserialize, Serialize};

use crate::dsp::filter::{FilterChain, FilterStage, FilterType};
use crate::dsp::math::{exponential_easing, semitone_detune};
use crate::dsp::{AdEnvelope, NoiseGenerator, Oscillator};
use crate::tuner::Tunable;

const ATTACK_MS: f64 = 2.0;
const NOISE_CORNER: f64 = 2200.0;
const NOISE_CORNER_DETUNE: f64 = 3.5;

/// Snare drum: a falling sine under band-limited noise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnareSettings {
    /// Total length of both envelopes, in milliseconds.
    pub length: f64,
    pub frequency_a: f64,
    pub frequency_b: f64,
    pub oscillator_gain: f64,
    pub noise_gain: f64,
}

impl Default for SnareSettings {
    fn default() -> Self {
        SnareSettings {
            length: 150.0,
            frequency_a: 320.0,
            frequency_b: 190.0,
            oscillator_gain: 0.7,
            noise_gain: 0.9,
        }
    }
}

impl SnareSettings {
    pub fn render(&self, sampling_frequency: f64) -> Vec<f64> {
        let fs = sampling_frequency.max(1.0);
        let decay_ms = self.length - ATTACK_MS;

        let envelope_oscillator = AdEnvelope::new(fs, ATTACK_MS, decay_ms, 0.0, 0.0);
        let envelope_noise = AdEnvelope::new(fs, ATTACK_MS, decay_ms, 0.0, 0.0);

        let mut oscillator = Oscillator::new(fs, self.frequency_a, self.frequency_b, 0.0, 0.0, self.length);
        let mut noise = NoiseGenerator::default();

        let corner = NOISE_CORNER * semitone_detune(NOISE_CORNER_DETUNE);
        let mut noise_band = FilterChain::new(
            fs,
            &[
                FilterStage::two_poles(FilterType::Highpass, corner, 0.75),
                FilterStage::two_poles(FilterType::Lowpass, 16000.0, 0.5),
                FilterStage::one_pole(FilterType::Lowpass, corner),
            ],
        );

        let len = envelope_oscillator.total_samples().max(envelope_noise.total_samples());
        (0..len)
            .map(|x| {
                let e_o = envelope_oscillator.get(x, |t| t, |t| exponential_easing(t, 8.0));
                let e_n = envelope_noise.get(x, |t| t, |t| exponential_easing(t, 9.0));

                let o = oscillator.step();
                let n = noise_band.step(noise.step());

                o * e_o * self.oscillator_gain + n * e_n * self.noise_gain
            })
            .collect()
    }
}

impl Tunable for SnareSettings {
    const BOUNDS: &'static [(f64, f64)] = &[
        (20.0, 1000.0),
        (50.0, 2000.0),
        (50.0, 2000.0),
        (0.0, 2.0),
        (0.0, 2.0),
    ];

    fn parameters(&self) -> Vec<f64> {
        vec![
            self.length,
            self.frequency_a,
            self.frequency_b,
            self.oscillator_gain,
            self.noise_gain,
        ]
    }

    fn with_parameters(&self, values: &[f64]) -> Self {
        SnareSettings {
            length: values[0],
            frequency_a: values[1],
            frequency_b: values[2],
            oscillator_gain: values[3],
            noise_gain: values[4],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn length_matches_envelopes() {
        let out = SnareSettings::default().render(44100.0);
        // 2 ms attack (88 samples) + 148 ms decay (6526 samples)
        assert_eq!(out.len(), 88 + 6526);
        assert!(out.iter().all(|s| s.is_finite()));
    }

    #[test]
    fn layers_are_not_clipped() {
        let settings = SnareSettings { oscillator_gain: 3.0, ..SnareSettings::default() };
        let out = settings.render(44100.0);
        let peak = out.iter().fold(0.0_f64, |m, s| m.max(s.abs()));
        assert!(peak > 1.5, "peak {peak}");
        assert!(peak <= settings.oscillator_gain + settings.noise_gain);
    }

    #[test]
    fn starts_silent_and_fades_out() {
        let out = SnareSettings::default().render(44100.0);
        assert_eq!(out[0], 0.0);
        let head = out[..1000].iter().fold(0.0_f64, |m, s| m.max(s.abs()));
        let tail = out[out.len() - 500..].iter().fold(0.0_f64, |m, s| m.max(s.abs()));
        assert!(head > 0.1);
        assert!(tail < 0.01, "tail {tail}");
    }

    #[test]
    fn longer_snare_renders_longer() {
        let short = SnareSettings::default().render(44100.0);
        let long = SnareSettings { length: 300.0, ..SnareSettings::default() }.render(44100.0);
        assert!(long.len() > short.len() * 19 / 10);
    }
}
