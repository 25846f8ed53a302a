use serde::{Deserialize, Serialize};

use crate::dsp::{AdEnvelope, Oscillator};
use crate::tuner::Tunable;

/// The click is a fixed number of samples regardless of rate.
const CLICK_ATTACK_SAMPLES: usize = 49;
const CLICK_DECAY_SAMPLES: usize = 64;

const BODY_DECAY_SHAPE: f64 = 8.0;

/// Kick drum: a short shaped click followed by two sine bodies.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KickSettings {
    pub click_gain: f64,
    /// Decay of the low body, in milliseconds.
    pub body_length: f64,
    pub body_frequency: f64,
    pub body_gain: f64,
    /// Decay of the upper body, in milliseconds.
    pub punch_length: f64,
    pub punch_frequency: f64,
    pub punch_feedback: f64,
    pub punch_gain: f64,
}

impl Default for KickSettings {
    fn default() -> Self {
        KickSettings {
            click_gain: 1.0,
            body_length: 300.0,
            body_frequency: 60.0,
            body_gain: 0.8,
            punch_length: 70.0,
            punch_frequency: 120.0,
            punch_feedback: 0.1,
            punch_gain: 0.4,
        }
    }
}

impl KickSettings {
    pub fn render(&self, sampling_frequency: f64) -> Vec<f64> {
        let fs = sampling_frequency.max(1.0);

        let click = AdEnvelope::from_samples(CLICK_ATTACK_SAMPLES, CLICK_DECAY_SAMPLES, 0.0, 0.0);
        let mut body_envelope = AdEnvelope::new(fs, 0.0, self.body_length, 0.0, BODY_DECAY_SHAPE);
        let mut punch_envelope = AdEnvelope::new(fs, 0.0, self.punch_length, 0.0, BODY_DECAY_SHAPE);

        let mut body = Oscillator::new(
            fs,
            self.body_frequency,
            self.body_frequency,
            0.0,
            0.0,
            self.body_length,
        );
        let mut punch = Oscillator::new(
            fs,
            self.punch_frequency,
            self.punch_frequency,
            self.punch_feedback,
            self.punch_feedback,
            self.punch_length,
        );

        let body_len = body_envelope.total_samples().max(punch_envelope.total_samples());
        let mut output = Vec::with_capacity(click.total_samples() + body_len);

        // Click: sharp rise, decay curve that steepens towards its end
        for x in 0..click.total_samples() {
            let signal = click.get(
                x,
                |t| t.powf(0.7),
                |t| t.powf(1.14 + (2.35 - 1.14) * t.powi(3)),
            );
            output.push(-signal * self.click_gain);
        }

        for _ in 0..body_len {
            let e_body = body_envelope.step();
            let e_punch = punch_envelope.step();
            output.push(body.step() * e_body * self.body_gain + punch.step() * e_punch * self.punch_gain);
        }

        output
    }
}

impl Tunable for KickSettings {
    const BOUNDS: &'static [(f64, f64)] = &[
        (0.0, 2.0),
        (20.0, 2000.0),
        (20.0, 400.0),
        (0.0, 2.0),
        (10.0, 1000.0),
        (20.0, 800.0),
        (0.0, 1.0),
        (0.0, 2.0),
    ];

    fn parameters(&self) -> Vec<f64> {
        vec![
            self.click_gain,
            self.body_length,
            self.body_frequency,
            self.body_gain,
            self.punch_length,
            self.punch_frequency,
            self.punch_feedback,
            self.punch_gain,
        ]
    }

    fn with_parameters(&self, values: &[f64]) -> Self {
        KickSettings {
            click_gain: values[0],
            body_length: values[1],
            body_frequency: values[2],
            body_gain: values[3],
            punch_length: values[4],
            punch_frequency: values[5],
            punch_feedback: values[6],
            punch_gain: values[7],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn click_then_body() {
        let out = KickSettings::default().render(44100.0);
        let click_len = CLICK_ATTACK_SAMPLES + CLICK_DECAY_SAMPLES;
        // 300 ms body decay plus its one-sample attack
        assert_eq!(out.len(), click_len + 13231);

        // The click is a negative pulse peaking at the end of its attack
        assert_eq!(out[0], 0.0);
        assert!(out[..click_len].iter().all(|&s| s <= 0.0));
        assert!((out[CLICK_ATTACK_SAMPLES] + 1.0).abs() < 1e-12);
    }

    #[test]
    fn body_stays_in_range() {
        let settings = KickSettings::default();
        let out = settings.render(48000.0);
        let limit = settings.body_gain + settings.punch_gain;
        assert!(out.iter().all(|s| s.is_finite() && s.abs() <= limit));
        // Body decays to silence
        assert!(out[out.len() - 10..].iter().all(|s| s.abs() < 1e-3));
    }

    #[test]
    fn body_is_not_clipped() {
        let settings = KickSettings { body_gain: 2.0, ..KickSettings::default() };
        let out = settings.render(44100.0);
        let click_len = CLICK_ATTACK_SAMPLES + CLICK_DECAY_SAMPLES;
        let peak = out[click_len..].iter().fold(0.0_f64, |m, s| m.max(s.abs()));
        assert!(peak > 1.5, "peak {peak}");
    }

    #[test]
    fn click_gain_scales_click_only() {
        let loud = KickSettings::default().render(44100.0);
        let quiet = KickSettings { click_gain: 0.5, ..KickSettings::default() }.render(44100.0);
        let click_len = CLICK_ATTACK_SAMPLES + CLICK_DECAY_SAMPLES;
        for i in 0..click_len {
            assert!((loud[i] * 0.5 - quiet[i]).abs() < 1e-12);
        }
        assert_eq!(loud[click_len..], quiet[click_len..]);
    }
}
