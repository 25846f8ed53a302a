//! Phase-accumulator oscillators: naive square, swept sine with feedback,
//! and white noise.

use std::f64::consts::{FRAC_PI_2, PI, TAU};

use super::math::{clamp, exponential_easing, mix, ms_to_samples};
use super::rng::Rng;

/// Default sweep curve: a fast start that settles into the target.
pub const DEFAULT_SWEEP_SHAPE: f64 = -8.0;

#[inline]
fn phase_delta(sampling_frequency: f64, frequency: f64) -> f64 {
    (frequency.max(1.0) / sampling_frequency.max(1.0)) * TAU
}

/// Square wave without any band-limiting. The aliasing is part of the
/// metallic hat sound.
#[derive(Debug, Clone)]
pub struct SquareOscillator {
    phase: f64,
    phase_delta: f64,
}

impl SquareOscillator {
    pub fn new(sampling_frequency: f64, frequency: f64) -> Self {
        Self::with_phase(sampling_frequency, frequency, 0.0)
    }

    /// Start at `phase` radians instead of zero.
    pub fn with_phase(sampling_frequency: f64, frequency: f64, phase: f64) -> Self {
        SquareOscillator {
            phase: phase.rem_euclid(TAU),
            phase_delta: phase_delta(sampling_frequency, frequency),
        }
    }

    pub fn step(&mut self) -> f64 {
        self.phase = (self.phase + self.phase_delta) % TAU;
        if self.phase > PI { -1.0 } else { 1.0 }
    }
}

/// Sine oscillator that sweeps between two frequencies and two feedback
/// levels, feeding its own output back into its phase.
///
/// A feedback level of 1.0 is the largest stable modulation index.
#[derive(Debug, Clone)]
pub struct Oscillator {
    phase: f64,
    phase_delta_a: f64,
    phase_delta_b: f64,

    sweep: f64,
    sweep_delta: f64,
    sweep_shape: f64,

    feedback: f64,
    feedback_level_a: f64,
    feedback_level_b: f64,
}

impl Oscillator {
    /// Plain sine at `frequency`, no sweep and no feedback.
    pub fn sine(sampling_frequency: f64, frequency: f64) -> Self {
        Self::new(sampling_frequency, frequency, frequency, 0.0, 0.0, 0.0)
    }

    /// Sweep from `frequency_a`/`feedback_a` to `frequency_b`/`feedback_b`
    /// over `sweep_ms`, using the default sweep curve.
    pub fn new(
        sampling_frequency: f64,
        frequency_a: f64,
        frequency_b: f64,
        feedback_a: f64,
        feedback_b: f64,
        sweep_ms: f64,
    ) -> Self {
        Self::with_shape(
            sampling_frequency,
            frequency_a,
            frequency_b,
            feedback_a,
            feedback_b,
            sweep_ms,
            DEFAULT_SWEEP_SHAPE,
        )
    }

    pub fn with_shape(
        sampling_frequency: f64,
        frequency_a: f64,
        frequency_b: f64,
        feedback_a: f64,
        feedback_b: f64,
        sweep_ms: f64,
        sweep_shape: f64,
    ) -> Self {
        let sampling_frequency = sampling_frequency.max(1.0);

        let sweep_delta = if sweep_ms > 0.0 {
            1.0 / ms_to_samples(sampling_frequency, sweep_ms).max(1) as f64
        } else {
            0.0
        };

        Oscillator {
            phase: 0.0,
            phase_delta_a: phase_delta(sampling_frequency, frequency_a),
            phase_delta_b: phase_delta(sampling_frequency, frequency_b),
            sweep: 0.0,
            sweep_delta,
            sweep_shape,
            feedback: 0.0,
            feedback_level_a: clamp(feedback_a, 0.0, 1.0) / FRAC_PI_2,
            feedback_level_b: clamp(feedback_b, 0.0, 1.0) / FRAC_PI_2,
        }
    }

    /// Next sample, sweeping along the built-in exponential curve.
    pub fn step(&mut self) -> f64 {
        let shape = self.sweep_shape;
        self.step_with(|x| exponential_easing(x, shape))
    }

    /// Next sample, with `curve` mapping the linear sweep position in
    /// `[0, 1]` to the interpolation amount.
    pub fn step_with<F>(&mut self, curve: F) -> f64
    where
        F: Fn(f64) -> f64,
    {
        let sweep = curve(self.sweep);
        let phase_delta = mix(self.phase_delta_a, self.phase_delta_b, sweep);
        let feedback_level = mix(self.feedback_level_a, self.feedback_level_b, sweep);

        self.phase = (self.phase + phase_delta) % TAU;
        self.sweep = (self.sweep + self.sweep_delta).min(1.0);

        let signal = (self.phase + self.feedback).sin();
        self.feedback = (self.feedback + signal) * feedback_level;

        signal
    }

    /// Linear sweep position in `[0, 1]`.
    pub fn sweep_position(&self) -> f64 {
        self.sweep
    }
}

/// Uniform white noise in `[-1, 1)`.
#[derive(Debug, Clone)]
pub struct NoiseGenerator {
    rng: Rng,
}

impl NoiseGenerator {
    pub fn new(seed: u64) -> Self {
        NoiseGenerator { rng: Rng::new(seed) }
    }

    pub fn step(&mut self) -> f64 {
        self.rng.next_f64() * 2.0 - 1.0
    }
}

impl Default for NoiseGenerator {
    fn default() -> Self {
        NoiseGenerator::new(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn zero_crossings(samples: &[f64]) -> usize {
        samples
            .windows(2)
            .filter(|w| (w[0] < 0.0) != (w[1] < 0.0))
            .count()
    }

    #[test]
    fn square_is_bipolar() {
        let mut osc = SquareOscillator::new(44100.0, 440.0);
        for _ in 0..44100 {
            let s = osc.step();
            assert!(s == 1.0 || s == -1.0, "square out of range: {s}");
        }
    }

    #[test]
    fn square_frequency() {
        let mut osc = SquareOscillator::new(44100.0, 100.0);
        let samples: Vec<f64> = (0..44100).map(|_| osc.step()).collect();
        // Two transitions per cycle
        let crossings = zero_crossings(&samples);
        assert!((198..=202).contains(&crossings), "got {crossings} transitions");
    }

    #[test]
    fn square_initial_phase_inverts() {
        let mut a = SquareOscillator::new(44100.0, 100.0);
        let mut b = SquareOscillator::with_phase(44100.0, 100.0, PI);
        let agree = (0..1000).filter(|_| a.step() == b.step()).count();
        assert!(agree < 10, "half-cycle offset should disagree almost everywhere");
    }

    #[test]
    fn sine_stays_in_range_with_full_feedback() {
        let mut osc = Oscillator::new(44100.0, 200.0, 190.0, 1.0, 1.0, 100.0);
        for i in 0..44100 {
            let s = osc.step();
            assert!(s.is_finite() && s.abs() <= 1.0, "sample {i} out of range: {s}");
        }
    }

    #[test]
    fn plain_sine_matches_reference() {
        let mut osc = Oscillator::sine(44100.0, 441.0);
        let delta = 441.0 / 44100.0 * TAU;
        let mut phase = 0.0;
        for _ in 0..1000 {
            phase = (phase + delta) % TAU;
            let expected: f64 = f64::sin(phase);
            assert!((osc.step() - expected).abs() < 1e-9);
        }
    }

    #[test]
    fn sweep_reaches_target_frequency() {
        // 1000 Hz -> 100 Hz over 10 ms, then measure the settled pitch
        let mut osc = Oscillator::new(44100.0, 1000.0, 100.0, 0.0, 0.0, 10.0);
        for _ in 0..442 {
            osc.step();
        }
        assert_eq!(osc.sweep_position(), 1.0);
        let samples: Vec<f64> = (0..44100).map(|_| osc.step()).collect();
        let crossings = zero_crossings(&samples);
        assert!((198..=202).contains(&crossings), "got {crossings} crossings");
    }

    #[test]
    fn zero_duration_never_sweeps() {
        let mut osc = Oscillator::new(44100.0, 300.0, 30.0, 0.0, 0.0, 0.0);
        for _ in 0..1000 {
            osc.step();
        }
        assert_eq!(osc.sweep_position(), 0.0);
    }

    #[test]
    fn mirrored_curve_matches_default_shape() {
        let mut a = Oscillator::with_shape(44100.0, 200.0, 100.0, 0.2, 0.0, 50.0, -8.0);
        let mut b = a.clone();
        for _ in 0..2000 {
            let expected = a.step();
            let got = b.step_with(|x| 1.0 - exponential_easing(1.0 - x, 8.0));
            assert!((expected - got).abs() < 1e-6);
        }
    }

    #[test]
    fn step_curve_jumps_to_target() {
        let mut swept = Oscillator::new(44100.0, 1000.0, 441.0, 0.0, 0.0, 500.0);
        let mut fixed = Oscillator::sine(44100.0, 441.0);
        for _ in 0..1000 {
            assert!((swept.step_with(|_| 1.0) - fixed.step()).abs() < 1e-9);
        }
    }

    #[test]
    fn noise_is_seeded_and_bounded() {
        let mut a = NoiseGenerator::new(5);
        let mut b = NoiseGenerator::new(5);
        let mut sum = 0.0;
        for _ in 0..100_000 {
            let s = a.step();
            assert_eq!(s, b.step());
            assert!((-1.0..1.0).contains(&s));
            sum += s;
        }
        assert!((sum / 100_000.0).abs() < 0.02, "noise should be roughly zero-mean");
    }

    #[test]
    fn noise_zero_seed_matches_one() {
        let mut a = NoiseGenerator::new(0);
        let mut b = NoiseGenerator::default();
        assert_eq!(a.step(), b.step());
    }
}
