//! Attack-decay envelope generator.

use super::math::{exponential_easing, ms_to_samples};

/// Default attack shape: a fast, click-like rise.
pub const DEFAULT_ATTACK_SHAPE: f64 = -2.0;
/// Default decay shape: a natural exponential tail.
pub const DEFAULT_DECAY_SHAPE: f64 = 8.0;

/// One-shot attack-decay envelope.
///
/// Rises from 0 to 1 over the attack, falls back to 0 over the decay, and
/// stays at 0 afterwards. Both segments are at least one sample long.
#[derive(Debug, Clone)]
pub struct AdEnvelope {
    attack: f64,
    decay: f64,
    attack_shape: f64,
    decay_shape: f64,
    x: usize,
}

impl AdEnvelope {
    /// Build from durations in milliseconds.
    pub fn new(
        sampling_frequency: f64,
        attack_ms: f64,
        decay_ms: f64,
        attack_shape: f64,
        decay_shape: f64,
    ) -> Self {
        let sampling_frequency = sampling_frequency.max(1.0);
        Self::from_samples(
            ms_to_samples(sampling_frequency, attack_ms),
            ms_to_samples(sampling_frequency, decay_ms),
            attack_shape,
            decay_shape,
        )
    }

    /// Build from pre-converted sample counts.
    pub fn from_samples(attack: usize, decay: usize, attack_shape: f64, decay_shape: f64) -> Self {
        AdEnvelope {
            attack: (attack as f64).max(1.0),
            decay: (decay as f64).max(1.0),
            attack_shape,
            decay_shape,
            x: 0,
        }
    }

    /// Number of samples before the envelope settles at zero.
    pub fn total_samples(&self) -> usize {
        (self.attack + self.decay).ceil() as usize
    }

    /// Attack length in samples.
    pub fn attack_samples(&self) -> usize {
        self.attack as usize
    }

    /// Advance the internal cursor and return the gain for that sample.
    pub fn step(&mut self) -> f64 {
        let x = self.x;
        self.x = self.x.saturating_add(1);

        let (attack_shape, decay_shape) = (self.attack_shape, self.decay_shape);
        self.get(
            x,
            |t| exponential_easing(t, attack_shape),
            |t| exponential_easing(t, decay_shape),
        )
    }

    /// Gain at sample `x`, shaped by caller-supplied curves.
    ///
    /// `attack` receives the rising position in `[0, 1)`, `decay` receives
    /// the falling position in `(0, 1]`. Does not touch the cursor.
    pub fn get<A, D>(&self, x: usize, attack: A, decay: D) -> f64
    where
        A: Fn(f64) -> f64,
        D: Fn(f64) -> f64,
    {
        let dx = x as f64;

        if dx < self.attack {
            attack(dx / self.attack)
        } else if dx < self.attack + self.decay {
            decay(1.0 - (dx - self.attack) / self.decay)
        } else {
            0.0
        }
    }

    /// Rewind the cursor to the first sample.
    pub fn reset(&mut self) {
        self.x = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn total_is_ceil_of_both_segments() {
        let env = AdEnvelope::new(44100.0, 10.0, 100.0, -2.0, 8.0);
        assert_eq!(env.total_samples(), 441 + 4410);

        let env = AdEnvelope::from_samples(49, 64, 0.0, 0.0);
        assert_eq!(env.total_samples(), 113);
    }

    #[test]
    fn zero_durations_clamp_to_one_sample() {
        let env = AdEnvelope::new(44100.0, 0.0, 0.0, -2.0, 8.0);
        assert_eq!(env.total_samples(), 2);
        assert_eq!(env.attack_samples(), 1);
    }

    #[test]
    fn tail_is_zero_forever() {
        let mut env = AdEnvelope::new(44100.0, 2.0, 30.0, -2.0, 8.0);
        for _ in 0..env.total_samples() {
            env.step();
        }
        for _ in 0..10_000 {
            assert_eq!(env.step(), 0.0);
        }
    }

    #[test]
    fn last_step_before_tail_is_nonzero() {
        let mut env = AdEnvelope::from_samples(10, 100, 0.0, 0.0);
        let mut last = 0.0;
        for _ in 0..env.total_samples() {
            last = env.step();
        }
        assert!(last > 0.0, "final in-range sample should be positive, got {last}");
        assert_eq!(env.step(), 0.0);
    }

    #[test]
    fn peaks_at_end_of_attack() {
        let mut env = AdEnvelope::from_samples(100, 1000, -2.0, 8.0);
        let levels: Vec<f64> = (0..env.total_samples()).map(|_| env.step()).collect();
        assert_eq!(levels[0], 0.0);
        assert_eq!(levels[100], 1.0);
        assert!(levels.iter().all(|&l| (0.0..=1.0).contains(&l)));
        // Decay is monotonic
        for w in levels[100..].windows(2) {
            assert!(w[1] <= w[0]);
        }
    }

    #[test]
    fn get_matches_step_with_same_shapes() {
        let mut env = AdEnvelope::from_samples(20, 200, -2.0, 8.0);
        let reference = env.clone();
        for x in 0..reference.total_samples() + 5 {
            let pulled = reference.get(
                x,
                |t| exponential_easing(t, -2.0),
                |t| exponential_easing(t, 8.0),
            );
            assert_eq!(env.step(), pulled);
        }
    }

    #[test]
    fn get_accepts_custom_curves() {
        let env = AdEnvelope::from_samples(10, 10, 0.0, 0.0);
        assert_eq!(env.get(5, |t| t * 2.0, |_| -1.0), 1.0);
        assert_eq!(env.get(15, |t| t, |_| -1.0), -1.0);
        assert_eq!(env.get(25, |_| 9.0, |_| 9.0), 0.0);
    }

    #[test]
    fn reset_rewinds() {
        let mut env = AdEnvelope::from_samples(4, 4, 0.0, 0.0);
        let first: Vec<f64> = (0..8).map(|_| env.step()).collect();
        env.reset();
        let second: Vec<f64> = (0..8).map(|_| env.step()).collect();
        assert_eq!(first, second);
    }
}
