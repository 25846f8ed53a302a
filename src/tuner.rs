//! Evolutionary parameter tuner.
//!
//! Starting from a seed parameter set, every generation renders a population
//! of mutated candidates, scores each one against a reference recording with
//! the dual-input [`Analyser`], and breeds the next seed from the two best
//! candidates with a per-field geometric mean.

use crate::analyser::{Analyser, SliceSource};
use crate::config::TunerConfig;
use crate::dsp::math::clamp;
use crate::dsp::rng::Rng;
use crate::error::SynthError;

/// A parameter set the tuner can mutate.
///
/// Every field is a positive scalar; gains, lengths and frequencies all
/// behave multiplicatively, which is why mutation scales and recombination
/// takes the geometric mean.
pub trait Tunable: Clone {
    /// Inclusive `(min, max)` bounds, one per parameter, in the order
    /// [`parameters`](Tunable::parameters) returns them.
    const BOUNDS: &'static [(f64, f64)];

    fn parameters(&self) -> Vec<f64>;

    /// Copy of `self` with every field replaced from `values`.
    fn with_parameters(&self, values: &[f64]) -> Self;
}

/// Result of a tuning run.
#[derive(Debug, Clone)]
pub struct TuneOutcome<S> {
    /// Seed bred from the last generation's two best candidates.
    pub settings: S,
    /// Lowest-scoring candidate rendered during the run.
    pub best: S,
    pub best_difference: f64,
    /// Best difference of each generation.
    pub history: Vec<f64>,
}

impl<S> TuneOutcome<S> {
    /// Convert both parameter sets, keeping the scores.
    pub fn map<T>(self, f: impl Fn(S) -> T) -> TuneOutcome<T> {
        TuneOutcome {
            settings: f(self.settings),
            best: f(self.best),
            best_difference: self.best_difference,
            history: self.history,
        }
    }
}

/// Geometric mean of two parameter values, or 0 when either is not
/// positive.
pub fn geometric_mean(a: f64, b: f64) -> f64 {
    if a <= 0.0 || b <= 0.0 {
        return 0.0;
    }
    ((a.ln() + b.ln()) / 2.0).exp()
}

#[derive(Debug, Clone)]
pub struct Tuner {
    config: TunerConfig,
    rng: Rng,
}

impl Tuner {
    pub fn new(config: TunerConfig) -> Self {
        Tuner {
            rng: Rng::new(config.seed),
            config,
        }
    }

    pub fn config(&self) -> &TunerConfig {
        &self.config
    }

    /// Scale every field of `seed` by an independent random factor in
    /// `[min_factor, max_factor]`, clamped to the field bounds.
    pub fn mutate<S: Tunable>(&mut self, seed: &S) -> S {
        let values: Vec<f64> = seed
            .parameters()
            .iter()
            .zip(S::BOUNDS)
            .map(|(&value, &(min, max))| {
                let factor = self.rng.range(self.config.min_factor, self.config.max_factor);
                clamp(value * factor, min, max)
            })
            .collect();
        seed.with_parameters(&values)
    }

    /// Field-wise geometric mean of two candidates, clamped to the bounds.
    pub fn recombine<S: Tunable>(a: &S, b: &S) -> S {
        let values: Vec<f64> = a
            .parameters()
            .iter()
            .zip(b.parameters())
            .zip(S::BOUNDS)
            .map(|((&x, y), &(min, max))| clamp(geometric_mean(x, y), min, max))
            .collect();
        a.with_parameters(&values)
    }

    /// Tune `initial` towards `reference`.
    ///
    /// `render(candidate, sampling_frequency)` must run the same signal
    /// chain the tuned settings will later be rendered with. Candidate 0 of
    /// every generation is the current seed itself, so the best score of a
    /// generation never exceeds the seed's own score.
    pub fn tune<S, R>(&mut self, initial: &S, reference: &[f32], mut render: R) -> Result<TuneOutcome<S>, SynthError>
    where
        S: Tunable,
        R: FnMut(&S, f64) -> Vec<f64>,
    {
        self.config.validate()?;
        if reference.is_empty() {
            return Err(SynthError::InvalidConfig("reference recording is empty".into()));
        }
        if initial.parameters().len() != S::BOUNDS.len() {
            return Err(SynthError::InvalidConfig(format!(
                "{} parameters but {} bounds",
                initial.parameters().len(),
                S::BOUNDS.len()
            )));
        }

        let mut analyser = Analyser::from_config(&self.config.analyser)?;
        let fs = self.config.sampling_frequency;

        let mut seed = initial.clone();
        let mut best = (f64::INFINITY, initial.clone());
        let mut history = Vec::with_capacity(self.config.generations);

        for generation in 0..self.config.generations {
            let mut scored: Vec<(f64, S)> = Vec::with_capacity(self.config.population);

            for index in 0..self.config.population {
                let candidate = if index == 0 { seed.clone() } else { self.mutate(&seed) };
                let samples = render(&candidate, fs);
                let output = analyser.analyse(
                    SliceSource::new(&samples),
                    SliceSource::new(reference),
                    |_, _, _| {},
                );
                scored.push((output.difference, candidate));
            }

            scored.sort_by(|a, b| a.0.total_cmp(&b.0));
            let generation_best = scored[0].0;
            history.push(generation_best);

            log::info!(
                "Generation {}/{}: best difference {:.3} (worst {:.3})",
                generation + 1,
                self.config.generations,
                generation_best,
                scored[scored.len() - 1].0
            );

            if generation_best < best.0 {
                best = scored[0].clone();
            }
            seed = Self::recombine(&scored[0].1, &scored[1].1);
        }

        Ok(TuneOutcome {
            settings: seed,
            best: best.1,
            best_difference: best.0,
            history,
        })
    }
}
