//! One-pole (6 dB/oct) and two-pole biquad (12 dB/oct) low/high-pass filters.

use std::f64::consts::TAU;

use serde::{Deserialize, Serialize};

use super::math::clamp;

/// Highest usable biquad cutoff as a fraction of the sampling frequency.
const MAX_CUTOFF_RATIO: f64 = 0.49;

/// Filter polarity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterType {
    Lowpass,
    Highpass,
}

/// Single-pole smoother. The highpass output is the input minus the
/// lowpassed state.
#[derive(Debug, Clone)]
pub struct OnePoleFilter {
    filter_type: FilterType,
    s: f64,
    c: f64,
}

impl OnePoleFilter {
    pub fn new(sampling_frequency: f64, filter_type: FilterType, cutoff: f64) -> Self {
        let sampling_frequency = sampling_frequency.max(1.0);
        let cutoff = cutoff.max(1.0);

        OnePoleFilter {
            filter_type,
            s: 0.0,
            c: 1.0 - (-TAU * (cutoff / sampling_frequency)).exp(),
        }
    }

    pub fn lowpass(sampling_frequency: f64, cutoff: f64) -> Self {
        Self::new(sampling_frequency, FilterType::Lowpass, cutoff)
    }

    pub fn highpass(sampling_frequency: f64, cutoff: f64) -> Self {
        Self::new(sampling_frequency, FilterType::Highpass, cutoff)
    }

    /// Smoothing coefficient `1 - exp(-2π·cutoff/fs)`.
    pub fn coefficient(&self) -> f64 {
        self.c
    }

    #[inline]
    pub fn step(&mut self, x: f64) -> f64 {
        self.s += (x - self.s) * self.c;
        match self.filter_type {
            FilterType::Lowpass => self.s,
            FilterType::Highpass => x - self.s,
        }
    }
}

/// Normalized biquad coefficients, `a1`/`a2` keep their cookbook sign.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BiquadCoefficients {
    pub b0: f64,
    pub b1: f64,
    pub b2: f64,
    pub a1: f64,
    pub a2: f64,
}

impl BiquadCoefficients {
    /// Audio EQ Cookbook (Robert Bristow-Johnson) low/high-pass design.
    ///
    /// Sampling frequency is clamped to at least 1 Hz, Q to at least 0.01.
    /// Cutoff is clamped to at least 1 Hz and always stays below Nyquist,
    /// even at sampling frequencies of a few Hz.
    pub fn design(sampling_frequency: f64, filter_type: FilterType, cutoff: f64, q: f64) -> Self {
        let sampling_frequency = sampling_frequency.max(1.0);
        let max_cutoff = sampling_frequency * MAX_CUTOFF_RATIO;
        let cutoff = clamp(cutoff, max_cutoff.min(1.0), max_cutoff);
        let q = q.max(0.01);

        let w0 = TAU * (cutoff / sampling_frequency);
        let cos_w0 = w0.cos();
        let alpha = w0.sin() / (2.0 * q);

        let (b0, b1, b2) = match filter_type {
            FilterType::Lowpass => {
                let b1 = 1.0 - cos_w0;
                (b1 / 2.0, b1, b1 / 2.0)
            }
            FilterType::Highpass => {
                let b0 = (1.0 + cos_w0) / 2.0;
                (b0, -(1.0 + cos_w0), b0)
            }
        };
        let a0 = 1.0 + alpha;
        let a1 = -2.0 * cos_w0;
        let a2 = 1.0 - alpha;

        BiquadCoefficients {
            b0: b0 / a0,
            b1: b1 / a0,
            b2: b2 / a0,
            a1: a1 / a0,
            a2: a2 / a0,
        }
    }

    /// Largest pole magnitude. Below 1 the filter is stable.
    pub fn pole_radius(&self) -> f64 {
        let disc = self.a1 * self.a1 - 4.0 * self.a2;
        if disc < 0.0 {
            // Complex conjugate pair: |p|^2 = a2
            self.a2.abs().sqrt()
        } else {
            let root = disc.sqrt();
            let p1 = (-self.a1 + root) / 2.0;
            let p2 = (-self.a1 - root) / 2.0;
            p1.abs().max(p2.abs())
        }
    }
}

/// Two-pole (biquad) filter with resonance.
///
/// Coefficients are fixed at construction, only the two-sample input and
/// output history changes per step.
#[derive(Debug, Clone)]
pub struct TwoPolesFilter {
    coefficients: BiquadCoefficients,
    x1: f64,
    x2: f64,
    y1: f64,
    y2: f64,
}

impl TwoPolesFilter {
    pub fn new(sampling_frequency: f64, filter_type: FilterType, cutoff: f64, q: f64) -> Self {
        TwoPolesFilter {
            coefficients: BiquadCoefficients::design(sampling_frequency, filter_type, cutoff, q),
            x1: 0.0,
            x2: 0.0,
            y1: 0.0,
            y2: 0.0,
        }
    }

    pub fn lowpass(sampling_frequency: f64, cutoff: f64, q: f64) -> Self {
        Self::new(sampling_frequency, FilterType::Lowpass, cutoff, q)
    }

    pub fn highpass(sampling_frequency: f64, cutoff: f64, q: f64) -> Self {
        Self::new(sampling_frequency, FilterType::Highpass, cutoff, q)
    }

    pub fn coefficients(&self) -> &BiquadCoefficients {
        &self.coefficients
    }

    #[inline]
    pub fn step(&mut self, x: f64) -> f64 {
        let c = &self.coefficients;
        let y = c.b0 * x + c.b1 * self.x1 + c.b2 * self.x2 - c.a1 * self.y1 - c.a2 * self.y2;

        self.x2 = self.x1;
        self.x1 = x;
        self.y2 = self.y1;
        self.y1 = y;

        y
    }

    pub fn reset(&mut self) {
        self.x1 = 0.0;
        self.x2 = 0.0;
        self.y1 = 0.0;
        self.y2 = 0.0;
    }
}

/// Order of a [`FilterStage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Poles {
    One,
    Two,
}

/// One entry of a declarative filter chain. `q` is ignored by one-pole
/// stages.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FilterStage {
    pub poles: Poles,
    pub filter_type: FilterType,
    pub cutoff: f64,
    pub q: f64,
}

impl FilterStage {
    pub const fn one_pole(filter_type: FilterType, cutoff: f64) -> Self {
        FilterStage { poles: Poles::One, filter_type, cutoff, q: 0.0 }
    }

    pub const fn two_poles(filter_type: FilterType, cutoff: f64, q: f64) -> Self {
        FilterStage { poles: Poles::Two, filter_type, cutoff, q }
    }
}

#[derive(Debug, Clone)]
enum StageState {
    One(OnePoleFilter),
    Two(TwoPolesFilter),
}

/// Filters run in series, built from a table of [`FilterStage`]s.
#[derive(Debug, Clone)]
pub struct FilterChain {
    stages: Vec<StageState>,
}

impl FilterChain {
    pub fn new(sampling_frequency: f64, stages: &[FilterStage]) -> Self {
        let stages = stages
            .iter()
            .map(|stage| match stage.poles {
                Poles::One => StageState::One(OnePoleFilter::new(
                    sampling_frequency,
                    stage.filter_type,
                    stage.cutoff,
                )),
                Poles::Two => StageState::Two(TwoPolesFilter::new(
                    sampling_frequency,
                    stage.filter_type,
                    stage.cutoff,
                    stage.q,
                )),
            })
            .collect();
        FilterChain { stages }
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    #[inline]
    pub fn step(&mut self, x: f64) -> f64 {
        self.stages.iter_mut().fold(x, |signal, stage| match stage {
            StageState::One(f) => f.step(signal),
            StageState::Two(f) => f.step(signal),
        })
    }
}
