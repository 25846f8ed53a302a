//! Configuration for analysis, plotting and tuning.

use serde::{Deserialize, Serialize};

use crate::error::SynthError;

/// FFT window lengths the command line accepts.
pub const WINDOW_LENGTHS: [usize; 5] = [512, 1024, 2048, 4096, 8192];

/// Spectral analyser parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyserConfig {
    /// FFT window length, a power of two (default: 1024)
    pub window_length: usize,

    /// Windows overlapping each sample; the hop is `window_length / overlaps`
    /// (default: 8)
    pub overlaps: usize,
}

impl Default for AnalyserConfig {
    fn default() -> Self {
        Self {
            window_length: 1024,
            overlaps: 8,
        }
    }
}

impl AnalyserConfig {
    /// Check the window/overlap combination without allocating anything.
    pub fn validate(&self) -> Result<(), SynthError> {
        if self.window_length < 4 || !self.window_length.is_power_of_two() {
            return Err(SynthError::InvalidConfig(format!(
                "window length {} is not a power of two >= 4",
                self.window_length
            )));
        }
        if self.overlaps == 0 || self.overlaps > self.window_length {
            return Err(SynthError::InvalidConfig(format!(
                "overlaps must be between 1 and {}, got {}",
                self.window_length, self.overlaps
            )));
        }
        if self.window_length % self.overlaps != 0 {
            return Err(SynthError::InvalidConfig(format!(
                "overlaps {} does not divide window length {}",
                self.overlaps, self.window_length
            )));
        }
        Ok(())
    }

    /// Samples read per analysed window.
    pub fn hop_length(&self) -> usize {
        self.window_length / self.overlaps.max(1)
    }
}

/// Spectrogram rendering parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlotConfig {
    /// Image width in pixels (default: 640)
    pub width: usize,

    /// Image height in pixels, one row per analysed window (default: 480)
    pub height: usize,

    /// Exponent of the frequency axis; 1.0 is linear, larger values give
    /// low frequencies more room (default: 1.0)
    pub linearity: f64,

    /// Gain applied to magnitudes before shading (default: 1.0)
    pub scale: f64,

    /// Shading curve strength; higher values reveal quieter bins
    /// (default: 32.0)
    pub exposure: f64,
}

impl Default for PlotConfig {
    fn default() -> Self {
        Self {
            width: 640,
            height: 480,
            linearity: 1.0,
            scale: 1.0,
            exposure: 32.0,
        }
    }
}

/// Evolutionary tuner parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TunerConfig {
    /// Number of generations (default: 24)
    pub generations: usize,

    /// Candidates rendered per generation, including the unmutated seed
    /// (default: 16)
    pub population: usize,

    /// Smallest per-field mutation factor (default: 0.8)
    pub min_factor: f64,

    /// Largest per-field mutation factor (default: 1.25)
    pub max_factor: f64,

    /// Mutation PRNG seed (default: 1)
    pub seed: u64,

    /// Sampling frequency candidates are rendered at (default: 44100.0)
    pub sampling_frequency: f64,

    /// Analyser used for scoring
    pub analyser: AnalyserConfig,
}

impl Default for TunerConfig {
    fn default() -> Self {
        Self {
            generations: 24,
            population: 16,
            min_factor: 0.8,
            max_factor: 1.25,
            seed: 1,
            sampling_frequency: 44100.0,
            analyser: AnalyserConfig::default(),
        }
    }
}

impl TunerConfig {
    pub fn validate(&self) -> Result<(), SynthError> {
        if self.generations == 0 {
            return Err(SynthError::InvalidConfig("tuning needs at least one generation".into()));
        }
        if self.population < 2 {
            return Err(SynthError::InvalidConfig(format!(
                "population must hold at least two candidates, got {}",
                self.population
            )));
        }
        if !(self.min_factor > 0.0 && self.min_factor <= self.max_factor) {
            return Err(SynthError::InvalidConfig(format!(
                "mutation range [{}, {}] must be positive and ordered",
                self.min_factor, self.max_factor
            )));
        }
        self.analyser.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(AnalyserConfig::default().validate().is_ok());
        assert!(TunerConfig::default().validate().is_ok());
        assert_eq!(AnalyserConfig::default().hop_length(), 128);
    }

    #[test]
    fn every_cli_window_length_is_accepted() {
        for window_length in WINDOW_LENGTHS {
            let config = AnalyserConfig { window_length, overlaps: 8 };
            assert!(config.validate().is_ok(), "{window_length} rejected");
        }
    }

    #[test]
    fn rejects_bad_windows() {
        let bad = [
            AnalyserConfig { window_length: 1000, overlaps: 8 },
            AnalyserConfig { window_length: 2, overlaps: 1 },
            AnalyserConfig { window_length: 1024, overlaps: 0 },
            AnalyserConfig { window_length: 1024, overlaps: 3 },
            AnalyserConfig { window_length: 8, overlaps: 16 },
        ];
        for config in bad {
            assert!(
                matches!(config.validate(), Err(SynthError::InvalidConfig(_))),
                "{config:?} accepted"
            );
        }
    }

    #[test]
    fn tuner_rejects_degenerate_runs() {
        let mut config = TunerConfig::default();
        config.population = 1;
        assert!(config.validate().is_err());

        let mut config = TunerConfig::default();
        config.generations = 0;
        assert!(config.validate().is_err());

        let mut config = TunerConfig::default();
        config.min_factor = 1.5;
        assert!(config.validate().is_err());
    }

    #[test]
    fn partial_json_fills_defaults() {
        let config: TunerConfig =
            serde_json::from_str(r#"{ "generations": 3, "analyser": { "window_length": 2048 } }"#).unwrap();
        assert_eq!(config.generations, 3);
        assert_eq!(config.population, 16);
        assert_eq!(config.analyser.window_length, 2048);
        assert_eq!(config.analyser.overlaps, 8);
    }
}
