//! Percussion instruments: render routines composed from the DSP
//! primitives.
//!
//! Each instrument has a serde-friendly settings struct with factory
//! defaults; tuned settings can be saved as JSON and rendered later with
//! [`Instrument::render_with`].

mod hats;
mod kick;
mod snare;
mod toms;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::dsp::math::{clamp, normalize};
use crate::error::SynthError;
use crate::tuner::{TuneOutcome, Tuner};

pub use hats::{CymbalSettings, HatSettings};
pub use kick::KickSettings;
pub use snare::SnareSettings;
pub use toms::TomSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Instrument {
    HatClosed,
    HatOpen,
    Cymbal,
    Kick,
    Snare,
    TomHigh,
    TomLow,
}

impl Instrument {
    pub const ALL: [Instrument; 7] = [
        Instrument::HatClosed,
        Instrument::HatOpen,
        Instrument::Cymbal,
        Instrument::Kick,
        Instrument::Snare,
        Instrument::TomHigh,
        Instrument::TomLow,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Instrument::HatClosed => "hat-closed",
            Instrument::HatOpen => "hat-open",
            Instrument::Cymbal => "cymbal",
            Instrument::Kick => "kick",
            Instrument::Snare => "snare",
            Instrument::TomHigh => "tom-high",
            Instrument::TomLow => "tom-low",
        }
    }

    pub fn default_settings(self) -> InstrumentSettings {
        match self {
            Instrument::HatClosed => InstrumentSettings::Hat(HatSettings::default_closed()),
            Instrument::HatOpen => InstrumentSettings::Hat(HatSettings::default_open()),
            Instrument::Cymbal => InstrumentSettings::Cymbal(CymbalSettings::default()),
            Instrument::Kick => InstrumentSettings::Kick(KickSettings::default()),
            Instrument::Snare => InstrumentSettings::Snare(SnareSettings::default()),
            Instrument::TomHigh => InstrumentSettings::Tom(TomSettings::default_high()),
            Instrument::TomLow => InstrumentSettings::Tom(TomSettings::default_low()),
        }
    }

    /// Render with factory settings.
    pub fn render(self, sampling_frequency: f64) -> Vec<f64> {
        self.default_settings().render(sampling_frequency)
    }

    /// Render with `settings`, which must belong to this instrument's family.
    pub fn render_with(self, settings: &InstrumentSettings, sampling_frequency: f64) -> Result<Vec<f64>, SynthError> {
        if !settings.fits(self) {
            return Err(SynthError::InvalidConfig(format!(
                "{} settings cannot render {}",
                settings.kind(),
                self
            )));
        }
        Ok(settings.render(sampling_frequency))
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Instrument {
    type Err = SynthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Instrument::ALL
            .into_iter()
            .find(|instrument| instrument.name() == s)
            .ok_or_else(|| SynthError::UnknownInstrument(s.to_string()))
    }
}

/// Settings for any instrument family, tagged by `kind` in JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum InstrumentSettings {
    Hat(HatSettings),
    Cymbal(CymbalSettings),
    Kick(KickSettings),
    Snare(SnareSettings),
    Tom(TomSettings),
}

impl InstrumentSettings {
    pub fn kind(&self) -> &'static str {
        match self {
            InstrumentSettings::Hat(_) => "hat",
            InstrumentSettings::Cymbal(_) => "cymbal",
            InstrumentSettings::Kick(_) => "kick",
            InstrumentSettings::Snare(_) => "snare",
            InstrumentSettings::Tom(_) => "tom",
        }
    }

    /// Whether these settings drive `instrument`'s render routine.
    pub fn fits(&self, instrument: Instrument) -> bool {
        matches!(
            (self, instrument),
            (InstrumentSettings::Hat(_), Instrument::HatClosed | Instrument::HatOpen)
                | (InstrumentSettings::Cymbal(_), Instrument::Cymbal)
                | (InstrumentSettings::Kick(_), Instrument::Kick)
                | (InstrumentSettings::Snare(_), Instrument::Snare)
                | (InstrumentSettings::Tom(_), Instrument::TomHigh | Instrument::TomLow)
        )
    }

    pub fn render(&self, sampling_frequency: f64) -> Vec<f64> {
        match self {
            InstrumentSettings::Hat(s) => s.render(sampling_frequency),
            InstrumentSettings::Cymbal(s) => s.render(sampling_frequency),
            InstrumentSettings::Kick(s) => s.render(sampling_frequency),
            InstrumentSettings::Snare(s) => s.render(sampling_frequency),
            InstrumentSettings::Tom(s) => s.render(sampling_frequency),
        }
    }

    /// Tune these settings against `reference`, rendering candidates
    /// through the matching routine.
    pub fn tune(&self, tuner: &mut Tuner, reference: &[f32]) -> Result<TuneOutcome<InstrumentSettings>, SynthError> {
        Ok(match self {
            InstrumentSettings::Hat(s) => tuner
                .tune(s, reference, |c: &HatSettings, fs| c.render(fs))?
                .map(InstrumentSettings::Hat),
            InstrumentSettings::Cymbal(s) => tuner
                .tune(s, reference, |c: &CymbalSettings, fs| c.render(fs))?
                .map(InstrumentSettings::Cymbal),
            InstrumentSettings::Kick(s) => tuner
                .tune(s, reference, |c: &KickSettings, fs| c.render(fs))?
                .map(InstrumentSettings::Kick),
            InstrumentSettings::Snare(s) => tuner
                .tune(s, reference, |c: &SnareSettings, fs| c.render(fs))?
                .map(InstrumentSettings::Snare),
            InstrumentSettings::Tom(s) => tuner
                .tune(s, reference, |c: &TomSettings, fs| c.render(fs))?
                .map(InstrumentSettings::Tom),
        })
    }
}

/// Final normalization shared by the normalized instruments.
fn finish(samples: &mut [f64]) {
    if normalize(samples) == 0.0 {
        log::warn!("Rendered {} silent samples", samples.len());
    }
    for s in samples.iter_mut() {
        *s = clamp(*s, -1.0, 1.0);
    }
}
