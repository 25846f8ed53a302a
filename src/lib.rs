pub mod analyser;
pub mod config;
pub mod dsp;
pub mod error;
pub mod export;
pub mod instruments;
pub mod spectrogram;
pub mod tuner;

pub use analyser::{Analyser, AnalyserOutput, SampleSource, Silence, SliceSource};
pub use error::SynthError;
pub use instruments::{Instrument, InstrumentSettings};
pub use tuner::{Tunable, TuneOutcome, Tuner};

use crate::export::WavFormat;
use wasm_bindgen::prelude::*;

/// The crate version, read from Cargo.toml at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

fn to_js(e: SynthError) -> JsValue {
    JsValue::from_str(&e.to_string())
}

/// WASM-exposed: return the percussion_core version string.
#[wasm_bindgen]
pub fn core_version() -> String {
    VERSION.to_string()
}

/// WASM-exposed: names accepted by the render functions.
#[wasm_bindgen]
pub fn instrument_names() -> Vec<String> {
    Instrument::ALL.iter().map(|i| i.name().to_string()).collect()
}

/// WASM-exposed: render an instrument with factory settings to mono f32
/// samples, ready for an AudioBuffer.
#[wasm_bindgen]
pub fn render_instrument_samples(name: &str, sample_rate: u32) -> Result<Vec<f32>, JsValue> {
    let instrument: Instrument = name.parse().map_err(to_js)?;
    let samples = instrument.render(sample_rate as f64);
    Ok(samples.iter().map(|&s| s as f32).collect())
}

/// WASM-exposed: render an instrument with factory settings to WAV bytes,
/// 24-bit PCM or 64-bit float.
#[wasm_bindgen]
pub fn render_instrument_wav(name: &str, sample_rate: u32, float: bool) -> Result<Vec<u8>, JsValue> {
    let instrument: Instrument = name.parse().map_err(to_js)?;
    let format = if float { WavFormat::F64 } else { WavFormat::S24 };
    Ok(export::encode_wav(&instrument.render(sample_rate as f64), sample_rate, format))
}

/// WASM-exposed: factory settings of an instrument as a JS object.
#[wasm_bindgen]
pub fn instrument_settings(name: &str) -> Result<JsValue, JsValue> {
    let instrument: Instrument = name.parse().map_err(to_js)?;
    serde_wasm_bindgen::to_value(&instrument.default_settings()).map_err(|e| JsValue::from_str(&format!("{e}")))
}

/// WASM-exposed: render an instrument with settings given as a JS object
/// (the shape [`instrument_settings`] returns).
#[wasm_bindgen]
pub fn render_instrument_with(name: &str, settings: JsValue, sample_rate: u32) -> Result<Vec<f32>, JsValue> {
    let instrument: Instrument = name.parse().map_err(to_js)?;
    let settings: InstrumentSettings =
        serde_wasm_bindgen::from_value(settings).map_err(|e| JsValue::from_str(&format!("{e}")))?;
    let samples = instrument.render_with(&settings, sample_rate as f64).map_err(to_js)?;
    Ok(samples.iter().map(|&s| s as f32).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_every_instrument() {
        let names = instrument_names();
        assert_eq!(names.len(), Instrument::ALL.len());
        assert!(names.iter().any(|n| n == "tom-low"));
    }

    #[test]
    fn renders_samples_by_name() {
        let samples = render_instrument_samples("snare", 44100).unwrap();
        let reference = Instrument::Snare.render(44100.0);
        assert_eq!(samples.len(), reference.len());
    }

    #[test]
    fn renders_wav_by_name() {
        let wav = render_instrument_wav("kick", 44100, false).unwrap();
        assert_eq!(&wav[0..4], b"RIFF");
        let samples = Instrument::Kick.render(44100.0).len();
        assert_eq!(wav.len(), 44 + samples * 3);
    }
}
