//! Scalar helpers shared by every primitive: easing curves, waveshaping,
//! and time conversions.

/// Linear interpolation from `x` to `y` by `a`.
#[inline]
pub fn mix(x: f64, y: f64, a: f64) -> f64 {
    x + (y - x) * a
}

/// `1.0` for strictly positive values, `-1.0` otherwise (zero included).
#[inline]
pub fn sign(x: f64) -> f64 {
    if x > 0.0 { 1.0 } else { -1.0 }
}

/// Clamp `v` into `[min, max]`.
///
/// Unlike `f64::clamp` this never panics on an inverted range; `min` wins.
#[inline]
pub fn clamp(v: f64, min: f64, max: f64) -> f64 {
    min.max(v.min(max))
}

/// Exponential easing of `x` with shape `e`.
///
/// `sign(x) * (exp(e*|x|) - 1) / (exp(e) - 1)`, which maps 0 to 0 and 1 to 1
/// for any non-zero shape. Positive shapes bend the curve towards a slow
/// start, negative shapes towards a fast start. A shape of zero is the
/// identity.
pub fn exponential_easing(x: f64, e: f64) -> f64 {
    if e == 0.0 {
        return x;
    }

    ((e * x.abs()).exp() - 1.0) / (e.exp() - 1.0) * sign(x)
}

/// Asymmetric exponential waveshaper.
///
/// The positive half follows `(exp(x*amount) - 1) / (exp(amount) - 1)`. The
/// negative half is the mirrored curve with `amount / asymmetry`, scaled by
/// `asymmetry`. An `amount` of zero is the identity.
pub fn distortion(x: f64, amount: f64, asymmetry: f64) -> f64 {
    if amount == 0.0 {
        return x;
    }

    if x > 0.0 {
        return ((x * amount).exp() - 1.0) / (amount.exp() - 1.0);
    }

    if asymmetry <= 0.0 {
        return 0.0;
    }

    let e = amount / asymmetry;
    -(((-x * e).exp() - 1.0) / (e.exp() - 1.0)) * asymmetry
}

/// Frequency ratio for a detune of `semitones` (12-TET).
#[inline]
pub fn semitone_detune(semitones: f64) -> f64 {
    2.0_f64.powf(semitones / 12.0)
}

/// Whole samples covered by `milliseconds` (floored).
pub fn ms_to_samples(sampling_frequency: f64, milliseconds: f64) -> usize {
    let samples = (milliseconds * sampling_frequency) / 1000.0;
    if samples.is_finite() && samples > 0.0 {
        samples as usize
    } else {
        0
    }
}

/// Duration of `samples` in milliseconds.
pub fn samples_to_ms(sampling_frequency: f64, samples: usize) -> f64 {
    (samples as f64 / sampling_frequency.max(1.0)) * 1000.0
}

/// Root mean square of a block.
pub fn rms(samples: &[f64]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    (samples.iter().map(|s| s * s).sum::<f64>() / samples.len() as f64).sqrt()
}

/// Scale a block so its absolute peak becomes 1.0.
///
/// Returns the peak found before scaling. Silent blocks are left alone.
pub fn normalize(samples: &mut [f64]) -> f64 {
    let peak = samples.iter().fold(0.0_f64, |m, s| m.max(s.abs()));
    if peak > 0.0 {
        let gain = 1.0 / peak;
        for s in samples.iter_mut() {
            *s *= gain;
        }
    }
    peak
}
