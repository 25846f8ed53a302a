//! Spectrogram plotting into an 8-bit indexed framebuffer.
//!
//! One analysed window becomes one row of pixels, frequency runs along the
//! x axis. Rows past the bottom of the image are dropped.

use std::path::Path;

use crate::config::PlotConfig;
use crate::dsp::math::{clamp, exponential_easing};
use crate::error::SynthError;
use crate::export;

/// Colour index of pixels no window has been drawn into.
const BACKGROUND: u8 = 255;

/// 256-entry greyscale palette, index 0 black.
pub fn greyscale_palette() -> Vec<[u8; 4]> {
    (0..=255u8).map(|i| [i, i, i, 255]).collect()
}

#[derive(Debug, Clone)]
pub struct Spectrogram {
    config: PlotConfig,
    framebuffer: Vec<u8>,
    rows_drawn: usize,
}

impl Spectrogram {
    pub fn new(config: PlotConfig) -> Result<Self, SynthError> {
        if config.width == 0 || config.height == 0 {
            return Err(SynthError::InvalidConfig(format!(
                "plot size {}x{} is empty",
                config.width, config.height
            )));
        }
        if config.linearity.is_nan() || config.linearity <= 0.0 {
            return Err(SynthError::InvalidConfig(format!(
                "linearity must be positive, got {}",
                config.linearity
            )));
        }

        Ok(Spectrogram {
            framebuffer: vec![BACKGROUND; config.width * config.height],
            rows_drawn: 0,
            config,
        })
    }

    pub fn width(&self) -> usize {
        self.config.width
    }

    pub fn height(&self) -> usize {
        self.config.height
    }

    pub fn framebuffer(&self) -> &[u8] {
        &self.framebuffer
    }

    /// Rows drawn so far, including those that fell off the image.
    pub fn rows_drawn(&self) -> usize {
        self.rows_drawn
    }

    /// Bin shown in column `x` for a spectrum of `bins` bins.
    pub fn column_bin(&self, x: usize, bins: usize) -> usize {
        if bins == 0 {
            return 0;
        }
        let t = x as f64 / self.config.width as f64;
        ((t.powf(self.config.linearity) * bins as f64) as usize).min(bins - 1)
    }

    /// Palette index for a magnitude (or difference) value.
    pub fn shade(&self, magnitude: f32) -> u8 {
        let level = clamp(magnitude as f64 * self.config.scale, 0.0, 1.0);
        (exponential_easing(level, -self.config.exposure) * 255.0) as u8
    }

    /// Draw `bins` into row `row`. Out-of-range rows are ignored.
    pub fn draw_row(&mut self, row: usize, bins: &[f32]) {
        self.rows_drawn += 1;
        if row >= self.config.height || bins.is_empty() {
            return;
        }

        let width = self.config.width;
        for x in 0..width {
            let value = self.shade(bins[self.column_bin(x, bins.len())]);
            self.framebuffer[row * width + x] = value;
        }
    }

    /// Callback for [`Analyser::analyse`](crate::analyser::Analyser::analyse)
    /// that draws every window into its own row.
    pub fn row_drawer(&mut self) -> impl FnMut(usize, usize, &[f32]) + '_ {
        move |index, _window_length, bins| self.draw_row(index, bins)
    }

    pub fn encode_png(&self) -> Result<Vec<u8>, SynthError> {
        export::encode_indexed_png(&self.framebuffer, &greyscale_palette(), self.width(), self.height())
    }

    pub fn save_png<P: AsRef<Path>>(&self, path: P) -> Result<(), SynthError> {
        if self.rows_drawn > self.config.height {
            log::warn!(
                "{} of {} windows did not fit the plot",
                self.rows_drawn - self.config.height,
                self.rows_drawn
            );
        }
        export::write_indexed_png(path, &self.framebuffer, &greyscale_palette(), self.width(), self.height())
    }
}
