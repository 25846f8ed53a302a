//! DSP primitives: pure Rust, sample-at-a-time building blocks.
//!
//! Every primitive holds only scalar state and advances one sample per
//! `step`, so instruments compose them into plain render loops and the same
//! settings always produce the same samples.

pub mod envelope;
pub mod filter;
pub mod math;
pub mod oscillator;
pub mod rng;

pub use envelope::AdEnvelope;
pub use filter::{FilterChain, FilterStage, FilterType, OnePoleFilter, Poles, TwoPolesFilter};
pub use oscillator::{NoiseGenerator, Oscillator, SquareOscillator};
pub use rng::Rng;
