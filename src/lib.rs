//! Convolve a RIFF/WAVE signal with an impulse response.
//!
//! ```no_run
//! use std::fs::File;
//! use std::io::BufReader;
//! use wavconvolve::{PeakMode, WavReader, convolve, normalize};
//!
//! let mut dry = WavReader::open(BufReader::new(File::open("dry.wav")?))?;
//! let mut ir = WavReader::open(BufReader::new(File::open("hall.wav")?))?;
//! let mut wet = convolve(&dry.read_all()?, &ir.read_all()?);
//! normalize(&mut wet, PeakMode::Positive);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod color_logger;
pub mod convolution_context;
pub mod convolve;
pub mod endian;
pub mod error;
pub mod model;
pub mod wav_file;

/// Owned run of `f32` samples; length is a sample count, not bytes.
pub type SampleBuffer = Vec<f32>;

pub use color_logger::ColorLogger;
pub use convolution_context::{ConvolutionContext, ConvolutionReport};
pub use convolve::{
    ONE_HUNDRED_PERCENT, PeakMode, ProgressUpdate, convolve, convolve_with_progress, normalize,
};
pub use endian::{EndianAdapter, Order, native_order};
pub use error::Error;
pub use model::{AppError, AppResult, TermResult};
pub use wav_file::{SampleWidth, WavReader, WavSpec, WavWriter};
