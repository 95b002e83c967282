/*
 Copyright (c) 2023 clone206

 This file is part of wavconvolve

 wavconvolve is free software: you can redistribute it and/or modify it
 under the terms of the GNU General Public License as published by the
 Free Software Foundation, either version 3 of the License, or
 (at your option) any later version.

 wavconvolve is distributed in the hope that it will be useful, but
 WITHOUT ANY WARRANTY; without even the implied warranty of
 MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 GNU General Public License for more details.
 You should have received a copy of the GNU General Public License
 along with wavconvolve. If not, see <https://www.gnu.org/licenses/>.
*/

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;

use log::{info, warn};

use crate::convolve::{PeakMode, ProgressUpdate, convolve_with_progress, normalize};
use crate::error::Error;
use crate::model::{AppError, AppResult};
use crate::wav_file::{DEFAULT_CHANNELS, DEFAULT_SAMPLE_RATE, WavReader, WavSpec, WavWriter};

/// What a finished run produced.
#[derive(Debug, Clone)]
pub struct ConvolutionReport {
    pub signal: WavSpec,
    pub response: WavSpec,
    pub output: WavSpec,
    /// Normalization factor applied, `None` when the result was silent.
    pub scale: Option<f32>,
    /// False when the output write came up short.
    pub write_complete: bool,
}

/// Settings for one signal/response/output run.
#[derive(Debug, Clone)]
pub struct ConvolutionContext {
    signal_path: PathBuf,
    response_path: PathBuf,
    output_path: PathBuf,
    channels: u16,
    sample_rate: u32,
    peak_mode: PeakMode,
}

impl ConvolutionContext {
    pub fn new(
        signal_path: PathBuf,
        response_path: PathBuf,
        output_path: Option<PathBuf>,
    ) -> Self {
        let output_path = output_path
            .unwrap_or_else(|| Self::default_output_path(&signal_path, &response_path));
        Self {
            signal_path,
            response_path,
            output_path,
            channels: DEFAULT_CHANNELS,
            sample_rate: DEFAULT_SAMPLE_RATE,
            peak_mode: PeakMode::default(),
        }
    }

    /// Header metadata written to the output file.
    pub fn with_output_format(mut self, channels: u16, sample_rate: u32) -> AppResult<Self> {
        if channels == 0 {
            return Err(AppError::Message("Output channel count must be at least 1".into()));
        }
        if sample_rate == 0 {
            return Err(AppError::Message("Output sample rate must be above 0 Hz".into()));
        }
        self.channels = channels;
        self.sample_rate = sample_rate;
        Ok(self)
    }

    pub fn with_peak_mode(mut self, peak_mode: PeakMode) -> Self {
        self.peak_mode = peak_mode;
        self
    }

    /// `<signal stem><response stem>.wav` next to the signal file.
    pub fn default_output_path(signal_path: &Path, response_path: &Path) -> PathBuf {
        let stem = |p: &Path| {
            p.file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default()
        };
        let file_name = format!("{}{}.wav", stem(signal_path), stem(response_path));
        match signal_path.parent() {
            Some(parent) => parent.join(file_name),
            None => PathBuf::from(file_name),
        }
    }

    pub fn signal_path(&self) -> &Path {
        &self.signal_path
    }

    pub fn response_path(&self) -> &Path {
        &self.response_path
    }

    pub fn output_path(&self) -> &Path {
        &self.output_path
    }

    pub fn peak_mode(&self) -> PeakMode {
        self.peak_mode
    }

    /// Open and validate one input, logging its summary.
    fn open_input(&self, path: &Path, role: &str) -> AppResult<WavReader<BufReader<File>>> {
        let file = File::open(path).map_err(|source| {
            AppError::wav(
                format!("Failed opening {} file", role),
                Error::StreamOpen {
                    path: path.to_path_buf(),
                    source,
                },
            )
        })?;
        let reader = WavReader::open(BufReader::new(file)).map_err(|e| {
            AppError::wav(
                format!("Invalid file type, {} is not a wav file", path.display()),
                e,
            )
        })?;
        info!("{} file: {}\n{}", role, path.display(), reader.spec());
        Ok(reader)
    }

    /// Run the whole job: decode both inputs, convolve, normalize, encode.
    pub fn do_convolution(
        &self,
        progress: Option<Sender<ProgressUpdate>>,
    ) -> AppResult<ConvolutionReport> {
        let mut signal_wav = self.open_input(&self.signal_path, "Input")?;
        let mut response_wav = self.open_input(&self.response_path, "Response")?;

        if signal_wav.spec().sample_rate != response_wav.spec().sample_rate {
            warn!(
                "Sample rates differ ({} Hz vs {} Hz); samples are combined as is",
                signal_wav.spec().sample_rate,
                response_wav.spec().sample_rate
            );
        }

        info!(
            "Reading {} and {} into memory",
            self.signal_path.display(),
            self.response_path.display()
        );
        let signal = signal_wav.read_all().map_err(|e| {
            AppError::wav(format!("Failed reading file {}", self.signal_path.display()), e)
        })?;
        let response = response_wav.read_all().map_err(|e| {
            AppError::wav(format!("Failed reading file {}", self.response_path.display()), e)
        })?;

        info!("Processing audio");
        let mut output = convolve_with_progress(&signal, &response, progress);

        info!("Normalising audio");
        let scale = normalize(&mut output, self.peak_mode);
        if scale.is_none() {
            warn!("Convolution result is silent; leaving it unnormalized");
        }

        let out_file = File::create(&self.output_path).map_err(|source| {
            AppError::wav(
                "Failed opening output file",
                Error::StreamOpen {
                    path: self.output_path.clone(),
                    source,
                },
            )
        })?;
        let mut out_wav =
            WavWriter::with_format(BufWriter::new(out_file), self.channels, self.sample_rate)
                .map_err(|e| AppError::wav("Invalid output format", e))?;

        info!("Writing data out to {}", self.output_path.display());
        let write_complete = match out_wav.write_samples(&output) {
            Ok(()) => true,
            Err(e @ Error::ShortWrite { .. }) => {
                warn!(
                    "Failed during write of {}. File may be malformed: {}",
                    self.output_path.display(),
                    e
                );
                false
            }
            Err(e) => {
                return Err(AppError::wav(
                    format!("Failed writing {}", self.output_path.display()),
                    e,
                ));
            }
        };

        let output_spec = *out_wav.spec();
        out_wav.finalize().map_err(|e| {
            AppError::wav(
                format!("Failed writing header of {}", self.output_path.display()),
                e,
            )
        })?;
        info!("Output file: {}\n{}", self.output_path.display(), output_spec);

        let report = ConvolutionReport {
            signal: *signal_wav.spec(),
            response: *response_wav.spec(),
            output: output_spec,
            scale,
            write_complete,
        };
        signal_wav.close();
        response_wav.close();
        Ok(report)
    }
}
