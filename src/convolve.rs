// Direct time-domain convolution of two whole signals, plus peak normalization.
// No FFT or block decomposition: O(len(signal) * len(response)).

use std::sync::mpsc::Sender;

use log::trace;

use crate::SampleBuffer;

pub const ONE_HUNDRED_PERCENT: f64 = 100.0;

/// Progress of a running convolution, sent over an mpsc channel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProgressUpdate {
    pub percent: f64,
}

/// How [`normalize`] picks the peak it scales to 1.0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PeakMode {
    /// Largest positive sample. Negative excursions are ignored, so a signal
    /// whose largest magnitude is negative may end up outside [-1, 1].
    #[default]
    Positive,
    /// Largest magnitude of either sign.
    Absolute,
}

/// Number of output samples [`convolve`] produces.
///
/// Two more than the exact `len(signal) + len(response) - 1`; the extra
/// trailing samples are always zero.
#[inline]
pub fn output_len(signal_len: usize, response_len: usize) -> usize {
    signal_len + response_len + 1
}

/// Convolve `signal` with `response`.
///
/// `out[i] = sum(signal[n] * response[i - n])` over every `n` where both
/// indices are in range.
pub fn convolve(signal: &[f32], response: &[f32]) -> SampleBuffer {
    convolve_with_progress(signal, response, None)
}

/// [`convolve`], reporting progress over the output range to `progress`.
///
/// The last update sent is always [`ONE_HUNDRED_PERCENT`].
pub fn convolve_with_progress(
    signal: &[f32],
    response: &[f32],
    progress: Option<Sender<ProgressUpdate>>,
) -> SampleBuffer {
    let total = output_len(signal.len(), response.len());
    let mut output = vec![0.0f32; total];
    let report_every = (total / 100).max(1);

    if !signal.is_empty() && !response.is_empty() {
        let reach = response.len() - 1;
        for (i, out) in output.iter_mut().enumerate() {
            if let Some(tx) = &progress
                && i % report_every == 0
            {
                let _ = tx.send(ProgressUpdate {
                    percent: i as f64 * ONE_HUNDRED_PERCENT / total as f64,
                });
            }

            let n_lo = i.saturating_sub(reach);
            let n_hi = (i + 1).min(signal.len());
            if n_lo >= n_hi {
                continue;
            }
            // response indices run from i - n_lo down to i + 1 - n_hi
            *out = signal[n_lo..n_hi]
                .iter()
                .zip(response[i + 1 - n_hi..=i - n_lo].iter().rev())
                .fold(0.0f32, |acc, (&s, &r)| acc + s * r);
        }
    }

    trace!(
        "Convolved {} x {} samples into {}",
        signal.len(),
        response.len(),
        total
    );
    if let Some(tx) = progress {
        let _ = tx.send(ProgressUpdate {
            percent: ONE_HUNDRED_PERCENT,
        });
    }
    output
}

/// Largest sample according to `mode`, never below 0.0.
pub fn peak(samples: &[f32], mode: PeakMode) -> f32 {
    match mode {
        PeakMode::Positive => samples
            .iter()
            .fold(0.0f32, |max, &s| if s > max { s } else { max }),
        PeakMode::Absolute => samples
            .iter()
            .fold(0.0f32, |max, &s| if s.abs() > max { s.abs() } else { max }),
    }
}

/// Scale `samples` in place so the peak picked by `mode` becomes 1.0.
///
/// Returns the factor applied, or `None` for silence (peak of 0.0), which
/// is left untouched.
pub fn normalize(samples: &mut [f32], mode: PeakMode) -> Option<f32> {
    let max = peak(samples, mode);
    if max == 0.0 {
        return None;
    }
    let scale = 1.0 / max;
    for sample in samples.iter_mut() {
        *sample *= scale;
    }
    Some(scale)
}
