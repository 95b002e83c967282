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

use std::error::Error;
use std::path::PathBuf;
use std::sync::mpsc;
use std::time::Instant;

use clap::Parser;
use colored::Colorize;
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use indicatif_log_bridge::LogWrapper;
use log::{info, trace};
use wavconvolve::{
    ColorLogger, ConvolutionContext, ONE_HUNDRED_PERCENT, PeakMode, ProgressUpdate, TermResult,
};

#[derive(Parser)]
#[command(
    name = "wavconvolve",
    version,
    about = "Convolve a 16 bit PCM wav file with an impulse response"
)]
struct Cli {
    /// Input signal (16 bit PCM wav)
    #[arg(name = "INPUT")]
    input: PathBuf,

    /// Impulse response (16 bit PCM wav)
    #[arg(name = "RESPONSE")]
    response: PathBuf,

    /// Output wav file.
    /// [default: <input name><response name>.wav next to the input]
    #[arg(short = 'o', long = "output")]
    output: Option<PathBuf>,

    /// Quiet mode: suppress all log output
    #[arg(
        short = 'q',
        long = "quiet",
        visible_alias = "silent",
        short_alias = 's'
    )]
    quiet: bool,

    /// Print diagnostic messages. Use -V for the version
    #[arg(short = 'v', long = "verbose")]
    verbose: bool,

    /// Sample rate written to the output header, in Hz
    #[arg(short = 'r', long = "rate", default_value = "44100")]
    rate: u32,

    /// Channel count written to the output header. Samples are
    /// not deinterleaved either way.
    #[arg(short = 'c', long = "channels", default_value = "1")]
    channels: u16,

    /// Normalize by the largest magnitude instead of the
    /// largest positive sample
    #[arg(short = 'a', long = "abs-peak")]
    abs_peak: bool,
}

fn main() -> TermResult {
    match run() {
        Ok(()) => TermResult(Ok(())),
        Err(e) => TermResult(Err(e.into())),
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    let logger = ColorLogger::new(cli.quiet, cli.verbose);
    let max_level = logger.max_level();
    let multi = MultiProgress::new();
    LogWrapper::new(multi.clone(), logger).try_init()?;
    log::set_max_level(max_level);

    info!(
        "{} {}",
        env!("CARGO_PKG_NAME").bold(),
        env!("CARGO_PKG_VERSION")
    );

    let peak_mode = if cli.abs_peak {
        PeakMode::Absolute
    } else {
        PeakMode::Positive
    };

    let ctx = ConvolutionContext::new(cli.input, cli.response, cli.output)
        .with_output_format(cli.channels, cli.rate)?
        .with_peak_mode(peak_mode);
    trace!("{:?}", ctx);
    info!(
        "Convolving {} with {} ({:?} peak)",
        ctx.signal_path().display(),
        ctx.response_path().display(),
        ctx.peak_mode()
    );

    let (progress_handle, sender) = if cli.quiet {
        (None, None)
    } else {
        let (sender, receiver) = mpsc::channel::<ProgressUpdate>();
        let style = ProgressStyle::with_template("{prefix} {bar:20.cyan/blue} {percent}{msg}")?;
        let file_name = ctx
            .output_path()
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let pg = multi
            .add(ProgressBar::new(100))
            .with_style(style)
            .with_prefix(format!("{} {}", "[Convolving]".bold(), file_name.bold()))
            .with_message("%");

        // Convolution runs on this thread; the bar is driven from a helper.
        let progress_handle = std::thread::spawn(move || {
            while let Ok(progress) = receiver.recv() {
                pg.set_position(progress.percent.floor() as u64);
                if progress.percent == ONE_HUNDRED_PERCENT {
                    break;
                }
            }
            pg.finish_and_clear();
        });
        (Some(progress_handle), Some(sender))
    };

    let start = Instant::now();
    let result = ctx.do_convolution(sender);

    if let Some(progress_handle) = progress_handle
        && let Err(e) = progress_handle.join()
    {
        return Err(format!("Progress thread panicked: {:?}", e).into());
    }

    let report = result?;
    let elapsed = start.elapsed();
    info!(
        "Wrote {} samples to {} in {:.2}s",
        report.output.total_samples,
        ctx.output_path().display(),
        elapsed.as_secs_f64()
    );
    Ok(())
}
