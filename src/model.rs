use core::fmt;
use std::process::{ExitCode, Termination};

use log::error;

use crate::error::Error;

/// Failure of a whole convolution run, as reported to the user.
#[derive(Debug)]
pub enum AppError {
    Message(String),
    /// A codec error, with what was being done to which file.
    Wav { context: String, source: Error },
}

impl AppError {
    pub fn wav(context: impl Into<String>, source: Error) -> Self {
        AppError::Wav {
            context: context.into(),
            source,
        }
    }

    /// The codec error underneath, if any.
    pub fn wav_error(&self) -> Option<&Error> {
        match self {
            AppError::Wav { source, .. } => Some(source),
            AppError::Message(_) => None,
        }
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Message(msg) => write!(f, "{}", msg),
            AppError::Wav { context, source } => write!(f, "{}: {}", context, source),
        }
    }
}

impl std::error::Error for AppError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            AppError::Wav { source, .. } => Some(source),
            AppError::Message(_) => None,
        }
    }
}

pub type AppResult<T> = Result<T, AppError>;

pub struct TermResult(pub AppResult<()>);

impl Termination for TermResult {
    fn report(self) -> ExitCode {
        match self.0 {
            Ok(_) => ExitCode::SUCCESS,
            Err(err) => {
                error!("{}", err);
                ExitCode::FAILURE
            }
        }
    }
}

// Convert boxed dynamic errors into AppError
impl From<Box<dyn std::error::Error>> for AppError {
    fn from(err: Box<dyn std::error::Error>) -> Self {
        AppError::Message(err.to_string())
    }
}
