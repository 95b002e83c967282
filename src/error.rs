use std::fmt;
use std::io;
use std::path::PathBuf;

use crate::wav_file::fourcc_to_string;

/// Errors raised by the WAVE codec and the byte order helpers.
#[derive(Debug)]
pub enum Error {
    /// The stream does not start with a `RIFF`/`WAVE` record.
    NotAContainer,
    /// The chunk scan reached end of stream without finding the tag.
    ChunkNotFound([u8; 4]),
    /// The fmt chunk declares a bit depth there is no decoder for.
    UnsupportedSampleWidth { bits: u16 },
    /// The fmt chunk is present but unusable.
    MalformedFormat(&'static str),
    /// Fewer samples than requested could be read.
    ShortRead { requested: usize, read: usize },
    /// Fewer samples than requested could be written.
    ShortWrite { requested: usize, written: usize },
    /// A file could not be opened or created.
    StreamOpen { path: PathBuf, source: io::Error },
    /// The output grew past what the 32 bit RIFF size fields can describe.
    FileTooLarge(u64),
    /// Byte reversal was asked for a width outside 2, 3, 4, 8 and 16.
    UnsupportedFlipWidth(usize),
    IoError(io::Error),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::NotAContainer => {
                f.write_str("A wav file must start with a 'RIFF' record of type 'WAVE'.")
            }
            Error::ChunkNotFound(tag) => {
                write!(f, "No '{}' chunk found before end of file.", fourcc_to_string(tag))
            }
            Error::UnsupportedSampleWidth { bits } => write!(
                f,
                "Unsupported sample width of {} bits; only 16 bit PCM can be decoded.",
                bits
            ),
            Error::MalformedFormat(what) => write!(f, "Malformed fmt chunk: {}.", what),
            Error::ShortRead { requested, read } => write!(
                f,
                "Short read: requested {} samples but only {} were available.",
                requested, read
            ),
            Error::ShortWrite { requested, written } => write!(
                f,
                "Short write: requested {} samples but only {} were written.",
                requested, written
            ),
            Error::StreamOpen { path, source } => {
                write!(f, "Failed opening {}: {}", path.display(), source)
            }
            Error::FileTooLarge(size) => write!(
                f,
                "A wav file can't describe {} bytes; the limit is {} bytes.",
                size,
                u32::MAX
            ),
            Error::UnsupportedFlipWidth(width) => {
                write!(f, "Can't flip the byte order of a {} byte value.", width)
            }
            Error::IoError(io_error) => write!(f, "IO error: {}", io_error),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::StreamOpen { source, .. } => Some(source),
            Error::IoError(io_error) => Some(io_error),
            _ => None,
        }
    }
}

impl From<io::Error> for Error {
    fn from(error: io::Error) -> Self {
        Error::IoError(error)
    }
}
