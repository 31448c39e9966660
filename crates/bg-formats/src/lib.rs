//! File formats for the beatgrid step sequencer.
//!
//! Writes rendered mixdowns as 16-bit PCM RIFF/WAVE and reads WAV files
//! into sample buffers for the sample voice.

mod wav_format;

pub use wav_format::{buffer_to_wav, load_wav, load_wav_file, save_wav_file, write_wav};

/// Error type for format parsing and writing.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FormatError {
    /// Invalid file header, magic bytes or missing chunk
    InvalidHeader,
    /// Unexpected end of file
    UnexpectedEof,
    /// Valid container with an encoding or layout we do not handle
    Unsupported,
    /// I/O error
    Io(String),
}

impl std::fmt::Display for FormatError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FormatError::InvalidHeader => write!(f, "Invalid WAV header"),
            FormatError::UnexpectedEof => write!(f, "Unexpected end of file"),
            FormatError::Unsupported => write!(f, "Unsupported WAV encoding"),
            FormatError::Io(msg) => write!(f, "I/O error: {}", msg),
        }
    }
}

impl std::error::Error for FormatError {}

impl From<std::io::Error> for FormatError {
    fn from(e: std::io::Error) -> Self {
        if e.kind() == std::io::ErrorKind::UnexpectedEof {
            FormatError::UnexpectedEof
        } else {
            FormatError::Io(e.to_string())
        }
    }
}
