//! Controller error type.

use bg_audio::AudioError;
use bg_engine::EngineError;
use bg_formats::FormatError;

/// Anything a controller operation can fail with.
#[derive(Debug, Clone, PartialEq)]
pub enum MasterError {
    Engine(EngineError),
    Audio(AudioError),
    Format(FormatError),
}

impl std::fmt::Display for MasterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MasterError::Engine(e) => write!(f, "{}", e),
            MasterError::Audio(e) => write!(f, "{}", e),
            MasterError::Format(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for MasterError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            MasterError::Engine(e) => Some(e),
            MasterError::Audio(e) => Some(e),
            MasterError::Format(e) => Some(e),
        }
    }
}

impl From<EngineError> for MasterError {
    fn from(e: EngineError) -> Self {
        MasterError::Engine(e)
    }
}

impl From<AudioError> for MasterError {
    fn from(e: AudioError) -> Self {
        MasterError::Audio(e)
    }
}

impl From<FormatError> for MasterError {
    fn from(e: FormatError) -> Self {
        MasterError::Format(e)
    }
}
