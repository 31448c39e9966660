//! Engine error type.

use crate::graph::{ParamId, UnitKind};

/// Error type for graph and engine operations.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum EngineError {
    /// Handle does not name a live unit (removed or never created)
    UnknownUnit,
    /// The unit kind has no such parameter
    ParamNotFound { kind: UnitKind, param: ParamId },
    /// Start/stop called on a unit that is not a scheduled source
    NotASource,
    /// A scheduled source may only be started once
    SourceAlreadyStarted,
    /// Stop scheduled before start
    SourceNotStarted,
    /// Connecting would create a cycle
    WouldCycle,
    /// Operation requires a different unit kind
    KindMismatch { expected: UnitKind, found: UnitKind },
    /// Export requested with no tracks
    EmptyArrangement,
    /// No track with the given id
    UnknownTrack,
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::UnknownUnit => write!(f, "Unknown unit handle"),
            EngineError::ParamNotFound { kind, param } => {
                write!(f, "{:?} has no parameter {:?}", kind, param)
            }
            EngineError::NotASource => write!(f, "Unit is not a scheduled source"),
            EngineError::SourceAlreadyStarted => write!(f, "Source already started"),
            EngineError::SourceNotStarted => write!(f, "Source stopped before start"),
            EngineError::WouldCycle => write!(f, "Connection would create a cycle"),
            EngineError::KindMismatch { expected, found } => {
                write!(f, "Expected {:?} unit, found {:?}", expected, found)
            }
            EngineError::EmptyArrangement => write!(f, "No tracks to export"),
            EngineError::UnknownTrack => write!(f, "Unknown track"),
        }
    }
}

impl std::error::Error for EngineError {}
