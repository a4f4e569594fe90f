// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Error types for the annotation engine.
//!
//! Every store, sampler and codec operation returns [`Result`], and every
//! failure maps onto one of four broad kinds (see [`ErrorKind`]) so the UI
//! shell can decide how to present it.

use std::fmt;

/// Broad error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad time segment, object set or box geometry.
    Validation,
    /// Unknown track, QA session or grounding.
    Reference,
    /// Input that contradicts existing annotation state.
    Consistency,
    /// Malformed or unreadable document, or a failed write.
    Persistence,
}

/// The specific invariant a loaded document breaks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Violation {
    Parse(String),
    InvalidTimeSegment { grounding_id: u32 },
    SampledFrames { grounding_id: u32 },
    EmptyObjectSet { grounding_id: u32 },
    DuplicateGroundingId(u32),
    FrameNotSampled { grounding_id: u32, frame: u32 },
    DegenerateBox { grounding_id: u32, frame: u32, track_id: String },
    BoxOutOfFrame { grounding_id: u32, frame: u32, track_id: String },
    TrackTypeConflict { grounding_id: u32, track_id: String },
    MalformedTrackId { grounding_id: u32, frame: u32, track_id: String },
    DuplicateTrackInFrame { grounding_id: u32, frame: u32, track_id: String },
    DuplicateQaId { grounding_id: u32, qa_id: u32 },
    UnknownGroundedTrack { grounding_id: u32, qa_id: u32, track_id: String },
    TemporalGrounding { grounding_id: u32, qa_id: u32 },
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Violation::Parse(msg) => write!(f, "parse error: {}", msg),
            Violation::InvalidTimeSegment { grounding_id } => {
                write!(f, "grounding {}: invalid time segment", grounding_id)
            }
            Violation::SampledFrames { grounding_id } => write!(
                f,
                "grounding {}: sampled_frames do not follow the time segment",
                grounding_id
            ),
            Violation::EmptyObjectSet { grounding_id } => {
                write!(f, "grounding {}: selected_objects is empty", grounding_id)
            }
            Violation::DuplicateGroundingId(id) => write!(f, "duplicate grounding_id {}", id),
            Violation::FrameNotSampled { grounding_id, frame } => write!(
                f,
                "grounding {}: annotations key {} is not a sampled frame",
                grounding_id, frame
            ),
            Violation::DegenerateBox { grounding_id, frame, track_id } => write!(
                f,
                "grounding {}: box {} at frame {} has no area",
                grounding_id, track_id, frame
            ),
            Violation::BoxOutOfFrame { grounding_id, frame, track_id } => write!(
                f,
                "grounding {}: box {} at frame {} exceeds the frame resolution",
                grounding_id, track_id, frame
            ),
            Violation::TrackTypeConflict { grounding_id, track_id } => write!(
                f,
                "grounding {}: track {} is used with more than one object type",
                grounding_id, track_id
            ),
            Violation::MalformedTrackId { grounding_id, frame, track_id } => write!(
                f,
                "grounding {}: track id {} at frame {} does not match its object type",
                grounding_id, track_id, frame
            ),
            Violation::DuplicateTrackInFrame { grounding_id, frame, track_id } => write!(
                f,
                "grounding {}: track {} appears twice at frame {}",
                grounding_id, track_id, frame
            ),
            Violation::DuplicateQaId { grounding_id, qa_id } => {
                write!(f, "grounding {}: duplicate qa_id {}", grounding_id, qa_id)
            }
            Violation::UnknownGroundedTrack { grounding_id, qa_id, track_id } => write!(
                f,
                "grounding {}: qa {} references unknown track {}",
                grounding_id, qa_id, track_id
            ),
            Violation::TemporalGrounding { grounding_id, qa_id } => write!(
                f,
                "grounding {}: qa {} frame_indices disagree with time_segment_indices",
                grounding_id, qa_id
            ),
        }
    }
}

/// Errors raised by the annotation engine.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("invalid time segment: start {start}, end {end}, interval {interval}")]
    InvalidRange { start: u32, end: u32, interval: u32 },

    #[error("a grounding needs at least one object type")]
    EmptyObjectSet,

    #[error("object type '{0}' is not selected in this grounding")]
    InvalidObjectType(String),

    #[error("degenerate box: width {width}, height {height}")]
    DegenerateBox { width: i64, height: i64 },

    #[error("frame {0} is not a sampled frame")]
    FrameNotSampled(u32),

    #[error("track '{track_id}' belongs to '{existing}', not '{requested}'")]
    TrackTypeConflict {
        track_id: String,
        existing: String,
        requested: String,
    },

    #[error("track id '{track_id}' is not of the form '{object_type}_NNN'")]
    MalformedTrackId { track_id: String, object_type: String },

    #[error("track '{track_id}' already has a box at frame {frame}")]
    DuplicateTrackInFrame { track_id: String, frame: u32 },

    #[error("no box for track '{track_id}' at frame {frame}")]
    BoxNotFound { frame: u32, track_id: String },

    #[error("track '{0}' has no box in this grounding")]
    UnknownTrack(String),

    #[error("time segment index {index} out of range ({len} sampled frames)")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("QA session {0} not found")]
    QaNotFound(u32),

    #[error("grounding {0} not found")]
    UnknownGrounding(u32),

    #[error("grounding {0} is not the active grounding")]
    InactiveGrounding(u32),

    #[error("object type '{0}' is still used by bounding boxes")]
    ObjectTypeInUse(String),

    #[error("track '{track_id}' is grounded by QA session {qa_id}")]
    TrackInUse { track_id: String, qa_id: u32 },

    #[error("malformed document: {0}")]
    MalformedDocument(Violation),

    #[error("failed to serialize document: {0}")]
    Serialize(String),

    #[error("unsupported document format: {0}")]
    UnsupportedFormat(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// The broad category this error falls into.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidRange { .. }
            | Error::EmptyObjectSet
            | Error::InvalidObjectType(_)
            | Error::DegenerateBox { .. }
            | Error::MalformedTrackId { .. }
            | Error::FrameNotSampled(_)
            | Error::IndexOutOfRange { .. } => ErrorKind::Validation,
            Error::BoxNotFound { .. }
            | Error::UnknownTrack(_)
            | Error::QaNotFound(_)
            | Error::UnknownGrounding(_)
            | Error::InactiveGrounding(_) => ErrorKind::Reference,
            Error::TrackTypeConflict { .. }
            | Error::DuplicateTrackInFrame { .. }
            | Error::ObjectTypeInUse(_)
            | Error::TrackInUse { .. } => ErrorKind::Consistency,
            Error::MalformedDocument(_)
            | Error::Serialize(_)
            | Error::UnsupportedFormat(_)
            | Error::Io(_) => ErrorKind::Persistence,
        }
    }
}

/// Result alias used throughout the engine.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(Error::EmptyObjectSet.kind(), ErrorKind::Validation);
        assert_eq!(Error::UnknownTrack("car_001".into()).kind(), ErrorKind::Reference);
        assert_eq!(
            Error::TrackTypeConflict {
                track_id: "car_001".into(),
                existing: "car".into(),
                requested: "person".into(),
            }
            .kind(),
            ErrorKind::Consistency
        );
        assert_eq!(
            Error::MalformedDocument(Violation::Parse("eof".into())).kind(),
            ErrorKind::Persistence
        );
        assert_eq!(Error::Serialize("key must be a string".into()).kind(), ErrorKind::Persistence);
    }

    #[test]
    fn test_violation_message_names_the_invariant() {
        let err = Error::MalformedDocument(Violation::TemporalGrounding {
            grounding_id: 2,
            qa_id: 1,
        });
        let msg = err.to_string();
        assert!(msg.contains("grounding 2"));
        assert!(msg.contains("frame_indices"));
    }
}
