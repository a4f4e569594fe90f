// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Question/answer sessions grounded in tracks and sampled frames.

use super::time_segment::TimeSegment;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// The sampled frames a QA answer depends on.
///
/// `frame_indices[i] == sampled_frames[time_segment_indices[i]]` always
/// holds; the two lists are built together and never edited apart.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TemporalGrounding {
    pub time_segment_indices: Vec<usize>,
    pub frame_indices: Vec<u32>,
}

impl TemporalGrounding {
    /// Resolve segment indices against `segment`. Indices are sorted and
    /// deduplicated.
    pub fn resolve(segment: &TimeSegment, indices: &[usize]) -> Result<Self> {
        let mut time_segment_indices = indices.to_vec();
        time_segment_indices.sort_unstable();
        time_segment_indices.dedup();

        let frame_indices = time_segment_indices
            .iter()
            .map(|&index| {
                segment.frame_at(index).ok_or(Error::IndexOutOfRange {
                    index,
                    len: segment.len(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            time_segment_indices,
            frame_indices,
        })
    }

    /// Whether both views agree with `segment`.
    pub fn is_consistent(&self, segment: &TimeSegment) -> bool {
        self.time_segment_indices.len() == self.frame_indices.len()
            && self
                .time_segment_indices
                .iter()
                .zip(&self.frame_indices)
                .all(|(&index, &frame)| segment.frame_at(index) == Some(frame))
    }
}

/// Editable content of a QA session, as entered by the annotator.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct QaDraft {
    pub question_category: String,
    pub question: String,
    pub answer: String,
    pub grounded_objects: Vec<String>,
    pub time_segment_indices: Vec<usize>,
}

/// One question/answer pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QaSession {
    pub qa_id: u32,
    pub question_category: String,
    pub question: String,
    pub answer: String,
    pub grounded_objects: Vec<String>,
    pub temporal_grounding: TemporalGrounding,
}

impl QaSession {
    pub fn grounds(&self, track_id: &str) -> bool {
        self.grounded_objects.iter().any(|t| t == track_id)
    }

    /// Back to an editable draft.
    pub fn to_draft(&self) -> QaDraft {
        QaDraft {
            question_category: self.question_category.clone(),
            question: self.question.clone(),
            answer: self.answer.clone(),
            grounded_objects: self.grounded_objects.clone(),
            time_segment_indices: self.temporal_grounding.time_segment_indices.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_derives_frames() {
        let seg = TimeSegment::new(0, 100, 10).unwrap();
        let tg = TemporalGrounding::resolve(&seg, &[3, 1, 3]).unwrap();
        assert_eq!(tg.time_segment_indices, vec![1, 3]);
        assert_eq!(tg.frame_indices, vec![10, 30]);
        assert!(tg.is_consistent(&seg));
    }

    #[test]
    fn test_resolve_rejects_out_of_range() {
        let seg = TimeSegment::new(0, 100, 10).unwrap();
        let err = TemporalGrounding::resolve(&seg, &[11]).unwrap_err();
        assert!(matches!(err, Error::IndexOutOfRange { index: 11, len: 11 }));
    }

    #[test]
    fn test_inconsistent_views_detected() {
        let seg = TimeSegment::new(0, 100, 10).unwrap();
        let tg = TemporalGrounding {
            time_segment_indices: vec![2],
            frame_indices: vec![30],
        };
        assert!(!tg.is_consistent(&seg));
    }
}
