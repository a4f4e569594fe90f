// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Time segment sampling.
//!
//! A grounding only annotates frames picked by a uniform arithmetic
//! progression over `[start_frame, end_frame]`. Sampling is strict: when
//! `end_frame` is not reached exactly by the progression it is left out.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Sample `start, start + interval, ...` up to and including the last value
/// not past `end`.
///
/// Fails with [`Error::InvalidRange`] when `start > end` or `interval < 1`.
pub fn sample(start: u32, end: u32, interval: u32) -> Result<Vec<u32>> {
    if start > end || interval < 1 {
        return Err(Error::InvalidRange { start, end, interval });
    }
    Ok((start..=end).step_by(interval as usize).collect())
}

/// The sampled window of a grounding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSegment {
    pub start_frame: u32,
    pub end_frame: u32,
    pub interval: u32,
    pub sampled_frames: Vec<u32>,
}

impl TimeSegment {
    /// Validate the range and derive the sampled frames.
    pub fn new(start_frame: u32, end_frame: u32, interval: u32) -> Result<Self> {
        let sampled_frames = sample(start_frame, end_frame, interval)?;
        Ok(Self {
            start_frame,
            end_frame,
            interval,
            sampled_frames,
        })
    }

    pub fn len(&self) -> usize {
        self.sampled_frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sampled_frames.is_empty()
    }

    pub fn contains(&self, frame: u32) -> bool {
        self.sampled_frames.binary_search(&frame).is_ok()
    }

    /// Segment index of a sampled frame.
    pub fn position_of(&self, frame: u32) -> Option<usize> {
        self.sampled_frames.binary_search(&frame).ok()
    }

    /// Sampled frame at a segment index.
    pub fn frame_at(&self, index: usize) -> Option<u32> {
        self.sampled_frames.get(index).copied()
    }

    pub fn first(&self) -> Option<u32> {
        self.sampled_frames.first().copied()
    }

    pub fn last(&self) -> Option<u32> {
        self.sampled_frames.last().copied()
    }

    /// First sampled frame after `frame`.
    pub fn next_sample(&self, frame: u32) -> Option<u32> {
        let idx = self.sampled_frames.partition_point(|&f| f <= frame);
        self.frame_at(idx)
    }

    /// Last sampled frame before `frame`.
    pub fn prev_sample(&self, frame: u32) -> Option<u32> {
        let idx = self.sampled_frames.partition_point(|&f| f < frame);
        idx.checked_sub(1).and_then(|i| self.frame_at(i))
    }

    /// Move `delta` raw frames from `frame`, staying within the sampled
    /// window.
    pub fn step_frames(&self, frame: u32, delta: i64) -> Option<u32> {
        let (first, last) = (self.first()?, self.last()?);
        let target = (frame as i64 + delta).clamp(first as i64, last as i64);
        Some(target as u32)
    }

    /// Whether `sampled_frames` is exactly the sampling of this window.
    ///
    /// The strict progression is accepted, as is the progression followed
    /// by `end_frame` when the interval does not land on it, so files that
    /// force-included the end frame stay loadable.
    pub fn is_consistent(&self) -> bool {
        let Ok(expected) = sample(self.start_frame, self.end_frame, self.interval) else {
            return false;
        };
        if self.sampled_frames == expected {
            return true;
        }
        match self.sampled_frames.split_last() {
            Some((&last, head)) => {
                last == self.end_frame && expected.last() != Some(&self.end_frame) && head == expected.as_slice()
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_exact_end() {
        let frames = sample(0, 100, 10).unwrap();
        assert_eq!(frames.len(), 11);
        assert_eq!(frames.first(), Some(&0));
        assert_eq!(frames.last(), Some(&100));
    }

    #[test]
    fn test_sample_end_not_reached_is_excluded() {
        let frames = sample(0, 95, 10).unwrap();
        assert_eq!(frames, vec![0, 10, 20, 30, 40, 50, 60, 70, 80, 90]);
    }

    #[test]
    fn test_sample_single_frame_and_unit_interval() {
        assert_eq!(sample(7, 7, 5).unwrap(), vec![7]);
        assert_eq!(sample(3, 6, 1).unwrap(), vec![3, 4, 5, 6]);
    }

    #[test]
    fn test_sample_rejects_bad_input() {
        assert!(matches!(sample(10, 5, 1), Err(Error::InvalidRange { .. })));
        assert!(matches!(sample(0, 5, 0), Err(Error::InvalidRange { .. })));
    }

    #[test]
    fn test_sample_properties() {
        for start in [0u32, 1, 13, 250] {
            for len in [0u32, 1, 9, 10, 99] {
                for interval in [1u32, 2, 7, 10, 100] {
                    let end = start + len;
                    let a = sample(start, end, interval).unwrap();
                    let b = sample(start, end, interval).unwrap();
                    assert_eq!(a, b);
                    assert_eq!(a[0], start);
                    assert!(a.windows(2).all(|w| w[0] < w[1]));
                    assert!(a.iter().all(|&f| f >= start && f <= end));
                    assert!(a.iter().all(|&f| (f - start) % interval == 0));
                }
            }
        }
    }

    #[test]
    fn test_navigation() {
        let seg = TimeSegment::new(10, 50, 10).unwrap();
        assert_eq!(seg.next_sample(10), Some(20));
        assert_eq!(seg.next_sample(15), Some(20));
        assert_eq!(seg.next_sample(50), None);
        assert_eq!(seg.prev_sample(10), None);
        assert_eq!(seg.prev_sample(35), Some(30));
        assert_eq!(seg.position_of(40), Some(3));
        assert_eq!(seg.position_of(41), None);
        assert_eq!(seg.step_frames(45, 100), Some(50));
        assert_eq!(seg.step_frames(12, -100), Some(10));
    }

    #[test]
    fn test_consistency_accepts_forced_end() {
        let mut seg = TimeSegment::new(0, 95, 10).unwrap();
        assert!(seg.is_consistent());
        seg.sampled_frames.push(95);
        assert!(seg.is_consistent());
        seg.sampled_frames.push(96);
        assert!(!seg.is_consistent());

        let unordered = TimeSegment {
            start_frame: 0,
            end_frame: 20,
            interval: 10,
            sampled_frames: vec![10, 0],
        };
        assert!(!unordered.is_consistent());
    }

    #[test]
    fn test_consistency_rejects_partial_sampling() {
        let mut seg = TimeSegment::new(0, 100, 10).unwrap();
        seg.sampled_frames = vec![10, 50];
        assert!(!seg.is_consistent());

        seg.sampled_frames = vec![0, 10, 20];
        assert!(!seg.is_consistent());

        // Forcing an end frame the progression already reaches duplicates it.
        seg.sampled_frames = sample(0, 100, 10).unwrap();
        seg.sampled_frames.push(100);
        assert!(!seg.is_consistent());
    }
}
