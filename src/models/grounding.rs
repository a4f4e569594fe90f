// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! A grounding: one time-windowed annotation session.
//!
//! A grounding owns its sampled window, the object categories the annotator
//! picked, the per-frame bounding boxes and the QA sessions built on top of
//! them. All edits go through methods that keep those parts consistent:
//! boxes only land on sampled frames, track ids keep one object type, QA
//! sessions only reference tracks that have a box.

use super::annotation::{BoundingBox, Resolution};
use super::qa::{QaDraft, QaSession, TemporalGrounding};
use super::time_segment::TimeSegment;
use super::track::{self, TrackRegistry};
use crate::error::{Error, Result, Violation};
use crate::util::geometry::Rect;
use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// Sampled frame index → boxes on that frame, in insertion order.
pub type FrameBoxes = BTreeMap<u32, Vec<BoundingBox>>;

/// How far the annotator is through the sampled frames.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Progress {
    pub annotated: usize,
    pub total: usize,
    /// Segment indices with no box yet.
    pub remaining: Vec<usize>,
}

impl Progress {
    pub fn is_complete(&self) -> bool {
        self.annotated == self.total
    }

    pub fn ratio(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.annotated as f64 / self.total as f64
        }
    }
}

/// Min/max/mean of one box dimension.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
}

impl Summary {
    fn of(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }
        let min = values.iter().copied().fold(f64::INFINITY, f64::min);
        let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let mean = values.iter().sum::<f64>() / values.len() as f64;
        Some(Self { min, max, mean })
    }
}

/// Box counts and size distribution.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BoxStatistics {
    pub total: usize,
    pub by_object_type: BTreeMap<String, usize>,
    pub by_track: BTreeMap<String, usize>,
    pub width: Option<Summary>,
    pub height: Option<Summary>,
    pub area: Option<Summary>,
}

/// One annotation session over a sampled time window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Grounding {
    grounding_id: u32,
    #[serde(with = "iso8601")]
    created_at: DateTime<FixedOffset>,
    time_segment: TimeSegment,
    selected_objects: BTreeSet<String>,
    annotations: FrameBoxes,
    qa_sessions: Vec<QaSession>,
    #[serde(skip)]
    registry: TrackRegistry,
}

/// Equality covers persisted state only; the registry is derived.
impl PartialEq for Grounding {
    fn eq(&self, other: &Self) -> bool {
        self.grounding_id == other.grounding_id
            && self.created_at == other.created_at
            && self.time_segment == other.time_segment
            && self.selected_objects == other.selected_objects
            && self.annotations == other.annotations
            && self.qa_sessions == other.qa_sessions
    }
}

impl Grounding {
    /// Start a grounding over `time_segment` for the given object types.
    pub fn new<I, S>(
        grounding_id: u32,
        created_at: DateTime<FixedOffset>,
        time_segment: TimeSegment,
        objects: I,
    ) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let selected_objects: BTreeSet<String> = objects
            .into_iter()
            .map(|s| {
                let s: String = s.into();
                s.trim().to_string()
            })
            .filter(|s| !s.is_empty())
            .collect();
        if selected_objects.is_empty() {
            return Err(Error::EmptyObjectSet);
        }
        Ok(Self {
            grounding_id,
            created_at,
            time_segment,
            selected_objects,
            annotations: FrameBoxes::new(),
            qa_sessions: Vec::new(),
            registry: TrackRegistry::new(),
        })
    }

    pub fn id(&self) -> u32 {
        self.grounding_id
    }

    pub fn created_at(&self) -> DateTime<FixedOffset> {
        self.created_at
    }

    pub fn time_segment(&self) -> &TimeSegment {
        &self.time_segment
    }

    pub fn selected_objects(&self) -> &BTreeSet<String> {
        &self.selected_objects
    }

    pub fn annotations(&self) -> &FrameBoxes {
        &self.annotations
    }

    pub fn qa_sessions(&self) -> &[QaSession] {
        &self.qa_sessions
    }

    pub fn qa_session(&self, qa_id: u32) -> Option<&QaSession> {
        self.qa_sessions.iter().find(|qa| qa.qa_id == qa_id)
    }

    pub(crate) fn registry(&self) -> &TrackRegistry {
        &self.registry
    }

    /// Boxes on `frame`; empty for frames without boxes.
    pub fn boxes_at(&self, frame: u32) -> &[BoundingBox] {
        self.annotations.get(&frame).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn find_box(&self, frame: u32, track_id: &str) -> Option<&BoundingBox> {
        self.boxes_at(frame).iter().find(|b| b.track_id == track_id)
    }

    /// Whether `track_id` has a box on any frame.
    pub fn has_track(&self, track_id: &str) -> bool {
        self.annotations
            .values()
            .flatten()
            .any(|b| b.track_id == track_id)
    }

    /// Every track id that currently has a box, sorted.
    pub fn track_ids(&self) -> Vec<String> {
        let ids: BTreeSet<&str> = self
            .annotations
            .values()
            .flatten()
            .map(|b| b.track_id.as_str())
            .collect();
        ids.into_iter().map(str::to_string).collect()
    }

    /// Known tracks and their object types, including tracks whose boxes
    /// were all deleted.
    pub fn known_tracks(&self) -> Vec<(String, String)> {
        self.registry
            .tracks()
            .map(|(track_id, object_type)| (track_id.to_string(), object_type.to_string()))
            .collect()
    }

    /// The track id the next automatic allocation for `object_type` gives.
    pub fn suggest_track_id(&self, object_type: &str) -> String {
        self.registry.peek(object_type)
    }

    pub fn progress(&self) -> Progress {
        let remaining: Vec<usize> = self
            .time_segment
            .sampled_frames
            .iter()
            .enumerate()
            .filter(|(_, f)| self.boxes_at(**f).is_empty())
            .map(|(i, _)| i)
            .collect();
        let total = self.time_segment.len();
        Progress {
            annotated: total - remaining.len(),
            total,
            remaining,
        }
    }

    pub fn statistics(&self) -> BoxStatistics {
        let mut stats = BoxStatistics::default();
        let mut widths = Vec::new();
        let mut heights = Vec::new();
        let mut areas = Vec::new();
        for b in self.annotations.values().flatten() {
            stats.total += 1;
            *stats.by_object_type.entry(b.object_type.clone()).or_insert(0) += 1;
            *stats.by_track.entry(b.track_id.clone()).or_insert(0) += 1;
            widths.push(b.width as f64);
            heights.push(b.height as f64);
            areas.push(b.area() as f64);
        }
        stats.width = Summary::of(&widths);
        stats.height = Summary::of(&heights);
        stats.area = Summary::of(&areas);
        stats
    }

    fn ensure_sampled(&self, frame: u32) -> Result<()> {
        if self.time_segment.contains(frame) {
            Ok(())
        } else {
            Err(Error::FrameNotSampled(frame))
        }
    }

    fn box_mut(&mut self, frame: u32, track_id: &str) -> Result<&mut BoundingBox> {
        self.annotations
            .get_mut(&frame)
            .and_then(|boxes| boxes.iter_mut().find(|b| b.track_id == track_id))
            .ok_or_else(|| Error::BoxNotFound {
                frame,
                track_id: track_id.to_string(),
            })
    }

    /// Place a box on a sampled frame and return its track id.
    ///
    /// Without a track id a new one is allocated. A supplied id either
    /// starts a new track or continues one of the same object type.
    pub(crate) fn add_box(
        &mut self,
        frame: u32,
        rect: Rect,
        object_type: &str,
        track_id: Option<&str>,
        resolution: &Resolution,
    ) -> Result<String> {
        self.ensure_sampled(frame)?;
        let rect = clip(rect, resolution)?;
        if !self.selected_objects.contains(object_type) {
            return Err(Error::InvalidObjectType(object_type.to_string()));
        }

        let track_id = match track_id.map(str::trim).filter(|t| !t.is_empty()) {
            Some(id) => {
                self.registry.check(id, object_type)?;
                if self.registry.object_type_of(id).is_none() {
                    track::check_format(id, object_type)?;
                }
                if self.find_box(frame, id).is_some() {
                    return Err(Error::DuplicateTrackInFrame {
                        track_id: id.to_string(),
                        frame,
                    });
                }
                self.registry.observe(id, object_type);
                id.to_string()
            }
            None => self.registry.allocate(object_type, &self.selected_objects)?,
        };

        self.annotations
            .entry(frame)
            .or_default()
            .push(BoundingBox::from_rect(rect, object_type, track_id.as_str()));
        log::info!(
            "Grounding {}: added {} ({}) at frame {}",
            self.grounding_id,
            track_id,
            object_type,
            frame
        );
        Ok(track_id)
    }

    /// Move a box, sliding it back inside the frame if needed.
    pub(crate) fn move_box(
        &mut self,
        frame: u32,
        track_id: &str,
        rect: Rect,
        resolution: &Resolution,
    ) -> Result<Rect> {
        self.ensure_sampled(frame)?;
        reject_degenerate(&rect)?;
        let placed = if resolution_known(resolution) {
            rect.shifted_into(&resolution.bounds())
        } else {
            rect
        };
        self.box_mut(frame, track_id)?.set_rect(placed);
        log::debug!("Grounding {}: moved {} at frame {}", self.grounding_id, track_id, frame);
        Ok(placed)
    }

    /// Resize a box, clipping it to the frame.
    pub(crate) fn resize_box(
        &mut self,
        frame: u32,
        track_id: &str,
        rect: Rect,
        resolution: &Resolution,
    ) -> Result<Rect> {
        self.ensure_sampled(frame)?;
        let placed = clip(rect, resolution)?;
        self.box_mut(frame, track_id)?.set_rect(placed);
        log::debug!("Grounding {}: resized {} at frame {}", self.grounding_id, track_id, frame);
        Ok(placed)
    }

    /// Refuse to drop the last box of a track a QA session grounds.
    fn ensure_removable(&self, frame: u32, track_id: &str) -> Result<()> {
        let elsewhere = self
            .annotations
            .iter()
            .filter(|(f, _)| **f != frame)
            .flat_map(|(_, boxes)| boxes)
            .any(|b| b.track_id == track_id);
        if elsewhere {
            return Ok(());
        }
        match self.qa_sessions.iter().find(|qa| qa.grounds(track_id)) {
            Some(qa) => Err(Error::TrackInUse {
                track_id: track_id.to_string(),
                qa_id: qa.qa_id,
            }),
            None => Ok(()),
        }
    }

    fn remove_at(&mut self, frame: u32, index: usize) -> Option<BoundingBox> {
        let boxes = self.annotations.get_mut(&frame)?;
        if index >= boxes.len() {
            return None;
        }
        let removed = boxes.remove(index);
        if boxes.is_empty() {
            self.annotations.remove(&frame);
        }
        Some(removed)
    }

    /// Delete the box of `track_id` on `frame` only.
    pub(crate) fn delete_box(&mut self, frame: u32, track_id: &str) -> Result<BoundingBox> {
        let index = self
            .boxes_at(frame)
            .iter()
            .position(|b| b.track_id == track_id)
            .ok_or_else(|| Error::BoxNotFound {
                frame,
                track_id: track_id.to_string(),
            })?;
        self.ensure_removable(frame, track_id)?;
        let removed = self.remove_at(frame, index).ok_or_else(|| Error::BoxNotFound {
            frame,
            track_id: track_id.to_string(),
        })?;
        log::info!("Grounding {}: deleted {} at frame {}", self.grounding_id, track_id, frame);
        Ok(removed)
    }

    /// Delete the most recently added box on `frame`, if any.
    pub(crate) fn pop_last_box(&mut self, frame: u32) -> Result<Option<BoundingBox>> {
        let Some(last) = self.boxes_at(frame).last() else {
            return Ok(None);
        };
        let track_id = last.track_id.clone();
        self.ensure_removable(frame, &track_id)?;
        let index = self.boxes_at(frame).len() - 1;
        let removed = self.remove_at(frame, index);
        log::info!("Grounding {}: undid {} at frame {}", self.grounding_id, track_id, frame);
        Ok(removed)
    }

    pub(crate) fn add_object_type(&mut self, object_type: &str) -> Result<()> {
        let object_type = object_type.trim();
        if object_type.is_empty() {
            return Err(Error::InvalidObjectType(object_type.to_string()));
        }
        self.selected_objects.insert(object_type.to_string());
        Ok(())
    }

    pub(crate) fn remove_object_type(&mut self, object_type: &str) -> Result<()> {
        if !self.selected_objects.contains(object_type) {
            return Err(Error::InvalidObjectType(object_type.to_string()));
        }
        if self
            .annotations
            .values()
            .flatten()
            .any(|b| b.object_type == object_type)
        {
            return Err(Error::ObjectTypeInUse(object_type.to_string()));
        }
        if self.selected_objects.len() == 1 {
            return Err(Error::EmptyObjectSet);
        }
        self.selected_objects.remove(object_type);
        Ok(())
    }

    /// Validate a draft into the stored form of a QA session.
    fn build_qa(&self, qa_id: u32, draft: QaDraft) -> Result<QaSession> {
        let mut grounded_objects: Vec<String> = Vec::new();
        for track_id in draft.grounded_objects {
            if !self.has_track(&track_id) {
                return Err(Error::UnknownTrack(track_id));
            }
            if !grounded_objects.contains(&track_id) {
                grounded_objects.push(track_id);
            }
        }
        let temporal_grounding =
            TemporalGrounding::resolve(&self.time_segment, &draft.time_segment_indices)?;
        Ok(QaSession {
            qa_id,
            question_category: draft.question_category,
            question: draft.question,
            answer: draft.answer,
            grounded_objects,
            temporal_grounding,
        })
    }

    pub(crate) fn add_qa(&mut self, draft: QaDraft) -> Result<u32> {
        let qa_id = self.qa_sessions.iter().map(|qa| qa.qa_id).max().unwrap_or(0) + 1;
        let qa = self.build_qa(qa_id, draft)?;
        self.qa_sessions.push(qa);
        log::info!("Grounding {}: added QA {}", self.grounding_id, qa_id);
        Ok(qa_id)
    }

    pub(crate) fn update_qa(&mut self, qa_id: u32, draft: QaDraft) -> Result<()> {
        let position = self
            .qa_sessions
            .iter()
            .position(|qa| qa.qa_id == qa_id)
            .ok_or(Error::QaNotFound(qa_id))?;
        let qa = self.build_qa(qa_id, draft)?;
        self.qa_sessions[position] = qa;
        log::info!("Grounding {}: updated QA {}", self.grounding_id, qa_id);
        Ok(())
    }

    pub(crate) fn delete_qa(&mut self, qa_id: u32) -> Result<QaSession> {
        let position = self
            .qa_sessions
            .iter()
            .position(|qa| qa.qa_id == qa_id)
            .ok_or(Error::QaNotFound(qa_id))?;
        log::info!("Grounding {}: deleted QA {}", self.grounding_id, qa_id);
        Ok(self.qa_sessions.remove(position))
    }

    /// Fold an earlier registry in so restoring a snapshot never rewinds
    /// track allocation.
    pub(crate) fn absorb_registry(&mut self, other: &TrackRegistry) {
        self.registry.absorb(other);
    }

    /// Rebuild the track registry from the boxes, after deserialization.
    pub(crate) fn rebuild_registry(&mut self) {
        let mut registry = TrackRegistry::new();
        for b in self.annotations.values().flatten() {
            registry.observe(&b.track_id, &b.object_type);
        }
        self.registry = registry;
    }

    /// Check every persisted invariant. `resolution` of zero skips the
    /// frame bounds check.
    pub fn validate(&self, resolution: &Resolution) -> std::result::Result<(), Violation> {
        let grounding_id = self.grounding_id;
        let seg = &self.time_segment;
        if seg.start_frame > seg.end_frame || seg.interval < 1 {
            return Err(Violation::InvalidTimeSegment { grounding_id });
        }
        if seg.is_empty() || !seg.is_consistent() {
            return Err(Violation::SampledFrames { grounding_id });
        }
        if self.selected_objects.is_empty() {
            return Err(Violation::EmptyObjectSet { grounding_id });
        }

        let mut track_types: BTreeMap<&str, &str> = BTreeMap::new();
        for (&frame, boxes) in &self.annotations {
            if !seg.contains(frame) {
                return Err(Violation::FrameNotSampled { grounding_id, frame });
            }
            let mut in_frame: HashSet<&str> = HashSet::new();
            for b in boxes {
                let track_id = b.track_id.clone();
                if b.width == 0 || b.height == 0 {
                    return Err(Violation::DegenerateBox { grounding_id, frame, track_id });
                }
                if resolution_known(resolution) && !b.fits(resolution) {
                    return Err(Violation::BoxOutOfFrame { grounding_id, frame, track_id });
                }
                if !in_frame.insert(b.track_id.as_str()) {
                    return Err(Violation::DuplicateTrackInFrame { grounding_id, frame, track_id });
                }
                let known = track_types
                    .entry(b.track_id.as_str())
                    .or_insert(b.object_type.as_str());
                if *known != b.object_type {
                    return Err(Violation::TrackTypeConflict { grounding_id, track_id });
                }
                if track::check_format(&b.track_id, &b.object_type).is_err() {
                    return Err(Violation::MalformedTrackId { grounding_id, frame, track_id });
                }
            }
        }

        let mut qa_ids = HashSet::new();
        for qa in &self.qa_sessions {
            let qa_id = qa.qa_id;
            if !qa_ids.insert(qa_id) {
                return Err(Violation::DuplicateQaId { grounding_id, qa_id });
            }
            if let Some(track_id) = qa
                .grounded_objects
                .iter()
                .find(|t| !track_types.contains_key(t.as_str()))
            {
                return Err(Violation::UnknownGroundedTrack {
                    grounding_id,
                    qa_id,
                    track_id: track_id.clone(),
                });
            }
            if !qa.temporal_grounding.is_consistent(seg) {
                return Err(Violation::TemporalGrounding { grounding_id, qa_id });
            }
        }
        Ok(())
    }
}

fn resolution_known(resolution: &Resolution) -> bool {
    resolution.width > 0 && resolution.height > 0
}

fn reject_degenerate(rect: &Rect) -> Result<()> {
    if rect.is_degenerate() {
        Err(Error::DegenerateBox {
            width: rect.width,
            height: rect.height,
        })
    } else {
        Ok(())
    }
}

/// Reject degenerate input, then clip to the frame.
fn clip(rect: Rect, resolution: &Resolution) -> Result<Rect> {
    reject_degenerate(&rect)?;
    if !resolution_known(resolution) {
        return Ok(rect);
    }
    rect.clipped_to(&resolution.bounds())
        .ok_or(Error::DegenerateBox { width: 0, height: 0 })
}

/// `created_at` is written as RFC 3339. Offset-less ISO-8601 stamps are
/// read as UTC.
mod iso8601 {
    use chrono::{DateTime, FixedOffset, NaiveDateTime, SecondsFormat};
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(
        value: &DateTime<FixedOffset>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_rfc3339_opts(SecondsFormat::AutoSi, false))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<DateTime<FixedOffset>, D::Error> {
        let raw = String::deserialize(deserializer)?;
        if let Ok(value) = DateTime::parse_from_rfc3339(&raw) {
            return Ok(value);
        }
        raw.parse::<NaiveDateTime>()
            .map(|naive| naive.and_utc().fixed_offset())
            .map_err(D::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn res() -> Resolution {
        Resolution::new(640, 480)
    }

    fn grounding() -> Grounding {
        let created = FixedOffset::east_opt(0)
            .unwrap()
            .with_ymd_and_hms(2025, 1, 1, 12, 0, 0)
            .unwrap();
        Grounding::new(1, created, TimeSegment::new(0, 100, 10).unwrap(), ["person", "car"]).unwrap()
    }

    fn rect() -> Rect {
        Rect::new(10, 10, 50, 80)
    }

    #[test]
    fn test_new_rejects_empty_object_set() {
        let created = grounding().created_at();
        let seg = TimeSegment::new(0, 10, 1).unwrap();
        let empty: [&str; 0] = [];
        assert!(matches!(Grounding::new(1, created, seg.clone(), empty), Err(Error::EmptyObjectSet)));
        assert!(matches!(Grounding::new(1, created, seg, ["  "]), Err(Error::EmptyObjectSet)));
    }

    #[test]
    fn test_add_box_allocates_and_continues_track() {
        let mut g = grounding();
        let id = g.add_box(0, rect(), "person", None, &res()).unwrap();
        assert_eq!(id, "person_001");
        let again = g.add_box(10, rect(), "person", Some("person_001"), &res()).unwrap();
        assert_eq!(again, "person_001");
        assert_eq!(g.suggest_track_id("person"), "person_002");
        assert_eq!(g.track_ids(), vec!["person_001".to_string()]);
    }

    #[test]
    fn test_add_box_errors() {
        let mut g = grounding();
        assert!(matches!(
            g.add_box(5, rect(), "person", None, &res()),
            Err(Error::FrameNotSampled(5))
        ));
        assert!(matches!(
            g.add_box(0, Rect::new(0, 0, 0, 10), "person", None, &res()),
            Err(Error::DegenerateBox { .. })
        ));
        assert!(matches!(
            g.add_box(0, rect(), "dog", None, &res()),
            Err(Error::InvalidObjectType(_))
        ));
        g.add_box(0, rect(), "car", None, &res()).unwrap();
        assert!(matches!(
            g.add_box(10, rect(), "person", Some("car_001"), &res()),
            Err(Error::TrackTypeConflict { .. })
        ));
        assert!(matches!(
            g.add_box(0, rect(), "car", Some("car_001"), &res()),
            Err(Error::DuplicateTrackInFrame { .. })
        ));
    }

    #[test]
    fn test_add_box_clamps_to_frame() {
        let mut g = grounding();
        g.add_box(0, Rect::new(600, 400, 100, 100), "car", None, &res()).unwrap();
        assert_eq!(g.boxes_at(0)[0].rect(), Rect::new(600, 400, 40, 80));
        assert!(matches!(
            g.add_box(10, Rect::new(700, 10, 20, 20), "car", None, &res()),
            Err(Error::DegenerateBox { .. })
        ));
    }

    #[test]
    fn test_move_and_resize_stay_in_frame() {
        let mut g = grounding();
        let id = g.add_box(0, rect(), "person", None, &res()).unwrap();
        let moved = g.move_box(0, &id, Rect::new(620, -30, 50, 80), &res()).unwrap();
        assert_eq!(moved, Rect::new(590, 0, 50, 80));
        let resized = g.resize_box(0, &id, Rect::new(500, 400, 300, 300), &res()).unwrap();
        assert_eq!(resized, Rect::new(500, 400, 140, 80));
        assert!(g.boxes_at(0)[0].fits(&res()));
        assert!(matches!(
            g.resize_box(0, &id, Rect::new(0, 0, -5, 10), &res()),
            Err(Error::DegenerateBox { .. })
        ));
        assert!(matches!(
            g.move_box(10, &id, rect(), &res()),
            Err(Error::BoxNotFound { .. })
        ));
    }

    #[test]
    fn test_delete_only_touches_one_frame() {
        let mut g = grounding();
        let id = g.add_box(0, rect(), "person", None, &res()).unwrap();
        g.add_box(10, rect(), "person", Some(&id), &res()).unwrap();
        g.delete_box(0, &id).unwrap();
        assert!(g.boxes_at(0).is_empty());
        assert!(!g.annotations().contains_key(&0));
        assert!(g.find_box(10, &id).is_some());
        assert!(matches!(g.delete_box(0, &id), Err(Error::BoxNotFound { .. })));
    }

    #[test]
    fn test_deleted_track_index_is_not_reused() {
        let mut g = grounding();
        let id = g.add_box(0, rect(), "person", None, &res()).unwrap();
        g.delete_box(0, &id).unwrap();
        let next = g.add_box(0, rect(), "person", None, &res()).unwrap();
        assert_eq!(next, "person_002");
    }

    #[test]
    fn test_pop_last_box() {
        let mut g = grounding();
        g.add_box(0, rect(), "person", None, &res()).unwrap();
        g.add_box(0, Rect::new(100, 100, 20, 20), "car", None, &res()).unwrap();
        let popped = g.pop_last_box(0).unwrap().unwrap();
        assert_eq!(popped.track_id, "car_001");
        assert_eq!(g.boxes_at(0).len(), 1);
        assert!(g.pop_last_box(20).unwrap().is_none());
    }

    #[test]
    fn test_qa_lifecycle() {
        let mut g = grounding();
        let id = g.add_box(0, rect(), "person", None, &res()).unwrap();
        let draft = QaDraft {
            question_category: "General".into(),
            question: "Who walks in?".into(),
            answer: "A person".into(),
            grounded_objects: vec![id.clone(), id.clone()],
            time_segment_indices: vec![2, 0],
        };
        let qa_id = g.add_qa(draft.clone()).unwrap();
        assert_eq!(qa_id, 1);
        let qa = g.qa_session(qa_id).unwrap();
        assert_eq!(qa.grounded_objects, vec![id.clone()]);
        assert_eq!(qa.temporal_grounding.frame_indices, vec![0, 20]);

        let mut edited = draft.clone();
        edited.answer = "Two people".into();
        g.update_qa(qa_id, edited).unwrap();
        assert_eq!(g.qa_session(qa_id).unwrap().answer, "Two people");

        assert!(matches!(
            g.delete_box(0, &id),
            Err(Error::TrackInUse { qa_id: 1, .. })
        ));

        let second = g.add_qa(draft).unwrap();
        assert_eq!(second, 2);
        g.delete_qa(qa_id).unwrap();
        assert!(matches!(g.delete_qa(qa_id), Err(Error::QaNotFound(1))));
        assert_eq!(g.add_qa(QaDraft::default()).unwrap(), 3);
    }

    #[test]
    fn test_qa_rejects_unknown_track_and_bad_index() {
        let mut g = grounding();
        let draft = QaDraft {
            grounded_objects: vec!["car_001".into()],
            ..QaDraft::default()
        };
        assert!(matches!(g.add_qa(draft), Err(Error::UnknownTrack(t)) if t == "car_001"));
        let draft = QaDraft {
            time_segment_indices: vec![11],
            ..QaDraft::default()
        };
        assert!(matches!(g.add_qa(draft), Err(Error::IndexOutOfRange { index: 11, len: 11 })));
        assert!(g.qa_sessions().is_empty());
    }

    #[test]
    fn test_object_type_removal_is_denied_when_referenced() {
        let mut g = grounding();
        g.add_box(0, rect(), "car", None, &res()).unwrap();
        assert!(matches!(g.remove_object_type("car"), Err(Error::ObjectTypeInUse(_))));
        g.add_object_type("dog").unwrap();
        g.remove_object_type("person").unwrap();
        assert!(g.selected_objects().contains("dog"));
        assert!(!g.selected_objects().contains("person"));
        // The box keeps its own copy of the type.
        assert_eq!(g.boxes_at(0)[0].object_type, "car");
    }

    #[test]
    fn test_progress_and_statistics() {
        let mut g = grounding();
        g.add_box(0, Rect::new(0, 0, 10, 20), "person", None, &res()).unwrap();
        g.add_box(20, Rect::new(0, 0, 30, 40), "person", Some("person_001"), &res()).unwrap();
        let progress = g.progress();
        assert_eq!(progress.annotated, 2);
        assert_eq!(progress.total, 11);
        assert_eq!(progress.remaining.first(), Some(&1));
        assert!(!progress.is_complete());

        let stats = g.statistics();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.by_track["person_001"], 2);
        let width = stats.width.unwrap();
        assert_eq!((width.min, width.max, width.mean), (10.0, 30.0, 20.0));
    }

    #[test]
    fn test_validate_detects_violations() {
        let mut g = grounding();
        let id = g.add_box(0, rect(), "person", None, &res()).unwrap();
        assert_eq!(g.validate(&res()), Ok(()));

        let mut bad = g.clone();
        bad.annotations.insert(5, vec![BoundingBox::from_rect(rect(), "person", "person_009")]);
        assert!(matches!(bad.validate(&res()), Err(Violation::FrameNotSampled { frame: 5, .. })));

        let mut bad = g.clone();
        bad.annotations
            .entry(10)
            .or_default()
            .push(BoundingBox::from_rect(rect(), "car", id.as_str()));
        assert!(matches!(bad.validate(&res()), Err(Violation::TrackTypeConflict { .. })));

        let mut bad = g.clone();
        let twin = bad.boxes_at(0)[0].clone();
        bad.annotations.get_mut(&0).unwrap().push(twin);
        assert!(matches!(bad.validate(&res()), Err(Violation::DuplicateTrackInFrame { .. })));

        let mut bad = g.clone();
        bad.annotations.get_mut(&0).unwrap()[0].x = 630;
        assert!(matches!(bad.validate(&res()), Err(Violation::BoxOutOfFrame { .. })));
        assert_eq!(bad.validate(&Resolution::default()), Ok(()));

        let mut bad = g.clone();
        bad.annotations
            .entry(10)
            .or_default()
            .push(BoundingBox::from_rect(rect(), "person", "car_007"));
        assert!(matches!(
            bad.validate(&res()),
            Err(Violation::MalformedTrackId { frame: 10, .. })
        ));
    }

    #[test]
    fn test_add_box_rejects_malformed_track_ids() {
        let mut g = grounding();
        for bad in ["car_007", "banana", "person_7"] {
            assert!(matches!(
                g.add_box(0, rect(), "person", Some(bad), &res()),
                Err(Error::MalformedTrackId { .. })
            ));
        }
        assert!(g.annotations().is_empty());

        // A well-formed hand-picked id starts a track and moves the counter.
        let id = g.add_box(0, rect(), "person", Some("person_005"), &res()).unwrap();
        assert_eq!(id, "person_005");
        assert_eq!(g.suggest_track_id("person"), "person_006");
    }
}
