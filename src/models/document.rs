// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Document state management.
//!
//! The document is the single source of truth for one video: its immutable
//! [`VideoInfo`] and the ordered list of groundings. At most one grounding
//! is active; every mutating call names its target grounding explicitly and
//! is refused unless that grounding is the active one.

use super::annotation::{BoundingBox, Resolution};
use super::grounding::Grounding;
use super::qa::{QaDraft, QaSession};
use super::time_segment::TimeSegment;
use crate::error::{Error, Result};
use crate::util::geometry::Rect;
use serde::{Deserialize, Serialize};

/// Identifier of a grounding within its document.
pub type GroundingId = u32;

/// Immutable description of the annotated video.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoInfo {
    pub filename: String,
    pub total_frames: u32,
    pub fps: f64,
    pub resolution: Resolution,
}

impl VideoInfo {
    pub fn new(filename: impl Into<String>, total_frames: u32, fps: f64, resolution: Resolution) -> Self {
        Self {
            filename: filename.into(),
            total_frames,
            fps,
            resolution,
        }
    }
}

/// Complete annotation document for one video.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    video_info: VideoInfo,
    groundings: Vec<Grounding>,
    #[serde(skip)]
    active: Option<GroundingId>,
}

/// Equality covers persisted state; which grounding is active is session
/// state.
impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        self.video_info == other.video_info && self.groundings == other.groundings
    }
}

impl Document {
    /// Create an empty document for a video.
    pub fn new(video_info: VideoInfo) -> Self {
        Self {
            video_info,
            groundings: Vec::new(),
            active: None,
        }
    }

    pub fn video_info(&self) -> &VideoInfo {
        &self.video_info
    }

    pub fn groundings(&self) -> &[Grounding] {
        &self.groundings
    }

    pub fn grounding(&self, id: GroundingId) -> Option<&Grounding> {
        self.groundings.iter().find(|g| g.id() == id)
    }

    pub fn active_id(&self) -> Option<GroundingId> {
        self.active
    }

    pub fn active(&self) -> Option<&Grounding> {
        self.active.and_then(|id| self.grounding(id))
    }

    /// End the active grounding. It stays in the document, read-only.
    pub fn finish_active_grounding(&mut self) -> Option<GroundingId> {
        let id = self.active.take()?;
        log::info!("Finished grounding {}", id);
        Some(id)
    }

    /// The active grounding, for mutation.
    fn editable(&mut self, id: GroundingId) -> Result<&mut Grounding> {
        if self.active != Some(id) {
            return if self.grounding(id).is_some() {
                Err(Error::InactiveGrounding(id))
            } else {
                Err(Error::UnknownGrounding(id))
            };
        }
        self.groundings
            .iter_mut()
            .find(|g| g.id() == id)
            .ok_or(Error::UnknownGrounding(id))
    }

    /// Start a new grounding over `[start, end]` sampled every `interval`
    /// frames, and make it the active one.
    pub fn create_grounding<I, S>(
        &mut self,
        start: u32,
        end: u32,
        interval: u32,
        objects: I,
    ) -> Result<GroundingId>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let time_segment = TimeSegment::new(start, end, interval)?;
        let total = self.video_info.total_frames;
        if total > 0 && end >= total {
            return Err(Error::InvalidRange { start, end, interval });
        }
        let id = self.groundings.iter().map(Grounding::id).max().unwrap_or(0) + 1;
        let grounding = Grounding::new(id, chrono::Local::now().fixed_offset(), time_segment, objects)?;
        log::info!(
            "Created grounding {} over frames {}..={} every {} ({} samples) for {:?}",
            id,
            start,
            end,
            interval,
            grounding.time_segment().len(),
            grounding.selected_objects()
        );
        self.groundings.push(grounding);
        self.active = Some(id);
        Ok(id)
    }

    /// Drop the active grounding entirely. Returns its object selection so
    /// the caller can offer it again.
    pub fn discard_active_grounding(&mut self) -> Option<Vec<String>> {
        let id = self.active.take()?;
        let position = self.groundings.iter().position(|g| g.id() == id)?;
        let removed = self.groundings.remove(position);
        log::info!("Discarded grounding {}", id);
        Some(removed.selected_objects().iter().cloned().collect())
    }

    /// Put a snapshot of the active grounding back in place (undo/redo).
    /// Track counters are merged so allocation never rewinds.
    pub fn restore_grounding(&mut self, mut snapshot: Grounding) -> Result<()> {
        let current = self.editable(snapshot.id())?;
        snapshot.absorb_registry(current.registry());
        *current = snapshot;
        Ok(())
    }

    pub fn add_box(
        &mut self,
        id: GroundingId,
        frame: u32,
        rect: Rect,
        object_type: &str,
        track_id: Option<&str>,
    ) -> Result<String> {
        let resolution = self.video_info.resolution;
        self.editable(id)?
            .add_box(frame, rect, object_type, track_id, &resolution)
    }

    pub fn move_box(&mut self, id: GroundingId, frame: u32, track_id: &str, rect: Rect) -> Result<Rect> {
        let resolution = self.video_info.resolution;
        self.editable(id)?.move_box(frame, track_id, rect, &resolution)
    }

    pub fn resize_box(&mut self, id: GroundingId, frame: u32, track_id: &str, rect: Rect) -> Result<Rect> {
        let resolution = self.video_info.resolution;
        self.editable(id)?.resize_box(frame, track_id, rect, &resolution)
    }

    pub fn delete_box(&mut self, id: GroundingId, frame: u32, track_id: &str) -> Result<BoundingBox> {
        self.editable(id)?.delete_box(frame, track_id)
    }

    /// Remove the most recently placed box on `frame`.
    pub fn pop_last_box(&mut self, id: GroundingId, frame: u32) -> Result<Option<BoundingBox>> {
        self.editable(id)?.pop_last_box(frame)
    }

    pub fn add_object_type(&mut self, id: GroundingId, object_type: &str) -> Result<()> {
        self.editable(id)?.add_object_type(object_type)
    }

    pub fn remove_object_type(&mut self, id: GroundingId, object_type: &str) -> Result<()> {
        self.editable(id)?.remove_object_type(object_type)
    }

    pub fn add_qa_session(&mut self, id: GroundingId, draft: QaDraft) -> Result<u32> {
        self.editable(id)?.add_qa(draft)
    }

    pub fn update_qa_session(&mut self, id: GroundingId, qa_id: u32, draft: QaDraft) -> Result<()> {
        self.editable(id)?.update_qa(qa_id, draft)
    }

    pub fn delete_qa_session(&mut self, id: GroundingId, qa_id: u32) -> Result<QaSession> {
        self.editable(id)?.delete_qa(qa_id)
    }

    /// Rebuild derived state after deserialization. Nothing is active.
    pub(crate) fn rebuild_derived(&mut self) {
        for grounding in &mut self.groundings {
            grounding.rebuild_registry();
        }
        self.active = None;
    }
}
