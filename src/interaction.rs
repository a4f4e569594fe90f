// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Pointer gesture handling.
//!
//! The controller turns press/drag/release events on the displayed frame
//! into store operations. It owns only gesture state; the [`Document`] is
//! borrowed per event, so the store is never touched while a gesture is
//! merely in flight. Moves and resizes are previewed live and committed on
//! release with the same rectangle that was last shown.
//!
//! A finished draw does not create a box directly. It parks the controller
//! in [`Gesture::AwaitingAssignment`] and hands an [`AssignmentRequest`] to
//! the UI, which answers through [`InteractionController::resolve_assignment`].
//! No further gestures are accepted until then.

use crate::config::EditorConfig;
use crate::error::Result;
use crate::models::annotation::{Point, Resolution};
use crate::models::document::{Document, GroundingId};
use crate::models::grounding::Grounding;
use crate::util::geometry::{self, Handle, Rect, Tolerance, Zone};

/// Gesture state.
#[derive(Debug, Clone, PartialEq)]
pub enum Gesture {
    Idle,
    Drawing {
        origin: Point,
        current: Point,
    },
    Moving {
        track_id: String,
        grab: Point,
        original: Rect,
        preview: Rect,
    },
    Resizing {
        track_id: String,
        handle: Handle,
        original: Rect,
        preview: Rect,
    },
    AwaitingAssignment(AssignmentRequest),
}

/// What the UI needs to ask for an object type and track id.
#[derive(Debug, Clone, PartialEq)]
pub struct AssignmentRequest {
    pub frame: u32,
    /// Drawn rectangle, already clipped to the frame.
    pub rect: Rect,
    /// Selectable object types with the track id a fresh allocation would
    /// get for each.
    pub suggestions: Vec<(String, String)>,
    /// Tracks already known in the grounding, with their object types.
    pub known_tracks: Vec<(String, String)>,
}

/// The UI's answer to an [`AssignmentRequest`].
#[derive(Debug, Clone, PartialEq)]
pub enum AssignmentResponse {
    Confirm {
        object_type: String,
        /// `None` allocates a new track.
        track_id: Option<String>,
    },
    Cancel,
}

/// Result of feeding one event to the controller.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Nothing changed.
    Ignored,
    Selected(String),
    Deselected,
    /// A gesture ended without touching the store.
    Discarded,
    AssignmentRequested(AssignmentRequest),
    BoxAdded(String),
    BoxMoved(String),
    BoxResized(String),
    BoxDeleted(String),
}

impl Outcome {
    /// Whether the store was changed.
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            Outcome::BoxAdded(_) | Outcome::BoxMoved(_) | Outcome::BoxResized(_) | Outcome::BoxDeleted(_)
        )
    }
}

/// Gesture state machine for one grounding and one displayed frame.
#[derive(Debug, Clone)]
pub struct InteractionController {
    grounding: GroundingId,
    frame: u32,
    gesture: Gesture,
    selected: Option<String>,
    tolerance: Tolerance,
    min_box_size: i64,
    display_scale: f64,
}

impl InteractionController {
    pub fn new(grounding: GroundingId, frame: u32, config: &EditorConfig) -> Self {
        Self {
            grounding,
            frame,
            gesture: Gesture::Idle,
            selected: None,
            tolerance: config.tolerance(),
            min_box_size: config.min_box_size,
            display_scale: 1.0,
        }
    }

    pub fn grounding(&self) -> GroundingId {
        self.grounding
    }

    pub fn frame(&self) -> u32 {
        self.frame
    }

    pub fn gesture(&self) -> &Gesture {
        &self.gesture
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn pending_assignment(&self) -> Option<&AssignmentRequest> {
        match &self.gesture {
            Gesture::AwaitingAssignment(request) => Some(request),
            _ => None,
        }
    }

    /// Screen pixels per image pixel. Handle tolerances are given in screen
    /// pixels and scaled by this.
    pub fn set_display_scale(&mut self, scale: f64) {
        if scale > 0.0 {
            self.display_scale = scale;
        }
    }

    /// Live geometry of the gesture in progress: the track being edited
    /// (`None` while drawing) and its rectangle.
    pub fn preview(&self) -> Option<(Option<&str>, Rect)> {
        match &self.gesture {
            Gesture::Drawing { origin, current } => Some((None, Rect::from_corners(*origin, *current))),
            Gesture::Moving { track_id, preview, .. } | Gesture::Resizing { track_id, preview, .. } => {
                Some((Some(track_id.as_str()), *preview))
            }
            Gesture::AwaitingAssignment(request) => Some((None, request.rect)),
            Gesture::Idle => None,
        }
    }

    /// Switch the displayed frame. Refused while an assignment is pending.
    /// Any gesture in flight is dropped; the selection survives only if its
    /// track has a box on the new frame.
    pub fn set_frame(&mut self, doc: &Document, frame: u32) -> bool {
        if matches!(self.gesture, Gesture::AwaitingAssignment(_)) {
            return false;
        }
        self.gesture = Gesture::Idle;
        self.frame = frame;
        let keep = match (&self.selected, doc.grounding(self.grounding)) {
            (Some(track_id), Some(g)) => g.find_box(frame, track_id).is_some(),
            _ => false,
        };
        if !keep {
            self.selected = None;
        }
        true
    }

    /// Follow a different grounding, dropping all gesture state.
    pub fn retarget(&mut self, grounding: GroundingId, frame: u32) {
        self.grounding = grounding;
        self.frame = frame;
        self.gesture = Gesture::Idle;
        self.selected = None;
    }

    fn bounds(resolution: &Resolution) -> Rect {
        if resolution.width > 0 && resolution.height > 0 {
            resolution.bounds()
        } else {
            Rect::new(0, 0, i64::from(u32::MAX), i64::from(u32::MAX))
        }
    }

    /// The target grounding, if it is active and the frame is sampled.
    fn editable<'a>(&self, doc: &'a Document) -> Option<&'a Grounding> {
        if doc.active_id() != Some(self.grounding) {
            return None;
        }
        doc.active()
            .filter(|g| g.time_segment().contains(self.frame))
    }

    /// Primary button pressed at `pos` (image coordinates). With `force_new`
    /// a draw starts even over an existing box.
    pub fn pointer_pressed(&mut self, doc: &Document, pos: Point, force_new: bool) -> Outcome {
        if self.gesture != Gesture::Idle {
            return Outcome::Ignored;
        }
        let Some(grounding) = self.editable(doc) else {
            log::debug!("Ignoring press on frame {}: not editable", self.frame);
            return Outcome::Ignored;
        };

        let boxes = grounding.boxes_at(self.frame);
        let hit = if force_new {
            None
        } else {
            let tolerance = self.tolerance.scaled(self.display_scale);
            geometry::pick(boxes.iter().map(|b| b.rect()), pos, &tolerance)
        };

        match hit {
            Some((index, zone)) => {
                let target = &boxes[index];
                let track_id = target.track_id.clone();
                let original = target.rect();
                self.gesture = match zone {
                    Zone::Handle(handle) => Gesture::Resizing {
                        track_id: track_id.clone(),
                        handle,
                        original,
                        preview: original,
                    },
                    _ => Gesture::Moving {
                        track_id: track_id.clone(),
                        grab: pos,
                        original,
                        preview: original,
                    },
                };
                self.selected = Some(track_id.clone());
                Outcome::Selected(track_id)
            }
            None => {
                let had_selection = self.selected.take().is_some();
                self.gesture = Gesture::Drawing {
                    origin: pos,
                    current: pos,
                };
                if had_selection {
                    Outcome::Deselected
                } else {
                    Outcome::Ignored
                }
            }
        }
    }

    /// Pointer moved with the primary button held.
    pub fn pointer_dragged(&mut self, doc: &Document, pos: Point) {
        let bounds = Self::bounds(&doc.video_info().resolution);
        let min_size = self.min_box_size.max(1);
        match &mut self.gesture {
            Gesture::Drawing { current, .. } => *current = pos,
            Gesture::Moving {
                grab,
                original,
                preview,
                ..
            } => {
                let dx = pos.x.floor() as i64 - grab.x.floor() as i64;
                let dy = pos.y.floor() as i64 - grab.y.floor() as i64;
                *preview = original.translated(dx, dy).shifted_into(&bounds);
            }
            Gesture::Resizing {
                handle,
                original,
                preview,
                ..
            } => {
                *preview = geometry::resize(original, *handle, pos, min_size, &bounds);
            }
            Gesture::Idle | Gesture::AwaitingAssignment(_) => {}
        }
    }

    /// Primary button released. Moves and resizes are committed here;
    /// a large enough draw turns into an assignment request.
    pub fn pointer_released(&mut self, doc: &mut Document, pos: Point) -> Result<Outcome> {
        self.pointer_dragged(doc, pos);
        match std::mem::replace(&mut self.gesture, Gesture::Idle) {
            Gesture::Idle => Ok(Outcome::Ignored),
            pending @ Gesture::AwaitingAssignment(_) => {
                self.gesture = pending;
                Ok(Outcome::Ignored)
            }
            Gesture::Drawing { origin, current } => {
                let bounds = Self::bounds(&doc.video_info().resolution);
                let drawn = Rect::from_corners(origin, current).clipped_to(&bounds);
                let Some(rect) = drawn.filter(|r| r.width > self.min_box_size && r.height > self.min_box_size)
                else {
                    log::warn!("Discarding draw below {} px", self.min_box_size);
                    return Ok(Outcome::Discarded);
                };
                let Some(grounding) = doc.grounding(self.grounding) else {
                    return Ok(Outcome::Discarded);
                };
                let request = AssignmentRequest {
                    frame: self.frame,
                    rect,
                    suggestions: grounding
                        .selected_objects()
                        .iter()
                        .map(|o| (o.clone(), grounding.suggest_track_id(o)))
                        .collect(),
                    known_tracks: grounding.known_tracks(),
                };
                self.gesture = Gesture::AwaitingAssignment(request.clone());
                Ok(Outcome::AssignmentRequested(request))
            }
            Gesture::Moving {
                track_id,
                original,
                preview,
                ..
            } => {
                if preview == original {
                    return Ok(Outcome::Selected(track_id));
                }
                doc.move_box(self.grounding, self.frame, &track_id, preview)?;
                Ok(Outcome::BoxMoved(track_id))
            }
            Gesture::Resizing {
                track_id,
                original,
                preview,
                ..
            } => {
                if preview == original {
                    return Ok(Outcome::Selected(track_id));
                }
                doc.resize_box(self.grounding, self.frame, &track_id, preview)?;
                Ok(Outcome::BoxResized(track_id))
            }
        }
    }

    /// Answer a pending assignment request. A rejected confirmation keeps
    /// the request pending so the UI can correct it or cancel.
    pub fn resolve_assignment(&mut self, doc: &mut Document, response: AssignmentResponse) -> Result<Outcome> {
        let request = match std::mem::replace(&mut self.gesture, Gesture::Idle) {
            Gesture::AwaitingAssignment(request) => request,
            other => {
                self.gesture = other;
                return Ok(Outcome::Ignored);
            }
        };
        match response {
            AssignmentResponse::Cancel => Ok(Outcome::Discarded),
            AssignmentResponse::Confirm { object_type, track_id } => {
                match doc.add_box(
                    self.grounding,
                    request.frame,
                    request.rect,
                    &object_type,
                    track_id.as_deref(),
                ) {
                    Ok(track_id) => {
                        self.selected = Some(track_id.clone());
                        Ok(Outcome::BoxAdded(track_id))
                    }
                    Err(e) => {
                        self.gesture = Gesture::AwaitingAssignment(request);
                        Err(e)
                    }
                }
            }
        }
    }

    /// Secondary click: delete the box under `pos`.
    pub fn secondary_click(&mut self, doc: &mut Document, pos: Point) -> Result<Outcome> {
        if self.gesture != Gesture::Idle {
            return Ok(Outcome::Ignored);
        }
        let Some(grounding) = self.editable(doc) else {
            return Ok(Outcome::Ignored);
        };
        let tolerance = self.tolerance.scaled(self.display_scale);
        let boxes = grounding.boxes_at(self.frame);
        let Some((index, _)) = geometry::pick(boxes.iter().map(|b| b.rect()), pos, &tolerance) else {
            return Ok(Outcome::Ignored);
        };
        let track_id = boxes[index].track_id.clone();
        self.delete(doc, track_id)
    }

    /// Delete key: delete the selected box.
    pub fn delete_pressed(&mut self, doc: &mut Document) -> Result<Outcome> {
        if self.gesture != Gesture::Idle {
            return Ok(Outcome::Ignored);
        }
        match self.selected.clone() {
            Some(track_id) => self.delete(doc, track_id),
            None => Ok(Outcome::Ignored),
        }
    }

    fn delete(&mut self, doc: &mut Document, track_id: String) -> Result<Outcome> {
        doc.delete_box(self.grounding, self.frame, &track_id)?;
        if self.selected.as_deref() == Some(track_id.as_str()) {
            self.selected = None;
        }
        Ok(Outcome::BoxDeleted(track_id))
    }

    /// Escape: abandon the gesture in flight, or drop the selection.
    pub fn cancel(&mut self) -> Outcome {
        match std::mem::replace(&mut self.gesture, Gesture::Idle) {
            Gesture::Idle => match self.selected.take() {
                Some(_) => Outcome::Deselected,
                None => Outcome::Ignored,
            },
            _ => Outcome::Discarded,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::models::document::VideoInfo;
    use crate::models::qa::QaDraft;

    fn setup() -> (Document, InteractionController) {
        let mut doc = Document::new(VideoInfo::new("clip.mp4", 300, 30.0, Resolution::new(640, 480)));
        let gid = doc.create_grounding(0, 100, 10, ["person", "car"]).unwrap();
        let ctl = InteractionController::new(gid, 0, &EditorConfig::default());
        (doc, ctl)
    }

    fn p(x: f64, y: f64) -> Point {
        Point::new(x, y)
    }

    fn draw(doc: &mut Document, ctl: &mut InteractionController, a: Point, b: Point) -> Outcome {
        ctl.pointer_pressed(doc, a, false);
        ctl.pointer_dragged(doc, b);
        ctl.pointer_released(doc, b).unwrap()
    }

    #[test]
    fn test_draw_requests_assignment_then_adds_box() {
        let (mut doc, mut ctl) = setup();
        let outcome = draw(&mut doc, &mut ctl, p(100.0, 100.0), p(200.0, 180.0));
        let Outcome::AssignmentRequested(request) = outcome else {
            panic!("expected assignment request, got {:?}", outcome);
        };
        assert_eq!(request.rect, Rect::new(100, 100, 100, 80));
        assert!(request
            .suggestions
            .contains(&("person".to_string(), "person_001".to_string())));

        // Nothing is stored until the assignment is answered.
        assert!(doc.active().unwrap().boxes_at(0).is_empty());
        assert_eq!(ctl.pointer_pressed(&doc, p(5.0, 5.0), false), Outcome::Ignored);
        assert!(!ctl.set_frame(&doc, 10));

        let added = ctl
            .resolve_assignment(
                &mut doc,
                AssignmentResponse::Confirm {
                    object_type: "person".into(),
                    track_id: None,
                },
            )
            .unwrap();
        assert_eq!(added, Outcome::BoxAdded("person_001".into()));
        assert_eq!(ctl.selected(), Some("person_001"));
        assert_eq!(doc.active().unwrap().boxes_at(0)[0].rect(), Rect::new(100, 100, 100, 80));
    }

    #[test]
    fn test_small_draw_is_discarded() {
        let (mut doc, mut ctl) = setup();
        let outcome = draw(&mut doc, &mut ctl, p(100.0, 100.0), p(105.0, 140.0));
        assert_eq!(outcome, Outcome::Discarded);
        assert_eq!(ctl.gesture(), &Gesture::Idle);
        assert!(doc.active().unwrap().annotations().is_empty());
    }

    #[test]
    fn test_cancel_assignment_leaves_store_untouched() {
        let (mut doc, mut ctl) = setup();
        draw(&mut doc, &mut ctl, p(10.0, 10.0), p(60.0, 60.0));
        let outcome = ctl.resolve_assignment(&mut doc, AssignmentResponse::Cancel).unwrap();
        assert_eq!(outcome, Outcome::Discarded);
        assert_eq!(ctl.gesture(), &Gesture::Idle);
        assert!(doc.active().unwrap().annotations().is_empty());
    }

    #[test]
    fn test_rejected_assignment_stays_pending() {
        let (mut doc, mut ctl) = setup();
        let gid = ctl.grounding();
        doc.add_box(gid, 0, Rect::new(300, 300, 50, 50), "car", None).unwrap();
        draw(&mut doc, &mut ctl, p(10.0, 10.0), p(60.0, 60.0));
        let err = ctl
            .resolve_assignment(
                &mut doc,
                AssignmentResponse::Confirm {
                    object_type: "person".into(),
                    track_id: Some("car_001".into()),
                },
            )
            .unwrap_err();
        assert!(matches!(err, Error::TrackTypeConflict { .. }));
        assert!(ctl.pending_assignment().is_some());
    }

    #[test]
    fn test_move_commits_last_preview() {
        let (mut doc, mut ctl) = setup();
        let gid = ctl.grounding();
        let id = doc.add_box(gid, 0, Rect::new(100, 100, 100, 100), "person", None).unwrap();

        assert_eq!(ctl.pointer_pressed(&doc, p(150.0, 150.0), false), Outcome::Selected(id.clone()));
        ctl.pointer_dragged(&doc, p(700.0, 160.0));
        let (_, shown) = ctl.preview().unwrap();
        let outcome = ctl.pointer_released(&mut doc, p(700.0, 160.0)).unwrap();
        assert_eq!(outcome, Outcome::BoxMoved(id.clone()));
        let stored = doc.active().unwrap().find_box(0, &id).unwrap().rect();
        assert_eq!(stored, shown);
        assert_eq!(stored, Rect::new(540, 110, 100, 100));
    }

    #[test]
    fn test_press_on_handle_resizes() {
        let (mut doc, mut ctl) = setup();
        let gid = ctl.grounding();
        let id = doc.add_box(gid, 0, Rect::new(100, 100, 100, 100), "person", None).unwrap();

        ctl.pointer_pressed(&doc, p(198.0, 198.0), false);
        assert!(matches!(
            ctl.gesture(),
            Gesture::Resizing {
                handle: Handle::BottomRight,
                ..
            }
        ));
        let outcome = ctl.pointer_released(&mut doc, p(250.0, 300.0)).unwrap();
        assert_eq!(outcome, Outcome::BoxResized(id.clone()));
        let stored = doc.active().unwrap().find_box(0, &id).unwrap().rect();
        assert_eq!(stored, Rect::new(100, 100, 150, 200));
    }

    #[test]
    fn test_force_new_draws_over_existing_box() {
        let (mut doc, mut ctl) = setup();
        let gid = ctl.grounding();
        doc.add_box(gid, 0, Rect::new(0, 0, 400, 400), "car", None).unwrap();
        ctl.pointer_pressed(&doc, p(50.0, 50.0), true);
        assert!(matches!(ctl.gesture(), Gesture::Drawing { .. }));
    }

    #[test]
    fn test_overlap_selects_smallest_box() {
        let (mut doc, mut ctl) = setup();
        let gid = ctl.grounding();
        doc.add_box(gid, 0, Rect::new(0, 0, 400, 400), "car", None).unwrap();
        let small = doc.add_box(gid, 0, Rect::new(150, 150, 100, 100), "person", None).unwrap();
        assert_eq!(ctl.pointer_pressed(&doc, p(200.0, 200.0), false), Outcome::Selected(small));
    }

    #[test]
    fn test_delete_selected_and_right_click() {
        let (mut doc, mut ctl) = setup();
        let gid = ctl.grounding();
        let a = doc.add_box(gid, 0, Rect::new(10, 10, 50, 50), "person", None).unwrap();
        let b = doc.add_box(gid, 0, Rect::new(300, 300, 50, 50), "car", None).unwrap();

        ctl.pointer_pressed(&doc, p(35.0, 35.0), false);
        ctl.pointer_released(&mut doc, p(35.0, 35.0)).unwrap();
        assert_eq!(ctl.delete_pressed(&mut doc).unwrap(), Outcome::BoxDeleted(a));
        assert_eq!(ctl.selected(), None);

        assert_eq!(ctl.secondary_click(&mut doc, p(325.0, 325.0)).unwrap(), Outcome::BoxDeleted(b));
        assert!(doc.active().unwrap().annotations().is_empty());
        assert_eq!(ctl.secondary_click(&mut doc, p(325.0, 325.0)).unwrap(), Outcome::Ignored);
    }

    #[test]
    fn test_delete_refused_for_grounded_track() {
        let (mut doc, mut ctl) = setup();
        let gid = ctl.grounding();
        let id = doc.add_box(gid, 0, Rect::new(10, 10, 50, 50), "person", None).unwrap();
        doc.add_qa_session(
            gid,
            QaDraft {
                grounded_objects: vec![id],
                ..QaDraft::default()
            },
        )
        .unwrap();
        assert!(matches!(
            ctl.secondary_click(&mut doc, p(35.0, 35.0)),
            Err(Error::TrackInUse { .. })
        ));
        assert_eq!(doc.active().unwrap().boxes_at(0).len(), 1);
    }

    #[test]
    fn test_selection_follows_track_across_frames() {
        let (mut doc, mut ctl) = setup();
        let gid = ctl.grounding();
        let id = doc.add_box(gid, 0, Rect::new(10, 10, 50, 50), "person", None).unwrap();
        doc.add_box(gid, 10, Rect::new(20, 20, 50, 50), "person", Some(&id)).unwrap();

        ctl.pointer_pressed(&doc, p(35.0, 35.0), false);
        ctl.pointer_released(&mut doc, p(35.0, 35.0)).unwrap();
        assert!(ctl.set_frame(&doc, 10));
        assert_eq!(ctl.selected(), Some(id.as_str()));
        assert!(ctl.set_frame(&doc, 20));
        assert_eq!(ctl.selected(), None);
    }

    #[test]
    fn test_gestures_ignored_off_sample_or_inactive() {
        let (mut doc, mut ctl) = setup();
        ctl.set_frame(&doc, 5);
        assert_eq!(ctl.pointer_pressed(&doc, p(10.0, 10.0), false), Outcome::Ignored);
        assert_eq!(ctl.gesture(), &Gesture::Idle);

        ctl.set_frame(&doc, 0);
        doc.create_grounding(0, 50, 5, ["dog"]).unwrap();
        assert_eq!(ctl.pointer_pressed(&doc, p(10.0, 10.0), false), Outcome::Ignored);
    }

    #[test]
    fn test_escape_cancels_gesture_without_mutation() {
        let (mut doc, mut ctl) = setup();
        let gid = ctl.grounding();
        let id = doc.add_box(gid, 0, Rect::new(100, 100, 100, 100), "person", None).unwrap();
        ctl.pointer_pressed(&doc, p(150.0, 150.0), false);
        ctl.pointer_dragged(&doc, p(300.0, 300.0));
        assert_eq!(ctl.cancel(), Outcome::Discarded);
        assert_eq!(
            doc.active().unwrap().find_box(0, &id).unwrap().rect(),
            Rect::new(100, 100, 100, 100)
        );
        assert_eq!(ctl.cancel(), Outcome::Deselected);
    }
}
