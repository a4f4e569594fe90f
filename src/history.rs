// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Undo/redo of edits to the active grounding.

use crate::models::grounding::Grounding;

/// Maximum number of undo states kept.
pub const MAX_HISTORY: usize = 50;

/// Snapshot stacks for one grounding.
#[derive(Debug, Clone)]
pub struct History {
    /// Past states
    undo_stack: Vec<Grounding>,
    /// States undone since the last edit
    redo_stack: Vec<Grounding>,
    max_size: usize,
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

impl History {
    pub fn new() -> Self {
        Self {
            undo_stack: Vec::new(),
            redo_stack: Vec::new(),
            max_size: MAX_HISTORY,
        }
    }

    /// Record the state before an edit. A new edit invalidates redo.
    pub fn push(&mut self, before: Grounding) {
        self.undo_stack.push(before);
        if self.undo_stack.len() > self.max_size {
            self.undo_stack.remove(0);
        }
        self.redo_stack.clear();
    }

    /// Swap `current` for the previous state.
    pub fn undo(&mut self, current: Grounding) -> Option<Grounding> {
        let previous = self.undo_stack.pop()?;
        self.redo_stack.push(current);
        Some(previous)
    }

    /// Swap `current` for the next undone state.
    pub fn redo(&mut self, current: Grounding) -> Option<Grounding> {
        let next = self.redo_stack.pop()?;
        self.undo_stack.push(current);
        Some(next)
    }

    pub fn can_undo(&self) -> bool {
        !self.undo_stack.is_empty()
    }

    pub fn can_redo(&self) -> bool {
        !self.redo_stack.is_empty()
    }

    pub fn clear(&mut self) {
        self.undo_stack.clear();
        self.redo_stack.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::annotation::Resolution;
    use crate::models::document::{Document, VideoInfo};
    use crate::util::geometry::Rect;

    fn document() -> Document {
        let mut doc = Document::new(VideoInfo::new("clip.mp4", 100, 30.0, Resolution::new(320, 240)));
        doc.create_grounding(0, 50, 10, ["person"]).unwrap();
        doc
    }

    #[test]
    fn test_undo_redo_through_document() {
        let mut doc = document();
        let gid = doc.active_id().unwrap();
        let mut history = History::new();

        history.push(doc.active().unwrap().clone());
        doc.add_box(gid, 0, Rect::new(0, 0, 20, 20), "person", None).unwrap();
        assert!(history.can_undo());

        let current = doc.active().unwrap().clone();
        let previous = history.undo(current).unwrap();
        doc.restore_grounding(previous).unwrap();
        assert!(doc.active().unwrap().annotations().is_empty());
        assert!(history.can_redo());

        let current = doc.active().unwrap().clone();
        let next = history.redo(current).unwrap();
        doc.restore_grounding(next).unwrap();
        assert_eq!(doc.active().unwrap().boxes_at(0).len(), 1);
    }

    #[test]
    fn test_push_clears_redo_and_caps_size() {
        let doc = document();
        let snapshot = doc.active().unwrap().clone();
        let mut history = History::new();
        for _ in 0..(MAX_HISTORY + 5) {
            history.push(snapshot.clone());
        }
        assert_eq!(history.undo_stack.len(), MAX_HISTORY);

        history.undo(snapshot.clone()).unwrap();
        assert!(history.can_redo());
        history.push(snapshot);
        assert!(!history.can_redo());

        history.clear();
        assert!(!history.can_undo());
    }
}
