// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Track identity allocation.
//!
//! Track ids look like `person_001`: the object type, an underscore, and a
//! per-type index zero-padded to three digits. Indices only ever grow within
//! a grounding, so an id released by deleting its last box is never handed
//! out again.

use crate::error::{Error, Result};
use std::collections::{BTreeMap, BTreeSet};

/// Zero-padding width of the numeric part of a track id.
pub const TRACK_INDEX_WIDTH: usize = 3;

/// Format a track id from its parts.
pub fn format_track_id(object_type: &str, index: u32) -> String {
    format!("{}_{:0width$}", object_type, index, width = TRACK_INDEX_WIDTH)
}

/// Split a track id of the form `<object_type>_<digits>`.
pub fn parse_track_id(track_id: &str) -> Option<(&str, u32)> {
    let (object_type, digits) = track_id.rsplit_once('_')?;
    if object_type.is_empty() || digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    digits.parse().ok().map(|n| (object_type, n))
}

/// Check that `track_id` is a well-formed id for `object_type`:
/// `<object_type>_<index>` with the index zero-padded and at least 1.
pub fn check_format(track_id: &str, object_type: &str) -> Result<()> {
    match parse_track_id(track_id) {
        Some((prefix, index))
            if prefix == object_type && index >= 1 && track_id == format_track_id(object_type, index) =>
        {
            Ok(())
        }
        _ => Err(Error::MalformedTrackId {
            track_id: track_id.to_string(),
            object_type: object_type.to_string(),
        }),
    }
}

/// Per-grounding registry of track identities.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TrackRegistry {
    /// Highest index handed out or observed, per object type.
    counters: BTreeMap<String, u32>,
    /// Every track id ever used in the grounding and its object type.
    tracks: BTreeMap<String, String>,
}

impl TrackRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh track id for `object_type`.
    pub fn allocate(&mut self, object_type: &str, selected: &BTreeSet<String>) -> Result<String> {
        if !selected.contains(object_type) {
            return Err(Error::InvalidObjectType(object_type.to_string()));
        }
        let track_id = self.peek(object_type);
        self.observe(&track_id, object_type);
        Ok(track_id)
    }

    /// The id `allocate` would return next, without reserving it.
    pub fn peek(&self, object_type: &str) -> String {
        let mut index = self.counters.get(object_type).copied().unwrap_or(0) + 1;
        // Hand-typed ids may already occupy a slot past the counter.
        while self.tracks.contains_key(&format_track_id(object_type, index)) {
            index += 1;
        }
        format_track_id(object_type, index)
    }

    /// Record that `track_id` is in use for `object_type`, bumping the
    /// counter when the id follows the standard format.
    pub fn observe(&mut self, track_id: &str, object_type: &str) {
        self.tracks
            .entry(track_id.to_string())
            .or_insert_with(|| object_type.to_string());
        if let Some((prefix, index)) = parse_track_id(track_id) {
            if prefix == object_type {
                let counter = self.counters.entry(object_type.to_string()).or_insert(0);
                *counter = (*counter).max(index);
            }
        }
    }

    /// Object type a known track belongs to.
    pub fn object_type_of(&self, track_id: &str) -> Option<&str> {
        self.tracks.get(track_id).map(String::as_str)
    }

    /// Every track id ever used, with its object type, sorted by id.
    pub fn tracks(&self) -> impl Iterator<Item = (&str, &str)> {
        self.tracks.iter().map(|(t, o)| (t.as_str(), o.as_str()))
    }

    /// Check that `track_id` may carry `object_type`: either it is new, or
    /// it already belongs to that type.
    pub fn check(&self, track_id: &str, object_type: &str) -> Result<()> {
        match self.object_type_of(track_id) {
            Some(existing) if existing != object_type => Err(Error::TrackTypeConflict {
                track_id: track_id.to_string(),
                existing: existing.to_string(),
                requested: object_type.to_string(),
            }),
            _ => Ok(()),
        }
    }

    /// Fold another registry in, never lowering a counter.
    pub fn absorb(&mut self, other: &TrackRegistry) {
        for (object_type, &index) in &other.counters {
            let counter = self.counters.entry(object_type.clone()).or_insert(0);
            *counter = (*counter).max(index);
        }
        for (track_id, object_type) in &other.tracks {
            self.tracks
                .entry(track_id.clone())
                .or_insert_with(|| object_type.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn selected(types: &[&str]) -> BTreeSet<String> {
        types.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_allocate_sequential_per_type() {
        let sel = selected(&["person", "car"]);
        let mut reg = TrackRegistry::new();
        assert_eq!(reg.allocate("person", &sel).unwrap(), "person_001");
        assert_eq!(reg.allocate("person", &sel).unwrap(), "person_002");
        assert_eq!(reg.allocate("car", &sel).unwrap(), "car_001");
    }

    #[test]
    fn test_allocate_rejects_unselected_type() {
        let mut reg = TrackRegistry::new();
        let err = reg.allocate("dog", &selected(&["person"])).unwrap_err();
        assert!(matches!(err, Error::InvalidObjectType(t) if t == "dog"));
    }

    #[test]
    fn test_observed_ids_advance_counter() {
        let sel = selected(&["person"]);
        let mut reg = TrackRegistry::new();
        reg.observe("person_007", "person");
        assert_eq!(reg.allocate("person", &sel).unwrap(), "person_008");
    }

    #[test]
    fn test_peek_skips_foreign_ids() {
        let mut reg = TrackRegistry::new();
        // Registered under another type, so it does not move the counter.
        reg.observe("car_001", "truck");
        assert_eq!(reg.peek("car"), "car_002");
    }

    #[test]
    fn test_check_detects_type_conflict() {
        let mut reg = TrackRegistry::new();
        reg.observe("car_001", "car");
        assert!(reg.check("car_001", "car").is_ok());
        assert!(reg.check("car_002", "person").is_ok());
        assert!(matches!(
            reg.check("car_001", "person"),
            Err(Error::TrackTypeConflict { .. })
        ));
    }

    #[test]
    fn test_parse_track_id() {
        assert_eq!(parse_track_id("traffic_light_012"), Some(("traffic_light", 12)));
        assert_eq!(parse_track_id("person"), None);
        assert_eq!(parse_track_id("person_x1"), None);
        assert_eq!(parse_track_id("_001"), None);
    }

    #[test]
    fn test_check_format() {
        assert!(check_format("person_001", "person").is_ok());
        assert!(check_format("traffic_light_012", "traffic_light").is_ok());
        assert!(check_format("person_1234", "person").is_ok());
        for bad in ["car_007", "banana", "person_1", "person_000", "person_0001"] {
            assert!(
                matches!(check_format(bad, "person"), Err(Error::MalformedTrackId { .. })),
                "{} accepted",
                bad
            );
        }
    }

    #[test]
    fn test_absorb_keeps_highest_counter() {
        let sel = selected(&["person"]);
        let mut newer = TrackRegistry::new();
        newer.allocate("person", &sel).unwrap();
        newer.allocate("person", &sel).unwrap();
        let mut older = TrackRegistry::new();
        older.allocate("person", &sel).unwrap();
        older.absorb(&newer);
        assert_eq!(older.allocate("person", &sel).unwrap(), "person_003");
    }
}
