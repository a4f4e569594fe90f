// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Editor configuration.
//!
//! Every field has a default, so a YAML file only needs the keys it wants
//! to change. Unknown keys are ignored.

use crate::util::geometry::Tolerance;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Environment variable naming a configuration file.
pub const CONFIG_ENV: &str = "VQA_ANNOTATOR_CONFIG";

/// Configuration file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "annotator.yaml";

/// Tunables for the editor and its interaction controller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Corner handle reach, in screen pixels.
    pub corner_tolerance: f64,
    /// Edge handle reach, in screen pixels.
    pub edge_tolerance: f64,
    /// Drawn boxes must be larger than this on both axes, in image pixels.
    pub min_box_size: i64,
    /// Interval pre-filled in the grounding panel.
    pub default_interval: u32,
    /// Frame rate assumed for image sequences.
    pub default_fps: f64,
    /// Object categories offered when starting a grounding.
    pub object_categories: Vec<String>,
    /// Question categories offered in the QA panel.
    pub question_categories: Vec<String>,
    /// Track colours, RGB, handed out in first-seen order.
    pub track_palette: Vec<[u8; 3]>,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            corner_tolerance: 15.0,
            edge_tolerance: 10.0,
            min_box_size: 10,
            default_interval: 10,
            default_fps: 30.0,
            object_categories: ["person", "car", "bicycle", "dog", "cat"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            question_categories: vec!["General".to_string()],
            track_palette: vec![
                [0, 255, 0],
                [0, 0, 255],
                [255, 255, 0],
                [255, 0, 255],
                [0, 255, 255],
                [255, 128, 0],
                [128, 0, 255],
                [255, 192, 203],
                [0, 128, 128],
                [128, 128, 0],
            ],
        }
    }
}

impl EditorConfig {
    /// Load configuration from a YAML file.
    pub fn load(path: &Path) -> Result<Self> {
        let yaml = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let config: EditorConfig = serde_yaml::from_str(&yaml)
            .with_context(|| format!("parsing config {}", path.display()))?;
        Ok(config.sanitized())
    }

    /// Load from `$VQA_ANNOTATOR_CONFIG` or `./annotator.yaml` when present,
    /// defaults otherwise. A broken file is logged and ignored.
    pub fn discover() -> Self {
        let candidate = std::env::var_os(CONFIG_ENV)
            .map(PathBuf::from)
            .or_else(|| Some(PathBuf::from(DEFAULT_CONFIG_FILE)).filter(|p| p.exists()));
        match candidate {
            Some(path) => match Self::load(&path) {
                Ok(config) => {
                    log::info!("Loaded config from {}", path.display());
                    config
                }
                Err(e) => {
                    log::error!("Ignoring config: {:#}", e);
                    Self::default()
                }
            },
            None => {
                log::debug!("No config file, using defaults");
                Self::default()
            }
        }
    }

    /// Hit-test thresholds.
    pub fn tolerance(&self) -> Tolerance {
        Tolerance {
            corner: self.corner_tolerance,
            edge: self.edge_tolerance,
        }
    }

    fn sanitized(mut self) -> Self {
        let defaults = Self::default();
        if self.default_interval < 1 {
            self.default_interval = defaults.default_interval;
        }
        if !(self.default_fps > 0.0) {
            self.default_fps = defaults.default_fps;
        }
        if self.question_categories.is_empty() {
            self.question_categories = defaults.question_categories;
        }
        if self.track_palette.is_empty() {
            self.track_palette = defaults.track_palette;
        }
        self.min_box_size = self.min_box_size.max(0);
        self
    }
}

/// Assigns palette colours to track ids in first-seen order.
#[derive(Debug, Clone, Default)]
pub struct TrackPalette {
    colours: Vec<[u8; 3]>,
    assigned: HashMap<String, [u8; 3]>,
}

impl TrackPalette {
    pub fn new(colours: Vec<[u8; 3]>) -> Self {
        Self {
            colours,
            assigned: HashMap::new(),
        }
    }

    /// Colour of `track_id`, assigning the next one if the track is new.
    pub fn colour(&mut self, track_id: &str) -> [u8; 3] {
        if let Some(colour) = self.assigned.get(track_id) {
            return *colour;
        }
        let colour = if self.colours.is_empty() {
            [255, 0, 0]
        } else {
            self.colours[self.assigned.len() % self.colours.len()]
        };
        self.assigned.insert(track_id.to_string(), colour);
        colour
    }

    /// Forget assignments, e.g. when a new grounding starts.
    pub fn reset(&mut self) {
        self.assigned.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let config: EditorConfig = serde_yaml::from_str("min_box_size: 4\nunknown_key: true\n").unwrap();
        assert_eq!(config.min_box_size, 4);
        assert_eq!(config.corner_tolerance, 15.0);
        assert_eq!(config.question_categories, vec!["General".to_string()]);
    }

    #[test]
    fn test_load_sanitizes_values() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("annotator.yaml");
        std::fs::write(&path, "default_interval: 0\nquestion_categories: []\n").unwrap();
        let config = EditorConfig::load(&path).unwrap();
        assert_eq!(config.default_interval, 10);
        assert_eq!(config.question_categories, vec!["General".to_string()]);
    }

    #[test]
    fn test_load_missing_file_fails() {
        assert!(EditorConfig::load(Path::new("/nonexistent/annotator.yaml")).is_err());
    }

    #[test]
    fn test_palette_cycles_in_first_seen_order() {
        let mut palette = TrackPalette::new(vec![[1, 1, 1], [2, 2, 2]]);
        assert_eq!(palette.colour("person_001"), [1, 1, 1]);
        assert_eq!(palette.colour("car_001"), [2, 2, 2]);
        assert_eq!(palette.colour("person_001"), [1, 1, 1]);
        assert_eq!(palette.colour("dog_001"), [1, 1, 1]);
        palette.reset();
        assert_eq!(palette.colour("car_001"), [1, 1, 1]);
    }
}
