// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Object type and track id window for a freshly drawn box.

use vqa_annotator::interaction::{AssignmentRequest, AssignmentResponse};

/// How the new box gets its track id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TrackChoice {
    /// Allocate the next id for the object type.
    New,
    /// Continue a known track.
    Existing(String),
    /// Use the id typed into `custom_track`.
    Custom,
}

/// Window state, reset for every request.
#[derive(Debug, Clone)]
pub struct AssignmentForm {
    pub object_type: String,
    pub choice: TrackChoice,
    pub custom_track: String,
    /// Last rejection from the store, shown until the next attempt.
    pub error: Option<String>,
}

impl Default for AssignmentForm {
    fn default() -> Self {
        Self {
            object_type: String::new(),
            choice: TrackChoice::New,
            custom_track: String::new(),
            error: None,
        }
    }
}

impl AssignmentForm {
    /// Reset for `request`, keeping the previous object type when offered.
    pub fn prepare(&mut self, request: &AssignmentRequest) {
        let keep = request.suggestions.iter().any(|(o, _)| *o == self.object_type);
        if !keep {
            self.object_type = request
                .suggestions
                .first()
                .map(|(o, _)| o.clone())
                .unwrap_or_default();
        }
        self.choice = TrackChoice::New;
        self.custom_track.clear();
        self.error = None;
    }

    fn response(&self) -> AssignmentResponse {
        let track_id = match &self.choice {
            TrackChoice::New => None,
            TrackChoice::Existing(id) => Some(id.clone()),
            TrackChoice::Custom => Some(self.custom_track.trim().to_string()).filter(|t| !t.is_empty()),
        };
        AssignmentResponse::Confirm {
            object_type: self.object_type.clone(),
            track_id,
        }
    }
}

/// Display the assignment window. Returns the user's answer once given.
pub fn show(
    ctx: &egui::Context,
    form: &mut AssignmentForm,
    request: &AssignmentRequest,
) -> Option<AssignmentResponse> {
    let mut response = None;

    egui::Window::new("Assign Object")
        .collapsible(false)
        .resizable(false)
        .anchor(egui::Align2::CENTER_CENTER, [0.0, 0.0])
        .show(ctx, |ui| {
            ui.label(format!(
                "Frame {}: box {}x{} at ({}, {})",
                request.frame, request.rect.width, request.rect.height, request.rect.x, request.rect.y
            ));
            ui.separator();

            let before = form.object_type.clone();
            egui::ComboBox::from_label("Object type")
                .selected_text(form.object_type.clone())
                .show_ui(ui, |ui| {
                    for (object_type, _) in &request.suggestions {
                        ui.selectable_value(&mut form.object_type, object_type.clone(), object_type.as_str());
                    }
                });
            if form.object_type != before {
                form.choice = TrackChoice::New;
            }

            let suggested = request
                .suggestions
                .iter()
                .find(|(o, _)| *o == form.object_type)
                .map(|(_, id)| id.as_str())
                .unwrap_or("");
            ui.radio_value(&mut form.choice, TrackChoice::New, format!("New track ({})", suggested));

            let same_type: Vec<&String> = request
                .known_tracks
                .iter()
                .filter(|(_, o)| *o == form.object_type)
                .map(|(t, _)| t)
                .collect();
            for track_id in same_type {
                ui.radio_value(
                    &mut form.choice,
                    TrackChoice::Existing(track_id.clone()),
                    format!("Continue {}", track_id),
                );
            }
            ui.horizontal(|ui| {
                ui.radio_value(&mut form.choice, TrackChoice::Custom, "Track id");
                let edit = ui.text_edit_singleline(&mut form.custom_track);
                if edit.changed() {
                    form.choice = TrackChoice::Custom;
                }
            });

            if let Some(error) = &form.error {
                ui.colored_label(egui::Color32::LIGHT_RED, error.as_str());
            }

            ui.separator();
            ui.horizontal(|ui| {
                let ready = !form.object_type.is_empty()
                    && (form.choice != TrackChoice::Custom || !form.custom_track.trim().is_empty());
                if ui.add_enabled(ready, egui::Button::new("OK")).clicked() {
                    response = Some(form.response());
                }
                if ui.button("Cancel").clicked() {
                    response = Some(AssignmentResponse::Cancel);
                }
            });
        });

    response
}
