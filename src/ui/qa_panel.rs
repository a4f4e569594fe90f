// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Question/answer panel.
//!
//! Lists the QA sessions of the active grounding and edits one draft at a
//! time. Grounded tracks and frames are picked from what the grounding
//! actually contains, so a draft can only fail on races with box edits.

use std::collections::BTreeSet;
use vqa_annotator::models::grounding::Grounding;
use vqa_annotator::models::qa::{QaDraft, QaSession};

/// Draft being edited.
#[derive(Debug, Clone, Default)]
pub struct QaForm {
    /// QA session being edited, `None` for a new one.
    pub editing: Option<u32>,
    pub question_category: String,
    pub question: String,
    pub answer: String,
    pub tracks: BTreeSet<String>,
    pub segment_indices: BTreeSet<usize>,
}

impl QaForm {
    pub fn clear(&mut self) {
        let category = std::mem::take(&mut self.question_category);
        *self = Self {
            question_category: category,
            ..Self::default()
        };
    }

    fn load(&mut self, qa: &QaSession) {
        let draft = qa.to_draft();
        self.editing = Some(qa.qa_id);
        self.question_category = draft.question_category;
        self.question = draft.question;
        self.answer = draft.answer;
        self.tracks = draft.grounded_objects.into_iter().collect();
        self.segment_indices = draft.time_segment_indices.into_iter().collect();
    }

    pub fn draft(&self) -> QaDraft {
        QaDraft {
            question_category: self.question_category.clone(),
            question: self.question.trim().to_string(),
            answer: self.answer.trim().to_string(),
            grounded_objects: self.tracks.iter().cloned().collect(),
            time_segment_indices: self.segment_indices.iter().copied().collect(),
        }
    }
}

/// Result of panel interaction.
#[derive(Debug, Clone, PartialEq)]
pub enum QaAction {
    None,
    /// Store the draft as a new session or over `editing`.
    Save(Option<u32>, QaDraft),
    Delete(u32),
    GotoFrame(u32),
}

/// Display the QA panel for `grounding`.
pub fn show(
    ui: &mut egui::Ui,
    form: &mut QaForm,
    grounding: Option<&Grounding>,
    categories: &[String],
) -> QaAction {
    let mut action = QaAction::None;
    let Some(g) = grounding else {
        ui.label(egui::RichText::new("Apply a time segment to start a grounding").weak());
        return action;
    };
    if form.question_category.is_empty() {
        if let Some(first) = categories.first() {
            form.question_category = first.clone();
        }
    }

    ui.heading(match form.editing {
        Some(id) => format!("Edit QA #{}", id),
        None => "New QA".to_string(),
    });

    egui::ComboBox::from_label("Category")
        .selected_text(form.question_category.clone())
        .show_ui(ui, |ui| {
            for category in categories {
                ui.selectable_value(&mut form.question_category, category.clone(), category.as_str());
            }
        });
    ui.label("Question");
    ui.text_edit_multiline(&mut form.question);
    ui.label("Answer");
    ui.text_edit_multiline(&mut form.answer);

    ui.label("Grounded objects");
    let tracks = g.track_ids();
    if tracks.is_empty() {
        ui.label(egui::RichText::new("No tracks yet").weak());
    }
    ui.horizontal_wrapped(|ui| {
        for track_id in &tracks {
            let mut checked = form.tracks.contains(track_id);
            if ui.checkbox(&mut checked, track_id.as_str()).changed() {
                if checked {
                    form.tracks.insert(track_id.clone());
                } else {
                    form.tracks.remove(track_id);
                }
            }
        }
    });
    // A track whose last box was deleted can no longer be grounded.
    form.tracks.retain(|t| tracks.contains(t));

    ui.label("Temporal grounding");
    ui.horizontal_wrapped(|ui| {
        for (index, frame) in g.time_segment().sampled_frames.iter().enumerate() {
            let mut checked = form.segment_indices.contains(&index);
            if ui.checkbox(&mut checked, frame.to_string()).changed() {
                if checked {
                    form.segment_indices.insert(index);
                } else {
                    form.segment_indices.remove(&index);
                }
            }
        }
    });

    ui.horizontal(|ui| {
        let ready = !form.question.trim().is_empty() && !form.answer.trim().is_empty();
        let label = if form.editing.is_some() { "Update" } else { "Add" };
        if ui.add_enabled(ready, egui::Button::new(label)).clicked() {
            action = QaAction::Save(form.editing, form.draft());
        }
        if ui.button("Clear").clicked() {
            form.clear();
        }
    });

    ui.separator();
    ui.heading(format!("QA Sessions ({})", g.qa_sessions().len()));
    egui::ScrollArea::vertical().id_source("qa_sessions").show(ui, |ui| {
        for qa in g.qa_sessions() {
            ui.group(|ui| {
                ui.label(egui::RichText::new(format!("#{} [{}] {}", qa.qa_id, qa.question_category, qa.question)).strong());
                ui.label(format!("A: {}", qa.answer));
                if !qa.grounded_objects.is_empty() {
                    ui.label(format!("Objects: {}", qa.grounded_objects.join(", ")));
                }
                ui.horizontal_wrapped(|ui| {
                    for &frame in &qa.temporal_grounding.frame_indices {
                        if ui.small_button(frame.to_string()).clicked() {
                            action = QaAction::GotoFrame(frame);
                        }
                    }
                });
                ui.horizontal(|ui| {
                    if ui.button("Edit").clicked() {
                        form.load(qa);
                    }
                    if ui.button("Delete").clicked() {
                        action = QaAction::Delete(qa.qa_id);
                    }
                });
            });
        }
    });

    action
}
