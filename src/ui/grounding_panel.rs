// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Grounding setup panel.
//!
//! Time segment inputs, object categories, and the list of groundings in
//! the document.

use std::collections::BTreeSet;
use vqa_annotator::config::EditorConfig;
use vqa_annotator::models::document::Document;
use vqa_annotator::models::time_segment;

/// Inputs for the next grounding.
#[derive(Debug, Clone)]
pub struct SegmentForm {
    pub start: u32,
    pub end: u32,
    pub interval: u32,
    pub objects: BTreeSet<String>,
    pub new_category: String,
}

impl SegmentForm {
    pub fn new(config: &EditorConfig) -> Self {
        Self {
            start: 0,
            end: 0,
            interval: config.default_interval.max(1),
            objects: BTreeSet::new(),
            new_category: String::new(),
        }
    }
}

/// Result of panel interaction.
#[derive(Debug, Clone, PartialEq)]
pub enum GroundingAction {
    None,
    Apply,
    Discard,
    RemoveLastBox,
    AddObjectType(String),
    RemoveObjectType(String),
}

/// Display the grounding panel.
pub fn show(
    ui: &mut egui::Ui,
    form: &mut SegmentForm,
    categories: &[String],
    document: Option<&Document>,
) -> GroundingAction {
    let mut action = GroundingAction::None;
    let Some(doc) = document else {
        ui.label(egui::RichText::new("No video loaded").weak());
        return action;
    };
    let active = doc.active();
    let last_frame = doc.video_info().total_frames.saturating_sub(1);

    ui.heading("Time Segment");
    egui::Grid::new("segment_grid").num_columns(2).show(ui, |ui| {
        ui.label("Start frame");
        ui.add(egui::DragValue::new(&mut form.start).range(0..=last_frame));
        ui.end_row();
        ui.label("End frame");
        ui.add(egui::DragValue::new(&mut form.end).range(0..=last_frame));
        ui.end_row();
        ui.label("Interval");
        ui.add(egui::DragValue::new(&mut form.interval).range(1..=u32::MAX));
        ui.end_row();
    });
    match time_segment::sample(form.start, form.end, form.interval) {
        Ok(frames) => ui.label(format!("{} sampled frames", frames.len())),
        Err(e) => ui.colored_label(egui::Color32::LIGHT_RED, e.to_string()),
    };

    ui.separator();
    ui.heading("Objects");
    let mut offered: BTreeSet<String> = categories.iter().cloned().collect();
    offered.extend(form.objects.iter().cloned());
    if let Some(g) = active {
        offered.extend(g.selected_objects().iter().cloned());
    }
    for category in &offered {
        match active {
            // Edits to a live grounding go through the store.
            Some(g) => {
                let mut checked = g.selected_objects().contains(category);
                if ui.checkbox(&mut checked, category.as_str()).changed() {
                    action = if checked {
                        GroundingAction::AddObjectType(category.clone())
                    } else {
                        GroundingAction::RemoveObjectType(category.clone())
                    };
                }
            }
            None => {
                let mut checked = form.objects.contains(category);
                if ui.checkbox(&mut checked, category.as_str()).changed() {
                    if checked {
                        form.objects.insert(category.clone());
                    } else {
                        form.objects.remove(category);
                    }
                }
            }
        }
    }
    ui.horizontal(|ui| {
        ui.text_edit_singleline(&mut form.new_category);
        let name = form.new_category.trim().to_string();
        if ui.add_enabled(!name.is_empty(), egui::Button::new("Add")).clicked() {
            if active.is_some() {
                action = GroundingAction::AddObjectType(name);
            } else {
                form.objects.insert(name);
            }
            form.new_category.clear();
        }
    });

    ui.separator();
    ui.horizontal(|ui| {
        if ui.button("Apply Segment").clicked() {
            action = GroundingAction::Apply;
        }
        if ui.add_enabled(active.is_some(), egui::Button::new("Discard")).clicked() {
            action = GroundingAction::Discard;
        }
    });
    if ui
        .add_enabled(active.is_some(), egui::Button::new("Remove Last Box"))
        .clicked()
    {
        action = GroundingAction::RemoveLastBox;
    }

    if let Some(g) = active {
        ui.separator();
        egui::CollapsingHeader::new("Statistics").show(ui, |ui| {
            let stats = g.statistics();
            ui.label(format!("{} boxes, {} tracks", stats.total, stats.by_track.len()));
            for (object_type, count) in &stats.by_object_type {
                ui.label(format!("{}: {}", object_type, count));
            }
            if let (Some(w), Some(h)) = (stats.width, stats.height) {
                ui.label(format!("Width {:.0}..{:.0} (mean {:.1})", w.min, w.max, w.mean));
                ui.label(format!("Height {:.0}..{:.0} (mean {:.1})", h.min, h.max, h.mean));
            }
        });
    }

    ui.separator();
    ui.heading("Groundings");
    egui::ScrollArea::vertical().id_source("groundings").show(ui, |ui| {
        for g in doc.groundings() {
            let seg = g.time_segment();
            let marker = if Some(g.id()) == doc.active_id() { "▶ " } else { "" };
            let boxes: usize = g.annotations().values().map(Vec::len).sum();
            ui.label(format!(
                "{}#{}  {}..={} / {}  {} boxes, {} QA",
                marker,
                g.id(),
                seg.start_frame,
                seg.end_frame,
                seg.interval,
                boxes,
                g.qa_sessions().len()
            ))
            .on_hover_text(g.created_at().format("%Y-%m-%d %H:%M:%S").to_string());
        }
    });

    action
}
