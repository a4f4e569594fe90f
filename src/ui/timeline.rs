// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Frame navigation bar.
//!
//! With an active grounding the bar steps between sampled frames and shows
//! annotation progress; otherwise it scrubs raw frames.

use vqa_annotator::models::grounding::Progress;
use vqa_annotator::models::time_segment::TimeSegment;

/// Raw frames skipped by the coarse step buttons.
pub const COARSE_STEP: i64 = 10;

/// Result of navigation interaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NavAction {
    None,
    Goto(u32),
}

/// Display the navigation bar.
pub fn show(
    ui: &mut egui::Ui,
    current_frame: u32,
    total_frames: u32,
    segment: Option<&TimeSegment>,
    progress: Option<&Progress>,
) -> NavAction {
    let mut action = NavAction::None;
    if total_frames == 0 {
        return action;
    }
    let last_frame = total_frames - 1;

    ui.horizontal(|ui| {
        match segment.filter(|s| !s.is_empty()) {
            Some(seg) => {
                if ui.button(format!("⏪ -{}", COARSE_STEP)).clicked() {
                    action = goto(seg.step_frames(current_frame, -COARSE_STEP));
                }
                if ui.button("◀ Prev").clicked() {
                    action = goto(seg.prev_sample(current_frame));
                }
                if ui.button("Next ▶").clicked() {
                    action = goto(seg.next_sample(current_frame));
                }
                if ui.button(format!("+{} ⏩", COARSE_STEP)).clicked() {
                    action = goto(seg.step_frames(current_frame, COARSE_STEP));
                }

                let position = seg.position_of(current_frame);
                let mut index = position.unwrap_or(0);
                let slider = egui::Slider::new(&mut index, 0..=seg.len() - 1).text("sample");
                if ui.add(slider).changed() {
                    action = goto(seg.frame_at(index));
                }
                ui.separator();
                match position {
                    Some(i) => ui.label(format!("Frame {} (sample {}/{})", current_frame, i + 1, seg.len())),
                    None => ui.colored_label(
                        egui::Color32::YELLOW,
                        format!("Frame {} is not sampled", current_frame),
                    ),
                };
            }
            None => {
                if ui.button("◀").clicked() {
                    action = goto(current_frame.checked_sub(1));
                }
                if ui.button("▶").clicked() && current_frame < last_frame {
                    action = NavAction::Goto(current_frame + 1);
                }
                let mut frame = current_frame;
                if ui
                    .add(egui::Slider::new(&mut frame, 0..=last_frame).text("frame"))
                    .changed()
                {
                    action = NavAction::Goto(frame);
                }
            }
        }
    });

    if let Some(progress) = progress {
        let text = format!("{}/{} sampled frames annotated", progress.annotated, progress.total);
        ui.add(egui::ProgressBar::new(progress.ratio() as f32).text(text));
    }

    action
}

fn goto(frame: Option<u32>) -> NavAction {
    frame.map(NavAction::Goto).unwrap_or(NavAction::None)
}
