// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Frame canvas.
//!
//! Shows the current frame scaled to fit, draws the boxes of the active
//! grounding on top, and reports pointer input in image coordinates. The
//! canvas never edits annotations itself; the app feeds its input to the
//! interaction controller.

use vqa_annotator::config::TrackPalette;
use vqa_annotator::models::annotation::{BoundingBox, Point, Resolution};
use vqa_annotator::util::geometry::{self, Handle, Rect, Tolerance, Zone};

/// Pointer input in image coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CanvasInput {
    Pressed { pos: Point, force_new: bool },
    Dragged(Point),
    Released(Point),
    SecondaryClick(Point),
    /// The pointer was lost mid-gesture.
    Cancel,
}

/// Everything the canvas draws.
pub struct CanvasView<'a> {
    pub texture: Option<&'a egui::TextureHandle>,
    pub resolution: Resolution,
    pub boxes: &'a [BoundingBox],
    pub selected: Option<&'a str>,
    /// Track being edited (or `None` for a new box) and its live geometry.
    pub preview: Option<(Option<&'a str>, Rect)>,
    pub tolerance: Tolerance,
    /// Whether pointer input is accepted.
    pub editable: bool,
    pub message: Option<&'a str>,
}

/// What happened on the canvas this frame.
#[derive(Debug, Default)]
pub struct CanvasOutput {
    pub inputs: Vec<CanvasInput>,
    /// Screen pixels per image pixel.
    pub display_scale: Option<f64>,
}

/// Display the canvas and collect pointer input.
pub fn show(ui: &mut egui::Ui, view: CanvasView<'_>, palette: &mut TrackPalette) -> CanvasOutput {
    let mut output = CanvasOutput::default();
    ui.style_mut().visuals.extreme_bg_color = egui::Color32::from_gray(40);
    let available_size = ui.available_size();

    egui::Frame::canvas(ui.style()).show(ui, |ui| {
        ui.set_min_size(available_size);

        if view.resolution.width == 0 || view.resolution.height == 0 {
            show_welcome(ui, view.message);
            return;
        }

        let image_rect = fit_rect(ui, view.resolution);
        let scale = image_rect.width() / view.resolution.width as f32;
        output.display_scale = Some(scale as f64);

        match view.texture {
            Some(texture) => ui.painter().image(
                texture.id(),
                image_rect,
                egui::Rect::from_min_max(egui::pos2(0.0, 0.0), egui::pos2(1.0, 1.0)),
                egui::Color32::WHITE,
            ),
            None => ui.painter().rect_filled(image_rect, 0.0, egui::Color32::from_gray(25)),
        };
        if let Some(message) = view.message {
            ui.painter().text(
                image_rect.center(),
                egui::Align2::CENTER_CENTER,
                message,
                egui::FontId::proportional(16.0),
                egui::Color32::from_gray(200),
            );
        }

        let to_image = |pos: egui::Pos2| {
            Point::new(
                ((pos.x - image_rect.min.x) / scale) as f64,
                ((pos.y - image_rect.min.y) / scale) as f64,
            )
        };

        if view.editable {
            let response = ui.allocate_rect(image_rect, egui::Sense::click_and_drag());
            collect_input(ui, &response, &to_image, &mut output.inputs);

            if let Some(hover) = response.hover_pos() {
                let tolerance = view.tolerance.scaled(scale as f64);
                let hit = geometry::pick(view.boxes.iter().map(|b| b.rect()), to_image(hover), &tolerance);
                ui.ctx().set_cursor_icon(cursor_for(hit.map(|(_, zone)| zone)));
            }
        }

        let painter = ui.painter_at(image_rect);
        let to_screen = |rect: Rect| {
            egui::Rect::from_min_size(
                image_rect.min + egui::vec2(rect.x as f32 * scale, rect.y as f32 * scale),
                egui::vec2(rect.width as f32 * scale, rect.height as f32 * scale),
            )
        };

        for b in view.boxes {
            let rect = match view.preview {
                Some((Some(track_id), preview)) if track_id == b.track_id => preview,
                _ => b.rect(),
            };
            let [r, g, bl] = palette.colour(&b.track_id);
            let colour = egui::Color32::from_rgb(r, g, bl);
            let selected = view.selected == Some(b.track_id.as_str());
            draw_box(&painter, to_screen(rect), colour, &b.track_id, selected);
        }

        if let Some((None, rect)) = view.preview {
            painter.rect_stroke(
                to_screen(rect),
                0.0,
                egui::Stroke::new(2.0, egui::Color32::WHITE),
            );
        }
    });

    output
}

/// Largest rectangle with the frame's aspect ratio, centred.
fn fit_rect(ui: &egui::Ui, resolution: Resolution) -> egui::Rect {
    let available = ui.available_size();
    let img_aspect = resolution.width as f32 / resolution.height as f32;
    let available_aspect = available.x / available.y;

    let (display_width, display_height) = if img_aspect > available_aspect {
        (available.x, available.x / img_aspect)
    } else {
        (available.y * img_aspect, available.y)
    };

    let x_offset = (available.x - display_width) / 2.0;
    let y_offset = (available.y - display_height) / 2.0;
    egui::Rect::from_min_size(
        ui.min_rect().min + egui::vec2(x_offset, y_offset),
        egui::vec2(display_width, display_height),
    )
}

fn collect_input(
    ui: &egui::Ui,
    response: &egui::Response,
    to_image: &dyn Fn(egui::Pos2) -> Point,
    inputs: &mut Vec<CanvasInput>,
) {
    // Ctrl/Cmd-drag always draws a new box.
    let force_new = ui.input(|i| i.modifiers.command);
    let primary = egui::PointerButton::Primary;

    if response.drag_started_by(primary) {
        if let Some(origin) = ui.input(|i| i.pointer.press_origin()) {
            inputs.push(CanvasInput::Pressed {
                pos: to_image(origin),
                force_new,
            });
        }
    }
    if response.dragged_by(primary) {
        if let Some(pos) = response.interact_pointer_pos() {
            inputs.push(CanvasInput::Dragged(to_image(pos)));
        }
    }
    if response.drag_stopped_by(primary) {
        let last = response
            .interact_pointer_pos()
            .or_else(|| ui.input(|i| i.pointer.latest_pos()));
        inputs.push(match last {
            Some(pos) => CanvasInput::Released(to_image(pos)),
            None => CanvasInput::Cancel,
        });
    } else if response.clicked() {
        if let Some(pos) = response.interact_pointer_pos() {
            let pos = to_image(pos);
            inputs.push(CanvasInput::Pressed { pos, force_new });
            inputs.push(CanvasInput::Released(pos));
        }
    }
    if response.secondary_clicked() {
        if let Some(pos) = response.interact_pointer_pos() {
            inputs.push(CanvasInput::SecondaryClick(to_image(pos)));
        }
    }
}

fn cursor_for(zone: Option<Zone>) -> egui::CursorIcon {
    match zone {
        Some(Zone::Handle(Handle::TopLeft | Handle::BottomRight)) => egui::CursorIcon::ResizeNwSe,
        Some(Zone::Handle(Handle::TopRight | Handle::BottomLeft)) => egui::CursorIcon::ResizeNeSw,
        Some(Zone::Handle(Handle::Top | Handle::Bottom)) => egui::CursorIcon::ResizeVertical,
        Some(Zone::Handle(Handle::Left | Handle::Right)) => egui::CursorIcon::ResizeHorizontal,
        Some(Zone::Inside) => egui::CursorIcon::Move,
        Some(Zone::Outside) | None => egui::CursorIcon::Crosshair,
    }
}

fn draw_box(painter: &egui::Painter, rect: egui::Rect, colour: egui::Color32, label: &str, selected: bool) {
    let width = if selected { 3.0 } else { 2.0 };
    painter.rect_stroke(rect, 0.0, egui::Stroke::new(width, colour));
    painter.text(
        rect.left_top() - egui::vec2(0.0, 2.0),
        egui::Align2::LEFT_BOTTOM,
        label,
        egui::FontId::proportional(12.0),
        colour,
    );
    if selected {
        for corner in [rect.left_top(), rect.right_top(), rect.left_bottom(), rect.right_bottom()] {
            let handle = egui::Rect::from_center_size(corner, egui::vec2(8.0, 8.0));
            painter.rect_filled(handle, 0.0, egui::Color32::WHITE);
            painter.rect_stroke(handle, 0.0, egui::Stroke::new(1.0, egui::Color32::BLACK));
        }
    }
}

fn show_welcome(ui: &mut egui::Ui, message: Option<&str>) {
    ui.centered_and_justified(|ui| {
        ui.vertical_centered(|ui| {
            ui.add_space(20.0);
            ui.heading(
                egui::RichText::new("VQA Annotator")
                    .size(32.0)
                    .color(egui::Color32::from_gray(200)),
            );
            ui.label(
                egui::RichText::new("Video QA grounding")
                    .size(14.0)
                    .color(egui::Color32::from_gray(150)),
            );
            ui.add_space(20.0);
            ui.label(
                egui::RichText::new(message.unwrap_or("Open a frame directory or a document to begin"))
                    .color(egui::Color32::from_gray(180)),
            );
            ui.add_space(10.0);
            ui.label(
                egui::RichText::new("File → Open Frames...")
                    .weak()
                    .color(egui::Color32::from_gray(130)),
            );
        });
    });
}
