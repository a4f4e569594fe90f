// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Main application state and egui App implementation.
//!
//! The app owns the document, the interaction controller for the active
//! grounding and the undo history. Panels report actions; the app applies
//! them to the document one at a time. Frame decoding runs on a background
//! thread and only ever produces pixels.

use crate::ui::assignment::{self, AssignmentForm};
use crate::ui::canvas::{self, CanvasInput, CanvasView};
use crate::ui::grounding_panel::{self, GroundingAction, SegmentForm};
use crate::ui::qa_panel::{self, QaAction, QaForm};
use crate::ui::timeline::{self, NavAction};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver};
use std::sync::Arc;
use vqa_annotator::config::{EditorConfig, TrackPalette};
use vqa_annotator::history::History;
use vqa_annotator::interaction::{AssignmentResponse, InteractionController, Outcome};
use vqa_annotator::io::media::{ImageSequence, LoadedImage, VideoSource};
use vqa_annotator::io::serialization;
use vqa_annotator::models::document::{Document, GroundingId};
use vqa_annotator::models::grounding::Grounding;

/// What to show on launch.
pub enum Startup {
    Empty,
    Frames(ImageSequence),
    Document(PathBuf, Document),
}

/// Result of a background frame decode.
struct LoadedFrame {
    index: u32,
    image: Result<LoadedImage, String>,
}

/// Main application state.
pub struct AnnotatorApp {
    config: EditorConfig,

    /// Open document, if any
    document: Option<Document>,
    document_path: Option<PathBuf>,
    /// Unsaved changes
    dirty: bool,

    /// Frame provider for the open video
    source: Option<Arc<dyn VideoSource>>,
    current_frame: u32,
    frame_texture: Option<egui::TextureHandle>,
    texture_frame: Option<u32>,

    /// Gesture state for the active grounding
    controller: Option<InteractionController>,
    history: History,
    palette: TrackPalette,

    segment_form: SegmentForm,
    qa_form: QaForm,
    assignment_form: AssignmentForm,

    /// Receivers for background loading
    frame_loader: Option<Receiver<LoadedFrame>>,
    source_loader: Option<Receiver<Result<ImageSequence, String>>>,
    loading_message: Option<String>,

    /// Last error or notice for the status bar
    status: Option<String>,
}

impl AnnotatorApp {
    pub fn new(config: EditorConfig, startup: Startup) -> Self {
        let mut app = Self {
            segment_form: SegmentForm::new(&config),
            palette: TrackPalette::new(config.track_palette.clone()),
            config,
            document: None,
            document_path: None,
            dirty: false,
            source: None,
            current_frame: 0,
            frame_texture: None,
            texture_frame: None,
            controller: None,
            history: History::new(),
            qa_form: QaForm::default(),
            assignment_form: AssignmentForm::default(),
            frame_loader: None,
            source_loader: None,
            loading_message: None,
            status: None,
        };
        match startup {
            Startup::Empty => {}
            Startup::Frames(frames) => app.attach_source(frames),
            Startup::Document(path, document) => app.install_document(path, document),
        }
        app
    }

    fn set_status(&mut self, message: impl Into<String>) {
        let message = message.into();
        log::warn!("{}", message);
        self.status = Some(message);
    }

    /// Open a frame directory or image in the background.
    fn open_frames(&mut self, path: PathBuf) {
        let (sender, receiver) = channel();
        self.source_loader = Some(receiver);
        self.loading_message = Some("Opening frames...".to_string());
        let fps = self.config.default_fps;

        std::thread::spawn(move || {
            let result = ImageSequence::open(&path, fps).map_err(|e| format!("{:#}", e));
            let _ = sender.send(result);
        });
    }

    /// Use `frames` as the video. A document for another video is replaced
    /// by an empty one.
    fn attach_source(&mut self, frames: ImageSequence) {
        let same_video = self
            .document
            .as_ref()
            .map(|d| d.video_info().filename == frames.name())
            .unwrap_or(false);
        if !same_video {
            self.document = Some(Document::new(frames.video_info()));
            self.document_path = None;
            self.dirty = false;
            self.reset_session();
            self.segment_form.start = 0;
            self.segment_form.end = frames.total_frames().saturating_sub(1);
        }
        self.source = Some(Arc::new(frames));
        self.frame_texture = None;
        self.texture_frame = None;
        self.current_frame = 0;
        self.request_frame(0);
    }

    /// Replace the open document with a freshly loaded one.
    fn install_document(&mut self, path: PathBuf, document: Document) {
        let media = media_path(&path, &document.video_info().filename);
        let end = document.video_info().total_frames.saturating_sub(1);
        self.document = Some(document);
        self.document_path = Some(path);
        self.dirty = false;
        self.reset_session();
        self.segment_form.start = 0;
        self.segment_form.end = end;
        self.source = None;
        self.frame_texture = None;
        self.texture_frame = None;
        self.current_frame = 0;
        match media {
            Some(media) => self.open_frames(media),
            None => log::warn!("Frames for the loaded document were not found"),
        }
    }

    fn reset_session(&mut self) {
        self.controller = None;
        self.history.clear();
        self.palette.reset();
        self.qa_form.clear();
    }

    /// Load a document; on failure the open document stays as it was.
    fn open_document(&mut self, path: PathBuf) {
        match serialization::load(&path) {
            Ok(document) => self.install_document(path, document),
            Err(e) => {
                log::error!("Failed to load {}: {}", path.display(), e);
                self.status = Some(format!("Load failed: {}", e));
            }
        }
    }

    /// Save the document. The active grounding is finished by the save and
    /// a new segment has to be applied before editing again.
    fn save_document(&mut self, path: Option<PathBuf>) {
        if self.busy() {
            self.set_status("Assign or cancel the new box before saving");
            return;
        }
        let Some(doc) = self.document.as_mut() else {
            return;
        };
        let path = match path.or_else(|| self.document_path.clone()) {
            Some(path) => path,
            None => match pick_save_path(doc) {
                Some(path) => path,
                None => return,
            },
        };
        match serialization::save_and_finish(doc, &path) {
            Ok(()) => {
                self.document_path = Some(path);
                self.dirty = false;
                self.reset_session();
                self.status = Some("Saved".to_string());
            }
            Err(e) => {
                log::error!("Failed to save {}: {}", path.display(), e);
                self.status = Some(format!("Save failed: {}", e));
            }
        }
    }

    /// Decode `index` in the background.
    fn request_frame(&mut self, index: u32) {
        let Some(source) = self.source.as_ref().map(Arc::clone) else {
            return;
        };
        let (sender, receiver) = channel();
        self.frame_loader = Some(receiver);

        std::thread::spawn(move || {
            let image = source.frame(index).map_err(|e| format!("{:#}", e));
            let _ = sender.send(LoadedFrame { index, image });
        });
    }

    fn goto_frame(&mut self, frame: u32) {
        if let (Some(doc), Some(ctl)) = (self.document.as_ref(), self.controller.as_mut()) {
            if !ctl.set_frame(doc, frame) {
                self.set_status("Assign or cancel the new box first");
                return;
            }
        }
        if frame != self.current_frame {
            self.current_frame = frame;
            self.request_frame(frame);
        }
    }

    fn apply_segment(&mut self) {
        let Some(doc) = self.document.as_mut() else {
            return;
        };
        let form = &self.segment_form;
        match doc.create_grounding(form.start, form.end, form.interval, form.objects.iter().cloned()) {
            Ok(id) => {
                let first = doc
                    .grounding(id)
                    .and_then(|g| g.time_segment().first())
                    .unwrap_or(form.start);
                self.reset_session();
                self.controller = Some(InteractionController::new(id, first, &self.config));
                self.dirty = true;
                self.goto_frame(first);
            }
            Err(e) => self.set_status(e.to_string()),
        }
    }

    fn discard_grounding(&mut self) {
        let Some(doc) = self.document.as_mut() else {
            return;
        };
        if let Some(objects) = doc.discard_active_grounding() {
            self.segment_form.objects = objects.into_iter().collect();
            self.reset_session();
            self.dirty = true;
        }
    }

    /// Run a store edit on the active grounding, recording undo state.
    fn edit_active<F>(&mut self, edit: F) -> bool
    where
        F: FnOnce(&mut Document, GroundingId) -> vqa_annotator::Result<()>,
    {
        let Some(doc) = self.document.as_mut() else {
            return false;
        };
        let Some(id) = doc.active_id() else {
            return false;
        };
        let before = doc.active().cloned();
        match edit(doc, id) {
            Ok(()) => {
                if let Some(before) = before {
                    self.history.push(before);
                }
                self.dirty = true;
                self.refresh_selection();
                true
            }
            Err(e) => {
                self.set_status(e.to_string());
                false
            }
        }
    }

    /// Record the result of a controller event.
    fn record(&mut self, before: Option<Grounding>, result: vqa_annotator::Result<Outcome>) {
        match result {
            Ok(outcome) => {
                log::debug!("Gesture outcome: {:?}", outcome);
                if outcome.is_mutation() {
                    if let Some(before) = before {
                        self.history.push(before);
                    }
                    self.dirty = true;
                    self.status = None;
                }
                if let Outcome::AssignmentRequested(request) = &outcome {
                    self.assignment_form.prepare(request);
                }
            }
            Err(e) => self.set_status(e.to_string()),
        }
    }

    fn handle_canvas_input(&mut self, input: CanvasInput) {
        let (Some(doc), Some(ctl)) = (self.document.as_mut(), self.controller.as_mut()) else {
            return;
        };
        match input {
            CanvasInput::Pressed { pos, force_new } => {
                let outcome = ctl.pointer_pressed(doc, pos, force_new);
                log::debug!("Press at ({:.0}, {:.0}): {:?}", pos.x, pos.y, outcome);
            }
            CanvasInput::Dragged(pos) => ctl.pointer_dragged(doc, pos),
            CanvasInput::Released(pos) => {
                let before = doc.active().cloned();
                let result = ctl.pointer_released(doc, pos);
                self.record(before, result);
            }
            CanvasInput::SecondaryClick(pos) => {
                let before = doc.active().cloned();
                let result = ctl.secondary_click(doc, pos);
                self.record(before, result);
            }
            CanvasInput::Cancel => {
                ctl.cancel();
            }
        }
    }

    fn resolve_assignment(&mut self, response: AssignmentResponse) {
        let (Some(doc), Some(ctl)) = (self.document.as_mut(), self.controller.as_mut()) else {
            return;
        };
        let before = doc.active().cloned();
        match ctl.resolve_assignment(doc, response) {
            Ok(outcome) => self.record(before, Ok(outcome)),
            // The request stays open; show why in the window.
            Err(e) => {
                log::warn!("Assignment rejected: {}", e);
                self.assignment_form.error = Some(e.to_string());
            }
        }
    }

    fn delete_selected(&mut self) {
        let (Some(doc), Some(ctl)) = (self.document.as_mut(), self.controller.as_mut()) else {
            return;
        };
        let before = doc.active().cloned();
        let result = ctl.delete_pressed(doc);
        self.record(before, result);
    }

    /// Re-check the selection after the grounding changed under it.
    fn refresh_selection(&mut self) {
        if let (Some(doc), Some(ctl)) = (self.document.as_ref(), self.controller.as_mut()) {
            ctl.set_frame(doc, self.current_frame);
        }
    }

    fn busy(&self) -> bool {
        self.controller
            .as_ref()
            .map(|c| c.pending_assignment().is_some())
            .unwrap_or(false)
    }

    fn undo(&mut self) {
        if self.busy() {
            return;
        }
        let Some(doc) = self.document.as_mut() else {
            return;
        };
        let Some(current) = doc.active().cloned() else {
            return;
        };
        if let Some(previous) = self.history.undo(current) {
            match doc.restore_grounding(previous) {
                Ok(()) => {
                    log::info!("Undo");
                    self.dirty = true;
                    self.refresh_selection();
                }
                Err(e) => self.set_status(e.to_string()),
            }
        }
    }

    fn redo(&mut self) {
        if self.busy() {
            return;
        }
        let Some(doc) = self.document.as_mut() else {
            return;
        };
        let Some(current) = doc.active().cloned() else {
            return;
        };
        if let Some(next) = self.history.redo(current) {
            match doc.restore_grounding(next) {
                Ok(()) => {
                    log::info!("Redo");
                    self.dirty = true;
                    self.refresh_selection();
                }
                Err(e) => self.set_status(e.to_string()),
            }
        }
    }

    fn handle_grounding_action(&mut self, action: GroundingAction) {
        match action {
            GroundingAction::None => {}
            GroundingAction::Apply => self.apply_segment(),
            GroundingAction::Discard => self.discard_grounding(),
            GroundingAction::RemoveLastBox => {
                let frame = self.current_frame;
                self.edit_active(|doc, id| doc.pop_last_box(id, frame).map(|_| ()));
            }
            GroundingAction::AddObjectType(object_type) => {
                self.edit_active(|doc, id| doc.add_object_type(id, &object_type));
            }
            GroundingAction::RemoveObjectType(object_type) => {
                self.edit_active(|doc, id| doc.remove_object_type(id, &object_type));
            }
        }
    }

    fn handle_qa_action(&mut self, action: QaAction) {
        match action {
            QaAction::None => {}
            QaAction::Save(None, draft) => {
                if self.edit_active(|doc, id| doc.add_qa_session(id, draft).map(|_| ())) {
                    self.qa_form.clear();
                }
            }
            QaAction::Save(Some(qa_id), draft) => {
                if self.edit_active(|doc, id| doc.update_qa_session(id, qa_id, draft)) {
                    self.qa_form.clear();
                }
            }
            QaAction::Delete(qa_id) => {
                let deleted = self.edit_active(|doc, id| doc.delete_qa_session(id, qa_id).map(|_| ()));
                if deleted && self.qa_form.editing == Some(qa_id) {
                    self.qa_form.clear();
                }
            }
            QaAction::GotoFrame(frame) => self.goto_frame(frame),
        }
    }

    fn poll_loaders(&mut self, ctx: &egui::Context) {
        if let Some(receiver) = &self.source_loader {
            if let Ok(result) = receiver.try_recv() {
                self.source_loader = None;
                self.loading_message = None;
                match result {
                    Ok(frames) => self.attach_source(frames),
                    Err(e) => {
                        log::error!("Failed to open frames: {}", e);
                        self.status = Some(e);
                    }
                }
            }
        }

        if let Some(receiver) = &self.frame_loader {
            if let Ok(loaded) = receiver.try_recv() {
                self.frame_loader = None;
                // Stale decodes for frames no longer shown are dropped.
                if loaded.index == self.current_frame {
                    match loaded.image {
                        Ok(image) => {
                            let size = [image.width as usize, image.height as usize];
                            let color_image = egui::ColorImage::from_rgba_unmultiplied(size, &image.pixels);
                            self.frame_texture =
                                Some(ctx.load_texture("frame", color_image, egui::TextureOptions::LINEAR));
                            self.texture_frame = Some(loaded.index);
                        }
                        Err(e) => {
                            log::error!("Failed to decode frame {}: {}", loaded.index, e);
                            self.frame_texture = None;
                            self.texture_frame = None;
                        }
                    }
                }
            }
        }

        if self.loading_message.is_some() || self.frame_loader.is_some() {
            ctx.request_repaint();
        }
    }

    fn handle_keyboard(&mut self, ctx: &egui::Context) {
        if ctx.input(|i| i.key_pressed(egui::Key::Escape)) {
            if self.busy() {
                self.resolve_assignment(AssignmentResponse::Cancel);
            } else if let Some(ctl) = self.controller.as_mut() {
                ctl.cancel();
            }
        }

        // Text fields keep their keys.
        if ctx.wants_keyboard_input() || self.busy() {
            return;
        }

        if ctx.input(|i| i.key_pressed(egui::Key::Delete) || i.key_pressed(egui::Key::Backspace)) {
            self.delete_selected();
        }
        if ctx.input(|i| i.modifiers.command && i.key_pressed(egui::Key::Z) && !i.modifiers.shift) {
            self.undo();
        }
        if ctx.input(|i| {
            (i.modifiers.command && i.modifiers.shift && i.key_pressed(egui::Key::Z))
                || (i.modifiers.command && i.key_pressed(egui::Key::Y))
        }) {
            self.redo();
        }
        if ctx.input(|i| i.modifiers.command && i.key_pressed(egui::Key::S)) {
            self.save_document(None);
        }

        let segment = self
            .document
            .as_ref()
            .and_then(|d| d.active())
            .map(|g| g.time_segment().clone());
        if let Some(segment) = segment {
            if ctx.input(|i| i.key_pressed(egui::Key::A) && !i.modifiers.command) {
                if let Some(frame) = segment.prev_sample(self.current_frame) {
                    self.goto_frame(frame);
                }
            }
            if ctx.input(|i| i.key_pressed(egui::Key::D) && !i.modifiers.command) {
                if let Some(frame) = segment.next_sample(self.current_frame) {
                    self.goto_frame(frame);
                }
            }
        }
    }

    fn show_menu(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::top("menu_bar").show(ctx, |ui| {
            egui::menu::bar(ui, |ui| {
                ui.menu_button("File", |ui| {
                    if ui.button("Open Frames...").clicked() {
                        if let Some(path) = rfd::FileDialog::new().pick_folder() {
                            self.open_frames(path);
                        }
                        ui.close_menu();
                    }
                    if ui.button("Open Image...").clicked() {
                        if let Some(path) = rfd::FileDialog::new()
                            .add_filter("Images", vqa_annotator::io::media::IMAGE_EXTENSIONS)
                            .pick_file()
                        {
                            self.open_frames(path);
                        }
                        ui.close_menu();
                    }
                    if ui.button("Open Document...").clicked() {
                        if let Some(path) = rfd::FileDialog::new()
                            .add_filter("Documents", &["json", "yaml", "yml"])
                            .pick_file()
                        {
                            self.open_document(path);
                        }
                        ui.close_menu();
                    }
                    ui.separator();
                    let has_doc = self.document.is_some();
                    if ui.add_enabled(has_doc, egui::Button::new("Save (Ctrl+S)")).clicked() {
                        self.save_document(None);
                        ui.close_menu();
                    }
                    if ui.add_enabled(has_doc, egui::Button::new("Save As...")).clicked() {
                        if let Some(path) = self.document.as_ref().and_then(pick_save_path) {
                            self.save_document(Some(path));
                        }
                        ui.close_menu();
                    }
                    ui.separator();
                    if ui.button("Quit").clicked() {
                        ctx.send_viewport_cmd(egui::ViewportCommand::Close);
                    }
                });

                ui.menu_button("Edit", |ui| {
                    if ui
                        .add_enabled(self.history.can_undo(), egui::Button::new("Undo (Ctrl+Z)"))
                        .clicked()
                    {
                        self.undo();
                        ui.close_menu();
                    }
                    if ui
                        .add_enabled(self.history.can_redo(), egui::Button::new("Redo (Ctrl+Shift+Z)"))
                        .clicked()
                    {
                        self.redo();
                        ui.close_menu();
                    }
                    ui.separator();
                    let has_selection = self
                        .controller
                        .as_ref()
                        .and_then(|c| c.selected())
                        .is_some();
                    if ui
                        .add_enabled(has_selection, egui::Button::new("Delete Selected"))
                        .clicked()
                    {
                        self.delete_selected();
                        ui.close_menu();
                    }
                });
            });
        });
    }

    fn show_status_bar(&mut self, ctx: &egui::Context) {
        egui::TopBottomPanel::bottom("status_bar").show(ctx, |ui| {
            ui.horizontal(|ui| {
                let name = self
                    .document_path
                    .as_ref()
                    .map(|p| p.display().to_string())
                    .unwrap_or_else(|| "unsaved document".to_string());
                ui.label(if self.dirty { format!("{} *", name) } else { name });
                if let Some(status) = &self.status {
                    ui.separator();
                    ui.label(egui::RichText::new(status.as_str()).color(egui::Color32::YELLOW));
                }
                if self.controller.is_some() {
                    ui.separator();
                    ui.label(
                        egui::RichText::new("Drag to draw, Ctrl-drag to force a new box, right-click to delete")
                            .italics()
                            .weak(),
                    );
                }
            });
        });
    }
}

impl eframe::App for AnnotatorApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.poll_loaders(ctx);
        self.show_menu(ctx);
        self.show_status_bar(ctx);

        // Navigation bar
        let (total_frames, segment, progress) = match self.document.as_ref() {
            Some(doc) => (
                doc.video_info().total_frames,
                doc.active().map(|g| g.time_segment().clone()),
                doc.active().map(Grounding::progress),
            ),
            None => (0, None, None),
        };
        let nav = egui::TopBottomPanel::bottom("timeline")
            .show(ctx, |ui| {
                timeline::show(ui, self.current_frame, total_frames, segment.as_ref(), progress.as_ref())
            })
            .inner;
        if let NavAction::Goto(frame) = nav {
            self.goto_frame(frame);
        }

        // Grounding panel (left side)
        let grounding_action = egui::SidePanel::left("grounding")
            .default_width(240.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical()
                    .show(ui, |ui| {
                        grounding_panel::show(
                            ui,
                            &mut self.segment_form,
                            &self.config.object_categories,
                            self.document.as_ref(),
                        )
                    })
                    .inner
            })
            .inner;
        self.handle_grounding_action(grounding_action);

        // QA panel (right side)
        let qa_action = egui::SidePanel::right("qa")
            .default_width(300.0)
            .show(ctx, |ui| {
                qa_panel::show(
                    ui,
                    &mut self.qa_form,
                    self.document.as_ref().and_then(|d| d.active()),
                    &self.config.question_categories,
                )
            })
            .inner;
        self.handle_qa_action(qa_action);

        // Main canvas (center)
        let output = egui::CentralPanel::default()
            .show(ctx, |ui| {
                let document = self.document.as_ref();
                let active = document.and_then(|d| d.active());
                let controller = self.controller.as_ref();
                let editable = controller.is_some()
                    && active
                        .map(|g| g.time_segment().contains(self.current_frame))
                        .unwrap_or(false);
                let message = if let Some(message) = &self.loading_message {
                    Some(message.clone())
                } else if self.source.is_none() && document.is_some() {
                    Some("Frames not loaded".to_string())
                } else if self.texture_frame != Some(self.current_frame) && self.source.is_some() {
                    Some(format!("Loading frame {}...", self.current_frame))
                } else {
                    None
                };
                let view = CanvasView {
                    texture: self
                        .frame_texture
                        .as_ref()
                        .filter(|_| self.texture_frame == Some(self.current_frame)),
                    resolution: document.map(|d| d.video_info().resolution).unwrap_or_default(),
                    boxes: active.map(|g| g.boxes_at(self.current_frame)).unwrap_or(&[]),
                    selected: controller.and_then(|c| c.selected()),
                    preview: controller.and_then(|c| c.preview()),
                    tolerance: self.config.tolerance(),
                    editable,
                    message: message.as_deref(),
                };
                canvas::show(ui, view, &mut self.palette)
            })
            .inner;
        if let (Some(scale), Some(ctl)) = (output.display_scale, self.controller.as_mut()) {
            ctl.set_display_scale(scale);
        }
        for input in output.inputs {
            self.handle_canvas_input(input);
        }

        // Assignment window for a freshly drawn box
        let pending = self
            .controller
            .as_ref()
            .and_then(|c| c.pending_assignment())
            .cloned();
        if let Some(request) = pending {
            if let Some(response) = assignment::show(ctx, &mut self.assignment_form, &request) {
                self.resolve_assignment(response);
            }
        }

        self.handle_keyboard(ctx);
    }
}

/// Locate the frames a document was made from: the stored name as given,
/// or relative to the document's directory.
fn media_path(document_path: &Path, filename: &str) -> Option<PathBuf> {
    document_path
        .parent()
        .map(|dir| dir.join(filename))
        .into_iter()
        .chain(std::iter::once(PathBuf::from(filename)))
        .find(|p| p.exists())
}

fn pick_save_path(doc: &Document) -> Option<PathBuf> {
    let stem = Path::new(&doc.video_info().filename)
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "annotations".to_string());
    rfd::FileDialog::new()
        .add_filter("JSON", &["json"])
        .add_filter("YAML", &["yaml", "yml"])
        .set_file_name(format!("{}_annotation.json", stem))
        .save_file()
}
