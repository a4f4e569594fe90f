// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! VQA Annotator - video question/answer grounding tool
//!
//! A desktop application for drawing tracked bounding boxes over sampled
//! video frames and attaching question/answer pairs to them.
//!
//! Usage: `vqa-annotator [FRAMES_DIR | IMAGE | DOCUMENT.json | DOCUMENT.yaml]`

mod app;
mod ui;

use anyhow::{Context, Result};
use app::{AnnotatorApp, Startup};
use std::path::PathBuf;
use vqa_annotator::config::EditorConfig;
use vqa_annotator::io::media::ImageSequence;
use vqa_annotator::io::serialization::{self, Format};

fn main() -> Result<()> {
    // Initialize logging
    env_logger::init();

    let config = EditorConfig::discover();

    let startup = match std::env::args_os().nth(1).map(PathBuf::from) {
        None => Startup::Empty,
        Some(path) if Format::from_path(&path).is_ok() => {
            let document = serialization::load(&path)
                .with_context(|| format!("loading document {}", path.display()))?;
            Startup::Document(path, document)
        }
        Some(path) => {
            let frames = ImageSequence::open(&path, config.default_fps)?;
            Startup::Frames(frames)
        }
    };

    // Configure egui options
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1400.0, 860.0])
            .with_min_inner_size([1000.0, 640.0])
            .with_title("VQA Annotator"),
        ..Default::default()
    };

    // Run the application
    eframe::run_native(
        "VQA Annotator",
        options,
        Box::new(move |_cc| Ok(Box::new(AnnotatorApp::new(config, startup)))),
    )
    .map_err(|e| anyhow::anyhow!("Application error: {}", e))?;

    Ok(())
}
