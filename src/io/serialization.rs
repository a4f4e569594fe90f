// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Document serialization and deserialization.
//!
//! Documents are written as JSON (the interchange format) or YAML with the
//! same schema. Loading validates every grounding and fails with
//! [`Error::MalformedDocument`] instead of repairing anything. Saving writes
//! to a sibling temporary file and renames it over the target, so a failed
//! save never leaves a half-written document behind.

use crate::error::{Error, Result, Violation};
use crate::models::document::Document;
use std::collections::HashSet;
use std::io::Write;
use std::path::{Path, PathBuf};

/// On-disk document format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    Json,
    Yaml,
}

impl Format {
    /// Pick the format from a file extension.
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|s| s.to_str())
            .map(str::to_ascii_lowercase);
        match extension.as_deref() {
            Some("json") => Ok(Format::Json),
            Some("yaml") | Some("yml") => Ok(Format::Yaml),
            _ => Err(Error::UnsupportedFormat(path.display().to_string())),
        }
    }
}

/// Serialize a document to pretty-printed JSON.
pub fn to_json_string(doc: &Document) -> Result<String> {
    serde_json::to_string_pretty(doc).map_err(write_error)
}

/// Serialize a document to YAML.
pub fn to_yaml_string(doc: &Document) -> Result<String> {
    serde_yaml::to_string(doc).map_err(write_error)
}

fn write_error(e: impl std::fmt::Display) -> Error {
    Error::Serialize(e.to_string())
}

/// Parse and validate a JSON document.
pub fn from_json_str(json: &str) -> Result<Document> {
    let doc: Document =
        serde_json::from_str(json).map_err(|e| Error::MalformedDocument(Violation::Parse(e.to_string())))?;
    finish_load(doc)
}

/// Parse and validate a YAML document.
pub fn from_yaml_str(yaml: &str) -> Result<Document> {
    let doc: Document =
        serde_yaml::from_str(yaml).map_err(|e| Error::MalformedDocument(Violation::Parse(e.to_string())))?;
    finish_load(doc)
}

/// Check cross-grounding and per-grounding invariants, then rebuild the
/// derived track registries.
fn finish_load(mut doc: Document) -> Result<Document> {
    let resolution = doc.video_info().resolution;
    let mut ids = HashSet::new();
    for grounding in doc.groundings() {
        if !ids.insert(grounding.id()) {
            return Err(Error::MalformedDocument(Violation::DuplicateGroundingId(grounding.id())));
        }
        grounding.validate(&resolution).map_err(Error::MalformedDocument)?;
    }
    doc.rebuild_derived();
    Ok(doc)
}

/// Write `doc` to `path`, format chosen by extension.
pub fn save(doc: &Document, path: &Path) -> Result<()> {
    let contents = match Format::from_path(path)? {
        Format::Json => to_json_string(doc)?,
        Format::Yaml => to_yaml_string(doc)?,
    };
    let tmp = temporary_path(path);
    if let Err(e) = write_synced(&tmp, contents.as_bytes()).and_then(|()| std::fs::rename(&tmp, path)) {
        let _ = std::fs::remove_file(&tmp);
        return Err(e.into());
    }
    // Best effort: not every platform can sync a directory.
    if let Some(dir) = path.parent().and_then(|d| std::fs::File::open(d).ok()) {
        let _ = dir.sync_all();
    }
    log::info!(
        "Saved {} grounding(s) to {}",
        doc.groundings().len(),
        path.display()
    );
    Ok(())
}

/// Save `doc` and end its active grounding, which stays in the document as
/// a finished record. On failure the grounding remains active.
pub fn save_and_finish(doc: &mut Document, path: &Path) -> Result<()> {
    save(doc, path)?;
    doc.finish_active_grounding();
    Ok(())
}

/// Read and validate a document from `path`, format chosen by extension.
pub fn load(path: &Path) -> Result<Document> {
    let format = Format::from_path(path)?;
    let contents = std::fs::read_to_string(path)?;
    let doc = match format {
        Format::Json => from_json_str(&contents)?,
        Format::Yaml => from_yaml_str(&contents)?,
    };
    log::info!(
        "Loaded {} grounding(s) for {} from {}",
        doc.groundings().len(),
        doc.video_info().filename,
        path.display()
    );
    Ok(doc)
}

/// Write `bytes` and flush them to disk before returning.
fn write_synced(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    let mut file = std::fs::File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

fn temporary_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}
