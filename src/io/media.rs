// Copyright (c) 2025, Jason Jenkins
// SPDX-License-Identifier: BSD-3-Clause

//! Media file loading.
//!
//! Frames come from a [`VideoSource`]. The bundled source reads a directory
//! of still images (one per frame, ordered by file name) or a single image,
//! decoding with the `image` crate into RGBA pixels ready for an egui
//! texture. Sources are read-only and never see annotation state.

use crate::models::annotation::Resolution;
use crate::models::document::VideoInfo;
use anyhow::{bail, Context, Result};
use std::path::{Path, PathBuf};

/// File extensions treated as frame images.
pub const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp"];

/// Decoded RGBA8 image.
#[derive(Debug, Clone)]
pub struct LoadedImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

/// Load an image file into RGBA8 pixels.
pub fn load_image(path: &Path) -> Result<LoadedImage> {
    let img = image::open(path).with_context(|| format!("opening image {}", path.display()))?;
    let rgba = img.to_rgba8();
    let (width, height) = rgba.dimensions();
    Ok(LoadedImage {
        width,
        height,
        pixels: rgba.into_raw(),
    })
}

/// Read-only frame provider.
pub trait VideoSource: Send + Sync {
    fn total_frames(&self) -> u32;
    fn fps(&self) -> f64;
    fn resolution(&self) -> Resolution;
    fn frame(&self, index: u32) -> Result<LoadedImage>;
}

/// Whether `path` names a file with a known image extension.
pub fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|s| s.to_str())
        .map(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

/// Frames stored as individual image files.
#[derive(Debug, Clone)]
pub struct ImageSequence {
    name: String,
    frames: Vec<PathBuf>,
    fps: f64,
    resolution: Resolution,
}

impl ImageSequence {
    /// Open a directory of frame images, or a single image as a one-frame
    /// video. The first frame fixes the resolution.
    pub fn open(path: &Path, fps: f64) -> Result<Self> {
        let frames = if path.is_dir() {
            let mut frames = Vec::new();
            for entry in std::fs::read_dir(path).with_context(|| format!("reading {}", path.display()))? {
                let entry_path = entry?.path();
                if entry_path.is_file() && is_image(&entry_path) {
                    frames.push(entry_path);
                }
            }
            frames.sort();
            frames
        } else if is_image(path) {
            vec![path.to_path_buf()]
        } else {
            bail!("{} is neither a frame directory nor an image", path.display());
        };

        let Some(first) = frames.first() else {
            bail!("no frame images found in {}", path.display());
        };
        let (width, height) =
            image::image_dimensions(first).with_context(|| format!("reading {}", first.display()))?;

        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.display().to_string());
        log::info!(
            "Opened {} with {} frame(s) at {}x{}",
            path.display(),
            frames.len(),
            width,
            height
        );
        Ok(Self {
            name,
            frames,
            fps,
            resolution: Resolution::new(width, height),
        })
    }

    /// Descriptor for a new document over this sequence.
    pub fn video_info(&self) -> VideoInfo {
        VideoInfo::new(self.name.clone(), self.total_frames(), self.fps, self.resolution)
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl VideoSource for ImageSequence {
    fn total_frames(&self) -> u32 {
        u32::try_from(self.frames.len()).unwrap_or(u32::MAX)
    }

    fn fps(&self) -> f64 {
        self.fps
    }

    fn resolution(&self) -> Resolution {
        self.resolution
    }

    fn frame(&self, index: u32) -> Result<LoadedImage> {
        let Some(path) = self.frames.get(index as usize) else {
            bail!("frame {} out of range ({} frames)", index, self.frames.len());
        };
        load_image(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_frame(dir: &Path, name: &str, width: u32, height: u32, shade: u8) {
        let img = image::RgbaImage::from_pixel(width, height, image::Rgba([shade, shade, shade, 255]));
        img.save(dir.join(name)).unwrap();
    }

    #[test]
    fn test_directory_frames_sorted_by_name() {
        let dir = tempfile::tempdir().unwrap();
        write_frame(dir.path(), "frame_002.png", 8, 6, 20);
        write_frame(dir.path(), "frame_001.png", 8, 6, 10);
        std::fs::write(dir.path().join("notes.txt"), "skip me").unwrap();

        let seq = ImageSequence::open(dir.path(), 25.0).unwrap();
        assert_eq!(seq.total_frames(), 2);
        assert_eq!(seq.resolution(), Resolution::new(8, 6));
        let first = seq.frame(0).unwrap();
        assert_eq!((first.width, first.height), (8, 6));
        assert_eq!(first.pixels.len(), 8 * 6 * 4);
        assert_eq!(first.pixels[0], 10);
        assert!(seq.frame(2).is_err());

        let info = seq.video_info();
        assert_eq!(info.total_frames, 2);
        assert_eq!(info.fps, 25.0);
    }

    #[test]
    fn test_single_image_is_one_frame() {
        let dir = tempfile::tempdir().unwrap();
        write_frame(dir.path(), "still.png", 4, 4, 0);
        let seq = ImageSequence::open(&dir.path().join("still.png"), 30.0).unwrap();
        assert_eq!(seq.total_frames(), 1);
        assert_eq!(seq.name(), "still.png");
    }

    #[test]
    fn test_empty_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ImageSequence::open(dir.path(), 30.0).is_err());
    }

    #[test]
    fn test_is_image_is_case_insensitive() {
        assert!(is_image(Path::new("a/B.PNG")));
        assert!(!is_image(Path::new("clip.mp4")));
    }
}
