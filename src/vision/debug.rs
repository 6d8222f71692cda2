//! Annotated snapshots of every search, for post-hoc inspection.
//!
//! Nothing in here may fail a test run: every error is logged and dropped.

use image::{DynamicImage, Rgba};
use imageproc::drawing::draw_hollow_rect_mut;
use imageproc::rect::Rect;
use rand::Rng;
use std::fs;
use std::path::{Path, PathBuf};

use super::matcher::Needle;
use crate::desktop::types::{Point, ScreenBuffer};

const MATCH_COLOR: Rgba<u8> = Rgba([255, 0, 0, 255]);

#[derive(Debug, Clone)]
pub struct DebugRecorder {
    dir: PathBuf,
    enabled: bool,
}

impl DebugRecorder {
    /// Prepare the output directory, removing files left by earlier runs.
    /// Call once per process, before the first search.
    pub fn init(dir: impl Into<PathBuf>, enabled: bool) -> Self {
        let dir = dir.into();
        if enabled {
            if let Err(e) = fs::create_dir_all(&dir) {
                tracing::warn!("Failed to create debug directory {:?}: {}", dir, e);
            }
            clear_dir(&dir);
        }
        Self { dir, enabled }
    }

    pub fn disabled() -> Self {
        Self {
            dir: PathBuf::new(),
            enabled: false,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Save the searched buffer with a rectangle around each match
    pub fn record_match(&self, needle: &Needle, buffer: &ScreenBuffer, positions: &[Point]) {
        if !self.enabled {
            return;
        }

        let size = needle.size();
        let mut canvas = buffer.image.clone();
        for pos in positions {
            // 2px outline
            draw_hollow_rect_mut(
                &mut canvas,
                Rect::at(pos.x, pos.y).of_size(size.width.max(1), size.height.max(1)),
                MATCH_COLOR,
            );
            if size.width > 2 && size.height > 2 {
                draw_hollow_rect_mut(
                    &mut canvas,
                    Rect::at(pos.x + 1, pos.y + 1).of_size(size.width - 2, size.height - 2),
                    MATCH_COLOR,
                );
            }
        }

        self.persist(&DynamicImage::ImageRgba8(canvas), &needle.label());
    }

    pub fn record_image(&self, image: &DynamicImage, label: &str) {
        if !self.enabled {
            return;
        }
        self.persist(image, label);
    }

    fn persist(&self, image: &DynamicImage, label: &str) {
        let path = self.dir.join(snapshot_name(label));
        match image.save(&path) {
            Ok(()) => tracing::debug!("Saved debug image {:?}", path),
            Err(e) => tracing::warn!("Failed to save debug image {:?}: {}", path, e),
        }
    }
}

/// `<label>_<unix_time>_<random 1..=51>.png`
fn snapshot_name(label: &str) -> String {
    let random_nr = rand::thread_rng().gen_range(1..=51);
    format!("{}_{}_{}.png", label, chrono::Utc::now().timestamp(), random_nr)
}

fn clear_dir(dir: &Path) {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            tracing::warn!("Failed to read debug directory {:?}: {}", dir, e);
            return;
        }
    };

    for entry in entries.filter_map(|e| e.ok()) {
        let path = entry.path();
        if path.is_file() {
            if let Err(e) = fs::remove_file(&path) {
                tracing::warn!("Failed to remove old debug image {:?}: {}", path, e);
            }
        }
    }
}
