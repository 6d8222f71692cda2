//! Template matching
//!
//! Scores are zero-mean normalized cross-correlation (the `TM_CCOEFF_NORMED`
//! measure): 1.0 for an exact copy, around 0 for unrelated content, and 0 for
//! flat windows where the measure is undefined.

use image::GrayImage;
use rayon::prelude::*;
use std::cmp::Ordering;
use std::path::{Path, PathBuf};

use super::debug::DebugRecorder;
use crate::desktop::types::{MatchResult, Point, ScreenBuffer, Size};
use crate::error::{Error, Result};

/// Windows with less variance than this are treated as flat
const MIN_VARIANCE: f64 = 1e-3;

/// Reference image being searched for
#[derive(Debug, Clone)]
pub struct Needle {
    path: PathBuf,
    gray: GrayImage,
}

impl Needle {
    /// Load a needle from disk. A missing or corrupt file is a configuration error.
    pub fn open(path: &Path) -> Result<Self> {
        let image = image::open(path).map_err(|source| Error::NeedleLoad {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            path: path.to_path_buf(),
            gray: image.to_luma8(),
        })
    }

    pub fn from_gray(path: impl Into<PathBuf>, gray: GrayImage) -> Self {
        Self {
            path: path.into(),
            gray,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn gray(&self) -> &GrayImage {
        &self.gray
    }

    pub fn size(&self) -> Size {
        Size::new(self.gray.width(), self.gray.height())
    }

    /// File stem, used to label debug snapshots
    pub fn label(&self) -> String {
        self.path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "needle".to_string())
    }
}

/// Similarity score for every placement of a needle inside a haystack
#[derive(Debug, Clone)]
pub struct ScoreMap {
    width: u32,
    height: u32,
    scores: Vec<f32>,
}

impl ScoreMap {
    /// Returns `None` when the needle is empty or does not fit the haystack
    pub fn compute(haystack: &GrayImage, needle: &GrayImage) -> Option<Self> {
        let (hw, hh) = haystack.dimensions();
        let (nw, nh) = needle.dimensions();
        if nw == 0 || nh == 0 || nw > hw || nh > hh {
            return None;
        }

        let n = f64::from(nw * nh);
        let mean = needle.as_raw().iter().map(|&p| f64::from(p)).sum::<f64>() / n;
        let template: Vec<f32> = needle
            .as_raw()
            .iter()
            .map(|&p| (f64::from(p) - mean) as f32)
            .collect();
        let template_ss: f64 = template.iter().map(|&t| f64::from(t * t)).sum();

        let hay: Vec<f32> = haystack.as_raw().iter().map(|&p| f32::from(p)).collect();
        let integral = Integral::new(haystack);

        let width = hw - nw + 1;
        let height = hh - nh + 1;
        let mut scores = vec![0.0f32; (width * height) as usize];

        if template_ss > MIN_VARIANCE {
            let (hw, nw, nh) = (hw as usize, nw as usize, nh as usize);
            // One score row per task
            scores
                .par_chunks_mut(width as usize)
                .enumerate()
                .for_each(|(y, row_scores)| {
                    for (x, out) in row_scores.iter_mut().enumerate() {
                        let (sum, sum_sq) = integral.window(x, y, nw, nh);
                        let variance = sum_sq - sum * sum / n;
                        if variance <= MIN_VARIANCE {
                            continue;
                        }

                        let mut numerator = 0.0f64;
                        for (row, t_row) in template.chunks_exact(nw).enumerate() {
                            let start = (y + row) * hw + x;
                            let h_row = &hay[start..start + nw];
                            let dot: f32 = t_row.iter().zip(h_row).map(|(t, h)| t * h).sum();
                            numerator += f64::from(dot);
                        }

                        let score = numerator / (template_ss * variance).sqrt();
                        *out = score.clamp(-1.0, 1.0) as f32;
                    }
                });
        }

        Some(Self {
            width,
            height,
            scores,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn get(&self, x: u32, y: u32) -> f32 {
        self.scores[(y * self.width + x) as usize]
    }

    /// Location and value of the highest score; first in row-major order on ties
    pub fn max(&self) -> (Point, f32) {
        let mut best = (0usize, f32::NEG_INFINITY);
        for (i, &score) in self.scores.iter().enumerate() {
            if score > best.1 {
                best = (i, score);
            }
        }
        let w = self.width as usize;
        (Point::new((best.0 % w) as i32, (best.0 / w) as i32), best.1)
    }

    /// Clear a `size` window centered on `at`, clamped to the map extents
    pub fn suppress(&mut self, at: Point, size: Size) {
        let x0 = (at.x - (size.width / 2) as i32).max(0);
        let y0 = (at.y - (size.height / 2) as i32).max(0);
        let x1 = (x0 + size.width as i32).min(self.width as i32);
        let y1 = (y0 + size.height as i32).min(self.height as i32);
        let w = self.width as usize;
        for y in y0..y1 {
            let row = y as usize * w;
            for x in x0..x1 {
                self.scores[row + x as usize] = f32::NEG_INFINITY;
            }
        }
    }
}

/// Summed-area tables for window sums and sums of squares
struct Integral {
    stride: usize,
    sum: Vec<f64>,
    sum_sq: Vec<f64>,
}

impl Integral {
    fn new(image: &GrayImage) -> Self {
        let (w, h) = (image.width() as usize, image.height() as usize);
        let stride = w + 1;
        let mut sum = vec![0.0; stride * (h + 1)];
        let mut sum_sq = vec![0.0; stride * (h + 1)];
        let raw = image.as_raw();
        for y in 0..h {
            let mut row_sum = 0.0;
            let mut row_sq = 0.0;
            for x in 0..w {
                let v = f64::from(raw[y * w + x]);
                row_sum += v;
                row_sq += v * v;
                sum[(y + 1) * stride + x + 1] = sum[y * stride + x + 1] + row_sum;
                sum_sq[(y + 1) * stride + x + 1] = sum_sq[y * stride + x + 1] + row_sq;
            }
        }
        Self {
            stride,
            sum,
            sum_sq,
        }
    }

    fn window(&self, x: usize, y: usize, w: usize, h: usize) -> (f64, f64) {
        let s = self.stride;
        let (a, b, c, d) = (y * s + x, y * s + x + w, (y + h) * s + x, (y + h) * s + x + w);
        (
            self.sum[d] - self.sum[b] - self.sum[c] + self.sum[a],
            self.sum_sq[d] - self.sum_sq[b] - self.sum_sq[c] + self.sum_sq[a],
        )
    }
}

/// Single- and multi-match template search
#[derive(Debug, Clone)]
pub struct Matcher {
    debug: DebugRecorder,
}

impl Matcher {
    pub fn new(debug: DebugRecorder) -> Self {
        Self { debug }
    }

    /// Raw score surface of `needle` over `buffer`; `None` if it does not fit
    pub fn score_map(&self, needle: &Needle, buffer: &ScreenBuffer) -> Option<ScoreMap> {
        ScoreMap::compute(&buffer.to_gray(), needle.gray())
    }

    /// Best match of the needle at `needle_path`, accepted if its score reaches `precision`
    pub fn match_one(
        &self,
        needle_path: &Path,
        buffer: &ScreenBuffer,
        precision: f32,
    ) -> Result<MatchResult> {
        let needle = Needle::open(needle_path)?;
        Ok(self.match_needle(&needle, buffer, precision))
    }

    pub fn match_needle(&self, needle: &Needle, buffer: &ScreenBuffer, precision: f32) -> MatchResult {
        let result = match self.score_map(needle, buffer) {
            Some(map) => {
                let (location, score) = map.max();
                tracing::debug!(
                    "Best score for {} is {:.3} at ({}, {}), precision {}",
                    needle.label(),
                    score,
                    location.x,
                    location.y,
                    precision
                );
                if score >= precision {
                    MatchResult::Found(location)
                } else {
                    MatchResult::NotFound
                }
            }
            None => {
                tracing::debug!(
                    "Needle {} does not fit into {}x{} buffer",
                    needle.label(),
                    buffer.width(),
                    buffer.height()
                );
                MatchResult::NotFound
            }
        };

        let positions: Vec<Point> = result.position().into_iter().collect();
        self.debug.record_match(needle, buffer, &positions);
        result
    }

    /// Every distinct placement scoring above `threshold`, in discovery order
    pub fn match_all(
        &self,
        needle_path: &Path,
        buffer: &ScreenBuffer,
        threshold: f32,
    ) -> Result<Vec<Point>> {
        let needle = Needle::open(needle_path)?;
        Ok(self.match_all_needle(&needle, buffer, threshold))
    }

    pub fn match_all_needle(&self, needle: &Needle, buffer: &ScreenBuffer, threshold: f32) -> Vec<Point> {
        let mut points = Vec::new();
        if let Some(mut map) = self.score_map(needle, buffer) {
            loop {
                let (location, score) = map.max();
                // Only scores strictly above the threshold count; NaN stops too
                if score.partial_cmp(&threshold) != Some(Ordering::Greater) {
                    break;
                }
                points.push(location);
                map.suppress(location, needle.size());
            }
        }

        tracing::debug!(
            "Found {} matches for {} above {}",
            points.len(),
            needle.label(),
            threshold
        );
        self.debug.record_match(needle, buffer, &points);
        points
    }
}
