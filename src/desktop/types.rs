use image::{GrayImage, RgbaImage};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{Error, Result};

/// Pixel coordinate. Buffer space or logical screen space depending on context.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    pub fn offset(&self, dx: i32, dy: i32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Size {
    pub width: u32,
    pub height: u32,
}

impl Size {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Center of an object of this size whose top-left corner is at `top_left`
    pub fn center_from(&self, top_left: Point) -> Point {
        top_left.offset((self.width / 2) as i32, (self.height / 2) as i32)
    }
}

/// Screen rectangle given as `(x1, y1)` top-left and `(x2, y2)` bottom-right (exclusive)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl Region {
    /// Create a region, rejecting empty or inverted rectangles
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Result<Self> {
        if x2 <= x1 || y2 <= y1 {
            return Err(Error::InvalidRegion { x1, y1, x2, y2 });
        }
        Ok(Self { x1, y1, x2, y2 })
    }

    pub fn full(size: Size) -> Self {
        Self {
            x1: 0,
            y1: 0,
            x2: size.width as i32,
            y2: size.height as i32,
        }
    }

    pub fn width(&self) -> u32 {
        (self.x2 - self.x1) as u32
    }

    pub fn height(&self) -> u32 {
        (self.y2 - self.y1) as u32
    }

    pub fn origin(&self) -> Point {
        Point::new(self.x1, self.y1)
    }

    /// Clip to a screen of the given size. Fails only when nothing is left.
    pub fn clamp_to(&self, size: Size) -> Result<Self> {
        let clamped = Self {
            x1: self.x1.clamp(0, size.width as i32),
            y1: self.y1.clamp(0, size.height as i32),
            x2: self.x2.clamp(0, size.width as i32),
            y2: self.y2.clamp(0, size.height as i32),
        };
        if clamped.x2 <= clamped.x1 || clamped.y2 <= clamped.y1 {
            return Err(Error::InvalidRegion {
                x1: self.x1,
                y1: self.y1,
                x2: self.x2,
                y2: self.y2,
            });
        }
        Ok(clamped)
    }
}

/// A captured frame, already reconciled to logical screen size.
///
/// `origin` is the logical screen region the pixels came from, so buffer
/// positions can be mapped back with [`ScreenBuffer::to_screen`].
#[derive(Debug, Clone)]
pub struct ScreenBuffer {
    pub image: RgbaImage,
    pub origin: Region,
}

impl ScreenBuffer {
    pub fn new(image: RgbaImage, origin: Region) -> Self {
        Self { image, origin }
    }

    /// Wrap an image as if it covered the screen from (0, 0)
    pub fn from_image(image: RgbaImage) -> Self {
        let origin = Region::full(Size::new(image.width(), image.height()));
        Self { image, origin }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn size(&self) -> Size {
        Size::new(self.width(), self.height())
    }

    pub fn to_gray(&self) -> GrayImage {
        image::imageops::grayscale(&self.image)
    }

    /// Translate a buffer-space position into logical screen coordinates
    pub fn to_screen(&self, point: Point) -> Point {
        point.offset(self.origin.x1, self.origin.y1)
    }
}

/// Outcome of a single-match search
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchResult {
    NotFound,
    Found(Point),
}

impl MatchResult {
    pub fn is_found(&self) -> bool {
        matches!(self, MatchResult::Found(_))
    }

    pub fn position(&self) -> Option<Point> {
        match self {
            MatchResult::Found(p) => Some(*p),
            MatchResult::NotFound => None,
        }
    }
}

/// One recognized word with its bounding box
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextToken {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
    /// Normalized to 0.0 - 1.0
    pub confidence: f32,
    pub text: String,
}

impl TextToken {
    pub fn center(&self) -> Point {
        Size::new(self.width, self.height).center_from(Point::new(self.x, self.y))
    }
}

/// Governs every polling loop: one initial try plus `max_attempts` retries
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub interval: Duration,
    pub max_attempts: u32,
}

impl RetryPolicy {
    pub fn new(interval: Duration, max_attempts: u32) -> Self {
        Self {
            interval,
            max_attempts,
        }
    }

    /// Build from a signed attempt count as handed over by scripts
    pub fn try_new(interval: Duration, max_attempts: i64) -> Result<Self> {
        let max_attempts = u32::try_from(max_attempts).map_err(|_| {
            Error::InvalidRetryPolicy(format!(
                "max_attempts must be between 0 and {}, got {}",
                u32::MAX,
                max_attempts
            ))
        })?;
        Ok(Self::new(interval, max_attempts))
    }

    /// Search once, never sleep
    pub fn once() -> Self {
        Self::new(Duration::ZERO, 0)
    }

    /// Total number of searches this policy allows
    pub fn total_tries(&self) -> u64 {
        u64::from(self.max_attempts) + 1
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(Duration::from_millis(500), 10)
    }
}
