//! Screen capture using xcap
//!
//! Every frame handed out by [`Capture`] has the logical screen size, the one
//! the input layer addresses. On high-DPI displays the raw grab is larger and
//! gets resized here, once, so matcher results never need rescaling.

use image::imageops::{self, FilterType};
use image::RgbaImage;
use xcap::Monitor;

use super::types::{Region, ScreenBuffer, Size};
use crate::error::{Error, Result};

/// Source of raw screen pixels
pub trait ScreenSource: Send {
    /// Size in the coordinate space used for mouse input
    fn logical_size(&self) -> anyhow::Result<Size>;

    /// Grab the whole screen at native resolution
    fn grab(&self) -> anyhow::Result<RgbaImage>;
}

/// Primary monitor through xcap
pub struct XcapScreen;

impl XcapScreen {
    fn primary() -> anyhow::Result<Monitor> {
        let monitors =
            Monitor::all().map_err(|e| anyhow::anyhow!("Failed to get monitors: {}", e))?;

        monitors
            .into_iter()
            .find(|m| m.is_primary())
            .ok_or_else(|| anyhow::anyhow!("No primary monitor found"))
    }
}

impl ScreenSource for XcapScreen {
    fn logical_size(&self) -> anyhow::Result<Size> {
        let primary = Self::primary()?;
        Ok(Size::new(primary.width(), primary.height()))
    }

    fn grab(&self) -> anyhow::Result<RgbaImage> {
        Self::primary()?
            .capture_image()
            .map_err(|e| anyhow::anyhow!("Failed to capture screen: {}", e))
    }
}

/// Produces normalized screen buffers
pub struct Capture {
    source: Box<dyn ScreenSource>,
    logical: Size,
}

impl Capture {
    /// Query the logical screen size once and keep it for the process lifetime
    pub fn new(source: Box<dyn ScreenSource>) -> Result<Self> {
        let logical = source.logical_size().map_err(Error::Capture)?;
        tracing::debug!(
            "Logical screen size: {}x{}",
            logical.width,
            logical.height
        );
        Ok(Self { source, logical })
    }

    pub fn logical_size(&self) -> Size {
        self.logical
    }

    pub fn capture_screen(&self) -> Result<ScreenBuffer> {
        let image = self.grab_logical()?;
        Ok(ScreenBuffer::new(image, Region::full(self.logical)))
    }

    /// Capture part of the screen; the region is clamped to the screen bounds
    pub fn capture_region(&self, region: Region) -> Result<ScreenBuffer> {
        let clamped = region.clamp_to(self.logical)?;
        if clamped != region {
            tracing::debug!("Clamped capture region {:?} to {:?}", region, clamped);
        }

        let full = self.grab_logical()?;
        let cropped = imageops::crop_imm(
            &full,
            clamped.x1 as u32,
            clamped.y1 as u32,
            clamped.width(),
            clamped.height(),
        )
        .to_image();

        Ok(ScreenBuffer::new(cropped, clamped))
    }

    fn grab_logical(&self) -> Result<RgbaImage> {
        let raw = self.source.grab().map_err(Error::Capture)?;
        Ok(reconcile(raw, self.logical))
    }
}

/// Resize a raw grab to the logical screen size when the two disagree
pub fn reconcile(raw: RgbaImage, logical: Size) -> RgbaImage {
    if raw.width() == logical.width && raw.height() == logical.height {
        return raw;
    }
    tracing::debug!(
        "Screen size according to capture: {}x{}, logical: {}x{}",
        raw.width(),
        raw.height(),
        logical.width,
        logical.height
    );
    imageops::resize(&raw, logical.width, logical.height, FilterType::Lanczos3)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    struct FixedScreen {
        logical: Size,
        raw: RgbaImage,
    }

    impl ScreenSource for FixedScreen {
        fn logical_size(&self) -> anyhow::Result<Size> {
            Ok(self.logical)
        }

        fn grab(&self) -> anyhow::Result<RgbaImage> {
            Ok(self.raw.clone())
        }
    }

    fn gradient(width: u32, height: u32) -> RgbaImage {
        RgbaImage::from_fn(width, height, |x, y| {
            Rgba([(x % 256) as u8, (y % 256) as u8, 0, 255])
        })
    }

    #[test]
    fn test_retina_grab_is_resized_to_logical_size() {
        // Raw grab reports twice the size the input layer uses
        let capture = Capture::new(Box::new(FixedScreen {
            logical: Size::new(160, 90),
            raw: gradient(320, 180),
        }))
        .unwrap();

        let buffer = capture.capture_screen().unwrap();
        assert_eq!(buffer.size(), capture.logical_size());
        assert_eq!(buffer.size(), Size::new(160, 90));
    }

    #[test]
    fn test_matching_sizes_are_untouched() {
        let raw = gradient(64, 48);
        let capture = Capture::new(Box::new(FixedScreen {
            logical: Size::new(64, 48),
            raw: raw.clone(),
        }))
        .unwrap();

        let buffer = capture.capture_screen().unwrap();
        assert_eq!(buffer.image, raw);
    }

    #[test]
    fn test_region_is_cropped_in_logical_space() {
        let capture = Capture::new(Box::new(FixedScreen {
            logical: Size::new(64, 48),
            raw: gradient(64, 48),
        }))
        .unwrap();

        let buffer = capture
            .capture_region(Region::new(10, 5, 30, 25).unwrap())
            .unwrap();
        assert_eq!(buffer.size(), Size::new(20, 20));
        assert_eq!(buffer.image.get_pixel(0, 0), &Rgba([10, 5, 0, 255]));
    }

    #[test]
    fn test_out_of_bounds_region_is_clamped() {
        let capture = Capture::new(Box::new(FixedScreen {
            logical: Size::new(64, 48),
            raw: gradient(64, 48),
        }))
        .unwrap();

        let buffer = capture
            .capture_region(Region::new(50, 40, 100, 100).unwrap())
            .unwrap();
        assert_eq!(buffer.size(), Size::new(14, 8));
        assert_eq!(buffer.origin, Region::new(50, 40, 64, 48).unwrap());
    }

    #[test]
    fn test_list_primary_monitor() {
        // This test may fail in CI environments without displays
        if let Ok(size) = XcapScreen.logical_size() {
            assert!(size.width > 0 && size.height > 0);
        }
    }
}
