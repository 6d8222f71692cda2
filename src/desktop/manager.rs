use image::RgbaImage;
use std::thread;
use std::time::Duration;

use super::input::{EnigoBackend, InputBackend, InputController, MouseButton};
use super::keys::{KeyCode, TypeAction};
use super::screenshot::{Capture, ScreenSource, XcapScreen};
use super::sync::{poll, Synchronizer};
use super::types::{Point, Region, RetryPolicy, ScreenBuffer, TextToken};
use crate::assets::AssetRegistry;
use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::vision::debug::DebugRecorder;
use crate::vision::matcher::Matcher;
use crate::vision::ocr::{OcrEngine, TesseractCli, TextRecognizer};

/// Desktop automation manager
///
/// Entry point for test scripts. Wires capture, matching, OCR and input from a
/// single [`EngineConfig`]; construct it once at the start of a run.
pub struct DesktopManager {
    config: EngineConfig,
    sync: Synchronizer,
    input: InputController,
    text: TextRecognizer,
}

impl DesktopManager {
    /// Create a manager for the real screen, keyboard and tesseract install
    pub fn new(config: EngineConfig) -> Result<Self> {
        let assets = match &config.asset_root {
            Some(root) => AssetRegistry::scan(root, config.platform),
            None => AssetRegistry::new(),
        };
        let input = EnigoBackend::new().map_err(Error::Input)?;
        let ocr = TesseractCli::new(&config.tesseract_cmd);

        Self::with_backends(
            config,
            assets,
            Box::new(XcapScreen),
            Box::new(input),
            Box::new(ocr),
        )
    }

    /// Create a manager over explicit backends
    pub fn with_backends(
        config: EngineConfig,
        assets: AssetRegistry,
        screen: Box<dyn ScreenSource>,
        input: Box<dyn InputBackend>,
        ocr: Box<dyn OcrEngine>,
    ) -> Result<Self> {
        let debug = DebugRecorder::init(&config.debug_dir, config.debug_enabled);
        let capture = Capture::new(screen)?;

        let sync = Synchronizer::new(capture, Matcher::new(debug.clone()), assets)
            .with_precision(config.precision)
            .with_exists_attempts(config.exists_attempts);
        let input = InputController::new(input, config.platform, config.type_interval);
        let text = TextRecognizer::new(ocr, debug, config.ocr_min_confidence);

        tracing::info!(
            "Desktop manager ready ({}, {} assets, debug {})",
            config.platform,
            sync.assets().len(),
            if config.debug_enabled { "on" } else { "off" }
        );

        Ok(Self {
            config,
            sync,
            input,
            text,
        })
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn synchronizer(&self) -> &Synchronizer {
        &self.sync
    }

    // ============ Searching ============

    /// Position of `name` on screen, if visible right now
    pub fn find(&self, name: &str) -> Result<Option<Point>> {
        Ok(self.sync.find(name, self.config.precision)?.position())
    }

    pub fn find_all(&self, name: &str) -> Result<Vec<Point>> {
        self.sync.find_all(name, self.config.multi_threshold)
    }

    /// Wait with the configured retry policy and precision
    pub fn wait(&self, name: &str) -> Result<Point> {
        self.sync.wait(name, self.config.retry, self.config.precision)
    }

    pub fn wait_with(&self, name: &str, policy: RetryPolicy, precision: f32) -> Result<Point> {
        self.sync.wait(name, policy, precision)
    }

    pub fn wait_in_region(&self, name: &str, region: Region, policy: RetryPolicy) -> Result<Point> {
        self.sync
            .wait_in_region(name, region, policy, self.config.precision)
    }

    pub fn wait_vanish(&self, name: &str) -> Result<()> {
        self.sync
            .wait_vanish(name, self.config.retry, self.config.precision)
    }

    pub fn wait_vanish_with(&self, name: &str, policy: RetryPolicy, precision: f32) -> Result<()> {
        self.sync.wait_vanish(name, policy, precision)
    }

    pub fn exists(&self, name: &str, interval: Duration) -> Result<bool> {
        self.sync.exists(name, interval)
    }

    // ============ Screen ============

    pub fn get_screen(&self) -> Result<ScreenBuffer> {
        self.sync.capture().capture_screen()
    }

    pub fn capture_region(&self, region: Region) -> Result<ScreenBuffer> {
        self.sync.capture().capture_region(region)
    }

    /// Save the current screen to `path`
    pub fn save_screen(&self, path: &std::path::Path) -> Result<()> {
        let buffer = self.get_screen()?;
        save_png(&buffer.image, path)
    }

    // ============ Text ============

    /// Recognize all words on screen, or inside `region`, in screen coordinates
    pub fn text_search_all(&self, region: Option<Region>) -> Result<Vec<TextToken>> {
        let buffer = match region {
            Some(region) => self.capture_region(region)?,
            None => self.get_screen()?,
        };
        self.text_in_buffer(&buffer)
    }

    /// Recognize words in an already captured buffer, in screen coordinates
    pub fn text_in_buffer(&self, buffer: &ScreenBuffer) -> Result<Vec<TextToken>> {
        let tokens = self.text.recognize(buffer)?;
        Ok(tokens
            .into_iter()
            .map(|mut token| {
                let pos = buffer.to_screen(Point::new(token.x, token.y));
                token.x = pos.x;
                token.y = pos.y;
                token
            })
            .collect())
    }

    /// Poll OCR until a word equal to `text` shows up
    pub fn wait_for_text(&self, text: &str, region: Option<Region>, policy: RetryPolicy) -> Result<TextToken> {
        let found = poll(policy, || {
            Ok(self
                .text_search_all(region)?
                .into_iter()
                .find(|token| token.text == text))
        })?;

        found.ok_or_else(|| Error::MatchExhausted {
            name: format!("text '{}'", text),
            attempts: policy.max_attempts,
        })
    }

    // ============ Mouse ============

    /// Click the center of `name` if it is visible right now.
    ///
    /// Returns the top-left match position, or `None` when not on screen.
    pub fn click(&mut self, name: &str) -> Result<Option<Point>> {
        tracing::debug!("Try click on: {}", name);
        let needle = self.sync.load(name)?;
        let buffer = self.get_screen()?;
        let Some(pos) = self
            .sync
            .matcher()
            .match_needle(&needle, &buffer, self.config.precision)
            .position()
        else {
            tracing::debug!("Image not found: {}", name);
            return Ok(None);
        };

        self.input
            .click_center(pos, needle.size(), MouseButton::Left)?;
        thread::sleep(self.config.click_settle);
        Ok(Some(pos))
    }

    pub fn click_at(&mut self, x: i32, y: i32, button: MouseButton) -> Result<()> {
        self.input.click(x, y, button)
    }

    pub fn double_click_at(&mut self, x: i32, y: i32, button: MouseButton) -> Result<()> {
        self.input.double_click(x, y, button)
    }

    pub fn hover(&mut self, x: i32, y: i32, duration: Duration) -> Result<()> {
        self.input.move_to(x, y, duration)
    }

    /// Move onto the center of `name` if it is visible right now
    pub fn hover_image(&mut self, name: &str) -> Result<Option<Point>> {
        let needle = self.sync.load(name)?;
        let buffer = self.get_screen()?;
        let found = self
            .sync
            .matcher()
            .match_needle(&needle, &buffer, self.config.precision)
            .position();

        match found {
            Some(pos) => {
                let target = needle.size().center_from(pos);
                self.input.move_to(target.x, target.y, Duration::ZERO)?;
                Ok(Some(target))
            }
            None => Ok(None),
        }
    }

    pub fn scroll(&mut self, amount: i32) -> Result<()> {
        self.input.scroll(amount)
    }

    // ============ Keyboard ============

    pub fn key_down(&mut self, key: &str) -> Result<()> {
        self.input.press_key(KeyCode::parse(key)?)
    }

    pub fn key_up(&mut self, key: &str) -> Result<()> {
        self.input.release_key(KeyCode::parse(key)?)
    }

    pub fn type_action(&mut self, action: &TypeAction) -> Result<()> {
        self.input.type_action(action)
    }
}

fn save_png(image: &RgbaImage, path: &std::path::Path) -> Result<()> {
    image
        .save(path)
        .map_err(|e| Error::Capture(anyhow::anyhow!("Failed to save {:?}: {}", path, e)))
}
