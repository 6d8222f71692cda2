//! Polling state machines over capture + match
//!
//! Every loop follows the same shape: try once, then up to `max_attempts`
//! more times with `interval` sleeps in between. Nothing polls unbounded.

use std::thread;

use super::screenshot::Capture;
use super::types::{MatchResult, Point, Region, RetryPolicy};
use crate::assets::AssetRegistry;
use crate::config::{DEFAULT_EXISTS_ATTEMPTS, DEFAULT_PRECISION};
use crate::error::{Error, Result};
use crate::vision::matcher::{Matcher, Needle};

/// Run `attempt` under `policy` until it yields a value.
///
/// Returns `Ok(None)` once the budget is spent. Errors abort immediately.
pub fn poll<T>(
    policy: RetryPolicy,
    mut attempt: impl FnMut() -> Result<Option<T>>,
) -> Result<Option<T>> {
    let mut tries = 0;
    loop {
        if let Some(value) = attempt()? {
            return Ok(Some(value));
        }
        if tries >= policy.max_attempts {
            return Ok(None);
        }
        thread::sleep(policy.interval);
        tries += 1;
    }
}

pub struct Synchronizer {
    capture: Capture,
    matcher: Matcher,
    assets: AssetRegistry,
    precision: f32,
    exists_attempts: u32,
}

impl Synchronizer {
    pub fn new(capture: Capture, matcher: Matcher, assets: AssetRegistry) -> Self {
        Self {
            capture,
            matcher,
            assets,
            precision: DEFAULT_PRECISION,
            exists_attempts: DEFAULT_EXISTS_ATTEMPTS,
        }
    }

    /// Precision used by [`exists`](Self::exists)
    pub fn with_precision(mut self, precision: f32) -> Self {
        self.precision = precision;
        self
    }

    pub fn with_exists_attempts(mut self, attempts: u32) -> Self {
        self.exists_attempts = attempts;
        self
    }

    pub fn capture(&self) -> &Capture {
        &self.capture
    }

    pub fn matcher(&self) -> &Matcher {
        &self.matcher
    }

    pub fn assets(&self) -> &AssetRegistry {
        &self.assets
    }

    /// Resolve and load a needle by logical name
    pub fn load(&self, name: &str) -> Result<Needle> {
        Needle::open(self.assets.resolve(name)?)
    }

    /// One full-screen search
    pub fn find(&self, name: &str, precision: f32) -> Result<MatchResult> {
        let needle = self.load(name)?;
        self.search(&needle, precision)
    }

    /// Every instance on screen, in discovery order
    pub fn find_all(&self, name: &str, threshold: f32) -> Result<Vec<Point>> {
        let needle = self.load(name)?;
        let buffer = self.capture.capture_screen()?;
        Ok(self.matcher.match_all_needle(&needle, &buffer, threshold))
    }

    /// Block until `name` appears. `MatchExhausted` after `max_attempts + 1` searches.
    pub fn wait(&self, name: &str, policy: RetryPolicy, precision: f32) -> Result<Point> {
        let needle = self.load(name)?;
        tracing::debug!(
            "Waiting for {} ({} retries every {:?})",
            name,
            policy.max_attempts,
            policy.interval
        );

        match poll(policy, || Ok(self.search(&needle, precision)?.position()))? {
            Some(pos) => {
                tracing::info!("Found {} at ({}, {})", name, pos.x, pos.y);
                Ok(pos)
            }
            None => {
                tracing::info!("Gave up waiting for {}", name);
                Err(Error::MatchExhausted {
                    name: name.to_string(),
                    attempts: policy.max_attempts,
                })
            }
        }
    }

    /// Like [`wait`](Self::wait) but searching only `region`; the position is in screen coordinates
    pub fn wait_in_region(
        &self,
        name: &str,
        region: Region,
        policy: RetryPolicy,
        precision: f32,
    ) -> Result<Point> {
        let needle = self.load(name)?;
        let found = poll(policy, || {
            let buffer = self.capture.capture_region(region)?;
            Ok(self
                .matcher
                .match_needle(&needle, &buffer, precision)
                .position()
                .map(|p| buffer.to_screen(p)))
        })?;

        found.ok_or_else(|| Error::MatchExhausted {
            name: name.to_string(),
            attempts: policy.max_attempts,
        })
    }

    /// Block until `name` is gone.
    ///
    /// If the image cannot be searched for at all (unknown name, unreadable
    /// file) it counts as vanished and this returns `Ok` right away.
    pub fn wait_vanish(&self, name: &str, policy: RetryPolicy, precision: f32) -> Result<()> {
        tracing::debug!("Wait vanish for: {}", name);

        let mut present = match self.check_present(name, precision) {
            Some(present) => present?,
            None => return Ok(()),
        };

        let mut tries = 0;
        while present && tries < policy.max_attempts {
            thread::sleep(policy.interval);
            present = self.check_present(name, precision).unwrap_or(Ok(false))?;
            tries += 1;
        }

        if present {
            Err(Error::MatchExhausted {
                name: name.to_string(),
                attempts: policy.max_attempts,
            })
        } else {
            tracing::info!("{} vanished", name);
            Ok(())
        }
    }

    /// Failure-free presence check: a few quick tries, `false` if never seen
    pub fn exists(&self, name: &str, interval: std::time::Duration) -> Result<bool> {
        let policy = RetryPolicy::new(interval, self.exists_attempts);
        match self.wait(name, policy, self.precision) {
            Ok(_) => Ok(true),
            Err(Error::MatchExhausted { .. }) => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn search(&self, needle: &Needle, precision: f32) -> Result<MatchResult> {
        let buffer = self.capture.capture_screen()?;
        Ok(self.matcher.match_needle(needle, &buffer, precision))
    }

    /// Single search for vanish polling. `None` when the needle cannot be loaded.
    fn check_present(&self, name: &str, precision: f32) -> Option<Result<bool>> {
        match self.find(name, precision) {
            Ok(result) => Some(Ok(result.is_found())),
            Err(e) if e.is_asset_failure() => {
                tracing::warn!("Treating {} as vanished: {}", name, e);
                None
            }
            Err(e) => Some(Err(e)),
        }
    }
}
