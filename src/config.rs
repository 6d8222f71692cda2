use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::desktop::platform::Platform;
use crate::desktop::types::RetryPolicy;
use crate::error::Result;

pub const DEFAULT_PRECISION: f32 = 0.8;
pub const DEFAULT_MULTI_THRESHOLD: f32 = 0.7;
pub const DEFAULT_EXISTS_ATTEMPTS: u32 = 3;

/// Engine configuration, built once and handed to `DesktopManager::new`
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub platform: Platform,
    /// Root of the platform-specific image asset tree
    pub asset_root: Option<PathBuf>,
    pub debug_dir: PathBuf,
    pub debug_enabled: bool,
    /// Acceptance score for single-match searches
    pub precision: f32,
    /// Acceptance score for multi-match searches
    pub multi_threshold: f32,
    pub retry: RetryPolicy,
    pub exists_attempts: u32,
    pub ocr_min_confidence: f32,
    pub tesseract_cmd: PathBuf,
    /// Delay between characters of literal text
    pub type_interval: Duration,
    /// Pause after clicking an image so the UI can react
    pub click_settle: Duration,
}

impl EngineConfig {
    /// Read overrides from the environment (and `.env` if present).
    ///
    /// A negative `TASKER_VISION_ATTEMPTS` is rejected with `InvalidRetryPolicy`.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();
        let retry = RetryPolicy::try_new(
            env_parse::<u64>("TASKER_VISION_INTERVAL_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.retry.interval),
            env_parse::<i64>("TASKER_VISION_ATTEMPTS")
                .unwrap_or(i64::from(defaults.retry.max_attempts)),
        )?;

        Ok(Self {
            asset_root: env::var("TASKER_VISION_ASSETS").ok().map(PathBuf::from),
            debug_dir: env::var("TASKER_VISION_DEBUG_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.debug_dir.clone()),
            debug_enabled: env::var("TASKER_VISION_DEBUG")
                .ok()
                .map(|v| !matches!(v.to_lowercase().as_str(), "0" | "false" | "off" | "no"))
                .unwrap_or(defaults.debug_enabled),
            precision: env_parse("TASKER_VISION_PRECISION").unwrap_or(defaults.precision),
            multi_threshold: env_parse("TASKER_VISION_THRESHOLD")
                .unwrap_or(defaults.multi_threshold),
            retry,
            ocr_min_confidence: env_parse("TASKER_VISION_OCR_MIN_CONF")
                .unwrap_or(defaults.ocr_min_confidence),
            tesseract_cmd: env::var("TESSERACT_CMD")
                .map(PathBuf::from)
                .unwrap_or(defaults.tesseract_cmd.clone()),
            ..defaults
        })
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        let platform = Platform::current();
        Self {
            platform,
            asset_root: None,
            debug_dir: PathBuf::from("image_debug"),
            debug_enabled: true,
            precision: DEFAULT_PRECISION,
            multi_threshold: DEFAULT_MULTI_THRESHOLD,
            retry: RetryPolicy::default(),
            exists_attempts: DEFAULT_EXISTS_ATTEMPTS,
            ocr_min_confidence: 0.0,
            tesseract_cmd: platform.default_tesseract_cmd(),
            type_interval: Duration::from_millis(20),
            click_settle: Duration::from_secs(1),
        }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    let raw = env::var(key).ok()?;
    match raw.trim().parse() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!("Ignoring unparsable {}={:?}", key, raw);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.precision, 0.8);
        assert_eq!(config.multi_threshold, 0.7);
        assert_eq!(config.retry.max_attempts, 10);
        assert_eq!(config.retry.interval, Duration::from_millis(500));
        assert_eq!(config.exists_attempts, 3);
        assert!(config.debug_enabled);
    }

    #[test]
    fn test_negative_attempts_from_env_is_rejected() {
        env::set_var("TASKER_VISION_ATTEMPTS", "-2");
        let result = EngineConfig::from_env();
        env::remove_var("TASKER_VISION_ATTEMPTS");
        assert!(matches!(result, Err(Error::InvalidRetryPolicy(_))));
    }

    #[test]
    fn test_env_parse_rejects_garbage() {
        env::set_var("TASKER_VISION_TEST_GARBAGE", "not-a-number");
        assert_eq!(env_parse::<u32>("TASKER_VISION_TEST_GARBAGE"), None);
        env::set_var("TASKER_VISION_TEST_NUMBER", " 42 ");
        assert_eq!(env_parse::<u32>("TASKER_VISION_TEST_NUMBER"), Some(42));
    }
}
