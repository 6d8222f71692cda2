use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Image asset not found: {0}")]
    AssetNotFound(String),

    #[error("Failed to load needle image {path:?}: {source}")]
    NeedleLoad {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("Image '{name}' still unresolved after {attempts} retries")]
    MatchExhausted { name: String, attempts: u32 },

    #[error("Unsupported modifier chord ({} modifiers): {}", .0.len(), .0.join("+"))]
    UnsupportedChord(Vec<&'static str>),

    #[error("Invalid region ({x1}, {y1}, {x2}, {y2})")]
    InvalidRegion { x1: i32, y1: i32, x2: i32, y2: i32 },

    #[error("Invalid retry policy: {0}")]
    InvalidRetryPolicy(String),

    #[error("Unknown key: {0}")]
    UnknownKey(String),

    #[error("Screen capture error: {0}")]
    Capture(#[source] anyhow::Error),

    #[error("Input error: {0}")]
    Input(#[source] anyhow::Error),

    #[error("OCR error: {0}")]
    Ocr(#[source] anyhow::Error),
}

impl Error {
    /// Broken assets and impossible chords. Retrying never helps.
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            Error::AssetNotFound(_) | Error::NeedleLoad { .. } | Error::UnsupportedChord(_)
        )
    }

    /// The needle could not be obtained at all (unknown name or unreadable file).
    pub fn is_asset_failure(&self) -> bool {
        matches!(self, Error::AssetNotFound(_) | Error::NeedleLoad { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_classification() {
        assert!(Error::AssetNotFound("ok.png".into()).is_config());
        assert!(Error::UnsupportedChord(vec!["shift", "ctrl", "alt"]).is_config());
        let exhausted = Error::MatchExhausted {
            name: "ok.png".into(),
            attempts: 3,
        };
        assert!(!exhausted.is_config());
        assert!(!exhausted.is_asset_failure());
    }

    #[test]
    fn test_chord_message_lists_modifiers() {
        let err = Error::UnsupportedChord(vec!["shift", "ctrl", "alt"]);
        assert_eq!(
            err.to_string(),
            "Unsupported modifier chord (3 modifiers): shift+ctrl+alt"
        );
    }
}
