//! Image matching, text recognition and debug snapshots

pub mod debug;
pub mod matcher;
pub mod ocr;

pub use debug::DebugRecorder;
pub use matcher::{Matcher, Needle, ScoreMap};
pub use ocr::{OcrEngine, TesseractCli, TextRecognizer};
