//! Text recognition through the tesseract CLI
//!
//! Frames are binarized first, then handed to tesseract as PNG on stdin. The
//! TSV it prints has one row per page/block/paragraph/line/word; only complete
//! word rows survive parsing.

use image::{DynamicImage, GrayImage, ImageFormat, Luma};
use imageproc::contrast::otsu_level;
use std::io::{Cursor, Write};
use std::path::PathBuf;
use std::process::{Child, Command, Stdio};

use super::debug::DebugRecorder;
use crate::desktop::types::{ScreenBuffer, TextToken};
use crate::error::{Error, Result};

/// Fields in a word-level TSV row:
/// level page block par line word left top width height conf text
const WORD_FIELDS: usize = 12;

/// Produces tesseract-style TSV for an image
pub trait OcrEngine: Send {
    fn image_to_data(&self, image: &GrayImage) -> anyhow::Result<String>;
}

/// Runs the `tesseract` binary
pub struct TesseractCli {
    cmd: PathBuf,
}

impl TesseractCli {
    pub fn new(cmd: impl Into<PathBuf>) -> Self {
        Self { cmd: cmd.into() }
    }
}

impl OcrEngine for TesseractCli {
    fn image_to_data(&self, image: &GrayImage) -> anyhow::Result<String> {
        let mut png = Cursor::new(Vec::new());
        image
            .write_to(&mut png, ImageFormat::Png)
            .map_err(|e| anyhow::anyhow!("Failed to encode PNG: {}", e))?;

        let mut child = Command::new(&self.cmd)
            .args(["stdin", "stdout", "tsv"])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| anyhow::anyhow!("Failed to start {:?}: {}", self.cmd, e))?;

        write_stdin(&mut child, png.get_ref())?;

        let output = child.wait_with_output()?;
        if !output.status.success() {
            anyhow::bail!(
                "tesseract exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            );
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// Feed `data` to the child's stdin and close it. On failure the child is
/// killed and reaped before the error is returned.
fn write_stdin(child: &mut Child, data: &[u8]) -> anyhow::Result<()> {
    let Some(mut stdin) = child.stdin.take() else {
        return Ok(());
    };
    if let Err(e) = stdin.write_all(data) {
        drop(stdin);
        let _ = child.kill();
        let _ = child.wait();
        anyhow::bail!("Failed to write image to tesseract: {}", e);
    }
    Ok(())
}

pub struct TextRecognizer {
    engine: Box<dyn OcrEngine>,
    debug: DebugRecorder,
    min_confidence: f32,
}

impl TextRecognizer {
    pub fn new(engine: Box<dyn OcrEngine>, debug: DebugRecorder, min_confidence: f32) -> Self {
        Self {
            engine,
            debug,
            min_confidence,
        }
    }

    /// Recognize words in a captured buffer. Positions are in buffer space.
    pub fn recognize(&self, buffer: &ScreenBuffer) -> Result<Vec<TextToken>> {
        let prepared = prepare_for_ocr(buffer);
        self.debug
            .record_image(&DynamicImage::ImageLuma8(prepared.clone()), "ocr_ready");

        let data = self.engine.image_to_data(&prepared).map_err(Error::Ocr)?;
        let tokens: Vec<TextToken> = parse_tsv(&data)
            .into_iter()
            .filter(|t| t.confidence >= self.min_confidence)
            .collect();

        tracing::debug!("Recognized {} text tokens", tokens.len());
        Ok(tokens)
    }
}

/// Grayscale plus Otsu binarization
pub fn prepare_for_ocr(buffer: &ScreenBuffer) -> GrayImage {
    let mut gray = buffer.to_gray();
    let level = otsu_level(&gray);
    for pixel in gray.pixels_mut() {
        *pixel = if pixel[0] > level { Luma([255]) } else { Luma([0]) };
    }
    gray
}

/// Keep rows with exactly the word-level shape; everything else is dropped
pub fn parse_tsv(data: &str) -> Vec<TextToken> {
    data.lines().filter_map(parse_word_row).collect()
}

fn parse_word_row(line: &str) -> Option<TextToken> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() != WORD_FIELDS {
        return None;
    }

    let confidence: f32 = fields[10].parse().ok()?;
    Some(TextToken {
        x: fields[6].parse().ok()?,
        y: fields[7].parse().ok()?,
        width: fields[8].parse().ok()?,
        height: fields[9].parse().ok()?,
        confidence: confidence / 100.0,
        text: fields[11].to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};

    const SAMPLE: &str = "\
level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext
1\t1\t0\t0\t0\t0\t0\t0\t800\t600\t-1\t
2\t1\t1\t0\t0\t0\t12\t20\t300\t40\t-1\t
5\t1\t1\t1\t1\t1\t12\t20\t90\t18\t96.5\tFile
5\t1\t1\t1\t1\t2\t110\t20\t60\t18\t41\tEdit
5\t1\t1\t1\t1\t3\t180\t20\t60\t18\t88\tNew Tab
";

    struct CannedEngine(&'static str);

    impl OcrEngine for CannedEngine {
        fn image_to_data(&self, _image: &GrayImage) -> anyhow::Result<String> {
            Ok(self.0.to_string())
        }
    }

    #[test]
    fn test_parse_keeps_only_word_rows() {
        let tokens = parse_tsv(SAMPLE);
        assert_eq!(tokens.len(), 2);
        assert_eq!(
            tokens[0],
            TextToken {
                x: 12,
                y: 20,
                width: 90,
                height: 18,
                confidence: 0.965,
                text: "File".to_string(),
            }
        );
        assert_eq!(tokens[1].text, "Edit");
        assert!((tokens[1].confidence - 0.41).abs() < 1e-6);
    }

    #[test]
    fn test_recognize_filters_low_confidence() {
        let recognizer =
            TextRecognizer::new(Box::new(CannedEngine(SAMPLE)), DebugRecorder::disabled(), 0.5);
        let buffer = ScreenBuffer::from_image(RgbaImage::new(8, 8));
        let tokens = recognizer.recognize(&buffer).unwrap();
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].text, "File");
    }

    #[test]
    fn test_prepare_binarizes() {
        let image = RgbaImage::from_fn(10, 2, |x, _| {
            if x < 5 {
                Rgba([30, 30, 30, 255])
            } else {
                Rgba([220, 220, 220, 255])
            }
        });
        let prepared = prepare_for_ocr(&ScreenBuffer::from_image(image));
        assert_eq!(prepared.get_pixel(0, 0)[0], 0);
        assert_eq!(prepared.get_pixel(9, 1)[0], 255);
    }

    #[cfg(unix)]
    #[test]
    fn test_early_exit_child_is_reaped() {
        // `true` never reads stdin, so a large write hits a closed pipe
        let mut child = Command::new("true")
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .spawn()
            .unwrap();

        let err = write_stdin(&mut child, &vec![0u8; 1 << 20]).unwrap_err();
        assert!(err.to_string().contains("Failed to write image"));
        assert!(child.stdin.is_none());
        assert!(child.try_wait().unwrap().is_some());
    }

    #[test]
    fn test_missing_binary_is_ocr_error() {
        let recognizer = TextRecognizer::new(
            Box::new(TesseractCli::new("/nonexistent/tesseract")),
            DebugRecorder::disabled(),
            0.0,
        );
        let buffer = ScreenBuffer::from_image(RgbaImage::new(8, 8));
        assert!(matches!(recognizer.recognize(&buffer), Err(Error::Ocr(_))));
    }
}
