//! Local OCR backend
//!
//! Engine-agnostic part of the local backend: session lifecycle, engine
//! variables and bitmap conversion. The Tesseract session itself lives in
//! `engines::tesseract` behind the `engine-tesseract` feature.

#![cfg_attr(not(feature = "engine-tesseract"), allow(dead_code))]

use crate::engine::{ImageStream, TextExtractor};
use crate::error::OcrError;
use crate::raster;
use image::{DynamicImage, ImageFormat};

/// Variables set on every session before the image is submitted
///
/// Disables the system and frequency dictionaries and points the engine at
/// `<lang>.user-words` for a custom word list.
pub const ENGINE_VARIABLES: [(&str, &str); 3] = [
    ("load_system_dawg", "false"),
    ("load_freq_dawg", "false"),
    ("user_words_suffix", "user-words"),
];

/// One acquired engine instance, owned by a single `extract` call
///
/// Dropping the session releases the engine.
pub trait OcrSession {
    /// Returns `Ok(false)` when the engine refused the variable but the
    /// session is still usable. `Err` means the session is gone.
    fn set_variable(&mut self, name: &str, value: &str) -> Result<bool, OcrError>;

    /// Recognize text in a BMP-encoded bitmap
    fn recognize(&mut self, bitmap: &[u8]) -> Result<String, OcrError>;
}

/// Opens fresh engine sessions
pub trait SessionFactory: Send + Sync {
    type Session: OcrSession;

    fn open(&self) -> Result<Self::Session, OcrError>;
}

pub struct LocalOcrBackend<F> {
    factory: F,
}

impl<F: SessionFactory> LocalOcrBackend<F> {
    pub fn new(factory: F) -> Self {
        Self { factory }
    }
}

impl<F: SessionFactory> TextExtractor for LocalOcrBackend<F> {
    fn name(&self) -> &'static str {
        "tesseract"
    }

    fn extract(&self, image: ImageStream<'_>) -> Result<String, OcrError> {
        // Released when `session` goes out of scope, on every return path
        let mut session = self.factory.open()?;

        for (name, value) in ENGINE_VARIABLES {
            if !session.set_variable(name, value)? {
                tracing::debug!(variable = name, value, "OCR engine refused variable");
            }
        }

        let bytes = image.into_bytes()?;
        let bitmap = to_bitmap(&bytes)?;

        tracing::debug!(
            input_bytes = bytes.len(),
            bitmap_bytes = bitmap.len(),
            "Submitting image to local OCR engine"
        );

        let text = session.recognize(&bitmap)?;
        tracing::debug!(chars = text.len(), "Local OCR finished");

        Ok(text)
    }
}

/// Convert any supported raster into BMP (always readable by leptonica)
fn to_bitmap(bytes: &[u8]) -> Result<Vec<u8>, OcrError> {
    let decoded = raster::decode(bytes)?;
    raster::encode(&DynamicImage::ImageRgb8(decoded.into_rgb8()), ImageFormat::Bmp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgb, RgbImage};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    #[derive(Default)]
    struct Counters {
        opened: AtomicUsize,
        released: AtomicUsize,
        variables: Mutex<Vec<(String, String)>>,
        bitmaps: Mutex<Vec<Vec<u8>>>,
    }

    /// How a fake session answers `set_variable`
    #[derive(Clone, Copy)]
    enum Variables {
        Accept,
        /// Refuse the named variable, keep the session usable
        Refuse(&'static str),
        /// Lose the session on the named variable
        Break(&'static str),
    }

    struct FakeSession {
        counters: Arc<Counters>,
        reply: Result<String, String>,
        variables: Variables,
    }

    impl OcrSession for FakeSession {
        fn set_variable(&mut self, name: &str, value: &str) -> Result<bool, OcrError> {
            match self.variables {
                Variables::Refuse(refused) if refused == name => return Ok(false),
                Variables::Break(broken) if broken == name => {
                    return Err(OcrError::ClientInit("engine restart failed".to_string()))
                }
                _ => {}
            }
            self.counters
                .variables
                .lock()
                .unwrap()
                .push((name.to_string(), value.to_string()));
            Ok(true)
        }

        fn recognize(&mut self, bitmap: &[u8]) -> Result<String, OcrError> {
            self.counters.bitmaps.lock().unwrap().push(bitmap.to_vec());
            self.reply.clone().map_err(OcrError::Backend)
        }
    }

    impl Drop for FakeSession {
        fn drop(&mut self) {
            self.counters.released.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct FakeFactory {
        counters: Arc<Counters>,
        reply: Result<String, String>,
        fail_open: bool,
        variables: Variables,
    }

    impl FakeFactory {
        fn replying(reply: Result<&str, &str>) -> (Self, Arc<Counters>) {
            let counters = Arc::new(Counters::default());
            let factory = Self {
                counters: Arc::clone(&counters),
                reply: reply.map(String::from).map_err(String::from),
                fail_open: false,
                variables: Variables::Accept,
            };
            (factory, counters)
        }
    }

    impl SessionFactory for FakeFactory {
        type Session = FakeSession;

        fn open(&self) -> Result<FakeSession, OcrError> {
            if self.fail_open {
                return Err(OcrError::ClientInit("no tessdata".to_string()));
            }
            self.counters.opened.fetch_add(1, Ordering::SeqCst);
            Ok(FakeSession {
                counters: Arc::clone(&self.counters),
                reply: self.reply.clone(),
                variables: self.variables,
            })
        }
    }

    fn white_jpeg() -> Vec<u8> {
        let img = RgbImage::from_pixel(100, 100, Rgb([255, 255, 255]));
        raster::encode(&DynamicImage::ImageRgb8(img), ImageFormat::Jpeg).unwrap()
    }

    #[test]
    fn test_extract_configures_engine_and_returns_text() {
        let (factory, counters) = FakeFactory::replying(Ok("HELLO"));
        let backend = LocalOcrBackend::new(factory);

        let text = backend
            .extract(ImageStream::from_bytes(white_jpeg()))
            .unwrap();

        assert_eq!(text, "HELLO");
        let variables = counters.variables.lock().unwrap().clone();
        let expected: Vec<_> = ENGINE_VARIABLES
            .iter()
            .map(|(n, v)| (n.to_string(), v.to_string()))
            .collect();
        assert_eq!(variables, expected);
    }

    #[test]
    fn test_extract_submits_bmp() {
        let (factory, counters) = FakeFactory::replying(Ok(""));
        let backend = LocalOcrBackend::new(factory);

        backend
            .extract(ImageStream::from_bytes(white_jpeg()))
            .unwrap();

        let bitmaps = counters.bitmaps.lock().unwrap();
        assert_eq!(bitmaps.len(), 1);
        assert_eq!(image::guess_format(&bitmaps[0]).unwrap(), ImageFormat::Bmp);
    }

    #[test]
    fn test_empty_text_is_not_an_error() {
        let (factory, _) = FakeFactory::replying(Ok(""));
        let text = LocalOcrBackend::new(factory)
            .extract(ImageStream::from_bytes(white_jpeg()))
            .unwrap();
        assert!(text.is_empty());
    }

    #[test]
    fn test_session_released_on_success() {
        let (factory, counters) = FakeFactory::replying(Ok("HELLO"));
        LocalOcrBackend::new(factory)
            .extract(ImageStream::from_bytes(white_jpeg()))
            .unwrap();

        assert_eq!(counters.opened.load(Ordering::SeqCst), 1);
        assert_eq!(counters.released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_session_released_on_decode_failure() {
        let (factory, counters) = FakeFactory::replying(Ok("HELLO"));
        let err = LocalOcrBackend::new(factory)
            .extract(ImageStream::from_bytes(b"not an image".to_vec()))
            .unwrap_err();

        assert!(matches!(err, OcrError::Decode(_)), "got {:?}", err);
        assert_eq!(counters.released.load(Ordering::SeqCst), 1);
        assert!(counters.bitmaps.lock().unwrap().is_empty());
    }

    #[test]
    fn test_session_released_on_backend_failure() {
        let (factory, counters) = FakeFactory::replying(Err("engine crashed"));
        let err = LocalOcrBackend::new(factory)
            .extract(ImageStream::from_bytes(white_jpeg()))
            .unwrap_err();

        assert!(matches!(err, OcrError::Backend(_)), "got {:?}", err);
        assert_eq!(counters.released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_refused_variable_does_not_stop_extraction() {
        let (mut factory, counters) = FakeFactory::replying(Ok("HELLO"));
        factory.variables = Variables::Refuse("load_system_dawg");

        let text = LocalOcrBackend::new(factory)
            .extract(ImageStream::from_bytes(white_jpeg()))
            .unwrap();

        assert_eq!(text, "HELLO");
        let names: Vec<_> = counters
            .variables
            .lock()
            .unwrap()
            .iter()
            .map(|(n, _)| n.clone())
            .collect();
        assert_eq!(names, ["load_freq_dawg", "user_words_suffix"]);
        assert_eq!(counters.opened.load(Ordering::SeqCst), 1);
        assert_eq!(counters.released.load(Ordering::SeqCst), 1);
        assert_eq!(counters.bitmaps.lock().unwrap().len(), 1);
    }

    #[test]
    fn test_lost_session_while_configuring_fails_extraction() {
        let (mut factory, counters) = FakeFactory::replying(Ok("HELLO"));
        factory.variables = Variables::Break("load_freq_dawg");

        let err = LocalOcrBackend::new(factory)
            .extract(ImageStream::from_bytes(white_jpeg()))
            .unwrap_err();

        assert!(matches!(err, OcrError::ClientInit(_)), "got {:?}", err);
        assert!(counters.bitmaps.lock().unwrap().is_empty());
        assert_eq!(counters.released.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_open_failure_is_client_init() {
        let (mut factory, counters) = FakeFactory::replying(Ok("HELLO"));
        factory.fail_open = true;

        let err = LocalOcrBackend::new(factory)
            .extract(ImageStream::from_bytes(white_jpeg()))
            .unwrap_err();

        assert!(matches!(err, OcrError::ClientInit(_)), "got {:?}", err);
        assert_eq!(counters.released.load(Ordering::SeqCst), 0);
    }
}
