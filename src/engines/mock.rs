//! Mock backend for tests: no network, no engine

use crate::engine::{Backend, ImageStream, TextExtractor};
use crate::error::OcrError;
use crate::raster;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Decodes its input like a real backend, then replies with canned text
pub struct MockExtractor {
    name: &'static str,
    reply: Result<String, String>,
    calls: AtomicUsize,
    received: Mutex<Vec<Vec<u8>>>,
}

impl MockExtractor {
    pub fn returning(backend: Backend, text: &str) -> Self {
        Self::with_reply(backend, Ok(text.to_string()))
    }

    pub fn failing(backend: Backend, message: &str) -> Self {
        Self::with_reply(backend, Err(message.to_string()))
    }

    fn with_reply(backend: Backend, reply: Result<String, String>) -> Self {
        Self {
            name: backend.as_str(),
            reply,
            calls: AtomicUsize::new(0),
            received: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Bytes handed to each `extract` call, in order
    pub fn received(&self) -> Vec<Vec<u8>> {
        self.received.lock().unwrap().clone()
    }
}

impl TextExtractor for MockExtractor {
    fn name(&self) -> &'static str {
        self.name
    }

    fn extract(&self, image: ImageStream<'_>) -> Result<String, OcrError> {
        self.calls.fetch_add(1, Ordering::SeqCst);

        let bytes = image.into_bytes()?;
        self.received.lock().unwrap().push(bytes.clone());
        raster::probe(&bytes)?;

        self.reply.clone().map_err(OcrError::Backend)
    }
}
