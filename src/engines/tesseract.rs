//! Tesseract engine sessions
//!
//! Uses tesseract-static crate for static linking (no system dependencies).
//! Downloads tessdata (training data) automatically on first use unless a
//! tessdata directory is configured.

use crate::config::Config;
use crate::engines::local::{OcrSession, SessionFactory};
use crate::error::OcrError;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use tesseract_static::tesseract::Tesseract;

/// Variables Tesseract refuses once an instance is initialized
const INIT_ONLY_VARIABLES: [&str; 2] = ["load_system_dawg", "load_freq_dawg"];

/// Opens one Tesseract instance per extraction
#[derive(Debug, Clone)]
pub struct TesseractFactory {
    /// Path to tessdata directory
    tessdata_path: String,
    language: String,
}

impl TesseractFactory {
    pub fn new(config: &Config) -> Result<Self, OcrError> {
        let language = config.local.language.clone();

        let tessdata_path = match &config.local.tessdata_path {
            Some(path) => path
                .to_str()
                .map(|s| s.to_string())
                .ok_or_else(|| OcrError::ClientInit("Invalid tessdata path".to_string()))?,
            None => ensure_tessdata_available(&language)?,
        };

        tracing::info!(tessdata = %tessdata_path, language = %language, "Tesseract backend ready");

        Ok(Self {
            tessdata_path,
            language,
        })
    }

    fn init(&self) -> Result<Tesseract, OcrError> {
        Tesseract::new(Some(&self.tessdata_path), Some(&self.language))
            .map_err(|e| OcrError::ClientInit(format!("Failed to initialize Tesseract: {}", e)))
    }
}

impl SessionFactory for TesseractFactory {
    type Session = TesseractSession;

    fn open(&self) -> Result<TesseractSession, OcrError> {
        Ok(TesseractSession {
            engine: Some(self.init()?),
            applied: Vec::new(),
            factory: self.clone(),
        })
    }
}

/// A live Tesseract instance
///
/// The wrapped API consumes `self` on every call, so the instance is held in
/// an `Option` and put back after each successful call.
pub struct TesseractSession {
    engine: Option<Tesseract>,
    applied: Vec<(String, String)>,
    factory: TesseractFactory,
}

impl TesseractSession {
    fn take(&mut self) -> Result<Tesseract, OcrError> {
        self.engine
            .take()
            .ok_or_else(|| OcrError::Backend("Tesseract session is no longer usable".to_string()))
    }

    /// Replace a consumed instance with a fresh one carrying the accepted variables
    fn reinit(&self) -> Result<Tesseract, OcrError> {
        let mut tess = self.factory.init()?;
        for (name, value) in &self.applied {
            tess = tess.set_variable(name, value).map_err(|e| {
                OcrError::ClientInit(format!("Failed to restore {}={}: {}", name, value, e))
            })?;
        }
        Ok(tess)
    }
}

impl OcrSession for TesseractSession {
    fn set_variable(&mut self, name: &str, value: &str) -> Result<bool, OcrError> {
        // Tesseract only reads these while loading the traineddata, and the
        // binding has no way to pass them at init
        if INIT_ONLY_VARIABLES.contains(&name) {
            return Ok(false);
        }

        let tess = self.take()?;
        match tess.set_variable(name, value) {
            Ok(tess) => {
                self.applied.push((name.to_string(), value.to_string()));
                self.engine = Some(tess);
                Ok(true)
            }
            Err(e) => {
                // A refused variable consumes the instance
                tracing::debug!(variable = name, error = %e, "Recreating Tesseract instance");
                self.engine = Some(self.reinit()?);
                Ok(false)
            }
        }
    }

    fn recognize(&mut self, bitmap: &[u8]) -> Result<String, OcrError> {
        let mut tess = self.take()?;

        tess = tess.set_image_from_mem(bitmap).map_err(|e| {
            OcrError::Backend(format!(
                "Failed to set image ({} bytes): {}",
                bitmap.len(),
                e
            ))
        })?;

        tess = tess
            .recognize()
            .map_err(|e| OcrError::Backend(format!("Failed to recognize text: {}", e)))?;

        let text = tess
            .get_text()
            .map_err(|e| OcrError::Backend(format!("Failed to get text: {}", e)))?;

        tracing::debug!(confidence = tess.mean_text_conf(), "Tesseract recognition done");

        self.engine = Some(tess);
        Ok(text)
    }
}

impl Drop for TesseractSession {
    fn drop(&mut self) {
        tracing::debug!("Releasing Tesseract session");
    }
}

// ============================================================================
// Tessdata download helpers
// ============================================================================

/// Ensure tessdata is available, downloading if needed
fn ensure_tessdata_available(language: &str) -> Result<String, OcrError> {
    let cache_dir = dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("wqh")
        .join("tessdata");

    std::fs::create_dir_all(&cache_dir).map_err(|e| {
        OcrError::ClientInit(format!("Failed to create tessdata directory: {}", e))
    })?;

    let traineddata_path = cache_dir.join(format!("{}.traineddata", language));

    if !traineddata_path.exists() {
        tracing::info!(
            "Downloading tessdata for '{}' (this may take a moment)...",
            language
        );
        download_file(&tessdata_url(language), &traineddata_path)?;
        tracing::info!("Downloaded tessdata to {:?}", traineddata_path);
    } else {
        tracing::debug!("Using cached tessdata from {:?}", cache_dir);
    }

    // Tesseract expects the directory, not the file
    cache_dir
        .to_str()
        .map(|s| s.to_string())
        .ok_or_else(|| OcrError::ClientInit("Invalid tessdata path".to_string()))
}

fn tessdata_url(language: &str) -> String {
    format!(
        "https://github.com/tesseract-ocr/tessdata_fast/raw/main/{}.traineddata",
        language
    )
}

fn download_file(url: &str, path: &Path) -> Result<(), OcrError> {
    let response = ureq::get(url)
        .call()
        .map_err(|e| OcrError::ClientInit(format!("Failed to download tessdata: {}", e)))?;

    let buffer = response.into_body().read_to_vec().map_err(|e| {
        OcrError::ClientInit(format!("Failed to read tessdata response: {}", e))
    })?;

    let mut file = File::create(path).map_err(|e| {
        OcrError::ClientInit(format!("Failed to create tessdata file: {}", e))
    })?;

    file.write_all(&buffer).map_err(|e| {
        OcrError::ClientInit(format!("Failed to write tessdata file: {}", e))
    })?;

    Ok(())
}
