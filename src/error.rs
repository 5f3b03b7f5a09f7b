use std::fmt;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OcrError {
    #[error("Failed to initialize OCR backend: {0}")]
    ClientInit(String),

    #[error("Failed to decode image: {0}")]
    Decode(String),

    #[error("OCR backend failed: {0}")]
    Backend(String),

    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl OcrError {
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        OcrError::Io {
            context: context.into(),
            source,
        }
    }

    /// Stable identifier used in log lines
    pub fn code(&self) -> &'static str {
        match self {
            OcrError::ClientInit(_) => "CLIENT_INIT_ERROR",
            OcrError::Decode(_) => "DECODE_ERROR",
            OcrError::Backend(_) => "BACKEND_ERROR",
            OcrError::Io { .. } => "IO_ERROR",
        }
    }
}

/// Pipeline stage a failure originated from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Header,
    Preprocess,
    Extract,
    Output,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Header => "header",
            Stage::Preprocess => "preprocess",
            Stage::Extract => "extract",
            Stage::Output => "output",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
#[error("{stage} stage failed")]
pub struct PipelineError {
    pub stage: Stage,
    #[source]
    pub source: OcrError,
}

impl PipelineError {
    pub fn new(stage: Stage, source: OcrError) -> Self {
        Self { stage, source }
    }

    pub fn code(&self) -> &'static str {
        self.source.code()
    }
}
