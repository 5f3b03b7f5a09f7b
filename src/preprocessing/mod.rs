//! Image preprocessing for OCR enhancement
//!
//! A fixed chain (grayscale, sharpen, contrast) that can run on its own
//! (`wqh optimize`) or in front of a text extractor.

pub mod pipeline;
pub mod steps;

pub use pipeline::Preprocessor;
