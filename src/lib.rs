//! License plate detection: plate region isolation, multi-pass OCR,
//! candidate extraction and vehicle lookup behind an HTTP API.

pub mod config;
pub mod decode;
pub mod detect;
pub mod engine;
pub mod engines;
pub mod error;
pub mod ocr;
pub mod plate;
pub mod preprocessing;
pub mod registry;
pub mod server;
