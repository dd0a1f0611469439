use crate::preprocessing::Preset;
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "plate-detect-server")]
#[command(about = "License plate detection server")]
#[command(version)]
pub struct Args {
    /// Host address to bind to
    #[arg(long, env = "PLATE_HOST", default_value = "127.0.0.1")]
    pub host: String,

    /// Port to listen on
    #[arg(long, env = "PLATE_PORT", default_value = "8001")]
    pub port: u16,

    /// Tesseract language (e.g., "eng", "deu")
    #[arg(long, env = "PLATE_LANGUAGE", default_value = "eng")]
    pub language: String,

    /// Maximum upload size in bytes (default: 10MB)
    #[arg(long, env = "PLATE_MAX_FILE_SIZE", default_value = "10485760")]
    pub max_file_size: usize,

    /// Path to tessdata directory (downloaded into the cache dir if not set)
    #[arg(long, env = "TESSDATA_PREFIX")]
    pub tessdata_path: Option<String>,

    /// Preprocessing strategy: "contour" or "grayscale"
    #[arg(long, env = "PLATE_PRESET", default_value = "contour", value_parser = parse_preset)]
    pub preset: Preset,

    /// JSON file with registered vehicles
    #[arg(long, env = "PLATE_REGISTRY")]
    pub registry: Option<PathBuf>,

    /// Number of OCR candidates looked up per image
    #[arg(long, env = "PLATE_MAX_CANDIDATES", default_value = "3")]
    pub max_candidates: usize,

    /// Upper bound for one detection request, in seconds
    #[arg(long, env = "PLATE_DETECT_TIMEOUT", default_value = "30")]
    pub detect_timeout_secs: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "RUST_LOG", default_value = "info")]
    pub log_level: String,
}

fn parse_preset(s: &str) -> Result<Preset, String> {
    Preset::from_str(s).ok_or_else(|| format!("unknown preset '{}' (expected contour or grayscale)", s))
}

/// Server configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub language: String,
    pub max_file_size: usize,
    pub tessdata_path: Option<String>,
    pub preset: Preset,
    pub registry: Option<PathBuf>,
    pub max_candidates: usize,
    pub detect_timeout: Duration,
}

impl From<Args> for Config {
    fn from(args: Args) -> Self {
        Self {
            host: args.host,
            port: args.port,
            language: args.language,
            max_file_size: args.max_file_size,
            tessdata_path: args.tessdata_path,
            preset: args.preset,
            registry: args.registry,
            max_candidates: args.max_candidates,
            detect_timeout: Duration::from_secs(args.detect_timeout_secs),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8001,
            language: "eng".to_string(),
            max_file_size: 10 * 1024 * 1024,
            tessdata_path: None,
            preset: Preset::default(),
            registry: None,
            max_candidates: 3,
            detect_timeout: Duration::from_secs(30),
        }
    }
}
