//! Detection dispatcher: manual entry or the image pipeline, then vehicle
//! lookup, logging and response assembly

use crate::decode::{decode_data_url, decode_image};
use crate::error::DetectError;
use crate::ocr::MultiPassExecutor;
use crate::plate::extract::dedup_first_seen;
use crate::plate::{
    extract_candidates, normalize_plate, Candidate, ConfidencePolicy, FixedConfidence,
};
use crate::preprocessing::Pipeline;
use crate::registry::{DetectionLogEntry, DetectionLogger, VehicleInfo, VehicleLookup, VehicleRecord};
use chrono::Utc;
use image::DynamicImage;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

/// Number of OCR candidates looked up per image
pub const DEFAULT_MAX_CANDIDATES: usize = 3;

/// Where a detection request came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Source {
    Upload,
    Camera,
    Manual,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::Upload => "upload",
            Source::Camera => "camera",
            Source::Manual => "manual",
        }
    }
}

/// Raw request fields, as submitted
#[derive(Debug, Clone, Default)]
pub struct DetectRequest {
    pub file: Option<Vec<u8>>,
    pub image_data: Option<String>,
    pub manual_plate: Option<String>,
}

/// The single input a request resolves to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetectInput {
    Manual(String),
    Upload(Vec<u8>),
    Camera(String),
}

impl DetectInput {
    /// Manual text wins over a file, a file over image data. Blank fields
    /// count as absent.
    pub fn from_request(request: DetectRequest) -> Result<Self, DetectError> {
        if let Some(text) = request.manual_plate {
            let text = text.trim();
            if !normalize_plate(text).is_empty() {
                return Ok(DetectInput::Manual(text.to_string()));
            }
        }
        if let Some(bytes) = request.file.filter(|b| !b.is_empty()) {
            return Ok(DetectInput::Upload(bytes));
        }
        if let Some(data) = request.image_data.filter(|d| !d.trim().is_empty()) {
            return Ok(DetectInput::Camera(data));
        }
        Err(DetectError::NoInput)
    }
}

/// A surfaced candidate and the vehicle registered under its key, if any
#[derive(Debug, Clone)]
pub struct PlateMatch {
    pub candidate: Candidate,
    pub vehicle: Option<VehicleRecord>,
}

#[derive(Debug, Clone)]
pub struct Detection {
    pub source: Source,
    pub plates: Vec<PlateMatch>,
}

pub struct Detector {
    pipeline: Pipeline,
    executor: MultiPassExecutor,
    lookup: Arc<dyn VehicleLookup>,
    logger: Arc<dyn DetectionLogger>,
    policy: Arc<dyn ConfidencePolicy>,
    max_candidates: usize,
}

impl Detector {
    pub fn new(
        pipeline: Pipeline,
        executor: MultiPassExecutor,
        lookup: Arc<dyn VehicleLookup>,
        logger: Arc<dyn DetectionLogger>,
    ) -> Self {
        Self {
            pipeline,
            executor,
            lookup,
            logger,
            policy: Arc::new(FixedConfidence::default()),
            max_candidates: DEFAULT_MAX_CANDIDATES,
        }
    }

    pub fn with_policy(mut self, policy: Arc<dyn ConfidencePolicy>) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_max_candidates(mut self, max_candidates: usize) -> Self {
        self.max_candidates = max_candidates;
        self
    }

    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    pub fn executor(&self) -> &MultiPassExecutor {
        &self.executor
    }

    pub fn max_candidates(&self) -> usize {
        self.max_candidates
    }

    /// Run one request to completion
    pub fn detect(&self, request: DetectRequest) -> Result<Detection, DetectError> {
        let start = Instant::now();

        let (source, candidates) = match DetectInput::from_request(request)? {
            DetectInput::Manual(text) => (Source::Manual, vec![self.manual_candidate(&text)]),
            DetectInput::Upload(bytes) => {
                let image = decode_image(&bytes)?;
                (Source::Upload, self.recognize(&image)?)
            }
            DetectInput::Camera(data_url) => {
                let image = decode_data_url(&data_url)?;
                (Source::Camera, self.recognize(&image)?)
            }
        };

        let plates: Vec<PlateMatch> = candidates
            .into_iter()
            .map(|candidate| self.resolve(candidate, source))
            .collect();

        tracing::info!(
            source = source.as_str(),
            candidates = plates.len(),
            matched = plates.iter().filter(|p| p.vehicle.is_some()).count(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Detection complete"
        );

        Ok(Detection { source, plates })
    }

    fn manual_candidate(&self, text: &str) -> Candidate {
        Candidate {
            text: text.to_string(),
            normalized: normalize_plate(text),
            pattern: None,
            confidence: self.policy.manual(),
        }
    }

    /// Image path: preprocess, OCR, extract, merge and truncate
    fn recognize(&self, image: &DynamicImage) -> Result<Vec<Candidate>, DetectError> {
        let preprocessed = self.pipeline.process(image)?;
        let enhanced = DynamicImage::ImageLuma8(preprocessed.image);

        let batch = self.executor.run(&enhanced, image);
        if batch.failures() > 0 {
            tracing::warn!(
                failed = batch.failures(),
                total = batch.passes.len() + 1,
                "Some OCR passes failed"
            );
        }

        let mut raw = extract_candidates(&batch.combined_text());
        raw.extend(extract_candidates(&batch.original.text));

        let candidates = raw
            .into_iter()
            .map(|raw| Candidate {
                normalized: normalize_plate(&raw.text),
                confidence: self.policy.ocr(&raw),
                pattern: Some(raw.pattern),
                text: raw.text,
            })
            .filter(|c| !c.normalized.is_empty());

        let mut candidates = dedup_first_seen(candidates, |c| c.normalized.clone());
        tracing::debug!(
            found = candidates.len(),
            keep = self.max_candidates,
            "Extracted plate candidates"
        );
        candidates.truncate(self.max_candidates);
        Ok(candidates)
    }

    fn resolve(&self, candidate: Candidate, source: Source) -> PlateMatch {
        let vehicle = self.lookup.find_by_plate(&candidate.normalized);

        self.logger.log(DetectionLogEntry {
            plate_number: candidate.normalized.clone(),
            detected_text: candidate.text.clone(),
            confidence: candidate.confidence,
            source,
            vehicle_id: vehicle.as_ref().map(|v| v.id),
            detected_at: Utc::now(),
        });

        PlateMatch { candidate, vehicle }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlateResult {
    pub text: String,
    pub confidence: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vehicle_info: Option<VehicleInfo>,
}

/// Body returned for every detection request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectionResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<Source>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plates: Option<Vec<PlateResult>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DetectionResponse {
    pub fn failure(err: &DetectError) -> Self {
        Self {
            success: false,
            source: None,
            plates: None,
            error: Some(err.user_message()),
        }
    }
}

impl From<Detection> for DetectionResponse {
    fn from(detection: Detection) -> Self {
        let plates = detection
            .plates
            .into_iter()
            .map(|m| PlateResult {
                vehicle_info: m.vehicle.as_ref().map(VehicleInfo::from),
                text: m.candidate.text,
                confidence: m.candidate.confidence,
            })
            .collect();

        Self {
            success: true,
            source: Some(detection.source),
            plates: Some(plates),
            error: None,
        }
    }
}

impl From<Result<Detection, DetectError>> for DetectionResponse {
    fn from(result: Result<Detection, DetectError>) -> Self {
        match result {
            Ok(detection) => detection.into(),
            Err(err) => Self::failure(&err),
        }
    }
}
