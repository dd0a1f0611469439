//! Vehicle lookup and detection logging collaborators
//!
//! The detector only depends on the two traits. The in-memory
//! implementations back the standalone server; a database-backed service
//! can implement the same traits.

use crate::detect::Source;
use crate::plate::normalize_plate;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, VecDeque};
use std::path::Path;
use std::sync::Mutex;
use thiserror::Error;

/// Resolves a normalized plate key to a registered vehicle
pub trait VehicleLookup: Send + Sync {
    fn find_by_plate(&self, normalized: &str) -> Option<VehicleRecord>;
}

/// Records every surfaced candidate, matched or not. Fire-and-forget:
/// implementations handle their own failures.
pub trait DetectionLogger: Send + Sync {
    fn log(&self, entry: DetectionLogEntry);
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OwnerRecord {
    pub first_name: String,
    pub last_name: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleRecord {
    pub id: i64,
    pub plate_number: String,
    #[serde(default)]
    pub make: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub year: Option<i32>,
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default = "default_status")]
    pub status: String,
    pub owner: OwnerRecord,
}

fn default_status() -> String {
    "active".to_string()
}

/// Owner summary as returned to clients
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OwnerInfo {
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
}

/// Vehicle summary attached to a matched plate
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VehicleInfo {
    pub make: Option<String>,
    pub model: Option<String>,
    pub year: Option<i32>,
    pub color: Option<String>,
    pub status: String,
    pub owner: OwnerInfo,
}

impl From<&VehicleRecord> for VehicleInfo {
    fn from(vehicle: &VehicleRecord) -> Self {
        let owner = &vehicle.owner;
        Self {
            make: vehicle.make.clone(),
            model: vehicle.model.clone(),
            year: vehicle.year,
            color: vehicle.color.clone(),
            status: vehicle.status.clone(),
            owner: OwnerInfo {
                name: format!("{} {}", owner.first_name, owner.last_name),
                email: owner.email.clone(),
                phone: owner.phone.clone(),
                city: owner.city.clone(),
                state: owner.state.clone(),
            },
        }
    }
}

#[derive(Error, Debug)]
pub enum RegistryError {
    #[error("Failed to read registry file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid registry file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Plate {plate} is registered more than once")]
    DuplicatePlate { plate: String },

    #[error("Plate {0:?} has no letters or digits")]
    EmptyPlate(String),
}

/// Vehicles indexed by normalized plate
#[derive(Debug, Default)]
pub struct InMemoryRegistry {
    vehicles: HashMap<String, VehicleRecord>,
}

impl InMemoryRegistry {
    pub fn new(records: Vec<VehicleRecord>) -> Result<Self, RegistryError> {
        let mut vehicles = HashMap::with_capacity(records.len());
        for record in records {
            let key = normalize_plate(&record.plate_number);
            if key.is_empty() {
                return Err(RegistryError::EmptyPlate(record.plate_number));
            }
            if vehicles.contains_key(&key) {
                return Err(RegistryError::DuplicatePlate { plate: key });
            }
            vehicles.insert(key, record);
        }
        Ok(Self { vehicles })
    }

    /// Load a JSON array of vehicle records
    pub fn from_file(path: &Path) -> Result<Self, RegistryError> {
        let data = std::fs::read_to_string(path)?;
        let records: Vec<VehicleRecord> = serde_json::from_str(&data)?;
        Self::new(records)
    }

    pub fn len(&self) -> usize {
        self.vehicles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vehicles.is_empty()
    }
}

impl VehicleLookup for InMemoryRegistry {
    fn find_by_plate(&self, normalized: &str) -> Option<VehicleRecord> {
        self.vehicles.get(normalized).cloned()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DetectionLogEntry {
    /// Normalized plate key
    pub plate_number: String,
    /// Text as surfaced to the client
    pub detected_text: String,
    pub confidence: u8,
    pub source: Source,
    pub vehicle_id: Option<i64>,
    pub detected_at: DateTime<Utc>,
}

/// Default number of entries kept by [`MemoryDetectionLog`]
pub const DEFAULT_LOG_CAPACITY: usize = 1000;

/// Bounded in-memory detection log; the oldest entries are dropped first
pub struct MemoryDetectionLog {
    entries: Mutex<VecDeque<DetectionLogEntry>>,
    capacity: usize,
}

impl MemoryDetectionLog {
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(VecDeque::with_capacity(capacity.min(DEFAULT_LOG_CAPACITY))),
            capacity,
        }
    }

    /// Up to `limit` entries, newest first, after skipping the `skip`
    /// newest ones
    pub fn recent(&self, skip: usize, limit: usize) -> Vec<DetectionLogEntry> {
        let entries = self.entries.lock().unwrap_or_else(|p| p.into_inner());
        entries.iter().rev().skip(skip).take(limit).cloned().collect()
    }
}

impl Default for MemoryDetectionLog {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_CAPACITY)
    }
}

impl DetectionLogger for MemoryDetectionLog {
    fn log(&self, entry: DetectionLogEntry) {
        tracing::info!(
            plate = %entry.plate_number,
            detected_text = %entry.detected_text,
            confidence = entry.confidence,
            source = entry.source.as_str(),
            vehicle_id = ?entry.vehicle_id,
            "Plate detection logged"
        );

        if self.capacity == 0 {
            return;
        }
        let mut entries = self.entries.lock().unwrap_or_else(|p| p.into_inner());
        while entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn vehicle(id: i64, plate: &str) -> VehicleRecord {
        VehicleRecord {
            id,
            plate_number: plate.to_string(),
            make: Some("Toyota".to_string()),
            model: Some("Corolla".to_string()),
            year: Some(2019),
            color: Some("Blue".to_string()),
            status: "active".to_string(),
            owner: OwnerRecord {
                first_name: "Ana".to_string(),
                last_name: "Silva".to_string(),
                email: Some("ana@example.com".to_string()),
                phone: None,
                city: Some("Lisbon".to_string()),
                state: None,
            },
        }
    }

    fn entry(text: &str) -> DetectionLogEntry {
        DetectionLogEntry {
            plate_number: normalize_plate(text),
            detected_text: text.to_string(),
            confidence: 85,
            source: Source::Upload,
            vehicle_id: None,
            detected_at: Utc::now(),
        }
    }

    #[test]
    fn test_lookup_by_normalized_key() {
        let registry = InMemoryRegistry::new(vec![vehicle(1, "abc-1234")]).unwrap();

        assert_eq!(registry.find_by_plate("ABC1234").map(|v| v.id), Some(1));
        // Raw text is not a key
        assert!(registry.find_by_plate("abc-1234").is_none());
    }

    #[test]
    fn test_rejects_equivalent_duplicates() {
        let result = InMemoryRegistry::new(vec![vehicle(1, "ABC 1234"), vehicle(2, "abc-1234")]);
        assert!(matches!(result, Err(RegistryError::DuplicatePlate { plate }) if plate == "ABC1234"));
    }

    #[test]
    fn test_rejects_empty_plate() {
        let result = InMemoryRegistry::new(vec![vehicle(1, "--")]);
        assert!(matches!(result, Err(RegistryError::EmptyPlate(_))));
    }

    #[test]
    fn test_loads_json_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"[{{"id": 7, "plate_number": "XY-9876", "make": "Ford",
                 "owner": {{"first_name": "Sam", "last_name": "Lee"}}}}]"#
        )
        .unwrap();

        let registry = InMemoryRegistry::from_file(file.path()).unwrap();
        let vehicle = registry.find_by_plate("XY9876").unwrap();

        assert_eq!(registry.len(), 1);
        assert_eq!(vehicle.status, "active");
        assert_eq!(vehicle.owner.email, None);
    }

    #[test]
    fn test_vehicle_info_joins_owner_name() {
        let info = VehicleInfo::from(&vehicle(1, "ABC1234"));
        assert_eq!(info.owner.name, "Ana Silva");
        assert_eq!(info.make.as_deref(), Some("Toyota"));
    }

    #[test]
    fn test_log_is_bounded_and_newest_first() {
        let log = MemoryDetectionLog::new(2);
        log.log(entry("AAA111"));
        log.log(entry("BBB222"));
        log.log(entry("CCC333"));

        let texts: Vec<String> = log.recent(0, 10).into_iter().map(|e| e.detected_text).collect();
        assert_eq!(texts, vec!["CCC333", "BBB222"]);
        assert_eq!(log.recent(0, 1).len(), 1);
    }

    #[test]
    fn test_log_skip_pages_from_newest() {
        let log = MemoryDetectionLog::default();
        for text in ["AAA111", "BBB222", "CCC333", "DDD444"] {
            log.log(entry(text));
        }

        let page: Vec<String> = log.recent(1, 2).into_iter().map(|e| e.detected_text).collect();
        assert_eq!(page, vec!["CCC333", "BBB222"]);
        assert!(log.recent(4, 10).is_empty());
    }
}
