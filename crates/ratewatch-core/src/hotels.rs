use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ConfigError;

/// A monitored hotel listing. Owned by the caller; the engine never mutates it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HotelTarget {
    pub id: String,
    pub name: String,
    /// Canonical listing URL, stored exactly as registered.
    pub url: String,
    #[serde(default = "default_active")]
    pub active: bool,
}

impl HotelTarget {
    #[must_use]
    pub fn new(id: impl Into<String>, name: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            url: url.into(),
            active: true,
        }
    }
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct HotelsFile {
    pub hotels: Vec<HotelTarget>,
}

impl HotelsFile {
    /// Active hotels in registry order.
    #[must_use]
    pub fn monitored(&self) -> Vec<HotelTarget> {
        self.hotels.iter().filter(|h| h.active).cloned().collect()
    }
}

/// Load and validate the hotel registry from a YAML file.
///
/// # Errors
///
/// Returns `ConfigError` if the file cannot be read, parsed, or fails validation.
pub fn load_hotels(path: &Path) -> Result<HotelsFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::HotelsFileIo {
        path: path.display().to_string(),
        source: e,
    })?;

    let hotels_file: HotelsFile = serde_yaml::from_str(&content)?;

    validate_hotels(&hotels_file)?;

    Ok(hotels_file)
}

fn validate_hotels(hotels_file: &HotelsFile) -> Result<(), ConfigError> {
    let mut seen_ids = HashSet::new();

    for hotel in &hotels_file.hotels {
        if hotel.id.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "hotel '{}' has an empty id",
                hotel.name
            )));
        }

        if hotel.name.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "hotel '{}' has an empty name",
                hotel.id
            )));
        }

        if !(hotel.url.starts_with("https://") || hotel.url.starts_with("http://")) {
            return Err(ConfigError::Validation(format!(
                "hotel '{}' has a non-http url: {}",
                hotel.name, hotel.url
            )));
        }

        if !seen_ids.insert(hotel.id.as_str()) {
            return Err(ConfigError::Validation(format!(
                "duplicate hotel id: '{}'",
                hotel.id
            )));
        }
    }

    Ok(())
}
