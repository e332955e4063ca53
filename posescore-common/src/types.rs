//! Domain types shared across PoseScore crates
//!
//! - [`SlotKind`]: the fixed set of named capture slots
//! - [`Category`]: the user-selected classifier sent with every analysis
//! - [`Artifact`]: one encoded still image produced by a capture

use crate::{Error, Result};
use base64::{engine::general_purpose, Engine as _};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Prefix of every artifact string; the scorer expects PNG data URLs
pub const PNG_DATA_URL_PREFIX: &str = "data:image/png;base64,";

/// Named capture slot
///
/// The serialized names double as the request field names of the
/// scoring service (`happy`, `serious`, `body`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SlotKind {
    /// Smiling face close-up, scored for emotion
    Happy,
    /// Neutral face close-up, scored for symmetry
    Serious,
    /// Full body shot, scored for proportions
    Body,
}

impl SlotKind {
    /// All slots in display order
    pub const ALL: [SlotKind; 3] = [SlotKind::Happy, SlotKind::Serious, SlotKind::Body];

    pub fn as_str(&self) -> &'static str {
        match self {
            SlotKind::Happy => "happy",
            SlotKind::Serious => "serious",
            SlotKind::Body => "body",
        }
    }
}

impl fmt::Display for SlotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SlotKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "happy" => Ok(SlotKind::Happy),
            "serious" => Ok(SlotKind::Serious),
            "body" => Ok(SlotKind::Body),
            other => Err(Error::InvalidInput(format!(
                "Unknown slot '{}' (expected happy, serious or body)",
                other
            ))),
        }
    }
}

/// Category selector sent alongside the images
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Male,
    Female,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Male => "male",
            Category::Female => "female",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Category {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "male" => Ok(Category::Male),
            "female" => Ok(Category::Female),
            other => Err(Error::InvalidInput(format!(
                "Unknown category '{}' (expected male or female)",
                other
            ))),
        }
    }
}

/// Encoded still image (PNG data URL)
///
/// Only built from non-empty PNG bytes, so a stored artifact is never
/// partial or blank.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Artifact(String);

impl Artifact {
    /// Wrap encoded PNG bytes as a data URL
    pub fn from_png_bytes(png: &[u8]) -> Result<Self> {
        if png.is_empty() {
            return Err(Error::InvalidInput("Refusing to store an empty image".to_string()));
        }
        let encoded = general_purpose::STANDARD.encode(png);
        Ok(Self(format!("{}{}", PNG_DATA_URL_PREFIX, encoded)))
    }

    /// Decode the PNG bytes back out of the data URL
    pub fn png_bytes(&self) -> Result<Vec<u8>> {
        let payload = self
            .0
            .strip_prefix(PNG_DATA_URL_PREFIX)
            .ok_or_else(|| Error::InvalidInput("Artifact is not a PNG data URL".to_string()))?;
        general_purpose::STANDARD
            .decode(payload)
            .map_err(|e| Error::InvalidInput(format!("Artifact payload is not base64: {}", e)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Length of the encoded string, for log lines
    pub fn encoded_len(&self) -> usize {
        self.0.len()
    }
}
