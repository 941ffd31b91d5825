//! Validator blueprint (`plutus.json`) loading

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::error::{Result, TreasuryError};
use crate::flat::PlutusVersion;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Preamble {
    pub title: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(rename = "plutusVersion", default)]
    pub plutus_version: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Validator {
    pub title: String,
    #[serde(rename = "compiledCode")]
    pub compiled_code: String,
    #[serde(default)]
    pub hash: Option<String>,
}

/// A compiled blueprint as produced by the contract toolchain
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Blueprint {
    pub preamble: Preamble,
    pub validators: Vec<Validator>,
}

impl Blueprint {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| TreasuryError::Blueprint(e.to_string()))
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|e| {
            TreasuryError::Blueprint(format!("failed to read {}: {}", path.display(), e))
        })?;
        let blueprint = Self::from_json(&json)?;
        log::debug!(
            "Loaded blueprint {} with {} validators",
            blueprint.preamble.title,
            blueprint.validators.len()
        );
        Ok(blueprint)
    }

    /// Plutus language version declared in the preamble, V3 when absent
    pub fn plutus_version(&self) -> Result<PlutusVersion> {
        match self.preamble.plutus_version.as_deref() {
            None | Some("v3") => Ok(PlutusVersion::V3),
            Some("v2") => Ok(PlutusVersion::V2),
            Some("v1") => Ok(PlutusVersion::V1),
            Some(other) => Err(TreasuryError::Blueprint(format!(
                "unknown plutus version {}",
                other
            ))),
        }
    }

    /// Compiled code (CBOR hex) of the validator with the given title
    pub fn validator(&self, title: &str) -> Result<&str> {
        self.validators
            .iter()
            .find(|v| v.title == title)
            .map(|v| v.compiled_code.as_str())
            .ok_or_else(|| TreasuryError::ValidatorNotFound(title.to_string()))
    }
}
