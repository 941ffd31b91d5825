//! UTxO and multi-asset value types

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::address::Address;
use crate::error::{CoreError, Result};
use crate::hash::{Hash28, HASH28_LEN};

/// Base unit name of the native coin
pub const LOVELACE: &str = "lovelace";

/// Lovelace per ADA (6 decimal places)
pub const LOVELACE_PER_ADA: u64 = 1_000_000;

/// Longest permitted native asset name
pub const MAX_ASSET_NAME_LEN: usize = 32;

/// Asset identifier: the native coin or a `policy id ‖ asset name` token
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AssetUnit {
    Lovelace,
    Token { policy_id: Hash28, name: Vec<u8> },
}

impl AssetUnit {
    pub fn token(policy_id: Hash28, name: impl Into<Vec<u8>>) -> Self {
        AssetUnit::Token {
            policy_id,
            name: name.into(),
        }
    }

    pub fn is_lovelace(&self) -> bool {
        matches!(self, AssetUnit::Lovelace)
    }
}

impl fmt::Display for AssetUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AssetUnit::Lovelace => f.write_str(LOVELACE),
            AssetUnit::Token { policy_id, name } => {
                write!(f, "{}{}", policy_id.to_hex(), hex::encode(name))
            }
        }
    }
}

impl FromStr for AssetUnit {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        if s == LOVELACE {
            return Ok(AssetUnit::Lovelace);
        }
        let bytes = hex::decode(s).map_err(|e| CoreError::InvalidUnit(format!("{}: {}", s, e)))?;
        if bytes.len() < HASH28_LEN || bytes.len() > HASH28_LEN + MAX_ASSET_NAME_LEN {
            return Err(CoreError::InvalidUnit(format!(
                "{}: expected policy id plus up to {} name bytes",
                s, MAX_ASSET_NAME_LEN
            )));
        }
        let policy_id = Hash28::from_slice(&bytes[..HASH28_LEN])?;
        Ok(AssetUnit::token(policy_id, &bytes[HASH28_LEN..]))
    }
}

impl Serialize for AssetUnit {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for AssetUnit {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    pub unit: AssetUnit,
    pub quantity: u64,
}

impl Asset {
    pub fn lovelace(quantity: u64) -> Self {
        Self {
            unit: AssetUnit::Lovelace,
            quantity,
        }
    }
}

/// A bundle of assets locked in one output, in ledger order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Value(Vec<Asset>);

impl Value {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    pub fn from_lovelace(quantity: u64) -> Self {
        Self(vec![Asset::lovelace(quantity)])
    }

    pub fn assets(&self) -> &[Asset] {
        &self.0
    }

    pub fn quantity_of(&self, unit: &AssetUnit) -> u64 {
        self.0
            .iter()
            .filter(|a| &a.unit == unit)
            .fold(0u64, |total, a| total.saturating_add(a.quantity))
    }

    pub fn lovelace(&self) -> u64 {
        self.quantity_of(&AssetUnit::Lovelace)
    }

    /// True when the value holds the native coin and nothing else
    pub fn is_pure_lovelace(&self) -> bool {
        self.0.len() == 1 && self.0[0].unit.is_lovelace()
    }

    /// Add `quantity` of `unit`, merging with an existing entry
    pub fn with(mut self, unit: AssetUnit, quantity: u64) -> Self {
        match self.0.iter_mut().find(|a| a.unit == unit) {
            Some(asset) => asset.quantity = asset.quantity.saturating_add(quantity),
            None => self.0.push(Asset { unit, quantity }),
        }
        self
    }

    /// Replace the lovelace amount, keeping every other asset
    pub fn with_lovelace(mut self, quantity: u64) -> Self {
        self.0.retain(|a| !a.unit.is_lovelace());
        self.0.insert(0, Asset::lovelace(quantity));
        self
    }
}

/// Reference to a transaction output
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OutPoint {
    pub tx_hash: String,
    pub output_index: u32,
}

impl fmt::Display for OutPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.tx_hash, self.output_index)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOutput {
    pub address: Address,
    pub amount: Value,
    /// Inline datum as CBOR hex
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plutus_data: Option<String>,
}

/// Unspent transaction output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Utxo {
    pub input: OutPoint,
    pub output: TxOutput,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_round_trip() {
        let unit = AssetUnit::token(Hash28::new([0x11; 28]), b"treasury".to_vec());
        let text = unit.to_string();
        assert_eq!(text, format!("{}{}", "11".repeat(28), hex::encode("treasury")));
        assert_eq!(text.parse::<AssetUnit>().unwrap(), unit);
        assert_eq!("lovelace".parse::<AssetUnit>().unwrap(), AssetUnit::Lovelace);
    }

    #[test]
    fn test_unit_rejects_short_policy() {
        assert!("abcd".parse::<AssetUnit>().is_err());
        assert!("zz".parse::<AssetUnit>().is_err());
    }

    #[test]
    fn test_value_merging() {
        let token = AssetUnit::token(Hash28::new([2; 28]), b"t".to_vec());
        let value = Value::from_lovelace(5)
            .with(token.clone(), 1)
            .with(AssetUnit::Lovelace, 10);

        assert_eq!(value.lovelace(), 15);
        assert_eq!(value.quantity_of(&token), 1);
        assert!(!value.is_pure_lovelace());
        assert!(Value::from_lovelace(1).is_pure_lovelace());

        let replaced = value.with_lovelace(3);
        assert_eq!(replaced.lovelace(), 3);
        assert_eq!(replaced.quantity_of(&token), 1);
        assert_eq!(replaced.assets().len(), 2);
    }

    #[test]
    fn test_repeated_unit_saturates() {
        // ledger-reported values may list a unit more than once
        let value: Value = serde_json::from_str(
            r#"[{"unit":"lovelace","quantity":18446744073709551615},{"unit":"lovelace","quantity":5}]"#,
        )
        .unwrap();
        assert_eq!(value.lovelace(), u64::MAX);
    }
}
