//! Shelley address codec
//!
//! Addresses are a one-byte header (address type in the high nibble, network
//! id in the low nibble) followed by the payment credential hash and, for base
//! addresses, the stake credential hash. The text form is bech32 with the
//! `addr` / `addr_test` prefix.

use bech32::{Bech32, Hrp};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::error::{CoreError, Result};
use crate::hash::{Hash28, HASH28_LEN};

const TYPE_BASE_KEY_KEY: u8 = 0b0000;
const TYPE_BASE_SCRIPT_KEY: u8 = 0b0001;
const TYPE_BASE_KEY_SCRIPT: u8 = 0b0010;
const TYPE_BASE_SCRIPT_SCRIPT: u8 = 0b0011;
const TYPE_POINTER_KEY: u8 = 0b0100;
const TYPE_POINTER_SCRIPT: u8 = 0b0101;
const TYPE_ENTERPRISE_KEY: u8 = 0b0110;
const TYPE_ENTERPRISE_SCRIPT: u8 = 0b0111;

/// Network discriminant carried in every address header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NetworkId {
    Testnet,
    Mainnet,
}

impl NetworkId {
    pub fn id(&self) -> u8 {
        match self {
            NetworkId::Testnet => 0,
            NetworkId::Mainnet => 1,
        }
    }

    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            0 => Some(NetworkId::Testnet),
            1 => Some(NetworkId::Mainnet),
            _ => None,
        }
    }

    /// Human readable bech32 prefix for payment addresses
    pub fn hrp(&self) -> &'static str {
        match self {
            NetworkId::Testnet => "addr_test",
            NetworkId::Mainnet => "addr",
        }
    }
}

/// A payment or stake credential
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Credential {
    /// Verification key hash
    Key(Hash28),
    /// Script hash
    Script(Hash28),
}

impl Credential {
    pub fn hash(&self) -> &Hash28 {
        match self {
            Credential::Key(h) | Credential::Script(h) => h,
        }
    }

    pub fn is_script(&self) -> bool {
        matches!(self, Credential::Script(_))
    }
}

/// A Shelley payment address (base or enterprise)
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Address {
    network: NetworkId,
    payment: Credential,
    stake: Option<Credential>,
}

impl Address {
    pub fn new(network: NetworkId, payment: Credential, stake: Option<Credential>) -> Self {
        Self {
            network,
            payment,
            stake,
        }
    }

    /// Enterprise address locked by a script, no stake part
    pub fn script(network: NetworkId, script_hash: Hash28) -> Self {
        Self::new(network, Credential::Script(script_hash), None)
    }

    pub fn network(&self) -> NetworkId {
        self.network
    }

    pub fn payment(&self) -> &Credential {
        &self.payment
    }

    pub fn stake(&self) -> Option<&Credential> {
        self.stake.as_ref()
    }

    /// Payment key hash, `None` for script-locked addresses
    pub fn payment_key_hash(&self) -> Option<&Hash28> {
        match &self.payment {
            Credential::Key(h) => Some(h),
            Credential::Script(_) => None,
        }
    }

    fn header_type(&self) -> u8 {
        match (&self.payment, &self.stake) {
            (Credential::Key(_), Some(Credential::Key(_))) => TYPE_BASE_KEY_KEY,
            (Credential::Script(_), Some(Credential::Key(_))) => TYPE_BASE_SCRIPT_KEY,
            (Credential::Key(_), Some(Credential::Script(_))) => TYPE_BASE_KEY_SCRIPT,
            (Credential::Script(_), Some(Credential::Script(_))) => TYPE_BASE_SCRIPT_SCRIPT,
            (Credential::Key(_), None) => TYPE_ENTERPRISE_KEY,
            (Credential::Script(_), None) => TYPE_ENTERPRISE_SCRIPT,
        }
    }

    /// Raw header + payload bytes
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(1 + 2 * HASH28_LEN);
        bytes.push((self.header_type() << 4) | self.network.id());
        bytes.extend_from_slice(self.payment.hash().as_bytes());
        if let Some(stake) = &self.stake {
            bytes.extend_from_slice(stake.hash().as_bytes());
        }
        bytes
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        let (&header, payload) = bytes
            .split_first()
            .ok_or_else(|| CoreError::MalformedAddress("empty address".to_string()))?;
        let kind = header >> 4;
        let network = NetworkId::from_id(header & 0x0f).ok_or_else(|| {
            CoreError::MalformedAddress(format!("unknown network id {}", header & 0x0f))
        })?;

        let expected_len = match kind {
            TYPE_BASE_KEY_KEY..=TYPE_BASE_SCRIPT_SCRIPT => 2 * HASH28_LEN,
            TYPE_ENTERPRISE_KEY | TYPE_ENTERPRISE_SCRIPT => HASH28_LEN,
            TYPE_POINTER_KEY | TYPE_POINTER_SCRIPT => {
                return Err(CoreError::MalformedAddress(
                    "pointer addresses are not supported".to_string(),
                ))
            }
            other => {
                return Err(CoreError::MalformedAddress(format!(
                    "address type {} has no payment credential",
                    other
                )))
            }
        };
        if payload.len() != expected_len {
            return Err(CoreError::MalformedAddress(format!(
                "expected {} payload bytes for type {}, got {}",
                expected_len,
                kind,
                payload.len()
            )));
        }

        let payment_hash = Hash28::from_slice(&payload[..HASH28_LEN])?;
        let payment = if kind & 0b0001 == 0 {
            Credential::Key(payment_hash)
        } else {
            Credential::Script(payment_hash)
        };
        let stake = if expected_len == 2 * HASH28_LEN {
            let stake_hash = Hash28::from_slice(&payload[HASH28_LEN..])?;
            Some(if kind & 0b0010 == 0 {
                Credential::Key(stake_hash)
            } else {
                Credential::Script(stake_hash)
            })
        } else {
            None
        };

        Ok(Self::new(network, payment, stake))
    }

    pub fn to_bech32(&self) -> Result<String> {
        let hrp = Hrp::parse(self.network.hrp())
            .map_err(|e| CoreError::MalformedAddress(e.to_string()))?;
        bech32::encode::<Bech32>(hrp, &self.to_bytes())
            .map_err(|e| CoreError::MalformedAddress(e.to_string()))
    }

    pub fn from_bech32(s: &str) -> Result<Self> {
        let (hrp, bytes) =
            bech32::decode(s).map_err(|e| CoreError::MalformedAddress(e.to_string()))?;
        let address = Self::from_bytes(&bytes)?;
        if hrp.as_str() != address.network.hrp() {
            return Err(CoreError::MalformedAddress(format!(
                "prefix {} does not match network {:?}",
                hrp.as_str(),
                address.network
            )));
        }
        Ok(address)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = self.to_bech32().map_err(|_| fmt::Error)?;
        f.write_str(&text)
    }
}

impl FromStr for Address {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_bech32(s)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let text = self.to_bech32().map_err(serde::ser::Error::custom)?;
        serializer.serialize_str(&text)
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_bech32(&s).map_err(serde::de::Error::custom)
    }
}

/// Split an address into its payment hash and optional stake hash
pub fn decode_payment_and_stake(address: &str) -> Result<(Hash28, Option<Hash28>)> {
    let address = Address::from_bech32(address)?;
    Ok((*address.payment.hash(), address.stake.map(|s| *s.hash())))
}

/// Build a key-hash address from raw credential bytes
///
/// Both hashes must be exactly 28 bytes. A missing stake hash produces an
/// enterprise address.
pub fn encode_credential(
    network: NetworkId,
    payment: &[u8],
    stake: Option<&[u8]>,
) -> Result<Address> {
    let payment = Credential::Key(Hash28::from_slice(payment)?);
    let stake = match stake {
        Some(bytes) => Some(Credential::Key(Hash28::from_slice(bytes)?)),
        None => None,
    };
    Ok(Address::new(network, payment, stake))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hash(byte: u8) -> Hash28 {
        Hash28::new([byte; 28])
    }

    #[test]
    fn test_base_address_round_trip() {
        let address = encode_credential(NetworkId::Testnet, &[1; 28], Some(&[2; 28])).unwrap();
        let text = address.to_string();
        assert!(text.starts_with("addr_test1"));

        let (payment, stake) = decode_payment_and_stake(&text).unwrap();
        assert_eq!(payment, hash(1));
        assert_eq!(stake, Some(hash(2)));
        assert_eq!(text.parse::<Address>().unwrap(), address);
    }

    #[test]
    fn test_enterprise_address_has_no_stake() {
        let address = encode_credential(NetworkId::Mainnet, &[9; 28], None).unwrap();
        let text = address.to_string();
        assert!(text.starts_with("addr1"));
        assert_eq!(address.to_bytes()[0], 0x61);

        let (payment, stake) = decode_payment_and_stake(&text).unwrap();
        assert_eq!(payment, hash(9));
        assert!(stake.is_none());
    }

    #[test]
    fn test_script_address_header() {
        let address = Address::script(NetworkId::Testnet, hash(4));
        assert_eq!(address.to_bytes()[0], 0x70);
        assert!(address.payment().is_script());
        assert!(address.payment_key_hash().is_none());
        let back = Address::from_bech32(&address.to_string()).unwrap();
        assert_eq!(back, address);
    }

    #[test]
    fn test_invalid_credential_length() {
        let err = encode_credential(NetworkId::Testnet, &[1; 27], None).unwrap_err();
        assert!(matches!(
            err,
            CoreError::InvalidCredentialLength {
                expected: 28,
                actual: 27
            }
        ));

        let err = encode_credential(NetworkId::Testnet, &[1; 28], Some(&[2; 29])).unwrap_err();
        assert!(matches!(
            err,
            CoreError::InvalidCredentialLength { actual: 29, .. }
        ));
    }

    #[test]
    fn test_malformed_addresses() {
        assert!(matches!(
            decode_payment_and_stake("not an address"),
            Err(CoreError::MalformedAddress(_))
        ));

        // stake (reward) address carries no payment credential
        let mut reward = vec![0xe0];
        reward.extend_from_slice(&[3; 28]);
        assert!(matches!(
            Address::from_bytes(&reward),
            Err(CoreError::MalformedAddress(_))
        ));

        // truncated base address
        let mut short = vec![0x00];
        short.extend_from_slice(&[3; 40]);
        assert!(matches!(
            Address::from_bytes(&short),
            Err(CoreError::MalformedAddress(_))
        ));
    }

    #[test]
    fn test_prefix_must_match_network() {
        let address = encode_credential(NetworkId::Mainnet, &[5; 28], None).unwrap();
        let hrp = Hrp::parse("addr_test").unwrap();
        let mislabelled = bech32::encode::<Bech32>(hrp, &address.to_bytes()).unwrap();
        assert!(Address::from_bech32(&mislabelled).is_err());
    }
}
