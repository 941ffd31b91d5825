//! Treasury datum codec
//!
//! The persisted state is an inline datum whose shape is fixed by the
//! on-chain validator:
//!
//! ```text
//! Datum       = Constr0[ Address(receiver), List[Address](owners), List[Address](signers) ]
//! Address     = Constr0[ PaymentCred, MaybeStake ]
//! PaymentCred = Constr0[ bytes28 ]                  -- key hash
//!             | Constr1[ bytes28 ]                  -- script hash
//! MaybeStake  = Constr1[]                           -- no stake credential
//!             | Constr0[ Constr0[ PaymentCred ] ]   -- Just (StakingHash cred)
//! ```
//!
//! Decoding walks this shape and stops at the first field that does not
//! match; nothing is defaulted or skipped.

use serde::{Deserialize, Serialize};
use treasury_core::{Address, Credential, Hash28, NetworkId, PlutusData, HASH28_LEN};

use crate::error::{Result, TreasuryError};

/// State persisted alongside the locked funds
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreasuryState {
    /// Destination of every disbursement
    pub receiver: Address,
    /// Authorized approvers, in creation order
    pub owners: Vec<Address>,
    /// Owners who approved the pending disbursement
    pub signers: Vec<Address>,
}

impl TreasuryState {
    /// Fresh state with no signatures; owners must be non-empty and distinct
    pub fn new(receiver: Address, owners: Vec<Address>) -> Result<Self> {
        if owners.is_empty() {
            return Err(TreasuryError::EmptyOwners);
        }
        for (i, owner) in owners.iter().enumerate() {
            if owners[..i].iter().any(|o| same_party(o, owner)) {
                return Err(TreasuryError::DuplicateOwner(owner.to_string()));
            }
        }
        Ok(Self {
            receiver,
            owners,
            signers: Vec::new(),
        })
    }

    /// The owner entry matching `party`'s payment credential
    pub fn owner(&self, party: &Address) -> Option<&Address> {
        self.owners.iter().find(|o| same_party(o, party))
    }

    pub fn has_signed(&self, party: &Address) -> bool {
        self.signers.iter().any(|s| same_party(s, party))
    }

    /// Check a decoded state: owners non-empty, `signers ⊆ owners`, no repeated signer
    pub fn validate(&self) -> Result<()> {
        if self.owners.is_empty() {
            return Err(TreasuryError::InvalidRecord("record has no owners".to_string()));
        }
        for (i, signer) in self.signers.iter().enumerate() {
            if self.owner(signer).is_none() {
                return Err(TreasuryError::InvalidRecord(format!(
                    "signer {} is not an owner",
                    signer
                )));
            }
            if self.signers[..i].iter().any(|p| same_party(p, signer)) {
                return Err(TreasuryError::InvalidRecord(format!(
                    "signer {} appears more than once",
                    signer
                )));
            }
        }
        Ok(())
    }
}

/// Two addresses belong to the same party when their payment credentials match
pub fn same_party(a: &Address, b: &Address) -> bool {
    a.payment() == b.payment()
}

// ---------------------------------------------------------------------------
// Encoding
// ---------------------------------------------------------------------------

fn encode_credential(credential: &Credential) -> PlutusData {
    match credential {
        Credential::Key(h) => PlutusData::constr(0, vec![PlutusData::bytes(h.as_bytes().to_vec())]),
        Credential::Script(h) => {
            PlutusData::constr(1, vec![PlutusData::bytes(h.as_bytes().to_vec())])
        }
    }
}

pub fn encode_address(address: &Address) -> PlutusData {
    let stake = match address.stake() {
        Some(credential) => PlutusData::constr(
            0,
            vec![PlutusData::constr(0, vec![encode_credential(credential)])],
        ),
        None => PlutusData::constr(1, vec![]),
    };
    PlutusData::constr(0, vec![encode_credential(address.payment()), stake])
}

/// Encode the state into the validator's datum shape
pub fn encode(state: &TreasuryState) -> PlutusData {
    PlutusData::constr(
        0,
        vec![
            encode_address(&state.receiver),
            PlutusData::List(state.owners.iter().map(encode_address).collect()),
            PlutusData::List(state.signers.iter().map(encode_address).collect()),
        ],
    )
}

/// Encode as inline datum CBOR hex
pub fn encode_inline(state: &TreasuryState) -> String {
    encode(state).to_cbor_hex()
}

// ---------------------------------------------------------------------------
// Decoding
// ---------------------------------------------------------------------------

fn constr_fields<'a>(
    data: &'a PlutusData,
    field: &str,
    tag: u64,
    arity: usize,
) -> Result<&'a [PlutusData]> {
    match data {
        PlutusData::Constr { tag: t, fields } if *t == tag && fields.len() == arity => Ok(fields),
        PlutusData::Constr { tag: t, fields } => Err(TreasuryError::datum(
            field,
            format!(
                "expected constructor {} with {} fields, got constructor {} with {}",
                tag,
                arity,
                t,
                fields.len()
            ),
        )),
        other => Err(TreasuryError::datum(
            field,
            format!("expected constructor {}, got {}", tag, other.kind()),
        )),
    }
}

fn list_items<'a>(data: &'a PlutusData, field: &str) -> Result<&'a [PlutusData]> {
    match data {
        PlutusData::List(items) => Ok(items),
        other => Err(TreasuryError::datum(
            field,
            format!("expected list, got {}", other.kind()),
        )),
    }
}

fn hash28(data: &PlutusData, field: &str) -> Result<Hash28> {
    match data {
        PlutusData::Bytes(bytes) if bytes.len() == HASH28_LEN => {
            Hash28::from_slice(bytes).map_err(|e| TreasuryError::datum(field, e.to_string()))
        }
        PlutusData::Bytes(bytes) => Err(TreasuryError::datum(
            field,
            format!("expected {} bytes, got {}", HASH28_LEN, bytes.len()),
        )),
        other => Err(TreasuryError::datum(
            field,
            format!("expected bytes, got {}", other.kind()),
        )),
    }
}

fn decode_credential(data: &PlutusData, field: &str) -> Result<Credential> {
    match data {
        PlutusData::Constr { tag: 0, .. } => {
            let fields = constr_fields(data, field, 0, 1)?;
            Ok(Credential::Key(hash28(&fields[0], field)?))
        }
        PlutusData::Constr { tag: 1, .. } => {
            let fields = constr_fields(data, field, 1, 1)?;
            Ok(Credential::Script(hash28(&fields[0], field)?))
        }
        PlutusData::Constr { tag, .. } => Err(TreasuryError::datum(
            field,
            format!("unknown credential constructor {}", tag),
        )),
        other => Err(TreasuryError::datum(
            field,
            format!("expected credential constructor, got {}", other.kind()),
        )),
    }
}

fn decode_stake(data: &PlutusData, field: &str) -> Result<Option<Credential>> {
    match data {
        PlutusData::Constr { tag: 1, fields } if fields.is_empty() => Ok(None),
        PlutusData::Constr { tag: 0, .. } => {
            let just = constr_fields(data, field, 0, 1)?;
            match &just[0] {
                PlutusData::Constr { tag: 0, .. } => {
                    let staking_hash = constr_fields(&just[0], field, 0, 1)?;
                    Ok(Some(decode_credential(&staking_hash[0], field)?))
                }
                PlutusData::Constr { tag: 1, .. } => Err(TreasuryError::datum(
                    field,
                    "stake pointers are not supported",
                )),
                other => Err(TreasuryError::datum(
                    field,
                    format!("expected staking credential, got {}", other.kind()),
                )),
            }
        }
        other => Err(TreasuryError::datum(
            field,
            format!("expected optional stake credential, got {}", other),
        )),
    }
}

/// Decode one address node; `field` names it in errors
pub fn decode_address(data: &PlutusData, field: &str, network: NetworkId) -> Result<Address> {
    let fields = constr_fields(data, field, 0, 2)?;
    let payment = decode_credential(&fields[0], &format!("{}.payment", field))?;
    let stake = decode_stake(&fields[1], &format!("{}.stake", field))?;
    Ok(Address::new(network, payment, stake))
}

fn decode_address_list(
    data: &PlutusData,
    field: &str,
    network: NetworkId,
) -> Result<Vec<Address>> {
    list_items(data, field)?
        .iter()
        .enumerate()
        .map(|(i, item)| decode_address(item, &format!("{}[{}]", field, i), network))
        .collect()
}

/// Decode the validator's datum shape into a state
///
/// Datums carry no network tag, so addresses are rebuilt for `network`.
pub fn decode(raw: &PlutusData, network: NetworkId) -> Result<TreasuryState> {
    let fields = constr_fields(raw, "datum", 0, 3)?;
    Ok(TreasuryState {
        receiver: decode_address(&fields[0], "receiver", network)?,
        owners: decode_address_list(&fields[1], "owners", network)?,
        signers: decode_address_list(&fields[2], "signers", network)?,
    })
}

/// Decode an inline datum given as CBOR hex
pub fn decode_inline(cbor_hex: &str, network: NetworkId) -> Result<TreasuryState> {
    let data = PlutusData::from_cbor_hex(cbor_hex)
        .map_err(|e| TreasuryError::datum("datum", e.to_string()))?;
    decode(&data, network)
}

#[cfg(test)]
mod tests {
    use super::*;
    use treasury_core::encode_credential as key_address;

    fn addr(payment: u8, stake: Option<u8>) -> Address {
        let stake = stake.map(|s| [s; 28]);
        key_address(NetworkId::Testnet, &[payment; 28], stake.as_ref().map(|s| &s[..])).unwrap()
    }

    fn state(owners: usize, signers: usize) -> TreasuryState {
        let owners: Vec<Address> = (0..owners)
            .map(|i| addr(10 + i as u8, if i % 2 == 0 { Some(90) } else { None }))
            .collect();
        let signers = owners.iter().take(signers).cloned().collect();
        TreasuryState {
            receiver: addr(1, Some(2)),
            owners,
            signers,
        }
    }

    #[test]
    fn test_round_trip_various_sizes() {
        for (owners, signers) in [(0, 0), (1, 0), (1, 1), (3, 2), (5, 5)] {
            let s = state(owners, signers);
            assert_eq!(decode(&encode(&s), NetworkId::Testnet).unwrap(), s);
            assert_eq!(
                decode_inline(&encode_inline(&s), NetworkId::Testnet).unwrap(),
                s
            );
        }
    }

    #[test]
    fn test_round_trip_without_stake_and_with_script_receiver() {
        let s = TreasuryState {
            receiver: Address::script(NetworkId::Testnet, Hash28::new([7; 28])),
            owners: vec![addr(3, None)],
            signers: vec![],
        };
        assert_eq!(decode(&encode(&s), NetworkId::Testnet).unwrap(), s);
    }

    #[test]
    fn test_empty_lists_encode_as_lists() {
        let s = state(0, 0);
        match encode(&s) {
            PlutusData::Constr { tag: 0, fields } => {
                assert_eq!(fields[1], PlutusData::List(vec![]));
                assert_eq!(fields[2], PlutusData::List(vec![]));
            }
            other => panic!("unexpected datum {}", other),
        }
    }

    #[test]
    fn test_encoding_matches_validator_paths() {
        let s = state(1, 0);
        let data = encode(&s);
        // receiver payment hash at fields[0].fields[0].fields[0]
        let PlutusData::Constr { fields, .. } = &data else { panic!() };
        let PlutusData::Constr { fields: receiver, .. } = &fields[0] else { panic!() };
        let PlutusData::Constr { fields: payment, .. } = &receiver[0] else { panic!() };
        assert_eq!(payment[0], PlutusData::bytes(vec![1; 28]));
        // receiver stake hash at fields[0].fields[1].fields[0].fields[0].fields[0]
        let PlutusData::Constr { fields: just, .. } = &receiver[1] else { panic!() };
        let PlutusData::Constr { fields: staking, .. } = &just[0] else { panic!() };
        let PlutusData::Constr { fields: cred, .. } = &staking[0] else { panic!() };
        assert_eq!(cred[0], PlutusData::bytes(vec![2; 28]));
    }

    #[test]
    fn test_missing_receiver_payment() {
        let data = PlutusData::constr(
            0,
            vec![
                PlutusData::constr(0, vec![PlutusData::constr(0, vec![]), PlutusData::constr(1, vec![])]),
                PlutusData::List(vec![]),
                PlutusData::List(vec![]),
            ],
        );
        match decode(&data, NetworkId::Testnet) {
            Err(TreasuryError::DatumDecode { field, .. }) => assert_eq!(field, "receiver.payment"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_wrong_stake_length_aborts() {
        let mut s = encode(&state(2, 0));
        if let PlutusData::Constr { fields, .. } = &mut s {
            if let PlutusData::List(owners) = &mut fields[1] {
                owners[0] = PlutusData::constr(
                    0,
                    vec![
                        PlutusData::constr(0, vec![PlutusData::bytes(vec![1; 28])]),
                        PlutusData::constr(
                            0,
                            vec![PlutusData::constr(
                                0,
                                vec![PlutusData::constr(0, vec![PlutusData::bytes(vec![1; 27])])],
                            )],
                        ),
                    ],
                );
            }
        }
        match decode(&s, NetworkId::Testnet) {
            Err(TreasuryError::DatumDecode { field, reason }) => {
                assert_eq!(field, "owners[0].stake");
                assert!(reason.contains("27"));
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_malformed_signer_is_not_dropped() {
        let mut s = encode(&state(2, 2));
        if let PlutusData::Constr { fields, .. } = &mut s {
            if let PlutusData::List(signers) = &mut fields[2] {
                signers[1] = PlutusData::int(5);
            }
        }
        match decode(&s, NetworkId::Testnet) {
            Err(TreasuryError::DatumDecode { field, .. }) => assert_eq!(field, "signers[1]"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_owners_must_be_list() {
        let data = PlutusData::constr(
            0,
            vec![
                encode_address(&addr(1, None)),
                PlutusData::Map(vec![]),
                PlutusData::List(vec![]),
            ],
        );
        match decode(&data, NetworkId::Testnet) {
            Err(TreasuryError::DatumDecode { field, reason }) => {
                assert_eq!(field, "owners");
                assert_eq!(reason, "expected list, got map");
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_new_state_invariants() {
        assert!(matches!(
            TreasuryState::new(addr(1, None), vec![]),
            Err(TreasuryError::EmptyOwners)
        ));
        // same payment key with a different stake part is the same owner
        assert!(matches!(
            TreasuryState::new(addr(1, None), vec![addr(5, None), addr(5, Some(6))]),
            Err(TreasuryError::DuplicateOwner(_))
        ));

        let s = TreasuryState::new(addr(1, None), vec![addr(5, None), addr(6, None)]).unwrap();
        assert!(s.signers.is_empty());
        assert!(s.owner(&addr(5, Some(9))).is_some());
        assert!(s.validate().is_ok());
    }

    #[test]
    fn test_validate_state() {
        let mut s = state(2, 1);
        assert!(s.validate().is_ok());
        s.signers.push(s.signers[0].clone());
        assert!(matches!(s.validate(), Err(TreasuryError::InvalidRecord(_))));
        let mut s = state(2, 0);
        s.signers.push(addr(200, None));
        assert!(matches!(s.validate(), Err(TreasuryError::InvalidRecord(_))));
        let mut s = state(2, 0);
        s.owners.clear();
        assert!(matches!(s.validate(), Err(TreasuryError::InvalidRecord(_))));
    }
}
