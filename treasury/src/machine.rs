//! Treasury state machine
//!
//! Every operation is a pure function of the treasury instance, the caller's
//! wallet context and the current record (if any). Nothing here touches the
//! ledger; the returned [`TransactionPlan`] describes the transition and the
//! ledger decides whether it lands.
//!
//! ```text
//! NotExist --init/deposit(bootstrap)--> Open
//! Open --deposit | sign | partial execute--> Open
//! Open --full execute | end--> Closed (token burned)
//! ```

use treasury_core::{Address, NetworkId, Utxo, Value};

use crate::datum::{self, TreasuryState};
use crate::error::{Result, TreasuryError};
use crate::identity::TreasuryInstance;
use crate::plan::{
    MintEntry, MintRedeemer, PlanKind, PlannedOutput, ScriptInput, SpendRedeemer,
    TransactionPlan,
};

/// The caller's side of a transaction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TxContext {
    pub wallet_utxos: Vec<Utxo>,
    pub change_address: Address,
    pub collateral: Utxo,
    pub network: NetworkId,
}

/// Terms for creating a treasury from a deposit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bootstrap {
    pub receiver: Address,
    pub owners: Vec<Address>,
}

/// The current treasury record, decoded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreasurySnapshot {
    pub utxo: Utxo,
    pub state: TreasuryState,
    /// Lovelace locked in the record
    pub balance: u64,
}

impl TreasurySnapshot {
    /// Decode a fetched record
    ///
    /// The record must hold exactly one identity token and an inline datum whose
    /// signers are distinct owners; approvals are counted from it as-is.
    pub fn from_utxo(utxo: Utxo, instance: &TreasuryInstance) -> Result<Self> {
        let tokens = utxo.output.amount.quantity_of(&instance.unit());
        if tokens != 1 {
            return Err(TreasuryError::InvalidRecord(format!(
                "{} holds {} identity tokens",
                utxo.input, tokens
            )));
        }
        let raw = utxo.output.plutus_data.as_deref().ok_or_else(|| {
            TreasuryError::InvalidRecord(format!("{} has no inline datum", utxo.input))
        })?;
        let state = datum::decode_inline(raw, instance.identity.network())?;
        state.validate()?;
        let balance = utxo.output.amount.lovelace();
        Ok(Self {
            utxo,
            state,
            balance,
        })
    }
}

fn require_open<'a>(
    current: Option<&'a TreasurySnapshot>,
    instance: &TreasuryInstance,
) -> Result<&'a TreasurySnapshot> {
    current.ok_or_else(|| TreasuryError::TreasuryNotFound(instance.label()))
}

fn require_positive(amount: u64) -> Result<()> {
    if amount == 0 {
        return Err(TreasuryError::InvalidAmount(
            "amount must be greater than zero".to_string(),
        ));
    }
    Ok(())
}

fn spend(
    snapshot: &TreasurySnapshot,
    instance: &TreasuryInstance,
    redeemer: SpendRedeemer,
) -> ScriptInput {
    ScriptInput {
        utxo: snapshot.utxo.clone(),
        redeemer,
        script: instance.identity.spend_script().clone(),
    }
}

fn record_output(
    instance: &TreasuryInstance,
    value: Value,
    state: &TreasuryState,
) -> PlannedOutput {
    PlannedOutput {
        address: instance.identity.spend_address().clone(),
        value,
        datum: Some(datum::encode(state)),
    }
}

fn mint_entry(instance: &TreasuryInstance, quantity: i64, redeemer: MintRedeemer) -> MintEntry {
    MintEntry {
        policy_id: *instance.identity.policy_id(),
        name: instance.name.clone(),
        quantity,
        redeemer,
        script: instance.identity.mint_script().clone(),
    }
}

fn payout(receiver: &Address, amount: u64) -> PlannedOutput {
    PlannedOutput {
        address: receiver.clone(),
        value: Value::from_lovelace(amount),
        datum: None,
    }
}

fn empty_plan(kind: PlanKind, ctx: &TxContext) -> TransactionPlan {
    TransactionPlan {
        kind,
        script_inputs: Vec::new(),
        outputs: Vec::new(),
        mints: Vec::new(),
        required_signer: None,
        collateral: ctx.collateral.clone(),
        wallet_utxos: ctx.wallet_utxos.clone(),
        change_address: ctx.change_address.clone(),
        network: ctx.network,
        new_state: None,
    }
}

/// Create the treasury: mint its token and lock `amount` with an empty signer list
pub fn init(
    instance: &TreasuryInstance,
    ctx: &TxContext,
    current: Option<&TreasurySnapshot>,
    receiver: Address,
    owners: Vec<Address>,
    amount: u64,
) -> Result<TransactionPlan> {
    if current.is_some() {
        return Err(TreasuryError::AlreadyExists(instance.label()));
    }
    require_positive(amount)?;
    let state = TreasuryState::new(receiver, owners)?;

    let value = Value::from_lovelace(amount).with(instance.unit(), 1);
    let mut plan = empty_plan(PlanKind::Init, ctx);
    plan.mints.push(mint_entry(instance, 1, MintRedeemer::Mint));
    plan.outputs.push(record_output(instance, value, &state));
    plan.new_state = Some(state);
    Ok(plan)
}

/// Top up an open treasury, or create it when bootstrap terms are given
pub fn deposit(
    instance: &TreasuryInstance,
    ctx: &TxContext,
    current: Option<&TreasurySnapshot>,
    amount: u64,
    bootstrap: Option<Bootstrap>,
) -> Result<TransactionPlan> {
    let snapshot = match (current, bootstrap) {
        (Some(snapshot), _) => snapshot,
        (None, Some(terms)) => {
            return init(instance, ctx, None, terms.receiver, terms.owners, amount);
        }
        (None, None) => return Err(TreasuryError::TreasuryNotFound(instance.label())),
    };
    require_positive(amount)?;
    let balance = snapshot
        .balance
        .checked_add(amount)
        .ok_or_else(|| TreasuryError::InvalidAmount(format!("deposit of {} overflows", amount)))?;

    let value = snapshot.utxo.output.amount.clone().with_lovelace(balance);
    let mut plan = empty_plan(PlanKind::Deposit, ctx);
    plan.script_inputs
        .push(spend(snapshot, instance, SpendRedeemer::Deposit));
    plan.outputs
        .push(record_output(instance, value, &snapshot.state));
    plan.new_state = Some(snapshot.state.clone());
    Ok(plan)
}

/// Record `caller`'s approval of the pending disbursement
pub fn sign(
    instance: &TreasuryInstance,
    ctx: &TxContext,
    current: Option<&TreasurySnapshot>,
    caller: &Address,
) -> Result<TransactionPlan> {
    let snapshot = require_open(current, instance)?;
    let key_hash = *caller
        .payment_key_hash()
        .ok_or_else(|| TreasuryError::NoPaymentKey(caller.to_string()))?;
    let owner = snapshot
        .state
        .owner(caller)
        .ok_or_else(|| TreasuryError::NotAnOwner(caller.to_string()))?
        .clone();
    if snapshot.state.has_signed(caller) {
        return Err(TreasuryError::AlreadySigned(caller.to_string()));
    }

    let mut state = snapshot.state.clone();
    state.signers.push(owner);

    let mut plan = empty_plan(PlanKind::Sign, ctx);
    plan.script_inputs
        .push(spend(snapshot, instance, SpendRedeemer::Sign));
    plan.outputs.push(record_output(
        instance,
        snapshot.utxo.output.amount.clone(),
        &state,
    ));
    plan.required_signer = Some(key_hash);
    plan.new_state = Some(state);
    Ok(plan)
}

/// Pay `amount` to the receiver; paying the whole balance closes the treasury
pub fn execute(
    instance: &TreasuryInstance,
    ctx: &TxContext,
    current: Option<&TreasurySnapshot>,
    amount: u64,
) -> Result<TransactionPlan> {
    let snapshot = require_open(current, instance)?;
    require_positive(amount)?;
    if amount > snapshot.balance {
        return Err(TreasuryError::InsufficientBalance {
            requested: amount,
            available: snapshot.balance,
        });
    }
    let config = instance.config();
    let signers = snapshot.state.signers.len();
    if !config.execute_permitted(signers, amount) {
        return Err(TreasuryError::InsufficientApprovals {
            signers,
            threshold: config.threshold,
        });
    }

    let receiver = &snapshot.state.receiver;
    let mut plan = empty_plan(PlanKind::Execute, ctx);
    plan.script_inputs
        .push(spend(snapshot, instance, SpendRedeemer::Execute));

    if amount == snapshot.balance {
        plan.mints.push(mint_entry(instance, -1, MintRedeemer::Burn));
        plan.outputs.push(payout(receiver, amount));
        return Ok(plan);
    }

    let state = TreasuryState {
        receiver: receiver.clone(),
        owners: snapshot.state.owners.clone(),
        signers: Vec::new(),
    };
    let value = snapshot
        .utxo
        .output
        .amount
        .clone()
        .with_lovelace(snapshot.balance - amount);
    plan.outputs.push(record_output(instance, value, &state));
    plan.outputs.push(payout(receiver, amount));
    plan.new_state = Some(state);
    Ok(plan)
}

/// Close the treasury, paying the remaining balance to the receiver
pub fn end(
    instance: &TreasuryInstance,
    ctx: &TxContext,
    current: Option<&TreasurySnapshot>,
) -> Result<TransactionPlan> {
    let snapshot = require_open(current, instance)?;
    let config = instance.config();
    if snapshot.balance > config.allowance {
        return Err(TreasuryError::AllowanceExceeded {
            balance: snapshot.balance,
            allowance: config.allowance,
        });
    }
    let signers = snapshot.state.signers.len();
    if !config.end_permitted(signers, snapshot.balance) {
        return Err(TreasuryError::InsufficientApprovals {
            signers,
            threshold: config.threshold,
        });
    }

    let mut plan = empty_plan(PlanKind::End, ctx);
    plan.script_inputs
        .push(spend(snapshot, instance, SpendRedeemer::End));
    plan.mints.push(mint_entry(instance, -1, MintRedeemer::Burn));
    plan.outputs
        .push(payout(&snapshot.state.receiver, snapshot.balance));
    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AllowanceRule, TreasuryConfig};
    use crate::flat::{PlutusScript, PlutusVersion};
    use crate::identity::TreasuryIdentity;
    use treasury_core::{encode_credential, Hash28, OutPoint, TxOutput};

    fn party(byte: u8) -> Address {
        encode_credential(NetworkId::Testnet, &[byte; 28], None).unwrap()
    }

    fn instance_with(config: TreasuryConfig) -> TreasuryInstance {
        let mint = PlutusScript::from_cbor_hex(PlutusVersion::V3, "46010100200101").unwrap();
        let spend = PlutusScript::from_cbor_hex(PlutusVersion::V3, "46010100220021").unwrap();
        TreasuryIdentity::derive(config, &mint, &spend, NetworkId::Testnet)
            .unwrap()
            .instance("fund")
    }

    fn instance(threshold: u64, allowance: u64) -> TreasuryInstance {
        instance_with(TreasuryConfig::new(threshold, allowance).unwrap())
    }

    fn ctx() -> TxContext {
        let wallet = Utxo {
            input: OutPoint {
                tx_hash: "cc".repeat(32),
                output_index: 0,
            },
            output: TxOutput {
                address: party(0xee),
                amount: Value::from_lovelace(100_000_000),
                plutus_data: None,
            },
        };
        TxContext {
            wallet_utxos: vec![wallet.clone()],
            change_address: party(0xee),
            collateral: wallet,
            network: NetworkId::Testnet,
        }
    }

    /// Land a plan's record output as the new current record
    fn land(instance: &TreasuryInstance, plan: &TransactionPlan) -> Option<TreasurySnapshot> {
        let output = plan.record_output()?;
        let utxo = Utxo {
            input: OutPoint {
                tx_hash: "dd".repeat(32),
                output_index: 0,
            },
            output: TxOutput {
                address: output.address.clone(),
                amount: output.value.clone(),
                plutus_data: output.datum.as_ref().map(|d| d.to_cbor_hex()),
            },
        };
        Some(TreasurySnapshot::from_utxo(utxo, instance).unwrap())
    }

    fn open(instance: &TreasuryInstance, amount: u64, signers: &[u8]) -> TreasurySnapshot {
        let owners = vec![party(1), party(2), party(3)];
        let plan = init(instance, &ctx(), None, party(0xaa), owners, amount).unwrap();
        let mut snapshot = land(instance, &plan).unwrap();
        for s in signers {
            let plan = sign(instance, &ctx(), Some(&snapshot), &party(*s)).unwrap();
            snapshot = land(instance, &plan).unwrap();
        }
        snapshot
    }

    #[test]
    fn test_init_mints_token_and_locks_funds() {
        let instance = instance(2, 10_000_000);
        let owners = vec![party(1), party(2)];
        let plan = init(&instance, &ctx(), None, party(0xaa), owners, 3_000_000).unwrap();

        assert_eq!(plan.kind, PlanKind::Init);
        assert!(plan.script_inputs.is_empty());
        assert_eq!(plan.mints.len(), 1);
        assert_eq!(plan.mints[0].quantity, 1);
        assert_eq!(plan.mints[0].redeemer, MintRedeemer::Mint);

        let record = plan.record_output().unwrap();
        assert_eq!(&record.address, instance.identity.spend_address());
        assert_eq!(record.value.lovelace(), 3_000_000);
        assert_eq!(record.value.quantity_of(&instance.unit()), 1);

        let state = plan.new_state.unwrap();
        assert!(state.signers.is_empty());
        assert_eq!(state.owners, vec![party(1), party(2)]);
    }

    #[test]
    fn test_init_rejections() {
        let instance = instance(2, 10);
        let existing = open(&instance, 1_000_000, &[]);
        assert!(matches!(
            init(&instance, &ctx(), Some(&existing), party(0xaa), vec![party(1)], 1),
            Err(TreasuryError::AlreadyExists(_))
        ));
        assert!(matches!(
            init(&instance, &ctx(), None, party(0xaa), vec![], 1),
            Err(TreasuryError::EmptyOwners)
        ));
        assert!(matches!(
            init(&instance, &ctx(), None, party(0xaa), vec![party(1), party(1)], 1),
            Err(TreasuryError::DuplicateOwner(_))
        ));
        assert!(matches!(
            init(&instance, &ctx(), None, party(0xaa), vec![party(1)], 0),
            Err(TreasuryError::InvalidAmount(_))
        ));
    }

    #[test]
    fn test_deposit_tops_up() {
        let instance = instance(2, 10_000_000);
        let snapshot = open(&instance, 1_000_000, &[1]);
        let plan = deposit(&instance, &ctx(), Some(&snapshot), 4_000_000, None).unwrap();

        assert_eq!(plan.script_inputs[0].redeemer, SpendRedeemer::Deposit);
        assert!(plan.mints.is_empty());
        let after = land(&instance, &plan).unwrap();
        assert_eq!(after.balance, 5_000_000);
        assert_eq!(after.state, snapshot.state);
    }

    #[test]
    fn test_deposit_without_record() {
        let instance = instance(2, 10_000_000);
        assert!(matches!(
            deposit(&instance, &ctx(), None, 1_000_000, None),
            Err(TreasuryError::TreasuryNotFound(_))
        ));

        let bootstrap = Bootstrap {
            receiver: party(0xaa),
            owners: vec![party(1), party(2)],
        };
        let plan = deposit(&instance, &ctx(), None, 5_000_000, Some(bootstrap)).unwrap();
        assert_eq!(plan.kind, PlanKind::Init);
        assert_eq!(land(&instance, &plan).unwrap().balance, 5_000_000);
    }

    #[test]
    fn test_deposit_rejects_zero() {
        let instance = instance(2, 10_000_000);
        let snapshot = open(&instance, 1_000_000, &[]);
        assert!(matches!(
            deposit(&instance, &ctx(), Some(&snapshot), 0, None),
            Err(TreasuryError::InvalidAmount(_))
        ));
    }

    #[test]
    fn test_sign_appends_owner_once() {
        let instance = instance(2, 10_000_000);
        let snapshot = open(&instance, 1_000_000, &[]);
        let plan = sign(&instance, &ctx(), Some(&snapshot), &party(2)).unwrap();

        assert_eq!(plan.required_signer, Some(*party(2).payment_key_hash().unwrap()));
        assert_eq!(plan.record_output().unwrap().value, snapshot.utxo.output.amount);
        let after = land(&instance, &plan).unwrap();
        assert_eq!(after.state.signers, vec![party(2)]);
        assert!(after.state.validate().is_ok());

        assert!(matches!(
            sign(&instance, &ctx(), Some(&after), &party(2)),
            Err(TreasuryError::AlreadySigned(_))
        ));
    }

    #[test]
    fn test_sign_matches_owner_by_payment_key() {
        let instance = instance(2, 10_000_000);
        let snapshot = open(&instance, 1_000_000, &[]);
        // same payment key, different stake part
        let staked = encode_credential(NetworkId::Testnet, &[3; 28], Some(&[9; 28])).unwrap();
        let plan = sign(&instance, &ctx(), Some(&snapshot), &staked).unwrap();
        assert_eq!(plan.new_state.unwrap().signers, vec![party(3)]);
    }

    #[test]
    fn test_sign_requires_payment_key() {
        let instance = instance(1, 10_000_000);
        let script_owner = Address::script(NetworkId::Testnet, Hash28::new([4; 28]));
        let plan = init(
            &instance,
            &ctx(),
            None,
            party(0xaa),
            vec![party(1), script_owner.clone()],
            1_000_000,
        )
        .unwrap();
        let snapshot = land(&instance, &plan).unwrap();
        assert!(matches!(
            sign(&instance, &ctx(), Some(&snapshot), &script_owner),
            Err(TreasuryError::NoPaymentKey(_))
        ));
    }

    #[test]
    fn test_sign_rejects_non_owner() {
        let instance = instance(2, 10_000_000);
        let snapshot = open(&instance, 1_000_000, &[]);
        assert!(matches!(
            sign(&instance, &ctx(), Some(&snapshot), &party(7)),
            Err(TreasuryError::NotAnOwner(_))
        ));
        assert!(matches!(
            sign(&instance, &ctx(), None, &party(1)),
            Err(TreasuryError::TreasuryNotFound(_))
        ));
    }

    #[test]
    fn test_execute_requires_quorum() {
        let instance = instance(2, 10_000_000);
        let snapshot = open(&instance, 8_000_000, &[1]);
        match execute(&instance, &ctx(), Some(&snapshot), 5_000_000) {
            Err(TreasuryError::InsufficientApprovals { signers, threshold }) => {
                assert_eq!(signers, 1);
                assert_eq!(threshold, 2);
            }
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_partial_execute_resets_signers() {
        let instance = instance(2, 1_000_000);
        let snapshot = open(&instance, 10_000_000, &[1, 2]);
        let plan = execute(&instance, &ctx(), Some(&snapshot), 4_000_000).unwrap();

        assert!(plan.mints.is_empty());
        assert_eq!(plan.paid_to(&party(0xaa)), 4_000_000);
        let after = land(&instance, &plan).unwrap();
        assert_eq!(after.balance, 6_000_000);
        assert!(after.state.signers.is_empty());
        assert_eq!(after.state.owners, snapshot.state.owners);
    }

    #[test]
    fn test_full_execute_burns_token() {
        let instance = instance(2, 1_000_000);
        let snapshot = open(&instance, 10_000_000, &[1, 3]);
        let plan = execute(&instance, &ctx(), Some(&snapshot), 10_000_000).unwrap();

        assert!(plan.record_output().is_none());
        assert!(plan.new_state.is_none());
        assert_eq!(plan.mints[0].quantity, -1);
        assert_eq!(plan.mints[0].redeemer, MintRedeemer::Burn);
        assert_eq!(plan.paid_to(&party(0xaa)), 10_000_000);
    }

    #[test]
    fn test_execute_amount_checks() {
        let instance = instance(1, 1_000_000);
        let snapshot = open(&instance, 2_000_000, &[1]);
        assert!(matches!(
            execute(&instance, &ctx(), Some(&snapshot), 0),
            Err(TreasuryError::InvalidAmount(_))
        ));
        assert!(matches!(
            execute(&instance, &ctx(), Some(&snapshot), 2_000_001),
            Err(TreasuryError::InsufficientBalance {
                requested: 2_000_001,
                available: 2_000_000
            })
        ));
    }

    #[test]
    fn test_execute_allowance_rules() {
        // as deployed: above the allowance, no quorum needed
        let deployed = instance(2, 1_000_000);
        let snapshot = open(&deployed, 5_000_000, &[]);
        assert!(execute(&deployed, &ctx(), Some(&snapshot), 2_000_000).is_ok());
        assert!(execute(&deployed, &ctx(), Some(&snapshot), 1_000_000).is_err());

        let conventional = instance_with(
            TreasuryConfig::new(2, 1_000_000)
                .unwrap()
                .with_allowance_rule(AllowanceRule::QuorumAboveAllowance),
        );
        let snapshot = open(&conventional, 5_000_000, &[]);
        assert!(execute(&conventional, &ctx(), Some(&snapshot), 1_000_000).is_ok());
        assert!(execute(&conventional, &ctx(), Some(&snapshot), 2_000_000).is_err());
    }

    #[test]
    fn test_end() {
        let instance = instance(2, 5_000_000);
        let snapshot = open(&instance, 4_000_000, &[1, 2]);
        let plan = end(&instance, &ctx(), Some(&snapshot)).unwrap();
        assert_eq!(plan.script_inputs[0].redeemer, SpendRedeemer::End);
        assert_eq!(plan.mints[0].quantity, -1);
        assert_eq!(plan.paid_to(&party(0xaa)), 4_000_000);
        assert!(plan.new_state.is_none());
    }

    #[test]
    fn test_end_rejections() {
        let instance = instance(2, 5_000_000);
        let rich = open(&instance, 6_000_000, &[1, 2]);
        assert!(matches!(
            end(&instance, &ctx(), Some(&rich)),
            Err(TreasuryError::AllowanceExceeded {
                balance: 6_000_000,
                allowance: 5_000_000
            })
        ));
        let unsigned = open(&instance, 1_000_000, &[1]);
        assert!(matches!(
            end(&instance, &ctx(), Some(&unsigned)),
            Err(TreasuryError::InsufficientApprovals { .. })
        ));
        assert!(matches!(
            end(&instance, &ctx(), None),
            Err(TreasuryError::TreasuryNotFound(_))
        ));
    }

    #[test]
    fn test_snapshot_requires_token_and_datum() {
        let instance = instance(1, 1);
        let snapshot = open(&instance, 2_000_000, &[]);

        let mut no_datum = snapshot.utxo.clone();
        no_datum.output.plutus_data = None;
        assert!(matches!(
            TreasurySnapshot::from_utxo(no_datum, &instance),
            Err(TreasuryError::InvalidRecord(_))
        ));

        let mut no_token = snapshot.utxo.clone();
        no_token.output.amount = Value::from_lovelace(2_000_000);
        assert!(matches!(
            TreasurySnapshot::from_utxo(no_token, &instance),
            Err(TreasuryError::InvalidRecord(_))
        ));

        let mut garbage = snapshot.utxo;
        garbage.output.plutus_data = Some("d87980".to_string());
        assert!(matches!(
            TreasurySnapshot::from_utxo(garbage, &instance),
            Err(TreasuryError::DatumDecode { .. })
        ));
    }

    /// A record as another writer might have left it on the ledger
    fn record(instance: &TreasuryInstance, owners: Vec<Address>, signers: Vec<Address>) -> Utxo {
        let state = TreasuryState {
            receiver: party(0xaa),
            owners,
            signers,
        };
        Utxo {
            input: OutPoint {
                tx_hash: "ee".repeat(32),
                output_index: 0,
            },
            output: TxOutput {
                address: instance.identity.spend_address().clone(),
                amount: Value::from_lovelace(4_000_000).with(instance.unit(), 1),
                plutus_data: Some(datum::encode_inline(&state)),
            },
        }
    }

    #[test]
    fn test_snapshot_rejects_repeated_signer() {
        let instance = instance(2, 10_000_000);
        let utxo = record(&instance, vec![party(1), party(2)], vec![party(1), party(1)]);
        assert!(matches!(
            TreasurySnapshot::from_utxo(utxo, &instance),
            Err(TreasuryError::InvalidRecord(_))
        ));

        // same payment key under another stake part is still the same signer
        let staked = encode_credential(NetworkId::Testnet, &[1; 28], Some(&[9; 28])).unwrap();
        let utxo = record(&instance, vec![party(1), party(2)], vec![party(1), staked]);
        assert!(matches!(
            TreasurySnapshot::from_utxo(utxo, &instance),
            Err(TreasuryError::InvalidRecord(_))
        ));
    }

    #[test]
    fn test_snapshot_rejects_foreign_signers() {
        let instance = instance(2, 10_000_000);
        let utxo = record(&instance, vec![party(1)], vec![party(7), party(8)]);
        assert!(matches!(
            TreasurySnapshot::from_utxo(utxo, &instance),
            Err(TreasuryError::InvalidRecord(_))
        ));
    }

    #[test]
    fn test_snapshot_rejects_empty_owners() {
        let instance = instance(1, 10_000_000);
        let utxo = record(&instance, vec![], vec![]);
        assert!(matches!(
            TreasurySnapshot::from_utxo(utxo, &instance),
            Err(TreasuryError::InvalidRecord(_))
        ));
    }

    #[test]
    fn test_snapshot_accepts_valid_record() {
        let instance = instance(2, 10_000_000);
        let utxo = record(&instance, vec![party(1), party(2)], vec![party(2)]);
        let snapshot = TreasurySnapshot::from_utxo(utxo, &instance).unwrap();
        assert_eq!(snapshot.balance, 4_000_000);
        assert_eq!(snapshot.state.signers, vec![party(2)]);
    }

    #[test]
    fn test_plans_carry_wallet_context() {
        let instance = instance(1, 1);
        let snapshot = open(&instance, 2_000_000, &[]);
        let plan = sign(&instance, &ctx(), Some(&snapshot), &party(1)).unwrap();
        let ctx = ctx();
        assert_eq!(plan.collateral, ctx.collateral);
        assert_eq!(plan.wallet_utxos, ctx.wallet_utxos);
        assert_eq!(plan.change_address, ctx.change_address);
        assert_eq!(plan.script_inputs[0].script, *instance.identity.spend_script());
    }
}
