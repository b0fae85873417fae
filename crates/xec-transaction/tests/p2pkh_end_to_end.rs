//! Fund a P2PKH output, spend it, and verify the spend through the
//! script engine.

use xec_primitives::ec::PrivateKey;
use xec_script::interpreter::{Config, PrevOutputs, ScriptEngine};
use xec_script::{Address, Network, Script};
use xec_transaction::sighash::SIGHASH_ALL_FORKID;
use xec_transaction::template::{p2pkh, UnlockingScriptTemplate};
use xec_transaction::{Transaction, TransactionOutput};

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

struct Spend {
    key_address: Address,
    funding: Transaction,
    spending: Transaction,
}

fn build_spend() -> Spend {
    let key = PrivateKey::from_bytes(&[0x2a; 32]).unwrap();
    let key_address = Address::from_public_key_hash(&key.pub_key().hash160(), Network::Mainnet);

    let mut funding = Transaction::new();
    funding.add_output(TransactionOutput {
        satoshis: 10_000,
        locking_script: p2pkh::lock(&key_address),
    });

    let payee = Address::from_public_key_hash(&[0x77; 20], Network::Mainnet);
    let mut spending = Transaction::new();
    spending
        .add_input_from(
            &funding.tx_id_hex(),
            0,
            &funding.outputs[0].locking_script_hex(),
            10_000,
        )
        .unwrap();
    spending.add_output(TransactionOutput {
        satoshis: 9_000,
        locking_script: p2pkh::lock(&payee),
    });

    let unlocking = p2pkh::unlock(key, None).sign(&spending, 0).unwrap();
    spending.inputs[0].unlocking_script = Some(unlocking);

    Spend {
        key_address,
        funding,
        spending,
    }
}

#[test]
fn valid_spend_verifies() {
    init_tracing();
    let spend = build_spend();
    let table = spend.funding.index_outputs();

    assert!(spend.spending.verify_input(0, &table).unwrap());
    assert!(spend
        .spending
        .verify_input_with_config(0, &table, Config::standard())
        .unwrap());
}

#[test]
fn engine_reports_hash_based_address() {
    let spend = build_spend();
    let input = &spend.spending.inputs[0];
    let locking = &spend.funding.outputs[0].locking_script;

    // The signature (71-72 bytes) and compressed key (33 bytes) do not
    // qualify, so the 20-byte hash in the locking script is the first hit.
    let engine = ScriptEngine::parse(input.unlocking_script_bytes(), locking.to_bytes()).unwrap();
    assert_eq!(engine.address(), spend.key_address.to_string());
    assert_eq!(engine.ops().len(), 7);

    let asm = engine.to_string();
    assert!(asm.ends_with("OP_EQUALVERIFY OP_CHECKSIG"), "{}", asm);
}

#[test]
fn uncompressed_key_push_wins_the_address() {
    let key = PrivateKey::from_bytes(&[0x2b; 32]).unwrap();
    let uncompressed = key.pub_key().to_uncompressed();

    let mut unlocking = Script::new();
    unlocking.append_push_data(&[0x30; 71]).unwrap();
    unlocking.append_push_data(&uncompressed).unwrap();
    let locking = p2pkh::lock(&Address::from_public_key_hash(&[0x01; 20], Network::Mainnet));

    let engine = ScriptEngine::parse(unlocking.to_bytes(), locking.to_bytes()).unwrap();
    assert_eq!(
        engine.address(),
        Address::from_public_key_bytes(&uncompressed, Network::Mainnet).to_string()
    );
}

#[test]
fn flipped_signature_byte_is_rejected() {
    init_tracing();
    let mut spend = build_spend();
    let table = spend.funding.index_outputs();

    let mut bytes = spend.spending.inputs[0].unlocking_script_bytes().to_vec();
    let sig_len = bytes[0] as usize;
    // Last byte of S, just before the sighash byte.
    bytes[sig_len - 1] ^= 0x01;
    spend.spending.inputs[0].unlocking_script = Some(Script::from_bytes(&bytes));

    assert!(!spend.spending.verify_input(0, &table).unwrap());
}

#[test]
fn spend_of_unknown_output_is_an_error() {
    let spend = build_spend();
    assert!(spend.spending.verify_input(0, &PrevOutputs::new()).is_err());
}

#[test]
fn one_engine_many_threads() {
    let spend = build_spend();
    let table = spend.funding.index_outputs();
    let input = &spend.spending.inputs[0];
    let engine = ScriptEngine::parse(
        input.unlocking_script_bytes(),
        spend.funding.outputs[0].locking_script.to_bytes(),
    )
    .unwrap();

    // A second transaction whose digest does not match the signature.
    let mut tampered = spend.spending.clone();
    tampered.outputs[0].satoshis = 1;

    std::thread::scope(|s| {
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let tx = if i % 2 == 0 { &spend.spending } else { &tampered };
                let (engine, table) = (&engine, &table);
                s.spawn(move || (i, engine.execute(tx, 0, table)))
            })
            .collect();
        for handle in handles {
            let (i, valid) = handle.join().unwrap();
            assert_eq!(valid, i % 2 == 0, "thread {}", i);
        }
    });
}

#[test]
fn sighash_byte_is_appended() {
    let spend = build_spend();
    let bytes = spend.spending.inputs[0].unlocking_script_bytes();
    let sig_len = bytes[0] as usize;
    assert_eq!(bytes[sig_len] as u32, SIGHASH_ALL_FORKID);
}
