//! Script verification engine.
//!
//! A [`ScriptEngine`] is parsed once from an input's unlocking script and
//! the locking script it spends, then executed against a transaction. The
//! parsed engine is immutable; every execution builds its own
//! [`ScriptContext`], so one engine may be executed from many threads.
//!
//! Failures come through two channels. Bytes that cannot be decoded are a
//! [`ScriptError`] from [`ScriptEngine::parse`]. A program that decodes but
//! does not validate makes [`ScriptEngine::execute`] return `false`;
//! [`ScriptEngine::verify`] reports the same outcome with the reason.
//!
//! # Architecture
//!
//! The interpreter does not depend on the transaction crate. Callers supply
//! a [`TxContext`] that resolves the spent outpoint, computes signature
//! digests and exposes the lock time fields checked by the timelock ops,
//! and optionally a [`SignatureVerifier`].
//!
//! # Example
//!
//! ```ignore
//! use xec_script::interpreter::ScriptEngine;
//!
//! let engine = ScriptEngine::parse(&unlocking, &locking)?;
//! let valid = engine.execute(&tx, 0, &prev_outputs);
//! println!("{} -> {}", engine.address(), valid);
//! ```

use std::fmt;

pub mod config;
pub mod context;
pub mod error;
pub mod op;
pub mod parser;
pub mod scriptnum;
pub mod stack;
pub mod verifier;

mod ops_arithmetic;
mod ops_crypto;
mod ops_data;
mod ops_flow;
mod ops_stack;

pub use config::Config;
pub use context::{OutPoint, PrevOutput, PrevOutputs, ScriptContext};
pub use error::{InterpreterError, InterpreterErrorCode};
pub use op::Op;
pub use scriptnum::ScriptNumber;
pub use stack::Stack;
pub use verifier::{EcdsaVerifier, SignatureVerifier};

use crate::{Script, ScriptError};
use stack::as_bool;

/// The transaction side of signature checking.
pub trait TxContext {
    /// The outpoint spent by input `input_idx`, or `None` if there is no
    /// such input.
    fn outpoint(&self, input_idx: usize) -> Option<OutPoint>;

    /// Digest a signature with `sighash_type` must commit to.
    ///
    /// `script_code` and `satoshis` describe the previous output being
    /// spent. Unsupported sighash types are an error, which fails the
    /// checking op.
    fn signature_digest(
        &self,
        input_idx: usize,
        script_code: &Script,
        satoshis: u64,
        sighash_type: u32,
    ) -> Result<[u8; 32], InterpreterError>;

    /// The transaction's `nLockTime`.
    fn lock_time(&self) -> u32;

    fn tx_version(&self) -> u32;

    /// Sequence number of input `input_idx`, or `None` if there is no such
    /// input.
    fn input_sequence(&self, input_idx: usize) -> Option<u32>;
}

#[derive(Debug, Clone)]
pub struct ScriptEngine {
    ops: Vec<Op>,
    offsets: Vec<usize>,
    locking_start: usize,
    address: String,
    config: Config,
}

impl ScriptEngine {
    /// Parse with the default (unbounded, mainnet) configuration.
    pub fn parse(unlocking: &[u8], locking: &[u8]) -> Result<Self, ScriptError> {
        Self::parse_with_config(unlocking, locking, Config::default())
    }

    pub fn parse_with_config(
        unlocking: &[u8],
        locking: &[u8],
        config: Config,
    ) -> Result<Self, ScriptError> {
        let program = parser::parse(unlocking, locking, &config)?;
        Ok(ScriptEngine {
            ops: program.ops,
            offsets: program.offsets,
            locking_start: program.locking_start,
            address: program.address,
            config,
        })
    }

    pub fn ops(&self) -> &[Op] {
        &self.ops
    }

    /// Address derived while parsing; empty when no push qualified.
    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Validate input `input_idx` of `tx` with the default ECDSA verifier.
    pub fn execute(&self, tx: &dyn TxContext, input_idx: usize, prev_outputs: &PrevOutputs) -> bool {
        self.execute_with_verifier(tx, input_idx, prev_outputs, &EcdsaVerifier)
    }

    pub fn execute_with_verifier(
        &self,
        tx: &dyn TxContext,
        input_idx: usize,
        prev_outputs: &PrevOutputs,
        verifier: &dyn SignatureVerifier,
    ) -> bool {
        self.verify(tx, input_idx, prev_outputs, verifier).is_ok()
    }

    /// Like [`execute_with_verifier`](Self::execute_with_verifier), but
    /// reports why validation failed.
    pub fn verify(
        &self,
        tx: &dyn TxContext,
        input_idx: usize,
        prev_outputs: &PrevOutputs,
        verifier: &dyn SignatureVerifier,
    ) -> Result<(), InterpreterError> {
        let mut ctx = ScriptContext::new(tx, input_idx, prev_outputs, verifier, &self.config);
        let result = self.run_in(&mut ctx);
        tracing::trace!(input_idx, ok = result.is_ok(), "script executed");
        result
    }

    /// Run the program in a caller-built context, then apply the final
    /// checks. The first failing op stops the run.
    pub fn run_in(&self, ctx: &mut ScriptContext<'_>) -> Result<(), InterpreterError> {
        ctx.locking_start = self.locking_start;
        for (op, &offset) in self.ops.iter().zip(&self.offsets) {
            ctx.op_offset = offset;
            op.execute(ctx)?;
        }

        if !ctx.cond_stack.is_empty() {
            return Err(InterpreterError::new(
                InterpreterErrorCode::UnbalancedConditional,
                "end of script reached in conditional execution".to_string(),
            ));
        }

        let top = ctx.stack.peek(0).map_err(|_| {
            InterpreterError::new(
                InterpreterErrorCode::EmptyStack,
                "stack empty at end of script execution".to_string(),
            )
        })?;
        if !as_bool(top) {
            return Err(InterpreterError::new(
                InterpreterErrorCode::EvalFalse,
                "false stack entry at end of script execution".to_string(),
            ));
        }
        Ok(())
    }
}

/// ASM rendering of the parsed program.
impl fmt::Display for ScriptEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, op) in self.ops.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{}", op)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::address::{Address, Network};
    use crate::opcodes::*;
    use xec_primitives::ec::PrivateKey;
    use xec_primitives::hash::sha256;

    const SIGHASH_ALL_FORKID: u8 = 0x41;

    /// Single-input transaction with a toy digest over the spent output.
    struct MockTx {
        outpoint: OutPoint,
        lock_time: u32,
        version: u32,
        sequence: u32,
    }

    impl MockTx {
        fn new() -> Self {
            MockTx {
                outpoint: OutPoint::new([0xab; 32], 1),
                lock_time: 0,
                version: 1,
                sequence: 0xffff_ffff,
            }
        }

        fn locked(version: u32, lock_time: u32, sequence: u32) -> Self {
            MockTx {
                lock_time,
                version,
                sequence,
                ..Self::new()
            }
        }

        fn digest(script_code: &Script, satoshis: u64, sighash_type: u32) -> [u8; 32] {
            let mut preimage = script_code.to_bytes().to_vec();
            preimage.extend_from_slice(&satoshis.to_le_bytes());
            preimage.extend_from_slice(&sighash_type.to_le_bytes());
            sha256(&preimage)
        }
    }

    impl TxContext for MockTx {
        fn outpoint(&self, input_idx: usize) -> Option<OutPoint> {
            (input_idx == 0).then_some(self.outpoint)
        }

        fn signature_digest(
            &self,
            _input_idx: usize,
            script_code: &Script,
            satoshis: u64,
            sighash_type: u32,
        ) -> Result<[u8; 32], InterpreterError> {
            if sighash_type & 0x40 == 0 {
                return Err(InterpreterError::new(
                    InterpreterErrorCode::IllegalForkId,
                    "missing fork id".to_string(),
                ));
            }
            Ok(Self::digest(script_code, satoshis, sighash_type))
        }

        fn lock_time(&self) -> u32 {
            self.lock_time
        }

        fn tx_version(&self) -> u32 {
            self.version
        }

        fn input_sequence(&self, input_idx: usize) -> Option<u32> {
            (input_idx == 0).then_some(self.sequence)
        }
    }

    fn key(n: u8) -> PrivateKey {
        PrivateKey::from_bytes(&[n; 32]).unwrap()
    }

    fn sign(key: &PrivateKey, locking: &Script, satoshis: u64, sighash_type: u8) -> Vec<u8> {
        let digest = MockTx::digest(locking, satoshis, sighash_type as u32);
        let mut sig = key.sign(&digest).unwrap().to_der();
        sig.push(sighash_type);
        sig
    }

    fn prev_outputs(tx: &MockTx, locking: &Script, satoshis: u64) -> PrevOutputs {
        let mut prev = PrevOutputs::new();
        prev.insert(
            tx.outpoint,
            PrevOutput {
                locking_script: locking.clone(),
                satoshis,
            },
        );
        prev
    }

    fn run_with(bytes: &[u8], config: Config) -> Result<(), InterpreterError> {
        let engine = ScriptEngine::parse_with_config(bytes, &[], config).unwrap();
        let tx = MockTx::new();
        engine.verify(&tx, 0, &PrevOutputs::new(), &EcdsaVerifier)
    }

    fn run(bytes: &[u8]) -> Result<(), InterpreterError> {
        run_with(bytes, Config::default())
    }

    fn error_code(bytes: &[u8]) -> InterpreterErrorCode {
        run(bytes).unwrap_err().code
    }

    fn run_against(bytes: &[u8], tx: &MockTx) -> Result<(), InterpreterError> {
        let engine = ScriptEngine::parse(bytes, &[]).unwrap();
        engine.verify(tx, 0, &PrevOutputs::new(), &EcdsaVerifier)
    }

    enum Part<'a> {
        Code(u8),
        Push(&'a [u8]),
    }
    use Part::{Code, Push};

    /// Assemble a script; pushes get the shortest prefix.
    fn script(parts: &[Part]) -> Vec<u8> {
        let mut s = Script::new();
        for part in parts {
            match part {
                Code(op) => s.append_opcodes(&[*op]).unwrap(),
                Push(data) => s.append_push_data(data).unwrap(),
            }
        }
        s.to_bytes().to_vec()
    }

    #[test]
    fn test_empty_program_is_false() {
        let engine = ScriptEngine::parse(&[], &[]).unwrap();
        assert!(!engine.execute(&MockTx::new(), 0, &PrevOutputs::new()));
        assert_eq!(error_code(&[]), InterpreterErrorCode::EmptyStack);
    }

    #[test]
    fn test_final_truthiness() {
        assert!(run(&[OP_1]).is_ok());
        assert_eq!(error_code(&[OP_0]), InterpreterErrorCode::EvalFalse);
        // Negative zero is false.
        assert_eq!(error_code(&[0x01, 0x80]), InterpreterErrorCode::EvalFalse);
        assert_eq!(error_code(&[0x02, 0x00, 0x80]), InterpreterErrorCode::EvalFalse);
        assert!(run(&[0x02, 0x80, 0x00]).is_ok());
        // Only the top item matters.
        assert!(run(&[OP_0, OP_1]).is_ok());
    }

    #[test]
    fn test_failing_op_stops_execution() {
        let engine =
            ScriptEngine::parse(&[OP_1, OP_2, OP_0, OP_VERIFY, OP_3, OP_4], &[]).unwrap();
        let tx = MockTx::new();
        let prev = PrevOutputs::new();
        let config = Config::default();
        let mut ctx = ScriptContext::new(&tx, 0, &prev, &EcdsaVerifier, &config);

        let err = engine.run_in(&mut ctx).unwrap_err();
        assert_eq!(err.code, InterpreterErrorCode::Verify);
        assert_eq!(ctx.stack().items(), &[vec![1], vec![2]]);
        assert!(!engine.execute(&tx, 0, &prev));
    }

    #[test]
    fn test_op_execute_reports_outcome() {
        let tx = MockTx::new();
        let prev = PrevOutputs::new();
        let config = Config::default();
        let mut ctx = ScriptContext::new(&tx, 0, &prev, &EcdsaVerifier, &config);

        assert!(Op::Number(5).execute(&mut ctx).is_ok());
        assert!(Op::Dup.execute(&mut ctx).is_ok());
        assert!(Op::NumEqualVerify.execute(&mut ctx).is_ok());
        assert!(ctx.stack().is_empty());
        assert_eq!(
            Op::Drop.execute(&mut ctx).unwrap_err().code,
            InterpreterErrorCode::InvalidStackOperation
        );
        assert_eq!(
            Op::Return.execute(&mut ctx).unwrap_err().code,
            InterpreterErrorCode::EarlyReturn
        );
    }

    #[test]
    fn test_conditionals() {
        assert!(run(&[OP_1, OP_IF, OP_1, OP_ELSE, OP_0, OP_ENDIF]).is_ok());
        assert!(run(&[OP_0, OP_IF, OP_0, OP_ELSE, OP_1, OP_ENDIF]).is_ok());
        assert!(run(&[OP_0, OP_NOTIF, OP_1, OP_ENDIF]).is_ok());
        // Nested branch inside a skipped one stays skipped, even after ELSE.
        assert!(run(&[OP_1, OP_0, OP_IF, OP_0, OP_IF, OP_ELSE, OP_RETURN, OP_ENDIF, OP_ENDIF]).is_ok());
        // Skipped ops are not evaluated.
        assert!(run(&[OP_1, OP_0, OP_IF, OP_RETURN, OP_DROP, OP_ENDIF]).is_ok());

        assert_eq!(
            error_code(&[OP_1, OP_IF, OP_1]),
            InterpreterErrorCode::UnbalancedConditional
        );
        assert_eq!(error_code(&[OP_ELSE]), InterpreterErrorCode::UnbalancedConditional);
        assert_eq!(error_code(&[OP_1, OP_ENDIF]), InterpreterErrorCode::UnbalancedConditional);
        assert_eq!(error_code(&[OP_IF]), InterpreterErrorCode::InvalidStackOperation);
    }

    #[test]
    fn test_stack_ops() {
        assert!(run(&[OP_1, OP_2, OP_SWAP, OP_1, OP_EQUALVERIFY, OP_2, OP_EQUAL]).is_ok());
        assert!(run(&[OP_1, OP_2, OP_3, OP_ROT, OP_1, OP_EQUAL]).is_ok());
        assert!(run(&[OP_1, OP_2, OP_3, OP_2, OP_PICK, OP_1, OP_EQUAL]).is_ok());
        assert!(run(&[OP_1, OP_2, OP_3, OP_2, OP_ROLL, OP_DEPTH, OP_3, OP_EQUAL]).is_ok());
        assert!(run(&[OP_7, OP_TOALTSTACK, OP_0, OP_FROMALTSTACK, OP_7, OP_EQUAL]).is_ok());
        assert!(run(&[OP_1, OP_2, OP_NIP, OP_2, OP_EQUAL]).is_ok());
        assert!(run(&[OP_1, OP_2, OP_TUCK, OP_DEPTH, OP_3, OP_EQUAL]).is_ok());
        assert!(run(&[OP_0, OP_IFDUP, OP_DEPTH, OP_1, OP_EQUAL]).is_ok());
        assert!(run(&[OP_1, OP_2, OP_2DUP, OP_DEPTH, OP_4, OP_EQUAL]).is_ok());

        assert_eq!(error_code(&[OP_FROMALTSTACK]), InterpreterErrorCode::InvalidAltStackOperation);
        assert_eq!(error_code(&[OP_1, OP_1, OP_PICK]), InterpreterErrorCode::InvalidStackOperation);
        assert_eq!(error_code(&[OP_1, OP_1NEGATE, OP_ROLL]), InterpreterErrorCode::InvalidStackOperation);
        assert_eq!(error_code(&[OP_DUP]), InterpreterErrorCode::InvalidStackOperation);
    }

    #[test]
    fn test_arithmetic() {
        assert!(run(&[OP_2, OP_3, OP_ADD, OP_5, OP_NUMEQUAL]).is_ok());
        assert!(run(&[OP_2, OP_3, OP_SUB, OP_1NEGATE, OP_NUMEQUAL]).is_ok());
        assert!(run(&[OP_1NEGATE, OP_ABS, OP_1, OP_NUMEQUAL]).is_ok());
        assert!(run(&[OP_5, OP_NEGATE, OP_1ADD, OP_4, OP_NEGATE, OP_NUMEQUAL]).is_ok());
        assert!(run(&[OP_3, OP_5, OP_MIN, OP_3, OP_NUMEQUAL]).is_ok());
        assert!(run(&[OP_3, OP_2, OP_5, OP_WITHIN]).is_ok());
        assert_eq!(error_code(&[OP_5, OP_2, OP_5, OP_WITHIN]), InterpreterErrorCode::EvalFalse);
        assert!(run(&[OP_0, OP_NOT]).is_ok());
        assert!(run(&[OP_1, OP_0, OP_BOOLOR]).is_ok());
        assert_eq!(error_code(&[OP_1, OP_0, OP_BOOLAND]), InterpreterErrorCode::EvalFalse);

        // Truncating division, remainder takes the dividend's sign.
        let seven_neg = [0x01, 0x87];
        let mut div = seven_neg.to_vec();
        div.extend_from_slice(&[OP_2, OP_DIV, OP_3, OP_NEGATE, OP_NUMEQUAL]);
        assert!(run(&div).is_ok());
        let mut rem = seven_neg.to_vec();
        rem.extend_from_slice(&[OP_2, OP_MOD, OP_1NEGATE, OP_NUMEQUAL]);
        assert!(run(&rem).is_ok());
        assert_eq!(error_code(&[OP_1, OP_0, OP_DIV]), InterpreterErrorCode::DivideByZero);
        assert_eq!(error_code(&[OP_1, OP_0, OP_MOD]), InterpreterErrorCode::DivideByZero);

        // Operands wider than four bytes are rejected.
        assert_eq!(
            error_code(&[0x05, 0x01, 0x00, 0x00, 0x00, 0x00, OP_1ADD]),
            InterpreterErrorCode::NumberTooBig
        );
        // Results may be wider than an operand.
        assert!(run(&[0x04, 0xff, 0xff, 0xff, 0x7f, OP_1ADD, OP_SIZE, OP_5, OP_NUMEQUAL]).is_ok());
    }

    #[test]
    fn test_verify_variants() {
        assert_eq!(error_code(&[OP_1, OP_2, OP_EQUALVERIFY]), InterpreterErrorCode::EqualVerify);
        assert_eq!(error_code(&[OP_1, OP_2, OP_NUMEQUALVERIFY]), InterpreterErrorCode::NumEqualVerify);
        assert_eq!(error_code(&[OP_1, OP_RETURN]), InterpreterErrorCode::EarlyReturn);
        assert!(run(&[OP_NOP, OP_NOP1, OP_NOP10, OP_1]).is_ok());
    }

    #[test]
    fn test_splice_and_bitwise() {
        let cat = script(&[Push(b"ab"), Push(b"cd"), Code(OP_CAT), Push(b"abcd"), Code(OP_EQUAL)]);
        assert!(run(&cat).is_ok());

        let split = script(&[Push(b"abcd"), Code(OP_1), Code(OP_SPLIT), Push(b"bcd"), Code(OP_EQUALVERIFY), Push(b"a"), Code(OP_EQUAL)]);
        assert!(run(&split).is_ok());
        let split_end = script(&[Push(b"ab"), Code(OP_2), Code(OP_SPLIT), Code(OP_SIZE), Code(OP_0), Code(OP_NUMEQUALVERIFY), Code(OP_DROP), Push(b"ab"), Code(OP_EQUAL)]);
        assert!(run(&split_end).is_ok());
        let bad_split = script(&[Push(b"ab"), Code(OP_3), Code(OP_SPLIT)]);
        assert_eq!(run(&bad_split).unwrap_err().code, InterpreterErrorCode::InvalidSplitRange);

        let and = script(&[Push(&[0x0f, 0xf0]), Push(&[0xff, 0x11]), Code(OP_AND), Push(&[0x0f, 0x10]), Code(OP_EQUAL)]);
        assert!(run(&and).is_ok());
        let xor = script(&[Push(&[0x0f, 0xf0]), Push(&[0xff, 0x11]), Code(OP_XOR), Push(&[0xf0, 0xe1]), Code(OP_EQUAL)]);
        assert!(run(&xor).is_ok());
        let mismatch = script(&[Push(&[0x0f]), Push(&[0xff, 0x11]), Code(OP_OR)]);
        assert_eq!(run(&mismatch).unwrap_err().code, InterpreterErrorCode::InvalidOperandSize);

        let reverse = script(&[Push(&[0x01, 0x02, 0x03]), Code(OP_REVERSEBYTES), Push(&[0x03, 0x02, 0x01]), Code(OP_EQUAL)]);
        assert!(run(&reverse).is_ok());
    }

    #[test]
    fn test_num2bin_bin2num() {
        let pad = script(&[Code(OP_1NEGATE), Code(OP_4), Code(OP_NUM2BIN), Push(&[0x01, 0x00, 0x00, 0x80]), Code(OP_EQUAL)]);
        assert!(run(&pad).is_ok());
        let too_small = script(&[Push(&[0x00, 0x01]), Code(OP_1), Code(OP_NUM2BIN)]);
        assert_eq!(run(&too_small).unwrap_err().code, InterpreterErrorCode::ImpossibleEncoding);
        let back = script(&[Push(&[0x05, 0x00, 0x00, 0x80]), Code(OP_BIN2NUM), Push(&[0x85]), Code(OP_EQUAL)]);
        assert!(run(&back).is_ok());
        let wide = script(&[Push(&[0x01, 0x00, 0x00, 0x00, 0x01]), Code(OP_BIN2NUM)]);
        assert_eq!(run(&wide).unwrap_err().code, InterpreterErrorCode::InvalidNumberRange);
    }

    #[test]
    fn test_hashes() {
        let hash160 = script(&[
            Push(b""),
            Code(OP_HASH160),
            Push(&hex::decode("b472a266d0bd89c13706a4132ccfb16f7c3b9fcb").unwrap()),
            Code(OP_EQUAL),
        ]);
        assert!(run(&hash160).is_ok());
        let sha256 = script(&[
            Push(b"abc"),
            Code(OP_SHA256),
            Push(&hex::decode("ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad").unwrap()),
            Code(OP_EQUAL),
        ]);
        assert!(run(&sha256).is_ok());
    }

    #[test]
    fn test_limits() {
        let mut many = vec![OP_1];
        many.extend(std::iter::repeat(OP_NOP).take(202));
        assert!(run(&many).is_ok());
        assert_eq!(
            run_with(&many, Config::standard()).unwrap_err().code,
            InterpreterErrorCode::TooManyOperations
        );

        let mut deep = vec![OP_1; 1001];
        deep.push(OP_1);
        assert!(run(&deep).is_ok());
        assert_eq!(
            run_with(&deep, Config::standard()).unwrap_err().code,
            InterpreterErrorCode::StackOverflow
        );

        let non_minimal = [0x01, 0x05];
        assert!(run(&non_minimal).is_ok());
        assert_eq!(
            run_with(&non_minimal, Config::standard()).unwrap_err().code,
            InterpreterErrorCode::MinimalData
        );
    }

    #[test]
    fn test_display_asm() {
        let engine = ScriptEngine::parse(&[0x02, 0xab, 0xcd, OP_1NEGATE], &[OP_DUP, OP_CHECKSIG]).unwrap();
        assert_eq!(engine.to_string(), "abcd -1 OP_DUP OP_CHECKSIG");
    }

    #[test]
    fn test_p2pkh_checksig() {
        let key = key(0x11);
        let pub_key = key.pub_key().to_compressed();
        let address = Address::from_public_key_hash(&key.pub_key().hash160(), Network::Mainnet);
        let locking = Script::p2pkh(&address);
        let tx = MockTx::new();
        let prev = prev_outputs(&tx, &locking, 5_000);

        let sig = sign(&key, &locking, 5_000, SIGHASH_ALL_FORKID);
        let unlocking = script(&[Push(&sig), Push(&pub_key)]);
        let engine = ScriptEngine::parse(&unlocking, locking.to_bytes()).unwrap();
        assert_eq!(engine.address(), address.to_string());
        assert!(engine.execute(&tx, 0, &prev));

        // Corrupt the DER payload.
        let mut bad_sig = sig.clone();
        bad_sig[10] ^= 0x01;
        let engine = ScriptEngine::parse(&script(&[Push(&bad_sig), Push(&pub_key)]), locking.to_bytes()).unwrap();
        assert!(!engine.execute(&tx, 0, &prev));
        assert_eq!(
            engine.verify(&tx, 0, &prev, &EcdsaVerifier).unwrap_err().code,
            InterpreterErrorCode::EvalFalse
        );

        // Wrong amount changes the digest.
        let engine = ScriptEngine::parse(&unlocking, locking.to_bytes()).unwrap();
        assert!(!engine.execute(&tx, 0, &prev_outputs(&tx, &locking, 5_001)));

        assert_eq!(
            engine.verify(&tx, 0, &PrevOutputs::new(), &EcdsaVerifier).unwrap_err().code,
            InterpreterErrorCode::MissingPrevOutput
        );
        assert_eq!(
            engine.verify(&tx, 1, &prev, &EcdsaVerifier).unwrap_err().code,
            InterpreterErrorCode::InvalidIndex
        );
    }

    #[test]
    fn test_checksig_requires_forkid() {
        let key = key(0x12);
        let locking = Script::from_bytes(&script(&[Push(&key.pub_key().to_compressed()), Code(OP_CHECKSIG)]));
        let tx = MockTx::new();
        let prev = prev_outputs(&tx, &locking, 1);

        let sig = sign(&key, &locking, 1, 0x01);
        let engine = ScriptEngine::parse(&script(&[Push(&sig)]), locking.to_bytes()).unwrap();
        assert_eq!(
            engine.verify(&tx, 0, &prev, &EcdsaVerifier).unwrap_err().code,
            InterpreterErrorCode::IllegalForkId
        );
    }

    #[test]
    fn test_null_fail() {
        let key = key(0x13);
        let locking = Script::from_bytes(&script(&[Push(&key.pub_key().to_compressed()), Code(OP_CHECKSIG), Code(OP_NOT)]));
        let tx = MockTx::new();
        let prev = prev_outputs(&tx, &locking, 1);

        // An empty signature is an accepted way to fail a check.
        let empty = ScriptEngine::parse_with_config(&[OP_0], locking.to_bytes(), Config::standard()).unwrap();
        assert!(empty.execute(&tx, 0, &prev));

        let mut bad_sig = sign(&key, &locking, 2, SIGHASH_ALL_FORKID);
        bad_sig[8] ^= 0x01;
        let unlocking = script(&[Push(&bad_sig)]);
        let lax = ScriptEngine::parse(&unlocking, locking.to_bytes()).unwrap();
        assert!(lax.execute(&tx, 0, &prev));
        let strict = ScriptEngine::parse_with_config(&unlocking, locking.to_bytes(), Config::standard()).unwrap();
        assert_eq!(
            strict.verify(&tx, 0, &prev, &EcdsaVerifier).unwrap_err().code,
            InterpreterErrorCode::NullFail
        );
    }

    #[test]
    fn test_checkmultisig() {
        let keys = [key(0x21), key(0x22), key(0x23)];
        let pubs: Vec<[u8; 33]> = keys.iter().map(|k| k.pub_key().to_compressed()).collect();
        let locking = Script::from_bytes(&script(&[
            Code(OP_2),
            Push(&pubs[0]),
            Push(&pubs[1]),
            Push(&pubs[2]),
            Code(OP_3),
            Code(OP_CHECKMULTISIG),
        ]));
        let tx = MockTx::new();
        let prev = prev_outputs(&tx, &locking, 700);
        let sig0 = sign(&keys[0], &locking, 700, SIGHASH_ALL_FORKID);
        let sig2 = sign(&keys[2], &locking, 700, SIGHASH_ALL_FORKID);

        let good = ScriptEngine::parse(&script(&[Code(OP_0), Push(&sig0), Push(&sig2)]), locking.to_bytes()).unwrap();
        assert!(good.execute(&tx, 0, &prev));

        let out_of_order = ScriptEngine::parse(&script(&[Code(OP_0), Push(&sig2), Push(&sig0)]), locking.to_bytes()).unwrap();
        assert!(!out_of_order.execute(&tx, 0, &prev));

        let missing_dummy = ScriptEngine::parse(&script(&[Push(&sig0), Push(&sig2)]), locking.to_bytes()).unwrap();
        assert_eq!(
            missing_dummy.verify(&tx, 0, &prev, &EcdsaVerifier).unwrap_err().code,
            InterpreterErrorCode::InvalidStackOperation
        );

        let short_stack = script(&[Code(OP_0), Code(OP_2), Code(OP_1), Code(OP_CHECKMULTISIG)]);
        assert_eq!(run(&short_stack).unwrap_err().code, InterpreterErrorCode::InvalidStackOperation);
        let bad_sig_count = script(&[Code(OP_0), Code(OP_2), Push(&pubs[0]), Code(OP_1), Code(OP_CHECKMULTISIG)]);
        assert_eq!(run(&bad_sig_count).unwrap_err().code, InterpreterErrorCode::InvalidSignatureCount);
        let bad_key_count = script(&[Push(&[21]), Code(OP_CHECKMULTISIG)]);
        assert_eq!(run(&bad_key_count).unwrap_err().code, InterpreterErrorCode::InvalidPubKeyCount);

        // 0-of-0 succeeds without touching the transaction.
        assert!(run(&[OP_0, OP_0, OP_0, OP_CHECKMULTISIG]).is_ok());
    }

    #[test]
    fn test_checkdatasig() {
        let key = key(0x31);
        let message = b"oracle says yes";
        let sig = key.sign(&sha256(message)).unwrap().to_der();
        let pub_key = key.pub_key().to_compressed();

        assert!(run(&script(&[Push(&sig), Push(message), Push(&pub_key), Code(OP_CHECKDATASIG)])).is_ok());
        assert!(run(&script(&[Push(&sig), Push(message), Push(&pub_key), Code(OP_CHECKDATASIGVERIFY), Code(OP_1)])).is_ok());
        assert_eq!(
            run(&script(&[Push(&sig), Push(b"oracle says no"), Push(&pub_key), Code(OP_CHECKDATASIGVERIFY), Code(OP_1)]))
                .unwrap_err()
                .code,
            InterpreterErrorCode::CheckDataSigVerify
        );
    }

    fn num(n: i64) -> Vec<u8> {
        ScriptNumber::from(n).to_bytes()
    }

    #[test]
    fn test_check_lock_time_verify() {
        let cltv = |lock: i64| script(&[Push(&num(lock)), Code(OP_CHECKLOCKTIMEVERIFY)]);
        let height_locked = MockTx::locked(1, 1_000_000, 0xffff_fffe);

        // The operand stays on the stack.
        assert!(run_against(&cltv(1_000_000), &height_locked).is_ok());
        assert!(run_against(&cltv(999_999), &height_locked).is_ok());
        assert_eq!(
            run_against(&cltv(1_000_001), &height_locked).unwrap_err().code,
            InterpreterErrorCode::UnsatisfiedLockTime
        );
        // A time-based requirement cannot be met by a height-based lock.
        assert_eq!(
            run_against(&cltv(500_000_000), &height_locked).unwrap_err().code,
            InterpreterErrorCode::UnsatisfiedLockTime
        );
        // A final input disables the transaction's lock time.
        let finalized = MockTx::locked(1, 1_000_000, 0xffff_ffff);
        assert_eq!(
            run_against(&cltv(1), &finalized).unwrap_err().code,
            InterpreterErrorCode::UnsatisfiedLockTime
        );

        // Lock times past 2^31 need a five-byte operand.
        let time_locked = MockTx::locked(1, 4_000_000_000, 0);
        assert_eq!(num(4_000_000_000).len(), 5);
        assert!(run_against(&cltv(4_000_000_000), &time_locked).is_ok());

        assert_eq!(
            run_against(&[OP_1NEGATE, OP_CHECKLOCKTIMEVERIFY], &height_locked).unwrap_err().code,
            InterpreterErrorCode::NegativeLockTime
        );
        assert_eq!(
            run_against(&[OP_CHECKLOCKTIMEVERIFY], &height_locked).unwrap_err().code,
            InterpreterErrorCode::InvalidStackOperation
        );
    }

    #[test]
    fn test_check_sequence_verify() {
        let csv = |seq: i64| script(&[Push(&num(seq)), Code(OP_CHECKSEQUENCEVERIFY)]);
        let relative = MockTx::locked(2, 0, 10);

        assert!(run_against(&csv(10), &relative).is_ok());
        assert_eq!(
            run_against(&csv(11), &relative).unwrap_err().code,
            InterpreterErrorCode::UnsatisfiedLockTime
        );
        // Time-based operand against a height-based sequence.
        assert_eq!(
            run_against(&csv((1 << 22) | 10), &relative).unwrap_err().code,
            InterpreterErrorCode::UnsatisfiedLockTime
        );
        assert_eq!(
            run_against(&csv(10), &MockTx::locked(1, 0, 10)).unwrap_err().code,
            InterpreterErrorCode::UnsatisfiedLockTime
        );
        assert_eq!(
            run_against(&csv(10), &MockTx::locked(2, 0, (1 << 31) | 10)).unwrap_err().code,
            InterpreterErrorCode::UnsatisfiedLockTime
        );
        // An operand with the disable bit set passes regardless of the tx.
        assert!(run_against(&csv(1 << 31), &MockTx::locked(1, 0, 0xffff_ffff)).is_ok());
    }

    #[test]
    fn test_code_separator_moves_signed_script() {
        let key = key(0x14);
        let tail = script(&[Push(&key.pub_key().to_compressed()), Code(OP_CHECKSIG)]);
        let mut locking_bytes = vec![OP_CODESEPARATOR];
        locking_bytes.extend_from_slice(&tail);
        let locking = Script::from_bytes(&locking_bytes);
        let tx = MockTx::new();
        let prev = prev_outputs(&tx, &locking, 900);

        let over_tail = sign(&key, &Script::from_bytes(&tail), 900, SIGHASH_ALL_FORKID);
        let engine = ScriptEngine::parse(&script(&[Push(&over_tail)]), locking.to_bytes()).unwrap();
        assert!(engine.execute(&tx, 0, &prev));

        let over_whole = sign(&key, &locking, 900, SIGHASH_ALL_FORKID);
        let engine = ScriptEngine::parse(&script(&[Push(&over_whole)]), locking.to_bytes()).unwrap();
        assert!(!engine.execute(&tx, 0, &prev));

        // A separator in a branch that is not taken changes nothing.
        let mut skipped = vec![OP_0, OP_IF, OP_CODESEPARATOR, OP_ENDIF];
        skipped.extend_from_slice(&tail);
        let skipped = Script::from_bytes(&skipped);
        let prev = prev_outputs(&tx, &skipped, 900);
        let sig = sign(&key, &skipped, 900, SIGHASH_ALL_FORKID);
        let engine = ScriptEngine::parse(&script(&[Push(&sig)]), skipped.to_bytes()).unwrap();
        assert!(engine.execute(&tx, 0, &prev));
    }

    #[test]
    fn test_cat_growth_is_capped() {
        // Doubling a 16-byte element: 32, 64, 128, 256, 512, then 1024.
        let mut doubling = script(&[Push(&[0x5a; 16])]);
        for _ in 0..5 {
            doubling.extend_from_slice(&[OP_DUP, OP_CAT]);
        }
        let mut grown = doubling.clone();
        grown.extend_from_slice(&[OP_SIZE, OP_NIP]);
        grown.extend_from_slice(&script(&[Push(&num(512)), Code(OP_NUMEQUAL)]));
        assert!(run(&grown).is_ok());

        doubling.extend_from_slice(&[OP_DUP, OP_CAT]);
        assert_eq!(error_code(&doubling), InterpreterErrorCode::ElementTooBig);
        let wide = Config {
            max_element_size: Some(1024),
            ..Config::default()
        };
        assert!(run_with(&doubling, wide).is_ok());
    }

    #[test]
    fn test_concurrent_executions_are_isolated() {
        // Succeeds only when the sentinel is the sole item under the
        // program's own pushes.
        let engine = ScriptEngine::parse(&[OP_DEPTH, OP_1, OP_EQUALVERIFY, OP_DUP, OP_DROP], &[]).unwrap();
        let tx = MockTx::new();
        let prev = PrevOutputs::new();
        let config = Config::default();

        std::thread::scope(|scope| {
            for t in 1..=8u8 {
                let engine = &engine;
                let tx = &tx;
                let prev = &prev;
                let config = &config;
                scope.spawn(move || {
                    for i in 0..200u8 {
                        let sentinel = vec![t, i, 0x01];
                        let mut ctx = ScriptContext::new(tx, 0, prev, &EcdsaVerifier, config);
                        ctx.push(sentinel.clone());
                        engine.run_in(&mut ctx).unwrap();
                        assert_eq!(ctx.stack().items(), &[sentinel]);
                    }
                });
            }
        });
    }
}
