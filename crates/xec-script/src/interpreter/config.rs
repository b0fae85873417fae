//! Interpreter limits and policy switches.
//!
//! The default configuration is unbounded: no size, op-count, or stack
//! limits are applied, which matches engines that rely on the caller to
//! bound input. Elements built by `OP_CAT` and `OP_NUM2BIN` are still capped
//! at 520 bytes. [`Config::standard`] restores the legacy consensus limits.

use serde::{Deserialize, Serialize};

use crate::address::Network;

pub const MAX_SCRIPT_SIZE: usize = 10_000;
pub const MAX_OPS_PER_SCRIPT: usize = 201;
pub const MAX_STACK_SIZE: usize = 1_000;
pub const MAX_SCRIPT_ELEMENT_SIZE: usize = 520;
pub const MAX_PUBKEYS_PER_MULTISIG: usize = 20;
pub const DEFAULT_SCRIPT_NUM_LENGTH: usize = 4;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Network used for the address derived while parsing.
    pub network: Network,
    /// Maximum size of each of the unlocking and locking scripts.
    pub max_script_size: Option<usize>,
    /// Maximum number of non-push operations in one run.
    pub max_ops: Option<usize>,
    /// Maximum combined depth of the main and alt stacks.
    pub max_stack_size: Option<usize>,
    /// Maximum size of any single stack element.
    pub max_element_size: Option<usize>,
    /// Maximum byte length of a numeric operand.
    pub max_num_length: usize,
    /// Reject non-minimal pushes and numeric encodings.
    pub require_minimal_data: bool,
    /// A failed signature check must have used an empty signature.
    pub require_null_fail: bool,
}

impl Config {
    pub fn unbounded() -> Self {
        Config {
            network: Network::Mainnet,
            max_script_size: None,
            max_ops: None,
            max_stack_size: None,
            max_element_size: None,
            max_num_length: DEFAULT_SCRIPT_NUM_LENGTH,
            require_minimal_data: false,
            require_null_fail: false,
        }
    }

    pub fn standard() -> Self {
        Config {
            network: Network::Mainnet,
            max_script_size: Some(MAX_SCRIPT_SIZE),
            max_ops: Some(MAX_OPS_PER_SCRIPT),
            max_stack_size: Some(MAX_STACK_SIZE),
            max_element_size: Some(MAX_SCRIPT_ELEMENT_SIZE),
            max_num_length: DEFAULT_SCRIPT_NUM_LENGTH,
            require_minimal_data: true,
            require_null_fail: true,
        }
    }

    pub fn with_network(mut self, network: Network) -> Self {
        self.network = network;
        self
    }

    pub(crate) fn element_size_ok(&self, len: usize) -> bool {
        self.max_element_size.map_or(true, |max| len <= max)
    }

    /// Cap on elements built by `OP_CAT` and `OP_NUM2BIN`. Falls back to
    /// [`MAX_SCRIPT_ELEMENT_SIZE`] when element size is unbounded, so a
    /// short script cannot double an element without limit.
    pub(crate) fn max_built_element_size(&self) -> usize {
        self.max_element_size.unwrap_or(MAX_SCRIPT_ELEMENT_SIZE)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::unbounded()
    }
}
