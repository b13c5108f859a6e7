//! Execution limits, derived from whether the UTXO predates genesis.

/// Limits enforced on pre-genesis UTXOs.
pub const MAX_OPS_BEFORE_GENESIS: usize = 500;
pub const MAX_STACK_DEPTH_BEFORE_GENESIS: usize = 1000;
pub const MAX_SCRIPT_SIZE_BEFORE_GENESIS: usize = 10000;
pub const MAX_ELEMENT_SIZE_BEFORE_GENESIS: usize = 520;
pub const MAX_NUMBER_LENGTH_BEFORE_GENESIS: usize = 4;
pub const MAX_PUB_KEYS_BEFORE_GENESIS: usize = 20;

/// Post-genesis number length (bytes) and stack byte ceiling.
pub const MAX_NUMBER_LENGTH_AFTER_GENESIS: usize = 750 * 1000;
pub const MAX_STACK_BYTES_AFTER_GENESIS: u64 = 100_000_000;

/// Interpreter limit set. All limits travel here; there are no globals.
#[derive(Debug, Clone, Copy)]
pub struct Config {
    pub after_genesis: bool,
    max_stack_bytes: u64,
}

impl Config {
    pub fn before_genesis() -> Self {
        Config {
            after_genesis: false,
            // Pre-genesis stacks are bounded by depth and element size,
            // not by a byte footprint.
            max_stack_bytes: u64::MAX,
        }
    }

    pub fn after_genesis() -> Self {
        Config {
            after_genesis: true,
            max_stack_bytes: MAX_STACK_BYTES_AFTER_GENESIS,
        }
    }

    /// Override the byte-footprint ceiling shared by the data and alt stacks.
    pub fn with_max_stack_bytes(mut self, max: u64) -> Self {
        self.max_stack_bytes = max;
        self
    }

    pub fn max_ops(&self) -> usize {
        if self.after_genesis {
            i32::MAX as usize
        } else {
            MAX_OPS_BEFORE_GENESIS
        }
    }

    pub fn max_stack_depth(&self) -> usize {
        if self.after_genesis {
            i32::MAX as usize
        } else {
            MAX_STACK_DEPTH_BEFORE_GENESIS
        }
    }

    pub fn max_stack_bytes(&self) -> u64 {
        self.max_stack_bytes
    }

    pub fn max_script_size(&self) -> usize {
        if self.after_genesis {
            i32::MAX as usize
        } else {
            MAX_SCRIPT_SIZE_BEFORE_GENESIS
        }
    }

    pub fn max_element_size(&self) -> usize {
        if self.after_genesis {
            i32::MAX as usize
        } else {
            MAX_ELEMENT_SIZE_BEFORE_GENESIS
        }
    }

    pub fn max_number_length(&self) -> usize {
        if self.after_genesis {
            MAX_NUMBER_LENGTH_AFTER_GENESIS
        } else {
            MAX_NUMBER_LENGTH_BEFORE_GENESIS
        }
    }

    pub fn max_pub_keys_per_multisig(&self) -> usize {
        if self.after_genesis {
            i32::MAX as usize
        } else {
            MAX_PUB_KEYS_BEFORE_GENESIS
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pre_genesis_limits() {
        let cfg = Config::before_genesis();
        assert_eq!(cfg.max_ops(), 500);
        assert_eq!(cfg.max_stack_depth(), 1000);
        assert_eq!(cfg.max_script_size(), 10000);
        assert_eq!(cfg.max_element_size(), 520);
        assert_eq!(cfg.max_number_length(), 4);
        assert_eq!(cfg.max_pub_keys_per_multisig(), 20);
    }

    #[test]
    fn post_genesis_limits() {
        let cfg = Config::after_genesis();
        assert_eq!(cfg.max_number_length(), 750 * 1000);
        assert_eq!(cfg.max_stack_bytes(), 100_000_000);
        assert!(cfg.max_ops() > 1_000_000);
    }

    #[test]
    fn stack_byte_override() {
        let cfg = Config::after_genesis().with_max_stack_bytes(4096);
        assert_eq!(cfg.max_stack_bytes(), 4096);
    }
}
