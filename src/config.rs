//! Tracer configuration
//!
//! Provides:
//! - `HardforkSchedule`: protocol rules by block, used to resolve the set of
//!   precompiled contracts whose calls are elided from traces
//! - `PartitionConfig`: on-disk layout of block-partitioned trace logs

use std::collections::HashSet;
use std::path::PathBuf;

use once_cell::sync::Lazy;
pub use revm::primitives::hardfork::SpecId;
use revm::precompile::{PrecompileSpecId, Precompiles};
use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;
use crate::traits::PrecompileResolver;
use crate::types::Address;

static MAINNET_SCHEDULE: Lazy<HardforkSchedule> = Lazy::new(|| HardforkSchedule {
    activations: vec![
        (0, SpecId::FRONTIER),
        (1_150_000, SpecId::HOMESTEAD),
        (1_920_000, SpecId::DAO_FORK),
        (2_463_000, SpecId::TANGERINE),
        (2_675_000, SpecId::SPURIOUS_DRAGON),
        (4_370_000, SpecId::BYZANTIUM),
        (7_280_000, SpecId::PETERSBURG),
        (9_069_000, SpecId::ISTANBUL),
        (9_200_000, SpecId::MUIR_GLACIER),
        (12_244_000, SpecId::BERLIN),
        (12_965_000, SpecId::LONDON),
        (13_773_000, SpecId::ARROW_GLACIER),
        (15_050_000, SpecId::GRAY_GLACIER),
        (15_537_394, SpecId::MERGE),
        (17_034_870, SpecId::SHANGHAI),
        (19_426_587, SpecId::CANCUN),
        (22_431_084, SpecId::PRAGUE),
    ],
});

/// Protocol rules active at each block height
///
/// Activations are `(first_block, spec)` pairs in ascending block order.
/// Forks that mainnet schedules by timestamp are listed at their first block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HardforkSchedule {
    activations: Vec<(u64, SpecId)>,
}

impl HardforkSchedule {
    /// Build a schedule from `(first_block, spec)` pairs
    ///
    /// # Returns
    /// * `Err(ConfigError::UnsortedSchedule)` - If activation blocks decrease
    pub fn new(activations: Vec<(u64, SpecId)>) -> Result<Self, ConfigError> {
        if let Some(pair) = activations.windows(2).find(|pair| pair[1].0 < pair[0].0) {
            return Err(ConfigError::UnsortedSchedule(pair[1].0));
        }
        Ok(Self { activations })
    }

    /// Ethereum mainnet activation blocks
    pub fn mainnet() -> Self {
        MAINNET_SCHEDULE.clone()
    }

    /// The same rules at every block
    pub fn fixed(spec: SpecId) -> Self {
        Self {
            activations: vec![(0, spec)],
        }
    }

    /// Rules in force at `block_number`
    ///
    /// Blocks before the first activation run under Frontier rules.
    pub fn spec_at(&self, block_number: u64) -> SpecId {
        self.activations
            .iter()
            .rev()
            .find(|(first_block, _)| *first_block <= block_number)
            .map(|(_, spec)| *spec)
            .unwrap_or(SpecId::FRONTIER)
    }
}

impl Default for HardforkSchedule {
    fn default() -> Self {
        Self::mainnet()
    }
}

impl PrecompileResolver for HardforkSchedule {
    fn active_precompiles(&self, block_number: u64) -> HashSet<Address> {
        let spec = PrecompileSpecId::from_spec_id(self.spec_at(block_number));
        Precompiles::new(spec).addresses().copied().collect()
    }
}

/// Layout of block-partitioned trace log files
///
/// A block's records go to `<root>/<block / blocks_per_folder>/<block / blocks_per_file>.log`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PartitionConfig {
    /// Directory holding all trace logs
    pub root: PathBuf,
    /// Blocks grouped under one directory
    pub blocks_per_folder: u64,
    /// Blocks grouped into one log file
    pub blocks_per_file: u64,
}

impl Default for PartitionConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("traces"),
            blocks_per_folder: 1_000_000,
            blocks_per_file: 10_000,
        }
    }
}

impl PartitionConfig {
    pub fn new(root: impl Into<PathBuf>, blocks_per_folder: u64, blocks_per_file: u64) -> Self {
        Self {
            root: root.into(),
            blocks_per_folder,
            blocks_per_file,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.blocks_per_folder == 0 {
            return Err(ConfigError::InvalidPartition(
                "blocks_per_folder must be non-zero".to_string(),
            ));
        }
        if self.blocks_per_file == 0 {
            return Err(ConfigError::InvalidPartition(
                "blocks_per_file must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Log file receiving the records of `block_number`
    ///
    /// Callers validate the config first; zero partition sizes are treated as one.
    pub fn path_for_block(&self, block_number: u64) -> PathBuf {
        let folder = block_number / self.blocks_per_folder.max(1);
        let file = block_number / self.blocks_per_file.max(1);
        self.root
            .join(folder.to_string())
            .join(format!("{file}.log"))
    }
}
