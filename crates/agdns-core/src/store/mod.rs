//! Rule store implementations

pub mod memory;

pub use memory::MemoryRuleStore;
