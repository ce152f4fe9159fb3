//! Core traits for the AdGuard DNS provider
//!
//! - [`RuleStore`]: Fetch and replace the remote list of filtering rules

pub mod rule_store;

pub use rule_store::RuleStore;
