// # agdns-core
//
// Core library of the AdGuard Home DNS provider for external-dns.
//
// ## Architecture Overview
//
// AdGuard Home only knows a flat list of user filtering rules. This library
// stores DNS records in that list and reads them back:
// - **Rule codec** (`rule`): classify and render single rule lines
// - **Aggregation** (`aggregate`): merge single-target rules per DNS name
// - **Reconciler** (`reconciler`): apply external-dns change-sets
// - **RuleStore** (`traits`): fetch and replace the remote rule list
// - **DomainFilter** (`filter`): restrict which names are reported
//
// ## Design Principles
//
// 1. **Foreign rules are sacred**: rules without our tag are never modified
// 2. **Tag isolation**: instances with different references ignore each other
// 3. **Full replace**: every apply writes the whole list in one call
// 4. **Library-First**: the daemon and webhook are thin layers over this crate

pub mod aggregate;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod filter;
pub mod reconciler;
pub mod rule;
pub mod store;
pub mod traits;

// Re-export core types for convenience
pub use config::ProviderConfig;
pub use endpoint::{Changes, Endpoint, RecordType};
pub use error::{Error, Result};
pub use filter::DomainFilter;
pub use reconciler::Reconciler;
pub use rule::{ManagedBy, ParsedRule};
pub use store::MemoryRuleStore;
pub use traits::RuleStore;
