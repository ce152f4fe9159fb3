// # Rule Store Trait
//
// Defines the interface to the remote list of user filtering rules.
//
// ## Purpose
//
// The rule list is the only persistent state of the provider. Every
// reconciliation reads the whole list and, when applying changes, writes the
// whole list back in one call.
//
// ## Implementations
//
// - AdGuard Home HTTP API: `agdns-adguard` crate
// - In-memory: `MemoryRuleStore` (tests, local experiments)
//
// ## Usage
//
// ```rust,ignore
// use agdns_core::RuleStore;
//
// #[tokio::main]
// async fn main() -> agdns_core::Result<()> {
//     let store = /* RuleStore implementation */;
//
//     let mut rules = store.get_rules().await?;
//     rules.push("||ads.example.com^".to_string());
//     store.save_rules(&rules).await?;
//
//     Ok(())
// }
// ```

use async_trait::async_trait;

/// Trait for rule store implementations
///
/// # Concurrency
///
/// There is no versioning or locking on the remote list. Two writers that
/// interleave their read and write calls can overwrite each other; the
/// reconciler only guarantees that it never touches rules carrying another
/// instance's tag.
///
/// # Trust Level: Untrusted
///
/// Stores perform I/O only. They must not retry, cache rules between calls,
/// or interpret rule contents.
#[async_trait]
pub trait RuleStore: Send + Sync {
    /// Fetch the full list of user rules, in stored order
    ///
    /// # Returns
    ///
    /// - `Ok(Vec<String>)`: The rules (possibly empty)
    /// - `Err(Error)`: Transport or decode failure
    async fn get_rules(&self) -> Result<Vec<String>, crate::Error>;

    /// Replace the full list of user rules
    ///
    /// Either the whole list is stored or nothing is.
    ///
    /// # Returns
    ///
    /// - `Ok(())`: Rules replaced
    /// - `Err(Error)`: Transport failure; the remote list is unchanged
    async fn save_rules(&self, rules: &[String]) -> Result<(), crate::Error>;

    /// Get the store name (for logging/debugging)
    fn store_name(&self) -> &'static str;
}
