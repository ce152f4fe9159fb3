// # Memory Rule Store
//
// In-memory implementation of RuleStore.
//
// ## Purpose
//
// Holds a rule list in process memory. Clones share the same list, so two
// reconcilers built from clones of one store behave like two providers
// pointed at the same AdGuard Home instance.
//
// ## When to Use
//
// - Tests
// - Local experiments without an AdGuard Home instance

use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::RwLock;

use crate::Error;
use crate::traits::rule_store::RuleStore;

/// In-memory rule store implementation
///
/// # Example
///
/// ```rust,no_run
/// use agdns_core::store::MemoryRuleStore;
/// use agdns_core::traits::RuleStore;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = MemoryRuleStore::with_rules(["||ads.example.com^"]);
///
///     let rules = store.get_rules().await?;
///     assert_eq!(rules, vec!["||ads.example.com^".to_string()]);
///
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryRuleStore {
    inner: Arc<RwLock<Vec<String>>>,
    saves: Arc<AtomicUsize>,
}

impl MemoryRuleStore {
    /// Create a new empty memory rule store
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with rules
    pub fn with_rules<I, S>(rules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            inner: Arc::new(RwLock::new(rules.into_iter().map(Into::into).collect())),
            saves: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Snapshot of the current rules
    pub async fn rules(&self) -> Vec<String> {
        self.inner.read().await.clone()
    }

    /// Number of successful `save_rules` calls
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RuleStore for MemoryRuleStore {
    async fn get_rules(&self) -> Result<Vec<String>, Error> {
        Ok(self.rules().await)
    }

    async fn save_rules(&self, rules: &[String]) -> Result<(), Error> {
        let mut guard = self.inner.write().await;
        *guard = rules.to_vec();
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn store_name(&self) -> &'static str {
        "memory"
    }
}
