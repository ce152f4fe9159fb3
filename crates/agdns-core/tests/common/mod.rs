//! Test doubles and common utilities for reconciler contract tests
//!
//! This module provides a rule store double that counts calls and can be
//! told to fail, plus small helpers for building endpoints.

#![allow(dead_code)]

use agdns_core::error::{Error, Result};
use agdns_core::store::MemoryRuleStore;
use agdns_core::traits::RuleStore;
use agdns_core::{Endpoint, RecordType};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Default managed-by tag as it appears in A rules
pub const TAG: &str = "$managed by external-dns";

/// A rule store that records calls and can simulate transport failures
#[derive(Clone, Default)]
pub struct RecordingRuleStore {
    /// Backing rules
    rules: MemoryRuleStore,
    /// Number of get_rules() calls
    get_calls: Arc<AtomicUsize>,
    /// Number of save_rules() calls, including failed ones
    save_calls: Arc<AtomicUsize>,
    /// Fail every save_rules() call
    fail_saves: Arc<AtomicBool>,
}

impl RecordingRuleStore {
    /// Create a store holding the given rules
    pub fn with_rules<I, S>(rules: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            rules: MemoryRuleStore::with_rules(rules),
            ..Default::default()
        }
    }

    /// Make every subsequent save fail
    pub fn fail_saves(&self) {
        self.fail_saves.store(true, Ordering::SeqCst);
    }

    /// Current rules
    pub async fn rules(&self) -> Vec<String> {
        self.rules.rules().await
    }

    /// Get the number of times get_rules() was called
    pub fn get_call_count(&self) -> usize {
        self.get_calls.load(Ordering::SeqCst)
    }

    /// Get the number of times save_rules() was called
    pub fn save_call_count(&self) -> usize {
        self.save_calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl RuleStore for RecordingRuleStore {
    async fn get_rules(&self) -> Result<Vec<String>> {
        self.get_calls.fetch_add(1, Ordering::SeqCst);
        self.rules.get_rules().await
    }

    async fn save_rules(&self, rules: &[String]) -> Result<()> {
        self.save_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_saves.load(Ordering::SeqCst) {
            return Err(Error::http("unexpected status code 500"));
        }
        self.rules.save_rules(rules).await
    }

    fn store_name(&self) -> &'static str {
        "recording"
    }
}

/// The rule list used by most scenarios
pub fn sample_rules() -> Vec<String> {
    vec![
        "# I am not for external-dns".to_string(),
        format!("1.1.1.1 example.com #{TAG}"),
        format!("# myresponse notexample.com {TAG}"),
    ]
}

/// Shorthand for an A endpoint
pub fn a(name: &str, targets: &[&str]) -> Endpoint {
    Endpoint::new(name, RecordType::A, targets.iter().copied())
}

/// Shorthand for a TXT endpoint
pub fn txt(name: &str, targets: &[&str]) -> Endpoint {
    Endpoint::new(name, RecordType::Txt, targets.iter().copied())
}
