//! Change reconciler
//!
//! The Reconciler is responsible for:
//! - Reading the remote rule list via RuleStore
//! - Turning our rules into endpoints for external-dns
//! - Applying external-dns change-sets by rewriting the full rule list
//!
//! ## Architecture
//!
//! ```text
//!                  get_rules()                     save_rules()
//! ┌─────────────┐ ───────────▶ ┌──────────────┐ ─────────────▶ ┌─────────────┐
//! │  RuleStore  │              │  Reconciler  │                │  RuleStore  │
//! └─────────────┘              └──────────────┘                └─────────────┘
//!                                │         ▲
//!                     parse_rule │         │ format_rules
//!                                ▼         │
//!                         ┌──────────────────────┐
//!                         │ fragments → deletions │
//!                         │ → additions → markers │
//!                         └──────────────────────┘
//! ```
//!
//! ## Apply Flow
//!
//! 1. Fetch the current rules
//! 2. Keep foreign rules verbatim at the head, drop artificial markers,
//!    keep our rules as single-target fragments
//! 3. Remove the first fragment matching each target of `UpdateOld` and
//!    `Delete`
//! 4. Append targets listed in `Create` and `UpdateNew` (A and TXT only);
//!    a target whose rule would not read back is skipped with a warning
//! 5. Serialize endpoints, then one marker per name holding an A record
//! 6. Save the full list in one call
//!
//! There is no optimistic concurrency control: a writer that changes the
//! list between steps 1 and 6 is overwritten.

use crate::aggregate::aggregate;
use crate::endpoint::{Changes, Endpoint, RecordType};
use crate::error::Result;
use crate::filter::DomainFilter;
use crate::rule::{
    ManagedBy, ParsedRule, format_artificial_rule, format_checked_rule, format_rules, parse_rule,
};
use crate::traits::RuleStore;
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// Rule list split into foreign rules and our fragments
#[derive(Debug, Default)]
struct ClassifiedRules {
    unmanaged: Vec<String>,
    fragments: Vec<Endpoint>,
}

fn classify(rules: &[String], tag: &ManagedBy) -> Result<ClassifiedRules> {
    let mut classified = ClassifiedRules::default();

    for rule in rules {
        match parse_rule(rule, tag)? {
            ParsedRule::Unmanaged => classified.unmanaged.push(rule.clone()),
            ParsedRule::Artificial => {}
            ParsedRule::Managed(endpoint) => classified.fragments.push(endpoint),
        }
    }

    Ok(classified)
}

/// Compute the replacement rule list for a change-set
///
/// This is the pure part of [`Reconciler::apply_changes`]: no I/O happens
/// here, so the result depends only on the inputs.
///
/// Unchanged fragments are written back with their own record type and
/// labels, so a second plan over the output is a no-op.
///
/// # Errors
///
/// Returns [`crate::Error::InvalidRule`] if one of our rules is malformed.
pub fn plan_rules(rules: &[String], changes: &Changes, tag: &ManagedBy) -> Result<Vec<String>> {
    let ClassifiedRules { mut unmanaged, fragments } = classify(rules, tag)?;

    // Each fragment keeps its own record type and labels; merging only
    // happens for `records()`.
    let mut removed = vec![false; fragments.len()];
    for removal in changes.removals() {
        for target in &removal.targets {
            let found = fragments.iter().enumerate().position(|(i, f)| {
                !removed[i]
                    && f.dns_name == removal.dns_name
                    && f.record_type == removal.record_type
                    && f.targets.contains(target)
            });
            if let Some(i) = found {
                removed[i] = true;
                debug!(
                    dns_name = %removal.dns_name,
                    record_type = %removal.record_type,
                    target = %target,
                    "delete custom rule"
                );
            }
        }
    }
    let mut working: Vec<Endpoint> = fragments
        .into_iter()
        .zip(removed)
        .filter_map(|(fragment, gone)| (!gone).then_some(fragment))
        .collect();

    for addition in changes.additions() {
        if !addition.record_type.is_supported() {
            debug!(endpoint = %addition, "skipping unsupported record type");
            continue;
        }
        for target in &addition.targets {
            let fragment =
                Endpoint::new(addition.dns_name.clone(), addition.record_type.clone(), [target.clone()])
                    .with_labels(addition.labels.clone());
            match format_checked_rule(&fragment, target, tag) {
                Ok(_) => working.push(fragment),
                Err(e) => {
                    warn!(
                        endpoint = %addition,
                        target = %target,
                        error = %e,
                        "skipping target that cannot be stored as a rule"
                    );
                }
            }
        }
        debug!(endpoint = %addition, "add custom rule");
    }

    let mut marked = HashSet::new();
    let mut marker_names = Vec::new();
    for endpoint in &working {
        unmanaged.extend(format_rules(endpoint, tag));
        if endpoint.record_type == RecordType::A && marked.insert(endpoint.dns_name.as_str()) {
            marker_names.push(endpoint.dns_name.as_str());
        }
    }
    unmanaged.extend(marker_names.into_iter().map(|name| format_artificial_rule(name, tag)));

    Ok(unmanaged)
}

/// Reconciles external-dns state with an AdGuard Home rule list
///
/// The reconciler holds no mutable state; every call reads the rule list
/// afresh, so one instance can be shared between concurrent requests.
pub struct Reconciler {
    /// Remote rule list
    store: Box<dyn RuleStore>,

    /// Ownership tag of this instance
    managed_by: ManagedBy,

    /// Names reported by `records()`
    domain_filter: DomainFilter,
}

impl Reconciler {
    /// Create a new reconciler
    pub fn new(store: Box<dyn RuleStore>, managed_by: ManagedBy, domain_filter: DomainFilter) -> Self {
        Self {
            store,
            managed_by,
            domain_filter,
        }
    }

    /// Ownership tag of this instance
    pub fn managed_by(&self) -> &ManagedBy {
        &self.managed_by
    }

    /// Domain filter applied by `records()`
    pub fn domain_filter(&self) -> &DomainFilter {
        &self.domain_filter
    }

    /// Current endpoints owned by this instance
    ///
    /// Endpoints are returned in the order their names first appear in the
    /// rule list and are restricted to the domain filter.
    pub async fn records(&self) -> Result<Vec<Endpoint>> {
        let rules = self.store.get_rules().await?;
        debug!(store = self.store.store_name(), rules = ?rules, "retrieved rules");

        let classified = classify(&rules, &self.managed_by)?;
        let endpoints: Vec<Endpoint> = aggregate(classified.fragments)
            .into_iter()
            .filter(|e| self.domain_filter.matches(&e.dns_name))
            .collect();

        debug!(count = endpoints.len(), "records computed");
        Ok(endpoints)
    }

    /// Apply a change-set by rewriting the whole rule list
    ///
    /// # Errors
    ///
    /// - [`crate::Error::InvalidRule`] if one of our stored rules is malformed;
    ///   nothing is written
    /// - Store errors from reading or writing the list
    pub async fn apply_changes(&self, changes: &Changes) -> Result<()> {
        debug!(changes = ?changes, "apply changes");

        let rules = self.store.get_rules().await?;
        debug!(store = self.store.store_name(), rules = ?rules, "loaded existing rules");

        let updated = plan_rules(&rules, changes, &self.managed_by)?;

        self.store.save_rules(&updated).await?;
        info!(
            store = self.store.store_name(),
            before = rules.len(),
            after = updated.len(),
            "rules saved"
        );
        Ok(())
    }

    /// Adjust endpoints before external-dns plans changes
    ///
    /// AdGuard Home has no provider-specific constraints, so endpoints pass
    /// through unchanged.
    pub fn adjust_endpoints(&self, endpoints: Vec<Endpoint>) -> Vec<Endpoint> {
        endpoints
    }

    /// Compare provider-specific property values
    pub fn property_values_equal(&self, name: &str, previous: &str, current: &str) -> bool {
        let equal = previous == current;
        debug!(name, previous, current, equal, "property values compared");
        equal
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::store::MemoryRuleStore;

    const TAG_A: &str = "#$managed by external-dns";

    fn rules(lines: &[&str]) -> Vec<String> {
        lines.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_plan_keeps_unmanaged_rules_first() {
        let tag = ManagedBy::default();
        let current = rules(&[
            "1.1.1.1 example.com #$managed by external-dns",
            "||ads.example.net^",
            "@@||example.com #$managed by external-dns",
            "# a comment",
        ]);

        let planned = plan_rules(&current, &Changes::default(), &tag).unwrap();

        assert_eq!(
            planned,
            rules(&[
                "||ads.example.net^",
                "# a comment",
                "1.1.1.1 example.com #$managed by external-dns",
                "@@||example.com #$managed by external-dns",
            ])
        );
    }

    #[test]
    fn test_plan_deletes_first_match_only() {
        let tag = ManagedBy::default();
        let current = rules(&[
            &format!("1.1.1.1 example.com {TAG_A}"),
            &format!("1.1.1.1 example.com {TAG_A}"),
            &format!("2.2.2.2 example.com {TAG_A}"),
        ]);
        let changes = Changes {
            delete: vec![Endpoint::new("example.com", RecordType::A, ["1.1.1.1"])],
            ..Default::default()
        };

        let planned = plan_rules(&current, &changes, &tag).unwrap();

        assert_eq!(
            planned,
            rules(&[
                &format!("1.1.1.1 example.com {TAG_A}"),
                &format!("2.2.2.2 example.com {TAG_A}"),
                "@@||example.com #$managed by external-dns",
            ])
        );
    }

    #[test]
    fn test_plan_deletion_requires_matching_type() {
        let tag = ManagedBy::default();
        let current = rules(&["# value example.com $managed by external-dns"]);
        let changes = Changes {
            delete: vec![Endpoint::new("example.com", RecordType::A, ["value"])],
            ..Default::default()
        };

        let planned = plan_rules(&current, &changes, &tag).unwrap();

        assert_eq!(planned, current);
    }

    #[test]
    fn test_plan_drops_unsupported_types() {
        let tag = ManagedBy::default();
        let changes = Changes {
            create: vec![
                Endpoint::new("alias.example.com", RecordType::Other("CNAME".into()), ["example.com"]),
                Endpoint::new("v6.example.com", RecordType::Other("AAAA".into()), ["::1"]),
            ],
            ..Default::default()
        };

        let planned = plan_rules(&[], &changes, &tag).unwrap();

        assert!(planned.is_empty());
    }

    #[test]
    fn test_plan_writes_labels_and_markers() {
        let tag = ManagedBy::new(Some("ref1"));
        let labels = [("owner".to_string(), "default".to_string())].into_iter().collect();
        let changes = Changes {
            create: vec![
                Endpoint::new("example.com", RecordType::A, ["1.1.1.1", "2.2.2.2"]).with_labels(labels),
                Endpoint::new("example.com", RecordType::Txt, ["heritage=external-dns"]),
                Endpoint::new("txt-only.example.com", RecordType::Txt, ["value"]),
            ],
            ..Default::default()
        };

        let planned = plan_rules(&[], &changes, &tag).unwrap();

        assert_eq!(
            planned,
            rules(&[
                r#"1.1.1.1 example.com #$managed by external-dns;ref:ref1;labels={"owner":"default"}"#,
                r#"2.2.2.2 example.com #$managed by external-dns;ref:ref1;labels={"owner":"default"}"#,
                "# heritage=external-dns example.com $managed by external-dns;ref:ref1",
                "# value txt-only.example.com $managed by external-dns;ref:ref1",
                "@@||example.com #$managed by external-dns;ref:ref1",
            ])
        );
    }

    #[test]
    fn test_plan_keeps_record_types_apart() {
        let tag = ManagedBy::default();
        let changes = Changes {
            create: vec![
                Endpoint::new("example.com", RecordType::A, ["1.1.1.1"]),
                Endpoint::new("example.com", RecordType::Txt, ["heritage=external-dns"]),
            ],
            ..Default::default()
        };

        let first = plan_rules(&[], &changes, &tag).unwrap();
        let second = plan_rules(&first, &Changes::default(), &tag).unwrap();

        assert_eq!(second, first);
        assert!(second.contains(&"# heritage=external-dns example.com $managed by external-dns".to_string()));
    }

    #[test]
    fn test_plan_keeps_labels_per_rule() {
        let tag = ManagedBy::default();
        let current = rules(&[
            r#"1.1.1.1 example.com #$managed by external-dns;labels={"resource":"ingress/a"}"#,
            r#"2.2.2.2 example.com #$managed by external-dns;labels={"resource":"ingress/b"}"#,
        ]);
        let changes = Changes {
            delete: vec![Endpoint::new("example.com", RecordType::A, ["1.1.1.1"])],
            ..Default::default()
        };

        let planned = plan_rules(&current, &changes, &tag).unwrap();

        assert_eq!(
            planned,
            rules(&[
                r#"2.2.2.2 example.com #$managed by external-dns;labels={"resource":"ingress/b"}"#,
                "@@||example.com #$managed by external-dns",
            ])
        );
    }

    #[test]
    fn test_plan_skips_unwritable_targets() {
        let tag = ManagedBy::default();
        let current = rules(&["||ads.example.net^", &format!("1.1.1.1 example.com {TAG_A}")]);
        let changes = Changes {
            create: vec![
                Endpoint::new("example.com", RecordType::Txt, ["v=spf1 -all"]),
                Endpoint::new("example.com", RecordType::A, ["", "2.2.2.2"]),
                Endpoint::new("bad.example.com", RecordType::Txt, ["x;labels={}"]),
            ],
            ..Default::default()
        };

        let planned = plan_rules(&current, &changes, &tag).unwrap();

        assert_eq!(
            planned,
            rules(&[
                "||ads.example.net^",
                &format!("1.1.1.1 example.com {TAG_A}"),
                &format!("2.2.2.2 example.com {TAG_A}"),
                "@@||example.com #$managed by external-dns",
            ])
        );
        assert_eq!(plan_rules(&planned, &Changes::default(), &tag).unwrap(), planned);
    }

    #[test]
    fn test_plan_rejects_malformed_rule() {
        let tag = ManagedBy::default();
        let current = rules(&["example.com #$managed by external-dns"]);

        let err = plan_rules(&current, &Changes::default(), &tag).unwrap_err();

        assert!(matches!(err, Error::InvalidRule { .. }));
    }

    #[test]
    fn test_records_applies_domain_filter() {
        let store = MemoryRuleStore::with_rules([
            "# I am not for external-dns",
            "1.1.1.1 example.com #$managed by external-dns",
            "# myresponse notexample.com $managed by external-dns",
        ]);
        let reconciler = Reconciler::new(
            Box::new(store),
            ManagedBy::default(),
            DomainFilter::new(["example.com"], Vec::<&str>::new()),
        );

        let records = tokio_test::block_on(reconciler.records()).unwrap();

        assert_eq!(records, vec![Endpoint::new("example.com", RecordType::A, ["1.1.1.1"])]);
    }

    #[test]
    fn test_pass_through_hooks() {
        let reconciler = Reconciler::new(
            Box::new(MemoryRuleStore::new()),
            ManagedBy::default(),
            DomainFilter::allow_all(),
        );

        let endpoints = vec![Endpoint::new("example.com", RecordType::A, ["1.1.1.1"])];
        assert_eq!(reconciler.adjust_endpoints(endpoints.clone()), endpoints);
        assert!(reconciler.property_values_equal("aws/weight", "10", "10"));
        assert!(!reconciler.property_values_equal("aws/weight", "10", "20"));
    }
}
