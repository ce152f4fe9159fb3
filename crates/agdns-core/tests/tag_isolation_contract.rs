//! Contract Test: Tag Isolation
//!
//! This test verifies that several provider instances can share one rule
//! list when each carries its own reference.
//!
//! Constraints verified:
//! - An instance never reports records tagged by another instance
//! - An instance never rewrites or drops rules tagged by another instance
//! - A reference that is a prefix of another does not capture its rules
//!
//! If this test fails, two external-dns deployments pointed at the same
//! AdGuard Home would destroy each other's records.

mod common;

use agdns_core::{Changes, DomainFilter, ManagedBy, Reconciler};
use common::*;

fn instance(store: &RecordingRuleStore, reference: Option<&str>) -> Reconciler {
    Reconciler::new(
        Box::new(store.clone()),
        ManagedBy::new(reference),
        DomainFilter::allow_all(),
    )
}

#[tokio::test]
async fn instances_with_different_references_share_a_list() {
    let store = RecordingRuleStore::with_rules(["# I am not for external-dns"]);
    let first = instance(&store, Some("ref1"));
    let second = instance(&store, Some("ref2"));

    first
        .apply_changes(&Changes {
            create: vec![a("one.example.com", &["1.1.1.1"])],
            ..Default::default()
        })
        .await
        .unwrap();
    second
        .apply_changes(&Changes {
            create: vec![a("two.example.com", &["2.2.2.2"])],
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(first.records().await.unwrap(), vec![a("one.example.com", &["1.1.1.1"])]);
    assert_eq!(second.records().await.unwrap(), vec![a("two.example.com", &["2.2.2.2"])]);

    // Deleting through one instance leaves the other's rules alone
    first
        .apply_changes(&Changes {
            delete: vec![a("one.example.com", &["1.1.1.1"])],
            ..Default::default()
        })
        .await
        .unwrap();

    assert!(first.records().await.unwrap().is_empty());
    assert_eq!(second.records().await.unwrap(), vec![a("two.example.com", &["2.2.2.2"])]);

    let rules = store.rules().await;
    assert_eq!(rules[0], "# I am not for external-dns");
    assert!(rules.contains(&format!("2.2.2.2 two.example.com #{TAG};ref:ref2")));
    assert!(rules.contains(&format!("@@||two.example.com #{TAG};ref:ref2")));
    assert!(!rules.iter().any(|r| r.contains("one.example.com")));
}

#[tokio::test]
async fn unreferenced_instance_ignores_referenced_rules() {
    let store = RecordingRuleStore::with_rules([
        format!("1.1.1.1 example.com #{TAG}"),
        format!("9.9.9.9 example.com #{TAG};ref:blue"),
        format!("@@||example.com #{TAG};ref:blue"),
    ]);
    let default = instance(&store, None);
    let blue = instance(&store, Some("blue"));

    assert_eq!(default.records().await.unwrap(), vec![a("example.com", &["1.1.1.1"])]);
    assert_eq!(blue.records().await.unwrap(), vec![a("example.com", &["9.9.9.9"])]);

    default.apply_changes(&Changes::default()).await.unwrap();

    // The blue rules are carried as foreign lines, before our own rules
    assert_eq!(
        store.rules().await,
        vec![
            format!("9.9.9.9 example.com #{TAG};ref:blue"),
            format!("@@||example.com #{TAG};ref:blue"),
            format!("1.1.1.1 example.com #{TAG}"),
            format!("@@||example.com #{TAG}"),
        ]
    );
    assert_eq!(blue.records().await.unwrap(), vec![a("example.com", &["9.9.9.9"])]);
}

#[tokio::test]
async fn prefix_reference_does_not_capture_longer_reference() {
    let store = RecordingRuleStore::with_rules([
        format!("1.1.1.1 one.example.com #{TAG};ref:ref1"),
        format!("# hello ten.example.com {TAG};ref:ref10"),
    ]);
    let ref1 = instance(&store, Some("ref1"));
    let ref10 = instance(&store, Some("ref10"));

    assert_eq!(ref1.records().await.unwrap(), vec![a("one.example.com", &["1.1.1.1"])]);
    assert_eq!(ref10.records().await.unwrap(), vec![txt("ten.example.com", &["hello"])]);
}

#[tokio::test]
async fn empty_reference_is_the_default_tag() {
    let store = RecordingRuleStore::with_rules(sample_rules());

    let records = instance(&store, Some("")).records().await.unwrap();

    assert_eq!(
        records,
        vec![
            a("example.com", &["1.1.1.1"]),
            txt("notexample.com", &["myresponse"]),
        ]
    );
}
