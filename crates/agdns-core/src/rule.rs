//! Rule codec
//!
//! AdGuard Home has no notion of DNS records, only a flat list of user
//! filtering rules. Records are stored as rules carrying a managed-by tag:
//!
//! ```text
//! 1.1.1.1 example.com #$managed by external-dns          A record
//! # some-value example.com $managed by external-dns      TXT record
//! @@||example.com #$managed by external-dns              artificial marker
//! ```
//!
//! Either record line may end with `;labels=<json object>`.
//!
//! [`parse_rule`] is the single place where a line is classified; callers
//! match on [`ParsedRule`] instead of inspecting rule text themselves.

use crate::endpoint::{Endpoint, RecordType};
use crate::error::{Error, Result};
use std::collections::BTreeMap;
use std::fmt;

/// Base managed-by tag embedded in every rule this provider writes
pub const MANAGED_BY: &str = "$managed by external-dns";

/// Marker separating the rule body from its JSON labels
pub const LABELS_MARKER: &str = ";labels=";

/// Prefix of artificial marker rules
pub const ARTIFICIAL_PREFIX: &str = "@@||";

/// Ownership tag of one provider instance
///
/// Instances configured with different references never see each other's
/// rules, which lets several external-dns deployments share one AdGuard Home.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ManagedBy(String);

impl ManagedBy {
    /// Build the tag, optionally extended with `;ref:<reference>`
    ///
    /// An empty reference is treated as no reference.
    pub fn new(reference: Option<&str>) -> Self {
        match reference.map(str::trim).filter(|r| !r.is_empty()) {
            Some(reference) => Self(format!("{MANAGED_BY};ref:{reference}")),
            None => Self(MANAGED_BY.to_string()),
        }
    }

    /// The tag text as it appears in rules
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ManagedBy {
    fn default() -> Self {
        Self::new(None)
    }
}

impl fmt::Display for ManagedBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Classification of a single rule line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedRule {
    /// Not ours; must be kept untouched
    Unmanaged,
    /// Our existence marker; discarded on read and regenerated on write
    Artificial,
    /// One target of one of our records
    Managed(Endpoint),
}

/// Classify a rule line for the given tag
///
/// # Returns
///
/// - `Ok(ParsedRule::Unmanaged)` if the line does not belong to `tag`
/// - `Ok(ParsedRule::Artificial)` for `@@||<name> #<tag>` markers
/// - `Ok(ParsedRule::Managed(endpoint))` with a single-target endpoint
/// - `Err(Error::InvalidRule)` if the line is ours but malformed
///
/// The tag has to end the rule body. A line with text after the tag, such as
/// `1.1.1.1 example.com #<tag> extra`, is `Unmanaged` and survives rewrites
/// as a foreign rule; it is never reported as a record.
pub fn parse_rule(rule: &str, tag: &ManagedBy) -> Result<ParsedRule> {
    let tag = tag.as_str();
    if !rule.contains(tag) {
        return Ok(ParsedRule::Unmanaged);
    }

    let (body, labels_json) = match rule.find(LABELS_MARKER) {
        Some(idx) => (&rule[..idx], Some(&rule[idx + LABELS_MARKER.len()..])),
        None => (rule, None),
    };

    // The tag must terminate the body; "…;ref:a" is not owned by "…;ref:ab"
    // nor by the bare tag.
    if !body.ends_with(tag) {
        return Ok(ParsedRule::Unmanaged);
    }

    if rule.starts_with(ARTIFICIAL_PREFIX) {
        return Ok(ParsedRule::Artificial);
    }

    let labels = labels_json.map(|json| parse_labels(rule, json)).unwrap_or_default();

    // The tag contains spaces, so it counts as one token and is cut off
    // before splitting the rest.
    let tokens: Vec<&str> = body[..body.len() - tag.len()].split_whitespace().collect();

    let endpoint = if body.starts_with('#') {
        // # <value> <name> <tag>
        match tokens.as_slice() {
            ["#", value, name] => Endpoint::new(*name, RecordType::Txt, [*value]),
            _ => {
                return Err(Error::invalid_rule(
                    rule,
                    format!("TXT rule needs 4 tokens, found {}", tokens.len() + 1),
                ));
            }
        }
    } else {
        // <target> <name> #<tag>
        match tokens.as_slice() {
            [target, name, "#"] => Endpoint::new(*name, RecordType::A, [*target]),
            [_, _, _] => {
                return Err(Error::invalid_rule(rule, "A rule tag must be prefixed with '#'"));
            }
            _ => {
                return Err(Error::invalid_rule(
                    rule,
                    format!("A rule needs 3 tokens, found {}", tokens.len()),
                ));
            }
        }
    };

    Ok(ParsedRule::Managed(endpoint.with_labels(labels)))
}

fn parse_labels(rule: &str, json: &str) -> BTreeMap<String, String> {
    match serde_json::from_str(json) {
        Ok(labels) => labels,
        Err(e) => {
            tracing::warn!(rule = %rule, error = %e, "failed to parse labels from rule");
            BTreeMap::new()
        }
    }
}

/// Render one target of an endpoint as a rule line
pub fn format_rule(endpoint: &Endpoint, target: &str, tag: &ManagedBy) -> String {
    let labels = format_labels(&endpoint.labels);
    match endpoint.record_type {
        RecordType::Txt => format!("# {} {} {}{}", target, endpoint.dns_name, tag, labels),
        _ => format!("{} {} #{}{}", target, endpoint.dns_name, tag, labels),
    }
}

/// Render one target of an endpoint, checking that the line reads back as
/// exactly that target
///
/// Names or targets that are empty, contain whitespace, or contain the tag or
/// the labels marker would produce a line that parses as something else (or
/// not at all).
pub fn format_checked_rule(endpoint: &Endpoint, target: &str, tag: &ManagedBy) -> Result<String> {
    let line = format_rule(endpoint, target, tag);
    let reads_back = match parse_rule(&line, tag) {
        Ok(ParsedRule::Managed(parsed)) => {
            parsed.dns_name == endpoint.dns_name
                && parsed.record_type == endpoint.record_type
                && parsed.targets == [target]
                && parsed.labels == endpoint.labels
        }
        _ => false,
    };
    if !reads_back {
        return Err(Error::invalid_rule(
            line,
            format!("{} {} cannot be written as a rule", endpoint.record_type, endpoint.dns_name),
        ));
    }
    Ok(line)
}

/// Render every target of an endpoint, one rule line per target
pub fn format_rules<'a>(
    endpoint: &'a Endpoint,
    tag: &'a ManagedBy,
) -> impl Iterator<Item = String> + 'a {
    endpoint
        .targets
        .iter()
        .map(move |target| format_rule(endpoint, target, tag))
}

/// Render the artificial marker for a DNS name
pub fn format_artificial_rule(dns_name: &str, tag: &ManagedBy) -> String {
    format!("{ARTIFICIAL_PREFIX}{dns_name} #{tag}")
}

fn format_labels(labels: &BTreeMap<String, String>) -> String {
    if labels.is_empty() {
        return String::new();
    }
    match serde_json::to_string(labels) {
        Ok(json) => format!("{LABELS_MARKER}{json}"),
        Err(e) => {
            tracing::warn!(error = %e, "failed to serialize labels, writing rule without them");
            String::new()
        }
    }
}
