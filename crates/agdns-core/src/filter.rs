//! Domain filter
//!
//! Restricts which endpoints are reported to external-dns. The JSON form is
//! what the webhook returns during negotiation.

use serde::{Deserialize, Serialize};

/// Include/exclude allow-list of DNS zones
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DomainFilter {
    /// Zones to include; empty means every name
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub include: Vec<String>,

    /// Zones to exclude; wins over `include`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude: Vec<String>,
}

impl DomainFilter {
    /// Create a filter from include and exclude lists
    ///
    /// Entries are trimmed, lowercased and stripped of a trailing dot;
    /// blank entries are dropped.
    pub fn new<I, E, S, T>(include: I, exclude: E) -> Self
    where
        I: IntoIterator<Item = S>,
        E: IntoIterator<Item = T>,
        S: AsRef<str>,
        T: AsRef<str>,
    {
        Self {
            include: normalize_all(include),
            exclude: normalize_all(exclude),
        }
    }

    /// Filter that matches every name
    pub fn allow_all() -> Self {
        Self::default()
    }

    /// Check whether a DNS name passes the filter
    ///
    /// - `example.com` matches `example.com` and its subdomains
    /// - `.example.com` and `*.example.com` match subdomains only
    pub fn matches(&self, dns_name: &str) -> bool {
        let name = normalize(dns_name);

        if self.exclude.iter().any(|zone| zone_matches(zone, &name)) {
            return false;
        }

        self.include.is_empty() || self.include.iter().any(|zone| zone_matches(zone, &name))
    }
}

fn zone_matches(zone: &str, name: &str) -> bool {
    if let Some(suffix) = zone.strip_prefix("*.").or_else(|| zone.strip_prefix('.')) {
        return is_subdomain(name, suffix);
    }
    name == zone || is_subdomain(name, zone)
}

fn is_subdomain(name: &str, zone: &str) -> bool {
    name.len() > zone.len()
        && name.ends_with(zone)
        && name.as_bytes()[name.len() - zone.len() - 1] == b'.'
}

fn normalize(value: &str) -> String {
    value.trim().trim_end_matches('.').to_ascii_lowercase()
}

fn normalize_all<I, S>(values: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    values
        .into_iter()
        .map(|v| normalize(v.as_ref()))
        .filter(|v| !v.is_empty())
        .collect()
}
