//! Endpoint and change-set types exchanged with external-dns
//!
//! The JSON shape follows the external-dns webhook protocol, so these types
//! are deserialized straight from request bodies and serialized back into
//! responses.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// DNS record type
///
/// Only [`RecordType::A`] and [`RecordType::Txt`] can be stored as rules.
/// Anything else still has to deserialize, because external-dns may send it
/// in a change-set; such endpoints are skipped during reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RecordType {
    /// A record (IPv4)
    A,
    /// TXT record
    Txt,
    /// Any other record type, kept verbatim
    Other(String),
}

impl RecordType {
    /// Whether endpoints of this type can be written as filtering rules
    pub fn is_supported(&self) -> bool {
        matches!(self, RecordType::A | RecordType::Txt)
    }

    /// The record type as external-dns spells it
    pub fn as_str(&self) -> &str {
        match self {
            RecordType::A => "A",
            RecordType::Txt => "TXT",
            RecordType::Other(other) => other,
        }
    }
}

impl From<String> for RecordType {
    fn from(value: String) -> Self {
        match value.as_str() {
            "A" => RecordType::A,
            "TXT" => RecordType::Txt,
            _ => RecordType::Other(value),
        }
    }
}

impl From<RecordType> for String {
    fn from(value: RecordType) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for RecordType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Provider-specific key/value attached to an endpoint by external-dns
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderSpecificProperty {
    /// Property name
    pub name: String,
    /// Property value
    pub value: String,
}

/// A DNS name with its record type, targets and labels
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Endpoint {
    /// Fully qualified DNS name (e.g., "example.com")
    pub dns_name: String,

    /// Record values, in order
    #[serde(default, deserialize_with = "null_as_default")]
    pub targets: Vec<String>,

    /// Record type
    pub record_type: RecordType,

    /// Set identifier used by routing policies
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub set_identifier: String,

    /// TTL in seconds; 0 means "not configured"
    #[serde(rename = "recordTTL", default, skip_serializing_if = "is_zero")]
    pub record_ttl: i64,

    /// Ownership labels, stored as a rule suffix
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "BTreeMap::is_empty"
    )]
    pub labels: BTreeMap<String, String>,

    /// Provider-specific properties
    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub provider_specific: Vec<ProviderSpecificProperty>,
}

impl Endpoint {
    /// Create an endpoint with the given targets and no labels
    pub fn new<I, T>(dns_name: impl Into<String>, record_type: RecordType, targets: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            dns_name: dns_name.into(),
            targets: targets.into_iter().map(Into::into).collect(),
            record_type,
            set_identifier: String::new(),
            record_ttl: 0,
            labels: BTreeMap::new(),
            provider_specific: Vec::new(),
        }
    }

    /// Attach labels
    pub fn with_labels(mut self, labels: BTreeMap<String, String>) -> Self {
        self.labels = labels;
        self
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} [{}]",
            self.dns_name,
            self.record_type,
            self.targets.join(";")
        )
    }
}

/// A change-set computed by external-dns
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Changes {
    /// Endpoints to create
    #[serde(rename = "Create", default, deserialize_with = "null_as_default")]
    pub create: Vec<Endpoint>,

    /// Previous state of updated endpoints
    #[serde(rename = "UpdateOld", default, deserialize_with = "null_as_default")]
    pub update_old: Vec<Endpoint>,

    /// Desired state of updated endpoints
    #[serde(rename = "UpdateNew", default, deserialize_with = "null_as_default")]
    pub update_new: Vec<Endpoint>,

    /// Endpoints to delete
    #[serde(rename = "Delete", default, deserialize_with = "null_as_default")]
    pub delete: Vec<Endpoint>,
}

impl Changes {
    /// Whether the change-set contains nothing to do
    pub fn is_empty(&self) -> bool {
        self.create.is_empty()
            && self.update_old.is_empty()
            && self.update_new.is_empty()
            && self.delete.is_empty()
    }

    /// Endpoints whose targets must be removed: update-old first, then deletes
    pub fn removals(&self) -> impl Iterator<Item = &Endpoint> {
        self.update_old.iter().chain(self.delete.iter())
    }

    /// Endpoints whose targets must be added: creates first, then update-new
    pub fn additions(&self) -> impl Iterator<Item = &Endpoint> {
        self.create.iter().chain(self.update_new.iter())
    }
}

fn is_zero(value: &i64) -> bool {
    *value == 0
}

// external-dns is written in Go and sends `null` for empty slices and maps.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
