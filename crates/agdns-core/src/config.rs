//! Configuration types for the AdGuard DNS provider
//!
//! All settings come from environment variables and are read once at
//! startup into an immutable [`ProviderConfig`].
//!
//! | Variable                      | Required | Meaning                                |
//! |-------------------------------|----------|----------------------------------------|
//! | `ADGUARD_HOME_URL`            | yes      | AdGuard Home base URL                  |
//! | `ADGUARD_HOME_USER`           | yes      | Basic auth user                        |
//! | `ADGUARD_HOME_PASS`           | yes      | Basic auth password                    |
//! | `ADGUARD_HOME_MANAGED_BY_REF` | no       | Extends the managed-by tag             |
//! | `DOMAIN_FILTER`               | no       | Comma-separated zones to include       |
//! | `EXCLUDE_DOMAINS`             | no       | Comma-separated zones to exclude       |
//! | `DRY_RUN`                     | no       | `true`/`1`/`yes` to skip rule writes   |

use crate::error::{Error, Result};
use crate::filter::DomainFilter;
use crate::rule::ManagedBy;
use std::fmt;

pub const ENV_URL: &str = "ADGUARD_HOME_URL";
pub const ENV_USER: &str = "ADGUARD_HOME_USER";
pub const ENV_PASSWORD: &str = "ADGUARD_HOME_PASS";
pub const ENV_MANAGED_BY_REF: &str = "ADGUARD_HOME_MANAGED_BY_REF";
pub const ENV_DOMAIN_FILTER: &str = "DOMAIN_FILTER";
pub const ENV_EXCLUDE_DOMAINS: &str = "EXCLUDE_DOMAINS";
pub const ENV_DRY_RUN: &str = "DRY_RUN";

/// Path suffix of the AdGuard Home control API
pub const CONTROL_PATH: &str = "control/";

/// Provider configuration
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    /// Base URL of the control API, always ending in `/control/`
    pub url: String,

    /// Basic auth user
    pub user: String,

    /// Basic auth password
    /// ⚠️ NEVER log this value
    pub password: String,

    /// Optional reference appended to the managed-by tag
    pub managed_by_ref: Option<String>,

    /// Names reported to external-dns
    pub domain_filter: DomainFilter,

    /// Read rules but never write them
    pub dry_run: bool,
}

// Custom Debug implementation that hides the password
impl fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("url", &self.url)
            .field("user", &self.user)
            .field("password", &"<REDACTED>")
            .field("managed_by_ref", &self.managed_by_ref)
            .field("domain_filter", &self.domain_filter)
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

impl ProviderConfig {
    /// Create a configuration with the URL normalized and no filter
    pub fn new(
        url: impl AsRef<str>,
        user: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            url: normalize_url(url.as_ref()),
            user: user.into(),
            password: password.into(),
            managed_by_ref: None,
            domain_filter: DomainFilter::allow_all(),
            dry_run: false,
        }
    }

    /// Set the managed-by reference
    pub fn with_managed_by_ref(mut self, reference: impl Into<String>) -> Self {
        let reference = reference.into();
        self.managed_by_ref = (!reference.trim().is_empty()).then_some(reference);
        self
    }

    /// Set the domain filter
    pub fn with_domain_filter(mut self, domain_filter: DomainFilter) -> Self {
        self.domain_filter = domain_filter;
        self
    }

    /// Enable or disable dry-run mode
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Load configuration from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup
    ///
    /// The configuration is validated before it is returned.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key).ok_or_else(|| {
                Error::config(format!("no value was found in environment variable {key}"))
            })
        };

        let dry_run = match lookup(ENV_DRY_RUN) {
            Some(value) => parse_bool(ENV_DRY_RUN, &value)?,
            None => false,
        };

        let config = Self::new(required(ENV_URL)?, required(ENV_USER)?, required(ENV_PASSWORD)?)
            .with_managed_by_ref(lookup(ENV_MANAGED_BY_REF).unwrap_or_default())
            .with_domain_filter(DomainFilter::new(
                split_list(lookup(ENV_DOMAIN_FILTER)),
                split_list(lookup(ENV_EXCLUDE_DOMAINS)),
            ))
            .with_dry_run(dry_run);

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if !self.url.starts_with("http://") && !self.url.starts_with("https://") {
            return Err(Error::config(format!(
                "{ENV_URL} must use HTTP or HTTPS scheme. Got: {}",
                self.url
            )));
        }

        if self.url.trim_end_matches(CONTROL_PATH).ends_with("://") {
            return Err(Error::config(format!("{ENV_URL} has no host. Got: {}", self.url)));
        }

        if self.user.is_empty() {
            return Err(Error::config(format!("{ENV_USER} cannot be empty")));
        }

        Ok(())
    }

    /// Ownership tag derived from the configured reference
    pub fn managed_by(&self) -> ManagedBy {
        ManagedBy::new(self.managed_by_ref.as_deref())
    }
}

/// Make sure the URL ends with `/control/`
pub fn normalize_url(url: &str) -> String {
    let mut url = url.trim().to_string();
    if !url.ends_with('/') {
        url.push('/');
    }
    if !url.ends_with(CONTROL_PATH) {
        url.push_str(CONTROL_PATH);
    }
    url
}

fn split_list(value: Option<String>) -> Vec<String> {
    value
        .unwrap_or_default()
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" | "" => Ok(false),
        other => Err(Error::config(format!(
            "{key} '{other}' is not a boolean. Valid values: true, false, 1, 0, yes, no"
        ))),
    }
}
