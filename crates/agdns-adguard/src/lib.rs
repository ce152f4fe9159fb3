// # AdGuard Home Rule Store
//
// This crate provides the AdGuard Home HTTP client used as the rule store of
// the external-dns provider.
//
// ## Behavior
//
// - One HTTP request per store call; errors are returned to the caller as-is
// - HTTP timeout configured (30 seconds)
// - Status codes mapped to specific errors (401, 403, 429, other non-200)
// - Dry-run mode: reads are performed, writes are logged instead of sent
// - No retries, no caching; external-dns repeats the whole sync on failure
//
// ## Trust Level: Untrusted (Rule Store)
//
// **Allowed Capabilities**:
// - ✅ Perform HTTP/HTTPS calls to the configured AdGuard Home only
// - ✅ Decode AdGuard Home responses
//
// **Forbidden Capabilities**:
// - ❌ Interpret rule contents (owned by the reconciler)
// - ❌ Retry or back off
// - ❌ Spawn tasks or threads
//
// ## Security Requirements
//
// - The password NEVER appears in logs or `Debug` output
// - Credentials come from environment variables only
//
// ## API Reference
//
// - Server status: GET `/control/status`
// - Read user rules: GET `/control/filtering/status`
// - Replace user rules: POST `/control/filtering/set_rules`

use agdns_core::config::ProviderConfig;
use agdns_core::traits::RuleStore;
use agdns_core::{Error, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default HTTP timeout for API requests (30 seconds)
const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

const STATUS_PATH: &str = "status";
const FILTERING_STATUS_PATH: &str = "filtering/status";
const SET_RULES_PATH: &str = "filtering/set_rules";

/// Response body of `GET /control/filtering/status`
///
/// Only the user rules are of interest; every other field is ignored.
#[derive(Debug, Default, Deserialize)]
struct FilteringStatus {
    #[serde(default)]
    user_rules: Option<Vec<String>>,
}

/// Request body of `POST /control/filtering/set_rules`
#[derive(Debug, Serialize)]
struct SetRulesRequest<'a> {
    rules: &'a [String],
}

/// AdGuard Home API client
///
/// # Trust Level: Untrusted
///
/// The client is stateless apart from its connection pool. All decisions
/// about which rules to write are made by the reconciler.
///
/// # Dry-Run Mode
///
/// When `dry_run` is true, the client will:
/// - Perform all GET requests
/// - Log the intended `set_rules` payload
/// - **NOT** modify the rule list
pub struct AdGuardHomeClient {
    /// Control API base URL, ending in `/control/`
    base_url: String,

    /// Basic auth user
    user: String,

    /// Basic auth password
    /// ⚠️ NEVER log this value
    password: String,

    /// HTTP client for API requests
    client: reqwest::Client,

    /// Dry-run mode: if true, read rules but skip writes
    dry_run: bool,
}

// Custom Debug implementation that hides the password
impl std::fmt::Debug for AdGuardHomeClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdGuardHomeClient")
            .field("base_url", &self.base_url)
            .field("user", &self.user)
            .field("password", &"<REDACTED>")
            .field("dry_run", &self.dry_run)
            .finish()
    }
}

impl AdGuardHomeClient {
    /// Create a client without contacting the server
    ///
    /// # Errors
    ///
    /// - `Error::Config` if the configuration is invalid
    /// - `Error::Http` if the HTTP client cannot be built
    pub fn new(config: &ProviderConfig) -> Result<Self> {
        config.validate()?;

        let client = reqwest::Client::builder()
            .timeout(DEFAULT_HTTP_TIMEOUT)
            .build()
            .map_err(|e| Error::http(format!("failed to build HTTP client: {e}")))?;

        if config.dry_run {
            tracing::warn!("AdGuard Home client running in DRY-RUN mode - rules will not be written");
        }

        Ok(Self {
            base_url: config.url.clone(),
            user: config.user.clone(),
            password: config.password.clone(),
            client,
            dry_run: config.dry_run,
        })
    }

    /// Create a client and verify that the server answers
    ///
    /// # API Call
    ///
    /// ```http
    /// GET /control/status
    /// Authorization: Basic <user:password>
    /// ```
    pub async fn connect(config: &ProviderConfig) -> Result<Self> {
        let client = Self::new(config)?;
        client.status().await?;
        tracing::info!(url = %client.base_url, "connected to AdGuard Home");
        Ok(client)
    }

    /// Probe the server status endpoint
    pub async fn status(&self) -> Result<()> {
        let response = self
            .request(reqwest::Method::GET, STATUS_PATH)
            .send()
            .await
            .map_err(|e| Error::http(format!("HTTP request failed: {e}")))?;

        check_status(response, "status").await?;
        Ok(())
    }

    /// Whether writes are skipped
    pub fn is_dry_run(&self) -> bool {
        self.dry_run
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, self.endpoint(path))
            .basic_auth(&self.user, Some(&self.password))
            .header("Content-Type", "application/json")
    }
}

/// Map a non-200 response to an error
async fn check_status(response: reqwest::Response, operation: &str) -> Result<reqwest::Response> {
    let status = response.status();
    if status == reqwest::StatusCode::OK {
        return Ok(response);
    }

    let error_text = response
        .text()
        .await
        .unwrap_or_else(|_| "Unable to read error response".to_string());

    Err(match status.as_u16() {
        401 | 403 => Error::auth(format!(
            "{operation}: invalid credentials or insufficient permissions. Status: {status}"
        )),
        429 => Error::rate_limited(format!("{operation}: too many requests. Status: {status}")),
        _ => Error::http(format!(
            "{operation}: unexpected status code {status} - {error_text}"
        )),
    })
}

#[async_trait]
impl RuleStore for AdGuardHomeClient {
    /// Fetch the user rules
    ///
    /// # API Call
    ///
    /// ```http
    /// GET /control/filtering/status
    /// ```
    async fn get_rules(&self) -> Result<Vec<String>> {
        let response = self
            .request(reqwest::Method::GET, FILTERING_STATUS_PATH)
            .send()
            .await
            .map_err(|e| Error::http(format!("HTTP request failed: {e}")))?;

        let response = check_status(response, "get rules").await?;
        let body = response
            .bytes()
            .await
            .map_err(|e| Error::http(format!("failed to read response: {e}")))?;
        let status: FilteringStatus = serde_json::from_slice(&body)?;

        let rules = status.user_rules.unwrap_or_default();
        tracing::debug!(count = rules.len(), "retrieved user rules");
        Ok(rules)
    }

    /// Replace the user rules
    ///
    /// # API Call (skipped in dry-run mode)
    ///
    /// ```http
    /// POST /control/filtering/set_rules
    /// { "rules": ["..."] }
    /// ```
    async fn save_rules(&self, rules: &[String]) -> Result<()> {
        let payload = SetRulesRequest { rules };

        if self.dry_run {
            tracing::info!(
                "[DRY-RUN] Would send POST request to {} with payload: {}",
                self.endpoint(SET_RULES_PATH),
                serde_json::to_string(&payload)?
            );
            return Ok(());
        }

        let response = self
            .request(reqwest::Method::POST, SET_RULES_PATH)
            .json(&payload)
            .send()
            .await
            .map_err(|e| Error::http(format!("HTTP request failed: {e}")))?;

        check_status(response, "set rules").await?;
        tracing::debug!(count = rules.len(), "user rules replaced");
        Ok(())
    }

    fn store_name(&self) -> &'static str {
        "adguardhome"
    }
}
