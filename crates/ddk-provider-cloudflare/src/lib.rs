// # Cloudflare DNS Provider
//
// Record updater for Cloudflare using the v4 REST API.
//
// The record is looked up by name and type on every reconciliation. An
// absent record is created, a record with different content is replaced,
// a matching record is left alone.
//
// ## Parameters (`api_param`)
//
// | key              | required | notes                                  |
// |------------------|----------|----------------------------------------|
// | `api_token`      | one of   | scoped API token (bearer)              |
// | `api_key`+`email`| one of   | legacy global API key                  |
// | `zone_id`        | yes      | zone identifier                        |
// | `record_type`    | yes      | `A` or `AAAA`                          |
// | `record_name`    | yes      | host part, `@` for the apex            |
// | `domain`         | yes      | zone name, e.g. `example.com`          |
// | `record_ttl`     | yes      | seconds, `1` means automatic           |
// | `record_proxied` | yes      | route through Cloudflare's proxy       |
// | `api_base`       | no       | default `https://api.cloudflare.com/client/v4` |
// | `request_timeout_secs` | no | per-request timeout, default 10      |
//
// ## Security
//
// - Credentials NEVER appear in logs or Debug output
//
// ## API Reference
//
// - Cloudflare API v4: https://developers.cloudflare.com/api/
// - List DNS Records: GET `/zones/:zone_id/dns_records?type=...&name=...`
// - Create DNS Record: POST `/zones/:zone_id/dns_records`
// - Update DNS Record: PUT `/zones/:zone_id/dns_records/:record_id`

use async_trait::async_trait;
use ddk_core::traits::{AddressRecordType, RecordUpdater, RemoteRecord, UpdateResult, UpdaterFactory};
use ddk_core::{ApiParams, ChangeTracker, Error, Result, UpdaterRegistry};
use serde::Deserialize;
use serde_json::Value;
use std::net::IpAddr;
use std::time::Duration;

/// Registrar name used in `domain_registrar`
pub const REGISTRAR: &str = "cloudflare";

/// Cloudflare API base URL
pub const CLOUDFLARE_API_BASE: &str = "https://api.cloudflare.com/client/v4";

/// TCP connect timeout
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Overall request timeout unless `request_timeout_secs` is set
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// How requests are authenticated
#[derive(Clone)]
enum Credentials {
    /// `Authorization: Bearer <token>`
    Token(String),
    /// `X-Auth-Email` / `X-Auth-Key`
    GlobalKey { email: String, api_key: String },
}

impl Credentials {
    fn from_params(params: &ApiParams) -> Result<Self> {
        if let Some(token) = params.optional_str("api_token")? {
            return Ok(Self::Token(token));
        }

        let api_key = params.optional_str("api_key")?;
        let email = params.optional_str("email")?;
        match (api_key, email) {
            (Some(api_key), Some(email)) => Ok(Self::GlobalKey { email, api_key }),
            (Some(_), None) => Err(Error::missing_param("email")),
            (None, Some(_)) => Err(Error::missing_param("api_key")),
            (None, None) => Err(Error::missing_param("api_token")),
        }
    }

    fn apply(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self {
            Self::Token(token) => request.bearer_auth(token),
            Self::GlobalKey { email, api_key } => request
                .header("X-Auth-Email", email)
                .header("X-Auth-Key", api_key),
        }
    }

    fn kind(&self) -> &'static str {
        match self {
            Self::Token(_) => "api_token",
            Self::GlobalKey { .. } => "api_key",
        }
    }
}

/// API response envelope
#[derive(Debug, Default, Deserialize)]
struct Envelope {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    errors: Vec<ApiMessage>,
    #[serde(default)]
    result: Value,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

impl Envelope {
    fn describe_errors(&self) -> String {
        if self.errors.is_empty() {
            return "no error details".to_string();
        }
        self.errors
            .iter()
            .map(|e| format!("{}: {}", e.code, e.message))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// DNS record as returned by the list endpoint (fields we use)
#[derive(Debug, Deserialize)]
struct DnsRecord {
    id: String,
    name: String,
    content: String,
    #[serde(default)]
    ttl: Option<u32>,
}

impl From<DnsRecord> for RemoteRecord {
    fn from(record: DnsRecord) -> Self {
        RemoteRecord {
            id: record.id,
            name: record.name,
            content: record.content,
            ttl: record.ttl,
        }
    }
}

/// Cloudflare record updater
///
/// # Security
///
/// The Debug implementation does NOT expose credentials.
pub struct CloudflareUpdater {
    /// ⚠️ NEVER log this value
    credentials: Credentials,
    zone_id: String,
    record_type: AddressRecordType,
    fqdn: String,
    record_ttl: i64,
    record_proxied: bool,
    api_base: String,
    client: reqwest::Client,
    tracker: ChangeTracker,
}

impl std::fmt::Debug for CloudflareUpdater {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudflareUpdater")
            .field("credentials", &format_args!("<REDACTED {}>", self.credentials.kind()))
            .field("zone_id", &self.zone_id)
            .field("record_type", &self.record_type)
            .field("fqdn", &self.fqdn)
            .field("record_ttl", &self.record_ttl)
            .field("record_proxied", &self.record_proxied)
            .field("api_base", &self.api_base)
            .finish()
    }
}

impl CloudflareUpdater {
    /// Build an updater from `api_param`
    ///
    /// No network I/O happens here.
    pub fn from_params(params: &ApiParams) -> Result<Self> {
        let credentials = Credentials::from_params(params)?;
        let zone_id = params.required_str("zone_id")?;
        let record_type = AddressRecordType::parse("record_type", &params.required_str("record_type")?)?;
        let record_name = params.required_str("record_name")?;
        let domain = params.required_str("domain")?;
        let record_ttl = params.required_i64("record_ttl")?;
        if record_ttl < 1 {
            return Err(Error::invalid_param("record_ttl", "must be 1 (automatic) or a number of seconds"));
        }
        let record_proxied = params.required_bool("record_proxied")?;

        let api_base = params
            .optional_str("api_base")?
            .unwrap_or_else(|| CLOUDFLARE_API_BASE.to_string())
            .trim_end_matches('/')
            .to_string();

        let request_timeout = params
            .optional_secs("request_timeout_secs")?
            .unwrap_or(REQUEST_TIMEOUT);

        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT.min(request_timeout))
            .timeout(request_timeout)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            credentials,
            zone_id,
            record_type,
            fqdn: fqdn(&record_name, &domain),
            record_ttl,
            record_proxied,
            api_base,
            client,
            tracker: ChangeTracker::new(),
        })
    }

    /// Fully qualified record name
    pub fn fqdn(&self) -> &str {
        &self.fqdn
    }

    /// Address last seen on, or written to, Cloudflare
    pub fn last_confirmed(&self) -> Option<IpAddr> {
        self.tracker.last_confirmed()
    }

    fn records_url(&self) -> String {
        format!("{}/zones/{}/dns_records", self.api_base, self.zone_id)
    }

    fn record_body(&self, address: IpAddr) -> Value {
        serde_json::json!({
            "type": self.record_type.as_str(),
            "name": self.fqdn,
            "content": address.to_string(),
            "ttl": self.record_ttl,
            "proxied": self.record_proxied,
        })
    }

    /// Look the record up by name and type
    ///
    /// # API Call
    ///
    /// ```http
    /// GET /zones/:zone_id/dns_records?type=A&name=home.example.com
    /// ```
    async fn find_record(&self) -> Result<Option<RemoteRecord>> {
        tracing::debug!("Looking up Cloudflare record {} ({})", self.fqdn, self.record_type);

        let request = self
            .client
            .get(self.records_url())
            .query(&[("type", self.record_type.as_str()), ("name", self.fqdn.as_str())]);

        let result = self.send(request, "record lookup").await?;
        let records: Vec<DnsRecord> = serde_json::from_value(result).map_err(|e| {
            Error::provider(REGISTRAR, format!("Invalid response format: result is not a record list: {}", e))
        })?;

        Ok(records.into_iter().next().map(RemoteRecord::from))
    }

    /// # API Call
    ///
    /// ```http
    /// POST /zones/:zone_id/dns_records
    /// ```
    async fn create_record(&self, address: IpAddr) -> Result<()> {
        let request = self.client.post(self.records_url()).json(&self.record_body(address));
        self.send(request, "record create").await?;
        Ok(())
    }

    /// # API Call
    ///
    /// ```http
    /// PUT /zones/:zone_id/dns_records/:record_id
    /// ```
    async fn replace_record(&self, record_id: &str, address: IpAddr) -> Result<()> {
        let url = format!("{}/{}", self.records_url(), record_id);
        let request = self.client.put(url).json(&self.record_body(address));
        self.send(request, "record update").await?;
        Ok(())
    }

    /// Send an authenticated request and unwrap the envelope's `result`
    async fn send(&self, request: reqwest::RequestBuilder, what: &str) -> Result<Value> {
        let response = self
            .credentials
            .apply(request)
            .send()
            .await
            .map_err(request_error)?;

        let status = response.status();
        let text = response.text().await.map_err(request_error)?;

        if !status.is_success() {
            let envelope: Envelope = serde_json::from_str(&text).unwrap_or_default();
            return Err(status_error(status.as_u16(), what, &envelope.describe_errors()));
        }

        let envelope: Envelope = serde_json::from_str(&text)
            .map_err(|e| Error::provider(REGISTRAR, format!("Failed to parse {} response: {}", what, e)))?;

        if !envelope.success {
            return Err(Error::provider(
                REGISTRAR,
                format!("{} was not successful: {}", what, envelope.describe_errors()),
            ));
        }

        Ok(envelope.result)
    }
}

#[async_trait]
impl RecordUpdater for CloudflareUpdater {
    async fn reconcile(&mut self, address: IpAddr) -> Result<UpdateResult> {
        self.record_type.check(address)?;

        let current = self.find_record().await?;
        let observed = current.as_ref().and_then(RemoteRecord::address);
        if self.tracker.drifted(observed) {
            tracing::warn!(
                "Cloudflare record {} changed outside ddk (last confirmed {:?}, now {:?})",
                self.fqdn,
                self.tracker.last_confirmed(),
                observed
            );
        }
        self.tracker.observe_remote(observed);

        let Some(current) = current else {
            tracing::info!("Creating Cloudflare record {} -> {}", self.fqdn, address);
            self.create_record(address).await?;
            self.tracker.confirm(address);
            return Ok(UpdateResult::Created { new_ip: address });
        };

        if current.points_at(address) {
            tracing::debug!("Cloudflare record {} already points at {}", self.fqdn, address);
            return Ok(UpdateResult::Unchanged { current_ip: address });
        }

        match self.tracker.last_confirmed() {
            Some(previous) => tracing::info!(
                "Updating Cloudflare record {} from {} to {}",
                self.fqdn,
                previous,
                address
            ),
            None => tracing::info!(
                "Updating Cloudflare record {} from '{}' to {}",
                self.fqdn,
                current.content,
                address
            ),
        }

        self.replace_record(&current.id, address).await?;
        self.tracker.confirm(address);

        Ok(UpdateResult::Updated {
            previous_ip: current.address(),
            new_ip: address,
        })
    }

    fn registrar(&self) -> &'static str {
        REGISTRAR
    }

    fn record_label(&self) -> String {
        format!("{}/{}", self.fqdn, self.record_type)
    }
}

/// Factory for creating Cloudflare updaters
pub struct CloudflareFactory;

impl UpdaterFactory for CloudflareFactory {
    fn create(&self, params: &ApiParams) -> Result<Box<dyn RecordUpdater>> {
        Ok(Box::new(CloudflareUpdater::from_params(params)?))
    }
}

/// Register the Cloudflare updater with a registry
///
/// This function should be called during initialization to make the
/// Cloudflare updater available.
///
/// # Example
///
/// ```rust
/// use ddk_core::UpdaterRegistry;
///
/// let registry = UpdaterRegistry::new();
/// ddk_provider_cloudflare::register(&registry);
/// assert!(registry.has("cloudflare"));
/// ```
pub fn register(registry: &UpdaterRegistry) {
    registry.register(REGISTRAR, Box::new(CloudflareFactory));
}

/// `domain` for the apex (`@` or the domain itself), else `name.domain`
fn fqdn(record_name: &str, domain: &str) -> String {
    if record_name == "@" || record_name == domain {
        domain.to_string()
    } else {
        format!("{}.{}", record_name, domain)
    }
}

fn request_error(e: reqwest::Error) -> Error {
    if e.is_builder() {
        Error::provider(REGISTRAR, format!("Invalid request: {}", e))
    } else {
        Error::transient(format!("Cloudflare request failed: {}", e))
    }
}

/// Map HTTP status codes to specific errors
fn status_error(status: u16, what: &str, details: &str) -> Error {
    match status {
        401 | 403 => Error::auth(format!(
            "Invalid credentials or insufficient permissions ({} returned {}): {}",
            what, status, details
        )),
        404 => Error::not_found(format!("{} returned 404: {}", what, details)),
        429 => Error::transient(format!("Rate limit exceeded ({}): {}", what, details)),
        500..=599 => Error::transient(format!("Cloudflare server error {} ({}): {}", status, what, details)),
        _ => Error::provider(REGISTRAR, format!("{} failed with {}: {}", what, status, details)),
    }
}
