// # Aliyun DNS Provider
//
// Record updater for Alibaba Cloud DNS (Alidns) using the signed RPC API.
//
// The record is addressed by its `record_id`: every reconciliation reads it
// with `DescribeDomainRecordInfo` and writes with `UpdateDomainRecord` only
// when the value differs. Records are never created or deleted here.
//
// ## Parameters (`api_param`)
//
// | key           | required | notes                               |
// |---------------|----------|-------------------------------------|
// | `key_id`      | yes      | AccessKey ID                        |
// | `key_secret`  | yes      | AccessKey secret, never logged      |
// | `record_id`   | yes      | Alidns record identifier            |
// | `record_rr`   | yes      | host part, e.g. `home` or `@`       |
// | `record_type` | yes      | `A` or `AAAA`                       |
// | `domain_name` | yes      | zone, e.g. `example.com`            |
// | `record_ttl`  | yes      | integer or numeric string           |
// | `record_line` | no       | resolution line, default `default`  |
// | `endpoint`    | no       | default `alidns.aliyuncs.com`       |
// | `request_timeout_secs` | no | per-request timeout, default 10 |
//
// ## API Reference
//
// - DescribeDomainRecordInfo: https://www.alibabacloud.com/help/en/dns/api-alidns-2015-01-09-describedomainrecordinfo
// - UpdateDomainRecord: https://www.alibabacloud.com/help/en/dns/api-alidns-2015-01-09-updatedomainrecord

pub mod signature;

use async_trait::async_trait;
use chrono::Utc;
use ddk_core::traits::{AddressRecordType, RecordUpdater, RemoteRecord, UpdateResult, UpdaterFactory};
use ddk_core::{ApiParams, ChangeTracker, Error, Result, UpdaterRegistry};
use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::net::IpAddr;
use std::time::Duration;

/// Registrar name used in `domain_registrar`
pub const REGISTRAR: &str = "aliyun";

/// Default Alidns endpoint
pub const DEFAULT_ENDPOINT: &str = "alidns.aliyuncs.com";

/// Default resolution line
pub const DEFAULT_RECORD_LINE: &str = "default";

/// Alidns API version
const API_VERSION: &str = "2015-01-09";

/// TCP connect timeout
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Overall request timeout unless `request_timeout_secs` is set
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Alidns error body
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(rename = "Code", default)]
    code: String,
    #[serde(rename = "Message", default)]
    message: String,
}

/// `DescribeDomainRecordInfo` response (fields we use)
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct RecordInfo {
    record_id: String,
    #[serde(rename = "RR")]
    rr: String,
    value: String,
    #[serde(rename = "TTL", default)]
    ttl: Option<u32>,
}

/// Aliyun record updater
///
/// # Security
///
/// The Debug implementation does NOT expose the AccessKey secret.
pub struct AliyunUpdater {
    key_id: String,
    /// ⚠️ NEVER log this value
    key_secret: String,
    record_id: String,
    record_rr: String,
    record_type: AddressRecordType,
    domain_name: String,
    record_ttl: i64,
    record_line: String,
    endpoint: String,
    client: reqwest::Client,
    tracker: ChangeTracker,
}

impl std::fmt::Debug for AliyunUpdater {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AliyunUpdater")
            .field("key_id", &self.key_id)
            .field("key_secret", &"<REDACTED>")
            .field("record_id", &self.record_id)
            .field("record_rr", &self.record_rr)
            .field("record_type", &self.record_type)
            .field("domain_name", &self.domain_name)
            .field("record_ttl", &self.record_ttl)
            .field("record_line", &self.record_line)
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

impl AliyunUpdater {
    /// Build an updater from `api_param`
    ///
    /// No network I/O happens here.
    pub fn from_params(params: &ApiParams) -> Result<Self> {
        let key_id = params.required_str("key_id")?;
        let key_secret = params.required_str("key_secret")?;
        let record_id = params.required_str("record_id")?;
        let record_rr = params.required_str("record_rr")?;
        let record_type = AddressRecordType::parse("record_type", &params.required_str("record_type")?)?;
        let domain_name = params.required_str("domain_name")?;
        let record_ttl = params.required_i64("record_ttl")?;
        if record_ttl <= 0 {
            return Err(Error::invalid_param("record_ttl", "must be a positive number of seconds"));
        }

        let record_line = params
            .optional_str("record_line")?
            .unwrap_or_else(|| DEFAULT_RECORD_LINE.to_string());
        let endpoint = normalize_endpoint(
            &params
                .optional_str("endpoint")?
                .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
        );

        let request_timeout = params
            .optional_secs("request_timeout_secs")?
            .unwrap_or(REQUEST_TIMEOUT);

        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT.min(request_timeout))
            .timeout(request_timeout)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            key_id,
            key_secret,
            record_id,
            record_rr,
            record_type,
            domain_name,
            record_ttl,
            record_line,
            endpoint,
            client,
            tracker: ChangeTracker::new(),
        })
    }

    /// Fully qualified record name
    pub fn fqdn(&self) -> String {
        if self.record_rr == "@" {
            self.domain_name.clone()
        } else {
            format!("{}.{}", self.record_rr, self.domain_name)
        }
    }

    /// Address last seen on, or written to, Alidns
    pub fn last_confirmed(&self) -> Option<IpAddr> {
        self.tracker.last_confirmed()
    }

    /// Read the record by identifier
    ///
    /// # API Call
    ///
    /// ```http
    /// GET /?Action=DescribeDomainRecordInfo&RecordId=...&<common>&Signature=...
    /// ```
    async fn describe_record(&self) -> Result<RemoteRecord> {
        tracing::debug!("Describing Aliyun record {}", self.record_id);

        let body = self
            .call(
                "DescribeDomainRecordInfo",
                vec![("RecordId", self.record_id.clone())],
            )
            .await?;

        let info: RecordInfo = serde_json::from_value(body)
            .map_err(|e| Error::provider(REGISTRAR, format!("Invalid DescribeDomainRecordInfo response: {}", e)))?;

        Ok(RemoteRecord {
            id: info.record_id,
            name: info.rr,
            content: info.value,
            ttl: info.ttl,
        })
    }

    /// Write `address` to the record
    ///
    /// # API Call
    ///
    /// ```http
    /// GET /?Action=UpdateDomainRecord&RecordId=...&RR=...&Type=...&Value=...&TTL=...&Line=...
    /// ```
    async fn update_record(&self, address: IpAddr) -> Result<()> {
        self.call(
            "UpdateDomainRecord",
            vec![
                ("RecordId", self.record_id.clone()),
                ("RR", self.record_rr.clone()),
                ("Type", self.record_type.as_str().to_string()),
                ("Value", address.to_string()),
                ("TTL", self.record_ttl.to_string()),
                ("Line", self.record_line.clone()),
            ],
        )
        .await?;
        Ok(())
    }

    /// Sign and send one RPC call, returning the decoded JSON body
    async fn call(&self, action: &str, action_params: Vec<(&str, String)>) -> Result<Value> {
        let mut params: BTreeMap<String, String> = BTreeMap::new();
        params.insert("Action".to_string(), action.to_string());
        params.insert("Format".to_string(), "JSON".to_string());
        params.insert("Version".to_string(), API_VERSION.to_string());
        params.insert("AccessKeyId".to_string(), self.key_id.clone());
        params.insert("SignatureMethod".to_string(), "HMAC-SHA1".to_string());
        params.insert("SignatureVersion".to_string(), "1.0".to_string());
        params.insert("SignatureNonce".to_string(), uuid::Uuid::new_v4().to_string());
        params.insert(
            "Timestamp".to_string(),
            Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string(),
        );
        for (key, value) in action_params {
            params.insert(key.to_string(), value);
        }

        let signature = signature::sign(&self.key_secret, &params)?;
        let url = format!(
            "{}/?{}&Signature={}",
            self.endpoint,
            signature::canonical_query(&params),
            signature::encode(&signature)
        );

        let response = self.client.get(&url).send().await.map_err(request_error)?;
        let status = response.status();
        let text = response.text().await.map_err(request_error)?;

        if !status.is_success() {
            return Err(api_error(status.as_u16(), &text));
        }

        serde_json::from_str(&text)
            .map_err(|e| Error::provider(REGISTRAR, format!("Failed to parse {} response: {}", action, e)))
    }
}

#[async_trait]
impl RecordUpdater for AliyunUpdater {
    async fn reconcile(&mut self, address: IpAddr) -> Result<UpdateResult> {
        self.record_type.check(address)?;

        let current = self.describe_record().await?;
        let previous_ip = current.address();
        if self.tracker.drifted(previous_ip) {
            tracing::warn!(
                "Aliyun record {} changed outside ddk (last confirmed {:?}, now {:?})",
                self.fqdn(),
                self.tracker.last_confirmed(),
                previous_ip
            );
        }
        self.tracker.observe_remote(previous_ip);

        if current.points_at(address) {
            tracing::debug!("Aliyun record {} already points at {}", self.fqdn(), address);
            return Ok(UpdateResult::Unchanged { current_ip: address });
        }

        match self.tracker.last_confirmed() {
            Some(previous) => tracing::info!(
                "Updating Aliyun record {} from {} to {}",
                self.fqdn(),
                previous,
                address
            ),
            None => tracing::info!(
                "Updating Aliyun record {} from '{}' to {}",
                self.fqdn(),
                current.content,
                address
            ),
        }

        self.update_record(address).await?;
        self.tracker.confirm(address);

        Ok(UpdateResult::Updated {
            previous_ip,
            new_ip: address,
        })
    }

    fn registrar(&self) -> &'static str {
        REGISTRAR
    }

    fn record_label(&self) -> String {
        format!("{}/{}", self.fqdn(), self.record_type)
    }
}

/// Factory for creating Aliyun updaters
pub struct AliyunFactory;

impl UpdaterFactory for AliyunFactory {
    fn create(&self, params: &ApiParams) -> Result<Box<dyn RecordUpdater>> {
        Ok(Box::new(AliyunUpdater::from_params(params)?))
    }
}

/// Register the Aliyun updater with a registry
///
/// # Example
///
/// ```rust
/// use ddk_core::UpdaterRegistry;
///
/// let registry = UpdaterRegistry::new();
/// ddk_provider_aliyun::register(&registry);
/// assert!(registry.has("aliyun"));
/// ```
pub fn register(registry: &UpdaterRegistry) {
    registry.register(REGISTRAR, Box::new(AliyunFactory));
}

fn normalize_endpoint(endpoint: &str) -> String {
    let endpoint = endpoint.trim().trim_end_matches('/');
    if endpoint.contains("://") {
        endpoint.to_string()
    } else {
        format!("https://{}", endpoint)
    }
}

fn request_error(e: reqwest::Error) -> Error {
    if e.is_builder() {
        Error::provider(REGISTRAR, format!("Invalid request: {}", e))
    } else {
        Error::transient(format!("Aliyun request failed: {}", e))
    }
}

/// Map an Alidns error response to the error taxonomy
fn api_error(status: u16, body: &str) -> Error {
    let ErrorBody { code, message } = serde_json::from_str(body).unwrap_or_default();
    classify(status, &code, &message)
}

fn classify(status: u16, code: &str, message: &str) -> Error {
    let detail = if code.is_empty() {
        format!("HTTP {}", status)
    } else {
        format!("{} (HTTP {}): {}", code, status, message)
    };

    if code.starts_with("InvalidAccessKeyId")
        || code == "SignatureDoesNotMatch"
        || code.starts_with("Forbidden")
        || code == "IncompleteSignature"
    {
        Error::auth(detail)
    } else if code == "DomainRecordNotBelongToUser" || code.starts_with("InvalidRecordId") {
        Error::not_found(detail)
    } else if code.starts_with("Throttling")
        || code == "ServiceUnavailable"
        || code == "InternalError"
        || status >= 500
    {
        Error::transient(detail)
    } else {
        Error::provider(REGISTRAR, detail)
    }
}
