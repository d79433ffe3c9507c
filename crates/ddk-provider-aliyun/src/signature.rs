// # Alidns RPC Signature (v1)
//
// Every request is a GET whose query string carries the action parameters,
// the common parameters and a `Signature`:
//
// 1. Sort all parameters by key
// 2. Percent-encode keys and values (RFC 3986, `~` unreserved, space as %20)
// 3. Join as `k=v&k=v` to get the canonical query
// 4. String to sign: `GET&%2F&` + encode(canonical query)
// 5. Signature: base64(HMAC-SHA1(secret + "&", string to sign))
//
// Reference: https://www.alibabacloud.com/help/en/sdk/product-overview/rpc-mechanism

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use hmac::{Hmac, Mac};
use percent_encoding::{AsciiSet, NON_ALPHANUMERIC, utf8_percent_encode};
use sha1::Sha1;
use std::collections::BTreeMap;

use ddk_core::{Error, Result};

/// Everything except `A-Z a-z 0-9 - _ . ~`
const RFC3986: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'~');

type HmacSha1 = Hmac<Sha1>;

/// RFC 3986 percent-encoding
pub fn encode(value: &str) -> String {
    utf8_percent_encode(value, RFC3986).to_string()
}

/// Sorted, encoded `k=v&k=v` query
pub fn canonical_query(params: &BTreeMap<String, String>) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{}={}", encode(k), encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

/// String to sign for a GET request
pub fn string_to_sign(params: &BTreeMap<String, String>) -> String {
    format!("GET&{}&{}", encode("/"), encode(&canonical_query(params)))
}

/// Base64 HMAC-SHA1 signature over `params`
///
/// `params` must not already contain `Signature`.
pub fn sign(secret: &str, params: &BTreeMap<String, String>) -> Result<String> {
    let key = format!("{}&", secret);
    let mut mac = HmacSha1::new_from_slice(key.as_bytes())
        .map_err(|e| Error::provider("aliyun", format!("cannot initialise HMAC: {}", e)))?;
    mac.update(string_to_sign(params).as_bytes());
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}
