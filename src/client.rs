//! Authenticated transport for Tencent Cloud JSON APIs.
//!
//! Collectors only depend on the [`ApiTransport`] trait: submit one request,
//! get back a decoded response body or a typed [`ApiError`]. The production
//! implementation signs requests with the TC3-HMAC-SHA256 scheme and speaks
//! HTTPS via `reqwest`; tests substitute canned transports.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use reqwest::Client;
use serde_json::Value;
use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::credentials::Credentials;

type HmacSha256 = Hmac<Sha256>;

/// Errors returned by an [`ApiTransport`] call.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The provider accepted the request but rejected it logically: a 2xx
    /// response whose body carries `Response.Error`.
    #[error("API error: code={code}, message={message}")]
    Api { code: String, message: String },

    /// Non-2xx status code from the endpoint.
    #[error("API HTTP error: status={status}, body={body}")]
    Http { status: u16, body: String },

    #[error("Network error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Request signing error: {0}")]
    Signing(String),
}

impl ApiError {
    /// Structured provider errors (rate limits, invalid parameters) are part
    /// of normal operation; transport, decode, and signing failures are not.
    pub fn is_structured(&self) -> bool {
        matches!(self, ApiError::Api { .. })
    }
}

/// One list-API request, fully described by its service coordinates and
/// JSON payload.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    pub service: &'static str,
    pub host: &'static str,
    pub action: &'static str,
    pub version: &'static str,
    pub payload: Value,
}

/// The "make authenticated API call" primitive consumed by collectors.
#[async_trait]
pub trait ApiTransport: Send + Sync {
    async fn call(&self, region: &str, request: &ApiRequest) -> Result<Value, ApiError>;
}

/// TC3-signed HTTPS client bound to one set of credentials.
pub struct CloudClient {
    credentials: Credentials,
    client: Client,
}

impl CloudClient {
    pub fn new(credentials: Credentials) -> Result<Self, ApiError> {
        let client = Client::builder()
            .use_rustls_tls()
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            credentials,
            client,
        })
    }

    /// TC3-HMAC-SHA256 signature algorithm.
    fn sign(
        &self,
        service: &str,
        host: &str,
        action: &str,
        payload: &str,
        timestamp: i64,
    ) -> Result<String, ApiError> {
        let date = DateTime::from_timestamp(timestamp, 0)
            .ok_or_else(|| ApiError::Signing(format!("invalid timestamp {timestamp}")))?
            .format("%Y-%m-%d")
            .to_string();

        // Step 1: canonical request
        let canonical_uri = "/";
        let canonical_querystring = "";
        let canonical_headers = format!(
            "content-type:application/json\nhost:{}\nx-tc-action:{}\n",
            host,
            action.to_lowercase()
        );
        let signed_headers = "content-type;host;x-tc-action";

        let hashed_payload = format!("{:x}", Sha256::digest(payload.as_bytes()));
        let canonical_request = format!(
            "POST\n{}\n{}\n{}\n{}\n{}",
            canonical_uri, canonical_querystring, canonical_headers, signed_headers, hashed_payload
        );
        let hashed_canonical_request =
            format!("{:x}", Sha256::digest(canonical_request.as_bytes()));

        // Step 2: string to sign
        let credential_scope = format!("{}/{}/tc3_request", date, service);
        let string_to_sign = format!(
            "TC3-HMAC-SHA256\n{}\n{}\n{}",
            timestamp, credential_scope, hashed_canonical_request
        );

        // Step 3: chained signature
        let secret_date = hmac_sha256(
            format!("TC3{}", self.credentials.secret_key()).as_bytes(),
            date.as_bytes(),
        )?;
        let secret_service = hmac_sha256(&secret_date, service.as_bytes())?;
        let secret_signing = hmac_sha256(&secret_service, b"tc3_request")?;
        let signature = hex::encode(hmac_sha256(&secret_signing, string_to_sign.as_bytes())?);

        // Step 4: authorization header
        Ok(format!(
            "TC3-HMAC-SHA256 Credential={}/{}, SignedHeaders={}, Signature={}",
            self.credentials.secret_id(),
            credential_scope,
            signed_headers,
            signature
        ))
    }
}

#[async_trait]
impl ApiTransport for CloudClient {
    async fn call(&self, region: &str, request: &ApiRequest) -> Result<Value, ApiError> {
        let payload = request.payload.to_string();
        let timestamp = Utc::now().timestamp();
        let authorization =
            self.sign(request.service, request.host, request.action, &payload, timestamp)?;

        let url = format!("https://{}/", request.host);
        let mut http_request = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .header("Host", request.host)
            .header("X-TC-Action", request.action)
            .header("X-TC-Version", request.version)
            .header("X-TC-Timestamp", timestamp.to_string())
            .header("X-TC-Region", region)
            .header("Authorization", authorization);

        if let Some(token) = self.credentials.token() {
            http_request = http_request.header("X-TC-Token", token);
        }

        let response = http_request.body(payload).send().await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(ApiError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let json: Value = serde_json::from_str(&body)?;

        if let Some(error) = json.pointer("/Response/Error") {
            let code = error
                .get("Code")
                .and_then(Value::as_str)
                .unwrap_or("Unknown")
                .to_string();
            let message = error
                .get("Message")
                .and_then(Value::as_str)
                .unwrap_or("Unknown")
                .to_string();
            return Err(ApiError::Api { code, message });
        }

        Ok(json)
    }
}

fn hmac_sha256(key: &[u8], data: &[u8]) -> Result<Vec<u8>, ApiError> {
    let mut mac =
        HmacSha256::new_from_slice(key).map_err(|e| ApiError::Signing(e.to_string()))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().to_vec())
}
