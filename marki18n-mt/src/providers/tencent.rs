//! Tencent Cloud Machine Translation (`TextTranslateBatch`)
//!
//! Every request is signed with TC3-HMAC-SHA256. Signing is a pure function
//! of the payload, the request timestamp and the credentials, see
//! [`sign_request`].
//!
//! Credentials come from the `[translate.tencent]` config table, or the
//! `TENCENTCLOUD_SECRET_ID` and `TENCENTCLOUD_SECRET_KEY` environment
//! variables (`TENCENTCLOUD_REGION` optionally overrides the region).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::debug;

use marki18n::TencentCredentials;

use crate::error::{MtError, MtResult};
use crate::translator::{MachineTranslator, UsageLimit, validate_locale};

use super::http_client;

const HOST: &str = "tmt.tencentcloudapi.com";
const SERVICE: &str = "tmt";
const ACTION: &str = "TextTranslateBatch";
const VERSION: &str = "2018-03-21";
const ALGORITHM: &str = "TC3-HMAC-SHA256";
const CONTENT_TYPE: &str = "application/json; charset=utf-8";
const SIGNED_HEADERS: &str = "content-type;host";

const SUPPORTED_LANGUAGES: &[&str] = &[
    "zh", "zh-TW", "en", "ja", "ko", "fr", "es", "it", "de", "tr", "ru", "pt", "vi", "id", "th",
    "ms", "ar", "hi",
];

type HmacSha256 = Hmac<Sha256>;

/// `Authorization` header value plus the timestamp it was computed for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tc3Signature {
    pub authorization: String,
    pub timestamp: i64,
}

/// Sign a `TextTranslateBatch` payload for `timestamp` (seconds since the epoch)
pub fn sign_request(
    payload: &str,
    timestamp: i64,
    credentials: &TencentCredentials,
) -> MtResult<Tc3Signature> {
    let date = DateTime::<Utc>::from_timestamp(timestamp, 0)
        .ok_or_else(|| MtError::ConfigError(format!("Invalid timestamp {}", timestamp)))?
        .format("%Y-%m-%d")
        .to_string();

    let canonical_request = format!(
        "POST\n/\n\ncontent-type:{}\nhost:{}\n\n{}\n{}",
        CONTENT_TYPE,
        HOST,
        SIGNED_HEADERS,
        sha256_hex(payload)
    );
    let credential_scope = format!("{}/{}/tc3_request", date, SERVICE);
    let string_to_sign = format!(
        "{}\n{}\n{}\n{}",
        ALGORITHM,
        timestamp,
        credential_scope,
        sha256_hex(&canonical_request)
    );

    let secret_date = hmac_sha256(format!("TC3{}", credentials.secret_key).as_bytes(), &date)?;
    let secret_service = hmac_sha256(&secret_date, SERVICE)?;
    let secret_signing = hmac_sha256(&secret_service, "tc3_request")?;
    let signature = hex(&hmac_sha256(&secret_signing, &string_to_sign)?);

    Ok(Tc3Signature {
        authorization: format!(
            "{} Credential={}/{}, SignedHeaders={}, Signature={}",
            ALGORITHM, credentials.secret_id, credential_scope, SIGNED_HEADERS, signature
        ),
        timestamp,
    })
}

fn sha256_hex(data: &str) -> String {
    hex(&Sha256::digest(data.as_bytes()))
}

fn hmac_sha256(key: &[u8], data: &str) -> MtResult<Vec<u8>> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| MtError::ConfigError(format!("Invalid signing key: {}", e)))?;
    mac.update(data.as_bytes());
    Ok(mac.finalize().into_bytes().to_vec())
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
struct BatchRequest<'a> {
    source: &'a str,
    target: &'a str,
    project_id: i64,
    source_text_list: &'a [String],
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct Envelope {
    response: BatchResponse,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct BatchResponse {
    #[serde(default)]
    target_text_list: Vec<String>,
    error: Option<ApiError>,
    #[serde(default)]
    request_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ApiError {
    code: String,
    message: String,
}

impl ApiError {
    fn into_mt_error(self, request_id: &str) -> MtError {
        let message = format!("{}: {} (request {})", self.code, self.message, request_id);
        if self.code.starts_with("AuthFailure") {
            MtError::AuthError(message)
        } else if self.code.starts_with("RequestLimitExceeded")
            || self.code.starts_with("LimitExceeded")
        {
            MtError::RateLimit(message)
        } else if self.code.starts_with("UnsupportedOperation")
            || self.code.starts_with("InvalidParameter")
            || self.code.starts_with("MissingParameter")
        {
            MtError::ConfigError(message)
        } else {
            MtError::NetworkError(message)
        }
    }
}

#[derive(Clone)]
pub struct TencentTranslateProvider {
    credentials: TencentCredentials,
    client: reqwest::Client,
}

impl TencentTranslateProvider {
    /// `TextTranslateBatch` accepts at most 6000 characters per request
    const MAX_CHARS_PER_REQUEST: usize = 6000;

    const MAX_BATCH_SIZE: usize = 100;

    pub fn new(credentials: TencentCredentials) -> MtResult<Self> {
        if credentials.secret_id.trim().is_empty() || credentials.secret_key.trim().is_empty() {
            return Err(MtError::ConfigError(
                "Tencent secret_id and secret_key cannot be empty".to_string(),
            ));
        }
        Ok(Self {
            credentials,
            client: http_client()?,
        })
    }

    pub fn from_env() -> MtResult<Self> {
        let var = |name: &str| {
            std::env::var(name).map_err(|_| {
                MtError::ConfigError(format!("{} environment variable not set", name))
            })
        };
        Self::new(TencentCredentials {
            secret_id: var("TENCENTCLOUD_SECRET_ID")?,
            secret_key: var("TENCENTCLOUD_SECRET_KEY")?,
            region: std::env::var("TENCENTCLOUD_REGION")
                .unwrap_or_else(|_| "ap-guangzhou".to_string()),
            project_id: 0,
        })
    }

    pub fn language_code(locale: &str) -> String {
        match locale {
            "zh-Hans" | "zh-CN" | "zh-SG" => "zh".to_string(),
            "zh-Hant" | "zh-HK" => "zh-TW".to_string(),
            other => crate::translator::normalize_locale(other),
        }
    }
}

impl std::fmt::Debug for TencentTranslateProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TencentTranslateProvider")
            .field("credentials", &self.credentials)
            .finish()
    }
}

#[async_trait]
impl MachineTranslator for TencentTranslateProvider {
    async fn translate_batch(
        &self,
        texts: &[String],
        source_locale: &str,
        target_locale: &str,
    ) -> MtResult<Vec<String>> {
        validate_locale(source_locale)?;
        validate_locale(target_locale)?;

        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let source = Self::language_code(source_locale);
        let target = Self::language_code(target_locale);
        let payload = serde_json::to_string(&BatchRequest {
            source: &source,
            target: &target,
            project_id: self.credentials.project_id,
            source_text_list: texts,
        })
        .map_err(|e| MtError::ConfigError(format!("Failed to encode request: {}", e)))?;

        let signature = sign_request(&payload, Utc::now().timestamp(), &self.credentials)?;
        debug!("Tencent {} request: {} text(s)", ACTION, texts.len());

        let response = self
            .client
            .post(format!("https://{}", HOST))
            .header("Authorization", signature.authorization)
            .header("Content-Type", CONTENT_TYPE)
            .header("Host", HOST)
            .header("X-TC-Action", ACTION)
            .header("X-TC-Timestamp", signature.timestamp.to_string())
            .header("X-TC-Version", VERSION)
            .header("X-TC-Region", &self.credentials.region)
            .body(payload)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(MtError::from_status(status, &error_text));
        }

        let envelope: Envelope = response.json().await?;
        let body = envelope.response;
        if let Some(error) = body.error {
            return Err(error.into_mt_error(&body.request_id));
        }
        Ok(body.target_text_list)
    }

    fn provider_name(&self) -> &str {
        "tencent"
    }

    fn supported_languages(&self) -> &[&'static str] {
        SUPPORTED_LANGUAGES
    }

    fn usage_limit(&self) -> UsageLimit {
        UsageLimit::new(Self::MAX_BATCH_SIZE, Some(Self::MAX_CHARS_PER_REQUEST))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn credentials() -> TencentCredentials {
        TencentCredentials {
            secret_id: "AKIDEXAMPLE".to_string(),
            secret_key: "SECRETEXAMPLE".to_string(),
            region: "ap-guangzhou".to_string(),
            project_id: 0,
        }
    }

    #[test]
    fn test_request_payload_shape() {
        let texts = vec!["你好世界".to_string()];
        let payload = serde_json::to_string(&BatchRequest {
            source: "zh",
            target: "en",
            project_id: 0,
            source_text_list: &texts,
        })
        .unwrap();
        assert_eq!(
            payload,
            r#"{"Source":"zh","Target":"en","ProjectId":0,"SourceTextList":["你好世界"]}"#
        );
    }

    #[test]
    fn test_sign_request_known_vector() {
        let payload = r#"{"Source":"zh","Target":"en","ProjectId":0,"SourceTextList":["你好世界"]}"#;
        assert_eq!(
            sha256_hex(payload),
            "42ca5aa6113cef9d944e5fd7b429202d837f8ec41f1d30335c97de04afc3b58e"
        );

        let signature = sign_request(payload, 1_700_000_000, &credentials()).unwrap();
        assert_eq!(signature.timestamp, 1_700_000_000);
        assert_eq!(
            signature.authorization,
            "TC3-HMAC-SHA256 Credential=AKIDEXAMPLE/2023-11-14/tmt/tc3_request, \
             SignedHeaders=content-type;host, \
             Signature=801a9f6cf1ccff28157c849b1765a6cd8996436cf8223d8ea5b2af7baf570749"
        );
    }

    #[test]
    fn test_signature_depends_on_every_input() {
        let payload = r#"{"SourceTextList":["你好"]}"#;
        let base = sign_request(payload, 1_700_000_000, &credentials()).unwrap();
        assert_eq!(base, sign_request(payload, 1_700_000_000, &credentials()).unwrap());

        let other_payload = sign_request(r#"{"SourceTextList":["再见"]}"#, 1_700_000_000, &credentials());
        assert_ne!(base, other_payload.unwrap());

        let mut other_key = credentials();
        other_key.secret_key = "OTHER".to_string();
        assert_ne!(
            base.authorization,
            sign_request(payload, 1_700_000_000, &other_key).unwrap().authorization
        );
    }

    #[test]
    fn test_error_codes() {
        let error = |code: &str| {
            ApiError {
                code: code.to_string(),
                message: "m".to_string(),
            }
            .into_mt_error("req-1")
        };
        assert!(matches!(error("AuthFailure.SignatureFailure"), MtError::AuthError(_)));
        assert!(matches!(error("RequestLimitExceeded"), MtError::RateLimit(_)));
        assert!(matches!(error("LimitExceeded"), MtError::RateLimit(_)));
        assert!(matches!(error("UnsupportedOperation.UnsupportedLanguage"), MtError::ConfigError(_)));
        assert!(matches!(error("InternalError"), MtError::NetworkError(_)));
        assert!(error("InternalError").to_string().contains("req-1"));
    }

    #[test]
    fn test_response_parsing() {
        let ok: Envelope = serde_json::from_str(
            r#"{"Response":{"Source":"zh","Target":"en","TargetTextList":["Hello world"],"RequestId":"r"}}"#,
        )
        .unwrap();
        assert_eq!(ok.response.target_text_list, vec!["Hello world"]);
        assert!(ok.response.error.is_none());

        let failed: Envelope = serde_json::from_str(
            r#"{"Response":{"Error":{"Code":"AuthFailure.SecretIdNotFound","Message":"no"},"RequestId":"r"}}"#,
        )
        .unwrap();
        assert_eq!(failed.response.error.unwrap().code, "AuthFailure.SecretIdNotFound");
    }

    #[test]
    fn test_language_codes_and_limits() {
        assert_eq!(TencentTranslateProvider::language_code("zh-Hans"), "zh");
        assert_eq!(TencentTranslateProvider::language_code("zh-TW"), "zh-TW");
        assert_eq!(TencentTranslateProvider::language_code("en-US"), "en");

        let provider = TencentTranslateProvider::new(credentials()).unwrap();
        assert_eq!(provider.usage_limit().max_chars, Some(6000));
        assert!(provider.supports("ja"));
        assert!(!provider.supports("fi"));
        assert!(!format!("{:?}", provider).contains("SECRETEXAMPLE"));
    }

    #[test]
    fn test_empty_credentials_rejected() {
        let mut creds = credentials();
        creds.secret_key = String::new();
        assert!(matches!(
            TencentTranslateProvider::new(creds),
            Err(MtError::ConfigError(_))
        ));
    }

    #[tokio::test]
    #[ignore] // Run with: cargo test -- --ignored
    async fn test_real_api_batch_translation() {
        let Ok(provider) = TencentTranslateProvider::from_env() else {
            eprintln!("Skipping: TENCENTCLOUD_SECRET_ID/TENCENTCLOUD_SECRET_KEY not set");
            return;
        };
        let texts = vec!["你好世界".to_string(), "再见".to_string()];
        let results = provider.translate_batch(&texts, "zh", "en").await.unwrap();
        assert_eq!(results.len(), 2);
    }
}
