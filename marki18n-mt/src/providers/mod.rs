//! Translation backends

pub mod azure;
pub mod google;
pub mod mock;
pub mod tencent;

use std::time::Duration;

use crate::error::{MtError, MtResult};

pub use azure::AzureTranslateProvider;
pub use google::GoogleTranslateProvider;
pub use mock::{MockMode, MockTranslator};
pub use tencent::{TencentTranslateProvider, sign_request};

/// Per-request timeout shared by every HTTP provider
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

pub(crate) fn http_client() -> MtResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(REQUEST_TIMEOUT)
        .build()
        .map_err(|e| MtError::NetworkError(format!("Failed to create HTTP client: {}", e)))
}
