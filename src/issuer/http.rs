//! HTTP connector for the external issuer.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use url::Url;

use super::{IssuerConnector, IssuerError};
use crate::config::{IssuerConfig, IssuerCredentials};
use crate::error::Result;
use crate::policy::Policy;
use crate::tls::build_http_client;

/// Error code in a 404 body that marks the zone as unknown to the issuer.
pub const ZONE_NOT_FOUND_CODE: &str = "ZoneNotFound";

#[derive(Debug, Deserialize)]
struct ErrorBody {
    code: String,
}

/// Returns true if a 404 body reports the zone as missing.
fn reports_missing_zone(body: &str) -> bool {
    serde_json::from_str::<ErrorBody>(body)
        .map(|e| e.code == ZONE_NOT_FOUND_CODE)
        .unwrap_or(false)
}

/// Issuer connector speaking JSON over HTTPS.
///
/// A zone's policy is read with `GET {base}/zones/{zone}/policy`. The zone is
/// percent-encoded as a single path segment. The zone is reported missing
/// only for a 404 whose body is `{"code": "ZoneNotFound"}`; any other 404
/// (a wrong base path, a proxy) is an ordinary HTTP error.
#[derive(Debug)]
pub struct HttpIssuerConnector {
    base_url: Url,
    credentials: IssuerCredentials,
    http: reqwest::Client,
}

impl HttpIssuerConnector {
    /// Create a connector for the given issuer.
    ///
    /// # Errors
    ///
    /// Returns an error if the trust bundle cannot be parsed or the base URL
    /// cannot carry a path.
    pub fn new(config: &IssuerConfig) -> Result<Self> {
        if config.url.cannot_be_a_base() {
            return Err(crate::error::GatewayError::config(format!(
                "issuer URL cannot carry a path: {}",
                config.url
            )));
        }
        let http = build_http_client(config)?;

        Ok(Self {
            base_url: config.url.clone(),
            credentials: config.credentials.clone(),
            http,
        })
    }

    /// Issuer base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn policy_url(&self, zone: &str) -> std::result::Result<Url, IssuerError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                IssuerError::Config(format!("issuer URL cannot carry a path: {}", self.base_url))
            })?
            .pop_if_empty()
            .extend(["zones", zone, "policy"]);
        Ok(url)
    }

    fn add_auth(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.credentials {
            IssuerCredentials::Basic { username, password } => {
                request.basic_auth(username, Some(password))
            }
            IssuerCredentials::ApiKey(key) => request.bearer_auth(key),
        }
    }
}

#[async_trait]
impl IssuerConnector for HttpIssuerConnector {
    async fn read_policy_configuration(
        &self,
        zone: &str,
    ) -> std::result::Result<Policy, IssuerError> {
        let url = self.policy_url(zone)?;
        tracing::debug!("GET {}", url);

        let response = self.add_auth(self.http.get(url)).send().await?;
        let status = response.status();

        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            if status == StatusCode::NOT_FOUND && reports_missing_zone(&message) {
                return Err(IssuerError::ZoneNotFound(zone.to_string()));
            }
            return Err(IssuerError::Http {
                status: status.as_u16(),
                message,
            });
        }

        let body = response.bytes().await?;
        serde_json::from_slice::<Policy>(&body).map_err(|e| IssuerError::InvalidPolicy {
            zone: zone.to_string(),
            message: e.to_string(),
        })
    }
}
