// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 U.S. Federal Government (in countries where recognized)
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Configuration types for the policy gateway.
//!
//! A [`GatewayConfig`] is built once at process start, either through
//! [`GatewayConfig::builder`] or from the environment, and passed by
//! reference to every component that needs it.
//!
//! | Variable | Meaning | Default |
//! |---|---|---|
//! | `DYNAMODB_ZONES_TABLE` | policy table | `cert-policy` |
//! | `DEFAULT_ZONE` | zone used when a request names none | `Default` |
//! | `AUTO_PROVISION_POLICIES` | create an empty record for unknown zones | `true` |
//! | `CERT_VALIDITY_DAYS` | validity for issue requests without one | `30` |
//! | `DEFAULT_SIGNING_ALGORITHM` | signing algorithm for issue requests without one | `SHA256WITHRSA` |
//! | `ISSUER_URL` | external issuer base URL | unset |
//! | `ISSUER_USER`, `ISSUER_PASSWORD` | issuer basic credentials | unset |
//! | `ISSUER_API_KEY` | issuer API key | unset |
//! | `TRUST_BUNDLE` | base64 PEM roots for the issuer connection | unset |
//! | `ENCRYPTED_CREDENTIALS` | credentials are KMS ciphertext unless this starts with `f` | encrypted |
//! | `ISSUER_TIMEOUT_SECS` | issuer request timeout in seconds, positive | `30` |

use base64::prelude::*;
use std::time::Duration;
use url::Url;

use crate::error::{GatewayError, Result};

/// Default policy table name.
pub const DEFAULT_TABLE_NAME: &str = "cert-policy";

/// Default zone name.
pub const DEFAULT_ZONE: &str = "Default";

/// Configuration for the request handler and the synchronizer.
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    /// Policy table name.
    pub table_name: String,

    /// Zone used when a request does not name one.
    pub default_zone: String,

    /// Create an empty policy record when a request names an unknown zone.
    pub auto_provision: bool,

    /// Validity in days for issue requests that do not carry one.
    pub validity_days: i64,

    /// Signing algorithm for issue requests that do not carry one.
    pub signing_algorithm: String,

    /// External issuer connection, required by the synchronizer only.
    pub issuer: Option<IssuerConfig>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            table_name: DEFAULT_TABLE_NAME.to_string(),
            default_zone: DEFAULT_ZONE.to_string(),
            auto_provision: true,
            validity_days: 30,
            signing_algorithm: "SHA256WITHRSA".to_string(),
            issuer: None,
        }
    }
}

impl GatewayConfig {
    /// Create a new configuration builder.
    pub fn builder() -> GatewayConfigBuilder {
        GatewayConfigBuilder::new()
    }

    /// Load configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through `lookup`, which maps a variable name to its value.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut builder = Self::builder();

        if let Some(table) = non_empty(&lookup, "DYNAMODB_ZONES_TABLE") {
            builder = builder.table_name(table);
        }
        if let Some(zone) = non_empty(&lookup, "DEFAULT_ZONE") {
            builder = builder.default_zone(zone);
        }
        if let Some(flag) = non_empty(&lookup, "AUTO_PROVISION_POLICIES") {
            builder = builder.auto_provision(parse_bool("AUTO_PROVISION_POLICIES", &flag)?);
        }
        if let Some(days) = non_empty(&lookup, "CERT_VALIDITY_DAYS") {
            let days = days.parse::<i64>().map_err(|_| {
                GatewayError::config(format!("CERT_VALIDITY_DAYS is not a number: {days}"))
            })?;
            builder = builder.validity_days(days);
        }
        if let Some(algorithm) = non_empty(&lookup, "DEFAULT_SIGNING_ALGORITHM") {
            builder = builder.signing_algorithm(algorithm);
        }
        if let Some(issuer) = IssuerConfig::from_lookup(&lookup)? {
            builder = builder.issuer(issuer);
        }

        builder.build()
    }

    /// Zone to use for a request, falling back to the default zone.
    pub fn zone_or_default<'a>(&'a self, zone: Option<&'a str>) -> &'a str {
        match zone {
            Some(zone) if !zone.is_empty() => zone,
            _ => &self.default_zone,
        }
    }
}

/// Builder for [`GatewayConfig`].
#[derive(Debug, Default)]
pub struct GatewayConfigBuilder {
    table_name: Option<String>,
    default_zone: Option<String>,
    auto_provision: Option<bool>,
    validity_days: Option<i64>,
    signing_algorithm: Option<String>,
    issuer: Option<IssuerConfig>,
}

impl GatewayConfigBuilder {
    /// Create a new configuration builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the policy table name.
    pub fn table_name(mut self, name: impl Into<String>) -> Self {
        self.table_name = Some(name.into());
        self
    }

    /// Set the default zone.
    pub fn default_zone(mut self, zone: impl Into<String>) -> Self {
        self.default_zone = Some(zone.into());
        self
    }

    /// Enable or disable auto-provisioning of unknown zones.
    pub fn auto_provision(mut self, enabled: bool) -> Self {
        self.auto_provision = Some(enabled);
        self
    }

    /// Set the default certificate validity in days.
    pub fn validity_days(mut self, days: i64) -> Self {
        self.validity_days = Some(days);
        self
    }

    /// Set the default signing algorithm.
    pub fn signing_algorithm(mut self, algorithm: impl Into<String>) -> Self {
        self.signing_algorithm = Some(algorithm.into());
        self
    }

    /// Set the external issuer connection.
    pub fn issuer(mut self, issuer: IssuerConfig) -> Self {
        self.issuer = Some(issuer);
        self
    }

    /// Build the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if a name is empty or the validity is not positive.
    pub fn build(self) -> Result<GatewayConfig> {
        let defaults = GatewayConfig::default();
        let config = GatewayConfig {
            table_name: self.table_name.unwrap_or(defaults.table_name),
            default_zone: self.default_zone.unwrap_or(defaults.default_zone),
            auto_provision: self.auto_provision.unwrap_or(defaults.auto_provision),
            validity_days: self.validity_days.unwrap_or(defaults.validity_days),
            signing_algorithm: self.signing_algorithm.unwrap_or(defaults.signing_algorithm),
            issuer: self.issuer,
        };

        if config.table_name.is_empty() {
            return Err(GatewayError::config("table name is empty"));
        }
        if config.default_zone.is_empty() {
            return Err(GatewayError::config("default zone is empty"));
        }
        if config.validity_days <= 0 {
            return Err(GatewayError::config(format!(
                "validity must be positive, got {} days",
                config.validity_days
            )));
        }
        Ok(config)
    }
}

/// Connection settings for the external issuer.
#[derive(Debug, Clone)]
pub struct IssuerConfig {
    /// Issuer API base URL.
    pub url: Url,

    /// Credentials presented to the issuer.
    pub credentials: IssuerCredentials,

    /// PEM trust bundle used instead of the built-in roots.
    pub trust_bundle_pem: Option<String>,

    /// Credentials are base64 KMS ciphertext and must be decrypted first.
    pub credentials_encrypted: bool,

    /// Request timeout.
    pub timeout: Duration,
}

impl IssuerConfig {
    /// Issuer settings with plaintext credentials and default timeout.
    pub fn new(url: Url, credentials: IssuerCredentials) -> Self {
        Self {
            url,
            credentials,
            trust_bundle_pem: None,
            credentials_encrypted: false,
            timeout: Duration::from_secs(30),
        }
    }

    /// Read issuer settings through `lookup`.
    ///
    /// Returns `Ok(None)` when `ISSUER_URL` is unset. Username and password
    /// take precedence over an API key.
    pub fn from_lookup<F>(lookup: F) -> Result<Option<Self>>
    where
        F: Fn(&str) -> Option<String>,
    {
        let Some(url) = non_empty(&lookup, "ISSUER_URL") else {
            return Ok(None);
        };
        let url = Url::parse(&url)?;

        let user = non_empty(&lookup, "ISSUER_USER");
        let password = non_empty(&lookup, "ISSUER_PASSWORD");
        let api_key = non_empty(&lookup, "ISSUER_API_KEY");

        let credentials = match (user, password, api_key) {
            (Some(username), Some(password), _) => IssuerCredentials::Basic { username, password },
            (_, _, Some(key)) => IssuerCredentials::ApiKey(key),
            _ => {
                return Err(GatewayError::config(
                    "issuer credentials missing: set ISSUER_USER and ISSUER_PASSWORD, or ISSUER_API_KEY",
                ))
            }
        };

        let trust_bundle_pem = match non_empty(&lookup, "TRUST_BUNDLE") {
            Some(encoded) => {
                let pem = BASE64_STANDARD.decode(encoded.trim()).map_err(|e| {
                    GatewayError::config(format!("TRUST_BUNDLE is not valid base64: {e}"))
                })?;
                Some(String::from_utf8(pem).map_err(|_| {
                    GatewayError::config("TRUST_BUNDLE does not decode to PEM text")
                })?)
            }
            None => None,
        };

        let credentials_encrypted = !lookup("ENCRYPTED_CREDENTIALS")
            .map(|v| v.to_ascii_lowercase().starts_with('f'))
            .unwrap_or(false);

        let timeout = match non_empty(&lookup, "ISSUER_TIMEOUT_SECS") {
            Some(secs) => match secs.parse::<u64>() {
                Ok(0) => {
                    return Err(GatewayError::config("ISSUER_TIMEOUT_SECS must be positive"));
                }
                Ok(n) => Duration::from_secs(n),
                Err(_) => {
                    return Err(GatewayError::config(format!(
                        "ISSUER_TIMEOUT_SECS is not a number: {secs}"
                    )));
                }
            },
            None => Duration::from_secs(30),
        };

        Ok(Some(Self {
            url,
            credentials,
            trust_bundle_pem,
            credentials_encrypted,
            timeout,
        }))
    }
}

/// Credentials presented to the external issuer.
#[derive(Clone, PartialEq, Eq)]
pub enum IssuerCredentials {
    /// Username and password.
    Basic {
        /// Username.
        username: String,
        /// Password.
        password: String,
    },
    /// API key.
    ApiKey(String),
}

impl std::fmt::Debug for IssuerCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"[REDACTED]")
                .finish(),
            Self::ApiKey(_) => f.debug_tuple("ApiKey").field(&"[REDACTED]").finish(),
        }
    }
}

fn non_empty<F>(lookup: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(key).filter(|v| !v.trim().is_empty())
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        other => Err(GatewayError::config(format!(
            "{key} must be true or false, got {other}"
        ))),
    }
}
