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

//! TLS configuration for the external issuer connection.

use crate::config::IssuerConfig;
use crate::error::{GatewayError, Result};

/// Build a reqwest Client for the issuer.
///
/// With a trust bundle, only the bundle's roots are trusted. Without one the
/// built-in web PKI roots are used. TLS 1.2 is the minimum version.
pub fn build_http_client(config: &IssuerConfig) -> Result<reqwest::Client> {
    let mut builder = reqwest::Client::builder()
        .timeout(config.timeout)
        .user_agent(crate::USER_AGENT)
        .use_rustls_tls()
        .min_tls_version(reqwest::tls::Version::TLS_1_2);

    match &config.trust_bundle_pem {
        Some(pem) => {
            builder = builder.tls_built_in_root_certs(false);
            for cert in parse_trust_bundle(pem)? {
                builder = builder.add_root_certificate(cert);
            }
        }
        None => {
            builder = builder.tls_built_in_root_certs(true);
        }
    }

    builder
        .build()
        .map_err(|e| GatewayError::config(format!("Failed to build HTTP client: {}", e)))
}

/// Parse a PEM bundle into reqwest certificates.
pub fn parse_trust_bundle(pem: &str) -> Result<Vec<reqwest::Certificate>> {
    let certs = reqwest::Certificate::from_pem_bundle(pem.as_bytes())
        .map_err(|e| GatewayError::config(format!("Failed to parse trust bundle: {}", e)))?;

    if certs.is_empty() {
        return Err(GatewayError::config("No certificates found in trust bundle"));
    }

    Ok(certs)
}
