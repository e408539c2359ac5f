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

//! Certificate authority client.
//!
//! The gateway forwards approved requests through a [`CertificateAuthority`].
//! Only the fields each call needs cross this boundary.

use async_trait::async_trait;
use serde_json::{json, Value};
use thiserror::Error;

use crate::dispatch::PassThrough;

#[cfg(feature = "aws")]
mod aws;

#[cfg(feature = "aws")]
pub use aws::AwsCertificateAuthority;

/// Result type for CA calls.
pub type CaResult<T> = std::result::Result<T, CaError>;

/// Errors returned by a certificate authority.
#[derive(Debug, Error)]
pub enum CaError {
    /// The call body lacks a required field or carries an invalid one.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The CA service failed or refused the call.
    #[error("service error: {0}")]
    Service(String),
}

impl CaError {
    /// Create an invalid input error for a missing field.
    pub fn missing(field: &str) -> Self {
        Self::InvalidInput(format!("{field} is required"))
    }
}

/// Input for a private CA IssueCertificate call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssueCertificateInput {
    /// Issuing CA.
    pub certificate_authority_arn: String,
    /// CSR as submitted, PEM or DER.
    pub csr: Vec<u8>,
    /// Signing algorithm, e.g. `SHA256WITHRSA`.
    pub signing_algorithm: String,
    /// Certificate validity.
    pub validity: Validity,
    /// Idempotency token passed through from the caller.
    pub idempotency_token: Option<String>,
}

/// Certificate validity period.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Validity {
    /// Period type, e.g. `DAYS`, `MONTHS`, `YEARS`, `ABSOLUTE`.
    pub period_type: String,
    /// Number of periods, or a timestamp for absolute types.
    pub value: i64,
}

impl Validity {
    /// Validity of `days` days.
    pub fn days(days: i64) -> Self {
        Self {
            period_type: "DAYS".to_string(),
            value: days,
        }
    }
}

/// Certificate returned by a completed IssueCertificate call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedCertificate {
    /// ARN of the issued certificate.
    pub certificate_arn: String,
    /// PEM certificate.
    pub certificate: String,
    /// PEM chain up to the root, when the CA returns one.
    pub certificate_chain: Option<String>,
}

impl IssuedCertificate {
    /// Response body returned to the caller.
    pub fn to_json(&self) -> Value {
        json!({
            "CertificateArn": self.certificate_arn,
            "Certificate": self.certificate,
            "CertificateChain": self.certificate_chain,
        })
    }
}

/// Input for a Certificate Manager RequestCertificate call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestCertificateInput {
    /// Primary domain name.
    pub domain_name: String,
    /// Additional domain names.
    pub subject_alternative_names: Vec<String>,
    /// Private CA that issues the certificate.
    pub certificate_authority_arn: Option<String>,
    /// Idempotency token passed through from the caller.
    pub idempotency_token: Option<String>,
}

/// Certificate authority the gateway forwards to.
#[async_trait]
pub trait CertificateAuthority: Send + Sync {
    /// Issue a certificate from a CSR and wait until it can be retrieved.
    async fn issue_certificate(&self, input: IssueCertificateInput) -> CaResult<IssuedCertificate>;

    /// Request a managed certificate. Returns the certificate ARN.
    async fn request_certificate(&self, input: RequestCertificateInput) -> CaResult<String>;

    /// Forward a pass-through call with its JSON body and return the JSON response.
    async fn pass_through(&self, operation: PassThrough, body: &Value) -> CaResult<Value>;
}

/// Required string field of a JSON call body.
pub fn required_str<'a>(body: &'a Value, field: &str) -> CaResult<&'a str> {
    body.get(field)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| CaError::missing(field))
}

/// Optional string field of a JSON call body.
pub fn optional_str<'a>(body: &'a Value, field: &str) -> Option<&'a str> {
    body.get(field).and_then(Value::as_str).filter(|s| !s.is_empty())
}

/// Optional integer field of a JSON call body.
pub fn optional_i32(body: &Value, field: &str) -> CaResult<Option<i32>> {
    match body.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value
            .as_i64()
            .and_then(|v| i32::try_from(v).ok())
            .map(Some)
            .ok_or_else(|| CaError::InvalidInput(format!("{field} must be an integer"))),
    }
}
