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

//! Request handler orchestration.
//!
//! [`Gateway::handle`] turns one proxy request into one proxy response:
//!
//! 1. Resolve the operation from the `X-Amz-Target` header.
//! 2. For policy-checked operations, decode the certificate request, load the
//!    zone's policy and validate the request against it.
//! 3. Forward approved and pass-through calls to the certificate authority.
//!
//! Every failure becomes a denial with a JSON body `{"msg": "..."}` and the
//! HTTP status of its [`DenialStatus`](crate::error::DenialStatus). A denied
//! request never reaches the certificate authority.

use std::collections::HashMap;
use std::sync::Arc;

use base64::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::ca::{CertificateAuthority, IssueCertificateInput, RequestCertificateInput, Validity};
use crate::config::GatewayConfig;
use crate::dispatch::Operation;
use crate::error::{GatewayError, Result};
use crate::policy::validate;
use crate::request::CertificateRequest;
use crate::store::{PolicyStore, StoreError};

/// Header naming the requested operation.
pub const TARGET_HEADER: &str = "X-Amz-Target";

/// Proxy request as delivered by the API front end.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyRequest {
    /// Request headers.
    #[serde(default)]
    pub headers: Option<HashMap<String, String>>,

    /// Request body.
    #[serde(default)]
    pub body: Option<String>,

    /// Body is base64-encoded.
    #[serde(default)]
    pub is_base64_encoded: bool,

    /// Front-end request context.
    #[serde(default)]
    pub request_context: Option<RequestContext>,
}

/// Subset of the front-end request context.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestContext {
    /// Front-end request identifier.
    #[serde(default)]
    pub request_id: Option<String>,
}

impl ProxyRequest {
    /// Create a request with a target header and a body.
    pub fn new(target: Option<&str>, body: impl Into<String>) -> Self {
        let headers = target.map(|t| HashMap::from([(TARGET_HEADER.to_string(), t.to_string())]));
        Self {
            headers,
            body: Some(body.into()),
            ..Self::default()
        }
    }

    /// Header value by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.as_ref().and_then(|headers| {
            headers
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case(name))
                .map(|(_, value)| value.as_str())
        })
    }

    /// Front-end request identifier, if any.
    pub fn request_id(&self) -> &str {
        self.request_context
            .as_ref()
            .and_then(|ctx| ctx.request_id.as_deref())
            .unwrap_or("-")
    }

    /// Body text, decoding base64 bodies.
    pub fn body_text(&self) -> Result<String> {
        let body = self.body.as_deref().unwrap_or_default();
        if !self.is_base64_encoded {
            return Ok(body.to_string());
        }
        let bytes = BASE64_STANDARD.decode(body)?;
        String::from_utf8(bytes).map_err(|_| GatewayError::malformed("request body is not UTF-8"))
    }
}

/// Proxy response returned to the API front end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyResponse {
    /// HTTP status code.
    pub status_code: u16,

    /// Response headers.
    pub headers: HashMap<String, String>,

    /// JSON body.
    pub body: String,
}

impl ProxyResponse {
    fn json(status_code: u16, body: &Value) -> Self {
        Self {
            status_code,
            headers: HashMap::from([("Content-Type".to_string(), "application/json".to_string())]),
            body: body.to_string(),
        }
    }

    /// Successful response carrying `body`.
    pub fn ok(body: &Value) -> Self {
        Self::json(200, body)
    }

    /// Denial for `err`, with body `{"msg": "..."}`.
    pub fn denial(err: &GatewayError) -> Self {
        Self::json(err.status().http_status(), &json!({ "msg": err.to_string() }))
    }

    /// Parsed JSON body.
    pub fn body_json(&self) -> Result<Value> {
        Ok(serde_json::from_str(&self.body)?)
    }
}

#[derive(Debug, Deserialize)]
struct IssueCertificateBody {
    #[serde(rename = "CertificateAuthorityArn", default)]
    certificate_authority_arn: String,

    #[serde(rename = "Csr", default)]
    csr: String,

    #[serde(rename = "SigningAlgorithm", default)]
    signing_algorithm: Option<String>,

    #[serde(rename = "Validity", default)]
    validity: Option<ValidityBody>,

    #[serde(rename = "IdempotencyToken", default)]
    idempotency_token: Option<String>,

    #[serde(rename = "PolicyZone", alias = "Policy", default)]
    zone: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ValidityBody {
    #[serde(rename = "Type")]
    period_type: String,

    #[serde(rename = "Value")]
    value: i64,
}

#[derive(Debug, Deserialize)]
struct RequestCertificateBody {
    #[serde(rename = "DomainName", default)]
    domain_name: String,

    #[serde(rename = "SubjectAlternativeNames", default)]
    subject_alternative_names: Vec<String>,

    #[serde(rename = "CertificateAuthorityArn", default)]
    certificate_authority_arn: Option<String>,

    #[serde(rename = "IdempotencyToken", default)]
    idempotency_token: Option<String>,

    #[serde(rename = "PolicyZone", alias = "Policy", default)]
    zone: Option<String>,
}

/// Policy-enforcing front end for the certificate authority.
pub struct Gateway {
    config: GatewayConfig,
    store: Arc<dyn PolicyStore>,
    ca: Arc<dyn CertificateAuthority>,
}

impl Gateway {
    /// Create a gateway.
    pub fn new(
        config: GatewayConfig,
        store: Arc<dyn PolicyStore>,
        ca: Arc<dyn CertificateAuthority>,
    ) -> Self {
        Self { config, store, ca }
    }

    /// Gateway configuration.
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Handle one proxy request.
    pub async fn handle(&self, request: ProxyRequest) -> ProxyResponse {
        let request_id = request.request_id().to_string();
        match self.dispatch(&request).await {
            Ok(body) => {
                info!("Request {} forwarded", request_id);
                ProxyResponse::ok(&body)
            }
            Err(e) if e.is_policy_decision() => {
                info!("Request {} denied: {}", request_id, e);
                ProxyResponse::denial(&e)
            }
            Err(e) => {
                warn!("Request {} failed: {}", request_id, e);
                ProxyResponse::denial(&e)
            }
        }
    }

    async fn dispatch(&self, request: &ProxyRequest) -> Result<Value> {
        let operation = Operation::from_target(request.header(TARGET_HEADER))?;
        debug!("Request {} operation {}", request.request_id(), operation);

        let body = request.body_text()?;
        match operation {
            Operation::IssueCertificate => self.issue_certificate(&body).await,
            Operation::RequestCertificate => self.request_certificate(&body).await,
            Operation::PassThrough(op) => {
                let body: Value = if body.trim().is_empty() {
                    json!({})
                } else {
                    serde_json::from_str(&body).map_err(|e| {
                        GatewayError::malformed(format!("Error unmarshaling JSON for {op}: {e}"))
                    })?
                };
                Ok(self.ca.pass_through(op, &body).await?)
            }
        }
    }

    async fn issue_certificate(&self, body: &str) -> Result<Value> {
        let body: IssueCertificateBody = serde_json::from_str(body)
            .map_err(|e| GatewayError::malformed(format!("Error unmarshaling JSON: {e}")))?;
        if body.certificate_authority_arn.is_empty() {
            return Err(GatewayError::malformed("CertificateAuthorityArn is required"));
        }
        if body.csr.is_empty() {
            return Err(GatewayError::malformed("Csr is required"));
        }

        let csr = BASE64_STANDARD
            .decode(body.csr.trim())
            .map_err(|e| GatewayError::malformed(format!("Csr is not base64: {e}")))?;
        let request = CertificateRequest::from_csr(&csr)?;

        self.authorize(body.zone.as_deref(), &request).await?;

        let input = IssueCertificateInput {
            certificate_authority_arn: body.certificate_authority_arn,
            csr,
            signing_algorithm: body
                .signing_algorithm
                .unwrap_or_else(|| self.config.signing_algorithm.clone()),
            validity: body
                .validity
                .map(|v| Validity {
                    period_type: v.period_type,
                    value: v.value,
                })
                .unwrap_or_else(|| Validity::days(self.config.validity_days)),
            idempotency_token: body.idempotency_token,
        };
        let issued = self.ca.issue_certificate(input).await?;
        info!("Issued {}", issued.certificate_arn);
        Ok(issued.to_json())
    }

    async fn request_certificate(&self, body: &str) -> Result<Value> {
        let body: RequestCertificateBody = serde_json::from_str(body)
            .map_err(|e| GatewayError::malformed(format!("Error unmarshaling JSON: {e}")))?;
        if body.domain_name.is_empty() {
            return Err(GatewayError::malformed("DomainName is required"));
        }

        let request =
            CertificateRequest::for_domain(&body.domain_name, &body.subject_alternative_names);

        self.authorize(body.zone.as_deref(), &request).await?;

        let input = RequestCertificateInput {
            domain_name: body.domain_name,
            subject_alternative_names: body.subject_alternative_names,
            certificate_authority_arn: body.certificate_authority_arn,
            idempotency_token: body.idempotency_token,
        };
        let arn = self.ca.request_certificate(input).await?;
        Ok(json!({ "CertificateArn": arn }))
    }

    /// Load the zone's policy and validate `request` against it.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::PolicyUnavailable`] if the policy cannot be
    /// loaded, creating an empty record first when auto-provisioning is on,
    /// and [`GatewayError::PolicyViolation`] if the request does not satisfy
    /// the policy.
    pub async fn authorize(&self, zone: Option<&str>, request: &CertificateRequest) -> Result<()> {
        let zone = self.config.zone_or_default(zone);

        let policy = match self.store.get(zone).await {
            Ok(policy) => policy,
            Err(StoreError::NotFound(_)) if self.config.auto_provision => {
                if let Err(e) = self.store.create_empty(zone).await {
                    warn!("Failed to create empty policy {}: {}", zone, e);
                } else {
                    info!("Created empty policy {} for synchronization", zone);
                }
                return Err(GatewayError::policy_unavailable(format!(
                    "policy {zone} not found, an empty record was created; retry after synchronization"
                )));
            }
            Err(e @ StoreError::NotFound(_)) => {
                return Err(GatewayError::policy_unavailable(e.to_string()));
            }
            Err(e) => {
                return Err(GatewayError::policy_unavailable(format!(
                    "Failed to get policy {zone} from database: {e}"
                )));
            }
        };

        validate(request, &policy)?;
        debug!("Request {:?} allowed by policy {}", request.common_name(), zone);
        Ok(())
    }
}
