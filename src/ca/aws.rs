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

//! Certificate authority backed by AWS Certificate Manager and ACM Private CA.

use std::time::Duration;

use async_trait::async_trait;
use aws_sdk_acm::error::DisplayErrorContext;
use aws_sdk_acmpca::client::Waiters;
use base64::prelude::*;
use serde_json::{json, Value};
use tracing::debug;

use super::{
    optional_i32, optional_str, required_str, CaError, CaResult, CertificateAuthority,
    IssueCertificateInput, IssuedCertificate, RequestCertificateInput,
};
use crate::dispatch::PassThrough;

/// Default upper bound on waiting for an issued certificate.
pub const DEFAULT_ISSUANCE_WAIT: Duration = Duration::from_secs(60);

/// Certificate authority calling Certificate Manager and Private CA.
#[derive(Debug, Clone)]
pub struct AwsCertificateAuthority {
    acm: aws_sdk_acm::Client,
    pca: aws_sdk_acmpca::Client,
    issuance_wait: Duration,
}

impl AwsCertificateAuthority {
    /// Create a CA over existing service clients.
    pub fn new(acm: aws_sdk_acm::Client, pca: aws_sdk_acmpca::Client) -> Self {
        Self {
            acm,
            pca,
            issuance_wait: DEFAULT_ISSUANCE_WAIT,
        }
    }

    /// Set how long IssueCertificate waits for the certificate to be issued.
    pub fn with_issuance_wait(mut self, wait: Duration) -> Self {
        self.issuance_wait = wait;
        self
    }

    /// Create a CA from shared SDK configuration.
    pub fn from_conf(sdk_config: &aws_config::SdkConfig) -> Self {
        Self::new(
            aws_sdk_acm::Client::new(sdk_config),
            aws_sdk_acmpca::Client::new(sdk_config),
        )
    }

    async fn describe_certificate(&self, body: &Value) -> CaResult<Value> {
        let output = self
            .acm
            .describe_certificate()
            .certificate_arn(required_str(body, "CertificateArn")?)
            .send()
            .await
            .map_err(service_error)?;

        let certificate = output.certificate().map(|detail| {
            json!({
                "CertificateArn": detail.certificate_arn(),
                "DomainName": detail.domain_name(),
                "SubjectAlternativeNames": detail.subject_alternative_names(),
                "Status": detail.status().map(|s| s.as_str()),
                "Serial": detail.serial(),
                "Issuer": detail.issuer(),
            })
        });
        Ok(json!({ "Certificate": certificate }))
    }

    async fn export_certificate(&self, body: &Value) -> CaResult<Value> {
        let passphrase = BASE64_STANDARD
            .decode(required_str(body, "Passphrase")?)
            .map_err(|e| CaError::InvalidInput(format!("Passphrase is not base64: {e}")))?;

        let output = self
            .acm
            .export_certificate()
            .certificate_arn(required_str(body, "CertificateArn")?)
            .passphrase(aws_sdk_acm::primitives::Blob::new(passphrase))
            .send()
            .await
            .map_err(service_error)?;

        Ok(json!({
            "Certificate": output.certificate(),
            "CertificateChain": output.certificate_chain(),
            "PrivateKey": output.private_key(),
        }))
    }

    async fn get_certificate(&self, body: &Value) -> CaResult<Value> {
        let output = self
            .acm
            .get_certificate()
            .certificate_arn(required_str(body, "CertificateArn")?)
            .send()
            .await
            .map_err(service_error)?;

        Ok(json!({
            "Certificate": output.certificate(),
            "CertificateChain": output.certificate_chain(),
        }))
    }

    async fn list_certificates(&self, body: &Value) -> CaResult<Value> {
        let statuses = body
            .get("CertificateStatuses")
            .and_then(Value::as_array)
            .map(|values| {
                values
                    .iter()
                    .filter_map(Value::as_str)
                    .map(aws_sdk_acm::types::CertificateStatus::from)
                    .collect::<Vec<_>>()
            });

        let output = self
            .acm
            .list_certificates()
            .set_certificate_statuses(statuses)
            .set_max_items(optional_i32(body, "MaxItems")?)
            .set_next_token(optional_str(body, "NextToken").map(str::to_string))
            .send()
            .await
            .map_err(service_error)?;

        let summaries: Vec<Value> = output
            .certificate_summary_list()
            .iter()
            .map(|summary| {
                json!({
                    "CertificateArn": summary.certificate_arn(),
                    "DomainName": summary.domain_name(),
                })
            })
            .collect();
        Ok(json!({
            "CertificateSummaryList": summaries,
            "NextToken": output.next_token(),
        }))
    }

    async fn renew_certificate(&self, body: &Value) -> CaResult<Value> {
        self.acm
            .renew_certificate()
            .certificate_arn(required_str(body, "CertificateArn")?)
            .send()
            .await
            .map_err(service_error)?;
        Ok(json!({}))
    }

    async fn pca_get_certificate(&self, body: &Value) -> CaResult<Value> {
        let output = self
            .pca
            .get_certificate()
            .certificate_authority_arn(required_str(body, "CertificateAuthorityArn")?)
            .certificate_arn(required_str(body, "CertificateArn")?)
            .send()
            .await
            .map_err(service_error)?;

        Ok(json!({
            "Certificate": output.certificate(),
            "CertificateChain": output.certificate_chain(),
        }))
    }

    async fn list_certificate_authorities(&self, body: &Value) -> CaResult<Value> {
        let output = self
            .pca
            .list_certificate_authorities()
            .set_max_results(optional_i32(body, "MaxResults")?)
            .set_next_token(optional_str(body, "NextToken").map(str::to_string))
            .send()
            .await
            .map_err(service_error)?;

        let authorities: Vec<Value> = output
            .certificate_authorities()
            .iter()
            .map(|ca| {
                json!({
                    "Arn": ca.arn(),
                    "Status": ca.status().map(|s| s.as_str()),
                    "Type": ca.r#type().map(|t| t.as_str()),
                })
            })
            .collect();
        Ok(json!({
            "CertificateAuthorities": authorities,
            "NextToken": output.next_token(),
        }))
    }

    async fn get_certificate_authority_certificate(&self, body: &Value) -> CaResult<Value> {
        let output = self
            .pca
            .get_certificate_authority_certificate()
            .certificate_authority_arn(required_str(body, "CertificateAuthorityArn")?)
            .send()
            .await
            .map_err(service_error)?;

        Ok(json!({
            "Certificate": output.certificate(),
            "CertificateChain": output.certificate_chain(),
        }))
    }

    async fn revoke_certificate(&self, body: &Value) -> CaResult<Value> {
        self.pca
            .revoke_certificate()
            .certificate_authority_arn(required_str(body, "CertificateAuthorityArn")?)
            .certificate_serial(required_str(body, "CertificateSerial")?)
            .revocation_reason(aws_sdk_acmpca::types::RevocationReason::from(required_str(
                body,
                "RevocationReason",
            )?))
            .send()
            .await
            .map_err(service_error)?;
        Ok(json!({}))
    }
}

#[async_trait]
impl CertificateAuthority for AwsCertificateAuthority {
    async fn issue_certificate(&self, input: IssueCertificateInput) -> CaResult<IssuedCertificate> {
        let validity = aws_sdk_acmpca::types::Validity::builder()
            .r#type(aws_sdk_acmpca::types::ValidityPeriodType::from(
                input.validity.period_type.as_str(),
            ))
            .value(input.validity.value)
            .build()
            .map_err(|e| CaError::InvalidInput(e.to_string()))?;

        let ca_arn = input.certificate_authority_arn;
        debug!("IssueCertificate on {}", ca_arn);
        let output = self
            .pca
            .issue_certificate()
            .certificate_authority_arn(&ca_arn)
            .csr(aws_sdk_acmpca::primitives::Blob::new(input.csr))
            .signing_algorithm(aws_sdk_acmpca::types::SigningAlgorithm::from(
                input.signing_algorithm.as_str(),
            ))
            .validity(validity)
            .set_idempotency_token(input.idempotency_token)
            .send()
            .await
            .map_err(service_error)?;

        let certificate_arn = output
            .certificate_arn()
            .map(str::to_string)
            .ok_or_else(|| CaError::Service("IssueCertificate returned no CertificateArn".into()))?;

        debug!("Waiting for {} to be issued", certificate_arn);
        self.pca
            .wait_until_certificate_issued()
            .certificate_authority_arn(&ca_arn)
            .certificate_arn(&certificate_arn)
            .wait(self.issuance_wait)
            .await
            .map_err(service_error)?;

        let issued = self
            .pca
            .get_certificate()
            .certificate_authority_arn(&ca_arn)
            .certificate_arn(&certificate_arn)
            .send()
            .await
            .map_err(service_error)?;

        let certificate = issued
            .certificate()
            .map(str::to_string)
            .ok_or_else(|| CaError::Service("GetCertificate returned no Certificate".into()))?;
        Ok(IssuedCertificate {
            certificate_arn,
            certificate,
            certificate_chain: issued.certificate_chain().map(str::to_string),
        })
    }

    async fn request_certificate(&self, input: RequestCertificateInput) -> CaResult<String> {
        let sans = (!input.subject_alternative_names.is_empty())
            .then_some(input.subject_alternative_names);

        debug!("RequestCertificate for {}", input.domain_name);
        let output = self
            .acm
            .request_certificate()
            .domain_name(input.domain_name)
            .set_subject_alternative_names(sans)
            .set_certificate_authority_arn(input.certificate_authority_arn)
            .set_idempotency_token(input.idempotency_token)
            .send()
            .await
            .map_err(service_error)?;

        output
            .certificate_arn()
            .map(str::to_string)
            .ok_or_else(|| CaError::Service("RequestCertificate returned no CertificateArn".into()))
    }

    async fn pass_through(&self, operation: PassThrough, body: &Value) -> CaResult<Value> {
        debug!("Forwarding {}", operation);
        match operation {
            PassThrough::DescribeCertificate => self.describe_certificate(body).await,
            PassThrough::ExportCertificate => self.export_certificate(body).await,
            PassThrough::GetCertificate => self.get_certificate(body).await,
            PassThrough::ListCertificates => self.list_certificates(body).await,
            PassThrough::RenewCertificate => self.renew_certificate(body).await,
            PassThrough::PrivateCaGetCertificate => self.pca_get_certificate(body).await,
            PassThrough::ListCertificateAuthorities => {
                self.list_certificate_authorities(body).await
            }
            PassThrough::GetCertificateAuthorityCertificate => {
                self.get_certificate_authority_certificate(body).await
            }
            PassThrough::RevokeCertificate => self.revoke_certificate(body).await,
        }
    }
}

fn service_error<E>(err: E) -> CaError
where
    E: std::error::Error + Send + Sync + 'static,
{
    CaError::Service(DisplayErrorContext(err).to_string())
}
