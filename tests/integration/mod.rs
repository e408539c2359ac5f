//! Integration test utilities and helpers
//!
//! This module provides common test infrastructure for gateway integration
//! tests: a mock issuer server, a recording certificate authority, a store
//! that is always unavailable, and CSR helpers.

#![allow(dead_code)]

use async_trait::async_trait;
use base64::prelude::*;
use pca_policy_gateway::ca::{
    CaError, CaResult, CertificateAuthority, IssueCertificateInput, IssuedCertificate,
    RequestCertificateInput,
};
use pca_policy_gateway::{
    AllowedKeyConfiguration, EllipticCurve, Gateway, GatewayConfig, IssuerConfig,
    IssuerCredentials, PassThrough, Policy, PolicyStore, ProxyRequest, StoreError,
};
use rcgen::{CertificateParams, DistinguishedName, DnType, KeyPair, SanType};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// ARN returned by the recording CA for issue and request calls.
pub const ISSUED_ARN: &str =
    "arn:aws:acm-pca:us-east-1:111122223333:certificate-authority/ca/certificate/0001";

/// PEM certificate returned by the recording CA for issue calls.
pub const ISSUED_CERTIFICATE: &str =
    "-----BEGIN CERTIFICATE-----\nMIIBissued\n-----END CERTIFICATE-----\n";

/// PEM chain returned by the recording CA for issue calls.
pub const ISSUED_CHAIN: &str = "-----BEGIN CERTIFICATE-----\nMIIBroot\n-----END CERTIFICATE-----\n";

/// CA ARN used in issue requests.
pub const CA_ARN: &str = "arn:aws:acm-pca:us-east-1:111122223333:certificate-authority/ca";

/// Mock issuer server builder for integration tests
pub struct MockIssuer {
    server: MockServer,
}

impl MockIssuer {
    /// Create a new mock issuer
    pub async fn start() -> Self {
        let server = MockServer::start().await;
        Self { server }
    }

    /// Get the base URL of the mock server
    pub fn url(&self) -> String {
        self.server.uri()
    }

    /// Get a reference to the inner MockServer for custom mocking
    pub fn inner(&self) -> &MockServer {
        &self.server
    }

    /// Issuer configuration pointing at the mock, with an API key
    pub fn config(&self) -> IssuerConfig {
        IssuerConfig::new(
            self.url().parse().expect("Valid URL"),
            IssuerCredentials::ApiKey("test-key".into()),
        )
    }

    /// Mock a zone's policy
    pub async fn mock_policy(&self, zone: &str, policy: &Policy) {
        Mock::given(method("GET"))
            .and(path(format!("/zones/{zone}/policy")))
            .respond_with(ResponseTemplate::new(200).set_body_json(policy))
            .mount(&self.server)
            .await;
    }

    /// Mock an unknown zone (HTTP 404)
    pub async fn mock_zone_missing(&self, zone: &str) {
        Mock::given(method("GET"))
            .and(path(format!("/zones/{zone}/policy")))
            .respond_with(ResponseTemplate::new(404).set_body_json(json!({
                "code": "ZoneNotFound",
                "message": format!("zone {zone} does not exist"),
            })))
            .mount(&self.server)
            .await;
    }

    /// Issuer configuration whose base path the issuer does not serve
    pub fn misrouted_config(&self) -> IssuerConfig {
        IssuerConfig::new(
            format!("{}/wrong-prefix", self.url()).parse().expect("Valid URL"),
            IssuerCredentials::ApiKey("test-key".into()),
        )
    }

    /// Mock an issuer failure for a zone
    pub async fn mock_failure(&self, zone: &str, status: u16) {
        Mock::given(method("GET"))
            .and(path(format!("/zones/{zone}/policy")))
            .respond_with(ResponseTemplate::new(status).set_body_string("issuer unavailable"))
            .mount(&self.server)
            .await;
    }
}

/// Call received by the recording CA
#[derive(Debug, Clone)]
pub enum CaCall {
    Issue(IssueCertificateInput),
    Request(RequestCertificateInput),
    PassThrough(PassThrough, Value),
}

/// Certificate authority that records every call
#[derive(Default)]
pub struct RecordingCa {
    calls: Mutex<Vec<CaCall>>,
    failure: Option<fn() -> CaError>,
}

impl RecordingCa {
    /// CA that accepts every call
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// CA that fails every call with the error built by `failure`
    pub fn failing(failure: fn() -> CaError) -> Arc<Self> {
        Arc::new(Self {
            calls: Mutex::new(Vec::new()),
            failure: Some(failure),
        })
    }

    /// Calls received so far
    pub fn calls(&self) -> Vec<CaCall> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, call: CaCall) -> CaResult<()> {
        self.calls.lock().unwrap().push(call);
        match self.failure {
            Some(failure) => Err(failure()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl CertificateAuthority for RecordingCa {
    async fn issue_certificate(&self, input: IssueCertificateInput) -> CaResult<IssuedCertificate> {
        self.record(CaCall::Issue(input))?;
        Ok(IssuedCertificate {
            certificate_arn: ISSUED_ARN.to_string(),
            certificate: ISSUED_CERTIFICATE.to_string(),
            certificate_chain: Some(ISSUED_CHAIN.to_string()),
        })
    }

    async fn request_certificate(&self, input: RequestCertificateInput) -> CaResult<String> {
        self.record(CaCall::Request(input))?;
        Ok(ISSUED_ARN.to_string())
    }

    async fn pass_through(&self, operation: PassThrough, body: &Value) -> CaResult<Value> {
        self.record(CaCall::PassThrough(operation, body.clone()))?;
        Ok(json!({ "Operation": operation.target(), "Echo": body }))
    }
}

/// Policy store whose backend is always unreachable
pub struct UnavailableStore;

#[async_trait]
impl PolicyStore for UnavailableStore {
    async fn get(&self, _name: &str) -> Result<Policy, StoreError> {
        Err(StoreError::backend("connection refused"))
    }

    async fn put(&self, _name: &str, _policy: &Policy) -> Result<(), StoreError> {
        Err(StoreError::backend("connection refused"))
    }

    async fn delete(&self, _name: &str) -> Result<(), StoreError> {
        Err(StoreError::backend("connection refused"))
    }

    async fn list_names(&self) -> Result<Vec<String>, StoreError> {
        Err(StoreError::backend("connection refused"))
    }
}

/// Policy admitting example.com names and P-256 keys
pub fn example_policy() -> Policy {
    Policy {
        subject_cn_regexes: vec![r"[\p{L}\p{N}-]+\.example\.com".into()],
        subject_o_regexes: vec!["Example Corp".into()],
        subject_c_regexes: vec!["US".into()],
        dns_san_regexes: vec![r".*\.example\.com".into()],
        allowed_key_configurations: vec![AllowedKeyConfiguration::with_curves([
            EllipticCurve::P256,
        ])],
        ..Policy::default()
    }
}

/// Gateway over `store` and `ca` with default configuration
pub fn gateway(store: Arc<dyn PolicyStore>, ca: Arc<dyn CertificateAuthority>) -> Gateway {
    gateway_with(GatewayConfig::default(), store, ca)
}

/// Gateway over `store` and `ca` with `config`
pub fn gateway_with(
    config: GatewayConfig,
    store: Arc<dyn PolicyStore>,
    ca: Arc<dyn CertificateAuthority>,
) -> Gateway {
    Gateway::new(config, store, ca)
}

/// PEM CSR with the given CN and DNS SANs, signed with a P-256 key
pub fn csr_pem(cn: &str, dns: &[&str]) -> String {
    let mut params = CertificateParams::default();
    params.distinguished_name = DistinguishedName::new();
    params.distinguished_name.push(DnType::CommonName, cn);
    params
        .distinguished_name
        .push(DnType::OrganizationName, "Example Corp");
    params.distinguished_name.push(DnType::CountryName, "US");
    params.subject_alt_names = dns
        .iter()
        .map(|name| SanType::DnsName(name.to_string().try_into().expect("Valid DNS name")))
        .collect();

    let key = KeyPair::generate().expect("Key generation failed");
    params
        .serialize_request(&key)
        .expect("CSR generation failed")
        .pem()
        .expect("PEM encoding failed")
}

/// IssueCertificate proxy request for a CSR
pub fn issue_request(csr_pem: &str, zone: Option<&str>) -> ProxyRequest {
    let mut body = json!({
        "CertificateAuthorityArn": CA_ARN,
        "Csr": BASE64_STANDARD.encode(csr_pem),
    });
    if let Some(zone) = zone {
        body["PolicyZone"] = json!(zone);
    }
    ProxyRequest::new(Some("ACMPrivateCAIssueCertificate"), body.to_string())
}

/// RequestCertificate proxy request
pub fn domain_request(domain: &str, sans: &[&str], zone: Option<&str>) -> ProxyRequest {
    let mut body = json!({
        "DomainName": domain,
        "SubjectAlternativeNames": sans,
    });
    if let Some(zone) = zone {
        body["PolicyZone"] = json!(zone);
    }
    ProxyRequest::new(Some("CertificateManagerRequestCertificate"), body.to_string())
}
