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

//! Integration tests for the ACMPrivateCAIssueCertificate operation

use crate::integration::{
    csr_pem, example_policy, gateway, gateway_with, issue_request, CaCall, RecordingCa,
    UnavailableStore, CA_ARN, ISSUED_ARN, ISSUED_CERTIFICATE, ISSUED_CHAIN,
};
use base64::prelude::*;
use pca_policy_gateway::ca::Validity;
use pca_policy_gateway::{
    AllowedKeyConfiguration, GatewayConfig, KeyAlgorithm, MemoryPolicyStore, Policy, PolicyStore,
    ProxyRequest,
};
use serde_json::json;
use std::sync::Arc;

fn web_store() -> Arc<MemoryPolicyStore> {
    Arc::new(MemoryPolicyStore::with_policies([("Web", example_policy())]))
}

#[tokio::test]
async fn test_allowed_request_is_forwarded() {
    let ca = RecordingCa::new();
    let gateway = gateway(web_store(), ca.clone());

    let csr = csr_pem("www.example.com", &["www.example.com", "api.example.com"]);
    let response = gateway.handle(issue_request(&csr, Some("Web"))).await;

    assert_eq!(response.status_code, 200, "body: {}", response.body);
    assert_eq!(
        response.body_json().unwrap(),
        json!({
            "CertificateArn": ISSUED_ARN,
            "Certificate": ISSUED_CERTIFICATE,
            "CertificateChain": ISSUED_CHAIN,
        })
    );

    let calls = ca.calls();
    assert_eq!(calls.len(), 1);
    match &calls[0] {
        CaCall::Issue(input) => {
            assert_eq!(input.certificate_authority_arn, CA_ARN);
            assert_eq!(input.csr, csr.as_bytes());
            assert_eq!(input.signing_algorithm, "SHA256WITHRSA");
            assert_eq!(input.validity, Validity::days(30));
        }
        other => panic!("unexpected CA call: {:?}", other),
    }
}

#[tokio::test]
async fn test_request_values_override_defaults() {
    let ca = RecordingCa::new();
    let gateway = gateway(web_store(), ca.clone());

    let csr = csr_pem("www.example.com", &[]);
    let body = json!({
        "CertificateAuthorityArn": CA_ARN,
        "Csr": BASE64_STANDARD.encode(&csr),
        "SigningAlgorithm": "SHA256WITHECDSA",
        "Validity": {"Type": "MONTHS", "Value": 6},
        "IdempotencyToken": "tok-1",
        "Policy": "Web",
    });
    let response = gateway
        .handle(ProxyRequest::new(None, body.to_string()))
        .await;

    assert_eq!(response.status_code, 200, "body: {}", response.body);
    match &ca.calls()[0] {
        CaCall::Issue(input) => {
            assert_eq!(input.signing_algorithm, "SHA256WITHECDSA");
            assert_eq!(
                input.validity,
                Validity {
                    period_type: "MONTHS".into(),
                    value: 6
                }
            );
            assert_eq!(input.idempotency_token.as_deref(), Some("tok-1"));
        }
        other => panic!("unexpected CA call: {:?}", other),
    }
}

#[tokio::test]
async fn test_disallowed_common_name_is_denied() {
    let ca = RecordingCa::new();
    let gateway = gateway(web_store(), ca.clone());

    let csr = csr_pem("host.other.com", &[]);
    let response = gateway.handle(issue_request(&csr, Some("Web"))).await;

    assert_eq!(response.status_code, 403);
    let msg = response.body_json().unwrap()["msg"].as_str().unwrap().to_string();
    assert!(msg.contains("common name"), "msg: {msg}");
    assert!(msg.contains("host.other.com"), "msg: {msg}");
    assert!(ca.calls().is_empty(), "denied request must not reach the CA");
}

#[tokio::test]
async fn test_disallowed_dns_san_is_denied() {
    let ca = RecordingCa::new();
    let gateway = gateway(web_store(), ca.clone());

    let csr = csr_pem("www.example.com", &["www.example.com", "bad.evil.com"]);
    let response = gateway.handle(issue_request(&csr, Some("Web"))).await;

    assert_eq!(response.status_code, 403);
    let msg = response.body_json().unwrap()["msg"].as_str().unwrap().to_string();
    assert!(msg.contains("DNS SAN"), "msg: {msg}");
    assert!(msg.contains("bad.evil.com"), "msg: {msg}");
    assert!(ca.calls().is_empty());
}

#[tokio::test]
async fn test_disallowed_key_is_denied() {
    let mut policy = example_policy();
    policy.allowed_key_configurations =
        vec![AllowedKeyConfiguration::with_sizes(KeyAlgorithm::Rsa, [2048, 4096])];
    let store = Arc::new(MemoryPolicyStore::with_policies([("Web", policy)]));
    let ca = RecordingCa::new();
    let gateway = gateway(store, ca.clone());

    let response = gateway
        .handle(issue_request(&csr_pem("www.example.com", &[]), Some("Web")))
        .await;

    assert_eq!(response.status_code, 403);
    assert!(response.body.contains("key configuration"));
    assert!(ca.calls().is_empty());
}

#[tokio::test]
async fn test_missing_zone_uses_default_zone() {
    let store = Arc::new(MemoryPolicyStore::with_policies([("Default", example_policy())]));
    let ca = RecordingCa::new();
    let gateway = gateway(store, ca.clone());

    let response = gateway
        .handle(issue_request(&csr_pem("www.example.com", &[]), None))
        .await;
    assert_eq!(response.status_code, 200, "body: {}", response.body);

    let response = gateway
        .handle(issue_request(&csr_pem("www.example.com", &[]), Some("")))
        .await;
    assert_eq!(response.status_code, 200, "body: {}", response.body);
    assert_eq!(ca.calls().len(), 2);
}

#[tokio::test]
async fn test_unknown_zone_is_auto_provisioned() {
    let store = Arc::new(MemoryPolicyStore::new());
    let ca = RecordingCa::new();
    let gateway = gateway(store.clone(), ca.clone());
    let csr = csr_pem("www.example.com", &[]);

    let response = gateway.handle(issue_request(&csr, Some("New"))).await;
    assert_eq!(response.status_code, 424);
    assert!(response.body_json().unwrap()["msg"].is_string());

    // The created record is the empty, deny-all policy.
    assert_eq!(store.get("New").await.unwrap(), Policy::empty());

    let response = gateway.handle(issue_request(&csr, Some("New"))).await;
    assert_eq!(response.status_code, 403);
    assert!(ca.calls().is_empty());
}

#[tokio::test]
async fn test_unknown_zone_without_auto_provisioning() {
    let store = Arc::new(MemoryPolicyStore::new());
    let ca = RecordingCa::new();
    let config = GatewayConfig::builder()
        .auto_provision(false)
        .build()
        .unwrap();
    let gateway = gateway_with(config, store.clone(), ca.clone());

    let response = gateway
        .handle(issue_request(&csr_pem("www.example.com", &[]), Some("New")))
        .await;

    assert_eq!(response.status_code, 424);
    assert!(store.is_empty().await);
    assert!(ca.calls().is_empty());
}

#[tokio::test]
async fn test_store_failure_is_failed_dependency() {
    let ca = RecordingCa::new();
    let gateway = gateway(Arc::new(UnavailableStore), ca.clone());

    let response = gateway
        .handle(issue_request(&csr_pem("www.example.com", &[]), Some("Web")))
        .await;

    assert_eq!(response.status_code, 424);
    assert!(response.body.contains("connection refused"));
    assert!(ca.calls().is_empty());
}

#[tokio::test]
async fn test_malformed_requests_are_unprocessable() {
    let ca = RecordingCa::new();
    let gateway = gateway(web_store(), ca.clone());

    let bodies = [
        "not json".to_string(),
        json!({"CertificateAuthorityArn": CA_ARN}).to_string(),
        json!({"Csr": BASE64_STANDARD.encode(csr_pem("www.example.com", &[]))}).to_string(),
        json!({"CertificateAuthorityArn": CA_ARN, "Csr": "%%%"}).to_string(),
        json!({"CertificateAuthorityArn": CA_ARN, "Csr": BASE64_STANDARD.encode("garbage")})
            .to_string(),
    ];

    for body in bodies {
        let response = gateway
            .handle(ProxyRequest::new(Some("ACMPrivateCAIssueCertificate"), body.clone()))
            .await;
        assert_eq!(response.status_code, 422, "body {body}: {}", response.body);
        assert!(response.body_json().unwrap()["msg"].is_string());
    }
    assert!(ca.calls().is_empty());
}

#[tokio::test]
async fn test_ca_failures() {
    let gateway = gateway(
        web_store(),
        RecordingCa::failing(|| pca_policy_gateway::ca::CaError::Service("throttled".into())),
    );
    let response = gateway
        .handle(issue_request(&csr_pem("www.example.com", &[]), Some("Web")))
        .await;
    assert_eq!(response.status_code, 500);
    assert!(response.body.contains("throttled"));

    let gateway = gateway_with(
        GatewayConfig::default(),
        web_store(),
        RecordingCa::failing(|| {
            pca_policy_gateway::ca::CaError::InvalidInput("bad signing algorithm".into())
        }),
    );
    let response = gateway
        .handle(issue_request(&csr_pem("www.example.com", &[]), Some("Web")))
        .await;
    assert_eq!(response.status_code, 422);
}
