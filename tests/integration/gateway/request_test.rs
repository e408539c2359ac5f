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

//! Integration tests for the CertificateManagerRequestCertificate operation

use crate::integration::{domain_request, example_policy, gateway, CaCall, RecordingCa, ISSUED_ARN};
use pca_policy_gateway::{MemoryPolicyStore, ProxyRequest};
use serde_json::json;
use std::sync::Arc;

fn web_store() -> Arc<MemoryPolicyStore> {
    Arc::new(MemoryPolicyStore::with_policies([("Web", example_policy())]))
}

#[tokio::test]
async fn test_allowed_domains_are_forwarded() {
    let ca = RecordingCa::new();
    let gateway = gateway(web_store(), ca.clone());

    let response = gateway
        .handle(domain_request(
            "www.example.com",
            &["api.example.com"],
            Some("Web"),
        ))
        .await;

    assert_eq!(response.status_code, 200, "body: {}", response.body);
    assert_eq!(response.body_json().unwrap(), json!({ "CertificateArn": ISSUED_ARN }));
    match &ca.calls()[0] {
        CaCall::Request(input) => {
            assert_eq!(input.domain_name, "www.example.com");
            assert_eq!(input.subject_alternative_names, vec!["api.example.com"]);
        }
        other => panic!("unexpected CA call: {:?}", other),
    }
}

#[tokio::test]
async fn test_disallowed_san_is_denied() {
    let ca = RecordingCa::new();
    let gateway = gateway(web_store(), ca.clone());

    let response = gateway
        .handle(domain_request("www.example.com", &["bad.evil.com"], Some("Web")))
        .await;

    assert_eq!(response.status_code, 403);
    assert!(response.body.contains("bad.evil.com"));
    assert!(ca.calls().is_empty());
}

#[tokio::test]
async fn test_disallowed_domain_is_denied() {
    let ca = RecordingCa::new();
    let gateway = gateway(web_store(), ca.clone());

    let response = gateway
        .handle(domain_request("host.other.com", &[], Some("Web")))
        .await;

    assert_eq!(response.status_code, 403);
    assert!(response.body.contains("common name"));
    assert!(ca.calls().is_empty());
}

#[tokio::test]
async fn test_missing_domain_is_unprocessable() {
    let ca = RecordingCa::new();
    let gateway = gateway(web_store(), ca.clone());

    let response = gateway
        .handle(ProxyRequest::new(
            Some("CertificateManagerRequestCertificate"),
            json!({"PolicyZone": "Web"}).to_string(),
        ))
        .await;

    assert_eq!(response.status_code, 422);
    assert!(ca.calls().is_empty());
}
