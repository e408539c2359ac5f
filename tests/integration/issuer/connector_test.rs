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

//! Integration tests for the HTTP issuer connector

use crate::integration::{example_policy, MockIssuer};
use pca_policy_gateway::{
    HttpIssuerConnector, IssuerConfig, IssuerConnector, IssuerCredentials, IssuerError, Policy,
};
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, ResponseTemplate};

#[tokio::test]
async fn test_read_policy() {
    let mock = MockIssuer::start().await;
    mock.mock_policy("Web", &example_policy()).await;

    let connector = HttpIssuerConnector::new(&mock.config()).expect("Connector creation failed");
    let policy = connector.read_policy_configuration("Web").await.unwrap();

    assert_eq!(policy, example_policy());
}

#[tokio::test]
async fn test_partial_policy_body() {
    let mock = MockIssuer::start().await;
    Mock::given(method("GET"))
        .and(path("/zones/Partial/policy"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"{"SubjectCNRegexes": ["^.*\\.example\\.com$"]}"#),
        )
        .mount(mock.inner())
        .await;

    let connector = HttpIssuerConnector::new(&mock.config()).unwrap();
    let policy = connector.read_policy_configuration("Partial").await.unwrap();

    assert_eq!(policy.subject_cn_regexes, vec![r"^.*\.example\.com$"]);
    assert!(policy.dns_san_regexes.is_empty());
    assert!(policy.allowed_key_configurations.is_empty());
}

#[tokio::test]
async fn test_api_key_is_bearer_token() {
    let mock = MockIssuer::start().await;
    Mock::given(method("GET"))
        .and(path("/zones/Web/policy"))
        .and(header("Authorization", "Bearer test-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(Policy::empty()))
        .expect(1)
        .mount(mock.inner())
        .await;

    let connector = HttpIssuerConnector::new(&mock.config()).unwrap();
    assert!(connector.read_policy_configuration("Web").await.is_ok());
}

#[tokio::test]
async fn test_basic_credentials() {
    let mock = MockIssuer::start().await;
    // admin:secret
    Mock::given(method("GET"))
        .and(path("/zones/Web/policy"))
        .and(header("Authorization", "Basic YWRtaW46c2VjcmV0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(Policy::empty()))
        .expect(1)
        .mount(mock.inner())
        .await;

    let config = IssuerConfig::new(
        mock.url().parse().unwrap(),
        IssuerCredentials::Basic {
            username: "admin".into(),
            password: "secret".into(),
        },
    );
    let connector = HttpIssuerConnector::new(&config).unwrap();
    assert!(connector.read_policy_configuration("Web").await.is_ok());
}

#[tokio::test]
async fn test_missing_zone() {
    let mock = MockIssuer::start().await;
    mock.mock_zone_missing("Gone").await;

    let connector = HttpIssuerConnector::new(&mock.config()).unwrap();
    let err = connector.read_policy_configuration("Gone").await.unwrap_err();

    assert!(err.is_zone_not_found());
    assert!(matches!(err, IssuerError::ZoneNotFound(zone) if zone == "Gone"));
}

#[tokio::test]
async fn test_unrelated_not_found_is_not_missing_zone() {
    let mock = MockIssuer::start().await;
    mock.mock_policy("Web", &example_policy()).await;

    let connector = HttpIssuerConnector::new(&mock.misrouted_config()).unwrap();
    let err = connector.read_policy_configuration("Web").await.unwrap_err();

    assert!(!err.is_zone_not_found());
    assert!(matches!(err, IssuerError::Http { status: 404, .. }));
}

#[tokio::test]
async fn test_plain_not_found_body_is_http_error() {
    let mock = MockIssuer::start().await;
    Mock::given(method("GET"))
        .and(path("/zones/Web/policy"))
        .respond_with(ResponseTemplate::new(404).set_body_string("Not Found"))
        .mount(mock.inner())
        .await;

    let connector = HttpIssuerConnector::new(&mock.config()).unwrap();
    let err = connector.read_policy_configuration("Web").await.unwrap_err();

    match err {
        IssuerError::Http { status, message } => {
            assert_eq!(status, 404);
            assert_eq!(message, "Not Found");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_server_error() {
    let mock = MockIssuer::start().await;
    mock.mock_failure("Web", 503).await;

    let connector = HttpIssuerConnector::new(&mock.config()).unwrap();
    let err = connector.read_policy_configuration("Web").await.unwrap_err();

    match err {
        IssuerError::Http { status, message } => {
            assert_eq!(status, 503);
            assert_eq!(message, "issuer unavailable");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_invalid_policy_body() {
    let mock = MockIssuer::start().await;
    Mock::given(method("GET"))
        .and(path("/zones/Web/policy"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>login</html>"))
        .mount(mock.inner())
        .await;

    let connector = HttpIssuerConnector::new(&mock.config()).unwrap();
    let err = connector.read_policy_configuration("Web").await.unwrap_err();

    assert!(matches!(err, IssuerError::InvalidPolicy { .. }));
    assert!(!err.is_zone_not_found());
}

#[tokio::test]
async fn test_unreachable_issuer() {
    let config = IssuerConfig::new(
        "http://127.0.0.1:9".parse().unwrap(),
        IssuerCredentials::ApiKey("test-key".into()),
    );
    let connector = HttpIssuerConnector::new(&config).unwrap();
    let err = connector.read_policy_configuration("Web").await.unwrap_err();

    assert!(matches!(err, IssuerError::Transport(_)));
}
