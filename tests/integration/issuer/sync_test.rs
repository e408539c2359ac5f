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

//! Integration tests for policy synchronization against a mock issuer

use crate::integration::{example_policy, MockIssuer, UnavailableStore};
use pca_policy_gateway::{
    GatewayError, HttpIssuerConnector, IssuerError, MemoryPolicyStore, Policy, PolicyStore,
    PolicySynchronizer, StoreError,
};
use std::sync::Arc;

#[tokio::test]
async fn test_sync_round_trip() {
    let mock = MockIssuer::start().await;
    mock.mock_policy("Web", &example_policy()).await;
    mock.mock_policy("Auto", &Policy::empty()).await;
    mock.mock_zone_missing("Retired").await;

    let store = Arc::new(MemoryPolicyStore::with_policies([
        ("Web", Policy::empty()),
        ("Auto", Policy::empty()),
        ("Retired", example_policy()),
    ]));
    let issuer = Arc::new(HttpIssuerConnector::new(&mock.config()).unwrap());

    let report = PolicySynchronizer::new(store.clone(), issuer)
        .run()
        .await
        .expect("Synchronization failed");

    assert_eq!(report.updated, vec!["Auto", "Web"]);
    assert_eq!(report.deleted, vec!["Retired"]);
    assert_eq!(store.get("Web").await.unwrap(), example_policy());
    assert_eq!(store.get("Auto").await.unwrap(), Policy::empty());
    assert!(matches!(
        store.get("Retired").await,
        Err(StoreError::NotFound(_))
    ));

    // A second pass over the converged store changes nothing.
    let issuer = Arc::new(HttpIssuerConnector::new(&mock.config()).unwrap());
    let report = PolicySynchronizer::new(store.clone(), issuer)
        .run()
        .await
        .unwrap();
    assert_eq!(report.updated, vec!["Auto", "Web"]);
    assert!(report.deleted.is_empty());
}

#[tokio::test]
async fn test_sync_aborts_on_issuer_error() {
    let mock = MockIssuer::start().await;
    mock.mock_policy("A", &example_policy()).await;
    mock.mock_failure("B", 500).await;
    mock.mock_policy("C", &example_policy()).await;

    let store = Arc::new(MemoryPolicyStore::with_policies([
        ("A", Policy::empty()),
        ("B", Policy::empty()),
        ("C", Policy::empty()),
    ]));
    let issuer = Arc::new(HttpIssuerConnector::new(&mock.config()).unwrap());

    let err = PolicySynchronizer::new(store.clone(), issuer)
        .run()
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        GatewayError::Issuer(IssuerError::Http { status: 500, .. })
    ));
    assert_eq!(store.get("A").await.unwrap(), example_policy());
    assert_eq!(store.get("C").await.unwrap(), Policy::empty());
}

#[tokio::test]
async fn test_sync_aborts_on_misrouted_issuer() {
    let mock = MockIssuer::start().await;
    mock.mock_policy("A", &example_policy()).await;
    mock.mock_policy("B", &example_policy()).await;

    let store = Arc::new(MemoryPolicyStore::with_policies([
        ("A", Policy::empty()),
        ("B", Policy::empty()),
    ]));
    let issuer = Arc::new(HttpIssuerConnector::new(&mock.misrouted_config()).unwrap());

    let err = PolicySynchronizer::new(store.clone(), issuer)
        .run()
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        GatewayError::Issuer(IssuerError::Http { status: 404, .. })
    ));
    assert_eq!(store.list_names().await.unwrap(), vec!["A", "B"]);
    assert_eq!(store.get("A").await.unwrap(), Policy::empty());
    assert_eq!(store.get("B").await.unwrap(), Policy::empty());
}

#[tokio::test]
async fn test_sync_store_unavailable() {
    let mock = MockIssuer::start().await;
    let issuer = Arc::new(HttpIssuerConnector::new(&mock.config()).unwrap());

    let err = PolicySynchronizer::new(Arc::new(UnavailableStore), issuer)
        .run()
        .await
        .unwrap_err();

    assert!(matches!(err, GatewayError::Store(StoreError::Backend(_))));
}
