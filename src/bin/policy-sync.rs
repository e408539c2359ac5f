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

//! Lambda entry point for the scheduled policy synchronizer.
//!
//! Each invocation runs one synchronization pass and returns its
//! [`SyncReport`]. A failed pass fails the invocation so the scheduler can
//! alert and retry on the next run.

use std::sync::Arc;

use aws_config::BehaviorVersion;
use lambda_runtime::{run, service_fn, Error, LambdaEvent};
use serde_json::Value;

use pca_policy_gateway::credentials::{decrypt_credentials, KmsDecryptor};
use pca_policy_gateway::logging::LogConfig;
use pca_policy_gateway::store::DynamoPolicyStore;
use pca_policy_gateway::{
    GatewayConfig, GatewayError, HttpIssuerConnector, PolicySynchronizer, SyncReport,
};

#[tokio::main]
async fn main() -> Result<(), Error> {
    LogConfig::from_env()?.init();

    let config = GatewayConfig::from_env()?;
    let issuer_config = config
        .issuer
        .clone()
        .ok_or_else(|| GatewayError::config("ISSUER_URL is required for synchronization"))?;

    let sdk_config = aws_config::load_defaults(BehaviorVersion::latest()).await;
    let decryptor = KmsDecryptor::new(aws_sdk_kms::Client::new(&sdk_config));
    let issuer_config = decrypt_credentials(issuer_config, &decryptor).await?;
    let issuer = HttpIssuerConnector::new(&issuer_config)?;
    tracing::info!(
        "Starting policy synchronizer: table={} issuer={}",
        config.table_name,
        issuer.base_url()
    );

    let store = DynamoPolicyStore::new(
        aws_sdk_dynamodb::Client::new(&sdk_config),
        config.table_name.clone(),
    );
    let synchronizer = Arc::new(PolicySynchronizer::new(Arc::new(store), Arc::new(issuer)));

    run(service_fn(move |_event: LambdaEvent<Value>| {
        let synchronizer = Arc::clone(&synchronizer);
        async move { Ok::<SyncReport, Error>(synchronizer.run().await?) }
    }))
    .await
}
