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

//! Lambda entry point for the policy-enforcing request handler.
//!
//! Reads [`GatewayConfig`] and [`LogConfig`] from the environment, then
//! serves proxy events until the runtime shuts down.

use std::sync::Arc;

use aws_config::BehaviorVersion;
use lambda_runtime::{run, service_fn, Error, LambdaEvent};

use pca_policy_gateway::ca::AwsCertificateAuthority;
use pca_policy_gateway::logging::LogConfig;
use pca_policy_gateway::store::DynamoPolicyStore;
use pca_policy_gateway::{Gateway, GatewayConfig, ProxyRequest, ProxyResponse};

#[tokio::main]
async fn main() -> Result<(), Error> {
    LogConfig::from_env()?.init();

    let config = GatewayConfig::from_env()?;
    tracing::info!(
        "Starting request handler: table={} default_zone={} auto_provision={}",
        config.table_name,
        config.default_zone,
        config.auto_provision
    );

    let sdk_config = aws_config::load_defaults(BehaviorVersion::latest()).await;
    let store = DynamoPolicyStore::new(
        aws_sdk_dynamodb::Client::new(&sdk_config),
        config.table_name.clone(),
    );
    let ca = AwsCertificateAuthority::from_conf(&sdk_config);
    let gateway = Arc::new(Gateway::new(config, Arc::new(store), Arc::new(ca)));

    run(service_fn(move |event: LambdaEvent<ProxyRequest>| {
        let gateway = Arc::clone(&gateway);
        async move { Ok::<ProxyResponse, Error>(gateway.handle(event.payload).await) }
    }))
    .await
}
