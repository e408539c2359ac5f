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

//! # pca-policy-gateway
//!
//! Policy-enforcing request handlers in front of AWS Certificate Manager and
//! ACM Private CA.
//!
//! Every certificate request names a policy zone. The gateway loads that
//! zone's [`Policy`] from a [`PolicyStore`], checks the request's subject,
//! subject alternative names and key against it, and forwards only approved
//! requests to the certificate authority. A synchronizer keeps the stored
//! policies in line with an external issuer.
//!
//! ## Validating a request
//!
//! ```
//! use pca_policy_gateway::{validate, CertificateRequest, Policy};
//!
//! let policy = Policy {
//!     subject_cn_regexes: vec![r".*\.example\.com".into()],
//!     dns_san_regexes: vec![r".*\.example\.com".into()],
//!     ..Policy::default()
//! };
//!
//! let request = CertificateRequest::for_domain("www.example.com", &[]);
//! assert!(validate(&request, &policy).is_ok());
//!
//! let request = CertificateRequest::for_domain("www.example.org", &[]);
//! assert!(validate(&request, &policy).is_err());
//! ```
//!
//! ## Handling a proxy request
//!
//! ```no_run
//! # #[cfg(feature = "aws")]
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! use std::sync::Arc;
//! use pca_policy_gateway::ca::AwsCertificateAuthority;
//! use pca_policy_gateway::store::DynamoPolicyStore;
//! use pca_policy_gateway::{Gateway, GatewayConfig, ProxyRequest};
//!
//! let config = GatewayConfig::from_env()?;
//! let sdk = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
//! let store = DynamoPolicyStore::new(aws_sdk_dynamodb::Client::new(&sdk), &config.table_name);
//! let ca = AwsCertificateAuthority::from_conf(&sdk);
//! let gateway = Gateway::new(config, Arc::new(store), Arc::new(ca));
//!
//! let response = gateway.handle(ProxyRequest::default()).await;
//! println!("{}", response.status_code);
//! # Ok(())
//! # }
//! ```
//!
//! ## Cargo Features
//!
//! - `aws` (default): DynamoDB store, Certificate Manager / Private CA client,
//!   KMS credential decryption and the Lambda binaries
//! - `cli` (default): the `pca-policy` operator tool

#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod ca;
pub mod config;
pub mod credentials;
pub mod dispatch;
pub mod error;
pub mod gateway;
pub mod issuer;
pub mod logging;
pub mod policy;
pub mod request;
pub mod store;
pub mod sync;
pub mod tls;

// Re-export main types at crate root for convenience
pub use config::{GatewayConfig, GatewayConfigBuilder, IssuerConfig, IssuerCredentials};
pub use dispatch::{Operation, PassThrough};
pub use error::{DenialStatus, GatewayError, Result};
pub use gateway::{Gateway, ProxyRequest, ProxyResponse};
pub use issuer::{HttpIssuerConnector, IssuerConnector, IssuerError};
pub use policy::{
    validate, validate_all, AllowedKeyConfiguration, EllipticCurve, FieldCategory, KeyAlgorithm,
    Policy, PolicyValidator, PolicyViolation,
};
pub use request::{CertificateRequest, KeySpec};
pub use store::{MemoryPolicyStore, PolicyStore, StoreError};
pub use sync::{PolicySynchronizer, SyncReport};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// User-Agent string for HTTP requests.
pub const USER_AGENT: &str = concat!("pca-policy-gateway/", env!("CARGO_PKG_VERSION"));
