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

//! Policy persistence.
//!
//! The gateway reads policies through the [`PolicyStore`] trait. Records are
//! keyed by zone name with last-write-wins semantics and no cross-record
//! consistency. [`MemoryPolicyStore`] backs tests and local tooling;
//! `DynamoPolicyStore` (feature `aws`) is the deployed backend.

#[cfg(feature = "aws")]
mod dynamo;

#[cfg(feature = "aws")]
pub use dynamo::DynamoPolicyStore;

use async_trait::async_trait;
use std::collections::BTreeMap;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::policy::Policy;

/// Errors returned by a [`PolicyStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    /// No record exists under the name.
    #[error("policy {0} not found")]
    NotFound(String),

    /// The backend could not be reached or rejected the call.
    #[error("backend error: {0}")]
    Backend(String),

    /// A stored record could not be decoded into a [`Policy`].
    #[error("invalid record for policy {name}: {message}")]
    InvalidRecord {
        /// Policy name.
        name: String,
        /// What was wrong with the record.
        message: String,
    },
}

impl StoreError {
    /// Create a backend error with the given message.
    pub fn backend(msg: impl Into<String>) -> Self {
        Self::Backend(msg.into())
    }

    /// Create an invalid record error.
    pub fn invalid_record(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidRecord {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Returns true if the record does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Key-value store of policies by zone name.
#[async_trait]
pub trait PolicyStore: Send + Sync {
    /// Load the policy stored under `name`.
    async fn get(&self, name: &str) -> Result<Policy, StoreError>;

    /// Store `policy` under `name`, replacing any existing record.
    async fn put(&self, name: &str, policy: &Policy) -> Result<(), StoreError>;

    /// Delete the record under `name`. Deleting a missing record succeeds.
    async fn delete(&self, name: &str) -> Result<(), StoreError>;

    /// Names of every stored policy, in the backend's enumeration order.
    async fn list_names(&self) -> Result<Vec<String>, StoreError>;

    /// Store an empty (deny-all) policy under `name`.
    async fn create_empty(&self, name: &str) -> Result<(), StoreError> {
        self.put(name, &Policy::empty()).await
    }
}

/// In-process policy store.
#[derive(Debug, Default)]
pub struct MemoryPolicyStore {
    policies: RwLock<BTreeMap<String, Policy>>,
}

impl MemoryPolicyStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store seeded with `policies`.
    pub fn with_policies<I, S>(policies: I) -> Self
    where
        I: IntoIterator<Item = (S, Policy)>,
        S: Into<String>,
    {
        Self {
            policies: RwLock::new(
                policies
                    .into_iter()
                    .map(|(name, policy)| (name.into(), policy))
                    .collect(),
            ),
        }
    }

    /// Number of stored records.
    pub async fn len(&self) -> usize {
        self.policies.read().await.len()
    }

    /// Returns true if no record is stored.
    pub async fn is_empty(&self) -> bool {
        self.policies.read().await.is_empty()
    }
}

#[async_trait]
impl PolicyStore for MemoryPolicyStore {
    async fn get(&self, name: &str) -> Result<Policy, StoreError> {
        self.policies
            .read()
            .await
            .get(name)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(name.to_string()))
    }

    async fn put(&self, name: &str, policy: &Policy) -> Result<(), StoreError> {
        self.policies
            .write()
            .await
            .insert(name.to_string(), policy.clone());
        Ok(())
    }

    async fn delete(&self, name: &str) -> Result<(), StoreError> {
        self.policies.write().await.remove(name);
        Ok(())
    }

    async fn list_names(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.policies.read().await.keys().cloned().collect())
    }
}
