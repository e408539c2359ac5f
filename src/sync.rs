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

//! Policy synchronization from the external issuer.
//!
//! One pass lists every policy name in the store, reads each zone from the
//! issuer and overwrites the local record. A name the issuer no longer knows
//! is deleted locally and the pass continues. Any other failure aborts the
//! pass and is returned to the caller.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, error, info, warn};

use crate::error::Result;
use crate::issuer::{IssuerConnector, IssuerError};
use crate::store::PolicyStore;

/// Names touched by one synchronization pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncReport {
    /// Names whose record was overwritten with the upstream policy.
    pub updated: Vec<String>,

    /// Names whose record was deleted because the zone no longer exists.
    pub deleted: Vec<String>,
}

/// Mirrors issuer zone policies into a policy store.
pub struct PolicySynchronizer {
    store: Arc<dyn PolicyStore>,
    issuer: Arc<dyn IssuerConnector>,
}

impl PolicySynchronizer {
    /// Create a synchronizer over `store` and `issuer`.
    pub fn new(store: Arc<dyn PolicyStore>, issuer: Arc<dyn IssuerConnector>) -> Self {
        Self { store, issuer }
    }

    /// Run one synchronization pass.
    ///
    /// Names are processed sequentially in the order the store lists them.
    ///
    /// # Errors
    ///
    /// Returns the first store or issuer error other than a missing zone.
    /// Records processed before the failure keep their new state.
    pub async fn run(&self) -> Result<SyncReport> {
        let names = self.store.list_names().await.map_err(|e| {
            error!("Failed to list policy names: {}", e);
            e
        })?;
        info!("Synchronizing {} policies", names.len());

        let mut report = SyncReport::default();
        for name in names {
            match self.issuer.read_policy_configuration(&name).await {
                Ok(policy) => {
                    self.store.put(&name, &policy).await?;
                    debug!("Updated policy {}", name);
                    report.updated.push(name);
                }
                Err(IssuerError::ZoneNotFound(_)) => {
                    self.store.delete(&name).await?;
                    warn!("Zone {} no longer exists, deleted policy", name);
                    report.deleted.push(name);
                }
                Err(e) => {
                    error!("Failed to read policy {}: {}", name, e);
                    return Err(e.into());
                }
            }
        }

        info!(
            "Synchronization complete: {} updated, {} deleted",
            report.updated.len(),
            report.deleted.len()
        );
        Ok(report)
    }
}
