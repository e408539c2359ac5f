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

//! External certificate-policy issuer.
//!
//! The issuer is the source of truth for zone policies. The synchronizer
//! reads each zone through an [`IssuerConnector`] and mirrors the result
//! into the policy store.

use async_trait::async_trait;
use thiserror::Error;

use crate::policy::Policy;

mod http;

pub use http::HttpIssuerConnector;

/// Errors returned by an issuer connector.
#[derive(Debug, Error)]
pub enum IssuerError {
    /// The issuer does not know the zone.
    #[error("zone {0} not found")]
    ZoneNotFound(String),

    /// The issuer answered with an unexpected status.
    #[error("issuer returned {status}: {message}")]
    Http {
        /// HTTP status code.
        status: u16,
        /// Response body or reason.
        message: String,
    },

    /// The request could not be sent or the response could not be read.
    #[error("issuer transport error: {0}")]
    Transport(String),

    /// The issuer answered with a body that is not a policy.
    #[error("invalid policy for zone {zone}: {message}")]
    InvalidPolicy {
        /// Zone that was read.
        zone: String,
        /// Decoder message.
        message: String,
    },

    /// The connector is misconfigured.
    #[error("issuer configuration error: {0}")]
    Config(String),
}

impl IssuerError {
    /// Returns true if the issuer reported the zone as unknown.
    pub fn is_zone_not_found(&self) -> bool {
        matches!(self, Self::ZoneNotFound(_))
    }
}

impl From<reqwest::Error> for IssuerError {
    fn from(err: reqwest::Error) -> Self {
        Self::Transport(err.to_string())
    }
}

/// Read access to zone policies on an external issuer.
///
/// The zone is an argument of every call, so one connector can serve
/// concurrent readers without shared mutable state.
#[async_trait]
pub trait IssuerConnector: Send + Sync {
    /// Read the policy configured for `zone`.
    ///
    /// # Errors
    ///
    /// Returns [`IssuerError::ZoneNotFound`] if the issuer does not know the
    /// zone, and another variant for every other failure.
    async fn read_policy_configuration(&self, zone: &str) -> Result<Policy, IssuerError>;
}
