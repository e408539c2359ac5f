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

//! Operation routing by target identifier.
//!
//! Every incoming call names its operation in the `X-Amz-Target` header.
//! Two operations are checked against policy before they reach the CA. The
//! rest are forwarded unchanged. Anything else is refused.

use std::fmt;

use crate::error::{GatewayError, Result};

/// Target assumed when a request carries no target header.
pub const DEFAULT_TARGET: &str = "ACMPrivateCAIssueCertificate";

/// Operations forwarded to the CA without a policy check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PassThrough {
    /// Certificate Manager DescribeCertificate.
    DescribeCertificate,
    /// Certificate Manager ExportCertificate.
    ExportCertificate,
    /// Certificate Manager GetCertificate.
    GetCertificate,
    /// Certificate Manager ListCertificates.
    ListCertificates,
    /// Certificate Manager RenewCertificate.
    RenewCertificate,
    /// Private CA GetCertificate.
    PrivateCaGetCertificate,
    /// Private CA ListCertificateAuthorities.
    ListCertificateAuthorities,
    /// Private CA GetCertificateAuthorityCertificate.
    GetCertificateAuthorityCertificate,
    /// Private CA RevokeCertificate.
    RevokeCertificate,
}

/// Operation requested by a call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// Private CA IssueCertificate, carrying a CSR. Policy checked.
    IssueCertificate,
    /// Certificate Manager RequestCertificate, carrying domain names. Policy checked.
    RequestCertificate,
    /// Forwarded without a policy check.
    PassThrough(PassThrough),
}

const OPERATIONS: &[(&str, Operation)] = &[
    ("ACMPrivateCAIssueCertificate", Operation::IssueCertificate),
    ("CertificateManagerRequestCertificate", Operation::RequestCertificate),
    (
        "CertificateManagerDescribeCertificate",
        Operation::PassThrough(PassThrough::DescribeCertificate),
    ),
    (
        "CertificateManagerExportCertificate",
        Operation::PassThrough(PassThrough::ExportCertificate),
    ),
    (
        "CertificateManagerGetCertificate",
        Operation::PassThrough(PassThrough::GetCertificate),
    ),
    (
        "CertificateManagerListCertificates",
        Operation::PassThrough(PassThrough::ListCertificates),
    ),
    (
        "CertificateManagerRenewCertificate",
        Operation::PassThrough(PassThrough::RenewCertificate),
    ),
    (
        "ACMPrivateCAGetCertificate",
        Operation::PassThrough(PassThrough::PrivateCaGetCertificate),
    ),
    (
        "ACMPrivateCAListCertificateAuthorities",
        Operation::PassThrough(PassThrough::ListCertificateAuthorities),
    ),
    (
        "ACMPrivateCAGetCertificateAuthorityCertificate",
        Operation::PassThrough(PassThrough::GetCertificateAuthorityCertificate),
    ),
    (
        "ACMPrivateCARevokeCertificate",
        Operation::PassThrough(PassThrough::RevokeCertificate),
    ),
];

impl Operation {
    /// Resolve a target identifier. A missing target means IssueCertificate.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::UnknownOperation`] for any target not in the table.
    pub fn from_target(target: Option<&str>) -> Result<Self> {
        let target = target.map(str::trim).unwrap_or(DEFAULT_TARGET);
        OPERATIONS
            .iter()
            .find(|(name, _)| *name == target)
            .map(|(_, op)| *op)
            .ok_or_else(|| GatewayError::unknown_operation(target))
    }

    /// Target identifier of this operation.
    pub fn target(&self) -> &'static str {
        OPERATIONS
            .iter()
            .find(|(_, op)| op == self)
            .map(|(name, _)| *name)
            .unwrap_or(DEFAULT_TARGET)
    }

    /// Returns true if the operation is checked against policy.
    pub fn is_policy_checked(&self) -> bool {
        !matches!(self, Self::PassThrough(_))
    }

    /// Every routed operation, in table order.
    pub fn all() -> impl Iterator<Item = Operation> {
        OPERATIONS.iter().map(|(_, op)| *op)
    }
}

impl PassThrough {
    /// Target identifier of this operation.
    pub fn target(&self) -> &'static str {
        Operation::PassThrough(*self).target()
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.target())
    }
}

impl fmt::Display for PassThrough {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.target())
    }
}
