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

//! Request-to-policy matching.
//!
//! Categories are checked in a fixed canonical order (see
//! [`FieldCategory::CANONICAL_ORDER`]) and the first violation is reported,
//! so denial messages are reproducible. [`validate_all`] collects every
//! violation instead, for operator diagnostics.
//!
//! Matching rules:
//!
//! - A value matches a pattern only if the whole value matches. Patterns are
//!   compiled as `^(?:pattern)$` with Unicode classes enabled.
//! - The common name is mandatory: an empty pattern list denies every request.
//! - Subject attribute and SAN categories are optional: a request carrying no
//!   values for a category satisfies it, otherwise every value must match at
//!   least one pattern.
//! - Key configuration: when the policy lists configurations and the request
//!   declares a key, some configuration must admit the algorithm, size and
//!   curve.

use regex::Regex;
use std::fmt;
use tracing::{debug, warn};

use super::{AllowedKeyConfiguration, Policy};
use crate::request::{CertificateRequest, KeySpec};

/// Field category a policy constrains.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldCategory {
    /// Subject common name.
    CommonName,
    /// Subject organization.
    Organization,
    /// Subject organizational unit.
    OrganizationalUnit,
    /// Subject country.
    Country,
    /// Subject locality.
    Locality,
    /// Subject state or province.
    State,
    /// DNS subject alternative names.
    DnsSan,
    /// Email subject alternative names.
    EmailSan,
    /// IP address subject alternative names.
    IpSan,
    /// URI subject alternative names.
    UriSan,
    /// Key algorithm, size and curve.
    KeyConfiguration,
}

impl FieldCategory {
    /// Order in which categories are checked.
    pub const CANONICAL_ORDER: [FieldCategory; 11] = [
        Self::CommonName,
        Self::Organization,
        Self::OrganizationalUnit,
        Self::Country,
        Self::Locality,
        Self::State,
        Self::DnsSan,
        Self::EmailSan,
        Self::IpSan,
        Self::UriSan,
        Self::KeyConfiguration,
    ];

    /// Human-readable category name used in denial messages.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CommonName => "common name",
            Self::Organization => "organization",
            Self::OrganizationalUnit => "organizational unit",
            Self::Country => "country",
            Self::Locality => "locality",
            Self::State => "state (province)",
            Self::DnsSan => "DNS SAN",
            Self::EmailSan => "email SAN",
            Self::IpSan => "IP SAN",
            Self::UriSan => "URI SAN",
            Self::KeyConfiguration => "key configuration",
        }
    }

    /// Returns true if a request without values for this category passes.
    pub fn is_optional(&self) -> bool {
        !matches!(self, Self::CommonName)
    }
}

impl fmt::Display for FieldCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A request field the policy does not admit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyViolation {
    /// Category that failed.
    pub category: FieldCategory,
    /// Offending request values.
    pub values: Vec<String>,
    /// Patterns (or key configurations) none of which admitted the values.
    pub patterns: Vec<String>,
}

impl fmt::Display for PolicyViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.category {
            FieldCategory::CommonName => write!(
                f,
                "common name {:?} is not allowed by policy patterns {:?}",
                self.values.first().map(String::as_str).unwrap_or_default(),
                self.patterns
            ),
            FieldCategory::KeyConfiguration => write!(
                f,
                "key configuration {} is not allowed; allowed configurations: {:?}",
                self.values.join(", "),
                self.patterns
            ),
            category => write!(
                f,
                "{} values {:?} do not match policy patterns {:?}",
                category, self.values, self.patterns
            ),
        }
    }
}

impl std::error::Error for PolicyViolation {}

/// Compiled pattern list for one category.
struct PatternSet<'p> {
    source: &'p [String],
    compiled: Vec<Option<Regex>>,
}

impl<'p> PatternSet<'p> {
    fn compile(source: &'p [String]) -> Self {
        let compiled = source
            .iter()
            .map(|pattern| match Regex::new(&format!("^(?:{pattern})$")) {
                Ok(re) => Some(re),
                Err(e) => {
                    warn!("Ignoring invalid policy pattern {:?}: {}", pattern, e);
                    None
                }
            })
            .collect();
        Self { source, compiled }
    }

    fn is_match(&self, value: &str) -> bool {
        self.compiled
            .iter()
            .flatten()
            .any(|re| re.is_match(value))
    }
}

/// Validator bound to one policy with its patterns compiled.
///
/// Validation is pure: no I/O, no shared state, and the same request always
/// yields the same outcome.
pub struct PolicyValidator<'p> {
    policy: &'p Policy,
    patterns: Vec<(FieldCategory, PatternSet<'p>)>,
}

impl<'p> PolicyValidator<'p> {
    /// Compile the patterns of `policy`.
    pub fn new(policy: &'p Policy) -> Self {
        let patterns = FieldCategory::CANONICAL_ORDER
            .iter()
            .filter_map(|&category| {
                policy
                    .patterns(category)
                    .map(|list| (category, PatternSet::compile(list)))
            })
            .collect();
        Self { policy, patterns }
    }

    /// Check `request`, reporting the first violation in canonical order.
    pub fn validate(&self, request: &CertificateRequest) -> Result<(), PolicyViolation> {
        for category in FieldCategory::CANONICAL_ORDER {
            self.check(category, request)?;
        }
        Ok(())
    }

    /// Check `request`, reporting every violation in canonical order.
    pub fn validate_all(&self, request: &CertificateRequest) -> Vec<PolicyViolation> {
        FieldCategory::CANONICAL_ORDER
            .iter()
            .filter_map(|&category| self.check(category, request).err())
            .collect()
    }

    /// Check a single category.
    pub fn check(
        &self,
        category: FieldCategory,
        request: &CertificateRequest,
    ) -> Result<(), PolicyViolation> {
        if category == FieldCategory::KeyConfiguration {
            return self.check_key(request.key());
        }

        let Some(set) = self.pattern_set(category) else {
            return Ok(());
        };

        let values = request.values(category);

        if values.is_empty() && category.is_optional() {
            debug!("{}: no values in request, skipped", category);
            return Ok(());
        }

        let offending: Vec<String> = values
            .iter()
            .filter(|value| !set.is_match(value))
            .cloned()
            .collect();

        if offending.is_empty() {
            debug!("{}: {} value(s) allowed", category, values.len());
            Ok(())
        } else {
            Err(PolicyViolation {
                category,
                values: offending,
                patterns: set.source.to_vec(),
            })
        }
    }

    fn pattern_set(&self, category: FieldCategory) -> Option<&PatternSet<'p>> {
        self.patterns
            .iter()
            .find(|(c, _)| *c == category)
            .map(|(_, set)| set)
    }

    fn check_key(&self, key: Option<&KeySpec>) -> Result<(), PolicyViolation> {
        let allowed = &self.policy.allowed_key_configurations;
        let Some(key) = key else {
            debug!("key configuration: request declares no key, skipped");
            return Ok(());
        };
        if allowed.is_empty() {
            debug!("key configuration: policy has no key constraint");
            return Ok(());
        }

        if allowed.iter().any(|cfg| admits(cfg, key)) {
            debug!("key configuration: {} allowed", key);
            Ok(())
        } else {
            Err(PolicyViolation {
                category: FieldCategory::KeyConfiguration,
                values: vec![key.to_string()],
                patterns: allowed.iter().map(ToString::to_string).collect(),
            })
        }
    }
}

fn admits(cfg: &AllowedKeyConfiguration, key: &KeySpec) -> bool {
    if cfg.key_type != key.algorithm() {
        return false;
    }
    let size_ok = cfg.key_sizes.is_empty()
        || key.size().is_some_and(|size| cfg.key_sizes.contains(&size));
    let curve_ok = cfg.key_curves.is_empty()
        || key.curve().is_some_and(|curve| cfg.key_curves.contains(&curve));
    size_ok && curve_ok
}

/// Check `request` against `policy`, reporting the first violation.
pub fn validate(request: &CertificateRequest, policy: &Policy) -> Result<(), PolicyViolation> {
    PolicyValidator::new(policy).validate(request)
}

/// Check `request` against `policy`, reporting every violation.
pub fn validate_all(request: &CertificateRequest, policy: &Policy) -> Vec<PolicyViolation> {
    PolicyValidator::new(policy).validate_all(request)
}
