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

//! Certificate-issuance policy data model.
//!
//! A [`Policy`] is the typed record stored under a zone name. Every pattern
//! category is a list of regular expressions; an absent category is an empty
//! list, which is distinct from a list holding a single empty pattern.
//!
//! The serialized field names match the records written by the policy
//! synchronizer, for example:
//!
//! ```json
//! {
//!   "SubjectCNRegexes": ["^.*\\.example\\.com$"],
//!   "DnsSanRegExs": ["^.*\\.example\\.com$"],
//!   "AllowedKeyConfigurations": [{ "KeyType": "RSA", "KeySizes": [2048, 4096] }]
//! }
//! ```

mod validator;

pub use validator::{validate, validate_all, FieldCategory, PolicyValidator, PolicyViolation};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{GatewayError, Result};

/// Certificate-issuance policy for one zone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Policy {
    /// Patterns the subject common name must match. Mandatory category.
    #[serde(rename = "SubjectCNRegexes", default)]
    pub subject_cn_regexes: Vec<String>,

    /// Patterns for subject organization values.
    #[serde(rename = "SubjectORegexes", default)]
    pub subject_o_regexes: Vec<String>,

    /// Patterns for subject organizational unit values.
    #[serde(rename = "SubjectOURegexes", default)]
    pub subject_ou_regexes: Vec<String>,

    /// Patterns for subject state/province values.
    #[serde(rename = "SubjectSTRegexes", default)]
    pub subject_st_regexes: Vec<String>,

    /// Patterns for subject locality values.
    #[serde(rename = "SubjectLRegexes", default)]
    pub subject_l_regexes: Vec<String>,

    /// Patterns for subject country values.
    #[serde(rename = "SubjectCRegexes", default)]
    pub subject_c_regexes: Vec<String>,

    /// Key algorithms (and sizes or curves) a request may use.
    #[serde(rename = "AllowedKeyConfigurations", default)]
    pub allowed_key_configurations: Vec<AllowedKeyConfiguration>,

    /// Patterns for DNS subject alternative names.
    #[serde(rename = "DnsSanRegExs", default)]
    pub dns_san_regexes: Vec<String>,

    /// Patterns for IP address subject alternative names.
    #[serde(rename = "IpSanRegExs", default)]
    pub ip_san_regexes: Vec<String>,

    /// Patterns for email subject alternative names.
    #[serde(rename = "EmailSanRegExs", default)]
    pub email_san_regexes: Vec<String>,

    /// Patterns for URI subject alternative names.
    #[serde(rename = "UriSanRegExs", default)]
    pub uri_san_regexes: Vec<String>,

    /// Whether client-supplied key material may be reused. Stored only.
    #[serde(rename = "AllowKeyReuse", default)]
    pub allow_key_reuse: bool,

    /// Whether wildcard domain names are permitted. Stored only.
    #[serde(rename = "AllowWildcards", default)]
    pub allow_wildcards: bool,
}

impl Policy {
    /// Policy with no patterns anywhere. Denies every request.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Returns true if no category carries a pattern or key configuration.
    pub fn is_empty(&self) -> bool {
        self.subject_cn_regexes.is_empty()
            && self.subject_o_regexes.is_empty()
            && self.subject_ou_regexes.is_empty()
            && self.subject_st_regexes.is_empty()
            && self.subject_l_regexes.is_empty()
            && self.subject_c_regexes.is_empty()
            && self.allowed_key_configurations.is_empty()
            && self.dns_san_regexes.is_empty()
            && self.ip_san_regexes.is_empty()
            && self.email_san_regexes.is_empty()
            && self.uri_san_regexes.is_empty()
    }

    /// Pattern list for a pattern-based category.
    ///
    /// Returns `None` for [`FieldCategory::KeyConfiguration`].
    pub fn patterns(&self, category: FieldCategory) -> Option<&[String]> {
        let list = match category {
            FieldCategory::CommonName => &self.subject_cn_regexes,
            FieldCategory::Organization => &self.subject_o_regexes,
            FieldCategory::OrganizationalUnit => &self.subject_ou_regexes,
            FieldCategory::Country => &self.subject_c_regexes,
            FieldCategory::Locality => &self.subject_l_regexes,
            FieldCategory::State => &self.subject_st_regexes,
            FieldCategory::DnsSan => &self.dns_san_regexes,
            FieldCategory::EmailSan => &self.email_san_regexes,
            FieldCategory::IpSan => &self.ip_san_regexes,
            FieldCategory::UriSan => &self.uri_san_regexes,
            FieldCategory::KeyConfiguration => return None,
        };
        Some(list.as_slice())
    }

    /// Parse a policy from its JSON representation.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Serialize the policy to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Parse a policy from a TOML document using the same field names.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str).map_err(|e| GatewayError::config(format!("Invalid TOML: {e}")))
    }
}

/// One allowed key algorithm with its permitted sizes or curves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllowedKeyConfiguration {
    /// Key algorithm.
    #[serde(rename = "KeyType")]
    pub key_type: KeyAlgorithm,

    /// Permitted key sizes in bits. Empty means any size.
    #[serde(rename = "KeySizes", default)]
    pub key_sizes: Vec<u32>,

    /// Permitted elliptic curves. Empty means any curve.
    #[serde(rename = "KeyCurves", default)]
    pub key_curves: Vec<EllipticCurve>,
}

impl AllowedKeyConfiguration {
    /// Allow `key_type` with any size or curve.
    pub fn any(key_type: KeyAlgorithm) -> Self {
        Self {
            key_type,
            key_sizes: Vec::new(),
            key_curves: Vec::new(),
        }
    }

    /// Allow `key_type` with the listed sizes.
    pub fn with_sizes(key_type: KeyAlgorithm, sizes: impl IntoIterator<Item = u32>) -> Self {
        Self {
            key_type,
            key_sizes: sizes.into_iter().collect(),
            key_curves: Vec::new(),
        }
    }

    /// Allow ECDSA on the listed curves.
    pub fn with_curves(curves: impl IntoIterator<Item = EllipticCurve>) -> Self {
        Self {
            key_type: KeyAlgorithm::Ecdsa,
            key_sizes: Vec::new(),
            key_curves: curves.into_iter().collect(),
        }
    }
}

impl fmt::Display for AllowedKeyConfiguration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key_type)?;
        if !self.key_sizes.is_empty() {
            write!(f, " sizes {:?}", self.key_sizes)?;
        }
        if !self.key_curves.is_empty() {
            let curves: Vec<&str> = self.key_curves.iter().map(EllipticCurve::as_str).collect();
            write!(f, " curves {:?}", curves)?;
        }
        Ok(())
    }
}

/// Public key algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum KeyAlgorithm {
    /// RSA.
    #[serde(rename = "RSA", alias = "rsa")]
    Rsa,
    /// ECDSA over a named curve.
    #[serde(rename = "ECDSA", alias = "EC", alias = "ecdsa")]
    Ecdsa,
    /// Ed25519.
    #[serde(rename = "ED25519", alias = "Ed25519", alias = "ed25519")]
    Ed25519,
}

impl KeyAlgorithm {
    /// Canonical name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Rsa => "RSA",
            Self::Ecdsa => "ECDSA",
            Self::Ed25519 => "ED25519",
        }
    }
}

impl fmt::Display for KeyAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KeyAlgorithm {
    type Err = GatewayError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "RSA" => Ok(Self::Rsa),
            "ECDSA" | "EC" => Ok(Self::Ecdsa),
            "ED25519" => Ok(Self::Ed25519),
            other => Err(GatewayError::config(format!("unknown key algorithm: {other}"))),
        }
    }
}

/// Named elliptic curve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EllipticCurve {
    /// NIST P-256 (secp256r1).
    #[serde(rename = "P256", alias = "P-256")]
    P256,
    /// NIST P-384 (secp384r1).
    #[serde(rename = "P384", alias = "P-384")]
    P384,
    /// NIST P-521 (secp521r1).
    #[serde(rename = "P521", alias = "P-521")]
    P521,
}

impl EllipticCurve {
    /// Canonical name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::P256 => "P256",
            Self::P384 => "P384",
            Self::P521 => "P521",
        }
    }

    /// Field size in bits.
    pub fn bits(&self) -> u32 {
        match self {
            Self::P256 => 256,
            Self::P384 => 384,
            Self::P521 => 521,
        }
    }
}

impl fmt::Display for EllipticCurve {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
