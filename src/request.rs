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

//! Certificate requests as seen by the policy validator.
//!
//! A [`CertificateRequest`] is built either by decoding a PKCS#10 CSR
//! ([`CertificateRequest::from_csr`]) or from explicit domain inputs
//! ([`CertificateRequest::for_domain`]). It is immutable once built.

use der::asn1::UintRef;
use der::{Decode, Encode, Sequence, Tag, Tagged};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use tracing::debug;
use x509_cert::attr::AttributeTypeAndValue;
use x509_cert::ext::pkix::name::GeneralName;
use x509_cert::ext::pkix::SubjectAltName;
use x509_cert::name::Name;
use x509_cert::request::{CertReq, ExtensionReq};
use x509_cert::spki::SubjectPublicKeyInfoOwned;

use const_oid::ObjectIdentifier;

use crate::error::{GatewayError, Result};
use crate::policy::{EllipticCurve, FieldCategory, KeyAlgorithm};

const CN: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.3");
const C: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.6");
const L: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.7");
const ST: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.8");
const O: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.10");
const OU: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.4.11");

const EXTENSION_REQUEST: ObjectIdentifier =
    ObjectIdentifier::new_unwrap("1.2.840.113549.1.9.14");
const SUBJECT_ALT_NAME: ObjectIdentifier = ObjectIdentifier::new_unwrap("2.5.29.17");

const RSA_ENCRYPTION: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.1");
const EC_PUBLIC_KEY: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.2.1");
const ED25519: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.101.112");
const SECP256R1: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.3.1.7");
const SECP384R1: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.132.0.34");
const SECP521R1: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.3.132.0.35");

const PEM_LABELS: [&str; 2] = ["CERTIFICATE REQUEST", "NEW CERTIFICATE REQUEST"];
const PEM_BEGIN: &[u8] = b"-----BEGIN ";
const PEM_END: &[u8] = b"-----END ";
const PEM_DASHES: &[u8] = b"-----";
const DER_SEQUENCE: u8 = 0x30;

/// Public key declared by a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeySpec {
    algorithm: KeyAlgorithm,
    size: Option<u32>,
    curve: Option<EllipticCurve>,
}

impl KeySpec {
    /// RSA key with the given modulus size in bits.
    pub fn rsa(bits: u32) -> Self {
        Self {
            algorithm: KeyAlgorithm::Rsa,
            size: Some(bits),
            curve: None,
        }
    }

    /// ECDSA key on the given curve. The size is the curve's field size.
    pub fn ecdsa(curve: EllipticCurve) -> Self {
        Self {
            algorithm: KeyAlgorithm::Ecdsa,
            size: Some(curve.bits()),
            curve: Some(curve),
        }
    }

    /// Ed25519 key.
    pub fn ed25519() -> Self {
        Self {
            algorithm: KeyAlgorithm::Ed25519,
            size: Some(256),
            curve: None,
        }
    }

    /// Key algorithm.
    pub fn algorithm(&self) -> KeyAlgorithm {
        self.algorithm
    }

    /// Key size in bits, if known.
    pub fn size(&self) -> Option<u32> {
        self.size
    }

    /// Named curve for ECDSA keys.
    pub fn curve(&self) -> Option<EllipticCurve> {
        self.curve
    }
}

impl fmt::Display for KeySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.algorithm, self.curve, self.size) {
            (KeyAlgorithm::Ecdsa, Some(curve), _) => write!(f, "ECDSA {curve}"),
            (KeyAlgorithm::Rsa, _, Some(size)) => write!(f, "RSA {size}"),
            (algorithm, _, _) => write!(f, "{algorithm}"),
        }
    }
}

/// Subject, SAN and key fields of a certificate request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CertificateRequest {
    common_name: String,
    organization: Vec<String>,
    organizational_unit: Vec<String>,
    country: Vec<String>,
    locality: Vec<String>,
    state: Vec<String>,
    dns_names: Vec<String>,
    email_addresses: Vec<String>,
    ip_addresses: Vec<String>,
    uris: Vec<String>,
    key: Option<KeySpec>,
    raw: Vec<u8>,
}

impl CertificateRequest {
    /// Create a new request builder.
    pub fn builder() -> CertificateRequestBuilder {
        CertificateRequestBuilder::default()
    }

    /// Decode a PKCS#10 CSR, PEM or DER encoded.
    ///
    /// The input bytes are kept unmodified as [`raw`](Self::raw) so they can
    /// be forwarded to the certificate authority.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError::MalformedRequest`] if the CSR cannot be decoded,
    /// carries more than one common name, uses a SAN type the policy cannot
    /// express, or declares an unsupported key algorithm.
    pub fn from_csr(bytes: &[u8]) -> Result<Self> {
        let der = csr_der(bytes)?;
        let csr = CertReq::from_der(&der)
            .map_err(|e| GatewayError::malformed(format!("Can't parse certificate request: {e}")))?;

        let mut request = Self {
            raw: bytes.to_vec(),
            ..Self::default()
        };

        request.read_subject(&csr.info.subject)?;

        for attr in csr.info.attributes.iter() {
            if attr.oid != EXTENSION_REQUEST {
                continue;
            }
            for value in attr.values.iter() {
                let extensions = ExtensionReq::from_der(&value.to_der()?).map_err(|e| {
                    GatewayError::malformed(format!("Invalid extension request: {e}"))
                })?;
                for ext in extensions.0.iter() {
                    if ext.extn_id == SUBJECT_ALT_NAME {
                        let san = SubjectAltName::from_der(ext.extn_value.as_bytes())
                            .map_err(|e| {
                                GatewayError::malformed(format!(
                                    "Invalid subject alternative name: {e}"
                                ))
                            })?;
                        request.read_alt_names(&san)?;
                    }
                }
            }
        }

        request.key = Some(key_spec(&csr.info.public_key)?);

        debug!(
            "Decoded CSR: cn={:?} dns={} email={} ip={} uri={} key={:?}",
            request.common_name,
            request.dns_names.len(),
            request.email_addresses.len(),
            request.ip_addresses.len(),
            request.uris.len(),
            request.key
        );

        Ok(request)
    }

    /// Build a request from a domain name and extra SAN domain names.
    ///
    /// The domain becomes the common name and, like every entry of
    /// `alternative_names`, a DNS SAN. No key is declared.
    pub fn for_domain(domain: &str, alternative_names: &[String]) -> Self {
        let mut builder = Self::builder().common_name(domain).dns_name(domain);
        for name in alternative_names {
            if name != domain {
                builder = builder.dns_name(name.clone());
            }
        }
        builder.build()
    }

    /// Subject common name (empty if absent).
    pub fn common_name(&self) -> &str {
        &self.common_name
    }

    /// Subject organization values.
    pub fn organization(&self) -> &[String] {
        &self.organization
    }

    /// Subject organizational unit values.
    pub fn organizational_unit(&self) -> &[String] {
        &self.organizational_unit
    }

    /// Subject country values.
    pub fn country(&self) -> &[String] {
        &self.country
    }

    /// Subject locality values.
    pub fn locality(&self) -> &[String] {
        &self.locality
    }

    /// Subject state/province values.
    pub fn state(&self) -> &[String] {
        &self.state
    }

    /// DNS subject alternative names.
    pub fn dns_names(&self) -> &[String] {
        &self.dns_names
    }

    /// Email subject alternative names.
    pub fn email_addresses(&self) -> &[String] {
        &self.email_addresses
    }

    /// IP address subject alternative names, in canonical text form.
    pub fn ip_addresses(&self) -> &[String] {
        &self.ip_addresses
    }

    /// URI subject alternative names.
    pub fn uris(&self) -> &[String] {
        &self.uris
    }

    /// Declared public key, if any.
    pub fn key(&self) -> Option<&KeySpec> {
        self.key.as_ref()
    }

    /// Bytes the request was decoded from (empty for domain requests).
    pub fn raw(&self) -> &[u8] {
        &self.raw
    }

    /// Values of a category. The common name yields a single value.
    pub fn values(&self, category: FieldCategory) -> &[String] {
        match category {
            FieldCategory::CommonName => std::slice::from_ref(&self.common_name),
            FieldCategory::Organization => &self.organization,
            FieldCategory::OrganizationalUnit => &self.organizational_unit,
            FieldCategory::Country => &self.country,
            FieldCategory::Locality => &self.locality,
            FieldCategory::State => &self.state,
            FieldCategory::DnsSan => &self.dns_names,
            FieldCategory::EmailSan => &self.email_addresses,
            FieldCategory::IpSan => &self.ip_addresses,
            FieldCategory::UriSan => &self.uris,
            FieldCategory::KeyConfiguration => &[],
        }
    }

    fn read_subject(&mut self, subject: &Name) -> Result<()> {
        let mut common_names = Vec::new();

        for rdn in subject.0.iter() {
            for atv in rdn.0.iter() {
                let target = match atv.oid {
                    oid if oid == CN => &mut common_names,
                    oid if oid == O => &mut self.organization,
                    oid if oid == OU => &mut self.organizational_unit,
                    oid if oid == C => &mut self.country,
                    oid if oid == L => &mut self.locality,
                    oid if oid == ST => &mut self.state,
                    _ => continue,
                };
                target.push(attribute_string(atv)?);
            }
        }

        if common_names.len() > 1 {
            return Err(GatewayError::malformed(
                "CSR subject carries more than one common name",
            ));
        }
        self.common_name = common_names.pop().unwrap_or_default();
        Ok(())
    }

    fn read_alt_names(&mut self, san: &SubjectAltName) -> Result<()> {
        for name in san.0.iter() {
            match name {
                GeneralName::DnsName(dns) => self.dns_names.push(dns.to_string()),
                GeneralName::Rfc822Name(email) => self.email_addresses.push(email.to_string()),
                GeneralName::UniformResourceIdentifier(uri) => self.uris.push(uri.to_string()),
                GeneralName::IpAddress(octets) => {
                    self.ip_addresses.push(ip_string(octets.as_bytes())?)
                }
                _ => {
                    return Err(GatewayError::malformed(
                        "CSR carries a subject alternative name type the policy cannot check",
                    ))
                }
            }
        }
        Ok(())
    }
}

/// Builder for [`CertificateRequest`].
#[derive(Debug, Default)]
pub struct CertificateRequestBuilder {
    inner: CertificateRequest,
}

impl CertificateRequestBuilder {
    /// Set the common name.
    pub fn common_name(mut self, cn: impl Into<String>) -> Self {
        self.inner.common_name = cn.into();
        self
    }

    /// Add an organization value.
    pub fn organization(mut self, value: impl Into<String>) -> Self {
        self.inner.organization.push(value.into());
        self
    }

    /// Add an organizational unit value.
    pub fn organizational_unit(mut self, value: impl Into<String>) -> Self {
        self.inner.organizational_unit.push(value.into());
        self
    }

    /// Add a country value.
    pub fn country(mut self, value: impl Into<String>) -> Self {
        self.inner.country.push(value.into());
        self
    }

    /// Add a locality value.
    pub fn locality(mut self, value: impl Into<String>) -> Self {
        self.inner.locality.push(value.into());
        self
    }

    /// Add a state/province value.
    pub fn state(mut self, value: impl Into<String>) -> Self {
        self.inner.state.push(value.into());
        self
    }

    /// Add a DNS SAN.
    pub fn dns_name(mut self, value: impl Into<String>) -> Self {
        self.inner.dns_names.push(value.into());
        self
    }

    /// Add an email SAN.
    pub fn email_address(mut self, value: impl Into<String>) -> Self {
        self.inner.email_addresses.push(value.into());
        self
    }

    /// Add an IP address SAN.
    pub fn ip_address(mut self, ip: IpAddr) -> Self {
        self.inner.ip_addresses.push(ip.to_string());
        self
    }

    /// Add a URI SAN.
    pub fn uri(mut self, value: impl Into<String>) -> Self {
        self.inner.uris.push(value.into());
        self
    }

    /// Declare the requested key.
    pub fn key(mut self, key: KeySpec) -> Self {
        self.inner.key = Some(key);
        self
    }

    /// Keep the encoded request bytes.
    pub fn raw(mut self, raw: impl Into<Vec<u8>>) -> Self {
        self.inner.raw = raw.into();
        self
    }

    /// Build the request.
    pub fn build(self) -> CertificateRequest {
        self.inner
    }
}

fn csr_der(bytes: &[u8]) -> Result<Vec<u8>> {
    if bytes.first() == Some(&DER_SEQUENCE) {
        return Ok(bytes.to_vec());
    }
    let Some(block) = pem_block(bytes) else {
        return Ok(bytes.to_vec());
    };

    let (label, der) = der::pem::decode_vec(block)
        .map_err(|e| GatewayError::malformed(format!("PEM block in CSR is invalid: {e}")))?;
    if !PEM_LABELS.contains(&label) {
        return Err(GatewayError::malformed(format!(
            "Unexpected PEM label in CSR: {label}"
        )));
    }
    Ok(der)
}

/// First PEM block in `bytes`, skipping any text before or after it.
fn pem_block(bytes: &[u8]) -> Option<&[u8]> {
    let block = &bytes[find(bytes, PEM_BEGIN)?..];
    let end = find(block, PEM_END)
        .and_then(|at| {
            let rest = at + PEM_END.len();
            find(&block[rest..], PEM_DASHES).map(|close| rest + close + PEM_DASHES.len())
        })
        .unwrap_or(block.len());
    Some(&block[..end])
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack
        .windows(needle.len())
        .position(|window| window == needle)
}

fn attribute_string(atv: &AttributeTypeAndValue) -> Result<String> {
    let bytes = atv.value.value();
    if atv.value.tag() == Tag::BmpString {
        if bytes.len() % 2 != 0 {
            return Err(GatewayError::malformed("Odd-length BMPString in CSR subject"));
        }
        let units: Vec<u16> = bytes
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect();
        return String::from_utf16(&units)
            .map_err(|_| GatewayError::malformed("Invalid BMPString in CSR subject"));
    }
    std::str::from_utf8(bytes)
        .map(str::to_owned)
        .map_err(|_| GatewayError::malformed("Non UTF-8 value in CSR subject"))
}

fn ip_string(octets: &[u8]) -> Result<String> {
    let ip = match octets.len() {
        4 => {
            let mut v4 = [0u8; 4];
            v4.copy_from_slice(octets);
            IpAddr::V4(Ipv4Addr::from(v4))
        }
        16 => {
            let mut v6 = [0u8; 16];
            v6.copy_from_slice(octets);
            IpAddr::V6(Ipv6Addr::from(v6))
        }
        n => {
            return Err(GatewayError::malformed(format!(
                "IP address SAN has invalid length {n}"
            )))
        }
    };
    Ok(ip.to_string())
}

#[derive(Sequence)]
struct RsaPublicKey<'a> {
    modulus: UintRef<'a>,
    public_exponent: UintRef<'a>,
}

fn rsa_key_bits(public_key: &[u8]) -> Result<u32> {
    let key = RsaPublicKey::from_der(public_key)
        .map_err(|e| GatewayError::malformed(format!("Invalid RSA public key: {e}")))?;
    let modulus = key.modulus.as_bytes();
    let leading = modulus.first().map_or(0, |b| b.leading_zeros());
    Ok((modulus.len() as u32) * 8 - leading)
}

fn key_spec(spki: &SubjectPublicKeyInfoOwned) -> Result<KeySpec> {
    let oid = spki.algorithm.oid;
    if oid == RSA_ENCRYPTION {
        return Ok(KeySpec::rsa(rsa_key_bits(spki.subject_public_key.raw_bytes())?));
    }
    if oid == ED25519 {
        return Ok(KeySpec::ed25519());
    }
    if oid == EC_PUBLIC_KEY {
        let params = spki
            .algorithm
            .parameters
            .as_ref()
            .ok_or_else(|| GatewayError::malformed("EC public key without curve parameters"))?;
        let curve = ObjectIdentifier::from_der(&params.to_der()?)
            .map_err(|e| GatewayError::malformed(format!("Invalid EC curve parameters: {e}")))?;
        let curve = match curve {
            c if c == SECP256R1 => EllipticCurve::P256,
            c if c == SECP384R1 => EllipticCurve::P384,
            c if c == SECP521R1 => EllipticCurve::P521,
            other => {
                return Err(GatewayError::malformed(format!(
                    "Unsupported EC curve: {other}"
                )))
            }
        };
        return Ok(KeySpec::ecdsa(curve));
    }
    Err(GatewayError::malformed(format!(
        "Unsupported public key algorithm: {oid}"
    )))
}
