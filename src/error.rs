//! Error types for the policy gateway.
//!
//! This module defines the crate-wide [`GatewayError`] and the
//! [`DenialStatus`] category every error maps to when it is turned into a
//! denial response.

use thiserror::Error;

use crate::ca::CaError;
use crate::issuer::IssuerError;
use crate::policy::PolicyViolation;
use crate::store::StoreError;

/// Result type alias using [`GatewayError`].
pub type Result<T> = std::result::Result<T, GatewayError>;

/// Stable status category carried by every denial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DenialStatus {
    /// The request could not be parsed (HTTP 422).
    UnprocessableEntity,
    /// The request was parsed but the policy refused it (HTTP 403).
    Forbidden,
    /// The operation identifier is not one the gateway routes (HTTP 405).
    NotAllowed,
    /// The policy could not be loaded (HTTP 424).
    FailedDependency,
    /// The certificate authority or the gateway itself failed (HTTP 500).
    InternalError,
}

impl DenialStatus {
    /// HTTP status code for this category.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::UnprocessableEntity => 422,
            Self::Forbidden => 403,
            Self::NotAllowed => 405,
            Self::FailedDependency => 424,
            Self::InternalError => 500,
        }
    }
}

/// Errors that can occur while handling a certificate request.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Request body, CSR or header could not be decoded.
    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    /// The request does not satisfy the named policy.
    #[error("{0}")]
    PolicyViolation(#[from] PolicyViolation),

    /// The named policy could not be loaded.
    #[error("Policy unavailable: {0}")]
    PolicyUnavailable(String),

    /// The operation identifier is not routed by the gateway.
    #[error("Operation not allowed: {0}")]
    UnknownOperation(String),

    /// The certificate authority call failed.
    #[error("Certificate authority error: {0}")]
    CertificateAuthority(String),

    /// Policy store error outside the request path (synchronizer, CLI).
    #[error("Policy store error: {0}")]
    Store(#[from] StoreError),

    /// External issuer error.
    #[error("Issuer error: {0}")]
    Issuer(#[from] IssuerError),

    /// Invalid or incomplete configuration.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Credential decryption failed.
    #[error("Credential error: {0}")]
    Credentials(String),

    /// Base64 decoding error.
    #[error("Base64 decode error: {0}")]
    Base64(#[from] base64::DecodeError),

    /// DER encoding/decoding error.
    #[error("DER error: {0}")]
    Der(#[from] der::Error),

    /// JSON encoding/decoding error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// URL parsing error.
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl GatewayError {
    /// Create a malformed request error with the given message.
    pub fn malformed(msg: impl Into<String>) -> Self {
        Self::MalformedRequest(msg.into())
    }

    /// Create a policy unavailable error with the given message.
    pub fn policy_unavailable(msg: impl Into<String>) -> Self {
        Self::PolicyUnavailable(msg.into())
    }

    /// Create an unknown operation error for the given target.
    pub fn unknown_operation(target: impl Into<String>) -> Self {
        Self::UnknownOperation(target.into())
    }

    /// Create a certificate authority error with the given message.
    pub fn certificate_authority(msg: impl Into<String>) -> Self {
        Self::CertificateAuthority(msg.into())
    }

    /// Create a configuration error with the given message.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a credential error with the given message.
    pub fn credentials(msg: impl Into<String>) -> Self {
        Self::Credentials(msg.into())
    }

    /// Denial category for this error.
    pub fn status(&self) -> DenialStatus {
        match self {
            Self::MalformedRequest(_) | Self::Base64(_) | Self::Der(_) | Self::Json(_) => {
                DenialStatus::UnprocessableEntity
            }
            Self::PolicyViolation(_) => DenialStatus::Forbidden,
            Self::UnknownOperation(_) => DenialStatus::NotAllowed,
            Self::PolicyUnavailable(_) | Self::Store(_) => DenialStatus::FailedDependency,
            Self::CertificateAuthority(_)
            | Self::Issuer(_)
            | Self::Config(_)
            | Self::Credentials(_)
            | Self::Url(_)
            | Self::Io(_) => DenialStatus::InternalError,
        }
    }

    /// Returns true if this error is a policy decision rather than a failure.
    pub fn is_policy_decision(&self) -> bool {
        matches!(self, Self::PolicyViolation(_))
    }
}

impl From<CaError> for GatewayError {
    fn from(err: CaError) -> Self {
        match err {
            CaError::InvalidInput(msg) => Self::MalformedRequest(msg),
            other => Self::CertificateAuthority(other.to_string()),
        }
    }
}
