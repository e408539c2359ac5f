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

//! Decryption of issuer credentials.
//!
//! When `ENCRYPTED_CREDENTIALS` does not start with `f`, the issuer password
//! and API key are base64-encoded ciphertext. They are decrypted once at
//! start-up, before the issuer connector is built.

use async_trait::async_trait;
use base64::prelude::*;

use crate::config::{IssuerConfig, IssuerCredentials};
use crate::error::{GatewayError, Result};

/// Decrypts credential ciphertext.
#[async_trait]
pub trait CredentialDecryptor: Send + Sync {
    /// Decrypt `ciphertext` into plaintext.
    async fn decrypt(&self, ciphertext: &[u8]) -> Result<String>;
}

/// Return `config` with plaintext credentials.
///
/// Configurations whose credentials are already plaintext are returned
/// unchanged. Usernames are never encrypted.
pub async fn decrypt_credentials(
    mut config: IssuerConfig,
    decryptor: &dyn CredentialDecryptor,
) -> Result<IssuerConfig> {
    if !config.credentials_encrypted {
        return Ok(config);
    }

    config.credentials = match config.credentials {
        IssuerCredentials::Basic { username, password } => IssuerCredentials::Basic {
            username,
            password: decrypt_field(&password, decryptor).await?,
        },
        IssuerCredentials::ApiKey(key) => {
            IssuerCredentials::ApiKey(decrypt_field(&key, decryptor).await?)
        }
    };
    config.credentials_encrypted = false;
    tracing::debug!("Issuer credentials decrypted");
    Ok(config)
}

async fn decrypt_field(encoded: &str, decryptor: &dyn CredentialDecryptor) -> Result<String> {
    if encoded.is_empty() {
        return Ok(String::new());
    }
    let ciphertext = BASE64_STANDARD
        .decode(encoded.trim())
        .map_err(|e| GatewayError::credentials(format!("ciphertext is not base64: {e}")))?;
    decryptor.decrypt(&ciphertext).await
}

/// Decryptor backed by AWS KMS.
#[cfg(feature = "aws")]
#[derive(Debug, Clone)]
pub struct KmsDecryptor {
    client: aws_sdk_kms::Client,
}

#[cfg(feature = "aws")]
impl KmsDecryptor {
    /// Create a decryptor over a KMS client.
    pub fn new(client: aws_sdk_kms::Client) -> Self {
        Self { client }
    }
}

#[cfg(feature = "aws")]
#[async_trait]
impl CredentialDecryptor for KmsDecryptor {
    async fn decrypt(&self, ciphertext: &[u8]) -> Result<String> {
        let output = self
            .client
            .decrypt()
            .ciphertext_blob(aws_sdk_kms::primitives::Blob::new(ciphertext))
            .send()
            .await
            .map_err(|e| {
                GatewayError::credentials(aws_sdk_kms::error::DisplayErrorContext(e).to_string())
            })?;

        let plaintext = output
            .plaintext()
            .ok_or_else(|| GatewayError::credentials("KMS returned no plaintext"))?;
        String::from_utf8(plaintext.as_ref().to_vec())
            .map_err(|_| GatewayError::credentials("decrypted credential is not UTF-8"))
    }
}
