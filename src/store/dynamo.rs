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

//! DynamoDB-backed policy store.
//!
//! One item per zone, keyed by `PolicyID`. Pattern categories are stored as
//! lists of strings under the same attribute names the JSON form uses, and
//! key configurations as a list of maps.

use async_trait::async_trait;
use aws_sdk_dynamodb::error::DisplayErrorContext;
use aws_sdk_dynamodb::types::AttributeValue;
use aws_sdk_dynamodb::Client;
use std::collections::HashMap;
use tracing::debug;

use super::{PolicyStore, StoreError};
use crate::policy::{AllowedKeyConfiguration, EllipticCurve, KeyAlgorithm, Policy};

const PRIMARY_KEY: &str = "PolicyID";

type Item = HashMap<String, AttributeValue>;

/// Policy store on a DynamoDB table.
#[derive(Debug, Clone)]
pub struct DynamoPolicyStore {
    client: Client,
    table_name: String,
}

impl DynamoPolicyStore {
    /// Create a store over `table_name`.
    pub fn new(client: Client, table_name: impl Into<String>) -> Self {
        Self {
            client,
            table_name: table_name.into(),
        }
    }

    /// Table the store reads and writes.
    pub fn table_name(&self) -> &str {
        &self.table_name
    }

    async fn put_item(&self, item: Item) -> Result<(), StoreError> {
        self.client
            .put_item()
            .table_name(&self.table_name)
            .set_item(Some(item))
            .send()
            .await
            .map_err(|e| StoreError::backend(DisplayErrorContext(e).to_string()))?;
        Ok(())
    }
}

#[async_trait]
impl PolicyStore for DynamoPolicyStore {
    async fn get(&self, name: &str) -> Result<Policy, StoreError> {
        let output = self
            .client
            .get_item()
            .table_name(&self.table_name)
            .key(PRIMARY_KEY, AttributeValue::S(name.to_string()))
            .consistent_read(true)
            .send()
            .await
            .map_err(|e| StoreError::backend(DisplayErrorContext(e).to_string()))?;

        match output.item() {
            Some(item) => item_to_policy(name, item),
            None => Err(StoreError::NotFound(name.to_string())),
        }
    }

    async fn put(&self, name: &str, policy: &Policy) -> Result<(), StoreError> {
        debug!("Writing policy {} to {}", name, self.table_name);
        self.put_item(policy_to_item(name, policy)).await
    }

    async fn delete(&self, name: &str) -> Result<(), StoreError> {
        debug!("Deleting policy {} from {}", name, self.table_name);
        self.client
            .delete_item()
            .table_name(&self.table_name)
            .key(PRIMARY_KEY, AttributeValue::S(name.to_string()))
            .send()
            .await
            .map_err(|e| StoreError::backend(DisplayErrorContext(e).to_string()))?;
        Ok(())
    }

    async fn list_names(&self) -> Result<Vec<String>, StoreError> {
        let mut names = Vec::new();
        let mut start_key: Option<Item> = None;

        loop {
            let output = self
                .client
                .scan()
                .table_name(&self.table_name)
                .projection_expression("#id")
                .expression_attribute_names("#id", PRIMARY_KEY)
                .set_exclusive_start_key(start_key.take())
                .send()
                .await
                .map_err(|e| StoreError::backend(DisplayErrorContext(e).to_string()))?;

            for item in output.items() {
                if let Some(AttributeValue::S(name)) = item.get(PRIMARY_KEY) {
                    names.push(name.clone());
                }
            }

            match output.last_evaluated_key() {
                Some(key) if !key.is_empty() => start_key = Some(key.clone()),
                _ => break,
            }
        }

        Ok(names)
    }

    async fn create_empty(&self, name: &str) -> Result<(), StoreError> {
        debug!("Creating empty policy {} in {}", name, self.table_name);
        let mut item = Item::new();
        item.insert(PRIMARY_KEY.to_string(), AttributeValue::S(name.to_string()));
        self.put_item(item).await
    }
}

fn string_list(values: &[String]) -> AttributeValue {
    AttributeValue::L(values.iter().cloned().map(AttributeValue::S).collect())
}

fn policy_to_item(name: &str, policy: &Policy) -> Item {
    let mut item = Item::new();
    item.insert(PRIMARY_KEY.to_string(), AttributeValue::S(name.to_string()));

    let lists = [
        ("SubjectCNRegexes", &policy.subject_cn_regexes),
        ("SubjectORegexes", &policy.subject_o_regexes),
        ("SubjectOURegexes", &policy.subject_ou_regexes),
        ("SubjectSTRegexes", &policy.subject_st_regexes),
        ("SubjectLRegexes", &policy.subject_l_regexes),
        ("SubjectCRegexes", &policy.subject_c_regexes),
        ("DnsSanRegExs", &policy.dns_san_regexes),
        ("IpSanRegExs", &policy.ip_san_regexes),
        ("EmailSanRegExs", &policy.email_san_regexes),
        ("UriSanRegExs", &policy.uri_san_regexes),
    ];
    for (attr, values) in lists {
        item.insert(attr.to_string(), string_list(values));
    }

    let keys = policy
        .allowed_key_configurations
        .iter()
        .map(|cfg| {
            let mut map = HashMap::new();
            map.insert(
                "KeyType".to_string(),
                AttributeValue::S(cfg.key_type.as_str().to_string()),
            );
            map.insert(
                "KeySizes".to_string(),
                AttributeValue::L(
                    cfg.key_sizes
                        .iter()
                        .map(|size| AttributeValue::N(size.to_string()))
                        .collect(),
                ),
            );
            map.insert(
                "KeyCurves".to_string(),
                AttributeValue::L(
                    cfg.key_curves
                        .iter()
                        .map(|curve| AttributeValue::S(curve.as_str().to_string()))
                        .collect(),
                ),
            );
            AttributeValue::M(map)
        })
        .collect();
    item.insert("AllowedKeyConfigurations".to_string(), AttributeValue::L(keys));

    item.insert(
        "AllowKeyReuse".to_string(),
        AttributeValue::Bool(policy.allow_key_reuse),
    );
    item.insert(
        "AllowWildcards".to_string(),
        AttributeValue::Bool(policy.allow_wildcards),
    );
    item
}

fn read_strings(name: &str, item: &Item, attr: &str) -> Result<Vec<String>, StoreError> {
    match item.get(attr) {
        None | Some(AttributeValue::Null(_)) => Ok(Vec::new()),
        Some(AttributeValue::Ss(values)) => Ok(values.clone()),
        Some(AttributeValue::L(values)) => values
            .iter()
            .map(|value| match value {
                AttributeValue::S(s) => Ok(s.clone()),
                _ => Err(StoreError::invalid_record(
                    name,
                    format!("{attr} holds a non-string entry"),
                )),
            })
            .collect(),
        Some(_) => Err(StoreError::invalid_record(
            name,
            format!("{attr} is not a list"),
        )),
    }
}

fn read_bool(item: &Item, attr: &str) -> bool {
    matches!(item.get(attr), Some(AttributeValue::Bool(true)))
}

fn read_key_configuration(
    name: &str,
    value: &AttributeValue,
) -> Result<AllowedKeyConfiguration, StoreError> {
    let AttributeValue::M(map) = value else {
        return Err(StoreError::invalid_record(
            name,
            "AllowedKeyConfigurations holds a non-map entry",
        ));
    };

    let key_type = match map.get("KeyType") {
        Some(AttributeValue::S(s)) => s
            .parse::<KeyAlgorithm>()
            .map_err(|e| StoreError::invalid_record(name, e.to_string()))?,
        _ => return Err(StoreError::invalid_record(name, "KeyType is missing")),
    };

    let key_sizes = match map.get("KeySizes") {
        None | Some(AttributeValue::Null(_)) => Vec::new(),
        Some(AttributeValue::Ns(values)) => values
            .iter()
            .map(|n| parse_size(name, n))
            .collect::<Result<_, _>>()?,
        Some(AttributeValue::L(values)) => values
            .iter()
            .map(|value| match value {
                AttributeValue::N(n) => parse_size(name, n),
                _ => Err(StoreError::invalid_record(name, "KeySizes holds a non-number")),
            })
            .collect::<Result<_, _>>()?,
        Some(_) => return Err(StoreError::invalid_record(name, "KeySizes is not a list")),
    };

    let key_curves = read_strings(name, map, "KeyCurves")?
        .iter()
        .map(|curve| {
            serde_json::from_value::<EllipticCurve>(serde_json::Value::String(curve.clone()))
                .map_err(|_| StoreError::invalid_record(name, format!("unknown curve {curve}")))
        })
        .collect::<Result<_, _>>()?;

    Ok(AllowedKeyConfiguration {
        key_type,
        key_sizes,
        key_curves,
    })
}

fn parse_size(name: &str, n: &str) -> Result<u32, StoreError> {
    n.parse::<u32>()
        .map_err(|_| StoreError::invalid_record(name, format!("invalid key size {n}")))
}

fn item_to_policy(name: &str, item: &Item) -> Result<Policy, StoreError> {
    let allowed_key_configurations = match item.get("AllowedKeyConfigurations") {
        None | Some(AttributeValue::Null(_)) => Vec::new(),
        Some(AttributeValue::L(values)) => values
            .iter()
            .map(|value| read_key_configuration(name, value))
            .collect::<Result<_, _>>()?,
        Some(_) => {
            return Err(StoreError::invalid_record(
                name,
                "AllowedKeyConfigurations is not a list",
            ))
        }
    };

    Ok(Policy {
        subject_cn_regexes: read_strings(name, item, "SubjectCNRegexes")?,
        subject_o_regexes: read_strings(name, item, "SubjectORegexes")?,
        subject_ou_regexes: read_strings(name, item, "SubjectOURegexes")?,
        subject_st_regexes: read_strings(name, item, "SubjectSTRegexes")?,
        subject_l_regexes: read_strings(name, item, "SubjectLRegexes")?,
        subject_c_regexes: read_strings(name, item, "SubjectCRegexes")?,
        allowed_key_configurations,
        dns_san_regexes: read_strings(name, item, "DnsSanRegExs")?,
        ip_san_regexes: read_strings(name, item, "IpSanRegExs")?,
        email_san_regexes: read_strings(name, item, "EmailSanRegExs")?,
        uri_san_regexes: read_strings(name, item, "UriSanRegExs")?,
        allow_key_reuse: read_bool(item, "AllowKeyReuse"),
        allow_wildcards: read_bool(item, "AllowWildcards"),
    })
}
