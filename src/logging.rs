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

//! Logging setup for the gateway binaries.
//!
//! Output goes to stdout through `tracing-subscriber`, as text or one JSON
//! object per line. Timestamps are left to the log sink.
//!
//! | Variable | Values | Default |
//! |---|---|---|
//! | `LOG_LEVEL` | `trace`, `debug`, `info`, `warn`, `error` | `info` |
//! | `LOG_FORMAT` | `text`, `json` | `text` |

use crate::error::{GatewayError, Result};

/// Log level for filtering messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub enum LogLevel {
    /// Most verbose - all messages.
    Trace,
    /// Debug information.
    Debug,
    /// Informational messages.
    #[default]
    Info,
    /// Warnings.
    Warn,
    /// Errors only.
    Error,
}

impl LogLevel {
    /// Parse from string representation.
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "trace" => Some(Self::Trace),
            "debug" => Some(Self::Debug),
            "info" => Some(Self::Info),
            "warn" | "warning" => Some(Self::Warn),
            "error" => Some(Self::Error),
            _ => None,
        }
    }

    /// Get the level name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "TRACE",
            Self::Debug => "DEBUG",
            Self::Info => "INFO",
            Self::Warn => "WARN",
            Self::Error => "ERROR",
        }
    }

    fn as_tracing(&self) -> tracing::Level {
        match self {
            Self::Trace => tracing::Level::TRACE,
            Self::Debug => tracing::Level::DEBUG,
            Self::Info => tracing::Level::INFO,
            Self::Warn => tracing::Level::WARN,
            Self::Error => tracing::Level::ERROR,
        }
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Default)]
pub struct LogConfig {
    /// Minimum log level to output.
    pub level: LogLevel,
    /// Use JSON format for log entries.
    pub json_format: bool,
}

impl LogConfig {
    /// Read logging configuration from the process environment.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read logging configuration through `lookup`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error for an unknown level or format.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let level = match lookup("LOG_LEVEL").filter(|v| !v.is_empty()) {
            Some(level) => LogLevel::parse(&level)
                .ok_or_else(|| GatewayError::config(format!("unknown LOG_LEVEL: {level}")))?,
            None => LogLevel::default(),
        };
        let json_format = match lookup("LOG_FORMAT").map(|v| v.to_lowercase()) {
            None => false,
            Some(format) => match format.as_str() {
                "" | "text" => false,
                "json" => true,
                other => {
                    return Err(GatewayError::config(format!("unknown LOG_FORMAT: {other}")))
                }
            },
        };
        Ok(Self { level, json_format })
    }

    /// Install the global subscriber.
    ///
    /// Does nothing if a subscriber is already installed.
    pub fn init(&self) {
        let builder = tracing_subscriber::fmt()
            .with_max_level(self.level.as_tracing())
            .with_target(false)
            .without_time();

        let installed = if self.json_format {
            builder.json().try_init()
        } else {
            builder.try_init()
        };
        if installed.is_err() {
            tracing::debug!("Global subscriber already installed");
            return;
        }
        let format = if self.json_format { "json" } else { "text" };
        tracing::debug!("Logging at {} as {}", self.level, format);
    }
}
