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

//! Policy operator tool.
//!
//! # Usage
//!
//! ```text
//! pca-policy [OPTIONS] <COMMAND>
//!
//! Commands:
//!   check  Check a CSR or a domain request against a policy file
//!   show   Print a policy file in stored form
//!
//! Options:
//!   -v, --verbose  Enable verbose output
//!   -h, --help     Print help
//!   -V, --version  Print version
//! ```
//!
//! # Examples
//!
//! ```bash
//! # Check a CSR
//! pca-policy check --policy web.json --csr host.csr
//!
//! # Check what a RequestCertificate call would be judged as
//! pca-policy check --policy web.toml --domain www.example.com --san api.example.com
//! ```
//!
//! `check` exits 0 when the request is allowed, 1 when it is denied and 2 on
//! any other error.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use pca_policy_gateway::logging::{LogConfig, LogLevel};
use pca_policy_gateway::{validate_all, CertificateRequest, FieldCategory, Policy};

/// Policy operator tool
#[derive(Parser)]
#[command(name = "pca-policy")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Check certificate requests against issuance policies", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a CSR or a domain request against a policy file
    Check {
        /// Policy file (JSON, or TOML with a .toml extension)
        #[arg(short, long, value_name = "PATH")]
        policy: PathBuf,

        /// PKCS#10 request, PEM or DER
        #[arg(
            long,
            value_name = "PATH",
            conflicts_with = "domain",
            required_unless_present = "domain"
        )]
        csr: Option<PathBuf>,

        /// Domain name, checked as common name and DNS SAN
        #[arg(long, value_name = "NAME")]
        domain: Option<String>,

        /// Additional DNS SAN (with --domain)
        #[arg(long, value_name = "NAME", requires = "domain")]
        san: Vec<String>,
    },

    /// Print a policy file in stored form
    Show {
        /// Policy file (JSON, or TOML with a .toml extension)
        #[arg(short, long, value_name = "PATH")]
        policy: PathBuf,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    LogConfig {
        level: if cli.verbose {
            LogLevel::Debug
        } else {
            LogLevel::Warn
        },
        json_format: false,
    }
    .init();

    let result = match &cli.command {
        Commands::Check {
            policy,
            csr,
            domain,
            san,
        } => cmd_check(policy, csr.as_deref(), domain.as_deref(), san),
        Commands::Show { policy } => cmd_show(policy).map(|()| ExitCode::SUCCESS),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::from(2)
        }
    }
}

fn cmd_check(
    policy_path: &Path,
    csr: Option<&Path>,
    domain: Option<&str>,
    sans: &[String],
) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let policy = load_policy(policy_path)?;

    let request = match (csr, domain) {
        (Some(path), _) => CertificateRequest::from_csr(&std::fs::read(path)?)?,
        (None, Some(domain)) => CertificateRequest::for_domain(domain, sans),
        (None, None) => return Err("either --csr or --domain is required".into()),
    };

    println!("Common name: {}", request.common_name());
    for category in FieldCategory::CANONICAL_ORDER {
        let values = request.values(category);
        if category.is_optional() && !values.is_empty() {
            println!("{}: {:?}", category, values);
        }
    }
    if let Some(key) = request.key() {
        println!("Key: {}", key);
    }
    println!();

    let violations = validate_all(&request, &policy);
    if violations.is_empty() {
        println!("allowed");
        return Ok(ExitCode::SUCCESS);
    }

    println!("denied");
    for violation in &violations {
        println!("  - {}", violation);
    }
    Ok(ExitCode::FAILURE)
}

fn cmd_show(policy_path: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let policy = load_policy(policy_path)?;
    println!("{}", policy.to_json()?);
    if policy.is_empty() {
        eprintln!("warning: policy is empty and denies every request");
    } else if policy.subject_cn_regexes.is_empty() {
        eprintln!("warning: SubjectCNRegexes is empty, every request is denied");
    }
    Ok(())
}

fn load_policy(path: &Path) -> Result<Policy, Box<dyn std::error::Error>> {
    let text = std::fs::read_to_string(path)?;
    let policy = match path.extension().and_then(|e| e.to_str()) {
        Some("toml") => Policy::from_toml(&text)?,
        _ => Policy::from_json(&text)?,
    };
    Ok(policy)
}
