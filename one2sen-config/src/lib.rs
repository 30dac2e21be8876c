// Copyright 2024, The Tremor Team
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

//! Configuration for a one2sen run.
//!
//! A run is configured from an optional YAML file, every key of which can be
//! overridden by an environment variable. Defaults are filled in afterwards
//! and the result is validated before anything talks to the network.
#![deny(missing_docs)]
#![deny(
    clippy::all,
    clippy::unwrap_used,
    clippy::unnecessary_unwrap,
    clippy::pedantic,
    clippy::mod_module_files
)]

/// Duration parsing
pub mod duration;
mod env;

use log::LevelFilter;
use one2sen_common::base64;
use serde::Deserialize;
use std::{
    fmt,
    path::{Path, PathBuf},
    str::FromStr,
    time::Duration,
};

/// Default configuration file, it is fine if it doesn't exist
pub const DEFAULT_CONFIG_FILE: &str = "config.yml";

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The configuration file could not be read
    #[error("failed to load configuration file at '{path}': {source}")]
    Io {
        /// the file
        path: PathBuf,
        /// the cause
        #[source]
        source: std::io::Error,
    },
    /// The configuration file is not valid YAML or has unknown keys
    #[error("failed to parse configuration: {0}")]
    Yaml(#[from] serde_yaml::Error),
    /// An environment variable holds a value of the wrong type
    #[error("could not load environment: invalid value `{value}` for {key}")]
    Env {
        /// variable name
        key: &'static str,
        /// the offending value
        value: String,
    },
    /// A duration that can't be parsed
    #[error("invalid duration `{0}`")]
    Duration(String),
    /// The configuration is incomplete or inconsistent
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Result alias for configuration loading
pub type Result<T> = std::result::Result<T, Error>;

/// A secret value, never printed
#[derive(Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Secret(String);

impl Secret {
    /// The raw value
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }

    /// True if no secret was configured
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for Secret {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for Secret {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            f.write_str("Secret(<empty>)")
        } else {
            f.write_str("Secret(***)")
        }
    }
}

/// Logging
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Log {
    /// `error`, `warn`, `info`, `debug` or `trace`
    pub level: String,
}

impl Default for Log {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Log {
    /// The level as a filter
    ///
    /// # Errors
    /// if the level is unknown
    pub fn level_filter(&self) -> Result<LevelFilter> {
        LevelFilter::from_str(&self.level)
            .map_err(|_| Error::Invalid(format!("unknown log level `{}`", self.level)))
    }
}

/// The 1Password events API
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OnePassword {
    /// bearer token for the events API
    pub api_token: Secret,
    /// how far back to fetch events
    #[serde(deserialize_with = "duration::deserialize")]
    pub lookback: Duration,
    /// events API base url
    pub url: String,
    /// items per page on the initial request
    pub page_limit: u32,
    /// pagination safety valve
    pub max_rounds: u32,
    /// per request timeout
    #[serde(deserialize_with = "duration::deserialize")]
    pub timeout: Duration,
}

impl Default for OnePassword {
    fn default() -> Self {
        Self {
            api_token: Secret::default(),
            lookback: Duration::from_secs(24 * 60 * 60),
            url: "https://events.1password.com".to_string(),
            page_limit: 100,
            max_rounds: 1000,
            timeout: Duration::from_secs(60),
        }
    }
}

/// Data collection rule used by the logs ingestion API
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Dcr {
    /// data collection endpoint, e.g. `https://my-dce.westeurope-1.ingest.monitor.azure.com`
    pub endpoint: String,
    /// immutable id of the rule
    pub rule_id: String,
    /// input stream of the rule
    pub stream_name: String,
}

impl Dcr {
    fn is_complete(&self) -> bool {
        !(self.endpoint.is_empty() || self.rule_id.is_empty() || self.stream_name.is_empty())
    }
}

/// Microsoft Sentinel / Log Analytics
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Microsoft {
    /// service principal application id
    pub app_id: String,
    /// service principal secret
    pub secret_key: Secret,
    /// tenant of the service principal
    pub tenant_id: String,
    /// subscription holding the workspace
    pub subscription_id: String,
    /// resource group holding the workspace
    pub resource_group: String,
    /// log analytics workspace name
    pub workspace_name: String,
    /// log analytics workspace id (shared key delivery)
    pub workspace_id: String,
    /// primary or secondary workspace key (shared key delivery)
    pub workspace_key: Secret,
    /// data collector host, the workspace id is prepended
    pub ingestion_host: String,
    /// destination table
    pub table_name: String,
    /// logs ingestion rule (dcr delivery)
    pub dcr: Dcr,
    /// interactive retention of the table
    pub retention_days: u32,
    /// create or update the table before shipping
    pub update_table: bool,
    /// token authority
    pub authority: String,
    /// resource manager endpoint
    pub management_url: String,
}

impl Default for Microsoft {
    fn default() -> Self {
        Self {
            app_id: String::new(),
            secret_key: Secret::default(),
            tenant_id: String::new(),
            subscription_id: String::new(),
            resource_group: String::new(),
            workspace_name: String::new(),
            workspace_id: String::new(),
            workspace_key: Secret::default(),
            ingestion_host: "ods.opinsights.azure.com".to_string(),
            table_name: "OnePasswordLogs_CL".to_string(),
            dcr: Dcr::default(),
            retention_days: 90,
            update_table: false,
            authority: "https://login.microsoftonline.com".to_string(),
            management_url: "https://management.azure.com".to_string(),
        }
    }
}

impl Microsoft {
    fn has_service_principal(&self) -> bool {
        !(self.tenant_id.is_empty() || self.app_id.is_empty() || self.secret_key.is_empty())
    }

    fn has_shared_key(&self) -> bool {
        !(self.workspace_id.is_empty() || self.workspace_key.is_empty())
    }
}

/// How batches are authorized
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMode {
    /// HTTP Data Collector API, HMAC signed
    SharedKey,
    /// Logs ingestion API via a data collection rule, bearer token
    Dcr,
}

impl FromStr for DeliveryMode {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "shared_key" | "sharedkey" => Ok(Self::SharedKey),
            "dcr" => Ok(Self::Dcr),
            _ => Err(()),
        }
    }
}

impl fmt::Display for DeliveryMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::SharedKey => f.write_str("shared_key"),
            Self::Dcr => f.write_str("dcr"),
        }
    }
}

/// Batch delivery
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Delivery {
    /// explicit mode, derived from the configured credentials if absent
    pub mode: Option<DeliveryMode>,
    /// maximum records per delivery call
    pub batch_size: usize,
    /// transport error retries per batch
    pub retries: u32,
    /// base of the exponential backoff
    #[serde(deserialize_with = "duration::deserialize")]
    pub backoff: Duration,
    /// per request timeout
    #[serde(deserialize_with = "duration::deserialize")]
    pub timeout: Duration,
}

impl Default for Delivery {
    fn default() -> Self {
        Self {
            mode: None,
            batch_size: 10,
            retries: 2,
            backoff: Duration::from_secs(1),
            timeout: Duration::from_secs(10),
        }
    }
}

/// Complete run configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// logging
    pub log: Log,
    /// event source
    pub onepassword: OnePassword,
    /// event destination
    pub microsoft: Microsoft,
    /// batch delivery
    pub delivery: Delivery,
}

impl Config {
    /// Loads the configuration file (if any), applies the process environment and validates.
    ///
    /// Without an explicit `path` the default file is used when present.
    ///
    /// # Errors
    /// if the file can't be read or parsed, the environment holds invalid values
    /// or the result is invalid
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.normalize();
        config.validate()?;
        Ok(config)
    }

    /// Reads a YAML configuration file, missing keys take their defaults
    ///
    /// # Errors
    /// if the file can't be read or parsed
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|source| Error::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml(&raw)
    }

    /// Parses a YAML document
    ///
    /// # Errors
    /// if the document is invalid
    pub fn from_yaml(raw: &str) -> Result<Self> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(raw)?)
    }

    /// Overrides values with the variables `lookup` knows about
    ///
    /// # Errors
    /// if a variable can't be parsed into its target type
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        env::overlay(self, lookup)
    }

    /// Trims trailing slashes from urls
    pub fn normalize(&mut self) {
        for url in [
            &mut self.onepassword.url,
            &mut self.microsoft.authority,
            &mut self.microsoft.management_url,
            &mut self.microsoft.dcr.endpoint,
        ] {
            let trimmed = url.trim_end_matches('/').len();
            url.truncate(trimmed);
        }
    }

    /// The delivery mode, explicit or derived from the credentials at hand
    #[must_use]
    pub fn delivery_mode(&self) -> DeliveryMode {
        self.delivery.mode.unwrap_or(if self.microsoft.has_shared_key() {
            DeliveryMode::SharedKey
        } else {
            DeliveryMode::Dcr
        })
    }

    /// Checks that everything a run needs is present and sane
    ///
    /// # Errors
    /// describing the first problem found
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: &str| Err(Error::Invalid(msg.to_string()));
        self.log.level_filter()?;

        let op = &self.onepassword;
        if op.api_token.is_empty() {
            return invalid("no onepassword api token provided");
        }
        if !op.url.starts_with("https://") {
            return invalid("OnePassword tenant URL must start with https://");
        }
        if op.lookback.is_zero() {
            return invalid("lookback must be greater than zero");
        }
        if !(1..=1000).contains(&op.page_limit) {
            return invalid("page_limit must be between 1 and 1000");
        }
        if op.max_rounds == 0 {
            return invalid("max_rounds must be at least 1");
        }
        if self.delivery.batch_size == 0 {
            return invalid("batch_size must be at least 1");
        }

        let ms = &self.microsoft;
        if !ms.table_name.ends_with("_CL") {
            return invalid("table_name must end with _CL");
        }
        match self.delivery_mode() {
            DeliveryMode::SharedKey => {
                if !ms.has_shared_key() {
                    return invalid("shared key delivery needs workspace_id and workspace_key");
                }
                if !base64::is_valid(ms.workspace_key.expose()) {
                    return invalid("workspace_key is not valid base64");
                }
            }
            DeliveryMode::Dcr => {
                if !ms.has_service_principal() {
                    return invalid("dcr delivery needs tenant_id, app_id and secret_key");
                }
                if !ms.dcr.is_complete() {
                    return invalid("dcr delivery needs dcr endpoint, rule_id and stream_name");
                }
            }
        }
        if ms.update_table {
            if !ms.has_service_principal() {
                return invalid("update_table needs tenant_id, app_id and secret_key");
            }
            if ms.subscription_id.is_empty()
                || ms.resource_group.is_empty()
                || ms.workspace_name.is_empty()
            {
                return invalid(
                    "update_table needs subscription_id, resource_group and workspace_name",
                );
            }
            if ms.retention_days == 0 {
                return invalid("retention_days must be at least 1");
            }
        }
        Ok(())
    }
}
