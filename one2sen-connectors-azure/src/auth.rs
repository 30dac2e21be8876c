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

use async_trait::async_trait;
use log::debug;
use one2sen_common::{http, Error, Result};
use reqwest::Client;
use serde::Deserialize;
use std::{
    fmt::Debug,
    time::{Duration, Instant},
};
use tokio::sync::Mutex;

/// Scope for the logs ingestion API
pub const MONITOR_SCOPE: &str = "https://monitor.azure.com/.default";

/// Scope for the resource manager
pub const MANAGEMENT_SCOPE: &str = "https://management.azure.com/.default";

// tokens are refreshed this long before they expire
const EXPIRY_MARGIN: Duration = Duration::from_secs(60);

/// Provides bearer tokens
#[async_trait]
pub trait TokenSource: Send + Sync {
    /// A currently valid access token
    async fn token(&self) -> Result<String>;
}

/// A token acquired elsewhere
pub struct StaticToken(String);

impl StaticToken {
    /// Wraps `token`
    #[must_use]
    pub fn new<T: ToString + ?Sized>(token: &T) -> Self {
        Self(token.to_string())
    }
}

#[async_trait]
impl TokenSource for StaticToken {
    async fn token(&self) -> Result<String> {
        Ok(self.0.clone())
    }
}

// Azure client credentials token response. Provided for any successful token request.
#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

// A token once resolved from the Azure auth service.
struct Token {
    access_token: String,
    expires_at: Instant,
}

impl Token {
    fn is_expired(&self) -> bool {
        self.expires_at <= Instant::now()
    }
}

/// OAuth2 client credentials flow against the Microsoft identity platform.
/// The token is cached until shortly before it expires.
pub struct ClientCredentials {
    authority: String,
    tenant_id: String,
    client_id: String,
    client_secret: String,
    scope: String,
    client: Client,
    token: Mutex<Option<Token>>,
}

impl Debug for ClientCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientCredentials")
            .field("authority", &self.authority)
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("scope", &self.scope)
            .finish_non_exhaustive()
    }
}

impl ClientCredentials {
    /// Credentials for `scope`
    #[must_use]
    pub fn new(
        client: Client,
        authority: &str,
        tenant_id: &str,
        client_id: &str,
        client_secret: &str,
        scope: &str,
    ) -> Self {
        Self {
            authority: authority.trim_end_matches('/').to_string(),
            tenant_id: tenant_id.to_string(),
            client_id: client_id.to_string(),
            client_secret: client_secret.to_string(),
            scope: scope.to_string(),
            client,
            token: Mutex::new(None),
        }
    }

    // Requests a new token from the Azure auth service.
    async fn refresh(&self) -> Result<Token> {
        let url = format!("{}/{}/oauth2/v2.0/token", self.authority, self.tenant_id);
        let params = [
            ("grant_type", "client_credentials"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("scope", self.scope.as_str()),
        ];
        debug!("requesting token for {} from {url}", self.scope);
        let request = self.client.post(&url).form(&params).build()?;
        let response = http::execute_sensitive(&self.client, request).await?;
        if !response.is_success() {
            return Err(Error::Auth {
                status: response.status,
                body: response.text(),
            });
        }
        let res: TokenResponse = serde_json::from_slice(&response.body).map_err(|e| Error::Auth {
            status: response.status,
            body: format!("invalid token response: {e}"),
        })?;
        let lifetime = Duration::from_secs(res.expires_in).saturating_sub(EXPIRY_MARGIN);
        Ok(Token {
            access_token: res.access_token,
            expires_at: Instant::now() + lifetime,
        })
    }
}

#[async_trait]
impl TokenSource for ClientCredentials {
    async fn token(&self) -> Result<String> {
        let mut cached = self.token.lock().await;
        match cached.as_ref() {
            Some(token) if !token.is_expired() => Ok(token.access_token.clone()),
            _ => {
                let token = self.refresh().await?;
                let access_token = token.access_token.clone();
                *cached = Some(token);
                Ok(access_token)
            }
        }
    }
}
