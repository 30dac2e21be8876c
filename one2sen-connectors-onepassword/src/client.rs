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

//! Events API client
use crate::page::PageRequest;
use async_trait::async_trait;
use log::debug;
use one2sen_common::{http, Error, Result};
use reqwest::{header::CONTENT_TYPE, Client};
use std::fmt;

/// Posts page requests to an events endpoint and returns the raw response body.
///
/// Implementations map HTTP statuses above 399 to errors, decoding is left to
/// the paginator.
#[async_trait]
pub trait EventsApi: Send + Sync {
    /// `POST /api/v1/{endpoint}`
    async fn post(&self, endpoint: &str, request: &PageRequest) -> Result<Vec<u8>>;
}

/// reqwest backed [`EventsApi`]
pub struct EventsClient {
    base_url: String,
    token: String,
    inner: Client,
}

impl fmt::Debug for EventsClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventsClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

impl EventsClient {
    /// Creates a client for the events API at `base_url` authenticating with `token`.
    ///
    /// # Errors
    /// if the token is empty
    pub fn new<T: ToString + ?Sized>(base_url: &T, token: &str, inner: Client) -> Result<Self> {
        if token.is_empty() {
            return Err(Error::Auth {
                status: 0,
                body: "empty api token provided".to_string(),
            });
        }
        Ok(Self {
            base_url: base_url.to_string().trim_end_matches('/').to_string(),
            token: token.to_string(),
            inner,
        })
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/api/v1/{endpoint}", self.base_url)
    }
}

#[async_trait]
impl EventsApi for EventsClient {
    async fn post(&self, endpoint: &str, request: &PageRequest) -> Result<Vec<u8>> {
        let url = self.url(endpoint);
        let body = serde_json::to_vec(request)
            .map_err(|e| Error::Protocol(format!("could not encode payload: {e}")))?;
        debug!("POST {url}");
        let request = self
            .inner
            .post(&url)
            .bearer_auth(&self.token)
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .build()?;
        let response = http::execute(&self.inner, request).await?;
        if response.status > 399 {
            let body = response.text();
            return Err(Error::from_status(&url, response.status, body));
        }
        Ok(response.body)
    }
}
